//! 远程会话与传输执行器

use crate::error::{Result, UploadError};
use crate::remote::RemoteHost;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// 远程会话：目录保证与文件存在性检查
pub struct RemoteSession {
    host: Arc<dyn RemoteHost>,
    remote_dir: String,
    dry_run: bool,
}

impl RemoteSession {
    pub fn new(host: Arc<dyn RemoteHost>, remote_dir: impl Into<String>, dry_run: bool) -> Self {
        Self {
            host,
            remote_dir: remote_dir.into(),
            dry_run,
        }
    }

    /// 确保远程目录存在，失败时整次运行终止
    pub async fn ensure_remote_dir(&self) -> Result<()> {
        if self.dry_run {
            info!(":: (dry) 将创建/检查远程目录: {}", self.remote_dir);
            return Ok(());
        }

        let code = self
            .host
            .ensure_directory(&self.remote_dir)
            .await
            .map_err(|e| {
                error!("无法在 {} 上执行 mkdir: {:#}", self.host.name(), e);
                UploadError::Process(format!("{:#}", e))
            })?;

        if code != 0 {
            return Err(UploadError::RemoteDirectory { code });
        }
        Ok(())
    }

    /// 远程文件是否存在
    ///
    /// 退出码 0 表示存在，非 0 表示不存在；命令无法执行时返回错误。
    /// dry-run 下总是返回 `false`，不访问远程主机。
    pub async fn remote_file_exists(&self, remote_path: &str) -> Result<bool> {
        if self.dry_run {
            return Ok(false);
        }

        let code = self
            .host
            .probe_exists(remote_path)
            .await
            .map_err(|e| UploadError::Process(format!("{:#}", e)))?;
        Ok(code == 0)
    }
}

/// 传输执行器
pub struct TransferExecutor {
    host: Arc<dyn RemoteHost>,
    dry_run: bool,
}

impl TransferExecutor {
    pub fn new(host: Arc<dyn RemoteHost>, dry_run: bool) -> Self {
        Self { host, dry_run }
    }

    /// 上传单个文件，非零退出码返回 `Transfer` 错误
    pub async fn upload(&self, local: &Path, remote_path: &str) -> Result<()> {
        if self.dry_run {
            info!(":: (dry) 将上传: {} -> {}", local.display(), remote_path);
            return Ok(());
        }

        let code = self
            .host
            .transfer_file(local, remote_path)
            .await
            .map_err(|e| UploadError::Process(format!("{:#}", e)))?;

        if code != 0 {
            return Err(UploadError::Transfer { code });
        }
        Ok(())
    }
}
