//! 运行配置模块

use crate::error::{Result, UploadError};
use std::path::{Path, PathBuf};

/// 远程连接配置
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// 私钥路径（为空时使用 ssh 默认的身份文件）
    pub key_path: Option<PathBuf>,
}

impl ConnectionConfig {
    /// `user@host` 形式的目标
    pub fn target(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// 检查私钥文件
    ///
    /// 文件不存在视为配置错误；权限过宽只给出警告。
    pub fn validate(&self) -> Result<()> {
        let Some(key) = &self.key_path else {
            return Ok(());
        };

        if !key.exists() {
            return Err(UploadError::Config(format!(
                "私钥不存在: {}",
                key.display()
            )));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(key) {
                let mode = metadata.permissions().mode() & 0o777;
                if mode & 0o077 != 0 {
                    tracing::warn!(
                        "私钥权限为 {:o}，如果连接失败请执行: chmod 600 {}",
                        mode,
                        key.display()
                    );
                }
            }
        }

        Ok(())
    }
}

/// 上传成功后对本地文件的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    Delete,
    Archive,
    Keep,
}

/// 一次上传运行的配置（构建后不再修改）
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// 远程目标目录
    pub remote_dir: String,
    /// 本地待上传目录
    pub local_dir: PathBuf,
    /// 上传成功后的归档目录
    pub sent_dir: PathBuf,
    /// 运行日志目录
    pub logs_dir: PathBuf,
    /// 文件选择模式（glob）
    pub pattern: String,
    pub recursive: bool,
    pub overwrite: bool,
    pub keep_local: bool,
    pub delete_after: bool,
    pub dry_run: bool,
}

impl UploadConfig {
    /// 上传成功后的动作，`delete_after` 优先于 `keep_local`
    pub fn post_action(&self) -> PostAction {
        if self.delete_after {
            PostAction::Delete
        } else if !self.keep_local {
            PostAction::Archive
        } else {
            PostAction::Keep
        }
    }

    /// 远程目标路径 = 远程目录 + 文件名
    pub fn remote_path_for(&self, local: &Path) -> String {
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = self.remote_dir.trim_end_matches('/');
        if dir.is_empty() {
            format!("/{}", name)
        } else {
            format!("{}/{}", dir, name)
        }
    }

    /// 确认本地目录存在且是文件夹
    pub fn validate_local_dir(&self) -> Result<()> {
        if !self.local_dir.is_dir() {
            return Err(UploadError::Config(format!(
                "本地目录无效: {}",
                self.local_dir.display()
            )));
        }
        Ok(())
    }
}

/// 相对路径按当前工作目录解析为绝对路径
pub fn resolve_dir(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
