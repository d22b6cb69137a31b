pub mod memory;
pub mod ssh;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub use memory::MemoryHost;
pub use ssh::SshHost;

/// 进程被信号终止、没有退出码时使用的值
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// 远程主机抽象接口
///
/// 每个操作返回远程命令的退出码（0 表示成功），不解析任何输出。
/// 返回 `Err` 表示命令本身无法执行，与“非零退出码”区分开。
#[async_trait]
pub trait RemoteHost: Send + Sync {
    /// 确保远程目录存在（mkdir -p）
    async fn ensure_directory(&self, path: &str) -> Result<i32>;

    /// 检查远程文件是否存在，0 表示存在
    async fn probe_exists(&self, path: &str) -> Result<i32>;

    /// 上传单个本地文件到远程路径
    async fn transfer_file(&self, local: &Path, remote: &str) -> Result<i32>;

    /// 获取主机名称（用于日志）
    fn name(&self) -> &str;
}
