//! 上传流程的错误类型

/// 上传运行中可能出现的错误
///
/// `Config`、`RemoteDirectory` 和 `Log` 会终止整次运行；准备远程目录时的
/// `Process` 同样终止运行。其余错误只影响单个文件，由引擎在文件边界捕获并写入日志。
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("创建/检查远程目录失败 (exit={code})")]
    RemoteDirectory { code: i32 },

    /// ssh/scp 进程无法启动或等待失败
    #[error("无法执行远程命令: {0}")]
    Process(String),

    #[error("传输失败 (exit={code})")]
    Transfer { code: i32 },

    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("写入运行日志失败: {0}")]
    Log(String),
}

impl UploadError {
    /// 对应的进程退出码
    pub fn exit_code(&self) -> u8 {
        match self {
            UploadError::Config(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T, E = UploadError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(UploadError::Config("x".into()).exit_code(), 2);
        assert_eq!(UploadError::RemoteDirectory { code: 255 }.exit_code(), 1);
        assert_eq!(UploadError::Process("spawn".into()).exit_code(), 1);
    }

    #[test]
    fn test_transfer_message_carries_code() {
        let msg = UploadError::Transfer { code: 7 }.to_string();
        assert!(msg.contains("exit=7"));
    }
}
