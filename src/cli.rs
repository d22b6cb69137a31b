//! 命令行参数

use crate::config::{resolve_dir, ConnectionConfig, UploadConfig};
use crate::error::Result;
use crate::logging::LogConfig;
use clap::Parser;
use std::path::PathBuf;

/// 通过 SCP 把本地文件上传到远程目录，记录日志并归档已上传的文件
#[derive(Debug, Parser)]
#[command(name = "uploadsync", version, about)]
pub struct Cli {
    /// 本地待上传目录
    #[arg(long, env = "LOCAL_FILES_DIR", default_value = "files")]
    pub local_dir: PathBuf,

    /// 上传成功后移入的归档目录
    #[arg(long, env = "LOCAL_SENT_DIR", default_value = "sent")]
    pub sent_dir: PathBuf,

    /// 运行日志目录
    #[arg(long, env = "LOCAL_LOGS_DIR", default_value = "logs")]
    pub logs_dir: PathBuf,

    /// 文件选择模式（glob），例如 '*.csv'
    #[arg(long, env = "UPLOAD_PATTERN", default_value = "*")]
    pub pattern: String,

    /// 同时扫描子目录
    #[arg(long)]
    pub recursive: bool,

    /// 远程已存在同名文件时仍然上传
    #[arg(long)]
    pub overwrite: bool,

    /// 上传后保留本地文件，不移动到归档目录
    #[arg(long)]
    pub keep_local: bool,

    /// 上传后删除本地文件（优先于 --keep-local 和归档）
    #[arg(long)]
    pub delete_after: bool,

    /// 只显示将要执行的命令和动作，不做任何修改
    #[arg(long)]
    pub dry_run: bool,

    /// 远程主机
    #[arg(long, env = "UPLOAD_HOST")]
    pub host: String,

    /// SSH 端口
    #[arg(long, env = "UPLOAD_PORT", default_value_t = 22)]
    pub port: u16,

    /// SSH 用户
    #[arg(long, env = "UPLOAD_USER")]
    pub user: String,

    /// 私钥文件
    #[arg(long, env = "UPLOAD_KEY")]
    pub key: Option<PathBuf>,

    /// 远程目标目录
    #[arg(long, env = "UPLOAD_REMOTE_DIR")]
    pub remote_dir: String,

    /// 诊断日志级别
    #[arg(long, env = "UPLOADSYNC_LOG", default_value = "info")]
    pub log_level: String,

    /// 诊断日志文件大小上限（MB）
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub log_max_size_mb: u32,

    /// 不写诊断日志文件，只输出到控制台
    #[arg(long)]
    pub no_log_file: bool,
}

impl Cli {
    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            remote_dir: self.remote_dir.clone(),
            local_dir: resolve_dir(&self.local_dir),
            sent_dir: resolve_dir(&self.sent_dir),
            logs_dir: resolve_dir(&self.logs_dir),
            pattern: self.pattern.clone(),
            recursive: self.recursive,
            overwrite: self.overwrite,
            keep_local: self.keep_local,
            delete_after: self.delete_after,
            dry_run: self.dry_run,
        }
    }

    /// 构建配置并确认本地目录有效，在创建任何日志文件之前调用
    pub fn checked_upload_config(&self) -> Result<UploadConfig> {
        let config = self.upload_config();
        config.validate_local_dir()?;
        Ok(config)
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            key_path: self.key.as_deref().map(resolve_dir),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            enabled: !self.no_log_file,
            max_size_mb: self.log_max_size_mb,
            level: self.log_level.clone(),
        }
    }
}
