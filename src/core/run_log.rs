//! 运行日志 - 每次运行一个 JSON Lines 文件，只追加

use crate::error::{Result, UploadError};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// 单个文件的最终状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Uploaded,
    SkippedRemoteExists,
    Failed,
}

/// 运行结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    PartialFail,
    NoFiles,
}

/// 文件事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEvent {
    pub ts: String,
    pub local_path: String,
    pub remote_path: String,
    pub size_bytes: u64,
    pub digest: Option<String>,
    pub status: FileStatus,
    pub error: Option<String>,
}

/// 运行结束汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub ts: String,
    pub status: RunStatus,
    pub local_dir: String,
    pub remote_dir: String,
    pub pattern: String,
    pub recursive: bool,
    pub overwrite: bool,
    pub keep_local: bool,
    pub delete_after: bool,
    pub dry_run: bool,
    pub count_total: u32,
    pub count_uploaded: u32,
    pub count_skipped: u32,
    pub count_failed: u32,
    pub log_file: String,
}

/// 日志记录，按 `event` 字段区分
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogRecord {
    File(FileEvent),
    RunEnd(RunSummary),
}

/// UTC 时间戳，精确到秒，例如 `2024-05-01T08:30:00Z`
pub fn utc_iso() -> String {
    format_utc(Utc::now())
}

fn format_utc(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// 一次运行的日志文件
///
/// 文件名由运行开始时间（本地时间，精确到秒）决定。同一秒内启动的两次运行
/// 会写入同一个文件，这里不做处理。
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(logs_dir: &Path, started: DateTime<Local>) -> Self {
        let name = format!("upload_{}.jsonl", started.format("%Y%m%d_%H%M%S"));
        Self {
            path: logs_dir.join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条记录并立即刷新
    pub async fn append(&self, record: &LogRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).map_err(|e| UploadError::Log(e.to_string()))?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| UploadError::Log(format!("{}: {}", parent.display(), e)))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| UploadError::Log(format!("{}: {}", self.path.display(), e)))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| UploadError::Log(e.to_string()))?;
        file.flush().await.map_err(|e| UploadError::Log(e.to_string()))?;
        Ok(())
    }
}

/// 读取日志文件中的全部记录
pub fn read_records(path: &Path) -> Result<Vec<LogRecord>> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(|e| UploadError::Log(e.to_string())))
        .collect()
}
