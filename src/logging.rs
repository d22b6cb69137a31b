//! 诊断日志 - 控制台 + 带大小限制的文件日志
//!
//! 这里是程序自身的运行日志（tracing），与每次上传写入的 JSONL 审计日志无关。

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;

/// 诊断日志文件名
pub const LOG_FILE_NAME: &str = "uploadsync.log";

/// 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 是否写入日志文件
    pub enabled: bool,
    /// 最大日志文件大小（MB）
    pub max_size_mb: u32,
    /// 日志级别: "error", "warn", "info", "debug", "trace"
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_mb: 5,
            level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// 将配置的日志级别转换为 tracing Level
    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}

struct Inner {
    file: File,
    written: u64,
}

/// 带大小限制的日志写入器，超过上限时轮转为 `.log.old`
#[derive(Clone)]
pub struct SizeRotatingWriter {
    path: PathBuf,
    max_size: u64,
    inner: Arc<Mutex<Inner>>,
}

impl SizeRotatingWriter {
    pub fn new(log_dir: &Path, max_size_mb: u32) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let path = log_dir.join(LOG_FILE_NAME);
        let max_size = u64::from(max_size_mb.max(1)) * 1024 * 1024;
        Self::with_limit(path, max_size)
    }

    fn with_limit(path: PathBuf, max_size: u64) -> io::Result<Self> {
        let existing = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if existing > max_size {
            Self::rotate(&path)?;
        }
        let inner = Self::open(&path)?;
        Ok(Self {
            path,
            max_size,
            inner: Arc::new(Mutex::new(inner)),
        })
    }

    fn open(path: &Path) -> io::Result<Inner> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Inner { file, written })
    }

    /// app.log -> app.log.old，旧备份直接覆盖
    fn rotate(path: &Path) -> io::Result<()> {
        let backup = path.with_extension("log.old");
        if backup.exists() {
            fs::remove_file(&backup)?;
        }
        fs::rename(path, &backup)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 单次写入使用的句柄
pub struct RotatingHandle {
    writer: SizeRotatingWriter,
}

impl Write for RotatingHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.writer.lock();
        let n = inner.file.write(buf)?;
        inner.file.flush()?;
        inner.written += n as u64;

        if inner.written > self.writer.max_size {
            SizeRotatingWriter::rotate(&self.writer.path)?;
            *inner = SizeRotatingWriter::open(&self.writer.path)?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.lock().file.flush()
    }
}

impl<'a> MakeWriter<'a> for SizeRotatingWriter {
    type Writer = RotatingHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingHandle {
            writer: self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        let mut config = LogConfig::default();
        assert_eq!(config.tracing_level(), tracing::Level::INFO);
        config.level = "DEBUG".to_string();
        assert_eq!(config.tracing_level(), tracing::Level::DEBUG);
        config.level = "bogus".to_string();
        assert_eq!(config.tracing_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_rotates_past_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        let writer = SizeRotatingWriter::with_limit(path.clone(), 16).unwrap();

        let mut handle = writer.make_writer();
        handle.write_all(b"0123456789").unwrap();
        assert!(!path.with_extension("log.old").exists());

        handle.write_all(b"0123456789").unwrap();
        assert!(path.with_extension("log.old").exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);

        handle.write_all(b"abc").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"abc");
    }
}
