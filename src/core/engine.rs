use crate::config::UploadConfig;
use crate::core::archive::LocalTransitioner;
use crate::core::fingerprint::hash_file;
use crate::core::run_log::{utc_iso, FileEvent, FileStatus, LogRecord, RunLog, RunStatus, RunSummary};
use crate::core::scanner::{FileScanner, ScanConfig};
use crate::core::session::{RemoteSession, TransferExecutor};
use crate::error::Result;
use crate::remote::RemoteHost;
use chrono::{DateTime, Local};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 单个待上传文件，在流水线中逐步填充，写入日志后丢弃
#[derive(Debug, Clone)]
pub struct FileTask {
    pub ts: String,
    pub local_path: PathBuf,
    pub remote_path: String,
    pub size: u64,
    pub digest: Option<String>,
    pub status: FileStatus,
    pub error: Option<String>,
}

impl FileTask {
    fn new(local_path: PathBuf, config: &UploadConfig) -> Self {
        let remote_path = config.remote_path_for(&local_path);
        Self {
            ts: utc_iso(),
            local_path,
            remote_path,
            size: 0,
            digest: None,
            status: FileStatus::Failed,
            error: None,
        }
    }

    fn into_record(self) -> LogRecord {
        LogRecord::File(FileEvent {
            ts: self.ts,
            local_path: self.local_path.display().to_string(),
            remote_path: self.remote_path,
            size_bytes: self.size,
            digest: self.digest,
            status: self.status,
            error: self.error,
        })
    }
}

/// 运行报告
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub total: u32,
    pub uploaded: u32,
    pub skipped: u32,
    pub failed: u32,
    pub log_file: PathBuf,
}

impl RunReport {
    /// 没有失败的文件即视为成功
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status == RunStatus::NoFiles {
            writeln!(f, "没有找到匹配的文件。")?;
        }
        writeln!(f, "汇总:")?;
        writeln!(f, "  总数:   {}", self.total)?;
        writeln!(f, "  已上传: {}", self.uploaded)?;
        writeln!(f, "  已跳过: {}", self.skipped)?;
        writeln!(f, "  失败:   {}", self.failed)?;
        write!(f, "  日志:   {}", self.log_file.display())
    }
}

#[derive(Debug, Default)]
struct Counters {
    uploaded: u32,
    skipped: u32,
    failed: u32,
}

/// 上传引擎
///
/// 按发现顺序逐个处理文件；单个文件的任何错误只记为该文件失败，不会中断运行。
pub struct UploadEngine {
    config: UploadConfig,
    session: RemoteSession,
    transfer: TransferExecutor,
    local: LocalTransitioner,
}

impl UploadEngine {
    pub fn new(config: UploadConfig, host: Arc<dyn RemoteHost>) -> Self {
        let session = RemoteSession::new(host.clone(), config.remote_dir.clone(), config.dry_run);
        let transfer = TransferExecutor::new(host, config.dry_run);
        let local = LocalTransitioner::new(
            config.sent_dir.clone(),
            config.post_action(),
            config.dry_run,
        );
        Self {
            config,
            session,
            transfer,
            local,
        }
    }

    /// 运行一次上传
    pub async fn run(&self) -> Result<RunReport> {
        self.run_at(Local::now()).await
    }

    /// 以指定的开始时间运行（决定日志文件名）
    pub async fn run_at(&self, started: DateTime<Local>) -> Result<RunReport> {
        let config = &self.config;
        config.validate_local_dir()?;

        let scanner = FileScanner::new(ScanConfig {
            pattern: config.pattern.clone(),
            recursive: config.recursive,
        })?;

        let log = RunLog::new(&config.logs_dir, started);
        info!(
            "开始上传: {} -> {} (dry_run={})",
            config.local_dir.display(),
            config.remote_dir,
            config.dry_run
        );

        self.session.ensure_remote_dir().await?;

        let files = scanner.scan(&config.local_dir).await?;
        let total = files.len() as u32;

        if files.is_empty() {
            info!("没有找到匹配的文件");
            let report = RunReport {
                status: RunStatus::NoFiles,
                total: 0,
                uploaded: 0,
                skipped: 0,
                failed: 0,
                log_file: log.path().to_path_buf(),
            };
            log.append(&self.summary_record(&report)).await?;
            return Ok(report);
        }

        let mut counters = Counters::default();

        for path in files {
            let mut task = FileTask::new(path, config);

            match self.process_file(&mut task).await {
                Ok(status) => task.status = status,
                Err(e) => {
                    warn!("文件处理失败: {} - {}", task.local_path.display(), e);
                    task.status = FileStatus::Failed;
                    task.error = Some(e.to_string());
                }
            }

            match task.status {
                FileStatus::Uploaded => counters.uploaded += 1,
                FileStatus::SkippedRemoteExists => counters.skipped += 1,
                FileStatus::Failed => counters.failed += 1,
            }

            log.append(&task.into_record()).await?;
        }

        let report = RunReport {
            status: if counters.failed == 0 {
                RunStatus::Ok
            } else {
                RunStatus::PartialFail
            },
            total,
            uploaded: counters.uploaded,
            skipped: counters.skipped,
            failed: counters.failed,
            log_file: log.path().to_path_buf(),
        };
        log.append(&self.summary_record(&report)).await?;

        info!(
            "上传完成: 上传 {}, 跳过 {}, 失败 {}",
            report.uploaded, report.skipped, report.failed
        );
        Ok(report)
    }

    /// 单个文件的流水线：大小 -> 指纹 -> 远程存在性 -> 传输 -> 本地处理
    async fn process_file(&self, task: &mut FileTask) -> Result<FileStatus> {
        task.size = tokio::fs::metadata(&task.local_path).await?.len();
        task.digest = Some(hash_file(&task.local_path).await?);

        if !self.config.overwrite && self.session.remote_file_exists(&task.remote_path).await? {
            debug!("远程已存在，跳过: {}", task.remote_path);
            return Ok(FileStatus::SkippedRemoteExists);
        }

        self.transfer
            .upload(&task.local_path, &task.remote_path)
            .await?;

        let outcome = self.local.apply(&task.local_path).await?;
        debug!("已上传: {} ({:?})", task.local_path.display(), outcome);

        Ok(FileStatus::Uploaded)
    }

    fn summary_record(&self, report: &RunReport) -> LogRecord {
        let config = &self.config;
        LogRecord::RunEnd(RunSummary {
            ts: utc_iso(),
            status: report.status,
            local_dir: config.local_dir.display().to_string(),
            remote_dir: config.remote_dir.clone(),
            pattern: config.pattern.clone(),
            recursive: config.recursive,
            overwrite: config.overwrite,
            keep_local: config.keep_local,
            delete_after: config.delete_after,
            dry_run: config.dry_run,
            count_total: report.total,
            count_uploaded: report.uploaded,
            count_skipped: report.skipped,
            count_failed: report.failed,
            log_file: report.log_file.display().to_string(),
        })
    }
}
