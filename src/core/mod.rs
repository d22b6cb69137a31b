pub mod archive;
pub mod engine;
pub mod fingerprint;
pub mod run_log;
pub mod scanner;
pub mod session;

pub use archive::{LocalOutcome, LocalTransitioner};
pub use engine::{FileTask, RunReport, UploadEngine};
pub use fingerprint::hash_file;
pub use run_log::{FileStatus, LogRecord, RunLog, RunStatus};
pub use scanner::{FileScanner, ScanConfig};
pub use session::{RemoteSession, TransferExecutor};
