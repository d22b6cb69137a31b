pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod remote;

pub use config::{ConnectionConfig, PostAction, UploadConfig};
pub use crate::core::{RunReport, UploadEngine};
pub use error::UploadError;
pub use remote::{RemoteHost, SshHost};
