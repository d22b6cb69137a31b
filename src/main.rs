use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use uploadsync_lib::cli::Cli;
use uploadsync_lib::logging::{LogConfig, SizeRotatingWriter};
use uploadsync_lib::{RunReport, SshHost, UploadConfig, UploadEngine, UploadError};

/// 初始化日志系统
fn init_logging(config: &LogConfig, log_dir: &Path) {
    let env_filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(config.tracing_level().into());

    // 文件日志层，创建失败时只输出到控制台
    let file_layer = if config.enabled {
        SizeRotatingWriter::new(log_dir, config.max_size_mb)
            .ok()
            .map(|writer| {
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false)
            })
    } else {
        None
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer);

    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn run(cli: &Cli, config: UploadConfig) -> Result<RunReport, UploadError> {
    let connection = cli.connection_config();
    connection.validate()?;

    let host = Arc::new(SshHost::new(connection));
    let engine = UploadEngine::new(config, host);
    engine.run().await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 本地目录无效时直接退出，不创建日志目录
    let config = match cli.checked_upload_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("错误: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };
    init_logging(&cli.log_config(), &config.logs_dir);

    match run(&cli, config).await {
        Ok(report) => {
            println!("\n{}", report);
            ExitCode::from(report.exit_code())
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("错误: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
