use super::{RemoteHost, SIGNAL_EXIT_CODE};
use crate::config::ConnectionConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// 通过系统 ssh / scp 命令访问远程主机
pub struct SshHost {
    conn: ConnectionConfig,
    name: String,
}

impl SshHost {
    pub fn new(conn: ConnectionConfig) -> Self {
        let name = format!("ssh://{}:{}", conn.target(), conn.port);
        Self { conn, name }
    }

    /// `ssh [-i key] -p port user@host <command>`
    fn ssh_args(&self, remote_command: &str) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(key) = &self.conn.key_path {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args.push("-p".to_string());
        args.push(self.conn.port.to_string());
        args.push(self.conn.target());
        args.push(remote_command.to_string());
        args
    }

    /// `scp [-i key] -P port <local> user@host:<remote>`
    fn scp_args(&self, local: &Path, remote: &str) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(key) = &self.conn.key_path {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args.push("-P".to_string());
        args.push(self.conn.port.to_string());
        args.push(local.display().to_string());
        args.push(format!("{}:{}", self.conn.target(), remote));
        args
    }

    /// 运行命令并返回退出码
    async fn run(program: &str, args: &[String]) -> Result<i32> {
        info!(">> {} {}", program, args.join(" "));

        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .with_context(|| format!("启动 {} 失败", program))?;

        Ok(status.code().unwrap_or(SIGNAL_EXIT_CODE))
    }
}

/// 用单引号包裹，供远程 shell 使用
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[async_trait]
impl RemoteHost for SshHost {
    async fn ensure_directory(&self, path: &str) -> Result<i32> {
        let command = format!("mkdir -p {}", shell_quote(path));
        Self::run("ssh", &self.ssh_args(&command)).await
    }

    async fn probe_exists(&self, path: &str) -> Result<i32> {
        let command = format!("test -f {}", shell_quote(path));
        Self::run("ssh", &self.ssh_args(&command)).await
    }

    async fn transfer_file(&self, local: &Path, remote: &str) -> Result<i32> {
        Self::run("scp", &self.scp_args(local, remote)).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn host(key: Option<&str>) -> SshHost {
        SshHost::new(ConnectionConfig {
            host: "10.0.0.5".to_string(),
            port: 4222,
            user: "ingest".to_string(),
            key_path: key.map(PathBuf::from),
        })
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/srv/in box"), "'/srv/in box'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_ssh_args_with_key() {
        let args = host(Some("/keys/id.pem")).ssh_args("test -f '/a'");
        assert_eq!(
            args,
            vec!["-i", "/keys/id.pem", "-p", "4222", "ingest@10.0.0.5", "test -f '/a'"]
        );
    }

    #[test]
    fn test_scp_args_without_key() {
        let args = host(None).scp_args(Path::new("/data/a.csv"), "/srv/a.csv");
        assert_eq!(
            args,
            vec!["-P", "4222", "/data/a.csv", "ingest@10.0.0.5:/srv/a.csv"]
        );
        assert_eq!(host(None).name(), "ssh://ingest@10.0.0.5:4222");
    }
}
