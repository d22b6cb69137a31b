//! 内存中的远程主机，用于测试和本地演练

use super::RemoteHost;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

/// 记录下来的远程调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    EnsureDirectory(String),
    ProbeExists(String),
    Transfer { local: String, remote: String },
}

#[derive(Default)]
struct State {
    dirs: HashSet<String>,
    files: HashMap<String, Vec<u8>>,
    calls: Vec<RemoteCall>,
}

/// 内存远程主机
///
/// 可以预置远程文件，让指定的远程路径传输失败，或让 mkdir 和探测返回错误。
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<State>,
    fail_transfers: HashMap<String, i32>,
    mkdir_exit: Option<i32>,
    mkdir_broken: bool,
    probe_broken: bool,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一个远程文件
    pub fn with_file(self, remote: &str, data: &[u8]) -> Self {
        self.lock().files.insert(remote.to_string(), data.to_vec());
        self
    }

    /// 上传到该远程路径时返回指定退出码
    pub fn fail_transfer(mut self, remote: &str, code: i32) -> Self {
        self.fail_transfers.insert(remote.to_string(), code);
        self
    }

    pub fn fail_mkdir(mut self, code: i32) -> Self {
        self.mkdir_exit = Some(code);
        self
    }

    /// 存在性探测无法执行
    pub fn break_probe(mut self) -> Self {
        self.probe_broken = true;
        self
    }

    /// 所有远程命令都无法执行
    pub fn break_connection(mut self) -> Self {
        self.probe_broken = true;
        self.mkdir_broken = true;
        self
    }

    pub fn has_file(&self, remote: &str) -> bool {
        self.lock().files.contains_key(remote)
    }

    pub fn file(&self, remote: &str) -> Option<Vec<u8>> {
        self.lock().files.get(remote).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.lock().dirs.contains(path)
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn transfer_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, RemoteCall::Transfer { .. }))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RemoteHost for MemoryHost {
    async fn ensure_directory(&self, path: &str) -> Result<i32> {
        let mut state = self.lock();
        state.calls.push(RemoteCall::EnsureDirectory(path.to_string()));
        if self.mkdir_broken {
            return Err(anyhow!("ssh: connection refused"));
        }
        if let Some(code) = self.mkdir_exit {
            return Ok(code);
        }
        state.dirs.insert(path.to_string());
        Ok(0)
    }

    async fn probe_exists(&self, path: &str) -> Result<i32> {
        let mut state = self.lock();
        state.calls.push(RemoteCall::ProbeExists(path.to_string()));
        if self.probe_broken {
            return Err(anyhow!("ssh: connection refused"));
        }
        Ok(if state.files.contains_key(path) { 0 } else { 1 })
    }

    async fn transfer_file(&self, local: &Path, remote: &str) -> Result<i32> {
        let data = tokio::fs::read(local).await?;
        let mut state = self.lock();
        state.calls.push(RemoteCall::Transfer {
            local: local.display().to_string(),
            remote: remote.to_string(),
        });
        if let Some(code) = self.fail_transfers.get(remote) {
            return Ok(*code);
        }
        state.files.insert(remote.to_string(), data);
        Ok(0)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
