//! 上传成功后的本地文件处理：归档、删除或保留

use crate::config::PostAction;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// 本地处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOutcome {
    Deleted,
    Archived(PathBuf),
    Kept,
    /// dry-run 下只报告将要执行的动作
    Simulated(PostAction),
}

/// 本地文件状态转换器
pub struct LocalTransitioner {
    sent_dir: PathBuf,
    action: PostAction,
    dry_run: bool,
}

impl LocalTransitioner {
    pub fn new(sent_dir: impl Into<PathBuf>, action: PostAction, dry_run: bool) -> Self {
        Self {
            sent_dir: sent_dir.into(),
            action,
            dry_run,
        }
    }

    /// 对已成功上传的文件执行唯一一个后续动作
    pub async fn apply(&self, file: &Path) -> io::Result<LocalOutcome> {
        match self.action {
            PostAction::Delete => {
                if self.dry_run {
                    info!(":: (dry) 将删除: {}", file.display());
                    return Ok(LocalOutcome::Simulated(PostAction::Delete));
                }
                fs::remove_file(file).await?;
                debug!("已删除本地文件: {}", file.display());
                Ok(LocalOutcome::Deleted)
            }
            PostAction::Archive => {
                if self.dry_run {
                    info!(
                        ":: (dry) 将移动: {} -> {}",
                        file.display(),
                        self.sent_dir.join(file_name(file)).display()
                    );
                    return Ok(LocalOutcome::Simulated(PostAction::Archive));
                }
                fs::create_dir_all(&self.sent_dir).await?;
                let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
                let target = archive_target(&self.sent_dir, file, &stamp);
                move_file(file, &target).await?;
                debug!("已归档: {} -> {}", file.display(), target.display());
                Ok(LocalOutcome::Archived(target))
            }
            PostAction::Keep => Ok(LocalOutcome::Kept),
        }
    }
}

fn file_name(file: &Path) -> &OsStr {
    file.file_name().unwrap_or_default()
}

/// 计算归档目标路径，保证不会覆盖已有文件
///
/// 同名文件已存在时在文件名主干后追加 `_<stamp>`，仍冲突再追加序号。
/// 文件名按原始字节拼接，非 UTF-8 名字保持不变。
pub fn archive_target(sent_dir: &Path, file: &Path, stamp: &str) -> PathBuf {
    let target = sent_dir.join(file_name(file));
    if !target.exists() {
        return target;
    }

    let stem = file.file_stem().unwrap_or_default();
    let with_suffix = |suffix: &str| {
        let mut name = OsString::from(stem);
        name.push(suffix);
        if let Some(ext) = file.extension() {
            name.push(".");
            name.push(ext);
        }
        sent_dir.join(name)
    };

    let stamped = with_suffix(&format!("_{}", stamp));
    if !stamped.exists() {
        return stamped;
    }

    (1u32..)
        .map(|n| with_suffix(&format!("_{}_{}", stamp, n)))
        .find(|p| !p.exists())
        .unwrap_or(stamped)
}

/// 移动文件，只有跨设备时才回退为复制后删除
async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!("跨设备移动，改为复制: {}", e);
            copy_then_remove(from, to).await
        }
        Err(e) => Err(e),
    }
}

/// 复制或删除源文件失败时清理目标，不留下半个归档
async fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    if let Err(e) = fs::copy(from, to).await {
        let _ = fs::remove_file(to).await;
        return Err(e);
    }
    if let Err(e) = fs::remove_file(from).await {
        let _ = fs::remove_file(to).await;
        return Err(e);
    }
    Ok(())
}

fn is_cross_device(err: &io::Error) -> bool {
    // EXDEV / ERROR_NOT_SAME_DEVICE
    #[cfg(windows)]
    const CROSS_DEVICE: i32 = 17;
    #[cfg(not(windows))]
    const CROSS_DEVICE: i32 = 18;
    err.raw_os_error() == Some(CROSS_DEVICE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_archive_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.csv");
        std::fs::write(&file, b"x").unwrap();
        let sent = dir.path().join("sent");

        let t = LocalTransitioner::new(&sent, PostAction::Archive, false);
        let outcome = t.apply(&file).await.unwrap();

        assert_eq!(outcome, LocalOutcome::Archived(sent.join("a.csv")));
        assert!(!file.exists());
        assert!(sent.join("a.csv").exists());
    }

    #[tokio::test]
    async fn test_archive_collision_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sent = dir.path().join("sent");
        std::fs::create_dir(&sent).unwrap();
        std::fs::write(sent.join("a.csv"), b"first").unwrap();

        let file = dir.path().join("a.csv");
        std::fs::write(&file, b"second").unwrap();

        let t = LocalTransitioner::new(&sent, PostAction::Archive, false);
        let LocalOutcome::Archived(target) = t.apply(&file).await.unwrap() else {
            panic!("expected archive");
        };

        assert_ne!(target, sent.join("a.csv"));
        let name = target.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("a_") && name.ends_with(".csv"));
        assert_eq!(std::fs::read(sent.join("a.csv")).unwrap(), b"first");
        assert_eq!(std::fs::read(&target).unwrap(), b"second");
    }

    #[test]
    fn test_archive_target_adds_counter_when_stamp_taken() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), b"1").unwrap();
        std::fs::write(dir.path().join("a_20240101_120000.csv"), b"2").unwrap();

        let target = archive_target(dir.path(), Path::new("/in/a.csv"), "20240101_120000");
        assert_eq!(target, dir.path().join("a_20240101_120000_1.csv"));

        let target = archive_target(dir.path(), Path::new("/in/noext"), "20240101_120000");
        assert_eq!(target, dir.path().join("noext"));
    }

    #[tokio::test]
    async fn test_delete_and_keep() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.csv");
        std::fs::write(&file, b"x").unwrap();

        let keep = LocalTransitioner::new(dir.path().join("sent"), PostAction::Keep, false);
        assert_eq!(keep.apply(&file).await.unwrap(), LocalOutcome::Kept);
        assert!(file.exists());

        let delete = LocalTransitioner::new(dir.path().join("sent"), PostAction::Delete, false);
        assert_eq!(delete.apply(&file).await.unwrap(), LocalOutcome::Deleted);
        assert!(!file.exists());
        assert!(!dir.path().join("sent").exists());
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.csv");
        std::fs::write(&file, b"x").unwrap();
        let sent = dir.path().join("sent");

        for action in [PostAction::Delete, PostAction::Archive] {
            let t = LocalTransitioner::new(&sent, action, true);
            assert_eq!(t.apply(&file).await.unwrap(), LocalOutcome::Simulated(action));
        }

        assert!(file.exists());
        assert!(!sent.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_only_cross_device_errors_fall_back() {
        assert!(is_cross_device(&io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device(&io::Error::from_raw_os_error(13)));
        assert!(!is_cross_device(&io::Error::new(io::ErrorKind::PermissionDenied, "denied")));
    }

    #[tokio::test]
    async fn test_failed_move_leaves_no_target() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.csv");
        std::fs::write(&file, b"x").unwrap();
        let target = dir.path().join("missing").join("a.csv");

        assert!(move_file(&file, &target).await.is_err());
        assert!(file.exists());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_failed_copy_is_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a_dir");
        std::fs::create_dir(&source).unwrap();
        let target = dir.path().join("a.csv");

        assert!(copy_then_remove(&source, &target).await.is_err());
        assert!(source.exists());
        assert!(!target.exists());
    }
}
