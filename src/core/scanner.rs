use crate::error::{Result, UploadError};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// 文件扫描器配置
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 文件选择模式（glob），如 `*.csv`
    pub pattern: String,
    /// 是否扫描子目录
    pub recursive: bool,
}

/// 本地文件扫描器
pub struct FileScanner {
    config: ScanConfig,
    matcher: Regex,
}

impl FileScanner {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let source = glob_to_regex(&config.pattern, config.recursive);
        let matcher = Regex::new(&source).map_err(|e| {
            UploadError::Config(format!("无效的文件模式 '{}': {}", config.pattern, e))
        })?;
        Ok(Self { config, matcher })
    }

    /// 相对路径（使用 / 分隔）是否匹配模式
    pub fn matches(&self, relative_path: &str) -> bool {
        self.matcher.is_match(relative_path)
    }

    /// 非递归时只需要下降到模式本身的层数
    fn max_depth(&self) -> usize {
        if self.config.recursive || self.config.pattern.contains("**") {
            usize::MAX
        } else {
            self.config.pattern.split('/').filter(|p| !p.is_empty()).count().max(1)
        }
    }

    /// 扫描目录，按遍历顺序返回匹配的文件（不排序）
    pub async fn scan(&self, base: &Path) -> Result<Vec<PathBuf>> {
        info!(
            "开始扫描: {}, pattern: {}, recursive: {}",
            base.display(),
            self.config.pattern,
            self.config.recursive
        );

        let base = base.to_path_buf();
        let max_depth = self.max_depth();
        let matcher = self.matcher.clone();

        // 使用 spawn_blocking 避免阻塞 async runtime
        let files = tokio::task::spawn_blocking(move || {
            WalkDir::new(&base)
                .min_depth(1)
                .max_depth(max_depth)
                .follow_links(false)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(e) => Some(e),
                    Err(e) => {
                        debug!("跳过无法访问的条目: {}", e);
                        None
                    }
                })
                .filter(|entry| entry.path().is_file())
                .filter(|entry| {
                    // 非 UTF-8 文件名按有损转换后的名字匹配，不会被静默丢弃
                    entry
                        .path()
                        .strip_prefix(&base)
                        .map(|p| matcher.is_match(&normalize_path(&p.to_string_lossy())))
                        .unwrap_or(false)
                })
                .map(|entry| entry.into_path())
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| UploadError::Io(std::io::Error::other(e)))?;

        info!("扫描完成: {} 个文件", files.len());
        Ok(files)
    }
}

/// 规范化路径分隔符（统一使用 /）
fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// 把 glob 转换为锚定的正则表达式
///
/// 支持 `*`、`?`、`[...]`（`[!...]` 取反）和 `**`。递归模式下，
/// 模式可以匹配任意深度的子路径。
fn glob_to_regex(pattern: &str, recursive: bool) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from(if recursive { "^(?:.*/)?" } else { "^" });
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => match class_end(&chars, i + 1) {
                Some(end) => {
                    out.push_str(&class_to_regex(&chars[i + 1..end]));
                    i = end + 1;
                    continue;
                }
                None => out.push_str(r"\["),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out.push('$');
    out
}

/// 找到字符类的结束 `]`，开头的 `!` 之后紧跟的 `]` 是字面量
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    chars.get(j..)?.iter().position(|&c| c == ']').map(|p| j + p)
}

/// 字符类内容逐字转义，只保留开头的 `!`（取反）和区间中的 `-`
fn class_to_regex(body: &[char]) -> String {
    let (negated, body) = match body.split_first() {
        Some((&'!', rest)) => (true, rest),
        _ => (false, body),
    };

    let mut out = String::from(if negated { "[^" } else { "[" });
    for (k, &c) in body.iter().enumerate() {
        if c == '-' && k > 0 && k + 1 < body.len() {
            out.push('-');
        } else {
            out.push_str(&regex::escape(&c.to_string()));
        }
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(pattern: &str, recursive: bool) -> FileScanner {
        FileScanner::new(ScanConfig {
            pattern: pattern.to_string(),
            recursive,
        })
        .unwrap()
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let s = scanner("*.csv", false);
        assert!(s.matches("a.csv"));
        assert!(s.matches(".hidden.csv"));
        assert!(!s.matches("a.csv.bak"));
        assert!(!s.matches("sub/a.csv"));
    }

    #[test]
    fn test_recursive_matches_any_depth() {
        let s = scanner("*.csv", true);
        assert!(s.matches("a.csv"));
        assert!(s.matches("sub/deeper/a.csv"));
        assert!(!s.matches("sub/a.txt"));
    }

    #[test]
    fn test_question_mark_and_classes() {
        let s = scanner("report_?.[ct]sv", false);
        assert!(s.matches("report_1.csv"));
        assert!(s.matches("report_x.tsv"));
        assert!(!s.matches("report_10.csv"));

        let s = scanner("[!_]*.json", false);
        assert!(s.matches("data.json"));
        assert!(!s.matches("_draft.json"));
    }

    #[test]
    fn test_class_body_is_literal() {
        let s = scanner("[[]x.csv", false);
        assert!(s.matches("[x.csv"));
        assert!(!s.matches("x.csv"));

        // `^` 在 glob 里不是取反
        let s = scanner("[^a]x.csv", false);
        assert!(s.matches("^x.csv"));
        assert!(s.matches("ax.csv"));
        assert!(!s.matches("bx.csv"));

        let s = scanner("[a&&b]x.csv", false);
        assert!(s.matches("ax.csv"));
        assert!(s.matches("&x.csv"));
        assert!(s.matches("bx.csv"));
        assert!(!s.matches("cx.csv"));
    }

    #[test]
    fn test_class_ranges_and_edge_brackets() {
        let s = scanner("log_[0-9].txt", false);
        assert!(s.matches("log_7.txt"));
        assert!(!s.matches("log_a.txt"));

        let s = scanner("[-a]", false);
        assert!(s.matches("-"));
        assert!(s.matches("a"));

        let s = scanner("[]]", false);
        assert!(s.matches("]"));

        let s = scanner("[!]]", false);
        assert!(s.matches("x"));
        assert!(!s.matches("]"));

        // 没有闭合的 `[` 按字面量处理
        let s = scanner("a[b", false);
        assert!(s.matches("a[b"));
    }

    #[test]
    fn test_reversed_range_is_config_error() {
        let result = FileScanner::new(ScanConfig {
            pattern: "[z-a].csv".to_string(),
            recursive: false,
        });
        assert!(matches!(result, Err(UploadError::Config(_))));
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let s = scanner("a+b (1).txt", false);
        assert!(s.matches("a+b (1).txt"));
        assert!(!s.matches("aab (1).txt"));
    }

    #[test]
    fn test_double_star_segment() {
        let s = scanner("**/*.csv", false);
        assert!(s.matches("a.csv"));
        assert!(s.matches("x/y/a.csv"));
    }

    #[tokio::test]
    async fn test_scan_skips_directories_and_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), b"1").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"2").unwrap();
        std::fs::create_dir(dir.path().join("dir.csv")).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("c.csv"), b"3").unwrap();

        let flat = scanner("*.csv", false).scan(dir.path()).await.unwrap();
        assert_eq!(flat, vec![dir.path().join("a.csv")]);

        let mut deep = scanner("*.csv", true).scan(dir.path()).await.unwrap();
        deep.sort();
        assert_eq!(
            deep,
            vec![dir.path().join("a.csv"), dir.path().join("sub").join("c.csv")]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_keeps_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join(OsStr::from_bytes(b"relat\xf3rio.csv"));
        std::fs::write(&odd, b"1").unwrap();
        std::fs::write(dir.path().join("ok.csv"), b"2").unwrap();

        let mut found = scanner("*.csv", false).scan(dir.path()).await.unwrap();
        found.sort();
        let mut expected = vec![odd, dir.path().join("ok.csv")];
        expected.sort();
        assert_eq!(found, expected);
    }
}
