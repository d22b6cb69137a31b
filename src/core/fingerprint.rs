//! 文件内容指纹（BLAKE3）

use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// 读取块大小
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// 流式计算文件的 BLAKE3 摘要（64 个十六进制字符）
///
/// 按固定块读取，不会把整个文件载入内存。读取失败直接返回错误，不重试。
pub async fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
