//! 文件系统操作工具
//!
//! 提供读取本地图片、推断 MIME 类型以及跨平台日志/配置目录等功能

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::ImageFile;
use crate::utils::file_extension;

const APP_DIR_NAME: &str = "medscan";

/// 根据文件名推断 MIME 类型
pub fn guess_content_type(file_name: &str) -> &'static str {
    match file_extension(file_name).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("dicom") | Some("dcm") => "application/dicom",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// 读取本地图片文件
///
/// 只负责读取字节，不做任何图片解码或格式校验
pub async fn read_image_file(path: &Path) -> Result<ImageFile> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("无效的文件路径: {:?}", path))?
        .to_string();

    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("读取文件失败: {:?}", path))?;

    debug!("已读取文件 {} ({} 字节)", file_name, data.len());
    Ok(ImageFile::new(file_name, data))
}

/// 获取日志目录路径（跨平台）
///
/// - macOS: ~/Library/Logs/medscan
/// - Windows: %APPDATA%/medscan/logs
/// - Linux: ~/.local/share/medscan/logs
pub fn get_log_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join("Library/Logs").join(APP_DIR_NAME)
    } else if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join(APP_DIR_NAME).join("logs")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".local/share")
            .join(APP_DIR_NAME)
            .join("logs")
    }
}

/// 获取默认配置文件路径（跨平台）
pub fn get_config_path() -> PathBuf {
    let dir = if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join("Library/Application Support")
            .join(APP_DIR_NAME)
    } else if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join(APP_DIR_NAME)
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".config").join(APP_DIR_NAME)
    };
    dir.join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("a.png"), "image/png");
        assert_eq!(guess_content_type("a.JPG"), "image/jpeg");
        assert_eq!(guess_content_type("a.jpeg"), "image/jpeg");
        assert_eq!(guess_content_type("a.dicom"), "application/dicom");
        assert_eq!(guess_content_type("README"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_read_image_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("knee.jpg");
        tokio::fs::write(&path, [0xFFu8, 0xD8, 0xFF]).await.unwrap();

        let file = read_image_file(&path).await.unwrap();
        assert_eq!(file.file_name, "knee.jpg");
        assert_eq!(file.content_type, "image/jpeg");
        assert_eq!(file.data(), &[0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let temp_dir = tempdir().unwrap();
        let result = read_image_file(&temp_dir.path().join("missing.png")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_config_path_file_name() {
        assert!(get_config_path().ends_with("config.json"));
    }
}
