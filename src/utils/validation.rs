//! 输入验证工具函数
//!
//! 提供服务地址、配置参数和文件扩展名的验证功能

/// 文件选择控件提示的扩展名（仅作建议，不强制校验）
pub const ADVISED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "dicom"];

/// 验证并规范化分析服务地址
///
/// # 参数
/// - `url`: 服务地址，例如 `http://localhost:5000`
///
/// # 返回
/// - `Ok(String)`: 去掉末尾斜杠后的地址
/// - `Err(String)`: 错误信息
pub fn validate_base_url(url: &str) -> Result<String, String> {
    let trimmed = url.trim().trim_end_matches('/');

    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| format!("服务地址必须以 http:// 或 https:// 开头: {}", url))?;

    if host.is_empty() || host.starts_with('/') {
        return Err(format!("服务地址缺少主机名: {}", url));
    }

    Ok(trimmed.to_string())
}

/// 验证进度增量（必须是有限的非负数且不超过100）
pub fn validate_progress_increment(value: f64) -> Result<f64, String> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(format!("无效的进度增量: {}", value));
    }
    Ok(value)
}

/// 验证时长配置（毫秒，必须大于0）
pub fn validate_duration_ms(name: &str, value: u64) -> Result<u64, String> {
    if value == 0 {
        return Err(format!("{} 必须大于0", name));
    }
    Ok(value)
}

/// 文件扩展名是否在建议列表中
pub fn is_advised_extension(file_name: &str) -> bool {
    file_extension(file_name)
        .map(|ext| ADVISED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// 提取小写扩展名
pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_base_url() {
        assert_eq!(
            validate_base_url("http://localhost:5000/").unwrap(),
            "http://localhost:5000"
        );
        assert_eq!(
            validate_base_url(" https://scan.example.com ").unwrap(),
            "https://scan.example.com"
        );
        assert!(validate_base_url("localhost:5000").is_err());
        assert!(validate_base_url("ftp://localhost").is_err());
        assert!(validate_base_url("http://").is_err());
    }

    #[test]
    fn test_advised_extension() {
        assert!(is_advised_extension("xray.png"));
        assert!(is_advised_extension("XRAY.JPEG"));
        assert!(is_advised_extension("ct.dicom"));
        assert!(!is_advised_extension("notes.txt"));
        assert!(!is_advised_extension("png"));
        assert!(!is_advised_extension(".png"));
    }

    #[test]
    fn test_validate_progress_increment() {
        assert!(validate_progress_increment(30.0).is_ok());
        assert!(validate_progress_increment(0.0).is_ok());
        assert!(validate_progress_increment(-1.0).is_err());
        assert!(validate_progress_increment(f64::NAN).is_err());
        assert!(validate_progress_increment(150.0).is_err());
    }
}
