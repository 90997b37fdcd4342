// 图片选择
//
// 持有"当前选中图片"槽位，并负责生成可直接显示的预览

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use tracing::{debug, warn};

use crate::models::{ImageFile, SelectedImage, WorkflowError};
use crate::utils::{is_advised_extension, ADVISED_EXTENSIONS};

/// 图片选择槽位
#[derive(Debug, Default)]
pub struct ImageIntake {
    selected: Option<SelectedImage>,
    next_id: u64,
}

impl ImageIntake {
    pub fn new() -> Self {
        Self::default()
    }

    /// 选择新文件，旧的选择直接丢弃
    ///
    /// 返回本次选择的序号，预览编码完成后凭序号回填
    pub fn select_file(&mut self, file: ImageFile) -> Result<u64, WorkflowError> {
        if file.is_empty() {
            return Err(WorkflowError::EmptyFile(file.file_name));
        }

        if !is_advised_extension(&file.file_name) {
            warn!(
                "文件 {} 不在建议的格式中 ({})，仍然继续",
                file.file_name,
                ADVISED_EXTENSIONS.join(", ")
            );
        }

        self.next_id += 1;
        let id = self.next_id;

        if let Some(previous) = self.selected.replace(SelectedImage {
            id,
            raw: file,
            preview: None,
        }) {
            debug!("替换之前选择的文件: {}", previous.raw.file_name);
        }

        Ok(id)
    }

    /// 回填预览，序号不匹配（已被新的选择替换或已清空）时丢弃
    pub fn attach_preview(&mut self, id: u64, preview: String) -> bool {
        match self.selected.as_mut() {
            Some(image) if image.id == id => {
                image.preview = Some(preview);
                true
            }
            _ => false,
        }
    }

    pub fn selected(&self) -> Option<&SelectedImage> {
        self.selected.as_ref()
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}

/// 生成 data URI 预览
pub fn to_data_uri(file: &ImageFile) -> String {
    format!(
        "data:{};base64,{}",
        file.content_type,
        general_purpose::STANDARD.encode(file.data())
    )
}

/// 在阻塞线程池中异步编码预览
pub async fn encode_preview(file: ImageFile) -> Result<String> {
    tokio::task::spawn_blocking(move || to_data_uri(&file))
        .await
        .map_err(|e| anyhow!("预览编码任务失败: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str, data: &[u8]) -> ImageFile {
        ImageFile::new(name, data.to_vec())
    }

    #[test]
    fn test_select_replaces_previous() {
        let mut intake = ImageIntake::new();
        let first = intake.select_file(image("a.png", b"first")).unwrap();
        let second = intake.select_file(image("b.png", b"second")).unwrap();
        assert_ne!(first, second);

        // 第一个文件的预览迟到，应当被丢弃
        assert!(!intake.attach_preview(first, "data:image/png;base64,Zmlyc3Q=".into()));
        assert!(intake.attach_preview(second, "data:image/png;base64,c2Vjb25k".into()));

        let selected = intake.selected().unwrap();
        assert_eq!(selected.raw.file_name, "b.png");
        assert_eq!(
            selected.preview.as_deref(),
            Some("data:image/png;base64,c2Vjb25k")
        );
    }

    #[test]
    fn test_empty_file_rejected() {
        let mut intake = ImageIntake::new();
        let result = intake.select_file(image("empty.png", b""));
        assert_eq!(result, Err(WorkflowError::EmptyFile("empty.png".into())));
        assert!(intake.selected().is_none());
    }

    #[test]
    fn test_unadvised_extension_still_accepted() {
        let mut intake = ImageIntake::new();
        assert!(intake.select_file(image("scan.tiff", b"II*")).is_ok());
        assert!(intake.selected().is_some());
    }

    #[test]
    fn test_clear_drops_pending_preview() {
        let mut intake = ImageIntake::new();
        let id = intake.select_file(image("a.jpg", b"abc")).unwrap();
        intake.clear();
        assert!(!intake.attach_preview(id, "data:image/jpeg;base64,YWJj".into()));
        assert!(intake.selected().is_none());
    }

    #[tokio::test]
    async fn test_encode_preview() {
        let preview = encode_preview(image("a.jpg", b"abc")).await.unwrap();
        assert_eq!(preview, "data:image/jpeg;base64,YWJj");
    }
}
