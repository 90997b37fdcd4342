// 结果片段处理
//
// 分析服务返回的是原始 HTML 片段，属于不可信内容
// 交给展示层之前统一经过 MarkupSanitizer，处理方式可通过配置替换

use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::SanitizerKind;

/// 结果片段处理器
pub trait MarkupSanitizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn sanitize(&self, markup: &str) -> String;
}

/// 原样转发，完全信任分析服务
pub struct PassthroughSanitizer;

impl MarkupSanitizer for PassthroughSanitizer {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn sanitize(&self, markup: &str) -> String {
        debug!("原样转发分析结果 ({} 字符)", markup.len());
        markup.to_string()
    }
}

/// 转义全部 HTML，展示层只会看到纯文本
pub struct EscapingSanitizer;

impl MarkupSanitizer for EscapingSanitizer {
    fn name(&self) -> &'static str {
        "escape"
    }

    fn sanitize(&self, markup: &str) -> String {
        html_escape::encode_text(markup).into_owned()
    }
}

/// 根据配置创建处理器
pub fn sanitizer_for(kind: SanitizerKind) -> Arc<dyn MarkupSanitizer> {
    match kind {
        SanitizerKind::Passthrough => {
            warn!("分析结果将以原始 HTML 转发给展示层，未做任何过滤，请确认分析服务可信");
            Arc::new(PassthroughSanitizer)
        }
        SanitizerKind::Escape => Arc::new(EscapingSanitizer),
    }
}
