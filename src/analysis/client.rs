// 分析服务客户端
//
// 提交图片、强制超时，并把所有失败归入固定的错误分类
// 不做任何重试，重试策略由调用方决定

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::transport::{AnalysisTransport, TransportError, TransportResponse};
use crate::models::{
    AnalysisMode, AnalysisOutcome, AnalysisReport, ErrorInfo, ImageFile, DEFAULT_API_BASE_URL,
};

/// 默认请求超时
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

/// 成功响应
#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    result: Option<String>,
    /// ML 接口附带的结构化分析结果
    #[serde(default)]
    analysis: Option<serde_json::Value>,
}

/// 错误响应
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
}

/// 分析服务客户端
pub struct AnalysisClient {
    transport: Arc<dyn AnalysisTransport>,
    base_url: String,
    mode: AnalysisMode,
    timeout: Duration,
}

impl AnalysisClient {
    pub fn new(transport: Arc<dyn AnalysisTransport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            mode: AnalysisMode::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// 使用默认服务地址
    pub fn with_default_base(transport: Arc<dyn AnalysisTransport>) -> Self {
        Self::new(transport, DEFAULT_API_BASE_URL)
    }

    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 完整的接口地址
    pub fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.mode.endpoint_path()
        )
    }

    /// 分析图片
    ///
    /// 未选择图片时直接返回 `NoFileSelected`，不会访问服务
    pub async fn analyze(&self, image: Option<&ImageFile>) -> AnalysisOutcome {
        let Some(image) = image else {
            warn!("未选择图片，跳过分析请求");
            return AnalysisOutcome::Failure(ErrorInfo::no_file_selected());
        };

        let request_id = Uuid::new_v4();
        let endpoint = self.endpoint();
        info!(
            %request_id,
            "提交图片分析: {} ({} 字节) -> {}",
            image.file_name,
            image.len(),
            endpoint
        );

        let started = tokio::time::Instant::now();
        let outcome = match self.transport.post_image(&endpoint, image, self.timeout).await {
            Ok(response) => classify_response(response, &endpoint),
            Err(e) => classify_transport_error(e),
        };
        let elapsed_ms = started.elapsed().as_millis();

        match &outcome {
            AnalysisOutcome::Success(report) => info!(
                %request_id,
                "分析完成，耗时 {}ms，结果 {} 字符",
                elapsed_ms,
                report.markup.len()
            ),
            AnalysisOutcome::Failure(error) => error!(
                %request_id,
                "分析失败 ({:?})，耗时 {}ms: {}",
                error.kind,
                elapsed_ms,
                error
            ),
            _ => {}
        }

        outcome
    }
}

/// 传输层错误分类：超时优先，其余都视为无法连接
fn classify_transport_error(error: TransportError) -> AnalysisOutcome {
    match error {
        TransportError::Timeout => AnalysisOutcome::Failure(ErrorInfo::timeout()),
        TransportError::Unreachable(detail) => {
            warn!("无法连接到分析服务: {}", detail);
            AnalysisOutcome::Failure(ErrorInfo::network_unreachable())
        }
    }
}

/// 响应分类
///
/// 2xx 但没有 `result` 字段（或为空）时按未知错误处理，与网络错误使用不同的提示
fn classify_response(response: TransportResponse, endpoint: &str) -> AnalysisOutcome {
    let status = response.status;

    if (200..300).contains(&status) {
        let parsed = serde_json::from_str::<AnalyzeResponse>(&response.body).ok();
        return match parsed {
            Some(AnalyzeResponse {
                result: Some(markup),
                analysis,
            }) if !markup.is_empty() => AnalysisOutcome::Success(AnalysisReport {
                markup,
                details: analysis,
                endpoint: endpoint.to_string(),
                completed_at: Utc::now(),
            }),
            _ => AnalysisOutcome::Failure(ErrorInfo::empty_result()),
        };
    }

    let server_message = serde_json::from_str::<ErrorResponse>(&response.body)
        .ok()
        .and_then(|r| r.error)
        .filter(|message| !message.is_empty());

    let error = match status {
        404 => ErrorInfo::endpoint_not_found(),
        s if s >= 500 => ErrorInfo::server_error(server_message),
        _ => ErrorInfo::unknown(server_message),
    };
    AnalysisOutcome::Failure(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorKind, MSG_EMPTY_RESULT};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 返回固定结果并记录调用次数的传输层
    struct StubTransport {
        reply: Result<TransportResponse, TransportError>,
        calls: AtomicUsize,
        last_url: Mutex<Option<String>>,
    }

    impl StubTransport {
        fn new(reply: Result<TransportResponse, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_url: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalysisTransport for StubTransport {
        async fn post_image(
            &self,
            url: &str,
            _image: &ImageFile,
            _timeout: Duration,
        ) -> Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_url.lock().unwrap() = Some(url.to_string());
            self.reply.clone()
        }
    }

    fn image() -> ImageFile {
        ImageFile::new("chest.png", b"png-bytes".to_vec())
    }

    async fn analyze_with(reply: Result<TransportResponse, TransportError>) -> AnalysisOutcome {
        let transport = StubTransport::new(reply);
        let client = AnalysisClient::with_default_base(transport.clone());
        let outcome = client.analyze(Some(&image())).await;
        assert_eq!(transport.calls(), 1);
        outcome
    }

    fn failure(outcome: AnalysisOutcome) -> ErrorInfo {
        outcome.error().cloned().expect("应该是失败结果")
    }

    #[tokio::test]
    async fn test_missing_image_skips_transport() {
        let transport = StubTransport::new(Ok(TransportResponse::new(200, "{}")));
        let client = AnalysisClient::with_default_base(transport.clone());

        let outcome = client.analyze(None).await;
        assert_eq!(failure(outcome).kind, ErrorKind::NoFileSelected);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_success_returns_markup() {
        let outcome = analyze_with(Ok(TransportResponse::new(
            200,
            r#"{"result": "<p><strong>Pneumonia</strong></p>"}"#,
        )))
        .await;

        let report = outcome.report().expect("应该成功");
        assert_eq!(report.markup, "<p><strong>Pneumonia</strong></p>");
        assert_eq!(report.endpoint, "http://localhost:5000/api/analyze");
        assert!(report.details.is_none());
    }

    #[tokio::test]
    async fn test_missing_result_is_unknown() {
        let error = failure(analyze_with(Ok(TransportResponse::new(200, "{}"))).await);
        assert_eq!(error.kind, ErrorKind::Unknown);
        assert_eq!(error.message, MSG_EMPTY_RESULT);

        let error =
            failure(analyze_with(Ok(TransportResponse::new(200, r#"{"result": ""}"#))).await);
        assert_eq!(error.message, MSG_EMPTY_RESULT);

        // 非 JSON 响应体同样视为没有结果
        let error = failure(analyze_with(Ok(TransportResponse::new(200, "<html>"))).await);
        assert_eq!(error.message, MSG_EMPTY_RESULT);
    }

    #[tokio::test]
    async fn test_not_found() {
        let error = failure(
            analyze_with(Ok(TransportResponse::new(404, r#"{"error": "nope"}"#))).await,
        );
        assert_eq!(error.kind, ErrorKind::EndpointNotFound);
    }

    #[tokio::test]
    async fn test_server_error_uses_server_message() {
        let error = failure(
            analyze_with(Ok(TransportResponse::new(500, r#"{"error": "db down"}"#))).await,
        );
        assert_eq!(error, ErrorInfo::new(ErrorKind::ServerError, "db down"));

        let error = failure(analyze_with(Ok(TransportResponse::new(503, ""))).await);
        assert_eq!(error.kind, ErrorKind::ServerError);
        assert_eq!(error.message, "Internal server error");
    }

    #[tokio::test]
    async fn test_other_client_error_is_unknown() {
        let error = failure(
            analyze_with(Ok(TransportResponse::new(
                400,
                r#"{"error": "Allowed image types are png, jpg, jpeg, dicom"}"#,
            )))
            .await,
        );
        assert_eq!(error.kind, ErrorKind::Unknown);
        assert_eq!(error.message, "Allowed image types are png, jpg, jpeg, dicom");

        let error = failure(analyze_with(Ok(TransportResponse::new(400, "{}"))).await);
        assert_eq!(error.message, "An error occurred during analysis");
    }

    #[tokio::test]
    async fn test_transport_errors() {
        let error = failure(analyze_with(Err(TransportError::Timeout)).await);
        assert_eq!(error.kind, ErrorKind::Timeout);

        let error = failure(
            analyze_with(Err(TransportError::Unreachable("connection refused".into()))).await,
        );
        assert_eq!(error.kind, ErrorKind::NetworkUnreachable);
        assert_ne!(error.message, MSG_EMPTY_RESULT);
    }

    #[tokio::test]
    async fn test_ml_mode_returns_details() {
        let transport = StubTransport::new(Ok(TransportResponse::new(
            200,
            r#"{"result": "<div>ok</div>", "analysis": {"ensemble_confidence": 87.5}}"#,
        )));
        let client = AnalysisClient::new(transport.clone(), "http://10.0.0.5:5000/")
            .with_mode(AnalysisMode::Ml);

        let outcome = client.analyze(Some(&image())).await;
        let report = outcome.report().unwrap();
        assert_eq!(
            report.details.as_ref().unwrap()["ensemble_confidence"],
            serde_json::json!(87.5)
        );
        assert_eq!(
            transport.last_url.lock().unwrap().as_deref(),
            Some("http://10.0.0.5:5000/api/ml-analyze")
        );
    }
}
