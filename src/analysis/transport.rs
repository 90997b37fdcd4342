// 分析服务传输层
//
// 只负责把图片以 multipart 形式发出去并拿回状态码和原始响应体
// 响应的解释和错误分类都在 AnalysisClient 中完成

use async_trait::async_trait;
use reqwest::{multipart, Client};
use std::time::Duration;
use tracing::warn;

use crate::models::ImageFile;

/// multipart 中图片字段的名称
pub const IMAGE_FIELD: &str = "image";

/// 收到的 HTTP 响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// 没有拿到响应的传输错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("请求超时")]
    Timeout,

    #[error("无法连接到分析服务: {0}")]
    Unreachable(String),
}

/// 分析服务传输接口
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// 上传图片
    ///
    /// 只要收到响应（无论状态码）就返回 `Ok`
    async fn post_image(
        &self,
        url: &str,
        image: &ImageFile,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}

/// 基于 reqwest 的传输实现
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// 创建传输层（接受共享的HTTP客户端以复用连接池）
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Unreachable(error.to_string())
    }
}

#[async_trait]
impl AnalysisTransport for ReqwestTransport {
    async fn post_image(
        &self,
        url: &str,
        image: &ImageFile,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let part = multipart::Part::bytes(image.data().to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(classify_reqwest_error)?;
        let form = multipart::Form::new().part(IMAGE_FIELD, part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Err(TransportError::Timeout),
            Err(e) => {
                // 已经拿到状态码，响应体读取失败按空响应处理
                warn!("读取响应体失败 (HTTP {}): {}", status, e);
                String::new()
            }
        };

        Ok(TransportResponse { status, body })
    }
}
