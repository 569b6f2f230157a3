//! # 图床上传模块
//!
//! ## 设计思路
//!
//! 上传是“尽力而为”的：任何失败（未配置 Key、传输错误、非 2xx、`success: false`、
//! 响应体缺字段）都不会向上抛错，而是记录日志并返回 `UploadOutcome::Fallback`。
//! 外层表单流程因此永远可以继续提交。
//!
//! ## 实现思路
//!
//! - 去掉 Data URI 前缀，得到纯 Base64 负载。
//! - 生成“时间前缀 + 随机后缀”的文件名，不追求强唯一性。
//! - 以 multipart 提交 `{key, image, name}`，解析 JSON 响应中的 `data.url`。

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::multipart;
use serde::Deserialize;

use super::source::UploadOutcome;
use super::{ImageConfig, ImageError, ImageHandler};

const UPLOAD_NAME_SUFFIX_LEN: usize = 6;

/// 图床响应体（只取用到的字段，其余忽略）。
#[derive(Debug, Deserialize)]
struct HostingResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<HostingData>,
    #[serde(default)]
    error: Option<HostingErrorBody>,
}

#[derive(Debug, Deserialize)]
struct HostingData {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HostingErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl HostingResponse {
    fn error_message(&self) -> String {
        self.error
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| "图床返回 success=false".to_string())
    }
}

/// 生成上传文件名：`<prefix>_<UTC 毫秒时间戳>_<随机后缀>`。
///
/// 碰撞概率可接受，图床按自身规则去重。
pub(crate) fn generate_upload_name(prefix: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(UPLOAD_NAME_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();

    format!("{}_{}_{}", prefix, Utc::now().format("%Y%m%d%H%M%S%3f"), suffix)
}

/// 去掉 query 与 fragment，避免日志泄露参数。
pub(crate) fn redact_url_for_log(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return "<invalid-url>".to_string();
    };

    let host = parsed.host_str().unwrap_or("<unknown-host>");
    let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
    let path = parsed.path();

    format!("{}://{}{}{}", parsed.scheme(), host, port, path)
}

/// 仅接受 http/https 的绝对地址。
pub(crate) fn is_web_url(url: &str) -> bool {
    reqwest::Url::parse(url.trim())
        .map(|parsed| {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        })
        .unwrap_or(false)
}

impl ImageHandler {
    /// 上传 Data URI 图片，失败时返回占位图结果而不是错误。
    pub async fn upload(&self, data_uri: &str) -> UploadOutcome {
        match self.config_snapshot() {
            Ok(config) => self.upload_with_config(data_uri, &config).await,
            Err(err) => UploadOutcome::fallback(err.to_string()),
        }
    }

    pub(super) async fn upload_with_config(&self, data_uri: &str, config: &ImageConfig) -> UploadOutcome {
        match self.try_upload(data_uri, config).await {
            Ok(url) => {
                log::info!("☁️ 图片上传成功 - URL: {}", redact_url_for_log(&url));
                UploadOutcome::Hosted(url)
            }
            Err(err) => {
                log::warn!(
                    "⚠️ 图片上传失败，使用占位图 - code={} stage={} err={}",
                    err.code(),
                    err.stage(),
                    err
                );
                UploadOutcome::fallback(err.to_string())
            }
        }
    }

    async fn try_upload(&self, data_uri: &str, config: &ImageConfig) -> Result<String, ImageError> {
        if config.api_key.trim().is_empty() {
            return Err(ImageError::Upload("未配置图床 API Key".to_string()));
        }

        let payload = Self::split_data_uri(data_uri)
            .map_err(|e| ImageError::Upload(format!("无效的上传负载：{}", e)))?
            .payload
            .to_string();
        let name = generate_upload_name(&config.upload_name_prefix);

        log::debug!(
            "📤 开始上传图片 - endpoint: {} name: {} payload: {}B",
            redact_url_for_log(&config.upload_endpoint),
            name,
            payload.len()
        );

        let form = multipart::Form::new()
            .text("key", config.api_key.clone())
            .text("image", payload)
            .text("name", name);

        let response = self
            .client
            .post(&config.upload_endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ImageError::Upload(format!("请求失败：{}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ImageError::Upload(format!("读取响应失败：{}", e.without_url())))?;

        let parsed = serde_json::from_str::<HostingResponse>(&body);

        if !status.is_success() {
            let detail = parsed
                .map(|resp| resp.error_message())
                .unwrap_or_else(|_| Self::status_message(status.as_u16()).to_string());
            return Err(ImageError::Upload(format!("HTTP {}: {}", status.as_u16(), detail)));
        }

        let parsed = parsed.map_err(|e| ImageError::Upload(format!("响应解析失败：{}", e)))?;

        if !parsed.success {
            return Err(ImageError::Upload(parsed.error_message()));
        }

        let url = parsed
            .data
            .and_then(|data| data.url)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ImageError::Upload("响应缺少 data.url".to_string()))?;

        if !is_web_url(&url) {
            return Err(ImageError::Upload(format!("响应中的地址无效：{}", url)));
        }

        Ok(url)
    }

    /// 常见 HTTP 状态码本地化文案。
    fn status_message(code: u16) -> &'static str {
        match code {
            400 => "请求参数错误",
            401 | 403 => "访问被拒绝",
            404 => "未找到",
            429 => "请求过于频繁",
            500..=599 => "服务器错误",
            _ => "请求失败",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::PLACEHOLDER_URL;
    use crate::image_handler::test_support::spawn_one_shot_server;

    fn config_for(endpoint: String) -> ImageConfig {
        ImageConfig {
            upload_endpoint: endpoint,
            api_key: "test-key".to_string(),
            use_system_proxy: false,
            ..ImageConfig::default()
        }
    }

    #[tokio::test]
    async fn upload_returns_hosted_url_and_sends_multipart_fields() {
        let body = r#"{"success":true,"status":200,"data":{"url":"https://i.ibb.co/abc/customer.jpg"}}"#;
        let (endpoint, server) = spawn_one_shot_server("200 OK", body.to_string());
        let handler = ImageHandler::new(config_for(endpoint)).expect("handler init failed");

        let outcome = handler.upload("data:image/jpeg;base64,QUJDRA==").await;
        let request = server.join().expect("server thread failed");

        assert_eq!(outcome, UploadOutcome::Hosted("https://i.ibb.co/abc/customer.jpg".to_string()));
        assert!(request.starts_with("POST /1/upload"));
        assert!(request.contains("name=\"key\""));
        assert!(request.contains("test-key"));
        assert!(request.contains("name=\"image\""));
        assert!(request.contains("QUJDRA=="));
        assert!(!request.contains("data:image/jpeg;base64,"));
        assert!(request.contains("name=\"name\""));
        assert!(request.contains("customer_"));
    }

    #[tokio::test]
    async fn upload_falls_back_when_api_reports_failure() {
        let (endpoint, server) = spawn_one_shot_server("200 OK", r#"{"success":false}"#.to_string());
        let handler = ImageHandler::new(config_for(endpoint)).expect("handler init failed");

        let outcome = handler.upload("data:image/jpeg;base64,QUJDRA==").await;
        server.join().expect("server thread failed");

        assert!(!outcome.is_hosted());
        assert_eq!(outcome.url(), PLACEHOLDER_URL);
    }

    #[tokio::test]
    async fn upload_falls_back_on_http_error_status() {
        let body = r#"{"status_code":400,"error":{"message":"Invalid API v1 key.","code":100}}"#;
        let (endpoint, server) = spawn_one_shot_server("400 Bad Request", body.to_string());
        let handler = ImageHandler::new(config_for(endpoint)).expect("handler init failed");

        let outcome = handler.upload("data:image/jpeg;base64,QUJDRA==").await;
        server.join().expect("server thread failed");

        match outcome {
            UploadOutcome::Fallback { reason } => assert!(reason.contains("Invalid API v1 key")),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn upload_falls_back_on_malformed_body() {
        let (endpoint, server) = spawn_one_shot_server("200 OK", "<html>oops</html>".to_string());
        let handler = ImageHandler::new(config_for(endpoint)).expect("handler init failed");

        let outcome = handler.upload("data:image/jpeg;base64,QUJDRA==").await;
        server.join().expect("server thread failed");

        assert_eq!(outcome.url(), PLACEHOLDER_URL);
    }

    #[tokio::test]
    async fn upload_falls_back_when_url_missing_or_not_web() {
        let (endpoint, server) = spawn_one_shot_server(
            "200 OK",
            r#"{"success":true,"data":{"url":"javascript:alert(1)"}}"#.to_string(),
        );
        let handler = ImageHandler::new(config_for(endpoint)).expect("handler init failed");

        let outcome = handler.upload("data:image/jpeg;base64,QUJDRA==").await;
        server.join().expect("server thread failed");

        assert_eq!(outcome.url(), PLACEHOLDER_URL);
    }

    #[tokio::test]
    async fn upload_falls_back_on_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind failed");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let handler = ImageHandler::new(config_for(format!("http://127.0.0.1:{}/1/upload", port)))
            .expect("handler init failed");

        let outcome = handler.upload("data:image/jpeg;base64,QUJDRA==").await;

        assert_eq!(outcome.url(), PLACEHOLDER_URL);
    }

    #[tokio::test]
    async fn upload_without_api_key_skips_network() {
        let handler = ImageHandler::new(ImageConfig {
            upload_endpoint: "http://127.0.0.1:9/unreachable".to_string(),
            use_system_proxy: false,
            ..ImageConfig::default()
        })
        .expect("handler init failed");

        let outcome = handler.upload("data:image/jpeg;base64,QUJDRA==").await;

        match outcome {
            UploadOutcome::Fallback { reason } => assert!(reason.contains("API Key")),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn upload_names_have_time_prefix_and_random_suffix() {
        let a = generate_upload_name("customer");
        let b = generate_upload_name("customer");

        assert!(a.starts_with("customer_"));
        let suffix = a.rsplit('_').next().expect("suffix");
        assert_eq!(suffix.len(), UPLOAD_NAME_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn redact_url_for_log_removes_query_and_fragment() {
        let redacted = redact_url_for_log("https://example.com:8443/path/img.png?token=abc123#hash");
        assert_eq!(redacted, "https://example.com:8443/path/img.png");
    }

    #[test]
    fn web_url_check_accepts_only_http_schemes() {
        assert!(is_web_url("https://placehold.co/400x400?text=Customer"));
        assert!(is_web_url("http://example.com/a.png"));
        assert!(!is_web_url("data:image/png;base64,QUJD"));
        assert!(!is_web_url("ftp://example.com/a.png"));
        assert!(!is_web_url("not a url"));
        assert!(!is_web_url(""));
    }
}
