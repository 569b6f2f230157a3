//! # 表单提交协作方
//!
//! ## 设计思路
//!
//! 服务端“创建客户”动作是外部协作方：它接收 `name`、`email`、`image_url`
//! 三个字段并返回校验错误结构。控制器只负责展示这些错误，从不解释它们。
//!
//! ## 实现思路
//!
//! - `CustomerSubmitter` trait 作为注入接口，测试可替换为内存实现。
//! - `HttpCustomerSubmitter` 以 multipart 表单 POST 到配置的动作地址。
//! - 2xx 与 4xx 的 JSON 响应都按 `SubmitResponse` 解析；4xx 通常携带字段错误。

use std::future::Future;

use reqwest::multipart;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::image_handler::redact_url_for_log;

/// 提交给服务端的表单字段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSubmission {
    pub name: String,
    pub email: String,
    pub image_url: String,
}

/// 服务端返回的字段级校验错误。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors {
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default)]
    pub image_url: Vec<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.email.is_empty() && self.image_url.is_empty()
    }
}

/// 服务端响应。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: FieldErrors,
}

/// 表单提交接口。
pub trait CustomerSubmitter {
    fn submit(
        &self,
        submission: &CustomerSubmission,
    ) -> impl Future<Output = Result<SubmitResponse, AppError>> + Send;
}

/// 基于 HTTP 的表单提交实现。
pub struct HttpCustomerSubmitter {
    client: reqwest::Client,
    action_url: String,
}

impl HttpCustomerSubmitter {
    pub fn new(action_url: impl Into<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Submission(format!("HTTP 客户端初始化失败：{}", e)))?;
        Ok(Self::with_client(client, action_url))
    }

    pub fn with_client(client: reqwest::Client, action_url: impl Into<String>) -> Self {
        Self {
            client,
            action_url: action_url.into(),
        }
    }
}

impl CustomerSubmitter for HttpCustomerSubmitter {
    async fn submit(&self, submission: &CustomerSubmission) -> Result<SubmitResponse, AppError> {
        log::info!(
            "📨 提交客户表单 - action: {} image_url: {}",
            redact_url_for_log(&self.action_url),
            redact_url_for_log(&submission.image_url)
        );

        let form = multipart::Form::new()
            .text("name", submission.name.clone())
            .text("email", submission.email.clone())
            .text("image_url", submission.image_url.clone());

        let response = self
            .client
            .post(&self.action_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Submission(format!("请求失败：{}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Submission(format!("读取响应失败：{}", e.without_url())))?;

        if status.is_server_error() || status.is_redirection() || status.is_informational() {
            return Err(AppError::Submission(format!("HTTP {}", status.as_u16())));
        }

        match serde_json::from_str::<SubmitResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if status.is_success() => Ok(SubmitResponse {
                success: true,
                ..SubmitResponse::default()
            }),
            Err(e) => Err(AppError::Submission(format!(
                "HTTP {}，响应无法解析：{}",
                status.as_u16(),
                e
            ))),
        }
    }
}
