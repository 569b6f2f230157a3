//! # 图片处理模块（image_handler）
//!
//! ## 设计思路
//!
//! 该模块将“文件读取编码 → 解码压缩 → 图床上传 → 失败回退”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `service`：承载可注入服务（`ImageService`）与控制器依赖的 `ImagePipeline` 接口
//! - `handler`：编排整条处理流水线（`convert`）
//! - `loader`：负责文件句柄编码、Data URI 解析与签名校验
//! - `pipeline`：负责解码、画布预算、等比缩放与 JPEG 重编码
//! - `uploader`：负责 multipart 上传与响应解析
//! - `config/error/source`：配置、错误、输入与结果模型
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! 表单控制器 / CLI
//!    ↓
//! service.rs（ImagePipeline 接口）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志 + 失败降级）
//!    ├─ loader.rs（FileHandle → Data URI）
//!    ├─ pipeline.rs（缩放 + JPEG 重编码）
//!    └─ uploader.rs（POST 图床，失败回退占位图）
//!    ↓
//! UploadOutcome（Hosted / Fallback，永远能给出 URL）
//! ```
//!
//! ## 分层职责建议
//!
//! - 配置与策略变更优先改 `config.rs`
//! - 流程顺序变更优先改 `handler.rs`
//! - 单阶段行为优化分别改 `loader/pipeline/uploader`

mod config;
mod error;
mod handler;
mod loader;
mod pipeline;
mod service;
mod source;
mod uploader;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{CompressionProfile, DEFAULT_UPLOAD_ENDPOINT, ImageConfig, PLACEHOLDER_URL};
pub use error::ImageError;
pub use handler::ImageHandler;
pub use service::{ImagePipeline, ImageService};
pub use source::{FileHandle, ImageSource, UploadOutcome};

pub(crate) use uploader::{is_web_url, redact_url_for_log};
