//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 注意：图片流水线的错误在 `convert` 边界已降级为占位图，
//! 这里的 `Image` 分支只会来自直接调用单阶段接口（如读取本地文件、切换档位）。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError` / `io::Error` / `serde_json::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于以 JSON 形式输出给调用方。

use serde::Serialize;

use crate::image_handler::ImageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片处理单阶段错误（读取 / 档位切换等）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化 / 反序列化失败
    #[error("JSON 处理失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 设置缺失或无效
    #[error("设置无效: {0}")]
    Settings(String),

    /// 表单本地校验失败（上传中提交、手动地址无效等）
    #[error("表单错误: {0}")]
    Form(String),

    /// 提交到表单处理端失败
    #[error("提交失败: {0}")]
    Submission(String),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
