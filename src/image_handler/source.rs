//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线结果”解耦：
//! - `FileHandle` 表示选择器/拖拽提供的内存文件句柄
//! - `ImageSource` 表示流水线入口可接受的两种输入
//! - `UploadOutcome` 表示尽力而为的上传结果，永远能给出可用 URL

use bytes::Bytes;

use super::config::PLACEHOLDER_URL;

/// 内存中的文件句柄。
///
/// 流水线核心只处理该抽象，从不直接接触文件系统路径。
#[derive(Debug, Clone)]
pub struct FileHandle {
    /// 原始文件名（仅用于日志）。
    pub name: String,
    /// 选择器声明的 MIME 类型，可能为空。
    pub mime_type: String,
    /// 文件内容。
    pub bytes: Bytes,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// 声明类型是否以 `image/` 开头（拖拽过滤规则）。
    pub fn is_declared_image(&self) -> bool {
        self.mime_type
            .trim()
            .get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
    }
}

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 原始文件句柄，需要先编码为 Data URI。
    File(FileHandle),
    /// 已编码的 Data URI（`data:<mime>;base64,<payload>`）。
    DataUri(String),
}

/// 上传结果。
///
/// 用类型表达“尽力而为”契约：要么拿到图床地址，要么回退到固定占位图。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Hosted(String),
    Fallback { reason: String },
}

impl UploadOutcome {
    pub(crate) fn fallback(reason: impl Into<String>) -> Self {
        Self::Fallback {
            reason: reason.into(),
        }
    }

    /// 可直接写入表单的 URL，永不为空。
    pub fn url(&self) -> &str {
        match self {
            Self::Hosted(url) => url,
            Self::Fallback { .. } => PLACEHOLDER_URL,
        }
    }

    pub fn is_hosted(&self) -> bool {
        matches!(self, Self::Hosted(_))
    }

    pub fn into_url(self) -> String {
        match self {
            Self::Hosted(url) => url,
            Self::Fallback { .. } => PLACEHOLDER_URL.to_string(),
        }
    }
}
