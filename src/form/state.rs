//! # 表单上传状态
//!
//! ## 设计思路
//!
//! 用一个带数据的枚举代替“file / preview / uploading / url / error”多个独立字段，
//! 从类型上排除“上传中却已有结果地址”之类的不可能组合。

use crate::image_handler::{FileHandle, PLACEHOLDER_URL};

/// 隐藏字段地址的来源。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlOrigin {
    /// 流水线上传得到的图床地址。
    Upload,
    /// 用户手动填写的地址。
    Manual,
}

/// 表单图片状态机。
#[derive(Debug, Clone, Default)]
pub enum UploadState {
    #[default]
    Idle,
    /// 已选择文件并生成本地预览，尚未上传。
    Previewing { file: FileHandle, preview: String },
    /// 上传进行中，`ticket` 标识本次上传。
    Uploading {
        file: FileHandle,
        preview: String,
        ticket: u64,
    },
    Uploaded {
        url: String,
        origin: UrlOrigin,
        preview: Option<String>,
    },
    /// 读取或上传失败；隐藏字段使用占位图，保留文件以便重试。
    Failed {
        message: String,
        file: Option<FileHandle>,
        preview: Option<String>,
    },
}

impl UploadState {
    pub fn is_uploading(&self) -> bool {
        matches!(self, Self::Uploading { .. })
    }

    /// 稳定的状态名，用于日志。
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Previewing { .. } => "previewing",
            Self::Uploading { .. } => "uploading",
            Self::Uploaded { .. } => "uploaded",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn preview(&self) -> Option<&str> {
        match self {
            Self::Previewing { preview, .. } | Self::Uploading { preview, .. } => Some(preview),
            Self::Uploaded { preview, .. } | Self::Failed { preview, .. } => preview.as_deref(),
            Self::Idle => None,
        }
    }

    /// 本地错误提示文本。
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// 隐藏字段 `image_url` 的当前值，永不为空、永不为 Data URI。
    pub fn image_url(&self) -> &str {
        match self {
            Self::Uploaded { url, .. } => url,
            _ => PLACEHOLDER_URL,
        }
    }
}

/// 一次上传的凭据，完成时交回控制器。
#[derive(Debug, Clone)]
pub struct UploadTicket {
    pub id: u64,
    pub file: FileHandle,
    pub preview: String,
}
