//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载图片链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 注意：这些错误只在流水线内部流转，到达 `convert` 边界时统一降级为
//! `UploadOutcome::Fallback`，不会以错误形式抵达表单控制器。

/// 图片处理统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// 文件句柄无法读取（空文件、路径读取失败等）。
    #[error("读取错误：{0}")]
    Read(String),

    #[error("解码错误：{0}")]
    Decode(String),

    /// 离屏栅格画布无法获取（像素预算超限或缓冲构建失败）。
    #[error("画布错误：{0}")]
    Context(String),

    /// 上传失败：非成功响应、响应体异常或传输层错误。
    #[error("上传错误：{0}")]
    Upload(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl ImageError {
    /// 稳定错误码，便于日志检索与前端展示。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read(_) => "E_READ",
            Self::Decode(_) => "E_DECODE",
            Self::Context(_) => "E_CONTEXT",
            Self::Upload(_) => "E_UPLOAD",
            Self::InvalidFormat(_) => "E_INVALID_FORMAT",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
        }
    }

    /// 错误发生的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Read(_) | Self::ResourceLimit(_) => "encode",
            Self::Decode(_) | Self::Context(_) | Self::InvalidFormat(_) => "compress",
            Self::Upload(_) => "upload",
        }
    }
}
