//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ImageConfig`，保证运行时行为可观测、可调整、可测试。
//! 其中压缩档位（quality / balanced / speed）作为高层语义，映射到底层参数组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置（JPEG 质量 0.7，最大宽度 800px）。
//! - `CompressionProfile` 负责档位字符串解析与反向输出。
//! - `apply_compression_profile` 将档位转换为具体阈值。
//! - `infer_compression_profile` 用于从当前配置反推档位。

use image::imageops::FilterType;

use super::ImageError;

/// 图床上传接口地址。
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://api.imgbb.com/1/upload";

/// 上传不可用时使用的固定占位图地址。
pub const PLACEHOLDER_URL: &str = "https://placehold.co/400x400?text=Customer";

/// 图片处理配置。
///
/// 字段覆盖了读取、压缩、上传三个阶段。
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// 读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`），超出视为无法获取画布。
    pub max_decoded_pixels: u64,
    /// JPEG 重新编码质量，取值 `(0, 1]`。
    pub compress_quality: f32,
    /// 压缩后的最大宽度（像素），高度按比例缩放。
    pub compress_max_width: u32,
    /// 降采样滤镜策略。
    pub resize_filter: FilterType,
    /// 图床上传地址。
    pub upload_endpoint: String,
    /// 图床 API Key，为空时直接回退占位图。
    pub api_key: String,
    /// 上传文件名前缀。
    pub upload_name_prefix: String,
    /// 是否使用系统代理（仅在构建处理器时生效）。
    pub use_system_proxy: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: 32 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            compress_quality: 0.7,
            compress_max_width: 800,
            resize_filter: FilterType::Triangle,
            upload_endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            api_key: String::new(),
            upload_name_prefix: "customer".to_string(),
            use_system_proxy: true,
        }
    }
}

/// 压缩档位（面向产品/用户语义）。
///
/// - `Quality`：尽量保真
/// - `Balanced`：质量与体积平衡
/// - `Speed`：优先上传速度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionProfile {
    Quality,
    Balanced,
    Speed,
}

impl CompressionProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use customer_form::image_handler::CompressionProfile;
    ///
    /// let p = CompressionProfile::from_str("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), customer_form::image_handler::ImageError>(())
    /// ```
    pub(crate) fn from_str(profile: &str) -> Result<Self, ImageError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(ImageError::InvalidFormat(format!(
                "未知压缩档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    /// 将档位输出为稳定字符串，供展示与持久化。
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl ImageConfig {
    /// 基于当前参数反推压缩档位。
    pub(crate) fn infer_compression_profile(&self) -> CompressionProfile {
        if self.compress_max_width >= 1600 && self.compress_quality >= 0.85 {
            return CompressionProfile::Quality;
        }

        if self.compress_max_width <= 640 || self.compress_quality <= 0.5 {
            return CompressionProfile::Speed;
        }

        CompressionProfile::Balanced
    }

    /// 应用指定压缩档位到实际参数。
    pub(crate) fn apply_compression_profile(&mut self, profile: CompressionProfile) {
        match profile {
            CompressionProfile::Quality => {
                self.compress_quality = 0.9;
                self.compress_max_width = 1600;
                self.resize_filter = FilterType::CatmullRom;
            }
            CompressionProfile::Balanced => {
                self.compress_quality = 0.7;
                self.compress_max_width = 800;
                self.resize_filter = FilterType::Triangle;
            }
            CompressionProfile::Speed => {
                self.compress_quality = 0.5;
                self.compress_max_width = 640;
                self.resize_filter = FilterType::Nearest;
            }
        }
    }
}
