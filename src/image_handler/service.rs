//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! 使用 `ImageService` 作为表单控制器与 CLI 的注入对象，替代全局单例函数。
//! 好处：
//! 1. 生命周期清晰（由 `main.rs` 统一创建）
//! 2. 测试可注入假的流水线实现，减少网络依赖
//! 3. 克隆成本低（内部 `Arc`），可在多个控制器间共享配置
//!
//! ## 实现思路
//!
//! - `ImagePipeline` trait 是控制器依赖的最小接口：预览编码 + 完整转换。
//! - `ImageService` 是基于 `ImageHandler` 的生产实现，并提供字符串形式的档位切换。

use std::future::Future;
use std::sync::Arc;

use super::source::{FileHandle, ImageSource, UploadOutcome};
use super::{CompressionProfile, ImageConfig, ImageError, ImageHandler};

/// 表单控制器所依赖的图片流水线接口。
pub trait ImagePipeline {
    /// 生成本地预览（Data URI），不发起网络请求。
    fn preview(&self, file: &FileHandle) -> impl Future<Output = Result<String, ImageError>> + Send;

    /// 完整转换：编码 → 压缩 → 上传，永不失败。
    fn convert(&self, source: Option<ImageSource>) -> impl Future<Output = UploadOutcome> + Send;
}

/// 图片处理服务。
#[derive(Clone)]
pub struct ImageService {
    handler: Arc<ImageHandler>,
}

impl ImageService {
    /// 使用默认配置创建服务。
    pub fn new() -> Result<Self, ImageError> {
        Self::with_config(ImageConfig::default())
    }

    /// 使用自定义配置创建服务。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use customer_form::image_handler::{ImageConfig, ImageService};
    ///
    /// let mut config = ImageConfig::default();
    /// config.api_key = "my-key".to_string();
    /// let service = ImageService::with_config(config)?;
    /// # Ok::<(), customer_form::image_handler::ImageError>(())
    /// ```
    pub fn with_config(config: ImageConfig) -> Result<Self, ImageError> {
        Ok(Self {
            handler: Arc::new(ImageHandler::new(config)?),
        })
    }

    /// 设置压缩档位（`quality` / `balanced` / `speed`）。
    pub fn set_compression_profile(&self, profile: &str) -> Result<(), ImageError> {
        let profile = CompressionProfile::from_str(profile)?;
        self.handler.set_compression_profile(profile)
    }

    /// 获取当前生效压缩档位（字符串）。
    pub fn get_compression_profile(&self) -> Result<String, ImageError> {
        let profile = self.handler.get_compression_profile()?;
        Ok(profile.as_str().to_string())
    }
}

impl ImagePipeline for ImageService {
    fn preview(&self, file: &FileHandle) -> impl Future<Output = Result<String, ImageError>> + Send {
        let handler = Arc::clone(&self.handler);
        let file = file.clone();
        async move { handler.encode(&file).await }
    }

    fn convert(&self, source: Option<ImageSource>) -> impl Future<Output = UploadOutcome> + Send {
        let handler = Arc::clone(&self.handler);
        async move { handler.convert(source).await }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::PLACEHOLDER_URL;
    use crate::image_handler::test_support::create_png_bytes;
    use std::thread;

    #[test]
    fn service_set_and_get_profile_roundtrip() {
        let service = ImageService::new().expect("service init failed");

        for profile in ["quality", "speed", "balanced"] {
            service
                .set_compression_profile(profile)
                .expect("set profile should succeed");
            assert_eq!(
                service.get_compression_profile().expect("get profile should succeed"),
                profile
            );
        }
    }

    #[test]
    fn service_rejects_invalid_profile() {
        let service = ImageService::new().expect("service init failed");

        let result = service.set_compression_profile("unknown-profile");
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn service_clones_share_configuration() {
        let service = ImageService::new().expect("service init failed");
        let clone = service.clone();

        let workers: Vec<_> = (0..4)
            .map(|worker_id| {
                let service = service.clone();
                thread::spawn(move || {
                    let profiles = ["quality", "balanced", "speed"];
                    for i in 0..50 {
                        let profile = profiles[(worker_id + i) % profiles.len()];
                        service.set_compression_profile(profile).expect("set profile should succeed");
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().expect("worker thread should not panic");
        }

        service.set_compression_profile("speed").expect("set speed");
        assert_eq!(clone.get_compression_profile().expect("get profile"), "speed");
    }

    #[tokio::test]
    async fn pipeline_preview_and_convert_without_key() {
        let service = ImageService::with_config(ImageConfig {
            use_system_proxy: false,
            ..ImageConfig::default()
        })
        .expect("service init failed");
        let file = FileHandle::new("a.png", "image/png", create_png_bytes(8, 8));

        let preview = service.preview(&file).await.expect("preview should succeed");
        assert!(preview.starts_with("data:image/png;base64,"));

        let outcome = service.convert(Some(ImageSource::File(file))).await;
        assert_eq!(outcome.url(), PLACEHOLDER_URL);
    }
}
