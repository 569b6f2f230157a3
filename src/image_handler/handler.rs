//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 只负责流程编排与配置管理，不持有任何会话数据。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 文件句柄编码为 Data URI（输入已是 Data URI 时跳过）
//! 3. 压缩（等比缩放 + JPEG 重编码）
//! 4. 上传图床
//!
//! 任一阶段出错都在 `convert` 边界统一降级为占位图，`convert` 永不失败。
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ImageConfig>>` 支持运行时动态切档。
//! - 单次请求内使用“同一配置快照”，避免处理中途配置漂移。
//! - 记录 `encode/compress/upload/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::source::{ImageSource, UploadOutcome};
use super::{CompressionProfile, ImageConfig, ImageError};

/// 图片处理器。
///
/// 封装了配置状态与复用型 HTTP 客户端，并编排各子模块实现完整流程。
pub struct ImageHandler {
    pub(super) config: Arc<RwLock<ImageConfig>>,
    pub(super) client: reqwest::Client,
}

impl ImageHandler {
    /// 根据初始配置创建处理器。
    ///
    /// 这里同时构建复用型 HTTP 客户端，减少每次请求的初始化开销。
    /// 上传请求不设置整体超时，沿用传输层默认行为。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use customer_form::image_handler::{ImageConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// # Ok::<(), customer_form::image_handler::ImageError>(())
    /// ```
    pub fn new(config: ImageConfig) -> Result<Self, ImageError> {
        let mut builder = reqwest::Client::builder();
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| ImageError::Upload(format!("HTTP 客户端初始化失败：{}", e)))?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            client,
        })
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次请求链路使用一致参数。
    pub(crate) fn config_snapshot(&self) -> Result<ImageConfig, ImageError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 设置压缩档位。
    pub fn set_compression_profile(&self, profile: CompressionProfile) -> Result<(), ImageError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| ImageError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.apply_compression_profile(profile);

        log::info!(
            "⚙️ 已切换压缩档位：{:?}（quality={}, max_width={}, filter={:?}）",
            profile,
            config.compress_quality,
            config.compress_max_width,
            config.resize_filter
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn get_compression_profile(&self) -> Result<CompressionProfile, ImageError> {
        let config = self
            .config
            .read()
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_compression_profile())
    }

    /// 处理主入口：任意来源 → 可写入表单的 URL。
    ///
    /// 没有输入时立即返回占位图，不发起任何网络请求。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use customer_form::image_handler::{FileHandle, ImageConfig, ImageHandler, ImageSource};
    ///
    /// # async fn demo() -> Result<(), customer_form::image_handler::ImageError> {
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// let file = FileHandle::new("avatar.png", "image/png", std::fs::read("avatar.png").unwrap_or_default());
    /// let outcome = handler.convert(Some(ImageSource::File(file))).await;
    /// println!("{}", outcome.url());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn convert(&self, source: Option<ImageSource>) -> UploadOutcome {
        let Some(source) = source else {
            log::debug!("🖼️ 未提供图片，直接使用占位图");
            return UploadOutcome::fallback("未提供图片");
        };

        match self.try_convert(source).await {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!(
                    "⚠️ 图片处理失败，使用占位图 - code={} stage={} err={}",
                    err.code(),
                    err.stage(),
                    err
                );
                UploadOutcome::fallback(err.to_string())
            }
        }
    }

    async fn try_convert(&self, source: ImageSource) -> Result<UploadOutcome, ImageError> {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        let encode_start = Instant::now();
        let data_uri = match source {
            ImageSource::File(file) => Self::encode_with_config(&file, &config)?,
            ImageSource::DataUri(data_uri) => data_uri,
        };
        let encode_elapsed = encode_start.elapsed();

        let compress_start = Instant::now();
        let compressed = Self::compress_with_config(
            data_uri,
            config.compress_quality,
            config.compress_max_width,
            config.clone(),
        )
        .await?;
        let compress_elapsed = compress_start.elapsed();

        let upload_start = Instant::now();
        let outcome = self.upload_with_config(&compressed, &config).await;
        let upload_elapsed = upload_start.elapsed();

        log::info!(
            "✅ 图片处理完成 - hosted={} encode={}ms compress={}ms upload={}ms total={}ms",
            outcome.is_hosted(),
            encode_elapsed.as_millis(),
            compress_elapsed.as_millis(),
            upload_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(outcome)
    }
}
