//! # 压缩流水线模块
//!
//! ## 设计思路
//!
//! 将“Data URI → 图像 → 缩放 → JPEG → Data URI”的过程集中管理，
//! 并在关键节点增加资源上限控制。优先读取 header 尺寸，再进行完整解码。
//!
//! ## 实现思路
//!
//! 1. 解析 Data URI 并校验图片签名
//! 2. 按像素上限判断能否获取离屏画布
//! 3. 完整解码
//! 4. 宽度超过上限时按比例缩放（`fast_image_resize`，失败回退 `image::resize_exact`）
//! 5. 以指定质量重新编码为 JPEG
//!
//! CPU 密集部分放在阻塞线程池执行，不阻塞调用方的异步运行时。

use base64::{Engine as _, engine::general_purpose};
use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageBuffer, ImageEncoder, Rgb};
use std::io::Cursor;

use super::{ImageConfig, ImageError, ImageHandler};

/// 按最大宽度等比缩放后的目标尺寸。
///
/// 宽度不超过上限时原样返回；高度四舍五入且至少为 1。
pub(crate) fn fit_to_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }

    let scale = max_width as f64 / width as f64;
    let target_height = ((height as f64 * scale).round() as u32).max(1);
    (max_width, target_height)
}

/// `(0, 1]` 质量映射到 JPEG 的 `1..=100`。
fn jpeg_quality(quality: f32) -> Result<u8, ImageError> {
    if !(quality > 0.0 && quality <= 1.0) {
        return Err(ImageError::InvalidFormat(format!(
            "压缩质量必须在 (0, 1] 之间：{}",
            quality
        )));
    }

    Ok(((quality * 100.0).round() as u8).clamp(1, 100))
}

impl ImageHandler {
    /// 压缩 Data URI 图片：等比缩放到 `max_width` 以内并重新编码为 JPEG。
    pub async fn compress(
        &self,
        data_uri: &str,
        quality: f32,
        max_width: u32,
    ) -> Result<String, ImageError> {
        let config = self.config_snapshot()?;
        Self::compress_with_config(data_uri.to_string(), quality, max_width, config).await
    }

    pub(super) async fn compress_with_config(
        data_uri: String,
        quality: f32,
        max_width: u32,
        config: ImageConfig,
    ) -> Result<String, ImageError> {
        tokio::task::spawn_blocking(move || {
            Self::compress_blocking(&data_uri, quality, max_width, &config)
        })
        .await
        .map_err(|e| ImageError::Context(format!("压缩任务异常终止：{}", e)))?
    }

    fn compress_blocking(
        data_uri: &str,
        quality: f32,
        max_width: u32,
        config: &ImageConfig,
    ) -> Result<String, ImageError> {
        let quality = jpeg_quality(quality)?;
        if max_width == 0 {
            return Err(ImageError::InvalidFormat("最大宽度必须大于 0".to_string()));
        }

        let bytes = Self::decode_data_uri_with_limit(data_uri, config.max_file_size)?;
        Self::validate_image_signature(&bytes)?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&bytes)?;
        Self::acquire_raster_budget(config, header_width, header_height)?;

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

        let (raw_width, raw_height) = decoded.dimensions();
        let (target_width, target_height) = fit_to_width(raw_width, raw_height, max_width);
        Self::acquire_raster_budget(config, target_width, target_height)?;

        let rendered = if (target_width, target_height) == (raw_width, raw_height) {
            decoded.to_rgb8()
        } else {
            Self::render_scaled(&decoded, target_width, target_height, config.resize_filter)?
        };

        let jpeg = Self::encode_jpeg(&rendered, quality)?;

        log::info!(
            "✅ 图片压缩完成 - 原始尺寸: {}x{} 输出尺寸: {}x{} 质量: {} 体积: {}KB",
            raw_width,
            raw_height,
            target_width,
            target_height,
            quality,
            jpeg.len() / 1024
        );

        Ok(format!(
            "data:image/jpeg;base64,{}",
            general_purpose::STANDARD.encode(jpeg)
        ))
    }

    /// 仅通过内存中的图片头信息读取宽高。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
        let cursor = Cursor::new(bytes);
        let reader = image::ImageReader::new(cursor)
            .with_guessed_format()
            .map_err(|e| ImageError::Decode(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| ImageError::Decode(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验画布像素预算，超出视为无法获取离屏画布。
    fn acquire_raster_budget(config: &ImageConfig, width: u32, height: u32) -> Result<(), ImageError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ImageError::Context("画布像素数溢出".to_string()))?;

        if pixels == 0 {
            return Err(ImageError::Context("画布尺寸为 0".to_string()));
        }

        if pixels > config.max_decoded_pixels {
            return Err(ImageError::Context(format!(
                "画布像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    /// 在离屏 RGB 画布上按目标尺寸重绘。
    fn render_scaled(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: FilterType,
    ) -> Result<ImageBuffer<Rgb<u8>, Vec<u8>>, ImageError> {
        log::debug!(
            "🧩 缩放：{}x{} -> {}x{}（filter={:?}）",
            image.width(),
            image.height(),
            target_width,
            target_height,
            filter
        );

        match Self::resize_with_fast_image_resize(image, target_width, target_height, filter) {
            Ok(resized) => Ok(resized),
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}", err);
                Ok(image.resize_exact(target_width, target_height, filter).to_rgb8())
            }
        }
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: FilterType,
    ) -> Result<ImageBuffer<Rgb<u8>, Vec<u8>>, ImageError> {
        let src = image.to_rgb8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x3,
        )
        .map_err(|e| ImageError::Context(format!("构建源画布失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x3);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(
            Self::to_fast_filter(filter),
        ));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ImageError::Context(format!("fast_image_resize 执行失败：{}", e)))?;

        ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
            .ok_or_else(|| ImageError::Context("缩放输出缓冲长度异常".to_string()))
    }

    fn to_fast_filter(filter: FilterType) -> fr::FilterType {
        match filter {
            FilterType::Nearest => fr::FilterType::Box,
            FilterType::Triangle => fr::FilterType::Bilinear,
            FilterType::CatmullRom => fr::FilterType::CatmullRom,
            FilterType::Gaussian => fr::FilterType::Mitchell,
            FilterType::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }

    fn encode_jpeg(rgb: &ImageBuffer<Rgb<u8>, Vec<u8>>, quality: u8) -> Result<Vec<u8>, ImageError> {
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality)
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .map_err(|e| ImageError::Context(format!("JPEG 编码失败：{}", e)))?;
        Ok(buf)
    }
}
