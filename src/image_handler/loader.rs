//! # 读取与编码模块
//!
//! ## 设计思路
//!
//! 统一处理“文件句柄 → Data URI”以及“Data URI → 原始字节”两个方向，
//! 并在尽可能早的阶段执行输入校验，减少不必要的内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - 文件句柄：体积限制 + 空文件检查 + MIME 判定（声明类型优先，缺失时按签名嗅探）。
//! - Data URI：前缀解析 + 解码前体积估算 + Base64 解码。
//! - 路径读取仅作为外层入口（CLI）使用，流水线核心只接触内存句柄。

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use std::path::Path;

use super::source::FileHandle;
use super::{ImageConfig, ImageError, ImageHandler};

const FALLBACK_MIME: &str = "application/octet-stream";

/// 解析后的 Data URI 视图。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DataUriParts<'a> {
    pub(crate) mime_type: &'a str,
    pub(crate) payload: &'a str,
}

impl ImageHandler {
    /// 将文件句柄完整读入内存并编码为 Data URI。
    ///
    /// 错误会原样返回给调用方，不在此处吞掉。
    pub async fn encode(&self, file: &FileHandle) -> Result<String, ImageError> {
        let config = self.config_snapshot()?;
        Self::encode_with_config(file, &config)
    }

    pub(super) fn encode_with_config(
        file: &FileHandle,
        config: &ImageConfig,
    ) -> Result<String, ImageError> {
        log::debug!("📁 开始编码文件 - 名称: {} 大小: {}B", file.name, file.bytes.len());

        if file.bytes.is_empty() {
            return Err(ImageError::Read(format!("文件内容为空：{}", file.name)));
        }

        if file.bytes.len() as u64 > config.max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                file.bytes.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let mime_type = Self::resolve_mime_type(file);
        let payload = general_purpose::STANDARD.encode(&file.bytes);

        Ok(format!("data:{};base64,{}", mime_type, payload))
    }

    /// 声明类型可用时直接使用，否则根据文件签名推断。
    fn resolve_mime_type(file: &FileHandle) -> String {
        let declared = file.mime_type.trim();
        if !declared.is_empty() && !declared.eq_ignore_ascii_case(FALLBACK_MIME) {
            return declared.to_ascii_lowercase();
        }

        infer::get(&file.bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| FALLBACK_MIME.to_string())
    }

    /// 拆分 `data:<mime>;base64,<payload>`。
    pub(crate) fn split_data_uri(data_uri: &str) -> Result<DataUriParts<'_>, ImageError> {
        let normalized = data_uri.trim();
        let rest = normalized
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::InvalidFormat("缺少 data: 前缀".to_string()))?;

        let (mime_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| ImageError::InvalidFormat("缺少 base64 标记".to_string()))?;

        if payload.is_empty() {
            return Err(ImageError::InvalidFormat("Data URI 内容为空".to_string()));
        }

        Ok(DataUriParts { mime_type, payload })
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ImageError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| ImageError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| ImageError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    /// 解析 Data URI 并在解码前按体积上限快速拒绝。
    pub(crate) fn decode_data_uri_with_limit(
        data_uri: &str,
        max_file_size: u64,
    ) -> Result<Vec<u8>, ImageError> {
        let parts = Self::split_data_uri(data_uri)?;

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(parts.payload)?;
        if estimated_len > max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(parts.payload)
            .map_err(|e| ImageError::Decode(format!("Base64 解码失败：{}", e)))
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片。
    pub(crate) fn validate_image_signature(bytes: &[u8]) -> Result<(), ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::InvalidFormat("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| ImageError::Decode("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImageError::Decode(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }
}

impl FileHandle {
    /// 从本地路径构建文件句柄（仅供 CLI 等外层入口使用）。
    pub async fn read_from_path(path: impl AsRef<Path>, config: &ImageConfig) -> Result<Self, ImageError> {
        let path = path.as_ref();
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ImageError::Read(format!("无法读取文件信息：{}", e)))?;

        if !metadata.is_file() {
            return Err(ImageError::Read(format!("不是普通文件：{}", path.display())));
        }

        if metadata.len() > config.max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ImageError::Read(format!("无法读取图片文件：{}", e)))?;

        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self::new(name, mime_type, Bytes::from(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::test_support::create_png_bytes;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[tokio::test]
    async fn encode_produces_data_uri_with_declared_mime() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");
        let png = create_png_bytes(4, 4);
        let file = FileHandle::new("a.png", "image/png", png.clone());

        let data_uri = handler.encode(&file).await.expect("encode should succeed");

        assert!(data_uri.starts_with("data:image/png;base64,"));
        let decoded = ImageHandler::decode_data_uri_with_limit(&data_uri, u64::MAX)
            .expect("roundtrip decode");
        assert_eq!(decoded, png);
    }

    #[tokio::test]
    async fn encode_sniffs_mime_when_declared_type_missing() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");
        let file = FileHandle::new("photo", "", create_png_bytes(2, 2));

        let data_uri = handler.encode(&file).await.expect("encode should succeed");

        assert!(data_uri.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn encode_rejects_empty_file_with_read_error() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");
        let file = FileHandle::new("empty.png", "image/png", Vec::new());

        assert!(matches!(handler.encode(&file).await, Err(ImageError::Read(_))));
    }

    #[tokio::test]
    async fn encode_rejects_oversized_file() {
        let mut config = ImageConfig::default();
        config.max_file_size = 16;
        let handler = ImageHandler::new(config).expect("handler init failed");
        let file = FileHandle::new("big.png", "image/png", vec![0u8; 64]);

        assert!(matches!(
            handler.encode(&file).await,
            Err(ImageError::ResourceLimit(_))
        ));
    }

    #[test]
    fn split_data_uri_extracts_mime_and_payload() {
        let parts = ImageHandler::split_data_uri(" data:image/jpeg;base64,QUJD ").expect("split");
        assert_eq!(parts.mime_type, "image/jpeg");
        assert_eq!(parts.payload, "QUJD");

        assert!(matches!(
            ImageHandler::split_data_uri("QUJD"),
            Err(ImageError::InvalidFormat(_))
        ));
        assert!(matches!(
            ImageHandler::split_data_uri("data:image/png,QUJD"),
            Err(ImageError::InvalidFormat(_))
        ));
        assert!(matches!(
            ImageHandler::split_data_uri("data:image/png;base64,"),
            Err(ImageError::InvalidFormat(_))
        ));
    }

    #[test]
    fn decode_data_uri_rejects_large_payload_before_decode() {
        let huge = format!("data:image/png;base64,{}", "A".repeat(1024 * 1024));
        let result = ImageHandler::decode_data_uri_with_limit(&huge, 32);

        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn signature_check_rejects_non_image_payload() {
        let result = ImageHandler::validate_image_signature(b"<html><body>nope</body></html>");
        assert!(matches!(result, Err(ImageError::Decode(_))));

        let png_signature = [137_u8, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13];
        assert!(ImageHandler::validate_image_signature(&png_signature).is_ok());
    }

    #[tokio::test]
    async fn read_from_path_reports_missing_file_as_read_error() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let missing = std::env::temp_dir().join(format!("customer-form-missing-{nanos}.png"));

        let result = FileHandle::read_from_path(&missing, &ImageConfig::default()).await;

        assert!(matches!(result, Err(ImageError::Read(_))));
    }

    #[tokio::test]
    async fn read_from_path_builds_handle_with_sniffed_mime() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("customer-form-read-{nanos}.png"));
        std::fs::write(&path, create_png_bytes(3, 3)).expect("write temp png");

        let handle = FileHandle::read_from_path(&path, &ImageConfig::default())
            .await
            .expect("read should succeed");

        assert_eq!(handle.mime_type, "image/png");
        assert!(handle.is_declared_image());
        assert!(handle.name.ends_with(".png"));
        let _ = std::fs::remove_file(path);
    }
}
