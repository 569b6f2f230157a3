//! # 表单控制器
//!
//! ## 设计思路
//!
//! 控制器持有唯一的 `UploadState`，由用户输入与流水线完成事件驱动迁移：
//!
//! ```text
//! Idle ──选择/拖拽──▶ Previewing ──自动/手动──▶ Uploading ──Hosted──▶ Uploaded
//!   ▲                                              │
//!   │                                              └──Fallback──▶ Failed（占位图）
//!   └──────────────────── remove ─────────────────────────────────────┘
//! ```
//!
//! 手动地址与上传结果写入同一个状态槽，后写者生效。
//! 清空手动地址时回到填写前的状态（保留已选文件与预览）。
//!
//! ## 实现思路
//!
//! - 上传拆为 `begin_upload` / `finish_upload`，`upload_now` 串联二者。
//! - 不取消进行中的上传：过期凭据的结果仍会写入状态（仅记录 debug 日志）。
//! - 上传进行中禁止提交，也禁止填写手动地址，保证隐藏字段已是最终值。

use crate::error::AppError;
use crate::image_handler::{FileHandle, ImagePipeline, ImageSource, UploadOutcome, is_web_url};

use super::state::{UploadState, UploadTicket, UrlOrigin};
use super::submission::{CustomerSubmission, CustomerSubmitter, FieldErrors, SubmitResponse};

/// 客户创建表单的图片控制器。
pub struct FormController<P: ImagePipeline> {
    pipeline: P,
    state: UploadState,
    auto_upload: bool,
    last_ticket: u64,
    field_errors: FieldErrors,
    /// 手动地址覆盖前的状态，清空手动地址时恢复。
    before_manual: Option<UploadState>,
}

impl<P: ImagePipeline> FormController<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            state: UploadState::Idle,
            auto_upload: true,
            last_ticket: 0,
            field_errors: FieldErrors::default(),
            before_manual: None,
        }
    }

    /// 是否在选择文件后自动上传（默认开启）。
    pub fn with_auto_upload(mut self, auto_upload: bool) -> Self {
        self.auto_upload = auto_upload;
        self
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// 服务端最近一次返回的字段错误，仅供展示。
    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    fn transition(&mut self, next: UploadState) {
        log::debug!("🔁 表单图片状态：{} -> {}", self.state.name(), next.name());
        if !is_manual(&next) {
            self.before_manual = None;
        }
        self.state = next;
    }

    /// 通过文件选择器选中文件：生成本地预览，必要时自动上传。
    pub async fn select_file(&mut self, file: FileHandle) {
        match self.pipeline.preview(&file).await {
            Ok(preview) => {
                self.transition(UploadState::Previewing { file, preview });
                if self.auto_upload {
                    self.upload_now().await;
                }
            }
            Err(err) => {
                log::warn!("⚠️ 预览生成失败 - 文件: {} err={}", file.name, err);
                self.transition(UploadState::Failed {
                    message: format!("无法读取图片：{}", err),
                    file: None,
                    preview: None,
                });
            }
        }
    }

    /// 拖拽投放：只接受声明类型以 `image/` 开头的文件，其余静默忽略。
    ///
    /// 返回是否有文件进入了处理流程。
    pub async fn accept_drop(&mut self, files: Vec<FileHandle>) -> bool {
        let Some(file) = files.into_iter().find(FileHandle::is_declared_image) else {
            log::debug!("🚫 拖拽内容不含图片，已忽略");
            return false;
        };

        self.select_file(file).await;
        true
    }

    /// 开始一次上传。没有可上传文件或已有上传在进行时返回 `None`。
    pub fn begin_upload(&mut self) -> Option<UploadTicket> {
        let (file, preview) = match &self.state {
            UploadState::Previewing { file, preview } => (file.clone(), preview.clone()),
            UploadState::Failed {
                file: Some(file),
                preview,
                ..
            } => (file.clone(), preview.clone().unwrap_or_default()),
            _ => return None,
        };

        self.last_ticket += 1;
        let ticket = UploadTicket {
            id: self.last_ticket,
            file: file.clone(),
            preview: preview.clone(),
        };

        self.transition(UploadState::Uploading {
            file,
            preview,
            ticket: ticket.id,
        });

        Some(ticket)
    }

    /// 写入上传结果。过期凭据的结果同样写入。
    pub fn finish_upload(&mut self, ticket: UploadTicket, outcome: UploadOutcome) {
        let current = match &self.state {
            UploadState::Uploading { ticket: current, .. } => Some(*current),
            _ => None,
        };
        if current != Some(ticket.id) {
            log::debug!(
                "⏳ 收到过期上传结果 - ticket={} current={:?}，按最新写入处理",
                ticket.id,
                current
            );
        }

        let preview = (!ticket.preview.is_empty()).then_some(ticket.preview);
        let next = match outcome {
            UploadOutcome::Hosted(url) => UploadState::Uploaded {
                url,
                origin: UrlOrigin::Upload,
                preview,
            },
            UploadOutcome::Fallback { reason } => UploadState::Failed {
                message: format!("图片上传失败，已使用占位图：{}", reason),
                file: Some(ticket.file),
                preview,
            },
        };

        self.transition(next);
    }

    /// “立即上传”：串联 `begin_upload` → 流水线 `convert` → `finish_upload`。
    pub async fn upload_now(&mut self) -> bool {
        let Some(ticket) = self.begin_upload() else {
            return false;
        };

        let outcome = self
            .pipeline
            .convert(Some(ImageSource::File(ticket.file.clone())))
            .await;
        self.finish_upload(ticket, outcome);
        true
    }

    /// 移除已选图片，回到初始状态。
    pub fn remove(&mut self) {
        self.transition(UploadState::Idle);
    }

    /// 手动填写图片地址，绕过流水线直接写入隐藏字段。
    ///
    /// 空输入撤销手动地址，恢复填写前的状态（已选文件、预览与上传结果保留）；
    /// 没有手动地址时为空操作。非 http/https 地址或上传进行中时被拒绝且状态不变。
    pub fn set_manual_url(&mut self, input: &str) -> Result<(), AppError> {
        let url = input.trim();
        if url.is_empty() {
            if is_manual(&self.state) {
                let restored = self.before_manual.take().unwrap_or_default();
                self.transition(restored);
            }
            return Ok(());
        }

        if self.state.is_uploading() {
            return Err(AppError::Form("图片上传中，请等待上传结束后再填写地址".to_string()));
        }

        if !is_web_url(url) {
            return Err(AppError::Form(format!("图片地址必须是 http/https 链接：{}", url)));
        }

        let previous = if is_manual(&self.state) {
            self.before_manual.take()
        } else {
            Some(self.state.clone())
        };

        self.transition(UploadState::Uploaded {
            url: url.to_string(),
            origin: UrlOrigin::Manual,
            preview: None,
        });
        self.before_manual = previous;
        Ok(())
    }

    /// 隐藏字段 `image_url` 的值。
    pub fn hidden_image_url(&self) -> &str {
        self.state.image_url()
    }

    /// 提交按钮是否可用。
    pub fn can_submit(&self) -> bool {
        !self.state.is_uploading()
    }

    /// 组装提交载荷。上传进行中时拒绝。
    pub fn submission(&self, name: &str, email: &str) -> Result<CustomerSubmission, AppError> {
        if !self.can_submit() {
            return Err(AppError::Form("图片上传中，请稍后提交".to_string()));
        }

        Ok(CustomerSubmission {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            image_url: self.hidden_image_url().to_string(),
        })
    }

    /// 提交表单并保存服务端返回的字段错误。
    pub async fn submit<S: CustomerSubmitter>(
        &mut self,
        submitter: &S,
        name: &str,
        email: &str,
    ) -> Result<SubmitResponse, AppError> {
        let submission = self.submission(name, email)?;
        let response = submitter.submit(&submission).await?;

        if !response.errors.is_empty() {
            log::info!("📝 服务端返回字段错误：{:?}", response.errors);
        }
        self.field_errors = response.errors.clone();

        Ok(response)
    }
}

fn is_manual(state: &UploadState) -> bool {
    matches!(
        state,
        UploadState::Uploaded {
            origin: UrlOrigin::Manual,
            ..
        }
    )
}
