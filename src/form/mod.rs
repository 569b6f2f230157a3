//! # 客户创建表单（form）
//!
//! 无界面的表单核心：图片状态机、隐藏字段 `image_url`、提交门控与服务端字段错误展示。
//!
//! - `state`：`UploadState` 状态枚举与上传凭据
//! - `controller`：`FormController`，把文件选择 / 拖拽 / 手动地址接到图片流水线
//! - `submission`：提交载荷、响应结构与 `CustomerSubmitter` 协作接口

mod controller;
mod state;
mod submission;

pub use controller::FormController;
pub use state::{UploadState, UploadTicket, UrlOrigin};
pub use submission::{
    CustomerSubmission, CustomerSubmitter, FieldErrors, HttpCustomerSubmitter, SubmitResponse,
};
