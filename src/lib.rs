//! # 客户创建表单 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            调用方（界面层 / CLI / 测试）                   │
//! │     文件选择 · 拖拽投放 · 手动地址 · 提交按钮              │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  ┌─ form ─────── FormController（UploadState 状态机）      │
//! │  │   ├─ state        Idle/Previewing/Uploading/...        │
//! │  │   └─ submission   name · email · image_url → 服务端    │
//! │  │                                                       │
//! │  ├─ image_handler  编码 → 压缩 → 上传 → 失败回退占位图     │
//! │  ├─ settings       JSON 设置 + 环境变量覆盖               │
//! │  └─ error          AppError (统一错误类型)                │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ HTTPS multipart
//!   图床 API（api.imgbb.com）· 表单处理端
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`image_handler`] | 图片读取编码、等比压缩、图床上传与占位图回退 |
//! | [`form`] | 表单图片状态机、隐藏字段、提交门控与字段错误展示 |
//! | [`settings`] | 设置文件读写与环境变量覆盖 |

pub mod error;
pub mod form;
pub mod image_handler;
pub mod settings;
