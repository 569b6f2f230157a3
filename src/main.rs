//! # 客户创建表单 — 命令行入口
//!
//! 本文件仅负责日志初始化、参数解析与组件装配。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use clap::{Arg, ArgAction, ArgMatches, Command};
use customer_form::error::AppError;
use customer_form::form::{FormController, HttpCustomerSubmitter, UploadState};
use customer_form::image_handler::{FileHandle, ImageService};
use customer_form::settings;
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("customer-form")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Create a customer record with an optional compressed, hosted photo")
        .arg(
            Arg::new("name")
                .long("name")
                .required(true)
                .help("Customer name"),
        )
        .arg(
            Arg::new("email")
                .long("email")
                .required(true)
                .help("Customer email"),
        )
        .arg(
            Arg::new("image")
                .long("image")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Photo to compress and upload"),
        )
        .arg(
            Arg::new("drop")
                .long("drop")
                .action(ArgAction::SetTrue)
                .help("Treat --image as a drag-and-drop (non-image files are ignored)"),
        )
        .arg(
            Arg::new("image-url")
                .long("image-url")
                .help("Use this image URL instead of uploading"),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Settings file (defaults to $CUSTOMER_FORM_SETTINGS or ./customer-form.json)"),
        )
        .arg(
            Arg::new("profile")
                .long("profile")
                .value_parser(["quality", "balanced", "speed"])
                .help("Compression profile override"),
        )
        .arg(
            Arg::new("submit")
                .long("submit")
                .action(ArgAction::SetTrue)
                .help("Post the form to the configured action URL instead of printing it"),
        )
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(cli().get_matches()).await {
        log::error!("❌ {err}");
        std::process::exit(1);
    }
}

async fn run(matches: ArgMatches) -> Result<(), AppError> {
    let settings_path = matches
        .get_one::<PathBuf>("settings")
        .cloned()
        .unwrap_or_else(settings::settings_file_path);
    let app_settings = settings::load_settings(&settings_path);
    let image_config = app_settings.image_config()?;

    let service = ImageService::with_config(image_config.clone())?;
    if let Some(profile) = matches.get_one::<String>("profile") {
        service.set_compression_profile(profile)?;
    }

    let mut controller =
        FormController::new(service).with_auto_upload(app_settings.auto_upload);

    if let Some(path) = matches.get_one::<PathBuf>("image") {
        let file = FileHandle::read_from_path(path, &image_config).await?;

        if matches.get_flag("drop") {
            if !controller.accept_drop(vec![file]).await {
                log::warn!("⚠️ 拖拽文件不是图片类型，已忽略: {}", path.display());
            }
        } else {
            controller.select_file(file).await;
        }

        if !app_settings.auto_upload {
            controller.upload_now().await;
        }
    }

    if let UploadState::Failed { message, .. } = controller.state() {
        log::warn!("⚠️ {message}");
    }

    if let Some(url) = matches.get_one::<String>("image-url") {
        controller.set_manual_url(url)?;
    }

    let name = matches.get_one::<String>("name").map(String::as_str).unwrap_or_default();
    let email = matches.get_one::<String>("email").map(String::as_str).unwrap_or_default();

    if matches.get_flag("submit") {
        let action_url = app_settings.form_action_url.clone().ok_or_else(|| {
            AppError::Settings(format!(
                "未配置表单动作地址（form_action_url 或 {}）",
                settings::FORM_ACTION_ENV
            ))
        })?;

        let submitter = HttpCustomerSubmitter::new(action_url)?;
        let response = controller.submit(&submitter, name, email).await?;
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        let submission = controller.submission(name, email)?;
        println!("{}", serde_json::to_string_pretty(&submission)?);
    }

    Ok(())
}
