//! BLADE HTTPサーバー
//!
//! ペアリング済みBluetoothデバイスのサービス情報をHTTPで公開する。

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use std::env;
use std::fs;
use std::sync::Arc;

use blade_common::{
    api::{device_services, health, list_devices},
    AppState, DeviceRegistry, Settings, VERSION,
};

mod bluetooth_impl;
mod platform;

use platform::Platform;

/// BLADE: Bluetooth Link Access and Data Exchange サーバー
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// ログレベル設定 (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 詳細ログ出力（debugレベル）
    #[arg(short, long)]
    verbose: bool,

    /// 静かなモード（エラーのみ表示）
    #[arg(short, long)]
    quiet: bool,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 実行ディレクトリを取得
    let exe_path = env::current_exe()?;
    let exe_dir = exe_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Failed to get executable directory"))?;

    // logsディレクトリを作成
    let logs_dir = exe_dir.join("logs");
    fs::create_dir_all(&logs_dir)?;

    // ログファイルのパスを生成（日時付き）
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_file_path = logs_dir.join(format!("blade-{}.log", timestamp));

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    // ログレベルを決定
    let log_level = if args.quiet {
        Level::ERROR
    } else if args.verbose {
        Level::DEBUG
    } else {
        match args.log_level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        }
    };

    let env_filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into());

    // ログ初期化（コンソールとファイルの両方に出力）
    let file_layer = fmt::layer().with_writer(file).with_ansi(false);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(env_filter)
        .init();

    info!("Log file: {}", log_file_path.display());

    const BUILD_NUMBER: &str = env!("BUILD_NUMBER");
    info!(
        "HTTP Bluetooth server starting (version {}, build #{})",
        VERSION, BUILD_NUMBER
    );

    // プラットフォーム初期化
    Platform::initialize().await?;

    // Bluetoothラジオの確認（無くても起動は続行、デバイスセットが空になるだけ）
    if !Platform::check_bluetooth_available().await {
        warn!("Bluetooth radio is not available; the active device set will be empty");
    }

    // 設定読み込み
    let settings = Settings::new()?;
    settings.validate()?;

    let bind_address = format!("{}:{}", settings.server.host, settings.server.port);

    // 起動時に一度だけデバイスを発見し、不変スナップショットを構築する
    let devices = bluetooth_impl::discover_paired_devices().await;
    for device in &devices {
        info!("Device: {}, Type: {}", device.friendly_name, device.device_type);
    }
    let registry = Arc::new(DeviceRegistry::from_devices(devices));

    // 公開ルートを記録
    for device in registry.iter() {
        info!(
            "Exposed device: {} - http://{}/{}/services",
            device.friendly_name,
            bind_address,
            device.mac.to_string().replace(':', "-")
        );
    }

    let providers = bluetooth_impl::create_providers();
    let app_state = web::Data::new(AppState {
        registry,
        classic: providers.classic,
        ble: providers.ble,
        include_characteristics: settings.bluetooth.include_characteristics,
    });

    // シャットダウンハンドラーの設定
    let shutdown_receiver = Platform::setup_shutdown_handler().await?;

    // HTTPサーバー構築
    let cors_origins = settings.api.cors_origins.clone();
    let mut server = HttpServer::new(move || {
        let cors = if cors_origins.contains(&"*".to_string()) {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
        } else {
            let mut cors = Cors::default();
            for origin in &cors_origins {
                cors = cors.allowed_origin(origin);
            }
            cors.allow_any_method().allow_any_header()
        };

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .route("/health", web::get().to(health))
            .route("/devices", web::get().to(list_devices))
            .route("/{device_id}/services", web::get().to(device_services))
    });

    if let Some(workers) = settings.server.workers {
        server = server.workers(workers);
    }
    let server = server.bind(&bind_address)?.run();

    info!("HTTP Bluetooth server started at http://{}", bind_address);

    // サーバーとシグナルハンドラーを並行実行
    tokio::select! {
        result = server => {
            result?;
        }
        _ = shutdown_receiver.wait() => {
            info!("Received shutdown signal, server shutting down gracefully");
        }
    }

    Ok(())
}
