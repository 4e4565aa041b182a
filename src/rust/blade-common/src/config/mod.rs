//! 共通設定管理モジュール

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{BladeError, Result};

/// サーバー設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// バインドするホストアドレス
    pub host: String,

    /// ポート番号
    pub port: u16,

    /// ワーカースレッド数
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

/// Bluetooth設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BluetoothConfig {
    /// BLE問い合わせでキャラクタリスティックまで列挙するか
    /// （クエリパラメータ未指定時のデフォルト）
    pub include_characteristics: bool,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        BluetoothConfig {
            include_characteristics: false,
        }
    }
}

/// ロギング設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// ログレベル
    pub level: String,

    /// ログ出力先
    pub output: String,

    /// ログファイルパス（ファイル出力の場合）
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            output: "stdout".to_string(),
            file_path: None,
        }
    }
}

/// API設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// CORS許可オリジン
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// サーバー設定
    pub server: ServerConfig,

    /// Bluetooth設定
    pub bluetooth: BluetoothConfig,

    /// ロギング設定
    pub logging: LoggingConfig,

    /// API設定
    pub api: ApiConfig,
}

impl Settings {
    /// 設定を読み込む
    ///
    /// 読み込み優先順位：
    /// 1. 環境変数
    /// 2. 設定ファイル（指定された場合）
    /// 3. デフォルト値
    pub fn new() -> Result<Self> {
        let mut settings = Self::default();

        // 設定ファイルパスを環境変数から取得
        if let Ok(config_path) = env::var("CONFIG_FILE") {
            settings = Self::from_file(&config_path)?;
        }

        // 環境変数で上書き
        settings.override_from_env();

        Ok(settings)
    }

    /// 設定ファイルから読み込む
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BladeError::Config(format!("Failed to read config file: {}", e)))?;

        // JSON形式
        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .map_err(|e| BladeError::Config(format!("Failed to parse JSON config: {}", e)))
        }
        // TOML形式
        else if path.ends_with(".toml") {
            toml::from_str(&content)
                .map_err(|e| BladeError::Config(format!("Failed to parse TOML config: {}", e)))
        }
        // YAML形式
        else if path.ends_with(".yaml") || path.ends_with(".yml") {
            serde_yaml::from_str(&content)
                .map_err(|e| BladeError::Config(format!("Failed to parse YAML config: {}", e)))
        } else {
            Err(BladeError::Config(
                "Unsupported config file format".to_string(),
            ))
        }
    }

    /// 環境変数で設定を上書き
    fn override_from_env(&mut self) {
        // サーバー設定
        if let Ok(host) = env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(workers) = env::var("WORKERS") {
            if let Ok(workers) = workers.parse() {
                self.server.workers = Some(workers);
            }
        }

        // Bluetooth設定
        if let Ok(include) = env::var("INCLUDE_CHARACTERISTICS") {
            self.bluetooth.include_characteristics =
                include.to_lowercase() == "true" || include == "1";
        }

        // ロギング設定
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.logging.level = log_level;
        }
        if let Ok(log_output) = env::var("LOG_OUTPUT") {
            self.logging.output = log_output;
        }
        if let Ok(log_file) = env::var("LOG_FILE") {
            self.logging.file_path = Some(log_file);
        }

        // API設定
        if let Ok(cors_origins) = env::var("CORS_ORIGINS") {
            self.api.cors_origins = cors_origins
                .split(',')
                .map(|s| s.trim().to_string())
                .collect();
        }
    }

    /// 設定を検証
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(BladeError::Config("Invalid port number: 0".to_string()));
        }

        if self.api.cors_origins.is_empty() {
            return Err(BladeError::Config(
                "At least one CORS origin is required".to_string(),
            ));
        }

        Ok(())
    }
}
