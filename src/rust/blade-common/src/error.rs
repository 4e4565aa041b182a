//! 共通エラー型定義

use thiserror::Error;

/// BLADE共通エラー型
#[derive(Debug, Error)]
pub enum BladeError {
    /// Bluetooth関連エラー
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),

    /// デバイスが見つからない
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// 接続拒否（デバイスに到達できない）
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    /// クエリ中に切断された
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// プロトコルエラー（GATT/SDP応答の異常）
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// タイムアウト
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// アドレス等のパースエラー
    #[error("Parse error: {0}")]
    Parse(String),

    /// 設定エラー
    #[error("Configuration error: {0}")]
    Config(String),

    /// プラットフォーム固有エラー
    #[error("Platform specific error: {0}")]
    Platform(String),

    /// 未実装（非Windowsのサービス問い合わせ）
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// IO エラー
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON パースエラー
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// UTF-8変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result型のエイリアス
pub type Result<T> = std::result::Result<T, BladeError>;

// Note: Windows APIエラーの変換はプラットフォーム実装側で手動で行う

impl BladeError {
    /// HTTPステータスコードを返す
    pub fn status_code(&self) -> u16 {
        match self {
            BladeError::DeviceNotFound(_) => 404,
            BladeError::NotImplemented(_) => 501,
            BladeError::ConnectionRefused(_)
            | BladeError::Disconnected(_)
            | BladeError::Protocol(_)
            | BladeError::Timeout(_)
            | BladeError::Bluetooth(_) => 500,
            BladeError::Parse(_)
            | BladeError::Config(_)
            | BladeError::Platform(_) => 500,
            BladeError::Io(_) | BladeError::Json(_) | BladeError::Utf8(_) => 500,
        }
    }

    /// エラーコードを返す（ログ用）
    pub fn error_code(&self) -> &str {
        match self {
            BladeError::Bluetooth(_) => "BLUETOOTH_ERROR",
            BladeError::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
            BladeError::ConnectionRefused(_) => "CONNECTION_REFUSED",
            BladeError::Disconnected(_) => "DISCONNECTED",
            BladeError::Protocol(_) => "PROTOCOL_ERROR",
            BladeError::Timeout(_) => "TIMEOUT",
            BladeError::Parse(_) => "PARSE_ERROR",
            BladeError::Config(_) => "CONFIG_ERROR",
            BladeError::Platform(_) => "PLATFORM_ERROR",
            BladeError::NotImplemented(_) => "NOT_IMPLEMENTED",
            BladeError::Io(_) => "IO_ERROR",
            BladeError::Json(_) => "JSON_ERROR",
            BladeError::Utf8(_) => "UTF8_ERROR",
        }
    }
}
