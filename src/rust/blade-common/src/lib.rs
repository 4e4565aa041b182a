//! BLADE共通ライブラリ
//!
//! HTTP層とプラットフォーム実装の間で共有されるコードを提供

pub mod address;
pub mod api;
pub mod bluetooth;
pub mod config;
pub mod devices;
pub mod enumerator;
pub mod error;
pub mod sdp;
pub mod uuid_names;

// バージョン情報
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

// 主要な型の再エクスポート
pub use address::BtAddress;
pub use api::AppState;
pub use bluetooth::{
    BleCharacteristicRecord,
    BleServiceProvider,
    BleServiceRecord,
    ClassicServiceProvider,
    ClassicServiceRecord,
    ProfileDescriptor,
};
pub use config::Settings;
pub use devices::{DeviceRecord, DeviceRegistry, DeviceType};
pub use error::{BladeError, Result};

/// プラットフォーム情報
pub fn platform_info() -> PlatformInfo {
    PlatformInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        family: std::env::consts::FAMILY.to_string(),
    }
}

/// プラットフォーム情報構造体
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    pub os: String,
    pub arch: String,
    pub family: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!NAME.is_empty());
    }

    #[test]
    fn test_platform_info() {
        let info = platform_info();
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
    }
}
