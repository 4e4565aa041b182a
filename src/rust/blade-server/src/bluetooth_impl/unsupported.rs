//! 非Windowsプラットフォームのスタブ実装

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use blade_common::{
    BladeError, BleServiceProvider, BleServiceRecord, BtAddress, ClassicServiceProvider,
    ClassicServiceRecord, DeviceRecord, Result,
};

/// デバイス発見は未実装、常に空のデバイスセットを返す
pub async fn paired_devices() -> Vec<DeviceRecord> {
    match std::env::consts::OS {
        "linux" => info!("Device discovery on Linux is not yet implemented."),
        "macos" => info!("Device discovery on macOS is not yet implemented."),
        os => info!("Operating system {} is not supported for device discovery.", os),
    }
    Vec::new()
}

pub fn create_providers() -> super::Providers {
    super::Providers {
        classic: Arc::new(UnsupportedProvider),
        ble: Arc::new(UnsupportedProvider),
    }
}

/// 未実装プラットフォームのプロバイダ
///
/// デバイスセットが常に空なのでHTTP経路からは到達しない。
struct UnsupportedProvider;

#[async_trait]
impl ClassicServiceProvider for UnsupportedProvider {
    async fn browse_services(&self, address: BtAddress) -> Result<Vec<ClassicServiceRecord>> {
        Err(BladeError::NotImplemented(format!(
            "SDP browse for {} on {}",
            address,
            std::env::consts::OS
        )))
    }
}

#[async_trait]
impl BleServiceProvider for UnsupportedProvider {
    async fn discover_services(
        &self,
        address: BtAddress,
        _with_characteristics: bool,
    ) -> Result<Vec<BleServiceRecord>> {
        Err(BladeError::NotImplemented(format!(
            "GATT discovery for {} on {}",
            address,
            std::env::consts::OS
        )))
    }
}
