//! OSディスパッチャ
//!
//! プラットフォーム実装はコンパイル時に選択され、どのOSでも同じ
//! インターフェース（デバイス発見とプロバイダ生成）を提供する。

use std::sync::Arc;
use tracing::info;

use blade_common::{BleServiceProvider, ClassicServiceProvider, DeviceRecord};

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        mod windows;
        use self::windows as platform;
    } else {
        mod unsupported;
        use unsupported as platform;
    }
}

/// サービス問い合わせプロバイダ一式
pub struct Providers {
    pub classic: Arc<dyn ClassicServiceProvider>,
    pub ble: Arc<dyn BleServiceProvider>,
}

/// 起動時に一度だけ行うペアリング済みデバイスの発見
///
/// Windows以外では空のデバイスセットを返す。エラーにはしない。
pub async fn discover_paired_devices() -> Vec<DeviceRecord> {
    let devices = platform::paired_devices().await;
    info!(
        "Device discovery complete. {} device(s) in the active set",
        devices.len()
    );
    devices
}

/// プラットフォームのサービス問い合わせプロバイダを生成
pub fn create_providers() -> Providers {
    platform::create_providers()
}
