//! デバイスレコードとアクティブデバイスセット

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::address::BtAddress;

/// デバイス種別
///
/// 列挙時に一度だけ決まり、以後のサービス問い合わせ経路を固定する。
/// リクエスト毎に再判定されることはない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    Classic,
    #[serde(rename = "BLE")]
    Ble,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Classic => write!(f, "Classic"),
            DeviceType::Ble => write!(f, "BLE"),
        }
    }
}

/// ペアリング済みデバイスのレコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Bluetoothアドレス（正規形）
    pub mac: BtAddress,

    /// OS/ドライバ層が報告する表示名
    #[serde(rename = "friendlyName")]
    pub friendly_name: String,

    /// デバイス種別
    #[serde(rename = "type")]
    pub device_type: DeviceType,
}

/// アクティブデバイスセット
///
/// 起動時に一度だけ構築される不変スナップショット。以後の追加・
/// 削除・更新は行われず、リクエスト処理は参照のみ。
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: HashMap<BtAddress, DeviceRecord>,
}

impl DeviceRegistry {
    /// 列挙結果からスナップショットを構築
    ///
    /// 入力が同一MACを複数含む場合は後勝ち。
    pub fn from_devices(devices: Vec<DeviceRecord>) -> Self {
        let mut map = HashMap::with_capacity(devices.len());
        for device in devices {
            map.insert(device.mac, device);
        }
        DeviceRegistry { devices: map }
    }

    pub fn get(&self, mac: &BtAddress) -> Option<&DeviceRecord> {
        self.devices.get(mac)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mac: &str, name: &str, device_type: DeviceType) -> DeviceRecord {
        DeviceRecord {
            mac: BtAddress::parse(mac).unwrap(),
            friendly_name: name.to_string(),
            device_type,
        }
    }

    #[test]
    fn test_lookup_by_normalized_address() {
        let registry = DeviceRegistry::from_devices(vec![record(
            "AA:BB:CC:DD:EE:FF",
            "Headset",
            DeviceType::Classic,
        )]);

        // パス区切りの揺れはBtAddress::parseで吸収される
        let key = BtAddress::parse("aa-bb-cc-dd-ee-ff").unwrap();
        let found = registry.get(&key).unwrap();
        assert_eq!(found.friendly_name, "Headset");
        assert_eq!(found.device_type, DeviceType::Classic);
    }

    #[test]
    fn test_last_record_wins_on_duplicate_mac() {
        let registry = DeviceRegistry::from_devices(vec![
            record("AA:BB:CC:DD:EE:FF", "First", DeviceType::Ble),
            record("AA:BB:CC:DD:EE:FF", "Second", DeviceType::Classic),
        ]);

        assert_eq!(registry.len(), 1);
        let key = BtAddress::parse("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(registry.get(&key).unwrap().friendly_name, "Second");
    }

    #[test]
    fn test_device_type_serialization() {
        assert_eq!(
            serde_json::to_string(&DeviceType::Classic).unwrap(),
            "\"Classic\""
        );
        assert_eq!(serde_json::to_string(&DeviceType::Ble).unwrap(), "\"BLE\"");
    }
}
