//! 共通APIモデル定義

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::bluetooth::{
    BleCharacteristicRecord, BleServiceRecord, ClassicServiceRecord, ProfileDescriptor,
};
use crate::devices::DeviceRecord;
use crate::uuid_names;

/// リクエスト時刻（UTC、秒精度）
pub fn request_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// /{device_id}/services のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct ServicesQuery {
    /// BLEデバイスでキャラクタリスティックまで列挙するか
    pub characteristics: Option<bool>,
}

/// Classicデバイスのサービス一覧レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassicServicesResponse {
    pub request_type: String,
    pub request_time: String,
    pub total_services_found: usize,
    pub services: Vec<ClassicServiceInfo>,
}

impl ClassicServicesResponse {
    pub fn from_records(records: Vec<ClassicServiceRecord>) -> Self {
        let services: Vec<ClassicServiceInfo> =
            records.into_iter().map(ClassicServiceInfo::from).collect();
        ClassicServicesResponse {
            request_type: "GET".to_string(),
            request_time: request_timestamp(),
            total_services_found: services.len(),
            services,
        }
    }
}

/// Classicサービス情報
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassicServiceInfo {
    pub name: Option<String>,
    pub description: String,
    pub provider: Option<String>,
    pub protocol: Option<String>,
    pub port: Option<u32>,
    pub service_classes: Vec<String>,
    pub profiles: Vec<ProfileInfo>,
    pub profile_count: usize,
}

impl From<ClassicServiceRecord> for ClassicServiceInfo {
    fn from(record: ClassicServiceRecord) -> Self {
        let service_classes = record
            .service_class_ids
            .iter()
            .map(|uuid| uuid_names::service_name(uuid))
            .collect();
        let profiles: Vec<ProfileInfo> =
            record.profiles.into_iter().map(ProfileInfo::from).collect();

        ClassicServiceInfo {
            name: record.name,
            description: record.description,
            provider: record.provider,
            protocol: record.protocol,
            port: record.port,
            service_classes,
            profile_count: profiles.len(),
            profiles,
        }
    }
}

/// プロファイル情報
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub profile_id: String,
    pub profile_size: usize,
}

impl From<ProfileDescriptor> for ProfileInfo {
    fn from(profile: ProfileDescriptor) -> Self {
        ProfileInfo {
            profile_id: uuid_names::service_name(&profile.id),
            // バージョン要素のバイト長、裸の識別子なら0
            profile_size: profile.version.as_ref().map(Vec::len).unwrap_or(0),
        }
    }
}

/// BLEデバイスのサービス一覧レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct BleServicesResponse {
    pub request_type: String,
    pub request_time: String,
    pub services: Vec<BleServiceInfo>,
}

impl BleServicesResponse {
    pub fn from_records(records: Vec<BleServiceRecord>) -> Self {
        BleServicesResponse {
            request_type: "GET".to_string(),
            request_time: request_timestamp(),
            services: records.into_iter().map(BleServiceInfo::from).collect(),
        }
    }
}

/// BLEサービス情報
#[derive(Debug, Serialize, Deserialize)]
pub struct BleServiceInfo {
    pub uuid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characteristics: Option<Vec<CharacteristicInfo>>,
}

impl From<BleServiceRecord> for BleServiceInfo {
    fn from(record: BleServiceRecord) -> Self {
        BleServiceInfo {
            name: uuid_names::service_name(&record.uuid),
            uuid: record.uuid,
            characteristics: record.characteristics.map(|chars| {
                chars.into_iter().map(CharacteristicInfo::from).collect()
            }),
        }
    }
}

/// GATTキャラクタリスティック情報
#[derive(Debug, Serialize, Deserialize)]
pub struct CharacteristicInfo {
    pub uuid: String,
    pub name: String,
    pub properties: Vec<String>,
}

impl From<BleCharacteristicRecord> for CharacteristicInfo {
    fn from(record: BleCharacteristicRecord) -> Self {
        CharacteristicInfo {
            name: uuid_names::service_name(&record.uuid),
            uuid: record.uuid,
            properties: record.properties,
        }
    }
}

/// /devices レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub count: usize,
    pub devices: Vec<DeviceRecord>,
}
