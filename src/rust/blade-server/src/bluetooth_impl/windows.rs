//! Windows固有のBluetooth実装
//!
//! デバイス発見はドライバ列挙ユーティリティの出力スクレイピング、
//! サービス問い合わせはWinRTのBluetooth APIに委譲する。

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use windows::{
    Devices::Bluetooth::{
        BluetoothCacheMode, BluetoothDevice, BluetoothError, BluetoothLEDevice,
        GenericAttributeProfile::{
            GattCharacteristicProperties, GattCommunicationStatus, GattDeviceService,
        },
        Rfcomm::RfcommDeviceService,
    },
    Storage::Streams::{DataReader, IBuffer},
    core::GUID,
};

use blade_common::{
    enumerator, sdp, BladeError, BleCharacteristicRecord, BleServiceProvider, BleServiceRecord,
    BtAddress, ClassicServiceProvider, ClassicServiceRecord, DeviceRecord, Result,
};

/// ドライバ列挙ユーティリティへ渡すクエリ
const DRIVER_QUERY: &str = "Get-WmiObject -Class Win32_PnPSignedDriver | \
    Where-Object {$_.DeviceName -like '*Bluetooth*'} | \
    Select-Object DeviceID, FriendlyName, DeviceName | Format-List";

/// Windows Errorを BladeErrorに変換
fn windows_error_to_blade_error(err: windows::core::Error) -> BladeError {
    BladeError::Bluetooth(format!("Windows API error: {}", err.message()))
}

/// ペアリング済みデバイスの発見
///
/// コマンドの起動失敗・異常終了・空出力はいずれも空のデバイスセット。
/// リトライはしない。
pub async fn paired_devices() -> Vec<DeviceRecord> {
    info!("Searching for paired devices on Windows...");

    let output = match tokio::process::Command::new("powershell")
        .args(["-NoProfile", "-Command", DRIVER_QUERY])
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            warn!("Driver enumeration command failed to start: {}", e);
            return Vec::new();
        }
    };

    if !output.status.success() {
        warn!("Driver enumeration command exited with {}", output.status);
        return Vec::new();
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let devices = enumerator::dedup_by_mac(enumerator::parse_driver_listing(&text));
    info!("Paired devices found: {}", devices.len());
    devices
}

pub fn create_providers() -> super::Providers {
    super::Providers {
        classic: Arc::new(WindowsClassicProvider),
        ble: Arc::new(WindowsBleProvider),
    }
}

/// GUIDを文字列にフォーマット
fn format_guid(guid: &GUID) -> String {
    format!(
        "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        guid.data1,
        guid.data2,
        guid.data3,
        guid.data4[0],
        guid.data4[1],
        guid.data4[2],
        guid.data4[3],
        guid.data4[4],
        guid.data4[5],
        guid.data4[6],
        guid.data4[7]
    )
}

/// IBufferをバイト列へ読み出す
fn buffer_to_bytes(buffer: &IBuffer) -> Result<Vec<u8>> {
    let reader = DataReader::FromBuffer(buffer).map_err(windows_error_to_blade_error)?;
    let length = reader
        .UnconsumedBufferLength()
        .map_err(windows_error_to_blade_error)? as usize;
    let mut bytes = vec![0u8; length];
    reader
        .ReadBytes(&mut bytes)
        .map_err(windows_error_to_blade_error)?;
    Ok(bytes)
}

fn map_bluetooth_error(error: BluetoothError, address: BtAddress) -> BladeError {
    match error {
        BluetoothError::DeviceNotConnected => {
            BladeError::ConnectionRefused(format!("device {} is not connected", address))
        }
        BluetoothError::RadioNotAvailable => {
            BladeError::Bluetooth("Bluetooth radio is not available".to_string())
        }
        other => BladeError::Bluetooth(format!(
            "service query for {} failed: {:?}",
            address, other
        )),
    }
}

fn map_gatt_status(status: GattCommunicationStatus, address: BtAddress) -> BladeError {
    match status {
        GattCommunicationStatus::Unreachable => {
            BladeError::ConnectionRefused(format!("device {} is unreachable", address))
        }
        GattCommunicationStatus::ProtocolError => {
            BladeError::Protocol(format!("GATT protocol error from {}", address))
        }
        GattCommunicationStatus::AccessDenied => {
            BladeError::Bluetooth(format!("access to {} denied", address))
        }
        other => BladeError::Bluetooth(format!(
            "GATT listing for {} failed: {:?}",
            address, other
        )),
    }
}

/// WinRT RFCOMM経由のSDPブラウズ
pub struct WindowsClassicProvider;

#[async_trait]
impl ClassicServiceProvider for WindowsClassicProvider {
    async fn browse_services(&self, address: BtAddress) -> Result<Vec<ClassicServiceRecord>> {
        // WinRTのブロッキング待ちはブロッキングプールで行う
        tokio::task::spawn_blocking(move || browse_services_blocking(address))
            .await
            .map_err(|e| BladeError::Platform(format!("blocking task failed: {}", e)))?
    }
}

fn browse_services_blocking(address: BtAddress) -> Result<Vec<ClassicServiceRecord>> {
    let device = BluetoothDevice::FromBluetoothAddressAsync(address.to_u64())
        .map_err(windows_error_to_blade_error)?
        .get()
        .map_err(|e| {
            BladeError::ConnectionRefused(format!("cannot open device {}: {}", address, e.message()))
        })?;

    let result = device
        .GetRfcommServicesWithCacheModeAsync(BluetoothCacheMode::Uncached)
        .map_err(windows_error_to_blade_error)?
        .get()
        .map_err(windows_error_to_blade_error)?;

    let error = result.Error().map_err(windows_error_to_blade_error)?;
    if error != BluetoothError::Success {
        let _ = device.Close();
        return Err(map_bluetooth_error(error, address));
    }

    let services = result.Services().map_err(windows_error_to_blade_error)?;
    let count = services.Size().map_err(windows_error_to_blade_error)?;
    debug!("RFCOMM browse for {} returned {} service(s)", address, count);

    let mut records = Vec::with_capacity(count as usize);
    for i in 0..count {
        let service = services.GetAt(i).map_err(windows_error_to_blade_error)?;
        match raw_sdp_attributes(&service) {
            Ok(attributes) => {
                let mut record = sdp::classic_record_from_attributes(&attributes);
                // ServiceClassIDList属性を欠くレコードはサービスIDで補う
                if record.service_class_ids.is_empty() {
                    if let Ok(uuid) = service.ServiceId().and_then(|id| id.Uuid()) {
                        record.service_class_ids.push(format_guid(&uuid));
                    }
                }
                records.push(record);
            }
            Err(e) => {
                warn!("Skipping service with unreadable SDP attributes: {}", e);
            }
        }
    }

    let _ = device.Close();
    Ok(records)
}

/// サービスの生SDP属性を属性ID→バッファのマップとして取り出す
fn raw_sdp_attributes(service: &RfcommDeviceService) -> Result<BTreeMap<u32, Vec<u8>>> {
    let map_view = service
        .GetSdpRawAttributesWithCacheModeAsync(BluetoothCacheMode::Uncached)
        .map_err(windows_error_to_blade_error)?
        .get()
        .map_err(windows_error_to_blade_error)?;

    let mut attributes = BTreeMap::new();
    let iterator = map_view.First().map_err(windows_error_to_blade_error)?;
    while iterator.HasCurrent().map_err(windows_error_to_blade_error)? {
        let pair = iterator.Current().map_err(windows_error_to_blade_error)?;
        let id = pair.Key().map_err(windows_error_to_blade_error)?;
        let buffer = pair.Value().map_err(windows_error_to_blade_error)?;
        attributes.insert(id, buffer_to_bytes(&buffer)?);
        iterator.MoveNext().map_err(windows_error_to_blade_error)?;
    }
    Ok(attributes)
}

/// WinRT GATT経由のBLEサービス列挙
pub struct WindowsBleProvider;

#[async_trait]
impl BleServiceProvider for WindowsBleProvider {
    async fn discover_services(
        &self,
        address: BtAddress,
        with_characteristics: bool,
    ) -> Result<Vec<BleServiceRecord>> {
        tokio::task::spawn_blocking(move || {
            discover_services_blocking(address, with_characteristics)
        })
        .await
        .map_err(|e| BladeError::Platform(format!("blocking task failed: {}", e)))?
    }
}

fn discover_services_blocking(
    address: BtAddress,
    with_characteristics: bool,
) -> Result<Vec<BleServiceRecord>> {
    // 一時接続：取得したデバイスはこの関数を出る前に閉じる
    let device = BluetoothLEDevice::FromBluetoothAddressAsync(address.to_u64())
        .map_err(windows_error_to_blade_error)?
        .get()
        .map_err(|e| {
            BladeError::ConnectionRefused(format!("cannot open device {}: {}", address, e.message()))
        })?;

    let result = device
        .GetGattServicesWithCacheModeAsync(BluetoothCacheMode::Uncached)
        .map_err(windows_error_to_blade_error)?
        .get()
        .map_err(windows_error_to_blade_error)?;

    let status = result.Status().map_err(windows_error_to_blade_error)?;
    if status != GattCommunicationStatus::Success {
        let _ = device.Close();
        return Err(map_gatt_status(status, address));
    }

    let services = result.Services().map_err(windows_error_to_blade_error)?;
    let count = services.Size().map_err(windows_error_to_blade_error)?;
    debug!("GATT table for {} has {} service(s)", address, count);

    let mut records = Vec::with_capacity(count as usize);
    for i in 0..count {
        let service = services.GetAt(i).map_err(windows_error_to_blade_error)?;
        let uuid = format_guid(&service.Uuid().map_err(windows_error_to_blade_error)?);
        let characteristics = if with_characteristics {
            Some(service_characteristics(&service))
        } else {
            None
        };
        records.push(BleServiceRecord {
            uuid,
            characteristics,
        });
    }

    let _ = device.Close();
    Ok(records)
}

/// サービスのキャラクタリスティックを列挙する
///
/// 保護されたサービスはアクセス拒否になることがあるため、
/// 個別の失敗は空のリストにして他のサービスの列挙を続ける。
fn service_characteristics(service: &GattDeviceService) -> Vec<BleCharacteristicRecord> {
    let result = match service
        .GetCharacteristicsAsync()
        .and_then(|operation| operation.get())
    {
        Ok(result) => result,
        Err(e) => {
            warn!("Characteristic listing failed: {}", e.message());
            return Vec::new();
        }
    };

    match result.Status() {
        Ok(GattCommunicationStatus::Success) => {}
        Ok(status) => {
            warn!("Characteristic listing returned {:?}", status);
            return Vec::new();
        }
        Err(_) => return Vec::new(),
    }

    let characteristics = match result.Characteristics() {
        Ok(characteristics) => characteristics,
        Err(_) => return Vec::new(),
    };

    let mut records = Vec::new();
    for i in 0..characteristics.Size().unwrap_or(0) {
        let Ok(characteristic) = characteristics.GetAt(i) else {
            continue;
        };
        let Ok(uuid) = characteristic.Uuid() else {
            continue;
        };
        let properties = characteristic
            .CharacteristicProperties()
            .map(property_flags)
            .unwrap_or_default();
        records.push(BleCharacteristicRecord {
            uuid: format_guid(&uuid),
            properties,
        });
    }
    records
}

/// プロパティフラグをフラグ名の列へ変換
fn property_flags(properties: GattCharacteristicProperties) -> Vec<String> {
    const FLAGS: &[(GattCharacteristicProperties, &str)] = &[
        (GattCharacteristicProperties::Broadcast, "broadcast"),
        (GattCharacteristicProperties::Read, "read"),
        (
            GattCharacteristicProperties::WriteWithoutResponse,
            "write-without-response",
        ),
        (GattCharacteristicProperties::Write, "write"),
        (GattCharacteristicProperties::Notify, "notify"),
        (GattCharacteristicProperties::Indicate, "indicate"),
        (
            GattCharacteristicProperties::AuthenticatedSignedWrites,
            "authenticated-signed-writes",
        ),
        (
            GattCharacteristicProperties::ExtendedProperties,
            "extended-properties",
        ),
    ];

    FLAGS
        .iter()
        .filter(|(flag, _)| properties.contains(*flag))
        .map(|(_, name)| name.to_string())
        .collect()
}
