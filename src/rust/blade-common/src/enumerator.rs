//! ドライバ列挙出力のパース
//!
//! Windowsのドライバ列挙ユーティリティが出力するFormat-List形式の
//! テキストからペアリング済みデバイスを取り出す。この出力はロケール・
//! バージョン依存の事実上のプロトコルなので、パースはこのモジュールに
//! 閉じ込め、構造化レコードだけを外へ返す。

use tracing::debug;

use crate::address::BtAddress;
use crate::devices::{DeviceRecord, DeviceType};

/// Classic判定に使うデバイスクラス名の部分文字列
const CLASSIC_MARKER: &str = "Bluetooth Device";

/// `Key : value` 形式の行から値を取り出す
///
/// 行が指定キーを含まない、または `:` がない場合はNone。
fn field_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    if !line.contains(key) {
        return None;
    }
    line.split_once(':').map(|(_, value)| value.trim())
}

/// DeviceID内の `_` に続く12桁16進トークンからアドレスを取り出す
fn extract_mac(device_id: &str) -> Option<BtAddress> {
    let bytes = device_id.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b != b'_' {
            continue;
        }
        let rest = &device_id[i + 1..];
        if rest.len() >= 12 && rest.as_bytes()[..12].iter().all(u8::is_ascii_hexdigit) {
            return BtAddress::from_hex_token(&rest[..12]).ok();
        }
    }
    None
}

/// 列挙ユーティリティの出力をデバイスレコード列にパースする
///
/// `DeviceID` を含む行を起点に、その行と続く2行を
/// (DeviceID, FriendlyName, DeviceName) の固定形式レコードとして読む。
/// 3フィールドのいずれかが欠けたレコード、アドレストークンのない
/// レコードは黙って読み飛ばす。
pub fn parse_driver_listing(output: &str) -> Vec<DeviceRecord> {
    let lines: Vec<&str> = output.lines().collect();
    let mut devices = Vec::new();

    for i in 0..lines.len() {
        if !lines[i].contains("DeviceID") {
            continue;
        }

        let device_id = field_value(lines[i], "DeviceID");
        let friendly_name = lines
            .get(i + 1)
            .and_then(|line| field_value(line, "FriendlyName"));
        let device_name = lines
            .get(i + 2)
            .and_then(|line| field_value(line, "DeviceName"));

        let (device_id, friendly_name, device_name) =
            match (device_id, friendly_name, device_name) {
                (Some(id), Some(friendly), Some(name)) => (id, friendly, name),
                _ => continue,
            };

        let device_type = if device_name.contains(CLASSIC_MARKER) {
            DeviceType::Classic
        } else {
            DeviceType::Ble
        };

        let mac = match extract_mac(device_id) {
            Some(mac) => mac,
            None => {
                debug!("No address token in DeviceID, skipping: {}", device_id);
                continue;
            }
        };

        devices.push(DeviceRecord {
            mac,
            friendly_name: friendly_name.to_string(),
            device_type,
        });
    }

    devices
}

/// MACをキーとした重複排除
///
/// 同一MACのレコードが複数あるとき、表示名が空のものを落とす。
/// 残った中ではClassicをBLEより優先し、それ以外は後勝ち。
/// 結果は常にMACごとに1件。
pub fn dedup_by_mac(devices: Vec<DeviceRecord>) -> Vec<DeviceRecord> {
    let mut counts: Vec<(BtAddress, usize)> = Vec::new();
    for device in &devices {
        match counts.iter_mut().find(|(mac, _)| *mac == device.mac) {
            Some((_, count)) => *count += 1,
            None => counts.push((device.mac, 1)),
        }
    }
    let shared = |mac: BtAddress| {
        counts
            .iter()
            .find(|(m, _)| *m == mac)
            .map(|(_, count)| *count > 1)
            .unwrap_or(false)
    };

    let mut result: Vec<DeviceRecord> = Vec::new();
    for device in devices {
        if shared(device.mac) && device.friendly_name.is_empty() {
            continue;
        }
        match result.iter_mut().find(|kept| kept.mac == device.mac) {
            Some(kept) => {
                // Classicで確定済みのエントリをBLEで上書きしない
                if !(kept.device_type == DeviceType::Classic
                    && device.device_type == DeviceType::Ble)
                {
                    *kept = device;
                }
            }
            None => result.push(device),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_OUTPUT: &str = "\
\n\
DeviceID     : BTHENUM\\DEV_AABBCCDDEEFF\\8&2F4A&0&BLUETOOTHDEVICE_AABBCCDDEEFF\n\
FriendlyName : WH-1000XM4\n\
DeviceName   : Bluetooth Device (RFCOMM Protocol TDI)\n\
\n\
DeviceID     : BTHLE\\DEV_112233445566\\8&AF21&0&112233445566\n\
FriendlyName : Mi Band 6\n\
DeviceName   : Bluetooth LE Generic Attribute Service\n\
\n";

    #[test]
    fn test_parse_two_records() {
        let devices = parse_driver_listing(SAMPLE_OUTPUT);
        assert_eq!(devices.len(), 2);

        assert_eq!(devices[0].mac.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(devices[0].friendly_name, "WH-1000XM4");
        assert_eq!(devices[0].device_type, DeviceType::Classic);

        assert_eq!(devices[1].mac.to_string(), "11:22:33:44:55:66");
        assert_eq!(devices[1].friendly_name, "Mi Band 6");
        assert_eq!(devices[1].device_type, DeviceType::Ble);
    }

    #[test]
    fn test_record_with_missing_field_is_skipped() {
        let output = "\
DeviceID     : BTHENUM\\DEV_AABBCCDDEEFF\\8&2F4A&0&BLUETOOTHDEVICE_AABBCCDDEEFF\n\
DeviceName   : Bluetooth Device (RFCOMM Protocol TDI)\n";
        // FriendlyName行がない → レコードごと読み飛ばす
        assert!(parse_driver_listing(output).is_empty());
    }

    #[test]
    fn test_record_without_mac_token_is_skipped() {
        let output = "\
DeviceID     : USB\\VID_8087&PID_0026\\5&C83A1F2&0&10\n\
FriendlyName : Intel(R) Wireless Bluetooth(R)\n\
DeviceName   : Bluetooth Device\n";
        assert!(parse_driver_listing(output).is_empty());
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_driver_listing("").is_empty());
    }

    fn record(mac: &str, name: &str, device_type: DeviceType) -> DeviceRecord {
        DeviceRecord {
            mac: BtAddress::parse(mac).unwrap(),
            friendly_name: name.to_string(),
            device_type,
        }
    }

    #[test]
    fn test_dedup_drops_empty_name_when_shared() {
        let deduped = dedup_by_mac(vec![
            record("AA:BB:CC:DD:EE:FF", "", DeviceType::Ble),
            record("AA:BB:CC:DD:EE:FF", "Headset", DeviceType::Classic),
        ]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].friendly_name, "Headset");
    }

    #[test]
    fn test_dedup_keeps_single_entry_for_distinct_names() {
        // 同一MACに異なる表示名が2つ → MACが唯一のキーなので1件に畳む
        let deduped = dedup_by_mac(vec![
            record("AA:BB:CC:DD:EE:FF", "Headset", DeviceType::Ble),
            record("AA:BB:CC:DD:EE:FF", "Headphones", DeviceType::Ble),
        ]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].friendly_name, "Headphones");
    }

    #[test]
    fn test_dedup_prefers_classic_over_ble() {
        let deduped = dedup_by_mac(vec![
            record("AA:BB:CC:DD:EE:FF", "Headset", DeviceType::Classic),
            record("AA:BB:CC:DD:EE:FF", "Headset LE", DeviceType::Ble),
        ]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].device_type, DeviceType::Classic);
        assert_eq!(deduped[0].friendly_name, "Headset");
    }

    #[test]
    fn test_dedup_unique_macs_untouched() {
        let deduped = dedup_by_mac(vec![
            record("AA:BB:CC:DD:EE:FF", "", DeviceType::Classic),
            record("11:22:33:44:55:66", "Band", DeviceType::Ble),
        ]);
        // 重複していないMACは表示名が空でも残る
        assert_eq!(deduped.len(), 2);
    }
}
