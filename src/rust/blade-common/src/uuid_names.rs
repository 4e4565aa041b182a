//! UUID→サービス名変換

/// Bluetooth Base UUIDの下位96ビット（`0000xxxx-0000-1000-8000-00805f9b34fb`）
const BASE_UUID_SUFFIX: &str = "00001000800000805f9b34fb";

/// 16ビットエイリアスの静的テーブル
///
/// Bluetooth SIG割り当て番号のうち、SDP/GATTの問い合わせ結果に
/// 現れる代表的なサービスクラス・プロファイル・GATTサービスを収録。
fn alias_name(alias: u16) -> Option<&'static str> {
    let name = match alias {
        // サービスディスカバリ / 基盤
        0x1000 => "Service Discovery Server",
        0x1001 => "Browse Group Descriptor",
        0x1002 => "Public Browse Group",
        0x1200 => "PnP Information",
        0x1201 => "Generic Networking",
        0x1202 => "Generic File Transfer",
        0x1203 => "Generic Audio",
        0x1204 => "Generic Telephony",

        // Classicサービスクラス / プロファイル
        0x1101 => "Serial Port",
        0x1102 => "LAN Access Using PPP",
        0x1103 => "Dialup Networking",
        0x1104 => "IrMC Sync",
        0x1105 => "OBEX Object Push",
        0x1106 => "OBEX File Transfer",
        0x1107 => "IrMC Sync Command",
        0x1108 => "Headset",
        0x1109 => "Cordless Telephony",
        0x110A => "Audio Source",
        0x110B => "Audio Sink",
        0x110C => "A/V Remote Control Target",
        0x110D => "Advanced Audio Distribution",
        0x110E => "A/V Remote Control",
        0x110F => "A/V Remote Control Controller",
        0x1110 => "Intercom",
        0x1111 => "Fax",
        0x1112 => "Headset Audio Gateway",
        0x1115 => "Personal Area Networking User",
        0x1116 => "Network Access Point",
        0x1117 => "Group Ad-hoc Network",
        0x1118 => "Direct Printing",
        0x111A => "Imaging Responder",
        0x111B => "Imaging Automatic Archive",
        0x111E => "Handsfree",
        0x111F => "Handsfree Audio Gateway",
        0x1124 => "Human Interface Device Service",
        0x1125 => "Hardcopy Cable Replacement",
        0x112D => "SIM Access",
        0x112E => "Phonebook Access Client",
        0x112F => "Phonebook Access Server",
        0x1130 => "Phonebook Access",
        0x1131 => "Headset HS",
        0x1132 => "Message Access Server",
        0x1133 => "Message Notification Server",
        0x1134 => "Message Access Profile",
        0x1303 => "Video Source",
        0x1304 => "Video Sink",
        0x1305 => "Video Distribution",

        // GATTサービス
        0x1800 => "Generic Access",
        0x1801 => "Generic Attribute",
        0x1802 => "Immediate Alert",
        0x1803 => "Link Loss",
        0x1804 => "Tx Power",
        0x1805 => "Current Time Service",
        0x180A => "Device Information",
        0x180D => "Heart Rate",
        0x180F => "Battery Service",
        0x1810 => "Blood Pressure",
        0x1812 => "Human Interface Device",
        0x1813 => "Scan Parameters",
        0x181A => "Environmental Sensing",
        0x181C => "User Data",
        0x1826 => "Fitness Machine",

        // GATTキャラクタリスティック（深い列挙で現れる）
        0x2A00 => "Device Name",
        0x2A01 => "Appearance",
        0x2A04 => "Peripheral Preferred Connection Parameters",
        0x2A05 => "Service Changed",
        0x2A19 => "Battery Level",
        0x2A24 => "Model Number String",
        0x2A25 => "Serial Number String",
        0x2A26 => "Firmware Revision String",
        0x2A27 => "Hardware Revision String",
        0x2A28 => "Software Revision String",
        0x2A29 => "Manufacturer Name String",
        0x2A37 => "Heart Rate Measurement",
        0x2A4D => "Report",

        _ => return None,
    };
    Some(name)
}

/// UUID文字列から16ビットエイリアスを取り出す
///
/// 受け付ける形式：4桁16進、8桁16進（上位16ビットが0のもの）、
/// Bluetooth Base上の完全な128ビットUUID。大文字小文字とダッシュの
/// 有無は問わない。
fn short_alias(uuid: &str) -> Option<u16> {
    let hex: String = uuid
        .trim()
        .chars()
        .filter(|c| *c != '-')
        .collect::<String>()
        .to_lowercase();

    match hex.len() {
        4 => u16::from_str_radix(&hex, 16).ok(),
        8 => {
            let value = u32::from_str_radix(&hex, 16).ok()?;
            if value <= u16::MAX as u32 {
                Some(value as u16)
            } else {
                None
            }
        }
        32 => {
            if &hex[8..] != BASE_UUID_SUFFIX || &hex[..4] != "0000" {
                return None;
            }
            u16::from_str_radix(&hex[4..8], 16).ok()
        }
        _ => None,
    }
}

/// UUIDを人間可読なサービス名へ解決する
///
/// 全入力に対して値を返す全域関数。テーブルにないUUIDは
/// 入力をそのまま埋め込んだフォールバック文字列になる。
pub fn service_name(uuid: &str) -> String {
    short_alias(uuid)
        .and_then(alias_name)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Unknown Service ({})", uuid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_short_uuid() {
        assert_eq!(service_name("110B"), "Audio Sink");
        assert_eq!(service_name("110b"), "Audio Sink");
        assert_eq!(service_name("1801"), "Generic Attribute");
    }

    #[test]
    fn test_known_full_uuid_on_base() {
        assert_eq!(
            service_name("0000110B-0000-1000-8000-00805F9B34FB"),
            "Audio Sink"
        );
        assert_eq!(
            service_name("0000180f-0000-1000-8000-00805f9b34fb"),
            "Battery Service"
        );
    }

    #[test]
    fn test_eight_digit_form() {
        assert_eq!(service_name("00001105"), "OBEX Object Push");
    }

    #[test]
    fn test_unknown_uuid_embeds_input_verbatim() {
        let input = "f000aa00-0451-4000-b000-000000000000";
        assert_eq!(service_name(input), format!("Unknown Service ({})", input));

        // Base外の完全UUIDはエイリアス扱いしない
        let off_base = "0000110b-0000-1000-8000-000000000000";
        assert_eq!(
            service_name(off_base),
            format!("Unknown Service ({})", off_base)
        );
    }

    #[test]
    fn test_unknown_short_uuid() {
        assert_eq!(service_name("ABCD"), "Unknown Service (ABCD)");
    }
}
