//! SDP属性のデコード
//!
//! RFCOMMサービス問い合わせが返す生のSDP属性バッファから、サービス
//! レコードの表示に必要な範囲だけをデコードする。SDPの問い合わせ
//! プロトコル自体はネイティブスタックに委譲しており、ここで扱うのは
//! 属性値のデータエレメント表現のみ。

use std::collections::BTreeMap;

use crate::bluetooth::{ClassicServiceRecord, ProfileDescriptor};
use crate::error::{BladeError, Result};

/// サービスレコード属性ID
pub mod attribute_id {
    pub const SERVICE_CLASS_ID_LIST: u32 = 0x0001;
    pub const PROTOCOL_DESCRIPTOR_LIST: u32 = 0x0004;
    pub const BLUETOOTH_PROFILE_DESCRIPTOR_LIST: u32 = 0x0009;
    pub const SERVICE_NAME: u32 = 0x0100;
    pub const SERVICE_DESCRIPTION: u32 = 0x0101;
    pub const PROVIDER_NAME: u32 = 0x0102;
}

/// プロトコルUUID（16ビットエイリアス）
mod protocol_uuid {
    pub const SDP: u16 = 0x0001;
    pub const RFCOMM: u16 = 0x0003;
    pub const OBEX: u16 = 0x0008;
    pub const BNEP: u16 = 0x000F;
    pub const HIDP: u16 = 0x0011;
    pub const AVCTP: u16 = 0x0017;
    pub const AVDTP: u16 = 0x0019;
    pub const L2CAP: u16 = 0x0100;
}

/// SDPのUUID表現
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpUuid {
    Uuid16(u16),
    Uuid32(u32),
    Uuid128([u8; 16]),
}

impl SdpUuid {
    /// 名前解決に渡せる16進文字列表現
    pub fn to_uuid_string(&self) -> String {
        match self {
            SdpUuid::Uuid16(value) => format!("{:04X}", value),
            SdpUuid::Uuid32(value) => format!("{:08X}", value),
            SdpUuid::Uuid128(bytes) => {
                let mut hex = String::with_capacity(36);
                for (i, b) in bytes.iter().enumerate() {
                    if matches!(i, 4 | 6 | 8 | 10) {
                        hex.push('-');
                    }
                    hex.push_str(&format!("{:02x}", b));
                }
                hex
            }
        }
    }

    fn short_alias(&self) -> Option<u16> {
        match self {
            SdpUuid::Uuid16(value) => Some(*value),
            SdpUuid::Uuid32(value) if *value <= u16::MAX as u32 => Some(*value as u16),
            _ => None,
        }
    }
}

/// デコード済みデータエレメント
#[derive(Debug, Clone, PartialEq)]
pub enum DataElement {
    Nil,
    Uint { value: u64, width: usize },
    Int { value: i64, width: usize },
    Uuid(SdpUuid),
    /// バイト列はこの時点でテキストへ正規化される（非UTF-8は損失許容）
    Text(String),
    Bool(bool),
    Url(String),
    Sequence(Vec<DataElement>),
    Alternative(Vec<DataElement>),
}

fn truncated() -> BladeError {
    BladeError::Protocol("truncated SDP data element".to_string())
}

fn take<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if input.len() < n {
        return Err(truncated());
    }
    let (head, rest) = input.split_at(n);
    *input = rest;
    Ok(head)
}

fn read_uint(bytes: &[u8]) -> Result<u64> {
    if bytes.len() > 8 {
        return Err(BladeError::Protocol(format!(
            "unsupported {}-byte integer in SDP data element",
            bytes.len()
        )));
    }
    let mut value = 0u64;
    for b in bytes {
        value = (value << 8) | *b as u64;
    }
    Ok(value)
}

/// データエレメントを1つ読む
fn read_element(input: &mut &[u8]) -> Result<DataElement> {
    let descriptor = take(input, 1)?[0];
    let type_code = descriptor >> 3;
    let size_index = descriptor & 0x07;

    // サイズインデックス → データ長
    let length = match size_index {
        0 => {
            if type_code == 0 {
                0
            } else {
                1
            }
        }
        1 => 2,
        2 => 4,
        3 => 8,
        4 => 16,
        5 => take(input, 1)?[0] as usize,
        6 => read_uint(take(input, 2)?)? as usize,
        7 => read_uint(take(input, 4)?)? as usize,
        _ => unreachable!(),
    };

    let data = take(input, length)?;

    match type_code {
        0 => Ok(DataElement::Nil),
        1 => Ok(DataElement::Uint {
            value: read_uint(data)?,
            width: data.len(),
        }),
        2 => {
            let unsigned = read_uint(data)?;
            // 符号拡張
            let shift = 64 - data.len() * 8;
            let value = ((unsigned << shift) as i64) >> shift;
            Ok(DataElement::Int {
                value,
                width: data.len(),
            })
        }
        3 => match data.len() {
            2 => Ok(DataElement::Uuid(SdpUuid::Uuid16(read_uint(data)? as u16))),
            4 => Ok(DataElement::Uuid(SdpUuid::Uuid32(read_uint(data)? as u32))),
            16 => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(data);
                Ok(DataElement::Uuid(SdpUuid::Uuid128(bytes)))
            }
            n => Err(BladeError::Protocol(format!("invalid {}-byte UUID", n))),
        },
        4 => Ok(DataElement::Text(
            String::from_utf8_lossy(data).into_owned(),
        )),
        5 => Ok(DataElement::Bool(data.first().copied().unwrap_or(0) != 0)),
        6 | 7 => {
            let mut items = Vec::new();
            let mut cursor = data;
            while !cursor.is_empty() {
                items.push(read_element(&mut cursor)?);
            }
            if type_code == 6 {
                Ok(DataElement::Sequence(items))
            } else {
                Ok(DataElement::Alternative(items))
            }
        }
        8 => Ok(DataElement::Url(String::from_utf8_lossy(data).into_owned())),
        n => Err(BladeError::Protocol(format!(
            "unknown SDP data element type {}",
            n
        ))),
    }
}

/// 属性バッファ全体を1つのデータエレメントとしてデコードする
pub fn parse_element(buffer: &[u8]) -> Result<DataElement> {
    let mut cursor = buffer;
    read_element(&mut cursor)
}

/// テキスト属性のデコード（非テキストはNone）
fn text_attribute(attributes: &BTreeMap<u32, Vec<u8>>, id: u32) -> Option<String> {
    let element = parse_element(attributes.get(&id)?).ok()?;
    match element {
        DataElement::Text(text) => Some(text),
        _ => None,
    }
}

/// ServiceClassIDListからUUID文字列を取り出す
fn service_class_ids(attributes: &BTreeMap<u32, Vec<u8>>) -> Vec<String> {
    let Some(buffer) = attributes.get(&attribute_id::SERVICE_CLASS_ID_LIST) else {
        return Vec::new();
    };
    match parse_element(buffer) {
        Ok(DataElement::Sequence(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                DataElement::Uuid(uuid) => Some(uuid.to_uuid_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// ProtocolDescriptorListからプロトコル名とポートを導出する
///
/// RFCOMMがあればチャネル番号、なければL2CAPのPSMを使う。
fn protocol_and_port(attributes: &BTreeMap<u32, Vec<u8>>) -> (Option<String>, Option<u32>) {
    let Some(buffer) = attributes.get(&attribute_id::PROTOCOL_DESCRIPTOR_LIST) else {
        return (None, None);
    };
    let Ok(DataElement::Sequence(descriptors)) = parse_element(buffer) else {
        return (None, None);
    };

    let mut l2cap_psm = None;
    for descriptor in descriptors {
        let DataElement::Sequence(parts) = descriptor else {
            continue;
        };
        let mut parts = parts.into_iter();
        let Some(DataElement::Uuid(uuid)) = parts.next() else {
            continue;
        };
        let param = parts.next().and_then(|p| match p {
            DataElement::Uint { value, .. } => Some(value as u32),
            _ => None,
        });

        match uuid.short_alias() {
            Some(protocol_uuid::RFCOMM) => {
                return (Some(protocol_name(protocol_uuid::RFCOMM).to_string()), param);
            }
            Some(protocol_uuid::L2CAP) => {
                l2cap_psm = param;
            }
            _ => {}
        }
    }

    if l2cap_psm.is_some() {
        (
            Some(protocol_name(protocol_uuid::L2CAP).to_string()),
            l2cap_psm,
        )
    } else {
        (None, None)
    }
}

/// プロファイル記述子のデコード
///
/// 各エントリは裸のUUID、または (UUID, バージョン) の組。
fn profiles(attributes: &BTreeMap<u32, Vec<u8>>) -> Vec<ProfileDescriptor> {
    let Some(buffer) = attributes.get(&attribute_id::BLUETOOTH_PROFILE_DESCRIPTOR_LIST) else {
        return Vec::new();
    };
    let Ok(DataElement::Sequence(entries)) = parse_element(buffer) else {
        return Vec::new();
    };

    let mut result = Vec::new();
    for entry in entries {
        match entry {
            DataElement::Uuid(uuid) => result.push(ProfileDescriptor {
                id: uuid.to_uuid_string(),
                version: None,
            }),
            DataElement::Sequence(parts) => {
                let mut parts = parts.into_iter();
                let Some(DataElement::Uuid(uuid)) = parts.next() else {
                    continue;
                };
                let version = parts.next().and_then(|p| match p {
                    DataElement::Uint { value, width } => {
                        Some(value.to_be_bytes()[8 - width..].to_vec())
                    }
                    _ => None,
                });
                result.push(ProfileDescriptor {
                    id: uuid.to_uuid_string(),
                    version,
                });
            }
            _ => {}
        }
    }
    result
}

/// 生の属性マップからClassicサービスレコードを組み立てる
///
/// 壊れた属性はその属性だけが欠けた扱いになり、レコード全体は落とさない。
pub fn classic_record_from_attributes(
    attributes: &BTreeMap<u32, Vec<u8>>,
) -> ClassicServiceRecord {
    let (protocol, port) = protocol_and_port(attributes);

    ClassicServiceRecord {
        name: text_attribute(attributes, attribute_id::SERVICE_NAME),
        description: text_attribute(attributes, attribute_id::SERVICE_DESCRIPTION)
            .unwrap_or_default(),
        provider: text_attribute(attributes, attribute_id::PROVIDER_NAME),
        protocol,
        port,
        service_class_ids: service_class_ids(attributes),
        profiles: profiles(attributes),
    }
}

/// プロトコルUUIDの表示名（ログ用）
pub fn protocol_name(alias: u16) -> &'static str {
    match alias {
        protocol_uuid::SDP => "SDP",
        protocol_uuid::RFCOMM => "RFCOMM",
        protocol_uuid::OBEX => "OBEX",
        protocol_uuid::BNEP => "BNEP",
        protocol_uuid::HIDP => "HIDP",
        protocol_uuid::AVCTP => "AVCTP",
        protocol_uuid::AVDTP => "AVDTP",
        protocol_uuid::L2CAP => "L2CAP",
        _ => "UNKNOWN",
    }
}
