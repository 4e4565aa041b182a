//! Bluetoothアドレス型

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BladeError, Result};

/// 48ビットBluetoothアドレス
///
/// 正規形は `AA:BB:CC:DD:EE:FF`（大文字・コロン区切り）。
/// パースは大文字小文字、`:` / `-` 区切りのどちらも受け付ける。
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord)]
pub struct BtAddress([u8; 6]);

impl BtAddress {
    /// `:` または `-` 区切りの表記からパース
    pub fn parse(s: &str) -> Result<Self> {
        let hex: String = s
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        Self::from_hex_token(&hex)
    }

    /// 区切りなしの12桁16進トークンからパース
    pub fn from_hex_token(token: &str) -> Result<Self> {
        if token.len() != 12 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BladeError::Parse(format!(
                "invalid Bluetooth address: {}",
                token
            )));
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            // 12桁16進チェック済みなのでここで失敗しない
            *octet = u8::from_str_radix(&token[i * 2..i * 2 + 2], 16)
                .map_err(|e| BladeError::Parse(e.to_string()))?;
        }
        Ok(BtAddress(octets))
    }

    /// WinRT APIが使う整数表現へ変換
    pub fn to_u64(self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes[2..].copy_from_slice(&self.0);
        u64::from_be_bytes(bytes)
    }

    /// WinRT APIの整数表現から構築（下位48ビットのみ使用）
    pub fn from_u64(addr: u64) -> Self {
        let bytes = addr.to_be_bytes();
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&bytes[2..]);
        BtAddress(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for BtAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl Serialize for BtAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BtAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        BtAddress::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_colon_and_dash() {
        let a = BtAddress::parse("aa-bb-cc-dd-ee-ff").unwrap();
        let b = BtAddress::parse("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let canonical = "AA:BB:CC:DD:EE:FF";
        let a = BtAddress::parse(canonical).unwrap();
        assert_eq!(a.to_string(), canonical);
        // 正規形を再パースしても変化しない
        let b = BtAddress::parse(&a.to_string()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_hex_token() {
        let a = BtAddress::from_hex_token("0012f3aB90C1").unwrap();
        assert_eq!(a.to_string(), "00:12:F3:AB:90:C1");
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(BtAddress::parse("not-a-mac").is_err());
        assert!(BtAddress::parse("AA:BB:CC:DD:EE").is_err());
        assert!(BtAddress::from_hex_token("AABBCCDDEEFF00").is_err());
        assert!(BtAddress::from_hex_token("GGBBCCDDEEFF").is_err());
    }

    #[test]
    fn test_u64_round_trip() {
        let a = BtAddress::parse("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(a.to_u64(), 0x0000_AABB_CCDD_EEFF);
        assert_eq!(BtAddress::from_u64(a.to_u64()), a);
    }
}
