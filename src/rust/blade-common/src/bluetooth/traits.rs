//! サービス問い合わせの抽象化トレイト
//!
//! プラットフォーム実装（WinRT / 未実装スタブ）はこの境界の向こう側に
//! 置き、HTTP層はトレイトオブジェクト越しにのみ問い合わせを行う。

use async_trait::async_trait;
use std::sync::Arc;

use crate::address::BtAddress;
use crate::error::Result;

/// SDPブラウズで得られるClassicサービスレコード
///
/// 文字列フィールドはプラットフォーム層でテキストへ正規化済み。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassicServiceRecord {
    /// サービス名（ServiceName属性、欠落あり）
    pub name: Option<String>,

    /// サービス説明（欠落時は空文字列）
    pub description: String,

    /// 提供者名
    pub provider: Option<String>,

    /// トランスポートプロトコル名（RFCOMM / L2CAP）
    pub protocol: Option<String>,

    /// RFCOMMチャネルまたはL2CAP PSM
    pub port: Option<u32>,

    /// サービスクラスUUID（未解決の16進文字列）
    pub service_class_ids: Vec<String>,

    /// プロファイル記述子
    pub profiles: Vec<ProfileDescriptor>,
}

/// プロファイル記述子
///
/// 裸の識別子（versionなし）か、識別子とバージョンバイト列の組。
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDescriptor {
    /// プロファイルUUID（未解決の16進文字列）
    pub id: String,

    /// バージョン要素の生バイト列
    pub version: Option<Vec<u8>>,
}

/// GATT列挙で得られるBLEサービスレコード
#[derive(Debug, Clone, PartialEq)]
pub struct BleServiceRecord {
    /// サービスUUID（完全形、小文字ダッシュ区切り）
    pub uuid: String,

    /// キャラクタリスティック（深い列挙を要求した場合のみ）
    pub characteristics: Option<Vec<BleCharacteristicRecord>>,
}

/// GATTキャラクタリスティック
#[derive(Debug, Clone, PartialEq)]
pub struct BleCharacteristicRecord {
    pub uuid: String,

    /// プロパティフラグ名（read / write / notify など）
    pub properties: Vec<String>,
}

/// Classicサービス問い合わせトレイト
#[async_trait]
pub trait ClassicServiceProvider: Send + Sync {
    /// 指定アドレスのSDPブラウズを行い、0件以上のレコードを返す
    async fn browse_services(&self, address: BtAddress) -> Result<Vec<ClassicServiceRecord>>;
}

/// BLEサービス問い合わせトレイト
#[async_trait]
pub trait BleServiceProvider: Send + Sync {
    /// 一時接続でGATTサービス表を取得する
    ///
    /// `with_characteristics` 指定時はサービスごとの
    /// キャラクタリスティックも列挙する。接続・列挙の失敗は
    /// 型付きエラーで返し、リトライはしない。
    async fn discover_services(
        &self,
        address: BtAddress,
        with_characteristics: bool,
    ) -> Result<Vec<BleServiceRecord>>;
}

#[async_trait]
impl<T: ClassicServiceProvider + ?Sized> ClassicServiceProvider for Arc<T> {
    async fn browse_services(&self, address: BtAddress) -> Result<Vec<ClassicServiceRecord>> {
        (**self).browse_services(address).await
    }
}

#[async_trait]
impl<T: BleServiceProvider + ?Sized> BleServiceProvider for Arc<T> {
    async fn discover_services(
        &self,
        address: BtAddress,
        with_characteristics: bool,
    ) -> Result<Vec<BleServiceRecord>> {
        (**self)
            .discover_services(address, with_characteristics)
            .await
    }
}
