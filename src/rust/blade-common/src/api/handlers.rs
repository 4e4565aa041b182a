//! 共通APIハンドラー実装

use actix_web::{http::StatusCode, web, HttpResponse};
use std::sync::Arc;
use tracing::{error, info};

use super::models::{
    BleServicesResponse, ClassicServicesResponse, DevicesResponse, ServicesQuery,
};
use crate::address::BtAddress;
use crate::bluetooth::{BleServiceProvider, ClassicServiceProvider};
use crate::devices::{DeviceRegistry, DeviceType};
use crate::error::BladeError;

/// リクエスト処理が参照するアプリケーション状態
///
/// デバイスセットは起動時に構築された不変スナップショット。
pub struct AppState {
    pub registry: Arc<DeviceRegistry>,
    pub classic: Arc<dyn ClassicServiceProvider>,
    pub ble: Arc<dyn BleServiceProvider>,

    /// クエリパラメータ未指定時のキャラクタリスティック列挙デフォルト
    pub include_characteristics: bool,
}

fn device_not_found() -> HttpResponse {
    HttpResponse::NotFound().body("Device not found.")
}

/// 問い合わせ失敗をプレーンテキスト応答へ写す
fn query_failure(error: &BladeError, body: &'static str) -> HttpResponse {
    let status = StatusCode::from_u16(error.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).body(body)
}

/// GET /{device_id}/services
///
/// パスセグメントは大小文字・`-`/`:` 区切りを問わないアドレス表記。
/// 崩れた識別子は個別の4xxにせず、正規化失敗として404に落とす。
pub async fn device_services(
    path: web::Path<String>,
    query: web::Query<ServicesQuery>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let raw_id = path.into_inner();
    info!("Searching for services for the device: {}", raw_id);

    let address = match BtAddress::parse(&raw_id) {
        Ok(address) => address,
        Err(_) => return device_not_found(),
    };

    let device = match state.registry.get(&address) {
        Some(device) => device.clone(),
        None => return device_not_found(),
    };

    match device.device_type {
        DeviceType::Classic => match state.classic.browse_services(address).await {
            Ok(records) => {
                info!(
                    "SDP browse for {} returned {} service(s)",
                    address,
                    records.len()
                );
                HttpResponse::Ok().json(ClassicServicesResponse::from_records(records))
            }
            Err(e) => {
                error!(
                    "SDP browse failed for {} [{}]: {}",
                    address,
                    e.error_code(),
                    e
                );
                query_failure(&e, "Failed to retrieve services from the device.")
            }
        },
        DeviceType::Ble => {
            let with_characteristics = query
                .characteristics
                .unwrap_or(state.include_characteristics);
            match state
                .ble
                .discover_services(address, with_characteristics)
                .await
            {
                Ok(records) => {
                    info!(
                        "GATT listing for {} returned {} service(s)",
                        address,
                        records.len()
                    );
                    HttpResponse::Ok().json(BleServicesResponse::from_records(records))
                }
                Err(e) => {
                    error!(
                        "Error searching for BLE services on {} [{}]: {}",
                        address,
                        e.error_code(),
                        e
                    );
                    query_failure(&e, "Failed to retrieve services from the BLE device.")
                }
            }
        }
    }
}

/// GET /devices
///
/// アクティブデバイスセットの一覧。
pub async fn list_devices(state: web::Data<AppState>) -> HttpResponse {
    let mut devices: Vec<_> = state.registry.iter().cloned().collect();
    devices.sort_by_key(|device| device.mac);

    HttpResponse::Ok().json(DevicesResponse {
        count: devices.len(),
        devices,
    })
}

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use async_trait::async_trait;

    use crate::bluetooth::{BleServiceRecord, ClassicServiceRecord};
    use crate::devices::DeviceRecord;
    use crate::error::{BladeError, Result};

    struct StubClassic {
        records: Vec<ClassicServiceRecord>,
    }

    #[async_trait]
    impl ClassicServiceProvider for StubClassic {
        async fn browse_services(&self, _address: BtAddress) -> Result<Vec<ClassicServiceRecord>> {
            Ok(self.records.clone())
        }
    }

    enum StubBle {
        Records(Vec<BleServiceRecord>),
        Failing,
    }

    #[async_trait]
    impl BleServiceProvider for StubBle {
        async fn discover_services(
            &self,
            address: BtAddress,
            with_characteristics: bool,
        ) -> Result<Vec<BleServiceRecord>> {
            match self {
                StubBle::Records(records) => {
                    let mut records = records.clone();
                    if !with_characteristics {
                        for record in &mut records {
                            record.characteristics = None;
                        }
                    }
                    Ok(records)
                }
                StubBle::Failing => Err(BladeError::ConnectionRefused(address.to_string())),
            }
        }
    }

    fn state(
        devices: Vec<DeviceRecord>,
        classic: StubClassic,
        ble: StubBle,
    ) -> web::Data<AppState> {
        web::Data::new(AppState {
            registry: Arc::new(DeviceRegistry::from_devices(devices)),
            classic: Arc::new(classic),
            ble: Arc::new(ble),
            include_characteristics: false,
        })
    }

    fn classic_headset() -> DeviceRecord {
        DeviceRecord {
            mac: BtAddress::parse("AA:BB:CC:DD:EE:FF").unwrap(),
            friendly_name: "Headset".to_string(),
            device_type: DeviceType::Classic,
        }
    }

    fn ble_band() -> DeviceRecord {
        DeviceRecord {
            mac: BtAddress::parse("11:22:33:44:55:66").unwrap(),
            friendly_name: "Band".to_string(),
            device_type: DeviceType::Ble,
        }
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state)
                    .route("/devices", web::get().to(list_devices))
                    .route("/{device_id}/services", web::get().to(device_services)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_unknown_device_is_404_for_any_separator_style() {
        let app = test_app!(state(
            vec![],
            StubClassic { records: vec![] },
            StubBle::Records(vec![]),
        ));

        for path in [
            "/AA:BB:CC:DD:EE:FF/services",
            "/aa-bb-cc-dd-ee-ff/services",
            "/not-a-mac/services",
        ] {
            let request = test::TestRequest::get().uri(path).to_request();
            let response = test::call_service(&app, request).await;
            assert_eq!(response.status(), 404, "path {}", path);
        }
    }

    #[actix_web::test]
    async fn test_classic_device_with_zero_services() {
        let app = test_app!(state(
            vec![classic_headset()],
            StubClassic { records: vec![] },
            StubBle::Records(vec![]),
        ));

        // パス区切りの揺れも同じデバイスに解決される
        let request = test::TestRequest::get()
            .uri("/aa-bb-cc-dd-ee-ff/services")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["request_type"], "GET");
        assert_eq!(body["total_services_found"], 0);
        assert_eq!(body["services"].as_array().unwrap().len(), 0);
    }

    #[actix_web::test]
    async fn test_classic_device_with_services() {
        let record = ClassicServiceRecord {
            name: Some("OBEX Object Push".to_string()),
            protocol: Some("RFCOMM".to_string()),
            port: Some(12),
            service_class_ids: vec!["1105".to_string()],
            ..Default::default()
        };
        let app = test_app!(state(
            vec![classic_headset()],
            StubClassic {
                records: vec![record],
            },
            StubBle::Records(vec![]),
        ));

        let request = test::TestRequest::get()
            .uri("/AA:BB:CC:DD:EE:FF/services")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["total_services_found"], 1);
        let service = &body["services"][0];
        assert_eq!(service["name"], "OBEX Object Push");
        assert_eq!(service["port"], 12);
        assert_eq!(service["service_classes"][0], "OBEX Object Push");
    }

    #[actix_web::test]
    async fn test_failed_ble_query_is_500_with_plain_text_body() {
        let app = test_app!(state(
            vec![ble_band()],
            StubClassic { records: vec![] },
            StubBle::Failing,
        ));

        let request = test::TestRequest::get()
            .uri("/11:22:33:44:55:66/services")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), 500);

        let body = test::read_body(response).await;
        // 部分的なJSONは返さない
        assert_eq!(body, "Failed to retrieve services from the BLE device.");
    }

    #[actix_web::test]
    async fn test_ble_device_shallow_by_default_deep_on_request() {
        let records = vec![BleServiceRecord {
            uuid: "00001801-0000-1000-8000-00805f9b34fb".to_string(),
            characteristics: Some(vec![crate::bluetooth::BleCharacteristicRecord {
                uuid: "00002a05-0000-1000-8000-00805f9b34fb".to_string(),
                properties: vec!["indicate".to_string()],
            }]),
        }];
        let app = test_app!(state(
            vec![ble_band()],
            StubClassic { records: vec![] },
            StubBle::Records(records),
        ));

        let request = test::TestRequest::get()
            .uri("/11-22-33-44-55-66/services")
            .to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, request).await).await;
        assert!(body["services"][0].get("characteristics").is_none());

        let request = test::TestRequest::get()
            .uri("/11-22-33-44-55-66/services?characteristics=true")
            .to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, request).await).await;
        assert_eq!(
            body["services"][0]["characteristics"][0]["name"],
            "Service Changed"
        );
    }

    #[actix_web::test]
    async fn test_device_listing() {
        let app = test_app!(state(
            vec![classic_headset(), ble_band()],
            StubClassic { records: vec![] },
            StubBle::Records(vec![]),
        ));

        let request = test::TestRequest::get().uri("/devices").to_request();
        let body: serde_json::Value =
            test::read_body_json(test::call_service(&app, request).await).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["devices"][0]["mac"], "11:22:33:44:55:66");
        assert_eq!(body["devices"][0]["type"], "BLE");
        assert_eq!(body["devices"][1]["friendlyName"], "Headset");
    }
}
