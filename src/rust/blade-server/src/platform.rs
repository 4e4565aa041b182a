//! プラットフォーム固有処理

use tokio::sync::oneshot;
use tracing::{info, warn};

use blade_common::Result;

/// シャットダウンシグナル受信器
pub struct ShutdownReceiver {
    rx: oneshot::Receiver<()>,
}

impl ShutdownReceiver {
    /// シグナルを待機
    pub async fn wait(self) {
        let _ = self.rx.await;
    }
}

/// プラットフォーム固有処理
pub struct Platform;

impl Platform {
    /// プラットフォーム初期化
    pub async fn initialize() -> Result<()> {
        #[cfg(windows)]
        unsafe {
            // コンソールのコードページをUTF-8に設定
            let _ = windows::Win32::System::Console::SetConsoleOutputCP(65001);
            let _ = windows::Win32::System::Console::SetConsoleCP(65001);
        }

        info!("Platform initialized: {}", std::env::consts::OS);
        Ok(())
    }

    /// シャットダウンハンドラーのセットアップ
    pub async fn setup_shutdown_handler() -> Result<ShutdownReceiver> {
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C signal");
                    let _ = tx.send(());
                }
                Err(err) => {
                    warn!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        info!("Shutdown handler registered");
        Ok(ShutdownReceiver { rx })
    }

    /// Bluetoothラジオが利用可能かチェック
    #[cfg(windows)]
    pub async fn check_bluetooth_available() -> bool {
        use windows::Devices::Radios::{Radio, RadioKind};

        match Radio::GetRadiosAsync() {
            Ok(operation) => match operation.get() {
                Ok(radios) => {
                    for i in 0..radios.Size().unwrap_or(0) {
                        if let Ok(radio) = radios.GetAt(i) {
                            if let Ok(kind) = radio.Kind() {
                                if kind == RadioKind::Bluetooth {
                                    return true;
                                }
                            }
                        }
                    }
                    false
                }
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    /// Bluetoothラジオが利用可能かチェック
    #[cfg(target_os = "linux")]
    pub async fn check_bluetooth_available() -> bool {
        std::path::Path::new("/sys/class/bluetooth").exists()
    }

    /// Bluetoothラジオが利用可能かチェック
    #[cfg(not(any(windows, target_os = "linux")))]
    pub async fn check_bluetooth_available() -> bool {
        false
    }
}
