use embassy_net::Stack;
use embassy_time::{with_timeout, Duration};
use esp_radio::wifi::{
    AuthMethod, ClientConfig, Config as WifiRuntimeConfig, ModeConfig, ScanMethod, WifiController,
};
use log::{info, warn};

use crate::{error::RadioError, link::WifiRadio, types::WifiCredentials};

const WIFI_RX_QUEUE_SIZE: usize = 3;
const WIFI_TX_QUEUE_SIZE: usize = 2;
const WIFI_STATIC_RX_BUF_NUM: u8 = 4;
const WIFI_DYNAMIC_RX_BUF_NUM: u16 = 8;
const WIFI_DYNAMIC_TX_BUF_NUM: u16 = 8;
const WIFI_RX_BA_WIN: u8 = 3;
const WIFI_CONNECT_TIMEOUT_MS: u64 = 8_000;

pub(super) fn wifi_runtime_config() -> WifiRuntimeConfig {
    WifiRuntimeConfig::default()
        .with_rx_queue_size(WIFI_RX_QUEUE_SIZE)
        .with_tx_queue_size(WIFI_TX_QUEUE_SIZE)
        .with_static_rx_buf_num(WIFI_STATIC_RX_BUF_NUM)
        .with_dynamic_rx_buf_num(WIFI_DYNAMIC_RX_BUF_NUM)
        .with_dynamic_tx_buf_num(WIFI_DYNAMIC_TX_BUF_NUM)
        .with_ampdu_rx_enable(false)
        .with_ampdu_tx_enable(false)
        .with_rx_ba_win(WIFI_RX_BA_WIN)
}

fn mode_config(credentials: &WifiCredentials) -> ModeConfig {
    let auth_method = if credentials.is_open_network() {
        AuthMethod::None
    } else {
        AuthMethod::Wpa2Personal
    };
    ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(credentials.ssid.as_str().into())
            .with_password(credentials.password.as_str().into())
            .with_auth_method(auth_method)
            .with_scan_method(ScanMethod::AllChannels),
    )
}

/// Station-mode radio. Associated means L2 connected, link up and a DHCP
/// lease on the stack.
pub struct EspWifiRadio {
    controller: WifiController<'static>,
    stack: Stack<'static>,
    config_applied: bool,
}

impl EspWifiRadio {
    pub fn new(controller: WifiController<'static>, stack: Stack<'static>) -> Self {
        Self {
            controller,
            stack,
            config_applied: false,
        }
    }
}

impl WifiRadio for EspWifiRadio {
    async fn associate(&mut self, credentials: &WifiCredentials) -> Result<(), RadioError> {
        if !self.config_applied {
            if let Err(err) = self.controller.set_config(&mode_config(credentials)) {
                warn!("wifi: station config err={:?}", err);
                return Err(RadioError::Config);
            }
            self.config_applied = true;
        }

        match self.controller.is_started() {
            Ok(true) => {}
            Ok(false) => {
                if let Err(err) = self.controller.start_async().await {
                    warn!("wifi: start err={:?}", err);
                    return Err(RadioError::Start);
                }
            }
            Err(err) => {
                warn!("wifi: status err={:?}", err);
                return Err(RadioError::Start);
            }
        }

        if matches!(self.controller.is_connected(), Ok(true)) {
            // Associated already; the lease is still pending.
            return Ok(());
        }

        match with_timeout(
            Duration::from_millis(WIFI_CONNECT_TIMEOUT_MS),
            self.controller.connect_async(),
        )
        .await
        {
            Ok(Ok(())) => {
                info!("wifi: associated ssid={}", credentials.ssid.as_str());
                Ok(())
            }
            Ok(Err(err)) => {
                warn!("wifi: connect err={:?}", err);
                let _ = self.controller.disconnect_async().await;
                Err(RadioError::Connect)
            }
            Err(_) => {
                warn!("wifi: connect timeout ms={}", WIFI_CONNECT_TIMEOUT_MS);
                let _ = self.controller.disconnect_async().await;
                Err(RadioError::Timeout)
            }
        }
    }

    fn is_associated(&mut self) -> bool {
        matches!(self.controller.is_connected(), Ok(true))
            && self.stack.is_link_up()
            && self.stack.config_v4().is_some()
    }
}
