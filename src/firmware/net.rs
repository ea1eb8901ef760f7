use core::net::Ipv4Addr;

use embassy_net::{tcp::TcpSocket, IpAddress, Runner, Stack, StackResources};
use embassy_time::{with_timeout, Duration};
use embedded_io_async::Write;
use esp_hal::rng::Rng;
use esp_radio::wifi::{InternalWifiError, WifiController, WifiDevice, WifiError};
use static_cell::StaticCell;

use super::wifi::wifi_runtime_config;
use crate::{
    error::{ConnectError, SendError},
    transport::Transport,
    types::Endpoint,
};

const TCP_RX_BUF: usize = 512;
// One encoded frame is tens of KiB; the socket drains it in chunks.
const TCP_TX_BUF: usize = 4096;
const TCP_SOCKET_TIMEOUT_MS: u64 = 10_000;
const TCP_FLUSH_TIMEOUT_MS: u64 = 5_000;

pub struct NetRuntime {
    pub controller: WifiController<'static>,
    pub runner: Runner<'static, WifiDevice<'static>>,
    pub stack: Stack<'static>,
}

pub fn setup(wifi: esp_hal::peripherals::WIFI<'static>) -> Result<NetRuntime, &'static str> {
    static RADIO_CTRL: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    static STACK_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();

    let radio_ctrl = esp_radio::init().map_err(|err| {
        log::error!("net: esp_radio::init err={:?}", err);
        "net: esp_radio::init failed"
    })?;
    let radio_ctrl = RADIO_CTRL.init(radio_ctrl);
    let (controller, ifaces) = esp_radio::wifi::new(radio_ctrl, wifi, wifi_runtime_config())
        .map_err(|err| match err {
            WifiError::InvalidArguments => "net: wifi init failed invalid_args",
            WifiError::Unsupported => "net: wifi init failed unsupported",
            WifiError::NotInitialized => "net: wifi init failed not_initialized",
            WifiError::InternalError(InternalWifiError::NoMem) => "net: wifi init failed no_mem",
            _ => "net: wifi init failed other",
        })?;

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    let (stack, runner) = embassy_net::new(
        ifaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        STACK_RESOURCES.init(StackResources::<3>::new()),
        seed,
    );

    Ok(NetRuntime {
        controller,
        runner,
        stack,
    })
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// One reusable TCP socket over static buffers.
pub struct EspTcpTransport {
    socket: TcpSocket<'static>,
}

impl EspTcpTransport {
    pub fn new(stack: Stack<'static>) -> Self {
        static RX_BUFFER: StaticCell<[u8; TCP_RX_BUF]> = StaticCell::new();
        static TX_BUFFER: StaticCell<[u8; TCP_TX_BUF]> = StaticCell::new();

        let rx_buffer = RX_BUFFER.init([0u8; TCP_RX_BUF]);
        let tx_buffer = TX_BUFFER.init([0u8; TCP_TX_BUF]);
        let mut socket = TcpSocket::new(stack, &mut rx_buffer[..], &mut tx_buffer[..]);
        socket.set_timeout(Some(Duration::from_millis(TCP_SOCKET_TIMEOUT_MS)));
        Self { socket }
    }
}

impl Transport for EspTcpTransport {
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), ConnectError> {
        let addr: Ipv4Addr = endpoint
            .host
            .parse()
            .map_err(|_| ConnectError::InvalidEndpoint)?;
        // A previous session may have left the socket half closed.
        self.socket.abort();

        self.socket
            .connect((IpAddress::Ipv4(addr), endpoint.port))
            .await
            .map_err(|err| match err {
                embassy_net::tcp::ConnectError::TimedOut => ConnectError::TimedOut,
                embassy_net::tcp::ConnectError::NoRoute => ConnectError::Unreachable,
                embassy_net::tcp::ConnectError::ConnectionReset
                | embassy_net::tcp::ConnectError::InvalidState => ConnectError::Refused,
            })
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        self.socket
            .write_all(bytes)
            .await
            .map_err(|_| SendError::ConnectionReset)?;
        match with_timeout(
            Duration::from_millis(TCP_FLUSH_TIMEOUT_MS),
            self.socket.flush(),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SendError::ConnectionReset),
            Err(_) => Err(SendError::TimedOut),
        }
    }

    fn shutdown(&mut self) {
        self.socket.close();
        self.socket.abort();
    }
}
