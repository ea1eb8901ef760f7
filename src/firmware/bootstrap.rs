use embassy_net::Stack;
use embassy_time::Timer;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::wifi::WifiController;
use esp_rtos::embassy::Executor;
use log::{error, info, LevelFilter};
use static_cell::StaticCell;

use super::{
    clock::EmbassyClock,
    heap::{EspHeap, HEAP_BYTES},
    net::{self, EspTcpTransport},
    vision::TestPatternVision,
    wifi::EspWifiRadio,
};
use crate::{
    config::{compiled_wifi_credentials, AgentConfig},
    error::AgentExit,
    recovery::RecoveryController,
};

// Gives the UART time to drain the last log lines before a reset.
const RESET_FLUSH_MS: u64 = 100;
const PARK_INTERVAL_SECS: u64 = 60;

pub fn run() -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    let peripherals = esp_hal::init(esp_hal::Config::default());
    esp_alloc::heap_allocator!(size: HEAP_BYTES);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let runtime = match net::setup(peripherals.WIFI) {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("boot: {}", err);
            halt_forever();
        }
    };
    info!("boot: radio up heap={}", HEAP_BYTES);

    static EXECUTOR: StaticCell<Executor> = StaticCell::new();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(move |spawner| {
        spawner.must_spawn(net::net_task(runtime.runner));
        spawner.must_spawn(agent_task(runtime.controller, runtime.stack));
    });
}

#[embassy_executor::task]
async fn agent_task(controller: WifiController<'static>, stack: Stack<'static>) {
    let Some(credentials) = compiled_wifi_credentials() else {
        error!("boot: no wifi credentials; build with EDGECAM_WIFI_SSID and EDGECAM_WIFI_PASSWORD");
        loop {
            Timer::after_secs(PARK_INTERVAL_SECS).await;
        }
    };

    let mut agent = RecoveryController::new(
        AgentConfig::from_build_env(),
        credentials,
        EspWifiRadio::new(controller, stack),
        EspHeap::new(),
        EspTcpTransport::new(stack),
        TestPatternVision::new(),
        EmbassyClock,
    );

    match agent.run().await {
        AgentExit::HardRestart(reason) => {
            error!("boot: resetting device reason={}", reason.as_str());
            Timer::after_millis(RESET_FLUSH_MS).await;
            esp_hal::system::software_reset();
        }
        AgentExit::LinkUnavailable => {
            // Stays down until power cycle or external reset.
            error!("boot: wifi unavailable, agent parked");
            loop {
                Timer::after_secs(PARK_INTERVAL_SECS).await;
            }
        }
    }
}

fn halt_forever() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
