use embassy_time::{Instant, Timer};

use crate::clock::Clock;

#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }

    async fn sleep_ms(&mut self, ms: u32) {
        Timer::after_millis(ms as u64).await;
    }
}
