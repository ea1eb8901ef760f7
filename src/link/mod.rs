//! WiFi link manager.
//!
//! Owns [`LinkState`]. One call to [`LinkManager::ensure_connected`] is one
//! bounded association attempt; escalation is up to the caller.


use log::{info, warn};

use crate::{
    clock::Clock,
    config::LinkPolicy,
    error::RadioError,
    types::{LinkState, WifiCredentials},
};

#[allow(async_fn_in_trait)]
pub trait WifiRadio {
    /// Starts association with the configured access point.
    async fn associate(&mut self, credentials: &WifiCredentials) -> Result<(), RadioError>;

    /// Non-blocking; true only once the station holds an IPv4 lease.
    fn is_associated(&mut self) -> bool;
}

pub struct LinkManager<R> {
    radio: R,
    state: LinkState,
    policy: LinkPolicy,
}

impl<R: WifiRadio> LinkManager<R> {
    pub fn new(radio: R, policy: LinkPolicy) -> Self {
        Self {
            radio,
            state: LinkState::Disconnected,
            policy,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub async fn ensure_connected<C: Clock>(
        &mut self,
        credentials: &WifiCredentials,
        clock: &mut C,
    ) -> bool {
        if self.radio.is_associated() {
            self.state = LinkState::Connected;
            return true;
        }

        self.state = LinkState::Connecting;
        info!(
            "link: associating ssid={} budget_ms={}",
            credentials.ssid.as_str(),
            self.policy.budget_ms()
        );
        if let Err(err) = self.radio.associate(credentials).await {
            warn!("link: associate err={}", err.as_str());
            self.state = LinkState::Disconnected;
            return false;
        }

        let mut polls = 0u16;
        while !self.radio.is_associated() && polls < self.policy.poll_attempts {
            clock.sleep_ms(self.policy.poll_interval_ms).await;
            polls += 1;
        }

        if self.radio.is_associated() {
            self.state = LinkState::Connected;
            info!("link: connected after polls={}", polls);
            true
        } else {
            self.state = LinkState::Disconnected;
            warn!("link: not connected after polls={}", polls);
            false
        }
    }

    pub fn is_connected(&mut self) -> bool {
        let associated = self.radio.is_associated();
        self.state = match (self.state, associated) {
            (_, true) => LinkState::Connected,
            (LinkState::Connecting, false) => LinkState::Connecting,
            (_, false) => LinkState::Disconnected,
        };
        associated
    }
}
