use crate::types::{Endpoint, WifiCredentials};

pub const LABELS: [&str; 5] = ["apple", "banana", "orange", "pear", "grape"];
pub const MAX_LABELS: usize = 16;

pub const DEFAULT_SERVER_HOST: &str = "192.168.31.190";
pub const DEFAULT_SERVER_PORT: u16 = 8234;

// Model input is a centred square cut from the sensor frame.
pub const INPUT_SIZE: u16 = 96;
pub const MIN_FREE_BYTES: usize = 20 * 1024;
pub const MAX_FAILURES_BEFORE_RESTART: u8 = 3;
pub const FRAME_TIMEOUT_MS: u64 = 30_000;
pub const COLLECT_INTERVAL_MS: u64 = 10 * 60 * 1000;
pub const COMPRESS_QUALITY: u8 = 35;
pub const INTER_FRAME_DELAY_MS: u32 = 500;

pub const WIFI_POLL_INTERVAL_MS: u32 = 100;
pub const WIFI_POLL_ATTEMPTS: u16 = 100;
pub const LOW_MEMORY_BACKOFF_MS: u32 = 1_000;
pub const RETRY_BACKOFF_MS: u32 = 5_000;
pub const RESTART_PAUSE_MS: u32 = 2_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkPolicy {
    pub poll_interval_ms: u32,
    pub poll_attempts: u16,
}

impl LinkPolicy {
    pub const fn defaults() -> Self {
        Self {
            poll_interval_ms: WIFI_POLL_INTERVAL_MS,
            poll_attempts: WIFI_POLL_ATTEMPTS,
        }
    }

    pub const fn budget_ms(self) -> u64 {
        self.poll_interval_ms as u64 * self.poll_attempts as u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentConfig {
    pub endpoint: Endpoint,
    pub labels: &'static [&'static str],
    pub input_size: u16,
    pub min_free_bytes: usize,
    pub max_failures_before_restart: u8,
    pub frame_timeout_ms: u64,
    pub collect_interval_ms: u64,
    pub compress_quality: u8,
    pub inter_frame_delay_ms: u32,
    pub link: LinkPolicy,
    pub low_memory_backoff_ms: u32,
    pub retry_backoff_ms: u32,
    pub restart_pause_ms: u32,
}

impl AgentConfig {
    pub const fn defaults() -> Self {
        Self {
            endpoint: Endpoint {
                host: DEFAULT_SERVER_HOST,
                port: DEFAULT_SERVER_PORT,
            },
            labels: &LABELS,
            input_size: INPUT_SIZE,
            min_free_bytes: MIN_FREE_BYTES,
            max_failures_before_restart: MAX_FAILURES_BEFORE_RESTART,
            frame_timeout_ms: FRAME_TIMEOUT_MS,
            collect_interval_ms: COLLECT_INTERVAL_MS,
            compress_quality: COMPRESS_QUALITY,
            inter_frame_delay_ms: INTER_FRAME_DELAY_MS,
            link: LinkPolicy::defaults(),
            low_memory_backoff_ms: LOW_MEMORY_BACKOFF_MS,
            retry_backoff_ms: RETRY_BACKOFF_MS,
            restart_pause_ms: RESTART_PAUSE_MS,
        }
    }

    /// Defaults with the server endpoint taken from the build environment.
    pub fn from_build_env() -> Self {
        let mut config = Self::defaults();
        config.endpoint = compiled_endpoint();
        config
    }

    /// Clamps values that would break the control loop if zero or oversized.
    pub fn sanitized(mut self) -> Self {
        self.max_failures_before_restart = self.max_failures_before_restart.max(1);
        self.compress_quality = self.compress_quality.clamp(1, 100);
        self.input_size = self.input_size.max(1);
        self.link.poll_interval_ms = self.link.poll_interval_ms.max(1);
        if self.labels.len() > MAX_LABELS {
            self.labels = &self.labels[..MAX_LABELS];
        }
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

pub fn compiled_wifi_credentials() -> Option<WifiCredentials> {
    let ssid = option_env!("EDGECAM_WIFI_SSID").or(option_env!("SSID"))?;
    let password = option_env!("EDGECAM_WIFI_PASSWORD")
        .or(option_env!("PASSWORD"))
        .unwrap_or("");
    WifiCredentials::from_parts(ssid, password).ok()
}

fn compiled_endpoint() -> Endpoint {
    let host = option_env!("EDGECAM_SERVER_HOST").unwrap_or(DEFAULT_SERVER_HOST);
    let port = option_env!("EDGECAM_SERVER_PORT")
        .and_then(parse_port)
        .unwrap_or(DEFAULT_SERVER_PORT);
    Endpoint { host, port }
}

fn parse_port(raw: &str) -> Option<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}
