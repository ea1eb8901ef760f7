use heapless::String;

pub const WIFI_SSID_MAX: usize = 32;
pub const WIFI_PASSWORD_MAX: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: String<WIFI_SSID_MAX>,
    pub password: String<WIFI_PASSWORD_MAX>,
}

impl WifiCredentials {
    pub fn from_parts(ssid: &str, password: &str) -> Result<Self, &'static str> {
        if ssid.is_empty() {
            return Err("wifi ssid empty");
        }
        let mut credentials = Self {
            ssid: String::new(),
            password: String::new(),
        };
        credentials
            .ssid
            .push_str(ssid)
            .map_err(|_| "wifi ssid too long")?;
        credentials
            .password
            .push_str(password)
            .map_err(|_| "wifi password too long")?;
        Ok(credentials)
    }

    pub fn is_open_network(&self) -> bool {
        self.password.is_empty()
    }
}

/// Fixed remote peer of the frame stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: &'static str,
    pub port: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

impl LinkState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceSnapshot {
    pub free_bytes: usize,
    pub allocated_bytes: usize,
}

impl ResourceSnapshot {
    pub const fn total_bytes(self) -> usize {
        self.free_bytes.saturating_add(self.allocated_bytes)
    }
}
