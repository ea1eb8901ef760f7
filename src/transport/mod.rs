//! TCP session to the ingest server.
//!
//! At most one connection exists at a time. Any send failure leaves the
//! session closed; reopening is always a fresh connect.

pub mod wire;

use log::{info, warn};

use crate::{
    error::{ConnectError, SendError},
    types::Endpoint,
};

#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), ConnectError>;

    /// Writes the whole buffer or fails; partial writes are not reported.
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), SendError>;

    /// Releases the socket. Must tolerate an already closed socket.
    fn shutdown(&mut self);
}

pub struct TransportSession<T> {
    transport: T,
    open: bool,
    bytes_sent: u64,
    messages_sent: u32,
}

impl<T: Transport> TransportSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            open: false,
            bytes_sent: 0,
            messages_sent: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Bytes written since the last successful open.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn messages_sent(&self) -> u32 {
        self.messages_sent
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn open(&mut self, endpoint: &Endpoint) -> Result<(), ConnectError> {
        if self.open {
            self.close();
        }

        match self.transport.connect(endpoint).await {
            Ok(()) => {
                self.open = true;
                self.bytes_sent = 0;
                self.messages_sent = 0;
                info!("transport: connected host={} port={}", endpoint.host, endpoint.port);
                Ok(())
            }
            Err(err) => {
                // The socket may be half set up.
                self.transport.shutdown();
                warn!(
                    "transport: connect host={} port={} err={}",
                    endpoint.host,
                    endpoint.port,
                    err.as_str()
                );
                Err(err)
            }
        }
    }

    pub async fn send(&mut self, message: &[u8]) -> Result<(), SendError> {
        if !self.open {
            return Err(SendError::NotOpen);
        }

        match self.transport.write_all(message).await {
            Ok(()) => {
                self.bytes_sent += message.len() as u64;
                self.messages_sent = self.messages_sent.saturating_add(1);
                Ok(())
            }
            Err(err) => {
                warn!("transport: send bytes={} err={}", message.len(), err.as_str());
                self.close();
                Err(err)
            }
        }
    }

    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.transport.shutdown();
        self.open = false;
        info!(
            "transport: closed messages={} bytes={}",
            self.messages_sent, self.bytes_sent
        );
    }
}
