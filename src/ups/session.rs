use crate::prelude::*;

use super::{Command, RESPONSE_LIMIT};

use async_trait::async_trait;
use std::time::Duration;

/// A byte pipe to the UPS.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    async fn close(&mut self);

    async fn write(&mut self, frame: &[u8]) -> Result<()>;

    /// Read up to `max` bytes, returning whatever arrived before the transport's timeout.
    async fn read(&mut self, max: usize) -> Result<Vec<u8>>;
}

// Timings {{{
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timings {
    /// After each wakeup frame, before draining the reply.
    pub wakeup_delay: Duration,
    /// After the whole wakeup sequence.
    pub wakeup_pause: Duration,
    /// Between writing a query and reading its reply.
    pub response_delay: Duration,
    /// Wait after a failed open.
    pub connect_retry: Duration,
    /// Wait after a failed cycle.
    pub cycle_retry: Duration,
    /// Granularity of the sleep between polls.
    pub tick: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            wakeup_delay: Duration::from_millis(300),
            wakeup_pause: Duration::from_millis(500),
            response_delay: Duration::from_millis(500),
            connect_retry: Duration::from_secs(10),
            cycle_retry: Duration::from_secs(5),
            tick: Duration::from_secs(1),
        }
    }
}

impl Timings {
    pub fn zero() -> Self {
        Self {
            wakeup_delay: Duration::ZERO,
            wakeup_pause: Duration::ZERO,
            response_delay: Duration::ZERO,
            connect_retry: Duration::ZERO,
            cycle_retry: Duration::ZERO,
            tick: Duration::ZERO,
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
// }}}

pub struct Session<T> {
    transport: T,
    timings: Timings,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, timings: Timings) -> Self {
        Self { transport, timings }
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub async fn open(&mut self) -> Result<()> {
        self.transport.open().await
    }

    pub async fn close(&mut self) {
        if self.transport.is_open() {
            self.transport.close().await;
            info!("disconnected from UPS");
        }
    }

    /// Send the wakeup frames, draining whatever each one provokes.
    pub async fn wake_up(&mut self) -> Result<()> {
        debug!("waking up UPS");

        for frame in super::wakeup_frames()? {
            self.transport.write(&frame).await?;
            pause(self.timings.wakeup_delay).await;
            let drained = self.transport.read(RESPONSE_LIMIT).await?;
            trace!("wakeup {} -> {}", hex::encode(&frame), hex::encode(&drained));
        }

        pause(self.timings.wakeup_pause).await;

        Ok(())
    }

    /// Send `command` and return its raw reply, which may be empty.
    pub async fn query(&mut self, command: Command) -> Result<Vec<u8>> {
        let frame = command.frame()?;

        self.transport.write(&frame).await?;
        pause(self.timings.response_delay).await;
        let response = self.transport.read(RESPONSE_LIMIT).await?;

        debug!(
            "{} -> {} bytes: {}",
            command.description(),
            response.len(),
            hex::encode(&response)
        );

        Ok(response)
    }
}
