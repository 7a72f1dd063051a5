use crate::prelude::*;

use super::Transport;

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};

/// How long the line is left alone after opening, before stale input is discarded.
const SETTLE_TIME: Duration = Duration::from_secs(1);

pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    timeout: Duration,
    port: Option<SerialStream>,
}

impl SerialTransport {
    pub fn new(path: &str, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            path: path.to_owned(),
            baud_rate,
            timeout,
            port: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.serial().port().unwrap_or_default(),
            config.serial().baud_rate(),
            config.serial().timeout(),
        )
    }

    fn port(&mut self) -> Result<&mut SerialStream> {
        self.port
            .as_mut()
            .ok_or_else(|| anyhow!("serial.rs:{} is not open", self.path))
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn open(&mut self) -> Result<()> {
        let mut port = tokio_serial::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open_native_async()
            .map_err(|err| anyhow!("serial.rs:failed to open {}: {}", self.path, err))?;

        port.write_data_terminal_ready(true)?;
        port.write_request_to_send(false)?;

        tokio::time::sleep(SETTLE_TIME).await;
        port.clear(ClearBuffer::Input)?;

        info!("connected to {} at {} baud", self.path, self.baud_rate);
        self.port = Some(port);

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn close(&mut self) {
        // dropping the stream closes the fd
        self.port = None;
    }

    async fn write(&mut self, frame: &[u8]) -> Result<()> {
        let port = self.port()?;
        port.write_all(frame).await?;
        port.flush().await?;
        Ok(())
    }

    async fn read(&mut self, max: usize) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let port = self.port()?;

        let mut buf = vec![0; max];
        let mut filled = 0;

        while filled < max {
            match tokio::time::timeout_at(deadline, port.read(&mut buf[filled..])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => filled += n,
                Ok(Err(err)) if err.kind() == std::io::ErrorKind::TimedOut => break,
                Ok(Err(err)) => return Err(err.into()),
                Err(_) => break,
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }
}
