#![allow(dead_code)]

use ups_bridge::prelude::*;
use ups_bridge::ups::Transport;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Factory;

impl Factory {
    pub fn capture() -> Capture {
        Capture {
            timestamp: "2024-03-01 12:00:00".to_string(),
            uptime: "00:01:40".to_string(),
        }
    }

    /// A device response: an opaque 5-byte header followed by `values` big-endian.
    pub fn response(values: &[u16]) -> Vec<u8> {
        let mut r = vec![0x0a, 0x03, 0x36, 0x00, 0x00];
        for v in values {
            r.extend_from_slice(&v.to_be_bytes());
        }
        r
    }

    /// `len` zero words with `(offset, value)` pairs set.
    pub fn words(len: usize, set: &[(usize, u16)]) -> Vec<u16> {
        let mut words = vec![0; len];
        for &(offset, value) in set {
            words[offset] = value;
        }
        words
    }

    /// A typical reply to the main parameters query, as seen by the range matcher.
    pub fn main_parameters() -> Vec<u8> {
        Self::response(&[2250, 2280, 500, 95, 15, 35, 1234])
    }

    /// A reply carrying only battery voltage and level.
    pub fn battery() -> Vec<u8> {
        Self::response(&[136, 100])
    }

    pub fn telemetry() -> Telemetry {
        Telemetry {
            input_voltage: 228.0,
            output_voltage: 225.0,
            battery_voltage: 13.5,
            battery_level: 100,
            load_percent: 15,
            load_power: 140,
            frequency: 50.0,
            input_frequency: 50.0,
            temperature: 35,
            timestamp: "2024-03-01 12:00:00".to_string(),
            status: Status::Online,
            uptime: "00:01:40".to_string(),
            extended: None,
        }
    }
}

// MockTransport {{{
#[derive(Debug, Default)]
pub struct Script {
    /// Number of upcoming `open` calls that fail.
    pub open_failures: u32,
    pub opens: u32,
    pub is_open: bool,
    pub fail_writes: bool,
    /// Reply queued up by writing the key frame.
    pub replies: HashMap<Vec<u8>, Vec<u8>>,
    pub writes: Vec<Vec<u8>>,
    pending: Vec<u8>,
}

/// A scripted transport. Clones share the script so tests can inspect it after
/// handing one to a `Session`.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, command: ups::Command, response: Vec<u8>) -> Self {
        self.set_reply(command, response);
        self
    }

    pub fn set_reply(&self, command: ups::Command, response: Vec<u8>) {
        self.script()
            .replies
            .insert(command.frame().unwrap(), response);
    }

    pub fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.script().writes.clone()
    }

    pub fn wrote(&self, command: ups::Command) -> bool {
        let frame = command.frame().unwrap();
        self.script().writes.iter().any(|w| *w == frame)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&mut self) -> Result<()> {
        let mut s = self.script();
        s.opens += 1;
        if s.open_failures > 0 {
            s.open_failures -= 1;
            bail!("mock: no such device");
        }
        s.is_open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.script().is_open
    }

    async fn close(&mut self) {
        self.script().is_open = false;
    }

    async fn write(&mut self, frame: &[u8]) -> Result<()> {
        let mut s = self.script();
        if s.fail_writes {
            bail!("mock: write failed");
        }
        s.writes.push(frame.to_vec());
        s.pending = s.replies.get(frame).cloned().unwrap_or_default();
        Ok(())
    }

    async fn read(&mut self, max: usize) -> Result<Vec<u8>> {
        let mut s = self.script();
        let n = max.min(s.pending.len());
        Ok(s.pending.drain(..n).collect())
    }
}
// }}}
