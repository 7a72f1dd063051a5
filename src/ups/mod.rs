//! Serial conversation with the UPS: fixed command frames, the transport they
//! travel over, and the wakeup/query exchange built on top.

use crate::prelude::*;

pub mod serial;
pub mod session;

pub use serial::SerialTransport;
pub use session::{Session, Timings, Transport};

/// Sent in order before each poll; some units ignore queries until they've seen these.
pub const WAKEUP_FRAMES: [&str; 4] = [
    "0103271000018f7b",
    "05034e210001c2ac",
    "06034e210001c29f",
    "0a03753000019f72",
];

/// Upper bound on bytes read back after any frame.
pub const RESPONSE_LIMIT: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    MainParameters,
    Battery,
}

impl Command {
    pub fn hex(&self) -> &'static str {
        match self {
            Command::MainParameters => "0a037530001b1eb9",
            Command::Battery => "0a037918000a5ded",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Command::MainParameters => "main parameters",
            Command::Battery => "battery",
        }
    }

    pub fn frame(&self) -> Result<Vec<u8>> {
        decode_frame(self.hex())
    }
}

pub fn wakeup_frames() -> Result<Vec<Vec<u8>>> {
    WAKEUP_FRAMES.iter().map(|hex| decode_frame(hex)).collect()
}

fn decode_frame(frame: &str) -> Result<Vec<u8>> {
    hex::decode(frame).map_err(|err| anyhow!("ups:bad frame {}: {}", frame, err))
}
