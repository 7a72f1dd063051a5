pub use anyhow::{anyhow, bail, Error, Result};
pub use log::{debug, error, info, trace, warn};
pub use tokio::sync::broadcast;

pub use crate::alarms::{self, Alarm, Thresholds};
pub use crate::channels::Channels;
pub use crate::codec::{self, CodeTable, CodeTables, RegisterMap};
pub use crate::config::{self, Config};
pub use crate::mqtt;
pub use crate::options::Options;
pub use crate::parser::{self, Decode, Parser};
pub use crate::state::State;
pub use crate::telemetry::{Capture, ExtendedTelemetry, Status, Telemetry};
pub use crate::ups;
