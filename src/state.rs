use crate::prelude::*;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Daemon state shared between the poller, the web server and shutdown handling.
pub struct State {
    telemetry: RwLock<Arc<Telemetry>>,
    running: AtomicBool,
    connection_errors: AtomicU32,
    started: Instant,
    shutdown: broadcast::Sender<()>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    pub fn new() -> Self {
        Self {
            telemetry: RwLock::new(Arc::new(Telemetry::default())),
            running: AtomicBool::new(true),
            connection_errors: AtomicU32::new(0),
            started: Instant::now(),
            shutdown: broadcast::channel(1).0,
        }
    }

    // Telemetry {{{
    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn publish(&self, telemetry: Telemetry) {
        *self.telemetry.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(telemetry);
    } // }}}

    // Lifecycle {{{
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("stopping");
        }
        // nobody listening is fine
        let _ = self.shutdown.send(());
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    /// Resolves once `stop` has been called, including before this was awaited.
    pub async fn stopped(&self) {
        let mut rx = self.subscribe_shutdown();
        if !self.is_running() {
            return;
        }
        let _ = rx.recv().await;
    }

    pub fn capture(&self) -> Capture {
        Capture::now(self.started)
    }

    pub fn uptime(&self) -> String {
        crate::telemetry::format_uptime(self.started.elapsed())
    } // }}}

    // Connection errors {{{
    pub fn connection_errors(&self) -> u32 {
        self.connection_errors.load(Ordering::SeqCst)
    }

    /// Count a failed connect; returns the new total.
    pub fn record_connection_error(&self) -> u32 {
        self.connection_errors.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset_connection_errors(&self) {
        self.connection_errors.store(0, Ordering::SeqCst);
    } // }}}
}
