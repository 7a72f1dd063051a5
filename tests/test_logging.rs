mod common;
use common::*;

use std::io::Write;
use std::sync::{Arc, Mutex};
use ups_bridge::logging::{filter_for, Tee};

#[derive(Clone, Default)]
struct Shared(Arc<Mutex<Vec<u8>>>);

impl Write for Shared {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn level_names() {
    common_setup();

    assert_eq!(filter_for("INFO"), "info");
    assert_eq!(filter_for("warning"), "warn");
    assert_eq!(filter_for("WARN"), "warn");
    assert_eq!(filter_for("DEBUG"), "debug");
    assert_eq!(filter_for("ERROR"), "error");
    assert_eq!(filter_for("CRITICAL"), "error");
    assert_eq!(filter_for("bogus"), "info");
}

#[test]
fn tee_writes_to_every_sink() -> anyhow::Result<()> {
    let a = Shared::default();
    let b = Shared::default();

    let mut tee = Tee::new(vec![Box::new(a.clone()), Box::new(b.clone())]);
    writeln!(tee, "battery low")?;
    tee.flush()?;

    assert_eq!(a.0.lock().unwrap().as_slice(), b"battery low\n");
    assert_eq!(b.0.lock().unwrap().as_slice(), b"battery low\n");

    Ok(())
}
