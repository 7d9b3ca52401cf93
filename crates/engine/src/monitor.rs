// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout monitor
//!
//! Ticks on its own thread at the configured interval, failing resource loads
//! and asynchronous flows whose deadline has passed.

use crate::office::OfficeInner;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

pub(crate) struct Monitor {
    stop: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    pub fn start(office: &Arc<OfficeInner>, interval: Duration) -> std::io::Result<Self> {
        let (stop, stopped) = mpsc::channel();
        let office: Weak<OfficeInner> = Arc::downgrade(office);
        let handle = std::thread::Builder::new()
            .name("floor-monitor".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let Some(office) = office.upgrade() else {
                            break;
                        };
                        office.check_timeouts(office.clock.now());
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        tracing::debug!(interval_ms = interval.as_millis() as u64, "monitor started");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("monitor thread panicked");
            }
        }
        tracing::debug!("monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OfficeBuilder;
    use floor_core::FakeClock;

    #[test]
    fn monitor_stops_promptly() {
        let floor = OfficeBuilder::new()
            .clock(Arc::new(FakeClock::new()))
            .build()
            .unwrap();
        let monitor = Monitor::start(floor.office().inner(), Duration::from_millis(5)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        monitor.stop();
    }
}
