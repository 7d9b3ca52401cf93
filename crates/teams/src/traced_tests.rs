// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fake::{FakeTeam, TeamCall};
use std::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a closure with captured tracing output
fn with_tracing<T>(f: impl FnOnce() -> T) -> (String, T) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    (logs.contents(), result)
}

#[test]
fn traced_team_logs_lifecycle_and_jobs() {
    let fake = Arc::new(FakeTeam::new("workers"));
    let traced = TracedTeam::new("workers", fake.clone());

    let (logs, _) = with_tracing(|| {
        traced.start_working().unwrap();
        traced.assign_job(Job::new("greet", || {})).unwrap();
        traced.stop_working();
    });

    assert!(logs.contains("team.start"), "logs: {logs}");
    assert!(logs.contains("working"));
    assert!(logs.contains("assigned"));
    assert!(logs.contains("job=greet"));
    assert!(logs.contains("ran"));
    assert!(logs.contains("stopped"));
    assert_eq!(
        fake.calls(),
        vec![
            TeamCall::Start,
            TeamCall::Assign {
                job: "greet".to_string()
            },
            TeamCall::Stop,
        ]
    );
}

#[test]
fn traced_team_logs_rejected_assignment() {
    let fake = Arc::new(FakeTeam::new("workers"));
    let traced = TracedTeam::new("workers", fake);

    let (logs, result) = with_tracing(|| traced.assign_job(Job::new("early", || {})));

    assert!(result.is_err());
    assert!(logs.contains("assign failed"));
}

#[test]
fn oversight_preserves_capabilities() {
    let fake: Arc<dyn Team> = Arc::new(FakeTeam::new("io").thread_local_aware());
    let overseen = TracedOversight.oversee("io", fake);
    assert!(overseen.capabilities().thread_local_aware);
}
