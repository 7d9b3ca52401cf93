// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Team implementations and team sources

pub mod blocking;
pub mod one_person;
pub mod passive;
pub mod registry;
pub mod thread_local;
pub mod traced;
pub mod worker_pool;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use blocking::{TokioBlockingTeam, TokioBlockingTeamSource};
pub use one_person::{OnePersonTeam, OnePersonTeamSource};
pub use passive::{PassiveTeam, PassiveTeamSource};
pub use registry::TeamSourceRegistry;
pub use thread_local::{with_hooks, ThreadLocalAwareTeam};
pub use traced::{TracedOversight, TracedTeam};
pub use worker_pool::{WorkerPoolTeam, WorkerPoolTeamSource};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTeam, TeamCall};

use floor_core::{Job, PropertySpec};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Property every built-in source understands
pub const THREAD_LOCAL_AWARE: &str = "thread_local_aware";

pub(crate) fn common_properties() -> Vec<PropertySpec> {
    vec![PropertySpec::optional(
        THREAD_LOCAL_AWARE,
        "Prime thread-local hooks around each job",
        "false",
    )]
}

/// Run a job on a worker thread, keeping the worker alive if the job panics
pub(crate) fn run_on_worker(team: &str, job: Job) {
    let name = job.name().to_string();
    if catch_unwind(AssertUnwindSafe(|| job.run())).is_err() {
        tracing::error!(team, job = %name, "job panicked");
    }
}
