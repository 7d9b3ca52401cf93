// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! floor execution engine
//!
//! Builds an office from declarations, then runs processes against it:
//! - Thread chains of function states, handed between teams
//! - Managed resource containers with asynchronous completion
//! - Governance and administration around function bodies
//! - Escalation through function, thread, and office procedures

mod administration;
mod builder;
mod container;
mod error;
mod escalation;
mod executor;
mod floor;
mod function;
mod governance;
mod meta;
mod monitor;
mod office;
mod process;
mod spawn;
mod state;

pub use administration::{
    Administration, AdministrationContext, AdministrationFn, AdministrationSource,
    GovernanceControl,
};
pub use builder::{AdministrationDecl, FunctionDecl, GovernanceDecl, OfficeBuilder, ResourceDecl};
pub use error::{BuildError, LifecycleError};
pub use escalation::{EscalationHandler, StderrEscalationHandler};
pub use floor::OfficeFloor;
pub use function::{FunctionContext, ManagedFunction};
pub use office::Office;
pub use process::ProcessManager;
