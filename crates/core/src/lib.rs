// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! floor-core: model types for the floor function-execution engine
//!
//! This crate provides:
//! - Escalation kinds, escalations, and escalation procedures
//! - Managed resource, governance, and team contracts
//! - Flow instigation strategies and the process invocation contract
//! - Clock and id abstractions for testable time and identity

pub mod clock;
pub mod escalation;
pub mod flow;
pub mod governance;
pub mod id;
pub mod issue;
pub mod resource;
pub mod team;

pub use clock::{Clock, FakeClock, SystemClock};
pub use escalation::{kinds, Escalation, EscalationKind, EscalationProcedure};
pub use flow::{ExecuteContext, FlowCallback, Instigation, InvokeError};
pub use governance::{
    Governance, GovernanceAction, GovernanceDeactivation, GovernanceError, GovernanceSource,
    GovernanceStatus,
};
pub use id::{IdGen, ProcessId, SequentialIdGen, UuidIdGen};
pub use issue::{ConstructionIssue, IssueKind};
pub use resource::{
    CompletionSink, CompletionToken, LoadContext, ManagedResource, ManagedResourceSource, Object,
    ResourceError, ResourceIndex, ResourceScope, ResourceSourceMetaData, ResourceStatus,
    SignalError, ValueSource,
};
pub use team::{
    Job, PropertySpec, Team, TeamCapabilities, TeamError, TeamOversight, TeamSource,
    TeamSourceContext, ThreadLocalHook,
};
