//! Replace Inheritance with Delegation.
//!
//! Converts `class Host extends Base` into a host that owns a
//! `private final Base` delegate and forwards a chosen subset of methods to
//! it. The pipeline is:
//! - [`DelegationTarget::resolve`] validates the host/base pair and computes
//!   the base's [`MemberSurface`] (`resolve_member_surface`).
//! - [`scan`] classifies every usage of host instances into [`UsageRecord`]s.
//! - [`analyze_conflicts`] turns records into the [`Conflict`]s a user must
//!   review.
//! - [`execute`] applies the conversion as one all-or-nothing transaction;
//!   [`preview`] renders it as unified diffs without touching the workspace.
//!
//! The engine reads the program through the [`db`] traits, implemented for
//! [`nova_hir::Program`].

mod config;
mod conflicts;
pub mod db;
mod edit;
mod execute;
mod members;
mod preview;
mod scan;
mod usage;

pub use config::{
    json_schema, ConfigError, DelegationConfig, DelegationPolicy, DelegationSurface,
    ForwardedMember, NamingChoices,
};
pub use conflicts::{analyze_conflicts, Conflict, ConflictCategory};
pub use db::{DelegationDatabase, SymbolResolution, WholeProgramSearch};
pub use edit::{EditOp, InsertAt, StagedWorkspace, SyntaxTreeEditing};
pub use execute::{
    execute, execute_with, EditFailure, ExecuteOptions, ExecuteReport, Phase, PhaseCheck,
};
pub use members::{
    eligible_base_types, resolve_member_surface, BaseMember, DelegationTarget, MemberKind,
    MemberSurface, PreconditionViolation,
};
pub use preview::{preview, DelegationPreview, FilePreview};
pub use scan::{scan, Role};
pub use usage::{AccessibilityContext, Usage, UsageKind, UsageRecord};
