use nova_hir::SymbolId;
use nova_syntax::{Location, Span};
use serde::Serialize;

use crate::scan::Role;

/// Where a usage sits relative to the host class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessibilityContext {
    /// Inside the host class or a type nested in it.
    HostClass,
    /// Inside the given (transitive) subclass of the host.
    Subclass(SymbolId),
    External,
}

/// A classified usage found by [`crate::scan`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Usage {
    /// A base member referenced without a receiver.
    UnqualifiedMemberUse { member: SymbolId },
    /// A base member referenced through `this`, `super` or another host instance.
    QualifiedMemberUse { member: SymbolId, receiver: Location },
    /// A host instance converted to the base type or one of its non-root ancestors.
    TypedUpcast { target: SymbolId, role: Role },
    /// A host instance converted to the root type.
    RootUpcast { role: Role },
    /// A subclass method that will stop overriding a concrete base method.
    LostOverride {
        method: SymbolId,
        overridden: SymbolId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    UnqualifiedMemberUse,
    QualifiedMemberUse,
    TypedUpcast,
    RootUpcast,
    LostOverride,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UsageRecord {
    pub usage: Usage,
    /// The reference or instance expression; the method declaration for
    /// [`Usage::LostOverride`].
    pub location: Location,
    pub span: Span,
    /// Innermost class containing the usage.
    pub container: SymbolId,
    pub context: AccessibilityContext,
}

impl UsageRecord {
    pub fn kind(&self) -> UsageKind {
        match self.usage {
            Usage::UnqualifiedMemberUse { .. } => UsageKind::UnqualifiedMemberUse,
            Usage::QualifiedMemberUse { .. } => UsageKind::QualifiedMemberUse,
            Usage::TypedUpcast { .. } => UsageKind::TypedUpcast,
            Usage::RootUpcast { .. } => UsageKind::RootUpcast,
            Usage::LostOverride { .. } => UsageKind::LostOverride,
        }
    }

    /// The referenced member, or the overriding method of a lost override.
    pub fn member(&self) -> Option<SymbolId> {
        match self.usage {
            Usage::UnqualifiedMemberUse { member } | Usage::QualifiedMemberUse { member, .. } => {
                Some(member)
            }
            Usage::LostOverride { method, .. } => Some(method),
            Usage::TypedUpcast { .. } | Usage::RootUpcast { .. } => None,
        }
    }

    pub fn is_member_use(&self) -> bool {
        matches!(
            self.usage,
            Usage::UnqualifiedMemberUse { .. } | Usage::QualifiedMemberUse { .. }
        )
    }
}
