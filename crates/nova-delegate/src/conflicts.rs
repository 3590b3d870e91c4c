//! Turns usage records into the conflicts a user has to review before a
//! conversion runs.

use std::collections::{BTreeMap, HashSet};

use nova_hir::SymbolId;
use nova_syntax::Location;
use serde::Serialize;

use crate::config::DelegationSurface;
use crate::db::DelegationDatabase;
use crate::members::DelegationTarget;
use crate::usage::{Usage, UsageRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictCategory {
    /// A host instance used as the root type; never repaired.
    RootUpcast,
    /// A host instance used as a base-chain type the host stops being.
    TypedUpcast,
    /// A use of a base member the surface does not forward.
    ExcludedMember,
    /// A subclass method that stops overriding a base method.
    LostOverride,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Conflict {
    pub category: ConflictCategory,
    /// Class containing the usages.
    pub container: SymbolId,
    /// The member, target type or overriding method the conflict is about.
    pub subject: Option<SymbolId>,
    /// Every usage folded into this conflict, in scan order.
    pub locations: Vec<Location>,
    pub message: String,
}

/// Whether `member` is forwarded by `surface`, either directly or through a
/// forwarded method with the same name and arity.
pub(crate) fn is_forwarded(
    db: &dyn DelegationDatabase,
    surface: &DelegationSurface,
    member: SymbolId,
) -> bool {
    if surface.is_forwarded(member) {
        return true;
    }
    let Some(method) = db.method(member) else {
        return false;
    };
    surface.methods.iter().any(|forwarded| {
        db.method(forwarded.member).is_some_and(|candidate| {
            candidate.name == method.name && candidate.arity() == method.arity()
        })
    })
}

/// Deduplicated, deterministically ordered conflicts for `records`.
///
/// Root upcasts and lost overrides are reported one per record. Typed upcasts
/// and excluded member uses are grouped per subject and containing class and
/// only reported under the strict policy.
pub fn analyze_conflicts(
    db: &dyn DelegationDatabase,
    target: &DelegationTarget,
    records: &[UsageRecord],
    surface: &DelegationSurface,
) -> Vec<Conflict> {
    let retained: HashSet<SymbolId> = target.retained_supertypes(db, &surface.interfaces);
    let host = db.name(target.host);

    let mut conflicts = Vec::new();
    let mut grouped: BTreeMap<(ConflictCategory, SymbolId, SymbolId), Vec<Location>> =
        BTreeMap::new();

    for record in records {
        match &record.usage {
            Usage::RootUpcast { .. } => conflicts.push(Conflict {
                category: ConflictCategory::RootUpcast,
                container: record.container,
                subject: None,
                locations: vec![record.location.clone()],
                message: format!(
                    "`{host}` instance used as `{}` will no longer be a `{}`",
                    db.name(db.root_type()),
                    db.name(target.base),
                ),
            }),
            Usage::LostOverride { method, overridden } => {
                let owner = db
                    .method(*overridden)
                    .map_or(target.base, |data| data.owner);
                conflicts.push(Conflict {
                    category: ConflictCategory::LostOverride,
                    container: record.container,
                    subject: Some(*method),
                    locations: vec![record.location.clone()],
                    message: format!(
                        "`{}.{}` will no longer override `{}.{}`",
                        db.name(record.container),
                        db.name(*method),
                        db.name(owner),
                        db.name(*overridden),
                    ),
                });
            }
            Usage::TypedUpcast { target: ty, .. } => {
                if surface.is_strict() && !retained.contains(ty) {
                    grouped
                        .entry((ConflictCategory::TypedUpcast, record.container, *ty))
                        .or_default()
                        .push(record.location.clone());
                }
            }
            Usage::UnqualifiedMemberUse { member } | Usage::QualifiedMemberUse { member, .. } => {
                let excluded = surface.is_strict()
                    && target.surface.declares(*member)
                    && !db.symbol(*member).is_static()
                    && !is_forwarded(db, surface, *member);
                if excluded {
                    grouped
                        .entry((ConflictCategory::ExcludedMember, record.container, *member))
                        .or_default()
                        .push(record.location.clone());
                }
            }
        }
    }

    for ((category, container, subject), locations) in grouped {
        let message = match category {
            ConflictCategory::TypedUpcast => format!(
                "`{host}` will no longer be a `{}` where `{}` uses it as one",
                db.name(subject),
                db.name(container),
            ),
            _ => format!(
                "`{}` is not forwarded; `{}` must reach it through the delegate",
                db.name(subject),
                db.name(container),
            ),
        };
        conflicts.push(Conflict {
            category,
            container,
            subject: Some(subject),
            locations,
            message,
        });
    }

    conflicts.sort();
    tracing::debug!(
        target: "nova.delegate",
        records = records.len(),
        conflicts = conflicts.len(),
        "analyzed conflicts"
    );
    conflicts
}
