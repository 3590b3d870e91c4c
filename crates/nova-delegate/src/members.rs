//! Delegation targets and the member surface of a base type.

use std::collections::{HashMap, HashSet};

use nova_hir::{ClassType, SymbolId, Type, BUILTIN_FILE};
use nova_syntax::{CompilationUnit, TypeDecl, TypeKind, TypeRef, Visibility};
use serde::Serialize;
use thiserror::Error;

use crate::db::DelegationDatabase;

/// Why a host/base pair cannot be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionViolation {
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("`{0}` is not a class declared in the program")]
    HostNotAClass(String),
    #[error("`{0}` has no supertype eligible for delegation")]
    NoEligibleBase(String),
    #[error("`{base}` is not a direct supertype of `{host}`")]
    NotDirectSupertype { host: String, base: String },
    #[error("`{0}` declares no members beyond the root type")]
    NoMembers(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Field,
    Method,
}

/// One member inherited from the base type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMember {
    pub symbol: SymbolId,
    pub kind: MemberKind,
    pub name: String,
    /// Parameter count; zero for fields.
    pub arity: usize,
    /// Declaring type as seen from the host's supertype clause.
    pub owner: ClassType,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    /// Type parameters of `owner` mapped to their arguments.
    pub subst: HashMap<String, Type>,
}

impl BaseMember {
    pub fn is_method(&self) -> bool {
        self.kind == MemberKind::Method
    }

    /// Same kind, name and arity.
    pub fn same_signature(&self, name: &str, arity: usize) -> bool {
        self.is_method() && self.name == name && self.arity == arity
    }
}

/// The base type's ancestor chain and everything it makes available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSurface {
    /// The base type with the arguments written in the host's clause.
    pub base: ClassType,
    /// `base` followed by its ancestors, breadth-first, root excluded.
    pub chain: Vec<ClassType>,
    /// Inherited members; for overridden declarations the most derived wins.
    pub members: Vec<BaseMember>,
    /// Interfaces implemented along the chain, candidates to keep on the host.
    pub interfaces: Vec<ClassType>,
    declarations: HashSet<SymbolId>,
}

impl MemberSurface {
    /// Whether `symbol` is declared anywhere in the chain, overridden or not.
    pub fn declares(&self, symbol: SymbolId) -> bool {
        self.declarations.contains(&symbol)
    }

    pub fn chain_contains(&self, ty: SymbolId) -> bool {
        self.chain.iter().any(|class| class.symbol == ty)
    }

    pub fn member(&self, symbol: SymbolId) -> Option<&BaseMember> {
        self.members.iter().find(|member| member.symbol == symbol)
    }

    pub fn member_named(&self, name: &str) -> Option<&BaseMember> {
        self.members.iter().find(|member| member.name == name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &BaseMember> {
        self.members.iter().filter(|member| member.is_method())
    }

    pub fn interface(&self, symbol: SymbolId) -> Option<&ClassType> {
        self.interfaces.iter().find(|iface| iface.symbol == symbol)
    }
}

/// Maps the type parameters of `ty`'s declaration to its arguments; raw uses
/// map to the root type.
pub(crate) fn substitution(db: &dyn DelegationDatabase, ty: &ClassType) -> HashMap<String, Type> {
    let Some(decl) = db.type_symbol(ty.symbol) else {
        return HashMap::new();
    };
    decl.type_params
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let arg = ty
                .args
                .get(idx)
                .cloned()
                .unwrap_or_else(|| Type::class(db.root_type(), Vec::new()));
            (name.clone(), arg)
        })
        .collect()
}

pub fn resolve_member_surface(
    db: &dyn DelegationDatabase,
    base: &ClassType,
) -> Result<MemberSurface, PreconditionViolation> {
    let root = db.root_type();
    let name = db.name(base.symbol).to_string();
    if base.symbol == root {
        return Err(PreconditionViolation::NoMembers(name));
    }
    if db.type_symbol(base.symbol).is_none() {
        return Err(PreconditionViolation::UnknownType(name));
    }

    let chain: Vec<ClassType> = std::iter::once(base.clone())
        .chain(db.ancestors(base))
        .filter(|class| class.symbol != root)
        .collect();

    let mut members: Vec<BaseMember> = Vec::new();
    let mut declarations = HashSet::new();
    let mut interfaces = Vec::new();
    for (idx, class) in chain.iter().enumerate() {
        let Some(decl) = db.type_symbol(class.symbol) else {
            continue;
        };
        if idx > 0 && decl.kind == TypeKind::Interface {
            interfaces.push(class.clone());
        }
        let subst = substitution(db, class);

        for field in &decl.fields {
            let Some(data) = db.field(*field) else {
                continue;
            };
            if data.modifiers.visibility == Visibility::Private {
                continue;
            }
            declarations.insert(*field);
            let hidden = members
                .iter()
                .any(|m| m.kind == MemberKind::Field && m.name == data.name);
            if !hidden {
                members.push(BaseMember {
                    symbol: *field,
                    kind: MemberKind::Field,
                    name: data.name.clone(),
                    arity: 0,
                    owner: class.clone(),
                    visibility: data.modifiers.visibility,
                    is_static: data.is_static,
                    is_abstract: false,
                    subst: subst.clone(),
                });
            }
        }

        for method in &decl.methods {
            let Some(data) = db.method(*method) else {
                continue;
            };
            if data.modifiers.visibility == Visibility::Private {
                continue;
            }
            declarations.insert(*method);
            let overridden = members
                .iter()
                .any(|m| m.same_signature(&data.name, data.arity()));
            if !overridden {
                members.push(BaseMember {
                    symbol: *method,
                    kind: MemberKind::Method,
                    name: data.name.clone(),
                    arity: data.arity(),
                    owner: class.clone(),
                    visibility: data.modifiers.visibility,
                    is_static: data.is_static,
                    is_abstract: data.is_abstract,
                    subst: subst.clone(),
                });
            }
        }
    }

    if members.is_empty() {
        return Err(PreconditionViolation::NoMembers(name));
    }

    tracing::debug!(
        target: "nova.delegate",
        base = %name,
        chain = chain.len(),
        members = members.len(),
        "resolved member surface"
    );
    Ok(MemberSurface {
        base: base.clone(),
        chain,
        members,
        interfaces,
        declarations,
    })
}

/// A validated host/base pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationTarget {
    pub host: SymbolId,
    pub base: SymbolId,
    /// The base type as written in the host's supertype clause.
    pub base_ref: TypeRef,
    pub surface: MemberSurface,
    /// Transitive subclasses of the host, breadth-first.
    pub subclasses: Vec<SymbolId>,
}

impl DelegationTarget {
    pub fn resolve(
        db: &dyn DelegationDatabase,
        host: SymbolId,
        base: SymbolId,
    ) -> Result<Self, PreconditionViolation> {
        let host_name = db.name(host).to_string();
        let (_, decl) = host_decl(db, host)
            .ok_or_else(|| PreconditionViolation::HostNotAClass(host_name.clone()))?;
        if decl.kind != TypeKind::Class {
            return Err(PreconditionViolation::HostNotAClass(host_name));
        }
        if eligible_base_types(db, host).is_empty() {
            return Err(PreconditionViolation::NoEligibleBase(host_name));
        }

        let found = decl
            .extends
            .iter()
            .chain(decl.implements.iter())
            .find_map(|ty| match db.resolve_type_ref(host, ty) {
                Type::Class(class) if class.symbol == base => Some((ty.clone(), class)),
                _ => None,
            });
        let Some((base_ref, base_ty)) = found else {
            return Err(PreconditionViolation::NotDirectSupertype {
                host: host_name,
                base: db.name(base).to_string(),
            });
        };

        let surface = resolve_member_surface(db, &base_ty)?;
        Ok(DelegationTarget {
            host,
            base,
            base_ref,
            surface,
            subclasses: db.transitive_subclasses(host),
        })
    }

    /// Resolves both types by name; convenient for callers holding source names.
    pub fn by_name(
        db: &dyn DelegationDatabase,
        host: &str,
        base: &str,
    ) -> Result<Self, PreconditionViolation> {
        let lookup = |name: &str| {
            db.type_by_name(name)
                .ok_or_else(|| PreconditionViolation::UnknownType(name.to_string()))
        };
        Self::resolve(db, lookup(host)?, lookup(base)?)
    }

    pub fn is_host_or_subclass(&self, ty: SymbolId) -> bool {
        ty == self.host || self.subclasses.contains(&ty)
    }

    /// Whether the base can be instantiated directly.
    pub fn base_is_abstract(&self, db: &dyn DelegationDatabase) -> bool {
        db.type_symbol(self.base)
            .is_some_and(|decl| decl.is_abstract())
    }

    /// Types that stay supertypes of the host once the base is removed and
    /// `kept` interfaces are added. Always contains the root.
    pub fn retained_supertypes(
        &self,
        db: &dyn DelegationDatabase,
        kept: &[SymbolId],
    ) -> HashSet<SymbolId> {
        let mut out = HashSet::from([db.root_type()]);
        let Some(decl) = db.type_symbol(self.host) else {
            return out;
        };
        let remaining = decl
            .declared_supertypes()
            .filter(|sup| sup.symbol != self.base)
            .cloned()
            .chain(
                kept.iter()
                    .filter_map(|id| self.surface.interface(*id).cloned()),
            );
        for sup in remaining {
            out.insert(sup.symbol);
            out.extend(db.ancestors(&sup).into_iter().map(|ancestor| ancestor.symbol));
        }
        out
    }
}

/// The host's syntax tree and declaration.
pub(crate) fn host_decl(
    db: &dyn DelegationDatabase,
    host: SymbolId,
) -> Option<(&CompilationUnit, &TypeDecl)> {
    let location = &db.type_symbol(host)?.location;
    if location.file.as_str() == BUILTIN_FILE {
        return None;
    }
    let unit = db.syntax_tree(&location.file)?;
    let decl = unit.type_decl(location.node)?;
    Some((unit, decl))
}

/// Direct supertypes of `host` that delegation can replace: declared in the
/// program and contributing members beyond the root.
pub fn eligible_base_types(db: &dyn DelegationDatabase, host: SymbolId) -> Vec<SymbolId> {
    let Some(decl) = db.type_symbol(host) else {
        return Vec::new();
    };
    if decl.is_interface() || decl.location.file.as_str() == BUILTIN_FILE {
        return Vec::new();
    }
    decl.declared_supertypes()
        .filter(|sup| {
            let declared_in_program = db
                .type_symbol(sup.symbol)
                .is_some_and(|ty| ty.location.file.as_str() != BUILTIN_FILE);
            declared_in_program && resolve_member_surface(db, sup).is_ok()
        })
        .map(|sup| sup.symbol)
        .collect()
}
