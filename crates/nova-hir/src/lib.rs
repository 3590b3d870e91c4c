//! Semantic model of a [`nova_syntax::Workspace`].
//!
//! [`Program::build`] lowers every declaration into an arena of [`Symbol`]s
//! addressed by [`SymbolId`], resolves every name in every body and records
//! the static type of every expression. The model is deliberately small: a
//! single namespace of simple type names, overload resolution by arity, and
//! a built-in prelude that declares `Object` and `String`.

mod diagnostics;
mod ids;
mod lowering;
mod program;
mod resolve;
mod symbols;
mod types;

pub use diagnostics::{
    Diagnostic, Severity, ABSTRACT_INSTANTIATION, MISSING_IMPLEMENTATION, NO_DEFAULT_CONSTRUCTOR,
    STATIC_CONTEXT, UNRESOLVED_CONSTRUCTOR, UNRESOLVED_FIELD, UNRESOLVED_METHOD, UNRESOLVED_NAME,
};
pub use ids::{Arena, SymbolId};
pub use program::{Program, ResolvedRef, TypeScope, BUILTIN_FILE};
pub use symbols::{ConstructorSymbol, FieldSymbol, MethodSymbol, Symbol, TypeSymbol};
pub use types::{ClassType, Type};

#[cfg(test)]
mod tests;
