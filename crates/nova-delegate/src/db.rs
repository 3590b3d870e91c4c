//! Semantic queries the delegation engine consumes.
//!
//! The engine only ever talks to a resolved program through these traits, so
//! a different front end can drive it by implementing them. The bundled
//! implementation is [`nova_hir::Program`].

use std::collections::BTreeSet;

use nova_hir::{
    ClassType, Diagnostic, FieldSymbol, MethodSymbol, Program, ResolvedRef, Symbol, SymbolId,
    Type, TypeScope, TypeSymbol,
};
use nova_syntax::{CompilationUnit, FileId, Location, TypeRef};

/// Reference → declaration lookups and type queries over one program snapshot.
pub trait SymbolResolution {
    fn symbol(&self, id: SymbolId) -> &Symbol;

    fn type_symbol(&self, id: SymbolId) -> Option<&TypeSymbol> {
        self.symbol(id).as_type()
    }

    fn field(&self, id: SymbolId) -> Option<&FieldSymbol> {
        self.symbol(id).as_field()
    }

    fn method(&self, id: SymbolId) -> Option<&MethodSymbol> {
        self.symbol(id).as_method()
    }

    fn name(&self, id: SymbolId) -> &str {
        self.symbol(id).name()
    }

    /// The declaration whose syntax node is at `location`.
    fn declaration_at(&self, location: &Location) -> Option<SymbolId>;

    /// What the reference expression (or constructor call statement) at
    /// `location` resolved to. `None` means unresolved.
    fn resolved(&self, location: &Location) -> Option<&ResolvedRef>;

    fn expr_type(&self, location: &Location) -> Option<&Type>;

    fn local_type(&self, location: &Location) -> Option<&Type>;

    /// The universal root type.
    fn root_type(&self) -> SymbolId;

    fn this_type(&self, class: SymbolId) -> ClassType;

    /// Proper ancestors of `ty` with type arguments substituted; the root is last.
    fn ancestors(&self, ty: &ClassType) -> Vec<ClassType>;

    fn is_subtype(&self, sub: SymbolId, sup: SymbolId) -> bool;

    /// Methods that `method` overrides, nearest first.
    fn overridden_methods(&self, method: SymbolId) -> Vec<SymbolId>;

    /// `class` followed by its lexically enclosing types.
    fn enclosing_types(&self, class: SymbolId) -> Vec<SymbolId>;

    /// Resolves a type written inside the body of `class`.
    fn resolve_type_ref(&self, class: SymbolId, ty: &TypeRef) -> Type;

    /// Renders a semantic type as syntax.
    fn type_ref(&self, ty: &Type) -> TypeRef;

    fn diagnostics(&self) -> &[Diagnostic];
}

/// Whole-program indices: syntax trees, files in scope and reverse references.
pub trait WholeProgramSearch {
    fn syntax_tree(&self, file: &FileId) -> Option<&CompilationUnit>;

    /// Files that declare `symbol` or mention it in a type or expression.
    fn files_mentioning(&self, symbol: SymbolId) -> BTreeSet<FileId>;

    fn references_to(&self, symbol: SymbolId) -> &[Location];

    /// Every class that directly or transitively extends `class`.
    fn transitive_subclasses(&self, class: SymbolId) -> Vec<SymbolId>;

    fn type_by_name(&self, name: &str) -> Option<SymbolId>;
}

/// Everything the engine needs from a program snapshot.
pub trait DelegationDatabase: SymbolResolution + WholeProgramSearch {}

impl<T: SymbolResolution + WholeProgramSearch> DelegationDatabase for T {}

impl SymbolResolution for Program {
    fn symbol(&self, id: SymbolId) -> &Symbol {
        Program::symbol(self, id)
    }

    fn declaration_at(&self, location: &Location) -> Option<SymbolId> {
        Program::declaration_at(self, location)
    }

    fn resolved(&self, location: &Location) -> Option<&ResolvedRef> {
        Program::resolved(self, location)
    }

    fn expr_type(&self, location: &Location) -> Option<&Type> {
        Program::expr_type(self, location)
    }

    fn local_type(&self, location: &Location) -> Option<&Type> {
        Program::local_type(self, location)
    }

    fn root_type(&self) -> SymbolId {
        Program::root_type(self)
    }

    fn this_type(&self, class: SymbolId) -> ClassType {
        Program::this_type(self, class)
    }

    fn ancestors(&self, ty: &ClassType) -> Vec<ClassType> {
        Program::ancestors(self, ty)
    }

    fn is_subtype(&self, sub: SymbolId, sup: SymbolId) -> bool {
        Program::is_subtype(self, sub, sup)
    }

    fn overridden_methods(&self, method: SymbolId) -> Vec<SymbolId> {
        Program::overridden_methods(self, method)
    }

    fn enclosing_types(&self, class: SymbolId) -> Vec<SymbolId> {
        Program::enclosing_types(self, class)
    }

    fn resolve_type_ref(&self, class: SymbolId, ty: &TypeRef) -> Type {
        Program::resolve_type_ref(self, &TypeScope::class(class), ty)
    }

    fn type_ref(&self, ty: &Type) -> TypeRef {
        Program::type_ref(self, ty)
    }

    fn diagnostics(&self) -> &[Diagnostic] {
        Program::diagnostics(self)
    }
}

impl WholeProgramSearch for Program {
    fn syntax_tree(&self, file: &FileId) -> Option<&CompilationUnit> {
        Program::syntax_tree(self, file)
    }

    fn files_mentioning(&self, symbol: SymbolId) -> BTreeSet<FileId> {
        Program::files_mentioning(self, symbol)
    }

    fn references_to(&self, symbol: SymbolId) -> &[Location] {
        Program::references_to(self, symbol)
    }

    fn transitive_subclasses(&self, class: SymbolId) -> Vec<SymbolId> {
        Program::transitive_subclasses(self, class)
    }

    fn type_by_name(&self, name: &str) -> Option<SymbolId> {
        Program::type_by_name(self, name)
    }
}
