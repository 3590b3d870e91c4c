use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use nova_syntax::{
    CompilationUnit, FileId, Location, Member, TypeDecl, TypeRef, Workspace,
};

use crate::diagnostics::{Diagnostic, MISSING_IMPLEMENTATION};
use crate::ids::{Arena, SymbolId};
use crate::symbols::{ConstructorSymbol, FieldSymbol, MethodSymbol, Symbol, TypeSymbol};
use crate::types::{ClassType, Type};
use crate::{lowering, resolve};

/// File id of the built-in declarations.
pub const BUILTIN_FILE: &str = "<builtin>";

const PRELUDE: &str = r#"
public class Object {
    public native String toString();
    public native boolean equals(Object other);
    public native int hashCode();
}

public final class String {
    public native int length();
}
"#;

/// What a reference expression resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    pub symbol: SymbolId,
    /// For instance members referenced without a receiver: the class whose
    /// (possibly outer) `this` supplies the receiver.
    pub implicit_this: Option<SymbolId>,
    /// Parameter types of the invoked method or constructor as seen from the
    /// call site. Empty for fields.
    pub signature: Vec<Type>,
}

/// Scope used to resolve a syntactic [`TypeRef`].
#[derive(Debug, Clone, Copy)]
pub struct TypeScope<'a> {
    pub class: Option<SymbolId>,
    pub method_type_params: &'a [String],
}

impl TypeScope<'_> {
    pub fn class(class: SymbolId) -> TypeScope<'static> {
        TypeScope {
            class: Some(class),
            method_type_params: &[],
        }
    }
}

/// A resolved snapshot of a [`Workspace`].
///
/// Building a program lowers every declaration into the symbol arena, then
/// resolves every body. All queries are answered from that snapshot; edits to
/// the workspace require building a new program.
#[derive(Debug)]
pub struct Program {
    pub(crate) workspace: Workspace,
    pub(crate) prelude: CompilationUnit,
    pub(crate) symbols: Arena<Symbol>,
    pub(crate) top_level: HashMap<String, Vec<SymbolId>>,
    pub(crate) decls: HashMap<Location, SymbolId>,
    pub(crate) subtypes: HashMap<SymbolId, Vec<SymbolId>>,
    pub(crate) refs: HashMap<Location, ResolvedRef>,
    pub(crate) expr_types: HashMap<Location, Type>,
    pub(crate) local_types: HashMap<Location, Type>,
    pub(crate) references: HashMap<SymbolId, Vec<Location>>,
    pub(crate) mentions: HashMap<SymbolId, BTreeSet<FileId>>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) object: SymbolId,
    pub(crate) string: SymbolId,
}

impl Program {
    pub fn build(workspace: &Workspace) -> Program {
        let prelude = nova_syntax::parse(FileId::new(BUILTIN_FILE), PRELUDE);
        let mut program = Program {
            workspace: workspace.clone(),
            prelude,
            symbols: Arena::default(),
            top_level: HashMap::new(),
            decls: HashMap::new(),
            subtypes: HashMap::new(),
            refs: HashMap::new(),
            expr_types: HashMap::new(),
            local_types: HashMap::new(),
            references: HashMap::new(),
            mentions: HashMap::new(),
            diagnostics: Vec::new(),
            object: SymbolId::from_raw(0),
            string: SymbolId::from_raw(0),
        };

        lowering::lower(&mut program);
        resolve::resolve_bodies(&mut program);
        let missing = program.missing_implementations();
        program.diagnostics.extend(missing);

        tracing::debug!(
            target: "nova.hir",
            files = program.workspace.len(),
            symbols = program.symbols.len(),
            diagnostics = program.diagnostics.len(),
            "built program"
        );
        program
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Files of the workspace; the built-in prelude is not included.
    pub fn files(&self) -> impl Iterator<Item = &FileId> {
        self.workspace.file_ids()
    }

    pub fn syntax_tree(&self, file: &FileId) -> Option<&CompilationUnit> {
        if file.as_str() == BUILTIN_FILE {
            return Some(&self.prelude);
        }
        self.workspace.file(file)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols.iter()
    }

    pub fn type_symbol(&self, id: SymbolId) -> Option<&TypeSymbol> {
        self.symbols[id].as_type()
    }

    pub fn field(&self, id: SymbolId) -> Option<&FieldSymbol> {
        self.symbols[id].as_field()
    }

    pub fn method(&self, id: SymbolId) -> Option<&MethodSymbol> {
        self.symbols[id].as_method()
    }

    pub fn constructor(&self, id: SymbolId) -> Option<&ConstructorSymbol> {
        self.symbols[id].as_constructor()
    }

    /// The universal root type (`Object`).
    pub fn root_type(&self) -> SymbolId {
        self.object
    }

    pub fn string_type(&self) -> SymbolId {
        self.string
    }

    pub fn is_builtin(&self, id: SymbolId) -> bool {
        self.symbols[id].location().file.as_str() == BUILTIN_FILE
    }

    /// Looks a type up by simple name or by a dotted path through nested types.
    pub fn type_by_name(&self, name: &str) -> Option<SymbolId> {
        self.lookup_type_path(None, name)
    }

    pub fn declaration_at(&self, location: &Location) -> Option<SymbolId> {
        self.decls.get(location).copied()
    }

    pub fn resolved(&self, location: &Location) -> Option<&ResolvedRef> {
        self.refs.get(location)
    }

    pub fn expr_type(&self, location: &Location) -> Option<&Type> {
        self.expr_types.get(location)
    }

    /// Declared type of a local variable statement.
    pub fn local_type(&self, location: &Location) -> Option<&Type> {
        self.local_types.get(location)
    }

    /// Every resolved reference to `symbol`, sorted by location.
    pub fn references_to(&self, symbol: SymbolId) -> &[Location] {
        self.references
            .get(&symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Files that declare `symbol` or mention it in a type or expression.
    pub fn files_mentioning(&self, symbol: SymbolId) -> BTreeSet<FileId> {
        let mut files = self.mentions.get(&symbol).cloned().unwrap_or_default();
        let file = &self.symbols[symbol].location().file;
        if file.as_str() != BUILTIN_FILE {
            files.insert(file.clone());
        }
        files
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Every type declaration with its unit, prelude first, nested types after
    /// their enclosing type.
    pub fn type_decls(&self) -> Vec<(SymbolId, &CompilationUnit, &TypeDecl)> {
        fn walk<'a>(
            program: &'a Program,
            unit: &'a CompilationUnit,
            decl: &'a TypeDecl,
            out: &mut Vec<(SymbolId, &'a CompilationUnit, &'a TypeDecl)>,
        ) {
            let location = Location::new(unit.file.clone(), decl.id);
            if let Some(id) = program.decls.get(&location) {
                out.push((*id, unit, decl));
            }
            for member in &decl.members {
                if let Member::Type(nested) = member {
                    walk(program, unit, nested, out);
                }
            }
        }

        let mut out = Vec::new();
        for unit in std::iter::once(&self.prelude).chain(self.workspace.files()) {
            for decl in &unit.types {
                walk(self, unit, decl, &mut out);
            }
        }
        out
    }

    /// The type of `this` inside `class`: the class applied to its own type parameters.
    pub fn this_type(&self, class: SymbolId) -> ClassType {
        let args = self
            .type_symbol(class)
            .map(|ty| {
                ty.type_params
                    .iter()
                    .map(|name| Type::TypeParam(name.clone()))
                    .collect()
            })
            .unwrap_or_default();
        ClassType::new(class, args)
    }

    /// Maps the type parameters of `ty`'s declaration to its arguments.
    ///
    /// Raw references map every parameter to the root type.
    pub fn subst_map(&self, ty: &ClassType) -> HashMap<String, Type> {
        let Some(decl) = self.type_symbol(ty.symbol) else {
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
                    .unwrap_or_else(|| Type::class(self.object, Vec::new()));
                (name.clone(), arg)
            })
            .collect()
    }

    fn superclass_of(&self, ty: &ClassType) -> Option<ClassType> {
        let decl = self.type_symbol(ty.symbol)?;
        let superclass = decl.superclass.as_ref()?.as_class()?;
        Some(superclass.subst(&self.subst_map(ty)))
    }

    /// Direct supertypes declared in the program, substituted for `ty`'s arguments.
    pub fn direct_supertypes(&self, ty: &ClassType) -> Vec<ClassType> {
        let Some(decl) = self.type_symbol(ty.symbol) else {
            return Vec::new();
        };
        let map = self.subst_map(ty);
        decl.declared_supertypes()
            .map(|sup| sup.subst(&map))
            .collect()
    }

    /// All proper ancestors of `ty`: the superclass chain first, then every
    /// interface breadth-first. The root type is always last.
    pub fn ancestors(&self, ty: &ClassType) -> Vec<ClassType> {
        let mut seen = HashSet::from([ty.symbol]);
        let mut chain = vec![ty.clone()];
        let mut current = ty.clone();
        while let Some(sup) = self.superclass_of(&current) {
            if !seen.insert(sup.symbol) {
                break;
            }
            chain.push(sup.clone());
            current = sup;
        }

        let mut out: Vec<ClassType> = chain[1..].to_vec();
        let mut queue: VecDeque<ClassType> = VecDeque::new();
        for class in &chain {
            let map = self.subst_map(class);
            if let Some(decl) = self.type_symbol(class.symbol) {
                queue.extend(
                    decl.interfaces
                        .iter()
                        .filter_map(Type::as_class)
                        .map(|iface| iface.subst(&map)),
                );
            }
        }
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.symbol) {
                continue;
            }
            queue.extend(self.direct_supertypes(&next));
            out.push(next);
        }

        if let Some(pos) = out.iter().position(|t| t.symbol == self.object) {
            let root = out.remove(pos);
            out.push(root);
        } else if ty.symbol != self.object {
            out.push(ClassType::raw(self.object));
        }
        out
    }

    pub fn is_subtype(&self, sub: SymbolId, sup: SymbolId) -> bool {
        if sub == sup || sup == self.object {
            return true;
        }
        self.ancestors(&ClassType::raw(sub))
            .iter()
            .any(|ancestor| ancestor.symbol == sup)
    }

    /// Every type that (transitively) extends or implements `ty`, in
    /// breadth-first order.
    pub fn transitive_subclasses(&self, ty: SymbolId) -> Vec<SymbolId> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([ty]);
        let mut queue = VecDeque::from([ty]);
        while let Some(next) = queue.pop_front() {
            for sub in self.subtypes.get(&next).into_iter().flatten() {
                if seen.insert(*sub) {
                    out.push(*sub);
                    queue.push_back(*sub);
                }
            }
        }
        out
    }

    /// Enclosing types of `ty`, innermost first, `ty` included.
    pub fn enclosing_types(&self, ty: SymbolId) -> Vec<SymbolId> {
        let mut out = vec![ty];
        let mut current = self.type_symbol(ty).and_then(|decl| decl.outer);
        while let Some(outer) = current {
            out.push(outer);
            current = self.type_symbol(outer).and_then(|decl| decl.outer);
        }
        out
    }

    pub fn nested_type(&self, ty: SymbolId, name: &str) -> Option<SymbolId> {
        self.type_symbol(ty)?
            .nested
            .iter()
            .copied()
            .find(|nested| self.symbols[*nested].name() == name)
    }

    /// Methods in `method`'s ancestors that it overrides (same name and arity),
    /// nearest first.
    pub fn overridden_methods(&self, method: SymbolId) -> Vec<SymbolId> {
        let Some(data) = self.method(method) else {
            return Vec::new();
        };
        if data.is_static || data.modifiers.visibility == nova_syntax::Visibility::Private {
            return Vec::new();
        }
        let mut out = Vec::new();
        for ancestor in self.ancestors(&ClassType::raw(data.owner)) {
            let Some(decl) = self.type_symbol(ancestor.symbol) else {
                continue;
            };
            for candidate in &decl.methods {
                let Some(other) = self.method(*candidate) else {
                    continue;
                };
                if other.name == data.name
                    && other.arity() == data.arity()
                    && !other.is_static
                    && other.modifiers.visibility != nova_syntax::Visibility::Private
                {
                    out.push(*candidate);
                }
            }
        }
        out
    }

    /// Finds a field visible through `ty`, returning it with its type as seen
    /// from `ty`.
    pub fn find_field(&self, ty: &ClassType, name: &str) -> Option<(SymbolId, Type)> {
        for class in std::iter::once(ty.clone()).chain(self.ancestors(ty)) {
            let Some(decl) = self.type_symbol(class.symbol) else {
                continue;
            };
            for field in &decl.fields {
                if let Some(data) = self.field(*field) {
                    if data.name == name {
                        return Some((*field, data.ty.subst(&self.subst_map(&class))));
                    }
                }
            }
        }
        None
    }

    /// Finds the most-derived method named `name` taking `arity` arguments,
    /// together with the substitution of its declaring type as seen from `ty`.
    pub fn find_method(
        &self,
        ty: &ClassType,
        name: &str,
        arity: usize,
    ) -> Option<(SymbolId, HashMap<String, Type>)> {
        for class in std::iter::once(ty.clone()).chain(self.ancestors(ty)) {
            let Some(decl) = self.type_symbol(class.symbol) else {
                continue;
            };
            for method in &decl.methods {
                if let Some(data) = self.method(*method) {
                    if data.name == name && data.arity() == arity {
                        return Some((*method, self.subst_map(&class)));
                    }
                }
            }
        }
        None
    }

    pub fn find_constructor(&self, ty: SymbolId, arity: usize) -> Option<SymbolId> {
        self.type_symbol(ty)?
            .constructors
            .iter()
            .copied()
            .find(|ctor| {
                self.constructor(*ctor)
                    .is_some_and(|data| data.params.len() == arity)
            })
    }

    /// Whether `new T()`/`super()` with no arguments is valid for `ty`.
    pub fn has_nullary_constructor(&self, ty: SymbolId) -> bool {
        self.type_symbol(ty).is_some_and(|decl| {
            decl.constructors.is_empty() || self.find_constructor(ty, 0).is_some()
        })
    }

    pub fn resolve_type_ref(&self, scope: &TypeScope<'_>, ty: &TypeRef) -> Type {
        let mut out = self.resolve_type_name(scope, &ty.name, &ty.args);
        for _ in 0..ty.dims {
            out = Type::Array(Box::new(out));
        }
        out
    }

    fn resolve_type_name(&self, scope: &TypeScope<'_>, name: &str, args: &[TypeRef]) -> Type {
        if name == "void" {
            return Type::Void;
        }
        if nova_syntax::is_primitive_type(name) {
            return Type::Primitive(name.to_string());
        }
        if !name.contains('.') {
            if scope.method_type_params.iter().any(|param| param == name) {
                return Type::TypeParam(name.to_string());
            }
            if let Some(class) = scope.class {
                for enclosing in self.enclosing_types(class) {
                    let declares = self
                        .type_symbol(enclosing)
                        .is_some_and(|decl| decl.type_params.iter().any(|param| param == name));
                    if declares {
                        return Type::TypeParam(name.to_string());
                    }
                }
            }
        }

        let args: Vec<Type> = args
            .iter()
            .map(|arg| self.resolve_type_ref(scope, arg))
            .collect();
        match self.lookup_type_path(scope.class, name) {
            Some(symbol) => Type::class(symbol, args),
            None => Type::External {
                name: name.to_string(),
                args,
            },
        }
    }

    pub(crate) fn lookup_type_path(&self, from: Option<SymbolId>, path: &str) -> Option<SymbolId> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let Some(mut current) = self.lookup_simple_type(from, first) else {
            // Package-qualified names resolve by their last segment.
            let last = path.rsplit('.').next()?;
            if last == first {
                return None;
            }
            return self.top_level.get(last).and_then(|c| c.first()).copied();
        };
        for segment in segments {
            current = self.nested_type(current, segment)?;
        }
        Some(current)
    }

    fn lookup_simple_type(&self, from: Option<SymbolId>, name: &str) -> Option<SymbolId> {
        if let Some(class) = from {
            for enclosing in self.enclosing_types(class) {
                if self.symbols[enclosing].name() == name {
                    return Some(enclosing);
                }
                if let Some(nested) = self.nested_type(enclosing, name) {
                    return Some(nested);
                }
            }
        }
        self.top_level.get(name).and_then(|c| c.first()).copied()
    }

    /// Renders a semantic type back to syntax, using simple names.
    pub fn type_ref(&self, ty: &Type) -> TypeRef {
        match ty {
            Type::Class(class) => TypeRef::named(self.symbols[class.symbol].name())
                .with_args(class.args.iter().map(|arg| self.type_ref(arg)).collect()),
            Type::External { name, args } => TypeRef::named(name.clone())
                .with_args(args.iter().map(|arg| self.type_ref(arg)).collect()),
            Type::TypeParam(name) | Type::Primitive(name) => TypeRef::named(name.clone()),
            Type::Array(inner) => {
                let mut out = self.type_ref(inner);
                out.dims = out.dims.saturating_add(1);
                out
            }
            Type::Void => TypeRef::named("void"),
            Type::TypeName(symbol) => TypeRef::named(self.symbols[*symbol].name()),
            Type::Null | Type::Unknown => TypeRef::named(self.symbols[self.object].name()),
        }
    }

    pub fn display_type(&self, ty: &Type) -> String {
        self.type_ref(ty).to_string()
    }

    fn missing_implementations(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for (id, symbol) in self.symbols.iter() {
            let Symbol::Type(decl) = symbol else {
                continue;
            };
            if decl.is_abstract() || self.is_builtin(id) {
                continue;
            }

            let this = self.this_type(id);
            let hierarchy: Vec<ClassType> =
                std::iter::once(this.clone()).chain(self.ancestors(&this)).collect();
            let mut reported = HashSet::new();
            for class in &hierarchy {
                let Some(owner) = self.type_symbol(class.symbol) else {
                    continue;
                };
                for method in &owner.methods {
                    let Some(data) = self.method(*method) else {
                        continue;
                    };
                    if !data.is_abstract || !reported.insert((data.name.clone(), data.arity())) {
                        continue;
                    }
                    let implemented = hierarchy.iter().any(|candidate| {
                        self.type_symbol(candidate.symbol).is_some_and(|decl| {
                            decl.methods.iter().any(|other| {
                                self.method(*other).is_some_and(|other| {
                                    other.name == data.name
                                        && other.arity() == data.arity()
                                        && !other.is_abstract
                                        && !other.is_static
                                })
                            })
                        })
                    });
                    if !implemented {
                        out.push(Diagnostic::error(
                            decl.location.file.clone(),
                            MISSING_IMPLEMENTATION,
                            format!(
                                "class `{}` does not implement abstract method `{}` of `{}`",
                                decl.name, data.name, owner.name
                            ),
                            Default::default(),
                        ));
                    }
                }
            }
        }
        out
    }
}
