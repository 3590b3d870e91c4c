//! Lowering of declarations into the symbol arena.
//!
//! Runs in three passes so that every type name can be resolved regardless of
//! declaration order: type symbols first, then supertype clauses, then member
//! signatures.

use nova_syntax::{
    CompilationUnit, FileId, Location, Member, Modifiers, TypeDecl, TypeKind, Visibility,
};

use crate::ids::{Arena, SymbolId};
use crate::program::{Program, TypeScope, BUILTIN_FILE};
use crate::symbols::{ConstructorSymbol, FieldSymbol, MethodSymbol, Symbol, TypeSymbol};
use crate::types::Type;

pub(crate) fn lower(program: &mut Program) {
    collect_types(program);
    resolve_headers(program);
    collect_members(program);
}

fn collect_types(program: &mut Program) {
    let Program {
        workspace,
        prelude,
        symbols,
        top_level,
        decls,
        ..
    } = program;

    for unit in std::iter::once(&*prelude).chain(workspace.files()) {
        for decl in &unit.types {
            let id = collect_type(unit, decl, None, symbols, decls);
            top_level.entry(decl.name.clone()).or_default().push(id);
        }
    }

    if let Some(object) = program.top_level.get("Object").and_then(|c| c.first()) {
        program.object = *object;
    }
    if let Some(string) = program.top_level.get("String").and_then(|c| c.first()) {
        program.string = *string;
    }
}

fn collect_type(
    unit: &CompilationUnit,
    decl: &TypeDecl,
    outer: Option<SymbolId>,
    symbols: &mut Arena<Symbol>,
    decls: &mut std::collections::HashMap<Location, SymbolId>,
) -> SymbolId {
    let location = Location::new(unit.file.clone(), decl.id);
    let id = symbols.alloc(Symbol::Type(TypeSymbol {
        name: decl.name.clone(),
        kind: decl.kind,
        modifiers: decl.modifiers.clone(),
        type_params: decl.type_params.iter().map(|p| p.name.clone()).collect(),
        type_param_bounds: Vec::new(),
        outer,
        superclass: None,
        interfaces: Vec::new(),
        fields: Vec::new(),
        methods: Vec::new(),
        constructors: Vec::new(),
        nested: Vec::new(),
        location: location.clone(),
    }));
    decls.insert(location, id);

    let mut nested = Vec::new();
    for member in &decl.members {
        if let Member::Type(inner) = member {
            nested.push(collect_type(unit, inner, Some(id), symbols, decls));
        }
    }
    if let Symbol::Type(ty) = &mut symbols[id] {
        ty.nested = nested;
    }
    id
}

struct Header {
    id: SymbolId,
    file: FileId,
    bounds: Vec<Option<Type>>,
    superclass: Option<Type>,
    interfaces: Vec<Type>,
}

fn resolve_headers(program: &mut Program) {
    let headers: Vec<Header> = program
        .type_decls()
        .into_iter()
        .map(|(id, unit, decl)| {
            let scope = TypeScope::class(id);
            let bounds = decl
                .type_params
                .iter()
                .map(|param| {
                    param
                        .bounds
                        .first()
                        .map(|bound| program.resolve_type_ref(&scope, bound))
                })
                .collect();
            let (superclass, interfaces) = match decl.kind {
                TypeKind::Class => {
                    let superclass = match decl.extends.first() {
                        Some(sup) => Some(program.resolve_type_ref(&scope, sup)),
                        None if id == program.object => None,
                        None => Some(Type::class(program.object, Vec::new())),
                    };
                    let interfaces = decl
                        .implements
                        .iter()
                        .map(|iface| program.resolve_type_ref(&scope, iface))
                        .collect();
                    (superclass, interfaces)
                }
                TypeKind::Interface => {
                    let interfaces = decl
                        .extends
                        .iter()
                        .map(|iface| program.resolve_type_ref(&scope, iface))
                        .collect();
                    (None, interfaces)
                }
            };
            Header {
                id,
                file: unit.file.clone(),
                bounds,
                superclass,
                interfaces,
            }
        })
        .collect();

    for header in headers {
        for ty in header.superclass.iter().chain(header.interfaces.iter()) {
            if let Some(sup) = ty.as_class() {
                program.subtypes.entry(sup.symbol).or_default().push(header.id);
            }
            note_mentions(program, ty, &header.file);
        }
        if let Symbol::Type(ty) = &mut program.symbols[header.id] {
            ty.type_param_bounds = header.bounds;
            ty.superclass = header.superclass;
            ty.interfaces = header.interfaces;
        }
    }
}

fn collect_members(program: &mut Program) {
    let mut pending: Vec<(SymbolId, Symbol)> = Vec::new();
    for (owner, unit, decl) in program.type_decls() {
        let scope = TypeScope::class(owner);
        let in_interface = decl.kind == TypeKind::Interface;
        let member_modifiers = |modifiers: &Modifiers| {
            let mut modifiers = modifiers.clone();
            if in_interface && modifiers.visibility == Visibility::Package {
                modifiers.visibility = Visibility::Public;
            }
            modifiers
        };
        for member in &decl.members {
            let symbol = match member {
                Member::Field(field) => Symbol::Field(FieldSymbol {
                    name: field.name.clone(),
                    owner,
                    modifiers: member_modifiers(&field.modifiers),
                    ty: program.resolve_type_ref(&scope, &field.ty),
                    is_static: field.modifiers.is_static || in_interface,
                    location: Location::new(unit.file.clone(), field.id),
                }),
                Member::Method(method) => {
                    let type_params: Vec<String> =
                        method.type_params.iter().map(|p| p.name.clone()).collect();
                    let scope = TypeScope {
                        class: Some(owner),
                        method_type_params: &type_params,
                    };
                    let is_abstract = method.modifiers.is_abstract
                        || (in_interface
                            && method.body.is_none()
                            && !method.modifiers.is_static
                            && !method.modifiers.is_default);
                    Symbol::Method(MethodSymbol {
                        name: method.name.clone(),
                        owner,
                        modifiers: member_modifiers(&method.modifiers),
                        type_params: method.type_params.clone(),
                        params: method
                            .params
                            .iter()
                            .map(|param| program.resolve_type_ref(&scope, &param.ty))
                            .collect(),
                        param_names: method.params.iter().map(|p| p.name.clone()).collect(),
                        return_ty: program.resolve_type_ref(&scope, &method.return_ty),
                        is_abstract,
                        is_static: method.modifiers.is_static,
                        location: Location::new(unit.file.clone(), method.id),
                    })
                }
                Member::Constructor(ctor) => Symbol::Constructor(ConstructorSymbol {
                    owner,
                    modifiers: ctor.modifiers.clone(),
                    params: ctor
                        .params
                        .iter()
                        .map(|param| program.resolve_type_ref(&scope, &param.ty))
                        .collect(),
                    param_names: ctor.params.iter().map(|p| p.name.clone()).collect(),
                    location: Location::new(unit.file.clone(), ctor.id),
                }),
                Member::Type(_) => continue,
            };
            pending.push((owner, symbol));
        }
    }

    for (owner, symbol) in pending {
        let location = symbol.location().clone();
        let (kind, signature) = match &symbol {
            Symbol::Field(field) => (MemberKind::Field, vec![field.ty.clone()]),
            Symbol::Method(method) => (
                MemberKind::Method,
                method
                    .params
                    .iter()
                    .chain(std::iter::once(&method.return_ty))
                    .cloned()
                    .collect(),
            ),
            Symbol::Constructor(ctor) => (MemberKind::Constructor, ctor.params.clone()),
            Symbol::Type(_) => continue,
        };
        let id = program.symbols.alloc(symbol);
        program.decls.insert(location.clone(), id);
        for ty in &signature {
            note_mentions(program, ty, &location.file);
        }

        let Symbol::Type(owner_ty) = &mut program.symbols[owner] else {
            continue;
        };
        match kind {
            MemberKind::Field => owner_ty.fields.push(id),
            MemberKind::Method => owner_ty.methods.push(id),
            MemberKind::Constructor => owner_ty.constructors.push(id),
        }
    }
}

enum MemberKind {
    Field,
    Method,
    Constructor,
}

/// Records that `file` mentions every declared class inside `ty`.
pub(crate) fn note_mentions(program: &mut Program, ty: &Type, file: &FileId) {
    if file.as_str() == BUILTIN_FILE {
        return;
    }
    match ty {
        Type::Class(class) => {
            program
                .mentions
                .entry(class.symbol)
                .or_default()
                .insert(file.clone());
            for arg in &class.args {
                note_mentions(program, arg, file);
            }
        }
        Type::TypeName(symbol) => {
            program
                .mentions
                .entry(*symbol)
                .or_default()
                .insert(file.clone());
        }
        Type::External { args, .. } => {
            for arg in args {
                note_mentions(program, arg, file);
            }
        }
        Type::Array(inner) => note_mentions(program, inner, file),
        Type::TypeParam(_) | Type::Primitive(_) | Type::Void | Type::Null | Type::Unknown => {}
    }
}
