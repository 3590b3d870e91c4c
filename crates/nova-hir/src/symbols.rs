use nova_syntax::{Location, Modifiers, TypeKind, TypeParam};

use crate::ids::SymbolId;
use crate::types::{ClassType, Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSymbol {
    pub name: String,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub type_params: Vec<String>,
    /// First bound of each type parameter, if any.
    pub type_param_bounds: Vec<Option<Type>>,
    pub outer: Option<SymbolId>,
    /// `None` for the root type and for interfaces.
    pub superclass: Option<Type>,
    pub interfaces: Vec<Type>,
    pub fields: Vec<SymbolId>,
    pub methods: Vec<SymbolId>,
    pub constructors: Vec<SymbolId>,
    pub nested: Vec<SymbolId>,
    pub location: Location,
}

impl TypeSymbol {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Interfaces and `abstract` classes cannot be instantiated.
    pub fn is_abstract(&self) -> bool {
        self.is_interface() || self.modifiers.is_abstract
    }

    /// Direct supertypes that are declared in the program.
    pub fn declared_supertypes(&self) -> impl Iterator<Item = &ClassType> {
        self.superclass
            .iter()
            .chain(self.interfaces.iter())
            .filter_map(Type::as_class)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSymbol {
    pub name: String,
    pub owner: SymbolId,
    pub modifiers: Modifiers,
    pub ty: Type,
    pub is_static: bool,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSymbol {
    pub name: String,
    pub owner: SymbolId,
    pub modifiers: Modifiers,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Type>,
    pub param_names: Vec<String>,
    pub return_ty: Type,
    pub is_abstract: bool,
    pub is_static: bool,
    pub location: Location,
}

impl MethodSymbol {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorSymbol {
    pub owner: SymbolId,
    pub modifiers: Modifiers,
    pub params: Vec<Type>,
    pub param_names: Vec<String>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Type(TypeSymbol),
    Field(FieldSymbol),
    Method(MethodSymbol),
    Constructor(ConstructorSymbol),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Type(ty) => &ty.name,
            Symbol::Field(field) => &field.name,
            Symbol::Method(method) => &method.name,
            Symbol::Constructor(_) => "<init>",
        }
    }

    /// Declaring type of a member, or the enclosing type of a nested type.
    pub fn owner(&self) -> Option<SymbolId> {
        match self {
            Symbol::Type(ty) => ty.outer,
            Symbol::Field(field) => Some(field.owner),
            Symbol::Method(method) => Some(method.owner),
            Symbol::Constructor(ctor) => Some(ctor.owner),
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Symbol::Type(ty) => &ty.location,
            Symbol::Field(field) => &field.location,
            Symbol::Method(method) => &method.location,
            Symbol::Constructor(ctor) => &ctor.location,
        }
    }

    pub fn modifiers(&self) -> &Modifiers {
        match self {
            Symbol::Type(ty) => &ty.modifiers,
            Symbol::Field(field) => &field.modifiers,
            Symbol::Method(method) => &method.modifiers,
            Symbol::Constructor(ctor) => &ctor.modifiers,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            Symbol::Type(ty) => ty.modifiers.is_static,
            Symbol::Field(field) => field.is_static,
            Symbol::Method(method) => method.is_static,
            Symbol::Constructor(_) => false,
        }
    }

    pub fn as_type(&self) -> Option<&TypeSymbol> {
        match self {
            Symbol::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldSymbol> {
        match self {
            Symbol::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodSymbol> {
        match self {
            Symbol::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn as_constructor(&self) -> Option<&ConstructorSymbol> {
        match self {
            Symbol::Constructor(ctor) => Some(ctor),
            _ => None,
        }
    }
}
