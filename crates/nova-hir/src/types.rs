use std::collections::HashMap;

use crate::ids::SymbolId;

/// A class or interface type together with its type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassType {
    pub symbol: SymbolId,
    pub args: Vec<Type>,
}

impl ClassType {
    pub fn new(symbol: SymbolId, args: Vec<Type>) -> Self {
        Self { symbol, args }
    }

    pub fn raw(symbol: SymbolId) -> Self {
        Self::new(symbol, Vec::new())
    }

    #[must_use]
    pub fn subst(&self, map: &HashMap<String, Type>) -> ClassType {
        ClassType {
            symbol: self.symbol,
            args: self.args.iter().map(|arg| arg.subst(map)).collect(),
        }
    }
}

/// Semantic type of an expression or declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Class(ClassType),
    /// A type name that is not declared anywhere in the program (library types).
    External { name: String, args: Vec<Type> },
    TypeParam(String),
    Primitive(String),
    Array(Box<Type>),
    Void,
    Null,
    /// A type used as a static receiver, e.g. `Animal` in `Animal.create()`.
    TypeName(SymbolId),
    Unknown,
}

impl Type {
    pub fn class(symbol: SymbolId, args: Vec<Type>) -> Type {
        Type::Class(ClassType::new(symbol, args))
    }

    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            Type::Class(class) => Some(class),
            _ => None,
        }
    }

    /// The declaration this type refers to, for class types and static receivers.
    pub fn symbol(&self) -> Option<SymbolId> {
        match self {
            Type::Class(class) => Some(class.symbol),
            Type::TypeName(symbol) => Some(*symbol),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Type::Unknown)
    }

    #[must_use]
    pub fn subst(&self, map: &HashMap<String, Type>) -> Type {
        match self {
            Type::TypeParam(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Class(class) => Type::Class(class.subst(map)),
            Type::External { name, args } => Type::External {
                name: name.clone(),
                args: args.iter().map(|arg| arg.subst(map)).collect(),
            },
            Type::Array(inner) => Type::Array(Box::new(inner.subst(map))),
            Type::Primitive(_) | Type::Void | Type::Null | Type::TypeName(_) | Type::Unknown => {
                self.clone()
            }
        }
    }
}
