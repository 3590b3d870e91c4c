//! Syntax tree for the Java subset understood by Nova's structural refactorings.
//!
//! Every node that can be referenced from outside the tree (declarations,
//! statements and expressions) carries a [`NodeId`] that is unique within its
//! [`CompilationUnit`]. Node ids survive edits of unrelated parts of the tree,
//! which is what lets a usage scan record locations before an edit starts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for a workspace file.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub String);

impl FileId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FileId {
    fn from(path: &str) -> Self {
        FileId::new(path)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Allocates fresh [`NodeId`]s for one compilation unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn alloc(&mut self) -> NodeId {
        let id = NodeId::from_raw(self.next);
        self.next += 1;
        id
    }
}

/// A byte-span into a source string.
///
/// Synthesized nodes use the empty span at offset zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{})", self.start, self.end)
    }
}

/// Workspace-wide identity of a syntax node.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: FileId,
    pub node: NodeId,
}

impl Location {
    pub fn new(file: FileId, node: NodeId) -> Self {
        Self { file, node }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub file: FileId,
    pub package: Option<String>,
    pub types: Vec<TypeDecl>,
    pub range: Span,
    pub ids: IdGen,
}

impl CompilationUnit {
    /// Finds a (possibly nested) type declaration by node id.
    pub fn type_decl(&self, id: NodeId) -> Option<&TypeDecl> {
        fn find(types: &[TypeDecl], id: NodeId) -> Option<&TypeDecl> {
            for ty in types {
                if ty.id == id {
                    return Some(ty);
                }
                let nested = ty.members.iter().filter_map(|member| match member {
                    Member::Type(nested) => Some(nested),
                    _ => None,
                });
                for nested in nested {
                    if let Some(found) = find(std::slice::from_ref(nested), id) {
                        return Some(found);
                    }
                }
            }
            None
        }
        find(&self.types, id)
    }

    pub fn type_decl_mut(&mut self, id: NodeId) -> Option<&mut TypeDecl> {
        fn find(types: &mut [TypeDecl], id: NodeId) -> Option<&mut TypeDecl> {
            for ty in types {
                if ty.id == id {
                    return Some(ty);
                }
                for member in &mut ty.members {
                    if let Member::Type(nested) = member {
                        if let Some(found) = find(std::slice::from_mut(nested), id) {
                            return Some(found);
                        }
                    }
                }
            }
            None
        }
        find(&mut self.types, id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
}

/// Java access levels, ordered from the narrowest to the widest.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    #[default]
    Package,
    Protected,
    Public,
}

impl Visibility {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Visibility::Private => Some("private"),
            Visibility::Package => None,
            Visibility::Protected => Some("protected"),
            Visibility::Public => Some("public"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_native: bool,
    pub is_default: bool,
    /// Annotation names without the leading `@` (arguments are not preserved).
    pub annotations: Vec<String>,
}

impl Modifiers {
    pub fn with_visibility(visibility: Visibility) -> Self {
        Self {
            visibility,
            ..Self::default()
        }
    }
}

/// A syntactic type reference such as `Map<String, List<T>>[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub args: Vec<TypeRef>,
    pub dims: u8,
    pub range: Span,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            dims: 0,
            range: Span::default(),
        }
    }

    pub fn with_args(mut self, args: Vec<TypeRef>) -> Self {
        self.args = args;
        self
    }

    pub fn is_void(&self) -> bool {
        self.name == "void" && self.dims == 0
    }

    /// The last segment of a qualified name (`java.lang.Object` -> `Object`).
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (idx, arg) in self.args.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        for _ in 0..self.dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub bounds: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub id: NodeId,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub name: String,
    pub name_range: Span,
    pub type_params: Vec<TypeParam>,
    /// Superclass for classes (at most one), super-interfaces for interfaces.
    pub extends: Vec<TypeRef>,
    pub implements: Vec<TypeRef>,
    pub members: Vec<Member>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
    Type(TypeDecl),
}

impl Member {
    pub fn id(&self) -> NodeId {
        match self {
            Member::Field(decl) => decl.id,
            Member::Method(decl) => decl.id,
            Member::Constructor(decl) => decl.id,
            Member::Type(decl) => decl.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Member::Field(decl) => &decl.name,
            Member::Method(decl) => &decl.name,
            Member::Constructor(decl) => &decl.name,
            Member::Type(decl) => &decl.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub id: NodeId,
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub name: String,
    pub name_range: Span,
    pub init: Option<Expr>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub id: NodeId,
    pub ty: TypeRef,
    pub name: String,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub id: NodeId,
    pub modifiers: Modifiers,
    pub type_params: Vec<TypeParam>,
    pub return_ty: TypeRef,
    pub name: String,
    pub name_range: Span,
    pub params: Vec<Param>,
    pub body: Option<Block>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorDecl {
    pub id: NodeId,
    pub modifiers: Modifiers,
    pub name: String,
    pub name_range: Span,
    pub params: Vec<Param>,
    pub body: Block,
    pub range: Span,
}

impl ConstructorDecl {
    /// The explicit `this(...)`/`super(...)` call, which Java only allows as the
    /// first statement.
    pub fn explicit_call(&self) -> Option<(&Stmt, CtorCallKind, &[Expr])> {
        let first = self.body.stmts.first()?;
        match &first.kind {
            StmtKind::ConstructorCall { kind, args } => Some((first, *kind, args.as_slice())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub range: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CtorCallKind {
    This,
    Super,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Local {
        ty: TypeRef,
        name: String,
        init: Option<Expr>,
    },
    Expr(Expr),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Block(Block),
    ConstructorCall {
        kind: CtorCallKind,
        args: Vec<Expr>,
    },
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Raw lexeme, e.g. `42`.
    Int(String),
    /// Raw lexeme including the quotes.
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Eq | BinaryOp::Ne => 5,
            BinaryOp::Add | BinaryOp::Sub => 10,
            BinaryOp::Mul | BinaryOp::Div => 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Literal(Literal),
    Name(String),
    /// `this`, or `Outer.this` when `qualifier` is set.
    This {
        qualifier: Option<String>,
    },
    Super,
    FieldAccess {
        receiver: Box<Expr>,
        name: String,
    },
    Call {
        receiver: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    New {
        ty: TypeRef,
        args: Vec<Expr>,
    },
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Missing,
}

impl Expr {
    pub fn is_bare_this(&self) -> bool {
        matches!(self.kind, ExprKind::This { qualifier: None })
    }
}
