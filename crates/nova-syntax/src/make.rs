//! Constructors for synthesized syntax.
//!
//! Synthesized nodes get fresh ids from the unit's [`IdGen`] and an empty
//! span; they only ever reach source text through the printer.

use crate::ast::{
    Block, ConstructorDecl, CtorCallKind, Expr, ExprKind, FieldDecl, IdGen, MethodDecl, Modifiers,
    Param, Span, Stmt, StmtKind, TypeDecl, TypeKind, TypeParam, TypeRef,
};

fn expr(ids: &mut IdGen, kind: ExprKind) -> Expr {
    Expr {
        id: ids.alloc(),
        kind,
        range: Span::default(),
    }
}

fn stmt(ids: &mut IdGen, kind: StmtKind) -> Stmt {
    Stmt {
        id: ids.alloc(),
        kind,
        range: Span::default(),
    }
}

pub fn name(ids: &mut IdGen, name: &str) -> Expr {
    expr(ids, ExprKind::Name(name.to_string()))
}

pub fn this(ids: &mut IdGen) -> Expr {
    expr(ids, ExprKind::This { qualifier: None })
}

/// `Outer.this`
pub fn qualified_this(ids: &mut IdGen, qualifier: &str) -> Expr {
    expr(
        ids,
        ExprKind::This {
            qualifier: Some(qualifier.to_string()),
        },
    )
}

pub fn field_access(ids: &mut IdGen, receiver: Expr, name: &str) -> Expr {
    expr(
        ids,
        ExprKind::FieldAccess {
            receiver: Box::new(receiver),
            name: name.to_string(),
        },
    )
}

pub fn call(ids: &mut IdGen, receiver: Option<Expr>, name: &str, args: Vec<Expr>) -> Expr {
    expr(
        ids,
        ExprKind::Call {
            receiver: receiver.map(Box::new),
            name: name.to_string(),
            args,
        },
    )
}

pub fn new_object(ids: &mut IdGen, ty: TypeRef, args: Vec<Expr>) -> Expr {
    expr(ids, ExprKind::New { ty, args })
}

pub fn assign(ids: &mut IdGen, target: Expr, value: Expr) -> Expr {
    expr(
        ids,
        ExprKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        },
    )
}

pub fn expr_stmt(ids: &mut IdGen, expr: Expr) -> Stmt {
    stmt(ids, StmtKind::Expr(expr))
}

pub fn ret(ids: &mut IdGen, value: Option<Expr>) -> Stmt {
    stmt(ids, StmtKind::Return(value))
}

pub fn ctor_call(ids: &mut IdGen, kind: CtorCallKind, args: Vec<Expr>) -> Stmt {
    stmt(ids, StmtKind::ConstructorCall { kind, args })
}

pub fn block(ids: &mut IdGen, stmts: Vec<Stmt>) -> Block {
    Block {
        id: ids.alloc(),
        stmts,
        range: Span::default(),
    }
}

pub fn param(ids: &mut IdGen, ty: TypeRef, name: &str) -> Param {
    Param {
        id: ids.alloc(),
        ty,
        name: name.to_string(),
        range: Span::default(),
    }
}

pub fn field(
    ids: &mut IdGen,
    modifiers: Modifiers,
    ty: TypeRef,
    name: &str,
    init: Option<Expr>,
) -> FieldDecl {
    FieldDecl {
        id: ids.alloc(),
        modifiers,
        ty,
        name: name.to_string(),
        name_range: Span::default(),
        init,
        range: Span::default(),
    }
}

pub fn method(
    ids: &mut IdGen,
    modifiers: Modifiers,
    type_params: Vec<TypeParam>,
    return_ty: TypeRef,
    name: &str,
    params: Vec<Param>,
    body: Option<Block>,
) -> MethodDecl {
    MethodDecl {
        id: ids.alloc(),
        modifiers,
        type_params,
        return_ty,
        name: name.to_string(),
        name_range: Span::default(),
        params,
        body,
        range: Span::default(),
    }
}

pub fn constructor(
    ids: &mut IdGen,
    modifiers: Modifiers,
    name: &str,
    params: Vec<Param>,
    body: Block,
) -> ConstructorDecl {
    ConstructorDecl {
        id: ids.alloc(),
        modifiers,
        name: name.to_string(),
        name_range: Span::default(),
        params,
        body,
        range: Span::default(),
    }
}

pub fn class(
    ids: &mut IdGen,
    modifiers: Modifiers,
    name: &str,
    extends: Vec<TypeRef>,
    implements: Vec<TypeRef>,
) -> TypeDecl {
    TypeDecl {
        id: ids.alloc(),
        kind: TypeKind::Class,
        modifiers,
        name: name.to_string(),
        name_range: Span::default(),
        type_params: Vec::new(),
        extends,
        implements,
        members: Vec::new(),
        range: Span::default(),
    }
}
