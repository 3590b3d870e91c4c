//! Tree walks shared by the resolver and the rewriting engine.
//!
//! Mutable walks are post-order: children are visited before their parent, so
//! a callback that replaces a node sees already-rewritten children.

use crate::ast::{Block, Expr, ExprKind, Member, NodeId, Stmt, StmtKind, TypeDecl};

pub fn rewrite_expr(expr: &mut Expr, f: &mut dyn FnMut(&mut Expr)) {
    match &mut expr.kind {
        ExprKind::FieldAccess { receiver, .. } => rewrite_expr(receiver, f),
        ExprKind::Call { receiver, args, .. } => {
            if let Some(receiver) = receiver {
                rewrite_expr(receiver, f);
            }
            for arg in args {
                rewrite_expr(arg, f);
            }
        }
        ExprKind::New { args, .. } => {
            for arg in args {
                rewrite_expr(arg, f);
            }
        }
        ExprKind::Cast { expr: inner, .. } => rewrite_expr(inner, f),
        ExprKind::Assign { target, value } => {
            rewrite_expr(target, f);
            rewrite_expr(value, f);
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            rewrite_expr(lhs, f);
            rewrite_expr(rhs, f);
        }
        ExprKind::Literal(_)
        | ExprKind::Name(_)
        | ExprKind::This { .. }
        | ExprKind::Super
        | ExprKind::Missing => {}
    }
    f(expr);
}

pub fn rewrite_stmt(stmt: &mut Stmt, f: &mut dyn FnMut(&mut Expr)) {
    match &mut stmt.kind {
        StmtKind::Local { init, .. } => {
            if let Some(init) = init {
                rewrite_expr(init, f);
            }
        }
        StmtKind::Expr(expr) => rewrite_expr(expr, f),
        StmtKind::Return(value) => {
            if let Some(value) = value {
                rewrite_expr(value, f);
            }
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            rewrite_expr(cond, f);
            rewrite_stmt(then_branch, f);
            if let Some(else_branch) = else_branch {
                rewrite_stmt(else_branch, f);
            }
        }
        StmtKind::Block(block) => rewrite_block(block, f),
        StmtKind::ConstructorCall { args, .. } => {
            for arg in args {
                rewrite_expr(arg, f);
            }
        }
        StmtKind::Empty => {}
    }
}

pub fn rewrite_block(block: &mut Block, f: &mut dyn FnMut(&mut Expr)) {
    for stmt in &mut block.stmts {
        rewrite_stmt(stmt, f);
    }
}

pub fn rewrite_member(member: &mut Member, f: &mut dyn FnMut(&mut Expr)) {
    match member {
        Member::Field(field) => {
            if let Some(init) = &mut field.init {
                rewrite_expr(init, f);
            }
        }
        Member::Method(method) => {
            if let Some(body) = &mut method.body {
                rewrite_block(body, f);
            }
        }
        Member::Constructor(ctor) => rewrite_block(&mut ctor.body, f),
        Member::Type(decl) => rewrite_type(decl, f),
    }
}

pub fn rewrite_type(decl: &mut TypeDecl, f: &mut dyn FnMut(&mut Expr)) {
    for member in &mut decl.members {
        rewrite_member(member, f);
    }
}

/// Pre-order, read-only walk over an expression tree.
pub fn for_each_expr(expr: &Expr, f: &mut dyn FnMut(&Expr)) {
    f(expr);
    match &expr.kind {
        ExprKind::FieldAccess { receiver, .. } => for_each_expr(receiver, f),
        ExprKind::Call { receiver, args, .. } => {
            if let Some(receiver) = receiver {
                for_each_expr(receiver, f);
            }
            for arg in args {
                for_each_expr(arg, f);
            }
        }
        ExprKind::New { args, .. } => {
            for arg in args {
                for_each_expr(arg, f);
            }
        }
        ExprKind::Cast { expr: inner, .. } => for_each_expr(inner, f),
        ExprKind::Assign { target, value } => {
            for_each_expr(target, f);
            for_each_expr(value, f);
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            for_each_expr(lhs, f);
            for_each_expr(rhs, f);
        }
        ExprKind::Literal(_)
        | ExprKind::Name(_)
        | ExprKind::This { .. }
        | ExprKind::Super
        | ExprKind::Missing => {}
    }
}

pub fn for_each_expr_in_stmt(stmt: &Stmt, f: &mut dyn FnMut(&Expr)) {
    match &stmt.kind {
        StmtKind::Local { init, .. } => {
            if let Some(init) = init {
                for_each_expr(init, f);
            }
        }
        StmtKind::Expr(expr) => for_each_expr(expr, f),
        StmtKind::Return(value) => {
            if let Some(value) = value {
                for_each_expr(value, f);
            }
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            for_each_expr(cond, f);
            for_each_expr_in_stmt(then_branch, f);
            if let Some(else_branch) = else_branch {
                for_each_expr_in_stmt(else_branch, f);
            }
        }
        StmtKind::Block(block) => for_each_expr_in_block(block, f),
        StmtKind::ConstructorCall { args, .. } => {
            for arg in args {
                for_each_expr(arg, f);
            }
        }
        StmtKind::Empty => {}
    }
}

pub fn for_each_expr_in_block(block: &Block, f: &mut dyn FnMut(&Expr)) {
    for stmt in &block.stmts {
        for_each_expr_in_stmt(stmt, f);
    }
}

pub fn for_each_expr_in_member(member: &Member, f: &mut dyn FnMut(&Expr)) {
    match member {
        Member::Field(field) => {
            if let Some(init) = &field.init {
                for_each_expr(init, f);
            }
        }
        Member::Method(method) => {
            if let Some(body) = &method.body {
                for_each_expr_in_block(body, f);
            }
        }
        Member::Constructor(ctor) => for_each_expr_in_block(&ctor.body, f),
        Member::Type(decl) => {
            for member in &decl.members {
                for_each_expr_in_member(member, f);
            }
        }
    }
}

/// Ids of every expression below `types`, nested types included.
pub fn expr_ids(types: &[TypeDecl]) -> Vec<NodeId> {
    let mut out = Vec::new();
    for decl in types {
        for member in &decl.members {
            for_each_expr_in_member(member, &mut |expr| out.push(expr.id));
        }
    }
    out
}
