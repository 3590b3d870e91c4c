//! Usage scanning.
//!
//! A single top-down walk over every file in scope classifies three kinds of
//! sites: references to inherited members reached through a host instance,
//! host instances flowing into a base-typed (or root-typed) slot, and
//! subclass methods that override concrete base methods. Sites the resolver
//! could not resolve are skipped.

use std::collections::BTreeSet;

use nova_hir::{Symbol, SymbolId, Type};
use nova_syntax::{
    Block, Expr, ExprKind, FileId, Location, Member, NodeId, Span, Stmt, StmtKind, TypeDecl,
};
use serde::Serialize;

use crate::db::DelegationDatabase;
use crate::members::DelegationTarget;
use crate::usage::{AccessibilityContext, Usage, UsageRecord};

/// Syntactic slot an instance expression flows into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operand of a cast.
    Cast,
    /// Initializer of a local variable or field.
    Initializer,
    /// Right-hand side of an assignment.
    Assignment,
    /// Argument of a method call, `new` or explicit constructor call.
    Argument,
    /// Value of a `return` statement.
    Return,
}

/// Classifies every usage of the host (and its subclasses) relevant to
/// replacing `target.base` by delegation.
///
/// Scanning is read-only; calling it twice on the same snapshot yields the
/// same records in the same order.
pub fn scan(db: &dyn DelegationDatabase, target: &DelegationTarget) -> Vec<UsageRecord> {
    let files = scope_files(db, target);
    let mut records = Vec::new();
    for file in &files {
        let Some(unit) = db.syntax_tree(file) else {
            continue;
        };
        let mut scanner = Scanner {
            db,
            target,
            file,
            container: None,
            return_ty: None,
            records: &mut records,
        };
        for decl in &unit.types {
            scanner.type_decl(decl);
        }
    }

    tracing::debug!(
        target: "nova.delegate",
        host = db.name(target.host),
        base = db.name(target.base),
        files = files.len(),
        records = records.len(),
        "scanned usages"
    );
    records
}

/// Files that declare or reference the host or one of its subclasses.
fn scope_files(db: &dyn DelegationDatabase, target: &DelegationTarget) -> BTreeSet<FileId> {
    let mut files = BTreeSet::new();
    for class in std::iter::once(target.host).chain(target.subclasses.iter().copied()) {
        files.extend(db.files_mentioning(class));
        if let Some(decl) = db.type_symbol(class) {
            for member in decl.methods.iter().chain(&decl.fields) {
                files.extend(
                    db.references_to(*member)
                        .iter()
                        .map(|location| location.file.clone()),
                );
            }
        }
    }
    files
}

struct Scanner<'a, 'r> {
    db: &'a dyn DelegationDatabase,
    target: &'a DelegationTarget,
    file: &'a FileId,
    container: Option<SymbolId>,
    return_ty: Option<Type>,
    records: &'r mut Vec<UsageRecord>,
}

impl Scanner<'_, '_> {
    fn loc(&self, id: NodeId) -> Location {
        Location::new(self.file.clone(), id)
    }

    fn context(&self, container: SymbolId) -> AccessibilityContext {
        let enclosing = self.db.enclosing_types(container);
        if enclosing.contains(&self.target.host) {
            return AccessibilityContext::HostClass;
        }
        enclosing
            .into_iter()
            .find(|class| self.target.subclasses.contains(class))
            .map_or(AccessibilityContext::External, AccessibilityContext::Subclass)
    }

    fn push(&mut self, usage: Usage, id: NodeId, span: Span) {
        let Some(container) = self.container else {
            return;
        };
        let record = UsageRecord {
            usage,
            location: self.loc(id),
            span,
            container,
            context: self.context(container),
        };
        self.records.push(record);
    }

    fn type_decl(&mut self, decl: &TypeDecl) {
        let Some(class) = self.db.declaration_at(&self.loc(decl.id)) else {
            tracing::trace!(target: "nova.delegate", name = %decl.name, "skipping unresolved type");
            return;
        };
        let outer = self.container.replace(class);
        for member in &decl.members {
            self.member(class, member);
        }
        self.container = outer;
    }

    fn member(&mut self, class: SymbolId, member: &Member) {
        match member {
            Member::Field(field) => {
                let Some(init) = &field.init else {
                    return;
                };
                let expected = self
                    .db
                    .declaration_at(&self.loc(field.id))
                    .and_then(|id| self.db.field(id))
                    .map(|data| (Role::Initializer, data.ty.clone()));
                self.expr(init, expected);
            }
            Member::Method(method) => {
                let symbol = self.db.declaration_at(&self.loc(method.id));
                if let Some(symbol) = symbol {
                    if class != self.target.host && self.target.subclasses.contains(&class) {
                        self.lost_override(symbol, method.id, method.name_range);
                    }
                }
                let return_ty = symbol
                    .and_then(|id| self.db.method(id))
                    .map(|data| data.return_ty.clone())
                    .filter(|ty| *ty != Type::Void);
                let outer = std::mem::replace(&mut self.return_ty, return_ty);
                if let Some(body) = &method.body {
                    self.block(body);
                }
                self.return_ty = outer;
            }
            Member::Constructor(ctor) => {
                let outer = self.return_ty.take();
                self.block(&ctor.body);
                self.return_ty = outer;
            }
            Member::Type(nested) => self.type_decl(nested),
        }
    }

    fn lost_override(&mut self, method: SymbolId, id: NodeId, span: Span) {
        let surface = &self.target.surface;
        let overridden = self
            .db
            .overridden_methods(method)
            .into_iter()
            .find(|candidate| {
                surface.declares(*candidate)
                    && self.db.method(*candidate).is_some_and(|data| !data.is_abstract)
            });
        if let Some(overridden) = overridden {
            self.push(Usage::LostOverride { method, overridden }, id, span);
        }
    }

    fn block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Local { init, .. } => {
                if let Some(init) = init {
                    let expected = self
                        .db
                        .local_type(&self.loc(stmt.id))
                        .map(|ty| (Role::Initializer, ty.clone()));
                    self.expr(init, expected);
                }
            }
            StmtKind::Expr(expr) => self.expr(expr, None),
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    let expected = self.return_ty.clone().map(|ty| (Role::Return, ty));
                    self.expr(value, expected);
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(cond, None);
                self.stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch);
                }
            }
            StmtKind::Block(block) => self.block(block),
            StmtKind::ConstructorCall { args, .. } => self.args(stmt.id, args),
            StmtKind::Empty => {}
        }
    }

    /// Walks call arguments against the parameter types recorded for the
    /// call at `call`.
    fn args(&mut self, call: NodeId, args: &[Expr]) {
        let signature = self
            .db
            .resolved(&self.loc(call))
            .map(|resolved| resolved.signature.clone())
            .unwrap_or_default();
        for (idx, arg) in args.iter().enumerate() {
            let expected = signature.get(idx).map(|ty| (Role::Argument, ty.clone()));
            self.expr(arg, expected);
        }
    }

    fn expr(&mut self, expr: &Expr, expected: Option<(Role, Type)>) {
        if let Some((role, ty)) = expected {
            self.upcast(expr, role, &ty);
        }
        self.member_use(expr);

        match &expr.kind {
            ExprKind::Literal(_)
            | ExprKind::Name(_)
            | ExprKind::This { .. }
            | ExprKind::Super
            | ExprKind::Missing => {}
            ExprKind::FieldAccess { receiver, .. } => self.expr(receiver, None),
            ExprKind::Call { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    self.expr(receiver, None);
                }
                self.args(expr.id, args);
            }
            ExprKind::New { args, .. } => self.args(expr.id, args),
            ExprKind::Cast { expr: inner, .. } => {
                let expected = self
                    .db
                    .expr_type(&self.loc(expr.id))
                    .map(|ty| (Role::Cast, ty.clone()));
                self.expr(inner, expected);
            }
            ExprKind::Assign { target, value } => {
                self.expr(target, None);
                let expected = self
                    .db
                    .expr_type(&self.loc(expr.id))
                    .map(|ty| (Role::Assignment, ty.clone()));
                self.expr(value, expected);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs, None);
                self.expr(rhs, None);
            }
        }
    }

    /// Pass B: a host instance flowing into a slot of a supertype.
    fn upcast(&mut self, expr: &Expr, role: Role, expected: &Type) {
        let Some(Type::Class(actual)) = self.db.expr_type(&self.loc(expr.id)) else {
            return;
        };
        if !self.target.is_host_or_subclass(actual.symbol) {
            return;
        }
        let Type::Class(expected) = expected else {
            return;
        };
        let usage = if expected.symbol == self.db.root_type() {
            Usage::RootUpcast { role }
        } else if self.target.surface.chain_contains(expected.symbol) {
            Usage::TypedUpcast {
                target: expected.symbol,
                role,
            }
        } else {
            return;
        };
        self.push(usage, expr.id, expr.range);
    }

    /// Pass A: a reference to an inherited member (or a host override of
    /// one) whose receiver is a host instance.
    fn member_use(&mut self, expr: &Expr) {
        let receiver = match &expr.kind {
            ExprKind::Name(_) => None,
            ExprKind::Call { receiver, .. } => receiver.as_deref(),
            ExprKind::FieldAccess { receiver, .. } => Some(&**receiver),
            _ => return,
        };
        let location = self.loc(expr.id);
        let Some(resolved) = self.db.resolved(&location) else {
            if matches!(self.db.expr_type(&location), None | Some(Type::Unknown)) {
                tracing::trace!(
                    target: "nova.delegate",
                    file = %self.file,
                    span = ?expr.range,
                    "skipping unresolved reference"
                );
            }
            return;
        };
        let member = resolved.symbol;
        if !self.is_relevant(member) {
            return;
        }
        let Some(container) = self.container else {
            return;
        };

        let usage = match receiver {
            None => {
                let through_host = match resolved.implicit_this {
                    Some(class) => self.target.is_host_or_subclass(class),
                    None => self
                        .db
                        .enclosing_types(container)
                        .into_iter()
                        .any(|class| self.target.is_host_or_subclass(class)),
                };
                through_host.then_some(Usage::UnqualifiedMemberUse { member })
            }
            Some(receiver) => {
                let host_instance = match &receiver.kind {
                    ExprKind::Super => self.target.is_host_or_subclass(container),
                    _ => match self.db.expr_type(&self.loc(receiver.id)) {
                        Some(Type::Class(class)) => self.target.is_host_or_subclass(class.symbol),
                        Some(Type::TypeName(ty)) => self.target.is_host_or_subclass(*ty),
                        _ => false,
                    },
                };
                host_instance.then(|| Usage::QualifiedMemberUse {
                    member,
                    receiver: self.loc(receiver.id),
                })
            }
        };
        if let Some(usage) = usage {
            self.push(usage, expr.id, expr.range);
        }
    }

    fn is_relevant(&self, member: SymbolId) -> bool {
        let surface = &self.target.surface;
        match self.db.symbol(member) {
            Symbol::Field(_) => surface.declares(member),
            Symbol::Method(method) => {
                surface.declares(member)
                    || (self.target.is_host_or_subclass(method.owner)
                        && self
                            .db
                            .overridden_methods(member)
                            .into_iter()
                            .any(|overridden| surface.declares(overridden)))
            }
            Symbol::Type(_) | Symbol::Constructor(_) => false,
        }
    }
}
