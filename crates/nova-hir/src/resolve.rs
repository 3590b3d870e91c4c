//! Name resolution and typing of method, constructor and initializer bodies.

use std::collections::HashMap;

use nova_syntax::{
    BinaryOp, Block, ConstructorDecl, CtorCallKind, Expr, ExprKind, FileId, Literal, Location,
    Member, NodeId, Span, Stmt, StmtKind, TypeKind,
};

use crate::diagnostics::{
    Diagnostic, ABSTRACT_INSTANTIATION, NO_DEFAULT_CONSTRUCTOR, STATIC_CONTEXT,
    UNRESOLVED_CONSTRUCTOR, UNRESOLVED_FIELD, UNRESOLVED_METHOD, UNRESOLVED_NAME,
};
use crate::ids::SymbolId;
use crate::lowering::note_mentions;
use crate::program::{Program, ResolvedRef, TypeScope, BUILTIN_FILE};
use crate::types::{ClassType, Type};

#[derive(Default)]
struct Resolutions {
    refs: HashMap<Location, ResolvedRef>,
    expr_types: HashMap<Location, Type>,
    local_types: HashMap<Location, Type>,
    diagnostics: Vec<Diagnostic>,
}

pub(crate) fn resolve_bodies(program: &mut Program) {
    let mut out = Resolutions::default();
    for (class, unit, decl) in program.type_decls() {
        if unit.file.as_str() == BUILTIN_FILE {
            continue;
        }
        let mut has_constructor = false;
        for member in &decl.members {
            match member {
                Member::Field(field) => {
                    let is_static =
                        field.modifiers.is_static || decl.kind == TypeKind::Interface;
                    let mut body =
                        BodyResolver::new(program, &unit.file, class, is_static, &mut out);
                    if let Some(init) = &field.init {
                        body.expr(init);
                    }
                }
                Member::Method(method) => {
                    let is_static = method.modifiers.is_static;
                    let mut body =
                        BodyResolver::new(program, &unit.file, class, is_static, &mut out);
                    body.method_type_params =
                        method.type_params.iter().map(|p| p.name.clone()).collect();
                    body.push_scope();
                    for param in &method.params {
                        let ty = body.resolve_type(&param.ty);
                        body.declare(&param.name, ty);
                    }
                    if let Some(block) = &method.body {
                        body.block(block);
                    }
                }
                Member::Constructor(ctor) => {
                    has_constructor = true;
                    let mut body = BodyResolver::new(program, &unit.file, class, false, &mut out);
                    body.constructor(ctor);
                }
                Member::Type(_) => {}
            }
        }
        if !has_constructor && decl.kind == TypeKind::Class {
            let mut body = BodyResolver::new(program, &unit.file, class, false, &mut out);
            body.implicit_super_call(decl.name_range);
        }
    }

    let Resolutions {
        refs,
        expr_types,
        local_types,
        diagnostics,
    } = out;

    for (location, resolved) in &refs {
        program
            .references
            .entry(resolved.symbol)
            .or_default()
            .push(location.clone());
    }
    for locations in program.references.values_mut() {
        locations.sort();
    }
    let mentioned: Vec<(Type, FileId)> = expr_types
        .iter()
        .filter(|(_, ty)| ty.symbol().is_some())
        .map(|(location, ty)| (ty.clone(), location.file.clone()))
        .collect();
    for (ty, file) in mentioned {
        note_mentions(program, &ty, &file);
    }

    program.refs = refs;
    program.expr_types = expr_types;
    program.local_types = local_types;
    program.diagnostics.extend(diagnostics);
}

struct BodyResolver<'a> {
    program: &'a Program,
    file: &'a FileId,
    class: SymbolId,
    is_static: bool,
    method_type_params: Vec<String>,
    scopes: Vec<HashMap<String, Type>>,
    out: &'a mut Resolutions,
}

impl<'a> BodyResolver<'a> {
    fn new(
        program: &'a Program,
        file: &'a FileId,
        class: SymbolId,
        is_static: bool,
        out: &'a mut Resolutions,
    ) -> Self {
        Self {
            program,
            file,
            class,
            is_static,
            method_type_params: Vec::new(),
            scopes: Vec::new(),
            out,
        }
    }

    fn loc(&self, id: NodeId) -> Location {
        Location::new(self.file.clone(), id)
    }

    fn resolve_type(&self, ty: &nova_syntax::TypeRef) -> Type {
        let scope = TypeScope {
            class: Some(self.class),
            method_type_params: &self.method_type_params,
        };
        self.program.resolve_type_ref(&scope, ty)
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, ty: Type) {
        if self.scopes.is_empty() {
            self.push_scope();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn lookup_local(&self, name: &str) -> Option<Type> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }

    fn error(&mut self, code: &'static str, message: String, span: Span) {
        self.out
            .diagnostics
            .push(Diagnostic::error(self.file.clone(), code, message, span));
    }

    fn record_ref(
        &mut self,
        id: NodeId,
        symbol: SymbolId,
        implicit_this: Option<SymbolId>,
        signature: Vec<Type>,
    ) {
        let location = self.loc(id);
        self.out.refs.insert(
            location,
            ResolvedRef {
                symbol,
                implicit_this,
                signature,
            },
        );
    }

    fn type_name(&self, symbol: SymbolId) -> &str {
        self.program.symbol(symbol).name()
    }

    fn constructor(&mut self, ctor: &ConstructorDecl) {
        self.push_scope();
        for param in &ctor.params {
            let ty = self.resolve_type(&param.ty);
            self.declare(&param.name, ty);
        }
        if ctor.explicit_call().is_none() {
            self.implicit_super_call(ctor.name_range);
        }
        self.block(&ctor.body);
        self.pop_scope();
    }

    fn superclass(&self) -> Option<ClassType> {
        self.program
            .type_symbol(self.class)?
            .superclass
            .as_ref()?
            .as_class()
            .cloned()
    }

    /// Java inserts `super()` into constructors without an explicit call.
    fn implicit_super_call(&mut self, span: Span) {
        let Some(superclass) = self.superclass() else {
            return;
        };
        if !self.program.has_nullary_constructor(superclass.symbol) {
            let message = format!(
                "`{}` has no no-argument constructor",
                self.type_name(superclass.symbol)
            );
            self.error(NO_DEFAULT_CONSTRUCTOR, message, span);
        }
    }

    fn block(&mut self, block: &Block) {
        self.push_scope();
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
        self.pop_scope();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Local { ty, name, init } => {
                let declared = self.resolve_type(ty);
                if let Some(init) = init {
                    self.expr(init);
                }
                let location = self.loc(stmt.id);
                self.out.local_types.insert(location, declared.clone());
                self.declare(name, declared);
            }
            StmtKind::Expr(expr) => {
                self.expr(expr);
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(cond);
                self.push_scope();
                self.stmt(then_branch);
                self.pop_scope();
                if let Some(else_branch) = else_branch {
                    self.push_scope();
                    self.stmt(else_branch);
                    self.pop_scope();
                }
            }
            StmtKind::Block(block) => self.block(block),
            StmtKind::ConstructorCall { kind, args } => {
                let arg_types: Vec<Type> = args.iter().map(|arg| self.expr(arg)).collect();
                let target = match kind {
                    CtorCallKind::This => Some(self.program.this_type(self.class)),
                    CtorCallKind::Super => self.superclass(),
                };
                if let Some(target) = target {
                    self.constructor_ref(stmt.id, &target, arg_types.len(), stmt.range);
                }
            }
            StmtKind::Empty => {}
        }
    }

    fn constructor_ref(&mut self, id: NodeId, target: &ClassType, arity: usize, span: Span) {
        match self.program.find_constructor(target.symbol, arity) {
            Some(ctor) => {
                let map = self.program.subst_map(target);
                let signature = self
                    .program
                    .constructor(ctor)
                    .map(|data| data.params.iter().map(|p| p.subst(&map)).collect())
                    .unwrap_or_default();
                self.record_ref(id, ctor, None, signature);
            }
            None if arity == 0 && self.program.has_nullary_constructor(target.symbol) => {}
            None => {
                let message = format!(
                    "no constructor of `{}` takes {arity} argument(s)",
                    self.type_name(target.symbol)
                );
                self.error(UNRESOLVED_CONSTRUCTOR, message, span);
            }
        }
    }

    fn expr(&mut self, expr: &Expr) -> Type {
        let ty = self.expr_inner(expr);
        let location = self.loc(expr.id);
        self.out.expr_types.insert(location, ty.clone());
        ty
    }

    fn expr_inner(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Int(_) => Type::Primitive("int".to_string()),
                Literal::Str(_) => Type::class(self.program.string_type(), Vec::new()),
                Literal::Bool(_) => Type::Primitive("boolean".to_string()),
                Literal::Null => Type::Null,
            },
            ExprKind::Name(name) => self.name(expr, name),
            ExprKind::This { qualifier } => self.this(qualifier.as_deref(), expr.range),
            ExprKind::Super => self
                .superclass()
                .map(Type::Class)
                .unwrap_or(Type::Unknown),
            ExprKind::FieldAccess { receiver, name } => {
                let receiver = self.expr(receiver);
                self.field_access(expr, &receiver, name)
            }
            ExprKind::Call {
                receiver,
                name,
                args,
            } => {
                let receiver = receiver.as_ref().map(|receiver| self.expr(receiver));
                let arg_types: Vec<Type> = args.iter().map(|arg| self.expr(arg)).collect();
                self.call(expr, receiver, name, &arg_types)
            }
            ExprKind::New { ty, args } => {
                let arg_types: Vec<Type> = args.iter().map(|arg| self.expr(arg)).collect();
                let ty = self.resolve_type(ty);
                if let Type::Class(class) = &ty {
                    let is_abstract = self
                        .program
                        .type_symbol(class.symbol)
                        .is_some_and(|decl| decl.is_abstract());
                    if is_abstract {
                        let message = format!(
                            "`{}` is abstract; cannot be instantiated",
                            self.type_name(class.symbol)
                        );
                        self.error(ABSTRACT_INSTANTIATION, message, expr.range);
                    } else {
                        self.constructor_ref(expr.id, class, arg_types.len(), expr.range);
                    }
                }
                ty
            }
            ExprKind::Cast { ty, expr: inner } => {
                self.expr(inner);
                self.resolve_type(ty)
            }
            ExprKind::Assign { target, value } => {
                let ty = self.expr(target);
                self.expr(value);
                ty
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.expr(lhs);
                let rhs = self.expr(rhs);
                let string = self.program.string_type();
                match op {
                    BinaryOp::Eq | BinaryOp::Ne => Type::Primitive("boolean".to_string()),
                    BinaryOp::Add
                        if lhs.symbol() == Some(string) || rhs.symbol() == Some(string) =>
                    {
                        Type::class(string, Vec::new())
                    }
                    _ => Type::Primitive("int".to_string()),
                }
            }
            ExprKind::Missing => Type::Unknown,
        }
    }

    fn name(&mut self, expr: &Expr, name: &str) -> Type {
        if let Some(ty) = self.lookup_local(name) {
            return ty;
        }

        for class in self.program.enclosing_types(self.class) {
            let this = self.program.this_type(class);
            if let Some((field, ty)) = self.program.find_field(&this, name) {
                let is_static = self.program.symbol(field).is_static();
                if !is_static {
                    self.check_instance_context(class, name, expr.range);
                }
                self.record_ref(expr.id, field, (!is_static).then_some(class), Vec::new());
                return ty;
            }
        }

        if let Some(ty) = self.program.lookup_type_path(Some(self.class), name) {
            return Type::TypeName(ty);
        }

        self.error(
            UNRESOLVED_NAME,
            format!("cannot resolve symbol `{name}`"),
            expr.range,
        );
        Type::Unknown
    }

    fn check_instance_context(&mut self, class: SymbolId, member: &str, span: Span) {
        if self.is_static && class == self.class {
            self.error(
                STATIC_CONTEXT,
                format!("instance member `{member}` referenced from a static context"),
                span,
            );
        }
    }

    fn this(&mut self, qualifier: Option<&str>, span: Span) -> Type {
        let Some(qualifier) = qualifier else {
            return Type::Class(self.program.this_type(self.class));
        };
        let found = self
            .program
            .enclosing_types(self.class)
            .into_iter()
            .find(|class| self.type_name(*class) == qualifier);
        match found {
            Some(class) => Type::Class(self.program.this_type(class)),
            None => {
                self.error(
                    UNRESOLVED_NAME,
                    format!("`{qualifier}` is not an enclosing class"),
                    span,
                );
                Type::Unknown
            }
        }
    }

    /// The class that member lookups on a value of type `ty` search.
    fn receiver_class(&self, ty: &Type) -> Option<ClassType> {
        match ty {
            Type::Class(class) => Some(class.clone()),
            Type::TypeName(symbol) => Some(ClassType::raw(*symbol)),
            Type::TypeParam(name) => Some(self.type_param_bound(name)),
            Type::External { .. }
            | Type::Primitive(_)
            | Type::Array(_)
            | Type::Void
            | Type::Null
            | Type::Unknown => None,
        }
    }

    fn type_param_bound(&self, name: &str) -> ClassType {
        if !self.method_type_params.iter().any(|param| param == name) {
            for class in self.program.enclosing_types(self.class) {
                let Some(decl) = self.program.type_symbol(class) else {
                    continue;
                };
                if let Some(idx) = decl.type_params.iter().position(|param| param == name) {
                    if let Some(Some(Type::Class(bound))) = decl.type_param_bounds.get(idx) {
                        return bound.clone();
                    }
                    break;
                }
            }
        }
        ClassType::raw(self.program.root_type())
    }

    fn field_access(&mut self, expr: &Expr, receiver: &Type, name: &str) -> Type {
        if let Type::Array(_) = receiver {
            if name == "length" {
                return Type::Primitive("int".to_string());
            }
        }
        let Some(class) = self.receiver_class(receiver) else {
            return Type::Unknown;
        };
        if let Some((field, ty)) = self.program.find_field(&class, name) {
            self.record_ref(expr.id, field, None, Vec::new());
            return ty;
        }
        if let Type::TypeName(symbol) = receiver {
            if let Some(nested) = self.program.nested_type(*symbol, name) {
                return Type::TypeName(nested);
            }
        }
        let message = format!(
            "cannot resolve field `{name}` in `{}`",
            self.type_name(class.symbol)
        );
        self.error(UNRESOLVED_FIELD, message, expr.range);
        Type::Unknown
    }

    fn call(
        &mut self,
        expr: &Expr,
        receiver: Option<Type>,
        name: &str,
        arg_types: &[Type],
    ) -> Type {
        let arity = arg_types.len();
        let Some(receiver) = receiver else {
            for class in self.program.enclosing_types(self.class) {
                let this = self.program.this_type(class);
                if let Some((method, map)) = self.program.find_method(&this, name, arity) {
                    let is_static = self.program.symbol(method).is_static();
                    if !is_static {
                        self.check_instance_context(class, name, expr.range);
                    }
                    let implicit_this = (!is_static).then_some(class);
                    return self.finish_call(expr, method, &map, implicit_this, arg_types);
                }
            }
            self.error(
                UNRESOLVED_METHOD,
                format!("cannot resolve method `{name}` with {arity} argument(s)"),
                expr.range,
            );
            return Type::Unknown;
        };

        let Some(class) = self.receiver_class(&receiver) else {
            return Type::Unknown;
        };
        match self.program.find_method(&class, name, arity) {
            Some((method, map)) => self.finish_call(expr, method, &map, None, arg_types),
            None => {
                let message = format!(
                    "cannot resolve method `{name}` with {arity} argument(s) in `{}`",
                    self.type_name(class.symbol)
                );
                self.error(UNRESOLVED_METHOD, message, expr.range);
                Type::Unknown
            }
        }
    }

    fn finish_call(
        &mut self,
        expr: &Expr,
        method: SymbolId,
        class_map: &HashMap<String, Type>,
        implicit_this: Option<SymbolId>,
        arg_types: &[Type],
    ) -> Type {
        let program = self.program;
        let Some(data) = program.method(method) else {
            return Type::Unknown;
        };

        // Infer method type parameters from arguments passed directly to them;
        // anything else stays unknown.
        let mut map = class_map.clone();
        for param in &data.type_params {
            map.insert(param.name.clone(), Type::Unknown);
        }
        for (param, arg) in data.params.iter().zip(arg_types) {
            if let Type::TypeParam(name) = param {
                let is_method_param = data.type_params.iter().any(|p| &p.name == name);
                if is_method_param && arg.is_known() {
                    map.insert(name.clone(), arg.clone());
                }
            }
        }

        let signature = data.params.iter().map(|p| p.subst(&map)).collect();
        let return_ty = data.return_ty.subst(&map);
        self.record_ref(expr.id, method, implicit_this, signature);
        return_ty
    }
}
