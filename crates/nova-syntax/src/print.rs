//! Deterministic pretty printer.
//!
//! The printer does not try to preserve the original formatting: edited trees
//! are rendered with a fixed layout (four-space indentation, one member per
//! line, fields grouped without blank lines between them).

use crate::ast::{
    Block, CompilationUnit, ConstructorDecl, CtorCallKind, Expr, ExprKind, FieldDecl, Literal,
    Member, MethodDecl, Modifiers, Param, Stmt, StmtKind, TypeDecl, TypeKind, TypeParam,
};

const INDENT: &str = "    ";

const PREC_ASSIGN: u8 = 1;
const PREC_CAST: u8 = 30;
const PREC_POSTFIX: u8 = 40;

#[must_use]
pub fn print_compilation_unit(cu: &CompilationUnit) -> String {
    let mut printer = Printer::default();
    if let Some(package) = &cu.package {
        printer.out.push_str("package ");
        printer.out.push_str(package);
        printer.out.push_str(";\n");
        if !cu.types.is_empty() {
            printer.out.push('\n');
        }
    }
    for (idx, ty) in cu.types.iter().enumerate() {
        if idx > 0 {
            printer.out.push('\n');
        }
        printer.type_decl(ty);
    }
    printer.out
}

#[must_use]
pub fn print_type_decl(decl: &TypeDecl) -> String {
    let mut printer = Printer::default();
    printer.type_decl(decl);
    printer.out
}

#[must_use]
pub fn print_member(member: &Member) -> String {
    let mut printer = Printer::default();
    printer.member(member);
    printer.out
}

#[must_use]
pub fn print_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr, 0);
    out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    fn annotations(&mut self, modifiers: &Modifiers) {
        for annotation in &modifiers.annotations {
            self.line_start();
            self.out.push('@');
            self.out.push_str(annotation);
            self.out.push('\n');
        }
    }

    fn modifiers(&mut self, modifiers: &Modifiers) {
        if let Some(keyword) = modifiers.visibility.keyword() {
            self.out.push_str(keyword);
            self.out.push(' ');
        }
        let flags = [
            (modifiers.is_abstract, "abstract"),
            (modifiers.is_static, "static"),
            (modifiers.is_final, "final"),
            (modifiers.is_native, "native"),
            (modifiers.is_default, "default"),
        ];
        for (set, keyword) in flags {
            if set {
                self.out.push_str(keyword);
                self.out.push(' ');
            }
        }
    }

    fn type_params(&mut self, params: &[TypeParam]) {
        if params.is_empty() {
            return;
        }
        self.out.push('<');
        for (idx, param) in params.iter().enumerate() {
            if idx > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&param.name);
            for (bound_idx, bound) in param.bounds.iter().enumerate() {
                self.out.push_str(if bound_idx == 0 { " extends " } else { " & " });
                self.out.push_str(&bound.to_string());
            }
        }
        self.out.push('>');
    }

    fn type_decl(&mut self, decl: &TypeDecl) {
        self.annotations(&decl.modifiers);
        self.line_start();
        self.modifiers(&decl.modifiers);
        self.out.push_str(match decl.kind {
            TypeKind::Class => "class ",
            TypeKind::Interface => "interface ",
        });
        self.out.push_str(&decl.name);
        self.type_params(&decl.type_params);
        let clauses = [("extends", &decl.extends), ("implements", &decl.implements)];
        for (keyword, types) in clauses {
            if types.is_empty() {
                continue;
            }
            self.out.push(' ');
            self.out.push_str(keyword);
            self.out.push(' ');
            let names: Vec<String> = types.iter().map(ToString::to_string).collect();
            self.out.push_str(&names.join(", "));
        }
        self.out.push_str(" {\n");

        self.indent += 1;
        let mut prev: Option<&Member> = None;
        for member in &decl.members {
            if let Some(prev) = prev {
                let both_fields =
                    matches!(prev, Member::Field(_)) && matches!(member, Member::Field(_));
                if !both_fields {
                    self.out.push('\n');
                }
            }
            self.member(member);
            prev = Some(member);
        }
        self.indent -= 1;

        self.line_start();
        self.out.push_str("}\n");
    }

    fn member(&mut self, member: &Member) {
        match member {
            Member::Field(field) => self.field(field),
            Member::Method(method) => self.method(method),
            Member::Constructor(ctor) => self.constructor(ctor),
            Member::Type(decl) => self.type_decl(decl),
        }
    }

    fn field(&mut self, field: &FieldDecl) {
        self.annotations(&field.modifiers);
        self.line_start();
        self.modifiers(&field.modifiers);
        self.out.push_str(&field.ty.to_string());
        self.out.push(' ');
        self.out.push_str(&field.name);
        if let Some(init) = &field.init {
            self.out.push_str(" = ");
            write_expr(&mut self.out, init, PREC_ASSIGN);
        }
        self.out.push_str(";\n");
    }

    fn params(&mut self, params: &[Param]) {
        self.out.push('(');
        for (idx, param) in params.iter().enumerate() {
            if idx > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&param.ty.to_string());
            self.out.push(' ');
            self.out.push_str(&param.name);
        }
        self.out.push(')');
    }

    fn method(&mut self, method: &MethodDecl) {
        self.annotations(&method.modifiers);
        self.line_start();
        self.modifiers(&method.modifiers);
        if !method.type_params.is_empty() {
            self.type_params(&method.type_params);
            self.out.push(' ');
        }
        self.out.push_str(&method.return_ty.to_string());
        self.out.push(' ');
        self.out.push_str(&method.name);
        self.params(&method.params);
        match &method.body {
            Some(body) => {
                self.out.push(' ');
                self.block(body);
                self.out.push('\n');
            }
            None => self.out.push_str(";\n"),
        }
    }

    fn constructor(&mut self, ctor: &ConstructorDecl) {
        self.annotations(&ctor.modifiers);
        self.line_start();
        self.modifiers(&ctor.modifiers);
        self.out.push_str(&ctor.name);
        self.params(&ctor.params);
        self.out.push(' ');
        self.block(&ctor.body);
        self.out.push('\n');
    }

    /// Prints `{ ... }` starting at the current column; leaves the cursor after `}`.
    fn block(&mut self, block: &Block) {
        self.braced(&block.stmts);
    }

    fn braced(&mut self, stmts: &[Stmt]) {
        self.out.push_str("{\n");
        self.indent += 1;
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.line_start();
        self.out.push('}');
    }

    fn branch(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.block(block),
            _ => self.braced(std::slice::from_ref(stmt)),
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        self.line_start();
        match &stmt.kind {
            StmtKind::Local { ty, name, init } => {
                self.out.push_str(&ty.to_string());
                self.out.push(' ');
                self.out.push_str(name);
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    write_expr(&mut self.out, init, PREC_ASSIGN);
                }
                self.out.push(';');
            }
            StmtKind::Expr(expr) => {
                write_expr(&mut self.out, expr, 0);
                self.out.push(';');
            }
            StmtKind::Return(expr) => {
                self.out.push_str("return");
                if let Some(expr) = expr {
                    self.out.push(' ');
                    write_expr(&mut self.out, expr, 0);
                }
                self.out.push(';');
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.out.push_str("if (");
                write_expr(&mut self.out, cond, 0);
                self.out.push_str(") ");
                self.branch(then_branch);
                if let Some(else_branch) = else_branch {
                    self.out.push_str(" else ");
                    self.branch(else_branch);
                }
            }
            StmtKind::Block(block) => self.block(block),
            StmtKind::ConstructorCall { kind, args } => {
                self.out.push_str(match kind {
                    CtorCallKind::This => "this",
                    CtorCallKind::Super => "super",
                });
                write_args(&mut self.out, args);
                self.out.push(';');
            }
            StmtKind::Empty => self.out.push(';'),
        }
        self.out.push('\n');
    }
}

fn expr_prec(kind: &ExprKind) -> u8 {
    match kind {
        ExprKind::Assign { .. } => PREC_ASSIGN,
        ExprKind::Binary { op, .. } => op.precedence(),
        ExprKind::Cast { .. } => PREC_CAST,
        _ => PREC_POSTFIX,
    }
}

fn write_args(out: &mut String, args: &[Expr]) {
    out.push('(');
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        write_expr(out, arg, PREC_ASSIGN);
    }
    out.push(')');
}

fn write_expr(out: &mut String, expr: &Expr, min_prec: u8) {
    let prec = expr_prec(&expr.kind);
    let parens = prec < min_prec;
    if parens {
        out.push('(');
    }
    match &expr.kind {
        ExprKind::Literal(lit) => match lit {
            Literal::Int(raw) | Literal::Str(raw) => out.push_str(raw),
            Literal::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
            Literal::Null => out.push_str("null"),
        },
        ExprKind::Name(name) => out.push_str(name),
        ExprKind::This { qualifier } => {
            if let Some(qualifier) = qualifier {
                out.push_str(qualifier);
                out.push('.');
            }
            out.push_str("this");
        }
        ExprKind::Super => out.push_str("super"),
        ExprKind::FieldAccess { receiver, name } => {
            write_expr(out, receiver, PREC_POSTFIX);
            out.push('.');
            out.push_str(name);
        }
        ExprKind::Call {
            receiver,
            name,
            args,
        } => {
            if let Some(receiver) = receiver {
                write_expr(out, receiver, PREC_POSTFIX);
                out.push('.');
            }
            out.push_str(name);
            write_args(out, args);
        }
        ExprKind::New { ty, args } => {
            out.push_str("new ");
            out.push_str(&ty.to_string());
            write_args(out, args);
        }
        ExprKind::Cast { ty, expr } => {
            out.push('(');
            out.push_str(&ty.to_string());
            out.push_str(") ");
            write_expr(out, expr, PREC_CAST);
        }
        ExprKind::Assign { target, value } => {
            write_expr(out, target, PREC_ASSIGN + 1);
            out.push_str(" = ");
            write_expr(out, value, PREC_ASSIGN);
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let prec = op.precedence();
            write_expr(out, lhs, prec);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            write_expr(out, rhs, prec + 1);
        }
        ExprKind::Missing => out.push_str("/* missing */"),
    }
    if parens {
        out.push(')');
    }
}
