//! Recursive-descent parser for the Java subset described in [`crate::ast`].
//!
//! The parser never fails: unexpected tokens are skipped and missing
//! expressions become [`ExprKind::Missing`] so callers always get a tree.

use crate::ast::{
    BinaryOp, Block, CompilationUnit, ConstructorDecl, CtorCallKind, Expr, ExprKind, FieldDecl,
    FileId, IdGen, Literal, Member, MethodDecl, Modifiers, Param, Span, Stmt, StmtKind, TypeDecl,
    TypeKind, TypeParam, TypeRef, Visibility,
};
use crate::lexer::{Lexer, Token, TokenKind};

const RESERVED: &[&str] = &[
    "return",
    "new",
    "this",
    "super",
    "if",
    "else",
    "null",
    "true",
    "false",
    "class",
    "interface",
    "extends",
    "implements",
    "package",
    "import",
    "throws",
];

const PRIMITIVES: &[&str] = &[
    "int", "long", "short", "byte", "char", "boolean", "float", "double",
];

fn is_reserved(text: &str) -> bool {
    RESERVED.contains(&text)
}

pub(crate) fn is_primitive(text: &str) -> bool {
    PRIMITIVES.contains(&text)
}

/// Parse a Java compilation unit.
#[must_use]
pub fn parse(file: FileId, text: &str) -> CompilationUnit {
    let tokens = Lexer::new(text).collect();
    let mut parser = Parser::new(tokens);
    let (package, types) = parser.parse_compilation_unit();
    CompilationUnit {
        file,
        package,
        types,
        range: Span::new(0, text.len()),
        ids: parser.ids,
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    ids: IdGen,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            ids: IdGen::default(),
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_n(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|token| token.kind == kind)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek()
            .is_some_and(|token| token.kind == TokenKind::Ident && token.text == keyword)
    }

    fn bump(&mut self) -> Option<Token> {
        if self.is_eof() {
            return None;
        }
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        Some(tok)
    }

    fn current_offset(&self) -> usize {
        self.peek()
            .map(|t| t.range.start)
            .or_else(|| self.tokens.last().map(|t| t.range.end))
            .unwrap_or(0)
    }

    /// Consumes a token of `kind`, or returns an empty placeholder without
    /// consuming anything.
    fn expect_kind(&mut self, kind: TokenKind) -> Token {
        if self.at_kind(kind) {
            if let Some(tok) = self.bump() {
                return tok;
            }
        }
        let offset = self.current_offset();
        Token {
            kind,
            text: String::new(),
            range: Span::new(offset, offset),
        }
    }

    fn expect_ident(&mut self) -> Token {
        self.expect_kind(TokenKind::Ident)
    }

    fn expr(&mut self, kind: ExprKind, range: Span) -> Expr {
        Expr {
            id: self.ids.alloc(),
            kind,
            range,
        }
    }

    fn missing(&mut self, offset: usize) -> Expr {
        self.expr(ExprKind::Missing, Span::new(offset, offset))
    }

    fn stmt(&mut self, kind: StmtKind, range: Span) -> Stmt {
        Stmt {
            id: self.ids.alloc(),
            kind,
            range,
        }
    }

    fn parse_compilation_unit(&mut self) -> (Option<String>, Vec<TypeDecl>) {
        let package = if self.at_keyword("package") {
            self.bump();
            let (name, _) = self.parse_qualified_name();
            self.expect_kind(TokenKind::Semi);
            Some(name)
        } else {
            None
        };

        // Imports carry no information for the single-namespace resolver.
        while self.at_keyword("import") {
            while !self.is_eof() && !self.at_kind(TokenKind::Semi) {
                self.bump();
            }
            self.bump();
        }

        let mut types = Vec::new();
        while !self.is_eof() {
            let before = self.pos;
            match self.parse_type_decl() {
                Some(decl) => types.push(decl),
                None => {
                    if self.pos == before {
                        self.bump();
                    }
                }
            }
        }
        (package, types)
    }

    fn parse_qualified_name(&mut self) -> (String, Span) {
        let first = self.expect_ident();
        let start = first.range.start;
        let mut end = first.range.end;
        let mut parts = vec![first.text];

        while self.at_kind(TokenKind::Dot)
            && self.peek_n(1).is_some_and(|t| t.kind == TokenKind::Ident)
        {
            self.bump();
            let part = self.expect_ident();
            end = part.range.end;
            parts.push(part.text);
        }

        (parts.join("."), Span::new(start, end))
    }

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        loop {
            if self.at_kind(TokenKind::At) {
                if self
                    .peek_n(1)
                    .is_some_and(|t| t.kind == TokenKind::Ident && t.text == "interface")
                {
                    break;
                }
                self.bump();
                if self.at_kind(TokenKind::Ident) {
                    let (name, _) = self.parse_qualified_name();
                    modifiers.annotations.push(name);
                }
                if self.at_kind(TokenKind::LParen) {
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
                }
                continue;
            }

            let Some(word) = self
                .peek()
                .filter(|t| t.kind == TokenKind::Ident)
                .map(|t| t.text.clone())
            else {
                break;
            };
            match word.as_str() {
                "public" => modifiers.visibility = Visibility::Public,
                "protected" => modifiers.visibility = Visibility::Protected,
                "private" => modifiers.visibility = Visibility::Private,
                "static" => modifiers.is_static = true,
                "abstract" => modifiers.is_abstract = true,
                "final" => modifiers.is_final = true,
                "native" => modifiers.is_native = true,
                "default" => modifiers.is_default = true,
                "synchronized" | "transient" | "volatile" | "strictfp" | "sealed" => {}
                _ => break,
            }
            self.bump();
        }
        modifiers
    }

    fn parse_type_decl(&mut self) -> Option<TypeDecl> {
        let start_pos = self.pos;
        let start = self.peek()?.range.start;
        let modifiers = self.parse_modifiers();

        let kind = if self.at_keyword("class") {
            TypeKind::Class
        } else if self.at_keyword("interface") {
            TypeKind::Interface
        } else {
            self.pos = start_pos;
            return None;
        };
        self.bump();

        let id = self.ids.alloc();
        let name = self.expect_ident();
        let type_params = self.parse_type_params();

        let mut extends = Vec::new();
        let mut implements = Vec::new();
        loop {
            if self.at_keyword("extends") {
                self.bump();
                extends.extend(self.parse_type_list());
                continue;
            }
            if self.at_keyword("implements") {
                self.bump();
                implements.extend(self.parse_type_list());
                continue;
            }
            break;
        }

        while !self.is_eof() && !self.at_kind(TokenKind::LBrace) {
            self.bump();
        }
        let (members, end) = self.parse_type_body(&name.text);

        Some(TypeDecl {
            id,
            kind,
            modifiers,
            name: name.text,
            name_range: name.range,
            type_params,
            extends,
            implements,
            members,
            range: Span::new(start, end),
        })
    }

    fn parse_type_list(&mut self) -> Vec<TypeRef> {
        let mut out = Vec::new();
        while let Some(ty) = self.parse_type_ref() {
            out.push(ty);
            if !self.at_kind(TokenKind::Comma) {
                break;
            }
            self.bump();
        }
        out
    }

    fn parse_type_params(&mut self) -> Vec<TypeParam> {
        let mut params = Vec::new();
        if !self.at_kind(TokenKind::Lt) {
            return params;
        }
        self.bump();
        while !self.is_eof() && !self.at_kind(TokenKind::Gt) {
            if !self.at_kind(TokenKind::Ident) {
                self.bump();
                continue;
            }
            let name = self.expect_ident();
            let mut bounds = Vec::new();
            if self.at_keyword("extends") {
                self.bump();
                while let Some(bound) = self.parse_type_ref() {
                    bounds.push(bound);
                    if !self.at_kind(TokenKind::Amp) {
                        break;
                    }
                    self.bump();
                }
            }
            params.push(TypeParam {
                name: name.text,
                bounds,
            });
            if self.at_kind(TokenKind::Comma) {
                self.bump();
            }
        }
        self.expect_kind(TokenKind::Gt);
        params
    }

    fn parse_type_body(&mut self, type_name: &str) -> (Vec<Member>, usize) {
        let lbrace = self.expect_kind(TokenKind::LBrace);

        let mut members = Vec::new();
        while !self.is_eof() && !self.at_kind(TokenKind::RBrace) {
            if self.at_kind(TokenKind::Semi) {
                self.bump();
                continue;
            }
            let before = self.pos;
            match self.parse_member_decl(type_name) {
                Some(member) => members.push(member),
                None => {
                    if self.pos == before {
                        self.bump();
                    }
                }
            }
        }

        let rbrace = self.expect_kind(TokenKind::RBrace);
        (members, rbrace.range.end.max(lbrace.range.end))
    }

    fn parse_member_decl(&mut self, enclosing_type: &str) -> Option<Member> {
        let start_pos = self.pos;
        let start = self.peek()?.range.start;
        let modifiers = self.parse_modifiers();

        if self.at_keyword("class") || self.at_keyword("interface") {
            self.pos = start_pos;
            return self.parse_type_decl().map(Member::Type);
        }

        // Initializer blocks are not modelled; skip them wholesale.
        if self.at_kind(TokenKind::LBrace) {
            self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
            return None;
        }

        let type_params = self.parse_type_params();

        if self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Ident && t.text == enclosing_type)
            && self.peek_n(1).is_some_and(|t| t.kind == TokenKind::LParen)
        {
            let name = self.bump()?;
            let id = self.ids.alloc();
            let params = self.parse_param_list();
            self.skip_throws_clause();
            let body = self.parse_block();
            let range = Span::new(start, body.range.end);
            return Some(Member::Constructor(ConstructorDecl {
                id,
                modifiers,
                name: name.text,
                name_range: name.range,
                params,
                body,
                range,
            }));
        }

        let ty = self.parse_type_ref()?;
        if !self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Ident && !is_reserved(&t.text))
        {
            return None;
        }
        let name = self.bump()?;

        if self.at_kind(TokenKind::LParen) {
            let id = self.ids.alloc();
            let params = self.parse_param_list();
            self.skip_throws_clause();
            let (body, end) = if self.at_kind(TokenKind::LBrace) {
                let body = self.parse_block();
                let end = body.range.end;
                (Some(body), end)
            } else {
                let semi = self.expect_kind(TokenKind::Semi);
                (None, semi.range.end.max(name.range.end))
            };
            return Some(Member::Method(MethodDecl {
                id,
                modifiers,
                type_params,
                return_ty: ty,
                name: name.text,
                name_range: name.range,
                params,
                body,
                range: Span::new(start, end),
            }));
        }

        let id = self.ids.alloc();
        let init = if self.at_kind(TokenKind::Eq) {
            self.bump();
            self.parse_expr()
        } else {
            None
        };
        let semi = self.expect_kind(TokenKind::Semi);
        Some(Member::Field(FieldDecl {
            id,
            modifiers,
            ty,
            name: name.text,
            name_range: name.range,
            init,
            range: Span::new(start, semi.range.end.max(name.range.end)),
        }))
    }

    fn skip_throws_clause(&mut self) {
        if !self.at_keyword("throws") {
            return;
        }
        self.bump();
        while !self.is_eof() && !self.at_kind(TokenKind::LBrace) && !self.at_kind(TokenKind::Semi)
        {
            self.bump();
        }
    }

    fn parse_type_ref(&mut self) -> Option<TypeRef> {
        let first = self.peek()?;
        if first.kind != TokenKind::Ident || is_reserved(&first.text) {
            return None;
        }
        let first = self.bump()?;
        let start = first.range.start;
        let mut end = first.range.end;
        let mut name = first.text;

        while self.at_kind(TokenKind::Dot)
            && self
                .peek_n(1)
                .is_some_and(|t| t.kind == TokenKind::Ident && !is_reserved(&t.text))
        {
            self.bump();
            if let Some(part) = self.bump() {
                name.push('.');
                name.push_str(&part.text);
                end = part.range.end;
            }
        }

        let mut args = Vec::new();
        if self.at_kind(TokenKind::Lt) {
            self.bump();
            while !self.is_eof() && !self.at_kind(TokenKind::Gt) {
                let before = self.pos;
                if self.at_kind(TokenKind::Question) {
                    self.bump();
                    if self.at_keyword("extends") || self.at_keyword("super") {
                        self.bump();
                        if let Some(bound) = self.parse_type_ref() {
                            args.push(bound);
                        }
                    } else {
                        args.push(TypeRef::named("Object"));
                    }
                } else if let Some(arg) = self.parse_type_ref() {
                    args.push(arg);
                }
                if self.at_kind(TokenKind::Comma) {
                    self.bump();
                } else if self.pos == before {
                    return None;
                }
            }
            let gt = self.expect_kind(TokenKind::Gt);
            end = end.max(gt.range.end);
        }

        let mut dims = 0u8;
        while self.at_kind(TokenKind::LBracket)
            && self.peek_n(1).is_some_and(|t| t.kind == TokenKind::RBracket)
        {
            self.bump();
            let rb = self.bump()?;
            end = rb.range.end;
            dims = dims.saturating_add(1);
        }

        Some(TypeRef {
            name,
            args,
            dims,
            range: Span::new(start, end),
        })
    }

    fn parse_param_list(&mut self) -> Vec<Param> {
        self.expect_kind(TokenKind::LParen);
        let mut params = Vec::new();
        while !self.is_eof() && !self.at_kind(TokenKind::RParen) {
            let before = self.pos;
            self.skip_variable_modifiers_and_annotations();
            if let Some(mut ty) = self.parse_type_ref() {
                if self.at_kind(TokenKind::Dot)
                    && self.peek_n(1).is_some_and(|t| t.kind == TokenKind::Dot)
                    && self.peek_n(2).is_some_and(|t| t.kind == TokenKind::Dot)
                {
                    self.bump();
                    self.bump();
                    self.bump();
                    ty.dims = ty.dims.saturating_add(1);
                }
                if self.at_kind(TokenKind::Ident) {
                    let name = self.expect_ident();
                    params.push(Param {
                        id: self.ids.alloc(),
                        range: ty.range.cover(name.range),
                        ty,
                        name: name.text,
                    });
                }
            }

            if self.at_kind(TokenKind::Comma) {
                self.bump();
            } else if self.pos == before {
                self.bump();
            }
        }
        self.expect_kind(TokenKind::RParen);
        params
    }

    fn skip_variable_modifiers_and_annotations(&mut self) {
        loop {
            if self.at_kind(TokenKind::At) {
                self.bump();
                if self.at_kind(TokenKind::Ident) {
                    self.parse_qualified_name();
                }
                if self.at_kind(TokenKind::LParen) {
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
                }
                continue;
            }

            if self.at_keyword("final") {
                self.bump();
                continue;
            }

            break;
        }
    }

    fn parse_block(&mut self) -> Block {
        let lbrace = self.expect_kind(TokenKind::LBrace);
        let id = self.ids.alloc();
        let mut stmts = Vec::new();
        while !self.is_eof() && !self.at_kind(TokenKind::RBrace) {
            let before = self.pos;
            match self.parse_stmt() {
                Some(stmt) => stmts.push(stmt),
                None => {
                    if self.pos == before {
                        self.bump();
                    }
                }
            }
        }
        let rbrace = self.expect_kind(TokenKind::RBrace);
        Block {
            id,
            stmts,
            range: Span::new(lbrace.range.start, rbrace.range.end.max(lbrace.range.end)),
        }
    }

    fn parse_stmt(&mut self) -> Option<Stmt> {
        let start = self.peek()?.range.start;

        if self.at_kind(TokenKind::Semi) {
            let semi = self.bump()?;
            return Some(self.stmt(StmtKind::Empty, semi.range));
        }

        if self.at_kind(TokenKind::LBrace) {
            let block = self.parse_block();
            let range = block.range;
            return Some(self.stmt(StmtKind::Block(block), range));
        }

        if self.at_keyword("return") {
            self.bump();
            let expr = if self.at_kind(TokenKind::Semi) {
                None
            } else {
                self.parse_expr()
            };
            let semi = self.expect_kind(TokenKind::Semi);
            return Some(self.stmt(StmtKind::Return(expr), Span::new(start, semi.range.end)));
        }

        if self.at_keyword("if") {
            self.bump();
            self.expect_kind(TokenKind::LParen);
            let cond = match self.parse_expr() {
                Some(cond) => cond,
                None => self.missing(start),
            };
            self.expect_kind(TokenKind::RParen);
            let then_branch = match self.parse_stmt() {
                Some(stmt) => stmt,
                None => {
                    let offset = self.current_offset();
                    self.stmt(StmtKind::Empty, Span::new(offset, offset))
                }
            };
            let else_branch = if self.at_keyword("else") {
                self.bump();
                self.parse_stmt().map(Box::new)
            } else {
                None
            };
            let end = else_branch
                .as_ref()
                .map(|stmt| stmt.range.end)
                .unwrap_or(then_branch.range.end);
            return Some(self.stmt(
                StmtKind::If {
                    cond,
                    then_branch: Box::new(then_branch),
                    else_branch,
                },
                Span::new(start, end),
            ));
        }

        if (self.at_keyword("this") || self.at_keyword("super"))
            && self.peek_n(1).is_some_and(|t| t.kind == TokenKind::LParen)
        {
            let kw = self.bump()?;
            let kind = if kw.text == "this" {
                CtorCallKind::This
            } else {
                CtorCallKind::Super
            };
            let (args, _) = self.parse_arg_list();
            let semi = self.expect_kind(TokenKind::Semi);
            return Some(self.stmt(
                StmtKind::ConstructorCall { kind, args },
                Span::new(start, semi.range.end),
            ));
        }

        if let Some(local) = self.try_parse_local_var_stmt() {
            return Some(local);
        }

        let expr = self.parse_expr()?;
        let semi = self.expect_kind(TokenKind::Semi);
        let end = semi.range.end.max(expr.range.end);
        Some(self.stmt(StmtKind::Expr(expr), Span::new(start, end)))
    }

    fn try_parse_local_var_stmt(&mut self) -> Option<Stmt> {
        let start_pos = self.pos;
        let start = self.peek()?.range.start;

        self.skip_variable_modifiers_and_annotations();
        let Some(ty) = self.parse_type_ref() else {
            self.pos = start_pos;
            return None;
        };

        if !self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Ident && !is_reserved(&t.text))
        {
            self.pos = start_pos;
            return None;
        }
        let name = self.expect_ident();

        if !self.at_kind(TokenKind::Eq) && !self.at_kind(TokenKind::Semi) {
            self.pos = start_pos;
            return None;
        }

        let mut init = None;
        if self.at_kind(TokenKind::Eq) {
            self.bump();
            init = self.parse_expr();
        }
        let semi = self.expect_kind(TokenKind::Semi);
        let end = semi.range.end.max(name.range.end);
        Some(self.stmt(
            StmtKind::Local {
                ty,
                name: name.text,
                init,
            },
            Span::new(start, end),
        ))
    }

    fn parse_expr(&mut self) -> Option<Expr> {
        let lhs = self.parse_binary_expr(0)?;
        if !self.at_kind(TokenKind::Eq) {
            return Some(lhs);
        }
        self.bump();
        let value = match self.parse_expr() {
            Some(value) => value,
            None => self.missing(lhs.range.end),
        };
        let range = lhs.range.cover(value.range);
        Some(self.expr(
            ExprKind::Assign {
                target: Box::new(lhs),
                value: Box::new(value),
            },
            range,
        ))
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> Option<Expr> {
        let mut lhs = self.parse_unary_expr()?;
        loop {
            let op = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::EqEq) => BinaryOp::Eq,
                Some(TokenKind::BangEq) => BinaryOp::Ne,
                _ => break,
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = match self.parse_binary_expr(prec + 1) {
                Some(rhs) => rhs,
                None => self.missing(lhs.range.end),
            };
            let range = lhs.range.cover(rhs.range);
            lhs = self.expr(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                range,
            );
        }
        Some(lhs)
    }

    fn parse_unary_expr(&mut self) -> Option<Expr> {
        if self.at_kind(TokenKind::LParen) && self.looks_like_cast() {
            let lparen = self.bump()?;
            let ty = self.parse_type_ref()?;
            self.expect_kind(TokenKind::RParen);
            let operand = match self.parse_unary_expr() {
                Some(operand) => operand,
                None => {
                    let offset = self.current_offset();
                    self.missing(offset)
                }
            };
            let range = Span::new(lparen.range.start, operand.range.end);
            return Some(self.expr(
                ExprKind::Cast {
                    ty,
                    expr: Box::new(operand),
                },
                range,
            ));
        }

        if self.at_kind(TokenKind::Minus)
            && self
                .peek_n(1)
                .is_some_and(|t| t.kind == TokenKind::IntLiteral)
        {
            let minus = self.bump()?;
            let lit = self.bump()?;
            let range = minus.range.cover(lit.range);
            return Some(self.expr(
                ExprKind::Literal(Literal::Int(format!("-{}", lit.text))),
                range,
            ));
        }

        self.parse_postfix_expr()
    }

    /// `(Type) operand` where `Type` is primitive, generic, an array or starts
    /// with an upper-case letter.
    fn looks_like_cast(&mut self) -> bool {
        let saved = self.pos;
        self.bump();
        let is_cast = match self.parse_type_ref() {
            Some(ty) => {
                let type_like = ty.dims > 0
                    || !ty.args.is_empty()
                    || is_primitive(&ty.name)
                    || ty.simple_name().starts_with(|c: char| c.is_uppercase());
                type_like
                    && self.at_kind(TokenKind::RParen)
                    && self.peek_n(1).is_some_and(|t| {
                        matches!(
                            t.kind,
                            TokenKind::Ident
                                | TokenKind::IntLiteral
                                | TokenKind::StringLiteral
                                | TokenKind::LParen
                        )
                    })
            }
            None => false,
        };
        self.pos = saved;
        is_cast
    }

    fn parse_postfix_expr(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary_expr()?;

        let unqualified_call = match &expr.kind {
            ExprKind::Name(name) if self.at_kind(TokenKind::LParen) => Some(name.clone()),
            _ => None,
        };
        if let Some(name) = unqualified_call {
            let (args, end) = self.parse_arg_list();
            expr = Expr {
                id: expr.id,
                kind: ExprKind::Call {
                    receiver: None,
                    name,
                    args,
                },
                range: Span::new(expr.range.start, end),
            };
        }

        while self.at_kind(TokenKind::Dot)
            && self.peek_n(1).is_some_and(|t| t.kind == TokenKind::Ident)
        {
            self.bump();
            let name = self.bump()?;

            if name.text == "this" {
                let qualifier = match &expr.kind {
                    ExprKind::Name(qualifier) => Some(qualifier.clone()),
                    _ => None,
                };
                let range = expr.range.cover(name.range);
                expr = self.expr(ExprKind::This { qualifier }, range);
                continue;
            }

            if self.at_kind(TokenKind::LParen) {
                let (args, end) = self.parse_arg_list();
                let range = Span::new(expr.range.start, end);
                expr = self.expr(
                    ExprKind::Call {
                        receiver: Some(Box::new(expr)),
                        name: name.text,
                        args,
                    },
                    range,
                );
                continue;
            }

            let range = expr.range.cover(name.range);
            expr = self.expr(
                ExprKind::FieldAccess {
                    receiver: Box::new(expr),
                    name: name.text,
                },
                range,
            );
        }
        Some(expr)
    }

    fn parse_primary_expr(&mut self) -> Option<Expr> {
        // Never swallow a delimiter that a caller uses to recover.
        if matches!(
            self.peek().map(|t| t.kind),
            Some(
                TokenKind::Semi
                    | TokenKind::Comma
                    | TokenKind::RParen
                    | TokenKind::LBrace
                    | TokenKind::RBrace
            )
        ) {
            return None;
        }
        let tok = self.bump()?;
        let kind = match tok.kind {
            TokenKind::Ident => match tok.text.as_str() {
                "this" => ExprKind::This { qualifier: None },
                "super" => ExprKind::Super,
                "true" => ExprKind::Literal(Literal::Bool(true)),
                "false" => ExprKind::Literal(Literal::Bool(false)),
                "null" => ExprKind::Literal(Literal::Null),
                "new" => {
                    let Some(ty) = self.parse_type_ref() else {
                        return Some(self.expr(ExprKind::Missing, tok.range));
                    };
                    let (args, end) = if self.at_kind(TokenKind::LParen) {
                        self.parse_arg_list()
                    } else {
                        (Vec::new(), ty.range.end)
                    };
                    // Anonymous class bodies are not modelled.
                    if self.at_kind(TokenKind::LBrace) {
                        self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
                    }
                    let range = Span::new(tok.range.start, end);
                    return Some(self.expr(ExprKind::New { ty, args }, range));
                }
                _ => ExprKind::Name(tok.text.clone()),
            },
            TokenKind::IntLiteral => ExprKind::Literal(Literal::Int(tok.text.clone())),
            TokenKind::StringLiteral => ExprKind::Literal(Literal::Str(tok.text.clone())),
            TokenKind::LParen => {
                let inner = self.parse_expr();
                self.expect_kind(TokenKind::RParen);
                return match inner {
                    Some(inner) => Some(inner),
                    None => Some(self.expr(ExprKind::Missing, tok.range)),
                };
            }
            _ => ExprKind::Missing,
        };
        Some(self.expr(kind, tok.range))
    }

    fn parse_arg_list(&mut self) -> (Vec<Expr>, usize) {
        let lparen = self.expect_kind(TokenKind::LParen);
        let mut args = Vec::new();
        while !self.is_eof() && !self.at_kind(TokenKind::RParen) {
            let before = self.pos;
            if let Some(expr) = self.parse_expr() {
                args.push(expr);
            }
            if self.at_kind(TokenKind::Comma) {
                self.bump();
            } else if self.at_kind(TokenKind::RParen) {
                continue;
            } else if self.at_kind(TokenKind::Semi) || self.at_kind(TokenKind::RBrace) {
                // Unbalanced argument list; stop at the statement boundary.
                break;
            } else if self.pos == before {
                self.bump();
            }
        }
        let rparen = self.expect_kind(TokenKind::RParen);
        let end = if rparen.text.is_empty() {
            lparen.range.end
        } else {
            rparen.range.end
        };
        (args, end)
    }

    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) {
        if !self.at_kind(open) {
            return;
        }
        self.bump();
        let mut depth = 1usize;
        while !self.is_eof() && depth > 0 {
            match self.peek().map(|t| t.kind) {
                Some(k) if k == open => depth += 1,
                Some(k) if k == close => depth -= 1,
                _ => {}
            }
            self.bump();
        }
    }
}
