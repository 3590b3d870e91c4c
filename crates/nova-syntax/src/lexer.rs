use crate::ast::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) text: String,
    pub(crate) range: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    IntLiteral,
    StringLiteral,
    At,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Star,
    Eq,
    EqEq,
    BangEq,
    Plus,
    Minus,
    Slash,
    Lt,
    Gt,
    Amp,
    Question,
    Unknown,
}

pub(crate) struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Lexer { text, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn bump_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
                self.bump_char();
            }

            let rem = self.remaining();
            if rem.starts_with("//") {
                while let Some(c) = self.bump_char() {
                    if c == '\n' {
                        break;
                    }
                }
                continue;
            }

            if rem.starts_with("/*") {
                self.bump_char();
                self.bump_char();
                while !self.remaining().is_empty() && !self.remaining().starts_with("*/") {
                    self.bump_char();
                }
                if self.remaining().starts_with("*/") {
                    self.bump_char();
                    self.bump_char();
                }
                continue;
            }

            break;
        }
    }

    fn eat_while(&mut self, out: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.bump_char();
        }
    }

    fn lex_string_literal(&mut self) -> String {
        // opening quote already consumed
        let mut out = String::from('"');
        while let Some(c) = self.bump_char() {
            out.push(c);
            match c {
                '"' => break,
                '\\' => {
                    if let Some(escaped) = self.bump_char() {
                        out.push(escaped);
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        let ch = self.bump_char()?;

        let kind = match ch {
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semi,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '*' => TokenKind::Star,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '/' => TokenKind::Slash,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '&' => TokenKind::Amp,
            '?' => TokenKind::Question,
            '@' => TokenKind::At,
            '=' if self.peek_char() == Some('=') => {
                self.bump_char();
                TokenKind::EqEq
            }
            '=' => TokenKind::Eq,
            '!' if self.peek_char() == Some('=') => {
                self.bump_char();
                TokenKind::BangEq
            }
            '"' => {
                let text = self.lex_string_literal();
                return Some(Token {
                    kind: TokenKind::StringLiteral,
                    text,
                    range: Span::new(start, self.pos),
                });
            }
            c if c.is_ascii_digit() => {
                let mut text = String::from(c);
                self.eat_while(&mut text, |c| c.is_ascii_alphanumeric() || c == '_');
                return Some(Token {
                    kind: TokenKind::IntLiteral,
                    text,
                    range: Span::new(start, self.pos),
                });
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let mut text = String::from(c);
                self.eat_while(&mut text, |c| c.is_alphanumeric() || c == '_' || c == '$');
                return Some(Token {
                    kind: TokenKind::Ident,
                    text,
                    range: Span::new(start, self.pos),
                });
            }
            _ => TokenKind::Unknown,
        };

        Some(Token {
            kind,
            text: self.text[start..self.pos].to_string(),
            range: Span::new(start, self.pos),
        })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
