//! Syntax trees for the Java subset handled by Nova's structural refactorings.
//!
//! - [`parse`] turns source text into a [`CompilationUnit`]. Parsing never
//!   fails; malformed input degrades to [`ExprKind::Missing`] nodes.
//! - [`print_compilation_unit`] renders a (possibly edited) tree back to
//!   source with a fixed layout.
//! - [`Workspace`] owns the live trees of a program.
//! - [`make`] and the `rewrite_*`/`for_each_*` walks are the building blocks
//!   for tree edits.

mod ast;
mod lexer;
pub mod make;
mod parser;
mod print;
mod visit;
mod workspace;

pub use ast::*;
pub use parser::parse;
pub use print::{print_compilation_unit, print_expr, print_member, print_type_decl};
pub use visit::{
    expr_ids, for_each_expr, for_each_expr_in_block, for_each_expr_in_member,
    for_each_expr_in_stmt, rewrite_block, rewrite_expr, rewrite_member, rewrite_stmt,
    rewrite_type,
};
pub use workspace::Workspace;

/// Whether `name` is one of Java's primitive type keywords.
pub fn is_primitive_type(name: &str) -> bool {
    parser::is_primitive(name)
}
