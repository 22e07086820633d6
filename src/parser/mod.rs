//! The Syntax Tree Provider: lexer, node arena, and recursive-descent parser.

pub mod ast;
pub mod lexer;
pub mod parse;

use crate::error::ParseError;

/// Convenience entry point: tokenizes and parses `source` in one step.
pub fn parse_source(source: &str) -> Result<ast::SyntaxTree, ParseError> {
    let tokens = lexer::Lexer::new(source).tokenize()?;
    parse::Parser::new(&tokens).parse_program()
}
