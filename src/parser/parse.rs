//! Handwritten recursive-descent parser for the JavaScript subset.
//!
//! The parser consumes the flat `&[Spanned<Token>]` produced by the lexer and
//! builds a `SyntaxTree` arena. It reports errors with source spans for
//! diagnostics.
//!
//! Grammar (informal):
//! ```text
//! program  := stmt*
//! stmt     := block | if | while | do | for | for-in | switch | try
//!           | function-decl | var | return | throw | break | continue
//!           | expr ";"
//! block    := "{" stmt* "}"
//! if       := "if" "(" expr ")" stmt ("else" stmt)?
//! while    := "while" "(" expr ")" stmt
//! do       := "do" stmt "while" "(" expr ")" ";"
//! for      := "for" "(" (var | expr)? ";" expr? ";" expr? ")" stmt
//!           | "for" "(" ("var")? IDENT "in" expr ")" stmt
//! switch   := "switch" "(" expr ")" "{" case* "}"
//! case     := ("case" expr | "default") ":" stmt*
//! try      := "try" block ("catch" "(" IDENT ")" block)* ("finally" block)?
//! function := "function" IDENT? "(" params ")" block
//! var      := ("var" | "let" | "const") decl ("," decl)* ";"
//! expr     := assign ("," assign)*
//! assign   := "yield" assign | cond (assign-op assign)?
//! cond     := or ("?" assign ":" assign)?
//! or       := and ("||" and)*
//! and      := eq ("&&" eq)*
//! eq       := rel (("==" | "!=" | "===" | "!==") rel)*
//! rel      := add (("<" | ">" | "<=" | ">=") add)*
//! add      := mul (("+" | "-") mul)*
//! mul      := unary (("*" | "/" | "%") unary)*
//! unary    := ("-" | "+" | "!" | "~" | "typeof" | "++" | "--") unary | postfix
//! postfix  := callmem ("++" | "--")?
//! callmem  := primary ("." IDENT | "[" expr "]" | "(" args ")")*
//! primary  := IDENT | NUMBER | STRING | "true" | "false" | "null" | "this"
//!           | "(" expr ")" | array | object | function | new
//! ```
//!
//! Deliberate subset restrictions: semicolons are required (no automatic
//! semicolon insertion); regular-expression literals, labeled statements,
//! bitwise and shift operators, `in`/`instanceof` as general operators, and
//! `with` are not supported. `let`/`const` parse like `var`.

use crate::error::ParseError;
use crate::parser::ast::{AssignOp, BinaryOp, NodeId, NodeKind, SyntaxTree, UnaryOp, VarInit};
use crate::parser::lexer::{Span, Spanned, Token, BytePos};

pub struct Parser<'t> {
    tokens: &'t [Spanned<Token>],
    pos: usize,
    tree: SyntaxTree,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Spanned<Token>]) -> Self {
        Self {
            tokens,
            pos: 0,
            tree: SyntaxTree::new(),
        }
    }

    pub fn parse_program(mut self) -> Result<SyntaxTree, ParseError> {
        let mut root = Vec::new();
        while !matches!(self.peek(), Token::Eof) {
            // Stray semicolons are harmless; skip them without a node.
            if self.eat(&Token::Semi) {
                continue;
            }
            root.push(self.parse_stmt()?);
        }
        self.tree.root = root;
        Ok(self.tree)
    }

    // -----------------------------------------------------------------------
    // Token stream helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].node
    }

    fn peek2(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].node
    }

    fn peek_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn peek_line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> Span {
        let span = self.tokens[self.pos].span;
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        span
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == tok {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Token, expected: &str) -> Result<Span, ParseError> {
        if self.peek() == tok {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(String, Span), ParseError> {
        match self.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                let span = self.advance();
                Ok((name, span))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_owned(),
            found: token_name(self.peek()),
            span: self.peek_span(),
        }
    }

    fn alloc(&mut self, kind: NodeKind, span: Span, line: u32) -> NodeId {
        self.tree.alloc(kind, span, line)
    }

    fn end_of(&self, id: NodeId) -> u32 {
        self.tree.span(id).end.0
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn parse_stmt(&mut self) -> Result<NodeId, ParseError> {
        match self.peek() {
            Token::LBrace => self.parse_block(),
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::Do => self.parse_do(),
            Token::For => self.parse_for(),
            Token::Switch => self.parse_switch(),
            Token::Try => self.parse_try(),
            Token::Function => self.parse_function(true),
            Token::Var | Token::Let | Token::Const => self.parse_var(),
            Token::Return => self.parse_return(),
            Token::Throw => self.parse_throw(),
            Token::Break => {
                let line = self.peek_line();
                let span = self.advance();
                self.expect(&Token::Semi, "';' after 'break'")?;
                Ok(self.alloc(NodeKind::Break, span, line))
            }
            Token::Continue => {
                let line = self.peek_line();
                let span = self.advance();
                self.expect(&Token::Semi, "';' after 'continue'")?;
                Ok(self.alloc(NodeKind::Continue, span, line))
            }
            _ => {
                let line = self.peek_line();
                let expr = self.parse_expr()?;
                self.expect(&Token::Semi, "';' after expression statement")?;
                let span = self.tree.span(expr);
                Ok(self.alloc(NodeKind::ExprStmt { expr }, span, line))
            }
        }
    }

    fn parse_block(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let open = self.expect(&Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !matches!(self.peek(), Token::RBrace | Token::Eof) {
            if self.eat(&Token::Semi) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
        }
        let close = self.expect(&Token::RBrace, "'}' to close block")?;
        let span = open.merge(close);
        Ok(self.alloc(NodeKind::Block { stmts, braced: true }, span, line))
    }

    fn parse_if(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let kw = self.advance();
        self.expect(&Token::LParen, "'(' after 'if'")?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen, "')' after if condition")?;
        let then_branch = self.parse_stmt()?;
        let else_branch = if self.eat(&Token::Else) {
            Some(self.parse_stmt()?)
        } else {
            None
        };
        let end = self.end_of(else_branch.unwrap_or(then_branch));
        Ok(self.alloc(
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            },
            Span::new(kw.start.0, end),
            line,
        ))
    }

    fn parse_while(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let kw = self.advance();
        self.expect(&Token::LParen, "'(' after 'while'")?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen, "')' after while condition")?;
        let body = self.parse_stmt()?;
        let end = self.end_of(body);
        Ok(self.alloc(
            NodeKind::While { cond, body },
            Span::new(kw.start.0, end),
            line,
        ))
    }

    fn parse_do(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let kw = self.advance();
        let body = self.parse_stmt()?;
        self.expect(&Token::While, "'while' after do body")?;
        self.expect(&Token::LParen, "'(' after 'while'")?;
        let cond = self.parse_expr()?;
        let close = self.expect(&Token::RParen, "')' after do-while condition")?;
        self.expect(&Token::Semi, "';' after do-while")?;
        Ok(self.alloc(
            NodeKind::DoWhile { body, cond },
            kw.merge(close),
            line,
        ))
    }

    fn parse_for(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let kw = self.advance();
        self.expect(&Token::LParen, "'(' after 'for'")?;

        // for-in with a declared target: for (var x in obj)
        if matches!(self.peek(), Token::Var | Token::Let | Token::Const) {
            let var_line = self.peek_line();
            let var_kw = self.advance();
            let (name, name_span) = self.expect_ident("a variable name")?;
            if self.eat(&Token::In) {
                let target = self.alloc(
                    NodeKind::VarDecl {
                        decls: vec![VarInit {
                            name,
                            span: name_span,
                            init: None,
                        }],
                    },
                    var_kw.merge(name_span),
                    var_line,
                );
                return self.finish_for_in(kw, line, target);
            }
            // Ordinary for: finish the declaration list, then the clauses.
            let init = self.finish_var_decls(var_kw, var_line, name, name_span)?;
            return self.finish_for(kw, line, Some(init));
        }

        // for-in with a plain target: for (x in obj)
        if matches!(self.peek(), Token::Ident(_)) && matches!(self.peek2(), Token::In) {
            let (name, name_span) = self.expect_ident("a variable name")?;
            let target = self.alloc(NodeKind::Ident(name), name_span, line);
            self.advance(); // the 'in'
            return self.finish_for_in(kw, line, target);
        }

        let init = if matches!(self.peek(), Token::Semi) {
            None
        } else {
            let line = self.peek_line();
            let expr = self.parse_expr()?;
            let span = self.tree.span(expr);
            Some(self.alloc(NodeKind::ExprStmt { expr }, span, line))
        };
        self.finish_for(kw, line, init)
    }

    fn finish_for(
        &mut self,
        kw: Span,
        line: u32,
        init: Option<NodeId>,
    ) -> Result<NodeId, ParseError> {
        self.expect(&Token::Semi, "';' after for initializer")?;
        let cond = if matches!(self.peek(), Token::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&Token::Semi, "';' after for condition")?;
        let update = if matches!(self.peek(), Token::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&Token::RParen, "')' to close for clauses")?;
        let body = self.parse_stmt()?;
        let end = self.end_of(body);
        Ok(self.alloc(
            NodeKind::For {
                init,
                cond,
                update,
                body,
            },
            Span::new(kw.start.0, end),
            line,
        ))
    }

    fn finish_for_in(
        &mut self,
        kw: Span,
        line: u32,
        target: NodeId,
    ) -> Result<NodeId, ParseError> {
        let object = self.parse_expr()?;
        self.expect(&Token::RParen, "')' after for-in object")?;
        let body = self.parse_stmt()?;
        let end = self.end_of(body);
        Ok(self.alloc(
            NodeKind::ForIn {
                target,
                object,
                body,
            },
            Span::new(kw.start.0, end),
            line,
        ))
    }

    fn parse_switch(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let kw = self.advance();
        self.expect(&Token::LParen, "'(' after 'switch'")?;
        let disc = self.parse_expr()?;
        self.expect(&Token::RParen, "')' after switch discriminant")?;
        self.expect(&Token::LBrace, "'{' to open switch body")?;
        let mut cases = Vec::new();
        while !matches!(self.peek(), Token::RBrace | Token::Eof) {
            cases.push(self.parse_case()?);
        }
        let close = self.expect(&Token::RBrace, "'}' to close switch")?;
        Ok(self.alloc(
            NodeKind::Switch { disc, cases },
            kw.merge(close),
            line,
        ))
    }

    fn parse_case(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let (kw, test) = match self.peek() {
            Token::Case => {
                let kw = self.advance();
                let test = self.parse_expr()?;
                (kw, Some(test))
            }
            Token::Default => (self.advance(), None),
            _ => return Err(self.unexpected("'case' or 'default'")),
        };
        let colon = self.expect(&Token::Colon, "':' after case label")?;
        let body_line = self.peek_line();
        let mut stmts = Vec::new();
        while !matches!(
            self.peek(),
            Token::Case | Token::Default | Token::RBrace | Token::Eof
        ) {
            if self.eat(&Token::Semi) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
        }
        // Case bodies have no braces; the block spans the statements only.
        let body_span = match (stmts.first(), stmts.last()) {
            (Some(&first), Some(&last)) => {
                Span::new(self.tree.span(first).start.0, self.end_of(last))
            }
            _ => Span::at(colon.end.0),
        };
        let body = self.alloc(
            NodeKind::Block {
                stmts,
                braced: false,
            },
            body_span,
            body_line,
        );
        let span = Span::new(kw.start.0, body_span.end.0);
        Ok(self.alloc(NodeKind::Case { test, body }, span, line))
    }

    fn parse_try(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let kw = self.advance();
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while matches!(self.peek(), Token::Catch) {
            let catch_line = self.peek_line();
            let catch_kw = self.advance();
            self.expect(&Token::LParen, "'(' after 'catch'")?;
            let (param, _) = self.expect_ident("a catch parameter name")?;
            self.expect(&Token::RParen, "')' after catch parameter")?;
            let catch_body = self.parse_block()?;
            let span = Span::new(catch_kw.start.0, self.end_of(catch_body));
            catches.push(self.alloc(
                NodeKind::Catch {
                    param,
                    body: catch_body,
                },
                span,
                catch_line,
            ));
        }
        let finally = if self.eat(&Token::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if catches.is_empty() && finally.is_none() {
            return Err(self.unexpected("'catch' or 'finally' after try block"));
        }
        let end = finally
            .or_else(|| catches.last().copied())
            .map(|n| self.end_of(n))
            .unwrap_or(self.end_of(body));
        Ok(self.alloc(
            NodeKind::Try {
                body,
                catches,
                finally,
            },
            Span::new(kw.start.0, end),
            line,
        ))
    }

    /// Parses a function declaration (`require_name`) or expression.
    fn parse_function(&mut self, require_name: bool) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let kw = self.advance();
        let name = match self.peek() {
            Token::Ident(n) => {
                let n = n.clone();
                self.advance();
                Some(n)
            }
            _ if require_name => return Err(self.unexpected("a function name")),
            _ => None,
        };
        self.expect(&Token::LParen, "'(' to open parameter list")?;
        let mut params = Vec::new();
        if !matches!(self.peek(), Token::RParen) {
            loop {
                let (param, _) = self.expect_ident("a parameter name")?;
                params.push(param);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "')' to close parameter list")?;
        let body = self.parse_block()?;
        let end = self.end_of(body);
        Ok(self.alloc(
            NodeKind::Function { name, params, body },
            Span::new(kw.start.0, end),
            line,
        ))
    }

    fn parse_var(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let kw = self.advance();
        let (name, name_span) = self.expect_ident("a variable name")?;
        let id = self.finish_var_decls(kw, line, name, name_span)?;
        self.expect(&Token::Semi, "';' after var declaration")?;
        Ok(id)
    }

    /// Parses the rest of a declaration list whose first name is already
    /// consumed. Does not consume the trailing `;` (the for-statement parser
    /// shares this path).
    fn finish_var_decls(
        &mut self,
        kw: Span,
        line: u32,
        first_name: String,
        first_span: Span,
    ) -> Result<NodeId, ParseError> {
        let mut decls = Vec::new();
        let mut end;
        let mut name = first_name;
        let mut name_span = first_span;
        loop {
            let init = if self.eat(&Token::Assign) {
                let value = self.parse_assign()?;
                end = self.end_of(value);
                Some(value)
            } else {
                end = name_span.end.0;
                None
            };
            decls.push(VarInit {
                name,
                span: name_span,
                init,
            });
            if !self.eat(&Token::Comma) {
                break;
            }
            let (next_name, next_span) = self.expect_ident("a variable name")?;
            name = next_name;
            name_span = next_span;
        }
        Ok(self.alloc(
            NodeKind::VarDecl { decls },
            Span::new(kw.start.0, end),
            line,
        ))
    }

    fn parse_return(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let kw = self.advance();
        let value = if matches!(self.peek(), Token::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&Token::Semi, "';' after return")?;
        let end = value.map(|v| self.end_of(v)).unwrap_or(kw.end.0);
        Ok(self.alloc(
            NodeKind::Return { value },
            Span::new(kw.start.0, end),
            line,
        ))
    }

    fn parse_throw(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let kw = self.advance();
        let value = self.parse_expr()?;
        self.expect(&Token::Semi, "';' after throw")?;
        let end = self.end_of(value);
        Ok(self.alloc(
            NodeKind::Throw { value },
            Span::new(kw.start.0, end),
            line,
        ))
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let first = self.parse_assign()?;
        if !matches!(self.peek(), Token::Comma) {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat(&Token::Comma) {
            exprs.push(self.parse_assign()?);
        }
        let span = Span::new(
            self.tree.span(first).start.0,
            self.end_of(*exprs.last().unwrap()),
        );
        Ok(self.alloc(NodeKind::Comma { exprs }, span, line))
    }

    fn parse_assign(&mut self) -> Result<NodeId, ParseError> {
        if matches!(self.peek(), Token::Yield) {
            let line = self.peek_line();
            let kw = self.advance();
            let value = self.parse_assign()?;
            let end = self.end_of(value);
            return Ok(self.alloc(
                NodeKind::Yield { value },
                Span::new(kw.start.0, end),
                line,
            ));
        }
        let line = self.peek_line();
        let target = self.parse_cond()?;
        let op = match self.peek() {
            Token::Assign => AssignOp::Assign,
            Token::PlusAssign => AssignOp::Add,
            Token::MinusAssign => AssignOp::Sub,
            Token::StarAssign => AssignOp::Mul,
            Token::SlashAssign => AssignOp::Div,
            Token::PercentAssign => AssignOp::Rem,
            _ => return Ok(target),
        };
        self.advance();
        let value = self.parse_assign()?;
        let span = Span::new(self.tree.span(target).start.0, self.end_of(value));
        Ok(self.alloc(NodeKind::Assign { op, target, value }, span, line))
    }

    fn parse_cond(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let cond = self.parse_or()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then_val = self.parse_assign()?;
        self.expect(&Token::Colon, "':' in conditional expression")?;
        let else_val = self.parse_assign()?;
        let span = Span::new(self.tree.span(cond).start.0, self.end_of(else_val));
        Ok(self.alloc(
            NodeKind::Cond {
                cond,
                then_val,
                else_val,
            },
            span,
            line,
        ))
    }

    fn parse_or(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Token::OrOr) {
            let line = self.tree.node(lhs).line;
            self.advance();
            let rhs = self.parse_and()?;
            lhs = self.binary(BinaryOp::Or, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_equality()?;
        while matches!(self.peek(), Token::AndAnd) {
            let line = self.tree.node(lhs).line;
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = self.binary(BinaryOp::And, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                Token::EqEqEq => BinaryOp::StrictEq,
                Token::NotEqEq => BinaryOp::StrictNotEq,
                _ => return Ok(lhs),
            };
            let line = self.tree.node(lhs).line;
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = self.binary(op, lhs, rhs, line);
        }
    }

    fn parse_relational(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinaryOp::Lt,
                Token::Gt => BinaryOp::Gt,
                Token::LtEq => BinaryOp::LtEq,
                Token::GtEq => BinaryOp::GtEq,
                _ => return Ok(lhs),
            };
            let line = self.tree.node(lhs).line;
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = self.binary(op, lhs, rhs, line);
        }
    }

    fn parse_additive(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            let line = self.tree.node(lhs).line;
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = self.binary(op, lhs, rhs, line);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            let line = self.tree.node(lhs).line;
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = self.binary(op, lhs, rhs, line);
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId, line: u32) -> NodeId {
        let span = Span::new(self.tree.span(lhs).start.0, self.end_of(rhs));
        self.alloc(NodeKind::Binary { op, lhs, rhs }, span, line)
    }

    fn parse_unary(&mut self) -> Result<NodeId, ParseError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Pos,
            Token::Not => UnaryOp::Not,
            Token::Tilde => UnaryOp::BitNot,
            Token::TypeOf => UnaryOp::TypeOf,
            Token::PlusPlus => UnaryOp::PreInc,
            Token::MinusMinus => UnaryOp::PreDec,
            _ => return self.parse_postfix(),
        };
        let line = self.peek_line();
        let kw = self.advance();
        let operand = self.parse_unary()?;
        let end = self.end_of(operand);
        Ok(self.alloc(
            NodeKind::Unary { op, operand },
            Span::new(kw.start.0, end),
            line,
        ))
    }

    fn parse_postfix(&mut self) -> Result<NodeId, ParseError> {
        let expr = self.parse_call_member()?;
        let op = match self.peek() {
            Token::PlusPlus => UnaryOp::PostInc,
            Token::MinusMinus => UnaryOp::PostDec,
            _ => return Ok(expr),
        };
        let line = self.tree.node(expr).line;
        let tok = self.advance();
        let span = Span::new(self.tree.span(expr).start.0, tok.end.0);
        Ok(self.alloc(NodeKind::Unary { op, operand: expr }, span, line))
    }

    fn parse_call_member(&mut self) -> Result<NodeId, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let line = self.tree.node(expr).line;
                    let (property, prop_span) = self.expect_ident("a property name")?;
                    let span = Span::new(self.tree.span(expr).start.0, prop_span.end.0);
                    expr = self.alloc(
                        NodeKind::Member {
                            object: expr,
                            property,
                        },
                        span,
                        line,
                    );
                }
                Token::LBracket => {
                    self.advance();
                    let line = self.tree.node(expr).line;
                    let index = self.parse_expr()?;
                    let close = self.expect(&Token::RBracket, "']' to close index")?;
                    let span = Span::new(self.tree.span(expr).start.0, close.end.0);
                    expr = self.alloc(
                        NodeKind::Index {
                            object: expr,
                            index,
                        },
                        span,
                        line,
                    );
                }
                Token::LParen => {
                    self.advance();
                    let line = self.tree.node(expr).line;
                    let (args, args_end) = self.parse_args()?;
                    self.expect(&Token::RParen, "')' to close arguments")?;
                    // The call's span ends past the last argument; the
                    // closing parenthesis stays outside every node so the
                    // bind rewrite can repurpose it.
                    let span = Span::new(self.tree.span(expr).start.0, args_end.0);
                    expr = self.alloc(NodeKind::Call { callee: expr, args }, span, line);
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Parses a comma-separated argument list up to (not including) the
    /// closing parenthesis. Returns the arguments and the byte offset just
    /// past the last one (or the closing parenthesis position when empty).
    fn parse_args(&mut self) -> Result<(Vec<NodeId>, BytePos), ParseError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Token::RParen) {
            return Ok((args, self.peek_span().start));
        }
        loop {
            args.push(self.parse_assign()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let end = self.tree.span(*args.last().unwrap()).end;
        Ok((args, end))
    }

    fn parse_primary(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        match self.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                let span = self.advance();
                Ok(self.alloc(NodeKind::Ident(name), span, line))
            }
            Token::Number => {
                let span = self.advance();
                Ok(self.alloc(NodeKind::Number, span, line))
            }
            Token::Str => {
                let span = self.advance();
                Ok(self.alloc(NodeKind::Str, span, line))
            }
            Token::True => {
                let span = self.advance();
                Ok(self.alloc(NodeKind::Bool(true), span, line))
            }
            Token::False => {
                let span = self.advance();
                Ok(self.alloc(NodeKind::Bool(false), span, line))
            }
            Token::Null => {
                let span = self.advance();
                Ok(self.alloc(NodeKind::Null, span, line))
            }
            Token::This => {
                let span = self.advance();
                Ok(self.alloc(NodeKind::This, span, line))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen, "')' to close parenthesized expression")?;
                Ok(expr)
            }
            Token::LBracket => self.parse_array(),
            Token::LBrace => self.parse_object(),
            Token::Function => self.parse_function(false),
            Token::New => self.parse_new(),
            Token::Eof => Err(ParseError::UnexpectedEof {
                context: "an expression".to_owned(),
            }),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_array(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let open = self.advance();
        let mut elems = Vec::new();
        if !matches!(self.peek(), Token::RBracket) {
            loop {
                elems.push(self.parse_assign()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        let close = self.expect(&Token::RBracket, "']' to close array literal")?;
        Ok(self.alloc(NodeKind::Array { elems }, open.merge(close), line))
    }

    fn parse_object(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let open = self.advance();
        let mut values = Vec::new();
        if !matches!(self.peek(), Token::RBrace) {
            loop {
                match self.peek() {
                    Token::Ident(_) | Token::Str | Token::Number => {
                        self.advance();
                    }
                    _ => return Err(self.unexpected("a property key")),
                }
                self.expect(&Token::Colon, "':' after property key")?;
                values.push(self.parse_assign()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        let close = self.expect(&Token::RBrace, "'}' to close object literal")?;
        Ok(self.alloc(NodeKind::Object { values }, open.merge(close), line))
    }

    fn parse_new(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek_line();
        let kw = self.advance();
        let mut callee = self.parse_primary()?;
        // Member accesses bind to the constructor name; the first argument
        // list belongs to `new` itself.
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let (property, prop_span) = self.expect_ident("a property name")?;
                    let span = Span::new(self.tree.span(callee).start.0, prop_span.end.0);
                    callee = self.alloc(
                        NodeKind::Member {
                            object: callee,
                            property,
                        },
                        span,
                        line,
                    );
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    let close = self.expect(&Token::RBracket, "']' to close index")?;
                    let span = Span::new(self.tree.span(callee).start.0, close.end.0);
                    callee = self.alloc(
                        NodeKind::Index {
                            object: callee,
                            index,
                        },
                        span,
                        line,
                    );
                }
                _ => break,
            }
        }
        let (args, end) = if matches!(self.peek(), Token::LParen) {
            self.advance();
            let (args, _) = self.parse_args()?;
            let close = self.expect(&Token::RParen, "')' to close arguments")?;
            (args, close.end.0)
        } else {
            (Vec::new(), self.end_of(callee))
        };
        Ok(self.alloc(
            NodeKind::New { callee, args },
            Span::new(kw.start.0, end),
            line,
        ))
    }
}

/// Human-readable token name for error messages.
fn token_name(tok: &Token) -> String {
    match tok {
        Token::Ident(name) => format!("identifier '{}'", name),
        Token::Number => "a number".to_owned(),
        Token::Str => "a string".to_owned(),
        Token::Eof => "end of file".to_owned(),
        Token::Function => "'function'".to_owned(),
        Token::Var => "'var'".to_owned(),
        Token::Let => "'let'".to_owned(),
        Token::Const => "'const'".to_owned(),
        Token::If => "'if'".to_owned(),
        Token::Else => "'else'".to_owned(),
        Token::While => "'while'".to_owned(),
        Token::Do => "'do'".to_owned(),
        Token::For => "'for'".to_owned(),
        Token::In => "'in'".to_owned(),
        Token::Switch => "'switch'".to_owned(),
        Token::Case => "'case'".to_owned(),
        Token::Default => "'default'".to_owned(),
        Token::Try => "'try'".to_owned(),
        Token::Catch => "'catch'".to_owned(),
        Token::Finally => "'finally'".to_owned(),
        Token::Return => "'return'".to_owned(),
        Token::Throw => "'throw'".to_owned(),
        Token::Break => "'break'".to_owned(),
        Token::Continue => "'continue'".to_owned(),
        Token::New => "'new'".to_owned(),
        Token::TypeOf => "'typeof'".to_owned(),
        Token::Yield => "'yield'".to_owned(),
        Token::This => "'this'".to_owned(),
        Token::True => "'true'".to_owned(),
        Token::False => "'false'".to_owned(),
        Token::Null => "'null'".to_owned(),
        Token::LParen => "'('".to_owned(),
        Token::RParen => "')'".to_owned(),
        Token::LBrace => "'{'".to_owned(),
        Token::RBrace => "'}'".to_owned(),
        Token::LBracket => "'['".to_owned(),
        Token::RBracket => "']'".to_owned(),
        Token::Semi => "';'".to_owned(),
        Token::Comma => "','".to_owned(),
        Token::Colon => "':'".to_owned(),
        Token::Question => "'?'".to_owned(),
        Token::Dot => "'.'".to_owned(),
        Token::Tilde => "'~'".to_owned(),
        Token::Lt => "'<'".to_owned(),
        Token::Gt => "'>'".to_owned(),
        Token::LtEq => "'<='".to_owned(),
        Token::GtEq => "'>='".to_owned(),
        Token::EqEq => "'=='".to_owned(),
        Token::NotEq => "'!='".to_owned(),
        Token::EqEqEq => "'==='".to_owned(),
        Token::NotEqEq => "'!=='".to_owned(),
        Token::Assign => "'='".to_owned(),
        Token::PlusAssign => "'+='".to_owned(),
        Token::MinusAssign => "'-='".to_owned(),
        Token::StarAssign => "'*='".to_owned(),
        Token::SlashAssign => "'/='".to_owned(),
        Token::PercentAssign => "'%='".to_owned(),
        Token::Plus => "'+'".to_owned(),
        Token::Minus => "'-'".to_owned(),
        Token::Star => "'*'".to_owned(),
        Token::Slash => "'/'".to_owned(),
        Token::Percent => "'%'".to_owned(),
        Token::PlusPlus => "'++'".to_owned(),
        Token::MinusMinus => "'--'".to_owned(),
        Token::AndAnd => "'&&'".to_owned(),
        Token::OrOr => "'||'".to_owned(),
        Token::Not => "'!'".to_owned(),
    }
}
