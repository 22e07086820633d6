//! The bind rewriter.
//!
//! Walks the tree a second time with a scope stack that encodes what is
//! legal at each nesting depth, turning bind statements into callback
//! continuations and patching early exits (`return`, `throw`, `yield`) so
//! they keep their meaning inside the generated closures. Emits a stream of
//! text replacements and insertions; never mutates the tree.

pub mod bind;

use crate::analyze::Analysis;
use crate::emit::PatchSet;
use crate::error::{Error, InternalError, MisuseError};
use crate::parser::ast::{NodeId, NodeKind, SyntaxTree};
use crate::parser::lexer::{BytePos, Span};

use self::bind::{filter_discards, is_callback_name, recognize};

/// Rewrites the whole tree, returning the patch stream for emission.
pub fn rewrite_tree(
    tree: &SyntaxTree,
    analysis: &Analysis,
    debug: bool,
) -> Result<PatchSet, Error> {
    let mut rewriter = Rewriter {
        tree,
        analysis,
        stack: Vec::new(),
        patches: PatchSet::new(),
        debug,
    };
    // Top-level statements run with no scope at all: no global scope is
    // fabricated, so binding or returning there is caller misuse.
    for &stmt in &tree.root {
        rewriter.stmt(stmt)?;
    }
    Ok(rewriter.patches)
}

/// What a block scope is being opened for; decides the scope overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockContext {
    Plain,
    /// Loop bodies may escape but may not bind (and the ban is inherited
    /// by nested blocks, unlike the switch-case one).
    LoopBody,
    /// Switch-case bodies may escape but may not bind; wrapping the bind in
    /// a braced block inside the case lifts the ban.
    SwitchCase,
    /// Try bodies keep native throw semantics.
    TryBody,
}

/// One frame of the rewrite-scope stack.
#[derive(Debug, Default)]
struct Scope {
    level: u32,
    /// Name of the reachable error-first callback parameter, if any.
    callback: Option<String>,
    /// A bind has committed this scope to a continuation; `return`/`throw`/
    /// `yield` now route through the callback.
    can_yield: bool,
    /// Whether a throw may be rewritten into a callback invocation. Forced
    /// off inside try bodies.
    can_throw: bool,
    /// Whether `break`/`continue` are legal here.
    can_escape: bool,
    /// Set for switch-case bodies; not inherited.
    cannot_bind: bool,
    /// Set anywhere inside a loop body; inherited by nested blocks, reset
    /// per function.
    in_loop: bool,
    /// The innermost function references `this`; generated continuations
    /// must preserve it.
    uses_this: bool,
    /// Closing fragments to append at the block's end, newest first (so
    /// nested continuations close inside-out).
    closes: Vec<String>,
}

impl Scope {
    /// A nested block scope: inherits everything that survives block
    /// nesting; `closes` and the case-body ban start fresh.
    fn derived(prev: Option<&Scope>) -> Scope {
        match prev {
            Some(p) => Scope {
                level: p.level + 1,
                callback: p.callback.clone(),
                can_yield: p.can_yield,
                can_throw: p.can_throw,
                can_escape: p.can_escape,
                cannot_bind: false,
                in_loop: p.in_loop,
                uses_this: p.uses_this,
                closes: Vec::new(),
            },
            None => Scope {
                level: 1,
                ..Scope::default()
            },
        }
    }
}

struct Rewriter<'t> {
    tree: &'t SyntaxTree,
    analysis: &'t Analysis,
    stack: Vec<Scope>,
    patches: PatchSet,
    debug: bool,
}

impl<'t> Rewriter<'t> {
    fn stmt(&mut self, node: NodeId) -> Result<(), Error> {
        if self.debug {
            self.dump_block(node)?;
        }
        let tree = self.tree;
        match &tree.node(node).kind {
            NodeKind::Block { .. } => self.block(node, BlockContext::Plain)?,
            NodeKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.stmt(*then_branch)?;
                if let Some(els) = else_branch {
                    self.stmt(*els)?;
                }
            }
            NodeKind::While { cond, body } => {
                self.mutate_expr(*cond)?;
                self.loop_body(*body)?;
            }
            NodeKind::DoWhile { body, cond } => {
                self.loop_body(*body)?;
                self.mutate_expr(*cond)?;
            }
            NodeKind::For {
                init,
                cond,
                update,
                body,
            } => {
                for clause in [init, cond, update].into_iter().flatten() {
                    self.mutate_clause(*clause)?;
                }
                self.loop_body(*body)?;
            }
            NodeKind::ForIn {
                target,
                object,
                body,
            } => {
                self.mutate_clause(*target)?;
                self.mutate_expr(*object)?;
                self.loop_body(*body)?;
            }
            NodeKind::Switch { cases, .. } => {
                for &case in cases {
                    let body = match tree.kind(case) {
                        NodeKind::Case { body, .. } => *body,
                        other => {
                            return Err(InternalError::UnexpectedStmtNode {
                                kind: other.name(),
                                span: tree.span(case),
                            }
                            .into())
                        }
                    };
                    self.block(body, BlockContext::SwitchCase)?;
                }
            }
            NodeKind::Try {
                body,
                catches,
                finally,
            } => {
                self.block(*body, BlockContext::TryBody)?;
                for &clause in catches {
                    let catch_body = match tree.kind(clause) {
                        NodeKind::Catch { body, .. } => *body,
                        other => {
                            return Err(InternalError::UnexpectedStmtNode {
                                kind: other.name(),
                                span: tree.span(clause),
                            }
                            .into())
                        }
                    };
                    self.block(catch_body, BlockContext::Plain)?;
                }
                if let Some(fin) = finally {
                    self.block(*fin, BlockContext::Plain)?;
                }
            }
            NodeKind::Function { .. } => self.mutate_func(node)?,
            NodeKind::Break => self.escape(node, "break")?,
            NodeKind::Continue => self.escape(node, "continue")?,
            NodeKind::Return { value } => {
                if self.stack.is_empty() {
                    return Err(MisuseError::ReturnInGlobalScope {
                        span: tree.span(node),
                    }
                    .into());
                }
                if let Some(value) = value {
                    self.mutate_expr(*value)?;
                    let cb = match self.stack.last() {
                        Some(scope) if scope.can_yield => scope.callback.clone(),
                        _ => None,
                    };
                    if let Some(cb) = cb {
                        let span = tree.span(node);
                        let value_span = tree.span(*value);
                        self.patches.replace(
                            span.start,
                            value_span.start,
                            format!("return {}(null, ", cb),
                        )?;
                        self.patches.insert(value_span.end, ")")?;
                    }
                }
            }
            NodeKind::ExprStmt { expr } => match recognize(tree, *expr) {
                Ok(None) => self.mutate_expr(*expr)?,
                Ok(Some(form)) => self.bind_stmt(node, form)?,
                Err(err) => return Err(err.into()),
            },
            NodeKind::Throw { value } => {
                if self.stack.is_empty() {
                    // Native throw at file scope; none of our business.
                    return Ok(());
                }
                let cb = match self.stack.last() {
                    Some(scope) if scope.can_throw => scope.callback.clone(),
                    _ => None,
                };
                if let Some(cb) = cb {
                    let span = tree.span(node);
                    let value_span = tree.span(*value);
                    self.patches
                        .replace(span.start, value_span.start, format!("return {}(", cb))?;
                    self.patches.insert(value_span.end, ")")?;
                }
            }
            NodeKind::VarDecl { decls } => {
                for decl in decls {
                    if let Some(init) = decl.init {
                        self.mutate_expr(init)?;
                    }
                }
            }
            other => {
                return Err(InternalError::UnexpectedStmtNode {
                    kind: other.name(),
                    span: tree.span(node),
                }
                .into())
            }
        }
        Ok(())
    }

    fn stmts(&mut self, nodes: &[NodeId]) -> Result<(), Error> {
        for &node in nodes {
            let dead = self
                .analysis
                .block_of(node)
                .map(|b| self.analysis.block(b).dead)
                .unwrap_or(false);
            if dead {
                // Dead code is marked, never deleted: offsets stay
                // predictable and the author sees what cannot run.
                self.patches
                    .insert(self.tree.span(node).start, "/* DEAD */ ")?;
            }
            self.stmt(node)?;
        }
        Ok(())
    }

    /// Opens a scope for a braced block (or braceless case body) and closes
    /// it again, appending accumulated closing fragments.
    fn block(&mut self, node: NodeId, ctx: BlockContext) -> Result<(), Error> {
        let tree = self.tree;
        let (stmts, braced) = match tree.kind(node) {
            NodeKind::Block { stmts, braced } => (&stmts[..], *braced),
            other => {
                return Err(InternalError::BlockRequired {
                    kind: other.name(),
                    span: tree.span(node),
                }
                .into())
            }
        };
        let mut scope = Scope::derived(self.stack.last());
        match ctx {
            BlockContext::Plain => {}
            BlockContext::LoopBody => {
                scope.can_escape = true;
                scope.in_loop = true;
            }
            BlockContext::SwitchCase => {
                scope.can_escape = true;
                scope.cannot_bind = true;
            }
            BlockContext::TryBody => {
                scope.can_throw = false;
            }
        }
        self.stack.push(scope);
        let depth = self.stack.len();
        self.stmts(stmts)?;
        if self.stack.len() != depth {
            return Err(InternalError::UnbalancedScopeStack {
                span: tree.span(node),
            }
            .into());
        }
        let scope = match self.stack.pop() {
            Some(scope) => scope,
            None => {
                return Err(InternalError::UnbalancedScopeStack {
                    span: tree.span(node),
                }
                .into())
            }
        };
        self.finish_scope(scope, tree.span(node), braced, stmts.last().copied())
    }

    /// Loop bodies: braced bodies get an escapable, bind-banned scope;
    /// braceless bodies run in the enclosing scope.
    fn loop_body(&mut self, body: NodeId) -> Result<(), Error> {
        if matches!(self.tree.kind(body), NodeKind::Block { .. }) {
            self.block(body, BlockContext::LoopBody)
        } else {
            self.stmt(body)
        }
    }

    /// A for/for-in header clause: a declaration, a wrapped expression
    /// statement, or a bare expression.
    fn mutate_clause(&mut self, node: NodeId) -> Result<(), Error> {
        let tree = self.tree;
        match tree.kind(node) {
            NodeKind::VarDecl { decls } => {
                for decl in decls {
                    if let Some(init) = decl.init {
                        self.mutate_expr(init)?;
                    }
                }
                Ok(())
            }
            NodeKind::ExprStmt { expr } => self.mutate_expr(*expr),
            _ => self.mutate_expr(node),
        }
    }

    /// A nested function starts from a fresh context: only its own trailing
    /// parameter and its own use of `this` matter.
    fn mutate_func(&mut self, node: NodeId) -> Result<(), Error> {
        let tree = self.tree;
        let (params, body) = match tree.kind(node) {
            NodeKind::Function { params, body, .. } => (&params[..], *body),
            other => {
                return Err(InternalError::UnexpectedStmtNode {
                    kind: other.name(),
                    span: tree.span(node),
                }
                .into())
            }
        };
        let (stmts, braced) = match tree.kind(body) {
            NodeKind::Block { stmts, braced } => (&stmts[..], *braced),
            other => {
                return Err(InternalError::BlockRequired {
                    kind: other.name(),
                    span: tree.span(body),
                }
                .into())
            }
        };

        let mut scope = Scope {
            level: self.stack.last().map(|s| s.level).unwrap_or(0) + 1,
            ..Scope::default()
        };
        scope.uses_this = self.analysis.uses_this(node);
        if let Some(last) = params.last() {
            if is_callback_name(last) {
                scope.callback = Some(last.clone());
            }
        }

        self.stack.push(scope);
        let depth = self.stack.len();
        self.stmts(stmts)?;
        if self.stack.len() != depth {
            return Err(InternalError::UnbalancedScopeStack {
                span: tree.span(node),
            }
            .into());
        }
        let scope = match self.stack.pop() {
            Some(scope) => scope,
            None => {
                return Err(InternalError::UnbalancedScopeStack {
                    span: tree.span(node),
                }
                .into())
            }
        };
        self.finish_scope(scope, tree.span(body), braced, stmts.last().copied())
    }

    /// Appends a scope's closing fragments just before the block's closing
    /// brace. When the scope opened at least one continuation, an explicit
    /// `return;` lands in front of the fragments (inside the innermost
    /// continuation) unless the block already ends in a return.
    fn finish_scope(
        &mut self,
        scope: Scope,
        span: Span,
        braced: bool,
        last_stmt: Option<NodeId>,
    ) -> Result<(), Error> {
        let mut closes = scope.closes;
        if closes.is_empty() {
            return Ok(());
        }
        let last_returns = last_stmt
            .and_then(|stmt| self.analysis.block_of(stmt))
            .map(|b| self.analysis.block(b).returns)
            .unwrap_or(false);
        if !last_returns {
            closes.insert(0, "return; ".to_owned());
        } else if self.debug {
            closes.insert(0, "/* dup ret */ ".to_owned());
        }
        let pos = if braced {
            BytePos(span.end.0 - 1)
        } else {
            span.end
        };
        self.patches.insert(pos, closes.concat())?;
        Ok(())
    }

    fn escape(&mut self, node: NodeId, keyword: &'static str) -> Result<(), Error> {
        let allowed = self
            .stack
            .last()
            .map(|scope| scope.can_escape)
            .unwrap_or(false);
        if !allowed {
            return Err(MisuseError::EscapeAfterBind {
                keyword,
                span: self.tree.span(node),
            }
            .into());
        }
        Ok(())
    }

    /// Rewrites a recognized bind statement into a call whose trailing
    /// argument is the generated continuation.
    fn bind_stmt(&mut self, node: NodeId, form: bind::BindForm) -> Result<(), Error> {
        let span = self.tree.span(node);
        let scope = match self.stack.last_mut() {
            Some(scope) => scope,
            None => return Err(MisuseError::BindInGlobalScope { span }.into()),
        };
        if scope.cannot_bind {
            return Err(MisuseError::BindInSwitchCase { span }.into());
        }
        if scope.in_loop {
            return Err(MisuseError::BindInLoop { span }.into());
        }
        let cb = match &scope.callback {
            Some(cb) => cb.clone(),
            None => return Err(MisuseError::BindWithoutCallback { span }.into()),
        };

        // Everything below this statement is now lexically inside the
        // continuation: returns and throws route through the callback, and
        // escapes are no longer legal.
        scope.can_yield = true;
        scope.can_throw = true;
        scope.can_escape = false;
        let uses_this = scope.uses_this;
        scope.closes.insert(
            0,
            if uses_this {
                "}).bind(this)); ".to_owned()
            } else {
                "}); ".to_owned()
            },
        );

        let mut params = filter_discards(&form.binders);
        params.insert(0, "err".to_owned());
        let mut header = format!(
            "function ({}) {{ if (err) return {}(err",
            params.join(", "),
            cb
        );
        if uses_this {
            header.insert(0, '(');
        }
        if form.has_args {
            header.insert_str(0, ", ");
        }

        self.patches.replace(span.start, form.call_start, "")?;
        self.patches.replace(form.args_end, span.end, header)?;
        Ok(())
    }

    fn mutate_expr(&mut self, node: NodeId) -> Result<(), Error> {
        let tree = self.tree;
        match tree.kind(node) {
            NodeKind::Function { .. } => self.mutate_func(node),
            NodeKind::Yield { value } => {
                let span = tree.span(node);
                if self.stack.is_empty() {
                    return Err(MisuseError::YieldInGlobalScope { span }.into());
                }
                let cb = match self.stack.last() {
                    Some(scope) if scope.can_yield => scope.callback.clone(),
                    _ => None,
                };
                match cb {
                    Some(cb) => {
                        let value_span = tree.span(*value);
                        self.patches
                            .replace(span.start, value_span.start, format!("{}(null, ", cb))?;
                        self.patches.insert(value_span.end, ")")?;
                        Ok(())
                    }
                    None => Err(MisuseError::YieldOutsideBoundScope { span }.into()),
                }
            }
            _ => {
                for child in tree.children(node) {
                    self.mutate_expr(child)?;
                }
                Ok(())
            }
        }
    }

    /// Debug mode: annotate each statement with its block and edges.
    fn dump_block(&mut self, node: NodeId) -> Result<(), Error> {
        if self.stack.is_empty() {
            return Ok(());
        }
        let text = match self.analysis.block_of(node) {
            None => "has no block".to_owned(),
            Some(id) => {
                let block = self.analysis.block(id);
                let mut out = String::new();
                if block.func_entry {
                    out.push_str("entry ");
                }
                out.push_str(&format!("block {}", block.index));
                if !block.exits.is_empty() {
                    let exits: Vec<String> =
                        block.exits.iter().map(|x| x.0.to_string()).collect();
                    out.push_str(&format!(" -> {}", exits.join(", ")));
                }
                if block.func_exit {
                    out.push_str(" exit");
                } else if block.returns {
                    out.push_str(" ret");
                }
                out
            }
        };
        self.patches
            .insert(self.tree.span(node).start, format!("/* {} */ ", text))?;
        Ok(())
    }
}
