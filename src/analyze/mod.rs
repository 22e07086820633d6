//! Control-flow analysis.
//!
//! Walks each function's statement tree once, partitioning statement lists
//! into basic blocks and recording how control escapes nested constructs.
//! Produces no text changes; the rewriter consumes the side tables through
//! the returned `Analysis`.
//!
//! The model is deliberately coarse where precision buys nothing for the
//! rewriter: loop bodies are single opaque blocks with no per-iteration
//! edges, and try/finally is approximated (exceptional edges are not
//! modeled; the tool discourages native exceptions in bound functions).

pub mod block;

use std::collections::{HashMap, HashSet};

use crate::error::InternalError;
use crate::parser::ast::{NodeId, NodeKind, SyntaxTree};
use crate::rewrite::bind;

pub use block::{BasicBlock, BlockArena, BlockId};

/// The analyzer's output: the block graph plus per-node side tables.
///
/// `stmt_blocks` realizes the "one extra field per statement node" of the
/// data model as a side table, leaving the syntax tree untouched.
#[derive(Debug)]
pub struct Analysis {
    pub blocks: BlockArena,
    stmt_blocks: Vec<Option<BlockId>>,
    uses_this: Vec<bool>,
}

impl Analysis {
    /// The basic block containing this statement, if the statement was part
    /// of an analyzed statement list.
    pub fn block_of(&self, stmt: NodeId) -> Option<BlockId> {
        self.stmt_blocks[stmt.0 as usize]
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id]
    }

    /// Whether the given function node references `this` in its own body
    /// (nested functions do not count).
    pub fn uses_this(&self, func: NodeId) -> bool {
        self.uses_this[func.0 as usize]
    }
}

/// Analyzes the whole program and returns the block graph and side tables.
pub fn analyze(tree: &SyntaxTree) -> Result<Analysis, InternalError> {
    let mut analyzer = Analyzer {
        tree,
        blocks: BlockArena::new(),
        stack: Vec::new(),
        defers: HashMap::new(),
        level: 0,
        escape_levels: Vec::new(),
        cur_func: None,
        stmt_blocks: vec![None; tree.len()],
        uses_this: vec![false; tree.len()],
    };
    let entry = analyzer.blocks.alloc();
    analyzer.analyze_stmts(&tree.root, entry)?;
    // Defers left at the top level belong to statements outside any
    // function; nothing wraps them, so nothing needs to drain them.
    Ok(Analysis {
        blocks: analyzer.blocks,
        stmt_blocks: analyzer.stmt_blocks,
        uses_this: analyzer.uses_this,
    })
}

struct Analyzer<'t> {
    tree: &'t SyntaxTree,
    blocks: BlockArena,
    /// Current block of each open statement list, innermost last.
    stack: Vec<BlockId>,
    /// Deferred exits: blocks whose successor becomes known when the given
    /// lexical level sees its next statement (or ends).
    defers: HashMap<u32, Vec<BlockId>>,
    level: u32,
    /// Levels that `break`/`continue` target, innermost last.
    escape_levels: Vec<u32>,
    cur_func: Option<NodeId>,
    stmt_blocks: Vec<Option<BlockId>>,
    uses_this: Vec<bool>,
}

impl<'t> Analyzer<'t> {
    fn new_block(&mut self, entry: Option<BlockId>) -> BlockId {
        let block = self.blocks.alloc();
        if let Some(from) = entry {
            self.blocks.add_edge(from, block);
        }
        block
    }

    fn defer_exit(&mut self, to_level: u32, block: BlockId) {
        self.defers.entry(to_level).or_default().push(block);
    }

    /// Drains every exit deferred at `level`. Each entry is consumed exactly
    /// once; removing the whole bucket enforces that.
    fn take_defers(&mut self, level: u32) -> Vec<BlockId> {
        self.defers.remove(&level).unwrap_or_default()
    }

    fn kills_next(&self, block: BlockId) -> bool {
        let b = &self.blocks[block];
        b.dead || b.returns || b.breaks
    }

    /// Analyzes one statement list into `block`, splitting off fresh blocks
    /// whenever the current one is over and wiring deferred exits to the
    /// next statement that materializes at this level.
    fn analyze_stmts(&mut self, nodes: &[NodeId], block: BlockId) -> Result<(), InternalError> {
        let prev_kills = self
            .stack
            .last()
            .map(|&b| self.kills_next(b))
            .unwrap_or(false);
        let prev_level = self.level;
        self.level += 1;
        let this_level = self.level;
        if prev_kills {
            self.blocks[block].dead = true;
        }
        self.stack.push(block);

        let mut block = block;
        for &node in nodes {
            if self.blocks[block].over {
                let dead = self.blocks[block].dead || self.blocks[block].returns;
                block = self.blocks.alloc();
                if dead {
                    self.blocks[block].dead = true;
                }
                if let Some(top) = self.stack.last_mut() {
                    *top = block;
                }
            }

            // Exits deferred at this level flow into the block that hosts
            // the next statement.
            for old in self.take_defers(this_level) {
                self.blocks.add_edge(old, block);
            }

            self.stmt_blocks[node.0 as usize] = Some(block);
            self.blocks[block].has_stmts = true;
            self.analyze_stmt(node, block)?;
        }

        // The list is over: open-ended blocks owe their continuation to
        // whatever follows at the enclosing level.
        for src in self.blocks_needing_exit(block) {
            self.defer_exit(prev_level, src);
        }
        for dangling in self.take_defers(this_level) {
            self.defer_exit(prev_level, dangling);
        }
        self.level -= 1;
        self.stack.pop();
        Ok(())
    }

    /// Analyzes a statement body that may or may not be a braced block.
    fn analyze_block(&mut self, node: NodeId, block: BlockId) -> Result<(), InternalError> {
        let tree = self.tree;
        match tree.kind(node) {
            NodeKind::Block { stmts, .. } => self.analyze_stmts(stmts, block),
            _ => self.analyze_stmts(&[node], block),
        }
    }

    fn analyze_stmt(&mut self, node: NodeId, entry: BlockId) -> Result<(), InternalError> {
        let tree = self.tree;
        match &tree.node(node).kind {
            NodeKind::Block { .. } => {
                self.blocks[entry].over = true;
                let inner = self.new_block(Some(entry));
                self.analyze_block(node, inner)?;
            }
            NodeKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.blocks[entry].over = true;
                let then_block = self.new_block(Some(entry));
                self.analyze_block(*then_branch, then_block)?;
                match else_branch {
                    Some(els) => {
                        let else_block = self.new_block(Some(entry));
                        self.analyze_block(*els, else_block)?;
                    }
                    // The missing branch continues at whatever follows.
                    None => self.defer_exit(self.level, entry),
                }
            }
            NodeKind::While { cond, body } => {
                self.analyze_expr(*cond)?;
                self.analyze_loop_body(entry, *body)?;
            }
            NodeKind::DoWhile { body, cond } => {
                self.analyze_expr(*cond)?;
                self.analyze_loop_body(entry, *body)?;
            }
            NodeKind::For {
                init,
                cond,
                update,
                body,
            } => {
                for clause in [init, cond, update].into_iter().flatten() {
                    self.analyze_clause(*clause)?;
                }
                self.analyze_loop_body(entry, *body)?;
            }
            NodeKind::ForIn {
                target,
                object,
                body,
            } => {
                self.analyze_clause(*target)?;
                self.analyze_expr(*object)?;
                self.analyze_loop_body(entry, *body)?;
            }
            NodeKind::Switch { cases, .. } => {
                let break_level = self.level;
                self.level += 1;
                let case_level = self.level;
                self.escape_levels.push(break_level);
                self.blocks[entry].over = true;
                let mut fall_throughs: Vec<BlockId> = Vec::new();
                for &case in cases {
                    let body = match tree.kind(case) {
                        NodeKind::Case { body, .. } => *body,
                        other => {
                            return Err(InternalError::UnexpectedStmtNode {
                                kind: other.name(),
                                span: tree.span(case),
                            })
                        }
                    };
                    let case_entry = self.new_block(Some(entry));
                    for fall in fall_throughs.drain(..) {
                        self.blocks.add_edge(fall, case_entry);
                    }
                    self.analyze_block(body, case_entry)?;
                    fall_throughs = self.take_defers(case_level);
                }
                // A dangling final case continues after the switch.
                for fall in fall_throughs {
                    self.defer_exit(break_level, fall);
                }
                self.level -= 1;
                self.escape_levels.pop();
            }
            NodeKind::Try {
                body,
                catches,
                finally,
            } => {
                self.blocks[entry].over = true;
                let try_entry = self.new_block(Some(entry));
                self.analyze_block(*body, try_entry)?;
                for &clause in catches {
                    let catch_body = match tree.kind(clause) {
                        NodeKind::Catch { body, .. } => *body,
                        other => {
                            return Err(InternalError::UnexpectedStmtNode {
                                kind: other.name(),
                                span: tree.span(clause),
                            })
                        }
                    };
                    let catch_block = self.new_block(Some(try_entry));
                    self.analyze_block(catch_body, catch_block)?;
                }
                if let Some(fin) = finally {
                    let finally_block = self.new_block(Some(try_entry));
                    // The finally clause collects every exit deferred at the
                    // try statement's level, from the try body and all catch
                    // clauses alike.
                    for deferred in self.take_defers(self.level) {
                        self.blocks.add_edge(deferred, finally_block);
                    }
                    self.analyze_block(*fin, finally_block)?;
                }
            }
            NodeKind::Function { .. } => self.analyze_func(node)?,
            NodeKind::Break | NodeKind::Continue => {
                self.blocks[entry].over = true;
                self.blocks[entry].breaks = true;
                let target = self.escape_levels.last().copied();
                match target {
                    Some(level) => self.defer_exit(level, entry),
                    // No enclosing loop or switch: drop the exit. The
                    // rewriter owns the policy diagnostic for this.
                    None => {}
                }
            }
            NodeKind::Return { value } => {
                self.blocks[entry].over = true;
                self.blocks[entry].returns = true;
                if let Some(value) = value {
                    self.analyze_expr(*value)?;
                }
            }
            NodeKind::ExprStmt { expr } => {
                // Bind-shaped statements are rewritten wholesale; their
                // pieces are not walked as ordinary expressions. Malformed
                // near-binds are skipped too; the rewriter reports them.
                if matches!(bind::recognize(tree, *expr), Ok(None)) {
                    self.analyze_expr(*expr)?;
                }
            }
            // Not a terminator here: exceptional edges are out of model.
            NodeKind::Throw { .. } => {}
            NodeKind::VarDecl { decls } => {
                for decl in decls {
                    if let Some(init) = decl.init {
                        self.analyze_expr(init)?;
                    }
                }
            }
            other => {
                return Err(InternalError::UnexpectedStmtNode {
                    kind: other.name(),
                    span: tree.span(node),
                })
            }
        }
        Ok(())
    }

    /// Loop bodies are analyzed as single opaque blocks: no back edges, no
    /// per-iteration flow. The rewriter rejects binds inside them, so finer
    /// modeling would never be consumed.
    fn analyze_loop_body(&mut self, entry: BlockId, body: NodeId) -> Result<(), InternalError> {
        self.escape_levels.push(self.level);
        self.blocks[entry].over = true;
        let body_block = self.new_block(Some(entry));
        self.analyze_block(body, body_block)?;
        self.escape_levels.pop();
        Ok(())
    }

    /// A for/for-in header clause: a declaration, a wrapped expression
    /// statement, or a bare expression.
    fn analyze_clause(&mut self, node: NodeId) -> Result<(), InternalError> {
        match self.tree.kind(node) {
            NodeKind::VarDecl { decls } => {
                let inits: Vec<NodeId> = decls.iter().filter_map(|d| d.init).collect();
                for init in inits {
                    self.analyze_expr(init)?;
                }
                Ok(())
            }
            NodeKind::ExprStmt { expr } => self.analyze_expr(*expr),
            _ => self.analyze_expr(node),
        }
    }

    fn analyze_expr(&mut self, node: NodeId) -> Result<(), InternalError> {
        let tree = self.tree;
        match tree.kind(node) {
            NodeKind::Function { .. } => self.analyze_func(node)?,
            NodeKind::This => {
                if let Some(func) = self.cur_func {
                    self.uses_this[func.0 as usize] = true;
                }
            }
            _ => {
                for child in tree.children(node) {
                    self.analyze_expr(child)?;
                }
            }
        }
        Ok(())
    }

    /// Analyzes a nested function with its own block numbering continuation
    /// and function-local defer scoping. Whatever the body leaves deferred
    /// at the surrounding level becomes this function's exit set.
    fn analyze_func(&mut self, node: NodeId) -> Result<(), InternalError> {
        let tree = self.tree;
        let body_stmts: &[NodeId] = match tree.kind(node) {
            NodeKind::Function { body, .. } => match tree.kind(*body) {
                NodeKind::Block { stmts, .. } => stmts,
                other => {
                    return Err(InternalError::UnexpectedStmtNode {
                        kind: other.name(),
                        span: tree.span(*body),
                    })
                }
            },
            other => {
                return Err(InternalError::UnexpectedStmtNode {
                    kind: other.name(),
                    span: tree.span(node),
                })
            }
        };

        let outer_func = self.cur_func.replace(node);
        let entry = self.blocks.alloc();
        self.blocks[entry].func_entry = true;

        // Shadow any defers the enclosing scope holds at this level so the
        // body's dangling exits can be told apart as function exits.
        let level = self.level;
        let saved = self.defers.remove(&level);

        self.analyze_stmts(body_stmts, entry)?;

        for exit in self.take_defers(level) {
            self.blocks[exit].func_exit = true;
        }
        if let Some(saved) = saved {
            self.defers.insert(level, saved);
        }
        self.cur_func = outer_func;
        Ok(())
    }

    /// Walks backward from an open block through connector blocks (no
    /// statements of their own) to find the blocks that actually owe a
    /// forward exit. Stops at function entries and at blocks with
    /// statements.
    fn blocks_needing_exit(&self, block: BlockId) -> Vec<BlockId> {
        if self.blocks[block].over {
            return Vec::new();
        }
        let mut found = Vec::new();
        let mut seen: HashSet<BlockId> = HashSet::new();
        seen.insert(block);
        let mut wanting = vec![block];
        while !wanting.is_empty() {
            let mut next_gen = Vec::new();
            for candidate in wanting {
                let blk = &self.blocks[candidate];
                if blk.has_stmts {
                    found.push(candidate);
                    continue;
                }
                if blk.func_entry {
                    continue;
                }
                for &entrance in &blk.entrances {
                    if seen.insert(entrance) {
                        next_gen.push(entrance);
                    }
                }
            }
            wanting = next_gen;
        }
        found
    }
}
