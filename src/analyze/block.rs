//! Basic blocks and the arena that owns them.

/// An opaque index identifying a basic block within a `BlockArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// A maximal straight-line run of statements.
///
/// Invariants maintained by the analyzer:
/// 1. A block with `over` set accepts no further statements; the analyzer
///    starts a fresh block before continuing a statement list.
/// 2. `exits` and `entrances` are kept symmetric by `BlockArena::add_edge`.
/// 3. Blocks are created lazily and never deleted; they live for one
///    analysis pass.
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub index: u32,
    pub exits: Vec<BlockId>,
    pub entrances: Vec<BlockId>,
    /// Control has already left through a nested construct; no further
    /// statements may be appended.
    pub over: bool,
    /// Unreachable: everything in it is still rewritten, but never runs.
    pub dead: bool,
    /// Ends in a `return`.
    pub returns: bool,
    /// Ends in a `break` or `continue`.
    pub breaks: bool,
    /// At least one statement was recorded in this block.
    pub has_stmts: bool,
    /// First block of a function body.
    pub func_entry: bool,
    /// Control may leave the enclosing function from here without passing
    /// through further analyzed statements.
    pub func_exit: bool,
}

/// Owns every block of one analysis pass, indexed by `BlockId`.
#[derive(Debug, Default)]
pub struct BlockArena {
    blocks: Vec<BasicBlock>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn alloc(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock {
            index: id.0,
            ..BasicBlock::default()
        });
        id
    }

    /// Records a control-flow edge, keeping `exits` and `entrances` in sync.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.0 as usize].exits.push(to);
        self.blocks[to.0 as usize].entrances.push(from);
    }
}

impl std::ops::Index<BlockId> for BlockArena {
    type Output = BasicBlock;

    fn index(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }
}

impl std::ops::IndexMut<BlockId> for BlockArena {
    fn index_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0 as usize]
    }
}
