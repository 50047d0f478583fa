//! Block-list memory model.
//!
//! Memory is partitioned once into an ordered list of variable-size blocks.
//! A process takes a whole block, however much larger than its request, so
//! the unused tail is internal fragmentation. Blocks are never split and,
//! unless coalescing is switched on, adjacent free blocks are never merged.
//!
//! # Key Concepts
//!
//! ## Why no splitting?
//!
//! This models fixed partitioning with variable partition sizes:
//! - The partition is decided up front
//! - A freed block returns to the pool with its original size
//! - Two small neighbours never add up to one large hole
//!
//! ## Quick Fit index
//!
//! Blocks are grouped by exact size in a [`QuickFitIndex`] built from the
//! initial partition. Quick Fit only ever looks inside the first size class
//! that can hold the request.

use crate::process::ProcessId;
use crate::strategy::{FreeRegion, FreeSpace};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Index of a block in its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub usize);

impl BlockId {
    /// Create a new block ID.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw index.
    pub const fn index(&self) -> usize {
        self.0
    }
}

/// One partition element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBlock {
    /// Size in units.
    pub size: usize,

    /// Owning process, if allocated.
    pub owner: Option<ProcessId>,

    /// Units the owner asked for.
    pub used: usize,
}

impl MemoryBlock {
    /// Create a free block.
    pub const fn new(size: usize) -> Self {
        Self {
            size,
            owner: None,
            used: 0,
        }
    }

    /// Check if block is allocated.
    pub const fn allocated(&self) -> bool {
        self.owner.is_some()
    }

    /// Check if block is free.
    pub const fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    /// Unused units inside an allocated block.
    pub const fn waste(&self) -> usize {
        if self.owner.is_some() {
            self.size - self.used
        } else {
            0
        }
    }
}

impl fmt::Display for MemoryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner {
            Some(owner) => write!(f, "[{} | {}]", owner, self.size),
            None => write!(f, "[Free | {}]", self.size),
        }
    }
}

/// Configuration for a block list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockListConfig {
    /// Block sizes, left to right.
    pub sizes: Vec<usize>,

    /// Merge adjacent free blocks after every free.
    #[serde(default)]
    pub coalesce_on_free: bool,
}

impl Default for BlockListConfig {
    fn default() -> Self {
        Self::classic()
    }
}

impl BlockListConfig {
    /// Create a config with the given partition.
    pub fn with_sizes(sizes: impl Into<Vec<usize>>) -> Self {
        Self {
            sizes: sizes.into(),
            coalesce_on_free: false,
        }
    }

    /// The `[100, 500, 200, 300, 600]` partition of the reference scenarios.
    pub fn classic() -> Self {
        Self::with_sizes([100, 500, 200, 300, 600])
    }

    /// Enable or disable coalescing on free.
    pub fn coalesce_on_free(mut self, enabled: bool) -> Self {
        self.coalesce_on_free = enabled;
        self
    }

    /// Total units across all blocks.
    pub fn capacity(&self) -> usize {
        self.sizes.iter().sum()
    }

    /// Check the partition is usable.
    pub fn validate(&self) -> Result<()> {
        if self.sizes.is_empty() {
            return Err(Error::config("block list needs at least one block"));
        }
        if let Some(i) = self.sizes.iter().position(|&s| s == 0) {
            return Err(Error::config(format!("block {i} has size 0")));
        }
        Ok(())
    }
}

/// Blocks grouped by exact size, smallest class first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuickFitIndex {
    classes: BTreeMap<usize, Vec<BlockId>>,
}

impl QuickFitIndex {
    /// Build from a partition.
    pub fn build(blocks: &[MemoryBlock]) -> Self {
        let mut classes: BTreeMap<usize, Vec<BlockId>> = BTreeMap::new();
        for (i, block) in blocks.iter().enumerate() {
            classes.entry(block.size).or_default().push(BlockId::new(i));
        }
        Self { classes }
    }

    /// First size class that can hold `requested`.
    pub fn class_for(&self, requested: usize) -> Option<(usize, &[BlockId])> {
        self.classes
            .range(requested..)
            .next()
            .map(|(&size, ids)| (size, ids.as_slice()))
    }

    /// Blocks of exactly `size` units.
    pub fn class(&self, size: usize) -> &[BlockId] {
        self.classes.get(&size).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct sizes.
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }
}

/// Ordered list of blocks.
///
/// # Examples
///
/// ```rust
/// use fitsim::block_list::{BlockId, BlockList};
/// use fitsim::process::ProcessId;
/// use fitsim::strategy::Strategy;
///
/// let mut memory = BlockList::new(&[100, 500, 200, 300, 600]).unwrap();
///
/// let block = Strategy::FirstFit.place(&mut memory, 212).unwrap();
/// assert_eq!(block, 1);
/// memory.allocate(BlockId::new(block), ProcessId::new(1), 212).unwrap();
///
/// // The whole 500-unit block is consumed.
/// assert_eq!(memory.allocated_units(), 500);
/// assert_eq!(memory.internal_fragmentation(), 288);
///
/// assert_eq!(memory.free(ProcessId::new(1)).unwrap(), BlockId::new(1));
/// ```
#[derive(Debug, Clone)]
pub struct BlockList {
    config: BlockListConfig,

    blocks: Vec<MemoryBlock>,

    index: QuickFitIndex,

    /// Next Fit cursor, always a valid block index.
    cursor: usize,
}

impl BlockList {
    /// Create a list from block sizes with coalescing off.
    pub fn new(sizes: &[usize]) -> Result<Self> {
        Self::with_config(BlockListConfig::with_sizes(sizes))
    }

    /// Create a list from a config.
    pub fn with_config(config: BlockListConfig) -> Result<Self> {
        config.validate()?;
        let blocks: Vec<MemoryBlock> = config.sizes.iter().map(|&s| MemoryBlock::new(s)).collect();
        let index = QuickFitIndex::build(&blocks);
        Ok(Self {
            config,
            blocks,
            index,
            cursor: 0,
        })
    }

    /// Get configuration.
    pub const fn config(&self) -> &BlockListConfig {
        &self.config
    }

    /// All blocks, left to right.
    pub fn blocks(&self) -> &[MemoryBlock] {
        &self.blocks
    }

    /// Block by ID.
    pub fn block(&self, id: BlockId) -> Option<&MemoryBlock> {
        self.blocks.get(id.0)
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: a list holds at least one block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total units across all blocks.
    pub fn capacity(&self) -> usize {
        self.blocks.iter().map(|b| b.size).sum()
    }

    /// Quick Fit size index.
    pub const fn quick_fit_index(&self) -> &QuickFitIndex {
        &self.index
    }

    /// Next Fit cursor.
    pub const fn next_fit_cursor(&self) -> usize {
        self.cursor
    }

    /// Give `block` to `owner` for a request of `requested` units.
    ///
    /// The block keeps its full size.
    pub fn allocate(&mut self, block: BlockId, owner: ProcessId, requested: usize) -> Result<()> {
        let target = self
            .blocks
            .get_mut(block.0)
            .ok_or(Error::InvalidBlock(block.0))?;

        if target.allocated() {
            return Err(Error::AlreadyOccupied {
                start: block.0,
                length: requested,
            });
        }
        if requested > target.size {
            return Err(Error::BlockTooSmall {
                size: target.size,
                requested,
            });
        }

        target.owner = Some(owner);
        target.used = requested;
        debug!(%owner, block = block.0, size = target.size, requested, "allocated block");
        Ok(())
    }

    /// Block currently owned by `owner`.
    ///
    /// Indices shift when blocks are coalesced, so look ownership up here
    /// rather than keeping an index from allocation time.
    pub fn owned_by(&self, owner: ProcessId) -> Option<BlockId> {
        self.blocks
            .iter()
            .position(|b| b.owner == Some(owner))
            .map(BlockId::new)
    }

    /// Free the block owned by `owner`.
    ///
    /// Returns [`Error::OwnerNotFound`] and leaves the list untouched when
    /// no block belongs to `owner`.
    pub fn free(&mut self, owner: ProcessId) -> Result<BlockId> {
        let Some(BlockId(i)) = self.owned_by(owner) else {
            warn!(%owner, "free requested for process that owns no block");
            return Err(Error::OwnerNotFound(owner));
        };

        let block = &mut self.blocks[i];
        block.owner = None;
        block.used = 0;
        debug!(%owner, block = i, "freed block");

        if self.config.coalesce_on_free {
            self.coalesce();
        }
        Ok(BlockId::new(i))
    }

    /// Merge every run of adjacent free blocks into one block.
    ///
    /// Returns the number of merges. Rebuilds the Quick Fit index and keeps
    /// the Next Fit cursor on the block that contained its old position.
    pub fn coalesce(&mut self) -> usize {
        let before = self.blocks.len();
        let mut merged: Vec<MemoryBlock> = Vec::with_capacity(before);
        let mut cursor = self.cursor;

        for (i, block) in self.blocks.drain(..).enumerate() {
            match merged.last_mut() {
                Some(last) if last.is_free() && block.is_free() => {
                    last.size += block.size;
                    if i <= self.cursor {
                        cursor -= 1;
                    }
                }
                _ => merged.push(block),
            }
        }

        self.blocks = merged;
        let merges = before - self.blocks.len();
        if merges > 0 {
            self.index = QuickFitIndex::build(&self.blocks);
            self.cursor = cursor.min(self.blocks.len() - 1);
            debug!(merges, blocks = self.blocks.len(), "coalesced free blocks");
        }
        merges
    }

    /// Units inside allocated blocks.
    pub fn allocated_units(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.allocated())
            .map(|b| b.size)
            .sum()
    }

    /// Units inside free blocks.
    pub fn free_units(&self) -> usize {
        self.capacity() - self.allocated_units()
    }

    /// Allocated-but-unused units.
    pub fn internal_fragmentation(&self) -> usize {
        self.blocks.iter().map(MemoryBlock::waste).sum()
    }

    /// Usage statistics.
    pub fn stats(&self) -> BlockStats {
        let allocated_blocks = self.blocks.iter().filter(|b| b.allocated()).count();
        BlockStats {
            total_blocks: self.blocks.len(),
            allocated_blocks,
            free_blocks: self.blocks.len() - allocated_blocks,
            capacity: self.capacity(),
            allocated_units: self.allocated_units(),
            free_units: self.free_units(),
            internal_fragmentation: self.internal_fragmentation(),
        }
    }

    /// Restore the initial partition with every block free.
    pub fn reset(&mut self) {
        self.blocks = self.config.sizes.iter().map(|&s| MemoryBlock::new(s)).collect();
        self.index = QuickFitIndex::build(&self.blocks);
        self.cursor = 0;
    }
}

/// Iterator over free blocks as [`FreeRegion`]s.
#[derive(Debug, Clone)]
pub struct FreeBlocks<'a> {
    inner: std::iter::Enumerate<std::slice::Iter<'a, MemoryBlock>>,
}

impl Iterator for FreeBlocks<'_> {
    type Item = FreeRegion;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .by_ref()
            .find(|(_, b)| b.is_free())
            .map(|(i, b)| FreeRegion::new(i, b.size))
    }
}

impl FreeSpace for BlockList {
    type Regions<'a> = FreeBlocks<'a>;

    fn free_regions(&self) -> Self::Regions<'_> {
        FreeBlocks {
            inner: self.blocks.iter().enumerate(),
        }
    }

    fn capacity(&self) -> usize {
        BlockList::capacity(self)
    }

    /// Circular scan over blocks from the cursor; the cursor moves one past
    /// the chosen block.
    fn next_fit(&mut self, requested: usize) -> Option<usize> {
        let count = self.blocks.len();
        let mut i = self.cursor;
        for _ in 0..count {
            let block = &self.blocks[i];
            if block.is_free() && block.size >= requested {
                self.cursor = (i + 1) % count;
                return Some(i);
            }
            i = (i + 1) % count;
        }
        None
    }

    /// First free block in the first size class that can hold `requested`.
    fn quick_fit(&self, requested: usize) -> Option<usize> {
        let (_, ids) = self.index.class_for(requested)?;
        ids.iter()
            .map(|id| id.0)
            .find(|&i| self.blocks[i].is_free() && self.blocks[i].size >= requested)
    }

    fn total_free(&self) -> usize {
        self.free_units()
    }
}

/// Block list usage statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStats {
    /// Blocks in the list.
    pub total_blocks: usize,
    /// Blocks with an owner.
    pub allocated_blocks: usize,
    /// Blocks without an owner.
    pub free_blocks: usize,
    /// Total units.
    pub capacity: usize,
    /// Units in allocated blocks.
    pub allocated_units: usize,
    /// Units in free blocks.
    pub free_units: usize,
    /// Allocated-but-unused units.
    pub internal_fragmentation: usize,
}

impl BlockStats {
    /// Calculate utilization as a fraction.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.allocated_units as f64 / self.capacity as f64
        }
    }
}
