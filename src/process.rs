//! Processes and the workload's process table.
//!
//! A process has a fixed size and is either resident (with a known
//! location) or not. Location and residency live in one `Option`, so a
//! resident process without an address cannot be built.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Create a new process ID.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Where a resident process lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Residency {
    /// Units `[start, start + size)` of a unit map.
    Unit {
        /// First unit.
        start: usize,
    },
    /// A whole block of a block list.
    Block {
        /// Block index.
        block: usize,
    },
}

impl Residency {
    /// Start unit or block index.
    pub const fn position(&self) -> usize {
        match self {
            Self::Unit { start } => *start,
            Self::Block { block } => *block,
        }
    }
}

/// A simulated process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// Process ID.
    pub id: ProcessId,

    /// Size in units.
    pub size: usize,

    residency: Option<Residency>,
}

impl Process {
    /// Create a non-resident process.
    pub const fn new(id: u32, size: usize) -> Self {
        Self {
            id: ProcessId(id),
            size,
            residency: None,
        }
    }

    /// Whether the process currently holds memory.
    pub const fn is_resident(&self) -> bool {
        self.residency.is_some()
    }

    /// Current location, if resident.
    pub const fn residency(&self) -> Option<Residency> {
        self.residency
    }

    /// Start unit or block index, if resident.
    pub fn start(&self) -> Option<usize> {
        self.residency.map(|r| r.position())
    }

    /// Record a successful allocation.
    pub fn admit(&mut self, residency: Residency) {
        self.residency = Some(residency);
    }

    /// Record a successful free and return the old location.
    pub fn evict(&mut self) -> Option<Residency> {
        self.residency.take()
    }

    /// Back to the initial, non-resident state.
    pub fn reset(&mut self) {
        self.residency = None;
    }
}

/// Ordered set of processes making up a workload.
///
/// # Examples
///
/// ```rust
/// use fitsim::process::ProcessTable;
///
/// let table = ProcessTable::classic();
/// assert_eq!(table.len(), 10);
/// assert_eq!(table.get(0).unwrap().size, 5);
/// assert_eq!(table.resident_count(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTable {
    processes: Vec<Process>,
}

impl ProcessTable {
    /// The ten-process workload used by the reference scenarios.
    pub const CLASSIC: [(u32, usize); 10] = [
        (1, 5),
        (2, 4),
        (3, 2),
        (4, 5),
        (5, 8),
        (6, 3),
        (7, 5),
        (8, 8),
        (9, 2),
        (10, 6),
    ];

    /// Build from `(id, size)` pairs.
    ///
    /// Sizes must be positive and IDs unique.
    pub fn new(definitions: &[(u32, usize)]) -> Result<Self> {
        let mut processes: Vec<Process> = Vec::with_capacity(definitions.len());
        for &(id, size) in definitions {
            if size == 0 {
                return Err(Error::config(format!("process P{id} has size 0")));
            }
            if processes.iter().any(|p| p.id.0 == id) {
                return Err(Error::config(format!("duplicate process id P{id}")));
            }
            processes.push(Process::new(id, size));
        }
        Ok(Self { processes })
    }

    /// Table built from [`Self::CLASSIC`].
    pub fn classic() -> Self {
        Self {
            processes: Self::CLASSIC
                .iter()
                .map(|&(id, size)| Process::new(id, size))
                .collect(),
        }
    }

    /// Number of processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Process at `index`.
    pub fn get(&self, index: usize) -> Option<&Process> {
        self.processes.get(index)
    }

    /// Mutable process at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Process> {
        self.processes.get_mut(index)
    }

    /// Look up by ID.
    pub fn find(&self, id: ProcessId) -> Option<&Process> {
        self.processes.iter().find(|p| p.id == id)
    }

    /// All processes in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter()
    }

    /// Mutable access to all processes.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.processes.iter_mut()
    }

    /// Processes currently holding memory.
    pub fn resident(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter().filter(|p| p.is_resident())
    }

    /// Number of resident processes.
    pub fn resident_count(&self) -> usize {
        self.resident().count()
    }

    /// Largest process size, 0 when empty.
    pub fn max_size(&self) -> usize {
        self.processes.iter().map(|p| p.size).max().unwrap_or(0)
    }

    /// Mark every process non-resident.
    pub fn reset(&mut self) {
        for process in &mut self.processes {
            process.reset();
        }
    }
}
