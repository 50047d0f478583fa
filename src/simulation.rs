//! Simulation driver.
//!
//! Runs a workload of processes against one memory model with one strategy
//! at a time. Each event picks a process: a resident process is freed, any
//! other process is placed and, if the strategy finds room, allocated.
//! Every event yields a snapshot of memory for reporting.
//!
//! Memory and the Next Fit cursor are reset before each run, so runs with
//! different strategies are independent and, for a fixed seed, replay the
//! same sequence of picks.
//!
//! # Examples
//!
//! ```rust
//! use fitsim::simulation::{ScriptedWorkload, Simulation, SimulationConfig};
//! use fitsim::strategy::Strategy;
//!
//! let config = SimulationConfig::bitmap(32).iterations(4);
//! let mut sim = Simulation::new(config).unwrap();
//!
//! // Pick P1, P5, P1, P1: allocate, allocate, free, allocate.
//! let mut workload = ScriptedWorkload::new(vec![0, 4, 0, 0]);
//! let summary = sim.run(Strategy::FirstFit, &mut workload).unwrap();
//!
//! assert_eq!(summary.allocations, 3);
//! assert_eq!(summary.frees, 1);
//! assert_eq!(summary.final_snapshot.used(), 13);
//! ```

use crate::block_list::{BlockId, BlockList, BlockListConfig, MemoryBlock};
use crate::fragmentation::{analyze, FragmentationReport};
use crate::process::{Process, ProcessId, ProcessTable, Residency};
use crate::strategy::Strategy;
use crate::unit_map::UnitMap;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default unit map capacity.
pub const DEFAULT_CAPACITY: usize = 32;

/// Default events per run.
pub const DEFAULT_ITERATIONS: usize = 30;

/// Which memory model to simulate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryModel {
    /// Bit-per-unit map.
    Bitmap {
        /// Number of units.
        capacity: usize,
    },
    /// Fixed block partition.
    Blocks(BlockListConfig),
}

impl Default for MemoryModel {
    fn default() -> Self {
        Self::Bitmap {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Memory model and its size.
    pub memory: MemoryModel,

    /// Events per strategy run.
    pub iterations: usize,

    /// Strategies run by [`Simulation::run_all`], in order.
    pub strategies: Vec<Strategy>,

    /// Workload seed. `None` draws one seed per [`Simulation::run_all`].
    pub seed: Option<u64>,

    /// `(id, size)` of every process in the workload.
    pub processes: Vec<(u32, usize)>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            memory: MemoryModel::default(),
            iterations: DEFAULT_ITERATIONS,
            strategies: Strategy::ALL.to_vec(),
            seed: None,
            processes: ProcessTable::CLASSIC.to_vec(),
        }
    }
}

impl SimulationConfig {
    /// Unit map of `capacity` units, other settings default.
    pub fn bitmap(capacity: usize) -> Self {
        Self {
            memory: MemoryModel::Bitmap { capacity },
            ..Self::default()
        }
    }

    /// Block list, other settings default.
    pub fn blocks(config: BlockListConfig) -> Self {
        Self {
            memory: MemoryModel::Blocks(config),
            ..Self::default()
        }
    }

    /// Parse from JSON. Missing fields take their defaults.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fitsim::simulation::SimulationConfig;
    ///
    /// let config = SimulationConfig::from_json(
    ///     r#"{"iterations": 10, "strategies": ["best_fit"], "seed": 7}"#,
    /// )
    /// .unwrap();
    /// assert_eq!(config.iterations, 10);
    /// assert_eq!(config.processes.len(), 10);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Set events per run.
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set strategies.
    pub fn strategies(mut self, strategies: impl Into<Vec<Strategy>>) -> Self {
        self.strategies = strategies.into();
        self
    }

    /// Set workload seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set processes.
    pub fn processes(mut self, processes: impl Into<Vec<(u32, usize)>>) -> Self {
        self.processes = processes.into();
        self
    }

    /// Check the configuration is runnable.
    pub fn validate(&self) -> Result<()> {
        match &self.memory {
            MemoryModel::Bitmap { capacity: 0 } => {
                return Err(Error::config("capacity must be positive"));
            }
            MemoryModel::Bitmap { .. } => {}
            MemoryModel::Blocks(blocks) => blocks.validate()?,
        }
        if self.iterations == 0 {
            return Err(Error::config("iterations must be positive"));
        }
        if self.strategies.is_empty() {
            return Err(Error::config("at least one strategy is required"));
        }
        if self.processes.is_empty() {
            return Err(Error::config("at least one process is required"));
        }
        ProcessTable::new(&self.processes)?;
        Ok(())
    }
}

/// Source of process picks.
///
/// Any `FnMut(usize) -> usize` is a workload, so tests can inject picks
/// directly.
pub trait Workload {
    /// Index of the next process, in `0..process_count`.
    fn pick(&mut self, process_count: usize) -> usize;
}

impl<F> Workload for F
where
    F: FnMut(usize) -> usize,
{
    fn pick(&mut self, process_count: usize) -> usize {
        self(process_count)
    }
}

/// Uniform random picks from a seeded generator.
#[derive(Debug, Clone)]
pub struct SeededWorkload {
    rng: StdRng,
}

impl SeededWorkload {
    /// Create a workload replaying the sequence for `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Workload for SeededWorkload {
    fn pick(&mut self, process_count: usize) -> usize {
        self.rng.random_range(0..process_count)
    }
}

/// Fixed pick sequence, repeated when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedWorkload {
    picks: Vec<usize>,
    pos: usize,
}

impl ScriptedWorkload {
    /// Create from process indices.
    pub fn new(picks: Vec<usize>) -> Self {
        Self { picks, pos: 0 }
    }
}

impl Workload for ScriptedWorkload {
    fn pick(&mut self, process_count: usize) -> usize {
        if self.picks.is_empty() {
            return 0;
        }
        let pick = self.picks[self.pos % self.picks.len()];
        self.pos += 1;
        pick % process_count
    }
}

/// A memory model instance.
#[derive(Debug, Clone)]
pub enum Memory {
    /// Bit-per-unit map.
    Units(UnitMap),
    /// Block list.
    Blocks(BlockList),
}

impl Memory {
    /// Build the model described by `model`.
    pub fn from_model(model: &MemoryModel) -> Result<Self> {
        match model {
            MemoryModel::Bitmap { capacity } => UnitMap::new(*capacity).map(Self::Units),
            MemoryModel::Blocks(config) => BlockList::with_config(config.clone()).map(Self::Blocks),
        }
    }

    /// Ask `strategy` for a position for `requested` units.
    pub fn place(&mut self, strategy: Strategy, requested: usize) -> Option<usize> {
        match self {
            Self::Units(map) => strategy.place(map, requested),
            Self::Blocks(list) => strategy.place(list, requested),
        }
    }

    /// Allocate `process` at `position`.
    pub fn allocate(&mut self, position: usize, process: &Process) -> Result<Residency> {
        match self {
            Self::Units(map) => {
                map.allocate(position, process.size, process.id)?;
                Ok(Residency::Unit { start: position })
            }
            Self::Blocks(list) => {
                list.allocate(BlockId::new(position), process.id, process.size)?;
                Ok(Residency::Block { block: position })
            }
        }
    }

    /// Place `process` with `strategy` and allocate it there.
    ///
    /// Returns [`Error::PlacementFailed`] when the strategy finds no position.
    pub fn allocate_with(&mut self, strategy: Strategy, process: &Process) -> Result<Residency> {
        let position = self
            .place(strategy, process.size)
            .ok_or(Error::PlacementFailed {
                requested: process.size,
            })?;
        self.allocate(position, process)
    }

    /// Release the memory held by `process`.
    ///
    /// A unit map needs the process's start; a block list finds the block
    /// by owner.
    pub fn free(&mut self, process: &Process) -> Result<usize> {
        match self {
            Self::Units(map) => match process.residency() {
                Some(Residency::Unit { start }) => {
                    map.free(start, process.size, process.id)?;
                    Ok(start)
                }
                _ => Err(Error::OwnerNotFound(process.id)),
            },
            Self::Blocks(list) => list.free(process.id).map(|id| id.index()),
        }
    }

    /// Free-space report for a request of `requested` units.
    pub fn analyze(&self, requested: usize) -> FragmentationReport {
        match self {
            Self::Units(map) => analyze(map, requested),
            Self::Blocks(list) => analyze(list, requested),
        }
    }

    /// Units in use.
    pub fn used(&self) -> usize {
        match self {
            Self::Units(map) => map.occupancy_count(),
            Self::Blocks(list) => list.allocated_units(),
        }
    }

    /// Total units.
    pub fn capacity(&self) -> usize {
        match self {
            Self::Units(map) => map.capacity(),
            Self::Blocks(list) => list.capacity(),
        }
    }

    /// Read-only copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        match self {
            Self::Units(map) => Snapshot::Units {
                cells: map.bits(),
                used: map.occupancy_count(),
                capacity: map.capacity(),
            },
            Self::Blocks(list) => Snapshot::Blocks {
                blocks: list.blocks().to_vec(),
                used: list.allocated_units(),
                capacity: list.capacity(),
                internal_fragmentation: list.internal_fragmentation(),
            },
        }
    }

    /// Everything free, cursor rewound.
    pub fn reset(&mut self) {
        match self {
            Self::Units(map) => map.reset(),
            Self::Blocks(list) => list.reset(),
        }
    }
}

/// Read-only memory state after an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "model")]
pub enum Snapshot {
    /// Unit map state.
    Units {
        /// 0 = free, 1 = occupied.
        cells: Vec<u8>,
        /// Occupied units.
        used: usize,
        /// Total units.
        capacity: usize,
    },
    /// Block list state.
    Blocks {
        /// Blocks left to right.
        blocks: Vec<MemoryBlock>,
        /// Units in allocated blocks.
        used: usize,
        /// Total units.
        capacity: usize,
        /// Allocated-but-unused units.
        internal_fragmentation: usize,
    },
}

impl Snapshot {
    /// Units in use.
    pub const fn used(&self) -> usize {
        match self {
            Self::Units { used, .. } | Self::Blocks { used, .. } => *used,
        }
    }

    /// Total units.
    pub const fn capacity(&self) -> usize {
        match self {
            Self::Units { capacity, .. } | Self::Blocks { capacity, .. } => *capacity,
        }
    }

    /// Units not in use.
    pub const fn free(&self) -> usize {
        self.capacity() - self.used()
    }

    /// Calculate utilization as a fraction.
    pub fn utilization(&self) -> f64 {
        if self.capacity() == 0 {
            0.0
        } else {
            self.used() as f64 / self.capacity() as f64
        }
    }
}

/// What an event did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum EventOutcome {
    /// Process placed at a start unit or block index.
    Allocated {
        /// Start unit or block index.
        position: usize,
    },
    /// Resident process released its memory.
    Freed {
        /// Start unit or block index it held.
        position: usize,
    },
    /// No region for the process; it stays out of memory.
    PlacementFailed {
        /// Free-space analysis at the time of failure.
        report: FragmentationReport,
    },
    /// Memory had nothing owned by the process.
    OwnerNotFound,
}

impl EventOutcome {
    /// Check if the event ended in a failed placement.
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::PlacementFailed { .. })
    }
}

/// One simulated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// 1-based event number within the run.
    pub step: usize,
    /// Picked process.
    pub process: ProcessId,
    /// Its size.
    pub size: usize,
    /// Whether it was resident when picked.
    pub was_resident: bool,
    /// Result.
    pub outcome: EventOutcome,
    /// Memory after the event.
    pub snapshot: Snapshot,
}

/// Totals for one strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Strategy used.
    pub strategy: Strategy,
    /// Workload seed, when seeded.
    pub seed: Option<u64>,
    /// Every event, in order.
    pub events: Vec<Event>,
    /// Successful placements.
    pub allocations: usize,
    /// Frees.
    pub frees: usize,
    /// Failed placements.
    pub failures: usize,
    /// Failures diagnosed as external fragmentation.
    pub external_fragmentation: usize,
    /// Frees of processes memory did not know about.
    pub owner_not_found: usize,
    /// Highest units in use after any event.
    pub peak_used: usize,
    /// Memory after the last event.
    pub final_snapshot: Snapshot,
}

impl RunSummary {
    fn new(strategy: Strategy, seed: Option<u64>, initial: Snapshot) -> Self {
        Self {
            strategy,
            seed,
            events: Vec::new(),
            allocations: 0,
            frees: 0,
            failures: 0,
            external_fragmentation: 0,
            owner_not_found: 0,
            peak_used: initial.used(),
            final_snapshot: initial,
        }
    }

    fn record(&mut self, event: Event) {
        match &event.outcome {
            EventOutcome::Allocated { .. } => self.allocations += 1,
            EventOutcome::Freed { .. } => self.frees += 1,
            EventOutcome::PlacementFailed { report } => {
                self.failures += 1;
                if report.diagnosis.is_external_fragmentation() {
                    self.external_fragmentation += 1;
                }
            }
            EventOutcome::OwnerNotFound => self.owner_not_found += 1,
        }
        self.peak_used = self.peak_used.max(event.snapshot.used());
        self.final_snapshot = event.snapshot.clone();
        self.events.push(event);
    }

    /// Fraction of placement attempts that failed.
    pub fn failure_rate(&self) -> f64 {
        let attempts = self.allocations + self.failures;
        if attempts == 0 {
            0.0
        } else {
            self.failures as f64 / attempts as f64
        }
    }
}

/// A memory model plus the processes competing for it.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    memory: Memory,
    processes: ProcessTable,
}

impl Simulation {
    /// Create a simulation; validates `config`.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let memory = Memory::from_model(&config.memory)?;
        let processes = ProcessTable::new(&config.processes)?;
        if processes.max_size() > memory.capacity() {
            warn!(
                max_size = processes.max_size(),
                capacity = memory.capacity(),
                "largest process can never be placed"
            );
        }
        Ok(Self {
            config,
            memory,
            processes,
        })
    }

    /// Get configuration.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current memory.
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Current process table.
    pub const fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    /// Free all memory, rewind Next Fit, evict every process.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.processes.reset();
    }

    /// Apply one event to the process at `index`.
    ///
    /// Placement failure and owner-not-found are outcomes, not errors;
    /// `Err` means the memory model rejected an operation.
    pub fn step(&mut self, strategy: Strategy, index: usize) -> Result<EventOutcome> {
        let process = self
            .processes
            .get(index)
            .cloned()
            .ok_or(Error::UnknownProcess(index))?;

        let outcome = if process.is_resident() {
            match self.memory.free(&process) {
                Ok(position) => {
                    self.evict(index);
                    self.sync_block_residency();
                    EventOutcome::Freed { position }
                }
                Err(Error::OwnerNotFound(id)) => {
                    warn!(process = %id, "resident process owns no memory, evicting record");
                    self.evict(index);
                    EventOutcome::OwnerNotFound
                }
                Err(e) => return Err(e),
            }
        } else {
            match self.memory.allocate_with(strategy, &process) {
                Ok(residency) => {
                    if let Some(p) = self.processes.get_mut(index) {
                        p.admit(residency);
                    }
                    EventOutcome::Allocated {
                        position: residency.position(),
                    }
                }
                Err(Error::PlacementFailed { requested }) => {
                    let report = self.memory.analyze(requested);
                    warn!(
                        process = %process.id,
                        size = process.size,
                        total_free = report.total_free,
                        largest_free = report.largest_free,
                        "placement failed"
                    );
                    EventOutcome::PlacementFailed { report }
                }
                Err(e) => return Err(e),
            }
        };

        debug!(process = %process.id, %strategy, ?outcome, used = self.memory.used(), "event applied");
        Ok(outcome)
    }

    fn evict(&mut self, index: usize) {
        if let Some(p) = self.processes.get_mut(index) {
            p.evict();
        }
    }

    /// Re-read every resident block index; a coalescing free shifts blocks.
    fn sync_block_residency(&mut self) {
        let Memory::Blocks(list) = &self.memory else {
            return;
        };
        for process in self.processes.iter_mut().filter(|p| p.is_resident()) {
            if let Some(block) = list.owned_by(process.id) {
                process.admit(Residency::Block {
                    block: block.index(),
                });
            }
        }
    }

    /// Reset, then run the configured number of events with `strategy`.
    pub fn run<W: Workload>(&mut self, strategy: Strategy, workload: &mut W) -> Result<RunSummary> {
        self.run_seeded(strategy, workload, None)
    }

    fn run_seeded<W: Workload>(
        &mut self,
        strategy: Strategy,
        workload: &mut W,
        seed: Option<u64>,
    ) -> Result<RunSummary> {
        self.reset();
        info!(%strategy, iterations = self.config.iterations, ?seed, "starting run");

        let mut summary = RunSummary::new(strategy, seed, self.memory.snapshot());
        let count = self.processes.len();

        for step in 1..=self.config.iterations {
            let index = workload.pick(count);
            let process = self
                .processes
                .get(index)
                .ok_or(Error::UnknownProcess(index))?;
            let (id, size, was_resident) = (process.id, process.size, process.is_resident());

            let outcome = self.step(strategy, index)?;
            summary.record(Event {
                step,
                process: id,
                size,
                was_resident,
                outcome,
                snapshot: self.memory.snapshot(),
            });
        }

        info!(
            %strategy,
            allocations = summary.allocations,
            frees = summary.frees,
            failures = summary.failures,
            peak_used = summary.peak_used,
            "run finished"
        );
        Ok(summary)
    }

    /// Run every configured strategy with the same seeded workload.
    pub fn run_all(&mut self) -> Result<Vec<RunSummary>> {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let strategies = self.config.strategies.clone();
        strategies
            .into_iter()
            .map(|strategy| {
                let mut workload = SeededWorkload::new(seed);
                self.run_seeded(strategy, &mut workload, Some(seed))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragmentation::Diagnosis;

    fn bitmap_sim(capacity: usize, processes: &[(u32, usize)], iterations: usize) -> Simulation {
        let config = SimulationConfig::bitmap(capacity)
            .processes(processes.to_vec())
            .iterations(iterations);
        Simulation::new(config).unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = SimulationConfig::default();
        assert_eq!(config.memory, MemoryModel::Bitmap { capacity: 32 });
        assert_eq!(config.iterations, 30);
        assert_eq!(config.strategies, Strategy::ALL.to_vec());
        assert_eq!(config.processes.len(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate() {
        assert!(SimulationConfig::bitmap(0).validate().is_err());
        assert!(SimulationConfig::default().iterations(0).validate().is_err());
        assert!(SimulationConfig::default().strategies(Vec::new()).validate().is_err());
        assert!(SimulationConfig::default().processes(Vec::new()).validate().is_err());
        assert!(SimulationConfig::default().processes(vec![(1, 0)]).validate().is_err());
        assert!(SimulationConfig::blocks(BlockListConfig::with_sizes(Vec::new()))
            .validate()
            .is_err());
    }

    #[test]
    fn test_config_from_json_blocks() {
        let config = SimulationConfig::from_json(
            r#"{
                "memory": {"blocks": {"sizes": [100, 500], "coalesce_on_free": true}},
                "strategies": ["first_fit", "quick_fit"],
                "processes": [[1, 212], [2, 417]]
            }"#,
        )
        .unwrap();
        match &config.memory {
            MemoryModel::Blocks(blocks) => {
                assert_eq!(blocks.sizes, vec![100, 500]);
                assert!(blocks.coalesce_on_free);
            }
            other => panic!("unexpected model: {other:?}"),
        }
        assert_eq!(config.strategies, vec![Strategy::FirstFit, Strategy::QuickFit]);
        assert_eq!(config.iterations, DEFAULT_ITERATIONS);
    }

    #[test]
    fn test_config_from_json_rejects_invalid() {
        assert!(SimulationConfig::from_json("{").is_err());
        assert!(SimulationConfig::from_json(r#"{"strategies": ["buddy"]}"#).is_err());
        assert!(SimulationConfig::from_json(r#"{"iterations": 0}"#).is_err());
    }

    #[test]
    fn test_scripted_workload_cycles() {
        let mut workload = ScriptedWorkload::new(vec![1, 7]);
        assert_eq!(workload.pick(5), 1);
        assert_eq!(workload.pick(5), 2);
        assert_eq!(workload.pick(5), 1);
        assert_eq!(ScriptedWorkload::new(Vec::new()).pick(5), 0);
    }

    #[test]
    fn test_seeded_workload_reproducible() {
        let mut a = SeededWorkload::new(42);
        let mut b = SeededWorkload::new(42);
        let xs: Vec<usize> = (0..50).map(|_| a.pick(10)).collect();
        let ys: Vec<usize> = (0..50).map(|_| b.pick(10)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|&x| x < 10));
    }

    #[test]
    fn test_step_allocates_then_frees() {
        let mut sim = bitmap_sim(32, &[(1, 5), (2, 8)], 1);

        assert_eq!(
            sim.step(Strategy::FirstFit, 0).unwrap(),
            EventOutcome::Allocated { position: 0 }
        );
        assert_eq!(
            sim.step(Strategy::FirstFit, 1).unwrap(),
            EventOutcome::Allocated { position: 5 }
        );
        assert_eq!(sim.processes().get(1).unwrap().start(), Some(5));

        assert_eq!(
            sim.step(Strategy::FirstFit, 0).unwrap(),
            EventOutcome::Freed { position: 0 }
        );
        assert!(!sim.processes().get(0).unwrap().is_resident());
        assert_eq!(sim.memory().used(), 8);
    }

    #[test]
    fn test_step_unknown_process() {
        let mut sim = bitmap_sim(8, &[(1, 2)], 1);
        assert_eq!(sim.step(Strategy::BestFit, 3), Err(Error::UnknownProcess(3)));
    }

    #[test]
    fn test_step_placement_failure_reports_fragmentation() {
        // Fill 0..4 and 8..12, leaving holes of 4 at 4..8 and 12..16.
        let mut sim = bitmap_sim(16, &[(1, 4), (2, 4), (3, 4), (4, 4), (5, 6)], 1);
        for i in 0..4 {
            sim.step(Strategy::FirstFit, i).unwrap();
        }
        sim.step(Strategy::FirstFit, 1).unwrap();
        sim.step(Strategy::FirstFit, 3).unwrap();

        let outcome = sim.step(Strategy::FirstFit, 4).unwrap();
        match outcome {
            EventOutcome::PlacementFailed { report } => {
                assert_eq!(
                    report.diagnosis,
                    Diagnosis::ExternalFragmentation {
                        total_free: 8,
                        largest_free: 4
                    }
                );
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!sim.processes().get(4).unwrap().is_resident());
    }

    #[test]
    fn test_step_insufficient_memory() {
        let mut sim = bitmap_sim(8, &[(1, 6), (2, 4)], 1);
        sim.step(Strategy::WorstFit, 0).unwrap();
        let outcome = sim.step(Strategy::WorstFit, 1).unwrap();
        assert_eq!(
            outcome,
            EventOutcome::PlacementFailed {
                report: FragmentationReport::new(4, 2, 2)
            }
        );
    }

    #[test]
    fn test_run_resets_between_strategies() {
        let mut sim = bitmap_sim(32, &[(1, 5), (2, 8)], 2);
        let mut picks = ScriptedWorkload::new(vec![0, 1]);
        let first = sim.run(Strategy::FirstFit, &mut picks).unwrap();
        assert_eq!(first.final_snapshot.used(), 13);

        let mut picks = ScriptedWorkload::new(vec![0, 1]);
        let second = sim.run(Strategy::WorstFit, &mut picks).unwrap();
        assert_eq!(second.allocations, 2);
        assert_eq!(second.final_snapshot.used(), 13);
    }

    #[test]
    fn test_run_accepts_closure_workload() {
        let mut sim = bitmap_sim(16, &[(1, 3), (2, 3), (3, 3)], 6);
        let mut n = 0;
        let mut workload = |count: usize| {
            n += 1;
            n % count
        };
        let summary = sim.run(Strategy::NextFit, &mut workload).unwrap();
        assert_eq!(summary.events.len(), 6);
        assert_eq!(summary.events[0].process, ProcessId::new(2));
        assert_eq!(summary.allocations + summary.frees + summary.failures, 6);
    }

    #[test]
    fn test_run_events_conserve_units() {
        let mut sim = Simulation::new(SimulationConfig::default().seed(9)).unwrap();
        for summary in sim.run_all().unwrap() {
            assert_eq!(summary.events.len(), 30);
            for event in &summary.events {
                let Snapshot::Units { cells, used, capacity } = &event.snapshot else {
                    panic!("bitmap model expected");
                };
                assert_eq!(*capacity, 32);
                assert_eq!(cells.iter().filter(|&&c| c == 1).count(), *used);
            }
        }
    }

    #[test]
    fn test_run_all_same_seed_same_picks() {
        let mut sim = Simulation::new(SimulationConfig::default().seed(1234)).unwrap();
        let summaries = sim.run_all().unwrap();
        assert_eq!(summaries.len(), 5);

        let picks: Vec<Vec<ProcessId>> = summaries
            .iter()
            .map(|s| s.events.iter().map(|e| e.process).collect())
            .collect();
        for other in &picks[1..] {
            assert_eq!(other, &picks[0]);
        }
        assert!(summaries.iter().all(|s| s.seed == Some(1234)));
    }

    #[test]
    fn test_run_all_reproducible() {
        let config = SimulationConfig::default().seed(77);
        let a = Simulation::new(config.clone()).unwrap().run_all().unwrap();
        let b = Simulation::new(config).unwrap().run_all().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_block_model_run() {
        let config = SimulationConfig::blocks(BlockListConfig::classic())
            .processes(vec![(1, 212), (2, 417), (3, 112), (4, 426)])
            .iterations(4);
        let mut sim = Simulation::new(config).unwrap();
        let mut picks = ScriptedWorkload::new(vec![0, 1, 2, 3]);
        let summary = sim.run(Strategy::FirstFit, &mut picks).unwrap();

        let positions: Vec<&EventOutcome> = summary.events.iter().map(|e| &e.outcome).collect();
        assert_eq!(positions[0], &EventOutcome::Allocated { position: 1 });
        assert_eq!(positions[1], &EventOutcome::Allocated { position: 4 });
        assert_eq!(positions[2], &EventOutcome::Allocated { position: 2 });
        assert!(positions[3].is_failure());
        assert_eq!(summary.external_fragmentation, 0);

        let Snapshot::Blocks {
            used,
            internal_fragmentation,
            ..
        } = summary.final_snapshot
        else {
            panic!("block model expected");
        };
        assert_eq!(used, 1300);
        assert_eq!(internal_fragmentation, 288 + 183 + 88);
    }

    #[test]
    fn test_block_model_free_by_owner() {
        let config = SimulationConfig::blocks(BlockListConfig::classic()).processes(vec![(7, 50)]);
        let mut sim = Simulation::new(config).unwrap();
        assert_eq!(
            sim.step(Strategy::BestFit, 0).unwrap(),
            EventOutcome::Allocated { position: 0 }
        );
        assert_eq!(
            sim.step(Strategy::BestFit, 0).unwrap(),
            EventOutcome::Freed { position: 0 }
        );
    }

    #[test]
    fn test_summary_failure_rate() {
        let mut sim = bitmap_sim(4, &[(1, 3), (2, 3)], 2);
        let mut picks = ScriptedWorkload::new(vec![0, 1]);
        let summary = sim.run(Strategy::FirstFit, &mut picks).unwrap();
        assert_eq!(summary.failures, 1);
        assert!((summary.failure_rate() - 0.5).abs() < 1e-9);
        assert_eq!(summary.peak_used, 3);
    }

    #[test]
    fn test_coalescing_free_moves_residency() {
        let blocks = BlockListConfig::with_sizes([10, 10, 10]).coalesce_on_free(true);
        let config = SimulationConfig::blocks(blocks)
            .processes(vec![(1, 10), (2, 10), (3, 10)])
            .iterations(5);
        let mut sim = Simulation::new(config).unwrap();
        let mut picks = ScriptedWorkload::new(vec![0, 1, 2, 0, 1]);
        sim.run(Strategy::FirstFit, &mut picks).unwrap();

        let Memory::Blocks(list) = sim.memory() else {
            panic!("block model configured");
        };
        assert_eq!(list.len(), 2);
        assert_eq!(list.owned_by(ProcessId::new(3)), Some(BlockId::new(1)));

        let p3 = sim.processes().find(ProcessId::new(3)).unwrap();
        assert_eq!(p3.residency(), Some(Residency::Block { block: 1 }));
        assert_eq!(p3.start(), Some(1));
    }

    #[test]
    fn test_residency_stable_without_coalescing() {
        let config = SimulationConfig::blocks(BlockListConfig::with_sizes([10, 10, 10]))
            .processes(vec![(1, 10), (2, 10), (3, 10)])
            .iterations(5);
        let mut sim = Simulation::new(config).unwrap();
        let mut picks = ScriptedWorkload::new(vec![0, 1, 2, 0, 1]);
        sim.run(Strategy::FirstFit, &mut picks).unwrap();

        let p3 = sim.processes().find(ProcessId::new(3)).unwrap();
        assert_eq!(p3.start(), Some(2));
    }

    #[test]
    fn test_allocate_with_reports_placement_failure() {
        let mut memory = Memory::from_model(&MemoryModel::Bitmap { capacity: 4 }).unwrap();
        let big = Process::new(1, 8);
        assert_eq!(
            memory.allocate_with(Strategy::BestFit, &big),
            Err(Error::PlacementFailed { requested: 8 })
        );
        assert_eq!(memory.used(), 0);

        let small = Process::new(2, 3);
        assert_eq!(
            memory.allocate_with(Strategy::FirstFit, &small),
            Ok(Residency::Unit { start: 0 })
        );
        assert_eq!(memory.used(), 3);
    }

    #[test]
    fn test_summary_serializes() {
        let mut sim = bitmap_sim(8, &[(1, 2)], 1);
        let mut picks = ScriptedWorkload::new(vec![0]);
        let summary = sim.run(Strategy::QuickFit, &mut picks).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["strategy"], "quick_fit");
        assert_eq!(json["events"][0]["outcome"]["outcome"], "allocated");
        assert_eq!(json["final_snapshot"]["model"], "units");
    }
}
