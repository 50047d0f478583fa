//! Plain-text rendering of simulation results.
//!
//! Purely presentational: every function takes finished results and returns
//! a `String`, leaving the choice of output stream to the caller.

use crate::simulation::{Event, EventOutcome, RunSummary, Snapshot};
use crate::strategy::Strategy;
use std::fmt::Write;

/// One-line memory state.
///
/// # Examples
///
/// ```rust
/// use fitsim::report::render_snapshot;
/// use fitsim::simulation::Snapshot;
///
/// let snapshot = Snapshot::Units { cells: vec![1, 1, 0, 0], used: 2, capacity: 4 };
/// assert_eq!(render_snapshot(&snapshot), "Map: [1, 1, 0, 0] | Used: 2/4");
/// ```
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    match snapshot {
        Snapshot::Units {
            cells,
            used,
            capacity,
        } => format!("Map: {cells:?} | Used: {used}/{capacity}"),
        Snapshot::Blocks {
            blocks,
            used,
            capacity,
            internal_fragmentation,
        } => {
            let blocks: Vec<String> = blocks.iter().map(ToString::to_string).collect();
            format!(
                "{} | Used: {used}/{capacity} | Internal waste: {internal_fragmentation}",
                blocks.join(" ")
            )
        }
    }
}

/// Outcome line(s) for one event.
pub fn render_outcome(outcome: &EventOutcome) -> String {
    match outcome {
        EventOutcome::Allocated { position } => format!(">> SUCCESS: allocated at index {position}"),
        EventOutcome::Freed { position } => format!(">> FREED: released index {position}"),
        EventOutcome::PlacementFailed { report } => {
            format!(">> FAILURE: no contiguous space large enough.\n   [!] {report}")
        }
        EventOutcome::OwnerNotFound => ">> WARNING: process owns no memory".to_string(),
    }
}

/// Full block for one event: header, outcome, memory state.
pub fn render_event(event: &Event, iterations: usize, strategy: Strategy) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "[{}/{}] Picked {} ({} units). ",
        event.step, iterations, event.process, event.size
    );
    if event.was_resident {
        let _ = writeln!(out, "Status: IN MEMORY -> freeing...");
    } else {
        let _ = writeln!(out, "Status: NOT IN MEMORY -> trying to allocate ({strategy})...");
    }
    let _ = writeln!(out, "{}", render_outcome(&event.outcome));
    let _ = write!(out, "{}", render_snapshot(&event.snapshot));
    out
}

/// Every event of a run, preceded by a banner.
pub fn render_run(summary: &RunSummary) -> String {
    let rule = "#".repeat(50);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "SIMULATION: {}", summary.strategy.name().to_uppercase());
    let _ = writeln!(out, "{rule}");
    for event in &summary.events {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            render_event(event, summary.events.len(), summary.strategy)
        );
    }
    let _ = writeln!(out);
    let _ = write!(out, "{}", render_summary(summary));
    out
}

/// Totals of one run.
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Summary for {}:", summary.strategy);
    if let Some(seed) = summary.seed {
        let _ = writeln!(out, "  Seed: {seed}");
    }
    let _ = writeln!(out, "  Allocations: {}", summary.allocations);
    let _ = writeln!(out, "  Frees: {}", summary.frees);
    let _ = writeln!(
        out,
        "  Failures: {} ({} external fragmentation)",
        summary.failures, summary.external_fragmentation
    );
    let _ = writeln!(
        out,
        "  Peak usage: {}/{}",
        summary.peak_used,
        summary.final_snapshot.capacity()
    );
    let _ = writeln!(out, "  Final: {}", render_snapshot(&summary.final_snapshot));
    out
}

/// Side-by-side table of several runs.
pub fn render_comparison(summaries: &[RunSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:>6} {:>6} {:>8} {:>9} {:>6} {:>10}",
        "Strategy", "Alloc", "Free", "Failed", "ExtFrag", "Peak", "FailRate"
    );
    let _ = writeln!(out, "{}", "-".repeat(61));
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<10} {:>6} {:>6} {:>8} {:>9} {:>6} {:>9.1}%",
            s.strategy.name(),
            s.allocations,
            s.frees,
            s.failures,
            s.external_fragmentation,
            s.peak_used,
            s.failure_rate() * 100.0
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_list::MemoryBlock;
    use crate::fragmentation::FragmentationReport;
    use crate::process::ProcessId;
    use crate::simulation::{ScriptedWorkload, Simulation, SimulationConfig};

    #[test]
    fn test_render_units_snapshot() {
        let snapshot = Snapshot::Units {
            cells: vec![0, 1, 1],
            used: 2,
            capacity: 3,
        };
        assert_eq!(render_snapshot(&snapshot), "Map: [0, 1, 1] | Used: 2/3");
    }

    #[test]
    fn test_render_blocks_snapshot() {
        let mut taken = MemoryBlock::new(500);
        taken.owner = Some(ProcessId::new(1));
        taken.used = 212;
        let snapshot = Snapshot::Blocks {
            blocks: vec![MemoryBlock::new(100), taken],
            used: 500,
            capacity: 600,
            internal_fragmentation: 288,
        };
        assert_eq!(
            render_snapshot(&snapshot),
            "[Free | 100] [P1 | 500] | Used: 500/600 | Internal waste: 288"
        );
    }

    #[test]
    fn test_render_outcome() {
        assert_eq!(
            render_outcome(&EventOutcome::Allocated { position: 5 }),
            ">> SUCCESS: allocated at index 5"
        );
        let failed = EventOutcome::PlacementFailed {
            report: FragmentationReport::new(6, 8, 5),
        };
        assert!(render_outcome(&failed).contains("external fragmentation"));
        assert!(render_outcome(&EventOutcome::OwnerNotFound).contains("WARNING"));
    }

    #[test]
    fn test_render_run_and_comparison() {
        let config = SimulationConfig::bitmap(8).processes(vec![(1, 3)]).iterations(2);
        let mut sim = Simulation::new(config).unwrap();
        let mut picks = ScriptedWorkload::new(vec![0]);
        let summary = sim.run(Strategy::BestFit, &mut picks).unwrap();

        let text = render_run(&summary);
        assert!(text.contains("SIMULATION: BEST FIT"));
        assert!(text.contains("[1/2] Picked P1 (3 units). Status: NOT IN MEMORY"));
        assert!(text.contains("[2/2] Picked P1 (3 units). Status: IN MEMORY"));
        assert!(text.contains("Allocations: 1"));

        let table = render_comparison(&[summary]);
        assert_eq!(table.lines().count(), 3);
        assert!(table.lines().nth(2).unwrap().starts_with("Best Fit"));
    }
}
