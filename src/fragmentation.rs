//! Fragmentation analysis for failed placements.
//!
//! When a request cannot be placed, the free space is summarized by its
//! total size and its largest contiguous region, which is enough to tell
//! external fragmentation apart from plain exhaustion.
//!
//! The report is informational; it never changes an allocation outcome.
//!
//! # Examples
//!
//! ```rust
//! use fitsim::fragmentation::{analyze, Diagnosis};
//! use fitsim::process::ProcessId;
//! use fitsim::unit_map::UnitMap;
//!
//! let mut map = UnitMap::new(10).unwrap();
//! map.allocate(3, 2, ProcessId::new(1)).unwrap();
//!
//! // 8 units free, but the largest hole is 5.
//! let report = analyze(&map, 6);
//! assert_eq!(
//!     report.diagnosis,
//!     Diagnosis::ExternalFragmentation { total_free: 8, largest_free: 5 }
//! );
//! ```

use crate::strategy::FreeSpace;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a request could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Diagnosis {
    /// Enough free units in total, but no single region is large enough.
    ExternalFragmentation {
        /// Sum of free region sizes.
        total_free: usize,
        /// Largest free region.
        largest_free: usize,
    },
    /// Fewer free units than requested.
    InsufficientMemory {
        /// Sum of free region sizes.
        total_free: usize,
    },
    /// A large enough region exists but the strategy does not consider it.
    StrategyMiss {
        /// Sum of free region sizes.
        total_free: usize,
        /// Largest free region.
        largest_free: usize,
    },
}

impl Diagnosis {
    /// Classify from the two free-space measurements.
    pub const fn classify(requested: usize, total_free: usize, largest_free: usize) -> Self {
        if total_free < requested {
            Self::InsufficientMemory { total_free }
        } else if largest_free < requested {
            Self::ExternalFragmentation {
                total_free,
                largest_free,
            }
        } else {
            Self::StrategyMiss {
                total_free,
                largest_free,
            }
        }
    }

    /// Check if this is external fragmentation.
    pub const fn is_external_fragmentation(&self) -> bool {
        matches!(self, Self::ExternalFragmentation { .. })
    }
}

/// Free-space summary for one failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentationReport {
    /// Units requested.
    pub requested: usize,
    /// Sum of free region sizes.
    pub total_free: usize,
    /// Largest free region.
    pub largest_free: usize,
    /// Classification.
    pub diagnosis: Diagnosis,
}

impl FragmentationReport {
    /// Build a report from measurements.
    pub const fn new(requested: usize, total_free: usize, largest_free: usize) -> Self {
        Self {
            requested,
            total_free,
            largest_free,
            diagnosis: Diagnosis::classify(requested, total_free, largest_free),
        }
    }

    /// `1 - largest_free / total_free`, clamped to `[0, 1]`.
    ///
    /// 0 means all free space is one region; values near 1 mean it is
    /// scattered. 0 when nothing is free.
    pub fn fragmentation_ratio(&self) -> f64 {
        fragmentation_ratio(self.total_free, self.largest_free)
    }
}

impl fmt::Display for FragmentationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.diagnosis {
            Diagnosis::ExternalFragmentation {
                total_free,
                largest_free,
            } => write!(
                f,
                "external fragmentation: {total_free} units free in total, but the largest hole is {largest_free} (needed: {})",
                self.requested
            ),
            Diagnosis::InsufficientMemory { total_free } => write!(
                f,
                "memory full: not enough physical memory ({total_free} free, needed: {})",
                self.requested
            ),
            Diagnosis::StrategyMiss {
                total_free,
                largest_free,
            } => write!(
                f,
                "strategy miss: a {largest_free}-unit region exists ({total_free} free in total) but was not eligible (needed: {})",
                self.requested
            ),
        }
    }
}

/// Measure `space` for a request of `requested` units.
pub fn analyze<S: FreeSpace>(space: &S, requested: usize) -> FragmentationReport {
    FragmentationReport::new(requested, space.total_free(), space.largest_free())
}

/// `1 - largest / total`, clamped to `[0, 1]`; 0 when `total` is 0.
pub fn fragmentation_ratio(total_free: usize, largest_free: usize) -> f64 {
    if total_free == 0 {
        return 0.0;
    }
    let largest = largest_free.min(total_free) as f64;
    (1.0 - largest / total_free as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_list::{BlockId, BlockList};
    use crate::process::ProcessId;
    use crate::strategy::Strategy;
    use crate::unit_map::UnitMap;

    #[test]
    fn test_classify_external() {
        assert_eq!(
            Diagnosis::classify(6, 8, 5),
            Diagnosis::ExternalFragmentation {
                total_free: 8,
                largest_free: 5
            }
        );
    }

    #[test]
    fn test_classify_insufficient() {
        assert_eq!(
            Diagnosis::classify(9, 8, 8),
            Diagnosis::InsufficientMemory { total_free: 8 }
        );
    }

    #[test]
    fn test_classify_exact_total_is_fragmentation() {
        assert!(Diagnosis::classify(8, 8, 4).is_external_fragmentation());
    }

    #[test]
    fn test_classify_strategy_miss() {
        assert_eq!(
            Diagnosis::classify(5, 20, 10),
            Diagnosis::StrategyMiss {
                total_free: 20,
                largest_free: 10
            }
        );
    }

    #[test]
    fn test_analyze_full_map() {
        let mut map = UnitMap::new(4).unwrap();
        map.allocate(0, 4, ProcessId::new(1)).unwrap();
        let report = analyze(&map, 1);
        assert_eq!(report.total_free, 0);
        assert_eq!(report.largest_free, 0);
        assert_eq!(report.diagnosis, Diagnosis::InsufficientMemory { total_free: 0 });
        assert_eq!(report.fragmentation_ratio(), 0.0);
    }

    #[test]
    fn test_analyze_block_list_no_merge() {
        let mut memory = BlockList::new(&[10, 10, 10]).unwrap();
        memory.allocate(BlockId::new(1), ProcessId::new(1), 10).unwrap();
        let report = analyze(&memory, 15);
        assert_eq!(report.total_free, 20);
        assert_eq!(report.largest_free, 10);
        assert!(report.diagnosis.is_external_fragmentation());
    }

    #[test]
    fn test_analyze_quick_fit_miss() {
        let mut memory = BlockList::new(&[100, 200, 600]).unwrap();
        memory.allocate(BlockId::new(1), ProcessId::new(1), 150).unwrap();
        assert_eq!(Strategy::QuickFit.place(&mut memory, 150), None);
        let report = analyze(&memory, 150);
        assert!(matches!(report.diagnosis, Diagnosis::StrategyMiss { largest_free: 600, .. }));
    }

    #[test]
    fn test_fragmentation_ratio() {
        assert_eq!(fragmentation_ratio(0, 0), 0.0);
        assert_eq!(fragmentation_ratio(10, 10), 0.0);
        assert!((fragmentation_ratio(10, 4) - 0.6).abs() < 1e-9);
        assert_eq!(fragmentation_ratio(10, 50), 0.0);
    }

    #[test]
    fn test_report_display() {
        let report = FragmentationReport::new(6, 8, 5);
        assert_eq!(
            report.to_string(),
            "external fragmentation: 8 units free in total, but the largest hole is 5 (needed: 6)"
        );
        let report = FragmentationReport::new(9, 3, 3);
        assert_eq!(
            report.to_string(),
            "memory full: not enough physical memory (3 free, needed: 9)"
        );
    }

    #[test]
    fn test_diagnosis_serde() {
        let json = serde_json::to_value(Diagnosis::InsufficientMemory { total_free: 2 }).unwrap();
        assert_eq!(json["kind"], "insufficient_memory");
        assert_eq!(json["total_free"], 2);
    }
}
