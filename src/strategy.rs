//! Placement strategies.
//!
//! Five classic placement policies over any memory model that can list its
//! free regions left to right. Placement only decides where a request
//! goes; the caller performs the allocation afterwards. The one exception
//! to statelessness is Next Fit, whose cursor lives in the memory model.
//!
//! # Key Concepts
//!
//! A *region* is a maximal run of free units (unit map) or a free block
//! (block list). Its *leftover* for a request is `size - requested`.
//!
//! | Strategy | Picks |
//! |----------|-------|
//! | First Fit | leftmost region that fits |
//! | Next Fit | first fit scanning circularly from the cursor |
//! | Best Fit | smallest leftover, leftmost on ties |
//! | Quick Fit | exact size if any, otherwise model-specific fallback |
//! | Worst Fit | largest leftover, leftmost on ties |
//!
//! # Examples
//!
//! ```rust
//! use fitsim::strategy::Strategy;
//! use fitsim::unit_map::UnitMap;
//!
//! let mut map = UnitMap::new(32).unwrap();
//! let start = Strategy::FirstFit.place(&mut map, 5).unwrap();
//! assert_eq!(start, 0);
//! ```

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A free region offered to a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeRegion {
    /// First unit of a run, or block index.
    pub position: usize,

    /// Free units in the region.
    pub size: usize,
}

impl FreeRegion {
    /// Create a region.
    pub const fn new(position: usize, size: usize) -> Self {
        Self { position, size }
    }

    /// Unused units if `requested` were placed here, `None` if it does not fit.
    ///
    /// A zero request never fits.
    pub const fn leftover(&self, requested: usize) -> Option<usize> {
        if requested == 0 || self.size < requested {
            None
        } else {
            Some(self.size - requested)
        }
    }

    /// Whether `requested` fits.
    pub const fn fits(&self, requested: usize) -> bool {
        self.leftover(requested).is_some()
    }
}

/// A memory model strategies can place into.
pub trait FreeSpace {
    /// Iterator over free regions, left to right.
    type Regions<'a>: Iterator<Item = FreeRegion>
    where
        Self: 'a;

    /// Free regions, left to right.
    fn free_regions(&self) -> Self::Regions<'_>;

    /// Total units managed.
    fn capacity(&self) -> usize;

    /// Next Fit scan. Moves the model's cursor on success only.
    fn next_fit(&mut self, requested: usize) -> Option<usize>;

    /// Quick Fit lookup. Exact match first, then First Fit.
    fn quick_fit(&self, requested: usize) -> Option<usize> {
        exact_fit(self.free_regions(), requested).or_else(|| first_fit(self.free_regions(), requested))
    }

    /// Sum of free region sizes.
    fn total_free(&self) -> usize {
        self.free_regions().map(|r| r.size).sum()
    }

    /// Size of the largest free region, 0 when full.
    fn largest_free(&self) -> usize {
        self.free_regions().map(|r| r.size).max().unwrap_or(0)
    }
}

/// Leftmost region that fits.
pub fn first_fit<I>(regions: I, requested: usize) -> Option<usize>
where
    I: IntoIterator<Item = FreeRegion>,
{
    regions
        .into_iter()
        .find(|r| r.fits(requested))
        .map(|r| r.position)
}

/// Leftmost region whose size equals `requested`.
pub fn exact_fit<I>(regions: I, requested: usize) -> Option<usize>
where
    I: IntoIterator<Item = FreeRegion>,
{
    regions
        .into_iter()
        .find(|r| r.leftover(requested) == Some(0))
        .map(|r| r.position)
}

/// Region with the smallest leftover; the first one wins ties.
pub fn best_fit<I>(regions: I, requested: usize) -> Option<usize>
where
    I: IntoIterator<Item = FreeRegion>,
{
    let mut best: Option<(usize, usize)> = None;
    for region in regions {
        if let Some(leftover) = region.leftover(requested) {
            match best {
                Some((_, min)) if leftover >= min => {}
                _ => best = Some((region.position, leftover)),
            }
        }
    }
    best.map(|(position, _)| position)
}

/// Region with the largest leftover; the first one wins ties.
pub fn worst_fit<I>(regions: I, requested: usize) -> Option<usize>
where
    I: IntoIterator<Item = FreeRegion>,
{
    let mut worst: Option<(usize, usize)> = None;
    for region in regions {
        if let Some(leftover) = region.leftover(requested) {
            match worst {
                Some((_, max)) if leftover <= max => {}
                _ => worst = Some((region.position, leftover)),
            }
        }
    }
    worst.map(|(position, _)| position)
}

/// Placement strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Leftmost region that fits.
    FirstFit,
    /// First fit resuming from where the last placement ended.
    NextFit,
    /// Tightest region.
    BestFit,
    /// Exact-size lookup with fallback.
    QuickFit,
    /// Loosest region.
    WorstFit,
}

impl Strategy {
    /// Every strategy, in report order.
    pub const ALL: [Strategy; 5] = [
        Self::FirstFit,
        Self::NextFit,
        Self::BestFit,
        Self::QuickFit,
        Self::WorstFit,
    ];

    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FirstFit => "First Fit",
            Self::NextFit => "Next Fit",
            Self::BestFit => "Best Fit",
            Self::QuickFit => "Quick Fit",
            Self::WorstFit => "Worst Fit",
        }
    }

    /// Choose a position for `requested` units.
    ///
    /// Returns a start unit for a unit map or a block index for a block
    /// list. `None` when nothing fits, including `requested == 0` and
    /// `requested > capacity`.
    pub fn place<S: FreeSpace>(&self, space: &mut S, requested: usize) -> Option<usize> {
        if requested == 0 || requested > space.capacity() {
            return None;
        }
        match self {
            Self::FirstFit => first_fit(space.free_regions(), requested),
            Self::NextFit => space.next_fit(requested),
            Self::BestFit => best_fit(space.free_regions(), requested),
            Self::QuickFit => space.quick_fit(requested),
            Self::WorstFit => worst_fit(space.free_regions(), requested),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    /// Accepts "First Fit", "first_fit", "first-fit" and similar spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "firstfit" => Ok(Self::FirstFit),
            "nextfit" => Ok(Self::NextFit),
            "bestfit" => Ok(Self::BestFit),
            "quickfit" => Ok(Self::QuickFit),
            "worstfit" => Ok(Self::WorstFit),
            _ => Err(Error::config(format!("unknown strategy: {s}"))),
        }
    }
}
