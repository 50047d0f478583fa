//! Bit-per-unit occupancy map.
//!
//! Memory is a fixed array of units, each free or occupied. Processes take
//! a contiguous range of units sized exactly to their request, so the map
//! has no internal fragmentation; free space splits into *runs* instead.
//!
//! # Key Concepts
//!
//! - A run is a maximal stretch of free units.
//! - Freeing a range makes its units part of whatever runs surround it, so
//!   runs merge naturally.
//! - The Next Fit cursor lives here and is cleared by [`UnitMap::reset`].

use crate::process::ProcessId;
use crate::strategy::{FreeRegion, FreeSpace};
use crate::{Error, Result};
use tracing::debug;

/// Fixed-size occupancy map.
///
/// # Examples
///
/// ```rust
/// use fitsim::process::ProcessId;
/// use fitsim::unit_map::UnitMap;
///
/// let mut map = UnitMap::new(16).unwrap();
/// map.allocate(2, 4, ProcessId::new(1)).unwrap();
///
/// assert_eq!(map.occupancy_count(), 4);
/// let runs: Vec<_> = map.runs_of_free().collect();
/// assert_eq!(runs, vec![(0, 2), (6, 10)]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMap {
    cells: Vec<bool>,
    cursor: usize,
}

impl UnitMap {
    /// Create an all-free map of `total` units.
    pub fn new(total: usize) -> Result<Self> {
        if total == 0 {
            return Err(Error::config("unit map capacity must be positive"));
        }
        Ok(Self {
            cells: vec![false; total],
            cursor: 0,
        })
    }

    /// Number of units.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Occupancy flags, `true` = occupied.
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Occupancy as 0/1 values.
    pub fn bits(&self) -> Vec<u8> {
        self.cells.iter().map(|&c| u8::from(c)).collect()
    }

    /// Whether `[start, start + length)` lies in bounds and is entirely free.
    pub fn is_free(&self, start: usize, length: usize) -> bool {
        match start.checked_add(length) {
            Some(end) if end <= self.cells.len() => self.cells[start..end].iter().all(|&c| !c),
            _ => false,
        }
    }

    fn range(&self, start: usize, length: usize) -> Result<std::ops::Range<usize>> {
        let end = start.saturating_add(length);
        if end > self.cells.len() {
            return Err(Error::OutOfBounds {
                start,
                end,
                capacity: self.cells.len(),
            });
        }
        Ok(start..end)
    }

    /// Mark `[start, start + length)` occupied by `owner`.
    ///
    /// Fails without touching the map if the range is out of bounds or any
    /// unit in it is already occupied.
    pub fn allocate(&mut self, start: usize, length: usize, owner: ProcessId) -> Result<()> {
        let range = self.range(start, length)?;
        if self.cells[range.clone()].iter().any(|&c| c) {
            return Err(Error::AlreadyOccupied { start, length });
        }
        self.cells[range].fill(true);
        debug!(%owner, start, length, "allocated units");
        Ok(())
    }

    /// Mark `[start, start + length)` free.
    ///
    /// Fails without touching the map if any unit in the range is already
    /// free, which means the caller's residency bookkeeping is wrong.
    pub fn free(&mut self, start: usize, length: usize, owner: ProcessId) -> Result<()> {
        let range = self.range(start, length)?;
        if self.cells[range.clone()].iter().any(|&c| !c) {
            return Err(Error::NotResident { start, length });
        }
        self.cells[range].fill(false);
        debug!(%owner, start, length, "freed units");
        Ok(())
    }

    /// Number of occupied units.
    pub fn occupancy_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Number of free units.
    pub fn free_count(&self) -> usize {
        self.cells.len() - self.occupancy_count()
    }

    /// Maximal free runs as `(start, length)`, left to right.
    pub fn runs_of_free(&self) -> FreeRuns<'_> {
        FreeRuns {
            cells: &self.cells,
            pos: 0,
        }
    }

    /// Where the next Next Fit scan begins. May equal the capacity.
    pub const fn next_fit_cursor(&self) -> usize {
        self.cursor
    }

    /// Free every unit and rewind the Next Fit cursor.
    pub fn reset(&mut self) {
        self.cells.fill(false);
        self.cursor = 0;
    }
}

/// Iterator over maximal free runs of a [`UnitMap`].
#[derive(Debug, Clone)]
pub struct FreeRuns<'a> {
    cells: &'a [bool],
    pos: usize,
}

impl Iterator for FreeRuns<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.cells.get(self.pos..)?;
        let start = self.pos + rest.iter().position(|&c| !c)?;
        let length = self.cells[start..]
            .iter()
            .position(|&c| c)
            .unwrap_or(self.cells.len() - start);
        self.pos = start + length;
        Some((start, length))
    }
}

fn run_to_region((start, length): (usize, usize)) -> FreeRegion {
    FreeRegion::new(start, length)
}

impl FreeSpace for UnitMap {
    type Regions<'a> = std::iter::Map<FreeRuns<'a>, fn((usize, usize)) -> FreeRegion>;

    fn free_regions(&self) -> Self::Regions<'_> {
        self.runs_of_free()
            .map(run_to_region as fn((usize, usize)) -> FreeRegion)
    }

    fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Circular scan of start positions beginning at the cursor.
    ///
    /// A cursor past the last start that could fit wraps to 0 before the
    /// first probe. At most `capacity` positions are probed.
    fn next_fit(&mut self, requested: usize) -> Option<usize> {
        let total = self.cells.len();
        if requested == 0 || requested > total {
            return None;
        }
        let last = total - requested;
        let from = if self.cursor > last { 0 } else { self.cursor };

        let found = (from..=last)
            .chain(0..from)
            .find(|&start| self.is_free(start, requested))?;
        self.cursor = found + requested;
        Some(found)
    }

    fn total_free(&self) -> usize {
        self.free_count()
    }
}
