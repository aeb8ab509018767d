//! Shared dead-end memo for one grid.
//!
//! Every decode of every genome can mark cells that provably cannot lead to
//! the goal. Marks only ever go from false to true within a run, so the
//! bitmap is a lock-free atomic bit array: concurrent writers may race, but a
//! lost or duplicated write can only cost a pruning opportunity, never
//! correctness.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::schema::{Grid, Position};

const WORD_BITS: usize = 64;

/// Monotone, concurrently writable set of dead-end cells.
pub struct DeadEndRegistry {
    words: Box<[AtomicU64]>,
    rows: usize,
    cols: usize,
    start: Option<usize>,
    goal: Option<usize>,
}

impl DeadEndRegistry {
    /// Empty registry sized and scoped to `grid`.
    pub fn new(grid: &Grid) -> Self {
        let len = grid.len();
        let words = (0..len.div_ceil(WORD_BITS))
            .map(|_| AtomicU64::new(0))
            .collect();

        Self {
            words,
            rows: grid.rows(),
            cols: grid.cols(),
            start: grid.index(grid.start()),
            goal: grid.index(grid.goal()),
        }
    }

    /// Number of cells covered.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn index(&self, pos: Position) -> Option<usize> {
        if pos.row < 0 || pos.col < 0 {
            return None;
        }
        let (r, c) = (pos.row as usize, pos.col as usize);
        (r < self.rows && c < self.cols).then(|| r * self.cols + c)
    }

    /// Whether `pos` is known to be a dead end. Out-of-bounds is never one.
    #[inline]
    pub fn is_dead_end(&self, pos: Position) -> bool {
        self.index(pos).is_some_and(|i| self.is_dead_end_index(i))
    }

    #[inline]
    pub fn is_dead_end_index(&self, index: usize) -> bool {
        let word = self.words[index / WORD_BITS].load(Ordering::Relaxed);
        word & (1 << (index % WORD_BITS)) != 0
    }

    /// Mark `pos` as a dead end. Start, goal and out-of-bounds positions are
    /// refused. Returns true if this call set the bit.
    pub fn mark_dead_end(&self, pos: Position) -> bool {
        let Some(index) = self.index(pos) else {
            return false;
        };
        if Some(index) == self.start || Some(index) == self.goal {
            return false;
        }
        let mask = 1u64 << (index % WORD_BITS);
        let previous = self.words[index / WORD_BITS].fetch_or(mask, Ordering::Relaxed);
        previous & mask == 0
    }

    /// Apply the retreat rule after a walk backs out of `cell`: the cell is a
    /// dead end when at most one open neighbor (the one retreated to) is not
    /// already a dead end.
    pub fn record_retreat(&self, grid: &Grid, cell: Position) -> bool {
        if cell == grid.start() {
            return false;
        }
        let live_exits = grid
            .open_neighbors(cell)
            .filter(|n| !self.is_dead_end(*n))
            .count();

        if live_exits <= 1 && self.mark_dead_end(cell) {
            log::trace!("dead end at {}", cell);
            return true;
        }
        false
    }

    /// Forget every mark (new run on the same grid).
    pub fn reset(&self) {
        for word in self.words.iter() {
            word.store(0, Ordering::Relaxed);
        }
    }

    /// Number of marked cells.
    pub fn count(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Marked cells, in row-major order.
    pub fn positions(&self) -> Vec<Position> {
        (0..self.len())
            .filter(|&i| self.is_dead_end_index(i))
            .map(|i| Position::new((i / self.cols) as i32, (i % self.cols) as i32))
            .collect()
    }
}

impl std::fmt::Debug for DeadEndRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadEndRegistry")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("marked", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;

    // A dead-end spur hanging off a corridor at (3, 1).
    const SPUR: &str = "\
# # # # # #
# S 1 1 1 #
# 1 # # 1 #
# 1 # # G #
# # # # # #
";

    #[test]
    fn test_mark_and_query() {
        let grid: Grid = SPUR.parse().unwrap();
        let registry = DeadEndRegistry::new(&grid);
        let cell = Position::new(3, 1);

        assert!(!registry.is_dead_end(cell));
        assert!(registry.mark_dead_end(cell));
        assert!(!registry.mark_dead_end(cell), "second write is a no-op");
        assert!(registry.is_dead_end(cell));
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.positions(), vec![cell]);
    }

    #[test]
    fn test_refuses_start_goal_and_out_of_bounds() {
        let grid: Grid = SPUR.parse().unwrap();
        let registry = DeadEndRegistry::new(&grid);

        assert!(!registry.mark_dead_end(grid.start()));
        assert!(!registry.mark_dead_end(grid.goal()));
        assert!(!registry.mark_dead_end(Position::new(-1, 2)));
        assert!(!registry.mark_dead_end(Position::new(2, 40)));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_retreat_rule_cascades_down_spur() {
        let grid: Grid = SPUR.parse().unwrap();
        let registry = DeadEndRegistry::new(&grid);

        // Tip of the spur has one open neighbor.
        assert!(registry.record_retreat(&grid, Position::new(3, 1)));
        // Next cell up now has one live exit left (the start).
        assert!(registry.record_retreat(&grid, Position::new(2, 1)));
        // Corridor cells keep two live exits.
        assert!(!registry.record_retreat(&grid, Position::new(1, 2)));
        assert!(!registry.record_retreat(&grid, grid.start()));
    }

    #[test]
    fn test_reset_clears_marks() {
        let grid: Grid = SPUR.parse().unwrap();
        let registry = DeadEndRegistry::new(&grid);
        registry.mark_dead_end(Position::new(3, 1));
        registry.reset();
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_concurrent_writers() {
        let mut rng = StdRng::seed_from_u64(3);
        let grid = Grid::generate_solvable(40, 40, 0.3, 5, &mut rng).unwrap();
        let registry = Arc::new(DeadEndRegistry::new(&grid));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    for i in 0..registry.len() {
                        if i % 3 == 0 {
                            registry.mark_dead_end(Position::new((i / 40) as i32, (i % 40) as i32));
                        }
                    }
                });
            }
        });

        let expected = (0..grid.len())
            .filter(|i| i % 3 == 0)
            .filter(|&i| Some(i) != grid.index(grid.start()) && Some(i) != grid.index(grid.goal()))
            .count();
        assert_eq!(registry.count(), expected);
    }

    proptest! {
        #[test]
        fn prop_never_marks_start_or_goal(
            seed in any::<u64>(),
            rows in 2usize..12,
            cols in 2usize..12,
            retreats in proptest::collection::vec((0i32..12, 0i32..12), 0..200),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = Grid::generate_solvable(rows, cols, 0.35, 9, &mut rng).unwrap();
            let registry = DeadEndRegistry::new(&grid);

            for (r, c) in retreats {
                let pos = Position::new(r, c);
                registry.record_retreat(&grid, pos);
                registry.mark_dead_end(pos);
            }

            prop_assert!(!registry.is_dead_end(grid.start()));
            prop_assert!(!registry.is_dead_end(grid.goal()));
        }
    }
}
