//! Weighted grid mazes: positions, cells, loading and generation.
//!
//! The grid is read-only once built. Decoders consume it through
//! [`Grid::is_open`], [`Grid::weight`] and the start/goal positions.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A (row, col) cell coordinate. Signed so that neighbor arithmetic can step
/// off the edge and be rejected by [`Grid::is_open`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Manhattan distance to another position.
    pub fn manhattan(&self, other: Position) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// The four orthogonal neighbors in fixed order: up, down, left, right.
    ///
    /// Every decoder iterates neighbors in this order, which is what makes
    /// tie-breaking deterministic.
    pub fn neighbors(&self) -> [Position; 4] {
        [
            Position::new(self.row - 1, self.col),
            Position::new(self.row + 1, self.col),
            Position::new(self.row, self.col - 1),
            Position::new(self.row, self.col + 1),
        ]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    /// Impassable.
    Wall,
    /// Passable with the given traversal cost.
    Open(u32),
}

impl Cell {
    pub fn is_open(&self) -> bool {
        matches!(self, Cell::Open(_))
    }
}

/// Grid construction and parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("Grid has no cells")]
    Empty,
    #[error("Row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Invalid token {token:?} on row {row}")]
    InvalidToken { row: usize, token: String },
    #[error("{name} position {position} lies outside the grid")]
    OutOfBounds { name: &'static str, position: Position },
    #[error("Failed to read grid: {0}")]
    Io(#[from] std::io::Error),
}

/// Immutable weighted grid with a start and a goal cell.
#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    start: Position,
    goal: Position,
    cost_ceiling: f64,
}

impl Grid {
    /// Build a grid from row-major cell rows.
    ///
    /// A start or goal that is not open with cost 0 is reported with
    /// `log::warn!` but accepted; decoders degrade such grids to penalty
    /// scores instead of failing.
    pub fn new(rows: Vec<Vec<Cell>>, start: Position, goal: Position) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if height == 0 || width == 0 {
            return Err(GridError::Empty);
        }

        let mut cells = Vec::with_capacity(height * width);
        for (row, data) in rows.into_iter().enumerate() {
            if data.len() != width {
                return Err(GridError::Ragged {
                    row,
                    expected: width,
                    found: data.len(),
                });
            }
            cells.extend(data);
        }

        let cost_ceiling = cells
            .iter()
            .map(|c| match c {
                Cell::Open(w) => *w as f64,
                Cell::Wall => 0.0,
            })
            .sum();

        let grid = Self {
            rows: height,
            cols: width,
            cells,
            start,
            goal,
            cost_ceiling,
        };

        for (name, position) in [("Start", start), ("Goal", goal)] {
            if grid.index(position).is_none() {
                return Err(GridError::OutOfBounds { name, position });
            }
        }

        if !grid.is_well_formed() {
            log::warn!(
                "Start {} or goal {} is not an open zero-cost cell; decoding will be penalized",
                start,
                goal
            );
        }

        Ok(grid)
    }

    /// Read a grid from a text file (see [`FromStr`] for the format).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let text = std::fs::read_to_string(path)?;
        text.parse()
    }

    /// Generate a random maze that is guaranteed to be solvable.
    ///
    /// Walls are scattered at `wall_density`, open cells get weights in
    /// `1..=max_weight`, then a random right/down corridor is carved from the
    /// top-left corner (start) to the bottom-right corner (goal).
    pub fn generate_solvable<R: Rng>(
        rows: usize,
        cols: usize,
        wall_density: f64,
        max_weight: u32,
        rng: &mut R,
    ) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::Empty);
        }
        let max_weight = max_weight.max(1);
        let mut data: Vec<Vec<Cell>> = (0..rows)
            .map(|_| {
                (0..cols)
                    .map(|_| {
                        if rng.gen_bool(wall_density.clamp(0.0, 1.0)) {
                            Cell::Wall
                        } else {
                            Cell::Open(rng.gen_range(1..=max_weight))
                        }
                    })
                    .collect()
            })
            .collect();

        let (mut r, mut c) = (0, 0);
        while r != rows - 1 || c != cols - 1 {
            if data[r][c] == Cell::Wall {
                data[r][c] = Cell::Open(rng.gen_range(1..=max_weight));
            }
            let move_down = if r == rows - 1 {
                false
            } else if c == cols - 1 {
                true
            } else {
                rng.gen_bool(0.5)
            };
            if move_down {
                r += 1;
            } else {
                c += 1;
            }
        }

        data[0][0] = Cell::Open(0);
        data[rows - 1][cols - 1] = Cell::Open(0);

        Self::new(
            data,
            Position::new(0, 0),
            Position::new(rows as i32 - 1, cols as i32 - 1),
        )
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of cells (`rows * cols`).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn goal(&self) -> Position {
        self.goal
    }

    /// Row-major index of a position, `None` when out of bounds.
    #[inline]
    pub fn index(&self, pos: Position) -> Option<usize> {
        if pos.row < 0 || pos.col < 0 {
            return None;
        }
        let (r, c) = (pos.row as usize, pos.col as usize);
        (r < self.rows && c < self.cols).then(|| r * self.cols + c)
    }

    /// Position of a row-major index.
    #[inline]
    pub fn position(&self, index: usize) -> Position {
        Position::new((index / self.cols) as i32, (index % self.cols) as i32)
    }

    pub fn cell(&self, pos: Position) -> Option<Cell> {
        self.index(pos).map(|i| self.cells[i])
    }

    /// False for walls and out-of-bounds positions.
    #[inline]
    pub fn is_open(&self, pos: Position) -> bool {
        matches!(self.cell(pos), Some(Cell::Open(_)))
    }

    /// Traversal cost of an open cell; 0 for walls and out-of-bounds.
    #[inline]
    pub fn weight(&self, pos: Position) -> u32 {
        match self.cell(pos) {
            Some(Cell::Open(w)) => w,
            _ => 0,
        }
    }

    /// Open orthogonal neighbors, in [`Position::neighbors`] order.
    pub fn open_neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        pos.neighbors().into_iter().filter(|n| self.is_open(*n))
    }

    /// Whether start and goal are open cells of cost 0.
    pub fn is_well_formed(&self) -> bool {
        self.cell(self.start) == Some(Cell::Open(0)) && self.cell(self.goal) == Some(Cell::Open(0))
    }

    /// Upper bound on the real cost of any simple path: the summed weight of
    /// every open cell.
    pub fn cost_ceiling(&self) -> f64 {
        self.cost_ceiling
    }

    /// Penalty floor for failed decodes. Strictly above [`Grid::cost_ceiling`].
    pub fn base_penalty(&self) -> f64 {
        self.cost_ceiling + (self.rows * self.cols * 10) as f64
    }

    /// Real cost of a start-to-goal route, or `None` if the route is not a
    /// contiguous chain of open cells from start to goal.
    pub fn path_cost(&self, path: &[Position]) -> Option<f64> {
        let (first, last) = (path.first()?, path.last()?);
        if *first != self.start || *last != self.goal {
            return None;
        }
        if !path.iter().all(|p| self.is_open(*p)) {
            return None;
        }
        if path.windows(2).any(|w| w[0].manhattan(w[1]) != 1) {
            return None;
        }
        Some(path.iter().map(|p| self.weight(*p) as f64).sum())
    }
}

/// Text format: one row per line. Integers are cell weights (`-1` is a wall),
/// `#` is a wall, `S` and `G` mark start and goal (weight 0). Quotes, commas,
/// semicolons and whitespace separate tokens. Without `S`/`G` the start is
/// `(1, 1)` and the goal `(rows - 2, cols - 2)`.
impl FromStr for Grid {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rows: Vec<Vec<Cell>> = Vec::new();
        let mut start = None;
        let mut goal = None;

        for line in s.lines() {
            let row_idx = rows.len();
            let mut row = Vec::new();
            let mut chars = line.chars().peekable();

            while let Some(ch) = chars.next() {
                match ch {
                    '"' | ',' | ';' => {}
                    c if c.is_whitespace() => {}
                    '#' => row.push(Cell::Wall),
                    'S' => {
                        start = Some(Position::new(row_idx as i32, row.len() as i32));
                        row.push(Cell::Open(0));
                    }
                    'G' => {
                        goal = Some(Position::new(row_idx as i32, row.len() as i32));
                        row.push(Cell::Open(0));
                    }
                    '-' | '0'..='9' => {
                        let mut token = String::from(ch);
                        while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                            token.push(*d);
                            chars.next();
                        }
                        let value: i64 = token.parse().map_err(|_| GridError::InvalidToken {
                            row: row_idx,
                            token: token.clone(),
                        })?;
                        let cell = match value {
                            -1 => Cell::Wall,
                            v if (0..=u32::MAX as i64).contains(&v) => Cell::Open(v as u32),
                            _ => {
                                return Err(GridError::InvalidToken {
                                    row: row_idx,
                                    token,
                                });
                            }
                        };
                        row.push(cell);
                    }
                    other => {
                        return Err(GridError::InvalidToken {
                            row: row_idx,
                            token: other.to_string(),
                        });
                    }
                }
            }

            if !row.is_empty() {
                rows.push(row);
            }
        }

        let height = rows.len() as i32;
        let width = rows.first().map_or(0, Vec::len) as i32;
        let start = start.unwrap_or(Position::new(1, 1));
        let goal = goal.unwrap_or(Position::new(height - 2, width - 2));

        Grid::new(rows, start, goal)
    }
}

/// Writes the text format read by [`FromStr`].
///
/// Well-formed grids (start and goal on distinct zero-weight open cells)
/// round-trip exactly. The format has no way to express anything else: the
/// start and goal are always written as `S` and `G`, so their underlying
/// cells reparse as weight 0, and when start equals goal only `S` is written
/// and the goal reparses at its default position.
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            let line: Vec<String> = (0..self.cols)
                .map(|c| {
                    let pos = Position::new(r as i32, c as i32);
                    if pos == self.start {
                        "S".to_string()
                    } else if pos == self.goal {
                        "G".to_string()
                    } else {
                        match self.cells[r * self.cols + c] {
                            Cell::Wall => "#".to_string(),
                            Cell::Open(w) => w.to_string(),
                        }
                    }
                })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const CORRIDOR: &str = "\
# # # # #
# S 1 1 #
# # # 1 #
# # # G #
# # # # #
";

    #[test]
    fn test_parse_symbols() {
        let grid: Grid = CORRIDOR.parse().unwrap();
        assert_eq!(grid.rows(), 5);
        assert_eq!(grid.cols(), 5);
        assert_eq!(grid.start(), Position::new(1, 1));
        assert_eq!(grid.goal(), Position::new(3, 3));
        assert!(grid.is_well_formed());
        assert!(!grid.is_open(Position::new(0, 0)));
        assert!(grid.is_open(Position::new(1, 2)));
        assert_eq!(grid.weight(Position::new(2, 3)), 1);
    }

    #[test]
    fn test_parse_quoted_numeric_rows() {
        let text = "\"-1\",\"-1\",\"-1\"\n\"-1\",\"0\",\"-1\"\n\"-1\",\"-1\",\"-1\"\n";
        let grid: Grid = text.parse().unwrap();
        assert_eq!(grid.len(), 9);
        // Defaults: start (1,1), goal (rows-2, cols-2).
        assert_eq!(grid.start(), Position::new(1, 1));
        assert_eq!(grid.goal(), Position::new(1, 1));
    }

    #[test]
    fn test_display_round_trips_well_formed_grids() {
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = Grid::generate_solvable(9, 13, 0.3, 9, &mut rng).unwrap();
            assert!(grid.is_well_formed());

            let text = grid.to_string();
            let reparsed: Grid = text.parse().unwrap();
            assert_eq!(reparsed.start(), grid.start());
            assert_eq!(reparsed.goal(), grid.goal());
            for i in 0..grid.len() {
                let pos = grid.position(i);
                assert_eq!(reparsed.cell(pos), grid.cell(pos));
            }
            assert_eq!(reparsed.to_string(), text);
        }
    }

    #[test]
    fn test_out_of_bounds_is_closed() {
        let grid: Grid = CORRIDOR.parse().unwrap();
        assert!(!grid.is_open(Position::new(-1, 0)));
        assert!(!grid.is_open(Position::new(0, 5)));
        assert_eq!(grid.weight(Position::new(9, 9)), 0);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = "1 1 1\n1 1\n".parse::<Grid>().unwrap_err();
        assert!(matches!(err, GridError::Ragged { row: 1, .. }));
    }

    #[test]
    fn test_invalid_token_rejected() {
        let err = "1 x 1\n".parse::<Grid>().unwrap_err();
        assert!(matches!(err, GridError::InvalidToken { row: 0, .. }));

        let err = "1 -5 1\n".parse::<Grid>().unwrap_err();
        assert!(matches!(err, GridError::InvalidToken { .. }));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!("".parse::<Grid>(), Err(GridError::Empty)));
    }

    #[test]
    fn test_malformed_start_is_accepted() {
        // Start on a wall is only a warning.
        let grid = Grid::new(
            vec![vec![Cell::Wall, Cell::Open(0)]],
            Position::new(0, 0),
            Position::new(0, 1),
        )
        .unwrap();
        assert!(!grid.is_well_formed());
    }

    #[test]
    fn test_start_out_of_bounds_rejected() {
        let err = Grid::new(
            vec![vec![Cell::Open(0), Cell::Open(0)]],
            Position::new(3, 0),
            Position::new(0, 1),
        )
        .unwrap_err();
        assert!(matches!(err, GridError::OutOfBounds { name: "Start", .. }));
    }

    #[test]
    fn test_path_cost() {
        let grid: Grid = CORRIDOR.parse().unwrap();
        let path = [
            Position::new(1, 1),
            Position::new(1, 2),
            Position::new(1, 3),
            Position::new(2, 3),
            Position::new(3, 3),
        ];
        assert_eq!(grid.path_cost(&path), Some(3.0));
        assert_eq!(grid.path_cost(&path[..3]), None);

        let jump = [Position::new(1, 1), Position::new(3, 3)];
        assert_eq!(grid.path_cost(&jump), None);
    }

    #[test]
    fn test_penalty_dominates_ceiling() {
        let grid: Grid = CORRIDOR.parse().unwrap();
        assert_eq!(grid.cost_ceiling(), 3.0);
        assert!(grid.base_penalty() > grid.cost_ceiling());
    }

    #[test]
    fn test_generate_solvable_corners() {
        let mut rng = StdRng::seed_from_u64(7);
        let grid = Grid::generate_solvable(12, 9, 0.4, 9, &mut rng).unwrap();
        assert_eq!(grid.start(), Position::new(0, 0));
        assert_eq!(grid.goal(), Position::new(11, 8));
        assert!(grid.is_well_formed());
    }

    #[test]
    fn test_display_roundtrip() {
        let grid: Grid = CORRIDOR.parse().unwrap();
        let reparsed: Grid = grid.to_string().parse().unwrap();
        assert_eq!(reparsed.start(), grid.start());
        assert_eq!(reparsed.goal(), grid.goal());
        assert_eq!(reparsed.cost_ceiling(), grid.cost_ceiling());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maze.txt");
        std::fs::write(&path, CORRIDOR).unwrap();

        let grid = Grid::load(&path).unwrap();
        assert_eq!(grid.goal(), Position::new(3, 3));

        let missing = Grid::load(dir.path().join("missing.txt"));
        assert!(matches!(missing, Err(GridError::Io(_))));
    }
}
