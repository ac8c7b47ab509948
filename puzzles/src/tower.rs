//! Block towers and a single-axis static stability check.
//!
//! Row 0 is the ground row. A row supports everything strictly above it when
//! the combined center of mass lies inside the closed interval spanned by the
//! row's own blocks, each block counted as a unit-width interval.

use duel_types::{AnswerKey, Domain, PuzzleError, PuzzleInstance};
use rand::Rng;
use thiserror::Error;

pub const DEFAULT_WIDTH: usize = 9;
pub const DEFAULT_HEIGHT: usize = 6;
pub const MIN_WIDTH: usize = 3;
pub const MAX_SPAN: usize = 3;
pub const EARLY_STOP_PROBABILITY: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TowerError {
    #[error("tower needs at least one row")]
    Empty,
    #[error("row {row} is {got} cells wide, expected {expected}")]
    RaggedRow {
        row: usize,
        got: usize,
        expected: usize,
    },
    #[error("unexpected cell {0:?}; use '#' for a block and '.' for empty")]
    BadCell(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Stable,
    /// First support row (from the bottom) whose load falls outside its span.
    Unstable { row: usize },
}

impl Stability {
    #[must_use]
    pub const fn is_stable(self) -> bool {
        matches!(self, Stability::Stable)
    }
}

/// Occupied interval of one row, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub min: usize,
    pub max: usize,
}

impl Span {
    #[must_use]
    pub const fn width(self) -> usize {
        self.max - self.min + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tower {
    width: usize,
    /// `grid[row][col]`, row 0 at the bottom.
    grid: Vec<Vec<bool>>,
}

impl Tower {
    /// Build a random tower bottom-up from a single centered base block.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, width: usize, height: usize) -> Self {
        let width = width.max(MIN_WIDTH);
        let height = height.max(1);
        let mut grid = vec![vec![false; width]; height];
        grid[0][width / 2] = true;
        let mut tower = Self { width, grid };

        for row in 0..height - 1 {
            let Some(below) = tower.support_span(row) else {
                break;
            };
            let grow = rng.random_bool(0.5);
            let next_width = if grow {
                below.width() + 1
            } else {
                below.width().saturating_sub(1)
            }
            .clamp(1, MAX_SPAN);
            let shift = rng.random_range(-1_i64..=1) as isize;
            let start = below.min.saturating_add_signed(shift).min(width - next_width);

            for col in start..start + next_width {
                tower.grid[row + 1][col] = true;
            }
            if rng.random_bool(EARLY_STOP_PROBABILITY) {
                break;
            }
        }

        tower
    }

    /// Parse rows drawn top-first with `#` for blocks and `.` for empty cells.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, TowerError> {
        let Some(first) = rows.first() else {
            return Err(TowerError::Empty);
        };
        let width = first.as_ref().chars().count();
        let mut grid = Vec::with_capacity(rows.len());
        for (row, line) in rows.iter().rev().enumerate() {
            let cells = line
                .as_ref()
                .chars()
                .map(|ch| match ch {
                    '#' => Ok(true),
                    '.' => Ok(false),
                    other => Err(TowerError::BadCell(other)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            if cells.len() != width {
                return Err(TowerError::RaggedRow {
                    row,
                    got: cells.len(),
                    expected: width,
                });
            }
            grid.push(cells);
        }
        Ok(Self { width, grid })
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.grid.len()
    }

    #[must_use]
    pub fn is_occupied(&self, row: usize, col: usize) -> bool {
        self.grid.get(row).and_then(|r| r.get(col)).copied().unwrap_or(false)
    }

    /// Leftmost and rightmost occupied columns of `row`, or `None` if empty.
    ///
    /// Gaps inside the row are ignored; the generator only builds contiguous rows.
    #[must_use]
    pub fn support_span(&self, row: usize) -> Option<Span> {
        let cells = self.grid.get(row)?;
        let min = cells.iter().position(|&c| c)?;
        let max = cells.iter().rposition(|&c| c)?;
        Some(Span { min, max })
    }

    /// Walk support rows bottom-up and report the first that cannot hold its load.
    #[must_use]
    pub fn evaluate(&self) -> Stability {
        for row in 0..self.height().saturating_sub(1) {
            let (mass, col_sum) = self.load_above(row);
            if mass == 0 {
                break;
            }
            let Some(span) = self.support_span(row) else {
                return Stability::Unstable { row };
            };
            // center = (col_sum + mass / 2) / mass, compared in doubled integers
            let doubled_center = 2 * col_sum + mass;
            let lo = 2 * span.min * mass;
            let hi = 2 * (span.max + 1) * mass;
            if doubled_center < lo || doubled_center > hi {
                return Stability::Unstable { row };
            }
        }
        Stability::Stable
    }

    /// Horizontal center of mass of everything strictly above `row`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn center_of_mass_above(&self, row: usize) -> Option<f64> {
        let (mass, col_sum) = self.load_above(row);
        if mass == 0 {
            return None;
        }
        Some((col_sum as f64 + mass as f64 * 0.5) / mass as f64)
    }

    /// `(block count, sum of block columns)` for rows strictly above `row`.
    fn load_above(&self, row: usize) -> (usize, usize) {
        self.grid
            .iter()
            .skip(row + 1)
            .flat_map(|cells| cells.iter().enumerate().filter(|(_, c)| **c))
            .fold((0, 0), |(mass, sum), (col, _)| (mass + 1, sum + col))
    }

    /// Side view, top row first; only rows with blocks plus the ground row.
    #[must_use]
    pub fn render(&self) -> String {
        let mut art = String::new();
        for (row, cells) in self.grid.iter().enumerate().rev() {
            if row != 0 && !cells.iter().any(|&c| c) {
                continue;
            }
            for &cell in cells {
                art.push_str(if cell { "[#]" } else { " . " });
            }
            art.push('\n');
        }
        art.push_str(&"=".repeat(self.width * 3));
        art.push_str(" (Ground)");
        art
    }

    /// Yes/No question; index 0 ("Yes") is right for a stable tower.
    pub fn into_instance(self) -> Result<PuzzleInstance, PuzzleError> {
        let art = self.render();
        let verdict = self.evaluate();
        tracing::debug!(?verdict, height = self.height(), "tower evaluated");

        let prompt = format!(
            "Physics Challenge:\nLook at this side-view of a block tower. Blocks are marked [#].\n\
             Gravity pulls straight down.\n\n{art}\n\nIs this tower stable? (Answer Yes or No)"
        );
        let correct = usize::from(!verdict.is_stable());
        let key = AnswerKey::choice(vec!["Yes".into(), "No".into()], correct)?;
        PuzzleInstance::new(Domain::Physics, prompt, key, art)
    }
}
