//! Grid coordinates and orthogonal directions shared by the grid puzzles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cell position. Signed so that stepping off the edge is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub row: i32,
    pub col: i32,
}

impl Pos {
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dr, dc) = direction.delta();
        Self {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    #[must_use]
    pub const fn manhattan(self, other: Pos) -> u32 {
        manhattan(self, other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Enumeration order; also the tie-break order for move selection.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// `(row, col)` offset of one step.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }

    /// Accepts labels in any case, `w/a/s/d`, and `u/l/r`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "up" | "u" | "w" => Some(Direction::Up),
            "down" | "s" => Some(Direction::Down),
            "left" | "l" | "a" => Some(Direction::Left),
            "right" | "r" | "d" => Some(Direction::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[must_use]
pub const fn in_bounds(pos: Pos, width: usize, height: usize) -> bool {
    pos.row >= 0 && pos.col >= 0 && (pos.row as usize) < height && (pos.col as usize) < width
}

#[must_use]
pub const fn manhattan(a: Pos, b: Pos) -> u32 {
    a.row.abs_diff(b.row) + a.col.abs_diff(b.col)
}

#[cfg(test)]
mod tests {
    use super::{Direction, Pos, in_bounds, manhattan};

    #[test]
    fn step_applies_delta() {
        let origin = Pos::new(3, 3);
        assert_eq!(origin.step(Direction::Up), Pos::new(2, 3));
        assert_eq!(origin.step(Direction::Right), Pos::new(3, 4));
    }

    #[test]
    fn bounds_reject_negative_and_overflow() {
        assert!(in_bounds(Pos::new(0, 0), 10, 10));
        assert!(in_bounds(Pos::new(9, 9), 10, 10));
        assert!(!in_bounds(Pos::new(-1, 0), 10, 10));
        assert!(!in_bounds(Pos::new(0, 10), 10, 10));
    }

    #[test]
    fn manhattan_is_symmetric() {
        let a = Pos::new(1, 8);
        let b = Pos::new(7, 2);
        assert_eq!(manhattan(a, b), 12);
        assert_eq!(b.manhattan(a), 12);
    }

    #[test]
    fn parse_accepts_wasd_and_labels() {
        assert_eq!(Direction::parse("W"), Some(Direction::Up));
        assert_eq!(Direction::parse("right"), Some(Direction::Right));
        assert_eq!(Direction::parse("d"), Some(Direction::Right));
        assert_eq!(Direction::parse(" S "), Some(Direction::Down));
        assert_eq!(Direction::parse("jump"), None);
    }
}
