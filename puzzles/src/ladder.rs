//! Ladder networks (Amidakuji): parallel wires shorted by random bridges.
//!
//! Tracing a start label down the ladder always yields a permutation of end
//! labels because no two adjacent bridge slots in one row are ever both set.

use duel_types::{AnswerKey, Domain, PuzzleError, PuzzleInstance};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

pub const MIN_WIRES: usize = 6;
pub const MAX_WIRES: usize = 8;
pub const MIN_HEIGHT: usize = 12;
pub const BRIDGE_PROBABILITY: f64 = 0.65;
/// Options offered per question, the correct one included.
pub const OPTION_COUNT: usize = 4;

const START_LABELS: [char; MAX_WIRES] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LadderError {
    #[error("ladder needs between {MIN_WIRES} and {MAX_WIRES} wires (got {0})")]
    WireCount(usize),
    #[error("row {row} has {got} bridge slots, expected {expected}")]
    RowWidth {
        row: usize,
        got: usize,
        expected: usize,
    },
    #[error("row {row} has adjacent bridges at slots {slot} and {}", slot + 1)]
    AdjacentBridges { row: usize, slot: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderNetwork {
    num_wires: usize,
    /// `bridges[r][c]` shorts wires `c` and `c + 1` at row `r`.
    bridges: Vec<Vec<bool>>,
}

impl LadderNetwork {
    /// Random network. Requests below the floors are raised; wire counts above
    /// the label alphabet are lowered.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, num_wires: usize, height: usize) -> Self {
        let num_wires = num_wires.clamp(MIN_WIRES, MAX_WIRES);
        let height = height.max(MIN_HEIGHT);

        let bridges = (0..height)
            .map(|_| {
                let mut row = vec![false; num_wires - 1];
                for slot in 0..row.len() {
                    let drawn = rng.random_bool(BRIDGE_PROBABILITY);
                    if drawn && !(slot > 0 && row[slot - 1]) {
                        row[slot] = true;
                    }
                }
                row
            })
            .collect();

        Self { num_wires, bridges }
    }

    /// Build from an explicit bridge table, validating the adjacency invariant.
    pub fn from_bridges(num_wires: usize, bridges: Vec<Vec<bool>>) -> Result<Self, LadderError> {
        if !(MIN_WIRES..=MAX_WIRES).contains(&num_wires) {
            return Err(LadderError::WireCount(num_wires));
        }
        for (row, slots) in bridges.iter().enumerate() {
            if slots.len() != num_wires - 1 {
                return Err(LadderError::RowWidth {
                    row,
                    got: slots.len(),
                    expected: num_wires - 1,
                });
            }
            if let Some(slot) = slots.windows(2).position(|pair| pair[0] && pair[1]) {
                return Err(LadderError::AdjacentBridges { row, slot });
            }
        }
        Ok(Self { num_wires, bridges })
    }

    #[must_use]
    pub const fn num_wires(&self) -> usize {
        self.num_wires
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.bridges.len()
    }

    #[must_use]
    pub fn bridges(&self) -> &[Vec<bool>] {
        &self.bridges
    }

    /// Follow wire `start` (0-based) to the bottom and return the end wire.
    #[must_use]
    pub fn trace(&self, start: usize) -> usize {
        let mut wire = start;
        for row in &self.bridges {
            if wire > 0 && row[wire - 1] {
                wire -= 1;
            } else if wire < self.num_wires - 1 && row[wire] {
                wire += 1;
            }
        }
        wire
    }

    /// `(start label, end label)` for every wire, in start order.
    #[must_use]
    pub fn solution(&self) -> Vec<(char, String)> {
        (0..self.num_wires)
            .map(|start| (start_label(start), end_label(self.trace(start))))
            .collect()
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut art = String::new();
        let header: Vec<String> = (0..self.num_wires).map(|w| start_label(w).to_string()).collect();
        art.push(' ');
        art.push_str(&header.join("   "));
        art.push('\n');

        for row in &self.bridges {
            art.push(' ');
            for wire in 0..self.num_wires {
                art.push('|');
                if wire < self.num_wires - 1 {
                    art.push_str(if row[wire] { "---" } else { "   " });
                }
            }
            art.push('\n');
        }

        let footer: Vec<String> = (0..self.num_wires).map(end_label).collect();
        art.push(' ');
        art.push_str(&footer.join("   "));
        art.push('\n');
        art
    }
}

/// Letter label of a start wire.
#[must_use]
pub fn start_label(wire: usize) -> char {
    START_LABELS[wire]
}

/// 1-based numeric label of an end wire.
#[must_use]
pub fn end_label(wire: usize) -> String {
    (wire + 1).to_string()
}

/// A ladder plus the question asked about it.
#[derive(Debug, Clone)]
pub struct LadderPuzzle {
    pub network: LadderNetwork,
    /// Start wire the question is about.
    pub subject: usize,
    /// End labels, sorted ascending.
    pub options: Vec<String>,
    pub correct: usize,
}

impl LadderPuzzle {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, num_wires: usize, height: usize) -> Self {
        let network = LadderNetwork::generate(rng, num_wires, height);
        let subject = rng.random_range(0..network.num_wires());
        Self::ask(rng, network, subject)
    }

    /// Build the question for `subject` on an existing network.
    pub fn ask<R: Rng + ?Sized>(rng: &mut R, network: LadderNetwork, subject: usize) -> Self {
        let answer = network.trace(subject);
        let mut wrong: Vec<usize> = (0..network.num_wires()).filter(|&w| w != answer).collect();
        wrong.shuffle(rng);
        wrong.truncate(OPTION_COUNT - 1);

        let mut ends = wrong;
        ends.push(answer);
        ends.sort_unstable();
        let correct = ends.iter().position(|&w| w == answer).unwrap_or_default();

        Self {
            network,
            subject,
            options: ends.into_iter().map(end_label).collect(),
            correct,
        }
    }

    pub fn into_instance(self) -> Result<PuzzleInstance, PuzzleError> {
        let art = self.network.render();
        let prompt = format!(
            "Trace the path for '{}'. Which number does it connect to?\n\n{art}",
            start_label(self.subject)
        );
        let key = AnswerKey::choice(self.options, self.correct)?;
        PuzzleInstance::new(Domain::Wire, prompt, key, art)
    }
}

#[cfg(test)]
mod tests {
    use super::{LadderError, LadderNetwork, LadderPuzzle, MIN_HEIGHT, MIN_WIRES};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn generated_rows_never_hold_adjacent_bridges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let network = LadderNetwork::generate(&mut rng, 6, 12);
            for row in network.bridges() {
                assert!(!row.windows(2).any(|pair| pair[0] && pair[1]));
            }
        }
    }

    #[test]
    fn tracing_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(11);
        for wires in MIN_WIRES..=8 {
            let network = LadderNetwork::generate(&mut rng, wires, 20);
            let mut ends: Vec<usize> = (0..wires).map(|s| network.trace(s)).collect();
            ends.sort_unstable();
            assert_eq!(ends, (0..wires).collect::<Vec<_>>());
        }
    }

    #[test]
    fn small_requests_are_raised_to_floors() {
        let mut rng = StdRng::seed_from_u64(3);
        let network = LadderNetwork::generate(&mut rng, 4, 6);
        assert_eq!(network.num_wires(), MIN_WIRES);
        assert_eq!(network.height(), MIN_HEIGHT);

        let wide = LadderNetwork::generate(&mut rng, 12, 12);
        assert_eq!(wide.num_wires(), 8);
    }

    #[test]
    fn left_bridge_is_taken_before_right() {
        // Row 0 shorts wires 0-1, row 1 shorts wires 1-2.
        let mut rows = vec![vec![false; 5]; 2];
        rows[0][0] = true;
        rows[1][1] = true;
        let network = LadderNetwork::from_bridges(6, rows).unwrap();
        assert_eq!(network.trace(0), 2);
        assert_eq!(network.trace(1), 0);
        assert_eq!(network.trace(2), 1);
        assert_eq!(network.trace(5), 5);
    }

    #[test]
    fn from_bridges_rejects_adjacent_slots() {
        let mut rows = vec![vec![false; 5]; 3];
        rows[2][3] = true;
        rows[2][4] = true;
        assert_eq!(
            LadderNetwork::from_bridges(6, rows),
            Err(LadderError::AdjacentBridges { row: 2, slot: 3 })
        );
        assert_eq!(
            LadderNetwork::from_bridges(6, vec![vec![false; 4]]),
            Err(LadderError::RowWidth {
                row: 0,
                got: 4,
                expected: 5
            })
        );
    }

    #[test]
    fn question_options_are_sorted_and_hold_the_answer() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let puzzle = LadderPuzzle::generate(&mut rng, 6, 12);
            let answer = super::end_label(puzzle.network.trace(puzzle.subject));

            assert_eq!(puzzle.options.len(), 4);
            let numbers: Vec<u32> = puzzle.options.iter().map(|o| o.parse().unwrap()).collect();
            assert!(numbers.windows(2).all(|pair| pair[0] < pair[1]));
            assert_eq!(puzzle.options[puzzle.correct], answer);
        }
    }

    #[test]
    fn instance_prompt_names_the_subject_and_embeds_art() {
        let mut rng = StdRng::seed_from_u64(5);
        let network = LadderNetwork::generate(&mut rng, 6, 12);
        let art = network.render();
        let instance = LadderPuzzle::ask(&mut rng, network, 2).into_instance().unwrap();

        assert!(instance.prompt().starts_with("Trace the path for 'C'."));
        assert!(instance.prompt().ends_with(&art));
        assert!(art.starts_with(" A   B   C   D   E   F\n"));
        assert!(art.ends_with(" 1   2   3   4   5   6\n"));
        assert_eq!(art.lines().count(), 14);
    }

    #[test]
    fn solution_lists_every_start() {
        let network = LadderNetwork::from_bridges(6, vec![vec![false; 5]; 12]).unwrap();
        let solution = network.solution();
        assert_eq!(solution.len(), 6);
        assert_eq!(solution[0], ('A', "1".to_string()));
        assert_eq!(solution[5], ('F', "6".to_string()));
    }
}
