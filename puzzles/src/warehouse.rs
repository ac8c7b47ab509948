//! Two-agent push-box warehouse on a walled grid.
//!
//! `WarehouseState` is plain data with value semantics: callers exploring
//! hypothetical moves clone it and never touch the canonical copy.

use std::fmt;

use duel_types::{AnswerKey, Domain, PuzzleError, PuzzleInstance};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{Direction, Pos, in_bounds};

pub const SIZE: usize = 10;
pub const MAX_ATTEMPTS: usize = 50;
pub const MIN_OBSTACLES: usize = 6;
/// Exclusive upper bound on the random obstacle count.
pub const MAX_OBSTACLES: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Player,
    Ai,
}

impl Side {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Side::Player => Side::Ai,
            Side::Ai => Side::Player,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Player,
    Ai,
    Draw,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Winner::Player => "Player",
            Winner::Ai => "AI",
            Winner::Draw => "Draw",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    Pushed,
}

/// Why a move was refused. The state is untouched whenever one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("game over")]
    GameOver,
    #[error("hit wall")]
    HitWall,
    #[error("hit opponent")]
    HitOpponent,
    #[error("box blocked by wall")]
    BoxBlockedByWall,
    #[error("box blocked by opponent")]
    BoxBlockedByOpponent,
    #[error("box blocked by box")]
    BoxBlockedByBox,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("map has no rows")]
    Empty,
    #[error("row {row} is {got} cells wide, expected {expected}")]
    RaggedRow {
        row: usize,
        got: usize,
        expected: usize,
    },
    #[error("unknown map cell {0:?}")]
    BadCell(char),
    #[error("map must contain exactly one {0:?}")]
    EntityCount(char),
}

/// Agent, box and target for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Crew {
    agent: Pos,
    boxed: Pos,
    target: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseState {
    width: usize,
    height: usize,
    /// Static after generation.
    walls: Vec<Vec<bool>>,
    player: Crew,
    ai: Crew,
    winner: Option<Winner>,
}

impl WarehouseState {
    /// Random 10x10 map. Retries up to [`MAX_ATTEMPTS`] times for a layout
    /// where nothing spawns on a wall and no box starts on its own target;
    /// after that the last attempt is returned as is.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let state = Self::roll(rng);
            if state.is_well_formed() {
                tracing::debug!(attempt, "warehouse generated");
                return state;
            }
            if attempt >= MAX_ATTEMPTS {
                tracing::warn!(attempts = attempt, "warehouse retries exhausted; using last layout");
                return state;
            }
        }
    }

    fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let (w, h) = (SIZE, SIZE);
        let mut walls = vec![vec![false; w]; h];
        for (r, row) in walls.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = r == 0 || r == h - 1 || c == 0 || c == w - 1;
            }
        }

        let obstacles = rng.random_range(MIN_OBSTACLES..MAX_OBSTACLES);
        for _ in 0..obstacles {
            let r = rng.random_range(2..h - 2);
            let c = rng.random_range(2..w - 2);
            walls[r][c] = true;
        }

        let player_target = pos(1 + rng.random_range(0..3), w - 2 - rng.random_range(0..3));
        let ai_target = pos(h - 2 - rng.random_range(0..3), 1 + rng.random_range(0..3));

        Self {
            width: w,
            height: h,
            walls,
            player: Crew {
                agent: pos(1, 1),
                boxed: pos(2, 2),
                target: player_target,
            },
            ai: Crew {
                agent: pos(h - 2, w - 2),
                boxed: pos(h - 3, w - 3),
                target: ai_target,
            },
            winner: None,
        }
    }

    fn is_well_formed(&self) -> bool {
        let nothing_on_walls = [self.player, self.ai]
            .iter()
            .flat_map(|crew| [crew.agent, crew.boxed, crew.target])
            .all(|p| !self.is_wall(p));
        nothing_on_walls
            && self.player.boxed != self.player.target
            && self.ai.boxed != self.ai.target
    }

    /// Parse a map drawn with `#` walls, `.` floor, `P`/`B`/`T` for the player's
    /// agent, box and target, and `A`/`b`/`t` for the opponent's.
    pub fn from_map<S: AsRef<str>>(rows: &[S]) -> Result<Self, MapError> {
        const MARKS: [char; 6] = ['P', 'B', 'T', 'A', 'b', 't'];

        let Some(first) = rows.first() else {
            return Err(MapError::Empty);
        };
        let width = first.as_ref().chars().count();
        let mut walls = Vec::with_capacity(rows.len());
        let mut found: [Option<Pos>; 6] = [None; 6];

        for (r, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            let mut row = Vec::with_capacity(width);
            for (c, ch) in line.chars().enumerate() {
                match ch {
                    '#' => row.push(true),
                    '.' => row.push(false),
                    mark => {
                        let slot = MARKS
                            .iter()
                            .position(|&m| m == mark)
                            .ok_or(MapError::BadCell(mark))?;
                        if found[slot].replace(pos(r, c)).is_some() {
                            return Err(MapError::EntityCount(mark));
                        }
                        row.push(false);
                    }
                }
            }
            if row.len() != width {
                return Err(MapError::RaggedRow {
                    row: r,
                    got: row.len(),
                    expected: width,
                });
            }
            walls.push(row);
        }

        let get = |slot: usize| found[slot].ok_or(MapError::EntityCount(MARKS[slot]));
        Ok(Self {
            width,
            height: walls.len(),
            walls,
            player: Crew {
                agent: get(0)?,
                boxed: get(1)?,
                target: get(2)?,
            },
            ai: Crew {
                agent: get(3)?,
                boxed: get(4)?,
                target: get(5)?,
            },
            winner: None,
        })
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Out-of-bounds cells count as wall.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn is_wall(&self, at: Pos) -> bool {
        !in_bounds(at, self.width, self.height) || self.walls[at.row as usize][at.col as usize]
    }

    const fn crew(&self, side: Side) -> &Crew {
        match side {
            Side::Player => &self.player,
            Side::Ai => &self.ai,
        }
    }

    const fn crew_mut(&mut self, side: Side) -> &mut Crew {
        match side {
            Side::Player => &mut self.player,
            Side::Ai => &mut self.ai,
        }
    }

    #[must_use]
    pub const fn agent(&self, side: Side) -> Pos {
        self.crew(side).agent
    }

    #[must_use]
    pub const fn box_pos(&self, side: Side) -> Pos {
        self.crew(side).boxed
    }

    #[must_use]
    pub const fn target(&self, side: Side) -> Pos {
        self.crew(side).target
    }

    #[must_use]
    pub const fn winner(&self) -> Option<Winner> {
        self.winner
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Step `side`'s agent one cell, pushing a box ahead of it if there is one.
    pub fn move_agent(
        &mut self,
        side: Side,
        direction: Direction,
    ) -> Result<MoveOutcome, MoveRejection> {
        if self.is_finished() {
            return Err(MoveRejection::GameOver);
        }

        let other = self.crew(side.other()).agent;
        let dest = self.agent(side).step(direction);

        if self.is_wall(dest) {
            return Err(MoveRejection::HitWall);
        }
        if dest == other {
            return Err(MoveRejection::HitOpponent);
        }

        let pushed = if dest == self.box_pos(side) {
            Some(side)
        } else if dest == self.box_pos(side.other()) {
            Some(side.other())
        } else {
            None
        };

        let Some(owner) = pushed else {
            self.crew_mut(side).agent = dest;
            return Ok(MoveOutcome::Moved);
        };

        let beyond = dest.step(direction);
        if self.is_wall(beyond) {
            return Err(MoveRejection::BoxBlockedByWall);
        }
        if beyond == other {
            return Err(MoveRejection::BoxBlockedByOpponent);
        }
        if beyond == self.box_pos(owner.other()) {
            return Err(MoveRejection::BoxBlockedByBox);
        }

        self.crew_mut(owner).boxed = beyond;
        self.crew_mut(side).agent = dest;
        self.check_win();
        Ok(MoveOutcome::Pushed)
    }

    fn check_win(&mut self) {
        let player_home = self.player.boxed == self.player.target;
        let ai_home = self.ai.boxed == self.ai.target;
        self.winner = match (player_home, ai_home) {
            (true, true) => Some(Winner::Draw),
            (true, false) => Some(Winner::Player),
            (false, true) => Some(Winner::Ai),
            (false, false) => None,
        };
    }

    /// Map with targets, then boxes, then agents drawn over the walls.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn render(&self) -> String {
        let mut cells: Vec<Vec<char>> = self
            .walls
            .iter()
            .map(|row| row.iter().map(|&w| if w { '#' } else { '.' }).collect())
            .collect();

        let overlays = [
            (self.player.target, 'T'),
            (self.ai.target, 't'),
            (self.player.boxed, 'B'),
            (self.ai.boxed, 'b'),
            (self.player.agent, 'P'),
            (self.ai.agent, 'A'),
        ];
        for (at, mark) in overlays {
            if in_bounds(at, self.width, self.height) {
                cells[at.row as usize][at.col as usize] = mark;
            }
        }

        cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(char::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// "Best first move" question for the player, answered by the greedy selector.
    pub fn into_instance(self) -> Result<PuzzleInstance, PuzzleError> {
        let best = crate::selector::best_move(&self, Side::Player);
        let rendered = self.render();
        let prompt = format!(
            "Agent Lab Puzzle:\nGuide P to push B onto T. What is the best first move?\n\n{rendered}"
        );
        let options: Vec<String> = Direction::ALL.iter().map(|d| d.label().to_string()).collect();
        let correct = Direction::ALL.iter().position(|&d| d == best).unwrap_or_default();
        let key = AnswerKey::choice(options, correct)?;
        PuzzleInstance::new(Domain::Agent, prompt, key, rendered)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const fn pos(row: usize, col: usize) -> Pos {
    Pos::new(row as i32, col as i32)
}

#[cfg(test)]
mod tests {
    use super::{MapError, MoveOutcome, MoveRejection, SIZE, Side, WarehouseState, Winner};
    use crate::grid::{Direction, Pos};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn map(rows: &[&str]) -> WarehouseState {
        WarehouseState::from_map(rows).unwrap()
    }

    #[test]
    fn plain_move_into_floor() {
        let mut state = map(&[
            "#######", //
            "#P....#",
            "#..B..#",
            "#....T#",
            "#t.b.A#",
            "#######",
        ]);
        assert_eq!(state.move_agent(Side::Player, Direction::Right), Ok(MoveOutcome::Moved));
        assert_eq!(state.agent(Side::Player), Pos::new(1, 2));
    }

    #[test]
    fn rejected_push_leaves_state_identical() {
        let mut state = map(&[
            "#######", //
            "#..PB##",
            "#.....#",
            "#....T#",
            "#t.b.A#",
            "#######",
        ]);
        let before = state.clone();
        assert_eq!(
            state.move_agent(Side::Player, Direction::Right),
            Err(MoveRejection::BoxBlockedByWall)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn rejection_reasons_follow_resolution_order() {
        let mut state = map(&[
            "########", //
            "#..PA..#",
            "#......#",
            "#.bB...#",
            "#......#",
            "#t....T#",
            "########",
        ]);
        let before = state.clone();
        assert_eq!(state.move_agent(Side::Player, Direction::Up), Err(MoveRejection::HitWall));
        assert_eq!(
            state.move_agent(Side::Player, Direction::Right),
            Err(MoveRejection::HitOpponent)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn box_cannot_be_pushed_into_the_other_box() {
        let mut state = map(&[
            "#######", //
            "#.PBb.#",
            "#.....#",
            "#T..t.#",
            "#....A#",
            "#######",
        ]);
        let before = state.clone();
        assert_eq!(
            state.move_agent(Side::Player, Direction::Right),
            Err(MoveRejection::BoxBlockedByBox)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn box_cannot_be_pushed_into_the_opponent() {
        let mut state = map(&[
            "#######", //
            "#.PBA.#",
            "#.....#",
            "#T..tb#",
            "#.....#",
            "#######",
        ]);
        assert_eq!(
            state.move_agent(Side::Player, Direction::Right),
            Err(MoveRejection::BoxBlockedByOpponent)
        );
    }

    #[test]
    fn push_onto_target_finishes_with_pusher_winning() {
        let mut state = map(&[
            "#######", //
            "#.PBT.#",
            "#.....#",
            "#t..b.#",
            "#....A#",
            "#######",
        ]);
        assert_eq!(state.move_agent(Side::Player, Direction::Right), Ok(MoveOutcome::Pushed));
        assert_eq!(state.box_pos(Side::Player), Pos::new(1, 4));
        assert_eq!(state.agent(Side::Player), Pos::new(1, 3));
        assert!(state.is_finished());
        assert_eq!(state.winner(), Some(Winner::Player));
        assert_eq!(
            state.move_agent(Side::Ai, Direction::Up),
            Err(MoveRejection::GameOver)
        );
    }

    #[test]
    fn ai_push_onto_its_target_wins_for_ai() {
        let mut state = map(&[
            "#######", //
            "#P...T#",
            "#..B..#",
            "#.tbA.#",
            "#.....#",
            "#######",
        ]);
        assert_eq!(state.move_agent(Side::Ai, Direction::Left), Ok(MoveOutcome::Pushed));
        assert_eq!(state.winner(), Some(Winner::Ai));
    }

    #[test]
    fn wins_are_judged_by_box_owner_not_pusher() {
        let mut state = map(&[
            "#######", //
            "#.Pbt.#",
            "#.....#",
            "#..B.T#",
            "#....A#",
            "#######",
        ]);
        assert_eq!(state.move_agent(Side::Player, Direction::Right), Ok(MoveOutcome::Pushed));
        assert_eq!(state.box_pos(Side::Ai), Pos::new(1, 4));
        assert_eq!(state.winner(), Some(Winner::Ai));
    }

    #[test]
    fn both_boxes_home_after_one_push_is_a_draw() {
        let mut state = map(&[
            "#######", //
            "#.PBT.#",
            "#.....#",
            "#t.b..#",
            "#....A#",
            "#######",
        ]);
        // Only reachable from a degenerate layout: the AI box already rests on its target.
        state.ai.boxed = state.ai.target;
        assert!(!state.is_finished());

        assert_eq!(state.move_agent(Side::Player, Direction::Right), Ok(MoveOutcome::Pushed));
        assert_eq!(state.winner(), Some(Winner::Draw));
    }

    #[test]
    fn moves_never_put_an_agent_on_a_wall() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..20 {
            let mut state = WarehouseState::generate(&mut rng);
            for step in 0..200 {
                let side = if step % 2 == 0 { Side::Player } else { Side::Ai };
                let direction = Direction::ALL[(step / 2) % 4];
                let _ = state.move_agent(side, direction);
                for side in [Side::Player, Side::Ai] {
                    assert!(!state.is_wall(state.agent(side)));
                    assert!(!state.is_wall(state.box_pos(side)));
                    assert_ne!(state.agent(side), state.box_pos(side));
                }
            }
        }
    }

    #[test]
    fn generated_maps_are_bordered_and_well_formed() {
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..100 {
            let state = WarehouseState::generate(&mut rng);
            assert_eq!((state.width(), state.height()), (SIZE, SIZE));
            for i in 0..SIZE as i32 {
                assert!(state.is_wall(Pos::new(0, i)));
                assert!(state.is_wall(Pos::new(9, i)));
                assert!(state.is_wall(Pos::new(i, 0)));
                assert!(state.is_wall(Pos::new(i, 9)));
            }
            assert_eq!(state.agent(Side::Player), Pos::new(1, 1));
            assert_eq!(state.agent(Side::Ai), Pos::new(8, 8));
            assert!(!state.is_finished());
        }
    }

    #[test]
    fn render_layers_entities_over_targets() {
        let state = map(&[
            "#####", //
            "#PBT#",
            "#tbA#",
            "#####",
        ]);
        let art = state.render();
        assert_eq!(art, "# # # # #\n# P B T #\n# t b A #\n# # # # #");
    }

    #[test]
    fn from_map_reports_missing_and_duplicate_marks() {
        assert_eq!(
            WarehouseState::from_map(&["#PBT#", "#tb.#"]),
            Err(MapError::EntityCount('A'))
        );
        assert_eq!(
            WarehouseState::from_map(&["PBTAbtP"]),
            Err(MapError::EntityCount('P'))
        );
        assert_eq!(WarehouseState::from_map(&["PBTAbt?"]), Err(MapError::BadCell('?')));
    }

    #[test]
    fn agent_instance_offers_four_directions() {
        let state = map(&[
            "#######", //
            "#.PBT.#",
            "#.....#",
            "#t..b.#",
            "#....A#",
            "#######",
        ]);
        let instance = state.into_instance().unwrap();
        assert_eq!(instance.options(), ["UP", "DOWN", "LEFT", "RIGHT"]);
        assert_eq!(instance.correct_index(), Some(3));
        assert!(instance.prompt().starts_with("Agent Lab Puzzle:\n"));
    }
}
