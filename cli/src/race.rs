//! `duel race`: push your box home before the AI pushes its own.

use std::io::Write;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::{AsyncBufReadExt, BufReader};

use duel_engine::duel_puzzles::{
    Direction, MoveRejection, Side, WarehouseState, Winner, best_move,
};

/// What happened on one turn after the player's move was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiReply {
    Moved(Direction),
    /// The greedy pick was refused; the AI loses its turn.
    Stalled(Direction, MoveRejection),
    /// The player's move ended the game.
    GameOver,
}

/// Apply the player's move, then let the AI answer if the game is still on.
pub fn play_turn(
    state: &mut WarehouseState,
    direction: Direction,
) -> Result<AiReply, MoveRejection> {
    state.move_agent(Side::Player, direction)?;
    if state.is_finished() {
        return Ok(AiReply::GameOver);
    }

    let ai_move = best_move(state, Side::Ai);
    Ok(match state.move_agent(Side::Ai, ai_move) {
        Ok(_) => AiReply::Moved(ai_move),
        Err(rejection) => {
            tracing::debug!(%ai_move, %rejection, "AI move refused");
            AiReply::Stalled(ai_move, rejection)
        }
    })
}

fn announce(winner: Winner) -> &'static str {
    match winner {
        Winner::Player => "You win!",
        Winner::Ai => "The AI wins.",
        Winner::Draw => "Both boxes landed at once: draw.",
    }
}

pub async fn run(seed: Option<u64>) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut state = WarehouseState::generate(&mut rng);
    tracing::info!(?seed, "Race started");

    println!("Push B onto T before the AI pushes b onto t. Moves: up/down/left/right, 'q' quits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while !state.is_finished() {
        println!("\n{}", state.render());
        print!("> ");
        std::io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            return Ok(());
        };
        let line = line.trim();
        if matches!(line.to_ascii_lowercase().as_str(), "q" | "quit") {
            println!("Race abandoned.");
            return Ok(());
        }
        let Some(direction) = Direction::parse(line) else {
            println!("'{line}' is not a direction.");
            continue;
        };

        match play_turn(&mut state, direction) {
            Err(rejection) => println!("Can't move {direction}: {rejection}."),
            Ok(AiReply::Moved(ai_move)) => println!("AI moves {ai_move}."),
            Ok(AiReply::Stalled(ai_move, rejection)) => {
                println!("AI tried {ai_move} but {rejection}.");
            }
            Ok(AiReply::GameOver) => {}
        }
    }

    println!("\n{}", state.render());
    if let Some(winner) = state.winner() {
        tracing::info!(%winner, "Race finished");
        println!("{}", announce(winner));
    }
    Ok(())
}
