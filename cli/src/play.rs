//! `duel play`: one batch of puzzles against the configured opponent.

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use rand::seq::SliceRandom;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use duel_engine::duel_puzzles::generate_batch;
use duel_engine::duel_types::{
    Domain, HumanAnswer, Provider, PuzzleInstance, RoundOutcome, truncate_with_ellipsis,
};
use duel_engine::{DuelConfig, Session, load_bank};

const THINKING_TICK: Duration = Duration::from_millis(100);
const MAX_ANSWER_DISPLAY: usize = 60;

#[derive(Debug)]
pub struct PlayOptions {
    pub domain: Domain,
    pub count: usize,
    pub provider: Option<Provider>,
    pub bank: Option<PathBuf>,
}

/// One line of player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Answer(String),
    Skip,
    Quit,
    Help,
    SetProvider(Provider),
    /// Blank `key` clears the stored credential.
    SetKey { provider: Provider, key: String },
    Empty,
    Invalid(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    let Some(command) = line.strip_prefix('/') else {
        return match line.to_ascii_lowercase().as_str() {
            "skip" | "s" => Input::Skip,
            "quit" | "q" => Input::Quit,
            "help" | "?" => Input::Help,
            _ => Input::Answer(line.to_string()),
        };
    };

    let mut parts = command.splitn(3, char::is_whitespace);
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    match name.as_str() {
        "provider" => match parts.next().map(Provider::parse) {
            Some(Ok(provider)) => Input::SetProvider(provider),
            Some(Err(e)) => Input::Invalid(e.to_string()),
            None => Input::Invalid("usage: /provider <simulated|openai|gemini>".to_string()),
        },
        "key" => match parts.next().map(Provider::parse) {
            Some(Ok(provider)) => Input::SetKey {
                provider,
                key: parts.next().unwrap_or_default().trim().to_string(),
            },
            Some(Err(e)) => Input::Invalid(e.to_string()),
            None => Input::Invalid("usage: /key <provider> [key]".to_string()),
        },
        "skip" => Input::Skip,
        "quit" => Input::Quit,
        "help" => Input::Help,
        _ => Input::Invalid(format!("unknown command '/{name}'")),
    }
}

/// Letter shown beside the option at `index`.
fn option_letter(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .filter(|&i| i < 26)
        .map_or('?', |i| char::from(b'a' + i))
}

/// Map typed text onto the answer shape `instance` expects.
///
/// Choice puzzles take the option text itself (so a wire label like `3` means
/// the option reading `3`) or the letter shown beside it.
pub fn to_human_answer(instance: &PuzzleInstance, raw: &str) -> Result<HumanAnswer, String> {
    if instance.is_free_text() {
        return Ok(HumanAnswer::Text(raw.to_string()));
    }

    let options = instance.options();
    if let Some(index) = options.iter().position(|option| option.eq_ignore_ascii_case(raw)) {
        return Ok(HumanAnswer::Choice(index));
    }

    let mut chars = raw.chars();
    if let (Some(letter), None) = (chars.next(), chars.next())
        && let Some(index) = (0..options.len()).find(|&i| option_letter(i).eq_ignore_ascii_case(&letter))
    {
        return Ok(HumanAnswer::Choice(index));
    }

    Err(format!(
        "'{raw}' is not an option; type its text or a letter from a to {}",
        option_letter(options.len().saturating_sub(1))
    ))
}

fn load_batch(options: &PlayOptions) -> Result<Vec<PuzzleInstance>> {
    let mut rng = rand::rng();

    let Some(path) = &options.bank else {
        if !options.domain.is_generated() {
            bail!("{} puzzles need a bank; pass --bank <FILE>", options.domain);
        }
        return generate_batch(options.domain, options.count, &mut rng)
            .with_context(|| format!("failed to generate {} puzzles", options.domain));
    };

    let mut bank = load_bank(path, options.domain)
        .with_context(|| format!("failed to load bank {}", path.display()))?;
    bank.shuffle(&mut rng);
    bank.truncate(options.count.max(1));
    Ok(bank)
}

fn render_puzzle(session: &Session, instance: &PuzzleInstance) -> String {
    let mut out = format!(
        "\n--- {} puzzle {} ({} left) ---\n{}\n",
        session.domain(),
        session.index() + 1,
        session.remaining(),
        instance.prompt()
    );
    for (i, option) in instance.options().iter().enumerate() {
        out.push_str(&format!("  {}) {option}\n", option_letter(i)));
    }
    out
}

fn render_outcome(outcome: &RoundOutcome) -> String {
    let verdict = |correct: bool| if correct { "correct" } else { "wrong" };
    format!(
        "You: {} ({})\nAI:  {} ({}, {}, {:.1}s)\nAnswer: {}",
        truncate_with_ellipsis(&outcome.human_answer, MAX_ANSWER_DISPLAY),
        verdict(outcome.human_correct),
        truncate_with_ellipsis(&outcome.opponent_answer, MAX_ANSWER_DISPLAY),
        verdict(outcome.opponent_correct),
        outcome.opponent_source,
        outcome.elapsed.as_secs_f64(),
        outcome.correct_answer,
    )
}

async fn prompt_line(lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<String>> {
    print!("> ");
    std::io::stdout().flush().context("failed to flush stdout")?;
    lines.next_line().await.context("failed to read stdin")
}

/// Submit and show a ticking wait message until the opponent is in.
async fn submit_with_ticker(session: &mut Session, human: HumanAnswer) -> Result<RoundOutcome> {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(THINKING_TICK);
    ticker.tick().await;

    let submit = session.submit(human);
    tokio::pin!(submit);
    let mut waited = false;

    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            _ = ticker.tick() => {
                waited = true;
                print!("\rAI is thinking... {:.1}s", started.elapsed().as_secs_f64());
                std::io::stdout().flush().context("failed to flush stdout")?;
            }
        }
    };
    if waited {
        println!();
    }
    outcome.map_err(Into::into)
}

pub async fn run(config: &DuelConfig, options: PlayOptions) -> Result<()> {
    let batch = load_batch(&options)?;
    let mut settings = config.opponent_settings();
    if let Some(provider) = options.provider {
        settings.provider = provider;
    }

    let mut session = Session::new(options.domain, batch, settings);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", options.domain.help());
    println!(
        "Opponent: {}. Type an answer, 'skip', 'quit', or '/provider <name>'.",
        session.settings().provider.display_name()
    );

    'batch: while let Some(instance) = session.present().cloned() {
        print!("{}", render_puzzle(&session, &instance));

        loop {
            let Some(line) = prompt_line(&mut lines).await? else {
                break 'batch;
            };
            match parse_input(&line) {
                Input::Empty => {}
                Input::Quit => break 'batch,
                Input::Help => println!("{}", options.domain.help()),
                Input::Invalid(reason) => println!("{reason}"),
                Input::Skip => {
                    session.skip()?;
                    println!("Skipped; it will come back at the end.");
                    continue 'batch;
                }
                Input::SetProvider(provider) => {
                    session.set_provider(provider);
                    println!("Opponent is now {}.", provider.display_name());
                    session.pending();
                }
                Input::SetKey { provider, key } => {
                    session.set_credential(provider, &key);
                    if key.is_empty() {
                        println!("Cleared the {provider} key.");
                    } else {
                        println!("Updated the {provider} key.");
                    }
                    session.pending();
                }
                Input::Answer(raw) => {
                    let human = match to_human_answer(&instance, &raw) {
                        Ok(human) => human,
                        Err(reason) => {
                            println!("{reason}");
                            continue;
                        }
                    };
                    let outcome = submit_with_ticker(&mut session, human).await?;
                    println!("{}", render_outcome(&outcome));
                    session.advance();
                    continue 'batch;
                }
            }
        }
    }

    let board = session.scoreboard();
    println!(
        "\nFinal score after {} rounds: You {}, AI {}, Team {}",
        board.rounds, board.human, board.opponent, board.team
    );
    Ok(())
}
