//! Pulling a structured answer out of free-form model text.

use std::sync::LazyLock;

use duel_types::{
    AnswerKey, AnswerSource, OpponentAnswer, Provider, PuzzleInstance, contains_accepted,
};
use regex::Regex;
use serde_json::Value;

use crate::RemoteAnswerFailure;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:json)?\s*(.*?)```").expect("valid fence regex"));

/// Standalone single digit in the range any generated puzzle can use.
static CHOICE_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-3])\b").expect("valid digit regex"));

const NO_ANSWER: &str = "(no answer)";

/// First well-formed JSON value in `text`.
///
/// Looks inside a fenced code block when there is one, tries the whole
/// candidate, then the span from the first `{` to the last `}`.
#[must_use]
pub fn parse_reply_json(text: &str) -> Option<Value> {
    let candidate = FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str())
        .trim();
    if candidate.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(candidate) {
        return Some(value);
    }

    let first = candidate.find('{')?;
    let last = candidate.rfind('}')?;
    if last <= first {
        return None;
    }
    serde_json::from_str(&candidate[first..=last]).ok()
}

/// `choiceIndex` as a non-negative integer, accepting all-digit strings.
fn structured_choice(parsed: Option<&Value>) -> Option<usize> {
    match parsed?.get("choiceIndex")? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

fn digit_choice(text: &str) -> Option<usize> {
    CHOICE_DIGIT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Validate a backend reply against the instance it was asked about.
pub fn interpret_reply(
    instance: &PuzzleInstance,
    text: &str,
    provider: Provider,
) -> Result<OpponentAnswer, RemoteAnswerFailure> {
    let parsed = parse_reply_json(text);
    let source = AnswerSource::for_provider(provider);

    match instance.key() {
        AnswerKey::FreeText { accepted } => {
            let answer = parsed
                .as_ref()
                .and_then(|v| v.get("answer"))
                .and_then(Value::as_str)
                .unwrap_or(text)
                .trim();
            let answer = if answer.is_empty() { NO_ANSWER } else { answer };
            Ok(OpponentAnswer {
                correct: contains_accepted(answer, accepted),
                choice: None,
                text: answer.to_string(),
                source,
                fallback_from: None,
            })
        }
        AnswerKey::Choice { options, correct } => {
            let in_range = |index: &usize| *index < options.len();
            let index = structured_choice(parsed.as_ref())
                .filter(in_range)
                .or_else(|| digit_choice(text).filter(in_range))
                .ok_or(RemoteAnswerFailure::NoValidChoice(provider))?;
            Ok(OpponentAnswer {
                correct: index == *correct,
                choice: Some(index),
                text: options[index].clone(),
                source,
                fallback_from: None,
            })
        }
    }
}
