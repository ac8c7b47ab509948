//! Puzzle to remote prompt.

use duel_types::PuzzleInstance;

/// Structured prompt asking for a strict JSON reply.
///
/// Choice puzzles list their options as `index: text` and ask for
/// `{"choiceIndex":number,"answer":"text"}`; free-text puzzles ask for
/// `{"answer":"your answer"}`.
#[must_use]
pub fn build_prompt(instance: &PuzzleInstance) -> String {
    if instance.is_free_text() {
        return format!(
            "You are answering a short riddle in a game.\n\
             Return JSON only: {{\"answer\":\"your answer\"}}.\n\
             No markdown, no code fences, no extra keys.\n\
             Riddle: {}",
            instance.prompt()
        );
    }

    let options = instance
        .options()
        .iter()
        .enumerate()
        .map(|(i, option)| format!("{i}: {option}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are answering a multiple-choice question in a game.\n\
         Return JSON only: {{\"choiceIndex\":number,\"answer\":\"text\"}}.\n\
         choiceIndex must be one of the listed numeric indexes.\n\
         No markdown, no code fences, no extra keys.\n\
         Question: {}\n\
         Options:\n{options}",
        instance.prompt()
    )
}

#[cfg(test)]
mod tests {
    use super::build_prompt;
    use duel_types::{AnswerKey, Domain, PuzzleInstance};

    #[test]
    fn choice_prompt_lists_indexed_options() {
        let key = AnswerKey::choice(vec!["Yes".into(), "No".into()], 0).unwrap();
        let instance = PuzzleInstance::new(Domain::Physics, "Stable?", key, "").unwrap();
        let prompt = build_prompt(&instance);

        assert!(prompt.starts_with("You are answering a multiple-choice question in a game.\n"));
        assert!(prompt.contains("{\"choiceIndex\":number,\"answer\":\"text\"}"));
        assert!(prompt.contains("\nQuestion: Stable?\n"));
        assert!(prompt.ends_with("Options:\n0: Yes\n1: No"));
    }

    #[test]
    fn riddle_prompt_asks_for_answer_only() {
        let key = AnswerKey::free_text(vec!["echo".into()]).unwrap();
        let instance =
            PuzzleInstance::new(Domain::Riddle, "I speak without a mouth.", key, "").unwrap();
        let prompt = build_prompt(&instance);

        assert!(prompt.contains("{\"answer\":\"your answer\"}"));
        assert!(!prompt.contains("choiceIndex"));
        assert!(prompt.ends_with("Riddle: I speak without a mouth."));
    }
}
