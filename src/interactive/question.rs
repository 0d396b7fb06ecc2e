//! Multi-choice question state machine (§4.6): the AI asks one or more
//! questions with a fixed option set; the user answers via numbered
//! reactions or a number-prefixed text reply, and the handler advances
//! `currentIndex` until the set is complete.

use crate::platform::PlatformDyn;
use crate::session::types::{PendingQuestionSet, Question, QuestionOption};
use crate::ReactionAction;
use std::sync::Arc;

const NUMBER_EMOJI: &[&str] = &["one", "two", "three", "four", "five", "six", "seven", "eight", "nine"];

/// `AskUserQuestion` ships each question as `{header, question, options:
/// [{label, description}]}` (§8 scenario 3).
fn parse_question(raw: &serde_json::Value) -> Question {
    let options = raw
        .get("options")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .map(|o| QuestionOption {
                    label: o.get("label").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    description: o.get("description").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    Question {
        header: raw.get("header").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        prompt: raw.get("question").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        options,
        answer: None,
    }
}

pub struct QuestionHandler {
    channel: String,
    thread_root: Option<String>,
}

impl QuestionHandler {
    pub fn new(channel: String, thread_root: Option<String>) -> Self {
        Self { channel, thread_root }
    }

    fn render(question: &Question) -> String {
        let mut text = format!("❓ {}\n{}\n", question.header, question.prompt);
        for (i, option) in question.options.iter().enumerate() {
            text.push_str(&format!("{}. **{}** — {}\n", i + 1, option.label, option.description));
        }
        text
    }

    fn reactions_for(question: &Question) -> Vec<&'static str> {
        question
            .options
            .iter()
            .enumerate()
            .take(NUMBER_EMOJI.len())
            .map(|(i, _)| NUMBER_EMOJI[i])
            .collect()
    }

    /// Post the current question in the set and return its new post ID.
    pub async fn post_current(
        &self,
        platform: &Arc<dyn PlatformDyn>,
        pending: &PendingQuestionSet,
    ) -> crate::Result<crate::PostId> {
        let question = &pending.questions[pending.current_index];
        let text = Self::render(question);
        let reactions = Self::reactions_for(question);
        let handle = platform
            .create_interactive_post(&self.channel, &text, &reactions, self.thread_root.as_deref())
            .await?;
        Ok(handle.id)
    }

    /// Parse an `AskUserQuestion` tool call's raw input into the question
    /// set this handler drives.
    fn parse_question_set(tool_use_id: String, raw: &serde_json::Value) -> PendingQuestionSet {
        let questions = raw
            .get("questions")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().map(parse_question).collect())
            .unwrap_or_default();
        PendingQuestionSet {
            tool_use_id,
            questions,
            current_index: 0,
            current_post_id: String::new(),
        }
    }

    /// Build the pending state for a fresh question set and post its first
    /// question (§4.6: "post its header+options... on reaction, advance").
    pub async fn prompt(
        &self,
        platform: &Arc<dyn PlatformDyn>,
        tool_use_id: String,
        raw: &serde_json::Value,
    ) -> crate::Result<PendingQuestionSet> {
        let mut pending = Self::parse_question_set(tool_use_id, raw);
        pending.current_post_id = self.post_current(platform, &pending).await?;
        Ok(pending)
    }

    /// Resolve a reaction against the option it numbers (1-indexed position
    /// in `NUMBER_EMOJI`), ignoring removals and out-of-range numbers.
    pub fn resolve_reaction(&self, question: &Question, emoji_name: &str, action: ReactionAction) -> Option<usize> {
        if action != ReactionAction::Added {
            return None;
        }
        let index = NUMBER_EMOJI.iter().position(|&name| name == emoji_name)?;
        if index < question.options.len() {
            Some(index)
        } else {
            None
        }
    }

    /// Resolve a text reply of the form `"<n> ..."` to the option it selects.
    pub fn resolve_text_reply(&self, question: &Question, text: &str) -> Option<usize> {
        let first_token = text.trim().split_whitespace().next()?;
        let n: usize = first_token.trim_end_matches(['.', ')']).parse().ok()?;
        if n >= 1 && n <= question.options.len() {
            Some(n - 1)
        } else {
            None
        }
    }

    /// Record the answer for the current question and advance the index.
    /// Returns whether the whole set is now complete.
    pub fn answer_current(&self, pending: &mut PendingQuestionSet, option_index: usize) -> bool {
        let question = &mut pending.questions[pending.current_index];
        if option_index < question.options.len() {
            question.answer = Some(option_index + 1);
        }
        pending.current_index += 1;
        pending.is_complete()
    }

    /// Build the compound tool-result payload once every question in the
    /// set has an answer.
    pub fn compound_result(&self, pending: &PendingQuestionSet) -> serde_json::Value {
        let answers: Vec<serde_json::Value> = pending
            .questions
            .iter()
            .map(|q| {
                serde_json::json!({
                    "header": q.header,
                    "answer": q.answer.unwrap_or_default(),
                })
            })
            .collect();
        serde_json::json!({ "answers": answers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_question() -> Question {
        Question {
            header: "Pick one".into(),
            prompt: "Which approach?".into(),
            options: vec![
                QuestionOption { label: "A".into(), description: "first".into() },
                QuestionOption { label: "B".into(), description: "second".into() },
            ],
            answer: None,
        }
    }

    #[test]
    fn reaction_resolves_to_option_index() {
        let handler = QuestionHandler::new("ch".into(), None);
        let q = sample_question();
        assert_eq!(handler.resolve_reaction(&q, "one", ReactionAction::Added), Some(0));
        assert_eq!(handler.resolve_reaction(&q, "two", ReactionAction::Added), Some(1));
        assert_eq!(handler.resolve_reaction(&q, "three", ReactionAction::Added), None);
    }

    #[test]
    fn text_reply_parses_leading_number() {
        let handler = QuestionHandler::new("ch".into(), None);
        let q = sample_question();
        assert_eq!(handler.resolve_text_reply(&q, "2) because"), Some(1));
        assert_eq!(handler.resolve_text_reply(&q, "nope"), None);
    }

    #[test]
    fn answering_all_questions_completes_the_set() {
        let handler = QuestionHandler::new("ch".into(), None);
        let mut pending = PendingQuestionSet {
            tool_use_id: "t1".into(),
            questions: vec![sample_question()],
            current_index: 0,
            current_post_id: "p1".into(),
        };
        assert!(handler.answer_current(&mut pending, 1));
        assert_eq!(pending.questions[0].answer, Some(2));
    }
}
