use serde::{Deserialize, Serialize};

const GREETING_SALUTATIONS: [&str; 8] = [
    "hi", "hello", "hey", "howdy", "greetings", "morning", "afternoon", "evening",
];
const GREETING_MAX_WORDS: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `ConversationCommand` values.
pub enum ConversationCommand {
    Greeting,
    Reset,
    Help,
}

impl ConversationCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Reset => "reset",
            Self::Help => "help",
        }
    }
}

#[derive(Debug, Clone)]
struct VocabularyEntry {
    command: ConversationCommand,
    phrases: Vec<String>,
}

#[derive(Debug, Clone)]
/// Fixed phrase/synonym table per command, extensible by data.
pub struct CommandVocabulary {
    entries: Vec<VocabularyEntry>,
}

impl Default for CommandVocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CommandVocabulary {
    /// The builtin vocabulary: exact phrases first, greeting heuristics after.
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                VocabularyEntry {
                    command: ConversationCommand::Reset,
                    phrases: phrase_list(&[
                        "reset",
                        "start over",
                        "start again",
                        "restart",
                        "cancel",
                        "never mind",
                    ]),
                },
                VocabularyEntry {
                    command: ConversationCommand::Help,
                    phrases: phrase_list(&["help", "what can you do", "options", "menu"]),
                },
                VocabularyEntry {
                    command: ConversationCommand::Greeting,
                    phrases: phrase_list(&["good morning", "good afternoon", "good evening"]),
                },
            ],
        }
    }

    /// Adds synonyms for one command without touching the builtin table.
    pub fn with_synonyms(mut self, command: ConversationCommand, phrases: &[&str]) -> Self {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.command == command)
        {
            entry.phrases.extend(phrase_list(phrases));
        } else {
            self.entries.push(VocabularyEntry {
                command,
                phrases: phrase_list(phrases),
            });
        }
        self
    }

    /// Pure classification; unknown or empty text is never a command.
    pub fn classify(&self, raw: &str) -> Option<ConversationCommand> {
        let normalized = normalize_command_text(raw);
        if normalized.is_empty() {
            return None;
        }

        for entry in &self.entries {
            if entry.phrases.iter().any(|phrase| phrase == &normalized) {
                return Some(entry.command);
            }
        }

        if looks_like_greeting(&normalized) {
            return Some(ConversationCommand::Greeting);
        }

        None
    }
}

fn phrase_list(phrases: &[&str]) -> Vec<String> {
    phrases
        .iter()
        .map(|phrase| phrase.trim().to_ascii_lowercase())
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

fn normalize_command_text(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(['!', '?', '.', ','])
        .trim()
        .to_ascii_lowercase()
}

/// Short messages opening with a salutation token read as greetings even
/// when they are not an exact vocabulary phrase ("hey there").
fn looks_like_greeting(normalized: &str) -> bool {
    let mut words = normalized.split_whitespace();
    let Some(first) = words.next() else {
        return false;
    };
    if !GREETING_SALUTATIONS.contains(&first) {
        return false;
    }
    words.count() + 1 <= GREETING_MAX_WORDS
}
