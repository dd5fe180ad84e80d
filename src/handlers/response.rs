//! Spoken responses

use serde::Serialize;

/// Title shown on every card the skill renders
pub const CARD_TITLE: &str = "Kubernetes";

/// Everything the voice platform needs to answer one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeechResponse {
    pub spoken_text: String,
    pub reprompt_text: Option<String>,
    pub card_title: Option<String>,
    pub card_body: Option<String>,
    pub should_end_session: bool,
}

impl SpeechResponse {
    /// A normal answer that keeps the conversation open
    pub fn reply(action: &str, text: impl Into<String>) -> Self {
        Self {
            spoken_text: text.into(),
            reprompt_text: None,
            card_title: Some(CARD_TITLE.to_string()),
            card_body: Some(action.to_string()),
            should_end_session: false,
        }
    }

    /// A failure notice carrying the backing system's message
    pub fn failure(action: &str, message: &str) -> Self {
        let text = if message.is_empty() {
            format!("Failed to {}!", action)
        } else {
            format!("Failed to {}! {}", action, message)
        };
        Self::reply(action, text)
    }

    /// Reply for an intent nobody handles
    pub fn unrecognized() -> Self {
        Self {
            spoken_text: "I don't know how to do that.".to_string(),
            reprompt_text: None,
            card_title: None,
            card_body: None,
            should_end_session: true,
        }
    }
}

/// Human readable action for an intent name: `GetDeploymentConfigs` -> `Get Deployment Configs`
pub fn action_phrase(intent_name: &str) -> String {
    let mut phrase = String::with_capacity(intent_name.len() + 4);
    let mut prev: Option<char> = None;
    for c in intent_name.chars() {
        if let Some(p) = prev {
            let boundary = (c.is_uppercase() && (p.is_lowercase() || p.is_ascii_digit()))
                || (c.is_ascii_digit() && p.is_alphabetic());
            if boundary {
                phrase.push(' ');
            }
        }
        phrase.push(c);
        prev = Some(c);
    }
    phrase
}
