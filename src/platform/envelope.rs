//! Alexa custom-skill JSON envelope
//!
//! Only the fields the skill reads are modelled; everything else in the
//! request is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::core::types::{SessionState, Slots};
use crate::dispatch::{RequestInfo, VoiceEvent};
use crate::handlers::SpeechResponse;

pub const RESPONSE_VERSION: &str = "1.0";

/// An inbound skill request
#[derive(Debug, Clone, Deserialize)]
pub struct SkillRequest {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub session: Option<SessionEnvelope>,
    #[serde(default)]
    pub context: Option<ContextEnvelope>,
    pub request: RequestBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnvelope {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub application: Option<Application>,
    #[serde(default)]
    pub attributes: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub application_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextEnvelope {
    #[serde(rename = "System", default)]
    pub system: Option<SystemEnvelope>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemEnvelope {
    #[serde(default)]
    pub application: Option<Application>,
}

/// The `request` object, tagged by its `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum RequestBody {
    LaunchRequest {
        #[serde(rename = "requestId", default)]
        request_id: String,
    },
    IntentRequest {
        #[serde(rename = "requestId", default)]
        request_id: String,
        intent: Intent,
    },
    SessionEndedRequest {
        #[serde(rename = "requestId", default)]
        request_id: String,
        #[serde(default)]
        reason: Option<String>,
    },
    /// Display, audio player and other request types the skill ignores
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Intent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slots: HashMap<String, SlotValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotValue {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl SkillRequest {
    /// Application ID from the session, or from `context.System` when the
    /// request carries no session
    pub fn application_id(&self) -> Option<&str> {
        let from_session = self
            .session
            .as_ref()
            .and_then(|s| s.application.as_ref());
        let from_context = || {
            self.context
                .as_ref()
                .and_then(|c| c.system.as_ref())
                .and_then(|s| s.application.as_ref())
        };
        from_session
            .or_else(from_context)
            .map(|app| app.application_id.as_str())
    }

    pub fn is_new_session(&self) -> bool {
        self.session.as_ref().map_or(false, |s| s.new)
    }

    pub fn info(&self) -> RequestInfo {
        let request_id = match &self.request {
            RequestBody::LaunchRequest { request_id }
            | RequestBody::IntentRequest { request_id, .. }
            | RequestBody::SessionEndedRequest { request_id, .. } => request_id.clone(),
            RequestBody::Unsupported => String::new(),
        };
        let session_id = self
            .session
            .as_ref()
            .map(|s| s.session_id.clone())
            .unwrap_or_default();
        RequestInfo {
            request_id,
            session_id,
        }
    }

    /// Session attributes as strings
    ///
    /// Non-string values keep their JSON text; nulls are dropped.
    pub fn session_state(&self) -> SessionState {
        let Some(attributes) = self.session.as_ref().and_then(|s| s.attributes.as_ref()) else {
            return SessionState::new();
        };
        attributes
            .iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(s) => Some((key.clone(), s.clone())),
                other => Some((key.clone(), other.to_string())),
            })
            .collect()
    }

    /// The event this request delivers, if the skill understands it
    pub fn event(&self) -> Option<VoiceEvent> {
        match &self.request {
            RequestBody::LaunchRequest { .. } => Some(VoiceEvent::Launch),
            RequestBody::IntentRequest { intent, .. } => Some(VoiceEvent::Intent {
                name: intent.name.clone(),
                slots: intent.slots(),
            }),
            RequestBody::SessionEndedRequest { .. } => Some(VoiceEvent::SessionEnded),
            RequestBody::Unsupported => None,
        }
    }
}

impl Intent {
    /// Slots that carry a value, keyed by slot name
    pub fn slots(&self) -> Slots {
        self.slots
            .iter()
            .filter_map(|(key, slot)| slot.value.as_ref().map(|v| (key.clone(), v.clone())))
            .collect()
    }
}

/// An outbound skill response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillResponse {
    pub version: String,
    pub session_attributes: SessionState,
    pub response: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    pub should_end_session: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum OutputSpeech {
    PlainText { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Card {
    Simple { title: String, content: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

impl SkillResponse {
    /// Wrap a handler reply together with the session to carry forward
    pub fn speech(reply: SpeechResponse, session: SessionState) -> Self {
        let card = match (reply.card_title, reply.card_body) {
            (None, None) => None,
            (title, content) => Some(Card::Simple {
                title: title.unwrap_or_default(),
                content: content.unwrap_or_default(),
            }),
        };
        Self {
            version: RESPONSE_VERSION.to_string(),
            session_attributes: session,
            response: ResponseBody {
                output_speech: Some(OutputSpeech::PlainText {
                    text: reply.spoken_text,
                }),
                card,
                reprompt: reply.reprompt_text.map(|text| Reprompt {
                    output_speech: OutputSpeech::PlainText { text },
                }),
                should_end_session: reply.should_end_session,
            },
        }
    }

    /// Acknowledgement with nothing to say, e.g. for `SessionEndedRequest`
    pub fn empty(session: SessionState) -> Self {
        Self {
            version: RESPONSE_VERSION.to_string(),
            session_attributes: session,
            response: ResponseBody {
                output_speech: None,
                card: None,
                reprompt: None,
                should_end_session: true,
            },
        }
    }
}
