//! Dispatch - routes voice events to intent handlers
//!
//! One event is one turn. The dispatcher looks up the handler for the
//! event, binds it to the shared cluster handle and runs it to completion.
//! Unknown intents get a fixed reply; only a registry without a `Launch`
//! handler is an error, and that is caught when the dispatcher is built.

pub mod registry;

use std::sync::Arc;

use crate::cluster::ClusterApi;
use crate::core::error::{Result, SkillError};
use crate::core::types::{SessionState, Slots};
use crate::handlers::launch::LAUNCH;
use crate::handlers::SpeechResponse;

pub use registry::HandlerRegistry;

/// Identifiers logged with every event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub request_id: String,
    pub session_id: String,
}

impl RequestInfo {
    pub fn new(request_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            session_id: session_id.into(),
        }
    }
}

/// An event delivered by the voice platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// The user opened the skill without a command
    Launch,
    /// A recognized intent; `name` may be missing on malformed requests
    Intent { name: Option<String>, slots: Slots },
    SessionStarted,
    SessionEnded,
}

/// Routes events to handlers built from the registry
pub struct Dispatcher {
    registry: HandlerRegistry,
    cluster: Arc<dyn ClusterApi>,
}

impl Dispatcher {
    /// Fails if the registry has no `Launch` handler
    pub fn new(registry: HandlerRegistry, cluster: Arc<dyn ClusterApi>) -> Result<Self> {
        if !registry.contains(LAUNCH) {
            return Err(SkillError::MissingHandler(LAUNCH.to_string()));
        }
        Ok(Self { registry, cluster })
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn cluster(&self) -> &Arc<dyn ClusterApi> {
        &self.cluster
    }

    pub fn on_session_started(&self, info: &RequestInfo) {
        tracing::info!(
            "onSessionStarted requestId={}, sessionId={}",
            info.request_id,
            info.session_id
        );
    }

    pub fn on_session_ended(&self, info: &RequestInfo) {
        tracing::info!(
            "onSessionEnded requestId={}, sessionId={}",
            info.request_id,
            info.session_id
        );
    }

    pub async fn on_launch(
        &self,
        info: &RequestInfo,
        session: &mut SessionState,
    ) -> Result<SpeechResponse> {
        tracing::info!(
            "onLaunch requestId={}, sessionId={}",
            info.request_id,
            info.session_id
        );
        let factory = self
            .registry
            .get(LAUNCH)
            .ok_or_else(|| SkillError::MissingHandler(LAUNCH.to_string()))?;
        let handler = factory(self.cluster.clone());
        Ok(handler.handle(&Slots::new(), session).await)
    }

    /// Run the handler registered for `intent`
    ///
    /// Unregistered or missing intent names get the fixed "don't know"
    /// reply and leave the session untouched.
    pub async fn on_intent(
        &self,
        info: &RequestInfo,
        intent: Option<&str>,
        slots: &Slots,
        session: &mut SessionState,
    ) -> SpeechResponse {
        tracing::info!(
            "onIntent requestId={}, sessionId={}, intent={}",
            info.request_id,
            info.session_id,
            intent.unwrap_or("<none>")
        );

        match intent.and_then(|name| self.registry.get(name)) {
            Some(factory) => {
                let handler = factory(self.cluster.clone());
                handler.handle(slots, session).await
            }
            None => {
                tracing::debug!("No handler for intent {:?}", intent);
                SpeechResponse::unrecognized()
            }
        }
    }

    /// Handle one event. Session events produce no reply.
    pub async fn dispatch(
        &self,
        info: &RequestInfo,
        event: &VoiceEvent,
        session: &mut SessionState,
    ) -> Result<Option<SpeechResponse>> {
        match event {
            VoiceEvent::Launch => self.on_launch(info, session).await.map(Some),
            VoiceEvent::Intent { name, slots } => Ok(Some(
                self.on_intent(info, name.as_deref(), slots, session).await,
            )),
            VoiceEvent::SessionStarted => {
                self.on_session_started(info);
                Ok(None)
            }
            VoiceEvent::SessionEnded => {
                self.on_session_ended(info);
                Ok(None)
            }
        }
    }

    /// Answer one intent: the spoken text plus the session as it should be
    /// carried into the next turn
    pub async fn resolve(
        &self,
        intent_name: &str,
        slots: &Slots,
        mut session: SessionState,
    ) -> (String, SessionState) {
        let response = self
            .on_intent(&RequestInfo::default(), Some(intent_name), slots, &mut session)
            .await;
        (response.spoken_text, session)
    }
}
