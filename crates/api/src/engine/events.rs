//! Realtime events pushed to session subscribers.
//!
//! Serialized as `{"type": "<event>", "data": {...}}`.

use cyberxercise_core::types::{DbId, Timestamp};
use cyberxercise_db::models::exercise_session::ExerciseSession;
use cyberxercise_db::models::message::Message;
use cyberxercise_db::models::participant::Participant;
use cyberxercise_db::models::status::{EndedBy, SessionStatus};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    ParticipantJoined {
        participant: ParticipantState,
    },
    ParticipantReadyChanged {
        participant: ParticipantState,
    },
    ParticipantLeft {
        participant: ParticipantDeparture,
    },
    MessageSubmitted {
        message: MessageBody,
        participant: Sender,
    },
    SessionStarted {
        session: SessionStartedBody,
    },
    SessionEnded {
        session: SessionEndedBody,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantState {
    pub id: DbId,
    pub display_name: String,
    pub is_ready: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantDeparture {
    pub id: DbId,
    pub display_name: String,
    pub left_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageBody {
    pub id: DbId,
    pub participant_id: DbId,
    pub content: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sender {
    pub id: DbId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStartedBody {
    pub id: DbId,
    pub status: SessionStatus,
    pub started_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEndedBody {
    pub id: DbId,
    pub status: SessionStatus,
    pub ended_at: Option<Timestamp>,
    pub ended_by: Option<EndedBy>,
}

impl SessionEvent {
    pub fn participant_joined(p: &Participant) -> Self {
        SessionEvent::ParticipantJoined {
            participant: ParticipantState::from(p),
        }
    }

    pub fn participant_ready_changed(p: &Participant) -> Self {
        SessionEvent::ParticipantReadyChanged {
            participant: ParticipantState::from(p),
        }
    }

    pub fn participant_left(p: &Participant) -> Self {
        SessionEvent::ParticipantLeft {
            participant: ParticipantDeparture {
                id: p.id,
                display_name: p.display_name.clone(),
                left_at: p.left_at,
            },
        }
    }

    pub fn message_submitted(message: &Message, sender: &Participant) -> Self {
        SessionEvent::MessageSubmitted {
            message: MessageBody {
                id: message.id,
                participant_id: message.participant_id,
                content: message.content.clone(),
                created_at: message.created_at,
            },
            participant: Sender {
                id: sender.id,
                display_name: sender.display_name.clone(),
            },
        }
    }

    pub fn session_started(s: &ExerciseSession) -> Self {
        SessionEvent::SessionStarted {
            session: SessionStartedBody {
                id: s.id,
                status: s.status,
                started_at: s.started_at,
            },
        }
    }

    pub fn session_ended(s: &ExerciseSession) -> Self {
        SessionEvent::SessionEnded {
            session: SessionEndedBody {
                id: s.id,
                status: s.status,
                ended_at: s.ended_at,
                ended_by: s.ended_by,
            },
        }
    }

    /// The `type` tag this event serializes with.
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::ParticipantJoined { .. } => "participant_joined",
            SessionEvent::ParticipantReadyChanged { .. } => "participant_ready_changed",
            SessionEvent::ParticipantLeft { .. } => "participant_left",
            SessionEvent::MessageSubmitted { .. } => "message_submitted",
            SessionEvent::SessionStarted { .. } => "session_started",
            SessionEvent::SessionEnded { .. } => "session_ended",
        }
    }
}

impl From<&Participant> for ParticipantState {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id,
            display_name: p.display_name.clone(),
            is_ready: p.is_ready,
        }
    }
}
