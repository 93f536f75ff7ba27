//! Session lifecycle engine.
//!
//! The single place where transition legality is decided. Handlers, the
//! realtime channels and the expiry sweeper all go through
//! [`LifecycleEngine`]; it talks to storage through
//! [`SessionStore`](cyberxercise_db::store::SessionStore) and to connected
//! clients through [`Broadcaster`].
//!
//! - [`lifecycle`] -- create, join, ready, start, end, expire, message, leave.
//! - [`identity`] -- participant token resolution.
//! - [`events`] -- the realtime event payloads.
//! - [`broadcast`] -- the fan-out seam.

pub mod broadcast;
pub mod events;
pub mod identity;
pub mod lifecycle;

pub use broadcast::Broadcaster;
pub use events::SessionEvent;
pub use identity::{AuthRejection, ParticipantAuth, ParticipantContext};
pub use lifecycle::{EngineConfig, JoinedParticipant, LeftParticipant, LifecycleEngine};
