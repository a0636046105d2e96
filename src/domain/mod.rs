//! Domain types shared by the store, the cache and the repositories.
//!
//! [`TrackableRecord`] is the envelope every entity is stored in; the
//! payload types ([`HealthEntry`], [`Reminder`], [`StatusUpdate`],
//! [`CareInstruction`]) carry the per-domain fields. Enum values coming from
//! outside the crate are parsed through [`WireEnum`].

pub mod care;
pub mod health;
pub mod ids;
pub mod parse;
pub mod record;
pub mod reminder;
pub mod status;

pub use care::*;
pub use health::*;
pub use ids::*;
pub use parse::*;
pub use record::*;
pub use reminder::*;
pub use status::*;
