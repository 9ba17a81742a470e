//! The inference engine.
//!
//! A consultation flows through four pieces, leaves first:
//!
//! - [`RuleSnapshot`]: the read-only rule base for one consultation;
//! - [`score`]: how well one rule matches the selection;
//! - [`ResolutionPolicy`]: reduces scored rules to a result;
//! - [`consult`]: validates input, drives the above through a
//!   [`ConsultationStore`](crate::store::ConsultationStore) and persists the
//!   outcome. It is [`evaluate`] (read-only) followed by [`persist`].
//!
//! Rules never chain: a rule's conclusion is not fed back in as a selected
//! characteristic.

mod consult;
mod policy;
mod score;
mod selection;
mod snapshot;

pub use consult::{ConsultError, Consultation, Evaluation, Phase, consult, evaluate, persist};
pub use policy::{DEFAULT_QUORUM_LIMIT, ResolutionPolicy, RuleMatch};
pub use score::{Score, score};
pub use selection::{Selection, SelectionError};
pub use snapshot::RuleSnapshot;
