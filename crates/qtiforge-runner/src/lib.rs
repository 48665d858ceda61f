//! qtiforge-runner — The delivery runtime.
//!
//! Loads a compiled artifact and drives a test-taker's progression
//! through it: jump table, branch-rule-aware sequencing, response
//! validation, and offline resume.

pub mod error;
pub mod jump;
pub mod sequencer;
pub mod session;
pub mod store;
pub mod validation;

pub use error::SequencerError;
pub use jump::{Jump, JumpTable};
pub use sequencer::{NavigationSequencer, ResumeContext};
pub use session::{DeliverySession, SessionConfig};
pub use store::{load_compact_test, ArtifactItemStore};
