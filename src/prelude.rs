//! Commonly used types and traits

pub use crate::completion::{self, Completion};
pub use crate::continuation::{Continuation, StageCallback};
pub use crate::define_stages;
pub use crate::error::ContinuationError;
pub use crate::stage::{Stage, StageId};
