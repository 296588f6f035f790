//! # Tsunagi (繋ぎ)
//!
//! Staged continuations for callback-driven asynchronous code.
//!
//! "Tsunagi" (繋ぎ) means "link" or "connection" in Japanese: a continuation
//! links the stages of one logical operation together, whether each stage
//! finishes on the spot or much later in some other subsystem.
//!
//! ## Features
//!
//! - **One completion, exactly once**: the caller's [`Completion`] fires once,
//!   when the last outstanding stage reports the operation done
//! - **Inline or asynchronous stages**: dispatch a stage on the current call
//!   stack with [`Stage::immediate`], or hand a [`StageCallback`] to an I/O
//!   layer with [`Stage::callback`]
//! - **Self-owning**: after [`Continuation::begin`] the continuation is kept
//!   alive by its callback tokens only
//! - **Fail fast**: contract violations (a stage dispatched twice, "done"
//!   reported with stages outstanding) panic instead of corrupting the run
//! - **tokio friendly**: [`StageCallback::spawn_with`] and
//!   [`completion::channel`] bridge to async code
//!
//! ## Quick Start
//!
//! ```rust
//! use tsunagi::prelude::*;
//!
//! define_stages! {
//!     enum Checksum {
//!         Start = 0,
//!         Sum = 1,
//!     }
//! }
//!
//! let (tx, rx) = completion::channel();
//!
//! Continuation::new(vec![1, 2, 3], tx)
//!     .named("checksum")
//!     .stage(Checksum::Start, |stage: &mut Stage<'_, Vec<i32>>, r| {
//!         stage.immediate(Checksum::Sum, r)
//!     })
//!     .stage(Checksum::Sum, |stage: &mut Stage<'_, Vec<i32>>, _| {
//!         let sum = stage.state().iter().sum();
//!         stage.set_rval(sum);
//!         true
//!     })
//!     .begin();
//!
//! assert_eq!(rx.wait(), Ok(6));
//! ```
//!
//! ## Asynchronous Stages
//!
//! ```rust
//! use tsunagi::prelude::*;
//!
//! define_stages! {
//!     enum Replicate {
//!         Start = 0,
//!         Primary = 1,
//!         Replica = 2,
//!     }
//! }
//!
//! fn written(stage: &mut Stage<'_, ()>, r: i32) -> bool {
//!     if r < 0 {
//!         stage.set_rval(r);
//!     }
//!     stage.outstanding() == 0
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (tx, rx) = completion::channel();
//!
//! Continuation::new((), tx)
//!     .named("replicate")
//!     .stage(Replicate::Start, |stage: &mut Stage<'_, ()>, _| {
//!         stage.callback(Replicate::Primary).spawn_with(async { 0 });
//!         stage.callback(Replicate::Replica).spawn_with(async { -5 });
//!         false
//!     })
//!     .stage(Replicate::Primary, written)
//!     .stage(Replicate::Replica, written)
//!     .begin();
//!
//! let r = rx.await.expect("continuation completes");
//! assert_eq!(ContinuationError::check(r), Err(ContinuationError::Failed(-5)));
//! # }
//! ```

mod continuation;
mod error;
mod stage;

pub mod completion;
pub mod prelude;

pub use completion::Completion;
pub use continuation::{Continuation, StageCallback};
pub use error::ContinuationError;
pub use stage::{Stage, StageId};

/// Macro to declare the stages of a continuation as an enum.
///
/// Each variant maps to a [`StageId`], so the enum can be passed anywhere a
/// stage is expected. The generated enum also gets:
/// - `id()` and `name()` per variant (`name()` is the variant name as a
///   `&'static str`)
/// - `ALL`, every variant in declaration order
/// - `from_id()`, the reverse lookup
/// - `Display` (the variant name)
///
/// # Example
///
/// ```rust
/// use tsunagi::{define_stages, StageId};
///
/// define_stages! {
///     pub enum Write {
///         Start = 0,
///         Journal = 1,
///         Apply = 2,
///     }
/// }
///
/// assert_eq!(StageId::from(Write::Journal), StageId::new(1));
/// assert_eq!(Write::from_id(StageId::new(2)), Some(Write::Apply));
/// assert_eq!(Write::Apply.to_string(), "Apply");
/// ```
#[macro_export]
macro_rules! define_stages {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident = $id:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            /// Every stage, in declaration order.
            #[allow(dead_code)]
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[allow(dead_code)]
            pub const fn id(self) -> $crate::StageId {
                match self {
                    $($name::$variant => $crate::StageId::new($id)),+
                }
            }

            #[allow(dead_code)]
            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }

            #[allow(dead_code)]
            pub fn from_id(id: $crate::StageId) -> Option<Self> {
                Self::ALL.iter().copied().find(|stage| stage.id() == id)
            }
        }

        impl From<$name> for $crate::StageId {
            fn from(stage: $name) -> Self {
                stage.id()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}
