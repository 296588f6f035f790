use crate::continuation::{Core, Shared, StageCallback};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of one stage of a continuation.
///
/// Stage ids are small integers chosen by the author of the continuation.
/// Stage `0` ([`StageId::START`]) is the entry point run by `begin()`.
///
/// # Examples
///
/// ```
/// use tsunagi::StageId;
///
/// let id = StageId::new(2);
/// assert_eq!(id.get(), 2);
/// assert_eq!(id.to_string(), "2");
///
/// let id: StageId = 7u32.into();
/// assert_eq!(id, StageId::new(7));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StageId(u32);

impl StageId {
    /// The stage run by `begin()`.
    pub const START: StageId = StageId(0);

    /// Creates a stage id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StageId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

pub(crate) type Handler<S> = Box<dyn FnMut(&mut Stage<'_, S>, i32) -> bool + Send>;

/// The view of a running continuation handed to each stage handler.
///
/// A handler receives `&mut Stage` plus the result code its stage was
/// delivered with, and returns `true` when the whole computation is done.
/// Through the `Stage` it can reach the continuation's state, dispatch other
/// stages inline with [`immediate`](Stage::immediate), obtain callback tokens
/// for asynchronous work with [`callback`](Stage::callback), and set the
/// value reported to the completion callback with
/// [`set_rval`](Stage::set_rval).
///
/// # Examples
///
/// ```
/// use tsunagi::prelude::*;
///
/// define_stages! {
///     enum Lookup {
///         Start = 0,
///         Found = 1,
///     }
/// }
///
/// fn start(stage: &mut Stage<'_, Vec<u32>>, _r: i32) -> bool {
///     stage.state_mut().push(10);
///     stage.immediate(Lookup::Found, 10)
/// }
///
/// fn found(stage: &mut Stage<'_, Vec<u32>>, r: i32) -> bool {
///     stage.set_rval(r + stage.state().len() as i32);
///     true
/// }
///
/// let (tx, mut rx) = completion::channel();
/// Continuation::new(Vec::new(), tx)
///     .stage(Lookup::Start, start)
///     .stage(Lookup::Found, found)
///     .begin();
///
/// assert_eq!(rx.try_result(), Some(Ok(11)));
/// ```
pub struct Stage<'a, S> {
    pub(crate) core: &'a mut Core<S>,
    pub(crate) shared: &'a Arc<Shared<S>>,
    pub(crate) id: StageId,
}

impl<S: Send + 'static> Stage<'_, S> {
    /// The id of the stage whose handler is running.
    pub fn id(&self) -> StageId {
        self.id
    }

    /// The continuation's label, as set with `named()`.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn state(&self) -> &S {
        &self.core.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.core.state
    }

    /// Runs another stage's handler right now, on this call stack.
    ///
    /// Returns that handler's verdict. No completion check is made here: the
    /// calling handler decides what to return.
    ///
    /// # Panics
    ///
    /// Panics if `stage` is already in flight or has no handler.
    pub fn immediate(&mut self, stage: impl Into<StageId>, r: i32) -> bool {
        let stage = stage.into();
        self.core.mark_in_flight(stage);
        self.core.run_stage(self.shared, stage, r)
    }

    /// Marks `stage` in flight and returns a token that re-enters the
    /// continuation at that stage when completed.
    ///
    /// Hand the token to whatever performs the asynchronous work. A token
    /// that is dropped without being completed leaves the stage pending
    /// forever.
    ///
    /// # Panics
    ///
    /// Panics if `stage` is already in flight.
    pub fn callback(&mut self, stage: impl Into<StageId>) -> StageCallback {
        let stage = stage.into();
        self.core.mark_in_flight(stage);
        StageCallback::new(self.shared.clone(), stage)
    }

    /// Sets the value delivered to the completion callback. Last write wins.
    pub fn set_rval(&mut self, rval: i32) {
        self.core.rval = rval;
    }

    pub fn rval(&self) -> i32 {
        self.core.rval
    }

    /// Registers a handler for a stage while the continuation is running.
    ///
    /// # Panics
    ///
    /// Panics if `stage` already has a handler.
    pub fn register<F>(&mut self, stage: impl Into<StageId>, handler: F)
    where
        F: FnMut(&mut Stage<'_, S>, i32) -> bool + Send + 'static,
    {
        self.core.register(stage.into(), Box::new(handler));
    }

    /// Number of stages in flight besides this one.
    ///
    /// A handler may only report the computation as done when this is zero.
    pub fn outstanding(&self) -> usize {
        self.core
            .in_flight
            .iter()
            .filter(|&&stage| stage != self.id)
            .count()
    }
}

impl<S> fmt::Debug for Stage<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("continuation", &self.core.name)
            .field("id", &self.id)
            .field("in_flight", &self.core.in_flight)
            .field("rval", &self.core.rval)
            .finish()
    }
}
