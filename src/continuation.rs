use crate::completion::Completion;
use crate::stage::{Handler, Stage, StageId};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use tracing::{debug, error, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Running,
    Completed,
}

/// Engine bookkeeping. Only ever touched under `Shared::core`, or before
/// `begin()` by the sole owner.
pub(crate) struct Core<S> {
    pub(crate) name: String,
    pub(crate) state: S,
    pub(crate) in_flight: BTreeSet<StageId>,
    pub(crate) rval: i32,
    // `None` marks a handler that is currently running.
    handlers: HashMap<StageId, Option<Handler<S>>>,
    on_finish: Option<Box<dyn Completion>>,
    phase: Phase,
}

impl<S: Send + 'static> Core<S> {
    pub(crate) fn register(&mut self, stage: StageId, handler: Handler<S>) {
        assert!(
            !self.handlers.contains_key(&stage),
            "continuation '{}': stage {} registered twice",
            self.name,
            stage
        );
        self.handlers.insert(stage, Some(handler));
    }

    pub(crate) fn mark_in_flight(&mut self, stage: StageId) {
        assert!(
            self.in_flight.insert(stage),
            "continuation '{}': stage {} dispatched while already in flight",
            self.name,
            stage
        );
        trace!("Continuation '{}' stage {} in flight", self.name, stage);
    }

    /// Runs the handler of an in-flight stage and retires the stage.
    pub(crate) fn run_stage(&mut self, shared: &Arc<Shared<S>>, stage: StageId, r: i32) -> bool {
        assert!(
            self.in_flight.contains(&stage),
            "continuation '{}': stage {} delivered but not in flight",
            self.name,
            stage
        );
        let handler = self.handlers.get_mut(&stage).and_then(Option::take);
        assert!(
            handler.is_some(),
            "continuation '{}': stage {} has no handler",
            self.name,
            stage
        );
        let Some(mut handler) = handler else {
            return false;
        };

        debug!("Continuation '{}' running stage {} (r = {})", self.name, stage, r);
        let done = handler(
            &mut Stage {
                core: &mut *self,
                shared,
                id: stage,
            },
            r,
        );

        if let Some(slot) = self.handlers.get_mut(&stage) {
            *slot = Some(handler);
        }
        self.in_flight.remove(&stage);
        done
    }

    /// Entry point for every top-level delivery: `begin()` and fired tokens.
    fn continue_function(&mut self, shared: &Arc<Shared<S>>, stage: StageId, r: i32) {
        assert!(
            self.phase == Phase::Running,
            "continuation '{}': stage {} delivered after completion",
            self.name,
            stage
        );
        let done = self.run_stage(shared, stage, r);
        assert!(
            !done || self.in_flight.is_empty(),
            "continuation '{}': stage {} reported done with stages {:?} still in flight",
            self.name,
            stage,
            self.in_flight
        );
        if done {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Completed;
        self.handlers.clear();
        if let Some(on_finish) = self.on_finish.take() {
            debug!("Continuation '{}' completed (rval = {})", self.name, self.rval);
            on_finish.complete(self.rval);
        }
    }
}

impl<S> Drop for Core<S> {
    fn drop(&mut self) {
        if self.on_finish.is_none() || std::thread::panicking() {
            return;
        }
        match self.phase {
            // `on_finish` is still set here, so this always fires in debug builds.
            Phase::Idle => debug_assert!(
                self.on_finish.is_none(),
                "continuation '{}' dropped without begin()",
                self.name
            ),
            Phase::Running => warn!(
                "Continuation '{}' abandoned with stages {:?} still in flight",
                self.name, self.in_flight
            ),
            Phase::Completed => {}
        }
    }
}

/// The running engine, owned jointly by its outstanding callback tokens.
pub(crate) struct Shared<S> {
    core: Mutex<Core<S>>,
    // Thread holding `core` while it runs handlers.
    driver: Mutex<Option<ThreadId>>,
    // Tokens completed inline by the driving thread, run once its current
    // handler chain returns.
    pending: Mutex<VecDeque<(StageId, i32)>>,
}

impl<S: Send + 'static> Shared<S> {
    fn deliver(self: &Arc<Self>, stage: StageId, r: i32) {
        let current = thread::current().id();
        if *self.lock_driver() == Some(current) {
            trace!("Stage {} completed inline, deferring delivery", stage);
            self.lock_pending().push_back((stage, r));
            return;
        }

        // Other threads wait their turn and run the handler themselves.
        let mut core = match self.core.lock() {
            Ok(core) => core,
            Err(poisoned) => {
                error!(
                    "Continuation '{}' is poisoned; dropping delivery for stage {}",
                    poisoned.get_ref().name,
                    stage
                );
                return;
            }
        };
        let _driving = Driving::new(&self.driver, current);
        core.continue_function(self, stage, r);
        while let Some((stage, r)) = self.next_pending() {
            core.continue_function(self, stage, r);
        }
    }

    fn next_pending(&self) -> Option<(StageId, i32)> {
        self.lock_pending().pop_front()
    }

    fn lock_pending(&self) -> MutexGuard<'_, VecDeque<(StageId, i32)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_driver(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the current thread as the driver until dropped, including on unwind.
struct Driving<'a> {
    driver: &'a Mutex<Option<ThreadId>>,
}

impl<'a> Driving<'a> {
    fn new(driver: &'a Mutex<Option<ThreadId>>, current: ThreadId) -> Self {
        *driver.lock().unwrap_or_else(PoisonError::into_inner) = Some(current);
        Self { driver }
    }
}

impl Drop for Driving<'_> {
    fn drop(&mut self) {
        *self.driver.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

trait Resume: Send + Sync {
    fn resume(self: Arc<Self>, stage: StageId, r: i32);
}

impl<S: Send + 'static> Resume for Shared<S> {
    fn resume(self: Arc<Self>, stage: StageId, r: i32) {
        self.deliver(stage, r);
    }
}

/// One-shot token that re-enters a continuation at a specific stage.
///
/// Obtained from [`Stage::callback`]. Whatever performs the asynchronous
/// work keeps the token and calls [`complete`](StageCallback::complete) with
/// the result code once, when the work is finished. The token can also be
/// boxed as a [`Completion`] for facilities that take one.
///
/// The stage's handler runs on the thread that calls `complete`, before
/// `complete` returns. If another thread is running a handler of the same
/// continuation, `complete` blocks until that thread lets go.
///
/// Completing a token inline, from inside a handler of its own continuation,
/// is the exception: the delivery is deferred until the running handler
/// chain returns. The issuing handler cannot observe the target stage's
/// effects, and still counts that stage in [`Stage::outstanding`], so it must
/// not report the computation done.
///
/// A token stored in the continuation's state, or captured by one of its
/// handlers, keeps the continuation alive. Such a continuation is never
/// freed and never reports [`ContinuationError::Abandoned`](crate::ContinuationError::Abandoned).
#[must_use = "a stage callback that is never completed leaves its stage in flight forever"]
pub struct StageCallback {
    target: Arc<dyn Resume>,
    stage: StageId,
}

impl StageCallback {
    pub(crate) fn new<S: Send + 'static>(shared: Arc<Shared<S>>, stage: StageId) -> Self {
        Self {
            target: shared,
            stage,
        }
    }

    /// The stage this token re-enters.
    pub fn stage(&self) -> StageId {
        self.stage
    }

    /// Delivers the result code to the stage's handler.
    pub fn complete(self, r: i32) {
        self.target.resume(self.stage, r);
    }

    /// Spawns `work` on the tokio runtime and completes this token with its
    /// output.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn_with<F>(self, work: F)
    where
        F: Future<Output = i32> + Send + 'static,
    {
        tokio::spawn(async move {
            let r = work.await;
            self.complete(r);
        });
    }
}

impl Completion for StageCallback {
    fn complete(self: Box<Self>, r: i32) {
        StageCallback::complete(*self, r);
    }
}

impl fmt::Debug for StageCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageCallback")
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

/// A staged continuation: one logical operation built from stages that
/// complete inline or through callback tokens.
///
/// Build it with the operation's state and a completion callback, register a
/// handler per stage, then call [`begin`](Continuation::begin). Stage
/// [`StageId::START`] runs first. The completion callback fires exactly once,
/// with the value last passed to [`Stage::set_rval`] (default `0`), when a
/// handler reports the computation done and no other stage is in flight.
///
/// Nothing outside the continuation holds it after `begin()`: it lives as
/// long as its outstanding callback tokens and becomes inert once complete.
/// Tokens kept inside the continuation itself (in its state, or captured by
/// a handler) form a cycle: if they are never completed the continuation
/// leaks instead of being dropped, and its receiver never sees `Abandoned`.
///
/// # Contract violations
///
/// These panic:
///
/// - registering a handler for a stage twice
/// - dispatching a stage that is already in flight
/// - delivering a stage that has no handler
/// - reporting done while other stages are in flight
/// - delivering a stage after completion
///
/// Dropping a continuation that was never begun trips a debug assertion.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use tsunagi::prelude::*;
///
/// define_stages! {
///     enum Fetch {
///         Start = 0,
///         Received = 1,
///     }
/// }
///
/// // Stands in for an I/O layer that keeps the token until its work is done.
/// let parked: Arc<Mutex<Option<StageCallback>>> = Arc::default();
/// let io = parked.clone();
/// let (tx, mut rx) = completion::channel();
///
/// Continuation::new((), tx)
///     .named("fetch")
///     .stage(Fetch::Start, move |stage: &mut Stage<'_, ()>, _| {
///         *io.lock().unwrap() = Some(stage.callback(Fetch::Received));
///         false
///     })
///     .stage(Fetch::Received, |stage: &mut Stage<'_, ()>, r| {
///         stage.set_rval(r);
///         true
///     })
///     .begin();
///
/// assert_eq!(rx.try_result(), None);
/// let token = parked.lock().unwrap().take().unwrap();
/// token.complete(7);
/// assert_eq!(rx.try_result(), Some(Ok(7)));
/// ```
pub struct Continuation<S> {
    core: Core<S>,
}

impl<S: Send + 'static> Continuation<S> {
    /// Creates a continuation that reports to `on_finish`.
    pub fn new(state: S, on_finish: impl Completion + 'static) -> Self {
        Self {
            core: Core {
                name: "continuation".to_string(),
                state,
                in_flight: BTreeSet::new(),
                rval: 0,
                handlers: HashMap::new(),
                on_finish: Some(Box::new(on_finish)),
                phase: Phase::Idle,
            },
        }
    }

    /// Sets the label used in log lines.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.core.name = name.into();
        self
    }

    /// Registers the handler for `stage`.
    ///
    /// # Panics
    ///
    /// Panics if `stage` already has a handler.
    pub fn stage<F>(mut self, stage: impl Into<StageId>, handler: F) -> Self
    where
        F: FnMut(&mut Stage<'_, S>, i32) -> bool + Send + 'static,
    {
        self.core.register(stage.into(), Box::new(handler));
        self
    }

    /// Starts the computation by running stage 0 with result code 0.
    ///
    /// Consumes the continuation: from here on it is owned by the callback
    /// tokens its stages hand out, and freed when the last one goes away.
    ///
    /// # Panics
    ///
    /// Panics if stage 0 has no handler.
    pub fn begin(self) {
        let mut core = self.core;
        core.phase = Phase::Running;
        core.mark_in_flight(StageId::START);

        let shared = Arc::new(Shared {
            core: Mutex::new(core),
            driver: Mutex::new(None),
            pending: Mutex::new(VecDeque::new()),
        });
        shared.deliver(StageId::START, 0);
    }
}

impl<S> fmt::Debug for Continuation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stages: Vec<_> = self.core.handlers.keys().collect();
        stages.sort();
        f.debug_struct("Continuation")
            .field("name", &self.core.name)
            .field("stages", &stages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{self, CompletionReceiver};
    use crate::ContinuationError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const START: StageId = StageId::START;
    const FIRST: StageId = StageId::new(1);
    const SECOND: StageId = StageId::new(2);

    /// Keeps tokens the way an I/O layer would until the test completes them.
    #[derive(Clone, Default)]
    struct Parked(Arc<Mutex<Vec<StageCallback>>>);

    impl Parked {
        fn park(&self, token: StageCallback) {
            self.0.lock().unwrap().push(token);
        }

        fn take(&self, stage: StageId) -> StageCallback {
            let mut tokens = self.0.lock().unwrap();
            let index = tokens.iter().position(|t| t.stage() == stage).unwrap();
            tokens.remove(index)
        }

        fn len(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    fn counting_channel() -> (impl Completion, Arc<AtomicUsize>, CompletionReceiver) {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = completion::channel();
        let counter = calls.clone();
        let on_finish = move |r: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(tx).complete(r);
        };
        (on_finish, calls, rx)
    }

    #[test]
    fn test_single_synchronous_stage() {
        let (on_finish, calls, mut rx) = counting_channel();

        Continuation::new((), on_finish)
            .stage(START, |_: &mut Stage<'_, ()>, _| true)
            .begin();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(rx.try_result(), Some(Ok(0)));
    }

    #[test]
    fn test_linear_synchronous_chain() {
        let (on_finish, calls, mut rx) = counting_channel();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (o0, o1, o2) = (order.clone(), order.clone(), order.clone());

        Continuation::new((), on_finish)
            .stage(START, move |stage: &mut Stage<'_, ()>, r| {
                o0.lock().unwrap().push(0);
                stage.immediate(FIRST, r)
            })
            .stage(FIRST, move |stage: &mut Stage<'_, ()>, r| {
                o1.lock().unwrap().push(1);
                stage.immediate(SECOND, r)
            })
            .stage(SECOND, move |stage: &mut Stage<'_, ()>, _| {
                o2.lock().unwrap().push(2);
                stage.set_rval(42);
                true
            })
            .begin();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(rx.try_result(), Some(Ok(42)));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_single_async_stage() {
        let (on_finish, calls, mut rx) = counting_channel();
        let parked = Parked::default();
        let io = parked.clone();

        Continuation::new((), on_finish)
            .stage(START, move |stage: &mut Stage<'_, ()>, _| {
                io.park(stage.callback(FIRST));
                false
            })
            .stage(FIRST, |stage: &mut Stage<'_, ()>, r| {
                stage.set_rval(r);
                true
            })
            .begin();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(rx.try_result(), None);

        parked.take(FIRST).complete(7);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(rx.try_result(), Some(Ok(7)));
    }

    fn parallel_pair(order: [StageId; 2]) {
        let (on_finish, calls, mut rx) = counting_channel();
        let parked = Parked::default();
        let io = parked.clone();
        fn leaf(stage: &mut Stage<'_, ()>, r: i32) -> bool {
            stage.set_rval(stage.rval() + r);
            stage.outstanding() == 0
        }


        Continuation::new((), on_finish)
            .stage(START, move |stage: &mut Stage<'_, ()>, _| {
                io.park(stage.callback(FIRST));
                io.park(stage.callback(SECOND));
                false
            })
            .stage(FIRST, leaf)
            .stage(SECOND, leaf)
            .begin();

        assert_eq!(parked.len(), 2);
        parked.take(order[0]).complete(10);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(rx.try_result(), None);

        parked.take(order[1]).complete(5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(rx.try_result(), Some(Ok(15)));
    }

    #[test]
    fn test_parallel_async_stages_in_order() {
        parallel_pair([FIRST, SECOND]);
    }

    #[test]
    fn test_parallel_async_stages_reversed() {
        parallel_pair([SECOND, FIRST]);
    }

    #[test]
    fn test_last_rval_wins() {
        let (tx, mut rx) = completion::channel();

        Continuation::new((), tx)
            .stage(START, |stage: &mut Stage<'_, ()>, _| {
                stage.set_rval(1);
                stage.set_rval(-3);
                stage.immediate(FIRST, 0)
            })
            .stage(FIRST, |stage: &mut Stage<'_, ()>, _| {
                stage.set_rval(stage.rval() * 2);
                true
            })
            .begin();

        assert_eq!(rx.try_result(), Some(Ok(-6)));
    }

    #[test]
    fn test_token_completed_inline_is_deferred() {
        let (tx, mut rx) = completion::channel();
        let ran = Arc::new(Mutex::new(Vec::new()));
        let (r0, r1) = (ran.clone(), ran.clone());

        Continuation::new((), tx)
            .stage(START, move |stage: &mut Stage<'_, ()>, _| {
                // An I/O layer that finishes before returning control.
                stage.callback(FIRST).complete(3);
                assert_eq!(stage.outstanding(), 1);
                r0.lock().unwrap().push(START);
                false
            })
            .stage(FIRST, move |stage: &mut Stage<'_, ()>, r| {
                r1.lock().unwrap().push(FIRST);
                stage.set_rval(r);
                true
            })
            .begin();

        assert_eq!(rx.try_result(), Some(Ok(3)));
        assert_eq!(*ran.lock().unwrap(), vec![START, FIRST]);
    }

    #[test]
    fn test_token_completed_from_another_thread_runs_there() {
        let (tx, mut rx) = completion::channel();
        let (park, parked) = std::sync::mpsc::channel();
        let ran_on = Arc::new(Mutex::new(None));
        let seen = ran_on.clone();

        let driver = thread::spawn(move || {
            Continuation::new((), tx)
                .stage(START, move |stage: &mut Stage<'_, ()>, _| {
                    park.send(stage.callback(FIRST)).unwrap();
                    // Keep holding the continuation while the token completes.
                    thread::sleep(Duration::from_millis(100));
                    false
                })
                .stage(FIRST, move |stage: &mut Stage<'_, ()>, r| {
                    *seen.lock().unwrap() = Some(thread::current().id());
                    stage.set_rval(r);
                    true
                })
                .begin();
        });

        let token: StageCallback = parked.recv().unwrap();
        token.complete(1);

        assert_eq!(*ran_on.lock().unwrap(), Some(thread::current().id()));
        assert_eq!(rx.try_result(), Some(Ok(1)));
        driver.join().unwrap();
    }

    #[test]
    fn test_stage_registered_during_run() {
        let (tx, mut rx) = completion::channel();

        Continuation::new(2i32, tx)
            .stage(START, |stage: &mut Stage<'_, i32>, _| {
                let factor = *stage.state();
                stage.register(FIRST, move |stage: &mut Stage<'_, i32>, r| {
                    stage.set_rval(r * factor);
                    true
                });
                stage.immediate(FIRST, 21)
            })
            .begin();

        assert_eq!(rx.try_result(), Some(Ok(42)));
    }

    #[test]
    fn test_stage_redispatched_after_it_returns() {
        let (tx, mut rx) = completion::channel();
        let parked = Parked::default();
        let io = parked.clone();

        Continuation::new(0u32, tx)
            .stage(START, move |stage: &mut Stage<'_, u32>, _| {
                io.park(stage.callback(FIRST));
                false
            })
            .stage(FIRST, |stage: &mut Stage<'_, u32>, r| {
                *stage.state_mut() += 1;
                if *stage.state() < 3 {
                    stage.callback(SECOND).complete(r);
                    false
                } else {
                    stage.set_rval(*stage.state() as i32);
                    true
                }
            })
            .stage(SECOND, |stage: &mut Stage<'_, u32>, r| {
                // stage 1 has returned by the time this deferred delivery runs
                stage.callback(FIRST).complete(r);
                false
            })
            .begin();

        parked.take(FIRST).complete(0);
        assert_eq!(rx.try_result(), Some(Ok(3)));
    }

    #[test]
    fn test_dropped_tokens_abandon_the_run() {
        let (tx, mut rx) = completion::channel();
        let parked = Parked::default();
        let io = parked.clone();

        Continuation::new((), tx)
            .stage(START, move |stage: &mut Stage<'_, ()>, _| {
                io.park(stage.callback(FIRST));
                false
            })
            .stage(FIRST, |_: &mut Stage<'_, ()>, _| true)
            .begin();

        assert_eq!(rx.try_result(), None);
        drop(parked.take(FIRST));
        assert_eq!(rx.try_result(), Some(Err(ContinuationError::Abandoned)));
    }

    #[test]
    fn test_token_kept_in_state_keeps_run_alive() {
        let (tx, mut rx) = completion::channel();
        let alive = Arc::new(());

        Continuation::new((alive.clone(), Vec::new()), tx)
            .stage(START, |stage: &mut Stage<'_, (Arc<()>, Vec<StageCallback>)>, _| {
                let token = stage.callback(FIRST);
                stage.state_mut().1.push(token);
                false
            })
            .stage(FIRST, |_: &mut Stage<'_, (Arc<()>, Vec<StageCallback>)>, _| true)
            .begin();

        // The token owns the continuation, which owns the token.
        assert_eq!(Arc::strong_count(&alive), 2);
        assert_eq!(rx.try_result(), None);
    }

    #[test]
    fn test_debug_lists_stages() {
        let continuation = Continuation::new((), |_: i32| {})
            .named("debug")
            .stage(SECOND, |_: &mut Stage<'_, ()>, _| true)
            .stage(START, |_: &mut Stage<'_, ()>, _| true);
        assert_eq!(
            format!("{:?}", continuation),
            "Continuation { name: \"debug\", stages: [StageId(0), StageId(2)] }"
        );
        continuation.begin();
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_registration_panics() {
        let _ = Continuation::new((), |_: i32| {})
            .stage(START, |_: &mut Stage<'_, ()>, _| true)
            .stage(START, |_: &mut Stage<'_, ()>, _| true);
    }

    #[test]
    #[should_panic(expected = "dispatched while already in flight")]
    fn test_immediate_on_in_flight_stage_panics() {
        Continuation::new((), |_: i32| {})
            .stage(START, |stage: &mut Stage<'_, ()>, r| stage.immediate(START, r))
            .begin();
    }

    #[test]
    #[should_panic(expected = "dispatched while already in flight")]
    fn test_callback_on_in_flight_stage_panics() {
        Continuation::new(Vec::new(), |_: i32| {})
            .stage(START, |stage: &mut Stage<'_, Vec<StageCallback>>, _| {
                let first = stage.callback(FIRST);
                let again = stage.callback(FIRST);
                stage.state_mut().extend([first, again]);
                false
            })
            .begin();
    }

    #[test]
    #[should_panic(expected = "has no handler")]
    fn test_unregistered_stage_panics() {
        Continuation::new((), |_: i32| {})
            .stage(START, |stage: &mut Stage<'_, ()>, r| stage.immediate(FIRST, r))
            .begin();
    }

    #[test]
    #[should_panic(expected = "stage 0 has no handler")]
    fn test_begin_without_start_stage_panics() {
        Continuation::new((), |_: i32| {})
            .stage(FIRST, |_: &mut Stage<'_, ()>, _| true)
            .begin();
    }

    #[test]
    #[should_panic(expected = "still in flight")]
    fn test_done_with_outstanding_stages_panics() {
        let parked = Parked::default();
        let io = parked.clone();

        Continuation::new((), |_: i32| {})
            .stage(START, move |stage: &mut Stage<'_, ()>, _| {
                io.park(stage.callback(FIRST));
                io.park(stage.callback(SECOND));
                false
            })
            .stage(FIRST, |_: &mut Stage<'_, ()>, _| true)
            .stage(SECOND, |_: &mut Stage<'_, ()>, _| true)
            .begin();

        parked.take(FIRST).complete(0);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "dropped without begin()")]
    fn test_drop_before_begin_panics_in_debug() {
        let continuation =
            Continuation::new((), |_: i32| {}).stage(START, |_: &mut Stage<'_, ()>, _| true);
        drop(continuation);
    }
}
