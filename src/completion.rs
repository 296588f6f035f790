//! The completion-callback contract and a channel-backed implementation.

use crate::error::ContinuationError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::trace;

/// A one-shot callback invoked with a single result code.
///
/// Consuming the box makes "invoked at most once" a property of the type.
/// Any `FnOnce(i32) + Send` closure is a `Completion`.
///
/// # Examples
///
/// ```
/// use tsunagi::Completion;
///
/// let done: Box<dyn Completion> = Box::new(|r: i32| assert_eq!(r, 0));
/// done.complete(0);
/// ```
pub trait Completion: Send {
    /// Delivers the result code, consuming the callback.
    fn complete(self: Box<Self>, r: i32);
}

impl<F> Completion for F
where
    F: FnOnce(i32) + Send,
{
    fn complete(self: Box<Self>, r: i32) {
        (*self)(r)
    }
}

/// Creates a completion whose result can be awaited or waited for.
///
/// # Examples
///
/// ```
/// use tsunagi::{completion, Completion};
///
/// let (tx, rx) = completion::channel();
/// Box::new(tx).complete(17);
/// assert_eq!(rx.wait(), Ok(17));
/// ```
pub fn channel() -> (CompletionSender, CompletionReceiver) {
    let (tx, rx) = oneshot::channel();
    (CompletionSender { tx }, CompletionReceiver { rx })
}

/// Sending half of [`channel()`].
pub struct CompletionSender {
    tx: oneshot::Sender<i32>,
}

impl Completion for CompletionSender {
    fn complete(self: Box<Self>, r: i32) {
        if self.tx.send(r).is_err() {
            trace!("Completion receiver dropped before result {} arrived", r);
        }
    }
}

impl fmt::Debug for CompletionSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Receiving half of [`channel()`].
///
/// Resolves to the result code, or [`ContinuationError::Abandoned`] if the
/// sender was dropped without completing.
#[derive(Debug)]
pub struct CompletionReceiver {
    rx: oneshot::Receiver<i32>,
}

impl CompletionReceiver {
    /// Blocks the current thread until the result arrives.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context;
    /// `.await` the receiver there instead.
    pub fn wait(self) -> Result<i32, ContinuationError> {
        self.rx
            .blocking_recv()
            .map_err(|_| ContinuationError::Abandoned)
    }

    /// Returns the result if it has already arrived, `None` while pending.
    pub fn try_result(&mut self) -> Option<Result<i32, ContinuationError>> {
        match self.rx.try_recv() {
            Ok(r) => Some(Ok(r)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(ContinuationError::Abandoned)),
        }
    }
}

impl Future for CompletionReceiver {
    type Output = Result<i32, ContinuationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.map_err(|_| ContinuationError::Abandoned))
    }
}
