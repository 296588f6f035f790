use thiserror::Error;

/// Errors observed by the caller of a staged continuation.
///
/// Contract violations inside the engine (registering a stage twice,
/// dispatching a stage that is already in flight, reporting completion while
/// other stages are outstanding) are programming errors and panic. This type
/// only covers the operational outcomes a caller is expected to handle.
///
/// # Non-Exhaustive
///
/// Marked `#[non_exhaustive]` so new variants can be added without breaking
/// downstream code. Always include a wildcard arm:
///
/// ```
/// use tsunagi::ContinuationError;
///
/// fn describe(error: ContinuationError) -> String {
///     match error {
///         ContinuationError::Abandoned => "never completed".to_string(),
///         ContinuationError::Failed(code) => format!("failed with {}", code),
///         _ => error.to_string(),
///     }
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContinuationError {
    /// The continuation went away without invoking its completion callback.
    ///
    /// Happens when every outstanding stage callback is dropped without being
    /// completed, or when a continuation is dropped before `begin()`.
    #[error("continuation was dropped before it completed")]
    Abandoned,

    /// The operation finished with a negative result code.
    #[error("operation failed with result code {0}")]
    Failed(i32),
}

impl ContinuationError {
    /// Classifies a result code: negative codes are failures, everything
    /// else passes through.
    ///
    /// ```
    /// use tsunagi::ContinuationError;
    ///
    /// assert_eq!(ContinuationError::check(3), Ok(3));
    /// assert_eq!(ContinuationError::check(-5), Err(ContinuationError::Failed(-5)));
    /// ```
    pub fn check(code: i32) -> Result<i32, ContinuationError> {
        if code < 0 {
            Err(ContinuationError::Failed(code))
        } else {
            Ok(code)
        }
    }
}
