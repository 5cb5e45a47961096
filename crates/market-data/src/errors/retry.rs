/// Classification for retry policy.
///
/// Used by callers to decide whether a failed rate fetch is worth repeating.
///
/// | Class | Retry later? |
/// |-------|--------------|
/// | `Never` | No |
/// | `WithBackoff` | Yes, after a delay |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - unknown currency, malformed response, or terminal failure.
    /// The request is fundamentally invalid and retrying won't help.
    Never,

    /// Retry with backoff.
    ///
    /// Used for transient errors like rate limiting (429), timeouts, or the
    /// provider being unreachable.
    WithBackoff,
}
