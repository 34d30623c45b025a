//! The leader's value-producing step.

/// Produces the shared value for a new cycle.
///
/// Called exactly once per cycle, by whichever thread arrives last, while
/// the barrier lock is held. Keep it fast and non-blocking: every other
/// arrival for the next cycle queues behind it.
///
/// Any `FnMut() -> T + Send` closure is a generator:
///
/// ```rust
/// use lockstep_core::ValueGenerator;
///
/// let mut counter = 0u32;
/// let mut next = move || {
///     counter += 1;
///     counter
/// };
/// assert_eq!(next.generate(), 1);
/// assert_eq!(next.generate(), 2);
/// ```
pub trait ValueGenerator<T>: Send {
    /// Returns the value for the cycle being published.
    fn generate(&mut self) -> T;
}

impl<T, F> ValueGenerator<T> for F
where
    F: FnMut() -> T + Send,
{
    #[inline]
    fn generate(&mut self) -> T {
        self()
    }
}
