//! Error types.

use core::fmt;

/// Error returned when the allocator cannot provide a node.
///
/// Contains the value that could not be inserted, allowing recovery. The list
/// is left exactly as it was before the call.
///
/// # Example
///
/// ```
/// use unrolled_list::{AllocFailed, UnrolledList};
///
/// let mut list: UnrolledList<u32, 4> = UnrolledList::new();
/// assert_eq!(list.try_push_back(7), Ok(()));
///
/// let err = AllocFailed(9);
/// assert_eq!(err.into_inner(), 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocFailed<T>(pub T);

impl<T> AllocFailed<T> {
    /// Returns the value that could not be inserted.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for AllocFailed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node allocation failed")
    }
}

impl<T: fmt::Debug> std::error::Error for AllocFailed<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(AllocFailed(1u8).to_string(), "node allocation failed");
    }

    #[test]
    fn is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&AllocFailed("value"));
    }
}
