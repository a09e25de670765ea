//! Error type shared by the routing seams.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that can reach the router from the outside world.
///
/// None of these are fatal to a chat turn: the router turns every one of them
/// into a chat message.
#[derive(Error, Debug)]
pub enum Error {
    /// Completion API transport or SDK failure
    #[error("Completion error: {0}")]
    Completion(String),

    /// Document store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A reply that fails the response schema is plain text, not an error,
    /// so only the two outside seams have variants.
    #[test]
    fn test_error_display_names_the_failing_seam() {
        let errs = [
            Error::Completion("timeout".to_string()),
            Error::Storage("disk full".to_string()),
        ];
        let shown: Vec<String> = errs.iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["Completion error: timeout", "Storage error: disk full"]);
    }
}
