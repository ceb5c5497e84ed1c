//! Token subsystem error types.

/// Errors that can occur during model lookup and cost accounting.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// No registry entry for the given model.
    #[error("no pricing info for model `{model}`")]
    UnknownModel {
        /// The model identifier.
        model: String,
    },
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TokenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_display() {
        let err = TokenError::UnknownModel {
            model: "gpt-99".to_string(),
        };
        assert_eq!(err.to_string(), "no pricing info for model `gpt-99`");
    }
}
