use thiserror::Error;

/// Failure talking to, or interpreting, a language model.
#[derive(Debug, Error)]
pub enum AiError {
    /// Network/timeout failure before a response arrived.
    #[error("model request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("model provider returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The response body could not be interpreted.
    #[error("model output was malformed: {0}")]
    MalformedOutput(String),

    #[error("model returned no content")]
    EmptyOutput,

    /// The collaborator cannot serve this input at all.
    #[error("not available: {0}")]
    Unavailable(String),
}

impl AiError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AiError::Transport(_) => true,
            AiError::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Caller-safe message; provider bodies and transport detail stay in logs.
    pub fn public_message(&self) -> String {
        match self {
            AiError::Transport(_) | AiError::Upstream { .. } => {
                "the language model service is currently unavailable".to_string()
            }
            AiError::MalformedOutput(_) | AiError::EmptyOutput => {
                "the language model returned an unusable answer".to_string()
            }
            AiError::Unavailable(reason) => reason.clone(),
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            AiError::MalformedOutput(value.to_string())
        } else {
            AiError::Transport(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        let upstream = |status, message: &str| AiError::Upstream {
            status,
            message: message.into(),
        };
        let rl = upstream(429, "slow down");
        let server = upstream(503, "busy");
        let auth = upstream(401, "bad key");
        assert!(rl.is_transient());
        assert!(server.is_transient());
        assert!(!auth.is_transient());
        assert!(!AiError::EmptyOutput.is_transient());
    }

    #[test]
    fn public_message_drops_provider_body() {
        let err = AiError::Upstream {
            status: 401,
            message: "Incorrect API key provided: sk-abc".into(),
        };
        assert!(!err.public_message().contains("sk-abc"));
    }
}
