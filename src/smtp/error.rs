use thiserror::Error;

use super::Stage;

/// Why a single host did not accept the recipient.
///
/// The `Display` form is the diagnostic recorded for the host, e.g.
/// `HELO: 550 no`.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("Connection Error")]
    Connection,
    #[error("{stage}: {reply}")]
    Rejected { stage: Stage, reply: String },
    #[error("{stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
}

impl HandshakeError {
    pub(crate) fn rejected(stage: Stage, reply: impl Into<String>) -> Self {
        Self::Rejected {
            stage,
            reply: reply.into(),
        }
    }

    pub(crate) fn io(stage: Stage) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { stage, source }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Connection => None,
            Self::Rejected { stage, .. } | Self::Io { stage, .. } => Some(*stage),
        }
    }
}
