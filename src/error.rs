use thiserror::Error;

/// Errors surfaced by the resolution and attention workflow.
///
/// Display strings are translation keys so the HTTP layer can hand them to the
/// client unchanged.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("[[error:not-logged-in]]")]
    NotLoggedIn,
    #[error("[[error:invalid-data]]")]
    InvalidData,
    #[error("[[error:no-privileges]]")]
    NoPrivileges,
    /// The referenced entity is missing. Holds the error code, e.g. `no-post`.
    #[error("[[error:{0}]]")]
    NotFound(&'static str),
    #[error("[[error:internal]]")]
    Store(#[source] anyhow::Error),
}

impl WorkflowError {
    /// Short machine-readable code without the translation wrapper.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotLoggedIn => "not-logged-in",
            Self::InvalidData => "invalid-data",
            Self::NoPrivileges => "no-privileges",
            Self::NotFound(code) => code,
            Self::Store(_) => "internal",
        }
    }
}

impl From<anyhow::Error> for WorkflowError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(err)
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
