#[derive(thiserror::Error, Debug)]
pub enum StatusBarError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no tokio runtime available to drive the timers")]
    RuntimeError(#[from] tokio::runtime::TryCurrentError),
}

impl StatusBarError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        StatusBarError::InvalidArgument(msg.into())
    }
}
