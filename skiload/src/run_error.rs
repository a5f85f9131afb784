use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    SinkFailed(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::SinkFailed(_) => ExitCode::SinkFailed,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::SinkFailed(e) | Self::RuntimeError(e) => e,
        }
    }

    /// Classifies a core error: configuration problems are the caller's input.
    pub fn from_core(err: skiload_core::Error, context: &'static str) -> Self {
        if err.is_config_error() {
            Self::InvalidInput(anyhow::Error::new(err).context(context))
        } else {
            Self::RuntimeError(anyhow::Error::new(err).context(context))
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.anyhow())
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}
