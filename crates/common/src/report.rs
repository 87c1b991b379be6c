use std::fmt;

/// The structured form in which errors leave the core: a human context
/// string, the root message and, if present, the message of the inner cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub context: String,
    pub message: String,
    pub cause: Option<String>,
}

impl ErrorReport {
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Build a report from any error, taking the first link of its source
    /// chain as the inner cause.
    pub fn from_error(context: impl Into<String>, err: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            context: context.into(),
            message: err.to_string(),
            cause: err.source().map(|s| s.to_string()),
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (caused by: {cause})")?;
        }
        Ok(())
    }
}
