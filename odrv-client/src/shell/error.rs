use thiserror::Error;

/// Failure of a single statement typed into the shell.
///
/// These are reported inline and the session carries on; they never end
/// the shell.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShellError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("name '{0}' is not defined")]
    UndefinedName(String),

    #[error("'{0}' is a device and cannot be reassigned")]
    ReadOnlyName(String),

    #[error("'{target}' has no attribute '{attribute}'")]
    NoAttribute { target: String, attribute: String },

    #[error("'{0}' is not callable")]
    NotCallable(String),

    #[error("{helper}() takes {expected} argument(s), got {got}")]
    Arity {
        helper: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("{helper}(): argument {index} must be {expected}, got {found}")]
    ArgumentType {
        helper: &'static str,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{helper}(): {reason}")]
    InvalidArgument { helper: &'static str, reason: String },

    #[error("{0}: reading or writing device properties needs remote object access, which this shell does not provide")]
    RemotePropertyUnavailable(String),

    #[error("{0}() needs remote object access to the device, which this shell does not provide")]
    RemoteObjectsUnavailable(&'static str),

    #[error("{0}() is not implemented")]
    NotImplemented(&'static str),
}
