use thiserror::Error;

/// The error taxonomy surfaced to the operator, one variant per kind named
/// in the command-language spec.
#[derive(Debug, Error)]
pub enum SpoolerError {
    #[error("Wrong number of args (given: {given}, required: {required}) for CLI command '{command}'")]
    InvalidArgs {
        command: String,
        given: usize,
        required: usize,
    },

    #[error("unparseable id '{0}'")]
    BadId(String),

    #[error("unknown {0} '{1}'")]
    UnknownIdentifier(&'static str, String),

    #[error("{0}")]
    StateViolation(String),

    #[error("{0} table full")]
    Capacity(&'static str),

    #[error("launch failed: {0}")]
    Launch(#[from] std::io::Error),

    #[error("pipeline failed: {0}")]
    RuntimeFailure(String),

    #[error("Unrecognized command: {0}")]
    UnrecognizedCommand(String),
}

pub type Result<T> = std::result::Result<T, SpoolerError>;
