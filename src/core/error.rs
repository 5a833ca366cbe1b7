use thiserror::Error;

/// Errors surfaced by the environment API.
///
/// Degenerate-but-recoverable situations (an unreachable target, a maze with
/// nothing left to relax) are handled in place and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// A configuration value is malformed. Fatal at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A hand-built maze layout is not usable.
    #[error("invalid maze layout: {0}")]
    InvalidLayout(&'static str),

    #[error("step called before reset")]
    NotReset,

    #[error("episode already ended; call reset before stepping again")]
    EpisodeOver,

    #[error("action {0} is outside the discrete range [0, 3]")]
    InvalidAction(i64),

    #[error("invalid placement: {0}")]
    InvalidPlacement(&'static str),

    #[error("expected {expected} actions, got {actual}")]
    ActionCountMismatch { expected: usize, actual: usize },

    #[error("environment is closed")]
    Closed,
}

pub type Result<T> = core::result::Result<T, EnvError>;
