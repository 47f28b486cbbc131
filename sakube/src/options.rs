//! Behaviour switches for a run.

use std::time::Duration;

/// Which of `--sa` and `--service-account` wins when both are given.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FlagPrecedence {
    /// `--sa` wins whenever it was supplied.
    #[default]
    ShortWinsIfSet,
    /// `--service-account` wins whenever it was supplied.
    LongWinsIfSet,
}

impl FlagPrecedence {
    /// Pick a value from the long and short spellings of the same flag.
    pub fn resolve(self, long: Option<String>, short: Option<String>) -> Option<String> {
        match self {
            FlagPrecedence::ShortWinsIfSet => short.or(long),
            FlagPrecedence::LongWinsIfSet => long.or(short),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Fail when the ServiceAccount references no Secrets instead of creating one.
    pub strict_secret_existence: bool,
    /// Ask before creating a Secret.
    pub interactive_auto_create: bool,
    pub flag_precedence: FlagPrecedence,
    /// How long to wait for the token controller to fill a newly created Secret.
    pub token_timeout: Duration,
    pub token_poll_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            strict_secret_existence: true,
            interactive_auto_create: true,
            flag_precedence: FlagPrecedence::default(),
            token_timeout: Duration::from_secs(30),
            token_poll_interval: Duration::from_millis(500),
        }
    }
}
