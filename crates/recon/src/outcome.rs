use std::fmt;

use serde::Serialize;

/// Why an input row was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Chain tag or address column empty.
    MissingField,
    /// Chain tag outside `sol`/`pol`/`bnb`/`eth`.
    UnknownChainTag,
    /// Address failed the family's shape check.
    MalformedAddress,
    /// Week label carried no ordinal week number.
    UnparseableWeek,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingField => "missing field",
            Self::UnknownChainTag => "unknown chain tag",
            Self::MalformedAddress => "malformed address",
            Self::UnparseableWeek => "unparseable week label",
        };
        f.write_str(text)
    }
}

/// Result of interpreting one noisy input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<T> {
    Accepted(T),
    Rejected(RejectReason),
}

impl<T> ParseOutcome<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn accepted(self) -> Option<T> {
        match self {
            Self::Accepted(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }
}

impl<T> From<Result<T, RejectReason>> for ParseOutcome<T> {
    fn from(result: Result<T, RejectReason>) -> Self {
        match result {
            Ok(value) => Self::Accepted(value),
            Err(reason) => Self::Rejected(reason),
        }
    }
}
