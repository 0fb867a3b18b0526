//! The failure taxonomy shared by both match engines.
//!
//! Failures split into two families. *Recoverable* failures mean "this
//! branch of the grammar did not match here" and are absorbed by
//! enclosing alternations, options, and negations. *Hard* faults mean
//! the match cannot proceed at all and surface immediately, no matter
//! how deeply nested the construct that raised them.

use crate::location::Location;

pub type MatchResult<T> = Result<T, MatchError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    /// Input did not satisfy a matcher. Recoverable.
    #[error("{location}: expected {expected}, found {found}")]
    Mismatch {
        location: Location,
        expected: String,
        found: String,
        #[source]
        cause: Option<Box<MatchError>>,
    },

    /// A named rule's body failed. Recoverable; wraps the inner failure
    /// so reports can show the rule chain.
    #[error("{location}: rule `{rule}` did not match")]
    RuleFailed {
        rule: String,
        location: Location,
        #[source]
        cause: Box<MatchError>,
    },

    /// A reference names a rule that was never bound.
    #[error("rule `{0}` is not defined")]
    UndefinedRule(String),

    /// Matching was requested before any rule was designated as root.
    #[error("no root rule designated")]
    NoRoot,

    /// Rule recursion went deeper than the configured limit.
    #[error("rule recursion exceeded {0} levels")]
    DepthExceeded(usize),

    /// A construct needed a static length bound that does not exist.
    #[error("cannot bound the match length of {0}")]
    UnboundedLength(String),
}

impl MatchError {
    pub fn mismatch(
        location: Location,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        MatchError::Mismatch {
            location,
            expected: expected.into(),
            found: found.into(),
            cause: None,
        }
    }

    /// Wrap `cause` as the reason for this mismatch. No-op for other
    /// variants.
    pub fn caused_by(self, inner: MatchError) -> Self {
        match self {
            MatchError::Mismatch {
                location,
                expected,
                found,
                ..
            } => MatchError::Mismatch {
                location,
                expected,
                found,
                cause: Some(Box::new(inner)),
            },
            other => other,
        }
    }

    /// Whether an enclosing alternation, option, or negation may absorb
    /// this failure and try something else.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MatchError::Mismatch { .. } | MatchError::RuleFailed { .. }
        )
    }

    /// Input position the failure points at, when it has one.
    pub fn location(&self) -> Option<Location> {
        match self {
            MatchError::Mismatch { location, .. } | MatchError::RuleFailed { location, .. } => {
                Some(*location)
            }
            _ => None,
        }
    }

    /// Innermost failure in the cause chain.
    pub fn deepest(&self) -> &MatchError {
        match self {
            MatchError::Mismatch {
                cause: Some(inner), ..
            } => inner.deepest(),
            MatchError::RuleFailed { cause, .. } => cause.deepest(),
            other => other,
        }
    }
}
