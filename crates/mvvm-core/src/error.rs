#![forbid(unsafe_code)]

//! Error types for the reactivity core.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | [`PathError`] | Dotted path walks through a non-object | Returned to whoever evaluated |
//! | Empty segment | `a..b`, leading or trailing dot | Returned, nothing is read |
//! | Read-only write | Assignment to a computed property | Returned, store unchanged |
//! | [`NotifyError`] | One or more subscribers failed to update | All subscribers still ran |

use thiserror::Error;

/// A dotted expression traversed through a value that is not an object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot read `{segment}` of {found} while resolving `{path}`")]
pub struct PathError {
    /// The full expression being resolved.
    pub path: String,
    /// The segment that could not be read.
    pub segment: String,
    /// Type name of the value the segment was read from.
    pub found: &'static str,
}

/// A single subscriber failure collected during [`Dep::notify`](crate::Dep::notify).
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateFailure {
    /// Expression of the watcher that failed.
    pub expression: String,
    /// What went wrong.
    pub error: ReactiveError,
}

/// Every failure from one notification pass.
///
/// The pass never stops early: `failures` holds one entry per subscriber
/// whose update failed, in notification order.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} subscriber update(s) failed, first: {}", failures.len(), first_message(failures))]
pub struct NotifyError {
    pub failures: Vec<UpdateFailure>,
}

fn first_message(failures: &[UpdateFailure]) -> String {
    failures
        .first()
        .map(|f| format!("`{}`: {}", f.expression, f.error))
        .unwrap_or_default()
}

impl NotifyError {
    /// Merge another pass into this one, keeping order.
    pub fn extend(&mut self, other: NotifyError) {
        self.failures.extend(other.failures);
    }
}

/// Errors raised by the store, the resolver, and watchers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReactiveError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("invalid expression `{path}`: empty path segment")]
    EmptySegment { path: String },

    #[error("property `{key}` is computed and cannot be assigned")]
    ReadOnly { key: String },

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl ReactiveError {
    /// The underlying path error, when this is one.
    #[must_use]
    pub fn as_path_error(&self) -> Option<&PathError> {
        match self {
            Self::Path(err) => Some(err),
            _ => None,
        }
    }
}
