// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Error types for form-state operations.
//!
//! Errors are split by when they can happen:
//!
//! - [`PathError`]: a dotted path could not be parsed.
//! - [`ConfigError`]: a [`FormToolkit`](crate::FormToolkit) could not be constructed. These are
//!   raised synchronously and never degraded into defaults.
//! - [`FormError`]: something went wrong while the form was running. This type is `Clone` since
//!   the outcome of a validation pass is shared between every waiter.
//!
//! Stale validation results are not errors and never surface here.

use std::{error::Error, rc::Rc};
use thiserror::Error;

/// Result type alias for runtime form operations.
pub type FormResult<T> = Result<T, FormError>;

/// Boxed error returned by user-supplied validate and submit handlers.
pub type HandlerError = Box<dyn Error + 'static>;

/// A dotted path string could not be turned into a [`FieldPath`](crate::FieldPath).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Two consecutive dots, or a leading or trailing dot.
    #[error("empty segment at position {position} in path `{path}`")]
    EmptySegment {
        /// The path as given.
        path: String,
        /// Zero-based index of the empty segment.
        position: usize,
    },

    /// A write to a sequence index more than one past its end.
    #[error("index {index} in path `{path}` is out of range for a sequence of length {len}")]
    IndexOutOfRange {
        /// The path being written.
        path: String,
        /// The offending index.
        index: usize,
        /// Length of the sequence at that point.
        len: usize,
    },

    /// A mapping key that no dotted path can address: empty, or containing a dot.
    #[error("mapping key `{key}` cannot be addressed by a dotted path")]
    UnaddressableKey {
        /// The offending key.
        key: String,
    },
}

/// Errors raised while building a form from its options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An array identity pattern is not a valid path.
    #[error("invalid array identity pattern: {0}")]
    InvalidPattern(#[from] PathError),

    /// Array identity patterns abstract indices away, so they may only contain keys.
    #[error("array identity pattern `{pattern}` must not contain index segments")]
    IndexInPattern {
        /// The offending pattern.
        pattern: String,
    },

    /// An array identity entry names an empty key field.
    #[error("array identity pattern `{pattern}` has an empty key field")]
    EmptyIdentityKey {
        /// The offending pattern.
        pattern: String,
    },

    /// Initial values must be a mapping or a sequence (or `null`, read as an empty mapping).
    #[error("initial values must be a container, found {found}")]
    InitialValuesNotContainer {
        /// Kind of the value that was supplied.
        found: &'static str,
    },

    /// The initial values contain a mapping key that paths cannot address.
    #[error("invalid initial values: {0}")]
    InitialValues(PathError),

    /// The JSON form of [`FormConfig`](crate::FormConfig) could not be read.
    #[error("malformed form configuration: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors raised by a running form.
#[derive(Debug, Clone, Error)]
pub enum FormError {
    /// The configured validate handler failed.
    #[error("validate handler failed: {0}")]
    Validate(Rc<dyn Error>),

    /// The configured submit handler failed.
    #[error("submit handler failed: {0}")]
    Submit(Rc<dyn Error>),

    /// The executor refused to run a validation pass.
    #[error("failed to schedule validation: {0}")]
    Schedule(Rc<futures::task::SpawnError>),

    /// The toolkit was dropped before an in-flight validation could resolve.
    #[error("form toolkit was dropped while a validation was in flight")]
    Detached,

    /// A path handed to a values mutation did not parse or could not be written, or the
    /// mutation introduced a key no path can address. The mutation was rolled back.
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    /// A new baseline document was not a mapping or a sequence.
    #[error("values must be a container, found {found}")]
    NotContainer {
        /// Kind of the value that was supplied.
        found: &'static str,
    },

    /// A state mutation was requested from inside a subscriber callback.
    #[error("state mutations are not allowed while subscribers are being notified")]
    ReentrantCommit,
}

impl FormError {
    pub(crate) fn validate(err: HandlerError) -> Self {
        FormError::Validate(Rc::from(err))
    }

    pub(crate) fn submit(err: HandlerError) -> Self {
        FormError::Submit(Rc::from(err))
    }
}
