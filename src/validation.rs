// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Sequencing of asynchronous validation passes.
//!
//! Each call to [`FormToolkit::validate`](crate::FormToolkit::validate) is stamped with a fresh
//! [`ValidationToken`] and becomes the *current* pass. A pass first waits a short
//! [`Deferral`], then checks that it is still current before invoking the [`Validator`], and
//! checks again once the validator resolved. Only the current pass ever commits its result;
//! superseded passes still run to completion but resolve with the last committed validity.
//!
//! Since tokens are stamped synchronously, a burst of calls made before the executor gets to
//! run collapses into a single validator invocation.

use crate::error::{FormError, HandlerError};
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use serde_json::Value;
use std::{
    fmt,
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

/// The shared outcome of one validation pass.
///
/// Resolves with the committed validity; a superseded pass resolves with whatever validity was
/// committed at the time it noticed.
pub type Validation = Shared<LocalBoxFuture<'static, Result<bool, FormError>>>;

/// Identifies one validation pass. Later passes carry larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValidationToken(u64);

impl fmt::Display for ValidationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues tokens and remembers which one is current.
#[derive(Debug, Default)]
pub struct ValidationSequencer {
    issued: u64,
}

impl ValidationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps a new pass; it supersedes every earlier one.
    pub fn issue(&mut self) -> ValidationToken {
        self.issued += 1;
        ValidationToken(self.issued)
    }

    /// The most recently issued token, if any.
    pub fn current(&self) -> Option<ValidationToken> {
        (self.issued > 0).then_some(ValidationToken(self.issued))
    }

    pub fn is_current(&self, token: ValidationToken) -> bool {
        self.current() == Some(token)
    }
}

/// Decides whether a values document is valid.
///
/// Implemented for every closure `Fn(Rc<Value>) -> impl Future<Output = Result<bool, E>>`.
pub trait Validator {
    fn validate(&self, values: Rc<Value>) -> LocalBoxFuture<'static, Result<bool, HandlerError>>;
}

impl<F, Fut, E> Validator for F
where
    F: Fn(Rc<Value>) -> Fut,
    Fut: Future<Output = Result<bool, E>> + 'static,
    E: Into<HandlerError>,
{
    fn validate(&self, values: Rc<Value>) -> LocalBoxFuture<'static, Result<bool, HandlerError>> {
        self(values).map(|result| result.map_err(Into::into)).boxed_local()
    }
}

/// Receives the values of a valid form on submission.
///
/// Implemented for every closure `Fn(Rc<Value>) -> impl Future<Output = Result<(), E>>`.
pub trait SubmitHandler {
    fn submit(&self, values: Rc<Value>) -> LocalBoxFuture<'static, Result<(), HandlerError>>;
}

impl<F, Fut, E> SubmitHandler for F
where
    F: Fn(Rc<Value>) -> Fut,
    Fut: Future<Output = Result<(), E>> + 'static,
    E: Into<HandlerError>,
{
    fn submit(&self, values: Rc<Value>) -> LocalBoxFuture<'static, Result<(), HandlerError>> {
        self(values).map(|result| result.map_err(Into::into)).boxed_local()
    }
}

/// Yields to the executor a fixed number of times before completing.
///
/// This is the debounce window of a validation pass: every other task that is ready gets to run
/// before the pass decides whether it is still current.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Deferral {
    remaining: usize,
}

impl Deferral {
    pub fn new(ticks: usize) -> Self {
        Self { remaining: ticks }
    }
}

impl Future for Deferral {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.remaining == 0 {
            return Poll::Ready(());
        }
        self.remaining -= 1;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
