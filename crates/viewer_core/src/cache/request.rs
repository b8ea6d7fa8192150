//! One-shot storage requests
//!
//! A [`Request`] is the awaitable half of a single substrate operation and a
//! [`Responder`] is the completion half handed to whoever performs the work.
//! Resolving or rejecting consumes the responder, so a request completes at
//! most once. A responder dropped without completing (for example because the
//! worker panicked) surfaces as [`StorageError::RequestAborted`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::error::StorageError;

/// Awaitable result of one storage operation
#[derive(Debug)]
#[must_use = "requests do nothing observable unless awaited"]
pub struct Request<T> {
    receiver: oneshot::Receiver<Result<T, StorageError>>,
}

/// Completion side of a [`Request`]
#[derive(Debug)]
pub struct Responder<T> {
    sender: oneshot::Sender<Result<T, StorageError>>,
}

/// Create a linked responder/request pair
pub fn channel<T>() -> (Responder<T>, Request<T>) {
    let (sender, receiver) = oneshot::channel();
    (Responder { sender }, Request { receiver })
}

impl<T> Responder<T> {
    /// Complete the request successfully
    pub fn resolve(self, value: T) {
        self.send(Ok(value));
    }

    /// Complete the request with an error
    pub fn reject(self, error: StorageError) {
        self.send(Err(error));
    }

    /// Complete the request with either outcome
    pub fn complete(self, result: Result<T, StorageError>) {
        match result {
            Ok(value) => self.resolve(value),
            Err(error) => self.reject(error),
        }
    }

    fn send(self, result: Result<T, StorageError>) {
        // The caller may have stopped waiting; nothing to report then.
        if self.sender.send(result).is_err() {
            log::trace!("Storage request completed after its caller went away");
        }
    }
}

impl<T: Send + 'static> Request<T> {
    /// Run blocking substrate work on the runtime's blocking pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_blocking<F>(work: F) -> Self
    where
        F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    {
        let (responder, request) = channel();
        tokio::task::spawn_blocking(move || responder.complete(work()));
        request
    }
}

impl<T> Future for Request<T> {
    type Output = Result<T, StorageError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(Err(StorageError::RequestAborted)))
    }
}
