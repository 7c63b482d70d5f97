//! Cloneable handles to work running on the tokio runtime.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::task::{JoinError, JoinHandle};

/// A shareable future for a spawned task. Every clone resolves to the same output, and
/// awaiting a handle after the task finished returns that output again. The task keeps
/// running whether or not anyone awaits it.
#[derive(Clone)]
pub struct TaskHandle<T: Clone> {
    id: u64,
    inner: Shared<BoxFuture<'static, T>>,
}

impl<T: Clone + Send + Sync + 'static> TaskHandle<T> {
    pub(crate) fn spawned(id: u64, task: JoinHandle<T>, on_join_error: fn(JoinError) -> T) -> Self {
        let inner = async move { task.await.unwrap_or_else(on_join_error) }.boxed().shared();
        Self { id, inner }
    }

    pub(crate) fn ready(id: u64, output: T) -> Self {
        Self { id, inner: futures::future::ready(output).boxed().shared() }
    }

    /// Identifies the operation behind the handle; clones share it.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The output, once any clone of this handle has observed the finished task.
    pub fn peek(&self) -> Option<&T> {
        self.inner.peek()
    }
}

impl<T: Clone> Future for TaskHandle<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        self.inner.poll_unpin(cx)
    }
}

impl<T: Clone> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle").field("id", &self.id).finish_non_exhaustive()
    }
}
