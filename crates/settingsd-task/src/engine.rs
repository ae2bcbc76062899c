//! Readers-writer scheduling discipline.
//!
//! Non-mutating requests (`get`, `getDesc`, `getValues`, ...) run as
//! readers: any number may execute concurrently. Mutating requests (`set`,
//! `delete`, `reset`, description writes, app-change/uninstall, dimension
//! re-notification) run as the sole writer, quiesced with respect to every
//! outstanding read. `tokio::sync::RwLock` is write-preferring, which gives
//! the writer a clean quiescence point without hand-rolling a task counter
//! and condition variable.

use crate::error::{TaskError, TaskResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Coordinates concurrent reads against a single-writer-at-a-time
/// mutation discipline.
#[derive(Default)]
pub struct TaskEngine {
    gate: RwLock<()>,
    shutting_down: AtomicBool,
}

impl TaskEngine {
    /// Construct a fresh engine accepting new tasks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a non-mutating task. Runs concurrently with any other read, but
    /// waits behind a currently running (or queued) writer.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::ShuttingDown`] if [`Self::shutdown`] has
    /// already been called.
    pub async fn run_read<F, Fut, T>(&self, task: F) -> TaskResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(TaskError::ShuttingDown);
        }
        let _guard = self.gate.read().await;
        Ok(task().await)
    }

    /// Run a mutating task. Waits for every in-flight read to complete,
    /// then holds exclusive access until `task` finishes.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::ShuttingDown`] if [`Self::shutdown`] has
    /// already been called.
    pub async fn run_write<F, Fut, T>(&self, task: F) -> TaskResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(TaskError::ShuttingDown);
        }
        let _guard = self.gate.write().await;
        Ok(task().await)
    }

    /// Stop admitting new tasks and wait for every in-flight read/write to
    /// drain.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        let _drain = self.gate.write().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn reads_run_concurrently() {
        let engine = Arc::new(TaskEngine::new());
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let engine_a = engine.clone();
        let started_a = started.clone();
        let release_a = release.clone();
        let read_a = tokio::spawn(async move {
            engine_a
                .run_read(|| async move {
                    started_a.notify_one();
                    release_a.notified().await;
                })
                .await
        });

        started.notified().await;
        let result = tokio::time::timeout(
            Duration::from_millis(200),
            engine.run_read(|| async { 42 }),
        )
        .await;
        assert_eq!(result.unwrap().unwrap(), 42);

        release.notify_one();
        read_a.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn write_waits_for_in_flight_read() {
        let engine = Arc::new(TaskEngine::new());
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let engine_read = engine.clone();
        let started_read = started.clone();
        let release_read = release.clone();
        let read = tokio::spawn(async move {
            engine_read
                .run_read(|| async move {
                    started_read.notify_one();
                    release_read.notified().await;
                })
                .await
        });

        started.notified().await;
        let engine_write = engine.clone();
        let write = tokio::spawn(async move { engine_write.run_write(|| async { 7 }).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!write.is_finished());

        release.notify_one();
        read.await.unwrap().unwrap();
        assert_eq!(write.await.unwrap().unwrap(), 7);
    }

    #[tokio::test]
    async fn shutdown_rejects_new_tasks() {
        let engine = TaskEngine::new();
        engine.shutdown().await;
        assert!(matches!(engine.run_read(|| async {}).await, Err(TaskError::ShuttingDown)));
        assert!(matches!(engine.run_write(|| async {}).await, Err(TaskError::ShuttingDown)));
    }
}
