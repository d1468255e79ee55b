// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Worker pool — runs blocking image work on tokio's blocking threads, at most
// `max_workers` jobs at a time, and hands the caller a future for the result.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use flowery_core::PoolConfig;
use flowery_core::error::{FloweryError, Result};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, instrument};

use crate::imager::Imager;

/// Bounded pool for blocking image work.
///
/// Cloning is cheap; clones share the same permits.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    handle: Handle,
    permits: Arc<Semaphore>,
    max_workers: usize,
}

impl WorkerPool {
    /// Create a pool on the current tokio runtime.
    ///
    /// Fails with `Worker` when called outside a runtime.
    pub fn new(config: &PoolConfig) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| FloweryError::Worker(format!("no tokio runtime available: {e}")))?;
        Self::with_handle(handle, config)
    }

    /// Create a pool that spawns onto an explicit runtime handle.
    #[instrument(skip(handle))]
    pub fn with_handle(handle: Handle, config: &PoolConfig) -> Result<Self> {
        config.validate()?;
        info!(max_workers = config.max_workers, "Worker pool created");
        Ok(Self {
            handle,
            permits: Arc::new(Semaphore::new(config.max_workers)),
            max_workers: config.max_workers,
        })
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of workers not currently running a job.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Queue a blocking job. It starts as soon as a worker is free, whether or
    /// not the returned task is polled.
    pub fn submit<F, T>(&self, job: F) -> Task<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let inner = self.handle.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| FloweryError::Worker("worker pool is closed".into()))?;
            debug!("Worker acquired");
            tokio::task::spawn_blocking(job)
                .await
                .map_err(join_error)?
        });
        Task { inner }
    }
}

/// Handle to a job submitted to a [`WorkerPool`].
///
/// Dropping it detaches the job; it still runs to completion.
#[derive(Debug)]
pub struct Task<T> {
    inner: JoinHandle<Result<T>>,
}

impl<T> Task<T> {
    /// Whether the job has finished (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl<T> Future for Task<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner)
            .poll(cx)
            .map(|joined| joined.unwrap_or_else(|e| Err(join_error(e))))
    }
}

impl Imager {
    /// Move this image onto a worker, apply `op` there and get it back.
    ///
    /// ```ignore
    /// let pool = WorkerPool::new(&config.pool)?;
    /// let rotated = image
    ///     .offload(&pool, |img| {
    ///         img.rotate(30.0, &RotateOptions::default())?;
    ///         Ok(())
    ///     })
    ///     .await?;
    /// ```
    pub fn offload<F>(self, pool: &WorkerPool, op: F) -> Task<Imager>
    where
        F: FnOnce(&mut Imager) -> Result<()> + Send + 'static,
    {
        pool.submit(move || {
            let mut image = self;
            op(&mut image)?;
            Ok(image)
        })
    }
}

fn join_error(error: JoinError) -> FloweryError {
    if error.is_panic() {
        let message = panic_message(error.into_panic());
        FloweryError::Worker(format!("job panicked: {message}"))
    } else {
        FloweryError::Worker("job was cancelled".into())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use flowery_core::{Anchor, Color, FlipAxis, Mode};

    fn pool(max_workers: usize) -> WorkerPool {
        WorkerPool::new(&PoolConfig { max_workers }).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn job_value_is_returned() {
        let pool = pool(2);
        let task = pool.submit(|| Ok(6 * 7));
        assert_eq!(task.await.unwrap(), 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn job_error_is_propagated() {
        let pool = pool(1);
        let task = pool.submit(|| -> Result<()> { Err(FloweryError::InvalidOpacity("2.0".into())) });
        assert!(matches!(task.await, Err(FloweryError::InvalidOpacity(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn job_panic_becomes_worker_error() {
        let pool = pool(1);
        let task = pool.submit(|| -> Result<()> { panic!("pixel on fire") });
        match task.await {
            Err(FloweryError::Worker(message)) => assert!(message.contains("pixel on fire")),
            other => panic!("expected worker error, got {other:?}"),
        }
        // The permit is released after a panic.
        assert_eq!(pool.submit(|| Ok(1)).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrency_is_bounded() {
        let pool = pool(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.submit(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropped_task_still_runs() {
        let pool = pool(1);
        let done = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&done);
        drop(pool.submit(move || {
            flag.store(1, Ordering::SeqCst);
            Ok(())
        }));
        for _ in 0..100 {
            if done.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn offload_returns_modified_image() {
        let pool = pool(2);
        let image = Imager::new(Mode::Rgb, (4u32, 2u32), Some(Color::from("white"))).unwrap();
        let dot = Imager::new(Mode::Rgb, 1u32, Some(Color::from("black"))).unwrap();

        let image = image
            .offload(&pool, move |img| {
                img.paste(&dot, (0, 0), Anchor::LeftTop, false).flip(FlipAxis::Y);
                img.opacity(128)?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(image.mode(), Mode::Rgba);
        assert_eq!(image.as_raster().to_rgba8().get_pixel(3, 0).0, [0, 0, 0, 128]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn offload_error_drops_image() {
        let pool = pool(1);
        let image = Imager::new(Mode::L, 2u32, None).unwrap();
        let result = image.offload(&pool, |img| img.opacity(2.5).map(|_| ())).await;
        assert!(matches!(result, Err(FloweryError::InvalidOpacity(_))));
    }

    #[test]
    fn new_outside_runtime_fails() {
        let result = WorkerPool::new(&PoolConfig { max_workers: 1 });
        assert!(matches!(result, Err(FloweryError::Worker(_))));
    }

    #[test]
    fn zero_workers_rejected() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = WorkerPool::with_handle(runtime.handle().clone(), &PoolConfig { max_workers: 0 });
        assert!(matches!(result, Err(FloweryError::Config(_))));
    }
}
