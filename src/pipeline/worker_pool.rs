//! Fixed-size worker pool (C9) with backpressure and graceful shutdown.
//!
//! Grounded on the channel-based pool in `other_examples/`'s
//! `doorway-src-worker-pool.rs` (`mpsc::Sender<PoolRequest>` plus a
//! `Semaphore` gate), adapted to the shutdown-order contract of §4.9:
//! cancel, close input, drain workers, close output.

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

/// A fixed-size pool of tasks operating over bounded input/output channels.
pub struct WorkerPool<T, R> {
    input_tx: mpsc::Sender<T>,
    output_rx: mpsc::Receiver<R>,
    token: CancellationToken,
    join_handle: tokio::task::JoinHandle<()>,
}

impl<T, R> WorkerPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Spawn `worker_count` workers, each pulling from a shared bounded
    /// input channel and running `process` to produce results on a shared
    /// bounded output channel.
    pub fn spawn<F, Fut>(worker_count: usize, channel_capacity: usize, process: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = R> + Send,
    {
        let (input_tx, input_rx) = mpsc::channel::<T>(channel_capacity);
        let (output_tx, output_rx) = mpsc::channel::<R>(channel_capacity);
        let token = CancellationToken::new();
        let semaphore = std::sync::Arc::new(Semaphore::new(worker_count));
        let process = std::sync::Arc::new(process);
        let input_rx = std::sync::Arc::new(tokio::sync::Mutex::new(input_rx));

        let join_handle = {
            let token = token.clone();
            tokio::spawn(async move {
                let mut workers = Vec::with_capacity(worker_count);
                for _ in 0..worker_count {
                    let permit_source = std::sync::Arc::clone(&semaphore);
                    let process = std::sync::Arc::clone(&process);
                    let input_rx = std::sync::Arc::clone(&input_rx);
                    let output_tx = output_tx.clone();
                    let token = token.clone();

                    workers.push(tokio::spawn(async move {
                        let _permit = permit_source.acquire().await;
                        loop {
                            let task = {
                                let mut rx = input_rx.lock().await;
                                tokio::select! {
                                    () = token.cancelled() => None,
                                    item = rx.recv() => item,
                                }
                            };
                            let Some(task) = task else { break };
                            let result = process(task).await;
                            tokio::select! {
                                () = token.cancelled() => {
                                    log::debug!("worker pool result dropped on shutdown");
                                }
                                send_result = output_tx.send(result) => {
                                    if send_result.is_err() {
                                        log::debug!("worker pool output channel closed, dropping result");
                                    }
                                }
                            }
                        }
                    }));
                }
                for worker in workers {
                    let _ = worker.await;
                }
                drop(output_tx);
            })
        };

        Self { input_tx, output_rx, token, join_handle }
    }

    /// Submit a task, blocking until a slot is free or the pool is cancelled.
    ///
    /// # Errors
    /// Returns an error if the pool has already begun shutting down.
    pub async fn submit(&self, task: T) -> Result<(), crate::errors::PipelineError> {
        self.input_tx
            .send(task)
            .await
            .map_err(|_| crate::errors::PipelineError::Cancelled("worker pool input closed".into()))
    }

    /// Receive the next available result, or `None` once the pool has
    /// fully drained and shut down.
    pub async fn recv(&mut self) -> Option<R> {
        self.output_rx.recv().await
    }

    /// Shut the pool down per the §4.9 order: cancel, close input, drain
    /// workers, close output.
    pub async fn stop(self) {
        self.token.cancel();
        drop(self.input_tx);
        let _ = self.join_handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn processes_all_submitted_tasks() {
        let mut pool = WorkerPool::spawn(4, 16, |n: u32| async move { n * 2 });
        for i in 0..20 {
            pool.submit(i).await.unwrap();
        }
        let mut results = Vec::new();
        for _ in 0..20 {
            results.push(pool.recv().await.unwrap());
        }
        results.sort_unstable();
        let expected: Vec<u32> = (0..20).map(|n| n * 2).collect();
        assert_eq!(results, expected);
        pool.stop().await;
    }

    #[tokio::test]
    async fn stop_terminates_cleanly_with_tasks_in_flight() {
        let mut pool = WorkerPool::spawn(2, 8, |n: u32| async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            n
        });
        for i in 0..4 {
            pool.submit(i).await.unwrap();
        }
        pool.stop().await;
    }

    #[tokio::test]
    async fn submit_after_stop_returns_error() {
        let pool = WorkerPool::spawn(1, 4, |n: u32| async move { n });
        let input_tx = pool.input_tx.clone();
        pool.stop().await;
        let result = input_tx.send(1u32).await;
        assert!(result.is_err());
    }
}
