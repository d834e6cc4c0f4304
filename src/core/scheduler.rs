//! Purpose: Injectable work scheduling for dispatch.
//! Exports: `Scheduler`, `Task`, `InlineScheduler`, `PoolScheduler` (feature `multi-threaded`).
//! Role: Lets the kernel fan out work items without knowing whether they run in parallel.
//! Invariants: `run_all` returns only after every submitted task has finished.
//! Invariants: Serial and parallel paths run the same task closures.

use crate::core::error::{Error, ErrorKind};

pub type Task<'a> = Box<dyn FnOnce() + Send + 'a>;

pub trait Scheduler: Send + Sync {
    /// Runs every task and blocks until all of them have completed.
    fn run_all<'a>(&self, tasks: Vec<Task<'a>>);

    /// Number of worker threads; 0 when tasks run on the calling thread.
    fn worker_threads(&self) -> usize;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn run_all<'a>(&self, tasks: Vec<Task<'a>>) {
        for task in tasks {
            task();
        }
    }

    fn worker_threads(&self) -> usize {
        0
    }
}

#[cfg(feature = "multi-threaded")]
pub struct PoolScheduler {
    pool: rayon::ThreadPool,
}

#[cfg(feature = "multi-threaded")]
impl PoolScheduler {
    /// `threads == 0` lets rayon pick one worker per logical CPU.
    pub fn new(threads: usize) -> Result<Self, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("meshcut-worker-{index}"))
            .build()
            .map_err(|err| {
                Error::new(ErrorKind::OutOfMemory)
                    .with_message("failed to start worker pool")
                    .with_source(err)
            })?;
        Ok(Self { pool })
    }
}

#[cfg(feature = "multi-threaded")]
impl Scheduler for PoolScheduler {
    fn run_all<'a>(&self, tasks: Vec<Task<'a>>) {
        self.pool.scope(|scope| {
            for task in tasks {
                scope.spawn(move |_| task());
            }
        });
    }

    fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(feature = "multi-threaded")]
impl std::fmt::Debug for PoolScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolScheduler")
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

/// Builds the scheduler a context asked for at creation time.
pub fn build_scheduler(multi_threaded: bool, threads: usize) -> Result<Box<dyn Scheduler>, Error> {
    if !multi_threaded {
        return Ok(Box::new(InlineScheduler));
    }
    #[cfg(feature = "multi-threaded")]
    {
        Ok(Box::new(PoolScheduler::new(threads)?))
    }
    #[cfg(not(feature = "multi-threaded"))]
    {
        let _ = threads;
        Err(Error::new(ErrorKind::NotSupported)
            .with_message("multi-threading is not available in this build"))
    }
}

/// Splits `items` into at most `parts` contiguous chunks, each handled by one task.
pub fn for_each_chunk<T, R, F>(
    scheduler: &dyn Scheduler,
    items: &[T],
    results: &mut [R],
    min_chunk: usize,
    work: F,
) where
    T: Sync,
    R: Send,
    F: Fn(usize, &T, &mut R) + Sync,
{
    debug_assert_eq!(items.len(), results.len());
    let parts = scheduler.worker_threads().max(1) * 4;
    let chunk = items.len().div_ceil(parts).max(min_chunk).max(1);
    let work = &work;
    let tasks: Vec<Task<'_>> = items
        .chunks(chunk)
        .zip(results.chunks_mut(chunk))
        .enumerate()
        .map(|(n, (inputs, outputs))| {
            Box::new(move || {
                for (i, (item, slot)) in inputs.iter().zip(outputs.iter_mut()).enumerate() {
                    work(n * chunk + i, item, slot);
                }
            }) as Task<'_>
        })
        .collect();
    scheduler.run_all(tasks);
}
