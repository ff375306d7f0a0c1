//! Runs the jobs of a picture in parallel and folds their failures into one
//! result.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Vc2DecoderError;

/// A fixed pool of worker threads, or the calling thread alone when one
/// thread is configured.
pub struct Scheduler {
    threads: usize,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("threads", &self.threads)
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}

impl Scheduler {
    pub fn new(threads: usize) -> Result<Self, Vc2DecoderError> {
        if threads == 0 {
            return Err(Vc2DecoderError::BadParams);
        }
        let pool = if threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("vc2decode-{}", i))
                .build()
                .map_err(|e| {
                    log::error!("Could not start {} decoder threads: {}", threads, e);
                    Vc2DecoderError::BadThread
                })?;
            Some(pool)
        } else {
            None
        };
        Ok(Self { threads, pool })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Runs `work` once per task and waits for all of them. A task that
    /// returns an error or panics counts as a failure; any failure makes the
    /// whole batch fail with `DecodeFailed`.
    pub fn run<T, F>(&self, tasks: Vec<T>, work: F) -> Result<(), Vc2DecoderError>
    where
        T: Send,
        F: Fn(T) -> Result<(), Vc2DecoderError> + Sync,
    {
        let failures = AtomicUsize::new(0);
        let run_one = |task: T| {
            let ok = matches!(catch_unwind(AssertUnwindSafe(|| work(task))), Ok(Ok(())));
            if !ok {
                failures.fetch_add(1, Ordering::Relaxed);
            }
        };

        match &self.pool {
            Some(pool) => pool.scope(|scope| {
                let run_one = &run_one;
                for task in tasks {
                    scope.spawn(move |_| run_one(task));
                }
            }),
            None => tasks.into_iter().for_each(run_one),
        }

        match failures.load(Ordering::Relaxed) {
            0 => Ok(()),
            n => {
                log::error!("{} decode jobs failed", n);
                Err(Vc2DecoderError::DecodeFailed)
            }
        }
    }
}
