use super::{Executor, JobDescriptor, JobId};
use crate::api::{EngineError, EngineResult};
use crossbeam_channel::{unbounded, Sender};
use log::{debug, error};
use std::sync::Arc;
use std::thread;

struct QueuedJob {
    job_id: JobId,
    descriptor: JobDescriptor,
}

/// Fixed set of worker threads pulling submitted jobs off a shared queue.
pub struct WorkerPool {
    handles: Vec<thread::JoinHandle<usize>>,
    tx: Sender<QueuedJob>,
    num_workers: usize,
}

impl WorkerPool {
    pub fn new(executor: Arc<Executor>, num_workers: usize) -> EngineResult<Self> {
        let num_workers = num_workers.max(1);
        let (tx, rx) = unbounded::<QueuedJob>();
        let mut handles = Vec::with_capacity(num_workers);

        for idx in 0..num_workers {
            let rx = rx.clone();
            let executor = Arc::clone(&executor);
            let handle = thread::Builder::new()
                .name(format!("job-worker-{}", idx))
                .spawn(move || {
                    let mut executed = 0;
                    while let Ok(job) = rx.recv() {
                        if let Err(e) = executor.execute(&job.job_id, &job.descriptor) {
                            error!("Worker {} could not run job {}: {}", idx, job.job_id, e);
                        } else {
                            executed += 1;
                        }
                    }
                    debug!("Worker {} exiting after {} jobs", idx, executed);
                    executed
                })?;
            handles.push(handle);
        }

        Ok(WorkerPool {
            handles,
            tx,
            num_workers,
        })
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn dispatch(&self, job_id: JobId, descriptor: JobDescriptor) -> EngineResult<()> {
        self.tx
            .send(QueuedJob { job_id, descriptor })
            .map_err(|_| EngineError::internal("worker pool has shut down"))
    }

    /// Stop accepting jobs, let the queue drain and return how many jobs
    /// the workers ran.
    pub fn finish(self) -> EngineResult<usize> {
        drop(self.tx);

        let mut executed = 0;
        for handle in self.handles {
            executed += handle
                .join()
                .map_err(|_| EngineError::internal("job worker panicked"))?;
        }
        Ok(executed)
    }
}
