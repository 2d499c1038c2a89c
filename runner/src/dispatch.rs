#[cfg(test)]
#[path = "dispatch_test.rs"]
mod dispatch_test;

use crate::job::JobDescriptor;
use std::{
    io,
    num::NonZeroUsize,
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to launch job {label}")]
    Launch {
        label: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// record of one job that ran and terminated unsuccessfully
pub struct JobFailure {
    pub label: String,
    /// exit code, None for abnormal termination (killed by a signal)
    pub code: Option<i32>,
}

/// one launched worker that has not been reaped yet
/// the child owns the descriptor's streams, dropping it releases everything
struct RunningJob {
    label: String,
    child: Child,
}

/// bounded-concurrency scheduler for external worker processes
///
/// A single controlling thread drives admission and reaping; the `&mut self`
/// methods make the single-writer contract compiler-enforced. Completion is
/// detected with non-blocking `try_wait` passes separated by a fixed sleep
/// tick, so no signal handling or wait-for-any primitive is involved.
///
/// Jobs run to completion. There is no kill, no timeout and no retry, and
/// completion order is whatever the OS schedules.
pub struct Dispatcher {
    capacity: NonZeroUsize,
    poll_interval: Duration,
    running: Vec<RunningJob>,
    completed: usize,
    failures: Vec<JobFailure>,
}

impl Dispatcher {
    pub fn new(capacity: NonZeroUsize, poll_interval: Duration) -> Self {
        Self {
            capacity,
            poll_interval,
            running: Vec::with_capacity(capacity.get()),
            completed: 0,
            failures: Vec::new(),
        }
    }

    /// launch one job, waiting for a free slot first if the pool is full
    ///
    /// Admission order is submission order. A launch failure leaves the pool
    /// untouched, the descriptor never occupied a slot and its streams are
    /// closed on return.
    pub fn submit(&mut self, descriptor: JobDescriptor) -> Result<(), DispatchError> {
        while self.running.len() >= self.capacity.get() {
            if self.poll_once() == 0 {
                thread::sleep(self.poll_interval);
            }
        }

        let JobDescriptor {
            command,
            environment,
            stdin_source,
            stdout_sink,
            label,
        } = descriptor;

        let Some((program, args)) = command.split_first() else {
            return Err(DispatchError::Launch {
                label,
                source: io::Error::new(io::ErrorKind::InvalidInput, "empty command line"),
            });
        };

        let mut process = Command::new(program);
        process
            .args(args)
            .envs(environment.iter().map(|(key, value)| (key, value)));

        if let Some(stdin) = stdin_source {
            process.stdin(Stdio::from(stdin));
        }
        if let Some(stdout) = stdout_sink {
            process.stdout(Stdio::from(stdout));
        }

        match process.spawn() {
            Ok(child) => {
                info!("{label}");
                self.running.push(RunningJob { label, child });

                Ok(())
            }
            Err(source) => Err(DispatchError::Launch { label, source }),
        }
    }

    /// one non-blocking reaping pass over the running set
    ///
    /// Newly terminated jobs get their status recorded and their slot
    /// reclaimed; a non-zero or abnormal exit is reported and the batch
    /// continues. No-op when nothing is running. Returns the number of jobs
    /// reaped.
    pub fn poll_once(&mut self) -> usize {
        let mut reaped = 0;
        let mut index = 0;

        while index < self.running.len() {
            match self.running[index].child.try_wait() {
                Ok(Some(status)) => {
                    let job = self.running.swap_remove(index);
                    self.finish(job.label, Some(status));
                    reaped += 1;
                }
                Ok(None) => {
                    index += 1;
                }
                Err(e) => {
                    // the handle is unusable, treat as abnormal termination
                    let job = self.running.swap_remove(index);
                    warn!("Failed to poll job {}: {e}", job.label);
                    self.finish(job.label, None);
                    reaped += 1;
                }
            }
        }

        reaped
    }

    /// block until every submitted job has completed
    ///
    /// Performs no admissions; once this returns the dispatcher holds no
    /// process resources.
    pub fn drain(&mut self) {
        while !self.running.is_empty() {
            if self.poll_once() == 0 {
                thread::sleep(self.poll_interval);
            }
        }
    }

    fn finish(&mut self, label: String, status: Option<ExitStatus>) {
        self.completed += 1;

        match status {
            Some(status) if status.success() => {
                debug!("Job {label} finished");
            }
            Some(status) => {
                warn!("Job {label} returned {status}");
                self.failures.push(JobFailure {
                    label,
                    code: status.code(),
                });
            }
            None => {
                self.failures.push(JobFailure { label, code: None });
            }
        }
    }

    /// number of jobs launched and not yet reaped
    pub fn running(&self) -> usize {
        self.running.len()
    }

    /// number of jobs that reached a terminal state after launching
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// jobs that terminated unsuccessfully, in reaping order
    pub fn failures(&self) -> &[JobFailure] {
        &self.failures
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}
