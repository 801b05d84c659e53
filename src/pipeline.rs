use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use command_executor::command::Command;
use command_executor::shutdown_mode::ShutdownMode;
use command_executor::thread_pool::ThreadPool;
use command_executor::thread_pool_builder::ThreadPoolBuilder;

use crate::error::SortError;

type Job = Box<dyn FnOnce() -> Result<(), SortError> + Send>;

/// Timing of a finished background job
#[derive(Clone, Copy, Debug)]
pub(crate) struct Completion {
    /// Time the caller spent blocked waiting for the job
    pub(crate) waited: Duration,
    /// Time the job spent running
    pub(crate) elapsed: Duration,
}

struct JobCommand {
    job: Mutex<Option<Job>>,
    done: Sender<Result<Duration, SortError>>,
}

impl JobCommand {
    fn new(job: Job, done: Sender<Result<Duration, SortError>>) -> JobCommand {
        JobCommand {
            job: Mutex::new(Some(job)),
            done,
        }
    }
}

impl Command for JobCommand {
    fn execute(&self) -> Result<(), anyhow::Error> {
        let job = self.job
            .lock()
            .map_err(|_| anyhow!("Background job lock poisoned"))?
            .take();
        if let Some(job) = job {
            let start = Instant::now();
            let result = job().map(|_| start.elapsed());
            self.done
                .send(result)
                .map_err(|_| anyhow!("Background job result receiver dropped"))?;
        }
        Ok(())
    }
}

/// Two stage pipeline: the caller prepares the next batch while a single background thread
/// writes the previous one.
///
/// At most one job is in flight. Submitting a job first waits for the previous one, so the
/// caller never holds more than one batch in addition to the one being written.
pub(crate) struct WritePipeline {
    name: String,
    pool: ThreadPool,
    pending: Option<Receiver<Result<Duration, SortError>>>,
}

impl WritePipeline {
    pub(crate) fn new(name: &str) -> Result<WritePipeline, SortError> {
        let mut thread_pool_builder = ThreadPoolBuilder::new();
        let pool = thread_pool_builder
            .with_name(name.to_string())
            .with_tasks(1)
            .with_queue_size(1)
            .with_shutdown_mode(ShutdownMode::CompletePending)
            .build()?;

        Ok(
            WritePipeline {
                name: name.to_string(),
                pool,
                pending: None,
            }
        )
    }

    /// Wait for the in-flight job, if any, and report its outcome
    pub(crate) fn wait(&mut self) -> Result<Option<Completion>, SortError> {
        match self.pending.take() {
            None => Ok(None),
            Some(receiver) => {
                let start = Instant::now();
                let result = receiver
                    .recv()
                    .map_err(|_| anyhow!("Background job in {} stopped without reporting", self.name))?;
                let waited = start.elapsed();
                let elapsed = result?;
                Ok(Some(Completion { waited, elapsed }))
            }
        }
    }

    /// Wait for the previous job and start `job` in the background
    pub(crate) fn submit<F>(&mut self, job: F) -> Result<Option<Completion>, SortError>
    where
        F: FnOnce() -> Result<(), SortError> + Send + 'static,
    {
        let previous = self.wait()?;
        let (sender, receiver) = channel();
        self.pool.submit(Box::new(JobCommand::new(Box::new(job), sender)));
        self.pending = Some(receiver);
        Ok(previous)
    }

    /// Barrier: wait for the in-flight job and stop the background thread
    pub(crate) fn finish(self) -> Result<Option<Completion>, SortError> {
        let WritePipeline { name, mut pool, mut pending } = self;
        let last = match pending.take() {
            None => Ok(None),
            Some(receiver) => {
                let start = Instant::now();
                match receiver.recv() {
                    Ok(result) => result.map(|elapsed| Some(Completion { waited: start.elapsed(), elapsed })),
                    Err(_) => Err(SortError::Other(anyhow!("Background job in {} stopped without reporting", name))),
                }
            }
        };
        log::debug!("Shutting down {} pool", name);
        pool.shutdown();
        pool.join()?;
        last
    }
}
