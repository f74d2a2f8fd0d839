use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};

/// A unit of background work. Closures get this for free via the blanket
/// impl below, so callers never implement the trait by hand — it exists so
/// the pool can hold `Box<dyn ScheduledWork>` without naming a concrete
/// `Store`/`Region` type, keeping this crate free of that dependency.
pub trait ScheduledWork: Send + 'static {
    fn run(self: Box<Self>);
}

impl<F: FnOnce() + Send + 'static> ScheduledWork for F {
    fn run(self: Box<Self>) {
        (*self)()
    }
}

/// A fixed-size pool of worker threads draining one `crossbeam_channel`
/// queue, in the idiom of a compactor handle handing jobs to a channel
/// rather than spawning a thread per job.
pub struct WorkerPool {
    sender: Sender<Box<dyn ScheduledWork>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    #[must_use]
    pub fn new(name: &str, threads: usize) -> Self {
        let (sender, receiver) = unbounded::<Box<dyn ScheduledWork>>();
        let mut handles = Vec::with_capacity(threads);
        for i in 0..threads {
            let receiver = receiver.clone();
            let thread_name = format!("{name}-{i}");
            let handle = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        job.run();
                    }
                })
                .unwrap_or_else(|e| panic!("failed to spawn {thread_name}: {e}"));
            handles.push(handle);
        }
        Self { sender, handles }
    }

    pub fn submit(&self, job: Box<dyn ScheduledWork>) {
        if self.sender.send(job).is_err() {
            tracing::error!("scheduler worker pool channel closed, dropping job");
        }
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.sender.len()
    }

    /// Closes the queue and blocks until every worker has drained it and
    /// exited. Jobs already submitted still run; no new ones can be after
    /// this returns (the pool is consumed).
    pub fn shutdown(self) {
        drop(self.sender);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}
