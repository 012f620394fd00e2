//! # Render Context
//!
//! Work that must run where frames are read (extractor preparation) is dispatched
//! through a [`RenderScheduler`]. [`InlineScheduler`] runs jobs on the caller's thread;
//! [`RenderThread`] owns a dedicated worker thread and runs jobs in submission order.

use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;

/// A unit of work for the render context
pub type RenderJob = Box<dyn FnOnce() + Send>;

pub trait RenderScheduler: Send + Sync {
    /// Queue `job` to run in the render context
    fn dispatch(&self, job: RenderJob);

    /// Block until every job dispatched so far has run
    fn flush(&self) {}
}

/// Runs every job immediately on the dispatching thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineScheduler;

impl RenderScheduler for InlineScheduler {
    fn dispatch(&self, job: RenderJob) {
        job();
    }
}

/// A dedicated render thread fed through a channel
///
/// Jobs run one at a time in the order they were dispatched. Dropping the scheduler
/// closes the channel, lets queued jobs finish, and joins the thread.
pub struct RenderThread {
    name: String,
    sender: Mutex<Option<Sender<RenderJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RenderThread {
    pub fn spawn<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<RenderJob>();

        let thread_name = name.clone();
        let worker = thread::Builder::new().name(name.clone()).spawn(move || {
            debug!("Render thread '{}' started", thread_name);
            while let Ok(job) = receiver.recv() {
                job();
            }
            debug!("Render thread '{}' stopped", thread_name);
        })?;

        info!("Spawned render thread '{}'", name);
        Ok(Self {
            name,
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop accepting jobs and wait for the queue to drain
    pub fn shutdown(&self) {
        self.sender.lock().take();

        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            // Dropped from one of its own jobs; the loop ends once the job returns
            return;
        }
        if worker.join().is_err() {
            warn!("Render thread '{}' panicked", self.name);
        }
    }
}

impl RenderScheduler for RenderThread {
    fn dispatch(&self, job: RenderJob) {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => {
                if sender.send(job).is_err() {
                    warn!("Render thread '{}' is gone, dropping job", self.name);
                }
            }
            None => warn!("Render thread '{}' is shut down, dropping job", self.name),
        }
    }

    fn flush(&self) {
        let is_worker = self
            .worker
            .lock()
            .as_ref()
            .map(|worker| worker.thread().id() == thread::current().id())
            .unwrap_or(false);
        if is_worker {
            return;
        }

        let (done, wait) = mpsc::channel();
        self.dispatch(Box::new(move || {
            let _ = done.send(());
        }));
        let _ = wait.recv();
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}
