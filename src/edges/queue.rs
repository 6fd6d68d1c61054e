//! Background processing queue with debounced submission.
//!
//! A fixed pool of workers drains an mpsc channel. Debounced
//! submissions land in a single pending slot that a scheduler thread
//! polls; only the newest submission survives the debounce window, so
//! a burst of parameter changes runs the pipeline once. A generation
//! counter guards both ends against racing submissions: a task only
//! enters the slot when it is newer than the occupant, and the
//! scheduler only promotes a slot whose generation is still current.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

use super::lock;

pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// Worker-pool and debounce configuration.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Number of worker threads.
    pub workers: usize,
    /// Quiet window a debounced submission must survive.
    pub debounce: Duration,
    /// Scheduler poll period.
    pub poll_interval: Duration,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            workers: 2,
            debounce: Duration::from_millis(300),
            poll_interval: Duration::from_millis(100),
        }
    }
}

struct PendingTask {
    generation: u64,
    ready_at: Instant,
    task: Task,
}

pub(crate) struct ProcessingQueue {
    sender: Option<Sender<Task>>,
    pending: Arc<Mutex<Option<PendingTask>>>,
    generation: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    debounce: Duration,
    workers: Vec<JoinHandle<()>>,
    scheduler: Option<JoinHandle<()>>,
}

impl ProcessingQueue {
    pub(crate) fn new(options: QueueOptions) -> Self {
        let (sender, receiver) = channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));
        let running = Arc::new(AtomicBool::new(true));
        let pending = Arc::new(Mutex::new(None::<PendingTask>));
        let generation = Arc::new(AtomicU64::new(0));

        let worker_count = options.workers.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let receiver = Arc::clone(&receiver);
            workers.push(thread::spawn(move || worker_loop(id, receiver)));
        }

        let scheduler = {
            let pending = Arc::clone(&pending);
            let generation = Arc::clone(&generation);
            let running = Arc::clone(&running);
            let sender = sender.clone();
            let poll = options.poll_interval;
            thread::spawn(move || scheduler_loop(pending, generation, running, sender, poll))
        };

        Self {
            sender: Some(sender),
            pending,
            generation,
            running,
            debounce: options.debounce,
            workers,
            scheduler: Some(scheduler),
        }
    }

    /// Replace the pending slot with this task; it runs once the
    /// debounce window passes without a newer submission.
    pub(crate) fn submit_debounced(&self, task: Task) -> Result<()> {
        if !self.running.load(Ordering::Acquire) {
            return Err(Error::QueueClosed);
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let ready_at = Instant::now() + self.debounce;
        {
            let mut slot = lock(&self.pending);
            // A submitter preempted between taking its generation and
            // storing must not overwrite a newer task.
            if slot.as_ref().is_none_or(|p| p.generation < generation) {
                *slot = Some(PendingTask {
                    generation,
                    ready_at,
                    task,
                });
            }
        }
        log::debug!("ProcessingQueue::submit_debounced generation={generation}");
        Ok(())
    }

    /// Hand the task straight to the workers, bypassing the debounce.
    pub(crate) fn submit_now(&self, task: Task) -> Result<()> {
        if !self.running.load(Ordering::Acquire) {
            return Err(Error::QueueClosed);
        }
        match &self.sender {
            Some(sender) => sender.send(task).map_err(|_| Error::QueueClosed),
            None => Err(Error::QueueClosed),
        }
    }
}

impl Drop for ProcessingQueue {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        lock(&self.pending).take();
        // Closing the channel lets the workers drain and exit.
        self.sender.take();
        if let Some(handle) = self.scheduler.take() {
            let _ = handle.join();
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(id: usize, receiver: Arc<Mutex<Receiver<Task>>>) {
    loop {
        let task = {
            let guard = lock(&receiver);
            guard.recv()
        };
        match task {
            Ok(task) => {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
                    log::warn!(
                        "ProcessingQueue: worker {id} task panicked: {}",
                        panic_text(payload.as_ref())
                    );
                }
            }
            Err(_) => break,
        }
    }
    log::debug!("ProcessingQueue: worker {id} stopped");
}

fn scheduler_loop(
    pending: Arc<Mutex<Option<PendingTask>>>,
    generation: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    sender: Sender<Task>,
    poll: Duration,
) {
    while running.load(Ordering::Acquire) {
        thread::sleep(poll);
        let promoted = {
            let mut slot = lock(&pending);
            let ready = slot.as_ref().is_some_and(|p| {
                p.ready_at <= Instant::now()
                    && p.generation == generation.load(Ordering::Acquire)
            });
            if ready {
                slot.take()
            } else {
                None
            }
        };
        if let Some(p) = promoted {
            log::debug!(
                "ProcessingQueue: promoting debounced task generation={}",
                p.generation
            );
            if sender.send(p.task).is_err() {
                break;
            }
        }
    }
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
