//! Dedicated single-thread FIFO worker.
//!
//! Each worker is one named OS thread draining an unbounded FIFO, one job
//! at a time, in posting order.  Posting never blocks and never refuses a
//! job while the worker runs.  The thread parks on an `embassy-sync`
//! [`Signal`] inside `futures_lite::future::block_on` while the queue is
//! empty, so an idle worker costs nothing.
//!
//! ```text
//!  control context ──post()──▶ ┌────────────────┐      ┌──────────────────┐
//!  control context ──post()──▶ │ VecDeque<J>     │─────▶│ worker thread     │
//!                              └────────────────┘      │ handler(job)      │
//!  any context ─post()/stop()─▶ wake Signal ──────────▶│ → Continue / Stop │
//!                                                      └──────────────────┘
//! ```
//!
//! Once stopped (by [`SerialWorker::stop`] or by the handler returning
//! [`Flow::Stop`]) new posts are refused and every job still queued is
//! handed to the discard callback instead of the handler, so no request is
//! lost without an answer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::debug;

use crate::state::lock;

/// What the worker does after a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// The worker has stopped; the refused job is handed back.
#[derive(Debug, PartialEq, Eq)]
pub struct Stopped<J>(pub J);

struct Queue<J> {
    jobs: VecDeque<J>,
    stopped: bool,
}

struct Shared<J> {
    /// One lock guards the jobs *and* the stopped flag, so no job can slip
    /// in after the final drain.
    queue: Mutex<Queue<J>>,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl<J> Shared<J> {
    fn is_stopped(&self) -> bool {
        lock(&self.queue).stopped
    }

    fn mark_stopped(&self) {
        lock(&self.queue).stopped = true;
    }

    /// Next job to run, or `None` once stopped.  Parks while empty.
    fn next(&self) -> Option<J> {
        loop {
            {
                let mut queue = lock(&self.queue);
                if queue.stopped {
                    return None;
                }
                if let Some(job) = queue.jobs.pop_front() {
                    return Some(job);
                }
            }
            future::block_on(self.wake.wait());
        }
    }
}

/// Handle to a running worker.  Dropping it does not stop the thread;
/// call [`stop`](Self::stop) or let the handler return [`Flow::Stop`].
pub struct SerialWorker<J: Send + 'static> {
    shared: Arc<Shared<J>>,
    name: String,
}

impl<J: Send + 'static> SerialWorker<J> {
    /// Start the worker thread.
    pub fn spawn<H, D>(name: &str, stack_kb: usize, handler: H, discard: D) -> std::io::Result<Self>
    where
        H: FnMut(J) -> Flow + Send + 'static,
        D: FnMut(J) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                stopped: false,
            }),
            wake: Signal::new(),
        });

        debug!("Spawning '{}' (stack={}KB)", name, stack_kb);

        let thread_shared = Arc::clone(&shared);
        std::thread::Builder::new()
            .name(name.to_owned())
            .stack_size(stack_kb * 1024)
            .spawn(move || run(&thread_shared, handler, discard))?;

        Ok(Self {
            shared,
            name: name.to_owned(),
        })
    }

    /// Queue `job` behind everything posted before it.
    pub fn post(&self, job: J) -> Result<(), Stopped<J>> {
        {
            let mut queue = lock(&self.shared.queue);
            if queue.stopped {
                return Err(Stopped(job));
            }
            queue.jobs.push_back(job);
        }
        self.shared.wake.signal(());
        Ok(())
    }

    /// Stop the worker: queued jobs are discarded, new posts refused.
    /// The job currently running (if any) finishes normally.
    pub fn stop(&self) {
        self.shared.mark_stopped();
        self.shared.wake.signal(());
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn run<J, H, D>(shared: &Shared<J>, mut handler: H, mut discard: D)
where
    H: FnMut(J) -> Flow,
    D: FnMut(J),
{
    while let Some(job) = shared.next() {
        if handler(job) == Flow::Stop {
            shared.mark_stopped();
            break;
        }
    }

    // Answered outside the lock: discard callbacks may post elsewhere.
    let leftover: Vec<J> = lock(&shared.queue).jobs.drain(..).collect();
    for job in leftover {
        discard(job);
    }
    debug!("worker thread exiting");
}
