use std::fmt;
use std::io::{self, BufRead};
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};

use crate::DocId;

/// Lines handed to workers in batches of this size, to amortize queue
/// synchronization against per-document work.
pub const BATCH_SIZE: usize = 512;

/// Queue capacity per worker thread.
pub const QUEUE_SIZE_PER_THREAD: usize = 32;

/// One input line plus its 1-based line number, which doubles as the
/// document id.
#[derive(Debug)]
pub struct Line {
    pub number: DocId,
    pub text: String,
}

/// How often a queue made someone wait.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueuePerformance {
    /// Producer-side blocks: the queue was full on push.
    pub overflow: usize,
    /// Consumer-side blocks: the queue was empty on pop.
    pub underflow: usize,
}

impl fmt::Display for QueuePerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "underflow: {} overflow: {}",
            self.underflow, self.overflow
        )
    }
}

/// Bounded blocking FIFO connecting one pipeline stage to the next.
///
/// `push` blocks while the queue is full, which is what propagates
/// back-pressure upstream. Shutdown is cooperative: the producer calls
/// `poison` once per worker and each worker exits when `pop` returns `None`.
pub struct BlockingQueue<T> {
    tx: Sender<Option<T>>,
    rx: Receiver<Option<T>>,
    overflow: AtomicUsize,
    underflow: AtomicUsize,
}

impl<T> BlockingQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            overflow: AtomicUsize::new(0),
            underflow: AtomicUsize::new(0),
        }
    }

    /// Push an element, blocking while the queue is full.
    pub fn push(&self, item: T) {
        match self.tx.try_send(Some(item)) {
            Ok(()) => {}
            Err(TrySendError::Full(item)) => {
                self.overflow.fetch_add(1, Ordering::Relaxed);
                self.tx.send(item).expect("queue receiver dropped");
            }
            Err(TrySendError::Disconnected(_)) => unreachable!("queue receiver dropped"),
        }
    }

    /// Pop an element, blocking while the queue is empty. `None` is the
    /// poison pill: the worker receiving it must exit.
    pub fn pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => item,
            Err(TryRecvError::Empty) => {
                self.underflow.fetch_add(1, Ordering::Relaxed);
                self.rx.recv().expect("queue sender dropped")
            }
            Err(TryRecvError::Disconnected) => unreachable!("queue sender dropped"),
        }
    }

    /// Push one poison pill per worker. Every worker pops exactly one.
    pub fn poison(&self, workers: usize) {
        for _ in 0..workers {
            self.tx.send(None).expect("queue receiver dropped");
        }
    }

    /// Pop and discard everything up to this worker's poison pill. A failing
    /// worker calls this before propagating its error so the producer is
    /// never left blocked on a full queue.
    pub fn drain(&self) {
        while self.pop().is_some() {}
    }

    pub fn performance(&self) -> QueuePerformance {
        QueuePerformance {
            overflow: self.overflow.load(Ordering::Relaxed),
            underflow: self.underflow.load(Ordering::Relaxed),
        }
    }
}

/// Read every line of `reader` onto the queue in `BATCH_SIZE` chunks.
/// Returns the number of lines queued. Line numbers start at 1.
pub fn queue_lines<R: BufRead>(reader: R, queue: &BlockingQueue<Vec<Line>>) -> Result<usize> {
    queue_lines_from(reader.lines(), 0, queue)
}

/// Same as [`queue_lines`] but continuing an existing line iterator whose
/// next line is number `offset + 1`.
pub fn queue_lines_from<I>(
    lines: I,
    offset: usize,
    queue: &BlockingQueue<Vec<Line>>,
) -> Result<usize>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut number = offset;
    let mut batch = Vec::with_capacity(BATCH_SIZE);

    for line in lines {
        number += 1;
        batch.push(Line {
            number,
            text: line?,
        });

        if batch.len() == BATCH_SIZE {
            queue.push(mem::replace(&mut batch, Vec::with_capacity(BATCH_SIZE)));
        }
    }

    if !batch.is_empty() {
        queue.push(batch);
    }

    Ok(number - offset)
}
