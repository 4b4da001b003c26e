use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use parking_lot::Mutex;
use serde_json::Value;

/// An opaque job payload. The queue never interprets it.
pub type Job = HashMap<String, Value>;

struct QueuedJob {
    priority: i64,
    seq: u64,
    job: Job,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for QueuedJob {}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority dequeues first; equal priority is FIFO, so for
        // equal priority the *lower* insertion sequence must sort higher
        // in the max-heap.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority FIFO job queues, one `BinaryHeap` per named queue (spec.md
/// §4.1). Delivery is at-least-once; the caller is responsible for
/// idempotency via `Cache::idempotency`.
#[derive(Default)]
pub struct JobQueue {
    queues: Mutex<HashMap<String, BinaryHeap<QueuedJob>>>,
    next_seq: Mutex<u64>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, queue: &str, job: Job, priority: i64) {
        let seq = {
            let mut next = self.next_seq.lock();
            let seq = *next;
            *next += 1;
            seq
        };
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push(QueuedJob { priority, seq, job });
    }

    pub fn dequeue(&self, queue: &str) -> Option<Job> {
        self.queues
            .lock()
            .get_mut(queue)
            .and_then(|heap| heap.pop())
            .map(|qj| qj.job)
    }

    pub fn length(&self, queue: &str) -> usize {
        self.queues.lock().get(queue).map(|heap| heap.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(tag: &str) -> Job {
        let mut j = HashMap::new();
        j.insert("tag".to_string(), Value::String(tag.to_string()));
        j
    }

    #[test]
    fn higher_priority_dequeues_first() {
        let q = JobQueue::new();
        q.enqueue("q", job("low"), 0);
        q.enqueue("q", job("high"), 10);
        let first = q.dequeue("q").unwrap();
        assert_eq!(first["tag"], Value::String("high".to_string()));
    }

    #[test]
    fn equal_priority_is_fifo() {
        let q = JobQueue::new();
        q.enqueue("q", job("first"), 1);
        q.enqueue("q", job("second"), 1);
        assert_eq!(q.dequeue("q").unwrap()["tag"], Value::String("first".to_string()));
        assert_eq!(q.dequeue("q").unwrap()["tag"], Value::String("second".to_string()));
    }

    #[test]
    fn length_and_empty_dequeue() {
        let q = JobQueue::new();
        assert_eq!(q.length("q"), 0);
        assert!(q.dequeue("q").is_none());
        q.enqueue("q", job("x"), 0);
        assert_eq!(q.length("q"), 1);
    }
}
