use std::{
    cell::Cell,
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashSet},
    time::{Duration, Instant},
};

/// Time source for the cooperative loop. `SystemClock` is the real thing;
/// `ManualClock` lets tests drive fade steps and polls without sleeping.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deterministic clock: `sleep` advances virtual time instead of blocking.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    elapsed: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Identifies one scheduled callback. Handles are value tokens bound to a
/// single entry, so cancelling one can never touch a different session's
/// timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

struct Entry<T> {
    due: Instant,
    seq: u64,
    handle: TaskHandle,
    token: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // seq breaks ties so same-instant entries fire in schedule order.
        self.due.cmp(&other.due).then(self.seq.cmp(&other.seq))
    }
}

/// Single-threaded deferred-callback queue: "run this token after N time
/// units". Tokens are plain values; the driver loop decides what firing one
/// means. Cancellation is lazy — cancelled entries are skipped on pop.
pub struct Scheduler<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    pending: HashSet<TaskHandle>,
    next_seq: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashSet::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, due: Instant, token: T) -> TaskHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        let handle = TaskHandle(seq);
        self.heap.push(Reverse(Entry {
            due,
            seq,
            handle,
            token,
        }));
        self.pending.insert(handle);
        handle
    }

    pub fn schedule_after(&mut self, now: Instant, delay: Duration, token: T) -> TaskHandle {
        self.schedule(now + delay, token)
    }

    /// Returns true if the handle referred to a still-pending entry.
    /// Cancelling twice, or cancelling an already-fired task, is a no-op.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.pending.remove(&handle)
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Earliest due time among live entries, discarding cancelled ones.
    pub fn next_due(&mut self) -> Option<Instant> {
        while let Some(Reverse(entry)) = self.heap.peek() {
            if self.pending.contains(&entry.handle) {
                return Some(entry.due);
            }
            self.heap.pop();
        }
        None
    }

    /// Pops the earliest live entry that is due at `now`, if any.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TaskHandle, T)> {
        loop {
            match self.heap.peek() {
                None => return None,
                Some(Reverse(entry)) => {
                    if self.pending.contains(&entry.handle) && entry.due > now {
                        return None;
                    }
                }
            }
            if let Some(Reverse(entry)) = self.heap.pop()
                && self.pending.remove(&entry.handle)
            {
                return Some((entry.handle, entry.token));
            }
        }
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
