use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::knote::Knote;
use crate::sync;

enum Cmd {
  Schedule(Entry),
  Cancel { id: u64 },
  Shutdown,
}

struct Entry {
  id: u64,
  deadline: Instant,
  /// None fires once; Some re-arms on that period.
  period: Option<Duration>,
  kn: Weak<Knote>,
}

/// Cancellation handle held by a timer knote.
pub struct TimerHandle {
  id: u64,
  tx: Sender<Cmd>,
}

impl TimerHandle {
  pub fn id(&self) -> u64 {
    self.id
  }

  pub(crate) fn cancel(&self) {
    let _ = self.tx.send(Cmd::Cancel { id: self.id });
  }
}

/// The timer facility: one background worker owning a deadline heap.
///
/// Expirations are batched: a worker that falls behind a periodic timer
/// reports every missed period in one activation, so the expiration count
/// clients see never under-reports.
pub struct TimerWheel {
  tx: Sender<Cmd>,
  next_id: AtomicU64,
  worker: sync::Mutex<Option<JoinHandle<()>>>,
}

impl TimerWheel {
  pub(crate) fn new() -> Self {
    let (tx, rx) = unbounded();
    let handle = std::thread::Builder::new()
      .name("evq-timer".into())
      .spawn(move || run(rx))
      .expect("failed to launch the timer thread");
    log::trace!("timer wheel started");
    Self {
      tx,
      next_id: AtomicU64::new(1),
      worker: sync::Mutex::new(Some(handle)),
    }
  }

  pub(crate) fn schedule(
    &self,
    kn: &Arc<Knote>,
    deadline: Instant,
    period: Option<Duration>,
  ) -> TimerHandle {
    let id = self.next_id.fetch_add(1, Ordering::AcqRel);
    let _ = self.tx.send(Cmd::Schedule(Entry {
      id,
      deadline,
      period,
      kn: Arc::downgrade(kn),
    }));
    TimerHandle { id, tx: self.tx.clone() }
  }
}

impl Drop for TimerWheel {
  fn drop(&mut self) {
    let _ = self.tx.send(Cmd::Shutdown);
    if let Some(handle) = self.worker.lock().take() {
      let _ = handle.join();
    }
    log::trace!("timer wheel stopped");
  }
}

fn run(rx: Receiver<Cmd>) {
  let mut heap: BinaryHeap<Reverse<(Instant, u64)>> = BinaryHeap::new();
  let mut entries: HashMap<u64, Entry> = HashMap::new();

  loop {
    let cmd = match heap.peek() {
      Some(&Reverse((when, _))) => {
        let now = Instant::now();
        if when <= now {
          None
        } else {
          match rx.recv_timeout(when - now) {
            Ok(cmd) => Some(cmd),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => return,
          }
        }
      }
      None => match rx.recv() {
        Ok(cmd) => Some(cmd),
        Err(_) => return,
      },
    };

    match cmd {
      Some(Cmd::Schedule(entry)) => {
        heap.push(Reverse((entry.deadline, entry.id)));
        entries.insert(entry.id, entry);
      }
      Some(Cmd::Cancel { id }) => {
        // The heap copy is discarded lazily when it surfaces.
        entries.remove(&id);
      }
      Some(Cmd::Shutdown) => return,
      None => fire_due(&mut heap, &mut entries),
    }
  }
}

fn fire_due(
  heap: &mut BinaryHeap<Reverse<(Instant, u64)>>,
  entries: &mut HashMap<u64, Entry>,
) {
  let now = Instant::now();
  while let Some(&Reverse((when, id))) = heap.peek() {
    if when > now {
      break;
    }
    heap.pop();
    let Some(entry) = entries.get_mut(&id) else {
      continue;
    };
    if entry.deadline != when {
      // Stale heap copy from a reschedule.
      continue;
    }
    let Some(kn) = entry.kn.upgrade() else {
      entries.remove(&id);
      continue;
    };

    let expirations = match entry.period {
      Some(period) if !period.is_zero() => {
        let missed =
          (now.duration_since(when).as_nanos() / period.as_nanos()) as u64;
        entry.deadline = when + period * (missed as u32 + 1);
        heap.push(Reverse((entry.deadline, id)));
        1 + missed
      }
      _ => {
        entries.remove(&id);
        1
      }
    };

    if let Some(queue) = kn.queue() {
      queue.activate(&kn, expirations);
    }
  }
}
