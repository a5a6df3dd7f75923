use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use log::trace;

use crate::error::Error;
use crate::event::{Filter, Flags, Hint, Kevent};
use crate::knote::{Hook, Knote, status};
use crate::registry;
use crate::sources::Sources;
use crate::sync;

/// Pending-list slot: a fired knote, or the sentinel a scan plants to
/// delimit the work that existed at scan entry.
enum Slot {
  Knote(Arc<Knote>),
  Marker,
}

struct Inner {
  /// Every live registration, keyed by identity.
  index: HashMap<(Filter, u64), Arc<Knote>>,
  /// FIFO of knotes whose filters said "active" and that have not been
  /// delivered this round.
  pending: VecDeque<Slot>,
  /// Knote count of `pending` (the sentinel is not counted).
  pending_count: usize,
  /// Threads blocked waiting for the pending count to leave zero.
  sleepers: usize,
  /// A drain pass is running; at most one sentinel exists at a time.
  scan_busy: bool,
  /// An interrupt wants the next (or current) wait to return early.
  interrupted: bool,
}

static QUEUE_ID: AtomicU64 = AtomicU64::new(1);

/// An event queue: registrations in, fired events out.
///
/// Created with [`Queue::new`] against a [`Sources`] bundle. The `Arc`
/// returned is the queue handle — clone it to share, drop the last clone
/// to destroy the queue and detach every registration.
///
/// All state is serialized by one internal lock; clients may freely issue
/// concurrent [`Queue::kevent`] calls on clones of the handle.
pub struct Queue {
  id: u64,
  /// Self-reference handed to knotes so sources can find their way back.
  weak: Weak<Queue>,
  sources: Arc<Sources>,
  inner: sync::Mutex<Inner>,
  /// Wakes sleepers blocked in a scan.
  sleep_cv: sync::Condvar,
  /// Wakes parties blocked on a knote's processing lease.
  lease_cv: sync::Condvar,
  /// Wakes scans waiting for the drain pass to free up.
  busy_cv: sync::Condvar,
}

impl Queue {
  pub fn new(sources: Arc<Sources>) -> Arc<Queue> {
    let id = QUEUE_ID.fetch_add(1, Ordering::AcqRel);
    trace!("new: queue={id}");
    Arc::new_cyclic(|weak| Queue {
      id,
      weak: weak.clone(),
      sources,
      inner: sync::Mutex::new(Inner {
        index: HashMap::new(),
        pending: VecDeque::new(),
        pending_count: 0,
        sleepers: 0,
        scan_busy: false,
        interrupted: false,
      }),
      sleep_cv: sync::Condvar::new(),
      lease_cv: sync::Condvar::new(),
      busy_cv: sync::Condvar::new(),
    })
  }

  /// The source bundle this queue resolves idents against.
  pub fn sources(&self) -> &Arc<Sources> {
    &self.sources
  }

  /// Applies `changes` in order, then retrieves up to `out.len()` fired
  /// events, blocking at most `timeout`.
  ///
  /// Per-change failures become inline records with [`Flags::ERROR`] set
  /// and the error code in `data`; the batch continues past them. The
  /// call only fails as a whole when a change fails with no room left in
  /// `out` for its record.
  ///
  /// `timeout` of `None` blocks until something fires; `Some(ZERO)`
  /// polls. Early returns — deadline, [`Queue::interrupt`] — are normal:
  /// the count says how much arrived.
  pub fn kevent(
    &self,
    changes: &[Kevent],
    out: &mut [Kevent],
    timeout: Option<Duration>,
  ) -> Result<usize, Error> {
    let mut written = 0;

    for change in changes {
      match self.register(change) {
        Ok(()) => {
          if change.flags.contains(Flags::RECEIPT) {
            if written == out.len() {
              return Err(Error::InvalidArgument);
            }
            let mut record = *change;
            record.flags |= Flags::ERROR;
            record.data = 0;
            out[written] = record;
            written += 1;
          }
        }
        Err(err) => {
          if written == out.len() {
            return Err(err);
          }
          let mut record = *change;
          record.flags |= Flags::ERROR;
          record.data = err.code();
          out[written] = record;
          written += 1;
        }
      }
    }

    if written < out.len() {
      self.scan(out, written, timeout)
    } else {
      Ok(written)
    }
  }

  /// Wakes a blocked retrieval for an early successful return; the next
  /// retrieval returns immediately if none is blocked right now.
  pub fn interrupt(&self) {
    trace!("interrupt: queue={}", self.id);
    let mut inner = self.inner.lock();
    inner.interrupted = true;
    if inner.sleepers > 0 {
      self.sleep_cv.notify_all();
    }
  }

  /// Number of knotes currently on the pending list.
  #[doc(hidden)]
  pub fn pending_events(&self) -> usize {
    self.inner.lock().pending_count
  }

  /// Whether `(filter, ident)` is currently registered.
  #[doc(hidden)]
  pub fn is_registered(&self, filter: Filter, ident: u64) -> bool {
    self.inner.lock().index.contains_key(&(filter, ident))
  }

  // --- registration state machine ---

  pub(crate) fn register(&self, kev: &Kevent) -> Result<(), Error> {
    trace!(
      "register: queue={}, filter={}, ident={}, flags={:#06x}",
      self.id,
      kev.filter.0,
      kev.ident,
      kev.flags.bits()
    );

    let ops = registry::checkout(kev.filter)?;
    let deleting = kev.flags.contains(Flags::DELETE);

    // Resolve a handle-addressed ident up front and hold the file across
    // the whole operation.
    let file = if ops.fd_ident() && !deleting {
      match self.sources.files().resolve(kev.ident) {
        Some(file) => Some(file),
        None => {
          registry::release(kev.filter);
          return Err(Error::BadIdent);
        }
      }
    } else {
      None
    };

    if deleting {
      registry::release(kev.filter);
      return self.delete_registration(kev.filter, kev.ident);
    }

    let mut inner = self.inner.lock();
    let key = (kev.filter, kev.ident);

    let Some(kn) = inner.index.get(&key).cloned() else {
      if !kev.flags.contains(Flags::ADD) {
        drop(inner);
        registry::release(kev.filter);
        return Err(Error::NoSuchRegistration);
      }

      // Create: the knote owns the registry checkout from here on.
      let kn = Knote::new(self.weak.clone(), kev, ops.clone());
      if let Some(file) = file {
        kn.state().hook = Hook::File(file);
      }
      if kev.flags.contains(Flags::DISABLE) {
        kn.set_status(status::DISABLED);
      }
      inner.index.insert(key, kn.clone());

      match ops.attach(&kn) {
        Err(err) => {
          inner.index.remove(&key);
          drop(inner);
          registry::release(kev.filter);
          return Err(err);
        }
        Ok(already_active) => {
          if already_active || ops.event(&kn, 0) {
            kn.set_status(status::ACTIVE);
            if kn.status() & (status::QUEUED | status::DISABLED) == 0 {
              Self::enqueue(&mut inner, &self.sleep_cv, &kn);
            }
          }
        }
      }
      return Ok(());
    };

    // Modify path. A knote whose source is gone only accepts DELETE.
    if kn.status() & status::DETACHED != 0 {
      drop(inner);
      registry::release(kev.filter);
      return Err(Error::BadIdent);
    }

    inner = self.lease_acquire(inner, &kn);
    // The wait may have let a concurrent delete through.
    if kn.status() & status::DELETING != 0
      || !inner.index.get(&key).is_some_and(|k| Arc::ptr_eq(k, &kn))
    {
      self.lease_release(&mut inner, &kn);
      drop(inner);
      registry::release(kev.filter);
      return Err(Error::NoSuchRegistration);
    }

    let mut result = Ok(());
    if kev.flags.contains(Flags::ADD) {
      result = kn.ops().touch(&kn, kev);
    }

    if result.is_ok() {
      if kev.flags.contains(Flags::DISABLE) {
        kn.set_status(status::DISABLED);
        if kn.status() & status::QUEUED != 0 {
          Self::dequeue(&mut inner, &kn);
        }
      }
      if kev.flags.contains(Flags::ENABLE) {
        kn.clear_status(status::DISABLED);
      }
      if kn.status() & (status::DISABLED | status::DETACHED) == 0 {
        // Re-evaluate with a null hint; enqueue if the source is active.
        if kn.status() & status::ACTIVE != 0 || kn.ops().event(&kn, 0) {
          kn.set_status(status::ACTIVE);
          if kn.status() & status::QUEUED == 0 {
            Self::enqueue(&mut inner, &self.sleep_cv, &kn);
          }
        }
      }
    }

    self.lease_release(&mut inner, &kn);
    drop(inner);
    registry::release(kev.filter);
    result
  }

  /// Deletes `(filter, ident)`: lease, detach, unlink, free.
  pub(crate) fn delete_registration(
    &self,
    filter: Filter,
    ident: u64,
  ) -> Result<(), Error> {
    let mut inner = self.inner.lock();
    let Some(kn) = inner.index.get(&(filter, ident)).cloned() else {
      return Err(Error::NoSuchRegistration);
    };
    let prev = kn.set_status(status::DELETING);
    if prev & status::DELETING != 0 {
      // Another party already owns the destruction.
      return Ok(());
    }
    inner = self.lease_acquire(inner, &kn);
    self.free_knote(&mut inner, &kn);
    self.lease_release(&mut inner, &kn);
    Ok(())
  }

  pub(crate) fn lookup_knote(
    &self,
    filter: Filter,
    ident: u64,
  ) -> Option<Arc<Knote>> {
    self.inner.lock().index.get(&(filter, ident)).cloned()
  }

  // --- activation path ---

  /// Entry point for event sources: `kn`'s source has news.
  pub(crate) fn activate(&self, kn: &Arc<Knote>, hint: Hint) {
    let mut inner = self.inner.lock();
    loop {
      let s = kn.status();
      if s & status::PROCESSING != 0 {
        // Don't race the lease holder; it re-checks before releasing. A
        // null hint carries no state, so flagging the re-check is
        // enough; a non-zero hint must wait or its payload is lost.
        if hint == 0 {
          kn.set_status(status::ACTIVE | status::REPROCESS);
          return;
        }
        kn.set_status(status::WAITING | status::REPROCESS);
        inner = self.lease_cv.wait(inner);
        continue;
      }
      if s & (status::DELETING | status::DETACHED) != 0 {
        return;
      }
      break;
    }
    if kn.ops().event(kn, hint) {
      kn.set_status(status::ACTIVE);
      if kn.status() & (status::QUEUED | status::DISABLED) == 0 {
        Self::enqueue(&mut inner, &self.sleep_cv, kn);
      }
    }
  }

  // --- pending list ---

  fn enqueue(inner: &mut Inner, sleep_cv: &sync::Condvar, kn: &Arc<Knote>) {
    debug_assert_eq!(kn.status() & status::QUEUED, 0);
    kn.set_status(status::QUEUED);
    inner.pending.push_back(Slot::Knote(kn.clone()));
    inner.pending_count += 1;
    if inner.sleepers > 0 {
      sleep_cv.notify_one();
    }
  }

  fn dequeue(inner: &mut Inner, kn: &Arc<Knote>) {
    let target = Arc::as_ptr(kn);
    if let Some(pos) = inner.pending.iter().position(
      |slot| matches!(slot, Slot::Knote(k) if Arc::as_ptr(k) == target),
    ) {
      let _ = inner.pending.remove(pos);
      inner.pending_count -= 1;
    }
    kn.clear_status(status::QUEUED);
  }

  // --- processing lease ---

  fn lease_acquire<'a>(
    &self,
    mut inner: sync::MutexGuard<'a, Inner>,
    kn: &Knote,
  ) -> sync::MutexGuard<'a, Inner> {
    loop {
      let s = kn.status();
      if s & status::PROCESSING == 0 {
        if kn.try_set_processing(s) {
          return inner;
        }
      } else {
        kn.set_status(status::WAITING);
        inner = self.lease_cv.wait(inner);
      }
    }
  }

  fn lease_release(
    &self,
    _inner: &mut sync::MutexGuard<'_, Inner>,
    kn: &Knote,
  ) {
    let prev = kn.clear_status(status::PROCESSING | status::WAITING);
    if prev & status::WAITING != 0 {
      self.lease_cv.notify_all();
    }
  }

  /// Unlinks and tears a knote down. The caller holds the lease and has
  /// set DELETING (or owns the queue during teardown).
  fn free_knote(&self, inner: &mut Inner, kn: &Arc<Knote>) {
    let key = (kn.filter(), kn.ident());
    if inner.index.get(&key).is_some_and(|k| Arc::ptr_eq(k, kn)) {
      inner.index.remove(&key);
    }
    if kn.status() & status::QUEUED != 0 {
      Self::dequeue(inner, kn);
    }
    if kn.set_status(status::DETACHED) & status::DETACHED == 0 {
      kn.ops().detach(kn);
    }
    registry::release(kn.filter());
  }

  // --- scan engine ---

  /// Drains fired knotes into `out[written..]`, sleeping until `timeout`
  /// when nothing has been produced yet.
  fn scan(
    &self,
    out: &mut [Kevent],
    written: usize,
    timeout: Option<Duration>,
  ) -> Result<usize, Error> {
    let deadline = timeout.map(|t| Instant::now() + t);
    let poll = timeout.is_some_and(|t| t.is_zero());
    let max = out.len();
    let mut count = written;

    trace!("scan: queue={}, max={}, timeout={:?}", self.id, max, timeout);

    let mut inner = self.inner.lock();
    loop {
      // One sentinel-delimited drain pass at a time.
      while inner.scan_busy {
        inner = self.busy_cv.wait(inner);
      }
      inner.scan_busy = true;
      inner.pending.push_back(Slot::Marker);

      while count < max {
        let slot =
          inner.pending.pop_front().expect("sentinel bounds the list");
        let kn = match slot {
          Slot::Marker => break,
          Slot::Knote(kn) => kn,
        };
        kn.clear_status(status::QUEUED);
        inner.pending_count -= 1;

        inner = self.lease_acquire(inner, &kn);
        if kn.status() & (status::DISABLED | status::DELETING) != 0 {
          self.lease_release(&mut inner, &kn);
          continue;
        }

        // Re-evaluate and copy out without the queue lock; the lease
        // keeps the knote ours and REPROCESS covers activations that
        // land meanwhile.
        let (active, record) = loop {
          drop(inner);
          let active = if kn.status() & status::DETACHED != 0 {
            // The source is gone; the end-of-stream reading is sticky.
            true
          } else {
            kn.ops().event(&kn, 0)
          };
          let record = if active { Some(kn.state().kev) } else { None };
          inner = self.inner.lock();
          if kn.status() & status::REPROCESS != 0 {
            kn.clear_status(status::REPROCESS);
            continue;
          }
          break (active, record);
        };

        if !active {
          kn.clear_status(status::ACTIVE);
          self.lease_release(&mut inner, &kn);
          continue;
        }
        let record = record.expect("active knotes carry a record");
        out[count] = record;
        count += 1;
        kn.ops().delivered(&kn);

        if record.flags.contains(Flags::ONESHOT) {
          if kn.set_status(status::DELETING) & status::DELETING == 0 {
            self.free_knote(&mut inner, &kn);
          }
          self.lease_release(&mut inner, &kn);
        } else if record.flags.contains(Flags::CLEAR) {
          {
            let mut st = kn.state();
            st.kev.data = 0;
            st.kev.fflags = 0;
          }
          kn.ops().cleared(&kn);
          kn.clear_status(status::ACTIVE);
          self.lease_release(&mut inner, &kn);
        } else if record.flags.contains(Flags::DISPATCH) {
          kn.set_status(status::DISABLED);
          kn.clear_status(status::ACTIVE);
          self.lease_release(&mut inner, &kn);
        } else {
          // Level-triggered: a still-active source rides to the tail,
          // behind the sentinel.
          let still = if kn.status() & status::DETACHED != 0 {
            true
          } else {
            kn.ops().event(&kn, 0)
          };
          if still {
            if kn.status()
              & (status::QUEUED | status::DISABLED | status::DELETING)
              == 0
            {
              Self::enqueue(&mut inner, &self.sleep_cv, &kn);
            }
          } else {
            kn.clear_status(status::ACTIVE);
          }
          self.lease_release(&mut inner, &kn);
        }
      }

      // The sentinel survives when the pass stopped on a full `out`.
      if let Some(pos) =
        inner.pending.iter().position(|s| matches!(s, Slot::Marker))
      {
        let _ = inner.pending.remove(pos);
      }
      inner.scan_busy = false;
      self.busy_cv.notify_one();

      if count > 0 {
        break;
      }
      if inner.interrupted {
        inner.interrupted = false;
        trace!("scan interrupted: queue={}", self.id);
        break;
      }
      if poll {
        break;
      }
      if let Some(d) = deadline {
        if Instant::now() >= d {
          break;
        }
      }

      inner.sleepers += 1;
      inner = match deadline {
        None => self.sleep_cv.wait(inner),
        Some(d) => {
          let remaining = d.saturating_duration_since(Instant::now());
          let (guard, _timed_out) =
            self.sleep_cv.wait_timeout(inner, remaining);
          guard
        }
      };
      inner.sleepers -= 1;
      if inner.interrupted {
        inner.interrupted = false;
        trace!("scan interrupted: queue={}", self.id);
        break;
      }
    }

    trace!("scan done: queue={}, count={}", self.id, count);
    Ok(count)
  }
}


impl Drop for Queue {
  fn drop(&mut self) {
    trace!("drop: queue={}", self.id);
    let mut inner = self.inner.lock();
    let knotes: Vec<_> = inner.index.drain().map(|(_, kn)| kn).collect();
    inner.pending.clear();
    inner.pending_count = 0;
    drop(inner);

    for kn in knotes {
      kn.set_status(status::DELETING);
      if kn.set_status(status::DETACHED) & status::DETACHED == 0 {
        kn.ops().detach(&kn);
      }
      registry::release(kn.filter());
    }
  }
}
