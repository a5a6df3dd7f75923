use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use crate::event::{Filter, Flags, Kevent};
use crate::filter::FilterOps;
use crate::queue::Queue;
use crate::sources::fdtable::FileLike;
use crate::sources::fs::FsHub;
use crate::sources::process::ProcNode;
use crate::sources::signal::SigNode;
use crate::sources::timer::TimerHandle;
use crate::sync;

/// Knote status bits, kept in a single atomic word.
pub mod status {
  /// Last filter evaluation said "fire".
  pub const ACTIVE: u32 = 1 << 0;
  /// Currently linked on the owning queue's pending list.
  pub const QUEUED: u32 = 1 << 1;
  /// Suppressed from delivery (still registered).
  pub const DISABLED: u32 = 1 << 2;
  /// The filter's detach has run; the filter must not be called again.
  pub const DETACHED: u32 = 1 << 3;
  /// A scan or a modifier holds the processing lease.
  pub const PROCESSING: u32 = 1 << 4;
  /// Another party wants the processing lease.
  pub const WAITING: u32 = 1 << 5;
  /// An activation arrived while the lease was held; the holder re-checks
  /// before releasing.
  pub const REPROCESS: u32 = 1 << 6;
  /// Scheduled for destruction.
  pub const DELETING: u32 = 1 << 7;
}

/// The knote's connection to its event source.
///
/// A tagged union rather than an opaque pointer: each variant carries
/// exactly the state its filter needs to answer "are you active" and to
/// detach later without reaching back into the queue. Third-party
/// filters park whatever they need in `External`.
pub enum Hook {
  None,
  File(Arc<dyn FileLike>),
  Proc(Arc<ProcNode>),
  Signal { node: Arc<SigNode>, seen: u64 },
  Timer { handle: TimerHandle, fired: u64 },
  User { triggered: bool },
  Fs(Arc<FsHub>),
  External(Box<dyn std::any::Any + Send>),
}

/// Mutable knote state, guarded by the knote's own mutex.
///
/// Holders of the queue lock or of the processing lease may take this lock;
/// it is never held while acquiring the queue lock.
pub struct KnoteState {
  /// The canonical user-visible descriptor. `flags` keeps only the
  /// behavior bits plus whatever the filter reports (EOF/NODATA);
  /// `fflags`/`data` are the outbound readings.
  pub kev: Kevent,
  /// Parameters captured at registration, preserved across re-evaluation.
  pub saved_fflags: u32,
  pub saved_data: i64,
  pub hook: Hook,
}

/// One live registration: "tell me when source `ident` meets the condition
/// of `filter`".
///
/// Owned by its queue's master index; sources hold weak references through
/// their note lists.
pub struct Knote {
  ident: u64,
  filter: Filter,
  queue: Weak<Queue>,
  pub(crate) status: AtomicU32,
  ops: Arc<dyn FilterOps>,
  state: sync::Mutex<KnoteState>,
}

impl Knote {
  pub(crate) fn new(
    queue: Weak<Queue>,
    kev: &Kevent,
    ops: Arc<dyn FilterOps>,
  ) -> Arc<Knote> {
    let mut stored = *kev;
    stored.flags = Flags::from_bits(kev.flags.bits() & Flags::SAVED.bits());
    // Outbound fields start clean; the inbound parameters live in the
    // saved copies.
    stored.fflags = 0;
    stored.data = 0;

    Arc::new(Knote {
      ident: kev.ident,
      filter: kev.filter,
      queue,
      status: AtomicU32::new(0),
      ops,
      state: sync::Mutex::new(KnoteState {
        kev: stored,
        saved_fflags: kev.fflags,
        saved_data: kev.data,
        hook: Hook::None,
      }),
    })
  }

  pub fn ident(&self) -> u64 {
    self.ident
  }

  pub fn filter(&self) -> Filter {
    self.filter
  }

  /// The owning queue, if it is still alive.
  pub fn queue(&self) -> Option<Arc<Queue>> {
    self.queue.upgrade()
  }

  pub fn state(&self) -> sync::MutexGuard<'_, KnoteState> {
    self.state.lock()
  }

  pub(crate) fn ops(&self) -> &Arc<dyn FilterOps> {
    &self.ops
  }

  pub fn status(&self) -> u32 {
    self.status.load(Ordering::Acquire)
  }

  /// Sets `bits`, returning the previous word.
  pub(crate) fn set_status(&self, bits: u32) -> u32 {
    self.status.fetch_or(bits, Ordering::AcqRel)
  }

  /// Clears `bits`, returning the previous word.
  pub(crate) fn clear_status(&self, bits: u32) -> u32 {
    self.status.fetch_and(!bits, Ordering::AcqRel)
  }

  /// Attempts the PROCESSING transition from an observed status word.
  pub(crate) fn try_set_processing(&self, observed: u32) -> bool {
    self
      .status
      .compare_exchange(
        observed,
        observed | status::PROCESSING,
        Ordering::AcqRel,
        Ordering::Acquire,
      )
      .is_ok()
  }
}
