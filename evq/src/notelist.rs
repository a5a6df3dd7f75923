use std::sync::{Arc, Weak};

use crate::event::Hint;
use crate::knote::Knote;
use crate::sync;

/// The per-source list of knotes that want to hear about it.
///
/// Holds weak references: the owning queue decides knote lifetime, the
/// source only routes news. `notify` snapshots the list before walking it,
/// so the list lock is never held across engine calls and a source may be
/// notified while registrations come and go.
pub struct NoteList {
  knotes: sync::Mutex<Vec<Weak<Knote>>>,
}

impl NoteList {
  pub fn new() -> Self {
    Self { knotes: sync::Mutex::new(Vec::new()) }
  }

  /// Called from a filter's attach, under the registration's discipline.
  pub fn attach(&self, kn: &Arc<Knote>) {
    self.knotes.lock().push(Arc::downgrade(kn));
  }

  /// Called from a filter's detach; exactly once per attached knote.
  pub fn detach(&self, kn: &Knote) {
    let target = kn as *const Knote;
    self
      .knotes
      .lock()
      .retain(|w| w.as_ptr() != target && w.strong_count() != 0);
  }

  /// The live knotes currently on the list.
  pub(crate) fn snapshot(&self) -> Vec<Arc<Knote>> {
    self.knotes.lock().iter().filter_map(Weak::upgrade).collect()
  }

  /// The source has news described by `hint`: walk the list and let each
  /// knote's queue decide activation.
  pub fn notify(&self, hint: Hint) {
    for kn in self.snapshot() {
      if let Some(queue) = kn.queue() {
        queue.activate(&kn, hint);
      }
    }
  }

  pub fn is_empty(&self) -> bool {
    self.knotes.lock().iter().all(|w| w.strong_count() == 0)
  }
}

impl Default for NoteList {
  fn default() -> Self {
    Self::new()
  }
}
