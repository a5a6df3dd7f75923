use std::collections::HashMap;
use std::sync::Arc;

use crate::notelist::NoteList;
use crate::sync;

/// Upper bound (exclusive) on signal numbers the SIGNAL filter accepts.
pub const MAX_SIGNAL: u64 = 128;

/// Watchers of one signal number.
pub struct SigNode {
  signo: u64,
  pub(crate) note: NoteList,
}

impl SigNode {
  pub fn signo(&self) -> u64 {
    self.signo
  }
}

/// Per-signal delivery fan-out.
///
/// This counts deliveries for interested knotes; it does not intercept
/// anything — whoever owns actual signal handling calls [`SignalHub::post`].
pub struct SignalHub {
  slots: sync::Mutex<HashMap<u64, Arc<SigNode>>>,
}

impl SignalHub {
  pub(crate) fn new() -> Self {
    Self { slots: sync::Mutex::new(HashMap::new()) }
  }

  pub(crate) fn node(&self, signo: u64) -> Arc<SigNode> {
    let mut slots = self.slots.lock();
    slots
      .entry(signo)
      .or_insert_with(|| Arc::new(SigNode { signo, note: NoteList::new() }))
      .clone()
  }

  /// One delivery of `signo`.
  pub fn post(&self, signo: u64) {
    let node = self.slots.lock().get(&signo).cloned();
    if let Some(node) = node {
      node.note.notify(1);
    }
  }
}
