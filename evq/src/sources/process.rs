use std::collections::HashMap;
use std::sync::Arc;

use crate::event::{Hint, NOTE_EXEC, NOTE_EXIT};
use crate::notelist::NoteList;
use crate::sync;

struct ProcState {
  exited: Option<i64>,
}

/// One watched process: its note list plus whatever late watchers need.
pub struct ProcNode {
  pid: u64,
  pub(crate) note: NoteList,
  state: sync::Mutex<ProcState>,
}

impl ProcNode {
  fn new(pid: u64) -> Arc<Self> {
    Arc::new(Self {
      pid,
      note: NoteList::new(),
      state: sync::Mutex::new(ProcState { exited: None }),
    })
  }

  pub fn pid(&self) -> u64 {
    self.pid
  }

  pub(crate) fn exit_status(&self) -> Option<i64> {
    self.state.lock().exited
  }
}

/// The process table: pid-keyed records with fork/exec/exit hooks.
///
/// The table mirrors the lifecycle events of whatever actually runs the
/// processes; it never spawns or reaps anything itself.
pub struct ProcTable {
  procs: sync::Mutex<HashMap<u64, Arc<ProcNode>>>,
}

impl ProcTable {
  pub(crate) fn new() -> Self {
    Self { procs: sync::Mutex::new(HashMap::new()) }
  }

  /// Records a new live process.
  pub fn spawn(&self, pid: u64) -> Arc<ProcNode> {
    let mut procs = self.procs.lock();
    procs.entry(pid).or_insert_with(|| ProcNode::new(pid)).clone()
  }

  pub fn resolve(&self, pid: u64) -> Option<Arc<ProcNode>> {
    self.procs.lock().get(&pid).cloned()
  }

  /// The process called exec.
  pub fn exec(&self, pid: u64) {
    if let Some(node) = self.resolve(pid) {
      node.note.notify(NOTE_EXEC as Hint);
    }
  }

  /// The process exited. Watchers hear about it once; the pid leaves the
  /// table, so later registrations fail to resolve it.
  pub fn exit(&self, pid: u64, status: i64) {
    let Some(node) = self.procs.lock().remove(&pid) else {
      return;
    };
    node.state.lock().exited = Some(status);
    node.note.notify(NOTE_EXIT as Hint);
  }

  /// The process forked. Registers the child and fans tracked
  /// registrations out onto it.
  pub fn fork(&self, parent_pid: u64, child_pid: u64) -> Arc<ProcNode> {
    let child = self.spawn(child_pid);
    if let Some(parent) = self.resolve(parent_pid) {
      crate::filters::handle_fork(&parent, child_pid);
    }
    child
  }
}
