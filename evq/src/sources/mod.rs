//! The event-source providers the engine consumes.
//!
//! The engine core only needs note lists and readiness answers; these
//! modules supply working sources for every built-in filter: a file-handle
//! namespace, a process table, a signal fan-out, a timer worker and the
//! global filesystem hub. One [`Sources`] bundle stands for one "system"
//! and is shared by every queue created on it.

pub mod fdtable;
pub mod fs;
pub mod process;
pub mod signal;
pub mod timer;

use std::sync::Arc;

use fdtable::FdTable;
use fs::FsHub;
use process::ProcTable;
use signal::SignalHub;
use timer::TimerWheel;

/// The bundle of event sources a queue is bound to.
pub struct Sources {
  files: FdTable,
  procs: ProcTable,
  signals: SignalHub,
  timers: TimerWheel,
  fs: Arc<FsHub>,
}

impl Sources {
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      files: FdTable::new(),
      procs: ProcTable::new(),
      signals: SignalHub::new(),
      timers: TimerWheel::new(),
      fs: Arc::new(FsHub::new()),
    })
  }

  pub fn files(&self) -> &FdTable {
    &self.files
  }

  pub fn procs(&self) -> &ProcTable {
    &self.procs
  }

  pub fn signals(&self) -> &SignalHub {
    &self.signals
  }

  pub fn timers(&self) -> &TimerWheel {
    &self.timers
  }

  pub fn fs(&self) -> &Arc<FsHub> {
    &self.fs
  }
}
