//! The built-in filter backends.
//!
//! One file per source kind, the registry wires them up at first use. A
//! filter owns three things: membership on its source's note list
//! (attach/detach), the activity decision (event), and whatever saved
//! state the decision needs.

mod fs;
mod process;
mod rdwr;
mod signal;
mod timer;
mod user;
mod vnode;

use std::sync::Arc;

use crate::event::Filter;
use crate::filter::FilterOps;

pub(crate) use process::handle_fork;

/// The table the registry installs at initialization.
pub(crate) fn builtin() -> Vec<(Filter, Arc<dyn FilterOps>)> {
  vec![
    (Filter::READ, Arc::new(rdwr::ReadOps) as Arc<dyn FilterOps>),
    (Filter::WRITE, Arc::new(rdwr::WriteOps) as Arc<dyn FilterOps>),
    (Filter::EXCEPT, Arc::new(rdwr::ExceptOps) as Arc<dyn FilterOps>),
    (Filter::VNODE, Arc::new(vnode::VnodeOps) as Arc<dyn FilterOps>),
    (Filter::PROC, Arc::new(process::ProcOps) as Arc<dyn FilterOps>),
    (Filter::SIGNAL, Arc::new(signal::SignalOps) as Arc<dyn FilterOps>),
    (Filter::TIMER, Arc::new(timer::TimerOps) as Arc<dyn FilterOps>),
    (Filter::FS, Arc::new(fs::FsOps) as Arc<dyn FilterOps>),
    (Filter::USER, Arc::new(user::UserOps) as Arc<dyn FilterOps>),
  ]
}
