//! The process-wide filter table.
//!
//! Built-in filters live in a fixed slot array indexed `-filter - 1`;
//! dynamic filters share the same contract through a secondary map. A
//! filter cannot be deregistered while any knote still uses it.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::Error;
use crate::event::{Filter, MAX_BUILTIN};
use crate::filter::FilterOps;
use crate::sync;

struct Slot {
  ops: Arc<dyn FilterOps>,
  /// Live knotes currently using this filter.
  live: usize,
}

#[derive(Default)]
struct Inner {
  builtin: [Option<Slot>; MAX_BUILTIN],
  dynamic: HashMap<i16, Slot>,
}

impl Inner {
  fn slot(&self, filter: Filter) -> Option<&Slot> {
    match filter.builtin_slot() {
      Some(i) => self.builtin[i].as_ref(),
      None => self.dynamic.get(&filter.0),
    }
  }

  fn slot_mut(&mut self, filter: Filter) -> Option<&mut Slot> {
    match filter.builtin_slot() {
      Some(i) => self.builtin[i].as_mut(),
      None => self.dynamic.get_mut(&filter.0),
    }
  }
}

struct Registry {
  inner: sync::Mutex<Inner>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn global() -> &'static Registry {
  REGISTRY.get_or_init(|| {
    let mut inner = Inner::default();
    for (filter, ops) in crate::filters::builtin() {
      let slot = filter.builtin_slot().expect("built-in filter id");
      inner.builtin[slot] = Some(Slot { ops, live: 0 });
    }
    Registry { inner: sync::Mutex::new(inner) }
  })
}

/// Resolves a filter id to its operations table.
pub fn lookup(filter: Filter) -> Result<Arc<dyn FilterOps>, Error> {
  let inner = global().inner.lock();
  inner.slot(filter).map(|s| s.ops.clone()).ok_or(Error::NoSuchFilter)
}

/// Resolves and marks the filter in-use; pair with [`release`].
pub(crate) fn checkout(filter: Filter) -> Result<Arc<dyn FilterOps>, Error> {
  let mut inner = global().inner.lock();
  let slot = inner.slot_mut(filter).ok_or(Error::NoSuchFilter)?;
  slot.live += 1;
  Ok(slot.ops.clone())
}

pub(crate) fn release(filter: Filter) {
  let mut inner = global().inner.lock();
  if let Some(slot) = inner.slot_mut(filter) {
    debug_assert!(slot.live > 0, "release without checkout");
    slot.live = slot.live.saturating_sub(1);
  }
}

/// Installs a filter. The id must be vacant; built-in ids may be re-used
/// only after a successful [`deregister`].
pub fn register(filter: Filter, ops: Arc<dyn FilterOps>) -> Result<(), Error> {
  let mut inner = global().inner.lock();
  match filter.builtin_slot() {
    Some(i) => {
      if inner.builtin[i].is_some() {
        return Err(Error::InvalidArgument);
      }
      inner.builtin[i] = Some(Slot { ops, live: 0 });
    }
    None => {
      if inner.dynamic.contains_key(&filter.0) {
        return Err(Error::InvalidArgument);
      }
      inner.dynamic.insert(filter.0, Slot { ops, live: 0 });
    }
  }
  Ok(())
}

/// Removes a filter. Refused while any knote still uses it.
pub fn deregister(filter: Filter) -> Result<(), Error> {
  let mut inner = global().inner.lock();
  let live = inner.slot(filter).ok_or(Error::NoSuchFilter)?.live;
  if live != 0 {
    return Err(Error::InvalidArgument);
  }
  match filter.builtin_slot() {
    Some(i) => inner.builtin[i] = None,
    None => {
      inner.dynamic.remove(&filter.0);
    }
  }
  Ok(())
}
