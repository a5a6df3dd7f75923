use std::sync::Arc;

use crate::error::Error;
use crate::event::{Hint, Kevent};
use crate::knote::Knote;

/// The plug-in seam between the queue and an event source kind.
///
/// A filter decides whether a knote's source currently meets its condition
/// and manages the knote's membership on the source's note list. The
/// engine calls `attach` once at registration, `detach` exactly once
/// before the knote is freed, and `event` whenever it needs a reading —
/// from the activation path with a source-supplied hint, or from the scan
/// engine with a null hint.
///
/// Filter callbacks may not fail except where the signature says so; they
/// report by returning activity and mutating the knote's canonical
/// descriptor.
pub trait FilterOps: Send + Sync {
  /// Whether `ident` names a handle in the queue's file table. The
  /// registration path resolves it and installs the file hook before
  /// calling `attach`.
  fn fd_ident(&self) -> bool {
    false
  }

  /// Whether the source may activate knotes without the queue-lock
  /// serialization. The engine never requires less serialization than
  /// this promises.
  fn relaxed(&self) -> bool {
    false
  }

  /// Connect the knote to its source. Returns whether the source is
  /// already active; a second opinion is taken with `event(kn, 0)` either
  /// way.
  fn attach(&self, kn: &Arc<Knote>) -> Result<bool, Error>;

  /// Disconnect from the source and release filter-private state.
  fn detach(&self, kn: &Arc<Knote>);

  /// Is the source currently active? `hint` is zero for "re-read your
  /// source", otherwise filter-specific news. Updates the outbound
  /// `data`/`fflags` on the knote to the current reading.
  fn event(&self, kn: &Arc<Knote>, hint: Hint) -> bool;

  /// Fold a modifying descriptor into the saved parameters.
  fn touch(&self, kn: &Arc<Knote>, kev: &Kevent) -> Result<(), Error> {
    let mut st = kn.state();
    st.kev.udata = kev.udata;
    st.saved_fflags = kev.fflags;
    st.saved_data = kev.data;
    Ok(())
  }

  /// The canonical descriptor was just copied out to a client.
  fn delivered(&self, _kn: &Arc<Knote>) {}

  /// A CLEAR delivery reset the outbound fields; drop any private
  /// activity state that backs them.
  fn cleared(&self, _kn: &Arc<Knote>) {}
}
