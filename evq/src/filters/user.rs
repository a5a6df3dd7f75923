use std::sync::Arc;

use crate::error::Error;
use crate::event::{
  Hint, Kevent, NOTE_FFAND, NOTE_FFCOPY, NOTE_FFCTRLMASK, NOTE_FFLAGSMASK,
  NOTE_FFOR, NOTE_TRIGGER,
};
use crate::filter::FilterOps;
use crate::knote::{Hook, Knote};

/// Client-triggered events: no source object at all.
///
/// A user knote fires when a change carries NOTE_TRIGGER; the control
/// bits of the change's `fflags` say how the stored fflag bits combine
/// with the inbound ones. The client-visible fflags are masked to
/// NOTE_FFLAGSMASK.
pub(crate) struct UserOps;

/// The stored bits stay masked to NOTE_FFLAGSMASK, so the control bits of
/// the inbound word never leak into them.
fn apply_fflags(stored: u32, inbound: u32) -> u32 {
  match inbound & NOTE_FFCTRLMASK {
    NOTE_FFAND => stored & inbound,
    NOTE_FFOR => stored | (inbound & NOTE_FFLAGSMASK),
    NOTE_FFCOPY => inbound & NOTE_FFLAGSMASK,
    // NOTE_FFNOP
    _ => stored,
  }
}

impl FilterOps for UserOps {
  fn attach(&self, kn: &Arc<Knote>) -> Result<bool, Error> {
    let mut st = kn.state();
    let triggered = st.saved_fflags & NOTE_TRIGGER != 0;
    st.saved_fflags &= NOTE_FFLAGSMASK;
    st.kev.fflags = st.saved_fflags;
    st.kev.data = st.saved_data;
    st.hook = Hook::User { triggered };
    Ok(triggered)
  }

  fn detach(&self, kn: &Arc<Knote>) {
    kn.state().hook = Hook::None;
  }

  fn event(&self, kn: &Arc<Knote>, _hint: Hint) -> bool {
    match kn.state().hook {
      Hook::User { triggered } => triggered,
      _ => false,
    }
  }

  fn touch(&self, kn: &Arc<Knote>, kev: &Kevent) -> Result<(), Error> {
    let mut st = kn.state();
    st.kev.udata = kev.udata;
    st.saved_fflags = apply_fflags(st.saved_fflags, kev.fflags);
    st.saved_data = kev.data;
    st.kev.fflags = st.saved_fflags & NOTE_FFLAGSMASK;
    st.kev.data = st.saved_data;
    if kev.fflags & NOTE_TRIGGER != 0 {
      if let Hook::User { triggered } = &mut st.hook {
        *triggered = true;
      }
    }
    Ok(())
  }

  fn cleared(&self, kn: &Arc<Knote>) {
    if let Hook::User { triggered } = &mut kn.state().hook {
      *triggered = false;
    }
  }
}
