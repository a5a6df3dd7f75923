use std::sync::Arc;

use crate::error::Error;
use crate::event::Hint;
use crate::filter::FilterOps;
use crate::knote::{Hook, Knote};

/// Global filesystem (mount table) changes. `ident` is unused.
pub(crate) struct FsOps;

impl FilterOps for FsOps {
  fn attach(&self, kn: &Arc<Knote>) -> Result<bool, Error> {
    let queue = kn.queue().ok_or(Error::BadIdent)?;
    let hub = queue.sources().fs().clone();
    hub.note.attach(kn);
    kn.state().hook = Hook::Fs(hub);
    Ok(false)
  }

  fn detach(&self, kn: &Arc<Knote>) {
    let mut st = kn.state();
    if let Hook::Fs(hub) = &st.hook {
      hub.note.detach(kn);
    }
    st.hook = Hook::None;
  }

  fn event(&self, kn: &Arc<Knote>, hint: Hint) -> bool {
    let mut st = kn.state();
    st.kev.fflags |= (hint as u32) & st.saved_fflags;
    st.kev.fflags != 0
  }
}
