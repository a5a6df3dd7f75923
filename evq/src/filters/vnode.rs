use std::sync::Arc;

use crate::error::Error;
use crate::event::{Flags, Hint, NOTE_REVOKE};
use crate::filter::FilterOps;
use crate::knote::{Hook, Knote, status};

/// Mutations of a filesystem object held open as a file handle.
///
/// The change's `fflags` selects the interesting mutations; deliveries
/// echo the observed subset back. A revoked object ends the stream: the
/// knote goes end-of-file and stops hearing from the object.
pub(crate) struct VnodeOps;

impl FilterOps for VnodeOps {
  fn fd_ident(&self) -> bool {
    true
  }

  fn attach(&self, kn: &Arc<Knote>) -> Result<bool, Error> {
    let st = kn.state();
    let Hook::File(file) = &st.hook else {
      return Err(Error::BadIdent);
    };
    file.vn_note().attach(kn);
    Ok(false)
  }

  fn detach(&self, kn: &Arc<Knote>) {
    let mut st = kn.state();
    if let Hook::File(file) = &st.hook {
      file.vn_note().detach(kn);
    }
    st.hook = Hook::None;
  }

  fn event(&self, kn: &Arc<Knote>, hint: Hint) -> bool {
    let mut st = kn.state();
    let bits = hint as u32;
    if bits & NOTE_REVOKE != 0 {
      if let Hook::File(file) = &st.hook {
        file.vn_note().detach(kn);
      }
      st.kev.fflags |= NOTE_REVOKE;
      st.kev.flags |= Flags::EOF;
      kn.set_status(status::DETACHED);
      return true;
    }
    st.kev.fflags |= bits & st.saved_fflags;
    st.kev.fflags != 0
  }
}
