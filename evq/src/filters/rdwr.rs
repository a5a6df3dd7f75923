use std::sync::Arc;

use crate::error::Error;
use crate::event::{Flags, Hint, NOTE_LOWAT, NOTE_OOB};
use crate::filter::FilterOps;
use crate::knote::{Hook, Knote};

/// Readable-bytes readiness on a file handle.
///
/// `data` reports the buffered byte count; EOF rides along when the
/// stream has closed, with NODATA once nothing is left to read. The
/// change's `data` sets a low-water mark when NOTE_LOWAT is given.
pub(crate) struct ReadOps;

impl FilterOps for ReadOps {
  fn fd_ident(&self) -> bool {
    true
  }

  fn attach(&self, kn: &Arc<Knote>) -> Result<bool, Error> {
    let st = kn.state();
    let Hook::File(file) = &st.hook else {
      return Err(Error::BadIdent);
    };
    file.rd_note().attach(kn);
    Ok(false)
  }

  fn detach(&self, kn: &Arc<Knote>) {
    let mut st = kn.state();
    if let Hook::File(file) = &st.hook {
      file.rd_note().detach(kn);
    }
    st.hook = Hook::None;
  }

  fn event(&self, kn: &Arc<Knote>, _hint: Hint) -> bool {
    let mut st = kn.state();
    let poll = match &st.hook {
      Hook::File(file) => file.poll_read(),
      _ => return false,
    };
    st.kev.data = poll.data;
    if poll.eof {
      st.kev.flags |= Flags::EOF;
      if poll.data == 0 {
        st.kev.flags |= Flags::NODATA;
      }
      return true;
    }
    let lowat = if st.saved_fflags & NOTE_LOWAT != 0 {
      st.saved_data.max(1)
    } else {
      1
    };
    poll.data >= lowat
  }
}

/// Writable-capacity readiness on a file handle.
pub(crate) struct WriteOps;

impl FilterOps for WriteOps {
  fn fd_ident(&self) -> bool {
    true
  }

  fn attach(&self, kn: &Arc<Knote>) -> Result<bool, Error> {
    let st = kn.state();
    let Hook::File(file) = &st.hook else {
      return Err(Error::BadIdent);
    };
    file.wr_note().attach(kn);
    Ok(false)
  }

  fn detach(&self, kn: &Arc<Knote>) {
    let mut st = kn.state();
    if let Hook::File(file) = &st.hook {
      file.wr_note().detach(kn);
    }
    st.hook = Hook::None;
  }

  fn event(&self, kn: &Arc<Knote>, _hint: Hint) -> bool {
    let mut st = kn.state();
    let poll = match &st.hook {
      Hook::File(file) => file.poll_write(),
      _ => return false,
    };
    st.kev.data = poll.data;
    if poll.eof {
      st.kev.flags |= Flags::EOF;
      return true;
    }
    let lowat = if st.saved_fflags & NOTE_LOWAT != 0 {
      st.saved_data.max(1)
    } else {
      1
    };
    poll.data >= lowat
  }
}

/// Exceptional conditions (out-of-band data) on a file handle.
///
/// Fires only when the change asked for NOTE_OOB.
pub(crate) struct ExceptOps;

impl FilterOps for ExceptOps {
  fn fd_ident(&self) -> bool {
    true
  }

  fn attach(&self, kn: &Arc<Knote>) -> Result<bool, Error> {
    let st = kn.state();
    let Hook::File(file) = &st.hook else {
      return Err(Error::BadIdent);
    };
    file.rd_note().attach(kn);
    Ok(false)
  }

  fn detach(&self, kn: &Arc<Knote>) {
    let mut st = kn.state();
    if let Hook::File(file) = &st.hook {
      file.rd_note().detach(kn);
    }
    st.hook = Hook::None;
  }

  fn event(&self, kn: &Arc<Knote>, _hint: Hint) -> bool {
    let mut st = kn.state();
    let oob = match &st.hook {
      Hook::File(file) => file.poll_except(),
      _ => return false,
    };
    if oob && st.saved_fflags & NOTE_OOB != 0 {
      st.kev.fflags |= NOTE_OOB;
      return true;
    }
    false
  }
}
