use std::sync::Arc;

use crate::error::Error;
use crate::event::Hint;
use crate::filter::FilterOps;
use crate::knote::{Hook, Knote};
use crate::sources::signal::MAX_SIGNAL;

/// Signal deliveries, counted since the last retrieval.
///
/// `ident` is the signal number. The filter observes deliveries through
/// the signal hub; it never intercepts the signal itself.
pub(crate) struct SignalOps;

impl FilterOps for SignalOps {
  fn attach(&self, kn: &Arc<Knote>) -> Result<bool, Error> {
    if kn.ident() == 0 || kn.ident() >= MAX_SIGNAL {
      return Err(Error::InvalidArgument);
    }
    let queue = kn.queue().ok_or(Error::BadIdent)?;
    let node = queue.sources().signals().node(kn.ident());
    node.note.attach(kn);
    kn.state().hook = Hook::Signal { node, seen: 0 };
    Ok(false)
  }

  fn detach(&self, kn: &Arc<Knote>) {
    let mut st = kn.state();
    if let Hook::Signal { node, .. } = &st.hook {
      node.note.detach(kn);
    }
    st.hook = Hook::None;
  }

  fn event(&self, kn: &Arc<Knote>, hint: Hint) -> bool {
    let mut st = kn.state();
    let Hook::Signal { seen, .. } = &mut st.hook else {
      return false;
    };
    *seen += hint;
    let count = *seen;
    st.kev.data = count as i64;
    count != 0
  }

  fn delivered(&self, kn: &Arc<Knote>) {
    if let Hook::Signal { seen, .. } = &mut kn.state().hook {
      *seen = 0;
    }
  }
}
