use std::sync::Arc;

use crate::error::Error;
use crate::event::{
  Filter, Flags, Hint, Kevent, NOTE_CHILD, NOTE_EXEC, NOTE_EXIT, NOTE_FORK,
  NOTE_TRACK, NOTE_TRACKERR,
};
use crate::filter::FilterOps;
use crate::knote::{Hook, Knote, status};
use crate::sources::process::ProcNode;

/// Process state changes: exit, fork, exec, and fork tracking.
///
/// Exit is terminal: the delivery carries EOF|NODATA and the exit status,
/// and the knote stops hearing from the process table. The registration
/// itself stays until the client deletes or one-shots it.
pub(crate) struct ProcOps;

impl FilterOps for ProcOps {
  fn attach(&self, kn: &Arc<Knote>) -> Result<bool, Error> {
    let queue = kn.queue().ok_or(Error::BadIdent)?;
    let node = queue
      .sources()
      .procs()
      .resolve(kn.ident())
      .ok_or(Error::BadIdent)?;
    node.note.attach(kn);
    kn.state().hook = Hook::Proc(node);
    Ok(false)
  }

  fn detach(&self, kn: &Arc<Knote>) {
    let mut st = kn.state();
    if let Hook::Proc(node) = &st.hook {
      node.note.detach(kn);
    }
    st.hook = Hook::None;
  }

  fn event(&self, kn: &Arc<Knote>, hint: Hint) -> bool {
    let mut st = kn.state();
    let bits = hint as u32;
    let interest = st.saved_fflags;

    // Child announcements and tracking failures bypass the interest mask.
    if bits & NOTE_CHILD != 0 {
      st.kev.fflags |= NOTE_CHILD;
      return true;
    }
    if bits & NOTE_TRACKERR != 0 {
      st.kev.fflags |= NOTE_TRACKERR;
      return true;
    }

    let exited = match &st.hook {
      Hook::Proc(node) => node.exit_status(),
      _ => None,
    };
    // The hint normally reports the exit, but a process that died
    // between resolution and the first evaluation is caught here too.
    if bits & NOTE_EXIT != 0 || exited.is_some() {
      if interest & NOTE_EXIT != 0 {
        st.kev.fflags |= NOTE_EXIT;
      }
      st.kev.data = exited.unwrap_or(0);
      st.kev.flags |= Flags::EOF | Flags::NODATA;
      if let Hook::Proc(node) = &st.hook {
        node.note.detach(kn);
      }
      kn.set_status(status::DETACHED);
      return true;
    }

    let mut active = false;
    if bits & NOTE_FORK != 0 && interest & NOTE_FORK != 0 {
      st.kev.fflags |= NOTE_FORK;
      active = true;
    }
    if bits & NOTE_EXEC != 0 && interest & NOTE_EXEC != 0 {
      st.kev.fflags |= NOTE_EXEC;
      active = true;
    }
    if bits == 0 {
      // Null-hint re-evaluation: anything already observed keeps firing.
      return st.kev.fflags != 0;
    }
    active
  }
}

/// Fans a fork out over the parent's watchers: tracked registrations are
/// cloned onto the child and the child announcement delivered; plain
/// NOTE_FORK interest hears about the fork with the child pid in `data`.
pub(crate) fn handle_fork(parent: &ProcNode, child_pid: u64) {
  for kn in parent.note.snapshot() {
    let (track, fork_interest, flags, fflags, udata) = {
      let st = kn.state();
      (
        st.saved_fflags & NOTE_TRACK != 0,
        st.saved_fflags & NOTE_FORK != 0,
        st.kev.flags,
        st.saved_fflags,
        st.kev.udata,
      )
    };
    let Some(queue) = kn.queue() else {
      continue;
    };

    if track {
      let kev = Kevent {
        ident: child_pid,
        filter: Filter::PROC,
        flags: flags | Flags::ADD,
        fflags,
        data: 0,
        udata,
      };
      match queue.register(&kev) {
        Ok(()) => {
          if let Some(child_kn) =
            queue.lookup_knote(Filter::PROC, child_pid)
          {
            child_kn.state().kev.data = kn.ident() as i64;
            queue.activate(&child_kn, NOTE_CHILD as Hint);
          }
        }
        Err(_) => {
          queue.activate(&kn, NOTE_TRACKERR as Hint);
        }
      }
    }

    if fork_interest {
      kn.state().kev.data = child_pid as i64;
      queue.activate(&kn, NOTE_FORK as Hint);
    }
  }
}
