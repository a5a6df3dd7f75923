use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crate::error::Error;
use crate::event::{
  Hint, Kevent, NOTE_ABSTIME, NOTE_NSECONDS, NOTE_SECONDS,
  NOTE_TIMER_ONESHOT, NOTE_USECONDS,
};
use crate::filter::FilterOps;
use crate::knote::{Hook, Knote};

/// Turns the saved parameters into a first deadline and an optional
/// re-arm period. `data` defaults to milliseconds; NOTE_ABSTIME reads it
/// as a target timestamp since the Unix epoch.
fn decode(fflags: u32, data: i64) -> Result<(Instant, Option<Duration>), Error> {
  if data < 0 {
    return Err(Error::InvalidArgument);
  }
  let magnitude = data as u64;
  let dur = if fflags & NOTE_SECONDS != 0 {
    Duration::from_secs(magnitude)
  } else if fflags & NOTE_USECONDS != 0 {
    Duration::from_micros(magnitude)
  } else if fflags & NOTE_NSECONDS != 0 {
    Duration::from_nanos(magnitude)
  } else {
    Duration::from_millis(magnitude)
  };

  if fflags & NOTE_ABSTIME != 0 {
    let target = SystemTime::UNIX_EPOCH + dur;
    let deadline = match target.duration_since(SystemTime::now()) {
      Ok(ahead) => Instant::now() + ahead,
      // Already past: fire as soon as the wheel looks.
      Err(_) => Instant::now(),
    };
    return Ok((deadline, None));
  }

  if dur.is_zero() {
    return Err(Error::InvalidArgument);
  }
  let deadline = Instant::now() + dur;
  let period =
    if fflags & NOTE_TIMER_ONESHOT != 0 { None } else { Some(dur) };
  Ok((deadline, period))
}

/// Timer expirations, counted since the last retrieval.
///
/// `ident` is an arbitrary client-chosen id; the timing itself lives in
/// the timer wheel. Modifying the registration restarts the timer with
/// the new parameters.
pub(crate) struct TimerOps;

impl FilterOps for TimerOps {
  fn attach(&self, kn: &Arc<Knote>) -> Result<bool, Error> {
    let queue = kn.queue().ok_or(Error::BadIdent)?;
    let (deadline, period) = {
      let st = kn.state();
      decode(st.saved_fflags, st.saved_data)?
    };
    let handle = queue.sources().timers().schedule(kn, deadline, period);
    kn.state().hook = Hook::Timer { handle, fired: 0 };
    Ok(false)
  }

  fn detach(&self, kn: &Arc<Knote>) {
    let mut st = kn.state();
    if let Hook::Timer { handle, .. } = &st.hook {
      handle.cancel();
    }
    st.hook = Hook::None;
  }

  fn event(&self, kn: &Arc<Knote>, hint: Hint) -> bool {
    let mut st = kn.state();
    let Hook::Timer { fired, .. } = &mut st.hook else {
      return false;
    };
    *fired += hint;
    let count = *fired;
    st.kev.data = count as i64;
    count != 0
  }

  fn touch(&self, kn: &Arc<Knote>, kev: &Kevent) -> Result<(), Error> {
    let queue = kn.queue().ok_or(Error::BadIdent)?;
    let (deadline, period) = decode(kev.fflags, kev.data)?;
    let mut st = kn.state();
    if let Hook::Timer { handle, .. } = &st.hook {
      handle.cancel();
    }
    let handle = queue.sources().timers().schedule(kn, deadline, period);
    st.kev.udata = kev.udata;
    st.saved_fflags = kev.fflags;
    st.saved_data = kev.data;
    st.kev.data = 0;
    st.hook = Hook::Timer { handle, fired: 0 };
    Ok(())
  }

  fn delivered(&self, kn: &Arc<Knote>) {
    if let Hook::Timer { fired, .. } = &mut kn.state().hook {
      *fired = 0;
    }
  }
}
