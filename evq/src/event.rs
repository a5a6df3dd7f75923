//! The boundary descriptor and its flag vocabulary.
//!
//! A [`Kevent`] is both the change record a client submits and the event
//! record the queue hands back. The same struct travels in both directions;
//! which fields mean what depends on the filter (see the `filters` module).

/// Identifies a filter kind. Negative values are reserved for built-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Filter(pub i16);

/// Number of built-in filter slots. Compile-time bound of the registry table.
pub const MAX_BUILTIN: usize = 9;

impl Filter {
  /// Readable bytes on a file handle.
  pub const READ: Filter = Filter(-1);
  /// Writable capacity on a file handle.
  pub const WRITE: Filter = Filter(-2);
  /// Exceptional condition (out-of-band data) on a file handle.
  pub const EXCEPT: Filter = Filter(-3);
  /// Mutations of a filesystem object open as a file handle.
  pub const VNODE: Filter = Filter(-4);
  /// Process state changes.
  pub const PROC: Filter = Filter(-5);
  /// Signal deliveries.
  pub const SIGNAL: Filter = Filter(-6);
  /// Timer expirations.
  pub const TIMER: Filter = Filter(-7);
  /// Global filesystem (mount table) changes.
  pub const FS: Filter = Filter(-8);
  /// Client-triggered events.
  pub const USER: Filter = Filter(-9);

  /// Built-in slot index, `-filter - 1`. None for dynamic filters.
  pub(crate) const fn builtin_slot(self) -> Option<usize> {
    if self.0 < 0 {
      let slot = (-(self.0 as i32) - 1) as usize;
      if slot < MAX_BUILTIN { Some(slot) } else { None }
    } else {
      None
    }
  }
}

/// Action and behavior bits of a [`Kevent`].
///
/// This type is used for both:
/// - Submitting changes (what to do with the registration)
/// - Receiving events (what the engine reports back)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
  bits: u16,
}

impl Flags {
  pub const NONE: Self = Self { bits: 0 };

  /// Create a new registration, or modify an existing one.
  pub const ADD: Self = Self { bits: 0x0001 };
  /// Remove the registration.
  pub const DELETE: Self = Self { bits: 0x0002 };
  /// Clear the disabled state.
  pub const ENABLE: Self = Self { bits: 0x0004 };
  /// Suppress delivery while staying registered.
  pub const DISABLE: Self = Self { bits: 0x0008 };
  /// Deliver at most once, then remove.
  pub const ONESHOT: Self = Self { bits: 0x0010 };
  /// Reset transient state after delivery (edge-like).
  pub const CLEAR: Self = Self { bits: 0x0020 };
  /// Emit a synthetic success record for this change.
  pub const RECEIPT: Self = Self { bits: 0x0040 };
  /// Disable after delivery; re-enable to re-arm.
  pub const DISPATCH: Self = Self { bits: 0x0080 };

  /// Source ended with no more data to deliver.
  pub const NODATA: Self = Self { bits: 0x1000 };
  /// `data` holds a numeric error code for the corresponding change.
  pub const ERROR: Self = Self { bits: 0x4000 };
  /// Source reached end-of-stream.
  pub const EOF: Self = Self { bits: 0x8000 };

  /// Bits that persist on the stored registration. The action bits
  /// (ADD/DELETE/ENABLE/DISABLE) and RECEIPT are consumed by registration.
  pub(crate) const SAVED: Self =
    Self { bits: Self::ONESHOT.bits | Self::CLEAR.bits | Self::DISPATCH.bits };

  pub const fn is_none(self) -> bool {
    self.bits == 0
  }

  pub const fn contains(self, other: Self) -> bool {
    (self.bits & other.bits) == other.bits
  }

  pub const fn intersects(self, other: Self) -> bool {
    (self.bits & other.bits) != 0
  }

  /// Combine flags using bitwise OR.
  pub const fn or(self, other: Self) -> Self {
    Self { bits: self.bits | other.bits }
  }

  /// Remove the given bits.
  pub const fn without(self, other: Self) -> Self {
    Self { bits: self.bits & !other.bits }
  }

  pub const fn bits(self) -> u16 {
    self.bits
  }

  pub const fn from_bits(bits: u16) -> Self {
    Self { bits }
  }
}

impl std::ops::BitOr for Flags {
  type Output = Self;

  fn bitor(self, rhs: Self) -> Self::Output {
    self.or(rhs)
  }
}

impl std::ops::BitOrAssign for Flags {
  fn bitor_assign(&mut self, rhs: Self) {
    *self = self.or(rhs);
  }
}

/// Activation hint passed from an event source down to `FilterOps::event`.
///
/// Zero means "no news, re-read your source". Non-zero meaning is
/// filter-specific: NOTE_* bits for vnode/proc/fs, a delivery count for
/// signals, an expiration count for timers.
pub type Hint = u64;

/// The event descriptor exchanged with clients.
///
/// Two descriptors address the same registration iff `(filter, ident)`
/// match on the same queue. `udata` is carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kevent {
  /// Source identity; meaning depends on the filter (file handle, process
  /// id, signal number, timer id, or an arbitrary user value).
  pub ident: u64,
  pub filter: Filter,
  pub flags: Flags,
  /// Filter-specific bits: parameters inbound, observations outbound.
  pub fflags: u32,
  /// Filter-specific payload: parameter inbound (timer period), result
  /// outbound (byte count, exit status, expiration count).
  pub data: i64,
  /// Opaque client correlation value.
  pub udata: u64,
}

impl Kevent {
  pub const fn new(ident: u64, filter: Filter, flags: Flags) -> Self {
    Self { ident, filter, flags, fflags: 0, data: 0, udata: 0 }
  }

  pub const fn fflags(mut self, fflags: u32) -> Self {
    self.fflags = fflags;
    self
  }

  pub const fn data(mut self, data: i64) -> Self {
    self.data = data;
    self
  }

  pub const fn udata(mut self, udata: u64) -> Self {
    self.udata = udata;
    self
  }
}

// Filter-specific fflag bits. Inbound ones select interest, outbound ones
// report what was observed; several are both.

/// READ/WRITE: `data` of the change holds the low-water mark.
pub const NOTE_LOWAT: u32 = 0x0001;
/// EXCEPT: watch for out-of-band data.
pub const NOTE_OOB: u32 = 0x0002;

/// VNODE: the object was unlinked.
pub const NOTE_DELETE: u32 = 0x0001;
/// VNODE: the object's contents changed.
pub const NOTE_WRITE: u32 = 0x0002;
/// VNODE: the object grew.
pub const NOTE_EXTEND: u32 = 0x0004;
/// VNODE: attributes changed.
pub const NOTE_ATTRIB: u32 = 0x0008;
/// VNODE: link count changed.
pub const NOTE_LINK: u32 = 0x0010;
/// VNODE: the object was renamed.
pub const NOTE_RENAME: u32 = 0x0020;
/// VNODE: access to the object was revoked.
pub const NOTE_REVOKE: u32 = 0x0040;

/// PROC: the process exited; exit status in `data`.
pub const NOTE_EXIT: u32 = 0x8000_0000;
/// PROC: the process forked.
pub const NOTE_FORK: u32 = 0x4000_0000;
/// PROC: the process called exec.
pub const NOTE_EXEC: u32 = 0x2000_0000;
/// PROC: follow the process across forks.
pub const NOTE_TRACK: u32 = 0x0000_0001;
/// PROC: a tracked fork could not be followed.
pub const NOTE_TRACKERR: u32 = 0x0000_0002;
/// PROC: this event announces a tracked child; parent pid in `data`.
pub const NOTE_CHILD: u32 = 0x0000_0004;

/// TIMER: `data` is in seconds.
pub const NOTE_SECONDS: u32 = 0x0001;
/// TIMER: `data` is in milliseconds (the default).
pub const NOTE_MSECONDS: u32 = 0x0002;
/// TIMER: `data` is in microseconds.
pub const NOTE_USECONDS: u32 = 0x0004;
/// TIMER: `data` is in nanoseconds.
pub const NOTE_NSECONDS: u32 = 0x0008;
/// TIMER: `data` is an absolute target, not a period.
pub const NOTE_ABSTIME: u32 = 0x0010;
/// TIMER: fire once and stop re-arming (the knote stays registered).
pub const NOTE_TIMER_ONESHOT: u32 = 0x0020;

/// FS: a filesystem was mounted.
pub const NOTE_MOUNT: u32 = 0x0001;
/// FS: a filesystem was unmounted.
pub const NOTE_UNMOUNT: u32 = 0x0002;
/// FS: an unmount is in progress.
pub const NOTE_UNMOUNTING: u32 = 0x0004;

/// USER: activate the knote now.
pub const NOTE_TRIGGER: u32 = 0x0100_0000;
/// USER: ignore the inbound fflag bits.
pub const NOTE_FFNOP: u32 = 0x0000_0000;
/// USER: AND the inbound bits into the stored fflags.
pub const NOTE_FFAND: u32 = 0x4000_0000;
/// USER: OR the inbound bits into the stored fflags.
pub const NOTE_FFOR: u32 = 0x8000_0000;
/// USER: replace the stored fflags with the inbound bits.
pub const NOTE_FFCOPY: u32 = 0xC000_0000;
/// USER: mask selecting the control operation.
pub const NOTE_FFCTRLMASK: u32 = 0xC000_0000;
/// USER: mask selecting the client-visible fflag bits.
pub const NOTE_FFLAGSMASK: u32 = 0x00FF_FFFF;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_bit_ops() {
    let f = Flags::ADD | Flags::CLEAR;
    assert!(f.contains(Flags::ADD));
    assert!(f.contains(Flags::CLEAR));
    assert!(!f.contains(Flags::DELETE));
    assert!(f.intersects(Flags::CLEAR | Flags::DISPATCH));
    assert_eq!(f.without(Flags::ADD), Flags::CLEAR);
    assert!(Flags::NONE.is_none());
  }

  #[test]
  fn saved_flags_keep_behavior_bits_only() {
    let f = Flags::ADD | Flags::ENABLE | Flags::ONESHOT | Flags::DISPATCH;
    let saved = Flags::from_bits(f.bits() & Flags::SAVED.bits());
    assert_eq!(saved, Flags::ONESHOT | Flags::DISPATCH);
  }

  #[test]
  fn builtin_slots() {
    assert_eq!(Filter::READ.builtin_slot(), Some(0));
    assert_eq!(Filter::USER.builtin_slot(), Some(8));
    assert_eq!(Filter(-10).builtin_slot(), None);
    assert_eq!(Filter(7).builtin_slot(), None);
  }
}
