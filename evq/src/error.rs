use std::fmt;

/// Failures surfaced by queue operations.
///
/// Per-change failures travel inline as synthetic `ERROR` records whose
/// `data` holds [`Error::code`]; only whole-call failures are returned as
/// `Err` from [`crate::Queue::kevent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
  /// The filter id resolves to nothing.
  NoSuchFilter,
  /// `ident` does not name a live source (handle not open, process gone).
  BadIdent,
  /// The filter declined to attach to the source.
  FilterRefused,
  /// Delete or modify addressed a registration that does not exist.
  NoSuchRegistration,
  /// Allocation failed.
  OutOfMemory,
  /// Malformed descriptor or parameter.
  InvalidArgument,
  /// The waiting thread was interrupted. Normal early return for a scan.
  Interrupted,
  /// The deadline passed. Normal early return for a scan.
  TimedOut,
}

impl Error {
  /// The errno-style code carried in the `data` field of an `ERROR` record.
  pub const fn code(self) -> i64 {
    let errno = match self {
      Self::NoSuchFilter => libc::EINVAL,
      Self::BadIdent => libc::EBADF,
      Self::FilterRefused => libc::EOPNOTSUPP,
      Self::NoSuchRegistration => libc::ENOENT,
      Self::OutOfMemory => libc::ENOMEM,
      Self::InvalidArgument => libc::EINVAL,
      Self::Interrupted => libc::EINTR,
      Self::TimedOut => libc::ETIMEDOUT,
    };
    errno as i64
  }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let msg = match self {
      Self::NoSuchFilter => "no such filter",
      Self::BadIdent => "ident does not name a live source",
      Self::FilterRefused => "filter refused to attach",
      Self::NoSuchRegistration => "no such registration",
      Self::OutOfMemory => "out of memory",
      Self::InvalidArgument => "invalid argument",
      Self::Interrupted => "interrupted",
      Self::TimedOut => "timed out",
    };
    f.write_str(msg)
  }
}
