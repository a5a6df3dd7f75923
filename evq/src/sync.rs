//! Locking primitives with poisoning stripped.
//!
//! Queue and knote guards are routinely held across filter callbacks; a
//! panic in one holder must not make the lock unusable for everyone
//! else. With the `parking_lot` feature the crate uses that crate's
//! types directly (they never poison); otherwise thin shims over
//! `std::sync` recover the guard from a poison error and carry on.

#[cfg(feature = "parking_lot")]
pub use parking_lot::{Mutex, MutexGuard};

#[cfg(feature = "parking_lot")]
pub use self::pl::Condvar;

#[cfg(not(feature = "parking_lot"))]
pub use self::fallback::{Condvar, Mutex, MutexGuard};

#[cfg(feature = "parking_lot")]
mod pl {
  use std::time::Duration;

  use super::MutexGuard;

  /// A condition variable with the `std`-shaped consume-and-return API.
  pub struct Condvar {
    inner: parking_lot::Condvar,
  }

  impl Condvar {
    pub const fn new() -> Self {
      Self { inner: parking_lot::Condvar::new() }
    }

    pub fn wait<'a, T>(&self, mut guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
      self.inner.wait(&mut guard);
      guard
    }

    /// Returns the guard and whether the wait timed out.
    pub fn wait_timeout<'a, T>(
      &self,
      mut guard: MutexGuard<'a, T>,
      timeout: Duration,
    ) -> (MutexGuard<'a, T>, bool) {
      let result = self.inner.wait_for(&mut guard, timeout);
      (guard, result.timed_out())
    }

    pub fn notify_one(&self) {
      self.inner.notify_one();
    }

    pub fn notify_all(&self) {
      self.inner.notify_all();
    }
  }
}

#[cfg(not(feature = "parking_lot"))]
mod fallback {
  use std::ops::{Deref, DerefMut};
  use std::sync;
  use std::time::Duration;

  /// `std::sync::Mutex` minus poisoning: a panic in another holder
  /// leaves the lock usable and the data in whatever state it was.
  pub struct Mutex<T: ?Sized>(sync::Mutex<T>);

  /// Guard returned by [`Mutex::lock`]; unlocks on drop.
  pub struct MutexGuard<'a, T: ?Sized>(sync::MutexGuard<'a, T>);

  impl<T> Mutex<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
      Mutex(sync::Mutex::new(value))
    }
  }

  impl<T: ?Sized> Mutex<T> {
    /// Blocks until the lock is held. Never fails: a poisoned lock is
    /// taken over as-is.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
      match self.0.lock() {
        Ok(guard) => MutexGuard(guard),
        Err(poisoned) => MutexGuard(poisoned.into_inner()),
      }
    }

    /// Takes the lock only if it is free right now.
    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
      match self.0.try_lock() {
        Ok(guard) => Some(MutexGuard(guard)),
        Err(sync::TryLockError::Poisoned(poisoned)) => {
          Some(MutexGuard(poisoned.into_inner()))
        }
        Err(sync::TryLockError::WouldBlock) => None,
      }
    }
  }

  impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
      &self.0
    }
  }

  impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
      &mut self.0
    }
  }

  /// Condition variable paired with [`Mutex`]; waits shed poisoning the
  /// same way the lock does.
  pub struct Condvar(sync::Condvar);

  impl Condvar {
    pub const fn new() -> Self {
      Condvar(sync::Condvar::new())
    }

    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
      match self.0.wait(guard.0) {
        Ok(inner) => MutexGuard(inner),
        Err(poisoned) => MutexGuard(poisoned.into_inner()),
      }
    }

    /// Returns the guard and whether the wait timed out.
    pub fn wait_timeout<'a, T>(
      &self,
      guard: MutexGuard<'a, T>,
      timeout: Duration,
    ) -> (MutexGuard<'a, T>, bool) {
      let (inner, result) = match self.0.wait_timeout(guard.0, timeout) {
        Ok(pair) => pair,
        Err(poisoned) => poisoned.into_inner(),
      };
      (MutexGuard(inner), result.timed_out())
    }

    pub fn notify_one(&self) {
      self.0.notify_one();
    }

    pub fn notify_all(&self) {
      self.0.notify_all();
    }
  }
}
