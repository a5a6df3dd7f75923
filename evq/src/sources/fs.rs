use crate::event::{Hint, NOTE_MOUNT, NOTE_UNMOUNT, NOTE_UNMOUNTING};
use crate::notelist::NoteList;

/// The global filesystem note list: mount-table changes, not per-object.
pub struct FsHub {
  pub(crate) note: NoteList,
}

impl FsHub {
  pub(crate) fn new() -> Self {
    Self { note: NoteList::new() }
  }

  /// A filesystem was mounted.
  pub fn mounted(&self) {
    self.note.notify(NOTE_MOUNT as Hint);
  }

  /// A filesystem was unmounted.
  pub fn unmounted(&self) {
    self.note.notify(NOTE_UNMOUNT as Hint);
  }

  /// An unmount is in progress.
  pub fn unmounting(&self) {
    self.note.notify(NOTE_UNMOUNTING as Hint);
  }
}
