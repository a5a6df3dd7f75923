use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::{
  Hint, NOTE_ATTRIB, NOTE_DELETE, NOTE_EXTEND, NOTE_LINK, NOTE_RENAME,
  NOTE_REVOKE, NOTE_WRITE,
};
use crate::notelist::NoteList;
use crate::sync;

/// One directional readiness reading of a file.
#[derive(Debug, Clone, Copy)]
pub struct FilePoll {
  /// Readable bytes or writable capacity.
  pub data: i64,
  /// The stream has ended.
  pub eof: bool,
}

/// Per-file-kind dispatch for the handle-addressed filters.
///
/// A file kind exposes three note lists (readers, writers, object
/// watchers) and answers readiness polls. The READ/WRITE/EXCEPT/VNODE
/// filters route through this trait, so new kinds plug in without
/// touching the engine.
pub trait FileLike: Send + Sync {
  /// Knotes watching readability; the EXCEPT filter shares this list.
  fn rd_note(&self) -> &NoteList;
  /// Knotes watching writability.
  fn wr_note(&self) -> &NoteList;
  /// Knotes watching mutations of the object itself.
  fn vn_note(&self) -> &NoteList;
  fn poll_read(&self) -> FilePoll;
  fn poll_write(&self) -> FilePoll;
  /// Whether out-of-band data is pending.
  fn poll_except(&self) -> bool;
}

/// The file-handle namespace: `u64` handles resolving to file objects.
///
/// Handles follow the usual rules: `dup` aliases the object under a new
/// handle, `close` drops one handle and deletes the knotes registered
/// under it, leaving other handles' registrations alone.
pub struct FdTable {
  files: sync::Mutex<HashMap<u64, Arc<dyn FileLike>>>,
  next_fd: AtomicU64,
}

impl FdTable {
  pub(crate) fn new() -> Self {
    Self { files: sync::Mutex::new(HashMap::new()), next_fd: AtomicU64::new(3) }
  }

  /// Installs a file under a fresh handle.
  pub fn open(&self, file: Arc<dyn FileLike>) -> u64 {
    let fd = self.next_fd.fetch_add(1, Ordering::AcqRel);
    self.files.lock().insert(fd, file);
    fd
  }

  /// Installs a file under a caller-chosen handle, replacing any previous
  /// occupant.
  pub fn insert(&self, fd: u64, file: Arc<dyn FileLike>) {
    self.files.lock().insert(fd, file);
  }

  pub fn dup(&self, fd: u64) -> Option<u64> {
    let file = self.resolve(fd)?;
    Some(self.open(file))
  }

  pub fn resolve(&self, fd: u64) -> Option<Arc<dyn FileLike>> {
    self.files.lock().get(&fd).cloned()
  }

  /// Closes a handle. Registrations made under this handle are deleted
  /// from their queues; the file object itself lives on while referenced.
  pub fn close(&self, fd: u64) -> bool {
    let Some(file) = self.files.lock().remove(&fd) else {
      return false;
    };
    for list in [file.rd_note(), file.wr_note(), file.vn_note()] {
      for kn in list.snapshot() {
        if kn.ident() == fd {
          if let Some(queue) = kn.queue() {
            let _ = queue.delete_registration(kn.filter(), fd);
          }
        }
      }
    }
    true
  }
}

struct BufferState {
  buffered: i64,
  space: i64,
  oob: bool,
  closed: bool,
}

/// The provided file kind: an in-memory byte stream.
///
/// Producers `push` bytes and consumers `drain` them; draining returns
/// capacity to the write side, `close` ends the stream. The object side
/// reports vnode-style mutations to watchers.
pub struct BufferFile {
  state: sync::Mutex<BufferState>,
  rd: NoteList,
  wr: NoteList,
  vn: NoteList,
}

impl BufferFile {
  pub const DEFAULT_SPACE: i64 = 65536;

  pub fn new() -> Arc<Self> {
    Self::with_space(Self::DEFAULT_SPACE)
  }

  pub fn with_space(space: i64) -> Arc<Self> {
    Arc::new(Self {
      state: sync::Mutex::new(BufferState {
        buffered: 0,
        space,
        oob: false,
        closed: false,
      }),
      rd: NoteList::new(),
      wr: NoteList::new(),
      vn: NoteList::new(),
    })
  }

  /// Producer side: `bytes` more are now buffered.
  pub fn push(&self, bytes: i64) {
    {
      let mut st = self.state.lock();
      st.buffered += bytes;
      st.space = (st.space - bytes).max(0);
    }
    self.rd.notify(0);
  }

  /// Consumer side: take up to `bytes`, returning how many were removed.
  pub fn drain(&self, bytes: i64) -> i64 {
    let taken;
    {
      let mut st = self.state.lock();
      taken = bytes.min(st.buffered);
      st.buffered -= taken;
      st.space += taken;
    }
    if taken > 0 {
      self.wr.notify(0);
    }
    taken
  }

  /// Out-of-band data arrived.
  pub fn set_oob(&self) {
    self.state.lock().oob = true;
    self.rd.notify(0);
  }

  pub fn clear_oob(&self) {
    self.state.lock().oob = false;
  }

  /// Ends the stream: readers see EOF, writers lose their sink.
  pub fn close(&self) {
    self.state.lock().closed = true;
    self.rd.notify(0);
    self.wr.notify(0);
  }

  fn vnode_event(&self, bits: u32) {
    self.vn.notify(bits as Hint);
  }

  /// The object was unlinked.
  pub fn removed(&self) {
    self.vnode_event(NOTE_DELETE);
  }

  /// The object's contents changed.
  pub fn wrote(&self) {
    self.vnode_event(NOTE_WRITE);
  }

  /// The object grew.
  pub fn extended(&self) {
    self.vnode_event(NOTE_EXTEND | NOTE_WRITE);
  }

  /// Attributes changed.
  pub fn attrib_changed(&self) {
    self.vnode_event(NOTE_ATTRIB);
  }

  /// Link count changed.
  pub fn link_changed(&self) {
    self.vnode_event(NOTE_LINK);
  }

  /// The object was renamed.
  pub fn renamed(&self) {
    self.vnode_event(NOTE_RENAME);
  }

  /// Access to the object was revoked: the stream ends and object
  /// watchers are cut loose.
  pub fn revoked(&self) {
    self.state.lock().closed = true;
    self.vnode_event(NOTE_REVOKE);
    self.rd.notify(0);
    self.wr.notify(0);
  }
}

impl FileLike for BufferFile {
  fn rd_note(&self) -> &NoteList {
    &self.rd
  }

  fn wr_note(&self) -> &NoteList {
    &self.wr
  }

  fn vn_note(&self) -> &NoteList {
    &self.vn
  }

  fn poll_read(&self) -> FilePoll {
    let st = self.state.lock();
    FilePoll { data: st.buffered, eof: st.closed }
  }

  fn poll_write(&self) -> FilePoll {
    let st = self.state.lock();
    FilePoll { data: st.space, eof: st.closed }
  }

  fn poll_except(&self) -> bool {
    self.state.lock().oob
  }
}
