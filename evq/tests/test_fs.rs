use std::time::Duration;

use evq::{
  BufferFile, Filter, Flags, Kevent, Queue, Sources,
  event::{NOTE_MOUNT, NOTE_OOB, NOTE_UNMOUNT, NOTE_UNMOUNTING},
};

const POLL: Option<Duration> = Some(Duration::ZERO);

fn out_buf() -> [Kevent; 8] {
  [Kevent::new(0, Filter::FS, Flags::NONE); 8]
}

#[test]
fn test_mount_table_changes() {
  let sources = Sources::new();
  let queue = Queue::new(sources.clone());
  let mut out = out_buf();

  let mut add = Kevent::new(0, Filter::FS, Flags::ADD | Flags::CLEAR);
  add.fflags = NOTE_MOUNT | NOTE_UNMOUNT;
  queue.kevent(&[add], &mut out, POLL).unwrap();

  sources.fs().mounted();
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].filter, Filter::FS);
  assert_eq!(out[0].fflags, NOTE_MOUNT);

  // Not subscribed to in-progress unmounts.
  sources.fs().unmounting();
  assert_eq!(queue.kevent(&[], &mut out, POLL).unwrap(), 0);

  sources.fs().unmounted();
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].fflags, NOTE_UNMOUNT);
}

#[test]
fn test_unmounting_interest() {
  let sources = Sources::new();
  let queue = Queue::new(sources.clone());
  let mut out = out_buf();

  let mut add = Kevent::new(0, Filter::FS, Flags::ADD | Flags::CLEAR);
  add.fflags = NOTE_UNMOUNTING;
  queue.kevent(&[add], &mut out, POLL).unwrap();

  sources.fs().unmounting();
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].fflags, NOTE_UNMOUNTING);
}

#[test]
fn test_out_of_band_data() {
  let sources = Sources::new();
  let file = BufferFile::new();
  let fd = sources.files().open(file.clone());

  let queue = Queue::new(sources);
  let mut out = out_buf();

  let mut add = Kevent::new(fd, Filter::EXCEPT, Flags::ADD);
  add.fflags = NOTE_OOB;
  queue.kevent(&[add], &mut out, POLL).unwrap();
  assert_eq!(queue.kevent(&[], &mut out, POLL).unwrap(), 0);

  file.set_oob();
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].filter, Filter::EXCEPT);
  assert_ne!(out[0].fflags & NOTE_OOB, 0);

  // Consuming the urgent data quiets the filter.
  file.clear_oob();
  assert_eq!(queue.kevent(&[], &mut out, POLL).unwrap(), 0);
}

#[test]
fn test_except_without_interest_stays_quiet() {
  let sources = Sources::new();
  let file = BufferFile::new();
  let fd = sources.files().open(file.clone());

  let queue = Queue::new(sources);
  let mut out = out_buf();

  let add = Kevent::new(fd, Filter::EXCEPT, Flags::ADD);
  queue.kevent(&[add], &mut out, POLL).unwrap();

  file.set_oob();
  assert_eq!(queue.kevent(&[], &mut out, POLL).unwrap(), 0);
}
