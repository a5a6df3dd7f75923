use std::time::Duration;

use evq::{
  BufferFile, Error, Filter, Flags, Kevent, Queue, Sources,
  event::{
    NOTE_ATTRIB, NOTE_DELETE, NOTE_EXTEND, NOTE_RENAME, NOTE_REVOKE,
    NOTE_WRITE,
  },
};

const POLL: Option<Duration> = Some(Duration::ZERO);

fn out_buf() -> [Kevent; 8] {
  [Kevent::new(0, Filter::VNODE, Flags::NONE); 8]
}

fn vnode_add(fd: u64, fflags: u32) -> Kevent {
  let mut kev = Kevent::new(fd, Filter::VNODE, Flags::ADD | Flags::CLEAR);
  kev.fflags = fflags;
  kev
}

#[test]
fn test_only_interesting_changes_fire() {
  let sources = Sources::new();
  let file = BufferFile::new();
  sources.files().insert(5, file.clone());

  let queue = Queue::new(sources);
  let mut out = out_buf();

  queue
    .kevent(&[vnode_add(5, NOTE_DELETE | NOTE_RENAME)], &mut out, POLL)
    .unwrap();

  file.wrote();
  file.attrib_changed();
  assert_eq!(queue.kevent(&[], &mut out, POLL).unwrap(), 0);

  file.renamed();
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].fflags, NOTE_RENAME);
}

#[test]
fn test_observed_changes_accumulate_until_read() {
  let sources = Sources::new();
  let file = BufferFile::new();
  sources.files().insert(6, file.clone());

  let queue = Queue::new(sources);
  let mut out = out_buf();

  queue
    .kevent(
      &[vnode_add(6, NOTE_DELETE | NOTE_RENAME | NOTE_WRITE)],
      &mut out,
      POLL,
    )
    .unwrap();

  file.removed();
  file.renamed();
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].fflags, NOTE_DELETE | NOTE_RENAME);

  // CLEAR wiped the echo; a fresh write reports alone.
  file.wrote();
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].fflags, NOTE_WRITE);
}

#[test]
fn test_extend_implies_write() {
  let sources = Sources::new();
  let file = BufferFile::new();
  sources.files().insert(7, file.clone());

  let queue = Queue::new(sources);
  let mut out = out_buf();

  queue
    .kevent(&[vnode_add(7, NOTE_EXTEND | NOTE_WRITE)], &mut out, POLL)
    .unwrap();

  file.extended();
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].fflags, NOTE_EXTEND | NOTE_WRITE);
}

#[test]
fn test_revoke_ends_the_watch() {
  let sources = Sources::new();
  let file = BufferFile::new();
  sources.files().insert(8, file.clone());

  let queue = Queue::new(sources);
  let mut out = out_buf();

  // Not even interested in revoke: it is delivered regardless.
  queue.kevent(&[vnode_add(8, NOTE_ATTRIB)], &mut out, POLL).unwrap();

  file.revoked();
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_ne!(out[0].fflags & NOTE_REVOKE, 0);
  assert!(out[0].flags.contains(Flags::EOF));

  // The object is gone for this knote: changes no longer reach it and
  // only DELETE is accepted.
  file.attrib_changed();
  let n = queue
    .kevent(&[Kevent::new(8, Filter::VNODE, Flags::ENABLE)], &mut out, POLL)
    .unwrap();
  assert!(n >= 1);
  assert!(out[0].flags.contains(Flags::ERROR));
  assert_eq!(out[0].data, Error::BadIdent.code());

  queue
    .kevent(&[Kevent::new(8, Filter::VNODE, Flags::DELETE)], &mut [], POLL)
    .unwrap();
  assert!(!queue.is_registered(Filter::VNODE, 8));
}
