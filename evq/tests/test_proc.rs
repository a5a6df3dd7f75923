use std::time::Duration;

use evq::{
  Error, Filter, Flags, Kevent, Queue, Sources,
  event::{
    NOTE_CHILD, NOTE_EXEC, NOTE_EXIT, NOTE_FORK, NOTE_TRACK,
  },
};

const POLL: Option<Duration> = Some(Duration::ZERO);

fn out_buf() -> [Kevent; 8] {
  [Kevent::new(0, Filter::PROC, Flags::NONE); 8]
}

fn proc_add(pid: u64, fflags: u32) -> Kevent {
  let mut kev = Kevent::new(pid, Filter::PROC, Flags::ADD);
  kev.fflags = fflags;
  kev
}

#[test]
fn test_exit_delivery() {
  let sources = Sources::new();
  sources.procs().spawn(500);

  let queue = Queue::new(sources.clone());
  let mut out = out_buf();

  queue.kevent(&[proc_add(500, NOTE_EXIT)], &mut out, POLL).unwrap();
  assert_eq!(queue.kevent(&[], &mut out, POLL).unwrap(), 0);

  sources.procs().exit(500, 7);
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].filter, Filter::PROC);
  assert!(out[0].flags.contains(Flags::EOF));
  assert!(out[0].flags.contains(Flags::NODATA));
  assert_ne!(out[0].fflags & NOTE_EXIT, 0);
  assert_eq!(out[0].data, 7);

  // The registration outlives the process until the client removes it;
  // anything but DELETE is refused now.
  let n = queue
    .kevent(&[Kevent::new(500, Filter::PROC, Flags::ENABLE)], &mut out, POLL)
    .unwrap();
  assert!(out[0].flags.contains(Flags::ERROR));
  assert_eq!(out[0].data, Error::BadIdent.code());
  assert!(n >= 1);

  let delete = Kevent::new(500, Filter::PROC, Flags::DELETE);
  queue.kevent(&[delete], &mut [], POLL).unwrap();
  assert!(!queue.is_registered(Filter::PROC, 500));
}

#[test]
fn test_unknown_pid_is_refused() {
  let sources = Sources::new();
  let queue = Queue::new(sources);
  let mut out = out_buf();

  let n = queue.kevent(&[proc_add(12345, NOTE_EXIT)], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert!(out[0].flags.contains(Flags::ERROR));
  assert_eq!(out[0].data, Error::BadIdent.code());
}

#[test]
fn test_exec_notification() {
  let sources = Sources::new();
  sources.procs().spawn(600);

  let queue = Queue::new(sources.clone());
  let mut out = out_buf();

  let mut add = proc_add(600, NOTE_EXEC);
  add.flags |= Flags::CLEAR;
  queue.kevent(&[add], &mut out, POLL).unwrap();

  sources.procs().exec(600);
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_ne!(out[0].fflags & NOTE_EXEC, 0);

  // CLEAR: quiet until the next exec.
  assert_eq!(queue.kevent(&[], &mut out, POLL).unwrap(), 0);
}

#[test]
fn test_fork_tracking_follows_the_child() {
  let sources = Sources::new();
  sources.procs().spawn(100);

  let queue = Queue::new(sources.clone());
  let mut out = out_buf();

  let mut add = proc_add(100, NOTE_EXIT | NOTE_FORK | NOTE_TRACK);
  add.flags |= Flags::CLEAR;
  queue.kevent(&[add], &mut out, POLL).unwrap();

  sources.procs().fork(100, 101);

  // The child registration came into being on its own.
  assert!(queue.is_registered(Filter::PROC, 101));

  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 2);
  let child = out[..n].iter().find(|e| e.ident == 101).expect("child event");
  let parent = out[..n].iter().find(|e| e.ident == 100).expect("fork event");
  assert_ne!(child.fflags & NOTE_CHILD, 0);
  assert_eq!(child.data, 100);
  assert_ne!(parent.fflags & NOTE_FORK, 0);
  assert_eq!(parent.data, 101);

  // The tracked child reports its own exit.
  sources.procs().exit(101, 3);
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].ident, 101);
  assert_ne!(out[0].fflags & NOTE_EXIT, 0);
  assert_eq!(out[0].data, 3);
}

#[test]
fn test_fork_without_track_only_reports() {
  let sources = Sources::new();
  sources.procs().spawn(200);

  let queue = Queue::new(sources.clone());
  let mut out = out_buf();

  let mut add = proc_add(200, NOTE_FORK);
  add.flags |= Flags::CLEAR;
  queue.kevent(&[add], &mut out, POLL).unwrap();

  sources.procs().fork(200, 201);
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].ident, 200);
  assert_ne!(out[0].fflags & NOTE_FORK, 0);
  assert!(!queue.is_registered(Filter::PROC, 201));
}
