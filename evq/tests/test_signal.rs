use std::time::Duration;

use evq::{Filter, Flags, Kevent, Queue, Sources};

const POLL: Option<Duration> = Some(Duration::ZERO);

fn out_buf() -> [Kevent; 8] {
  [Kevent::new(0, Filter::SIGNAL, Flags::NONE); 8]
}

#[test]
fn test_deliveries_count_since_last_retrieval() {
  let sources = Sources::new();
  let queue = Queue::new(sources.clone());
  let mut out = out_buf();

  queue
    .kevent(&[Kevent::new(15, Filter::SIGNAL, Flags::ADD)], &mut out, POLL)
    .unwrap();

  sources.signals().post(15);
  sources.signals().post(15);
  sources.signals().post(15);

  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].data, 3);

  // Nothing new since the read.
  assert_eq!(queue.kevent(&[], &mut out, POLL).unwrap(), 0);

  sources.signals().post(15);
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].data, 1);
}

#[test]
fn test_posts_to_other_signals_do_not_count() {
  let sources = Sources::new();
  let queue = Queue::new(sources.clone());
  let mut out = out_buf();

  queue
    .kevent(&[Kevent::new(10, Filter::SIGNAL, Flags::ADD)], &mut out, POLL)
    .unwrap();

  sources.signals().post(11);
  sources.signals().post(12);
  assert_eq!(queue.kevent(&[], &mut out, POLL).unwrap(), 0);
}

#[test]
fn test_two_queues_hear_the_same_signal() {
  let sources = Sources::new();
  let q1 = Queue::new(sources.clone());
  let q2 = Queue::new(sources.clone());
  let mut out = out_buf();

  let add = Kevent::new(20, Filter::SIGNAL, Flags::ADD);
  q1.kevent(&[add], &mut out, POLL).unwrap();
  q2.kevent(&[add], &mut out, POLL).unwrap();

  sources.signals().post(20);

  let n = q1.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].data, 1);
  let n = q2.kevent(&[], &mut out, POLL).unwrap();
  assert_eq!(n, 1);
  assert_eq!(out[0].data, 1);
}

#[test]
fn test_delete_stops_the_count() {
  let sources = Sources::new();
  let queue = Queue::new(sources.clone());
  let mut out = out_buf();

  queue
    .kevent(&[Kevent::new(21, Filter::SIGNAL, Flags::ADD)], &mut out, POLL)
    .unwrap();
  queue
    .kevent(&[Kevent::new(21, Filter::SIGNAL, Flags::DELETE)], &mut [], POLL)
    .unwrap();

  sources.signals().post(21);
  assert_eq!(queue.kevent(&[], &mut out, POLL).unwrap(), 0);
}
