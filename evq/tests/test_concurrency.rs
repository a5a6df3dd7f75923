use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use evq::{BufferFile, Filter, Flags, Kevent, Queue, Sources};

const POLL: Option<Duration> = Some(Duration::ZERO);

#[test]
fn test_no_signal_delivery_is_lost() {
  let sources = Sources::new();
  let queue = Queue::new(sources.clone());
  queue
    .kevent(
      &[Kevent::new(30, Filter::SIGNAL, Flags::ADD | Flags::CLEAR)],
      &mut [],
      POLL,
    )
    .unwrap();

  let posters = 4;
  let per_poster = 250u64;
  let handles: Vec<_> = (0..posters)
    .map(|_| {
      let sources = sources.clone();
      thread::spawn(move || {
        for _ in 0..per_poster {
          sources.signals().post(30);
        }
      })
    })
    .collect();

  // Consume while the posters run; every delivery reports the count
  // accrued since the previous read, so the sum must come out exact.
  let expected = (posters as i64) * per_poster as i64;
  let mut seen = 0i64;
  let mut out = [Kevent::new(0, Filter::SIGNAL, Flags::NONE); 4];
  while seen < expected {
    let n = queue
      .kevent(&[], &mut out, Some(Duration::from_secs(5)))
      .unwrap();
    if n == 0 {
      break;
    }
    for ev in &out[..n] {
      seen += ev.data;
    }
  }

  for handle in handles {
    handle.join().unwrap();
  }
  // A final poll catches anything posted after the last read.
  let n = queue.kevent(&[], &mut out, POLL).unwrap();
  for ev in &out[..n] {
    seen += ev.data;
  }
  assert_eq!(seen, expected);
}

#[test]
fn test_concurrent_registration_and_scan() {
  let sources = Sources::new();
  let queue = Queue::new(sources.clone());
  let stop = Arc::new(AtomicBool::new(false));

  let scanner = {
    let queue = queue.clone();
    let stop = stop.clone();
    thread::spawn(move || {
      let mut out = [Kevent::new(0, Filter::USER, Flags::NONE); 16];
      let mut delivered = 0usize;
      while !stop.load(Ordering::Acquire) {
        delivered += queue
          .kevent(&[], &mut out, Some(Duration::from_millis(10)))
          .unwrap();
      }
      delivered
    })
  };

  let workers: Vec<_> = (0..4u64)
    .map(|worker| {
      let queue = queue.clone();
      thread::spawn(move || {
        let base = worker * 1000;
        for round in 0..100u64 {
          let ident = base + round;
          let mut add =
            Kevent::new(ident, Filter::USER, Flags::ADD | Flags::ONESHOT);
          add.fflags = evq::event::NOTE_TRIGGER;
          queue.kevent(&[add], &mut [], POLL).unwrap();
        }
      })
    })
    .collect();

  for worker in workers {
    worker.join().unwrap();
  }

  // Let the scanner drain the tail, then stop it.
  thread::sleep(Duration::from_millis(200));
  stop.store(true, Ordering::Release);
  let mut delivered = scanner.join().unwrap();

  let mut out = [Kevent::new(0, Filter::USER, Flags::NONE); 16];
  loop {
    let n = queue.kevent(&[], &mut out, POLL).unwrap();
    if n == 0 {
      break;
    }
    delivered += n;
  }

  // Every one-shot trigger was delivered exactly once.
  assert_eq!(delivered, 400);
  assert_eq!(queue.pending_events(), 0);
  for worker in 0..4u64 {
    for round in 0..100u64 {
      assert!(!queue.is_registered(Filter::USER, worker * 1000 + round));
    }
  }
}

#[test]
fn test_register_delete_race_with_activity() {
  let sources = Sources::new();
  let queue = Queue::new(sources.clone());
  let file = BufferFile::new();
  let fd = sources.files().open(file.clone());

  let churn = {
    let queue = queue.clone();
    thread::spawn(move || {
      for _ in 0..200 {
        queue
          .kevent(&[Kevent::new(fd, Filter::READ, Flags::ADD)], &mut [], POLL)
          .unwrap();
        let _ = queue.kevent(
          &[Kevent::new(fd, Filter::READ, Flags::DELETE)],
          &mut [],
          POLL,
        );
      }
    })
  };

  let pusher = thread::spawn(move || {
    for _ in 0..200 {
      file.push(1);
      file.drain(1);
    }
  });

  let mut out = [Kevent::new(0, Filter::READ, Flags::NONE); 8];
  for _ in 0..200 {
    let _ = queue.kevent(&[], &mut out, POLL).unwrap();
  }

  churn.join().unwrap();
  pusher.join().unwrap();

  let _ = queue.kevent(
    &[Kevent::new(fd, Filter::READ, Flags::DELETE)],
    &mut out,
    POLL,
  );
  assert!(!queue.is_registered(Filter::READ, fd));
  assert_eq!(queue.pending_events(), 0);
}

#[test]
fn test_two_sleepers_both_wake() {
  let sources = Sources::new();
  let queue = Queue::new(sources.clone());

  let sleepers: Vec<_> = (0..2)
    .map(|_| {
      let queue = queue.clone();
      thread::spawn(move || {
        let mut out = [Kevent::new(0, Filter::USER, Flags::NONE); 4];
        queue
          .kevent(&[], &mut out, Some(Duration::from_secs(2)))
          .unwrap()
      })
    })
    .collect();

  thread::sleep(Duration::from_millis(100));
  for ident in [70u64, 71] {
    let mut add = Kevent::new(ident, Filter::USER, Flags::ADD | Flags::ONESHOT);
    add.fflags = evq::event::NOTE_TRIGGER;
    queue.kevent(&[add], &mut [], POLL).unwrap();
  }

  let total: usize =
    sleepers.into_iter().map(|h| h.join().unwrap()).sum();
  assert_eq!(total, 2);
}

#[test]
fn test_randomized_push_drain_stress() {
  let sources = Sources::new();
  let queue = Queue::new(sources.clone());

  let files: Vec<_> = (0..4u64)
    .map(|i| {
      let file = BufferFile::with_space(1 << 20);
      sources.files().insert(100 + i, file.clone());
      let mut add =
        Kevent::new(100 + i, Filter::READ, Flags::ADD | Flags::CLEAR);
      add.fflags = 0;
      queue.kevent(&[add], &mut [], POLL).unwrap();
      file
    })
    .collect();

  let producers: Vec<_> = files
    .iter()
    .cloned()
    .map(|file| {
      thread::spawn(move || {
        let mut total = 0i64;
        for _ in 0..500 {
          let bytes = fastrand::i64(1..65);
          file.push(bytes);
          total += bytes;
          if fastrand::u8(..4) == 0 {
            thread::yield_now();
          }
        }
        total
      })
    })
    .collect();

  let consumer = {
    let queue = queue.clone();
    thread::spawn(move || {
      let mut out = [Kevent::new(0, Filter::READ, Flags::NONE); 16];
      let mut events = 0usize;
      for _ in 0..400 {
        events += queue
          .kevent(&[], &mut out, Some(Duration::from_millis(5)))
          .unwrap();
      }
      events
    })
  };

  let pushed: Vec<i64> =
    producers.into_iter().map(|h| h.join().unwrap()).collect();
  let _ = consumer.join().unwrap();

  // Whatever the interleaving, the buffers account for every byte.
  for (file, total) in files.iter().zip(pushed) {
    assert_eq!(file.drain(i64::MAX >> 1), total);
  }
  assert!(queue.pending_events() <= 4);
}
