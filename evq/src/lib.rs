#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Evq - Unified Event Notification
//!
//! Evq is an event notification engine: register interest in heterogeneous
//! event sources once, then retrieve the subset that has fired with a
//! single bounded-wait call. Delivery cost does not grow with the number
//! of registrations — only fired sources are touched.
//!
//! ## Key Characteristics
//!
//! - **One queue, many source kinds**: files, processes, signals, timers,
//!   filesystem events and user-triggered events share one retrieval call
//! - **Level, edge, one-shot and dispatch delivery** per registration
//! - **Thread-safe**: registrations, activations and retrievals may run
//!   concurrently on clones of the queue handle
//! - **Pluggable filters**: source kinds are trait objects behind a
//!   process-wide registry; third-party filters share the built-ins'
//!   contract
//!
//! ## Built-in filters
//!
//! | Filter             | `ident`        | Delivers                        |
//! |--------------------|----------------|---------------------------------|
//! | [`Filter::READ`]   | file handle    | readable bytes, EOF             |
//! | [`Filter::WRITE`]  | file handle    | writable capacity, EOF          |
//! | [`Filter::EXCEPT`] | file handle    | out-of-band data                |
//! | [`Filter::VNODE`]  | file handle    | object mutations (echoed bits)  |
//! | [`Filter::PROC`]   | process id     | exit/fork/exec, fork tracking   |
//! | [`Filter::SIGNAL`] | signal number  | deliveries since last retrieval |
//! | [`Filter::TIMER`]  | arbitrary id   | expirations since last retrieval|
//! | [`Filter::FS`]     | unused         | mount-table changes             |
//! | [`Filter::USER`]   | arbitrary id   | client-triggered events         |
//!
//! ## Getting Started
//!
//! A queue is created against a [`Sources`] bundle — the file table,
//! process table, signal hub, timer wheel and filesystem hub it resolves
//! identities in:
//!
//! ```rust
//! use std::time::Duration;
//! use evq::{BufferFile, Filter, Flags, Kevent, Queue, Sources};
//!
//! let sources = Sources::new();
//! let file = BufferFile::new();
//! let fd = sources.files().open(file.clone());
//!
//! let queue = Queue::new(sources.clone());
//! let changes = [Kevent::new(fd, Filter::READ, Flags::ADD)];
//! let mut events = [Kevent::new(0, Filter::READ, Flags::NONE); 4];
//!
//! // Nothing buffered yet: a poll comes back empty.
//! let n = queue.kevent(&changes, &mut events, Some(Duration::ZERO)).unwrap();
//! assert_eq!(n, 0);
//!
//! // Buffered bytes fire the registration.
//! file.push(100);
//! let n = queue.kevent(&[], &mut events, Some(Duration::ZERO)).unwrap();
//! assert_eq!(n, 1);
//! assert_eq!(events[0].ident, fd);
//! assert_eq!(events[0].data, 100);
//! ```
//!
//! ## Delivery policies
//!
//! The behavior bits of a change pick what happens after a delivery:
//!
//! - default: level-triggered — a still-active source is re-delivered on
//!   every retrieval, riding to the tail for coarse fairness
//! - [`Flags::CLEAR`]: edge-like — the outbound reading resets, the next
//!   delivery needs fresh activity
//! - [`Flags::ONESHOT`]: delivered once, then the registration is removed
//! - [`Flags::DISPATCH`]: disabled after delivery until re-enabled
//!
//! ## Error reporting
//!
//! A failing change does not abort the batch: it is reported inline as a
//! record with [`Flags::ERROR`] set and the error code in `data`, and the
//! remaining changes still run. Only a change that fails with no room
//! left in the output fails the whole call. See [`Error`].
//!
//! ## Concurrency
//!
//! Each queue serializes its own state behind one lock; event sources
//! activate registrations from any thread. A retrieval that races an
//! activation never loses the event: the per-knote processing lease makes
//! the scanner re-check before it lets go of a knote.

pub mod error;
pub mod event;
pub mod filter;
pub mod knote;
pub mod notelist;
pub mod queue;
pub mod registry;
pub mod sources;
pub mod sync;

mod filters;

pub use error::Error;
pub use event::{Filter, Flags, Hint, Kevent};
pub use filter::FilterOps;
pub use knote::{Hook, Knote, KnoteState};
pub use notelist::NoteList;
pub use queue::Queue;
pub use sources::Sources;
pub use sources::fdtable::{BufferFile, FdTable, FileLike, FilePoll};
