#![forbid(unsafe_code)]

//! Reactivity core for the mvvm binding engine.
//!
//! This crate provides the pieces that turn plain data into a live store:
//!
//! - [`Value`] and [`Object`]: the data model. An `Object` is a tree of
//!   reactive cells, one per property, each carrying its own [`Dep`].
//! - [`Dep`]: the per-property subscriber list.
//! - [`Watcher`]: evaluates one dotted expression, remembers the last value,
//!   and runs a callback when a dependency change produces a different value.
//! - [`path`]: dotted-path `resolve` / `assign` over an `Object`.
//! - [`tracking`]: the active-watcher slot used to attribute reads.
//!
//! # Architecture
//!
//! Everything is single-threaded and synchronous. Shared ownership uses
//! `Rc<RefCell<..>>`. Subscriber lists hold `Weak` watcher references so a
//! store never keeps its watchers alive; the owner of the watchers (usually a
//! session) does.
//!
//! # Invariants
//!
//! 1. Every property of every nested object owns exactly one `Dep`.
//! 2. A watcher is subscribed to exactly the deps read during its latest
//!    evaluation, each at most once.
//! 3. Writing a value that is strictly equal to the current one is a no-op.
//! 4. Subscribers are notified in subscription order, and a failing
//!    subscriber never stops the rest of the pass.
//! 5. The active-watcher slot is restored after every evaluation, on all exit
//!    paths.

pub mod dep;
pub mod error;
pub mod object;
pub mod path;
pub mod tracking;
pub mod value;
pub mod watcher;

pub use dep::{Dep, DepId};
pub use error::{NotifyError, PathError, ReactiveError, UpdateFailure};
pub use object::{ComputedFn, Object};
pub use path::{assign, resolve};
pub use tracking::{is_tracking, untracked};
pub use value::Value;
pub use watcher::{Callback, Watcher};

/// Result alias used throughout the reactivity core.
pub type Result<T> = std::result::Result<T, ReactiveError>;
