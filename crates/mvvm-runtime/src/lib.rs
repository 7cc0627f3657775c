#![forbid(unsafe_code)]

//! Template compiler and session object for the mvvm binding engine.
//!
//! A [`Vm`] takes plain data, turns it into a reactive [`Object`], and
//! compiles a view subtree against it:
//!
//! - Attributes named `v-<directive>[:<event>]` install a binding through the
//!   fixed [`Directive`] registry (`model`, `html`, `on`).
//! - Text nodes containing `{{ path }}` markers get one watcher per marker;
//!   any change re-renders the whole text.
//!
//! After compilation every data write synchronously updates the affected
//! nodes through their [`Updater`]s. There is no render call and no batching.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Unknown directive | Recorded in [`Vm::compile_errors`]; the walk continues |
//! | Path error during compile | Recorded; that binding is skipped |
//! | Path error during update | Returned from the write that triggered it |
//! | Missing event method | Returned from the listener when the event fires |
//!
//! [`Object`]: mvvm_core::Object

pub mod compiler;
pub mod config;
pub mod directive;
pub mod error;
pub mod interpolate;
pub mod updater;
pub mod vm;

pub use compiler::{CompileOutput, Compiler, MethodInvoker};
pub use config::{ConfigError, Delimiters, RuntimeConfig};
pub use directive::{BindingDescriptor, Directive};
pub use error::{CompileError, VmError};
pub use interpolate::Interpolator;
pub use updater::Updater;
pub use vm::{Method, ViewRoot, Vm, VmOptions};
