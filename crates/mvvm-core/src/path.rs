#![forbid(unsafe_code)]

//! Dotted-path access over a reactive [`Object`].
//!
//! `resolve(root, "user.name")` reads `user` from `root`, then `name` from the
//! result. Every read goes through [`Object::get`], so resolving inside a
//! watcher evaluation subscribes the watcher to each segment along the way.
//! `assign` walks the same way and writes the last segment.
//!
//! Segments are trimmed, so `{{ user.name }}` and `user . name` resolve the
//! same property.

use crate::Result;
use crate::error::{PathError, ReactiveError};
use crate::object::Object;
use crate::value::Value;

fn segments(path: &str) -> Result<Vec<&str>> {
    let segs: Vec<&str> = path.split('.').map(str::trim).collect();
    if segs.iter().any(|s| s.is_empty()) {
        return Err(ReactiveError::EmptySegment {
            path: path.to_owned(),
        });
    }
    Ok(segs)
}

fn step(current: &Value, path: &str, segment: &str) -> Result<Object> {
    match current {
        Value::Object(obj) => Ok(obj.clone()),
        other => Err(PathError {
            path: path.trim().to_owned(),
            segment: segment.to_owned(),
            found: other.type_name(),
        }
        .into()),
    }
}

/// Read the value at `path`.
///
/// # Errors
///
/// - [`PathError`] when a segment other than the last yields a non-object.
/// - [`ReactiveError::EmptySegment`] for paths such as `a..b`.
/// - Any error raised by a computed property along the way.
pub fn resolve(root: &Object, path: &str) -> Result<Value> {
    let mut current = Value::Object(root.clone());
    for segment in segments(path)? {
        let obj = step(&current, path, segment)?;
        current = obj.get(segment)?;
    }
    Ok(current)
}

/// Write `value` at `path`.
///
/// Intermediate segments are read through the tracked path, exactly like
/// [`resolve`]; the last segment is written with [`Object::set`], which
/// notifies its subscribers before returning.
///
/// # Errors
///
/// Same as [`resolve`], plus the write errors of [`Object::set`].
pub fn assign(root: &Object, path: &str, value: Value) -> Result<()> {
    let segs = segments(path)?;
    let (last, parents) = segs
        .split_last()
        .ok_or_else(|| ReactiveError::EmptySegment {
            path: path.to_owned(),
        })?;
    let mut current = Value::Object(root.clone());
    for segment in parents {
        let obj = step(&current, path, segment)?;
        current = obj.get(segment)?;
    }
    step(&current, path, last)?.set(last, value)
}
