#![forbid(unsafe_code)]

//! The directive registry and the bindings each directive installs.
//!
//! An attribute `v-<name>[:<event>]="<expression>"` is parsed into a
//! [`BindingDescriptor`], looked up in the fixed [`Directive`] table, and
//! bound. Binding returns the watchers that keep the node in sync; the
//! caller owns them for the life of the session. Listener closures never
//! capture the view adapter, only the data and method handles they need.

use std::rc::Rc;

use mvvm_core::{Object, ReactiveError, Value, Watcher, assign};
use mvvm_view::{Attribute, Event, ListenerError, NodeId, ViewAdapter};
use tracing::trace;

use crate::compiler::MethodInvoker;
use crate::error::{CompileError, VmError};
use crate::interpolate::Interpolator;
use crate::updater::Updater;

/// Built-in directives.
///
/// `Text` is not reachable from an attribute; the compiler uses it for text
/// nodes with interpolation markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Two-way binding between a data path and an input's value.
    Model,
    /// One-way binding of a data path to a node's inner markup.
    Html,
    /// Calls a session method when an event fires.
    On,
    /// One-way binding of interpolated text.
    Text,
}

impl Directive {
    /// Resolve an attribute directive by name.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "model" => Some(Self::Model),
            "html" => Some(Self::Html),
            "on" => Some(Self::On),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Html => "html",
            Self::On => "on",
            Self::Text => "text",
        }
    }
}

/// A parsed directive attribute. Exists only while compiling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingDescriptor {
    pub node: NodeId,
    pub directive: Directive,
    /// Event name after the colon, for `on`.
    pub event: Option<String>,
    /// Attribute value, trimmed.
    pub expression: String,
}

impl BindingDescriptor {
    /// Parse `attr` as a directive attribute.
    ///
    /// Returns `None` when the attribute does not start with `prefix`.
    ///
    /// # Errors
    ///
    /// [`CompileError::UnknownDirective`] for a name not in the registry and
    /// [`CompileError::MissingEventName`] for `on` without an event.
    pub fn parse(
        prefix: &str,
        attr: &Attribute,
        node: NodeId,
    ) -> Option<Result<Self, CompileError>> {
        let rest = attr.name.strip_prefix(prefix)?;
        let (name, event) = match rest.split_once(':') {
            Some((name, event)) => (name, Some(event.to_owned())),
            None => (rest, None),
        };
        let Some(directive) = Directive::lookup(name) else {
            return Some(Err(CompileError::UnknownDirective {
                directive: name.to_owned(),
                attribute: attr.name.clone(),
                node,
            }));
        };
        if directive == Directive::On && event.as_deref().is_none_or(str::is_empty) {
            return Some(Err(CompileError::MissingEventName {
                attribute: attr.name.clone(),
                node,
            }));
        }
        Some(Ok(Self {
            node,
            directive,
            event,
            expression: attr.value.trim().to_owned(),
        }))
    }
}

/// Everything a directive needs to install a binding.
pub(crate) struct BindContext {
    pub adapter: Rc<dyn ViewAdapter>,
    pub data: Object,
    pub interpolator: Rc<Interpolator>,
    pub input_event: String,
    pub methods: Rc<dyn MethodInvoker>,
}

fn listener_error(err: VmError) -> ListenerError {
    Box::new(err)
}

fn binding_error(desc_expr: &str, node: NodeId) -> impl Fn(ReactiveError) -> CompileError + '_ {
    move |source| CompileError::Binding {
        expression: desc_expr.to_owned(),
        node,
        source,
    }
}

impl BindContext {
    /// Install the binding described by `desc`.
    pub(crate) fn bind(&self, desc: &BindingDescriptor) -> Result<Vec<Watcher>, CompileError> {
        trace!(
            directive = desc.directive.name(),
            node = %desc.node,
            expression = %desc.expression,
            "bind"
        );
        match desc.directive {
            Directive::Model => self.bind_model(desc).map(|w| vec![w]),
            Directive::Html => self
                .bind_value(desc.node, &desc.expression, Updater::Html)
                .map(|w| vec![w]),
            Directive::On => {
                self.bind_event(desc);
                Ok(Vec::new())
            }
            Directive::Text => self.bind_text(desc.node, &desc.expression),
        }
    }

    /// Watch `expression` and push every change through `updater`,
    /// including the initial value.
    fn bind_value(
        &self,
        node: NodeId,
        expression: &str,
        updater: Updater,
    ) -> Result<Watcher, CompileError> {
        let adapter = Rc::clone(&self.adapter);
        let watcher = Watcher::new(&self.data, expression, move |value| {
            updater.apply_value(&*adapter, node, value);
            Ok(())
        })
        .map_err(binding_error(expression, node))?;
        updater.apply_value(&*self.adapter, node, &watcher.last_value());
        Ok(watcher)
    }

    fn bind_model(&self, desc: &BindingDescriptor) -> Result<Watcher, CompileError> {
        let watcher = self.bind_value(desc.node, &desc.expression, Updater::Value)?;
        let data = self.data.clone();
        let path = desc.expression.clone();
        self.adapter.add_listener(
            desc.node,
            &self.input_event,
            Rc::new(move |ev: &Event| {
                assign(&data, &path, Value::from(ev.value.as_str()))
                    .map_err(|e| listener_error(e.into()))
            }),
        );
        Ok(watcher)
    }

    fn bind_event(&self, desc: &BindingDescriptor) {
        let event = desc.event.as_deref().unwrap_or_default();
        let methods = Rc::clone(&self.methods);
        let name = desc.expression.clone();
        self.adapter.add_listener(
            desc.node,
            event,
            Rc::new(move |ev: &Event| methods.invoke(&name, ev).map_err(listener_error)),
        );
    }

    /// One watcher per marker; any of them re-renders the whole template.
    fn bind_text(&self, node: NodeId, template: &str) -> Result<Vec<Watcher>, CompileError> {
        let template: Rc<str> = Rc::from(template);
        let mut watchers = Vec::new();
        for expression in self.interpolator.expressions(&template) {
            let adapter = Rc::clone(&self.adapter);
            let interpolator = Rc::clone(&self.interpolator);
            let data = self.data.clone();
            let text = Rc::clone(&template);
            let watcher = Watcher::new(&self.data, expression, move |_| {
                let rendered = interpolator.render(&text, &data)?;
                Updater::Text.apply(&*adapter, node, &rendered);
                Ok(())
            })
            .map_err(binding_error(expression, node))?;
            watchers.push(watcher);
        }
        let rendered = mvvm_core::untracked(|| self.interpolator.render(&template, &self.data))
            .map_err(binding_error(&template, node))?;
        Updater::Text.apply(&*self.adapter, node, &rendered);
        Ok(watchers)
    }
}
