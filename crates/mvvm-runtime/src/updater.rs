#![forbid(unsafe_code)]

//! Node updaters: the last step between a changed value and the view.

use mvvm_core::Value;
use mvvm_view::{NodeId, ViewAdapter};

/// How a binding writes into its node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Updater {
    /// Sets the node's input value.
    Value,
    /// Replaces the node's content with raw markup.
    Html,
    /// Replaces the node's text.
    Text,
}

impl Updater {
    pub fn apply(self, adapter: &dyn ViewAdapter, node: NodeId, content: &str) {
        tracing::trace!(updater = ?self, %node, "update node");
        match self {
            Self::Value => adapter.set_value(node, content),
            Self::Html => adapter.set_inner_html(node, content),
            Self::Text => adapter.set_text(node, content),
        }
    }

    /// Apply the display form of `value`.
    pub fn apply_value(self, adapter: &dyn ViewAdapter, node: NodeId, value: &Value) {
        self.apply(adapter, node, &value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvvm_view::{Document, ViewAdapter};

    #[test]
    fn each_updater_targets_its_property() {
        let doc = Document::new();
        let input = doc.append(doc.root(), doc.element("input", &[]));
        let div = doc.append(doc.root(), doc.element("div", &[]));
        let text = doc.append(doc.root(), doc.text_node("old"));

        Updater::Value.apply_value(&doc, input, &Value::from(3));
        Updater::Html.apply(&doc, div, "<b>hi</b>");
        Updater::Text.apply(&doc, text, "new");

        assert_eq!(doc.value(input), "3");
        assert_eq!(doc.inner_html(div).as_deref(), Some("<b>hi</b>"));
        assert_eq!(doc.text(text), "new");
    }
}
