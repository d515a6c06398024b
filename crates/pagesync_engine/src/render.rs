//! Optional HTML rendering of items.

use crate::item::SyncItem;
use serde_json::Value;

/// Produces an HTML rendering stored next to an item's data.
///
/// Returning `None` stores the item without a rendering. Closures of the
/// right shape implement this trait.
pub trait Renderer: Send + Sync {
    /// Renders one item.
    fn render(&self, item: &SyncItem) -> Option<String>;
}

impl<F> Renderer for F
where
    F: Fn(&SyncItem) -> Option<String> + Send + Sync,
{
    fn render(&self, item: &SyncItem) -> Option<String> {
        self(item)
    }
}

/// Renders a plain-text field as escaped HTML paragraphs.
///
/// Blank lines separate paragraphs. Items without the field, or with an
/// empty or non-string value, get no rendering.
#[derive(Debug, Clone)]
pub struct DescriptionRenderer {
    field: String,
}

impl DescriptionRenderer {
    /// Renders the `description` field.
    pub fn new() -> Self {
        Self::for_field("description")
    }

    /// Renders the given field.
    pub fn for_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl Default for DescriptionRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for DescriptionRenderer {
    fn render(&self, item: &SyncItem) -> Option<String> {
        let Some(Value::String(text)) = item.payload.get(&self.field) else {
            return None;
        };

        let paragraphs: Vec<String> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| format!("<p>{}</p>", escape_html(p).replace('\n', "<br>")))
            .collect();

        if paragraphs.is_empty() {
            None
        } else {
            Some(paragraphs.join("\n"))
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
