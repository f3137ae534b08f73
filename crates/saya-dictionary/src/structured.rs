//! Flattens structured glossary content (nested `{tag, content}` objects)
//! into HTML text for display.

use serde_json::{Map, Value};

/// Tags rendered as themselves around their content
const CONTAINER_TAGS: &[&str] = &[
    "ruby", "rt", "rp", "table", "thead", "tbody", "tfoot", "tr", "td", "th", "span", "div",
    "ol", "ul", "li", "details", "summary", "a", "b", "i", "em", "strong", "sub", "sup",
];

/// Render one structured value as HTML
pub fn to_html(value: &Value) -> String {
    let mut out = String::new();
    render(value, &mut out);
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_escaped(text, &mut out);
    out
}

fn push_escaped(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

fn render(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => push_escaped(s, out),
        Value::Array(items) => items.iter().for_each(|item| render(item, out)),
        Value::Object(map) => render_object(map, out),
    }
}

fn render_object(map: &Map<String, Value>, out: &mut String) {
    match map.get("type").and_then(Value::as_str) {
        Some("structured-content") => {
            if let Some(content) = map.get("content") {
                render(content, out);
            }
            return;
        }
        Some("text") => {
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                push_escaped(text, out);
            }
            return;
        }
        Some("image") => {
            render_image(map, out);
            return;
        }
        _ => {}
    }

    let Some(tag) = map.get("tag").and_then(Value::as_str) else {
        render_untagged(map, out);
        return;
    };

    match tag {
        "br" => out.push_str("<br>"),
        "img" => render_image(map, out),
        tag if CONTAINER_TAGS.contains(&tag) => {
            out.push('<');
            out.push_str(tag);
            push_attributes(tag, map, out);
            out.push('>');
            if let Some(content) = map.get("content") {
                render(content, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        unknown => {
            // Generic wrapper keeps the content of tags we do not know
            out.push_str("<span data-tag=\"");
            push_escaped(unknown, out);
            out.push('"');
            push_attributes(unknown, map, out);
            out.push('>');
            if let Some(content) = map.get("content") {
                render(content, out);
            }
            out.push_str("</span>");
        }
    }
}

/// Objects with neither `type` nor `tag`
fn render_untagged(map: &Map<String, Value>, out: &mut String) {
    if let Some(content) = map.get("content") {
        render(content, out);
    } else if let Some(text) = map.get("text").and_then(Value::as_str) {
        push_escaped(text, out);
    } else {
        for value in map.values() {
            out.push_str("<span>");
            render(value, out);
            out.push_str("</span>");
        }
    }
}

fn render_image(map: &Map<String, Value>, out: &mut String) {
    let label = ["alt", "title", "description"]
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .unwrap_or("image");
    out.push_str("<span class=\"image\">[");
    push_escaped(label, out);
    out.push_str("]</span>");
}

fn push_attributes(tag: &str, map: &Map<String, Value>, out: &mut String) {
    for key in ["lang", "title"] {
        if let Some(value) = map.get(key).and_then(Value::as_str) {
            push_attribute(key, value, out);
        }
    }

    if tag == "a" {
        if let Some(href) = map.get("href").and_then(Value::as_str) {
            push_attribute("href", href, out);
        }
    }

    if matches!(tag, "td" | "th") {
        for (key, attr) in [("colSpan", "colspan"), ("rowSpan", "rowspan")] {
            if let Some(span) = map.get(key).and_then(Value::as_u64) {
                push_attribute(attr, &span.to_string(), out);
            }
        }
    }

    if let Some(Value::Object(data)) = map.get("data") {
        for (key, value) in data {
            if let Some(value) = value.as_str() {
                push_attribute(&format!("data-sc-{}", key), value, out);
            }
        }
    }

    if let Some(Value::Object(style)) = map.get("style") {
        let css = style_to_css(style);
        if !css.is_empty() {
            push_attribute("style", &css, out);
        }
    }
}

fn push_attribute(name: &str, value: &str, out: &mut String) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    push_escaped(value, out);
    out.push('"');
}

/// `{"fontWeight": "bold"}` -> `font-weight:bold`
fn style_to_css(style: &Map<String, Value>) -> String {
    style
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let mut property = String::with_capacity(key.len() + 2);
            for c in key.chars() {
                if c.is_ascii_uppercase() {
                    property.push('-');
                    property.push(c.to_ascii_lowercase());
                } else {
                    property.push(c);
                }
            }
            Some(format!("{}:{}", property, value))
        })
        .collect::<Vec<_>>()
        .join(";")
}
