// src/render/html.rs
// Small markup helpers shared by the views

/// Escapes text for use in element content and quoted attribute values.
pub fn escape(text: &str) -> String {
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

/// `text-success` for zero or positive, `text-danger` for negative.
pub fn sign_class(value: Option<f64>) -> &'static str {
    match value.filter(|v| v.is_finite()) {
        Some(v) if v >= 0.0 => "text-success",
        Some(_) => "text-danger",
        None => "text-muted",
    }
}
