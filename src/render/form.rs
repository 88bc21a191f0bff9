// src/render/form.rs
// Strategy parameter controls

use crate::params::{ParamValue, ParameterForm, PARAM_PREFIX};
use crate::render::html::escape;
use crate::types::{value_text, ParamKind, ParamSpec};
use std::fmt::Write;

pub const EMPTY_SCHEMA_MESSAGE: &str = "This strategy needs no additional parameters";

pub fn render_parameter_form(form: Option<&ParameterForm>) -> String {
    let form = match form {
        Some(f) => f,
        None => return String::new(),
    };

    if form.is_empty() {
        return format!(r#"<p class="text-muted">{}</p>"#, EMPTY_SCHEMA_MESSAGE);
    }

    let mut html = String::from(r#"<div class="row">"#);
    for (key, spec, value) in form.fields() {
        let id = format!("{}{}", PARAM_PREFIX, escape(key));
        let label = escape(spec.label.as_deref().unwrap_or(key));

        html.push_str(r#"<div class="col-md-6"><div class="form-group">"#);
        let _ = write!(html, r#"<label for="{}">{}</label>"#, id, label);
        html.push_str(&render_control(&id, &label, spec, value));
        if let Some(description) = spec.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = write!(
                html,
                r#"<small class="form-text text-muted">{}</small>"#,
                escape(description)
            );
        }
        html.push_str("</div></div>");
    }
    html.push_str("</div>");
    html
}

fn render_control(id: &str, label: &str, spec: &ParamSpec, value: &ParamValue) -> String {
    let required = if spec.required { " required" } else { "" };
    let text = escape(value.as_text().unwrap_or(""));

    match spec.kind {
        ParamKind::Number => {
            let mut bounds = String::new();
            if let Some(min) = spec.min.as_ref().map(value_text).filter(|s| !s.is_empty()) {
                let _ = write!(bounds, r#" min="{}""#, escape(&min));
            }
            if let Some(max) = spec.max.as_ref().map(value_text).filter(|s| !s.is_empty()) {
                let _ = write!(bounds, r#" max="{}""#, escape(&max));
            }
            let step = spec
                .step
                .as_ref()
                .map(value_text)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "1".to_string());
            format!(
                r#"<input type="number" class="form-control" id="{id}" name="{id}" value="{text}"{bounds} step="{step}"{required}>"#,
                step = escape(&step),
            )
        }
        ParamKind::Select => {
            let mut options = String::new();
            for option in &spec.options {
                let option_value = option.value_text();
                let selected = if value.as_text() == Some(option_value.as_str()) {
                    " selected"
                } else {
                    ""
                };
                let _ = write!(
                    options,
                    r#"<option value="{}"{}>{}</option>"#,
                    escape(&option_value),
                    selected,
                    escape(&option.label_text())
                );
            }
            format!(r#"<select class="form-control" id="{id}" name="{id}"{required}>{options}</select>"#)
        }
        ParamKind::Boolean => {
            let checked = if value.as_flag().unwrap_or(false) { " checked" } else { "" };
            format!(
                r#"<div class="custom-control custom-switch"><input type="checkbox" class="custom-control-input" id="{id}" name="{id}" value="on"{checked}{required}><label class="custom-control-label" for="{id}">{label}</label></div>"#
            )
        }
        ParamKind::Text => format!(
            r#"<input type="text" class="form-control" id="{id}" name="{id}" value="{text}"{required}>"#
        ),
    }
}
