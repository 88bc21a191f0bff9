// src/params.rs
// Strategy parameter form: the retained schema + values are the source of truth, controls are a projection

use crate::errors::DashboardError;
use crate::types::{value_text, value_truthy, ParamKind, ParamSpec, ParameterSchema};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Control id/name prefix, `param-{key}`.
pub const PARAM_PREFIX: &str = "param-";

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Text(String),
}

impl ParamValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            ParamValue::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ParamValue::Flag(b) => Some(*b),
            ParamValue::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterForm {
    schema: ParameterSchema,
    values: Vec<(String, ParamValue)>,
}

impl ParameterForm {
    pub fn new(schema: ParameterSchema) -> Self {
        let values = schema
            .iter()
            .map(|(key, spec)| (key.to_string(), initial_value(spec)))
            .collect();
        Self { schema, values }
    }

    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
    }

    pub fn value(&self, key: &str) -> Option<&ParamValue> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Entries in schema order, paired with their current value.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &ParamSpec, &ParamValue)> {
        self.schema
            .iter()
            .zip(self.values.iter())
            .map(|((key, spec), (_, value))| (key, spec, value))
    }

    pub fn set_text(&mut self, key: &str, raw: &str) -> Result<(), DashboardError> {
        let spec = self.spec_for(key)?;
        if spec.kind == ParamKind::Boolean {
            return Err(DashboardError::Validation(format!(
                "Parameter '{}' is a toggle, not a text field",
                key
            )));
        }
        self.replace(key, ParamValue::Text(raw.to_string()));
        Ok(())
    }

    pub fn set_flag(&mut self, key: &str, on: bool) -> Result<(), DashboardError> {
        let spec = self.spec_for(key)?;
        if spec.kind != ParamKind::Boolean {
            return Err(DashboardError::Validation(format!(
                "Parameter '{}' is not a toggle",
                key
            )));
        }
        self.replace(key, ParamValue::Flag(on));
        Ok(())
    }

    /// Applies a submitted HTML form. Field names carry the `param-` prefix;
    /// unchecked checkboxes are absent from a submission and read as off.
    pub fn apply_submission(&mut self, fields: &HashMap<String, String>) {
        let updates: Vec<(String, ParamValue)> = self
            .schema
            .iter()
            .filter_map(|(key, spec)| {
                let submitted = fields.get(&format!("{}{}", PARAM_PREFIX, key));
                match spec.kind {
                    ParamKind::Boolean => Some((key.to_string(), ParamValue::Flag(submitted.is_some()))),
                    _ => submitted.map(|raw| (key.to_string(), ParamValue::Text(raw.clone()))),
                }
            })
            .collect();

        for (key, value) in updates {
            self.replace(&key, value);
        }
    }

    /// Parameter values keyed exactly by the schema keys.
    pub fn collect(&self) -> BTreeMap<String, ParamValue> {
        self.values.iter().cloned().collect()
    }

    /// Missing required text values, in schema order.
    pub fn missing_required(&self) -> Vec<&str> {
        self.fields()
            .filter(|(_, spec, value)| {
                spec.required && value.as_text().map(|t| t.trim().is_empty()).unwrap_or(false)
            })
            .map(|(key, _, _)| key)
            .collect()
    }

    fn spec_for(&self, key: &str) -> Result<&ParamSpec, DashboardError> {
        self.schema
            .get(key)
            .ok_or_else(|| DashboardError::Validation(format!("Unknown parameter '{}'", key)))
    }

    fn replace(&mut self, key: &str, value: ParamValue) {
        if let Some(slot) = self.values.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        }
    }
}

fn initial_value(spec: &ParamSpec) -> ParamValue {
    match spec.kind {
        ParamKind::Boolean => ParamValue::Flag(spec.default.as_ref().map(value_truthy).unwrap_or(false)),
        ParamKind::Select => {
            let default = spec.default.as_ref().map(value_text);
            let chosen = spec
                .options
                .iter()
                .map(|o| o.value_text())
                .find(|v| Some(v) == default.as_ref())
                .or_else(|| spec.options.first().map(|o| o.value_text()))
                .unwrap_or_default();
            ParamValue::Text(chosen)
        }
        ParamKind::Number | ParamKind::Text => {
            ParamValue::Text(spec.default.as_ref().map(value_text).unwrap_or_default())
        }
    }
}
