// src/types.rs
// Request/response contracts for the backtest backend API

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// --- System status ---
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StatusInfo {
    pub api_status: Option<String>,
    pub database_status: Option<String>,
    pub auto_trading_status: Option<String>,
    pub active_strategies: Option<u32>,
    pub total_strategies: Option<u32>,
    pub system_time: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SystemStatusPayload {
    pub status_info: StatusInfo,
}

// --- Strategy catalog ---
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StrategyDescriptor {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

impl StrategyDescriptor {
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct StrategiesPayload {
    #[serde(default)]
    pub strategies: Vec<StrategyDescriptor>,
}

// --- Parameter schema ---
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Number,
    Select,
    Boolean,
    /// Free text; also what any unrecognised type tag falls back to.
    #[default]
    #[serde(other)]
    Text,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub value: Value,
    #[serde(default)]
    pub label: Option<String>,
}

impl SelectOption {
    pub fn value_text(&self) -> String {
        value_text(&self.value)
    }

    pub fn label_text(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.value_text())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ParamSpec {
    #[serde(rename = "type", default)]
    pub kind: ParamKind,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub min: Option<Value>,
    #[serde(default)]
    pub max: Option<Value>,
    #[serde(default)]
    pub step: Option<Value>,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Parameter key → spec, in the order the server listed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    entries: Vec<(String, ParamSpec)>,
}

impl ParameterSchema {
    pub fn new(entries: Vec<(String, ParamSpec)>) -> Self {
        let mut schema = Self::default();
        for (key, spec) in entries {
            schema.insert(key, spec);
        }
        schema
    }

    /// Later duplicates replace earlier ones, keeping the later position.
    pub fn insert(&mut self, key: String, spec: ParamSpec) {
        self.entries.retain(|(k, _)| k != &key);
        self.entries.push((key, spec));
    }

    pub fn get(&self, key: &str) -> Option<&ParamSpec> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, spec)| spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.entries.iter().map(|(k, spec)| (k.as_str(), spec))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for ParameterSchema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = ParameterSchema;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of parameter key to parameter spec")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(ParameterSchema::default())
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(ParameterSchema::default())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut schema = ParameterSchema::default();
                while let Some((key, spec)) = map.next_entry::<String, ParamSpec>()? {
                    schema.insert(key, spec);
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_any(SchemaVisitor)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ParametersPayload {
    #[serde(default)]
    pub parameters: ParameterSchema,
}

// --- Backtest results ---
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct TradeRecord {
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub exit_date: Option<String>,
    #[serde(default)]
    pub stock_id: Option<String>,
    #[serde(default)]
    pub trade_direction: Option<String>,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub shares: Option<f64>,
    #[serde(default)]
    pub profit_loss: Option<f64>,
    #[serde(default)]
    pub profit_loss_rate: Option<f64>,
    #[serde(default)]
    pub net_profit_loss: Option<f64>,
    // Anything else the engine reports is carried through to export untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TradeRecord {
    pub fn is_buy(&self) -> bool {
        self.trade_direction
            .as_deref()
            .map(|d| d.eq_ignore_ascii_case("buy"))
            .unwrap_or(false)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct BacktestResult {
    #[serde(default)]
    pub total_trades: Option<u64>,
    #[serde(default)]
    pub win_rate: Option<f64>,
    #[serde(default)]
    pub total_profit_loss_rate: Option<f64>,
    #[serde(default)]
    pub max_drawdown_rate: Option<f64>,
    #[serde(default)]
    pub sharpe_ratio: Option<f64>,
    #[serde(default)]
    pub total_profit_loss: Option<f64>,
    #[serde(default)]
    pub trade_records: Vec<TradeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity_curve: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charts: Option<Vec<Value>>,
    // winning_trades, losing_trades, max_drawdown, dates, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BacktestResult {
    pub fn has_charts(&self) -> bool {
        self.charts.as_ref().map(|c| !c.is_empty()).unwrap_or(false)
    }

    pub fn has_equity_curve(&self) -> bool {
        self.equity_curve.as_ref().map(|c| !c.is_empty()).unwrap_or(false)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct BacktestPayload {
    pub results: BacktestResult,
}

// --- Export ---
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    Detailed,
    Basic,
}

impl ExportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportType::Detailed => "detailed",
            ExportType::Basic => "basic",
        }
    }
}

impl FromStr for ExportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "detailed" => Ok(ExportType::Detailed),
            "basic" => Ok(ExportType::Basic),
            other => Err(format!("unknown export type: {}", other)),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ExportRequest<'a> {
    pub results: &'a BacktestResult,
    pub export_type: ExportType,
}

/// Display form of a loosely typed JSON scalar (strings unquoted, null empty).
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JavaScript-style truthiness, used for boolean parameter defaults.
pub fn value_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "false" && s != "0",
        Value::Array(_) | Value::Object(_) => true,
    }
}
