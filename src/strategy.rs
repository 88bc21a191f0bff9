// src/strategy.rs
// Strategy catalog: selector contents and the schema load triggered by a selection

use crate::alerts::AlertLevel;
use crate::dashboard::Dashboard;
use crate::errors::DashboardError;
use crate::params::ParameterForm;
use crate::session::SessionEvent;
use crate::types::StrategyDescriptor;
use tracing::{debug, info};

pub const PLACEHOLDER_LABEL: &str = "Please choose a strategy";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct StrategySelector {
    strategies: Vec<StrategyDescriptor>,
    loaded: bool,
    selected: Option<String>,
}

impl StrategySelector {
    /// Placeholder first, then one option per strategy. Empty until a catalog loads.
    pub fn options(&self) -> Vec<SelectorOption> {
        if !self.loaded {
            return Vec::new();
        }
        let mut options = Vec::with_capacity(self.strategies.len() + 1);
        options.push(SelectorOption {
            value: String::new(),
            label: PLACEHOLDER_LABEL.to_string(),
        });
        options.extend(self.strategies.iter().map(|s| SelectorOption {
            value: s.name.clone(),
            label: s.label().to_string(),
        }));
        options
    }

    pub fn strategies(&self) -> &[StrategyDescriptor] {
        &self.strategies
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn replace(&mut self, strategies: Vec<StrategyDescriptor>) {
        self.strategies = strategies;
        self.loaded = true;
        self.selected = None;
    }

    pub fn clear(&mut self) {
        self.strategies.clear();
        self.loaded = false;
        self.selected = None;
    }

    fn select(&mut self, name: Option<String>) {
        self.selected = name;
    }
}

impl Dashboard {
    /// Fetches the catalog and auto-selects the first strategy.
    pub async fn load_catalog(&self) -> Result<(), DashboardError> {
        let strategies = match self.api.strategies().await {
            Ok(list) => list,
            Err(e) => {
                self.update(|s| {
                    s.selector.clear();
                    s.form = None;
                })
                .await;
                self.alert(
                    AlertLevel::Danger,
                    format!("Failed to load strategies: {}", e.user_message()),
                )
                .await;
                return Err(e);
            }
        };

        let count = strategies.len();
        let first = strategies.first().map(|s| s.name.clone());
        info!("📚 Loaded {} strategies", count);

        self.update(|s| {
            s.selector.replace(strategies);
            s.form = None;
        })
        .await;
        self.emit(SessionEvent::CatalogLoaded { count });

        match first {
            Some(name) => self.select_strategy(&name).await,
            None => Ok(()),
        }
    }

    /// Selects a strategy and replaces the parameter form with its schema.
    /// An empty name clears the selection and the form.
    pub async fn select_strategy(&self, name: &str) -> Result<(), DashboardError> {
        let name = name.trim().to_string();

        // The old form goes away immediately, not when the new schema lands
        self.update(|s| {
            s.selector
                .select(if name.is_empty() { None } else { Some(name.clone()) });
            s.form = None;
        })
        .await;

        if name.is_empty() {
            self.emit(SessionEvent::ParametersReplaced { strategy: None });
            return Ok(());
        }

        match self.api.strategy_parameters(&name).await {
            Ok(schema) => {
                let applied = self
                    .update(|s| {
                        if s.selector.selected() == Some(name.as_str()) {
                            s.form = Some(ParameterForm::new(schema));
                            true
                        } else {
                            false
                        }
                    })
                    .await;

                if applied {
                    self.emit(SessionEvent::ParametersReplaced {
                        strategy: Some(name),
                    });
                } else {
                    debug!("Discarding parameters for '{}': selection moved on", name);
                }
                Ok(())
            }
            Err(e) => {
                self.alert(
                    AlertLevel::Danger,
                    format!("Failed to load strategy parameters: {}", e.user_message()),
                )
                .await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_prepend_placeholder() {
        let mut selector = StrategySelector::default();
        assert!(selector.options().is_empty());

        selector.replace(vec![
            StrategyDescriptor {
                name: "ma_cross".into(),
                display_name: "MA Cross".into(),
            },
            StrategyDescriptor {
                name: "breakout_20d".into(),
                display_name: String::new(),
            },
        ]);
        let options = selector.options();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].value, "");
        assert_eq!(options[0].label, PLACEHOLDER_LABEL);
        assert_eq!(options[1].label, "MA Cross");
        assert_eq!(options[2].label, "breakout_20d");
    }

    #[test]
    fn test_empty_catalog_still_has_placeholder() {
        let mut selector = StrategySelector::default();
        selector.replace(Vec::new());
        assert_eq!(selector.options().len(), 1);
        selector.clear();
        assert!(selector.options().is_empty());
    }
}
