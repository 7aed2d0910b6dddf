//! Structured product and disease facts served by the knowledge store

use crate::question::ProductNeed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductFact {
    pub active_ingredient: String,
    pub category: ProductNeed,
    #[serde(default)]
    pub trade_names: Vec<String>,
    /// FRAC, HRAC or IRAC group, depending on category
    #[serde(default)]
    pub moa_code: Option<String>,
    /// Rate label (e.g. `preventive`) to label text (e.g. `0.2-0.4 fl oz/1000 sq ft`)
    #[serde(default)]
    pub rates: BTreeMap<String, String>,
    /// Diseases, weeds or pests the label covers
    #[serde(default)]
    pub targets: Vec<String>,
}

impl ProductFact {
    /// Active ingredient followed by trade names, lowercased
    pub fn names(&self) -> Vec<String> {
        std::iter::once(self.active_ingredient.to_lowercase())
            .chain(self.trade_names.iter().map(|t| t.to_lowercase()))
            .collect()
    }

    pub fn display_name(&self) -> &str {
        self.trade_names
            .first()
            .map(String::as_str)
            .unwrap_or(&self.active_ingredient)
    }

    /// Product amounts in the rate strings, ignoring the area unit
    pub fn rate_numbers(&self) -> Vec<f32> {
        self.rates
            .values()
            .flat_map(|r| {
                let amount = r.split('/').next().unwrap_or(r);
                let amount = amount.split(" per ").next().unwrap_or(amount);
                numbers_in(amount)
            })
            .collect()
    }

    pub fn max_label_rate(&self) -> Option<f32> {
        self.rate_numbers().into_iter().reduce(f32::max)
    }

    pub fn rates_summary(&self) -> String {
        self.rates
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "{} ({}), {}",
            self.display_name(),
            self.active_ingredient,
            self.category.as_str()
        );
        if let Some(code) = &self.moa_code {
            out.push_str(&format!(", group {}", code));
        }
        if !self.rates.is_empty() {
            out.push_str(&format!(". Label rates: {}", self.rates_summary()));
        }
        if !self.targets.is_empty() {
            out.push_str(&format!(". Targets: {}", self.targets.join(", ")));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseFact {
    pub name: String,
    #[serde(default)]
    pub pathogen: Option<String>,
    #[serde(default)]
    pub environmental_triggers: Option<String>,
    #[serde(default)]
    pub cultural_control: Option<String>,
    #[serde(default)]
    pub top_products: Vec<String>,
}

impl DiseaseFact {
    pub fn display_name(&self) -> String {
        self.name.replace('_', " ")
    }

    pub fn render(&self) -> String {
        let mut parts = vec![self.display_name()];
        if let Some(p) = &self.pathogen {
            parts.push(format!("pathogen: {}", p));
        }
        if let Some(t) = &self.environmental_triggers {
            parts.push(format!("triggers: {}", t));
        }
        if let Some(c) = &self.cultural_control {
            parts.push(format!("cultural control: {}", c));
        }
        if !self.top_products.is_empty() {
            parts.push(format!("top products: {}", self.top_products.join(", ")));
        }
        parts.join("; ")
    }
}

fn numbers_in(text: &str) -> Vec<f32> {
    let mut out = Vec::new();
    let mut current = String::new();
    for ch in text.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_digit() || (ch == '.' && !current.is_empty() && !current.contains('.')) {
            current.push(ch);
        } else if !current.is_empty() {
            if let Ok(n) = current.trim_end_matches('.').parse::<f32>() {
                out.push(n);
            }
            current.clear();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heritage() -> ProductFact {
        ProductFact {
            active_ingredient: "azoxystrobin".into(),
            category: ProductNeed::Fungicide,
            trade_names: vec!["Heritage".into()],
            moa_code: Some("11".into()),
            rates: BTreeMap::from([
                ("preventive".to_string(), "0.2-0.4 oz/1000 sq ft".to_string()),
                ("curative".to_string(), "0.4 oz/1000 sq ft".to_string()),
            ]),
            targets: vec!["brown_patch".into()],
        }
    }

    #[test]
    fn test_max_label_rate() {
        assert_eq!(numbers_in("0.2-0.4 oz/1000 sq ft"), vec![0.2, 0.4, 1000.0]);
        assert_eq!(numbers_in("apply 2. then"), vec![2.0]);
        assert_eq!(heritage().max_label_rate(), Some(0.4));
    }

    #[test]
    fn test_names_and_render() {
        let p = heritage();
        assert_eq!(p.names(), vec!["azoxystrobin", "heritage"]);
        let rendered = p.render();
        assert!(rendered.starts_with("Heritage (azoxystrobin), fungicide, group 11"));
        assert!(rendered.contains("curative: 0.4 oz/1000 sq ft"));
    }
}
