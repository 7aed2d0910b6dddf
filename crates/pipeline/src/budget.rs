//! Daily LLM cost budget
//!
//! Spend is priced per token and accumulated per UTC day. Past
//! `downgrade_fraction` of the limit the mini model is forced; past the
//! limit no generation happens.

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use turf_advisor_config::BudgetConfig;

pub const BUDGET_EXCEEDED_ANSWER: &str =
    "The system has reached its daily cost budget. Please try again tomorrow.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    Available,
    /// Close to the limit; use the cheaper model
    Downgrade,
    Exceeded,
}

pub struct DailyBudget {
    config: BudgetConfig,
    spend: DashMap<NaiveDate, f64>,
}

impl DailyBudget {
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            config,
            spend: DashMap::new(),
        }
    }

    /// USD cost of one call. Unpriced models cost nothing.
    pub fn cost(&self, model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        match self.config.prices.get(model) {
            Some(price) => {
                prompt_tokens as f64 / 1000.0 * price.input_per_1k
                    + completion_tokens as f64 / 1000.0 * price.output_per_1k
            }
            None => {
                tracing::debug!(model, "No price configured for model");
                0.0
            }
        }
    }

    /// Add one call to today's spend and return its cost
    pub fn record(&self, model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        self.record_on(Utc::now().date_naive(), model, prompt_tokens, completion_tokens)
    }

    fn record_on(&self, day: NaiveDate, model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        let cost = self.cost(model, prompt_tokens, completion_tokens);
        self.spend.retain(|d, _| *d >= day);
        *self.spend.entry(day).or_insert(0.0) += cost;
        cost
    }

    pub fn spent_today(&self) -> f64 {
        self.spent_on(Utc::now().date_naive())
    }

    fn spent_on(&self, day: NaiveDate) -> f64 {
        self.spend.get(&day).map_or(0.0, |s| *s)
    }

    pub fn status(&self) -> BudgetStatus {
        self.status_on(Utc::now().date_naive())
    }

    fn status_on(&self, day: NaiveDate) -> BudgetStatus {
        if !self.config.enabled {
            return BudgetStatus::Available;
        }
        let spent = self.spent_on(day);
        let limit = self.config.daily_limit_usd;
        if spent >= limit {
            BudgetStatus::Exceeded
        } else if spent >= limit * self.config.downgrade_fraction {
            BudgetStatus::Downgrade
        } else {
            BudgetStatus::Available
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use turf_advisor_config::ModelPrice;

    fn budget(limit: f64) -> DailyBudget {
        DailyBudget::new(BudgetConfig {
            enabled: true,
            daily_limit_usd: limit,
            downgrade_fraction: 0.9,
            prices: HashMap::from([(
                "full".to_string(),
                ModelPrice {
                    input_per_1k: 1.0,
                    output_per_1k: 2.0,
                },
            )]),
        })
    }

    #[test]
    fn test_cost_uses_prices() {
        let b = budget(10.0);
        assert!((b.cost("full", 1000, 500) - 2.0).abs() < 1e-9);
        assert_eq!(b.cost("unknown", 1000, 1000), 0.0);
    }

    #[test]
    fn test_status_thresholds() {
        let b = budget(10.0);
        let day = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        assert_eq!(b.status_on(day), BudgetStatus::Available);
        b.record_on(day, "full", 9000, 0);
        assert_eq!(b.status_on(day), BudgetStatus::Downgrade);
        b.record_on(day, "full", 1000, 0);
        assert_eq!(b.status_on(day), BudgetStatus::Exceeded);
    }

    #[test]
    fn test_new_day_starts_fresh() {
        let b = budget(1.0);
        let day = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        b.record_on(day, "full", 5000, 0);
        let next = day.succ_opt().unwrap();
        assert_eq!(b.status_on(next), BudgetStatus::Available);
        b.record_on(next, "full", 10, 0);
        assert_eq!(b.spent_on(day), 0.0);
    }

    #[test]
    fn test_disabled_budget_never_blocks() {
        let mut config = BudgetConfig::default();
        config.enabled = false;
        config.daily_limit_usd = 0.0;
        assert_eq!(DailyBudget::new(config).status(), BudgetStatus::Available);
    }
}
