//! Path weight analysis
//!
//! Compares every start-to-end path against the configured weight budget
//! and summarizes the spread between the lightest and heaviest route.

use super::paths::RunPath;
use crate::config::BudgetConfig;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BalanceReport {
    pub min: u32,
    pub max: u32,
    pub avg: f64,
    /// max - min.
    pub spread: u32,
    /// Indices into the enumerated path list.
    pub underweight_paths: Vec<usize>,
    pub overweight_paths: Vec<usize>,
}

impl BalanceReport {
    pub fn is_balanced(&self) -> bool {
        self.underweight_paths.is_empty() && self.overweight_paths.is_empty()
    }
}

/// Analyze enumerated paths against the budget window.
pub fn analyze_balance(paths: &[RunPath], budget: &BudgetConfig) -> BalanceReport {
    if paths.is_empty() {
        return BalanceReport {
            min: 0,
            max: 0,
            avg: 0.0,
            spread: 0,
            underweight_paths: Vec::new(),
            overweight_paths: Vec::new(),
        };
    }

    let min = paths.iter().map(|p| p.weight).min().unwrap_or(0);
    let max = paths.iter().map(|p| p.weight).max().unwrap_or(0);
    let avg = paths.iter().map(|p| p.weight as f64).sum::<f64>() / paths.len() as f64;

    let mut underweight_paths = Vec::new();
    let mut overweight_paths = Vec::new();
    for (i, path) in paths.iter().enumerate() {
        if path.weight < budget.min_weight() {
            underweight_paths.push(i);
        } else if path.weight > budget.max_weight() {
            overweight_paths.push(i);
        }
    }

    BalanceReport {
        min,
        max,
        avg,
        spread: max - min,
        underweight_paths,
        overweight_paths,
    }
}
