//! crates/series_learner_core/src/budget.rs
//!
//! The learning-vs-other-languages budget. Total over its inputs: anything
//! that is not a non-negative whole number is sanitized, never rejected.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    WithinBudget,
    OverBudget,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetSummary {
    pub learning_minutes: i64,
    pub non_learning_minutes: i64,
    /// Learning minus non-learning minutes; negative when over budget.
    pub remaining_budget_minutes: i64,
    pub debt_minutes: i64,
    /// Learning / non-learning, rounded half-up to two decimals.
    pub coverage_ratio: f64,
    pub status: BudgetStatus,
}

pub fn calculate_budget_summary(learning_minutes: f64, non_learning_minutes: f64) -> BudgetSummary {
    let learning = sanitize_minutes(learning_minutes);
    let non_learning = sanitize_minutes(non_learning_minutes);

    let remaining_budget_minutes = learning - non_learning;
    let debt_minutes = (non_learning - learning).max(0);

    BudgetSummary {
        learning_minutes: learning,
        non_learning_minutes: non_learning,
        remaining_budget_minutes,
        debt_minutes,
        coverage_ratio: coverage_ratio(learning, non_learning),
        status: if debt_minutes > 0 {
            BudgetStatus::OverBudget
        } else {
            BudgetStatus::WithinBudget
        },
    }
}

/// Rounds to the nearest whole minute and clamps at zero. NaN and infinities count as zero.
fn sanitize_minutes(minutes: f64) -> i64 {
    if !minutes.is_finite() {
        return 0;
    }
    // `as` saturates, so absurdly large inputs pin to i64::MAX.
    minutes.round().max(0.0) as i64
}

fn coverage_ratio(learning: i64, non_learning: i64) -> f64 {
    if non_learning == 0 {
        return if learning > 0 { 1.0 } else { 0.0 };
    }

    // Integer half-up rounding of learning / non_learning to hundredths.
    let numerator = i128::from(learning) * 200 + i128::from(non_learning);
    let hundredths = numerator / (i128::from(non_learning) * 2);
    hundredths as f64 / 100.0
}
