//! CI budget gate.

use serde::Serialize;
use tracing::{error, info};

use crate::config::BudgetConfig;
use crate::error::{CostError, CostResult};
use crate::report::InfracostReport;

/// A report that stayed within budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetOutcome {
    pub passed: bool,
    pub cost: f64,
    pub budget: f64,
    pub currency: String,
}

/// Compare a report's monthly total against the configured limit.
///
/// A total equal to the limit passes.
pub fn check_budget(report: &InfracostReport, config: &BudgetConfig) -> CostResult<BudgetOutcome> {
    let metrics = report.metrics();
    let cost = metrics.total_monthly_cost;
    let currency = metrics.currency;

    info!("Budget gate for project {}", config.project_name);
    info!("Estimate: {:.2} {}", cost, currency);
    info!("Budget:   {:.2} {}", config.limit, currency);

    if cost > config.limit {
        error!(
            "Budget exceeded by {:.2} {}",
            cost - config.limit,
            currency
        );
        return Err(CostError::BudgetExceeded {
            cost,
            budget: config.limit,
            currency,
        });
    }

    info!("Within budget");
    Ok(BudgetOutcome {
        passed: true,
        cost,
        budget: config.limit,
        currency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(total: &str) -> InfracostReport {
        InfracostReport::from_value(json!({"totalMonthlyCost": total, "currency": "USD"}))
    }

    #[test]
    fn test_within_budget() {
        let outcome = check_budget(&report("99.99"), &BudgetConfig::default()).unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.budget, 100.0);
    }

    #[test]
    fn test_limit_is_inclusive() {
        assert!(check_budget(&report("100"), &BudgetConfig::default()).is_ok());
    }

    #[test]
    fn test_exceeded() {
        let err = check_budget(&report("150.5"), &BudgetConfig::default().with_limit(120.0)).unwrap_err();
        match err {
            CostError::BudgetExceeded { cost, budget, currency } => {
                assert_eq!(cost, 150.5);
                assert_eq!(budget, 120.0);
                assert_eq!(currency, "USD");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
