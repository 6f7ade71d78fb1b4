//! Admin back-office bodies and reports.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reason shown to the listing owner or payout requester
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LockThreadRequest {
    /// `false` unlocks
    #[serde(default = "default_locked")]
    pub locked: bool,
}

fn default_locked() -> bool {
    true
}

/// Platform-wide totals
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportSummary {
    pub user_count: i64,
    /// Credits held across all balances
    pub outstanding_credits: i64,
    /// Cash value of every recorded transaction
    #[schema(value_type = String)]
    pub gross_cash: Decimal,
    #[schema(value_type = String)]
    pub platform_fees: Decimal,
    /// Owed to providers and not yet requested
    #[schema(value_type = String)]
    pub unpaid_provider_cash: Decimal,
    /// Attached to payout requests awaiting a decision
    #[schema(value_type = String)]
    pub requested_provider_cash: Decimal,
    pub pending_listings: i64,
    pub open_contests: i64,
    pub pending_checkouts: i64,
}
