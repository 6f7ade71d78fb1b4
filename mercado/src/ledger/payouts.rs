//! Provider payouts.
//!
//! A provider's available balance is the cash value of their transactions not yet attached to
//! a payout request. Requesting a payout attaches a first-fit subset of those transactions in
//! creation order; a transaction that would push the subset over the requested amount is
//! skipped and the scan continues. The attached total is stored on the request, so any
//! shortfall against the requested amount is visible to the admin who processes it.
//!
//! ```text
//! REQUESTED ──approve──▶ COMPLETED   (transactions stay attached)
//!     │
//!     └──────reject────▶ REJECTED    (transactions return to the unpaid pool)
//! ```

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::{
    db::{
        errors::DbError,
        handlers::{Payouts, Transactions},
        models::payouts::{PayoutRequestCreateDBRequest, PayoutRequestDBResponse, PayoutStatus},
    },
    errors::{Error, Result},
    types::{PayoutRequestId, TransactionId, UserId, abbrev_uuid},
};

#[derive(Debug, Clone)]
pub struct PayoutInput {
    pub amount: Decimal,
    pub method: String,
    pub details: String,
}

/// Walk `candidates` in order, taking each one that still fits under `limit`.
///
/// Returns the chosen ids and their total, which never exceeds `limit`.
pub fn select_first_fit<I>(candidates: I, limit: Decimal) -> (Vec<TransactionId>, Decimal)
where
    I: IntoIterator<Item = (TransactionId, Decimal)>,
{
    let mut chosen = Vec::new();
    let mut total = Decimal::ZERO;
    for (id, amount) in candidates {
        if total + amount <= limit {
            total += amount;
            chosen.push(id);
        }
    }
    (chosen, total)
}

/// Sum of cash over the provider's unpaid transactions
pub async fn available_balance(db: &PgPool, provider_id: UserId) -> Result<Decimal> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;
    Ok(Transactions::new(&mut conn).available_balance(provider_id).await?)
}

fn not_found(id: PayoutRequestId) -> Error {
    Error::NotFound {
        resource: "Payout request".to_string(),
        id: id.to_string(),
    }
}

/// Create a payout request and attach unpaid transactions to it.
///
/// The provider's unpaid rows are locked for the duration, so two concurrent requests cannot
/// attach the same transaction. If no transaction fits under the requested amount the request
/// is refused and nothing is written.
#[instrument(skip(db, input), fields(provider_id = %abbrev_uuid(&provider_id), amount = %input.amount), err)]
pub async fn request_payout(db: &PgPool, provider_id: UserId, input: PayoutInput) -> Result<PayoutRequestDBResponse> {
    if input.amount <= Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Payout amount must be greater than zero".to_string(),
        });
    }
    if input.amount.normalize().scale() > 2 {
        return Err(Error::BadRequest {
            message: "Payout amount cannot have more than two decimal places".to_string(),
        });
    }
    let method = input.method.trim();
    if method.is_empty() {
        return Err(Error::BadRequest {
            message: "Payout method is required".to_string(),
        });
    }

    let mut tx = db.begin().await.map_err(DbError::from)?;

    let unpaid = Transactions::new(&mut tx).lock_unpaid(provider_id).await?;
    let available: Decimal = unpaid.iter().map(|t| t.amount_cash).sum();
    if input.amount > available {
        return Err(Error::BadRequest {
            message: format!("Requested amount {} exceeds available balance {}", input.amount, available),
        });
    }

    let (chosen, attached_amount) = select_first_fit(unpaid.iter().map(|t| (t.id, t.amount_cash)), input.amount);
    if chosen.is_empty() {
        return Err(Error::BadRequest {
            message: "No outstanding transactions fit within the requested amount".to_string(),
        });
    }

    let payout = Payouts::new(&mut tx)
        .create(&PayoutRequestCreateDBRequest {
            provider_id,
            amount: input.amount,
            attached_amount,
            method: method.to_string(),
            details: input.details.trim().to_string(),
        })
        .await?;

    let attached = Transactions::new(&mut tx).attach(&chosen, payout.id).await?;
    if attached != chosen.len() as u64 {
        // Rows are locked above, so this only happens if the lock was somehow bypassed
        return Err(Error::Internal {
            operation: format!("attach transactions to payout: expected {}, attached {attached}", chosen.len()),
        });
    }

    tx.commit().await.map_err(DbError::from)?;

    info!(
        payout_id = %abbrev_uuid(&payout.id),
        attached,
        attached_amount = %attached_amount,
        "Payout requested"
    );
    Ok(payout)
}

/// Mark a requested payout as paid out.
#[instrument(skip(db), fields(payout_id = %abbrev_uuid(&id)), err)]
pub async fn approve_payout(db: &PgPool, id: PayoutRequestId, admin_id: UserId) -> Result<PayoutRequestDBResponse> {
    let mut tx = db.begin().await.map_err(DbError::from)?;

    let payout = Payouts::new(&mut tx).get_for_update(id).await?.ok_or_else(|| not_found(id))?;
    ensure_requested(&payout)?;

    let payout = Payouts::new(&mut tx).finish(id, PayoutStatus::Completed, admin_id, None).await?;
    tx.commit().await.map_err(DbError::from)?;

    info!(amount = %payout.attached_amount, "Payout approved");
    Ok(payout)
}

/// Reject a requested payout and return its transactions to the unpaid pool.
#[instrument(skip(db, reason), fields(payout_id = %abbrev_uuid(&id)), err)]
pub async fn reject_payout(db: &PgPool, id: PayoutRequestId, admin_id: UserId, reason: &str) -> Result<PayoutRequestDBResponse> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(Error::BadRequest {
            message: "A rejection reason is required".to_string(),
        });
    }

    let mut tx = db.begin().await.map_err(DbError::from)?;

    let payout = Payouts::new(&mut tx).get_for_update(id).await?.ok_or_else(|| not_found(id))?;
    ensure_requested(&payout)?;

    let detached = Transactions::new(&mut tx).detach_all(id).await?;
    let payout = Payouts::new(&mut tx).finish(id, PayoutStatus::Rejected, admin_id, Some(reason)).await?;
    tx.commit().await.map_err(DbError::from)?;

    info!(detached, "Payout rejected");
    Ok(payout)
}

fn ensure_requested(payout: &PayoutRequestDBResponse) -> Result<()> {
    if payout.status != PayoutStatus::Requested {
        return Err(Error::InvalidState {
            message: format!("Payout request is {:?}; only requested payouts can be processed", payout.status),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::config::CreditsConfig;
    use crate::db::models::transactions::TransactionType;
    use crate::ledger::recorder::{ValueExchange, record_transaction};
    use crate::test_utils::create_test_user;
    use uuid::Uuid;

    fn cash(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    /// Record a transaction worth `credits` (0.10 each) owed to `provider`
    async fn earn(pool: &PgPool, provider: UserId, client: UserId, credits: i64) -> TransactionId {
        let mut conn = pool.acquire().await.unwrap();
        record_transaction(
            &mut conn,
            &CreditsConfig::default(),
            &ValueExchange {
                transaction_type: TransactionType::VodUnlock,
                amount_credits: credits,
                provider_id: provider,
                client_id: client,
                listing_id: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn input(amount: Decimal) -> PayoutInput {
        PayoutInput {
            amount,
            method: "iban".to_string(),
            details: "PT50 0000 0000 0000 0000 0000 0".to_string(),
        }
    }

    #[test]
    fn test_first_fit_skips_overflowing_rows() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let candidates = vec![(ids[0], cash(3000)), (ids[1], cash(4000)), (ids[2], cash(1500)), (ids[3], cash(500))];

        let (chosen, total) = select_first_fit(candidates, cash(5000));
        // 30 fits, 40 would overflow, 15 fits, 5 fits
        assert_eq!(chosen, vec![ids[0], ids[2], ids[3]]);
        assert_eq!(total, cash(5000));
    }

    #[test]
    fn test_first_fit_may_under_attach() {
        let ids: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let (chosen, total) = select_first_fit(vec![(ids[0], cash(3000)), (ids[1], cash(3000))], cash(5000));
        assert_eq!(chosen, vec![ids[0]]);
        assert_eq!(total, cash(3000));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_request_then_reject_restores_unpaid_pool(pool: PgPool) {
        let provider = create_test_user(&pool, Role::User).await;
        let client = create_test_user(&pool, Role::User).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        let first = earn(&pool, provider.id, client.id, 300).await;
        let second = earn(&pool, provider.id, client.id, 200).await;
        assert_eq!(available_balance(&pool, provider.id).await.unwrap(), cash(5000));

        let payout = request_payout(&pool, provider.id, input(cash(5000))).await.unwrap();
        assert_eq!(payout.status, PayoutStatus::Requested);
        assert_eq!(payout.attached_amount, cash(5000));
        assert_eq!(available_balance(&pool, provider.id).await.unwrap(), Decimal::ZERO);

        {
            let mut conn = pool.acquire().await.unwrap();
            let attached = Transactions::new(&mut conn).list_attached(payout.id).await.unwrap();
            let ids: Vec<_> = attached.iter().map(|t| t.id).collect();
            assert_eq!(ids, vec![first, second]);
        }

        let rejected = reject_payout(&pool, payout.id, admin.id, "invalid bank details").await.unwrap();
        assert_eq!(rejected.status, PayoutStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("invalid bank details"));
        assert_eq!(rejected.processed_by, Some(admin.id));

        let mut conn = pool.acquire().await.unwrap();
        let mut transactions = Transactions::new(&mut conn);
        for id in [first, second] {
            assert!(transactions.get_by_id(id).await.unwrap().unwrap().payout_request_id.is_none());
        }
        assert_eq!(transactions.available_balance(provider.id).await.unwrap(), cash(5000));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_approve_keeps_transactions_attached(pool: PgPool) {
        let provider = create_test_user(&pool, Role::User).await;
        let client = create_test_user(&pool, Role::User).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let earned = earn(&pool, provider.id, client.id, 100).await;

        let payout = request_payout(&pool, provider.id, input(cash(1000))).await.unwrap();
        let approved = approve_payout(&pool, payout.id, admin.id).await.unwrap();
        assert_eq!(approved.status, PayoutStatus::Completed);
        assert!(approved.processed_at.is_some());

        let mut conn = pool.acquire().await.unwrap();
        let transaction = Transactions::new(&mut conn).get_by_id(earned).await.unwrap().unwrap();
        assert_eq!(transaction.payout_request_id, Some(payout.id));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_terminal_requests_cannot_transition(pool: PgPool) {
        let provider = create_test_user(&pool, Role::User).await;
        let client = create_test_user(&pool, Role::User).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        earn(&pool, provider.id, client.id, 100).await;

        let payout = request_payout(&pool, provider.id, input(cash(1000))).await.unwrap();
        approve_payout(&pool, payout.id, admin.id).await.unwrap();

        assert!(matches!(approve_payout(&pool, payout.id, admin.id).await, Err(Error::InvalidState { .. })));
        assert!(matches!(
            reject_payout(&pool, payout.id, admin.id, "late").await,
            Err(Error::InvalidState { .. })
        ));

        // The completed request's transaction must stay attached
        assert_eq!(available_balance(&pool, provider.id).await.unwrap(), Decimal::ZERO);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_request_validation(pool: PgPool) {
        let provider = create_test_user(&pool, Role::User).await;
        let client = create_test_user(&pool, Role::User).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        earn(&pool, provider.id, client.id, 300).await;

        for amount in [Decimal::ZERO, cash(-100), cash(3001), Decimal::new(1001, 3)] {
            let result = request_payout(&pool, provider.id, input(amount)).await;
            assert!(matches!(result, Err(Error::BadRequest { .. })), "amount {amount}");
        }

        // 10.00 is available but the only row is 30.00, so nothing fits
        let result = request_payout(&pool, provider.id, input(cash(1000))).await;
        assert!(matches!(result, Err(Error::BadRequest { .. })));

        let missing = Uuid::new_v4();
        assert!(matches!(approve_payout(&pool, missing, admin.id).await, Err(Error::NotFound { .. })));
        assert!(matches!(
            reject_payout(&pool, missing, admin.id, "  ").await,
            Err(Error::BadRequest { .. })
        ));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_partial_attachment_is_recorded(pool: PgPool) {
        let provider = create_test_user(&pool, Role::User).await;
        let client = create_test_user(&pool, Role::User).await;
        earn(&pool, provider.id, client.id, 300).await;
        earn(&pool, provider.id, client.id, 300).await;

        let payout = request_payout(&pool, provider.id, input(cash(5000))).await.unwrap();
        assert_eq!(payout.amount, cash(5000));
        assert_eq!(payout.attached_amount, cash(3000));
        assert_eq!(available_balance(&pool, provider.id).await.unwrap(), cash(3000));
    }
}
