//! Credits and money accounting.
//!
//! Everything that changes a credit balance or records money owed to a provider goes through
//! this module. Each operation takes the caller's connection so the balance change and the
//! record that explains it commit or roll back together.
//!
//! - [`debit`] / [`credit`]: balance primitives with an audit record
//! - [`recorder`]: immutable value-movement records with the cash split
//! - [`payouts`]: provider balance, payout requests and their approval lifecycle
//! - [`boosts`]: boost purchases and expiry
//! - [`unlocks`]: premium video unlocks

pub mod boosts;
pub mod payouts;
pub mod recorder;
pub mod unlocks;

use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::PgConnection;
use tracing::{debug, instrument};

use crate::{
    config::CreditsConfig,
    db::{
        handlers::Credits,
        models::credits::{CreditTransactionCreateDBRequest, CreditTransactionType},
    },
    errors::{Error, Result},
    types::{UserId, abbrev_uuid},
};

/// Round a cash amount to cents, halves away from zero
pub fn round_cash(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// How the cash value of a credit spend divides between platform and provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CashSplit {
    pub amount_cash: Decimal,
    pub platform_fee: Decimal,
    pub provider_amount: Decimal,
}

impl CashSplit {
    /// `provider_amount` is derived by subtraction so the three always add up exactly.
    pub fn compute(amount_credits: i64, rates: &CreditsConfig) -> Self {
        let amount_cash = round_cash(Decimal::from(amount_credits) * rates.credit_to_cash_rate);
        let platform_fee = round_cash(amount_cash * rates.platform_fee_rate);
        Self {
            amount_cash,
            platform_fee,
            provider_amount: amount_cash - platform_fee,
        }
    }
}

/// Remove credits from a user's balance and append the audit record.
///
/// The balance check is the `WHERE credits >= amount` of the update itself, so two concurrent
/// debits can never both pass on a balance that only covers one.
#[instrument(skip(conn, description), fields(user_id = %abbrev_uuid(&user_id), kind = ?kind), err)]
pub async fn debit(conn: &mut PgConnection, user_id: UserId, amount: i64, kind: CreditTransactionType, description: Option<String>) -> Result<i64> {
    if amount <= 0 {
        return Err(Error::BadRequest {
            message: "Debit amount must be positive".to_string(),
        });
    }

    let balance = Credits::new(&mut *conn)
        .try_debit(user_id, amount)
        .await?
        .ok_or(Error::InsufficientCredits { required: amount })?;

    Credits::new(&mut *conn)
        .record(&CreditTransactionCreateDBRequest {
            user_id,
            transaction_type: kind,
            amount: -amount,
            balance_after: balance,
            description,
            payment_reference: None,
        })
        .await?;

    debug!(amount, balance, "Debited credits");
    Ok(balance)
}

/// Add credits to a user's balance and append the audit record.
///
/// With a `payment_reference` the audit insert is unique per reference, which is what makes a
/// replayed purchase webhook fail instead of crediting twice.
#[instrument(skip(conn, description, payment_reference), fields(user_id = %abbrev_uuid(&user_id), kind = ?kind), err)]
pub async fn credit(
    conn: &mut PgConnection,
    user_id: UserId,
    amount: i64,
    kind: CreditTransactionType,
    description: Option<String>,
    payment_reference: Option<String>,
) -> Result<i64> {
    if amount <= 0 {
        return Err(Error::BadRequest {
            message: "Credit amount must be positive".to_string(),
        });
    }

    let balance = Credits::new(&mut *conn).credit(user_id, amount).await?;

    Credits::new(&mut *conn)
        .record(&CreditTransactionCreateDBRequest {
            user_id,
            transaction_type: kind,
            amount,
            balance_after: balance,
            description,
            payment_reference,
        })
        .await?;

    debug!(amount, balance, "Credited credits");
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::test_utils::create_test_user;
    use sqlx::PgPool;

    #[test]
    fn test_cash_split_default_rates() {
        let split = CashSplit::compute(200, &CreditsConfig::default());
        assert_eq!(split.amount_cash, Decimal::new(2000, 2));
        assert_eq!(split.platform_fee, Decimal::new(400, 2));
        assert_eq!(split.provider_amount, Decimal::new(1600, 2));
    }

    #[test]
    fn test_cash_split_rounds_to_cents() {
        // 7 credits = 0.70, 20% fee = 0.14
        let split = CashSplit::compute(7, &CreditsConfig::default());
        assert_eq!(split.amount_cash, Decimal::new(70, 2));
        assert_eq!(split.platform_fee, Decimal::new(14, 2));
        assert_eq!(split.provider_amount, Decimal::new(56, 2));

        // 0.15 fee on 0.10 is 0.015, rounds half away from zero
        let rates = CreditsConfig {
            platform_fee_rate: Decimal::new(15, 2),
            ..Default::default()
        };
        let split = CashSplit::compute(1, &rates);
        assert_eq!(split.platform_fee, Decimal::new(2, 2));
        assert_eq!(split.amount_cash, split.platform_fee + split.provider_amount);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_debit_insufficient_leaves_balance_and_trail_untouched(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        let mut tx = pool.begin().await.unwrap();
        credit(&mut tx, user.id, 100, CreditTransactionType::AdminGrant, None, None).await.unwrap();

        let err = debit(&mut tx, user.id, 150, CreditTransactionType::BoostPurchase, None).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientCredits { required: 150 }));

        let mut credits = Credits::new(&mut tx);
        assert_eq!(credits.balance(user.id).await.unwrap(), 100);
        assert_eq!(credits.count_user_transactions(user.id).await.unwrap(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_audit_records_carry_signed_amounts(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        let mut tx = pool.begin().await.unwrap();

        credit(&mut tx, user.id, 500, CreditTransactionType::Purchase, None, Some("pay_1".into())).await.unwrap();
        let balance = debit(&mut tx, user.id, 200, CreditTransactionType::VodUnlock, None).await.unwrap();
        assert_eq!(balance, 300);

        let records = Credits::new(&mut tx).list_user_transactions(user.id, 0, 10).await.unwrap();
        let amounts: Vec<(i64, i64)> = records.iter().map(|r| (r.amount, r.balance_after)).collect();
        assert!(amounts.contains(&(500, 500)));
        assert!(amounts.contains(&(-200, 300)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_non_positive_amounts_rejected(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();

        assert!(matches!(
            debit(&mut conn, user.id, 0, CreditTransactionType::ListingFee, None).await,
            Err(Error::BadRequest { .. })
        ));
        assert!(matches!(
            credit(&mut conn, user.id, -5, CreditTransactionType::AdminGrant, None, None).await,
            Err(Error::BadRequest { .. })
        ));
    }
}
