//! Turning confirmed external payments into local state.
//!
//! Checkouts are created `PENDING` when the buyer is sent to the payment processor. A verified
//! webhook event (or a one-click charge that settled synchronously) completes them here. The
//! checkout row is locked for the whole reconciliation and only a `PENDING` checkout does
//! anything, so duplicate deliveries are no-ops.
//!
//! Business rejections (sold-out contest, guest without an account) mark the checkout
//! `DISCARDED` and still count as handled: the processor must not retry them.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};

use crate::{
    config::Config,
    contests::{ContestResolution, notify_winner, resolve_locked},
    db::{
        errors::DbError,
        handlers::{Checkouts, Contests, Listings, Subscriptions, Users},
        models::{
            checkouts::{CheckoutDBResponse, CheckoutKind, CheckoutStatus},
            contests::ContestStatus,
            credits::CreditTransactionType,
            subscriptions::SubscriptionUpsertDBRequest,
        },
    },
    errors::{Error, Result},
    ledger::{
        self,
        boosts::{BoostTarget, BoostTerms, catalog_entry, insert_boost},
    },
    payment_providers::{PaymentEventType, WebhookEvent},
    types::{UserId, abbrev_uuid},
};

/// What happened to a payment event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    Completed(CheckoutKind),
    Discarded { reason: String },
    /// The checkout was already completed or discarded
    AlreadyProcessed,
    /// No checkout carries this payment reference
    UnknownReference,
    /// Event type this service does not act on
    Ignored,
}

/// Side effects that must wait until the reconciliation has committed
#[derive(Default)]
struct AfterCommit {
    resolution: Option<ContestResolution>,
}

enum Outcome {
    Completed,
    Discarded(String),
}

/// Dispatch a verified webhook event
#[instrument(skip(db, config, event), fields(event_type = ?event.event_type, reference = %event.data.payment_id), err)]
pub async fn handle_event(db: &PgPool, config: &Config, event: &WebhookEvent) -> Result<Reconciled> {
    match event.event_type {
        PaymentEventType::PaymentCompleted => complete_payment(db, config, &event.data.payment_id, event.data.current_period_end).await,
        PaymentEventType::PaymentFailed => {
            let reason = event.data.failure_reason.as_deref().unwrap_or("payment failed");
            fail_payment(db, &event.data.payment_id, reason).await
        }
        PaymentEventType::SubscriptionRenewed => renew_subscription(db, config, &event.data.payment_id, event.data.current_period_end).await,
        PaymentEventType::Unknown => Ok(Reconciled::Ignored),
    }
}

/// Complete the checkout carrying `reference`
#[instrument(skip(db, config), err)]
pub async fn complete_payment(db: &PgPool, config: &Config, reference: &str, period_end: Option<DateTime<Utc>>) -> Result<Reconciled> {
    let mut tx = db.begin().await.map_err(DbError::from)?;

    let Some(checkout) = Checkouts::new(&mut tx).get_by_reference_for_update(reference).await? else {
        warn!("Payment event for unknown checkout");
        return Ok(Reconciled::UnknownReference);
    };
    if checkout.status != CheckoutStatus::Pending {
        info!(status = ?checkout.status, "Checkout already processed");
        return Ok(Reconciled::AlreadyProcessed);
    }

    let mut after = AfterCommit::default();
    let outcome = match checkout.kind {
        CheckoutKind::Credits => fulfil_credits(&mut tx, &checkout).await?,
        CheckoutKind::Subscription => fulfil_subscription(&mut tx, config, &checkout, period_end).await?,
        CheckoutKind::Turbo => fulfil_turbo(&mut tx, config, &checkout).await?,
        CheckoutKind::ContestEntry => fulfil_contest_entry(&mut tx, config, &checkout, &mut after).await?,
    };

    let result = match outcome {
        Outcome::Completed => {
            Checkouts::new(&mut tx).finish(checkout.id, CheckoutStatus::Completed, None).await?;
            info!(checkout_id = %abbrev_uuid(&checkout.id), kind = ?checkout.kind, "Checkout completed");
            Reconciled::Completed(checkout.kind)
        }
        Outcome::Discarded(reason) => {
            Checkouts::new(&mut tx).finish(checkout.id, CheckoutStatus::Discarded, Some(&reason)).await?;
            warn!(checkout_id = %abbrev_uuid(&checkout.id), kind = ?checkout.kind, %reason, "Paid checkout discarded");
            Reconciled::Discarded { reason }
        }
    };

    tx.commit().await.map_err(DbError::from)?;

    if let Some(resolution) = after.resolution {
        notify_winner(db, config, &resolution).await;
    }
    Ok(result)
}

/// Mark a checkout whose payment failed as discarded
#[instrument(skip(db), err)]
pub async fn fail_payment(db: &PgPool, reference: &str, reason: &str) -> Result<Reconciled> {
    let mut tx = db.begin().await.map_err(DbError::from)?;

    let Some(checkout) = Checkouts::new(&mut tx).get_by_reference_for_update(reference).await? else {
        return Ok(Reconciled::UnknownReference);
    };
    if checkout.status != CheckoutStatus::Pending {
        return Ok(Reconciled::AlreadyProcessed);
    }

    Checkouts::new(&mut tx).finish(checkout.id, CheckoutStatus::Discarded, Some(reason)).await?;
    tx.commit().await.map_err(DbError::from)?;

    info!(checkout_id = %abbrev_uuid(&checkout.id), "Checkout payment failed");
    Ok(Reconciled::Discarded { reason: reason.to_string() })
}

/// Extend a subscription for another period. A renewal that overtakes the initial payment event
/// completes the original checkout as well.
#[instrument(skip(db, config), err)]
pub async fn renew_subscription(db: &PgPool, config: &Config, subscription_id: &str, period_end: Option<DateTime<Utc>>) -> Result<Reconciled> {
    let mut tx = db.begin().await.map_err(DbError::from)?;

    let Some(checkout) = Checkouts::new(&mut tx).get_by_reference_for_update(subscription_id).await? else {
        warn!("Renewal for unknown subscription");
        return Ok(Reconciled::UnknownReference);
    };
    if checkout.kind != CheckoutKind::Subscription {
        return Err(Error::BadRequest {
            message: "Renewal event does not reference a subscription".to_string(),
        });
    }

    match fulfil_subscription(&mut tx, config, &checkout, period_end).await? {
        Outcome::Completed => {
            if checkout.status == CheckoutStatus::Pending {
                Checkouts::new(&mut tx).finish(checkout.id, CheckoutStatus::Completed, None).await?;
            }
            tx.commit().await.map_err(DbError::from)?;
            Ok(Reconciled::Completed(CheckoutKind::Subscription))
        }
        Outcome::Discarded(reason) => {
            warn!(%reason, "Subscription renewal not applied");
            Ok(Reconciled::Discarded { reason })
        }
    }
}

/// The account a checkout pays for: the session user, else an account matching the guest email
async fn buyer(conn: &mut PgConnection, checkout: &CheckoutDBResponse) -> Result<Option<UserId>> {
    if let Some(user_id) = checkout.user_id {
        return Ok(Some(user_id));
    }
    let user = Users::new(conn).get_user_by_email(&checkout.email).await?;
    Ok(user.map(|u| u.id))
}

async fn fulfil_credits(conn: &mut PgConnection, checkout: &CheckoutDBResponse) -> Result<Outcome> {
    let Some(user_id) = buyer(&mut *conn, checkout).await? else {
        return Ok(Outcome::Discarded(format!("no account for {}", checkout.email)));
    };

    let balance = ledger::credit(
        conn,
        user_id,
        checkout.credits,
        CreditTransactionType::Purchase,
        Some(format!("Credit package: {}", checkout.item_key)),
        Some(checkout.payment_reference.clone()),
    )
    .await?;

    info!(user_id = %abbrev_uuid(&user_id), credits = checkout.credits, balance, "Credits purchased");
    Ok(Outcome::Completed)
}

async fn fulfil_subscription(
    conn: &mut PgConnection,
    config: &Config,
    checkout: &CheckoutDBResponse,
    period_end: Option<DateTime<Utc>>,
) -> Result<Outcome> {
    let Some(user_id) = buyer(&mut *conn, checkout).await? else {
        return Ok(Outcome::Discarded(format!("no account for {}", checkout.email)));
    };

    let period_end = match (period_end, config.subscriptions.plans.get(&checkout.item_key)) {
        (Some(end), _) => end,
        (None, Some(plan)) => Utc::now() + ChronoDuration::days(plan.interval_days),
        (None, None) => return Ok(Outcome::Discarded(format!("unknown plan '{}'", checkout.item_key))),
    };

    Subscriptions::new(&mut *conn)
        .upsert(&SubscriptionUpsertDBRequest {
            user_id,
            plan: checkout.item_key.clone(),
            provider_subscription_id: checkout.payment_reference.clone(),
            current_period_end: period_end,
        })
        .await?;
    let pro_until = Users::new(conn).extend_pro_until(user_id, period_end).await?;

    info!(user_id = %abbrev_uuid(&user_id), %pro_until, "Subscription active");
    Ok(Outcome::Completed)
}

async fn fulfil_turbo(conn: &mut PgConnection, config: &Config, checkout: &CheckoutDBResponse) -> Result<Outcome> {
    let Some(listing_id) = checkout.listing_id else {
        return Ok(Outcome::Discarded("turbo checkout without a listing".to_string()));
    };
    let Ok(boost_type) = catalog_entry(&config.boosts, &checkout.item_key) else {
        return Ok(Outcome::Discarded(format!("unknown boost type '{}'", checkout.item_key)));
    };
    let Some(listing) = Listings::new(&mut *conn).get_by_id(listing_id).await? else {
        return Ok(Outcome::Discarded("listing no longer exists".to_string()));
    };

    let terms = BoostTerms {
        // paid in cash
        price_credits: 0,
        duration_days: boost_type.duration_days,
    };
    let purchased_by = checkout.user_id.unwrap_or(listing.owner_id);
    let boost = insert_boost(conn, &checkout.item_key, BoostTarget::Listing(listing_id), purchased_by, terms, Some(listing.category)).await?;

    info!(boost_id = %abbrev_uuid(&boost.id), listing_id = %abbrev_uuid(&listing_id), "Turbo boost applied");
    Ok(Outcome::Completed)
}

/// Re-checks the contest under its row lock: concurrent deliveries for the same contest
/// serialise here, so the slot count can never be exceeded.
async fn fulfil_contest_entry(conn: &mut PgConnection, config: &Config, checkout: &CheckoutDBResponse, after: &mut AfterCommit) -> Result<Outcome> {
    let (Some(contest_id), Some(participant_id)) = (checkout.contest_id, checkout.user_id) else {
        return Ok(Outcome::Discarded("contest checkout without contest or participant".to_string()));
    };

    let mut contests = Contests::new(&mut *conn);
    let Some(contest) = contests.get_for_update(contest_id).await? else {
        return Ok(Outcome::Discarded("contest no longer exists".to_string()));
    };
    if contest.status != ContestStatus::Open {
        return Ok(Outcome::Discarded("contest already resolved".to_string()));
    }

    let sold = contests.count_entries(contest_id).await?;
    if sold >= i64::from(contest.total_slots) {
        return Ok(Outcome::Discarded("contest sold out".to_string()));
    }
    if contests
        .insert_entry(contest_id, participant_id, &checkout.payment_reference)
        .await?
        .is_none()
    {
        return Ok(Outcome::Discarded("participant already entered".to_string()));
    }

    info!(contest_id = %abbrev_uuid(&contest_id), slot = sold + 1, total = contest.total_slots, "Contest entry confirmed");

    if sold + 1 == i64::from(contest.total_slots) && config.contests.auto_resolve_when_sold_out {
        after.resolution = Some(resolve_locked(conn, &contest).await?);
    }
    Ok(Outcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::db::handlers::{Boosts, Credits, Repository};
    use crate::db::models::{checkouts::CheckoutCreateDBRequest, contests::ContestCreateDBRequest, listings::ListingCreateDBRequest};
    use crate::payment_providers::PaymentEventData;
    use crate::test_utils::{create_test_config, create_test_user};
    use crate::types::{ContestId, Locale};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn checkout(kind: CheckoutKind, item_key: &str, user_id: Option<UserId>, email: &str) -> CheckoutCreateDBRequest {
        CheckoutCreateDBRequest {
            kind,
            item_key: item_key.to_string(),
            amount: Decimal::new(1000, 2),
            credits: 0,
            user_id,
            email: email.to_string(),
            listing_id: None,
            contest_id: None,
            payment_reference: format!("pay_{}", Uuid::new_v4()),
        }
    }

    async fn insert(pool: &PgPool, request: CheckoutCreateDBRequest) -> CheckoutDBResponse {
        let mut conn = pool.acquire().await.unwrap();
        Checkouts::new(&mut conn).create(&request).await.unwrap()
    }

    fn completed(reference: &str) -> WebhookEvent {
        WebhookEvent {
            event_type: PaymentEventType::PaymentCompleted,
            data: PaymentEventData {
                payment_id: reference.to_string(),
                current_period_end: None,
                failure_reason: None,
            },
        }
    }

    async fn create_contest(pool: &PgPool, creator: UserId, total_slots: i32) -> ContestId {
        let mut conn = pool.acquire().await.unwrap();
        Contests::new(&mut conn)
            .create(&ContestCreateDBRequest {
                creator_id: creator,
                title: "Sorteio".to_string(),
                description: String::new(),
                prize: "Bicicleta".to_string(),
                total_slots,
                slot_price: Decimal::new(300, 2),
            })
            .await
            .unwrap()
            .id
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_credits_webhook_is_idempotent(pool: PgPool) {
        let config = create_test_config();
        let user = create_test_user(&pool, Role::User).await;
        let checkout = insert(
            &pool,
            CheckoutCreateDBRequest {
                credits: 500,
                ..checkout(CheckoutKind::Credits, "standard", Some(user.id), &user.email)
            },
        )
        .await;

        let first = handle_event(&pool, &config, &completed(&checkout.payment_reference)).await.unwrap();
        assert_eq!(first, Reconciled::Completed(CheckoutKind::Credits));
        let second = handle_event(&pool, &config, &completed(&checkout.payment_reference)).await.unwrap();
        assert_eq!(second, Reconciled::AlreadyProcessed);

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(Credits::new(&mut conn).balance(user.id).await.unwrap(), 500);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_guest_credits_matched_by_email_or_discarded(pool: PgPool) {
        let config = create_test_config();
        let user = create_test_user(&pool, Role::User).await;

        let matched = insert(
            &pool,
            CheckoutCreateDBRequest {
                credits: 100,
                ..checkout(CheckoutKind::Credits, "starter", None, &user.email.to_uppercase())
            },
        )
        .await;
        let result = complete_payment(&pool, &config, &matched.payment_reference, None).await.unwrap();
        assert_eq!(result, Reconciled::Completed(CheckoutKind::Credits));

        let orphan = insert(
            &pool,
            CheckoutCreateDBRequest {
                credits: 100,
                ..checkout(CheckoutKind::Credits, "starter", None, "nobody@example.com")
            },
        )
        .await;
        let result = complete_payment(&pool, &config, &orphan.payment_reference, None).await.unwrap();
        assert!(matches!(result, Reconciled::Discarded { .. }));

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(Credits::new(&mut conn).balance(user.id).await.unwrap(), 100);
        let orphan = Checkouts::new(&mut conn).get_by_reference(&orphan.payment_reference).await.unwrap().unwrap();
        assert_eq!(orphan.status, CheckoutStatus::Discarded);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_contest_entry_idempotent_and_slot_bounded(pool: PgPool) {
        let mut config = create_test_config();
        config.contests.auto_resolve_when_sold_out = false;
        let creator = create_test_user(&pool, Role::User).await;
        let first = create_test_user(&pool, Role::User).await;
        let second = create_test_user(&pool, Role::User).await;
        let contest_id = create_contest(&pool, creator.id, 1).await;

        let entry = |user: &crate::db::models::users::UserDBResponse| CheckoutCreateDBRequest {
            contest_id: Some(contest_id),
            ..checkout(CheckoutKind::ContestEntry, "entry", Some(user.id), &user.email)
        };
        let a = insert(&pool, entry(&first)).await;
        let b = insert(&pool, entry(&second)).await;

        let event = completed(&a.payment_reference);
        assert_eq!(
            handle_event(&pool, &config, &event).await.unwrap(),
            Reconciled::Completed(CheckoutKind::ContestEntry)
        );
        assert_eq!(handle_event(&pool, &config, &event).await.unwrap(), Reconciled::AlreadyProcessed);

        let late = handle_event(&pool, &config, &completed(&b.payment_reference)).await.unwrap();
        assert_eq!(
            late,
            Reconciled::Discarded {
                reason: "contest sold out".to_string()
            }
        );

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(Contests::new(&mut conn).count_entries(contest_id).await.unwrap(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_concurrent_contest_entries_respect_slot_bound(pool: PgPool) {
        let config = create_test_config();
        let creator = create_test_user(&pool, Role::User).await;
        let contest_id = create_contest(&pool, creator.id, 3).await;

        let mut references = Vec::new();
        for _ in 0..12 {
            let participant = create_test_user(&pool, Role::User).await;
            let request = CheckoutCreateDBRequest {
                contest_id: Some(contest_id),
                ..checkout(CheckoutKind::ContestEntry, "entry", Some(participant.id), &participant.email)
            };
            references.push(insert(&pool, request).await.payment_reference);
        }

        // every payment is delivered twice, all at once
        let mut handles = Vec::new();
        for reference in references.iter().chain(references.iter()) {
            let pool = pool.clone();
            let config = config.clone();
            let event = completed(reference);
            handles.push(tokio::spawn(async move { handle_event(&pool, &config, &event).await }));
        }

        let mut completed_entries = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(Reconciled::Completed(CheckoutKind::ContestEntry)) => completed_entries += 1,
                Ok(_) => {}
                Err(e) => panic!("delivery failed: {e}"),
            }
        }
        assert_eq!(completed_entries, 3);

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(Contests::new(&mut conn).count_entries(contest_id).await.unwrap(), 3);
        let contest = Contests::new(&mut conn).get_by_id(contest_id).await.unwrap().unwrap();
        assert_eq!(contest.status, ContestStatus::Resolved);
        for reference in &references {
            let checkout = Checkouts::new(&mut conn).get_by_reference(reference).await.unwrap().unwrap();
            assert_ne!(checkout.status, CheckoutStatus::Pending);
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_last_slot_auto_resolves(pool: PgPool) {
        let config = create_test_config();
        let creator = create_test_user(&pool, Role::User).await;
        let participant = create_test_user(&pool, Role::User).await;
        let contest_id = create_contest(&pool, creator.id, 1).await;

        let request = CheckoutCreateDBRequest {
            contest_id: Some(contest_id),
            ..checkout(CheckoutKind::ContestEntry, "entry", Some(participant.id), &participant.email)
        };
        let checkout = insert(&pool, request).await;
        complete_payment(&pool, &config, &checkout.payment_reference, None).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let contest = Contests::new(&mut conn).get_by_id(contest_id).await.unwrap().unwrap();
        assert_eq!(contest.status, ContestStatus::Resolved);
        let winner = Contests::new(&mut conn).winner(contest_id).await.unwrap().unwrap();
        assert_eq!(winner.participant_id, participant.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_subscription_and_renewal_extend_pro(pool: PgPool) {
        let config = create_test_config();
        let user = create_test_user(&pool, Role::User).await;
        let checkout = insert(&pool, checkout(CheckoutKind::Subscription, "pro_monthly", Some(user.id), &user.email)).await;

        complete_payment(&pool, &config, &checkout.payment_reference, None).await.unwrap();

        let renewed_until = Utc::now() + ChronoDuration::days(60);
        let renewal = WebhookEvent {
            event_type: PaymentEventType::SubscriptionRenewed,
            data: PaymentEventData {
                payment_id: checkout.payment_reference.clone(),
                current_period_end: Some(renewed_until),
                failure_reason: None,
            },
        };
        assert_eq!(
            handle_event(&pool, &config, &renewal).await.unwrap(),
            Reconciled::Completed(CheckoutKind::Subscription)
        );

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_by_id(user.id).await.unwrap().unwrap();
        let pro_until = user.pro_until.unwrap();
        assert!((pro_until - renewed_until).num_seconds().abs() < 1);
        assert_eq!(Subscriptions::new(&mut conn).list_for_user(user.id).await.unwrap().len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_turbo_creates_cash_boost(pool: PgPool) {
        let config = create_test_config();
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let listing = Listings::new(&mut conn)
            .create(&ListingCreateDBRequest {
                owner_id: owner.id,
                title: "Bicicleta".to_string(),
                description: String::new(),
                price: None,
                category: "desporto".to_string(),
                locale: Locale::Pt,
            })
            .await
            .unwrap();

        let checkout = insert(
            &pool,
            CheckoutCreateDBRequest {
                listing_id: Some(listing.id),
                ..checkout(CheckoutKind::Turbo, "top", Some(owner.id), &owner.email)
            },
        )
        .await;
        complete_payment(&pool, &config, &checkout.payment_reference, None).await.unwrap();

        let boosts = Boosts::new(&mut conn).list_live_for_listing(listing.id).await.unwrap();
        assert_eq!(boosts.len(), 1);
        assert_eq!(boosts[0].price_credits, 0);
        assert_eq!(boosts[0].category.as_deref(), Some("desporto"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_failed_and_unknown_events(pool: PgPool) {
        let config = create_test_config();
        let user = create_test_user(&pool, Role::User).await;
        let checkout = insert(&pool, checkout(CheckoutKind::Credits, "starter", Some(user.id), &user.email)).await;

        let failed = WebhookEvent {
            event_type: PaymentEventType::PaymentFailed,
            data: PaymentEventData {
                payment_id: checkout.payment_reference.clone(),
                current_period_end: None,
                failure_reason: Some("card declined".to_string()),
            },
        };
        assert!(matches!(handle_event(&pool, &config, &failed).await.unwrap(), Reconciled::Discarded { .. }));
        assert_eq!(
            handle_event(&pool, &config, &completed(&checkout.payment_reference)).await.unwrap(),
            Reconciled::AlreadyProcessed
        );
        assert_eq!(
            handle_event(&pool, &config, &completed("pay_missing")).await.unwrap(),
            Reconciled::UnknownReference
        );
    }
}
