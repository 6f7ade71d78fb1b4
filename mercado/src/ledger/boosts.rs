//! Visibility boosts.
//!
//! A boost is bought with credits (or with cash through the turbo checkout) and lasts for a
//! fixed number of days. It counts as active while its flag is set and its end date is in the
//! future; [`run_expiry_sweep`] clears the flag on elapsed boosts in the background so the
//! stored flag converges with the live check.

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::{PgConnection, PgPool};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use super::debit;
use crate::{
    config::{BoostTypeConfig, BoostsConfig},
    db::{
        errors::DbError,
        handlers::{BlogPosts, Boosts, Listings},
        models::{
            boosts::{BoostCreateDBRequest, BoostDBResponse},
            credits::CreditTransactionType,
        },
    },
    errors::{Error, Result},
    types::{BlogPostId, ListingId, UserId, abbrev_uuid},
};

/// What a boost amplifies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostTarget {
    Listing(ListingId),
    BlogPost(BlogPostId),
    /// The purchasing user's own profile
    Profile,
}

/// Price and length of a boost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoostTerms {
    pub price_credits: i64,
    pub duration_days: i64,
}

impl From<&BoostTypeConfig> for BoostTerms {
    fn from(config: &BoostTypeConfig) -> Self {
        Self {
            price_credits: config.price_credits,
            duration_days: config.duration_days,
        }
    }
}

/// Look up a boost type in the catalog
pub fn catalog_entry<'a>(catalog: &'a BoostsConfig, boost_type: &str) -> Result<&'a BoostTypeConfig> {
    catalog.types.get(boost_type).ok_or_else(|| Error::BadRequest {
        message: format!("Unknown boost type '{boost_type}'"),
    })
}

#[derive(Debug, Clone)]
pub struct BoostPurchase {
    pub boost: BoostDBResponse,
    pub balance: i64,
}

/// Check the buyer owns the target. Returns the listing category, which scopes listing boosts.
async fn authorize_target(conn: &mut PgConnection, buyer: UserId, target: BoostTarget) -> Result<Option<String>> {
    match target {
        BoostTarget::Listing(id) => {
            let listing = Listings::new(conn).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
                resource: "Listing".to_string(),
                id: id.to_string(),
            })?;
            if listing.owner_id != buyer {
                return Err(Error::InsufficientPermissions {
                    action: "boost".to_string(),
                    resource: "a listing you do not own".to_string(),
                });
            }
            Ok(Some(listing.category))
        }
        BoostTarget::BlogPost(id) => {
            let post = BlogPosts::new(conn).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
                resource: "Blog post".to_string(),
                id: id.to_string(),
            })?;
            if post.owner_id != buyer {
                return Err(Error::InsufficientPermissions {
                    action: "boost".to_string(),
                    resource: "a blog post you do not own".to_string(),
                });
            }
            Ok(None)
        }
        BoostTarget::Profile => Ok(None),
    }
}

/// Insert a boost starting now. Used for both credit and cash purchases.
pub(crate) async fn insert_boost(
    conn: &mut PgConnection,
    boost_type: &str,
    target: BoostTarget,
    purchased_by: UserId,
    terms: BoostTerms,
    category: Option<String>,
) -> Result<BoostDBResponse> {
    if terms.duration_days <= 0 {
        return Err(Error::BadRequest {
            message: "Boost duration must be at least one day".to_string(),
        });
    }

    let start_date = Utc::now();
    let end_date = start_date + ChronoDuration::days(terms.duration_days);
    let (listing_id, blog_post_id, user_id) = match target {
        BoostTarget::Listing(id) => (Some(id), None, None),
        BoostTarget::BlogPost(id) => (None, Some(id), None),
        BoostTarget::Profile => (None, None, Some(purchased_by)),
    };

    let boost = Boosts::new(conn)
        .create(&BoostCreateDBRequest {
            boost_type: boost_type.to_string(),
            listing_id,
            blog_post_id,
            user_id,
            purchased_by,
            price_credits: terms.price_credits,
            category,
            start_date,
            end_date,
        })
        .await?;

    Ok(boost)
}

/// Buy a boost with credits.
///
/// The debit and the boost insert share one transaction: either the user pays and the boost
/// exists, or neither happens.
#[instrument(skip(db), fields(buyer = %abbrev_uuid(&buyer)), err)]
pub async fn purchase_boost(db: &PgPool, buyer: UserId, boost_type: &str, target: BoostTarget, terms: BoostTerms) -> Result<BoostPurchase> {
    if terms.price_credits <= 0 {
        return Err(Error::BadRequest {
            message: "Boost price must be positive".to_string(),
        });
    }

    let mut tx = db.begin().await.map_err(DbError::from)?;

    let category = authorize_target(&mut tx, buyer, target).await?;
    let balance = debit(
        &mut tx,
        buyer,
        terms.price_credits,
        CreditTransactionType::BoostPurchase,
        Some(format!("{boost_type} boost for {} days", terms.duration_days)),
    )
    .await?;
    let boost = insert_boost(&mut tx, boost_type, target, buyer, terms, category).await?;

    tx.commit().await.map_err(DbError::from)?;

    info!(boost_id = %abbrev_uuid(&boost.id), balance, "Boost purchased");
    Ok(BoostPurchase { boost, balance })
}

/// Clear the active flag on every elapsed boost
pub async fn expire_boosts(db: &PgPool) -> Result<u64> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;
    Ok(Boosts::new(&mut conn).expire_elapsed().await?)
}

/// Periodically expire boosts until `shutdown` is cancelled
pub async fn run_expiry_sweep(db: PgPool, interval: Duration, shutdown: CancellationToken) {
    info!(interval = ?interval, "Starting boost expiry sweep");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Boost expiry sweep shutting down");
                break;
            }
            _ = ticker.tick() => {
                match expire_boosts(&db).await {
                    Ok(0) => debug!("No boosts expired"),
                    Ok(expired) => info!(expired, "Expired boosts"),
                    Err(e) => error!("Boost expiry sweep failed: {e}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::db::handlers::Credits;
    use crate::db::models::listings::ListingCreateDBRequest;
    use crate::ledger::credit;
    use crate::test_utils::create_test_user;
    use crate::types::Locale;

    const TERMS: BoostTerms = BoostTerms {
        price_credits: 150,
        duration_days: 7,
    };

    async fn fund(pool: &PgPool, user: UserId, amount: i64) {
        let mut conn = pool.acquire().await.unwrap();
        credit(&mut conn, user, amount, CreditTransactionType::AdminGrant, None, None).await.unwrap();
    }

    async fn balance(pool: &PgPool, user: UserId) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        Credits::new(&mut conn).balance(user).await.unwrap()
    }

    async fn create_listing(pool: &PgPool, owner: UserId) -> ListingId {
        let mut conn = pool.acquire().await.unwrap();
        Listings::new(&mut conn)
            .create(&ListingCreateDBRequest {
                owner_id: owner,
                title: "Guitarra".to_string(),
                description: String::new(),
                price: None,
                category: "musica".to_string(),
                locale: Locale::Pt,
            })
            .await
            .unwrap()
            .id
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_insufficient_credits_leaves_balance_unchanged(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        fund(&pool, user.id, 100).await;

        let result = purchase_boost(&pool, user.id, "top", BoostTarget::Profile, TERMS).await;
        assert!(matches!(result, Err(Error::InsufficientCredits { required: 150 })));
        assert_eq!(balance(&pool, user.id).await, 100);

        let mut conn = pool.acquire().await.unwrap();
        assert!(Boosts::new(&mut conn).list_purchased_by(user.id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_listing_boost_debits_and_scopes_category(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        fund(&pool, user.id, 200).await;
        let listing = create_listing(&pool, user.id).await;

        let purchase = purchase_boost(&pool, user.id, "top", BoostTarget::Listing(listing), TERMS).await.unwrap();
        assert_eq!(purchase.balance, 50);
        assert_eq!(purchase.boost.listing_id, Some(listing));
        assert_eq!(purchase.boost.category.as_deref(), Some("musica"));
        assert_eq!(purchase.boost.price_credits, 150);
        assert_eq!(purchase.boost.end_date - purchase.boost.start_date, ChronoDuration::days(7));
        assert!(purchase.boost.is_live(Utc::now()));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cannot_boost_someone_elses_listing(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let other = create_test_user(&pool, Role::User).await;
        fund(&pool, other.id, 500).await;
        let listing = create_listing(&pool, owner.id).await;

        let result = purchase_boost(&pool, other.id, "top", BoostTarget::Listing(listing), TERMS).await;
        assert!(matches!(result, Err(Error::InsufficientPermissions { .. })));
        assert_eq!(balance(&pool, other.id).await, 500);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_sweep_expires_elapsed_boosts(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let boost = insert_boost(&mut conn, "highlight", BoostTarget::Profile, user.id, TERMS, None).await.unwrap();

        sqlx::query("UPDATE listing_boosts SET start_date = NOW() - INTERVAL '10 days', end_date = NOW() - INTERVAL '3 days' WHERE id = $1")
            .bind(boost.id)
            .execute(&mut *conn)
            .await
            .unwrap();
        drop(conn);

        assert_eq!(expire_boosts(&pool).await.unwrap(), 1);
        assert_eq!(expire_boosts(&pool).await.unwrap(), 0);

        let mut conn = pool.acquire().await.unwrap();
        let boosts = Boosts::new(&mut conn).list_purchased_by(user.id).await.unwrap();
        assert!(!boosts[0].is_active);
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = BoostsConfig::default();
        let top = catalog_entry(&catalog, "top").unwrap();
        assert_eq!(BoostTerms::from(top).price_credits, 150);
        assert!(matches!(catalog_entry(&catalog, "mega"), Err(Error::BadRequest { .. })));
    }
}
