//! Premium video unlocks: the one place clients pay providers in credits.

use sqlx::PgPool;
use tracing::{info, instrument};

use super::{
    debit,
    recorder::{ValueExchange, record_transaction},
};
use crate::{
    config::CreditsConfig,
    db::{
        errors::DbError,
        handlers::Vods,
        models::{
            credits::CreditTransactionType,
            transactions::{TransactionDBResponse, TransactionType},
        },
    },
    errors::{Error, Result},
    types::{UserId, VodId, abbrev_uuid},
};

#[derive(Debug, Clone)]
pub struct VodUnlock {
    pub vod_id: VodId,
    pub transaction: TransactionDBResponse,
    pub balance: i64,
}

/// Unlock a video for `user_id`: debit the price, record the transaction owed to the owner and
/// insert the unlock, all in one database transaction.
#[instrument(skip(db, rates), fields(user_id = %abbrev_uuid(&user_id), vod_id = %abbrev_uuid(&vod_id)), err)]
pub async fn unlock_vod(db: &PgPool, rates: &CreditsConfig, user_id: UserId, vod_id: VodId) -> Result<VodUnlock> {
    let mut tx = db.begin().await.map_err(DbError::from)?;

    let vod = Vods::new(&mut tx).get_by_id(vod_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Video".to_string(),
        id: vod_id.to_string(),
    })?;

    if vod.owner_id == user_id {
        return Err(Error::InvalidState {
            message: "You cannot unlock your own video".to_string(),
        });
    }
    if Vods::new(&mut tx).is_unlocked(vod_id, user_id).await? {
        return Err(Error::InvalidState {
            message: "Video already unlocked".to_string(),
        });
    }

    let balance = debit(
        &mut tx,
        user_id,
        vod.price_credits,
        CreditTransactionType::VodUnlock,
        Some(format!("Unlock: {}", vod.title)),
    )
    .await?;

    let transaction = record_transaction(
        &mut tx,
        rates,
        &ValueExchange {
            transaction_type: TransactionType::VodUnlock,
            amount_credits: vod.price_credits,
            provider_id: vod.owner_id,
            client_id: user_id,
            listing_id: None,
        },
    )
    .await?;

    // A concurrent unlock of the same video loses here and rolls back its debit
    match Vods::new(&mut tx).insert_unlock(vod_id, user_id, transaction.id).await {
        Ok(_) => {}
        Err(DbError::UniqueViolation { .. }) => {
            return Err(Error::InvalidState {
                message: "Video already unlocked".to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    }

    tx.commit().await.map_err(DbError::from)?;

    info!(balance, "Video unlocked");
    Ok(VodUnlock { vod_id, transaction, balance })
}
