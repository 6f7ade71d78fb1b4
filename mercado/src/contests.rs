//! Contest (raffle) lifecycle: entry eligibility and winner draws.
//!
//! Entries are only ever inserted by payment reconciliation; this module decides whether a
//! participant may start paying for one and draws the winner once the contest closes.

use rand::prelude::RngExt;
use rand::rng;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};

use crate::{
    api::models::users::CurrentUser,
    config::Config,
    db::{
        errors::DbError,
        handlers::{Contests, Repository, Users},
        models::contests::{ContestDBResponse, ContestEntryDBResponse, ContestStatus},
    },
    email::EmailService,
    errors::{Error, Result},
    types::{ContestId, UserId, abbrev_uuid},
};

#[derive(Debug, Clone)]
pub struct ContestResolution {
    pub contest: ContestDBResponse,
    pub winner: ContestEntryDBResponse,
}

fn not_found(id: ContestId) -> Error {
    Error::NotFound {
        resource: "Contest".to_string(),
        id: id.to_string(),
    }
}

/// Pick one entry uniformly at random
pub fn draw_winner(entries: &[ContestEntryDBResponse]) -> Option<&ContestEntryDBResponse> {
    if entries.is_empty() {
        return None;
    }
    entries.get(rng().random_range(0..entries.len()))
}

/// Whether `participant` may buy a slot right now. Checked again when the payment lands.
#[instrument(skip(conn), fields(contest_id = %abbrev_uuid(&contest_id), participant = %abbrev_uuid(&participant)), err)]
pub async fn check_entry_allowed(conn: &mut PgConnection, contest_id: ContestId, participant: UserId) -> Result<ContestDBResponse> {
    let mut contests = Contests::new(conn);
    let contest = contests.get_by_id(contest_id).await?.ok_or_else(|| not_found(contest_id))?;

    if contest.status != ContestStatus::Open {
        return Err(Error::InvalidState {
            message: "Contest is no longer open".to_string(),
        });
    }
    if contests.count_entries(contest_id).await? >= i64::from(contest.total_slots) {
        return Err(Error::InvalidState {
            message: "Contest is sold out".to_string(),
        });
    }
    if contests.has_entry(contest_id, participant).await? {
        return Err(Error::InvalidState {
            message: "You already entered this contest".to_string(),
        });
    }

    Ok(contest)
}

/// Draw and record the winner of a contest whose row the caller has already locked.
pub(crate) async fn resolve_locked(conn: &mut PgConnection, contest: &ContestDBResponse) -> Result<ContestResolution> {
    if contest.status != ContestStatus::Open {
        return Err(Error::InvalidState {
            message: "Contest is already resolved".to_string(),
        });
    }

    let mut contests = Contests::new(conn);
    let entries = contests.list_entries(contest.id).await?;
    let winner = draw_winner(&entries).cloned().ok_or_else(|| Error::InvalidState {
        message: "Contest has no entries".to_string(),
    })?;

    let contest = contests.resolve(contest.id, winner.id).await?;
    info!(
        contest_id = %abbrev_uuid(&contest.id),
        entries = entries.len(),
        winner = %abbrev_uuid(&winner.participant_id),
        "Contest resolved"
    );

    Ok(ContestResolution {
        contest,
        winner: ContestEntryDBResponse { is_winner: true, ..winner },
    })
}

/// Manual resolution by the contest's creator or an admin. A second attempt is `InvalidState`.
#[instrument(skip(db, caller), fields(contest_id = %abbrev_uuid(&contest_id), caller = %abbrev_uuid(&caller.id)), err)]
pub async fn resolve_contest(db: &PgPool, contest_id: ContestId, caller: &CurrentUser) -> Result<ContestResolution> {
    let mut tx = db.begin().await.map_err(DbError::from)?;

    let contest = Contests::new(&mut tx)
        .get_for_update(contest_id)
        .await?
        .ok_or_else(|| not_found(contest_id))?;

    if contest.creator_id != caller.id && !caller.is_admin {
        return Err(Error::InsufficientPermissions {
            action: "resolve".to_string(),
            resource: "a contest you did not create".to_string(),
        });
    }

    let resolution = resolve_locked(&mut tx, &contest).await?;
    tx.commit().await.map_err(DbError::from)?;

    Ok(resolution)
}

/// Tell the winner. Runs after the resolution has committed, so a mail failure is only logged.
pub async fn notify_winner(db: &PgPool, config: &Config, resolution: &ContestResolution) {
    let winner = match db.acquire().await {
        Ok(mut conn) => Users::new(&mut conn).get_by_id(resolution.winner.participant_id).await,
        Err(e) => Err(DbError::from(e)),
    };

    let user = match winner {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(e) => {
            warn!("Could not load contest winner: {e}");
            return;
        }
    };

    let sent = match EmailService::new(config) {
        Ok(service) => {
            service
                .send_contest_winner_email(&user.email, user.display_name.as_deref(), &resolution.contest.title, &resolution.contest.prize)
                .await
        }
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        warn!(contest_id = %abbrev_uuid(&resolution.contest.id), "Failed to send winner email: {e}");
    }
}
