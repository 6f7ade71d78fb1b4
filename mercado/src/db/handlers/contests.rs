//! Repository for contests and contest entries.

use std::collections::HashMap;

use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    db::{
        errors::{DbError, Result},
        models::contests::{ContestCreateDBRequest, ContestDBResponse, ContestEntryDBResponse, ContestStatus},
    },
    types::{ContestId, UserId, abbrev_uuid},
};

pub struct Contests<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Contests<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(creator_id = %abbrev_uuid(&request.creator_id)), err)]
    pub async fn create(&mut self, request: &ContestCreateDBRequest) -> Result<ContestDBResponse> {
        let contest = sqlx::query_as::<_, ContestDBResponse>(
            r#"
            INSERT INTO contests (creator_id, title, description, prize, total_slots, slot_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(request.creator_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.prize)
        .bind(request.total_slots)
        .bind(request.slot_price)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(contest)
    }

    pub async fn get_by_id(&mut self, id: ContestId) -> Result<Option<ContestDBResponse>> {
        let contest = sqlx::query_as::<_, ContestDBResponse>("SELECT * FROM contests WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(contest)
    }

    /// Lock the contest row. Entry inserts and resolution both take this lock first, which is
    /// what keeps the slot count and the single winner consistent.
    pub async fn get_for_update(&mut self, id: ContestId) -> Result<Option<ContestDBResponse>> {
        let contest = sqlx::query_as::<_, ContestDBResponse>("SELECT * FROM contests WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(contest)
    }

    pub async fn list(&mut self, status: Option<ContestStatus>, skip: i64, limit: i64) -> Result<Vec<ContestDBResponse>> {
        let contests = sqlx::query_as::<_, ContestDBResponse>(
            r#"
            SELECT * FROM contests
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(status)
        .bind(skip)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(contests)
    }

    pub async fn count(&mut self, status: Option<ContestStatus>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contests WHERE ($1::text IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    pub async fn count_entries(&mut self, contest_id: ContestId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contest_entries WHERE contest_id = $1")
            .bind(contest_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    /// Entry counts for a page of contests. Contests without entries are absent from the map.
    pub async fn entry_counts(&mut self, contest_ids: &[ContestId]) -> Result<HashMap<ContestId, i64>> {
        let rows = sqlx::query_as::<_, (ContestId, i64)>(
            "SELECT contest_id, COUNT(*) FROM contest_entries WHERE contest_id = ANY($1) GROUP BY contest_id",
        )
        .bind(contest_ids)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rows.into_iter().collect())
    }

    pub async fn has_entry(&mut self, contest_id: ContestId, participant_id: UserId) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM contest_entries WHERE contest_id = $1 AND participant_id = $2)",
        )
        .bind(contest_id)
        .bind(participant_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(exists)
    }

    /// Insert an entry unless the participant already has one. Returns `None` on a duplicate.
    #[instrument(skip(self, payment_reference), fields(contest_id = %abbrev_uuid(&contest_id), participant_id = %abbrev_uuid(&participant_id)), err)]
    pub async fn insert_entry(
        &mut self,
        contest_id: ContestId,
        participant_id: UserId,
        payment_reference: &str,
    ) -> Result<Option<ContestEntryDBResponse>> {
        let entry = sqlx::query_as::<_, ContestEntryDBResponse>(
            r#"
            INSERT INTO contest_entries (contest_id, participant_id, payment_reference)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT contest_entries_contest_participant_unique DO NOTHING
            RETURNING *
            "#,
        )
        .bind(contest_id)
        .bind(participant_id)
        .bind(payment_reference)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(entry)
    }

    /// Entries in the order they were bought
    pub async fn list_entries(&mut self, contest_id: ContestId) -> Result<Vec<ContestEntryDBResponse>> {
        let entries = sqlx::query_as::<_, ContestEntryDBResponse>(
            "SELECT * FROM contest_entries WHERE contest_id = $1 ORDER BY created_at, id",
        )
        .bind(contest_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(entries)
    }

    pub async fn winner(&mut self, contest_id: ContestId) -> Result<Option<ContestEntryDBResponse>> {
        let entry = sqlx::query_as::<_, ContestEntryDBResponse>("SELECT * FROM contest_entries WHERE contest_id = $1 AND is_winner")
            .bind(contest_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(entry)
    }

    /// Flip the contest to RESOLVED and flag the winning entry. `NotFound` if the contest is no
    /// longer open.
    #[instrument(skip(self), fields(contest_id = %abbrev_uuid(&contest_id), entry_id = %abbrev_uuid(&winning_entry)), err)]
    pub async fn resolve(&mut self, contest_id: ContestId, winning_entry: Uuid) -> Result<ContestDBResponse> {
        let contest = sqlx::query_as::<_, ContestDBResponse>(
            r#"
            UPDATE contests SET status = 'RESOLVED', resolved_at = NOW()
            WHERE id = $1 AND status = 'OPEN'
            RETURNING *
            "#,
        )
        .bind(contest_id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        let updated = sqlx::query("UPDATE contest_entries SET is_winner = TRUE WHERE id = $1 AND contest_id = $2")
            .bind(winning_entry)
            .bind(contest_id)
            .execute(&mut *self.db)
            .await?;
        if updated.rows_affected() != 1 {
            return Err(DbError::NotFound);
        }

        Ok(contest)
    }
}
