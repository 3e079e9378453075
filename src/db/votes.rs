use chrono::{DateTime, Utc};
use log::{debug, info};
use sqlx::{sqlite::SqliteRow, Row};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{
    BallotId, MeasureId, PopularityVote, PopularityVoteId, Selection, UserId, Vote, VoteId,
};

fn vote_from_row(row: &SqliteRow) -> Result<Vote> {
    Ok(Vote {
        id: row.try_get("id")?,
        account: row.try_get("account_id")?,
        measure: row.try_get("measure_id")?,
        cast_at: row.try_get("cast_at")?,
    })
}

fn popularity_vote_from_row(row: &SqliteRow) -> Result<PopularityVote> {
    Ok(PopularityVote {
        id: row.try_get("id")?,
        vote: row.try_get("vote_id")?,
        ballot: row.try_get("ballot_id")?,
        candidate: row.try_get("candidate_id")?,
        write_in_value: row.try_get("write_in_value")?,
    })
}

impl Database {
    /// Records that `account` has voted in `measure`.
    ///
    /// This insert is the only "has voted" gate. A second vote for the same
    /// pair, concurrent or not, fails with `UniquenessViolation` and leaves
    /// the first untouched. Votes without an account are not deduplicated.
    pub async fn create_vote(
        &self,
        account: Option<UserId>,
        measure: MeasureId,
        cast_at: DateTime<Utc>,
    ) -> Result<Vote> {
        let result = sqlx::query("INSERT INTO votes (account_id, measure_id, cast_at) VALUES (?, ?, ?)")
            .bind(account)
            .bind(measure)
            .bind(cast_at)
            .execute(&self.pool)
            .await?;

        let vote = Vote {
            id: VoteId(result.last_insert_rowid()),
            account,
            measure,
            cast_at,
        };
        info!("Recorded vote #{}: {}", vote.id, vote);
        Ok(vote)
    }

    pub async fn get_vote(&self, id: VoteId) -> Result<Vote> {
        let row = sqlx::query("SELECT id, account_id, measure_id, cast_at FROM votes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("vote #{}", id)))?;
        vote_from_row(&row)
    }

    pub async fn get_vote_for(&self, account: UserId, measure: MeasureId) -> Result<Option<Vote>> {
        let row = sqlx::query(
            "SELECT id, account_id, measure_id, cast_at FROM votes WHERE account_id = ? AND measure_id = ?",
        )
        .bind(account)
        .bind(measure)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(vote_from_row).transpose()
    }

    pub async fn has_voted(&self, account: UserId, measure: MeasureId) -> Result<bool> {
        let exists = sqlx::query("SELECT 1 FROM votes WHERE account_id = ? AND measure_id = ?")
            .bind(account)
            .bind(measure)
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        Ok(exists)
    }

    pub async fn list_votes(&self, measure: MeasureId) -> Result<Vec<Vote>> {
        let rows = sqlx::query(
            "SELECT id, account_id, measure_id, cast_at FROM votes WHERE measure_id = ? ORDER BY cast_at, id",
        )
        .bind(measure)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(vote_from_row).collect()
    }

    /// Stores the selection made on one ballot of a vote.
    ///
    /// Whether the ballot belongs to the vote's measure, or accepts
    /// write-ins, is not checked here. See [`PopularityVote::check_against`].
    pub async fn cast_popularity_vote(
        &self,
        vote: VoteId,
        ballot: BallotId,
        selection: Selection,
    ) -> Result<PopularityVote> {
        selection.validate()?;
        let (candidate, write_in_value) = match selection {
            Selection::Candidate(id) => (Some(id), None),
            Selection::WriteIn(value) => (None, Some(value)),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO popularity_votes (vote_id, ballot_id, candidate_id, write_in_value)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(vote)
        .bind(ballot)
        .bind(candidate)
        .bind(&write_in_value)
        .execute(&self.pool)
        .await?;

        let popularity_vote = PopularityVote {
            id: PopularityVoteId(result.last_insert_rowid()),
            vote,
            ballot,
            candidate,
            write_in_value,
        };
        debug!("Recorded {}", popularity_vote);
        Ok(popularity_vote)
    }

    pub async fn list_popularity_votes(&self, vote: VoteId) -> Result<Vec<PopularityVote>> {
        let rows = sqlx::query(
            r#"
            SELECT id, vote_id, ballot_id, candidate_id, write_in_value
            FROM popularity_votes
            WHERE vote_id = ?
            ORDER BY id
            "#,
        )
        .bind(vote)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(popularity_vote_from_row).collect()
    }

    /// Every selection made on a ballot, across all votes.
    pub async fn list_ballot_selections(&self, ballot: BallotId) -> Result<Vec<PopularityVote>> {
        let rows = sqlx::query(
            r#"
            SELECT id, vote_id, ballot_id, candidate_id, write_in_value
            FROM popularity_votes
            WHERE ballot_id = ?
            ORDER BY id
            "#,
        )
        .bind(ballot)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(popularity_vote_from_row).collect()
    }
}
