use log::{debug, info};
use sqlx::{sqlite::SqliteRow, Row};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{Ballot, BallotId, MeasureId};

fn ballot_from_row(row: &SqliteRow) -> Result<Ballot> {
    Ok(Ballot {
        id: Some(row.try_get("id")?),
        measure: row.try_get("measure_id")?,
        display_position: row.try_get("display_position")?,
        title: row.try_get("title")?,
        blurb: row.try_get("blurb")?,
        can_write_in: row.try_get("can_write_in")?,
        is_secret: row.try_get("is_secret")?,
    })
}

impl Database {
    /// Position and title clashes inside a measure come back as
    /// `UniquenessViolation`.
    pub async fn save_ballot(&self, ballot: &mut Ballot) -> Result<BallotId> {
        ballot.validate()?;

        match ballot.id {
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE ballots
                    SET measure_id = ?, display_position = ?, title = ?, blurb = ?, can_write_in = ?, is_secret = ?
                    WHERE id = ?
                    "#,
                )
                .bind(ballot.measure)
                .bind(ballot.display_position)
                .bind(&ballot.title)
                .bind(&ballot.blurb)
                .bind(ballot.can_write_in)
                .bind(ballot.is_secret)
                .bind(id)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(Error::NotFound(format!("ballot #{}", id)));
                }
                debug!("Updated {}", ballot);
                Ok(id)
            }
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO ballots (measure_id, display_position, title, blurb, can_write_in, is_secret)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(ballot.measure)
                .bind(ballot.display_position)
                .bind(&ballot.title)
                .bind(&ballot.blurb)
                .bind(ballot.can_write_in)
                .bind(ballot.is_secret)
                .execute(&self.pool)
                .await?;

                let id = BallotId(result.last_insert_rowid());
                ballot.id = Some(id);
                info!("Created {} in measure {:?}", ballot, ballot.measure);
                Ok(id)
            }
        }
    }

    pub async fn get_ballot(&self, id: BallotId) -> Result<Ballot> {
        let row = sqlx::query(
            r#"
            SELECT id, measure_id, display_position, title, blurb, can_write_in, is_secret
            FROM ballots
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("ballot #{}", id)))?;
        ballot_from_row(&row)
    }

    /// The ballots of a measure in display order.
    pub async fn list_ballots(&self, measure: MeasureId) -> Result<Vec<Ballot>> {
        let rows = sqlx::query(
            r#"
            SELECT id, measure_id, display_position, title, blurb, can_write_in, is_secret
            FROM ballots
            WHERE measure_id = ?
            ORDER BY display_position, id
            "#,
        )
        .bind(measure)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(ballot_from_row).collect()
    }
}
