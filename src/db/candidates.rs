use log::{debug, info, warn};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use super::Database;
use crate::directory::UserDirectory;
use crate::error::{Error, Result};
use crate::models::{
    AnyCandidate, BallotId, Candidate, CandidateId, CandidateType, PersonCandidate, RealType,
};

const CANDIDATE_COLUMNS: &str = "c.id, c.ballot_id, c.description, c.title, c.real_type";

fn candidate_from_row(row: &SqliteRow) -> Result<Candidate> {
    Ok(Candidate {
        id: Some(row.try_get("id")?),
        real_type: row.try_get("real_type")?,
        ballot: row.try_get("ballot_id")?,
        description: row.try_get("description")?,
        title: row.try_get("title")?,
    })
}

fn person_candidate_from_row(row: &SqliteRow) -> Result<PersonCandidate> {
    Ok(PersonCandidate {
        candidate: candidate_from_row(row)?,
        user: row.try_get("user_id")?,
    })
}

async fn insert_candidate(conn: &mut SqliteConnection, candidate: &Candidate) -> Result<CandidateId> {
    let result = sqlx::query(
        "INSERT INTO candidates (ballot_id, description, title, real_type) VALUES (?, ?, ?, ?)",
    )
    .bind(candidate.ballot)
    .bind(&candidate.description)
    .bind(&candidate.title)
    .bind(&candidate.real_type)
    .execute(&mut *conn)
    .await?;

    Ok(CandidateId(result.last_insert_rowid()))
}

async fn update_candidate(conn: &mut SqliteConnection, id: CandidateId, candidate: &Candidate) -> Result<()> {
    let result = sqlx::query("UPDATE candidates SET ballot_id = ?, description = ?, title = ? WHERE id = ?")
        .bind(candidate.ballot)
        .bind(&candidate.description)
        .bind(&candidate.title)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("candidate #{}", id)));
    }
    Ok(())
}

impl Candidate {
    /// Resolves this candidate to its concrete type. See [`Database::cast_candidate`].
    pub async fn cast(&self, db: &Database) -> Result<AnyCandidate> {
        db.cast_candidate(self).await
    }
}

impl Database {
    /// Inserts a new plain candidate or updates the base columns of an
    /// existing candidate of any type.
    pub async fn save_candidate(&self, candidate: &mut Candidate) -> Result<CandidateId> {
        candidate.validate()?;
        let mut conn = self.pool.acquire().await?;

        match candidate.id {
            Some(id) => {
                update_candidate(&mut conn, id, candidate).await?;
                debug!("Updated candidate #{} ({})", id, candidate);
                Ok(id)
            }
            None if candidate.real_type != CandidateType::Candidate.as_str() => Err(Error::Precondition(format!(
                "a new {} must be saved together with its subtype row",
                candidate.real_type
            ))),
            None => {
                let id = insert_candidate(&mut conn, candidate).await?;
                candidate.id = Some(id);
                info!("Created candidate #{} ({}) on ballot #{}", id, candidate, candidate.ballot);
                Ok(id)
            }
        }
    }

    /// Refreshes the title from the linked user's full name, then writes the
    /// base and person rows in one transaction.
    ///
    /// The user must be set and known to `directory`; otherwise this is a
    /// caller bug and fails with `Precondition` before anything is written.
    pub async fn save_person_candidate<D>(&self, person: &mut PersonCandidate, directory: &D) -> Result<CandidateId>
    where
        D: UserDirectory + ?Sized,
    {
        let user_id = person
            .user
            .ok_or_else(|| Error::Precondition("person candidate has no user".to_string()))?;
        let user = directory.find_user(user_id).await?.ok_or_else(|| {
            warn!("Person candidate references unknown user {}", user_id);
            Error::Precondition(format!("user {} cannot be resolved", user_id))
        })?;

        person.candidate.title = Some(user.full_name());
        person.candidate.validate()?;
        if person.candidate.real_type != CandidateType::PersonCandidate.as_str() {
            return Err(Error::Precondition(format!(
                "candidate tagged {} cannot be saved as a person candidate",
                person.candidate.real_type
            )));
        }

        let mut tx = self.pool.begin().await?;
        match person.candidate.id {
            Some(id) => {
                update_candidate(&mut tx, id, &person.candidate).await?;
                let result = sqlx::query("UPDATE person_candidates SET user_id = ? WHERE candidate_id = ?")
                    .bind(person.user)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(Error::NotFound(format!("person candidate #{}", id)));
                }
                tx.commit().await?;
                debug!("Updated person candidate #{} ({})", id, person.candidate);
                Ok(id)
            }
            None => {
                let id = insert_candidate(&mut tx, &person.candidate).await?;
                sqlx::query("INSERT INTO person_candidates (candidate_id, user_id) VALUES (?, ?)")
                    .bind(id)
                    .bind(person.user)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                person.candidate.id = Some(id);
                info!(
                    "Created person candidate #{} ({}) on ballot #{}",
                    id, person.candidate, person.candidate.ballot
                );
                Ok(id)
            }
        }
    }

    /// Reads the base row only, whatever the candidate's concrete type.
    pub async fn get_candidate(&self, id: CandidateId) -> Result<Candidate> {
        let row = sqlx::query(&format!("SELECT {} FROM candidates c WHERE c.id = ?", CANDIDATE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("candidate #{}", id)))?;
        candidate_from_row(&row)
    }

    pub async fn get_person_candidate(&self, id: CandidateId) -> Result<PersonCandidate> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}, p.user_id
            FROM candidates c
            JOIN person_candidates p ON p.candidate_id = c.id
            WHERE c.id = ?
            "#,
            CANDIDATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("person candidate #{}", id)))?;
        person_candidate_from_row(&row)
    }

    /// Resolves a base handle to the concrete candidate its tag names.
    pub async fn cast_candidate(&self, candidate: &Candidate) -> Result<AnyCandidate> {
        let id = candidate
            .id
            .ok_or_else(|| Error::Precondition("an unsaved candidate cannot be cast".to_string()))?;

        match candidate.real_type()? {
            CandidateType::Candidate => Ok(AnyCandidate::Candidate(self.get_candidate(id).await?)),
            CandidateType::PersonCandidate => match self.get_person_candidate(id).await {
                Ok(person) => Ok(AnyCandidate::PersonCandidate(person)),
                Err(Error::NotFound(_)) => Err(Error::NotFound(format!(
                    "candidate #{} is tagged {} but has no subtype row",
                    id, candidate.real_type
                ))),
                Err(e) => Err(e),
            },
        }
    }

    pub async fn get_candidate_cast(&self, id: CandidateId) -> Result<AnyCandidate> {
        let base = self.get_candidate(id).await?;
        self.cast_candidate(&base).await
    }

    /// Base rows of every candidate on a ballot, oldest first.
    pub async fn list_candidates(&self, ballot: BallotId) -> Result<Vec<Candidate>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM candidates c WHERE c.ballot_id = ? ORDER BY c.id",
            CANDIDATE_COLUMNS
        ))
        .bind(ballot)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(candidate_from_row).collect()
    }
}
