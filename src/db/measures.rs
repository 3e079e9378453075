use log::{debug, info};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{AnyMeasure, DormId, DormMeasure, Measure, MeasureId, MeasureType, RealType};

const MEASURE_COLUMNS: &str =
    "m.id, m.name, m.summary, m.vote_start, m.vote_end, m.is_open, m.real_type";

// The tag is kept as stored. Only `cast_measure` needs to understand it.
fn measure_from_row(row: &SqliteRow) -> Result<Measure> {
    Ok(Measure {
        id: Some(row.try_get("id")?),
        real_type: row.try_get("real_type")?,
        name: row.try_get("name")?,
        summary: row.try_get("summary")?,
        vote_start: row.try_get("vote_start")?,
        vote_end: row.try_get("vote_end")?,
        is_open: row.try_get("is_open")?,
    })
}

fn dorm_measure_from_row(row: &SqliteRow) -> Result<DormMeasure> {
    Ok(DormMeasure {
        measure: measure_from_row(row)?,
        dorm: row.try_get("dorm_id")?,
        number: row.try_get("number")?,
    })
}

// The only statement that writes `real_type`.
async fn insert_measure(conn: &mut SqliteConnection, measure: &Measure) -> Result<MeasureId> {
    let result = sqlx::query(
        r#"
        INSERT INTO measures (name, summary, vote_start, vote_end, is_open, real_type)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&measure.name)
    .bind(&measure.summary)
    .bind(measure.vote_start)
    .bind(measure.vote_end)
    .bind(measure.is_open)
    .bind(&measure.real_type)
    .execute(&mut *conn)
    .await?;

    Ok(MeasureId(result.last_insert_rowid()))
}

async fn update_measure(conn: &mut SqliteConnection, id: MeasureId, measure: &Measure) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE measures
        SET name = ?, summary = ?, vote_start = ?, vote_end = ?, is_open = ?
        WHERE id = ?
        "#,
    )
    .bind(&measure.name)
    .bind(&measure.summary)
    .bind(measure.vote_start)
    .bind(measure.vote_end)
    .bind(measure.is_open)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("measure #{}", id)));
    }
    Ok(())
}

impl Measure {
    /// Resolves this measure to its concrete type. See [`Database::cast_measure`].
    pub async fn cast(&self, db: &Database) -> Result<AnyMeasure> {
        db.cast_measure(self).await
    }
}

impl Database {
    /// Inserts a new plain measure or updates the base columns of an existing
    /// measure of any type. A new dorm measure has to go through
    /// [`Database::save_dorm_measure`] so that its subtype row is written too.
    pub async fn save_measure(&self, measure: &mut Measure) -> Result<MeasureId> {
        measure.validate()?;
        let mut conn = self.pool.acquire().await?;

        match measure.id {
            Some(id) => {
                update_measure(&mut conn, id, measure).await?;
                debug!("Updated measure {}", measure);
                Ok(id)
            }
            None if measure.real_type != MeasureType::Measure.as_str() => Err(Error::Precondition(format!(
                "a new {} must be saved together with its subtype row",
                measure.real_type
            ))),
            None => {
                let id = insert_measure(&mut conn, measure).await?;
                measure.id = Some(id);
                info!("Created measure {}", measure);
                Ok(id)
            }
        }
    }

    /// Writes the base row and the dorm row in one transaction. On first
    /// save the base row goes in first, already carrying its tag.
    pub async fn save_dorm_measure(&self, dorm_measure: &mut DormMeasure) -> Result<MeasureId> {
        dorm_measure.measure.validate()?;
        if dorm_measure.measure.real_type != MeasureType::DormMeasure.as_str() {
            return Err(Error::Precondition(format!(
                "measure tagged {} cannot be saved as a dorm measure",
                dorm_measure.measure.real_type
            )));
        }

        let mut tx = self.pool.begin().await?;
        match dorm_measure.measure.id {
            Some(id) => {
                update_measure(&mut tx, id, &dorm_measure.measure).await?;
                let result = sqlx::query("UPDATE dorm_measures SET dorm_id = ?, number = ? WHERE measure_id = ?")
                    .bind(dorm_measure.dorm)
                    .bind(dorm_measure.number)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(Error::NotFound(format!("dorm measure #{}", id)));
                }
                tx.commit().await?;
                debug!("Updated dorm measure {}", dorm_measure.measure);
                Ok(id)
            }
            None => {
                let id = insert_measure(&mut tx, &dorm_measure.measure).await?;
                sqlx::query("INSERT INTO dorm_measures (measure_id, dorm_id, number) VALUES (?, ?, ?)")
                    .bind(id)
                    .bind(dorm_measure.dorm)
                    .bind(dorm_measure.number)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                dorm_measure.measure.id = Some(id);
                info!(
                    "Created dorm measure {} (dorm {}, number {})",
                    dorm_measure.measure, dorm_measure.dorm, dorm_measure.number
                );
                Ok(id)
            }
        }
    }

    /// Reads the base row only, whatever the measure's concrete type.
    pub async fn get_measure(&self, id: MeasureId) -> Result<Measure> {
        let row = sqlx::query(&format!("SELECT {} FROM measures m WHERE m.id = ?", MEASURE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("measure #{}", id)))?;
        measure_from_row(&row)
    }

    pub async fn get_dorm_measure(&self, id: MeasureId) -> Result<DormMeasure> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}, d.dorm_id, d.number
            FROM measures m
            JOIN dorm_measures d ON d.measure_id = m.id
            WHERE m.id = ?
            "#,
            MEASURE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("dorm measure #{}", id)))?;
        dorm_measure_from_row(&row)
    }

    /// Resolves a base handle to the concrete measure its tag names.
    ///
    /// A missing subtype row means base and subtype were not written
    /// together at some point; it is reported as `NotFound`, as is a tag
    /// naming a type this build does not know.
    pub async fn cast_measure(&self, measure: &Measure) -> Result<AnyMeasure> {
        let id = measure
            .id
            .ok_or_else(|| Error::Precondition("an unsaved measure cannot be cast".to_string()))?;

        match measure.real_type()? {
            MeasureType::Measure => Ok(AnyMeasure::Measure(self.get_measure(id).await?)),
            MeasureType::DormMeasure => match self.get_dorm_measure(id).await {
                Ok(dorm_measure) => Ok(AnyMeasure::DormMeasure(dorm_measure)),
                Err(Error::NotFound(_)) => Err(Error::NotFound(format!(
                    "measure #{} is tagged {} but has no subtype row",
                    id, measure.real_type
                ))),
                Err(e) => Err(e),
            },
        }
    }

    pub async fn get_measure_cast(&self, id: MeasureId) -> Result<AnyMeasure> {
        let base = self.get_measure(id).await?;
        self.cast_measure(&base).await
    }

    pub async fn list_measures(&self) -> Result<Vec<Measure>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM measures m ORDER BY m.vote_start, m.id",
            MEASURE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(measure_from_row).collect()
    }

    pub async fn list_open_measures(&self) -> Result<Vec<Measure>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM measures m WHERE m.is_open = TRUE ORDER BY m.vote_start, m.id",
            MEASURE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(measure_from_row).collect()
    }

    pub async fn list_dorm_measures(&self, dorm: DormId) -> Result<Vec<DormMeasure>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}, d.dorm_id, d.number
            FROM measures m
            JOIN dorm_measures d ON d.measure_id = m.id
            WHERE d.dorm_id = ?
            ORDER BY d.number
            "#,
            MEASURE_COLUMNS
        ))
        .bind(dorm)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(dorm_measure_from_row).collect()
    }

    /// Flips the administrative open flag. The voting window is left alone.
    pub async fn set_measure_open(&self, id: MeasureId, is_open: bool) -> Result<()> {
        let result = sqlx::query("UPDATE measures SET is_open = ? WHERE id = ?")
            .bind(is_open)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("measure #{}", id)));
        }
        info!("Measure #{} is now {}", id, if is_open { "open" } else { "closed" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::super::test_support::*;
    use super::*;

    fn dorm_budget(dorm: DormId, number: i64) -> DormMeasure {
        DormMeasure::new("Dorm Budget", t0(), t0() + Duration::days(3), dorm, number)
    }

    async fn stored_tag(db: &Database, id: MeasureId) -> String {
        sqlx::query_scalar("SELECT real_type FROM measures WHERE id = ?")
            .bind(id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn save_assigns_id_and_tag() {
        let db = memory_db().await;
        let mut measure = spring_election().with_summary("Annual officer elections");
        let id = db.save_measure(&mut measure).await.unwrap();

        assert_eq!(measure.id(), Some(id));
        assert_eq!(stored_tag(&db, id).await, "measure");
        assert_eq!(db.get_measure(id).await.unwrap(), measure);
    }

    #[tokio::test]
    async fn cast_returns_saved_dorm_measure() {
        let db = memory_db().await;
        let mut dorm_measure = dorm_budget(DormId::new(), 1);
        let id = db.save_dorm_measure(&mut dorm_measure).await.unwrap();

        let base = db.get_measure(id).await.unwrap();
        assert_eq!(base.real_type().unwrap(), MeasureType::DormMeasure);

        let cast = base.cast(&db).await.unwrap();
        assert_eq!(cast, AnyMeasure::DormMeasure(dorm_measure.clone()));
        assert_eq!(cast.as_dorm_measure().unwrap().number, 1);
    }

    #[tokio::test]
    async fn cast_of_plain_measure_is_plain() {
        let db = memory_db().await;
        let measure = saved_measure(&db).await;
        let cast = db.get_measure_cast(measure.id().unwrap()).await.unwrap();
        assert_eq!(cast, AnyMeasure::Measure(measure));
        assert!(cast.as_dorm_measure().is_none());
    }

    #[tokio::test]
    async fn tag_survives_later_saves() {
        let db = memory_db().await;
        let mut dorm_measure = dorm_budget(DormId::new(), 2);
        let id = db.save_dorm_measure(&mut dorm_measure).await.unwrap();

        dorm_measure.name = "Dorm Budget (revised)".to_string();
        dorm_measure.number = 5;
        db.save_dorm_measure(&mut dorm_measure).await.unwrap();

        // Saving through the base handle only touches base columns.
        let mut base = db.get_measure(id).await.unwrap();
        base.is_open = false;
        db.save_measure(&mut base).await.unwrap();

        assert_eq!(stored_tag(&db, id).await, "dorm_measure");
        let reread = db.get_dorm_measure(id).await.unwrap();
        assert_eq!(reread.number, 5);
        assert_eq!(reread.name, "Dorm Budget (revised)");
        assert!(!reread.is_open);
    }

    #[tokio::test]
    async fn dorm_and_number_are_unique() {
        let db = memory_db().await;
        let dorm = DormId::new();
        db.save_dorm_measure(&mut dorm_budget(dorm, 1)).await.unwrap();

        let mut clash = dorm_budget(dorm, 1);
        let err = db.save_dorm_measure(&mut clash).await.unwrap_err();
        assert!(matches!(err, Error::UniquenessViolation(_)), "{:?}", err);
        assert_eq!(clash.id(), None);

        // The failed transaction left no orphan base row behind.
        assert_eq!(db.list_measures().await.unwrap().len(), 1);

        db.save_dorm_measure(&mut dorm_budget(dorm, 2)).await.unwrap();
        db.save_dorm_measure(&mut dorm_budget(DormId::new(), 1)).await.unwrap();
        assert_eq!(db.list_dorm_measures(dorm).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn new_dorm_measure_cannot_skip_its_subtype_row() {
        let db = memory_db().await;
        let mut dorm_measure = dorm_budget(DormId::new(), 1);
        let err = db.save_measure(&mut dorm_measure).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(db.list_measures().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cast_without_subtype_row_is_not_found() {
        let db = memory_db().await;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO measures (name, vote_start, vote_end, real_type) VALUES ('Orphan', ?, ?, 'dorm_measure') RETURNING id",
        )
        .bind(t0())
        .bind(t0() + Duration::days(1))
        .fetch_one(db.pool())
        .await
        .unwrap();

        let err = db.get_measure_cast(MeasureId(id)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn unknown_tag_is_not_found() {
        let db = memory_db().await;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO measures (name, vote_start, vote_end, real_type) VALUES ('Legacy', ?, ?, 'referendum') RETURNING id",
        )
        .bind(t0())
        .bind(t0() + Duration::days(1))
        .fetch_one(db.pool())
        .await
        .unwrap();

        match db.get_measure_cast(MeasureId(id)).await {
            Err(Error::NotFound(msg)) => assert!(msg.contains("referendum")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn legacy_tag_does_not_break_base_reads() {
        let db = memory_db().await;
        let current = saved_measure(&db).await;
        let legacy: i64 = sqlx::query_scalar(
            "INSERT INTO measures (name, vote_start, vote_end, real_type) VALUES ('Legacy', ?, ?, 'referendum') RETURNING id",
        )
        .bind(t0() + Duration::days(1))
        .bind(t0() + Duration::days(2))
        .fetch_one(db.pool())
        .await
        .unwrap();
        let legacy = MeasureId(legacy);

        let all = db.list_measures().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], current);
        assert_eq!(all[1].real_type_tag(), "referendum");
        assert_eq!(db.list_open_measures().await.unwrap().len(), 2);

        // Base columns of the legacy row can still be edited.
        let mut base = db.get_measure(legacy).await.unwrap();
        assert!(matches!(base.real_type(), Err(Error::NotFound(_))));
        base.is_open = false;
        db.save_measure(&mut base).await.unwrap();
        assert_eq!(stored_tag(&db, legacy).await, "referendum");

        assert!(matches!(base.cast(&db).await, Err(Error::NotFound(_))));
        assert!(matches!(db.get_measure_cast(current.id().unwrap()).await, Ok(AnyMeasure::Measure(_))));
    }

    #[tokio::test]
    async fn unsaved_measure_cannot_be_cast() {
        let db = memory_db().await;
        let err = spring_election().cast(&db).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn open_flag_is_toggled_independently() {
        let db = memory_db().await;
        let measure = saved_measure(&db).await;
        let id = measure.id().unwrap();

        db.set_measure_open(id, false).await.unwrap();
        let closed = db.get_measure(id).await.unwrap();
        assert!(!closed.is_open);
        assert_eq!(closed.vote_end, measure.vote_end);
        assert!(db.list_open_measures().await.unwrap().is_empty());

        let err = db.set_measure_open(MeasureId(999), true).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn overlong_name_is_rejected_before_writing() {
        let db = memory_db().await;
        let mut measure = spring_election();
        measure.name = "n".repeat(51);
        let err = db.save_measure(&mut measure).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(measure.id(), None);
    }
}
