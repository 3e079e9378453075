mod ballots;
mod candidates;
mod measures;
mod votes;

use log::{debug, info};
use sqlx::{migrate::MigrateDatabase, sqlite::{SqlitePool, SqlitePoolOptions}, Sqlite};

use crate::config::Config;
use crate::error::Result;

/// Base tables come before the subtype tables that reference them.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS measures (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        summary TEXT,
        vote_start TEXT NOT NULL,
        vote_end TEXT NOT NULL,
        is_open BOOLEAN NOT NULL DEFAULT TRUE,
        real_type TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dorm_measures (
        measure_id INTEGER PRIMARY KEY,
        dorm_id BLOB NOT NULL,
        number INTEGER NOT NULL,
        UNIQUE (dorm_id, number),
        FOREIGN KEY (measure_id) REFERENCES measures(id) ON DELETE CASCADE
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ballots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        measure_id INTEGER,
        display_position INTEGER NOT NULL DEFAULT 1,
        title TEXT NOT NULL,
        blurb TEXT NOT NULL,
        can_write_in BOOLEAN NOT NULL DEFAULT FALSE,
        is_secret BOOLEAN NOT NULL DEFAULT TRUE,
        UNIQUE (measure_id, display_position),
        UNIQUE (measure_id, title),
        FOREIGN KEY (measure_id) REFERENCES measures(id) ON DELETE CASCADE
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS candidates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ballot_id INTEGER NOT NULL,
        description TEXT,
        title TEXT,
        real_type TEXT NOT NULL,
        UNIQUE (ballot_id, title),
        FOREIGN KEY (ballot_id) REFERENCES ballots(id) ON DELETE CASCADE
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS person_candidates (
        candidate_id INTEGER PRIMARY KEY,
        user_id BLOB,
        FOREIGN KEY (candidate_id) REFERENCES candidates(id) ON DELETE CASCADE
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS votes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id BLOB,
        measure_id INTEGER NOT NULL,
        cast_at TEXT NOT NULL,
        UNIQUE (account_id, measure_id),
        FOREIGN KEY (measure_id) REFERENCES measures(id) ON DELETE CASCADE
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS popularity_votes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        vote_id INTEGER NOT NULL,
        ballot_id INTEGER NOT NULL,
        candidate_id INTEGER,
        write_in_value TEXT,
        FOREIGN KEY (vote_id) REFERENCES votes(id) ON DELETE CASCADE,
        FOREIGN KEY (ballot_id) REFERENCES ballots(id) ON DELETE CASCADE,
        FOREIGN KEY (candidate_id) REFERENCES candidates(id) ON DELETE CASCADE
    );
    "#,
];

/// The election store. Every uniqueness rule of the model is a table
/// constraint here, so conflicting writes fail inside SQLite rather than in
/// a read-then-write check.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(config: &Config) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(&config.database_url).await.unwrap_or(false) {
            info!("Creating database at {}", config.database_url);
            Sqlite::create_database(&config.database_url).await?;
        }

        let mut options = SqlitePoolOptions::new().max_connections(config.max_connections);
        if config.is_in_memory() {
            // The database lives only as long as its connection, so the pool
            // must never reap it.
            options = options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = options.connect(&config.database_url).await?;

        Self::init_schema(&pool).await?;
        info!("Election store ready at {}", config.database_url);

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(pool).await?;
        }
        debug!("Schema initialised ({} tables)", SCHEMA.len());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::Database;
    use crate::config::Config;
    use crate::directory::User;
    use crate::models::{Ballot, Measure, UserId};

    pub async fn memory_db() -> Database {
        Database::new(&Config::in_memory()).await.unwrap()
    }

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 6, 8, 0, 0).unwrap()
    }

    pub fn spring_election() -> Measure {
        Measure::new("Spring Election", t0(), t0() + Duration::days(7))
    }

    pub async fn saved_measure(db: &Database) -> Measure {
        let mut measure = spring_election();
        db.save_measure(&mut measure).await.unwrap();
        measure
    }

    pub async fn saved_ballot(db: &Database, measure: &Measure, title: &str, position: i64) -> Ballot {
        let mut ballot = Ballot::new(measure.id().unwrap(), title, "").at_position(position);
        db.save_ballot(&mut ballot).await.unwrap();
        ballot
    }

    /// Deletes a file database together with its journal files.
    pub fn remove_database_files(path: &std::path::Path) {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut file = path.as_os_str().to_owned();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }

    pub fn directory_with(names: &[(&str, &str)]) -> (HashMap<UserId, User>, Vec<UserId>) {
        let mut directory = HashMap::new();
        let mut ids = Vec::new();
        for (first, last) in names {
            let user = User {
                id: UserId::new(),
                first_name: first.to_string(),
                last_name: last.to_string(),
            };
            ids.push(user.id);
            directory.insert(user.id, user);
        }
        (directory, ids)
    }
}
