use std::ops::{Deref, DerefMut};
use std::time::Duration;

use rocket::{Build, Rocket};
use rocket_sync_db_pools::{
    database,
    r2d2::{self, ManageConnection},
    r2d2_sqlite::SqliteConnectionManager,
    rusqlite, Config, PoolResult, Poolable,
};

use rusqlite::Connection;

/// Handle on the pooled SQLite connection.
/// The pool is configured under `databases.survey_db` in `Rocket.toml`.
#[database("survey_db")]
pub struct Db(SurveyConnection);

/// Our participant IDs are SQLite rowids.
pub type ParticipantId = i64;
/// Our question IDs are SQLite rowids.
pub type QuestionId = i64;
/// Our answer IDs are SQLite rowids.
pub type AnswerId = i64;
/// Our admin IDs are SQLite rowids.
pub type AdminId = i64;

/// A pooled connection with foreign keys switched on.
///
/// SQLite enforces foreign keys per connection, and they default to off, so
/// the pragma runs as part of connection setup rather than in the schema
/// batch.
pub struct SurveyConnection(Connection);

impl Deref for SurveyConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.0
    }
}

impl DerefMut for SurveyConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.0
    }
}

/// [`SqliteConnectionManager`] wrapper handing out [`SurveyConnection`]s.
pub struct SurveyConnectionManager(SqliteConnectionManager);

impl ManageConnection for SurveyConnectionManager {
    type Connection = SurveyConnection;
    type Error = rusqlite::Error;

    fn connect(&self) -> Result<SurveyConnection, rusqlite::Error> {
        self.0.connect().map(SurveyConnection)
    }

    fn is_valid(&self, conn: &mut SurveyConnection) -> Result<(), rusqlite::Error> {
        self.0.is_valid(&mut conn.0)
    }

    fn has_broken(&self, conn: &mut SurveyConnection) -> bool {
        self.0.has_broken(&mut conn.0)
    }
}

impl Poolable for SurveyConnection {
    type Manager = SurveyConnectionManager;
    type Error = std::convert::Infallible;

    fn pool(db_name: &str, rocket: &Rocket<Build>) -> PoolResult<Self> {
        let config = Config::from(db_name, rocket)?;
        let manager = SqliteConnectionManager::file(&*config.url)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        Ok(r2d2::Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(config.timeout.into()))
            .build(SurveyConnectionManager(manager))?)
    }
}

/// Create any missing tables. Safe to run on every launch.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS participants (
            id          INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            age         INTEGER NOT NULL,
            gender      TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS questions (
            id          INTEGER PRIMARY KEY,
            content     TEXT NOT NULL,
            order_num   INTEGER NOT NULL,
            is_active   INTEGER NOT NULL DEFAULT 1
        );
        CREATE TABLE IF NOT EXISTS answers (
            id              INTEGER PRIMARY KEY,
            chosen_answer   TEXT NOT NULL,
            participant_id  INTEGER NOT NULL REFERENCES participants(id),
            question_id     INTEGER NOT NULL REFERENCES questions(id)
        );
        CREATE TABLE IF NOT EXISTS admins (
            id        INTEGER PRIMARY KEY,
            username  TEXT NOT NULL UNIQUE,
            password  TEXT NOT NULL
        );",
    )
}

#[cfg(test)]
mod tests {
    use backend_test::backend_test;

    use super::*;

    #[test]
    fn schema_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(tables, ["admins", "answers", "participants", "questions"]);
    }

    #[backend_test]
    async fn pooled_connections_enforce_foreign_keys(db: Db) {
        let enforced: i64 = db
            .run(|conn| conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(enforced, 1);

        // An answer pointing at rows that do not exist must be rejected.
        let orphan = db
            .run(|conn| {
                conn.execute(
                    "INSERT INTO answers (chosen_answer, participant_id, question_id)
                     VALUES ('Yes', 4242, 4242)",
                    [],
                )
            })
            .await;
        assert!(orphan.is_err());
    }
}
