use chrono::Duration;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    admin::ensure_admin_exists,
    question::ensure_default_questions,
    sqlite::{init_schema, Db},
};

/// Survey-specific settings, read from `Rocket.toml` and `ROCKET_*`
/// environment variables alongside Rocket's own. Lives in managed state from
/// ignition onwards.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    session_ttl: u32,
    #[serde(default = "default_report_utc_offset")]
    report_utc_offset: i32,
    // secrets
    jwt_secret: String,
}

/// The original deployment ran on an Asia/Seoul clock.
fn default_report_utc_offset() -> i32 {
    9
}

impl Config {
    /// Valid lifetime of session token cookies in seconds.
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl.into())
    }

    /// Hour offset from UTC used to bucket report timestamps into calendar days.
    pub fn report_utc_offset(&self) -> i32 {
        self.report_utc_offset
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that extracts the application [`Config`] from the figment and
/// stores it in managed state, aborting ignition on an invalid config.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Invalid server configuration");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        Ok(rocket.manage(config))
    }
}

/// A fairing that prepares the SQLite store: it creates any missing tables
/// and seeds the default admin and question set. Must be attached after the
/// `Db` pool fairing.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "SQLite",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let db = match Db::get_one(&rocket).await {
            Some(db) => db,
            None => {
                error!("Failed to get a database connection; is the `survey_db` pool configured?");
                return Err(rocket);
            }
        };
        info!("Database connection online, preparing schema...");

        let result = db
            .run(|conn| {
                init_schema(conn)?;
                ensure_default_questions(conn)?;
                ensure_admin_exists(conn)
            })
            .await;
        if let Err(e) = result {
            error!("Failed to prepare the database: {e}");
            return Err(rocket);
        }
        info!("...schema and seed data ready!");

        Ok(rocket)
    }
}

#[cfg(test)]
mod tests {
    use backend_test::backend_test;
    use rocket::local::asynchronous::Client;

    use crate::model::{
        admin::ensure_admin_exists,
        question::{ensure_default_questions, DEFAULT_QUESTIONS},
        sqlite::Db,
    };

    #[backend_test]
    async fn launch_seeds_once(client: Client, db: Db) {
        // The fairing has already run; seeding again must change nothing.
        db.run(|conn| {
            ensure_default_questions(conn)?;
            ensure_admin_exists(conn)
        })
        .await
        .unwrap();

        let (questions, admins) = db
            .run(|conn| -> rocket_sync_db_pools::rusqlite::Result<(i64, i64)> {
                Ok((
                    conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))?,
                    conn.query_row("SELECT COUNT(*) FROM admins", [], |row| row.get(0))?,
                ))
            })
            .await
            .unwrap();
        assert_eq!(questions, DEFAULT_QUESTIONS.len() as i64);
        assert_eq!(admins, 1);

        let config = client.rocket().state::<super::Config>().unwrap();
        assert_eq!(config.report_utc_offset(), 9);
    }
}
