#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

use rocket::{figment::Figment, Build, Rocket};

use crate::{
    config::{ConfigFairing, DatabaseFairing},
    logging::LoggerFairing,
    model::sqlite::Db,
};

/// Construct the server from rocket's standard figment
/// (`Rocket.toml` plus `ROCKET_*` environment variables).
pub fn build() -> Rocket<Build> {
    custom(rocket::Config::figment())
}

/// Construct the server from the given figment.
///
/// The schema fairing must come after the pool fairing, since it takes a
/// connection from the pool to prepare the database.
pub fn custom(figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .mount("/", api::routes())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(Db::fairing())
        .attach(DatabaseFairing)
}

/// A server over a throwaway database file, with fixed test config.
#[cfg(test)]
pub(crate) fn test_rocket(db_path: &std::path::Path) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("databases.survey_db.url", db_path.display().to_string()))
        .merge(("jwt_secret", "test-jwt-secret"))
        .merge(("session_ttl", 3600))
        .merge(("report_utc_offset", 9));
    custom(figment)
}
