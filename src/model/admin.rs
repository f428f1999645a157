use std::ops::{Deref, DerefMut};

use argon2::Config;
use rand::Rng;
use rocket_sync_db_pools::rusqlite::{self, params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::model::sqlite::AdminId;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// The admin account seeded into an empty database.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "changeme123";

/// The stored fields of an admin account.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Check a password attempt against the stored hash.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// An admin that has not been inserted yet, so has no ID.
pub type NewAdmin = AdminCore;

/// A stored admin account with its row ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub admin: AdminCore,
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// Plaintext credentials, as submitted on the login form. Only the hashed
/// form ever reaches the database.
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = ();

    /// Hash the password to produce a storable admin. Fails if the username is
    /// empty or the password is shorter than [`MIN_PASSWORD_LENGTH`].
    fn try_from(cred: AdminCredentials) -> Result<Self, Self::Error> {
        if cred.username.is_empty() || cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(());
        }

        // Argon2 recommends a 16 byte salt: https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(cred.password.as_bytes(), &salt, &Config::default()).unwrap(); // Safe because the default `Config` is valid.
        Ok(Self {
            username: cred.username,
            password_hash,
        })
    }
}

/// Look up an admin by username.
pub fn by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<Admin>> {
    conn.query_row(
        "SELECT id, username, password FROM admins WHERE username = ?1",
        params![username],
        |row| {
            Ok(Admin {
                id: row.get(0)?,
                admin: AdminCore {
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                },
            })
        },
    )
    .optional()
}

/// Insert a new admin, returning its ID.
pub fn insert(conn: &Connection, admin: &NewAdmin) -> rusqlite::Result<AdminId> {
    conn.execute(
        "INSERT INTO admins (username, password) VALUES (?1, ?2)",
        params![admin.username, admin.password_hash],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Seed the default admin account if it does not exist yet.
pub fn ensure_admin_exists(conn: &Connection) -> rusqlite::Result<()> {
    if by_username(conn, DEFAULT_ADMIN_USERNAME)?.is_some() {
        return Ok(());
    }
    let admin = NewAdmin::try_from(AdminCredentials {
        username: DEFAULT_ADMIN_USERNAME.to_string(),
        password: DEFAULT_ADMIN_PASSWORD.to_string(),
    })
    .unwrap(); // Safe because the default credentials are acceptable.
    insert(conn, &admin)?;
    warn!("Seeded default admin {DEFAULT_ADMIN_USERNAME:?}; change its password before going live");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::model::sqlite::init_schema;

    use super::*;

    #[test]
    fn credentials_are_hashed_and_verified() {
        let admin = NewAdmin::try_from(AdminCredentials {
            username: "coordinator".to_string(),
            password: "totallysecurepassword".to_string(),
        })
        .unwrap();

        assert_ne!(admin.password_hash, "totallysecurepassword");
        assert!(admin.verify_password("totallysecurepassword"));
        assert!(!admin.verify_password("totallysecurepasswore"));
    }

    #[test]
    fn weak_credentials_are_rejected() {
        assert!(NewAdmin::try_from(AdminCredentials {
            username: String::new(),
            password: "totallysecurepassword".to_string(),
        })
        .is_err());
        assert!(NewAdmin::try_from(AdminCredentials {
            username: "coordinator".to_string(),
            password: "short".to_string(),
        })
        .is_err());
    }

    #[test]
    fn default_admin_seed_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        ensure_admin_exists(&conn).unwrap();
        ensure_admin_exists(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM admins", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let admin = by_username(&conn, DEFAULT_ADMIN_USERNAME).unwrap().unwrap();
        assert!(admin.verify_password(DEFAULT_ADMIN_PASSWORD));
    }
}
