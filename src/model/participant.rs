use chrono::{DateTime, Utc};
use rocket_sync_db_pools::rusqlite::{
    self, params, types::Type, Connection, OptionalExtension, Row,
};
use serde::{Deserialize, Serialize};

use crate::model::sqlite::ParticipantId;

/// A registered survey participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub created_at: DateTime<Utc>,
}

/// Insert a new participant, returning their ID.
pub fn insert(
    conn: &Connection,
    name: &str,
    age: u32,
    gender: &str,
    created_at: DateTime<Utc>,
) -> rusqlite::Result<ParticipantId> {
    conn.execute(
        "INSERT INTO participants (name, age, gender, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![name, age, gender, created_at.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Is there a participant with this ID?
pub fn exists(conn: &Connection, id: ParticipantId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM participants WHERE id = ?1",
        params![id],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

/// Every participant, oldest first.
pub fn all(conn: &Connection) -> rusqlite::Result<Vec<Participant>> {
    conn.prepare("SELECT id, name, age, gender, created_at FROM participants ORDER BY id")?
        .query_map([], from_row)?
        .collect()
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(err)))?
        .with_timezone(&Utc);
    Ok(Participant {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        gender: row.get(3)?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{SubsecRound, Utc};

    use crate::model::sqlite::init_schema;

    use super::*;

    #[test]
    fn insert_and_read_back() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let created_at = Utc::now().trunc_subsecs(0);
        let id = insert(&conn, "Kim", 25, "F", created_at).unwrap();
        assert!(exists(&conn, id).unwrap());
        assert!(!exists(&conn, id + 1).unwrap());

        let participants = all(&conn).unwrap();
        assert_eq!(
            participants,
            [Participant {
                id,
                name: "Kim".to_string(),
                age: 25,
                gender: "F".to_string(),
                created_at,
            }]
        );
    }
}
