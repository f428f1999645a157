use rocket::form::{self, FromFormField, ValueField};
use rocket_sync_db_pools::rusqlite::{self, params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::model::sqlite::QuestionId;

/// The fixed survey seeded into an empty database.
pub const DEFAULT_QUESTIONS: [&str; 5] = [
    "Do you regularly get at least seven hours of sleep?",
    "Do you exercise at least twice a week?",
    "Do you eat breakfast on most days?",
    "Do you often feel stressed at work or school?",
    "Are you satisfied with your work-life balance?",
];

/// A survey question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub content: String,
    pub order_num: i64,
    pub is_active: bool,
}

/// The subset of a question shown to participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDescription {
    pub id: QuestionId,
    pub content: String,
}

impl From<Question> for QuestionDescription {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            content: question.content,
        }
    }
}

/// Target of the question-management form: either create a new question or
/// edit the one with the given ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionTarget {
    New,
    Existing(QuestionId),
}

impl<'r> FromFormField<'r> for QuestionTarget {
    fn from_value(field: ValueField<'r>) -> form::Result<'r, Self> {
        if field.value == "new" {
            return Ok(Self::New);
        }
        field
            .value
            .parse::<QuestionId>()
            .map(Self::Existing)
            .map_err(|_| form::Error::validation("expected `new` or a question ID").into())
    }
}

/// The questions served to participants: active only, in presentation order.
pub fn active_ordered(conn: &Connection) -> rusqlite::Result<Vec<Question>> {
    conn.prepare(
        "SELECT id, content, order_num, is_active FROM questions
         WHERE is_active = 1 ORDER BY order_num, id",
    )?
    .query_map([], from_row)?
    .collect()
}

/// Every question, including inactive ones, in presentation order.
pub fn all_ordered(conn: &Connection) -> rusqlite::Result<Vec<Question>> {
    conn.prepare(
        "SELECT id, content, order_num, is_active FROM questions ORDER BY order_num, id",
    )?
    .query_map([], from_row)?
    .collect()
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        content: row.get(1)?,
        order_num: row.get(2)?,
        is_active: row.get(3)?,
    })
}

/// Is there a question with this ID?
pub fn exists(conn: &Connection, id: QuestionId) -> rusqlite::Result<bool> {
    conn.query_row("SELECT 1 FROM questions WHERE id = ?1", params![id], |_| {
        Ok(())
    })
    .optional()
    .map(|found| found.is_some())
}

/// Insert a new question, returning its ID.
pub fn insert(
    conn: &Connection,
    content: &str,
    order_num: i64,
    is_active: bool,
) -> rusqlite::Result<QuestionId> {
    conn.execute(
        "INSERT INTO questions (content, order_num, is_active) VALUES (?1, ?2, ?3)",
        params![content, order_num, is_active],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite an existing question. Returns false if the ID is unknown.
pub fn update(
    conn: &Connection,
    id: QuestionId,
    content: &str,
    order_num: i64,
    is_active: bool,
) -> rusqlite::Result<bool> {
    let updated = conn.execute(
        "UPDATE questions SET content = ?2, order_num = ?3, is_active = ?4 WHERE id = ?1",
        params![id, content, order_num, is_active],
    )?;
    Ok(updated > 0)
}

/// Seed the default survey into an empty questions table.
/// Does nothing once any question exists.
pub fn ensure_default_questions(conn: &Connection) -> rusqlite::Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }
    for (index, content) in DEFAULT_QUESTIONS.iter().enumerate() {
        insert(conn, content, index as i64 + 1, true)?;
    }
    info!("Seeded the default question set");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::model::sqlite::init_schema;

    use super::*;

    #[test]
    fn catalogue_is_active_only_and_ordered() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let last = insert(&conn, "Last", 10, true).unwrap();
        let first = insert(&conn, "First", 1, true).unwrap();
        insert(&conn, "Hidden", 2, false).unwrap();

        let catalogue = active_ordered(&conn).unwrap();
        assert_eq!(
            catalogue.iter().map(|q| q.id).collect::<Vec<_>>(),
            [first, last]
        );

        let everything = all_ordered(&conn).unwrap();
        assert_eq!(everything.len(), 3);
        assert!(everything.iter().any(|q| q.content == "Hidden"));
    }

    #[test]
    fn update_roundtrip_and_unknown_id() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let id = insert(&conn, "Original", 1, true).unwrap();
        assert!(update(&conn, id, "Edited", 7, false).unwrap());
        assert_eq!(
            all_ordered(&conn).unwrap(),
            [Question {
                id,
                content: "Edited".to_string(),
                order_num: 7,
                is_active: false,
            }]
        );

        assert!(!update(&conn, id + 40, "Nope", 1, true).unwrap());
    }

    #[test]
    fn default_seed_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        ensure_default_questions(&conn).unwrap();
        ensure_default_questions(&conn).unwrap();

        let seeded = active_ordered(&conn).unwrap();
        assert_eq!(
            seeded.iter().map(|q| q.content.as_str()).collect::<Vec<_>>(),
            DEFAULT_QUESTIONS
        );
        assert_eq!(
            seeded.iter().map(|q| q.order_num).collect::<Vec<_>>(),
            [1, 2, 3, 4, 5]
        );
    }
}
