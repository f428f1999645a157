use rocket_sync_db_pools::rusqlite::{self, params, Connection};
use serde::{Deserialize, Serialize};

use crate::model::sqlite::{AnswerId, ParticipantId, QuestionId};

/// A recorded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub chosen_answer: String,
    pub participant_id: ParticipantId,
    pub question_id: QuestionId,
}

/// One entry of a submission: the question and the chosen option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSpec {
    pub question_id: QuestionId,
    pub chosen_answer: String,
}

/// An answer joined to its participant's age, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerWithAge {
    pub question_id: QuestionId,
    pub chosen_answer: String,
    pub age: u32,
}

/// Insert every answer of one submission, returning how many were written.
/// Callers wanting all-or-nothing semantics run this inside a transaction.
pub fn insert_all(
    conn: &Connection,
    participant_id: ParticipantId,
    specs: &[AnswerSpec],
) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO answers (chosen_answer, participant_id, question_id) VALUES (?1, ?2, ?3)",
    )?;
    for spec in specs {
        stmt.execute(params![spec.chosen_answer, participant_id, spec.question_id])?;
    }
    Ok(specs.len())
}

/// Total number of recorded answers.
pub fn count(conn: &Connection) -> rusqlite::Result<u64> {
    conn.query_row("SELECT COUNT(*) FROM answers", [], |row| row.get::<_, i64>(0))
        .map(|count| count as u64)
}

/// One page of answers, newest first.
pub fn page(conn: &Connection, limit: u32, offset: u64) -> rusqlite::Result<Vec<Answer>> {
    // SQLite's OFFSET is a signed 64-bit value.
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    conn.prepare(
        "SELECT id, chosen_answer, participant_id, question_id FROM answers
         ORDER BY id DESC LIMIT ?1 OFFSET ?2",
    )?
    .query_map(params![limit, offset], |row| {
        Ok(Answer {
            id: row.get(0)?,
            chosen_answer: row.get(1)?,
            participant_id: row.get(2)?,
            question_id: row.get(3)?,
        })
    })?
    .collect()
}

/// Every answer joined to its participant's age.
pub fn all_with_ages(conn: &Connection) -> rusqlite::Result<Vec<AnswerWithAge>> {
    conn.prepare(
        "SELECT answers.question_id, answers.chosen_answer, participants.age
         FROM answers JOIN participants ON answers.participant_id = participants.id
         ORDER BY answers.id",
    )?
    .query_map([], |row| {
        Ok(AnswerWithAge {
            question_id: row.get(0)?,
            chosen_answer: row.get(1)?,
            age: row.get(2)?,
        })
    })?
    .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::model::{participant, question, sqlite::init_schema};

    use super::*;

    #[test]
    fn batch_insert_pagination_and_join() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let kim = participant::insert(&conn, "Kim", 25, "F", Utc::now()).unwrap();
        let q1 = question::insert(&conn, "Q1", 1, true).unwrap();
        let q2 = question::insert(&conn, "Q2", 2, true).unwrap();

        let specs = [
            AnswerSpec {
                question_id: q1,
                chosen_answer: "Yes".to_string(),
            },
            AnswerSpec {
                question_id: q2,
                chosen_answer: "No".to_string(),
            },
        ];
        assert_eq!(insert_all(&conn, kim, &specs).unwrap(), 2);
        assert_eq!(count(&conn).unwrap(), 2);

        // Newest first, one per page.
        let first_page = page(&conn, 1, 0).unwrap();
        let second_page = page(&conn, 1, 1).unwrap();
        assert_eq!(first_page.len(), 1);
        assert_eq!(second_page.len(), 1);
        assert!(first_page[0].id > second_page[0].id);
        assert_eq!(first_page[0].question_id, q2);

        let with_ages = all_with_ages(&conn).unwrap();
        assert_eq!(
            with_ages,
            [
                AnswerWithAge {
                    question_id: q1,
                    chosen_answer: "Yes".to_string(),
                    age: 25,
                },
                AnswerWithAge {
                    question_id: q2,
                    chosen_answer: "No".to_string(),
                    age: 25,
                },
            ]
        );
    }
}
