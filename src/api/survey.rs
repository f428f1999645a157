use chrono::Utc;
use rocket::{
    http::CookieJar,
    response::{content::RawHtml, Redirect},
    serde::json::Json,
    Route, State,
};
use rocket_sync_db_pools::rusqlite;
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        answer::{self, AnswerSpec},
        auth::AuthToken,
        participant::{self, Participant},
        question::{self, QuestionDescription},
        sqlite::{Db, ParticipantId},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        home,
        create_participant,
        question_page,
        question_page_no_session,
        get_questions,
        submit,
        submit_no_session,
    ]
}

/// Static page shells; the survey UI itself is rendered client-side.
const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Survey</title></head>
<body><div id="app" data-page="home"></div></body>
</html>
"#;

const QUESTION_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Survey Questions</title></head>
<body><div id="app" data-page="question"></div></body>
</html>
"#;

/// The landing page: where participants start the survey.
#[get("/")]
fn home() -> RawHtml<&'static str> {
    RawHtml(HOME_PAGE)
}

/// Register a new participant and start their survey session.
#[post("/participants", format = "json", data = "<request>")]
async fn create_participant(
    db: Db,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
    request: Json<IntakeRequest>,
) -> Result<Json<IntakeResponse>> {
    let request = request.into_inner();
    let created_at = Utc::now();
    let participant = db
        .run(move |conn| -> rusqlite::Result<Participant> {
            let id =
                participant::insert(conn, &request.name, request.age, &request.gender, created_at)?;
            Ok(Participant {
                id,
                name: request.name,
                age: request.age,
                gender: request.gender,
                created_at,
            })
        })
        .await?;
    info!("Registered participant {}", participant.id);

    cookies.add(AuthToken::new(&participant).into_cookie(config));

    Ok(Json(IntakeResponse {
        participant_id: participant.id,
        redirect: uri!(question_page).to_string(),
    }))
}

/// The question-answering page. Needs a live survey session.
#[get("/question", rank = 1)]
fn question_page(_session: AuthToken<Participant>) -> RawHtml<&'static str> {
    RawHtml(QUESTION_PAGE)
}

/// Without a session, back to the landing page.
#[get("/question", rank = 2)]
fn question_page_no_session() -> Redirect {
    Redirect::to(uri!(home))
}

/// The question catalogue served to participants: active questions only,
/// in presentation order.
#[get("/questions")]
async fn get_questions(db: Db) -> Result<Json<Vec<QuestionDescription>>> {
    let questions = db.run(|conn| question::active_ordered(conn)).await?;
    Ok(Json(
        questions.into_iter().map(QuestionDescription::from).collect(),
    ))
}

/// Record a participant's answers. The whole batch persists, or none of it.
#[post("/submit", format = "json", data = "<request>", rank = 1)]
async fn submit(
    session: AuthToken<Participant>,
    db: Db,
    request: Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>> {
    let participant_id = session.id();
    let specs = request.into_inner().quizzes;

    let saved = db
        .run(move |conn| -> Result<usize> {
            let tx = conn.transaction()?;
            // The token is signed, but the row must still be there.
            if !participant::exists(&tx, participant_id)? {
                return Err(Error::unauthorized(format!(
                    "no participant {participant_id}"
                )));
            }
            for spec in &specs {
                if !question::exists(&tx, spec.question_id)? {
                    return Err(Error::not_found(format!("question {}", spec.question_id)));
                }
            }
            let saved = answer::insert_all(&tx, participant_id, &specs)?;
            tx.commit()?;
            Ok(saved)
        })
        .await?;
    info!("Participant {participant_id} submitted {saved} answers");

    Ok(Json(SubmitResponse { saved }))
}

/// Submissions without a session go back to the start.
#[post("/submit", rank = 2)]
fn submit_no_session() -> Redirect {
    Redirect::to(uri!(home))
}

/// A new participant's details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRequest {
    pub name: String,
    pub age: u32,
    pub gender: String,
}

/// Acknowledgement of a registration: the new ID and where to go next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeResponse {
    pub participant_id: ParticipantId,
    pub redirect: String,
}

/// A batch of answers for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub quizzes: Vec<AnswerSpec>,
}

/// Acknowledgement of a recorded submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub saved: usize,
}
