use rocket::{
    form::{self, Form, Strict},
    http::{Cookie, CookieJar},
    request::FlashMessage,
    response::{content::RawHtml, Flash, Redirect},
    serde::json::Json,
    Route, State,
};
use rocket_sync_db_pools::rusqlite;

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        admin::{self, Admin},
        answer::{self, Answer},
        auth::{AuthToken, SESSION_TOKEN_COOKIE},
        pagination::{Paginated, PaginationRequest},
        participant,
        question::{self, Question, QuestionTarget},
        report::{self, ChartSpec},
        sqlite::Db,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        login_page,
        login,
        logout,
        dashboard,
        dashboard_no_session,
        questions,
        questions_no_session,
        upsert_question,
        upsert_question_no_session,
        answer_list,
        answer_list_no_session,
    ]
}

/// Login page shell with a slot for the flashed failure notice.
const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Admin Login</title></head>
<body>
<div id="app" data-page="admin-login">
<!--flash-->
<form method="post" action="/admin">
<label>Username <input type="text" name="username"></label>
<label>Password <input type="password" name="password"></label>
<button type="submit">Log in</button>
</form>
</div>
</body>
</html>
"#;

/// The admin login page, showing the outcome of a failed attempt.
#[get("/admin")]
fn login_page(flash: Option<FlashMessage<'_>>) -> RawHtml<String> {
    let notice = flash
        .map(|flash| format!(r#"<p class="flash">{}</p>"#, flash.message()))
        .unwrap_or_default();
    RawHtml(LOGIN_PAGE.replace("<!--flash-->", &notice))
}

/// Check the given credentials and open an admin session.
#[post("/admin", data = "<request>")]
async fn login(
    db: Db,
    config: &State<Config>,
    cookies: &CookieJar<'_>,
    request: Form<Strict<LoginRequest>>,
) -> Result<LoginResponse> {
    let LoginRequest { username, password } = request.into_inner().into_inner();
    let admin = db
        .run(move |conn| admin::by_username(conn, &username))
        .await?
        .filter(|admin| admin.verify_password(&password));

    Ok(match admin {
        Some(admin) => {
            cookies.add(AuthToken::new(&admin).into_cookie(config));
            info!("Admin {} logged in", admin.username);
            LoginResponse::Success(Redirect::to(uri!(dashboard)))
        }
        None => {
            warn!("Rejected an admin login attempt");
            LoginResponse::Failure(Flash::error(
                Redirect::to(uri!(login_page)),
                "Invalid username or password.",
            ))
        }
    })
}

/// Drop the session and return to the login page.
#[get("/admin/logout")]
fn logout(cookies: &CookieJar<'_>) -> Redirect {
    cookies.remove(Cookie::named(SESSION_TOKEN_COOKIE));
    Redirect::to(uri!(login_page))
}

/// Participant intake over time, bucketed by (offset-local) day.
#[get("/admin/dashboard", rank = 1)]
async fn dashboard(
    _session: AuthToken<Admin>,
    db: Db,
    config: &State<Config>,
) -> Result<Json<ChartSpec>> {
    let participants = db.run(|conn| participant::all(conn)).await?;
    Ok(Json(report::dashboard_report(
        &participants,
        config.report_utc_offset(),
    )))
}

#[get("/admin/dashboard", rank = 2)]
fn dashboard_no_session() -> Redirect {
    Redirect::to(uri!(login_page))
}

/// The full question catalogue for management, inactive questions included.
#[get("/admin/dashboard/questions", rank = 1)]
async fn questions(_session: AuthToken<Admin>, db: Db) -> Result<Json<Vec<Question>>> {
    Ok(Json(db.run(|conn| question::all_ordered(conn)).await?))
}

#[get("/admin/dashboard/questions", rank = 2)]
fn questions_no_session() -> Redirect {
    Redirect::to(uri!(login_page))
}

/// Create or edit a question, depending on the submitted target.
#[post("/admin/dashboard/questions", data = "<form>", rank = 1)]
async fn upsert_question(
    _session: AuthToken<Admin>,
    db: Db,
    form: Form<QuestionForm>,
) -> Result<Redirect> {
    let form = form.into_inner();
    db.run(move |conn| match form.question_id {
        QuestionTarget::New => {
            let id = question::insert(conn, &form.content, form.order_num, form.is_active)?;
            info!("Created question {id}");
            Ok(())
        }
        QuestionTarget::Existing(id) => {
            if question::update(conn, id, &form.content, form.order_num, form.is_active)? {
                info!("Updated question {id}");
                Ok(())
            } else {
                Err(Error::not_found(format!("question {id}")))
            }
        }
    })
    .await?;
    Ok(Redirect::to(uri!(questions)))
}

#[post("/admin/dashboard/questions", rank = 2)]
fn upsert_question_no_session() -> Redirect {
    Redirect::to(uri!(login_page))
}

/// Raw answers, paginated newest-first. Parse errors in the pagination
/// query are caught here so they surface as a client error instead of a
/// forward to the logged-out route.
#[get("/admin/dashboard/question-list?<pagination..>", rank = 1)]
async fn answer_list(
    _session: AuthToken<Admin>,
    db: Db,
    pagination: form::Result<'_, PaginationRequest>,
) -> Result<Json<Paginated<Answer>>> {
    let pagination = pagination.map_err(|errors| Error::unprocessable(errors.to_string()))?;
    let (total, items) = db
        .run(move |conn| -> rusqlite::Result<(u64, Vec<Answer>)> {
            Ok((
                answer::count(conn)?,
                answer::page(conn, pagination.page_size(), pagination.skip())?,
            ))
        })
        .await?;
    Ok(Json(pagination.to_paginated(total, items)))
}

#[get("/admin/dashboard/question-list", rank = 2)]
fn answer_list_no_session() -> Redirect {
    Redirect::to(uri!(login_page))
}

/// Submitted login credentials.
#[derive(Debug, Clone, FromForm)]
struct LoginRequest {
    username: String,
    password: String,
}

/// Either redirect into the dashboard or flash a failure back to the form.
#[derive(Responder)]
enum LoginResponse {
    Success(Redirect),
    Failure(Flash<Redirect>),
}

/// The question management form. `question_id` is the literal `new` for
/// creation, or the ID of the question to edit.
#[derive(Debug, Clone, FromForm)]
struct QuestionForm {
    question_id: QuestionTarget,
    content: String,
    order_num: i64,
    is_active: bool,
}
