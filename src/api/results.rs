use rocket::{serde::json::Json, Route};
use rocket_sync_db_pools::rusqlite;

use crate::{
    error::Result,
    model::{
        answer::{self, AnswerWithAge},
        participant::{self, Participant},
        question::{self, Question},
        report::{self, ResultsReport},
        sqlite::Db,
    },
};

pub fn routes() -> Vec<Route> {
    routes![results]
}

/// The public results report: chart-ready aggregates over everything
/// collected so far.
#[get("/results")]
async fn results(db: Db) -> Result<Json<ResultsReport>> {
    let (participants, questions, answers) = db
        .run(
            |conn| -> rusqlite::Result<(Vec<Participant>, Vec<Question>, Vec<AnswerWithAge>)> {
                Ok((
                    participant::all(conn)?,
                    question::all_ordered(conn)?,
                    answer::all_with_ages(conn)?,
                ))
            },
        )
        .await?;
    Ok(Json(report::results_report(&participants, &questions, &answers)))
}

#[cfg(test)]
mod tests {
    use backend_test::backend_test;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::json,
    };

    use crate::model::report::ChartKind;

    use super::*;

    async fn fetch_report(client: &Client) -> ResultsReport {
        let response = client.get(uri!(results)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        response.into_json().await.unwrap()
    }

    async fn register_and_submit(client: &Client, name: &str, age: u32, gender: &str, answers: &[(i64, &str)]) {
        let response = client
            .post("/participants")
            .header(ContentType::JSON)
            .body(json!({ "name": name, "age": age, "gender": gender }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let quizzes = answers
            .iter()
            .map(|(question_id, chosen_answer)| {
                json!({ "question_id": question_id, "chosen_answer": chosen_answer })
            })
            .collect::<Vec<_>>();
        let response = client
            .post("/submit")
            .header(ContentType::JSON)
            .body(json!({ "quizzes": quizzes }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[backend_test]
    async fn empty_survey_gives_empty_report(client: Client) {
        let report = fetch_report(&client).await;
        assert_eq!(report.participants, 0);
        assert!(report.age.labels.is_empty());
        assert!(report.gender.labels.is_empty());
        // Seeded questions exist, but none have answers yet.
        assert!(report.questions.is_empty());
    }

    #[backend_test]
    async fn report_aggregates_all_submissions(client: Client, db: Db) {
        let questions = db.run(|conn| question::active_ordered(conn)).await.unwrap();
        let (first, second) = (questions[0].id, questions[1].id);

        register_and_submit(&client, "Kim", 25, "F", &[(first, "Yes")]).await;
        register_and_submit(&client, "Lee", 49, "M", &[(first, "No"), (second, "Yes")]).await;
        register_and_submit(&client, "Park", 50, "F", &[(first, "No")]).await;

        let report = fetch_report(&client).await;
        assert_eq!(report.participants, 3);

        assert_eq!(report.age.kind, ChartKind::Pie);
        assert_eq!(report.age.labels, ["25", "49", "50"]);
        assert_eq!(report.age.series[0].data, [1, 1, 1]);

        assert_eq!(report.gender.kind, ChartKind::Pie);
        assert_eq!(report.gender.labels, ["F", "M"]);
        assert_eq!(report.gender.series[0].data, [2, 1]);

        // Only the two answered questions appear, in catalogue order.
        assert_eq!(report.questions.len(), 2);
        let first_report = &report.questions[0];
        assert_eq!(first_report.question_id, first);
        assert_eq!(first_report.answers.kind, ChartKind::Bar);
        assert_eq!(first_report.answers.labels, ["No", "Yes"]);
        assert_eq!(first_report.answers.series[0].data, [2, 1]);

        // "No" came from the 40s and 50s+ bands, "Yes" from the 20s.
        let by_band = &first_report.by_age_band;
        assert_eq!(by_band.labels, ["No", "Yes"]);
        let series_data = |name: &str| {
            by_band
                .series
                .iter()
                .find(|series| series.name == name)
                .map(|series| series.data.clone())
                .unwrap()
        };
        assert_eq!(series_data("20s"), [0, 1]);
        assert_eq!(series_data("40s"), [1, 0]);
        assert_eq!(series_data("50s+"), [1, 0]);

        let second_report = &report.questions[1];
        assert_eq!(second_report.question_id, second);
        assert_eq!(second_report.answers.labels, ["Yes"]);
        assert_eq!(second_report.answers.series[0].data, [1]);
    }
}
