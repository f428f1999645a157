//! Aggregation of raw survey rows into chart payloads.
//!
//! All aggregation happens in application code over rows loaded from the
//! store, with `BTreeMap` tallies so every ordering is deterministic.

mod age_band;
mod chart;

pub use age_band::AgeBand;
pub use chart::{ChartKind, ChartSpec, Series};

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::{
    answer::AnswerWithAge, participant::Participant, question::Question, sqlite::QuestionId,
};

/// The full aggregate report served to the results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsReport {
    pub participants: u64,
    pub age: ChartSpec,
    pub gender: ChartSpec,
    pub questions: Vec<QuestionReport>,
}

/// Aggregates for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionReport {
    pub question_id: QuestionId,
    pub content: String,
    pub answers: ChartSpec,
    pub by_age_band: ChartSpec,
}

/// Build the aggregate results report.
///
/// Questions follow the given (presentation) order; questions nobody has
/// answered produce no report.
pub fn results_report(
    participants: &[Participant],
    questions: &[Question],
    answers: &[AnswerWithAge],
) -> ResultsReport {
    let mut ages: BTreeMap<u32, u64> = BTreeMap::new();
    let mut genders: BTreeMap<String, u64> = BTreeMap::new();
    for participant in participants {
        *ages.entry(participant.age).or_default() += 1;
        *genders.entry(participant.gender.clone()).or_default() += 1;
    }

    let questions = questions
        .iter()
        .filter_map(|question| question_report(question, answers))
        .collect();

    ResultsReport {
        participants: participants.len() as u64,
        age: ChartSpec::from_tallies(ChartKind::Pie, "Participants by age", "participants", &ages),
        gender: ChartSpec::from_tallies(
            ChartKind::Pie,
            "Participants by gender",
            "participants",
            &genders,
        ),
        questions,
    }
}

/// Aggregate one question's answers, or `None` if it has none.
fn question_report(question: &Question, answers: &[AnswerWithAge]) -> Option<QuestionReport> {
    // Answer label -> (total, count per age band).
    let mut tallies: BTreeMap<&str, (u64, [u64; 5])> = BTreeMap::new();
    for answer in answers {
        if answer.question_id != question.id {
            continue;
        }
        let entry = tallies.entry(&answer.chosen_answer).or_default();
        entry.0 += 1;
        entry.1[AgeBand::of(answer.age) as usize] += 1;
    }
    if tallies.is_empty() {
        return None;
    }

    let labels: Vec<String> = tallies.keys().map(|label| label.to_string()).collect();
    let totals: Vec<u64> = tallies.values().map(|(total, _)| *total).collect();
    let band_series = AgeBand::ALL
        .iter()
        .map(|band| Series {
            name: band.label().to_string(),
            data: tallies
                .values()
                .map(|(_, bands)| bands[*band as usize])
                .collect(),
        })
        .collect();

    Some(QuestionReport {
        question_id: question.id,
        content: question.content.clone(),
        answers: ChartSpec {
            kind: ChartKind::Bar,
            title: format!("Answers: {}", question.content),
            labels: labels.clone(),
            series: vec![Series {
                name: "responses".to_string(),
                data: totals,
            }],
        },
        by_age_band: ChartSpec {
            kind: ChartKind::Bar,
            title: format!("Answers by age band: {}", question.content),
            labels,
            series: band_series,
        },
    })
}

/// Participants per calendar day as a line chart, with timestamps shifted
/// by the configured offset before the date is taken.
pub fn dashboard_report(participants: &[Participant], utc_offset_hours: i32) -> ChartSpec {
    let offset = Duration::hours(utc_offset_hours.into());
    let mut days: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for participant in participants {
        let date = (participant.created_at + offset).date_naive();
        *days.entry(date).or_default() += 1;
    }
    ChartSpec::from_tallies(ChartKind::Line, "Participants per day", "participants", &days)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    fn participant(id: i64, age: u32, gender: &str, created_at: &str) -> Participant {
        Participant {
            id,
            name: format!("participant{id}"),
            age,
            gender: gender.to_string(),
            created_at: NaiveDateTime::parse_from_str(created_at, "%Y-%m-%dT%H:%M:%S")
                .unwrap()
                .and_utc(),
        }
    }

    fn question(id: i64, content: &str, order_num: i64) -> Question {
        Question {
            id,
            content: content.to_string(),
            order_num,
            is_active: true,
        }
    }

    fn answer(question_id: i64, chosen_answer: &str, age: u32) -> AnswerWithAge {
        AnswerWithAge {
            question_id,
            chosen_answer: chosen_answer.to_string(),
            age,
        }
    }

    #[test]
    fn report_tallies_distributions() {
        let participants = [
            participant(1, 25, "F", "2026-08-01T10:00:00"),
            participant(2, 49, "M", "2026-08-01T11:00:00"),
            participant(3, 25, "F", "2026-08-02T09:00:00"),
        ];
        let questions = [question(1, "Sleep?", 1), question(2, "Exercise?", 2)];
        let answers = [
            answer(1, "Yes", 25),
            answer(1, "No", 49),
            answer(1, "Yes", 25),
            answer(2, "No", 25),
        ];

        let report = results_report(&participants, &questions, &answers);
        assert_eq!(report.participants, 3);

        assert_eq!(report.age.labels, ["25", "49"]);
        assert_eq!(report.age.series[0].data, [2, 1]);
        assert_eq!(report.gender.labels, ["F", "M"]);
        assert_eq!(report.gender.series[0].data, [2, 1]);

        assert_eq!(report.questions.len(), 2);
        let first = &report.questions[0];
        assert_eq!(first.question_id, 1);
        assert_eq!(first.answers.labels, ["No", "Yes"]);
        assert_eq!(first.answers.series[0].data, [1, 2]);

        // Cross-tab: one series per band, aligned with the answer labels.
        let bands = &first.by_age_band.series;
        assert_eq!(bands.len(), 5);
        let twenties = bands.iter().find(|series| series.name == "20s").unwrap();
        assert_eq!(twenties.data, [0, 2]);
        let forties = bands.iter().find(|series| series.name == "40s").unwrap();
        assert_eq!(forties.data, [1, 0]);
    }

    #[test]
    fn unanswered_questions_are_omitted() {
        let questions = [question(1, "Sleep?", 1), question(2, "Exercise?", 2)];
        let answers = [answer(2, "Yes", 30)];

        let report = results_report(&[], &questions, &answers);
        assert_eq!(report.questions.len(), 1);
        assert_eq!(report.questions[0].question_id, 2);
    }

    #[test]
    fn empty_data_gives_empty_report() {
        let report = results_report(&[], &[], &[]);
        assert_eq!(report.participants, 0);
        assert!(report.age.labels.is_empty());
        assert!(report.gender.labels.is_empty());
        assert!(report.questions.is_empty());
    }

    #[test]
    fn dashboard_groups_by_shifted_date() {
        // 20:00 UTC is past midnight at +9, 02:00 UTC is not.
        let participants = [
            participant(1, 25, "F", "2026-08-24T20:00:00"),
            participant(2, 30, "M", "2026-08-24T02:00:00"),
            participant(3, 41, "F", "2026-08-24T23:59:59"),
        ];

        let chart = dashboard_report(&participants, 9);
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.labels, ["2026-08-24", "2026-08-25"]);
        assert_eq!(chart.series[0].data, [1, 2]);

        let unshifted = dashboard_report(&participants, 0);
        assert_eq!(unshifted.labels, ["2026-08-24"]);
        assert_eq!(unshifted.series[0].data, [3]);
    }
}
