use std::collections::HashMap;

use crate::config::PassingThresholds;
use crate::models::{
    Classification, Language, Roster, Status, StatusCounts, StudentRecord, SubjectFailureSummary,
    SubjectScores,
};

pub fn classify(
    scores: &SubjectScores,
    thresholds: &PassingThresholds,
    language: Language,
) -> Classification {
    let failed_subjects: Vec<String> = scores
        .iter()
        .filter(|(subject, score)| *score < f64::from(thresholds.for_subject(subject)))
        .map(|(subject, _)| subject.to_string())
        .collect();

    let status = status_for(failed_subjects.len());
    Classification {
        status,
        final_grade: status.label(language).to_string(),
        failed_subjects,
    }
}

pub fn status_for(failed_count: usize) -> Status {
    match failed_count {
        0 => Status::Pass,
        1..=2 => Status::Retake,
        _ => Status::Fail,
    }
}

/// Returns a copy of `roster` with every classification recomputed.
pub fn classify_all(roster: &Roster, thresholds: &PassingThresholds, language: Language) -> Roster {
    let mut updated = roster.clone();
    for student in updated.iter_mut() {
        student.classification = Some(classify(&student.scores, thresholds, language));
    }
    updated
}

pub fn count_by_status<'a, I>(students: I) -> StatusCounts
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let mut counts = StatusCounts::default();
    for student in students {
        match student.classification.as_ref().map(|c| c.status) {
            Some(Status::Pass) => counts.pass += 1,
            Some(Status::Retake) => counts.retake += 1,
            Some(Status::Fail) => counts.fail += 1,
            None => counts.unclassified += 1,
        }
    }
    counts
}

/// Per-subject failure counts against the current thresholds, most failed first.
pub fn summarize_failures<'a, I>(students: I, thresholds: &PassingThresholds) -> Vec<SubjectFailureSummary>
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let mut order: Vec<String> = Vec::new();
    let mut map: HashMap<String, (usize, usize)> = HashMap::new();

    for student in students {
        for (subject, score) in student.scores.iter() {
            let entry = map.entry(subject.to_string()).or_insert_with(|| {
                order.push(subject.to_string());
                (0, 0)
            });
            entry.1 += 1;
            if score < f64::from(thresholds.for_subject(subject)) {
                entry.0 += 1;
            }
        }
    }

    let mut summaries: Vec<SubjectFailureSummary> = order
        .into_iter()
        .map(|subject| {
            let (failed_count, graded_count) = map.get(&subject).copied().unwrap_or_default();
            SubjectFailureSummary {
                subject,
                failed_count,
                graded_count,
            }
        })
        .collect();

    summaries.sort_by(|a, b| b.failed_count.cmp(&a.failed_count));
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Stage;

    fn scores(values: &[(&str, f64)]) -> SubjectScores {
        values.iter().map(|(s, v)| (*s, *v)).collect()
    }

    fn with_threshold(subject: &str, threshold: u32) -> PassingThresholds {
        let mut thresholds = PassingThresholds::default();
        thresholds.subjects.insert(subject.to_string(), threshold);
        thresholds
    }

    #[test]
    fn all_subjects_above_threshold_pass() {
        let result = classify(
            &scores(&[
                ("Arabic", 85.0),
                ("English", 70.0),
                ("Math", 60.0),
                ("Science", 75.0),
                ("Social", 80.0),
            ]),
            &PassingThresholds::default(),
            Language::English,
        );
        assert_eq!(result.status, Status::Pass);
        assert_eq!(result.final_grade, "Pass");
        assert!(result.failed_subjects.is_empty());
    }

    #[test]
    fn two_failures_mean_retake_in_score_order() {
        let result = classify(
            &scores(&[
                ("Arabic", 40.0),
                ("English", 35.0),
                ("Math", 55.0),
                ("Science", 60.0),
                ("Social", 50.0),
            ]),
            &PassingThresholds::default(),
            Language::Arabic,
        );
        assert_eq!(result.status, Status::Retake);
        assert_eq!(result.final_grade, "دور ثاني");
        assert_eq!(result.failed_subjects, vec!["Arabic", "English"]);
    }

    #[test]
    fn single_failure_is_retake() {
        let result = classify(
            &scores(&[("Math", 49.5), ("Arabic", 90.0)]),
            &PassingThresholds::default(),
            Language::English,
        );
        assert_eq!(result.status, Status::Retake);
        assert_eq!(result.failed_subjects, vec!["Math"]);
    }

    #[test]
    fn three_or_more_failures_fail() {
        let result = classify(
            &scores(&[
                ("Arabic", 30.0),
                ("English", 20.0),
                ("Math", 25.0),
                ("Physics", 40.0),
                ("Chemistry", 35.0),
            ]),
            &PassingThresholds::default(),
            Language::Arabic,
        );
        assert_eq!(result.status, Status::Fail);
        assert_eq!(result.final_grade, "راسب");
        assert_eq!(result.failed_subjects.len(), 5);

        let three = classify(
            &scores(&[("A", 10.0), ("B", 10.0), ("C", 10.0), ("D", 90.0)]),
            &PassingThresholds::default(),
            Language::English,
        );
        assert_eq!(three.status, Status::Fail);
    }

    #[test]
    fn score_equal_to_threshold_passes() {
        let thresholds = with_threshold("Math", 65);
        let result = classify(
            &scores(&[("Math", 65.0), ("Arabic", 50.0)]),
            &thresholds,
            Language::English,
        );
        assert_eq!(result.status, Status::Pass);
    }

    #[test]
    fn subject_threshold_overrides_default() {
        let thresholds = with_threshold("Math", 40);
        let result = classify(
            &scores(&[("Math", 45.0), ("Arabic", 45.0)]),
            &thresholds,
            Language::English,
        );
        assert_eq!(result.failed_subjects, vec!["Arabic"]);
    }

    #[test]
    fn thresholds_for_absent_subjects_are_ignored() {
        let thresholds = with_threshold("Physics", 90);
        let result = classify(&scores(&[("Math", 70.0)]), &thresholds, Language::English);
        assert_eq!(result.status, Status::Pass);
    }

    #[test]
    fn empty_scores_pass() {
        let result = classify(&SubjectScores::new(), &PassingThresholds::default(), Language::English);
        assert_eq!(result.status, Status::Pass);
        assert!(result.failed_subjects.is_empty());
    }

    #[test]
    fn clamped_scores_classify_as_bounds() {
        let result = classify(
            &scores(&[("Math", -20.0), ("Arabic", 250.0)]),
            &PassingThresholds::default(),
            Language::English,
        );
        assert_eq!(result.failed_subjects, vec!["Math"]);
    }

    #[test]
    fn classify_all_overwrites_derived_fields_only() {
        let mut stale = StudentRecord::new("1", "Ahmed", Stage::Prep)
            .with_scores(scores(&[("Math", 20.0)]));
        stale.classification = Some(Classification {
            status: Status::Pass,
            final_grade: "Pass".to_string(),
            failed_subjects: Vec::new(),
        });
        let roster: Roster = vec![stale, StudentRecord::new("2", "Sara", Stage::Kg)]
            .into_iter()
            .collect();

        let updated = classify_all(&roster, &PassingThresholds::default(), Language::English);

        let first = updated.get("1").unwrap();
        assert_eq!(first.classification.as_ref().unwrap().status, Status::Retake);
        assert_eq!(first.scores, roster.get("1").unwrap().scores);
        assert_eq!(
            updated.get("2").unwrap().classification.as_ref().unwrap().status,
            Status::Pass
        );
        // The input roster is left as it was.
        assert_eq!(
            roster.get("1").unwrap().classification.as_ref().unwrap().status,
            Status::Pass
        );
    }

    #[test]
    fn counts_unclassified_separately() {
        let roster: Roster = vec![
            StudentRecord::new("1", "Ahmed", Stage::Prep).with_scores(scores(&[("Math", 20.0)])),
            StudentRecord::new("2", "Sara", Stage::Prep),
        ]
        .into_iter()
        .collect();
        let classified = classify_all(&roster, &PassingThresholds::default(), Language::English);

        let before = count_by_status(roster.iter());
        assert_eq!(before.unclassified, 2);

        let after = count_by_status(classified.iter());
        assert_eq!(after.retake, 1);
        assert_eq!(after.pass, 1);
        assert_eq!(after.unclassified, 0);
    }

    #[test]
    fn failure_summary_orders_by_count() {
        let roster: Roster = vec![
            StudentRecord::new("1", "Ahmed", Stage::Prep)
                .with_scores(scores(&[("Arabic", 80.0), ("Math", 20.0)])),
            StudentRecord::new("2", "Sara", Stage::Prep)
                .with_scores(scores(&[("Arabic", 30.0), ("Math", 10.0)])),
        ]
        .into_iter()
        .collect();

        let summary = summarize_failures(roster.iter(), &PassingThresholds::default());
        assert_eq!(summary[0].subject, "Math");
        assert_eq!(summary[0].failed_count, 2);
        assert_eq!(summary[1].failed_count, 1);
        assert_eq!(summary[1].graded_count, 2);
    }
}
