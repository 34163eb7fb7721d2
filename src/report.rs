use std::fmt::Write;

use chrono::NaiveDate;

use crate::config::GradingConfig;
use crate::grading;
use crate::models::{Roster, Stage, Status, StudentRecord};

pub fn build_report(
    stage: Option<Stage>,
    generated_on: NaiveDate,
    roster: &Roster,
    config: &GradingConfig,
) -> String {
    let students: Vec<&StudentRecord> = roster.in_stage(stage).collect();
    let counts = grading::count_by_status(students.iter().copied());
    let failures = grading::summarize_failures(students.iter().copied(), &config.thresholds);

    let mut output = String::new();
    let stage_label = stage.map(|s| s.code()).unwrap_or("all stages");

    let _ = writeln!(output, "# School Results Report");
    let _ = writeln!(
        output,
        "Generated for {} on {} ({} students)",
        stage_label,
        generated_on,
        students.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Summary");
    for status in Status::ALL {
        let count = match status {
            Status::Pass => counts.pass,
            Status::Retake => counts.retake,
            Status::Fail => counts.fail,
        };
        let _ = writeln!(
            output,
            "- {} ({}): {}",
            status.label(config.language),
            status.code(),
            count
        );
    }
    if counts.unclassified > 0 {
        let _ = writeln!(output, "- not yet classified: {}", counts.unclassified);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subject Failures");

    if failures.iter().all(|summary| summary.failed_count == 0) {
        let _ = writeln!(output, "No subject below its passing score.");
    } else {
        for summary in failures.iter().filter(|summary| summary.failed_count > 0) {
            let _ = writeln!(
                output,
                "- {} (pass mark {}): {} of {} students below",
                summary.subject,
                config.thresholds.for_subject(&summary.subject),
                summary.failed_count,
                summary.graded_count
            );
        }
    }

    write_status_section(&mut output, "Retake Candidates", Status::Retake, &students);
    write_status_section(&mut output, "Failed", Status::Fail, &students);

    let pending: Vec<&&StudentRecord> = students
        .iter()
        .filter(|student| student.classification.is_none())
        .collect();
    if !pending.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Awaiting Recompute");
        for student in pending {
            let _ = writeln!(output, "- {} ({}, {})", student.name, student.id, student.stage);
        }
    }

    output
}

fn write_status_section(
    output: &mut String,
    title: &str,
    status: Status,
    students: &[&StudentRecord],
) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");

    let mut matched = 0usize;
    for student in students {
        let Some(result) = student.classification.as_ref() else {
            continue;
        };
        if result.status != status {
            continue;
        }

        matched += 1;
        let details: Vec<String> = result
            .failed_subjects
            .iter()
            .map(|subject| {
                let score = student.scores.get(subject).unwrap_or(0.0);
                format!("{subject} {score}")
            })
            .collect();
        let _ = writeln!(
            output,
            "- {} ({}, {}): {}",
            student.name,
            student.id,
            student.stage,
            details.join(", ")
        );
    }

    if matched == 0 {
        let _ = writeln!(output, "None.");
    }
}
