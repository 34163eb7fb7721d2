use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::GradingConfig;
use crate::error::RowError;
use crate::grading::classify;
use crate::models::{Roster, Stage, StudentRecord, SubjectScores};
use crate::sheet::{parse_score, RawRow, FIRST_SCORE_COLUMN, KEY_COLUMN, NAME_COLUMN, STAGE_COLUMN};

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub merged: Roster,
    pub created: usize,
    pub updated: usize,
    /// Rows with neither key nor name.
    pub blank: usize,
    pub rejected: Vec<RowError>,
}

pub fn synthesize_key() -> String {
    format!("import-{}", Uuid::new_v4())
}

/// Merges imported rows into a copy of `existing`, matching on the id column.
///
/// Matched students get the row's name, stage and scores (blank name or stage
/// cells keep the stored value; scores are replaced by the sheet's columns)
/// and are reclassified; unmatched rows are
/// appended in sheet order. `existing` itself is never modified.
pub fn reconcile_import(existing: &Roster, rows: &[RawRow], config: &GradingConfig) -> ImportOutcome {
    let mut merged = existing.clone();
    let mut created = 0usize;
    let mut updated = 0usize;
    let mut blank = 0usize;
    let mut rejected = Vec::new();

    for (position, row) in rows.iter().enumerate() {
        let row_number = position + 1;
        let cell = move |column: usize| row.get(column).map(|c| c.trim()).unwrap_or("");

        let key = cell(KEY_COLUMN);
        let name = cell(NAME_COLUMN);
        if key.is_empty() && name.is_empty() {
            debug!(row = row_number, "skipping blank import row");
            blank += 1;
            continue;
        }

        let stage_cell = cell(STAGE_COLUMN);
        let stage = if stage_cell.is_empty() {
            None
        } else {
            match stage_cell.parse::<Stage>() {
                Ok(stage) => Some(stage),
                Err(_) => {
                    reject(
                        &mut rejected,
                        RowError::UnknownStage {
                            row: row_number,
                            value: stage_cell.to_string(),
                        },
                    );
                    continue;
                }
            }
        };

        let scores: Vec<(String, f64)> = config
            .subjects
            .iter()
            .enumerate()
            .map(|(offset, subject)| (subject.clone(), parse_score(cell(FIRST_SCORE_COLUMN + offset))))
            .collect();

        if let Some(student) = merged.get_mut(key).filter(|_| !key.is_empty()) {
            if !name.is_empty() {
                student.name = name.to_string();
            }
            if let Some(stage) = stage {
                student.stage = stage;
            }
            student.scores = scores.into_iter().collect();
            student.classification = Some(classify(
                &student.scores,
                &config.thresholds,
                config.language,
            ));
            updated += 1;
            continue;
        }

        if name.is_empty() {
            reject(
                &mut rejected,
                RowError::MissingName {
                    row: row_number,
                    key: key.to_string(),
                },
            );
            continue;
        }
        let Some(stage) = stage else {
            reject(
                &mut rejected,
                RowError::MissingStage {
                    row: row_number,
                    name: name.to_string(),
                },
            );
            continue;
        };

        let id = if key.is_empty() {
            synthesize_key()
        } else {
            key.to_string()
        };
        let scores: SubjectScores = scores.into_iter().collect();
        let mut student = StudentRecord::new(id, name, stage).with_scores(scores);
        student.classification = Some(classify(&student.scores, &config.thresholds, config.language));
        merged.push(student);
        created += 1;
    }

    ImportOutcome {
        merged,
        created,
        updated,
        blank,
        rejected,
    }
}

fn reject(rejected: &mut Vec<RowError>, error: RowError) {
    warn!("skipping import {error}");
    rejected.push(error);
}
