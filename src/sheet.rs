//! CSV layout shared by import and export.
//!
//! Columns are positional: `id, name, stage`, one score column per configured
//! subject, then `status, grade, failed_subjects`. Export writes a UTF-8 BOM
//! and a header row; import skips a leading header row when present. The
//! trailing derived columns are ignored on import because classification is
//! recomputed.

use std::io;

use crate::error::SheetError;
use crate::models::{clamp_score, Roster};

/// One tokenized sheet row, cells in column order.
pub type RawRow = Vec<String>;

pub const KEY_COLUMN: usize = 0;
pub const NAME_COLUMN: usize = 1;
pub const STAGE_COLUMN: usize = 2;
pub const FIRST_SCORE_COLUMN: usize = 3;

const UNCLASSIFIED: &str = "-";

const BOM: char = '\u{feff}';

/// Tokenizes a whole sheet. Fails without returning any rows if the source
/// is not readable CSV. The first row is dropped only when it is a header,
/// i.e. its key cell reads `id`.
pub fn read_sheet<R: io::Read>(source: R) -> Result<Vec<RawRow>, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(source);

    let mut rows: Vec<RawRow> = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(SheetError::ImportParse)?;
        let mut row: RawRow = record.iter().map(str::to_string).collect();
        if index == 0 {
            if let Some(first) = row.first_mut() {
                *first = first.trim_start_matches(BOM).to_string();
            }
            if is_header(&row) {
                continue;
            }
        }
        rows.push(row);
    }

    Ok(rows)
}

fn is_header(row: &RawRow) -> bool {
    row.get(KEY_COLUMN)
        .is_some_and(|cell| cell.trim().eq_ignore_ascii_case("id"))
}

/// Sanitizes one score cell: blank or non-numeric becomes 0, the rest is
/// clamped into `[0, 100]`.
pub fn parse_score(cell: &str) -> f64 {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|score| score.is_finite())
        .map(clamp_score)
        .unwrap_or(0.0)
}

pub fn header(subjects: &[String]) -> Vec<String> {
    let mut columns = vec!["id".to_string(), "name".to_string(), "stage".to_string()];
    columns.extend(subjects.iter().cloned());
    columns.extend(["status", "grade", "failed_subjects"].map(String::from));
    columns
}

pub fn export_roster<W: io::Write>(
    roster: &Roster,
    subjects: &[String],
    mut sink: W,
) -> Result<(), SheetError> {
    // Excel only decodes the sheet as UTF-8 when it starts with a BOM.
    let mut bom = [0u8; 3];
    sink.write_all(BOM.encode_utf8(&mut bom).as_bytes())?;
    let mut writer = csv::Writer::from_writer(sink);
    writer
        .write_record(header(subjects))
        .map_err(SheetError::ExportWrite)?;

    for student in roster.iter() {
        let mut record = vec![
            student.id.clone(),
            student.name.clone(),
            student.stage.code().to_string(),
        ];
        for subject in subjects {
            let score = student.scores.get(subject).unwrap_or(0.0);
            record.push(score.to_string());
        }
        match &student.classification {
            Some(result) => {
                record.push(result.status.code().to_string());
                record.push(result.final_grade.clone());
                record.push(result.failed_subjects.join(", "));
            }
            None => {
                record.push(UNCLASSIFIED.to_string());
                record.push(UNCLASSIFIED.to_string());
                record.push(String::new());
            }
        }
        writer.write_record(&record).map_err(SheetError::ExportWrite)?;
    }

    writer.flush()?;
    Ok(())
}
