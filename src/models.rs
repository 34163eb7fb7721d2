use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ParseCodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Kg,
    Primary,
    Prep,
    Secondary,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Kg, Stage::Primary, Stage::Prep, Stage::Secondary];

    pub fn code(self) -> &'static str {
        match self {
            Stage::Kg => "KG",
            Stage::Primary => "PRIMARY",
            Stage::Prep => "PREP",
            Stage::Secondary => "SECONDARY",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Stage {
    type Err = ParseCodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.code().eq_ignore_ascii_case(value))
            .ok_or_else(|| ParseCodeError::Stage(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pass,
    Retake,
    Fail,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pass, Status::Retake, Status::Fail];

    pub fn code(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Retake => "RETAKE",
            Status::Fail => "FAIL",
        }
    }

    pub fn label(self, language: Language) -> &'static str {
        match (self, language) {
            (Status::Pass, Language::Arabic) => "ناجح",
            (Status::Retake, Language::Arabic) => "دور ثاني",
            (Status::Fail, Language::Arabic) => "راسب",
            (Status::Pass, Language::English) => "Pass",
            (Status::Retake, Language::English) => "Retake",
            (Status::Fail, Language::English) => "Fail",
        }
    }
}

impl FromStr for Status {
    type Err = ParseCodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Status::ALL
            .into_iter()
            .find(|status| status.code().eq_ignore_ascii_case(value))
            .ok_or_else(|| ParseCodeError::Status(value.to_string()))
    }
}

/// Language used for the display grade written next to the status code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "en")]
    English,
}

/// Clamps a score into `[0, 100]`; NaN becomes 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// Subject scores in insertion order. Every stored score is already clamped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectScores {
    entries: Vec<(String, f64)>,
}

impl SubjectScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a subject's score. A known subject keeps its position; blank
    /// subject names are ignored.
    pub fn insert(&mut self, subject: impl Into<String>, score: f64) {
        let subject = subject.into();
        let subject = subject.trim();
        if subject.is_empty() {
            return;
        }

        let score = clamp_score(score);
        match self.entries.iter_mut().find(|(name, _)| name == subject) {
            Some(entry) => entry.1 = score,
            None => self.entries.push((subject.to_string(), score)),
        }
    }

    pub fn get(&self, subject: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == subject)
            .map(|(_, score)| *score)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, score)| (name.as_str(), *score))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for SubjectScores {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut scores = SubjectScores::new();
        for (subject, score) in iter {
            scores.insert(subject, score);
        }
        scores
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: Status,
    pub final_grade: String,
    pub failed_subjects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub stage: Stage,
    pub scores: SubjectScores,
    /// Last computed result. `None` until the first recompute, and left
    /// untouched by later score edits.
    pub classification: Option<Classification>,
}

impl StudentRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, stage: Stage) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stage,
            scores: SubjectScores::new(),
            classification: None,
        }
    }

    pub fn with_scores(mut self, scores: SubjectScores) -> Self {
        self.scores = scores;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    students: Vec<StudentRecord>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&StudentRecord> {
        self.students.iter().find(|student| student.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut StudentRecord> {
        self.students.iter_mut().find(|student| student.id == id)
    }

    pub fn push(&mut self, student: StudentRecord) {
        self.students.push(student);
    }

    pub fn iter(&self) -> impl Iterator<Item = &StudentRecord> {
        self.students.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StudentRecord> {
        self.students.iter_mut()
    }

    /// Students of one stage, or everyone when `stage` is `None`.
    pub fn in_stage(&self, stage: Option<Stage>) -> impl Iterator<Item = &StudentRecord> {
        self.students
            .iter()
            .filter(move |student| stage.map_or(true, |stage| student.stage == stage))
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

impl FromIterator<StudentRecord> for Roster {
    fn from_iter<I: IntoIterator<Item = StudentRecord>>(iter: I) -> Self {
        Self {
            students: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pass: usize,
    pub retake: usize,
    pub fail: usize,
    pub unclassified: usize,
}

#[derive(Debug, Clone)]
pub struct SubjectFailureSummary {
    pub subject: String,
    pub failed_count: usize,
    pub graded_count: usize,
}
