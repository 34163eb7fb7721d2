use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod grading;
mod models;
mod reconcile;
mod report;
mod sheet;

use crate::config::GradingConfig;
use crate::models::{Stage, StudentRecord};

#[derive(Parser)]
#[command(name = "school-results")]
#[command(about = "Grade classification and result sheets for Smart School Control", long_about = None)]
struct Cli {
    /// JSON file with subjects, passing thresholds and display language
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the sample students
    Seed,
    /// Print students with their last computed status
    List {
        #[arg(long)]
        stage: Option<Stage>,
    },
    /// Add one student; the status stays empty until `recompute`
    AddStudent {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        stage: Stage,
        /// Score as SUBJECT=VALUE, repeatable
        #[arg(long = "score")]
        scores: Vec<String>,
    },
    /// Change one score without reclassifying
    SetScore {
        #[arg(long)]
        id: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        score: String,
    },
    /// Reclassify every student against the current thresholds
    Recompute,
    /// Merge a CSV sheet into the stored roster (an optional first row whose
    /// key cell is `id` is treated as the header)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Write the roster to a CSV sheet
    Export {
        #[arg(long, default_value = "school_grades.csv")]
        out: PathBuf,
    },
    /// Generate a markdown results report
    Report {
        #[arg(long)]
        stage: Option<Stage>,
        #[arg(long, default_value = "results.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = GradingConfig::load(cli.config.as_deref()).context("failed to load grading config")?;

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::List { stage } => {
            let roster = db::load_roster(&pool).await?;
            let mut shown = 0usize;
            for student in roster.in_stage(stage) {
                shown += 1;
                let scores = if student.scores.is_empty() {
                    "no scores yet".to_string()
                } else {
                    settings
                        .subjects
                        .iter()
                        .map(|subject| {
                            let score = student.scores.get(subject).unwrap_or(0.0);
                            format!("{subject} {score}")
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                let status = match &student.classification {
                    Some(result) if result.failed_subjects.is_empty() => result.final_grade.clone(),
                    Some(result) => format!(
                        "{} ({})",
                        result.final_grade,
                        result.failed_subjects.join(", ")
                    ),
                    None => "-".to_string(),
                };
                println!(
                    "- {} [{}] {}: {} | {}",
                    student.name,
                    student.id,
                    student.stage,
                    scores,
                    status
                );
            }
            if shown == 0 {
                println!("No students found.");
            }
        }
        Commands::AddStudent {
            id,
            name,
            stage,
            scores,
        } => {
            let roster = db::load_roster(&pool).await?;
            let id = id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(reconcile::synthesize_key);
            if roster.get(&id).is_some() {
                bail!("student {id} already exists");
            }

            let mut student = StudentRecord::new(id, name.trim(), stage);
            for entry in &scores {
                let (subject, value) = entry
                    .split_once('=')
                    .with_context(|| format!("score `{entry}` must look like SUBJECT=VALUE"))?;
                student.scores.insert(subject, sheet::parse_score(value));
            }
            db::save_student(&pool, &student).await?;
            println!("Added {} ({}).", student.name, student.id);
        }
        Commands::SetScore { id, subject, score } => {
            let roster = db::load_roster(&pool).await?;
            let Some(student) = roster.get(&id) else {
                bail!("no student with id {id}");
            };

            let mut student = student.clone();
            student.scores.insert(subject.as_str(), sheet::parse_score(&score));
            db::save_student(&pool, &student).await?;
            if student.classification.is_some() {
                warn!(student = %student.id, "stored status is stale until `recompute` runs");
            }
            println!("Updated {} for {}.", subject, student.name);
        }
        Commands::Recompute => {
            let roster = db::load_roster(&pool).await?;
            let roster = grading::classify_all(&roster, &settings.thresholds, settings.language);
            db::save_roster(&pool, &roster).await?;

            let counts = grading::count_by_status(roster.iter());
            println!(
                "Recomputed {} students: {} pass, {} retake, {} fail.",
                roster.len(),
                counts.pass,
                counts.retake,
                counts.fail
            );
        }
        Commands::Import { csv } => {
            let file = File::open(&csv).with_context(|| format!("failed to open {}", csv.display()))?;
            let rows = sheet::read_sheet(file)?;
            let existing = db::load_roster(&pool).await?;
            let outcome = reconcile::reconcile_import(&existing, &rows, &settings);
            db::save_roster(&pool, &outcome.merged).await?;

            info!(
                created = outcome.created,
                updated = outcome.updated,
                blank = outcome.blank,
                rejected = outcome.rejected.len(),
                "import applied"
            );
            println!(
                "Imported {}: {} created, {} updated, {} skipped.",
                csv.display(),
                outcome.created,
                outcome.updated,
                outcome.rejected.len()
            );
            for rejection in &outcome.rejected {
                println!("  skipped {rejection}");
            }
        }
        Commands::Export { out } => {
            let roster = db::load_roster(&pool).await?;
            if roster.is_empty() {
                warn!("roster is empty, exporting header only");
            }
            let file = File::create(&out).with_context(|| format!("failed to create {}", out.display()))?;
            sheet::export_roster(&roster, &settings.subjects, file)?;
            println!("Exported {} students to {}.", roster.len(), out.display());
        }
        Commands::Report { stage, out } => {
            let roster = db::load_roster(&pool).await?;
            let report = report::build_report(stage, Utc::now().date_naive(), &roster, &settings);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
