use std::collections::HashMap;

use anyhow::Context;
use sqlx::{PgConnection, PgPool, Row};
use tracing::info;

use crate::models::{Classification, Roster, Stage, StudentRecord, SubjectScores};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            "1",
            "أحمد محمود",
            Stage::Prep,
            vec![("عربي", 85.0), ("إنجليزي", 70.0), ("رياضيات", 60.0), ("علوم", 75.0), ("دراسات", 80.0)],
        ),
        (
            "2",
            "سارة علي",
            Stage::Prep,
            vec![("عربي", 40.0), ("إنجليزي", 35.0), ("رياضيات", 55.0), ("علوم", 60.0), ("دراسات", 50.0)],
        ),
        (
            "3",
            "خالد عمر",
            Stage::Secondary,
            vec![("عربي", 30.0), ("إنجليزي", 20.0), ("رياضيات", 25.0), ("فيزياء", 40.0), ("كيمياء", 35.0)],
        ),
    ];

    let roster: Roster = students
        .into_iter()
        .map(|(id, name, stage, scores)| {
            StudentRecord::new(id, name, stage).with_scores(scores.into_iter().collect())
        })
        .collect();

    save_roster(pool, &roster).await
}

pub async fn load_roster(pool: &PgPool) -> anyhow::Result<Roster> {
    let score_rows = sqlx::query(
        "SELECT student_id, subject, score FROM school_results.scores \
         ORDER BY student_id, position",
    )
    .fetch_all(pool)
    .await?;

    let mut scores: HashMap<String, SubjectScores> = HashMap::new();
    for row in score_rows {
        let student_id: String = row.get("student_id");
        scores
            .entry(student_id)
            .or_default()
            .insert(row.get::<String, _>("subject"), row.get::<f64, _>("score"));
    }

    let student_rows = sqlx::query(
        "SELECT id, full_name, stage, status, final_grade, failed_subjects \
         FROM school_results.students ORDER BY seq",
    )
    .fetch_all(pool)
    .await?;

    let mut roster = Roster::new();
    for row in student_rows {
        let id: String = row.get("id");
        let stage: String = row.get("stage");
        let stage: Stage = stage
            .parse()
            .with_context(|| format!("student {id} has an invalid stored stage"))?;

        let status: Option<String> = row.get("status");
        let final_grade: Option<String> = row.get("final_grade");
        let failed_subjects: Option<Vec<String>> = row.get("failed_subjects");
        let classification = match (status, final_grade) {
            (Some(status), Some(final_grade)) => Some(Classification {
                status: status
                    .parse()
                    .with_context(|| format!("student {id} has an invalid stored status"))?,
                final_grade,
                failed_subjects: failed_subjects.unwrap_or_default(),
            }),
            _ => None,
        };

        let mut student = StudentRecord::new(id.clone(), row.get::<String, _>("full_name"), stage)
            .with_scores(scores.remove(&id).unwrap_or_default());
        student.classification = classification;
        roster.push(student);
    }

    Ok(roster)
}

/// Writes every student of `roster` in one transaction.
pub async fn save_roster(pool: &PgPool, roster: &Roster) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    for student in roster.iter() {
        upsert_student(&mut tx, student).await?;
    }
    tx.commit().await?;
    info!(students = roster.len(), "roster saved");
    Ok(())
}

pub async fn save_student(pool: &PgPool, student: &StudentRecord) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    upsert_student(&mut tx, student).await?;
    tx.commit().await?;
    Ok(())
}

async fn upsert_student(conn: &mut PgConnection, student: &StudentRecord) -> anyhow::Result<()> {
    let classification = student.classification.as_ref();

    sqlx::query(
        r#"
        INSERT INTO school_results.students
        (id, full_name, stage, status, final_grade, failed_subjects)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE
        SET full_name = EXCLUDED.full_name,
            stage = EXCLUDED.stage,
            status = EXCLUDED.status,
            final_grade = EXCLUDED.final_grade,
            failed_subjects = EXCLUDED.failed_subjects,
            updated_at = now()
        "#,
    )
    .bind(&student.id)
    .bind(&student.name)
    .bind(student.stage.code())
    .bind(classification.map(|c| c.status.code()))
    .bind(classification.map(|c| c.final_grade.as_str()))
    .bind(classification.map(|c| c.failed_subjects.clone()))
    .execute(&mut *conn)
    .await
    .with_context(|| format!("failed to save student {}", student.id))?;

    sqlx::query("DELETE FROM school_results.scores WHERE student_id = $1")
        .bind(&student.id)
        .execute(&mut *conn)
        .await?;

    for (position, (subject, score)) in student.scores.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO school_results.scores (student_id, position, subject, score)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&student.id)
        .bind(position as i32)
        .bind(subject)
        .bind(score)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
