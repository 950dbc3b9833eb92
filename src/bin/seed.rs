//! Seed the database with demo data.
//!
//! Inserts the ACME Corp account, the SICP course (capacity 2), two students
//! and one enrollment. Safe to run repeatedly: existing rows are left alone.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use atomic_workflow_server::{
    config::Config,
    db::{self, DbPool},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    let pool = db::create_pool(
        &config.database_url()?,
        config.db_max_connections,
        config.connect_timeout(),
    )
    .await
    .context("connecting to the database")?;

    db::run_migrations(&pool).await?;
    seed(&pool).await.context("seeding demo data")?;

    tracing::info!("Seed data in place");
    Ok(())
}

async fn seed(pool: &DbPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO bank_accounts (organization_name, iban, bic, balance_cents)
        VALUES ('ACME Corp', 'FR10474608000002006107XXXXX', 'OIVUSCLQXXX', 10000000)
        ON CONFLICT (iban) DO NOTHING
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO courses (code, title, capacity, description)
        VALUES ('SICP', 'Structure and Interpretation of Computer Programs', 2,
                'Abstraction, recursion, interpreters and the design of programs.')
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .execute(&mut *tx)
    .await?;

    let students = [
        ("Kassandra Reyes", "1994-03-02", "kassandra.reyes@example.com"),
        ("Nathaniel Brooks", "1995-07-14", "nathaniel.brooks@example.com"),
    ];
    for (name, birthdate, email) in students {
        sqlx::query(
            r#"
            INSERT INTO students (name, birthdate, email)
            VALUES ($1, $2::date, $3)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(birthdate)
        .bind(email)
        .execute(&mut *tx)
        .await?;
    }

    let enrolled = sqlx::query(
        r#"
        INSERT INTO enrollments (course_id, student_id)
        SELECT c.id, s.id
        FROM courses c, students s
        WHERE c.code = 'SICP' AND s.email = 'kassandra.reyes@example.com'
        ON CONFLICT (course_id, student_id) DO NOTHING
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(new_enrollments = enrolled.rows_affected(), "demo rows inserted");
    Ok(())
}
