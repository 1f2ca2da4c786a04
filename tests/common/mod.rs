#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

use school_portal::authz::Role;
use school_portal::utils::hash_password;

pub const JWT_SECRET: &str = "test-secret";
pub const PASSWORD: &str = "password123";

/// Fresh migrated database in a temp dir. Keep the `TempDir` alive for the
/// lifetime of the pool.
pub async fn setup_pool() -> Result<(TempDir, SqlitePool)> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    Ok((dir, pool))
}

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, day, 8, 0, 0).unwrap()
}

/// Two classes:
/// - 1A: student s1 (parent p1), taught by t1
/// - 2B: student s2 (parent p2), taught by t2
///
/// Announcements `a-all` (school-wide), `a-1a`, `a-2b`; events `e-all`,
/// `e-2b`; one fee per student.
pub async fn seed_school(pool: &SqlitePool) -> Result<()> {
    for (id, name) in [("c1", "1A"), ("c2", "2B")] {
        sqlx::query("INSERT INTO classes (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await?;
    }

    for (id, name, class_id, parent_id) in [("s1", "Sam", "c1", "p1"), ("s2", "Kim", "c2", "p2")] {
        sqlx::query("INSERT INTO students (id, name, class_id, parent_id) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(class_id)
            .bind(parent_id)
            .execute(pool)
            .await?;
    }

    for (id, class_id, teacher_id) in [("l1", "c1", "t1"), ("l2", "c2", "t2")] {
        sqlx::query(
            "INSERT INTO lessons (id, name, day, start_time, end_time, class_id, teacher_id) VALUES (?, 'Maths', 'monday', '08:00', '08:45', ?, ?)",
        )
        .bind(id)
        .bind(class_id)
        .bind(teacher_id)
        .execute(pool)
        .await?;
    }

    for (id, day, class_id) in [("a-all", 1, None), ("a-1a", 2, Some("c1")), ("a-2b", 3, Some("c2"))] {
        sqlx::query("INSERT INTO announcements (id, title, description, date, class_id) VALUES (?, ?, 'details', ?, ?)")
            .bind(id)
            .bind(format!("announcement {id}"))
            .bind(at(day))
            .bind(class_id)
            .execute(pool)
            .await?;
    }

    for (id, day, class_id) in [("e-all", 10, None), ("e-2b", 11, Some("c2"))] {
        sqlx::query(
            "INSERT INTO events (id, title, description, start_time, end_time, class_id) VALUES (?, ?, 'details', ?, ?, ?)",
        )
        .bind(id)
        .bind(format!("event {id}"))
        .bind(at(day))
        .bind(at(day + 1))
        .bind(class_id)
        .execute(pool)
        .await?;
    }

    for (id, student_id, day) in [("f1", "s1", 20), ("f2", "s2", 21)] {
        sqlx::query("INSERT INTO fees (id, student_id, description, amount_cents, due_date, paid) VALUES (?, ?, 'term fee', 25000, ?, 0)")
            .bind(id)
            .bind(student_id)
            .bind(at(day))
            .execute(pool)
            .await?;
    }

    Ok(())
}

pub async fn insert_user(pool: &SqlitePool, id: &str, username: &str, role: Role) -> Result<()> {
    sqlx::query("INSERT INTO users (id, username, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(username)
        .bind(hash_password(PASSWORD)?)
        .bind(role.as_str())
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}

pub fn ids<T>(rows: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    let mut out: Vec<String> = rows.iter().map(|row| id(row).to_string()).collect();
    out.sort();
    out
}
