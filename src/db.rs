use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

pub async fn init_db(database_url: &str, run_migrations: bool) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    if run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    Ok(pool)
}

#[cfg(test)]
pub mod testing {
    use sqlx::MySqlPool;

    use super::init_db;

    /// Database-backed tests run against `ROSTER_TEST_DATABASE_URL` and are
    /// skipped when it is unset.
    pub async fn test_pool() -> Option<MySqlPool> {
        let url = std::env::var("ROSTER_TEST_DATABASE_URL").ok()?;
        Some(init_db(&url, true).await.expect("test database"))
    }

    pub async fn insert_officer(pool: &MySqlPool, role: &str) -> u64 {
        let tag = uuid::Uuid::new_v4().simple().to_string();
        sqlx::query(
            "INSERT INTO users (first_name, last_name, badge_number, role, email, password) \
             VALUES ('Test', 'Officer', ?, ?, ?, 'not-a-hash')",
        )
        .bind(format!("T-{}", &tag[..12]))
        .bind(role)
        .bind(format!("{tag}@precinct.test"))
        .execute(pool)
        .await
        .unwrap()
        .last_insert_id()
    }
}
