use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Open the database pool (WAL mode) / 打开数据库连接池（WAL模式）
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect(database_url)
        .await?;

    // 启用WAL模式，提高并发性能
    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
    // 设置busy_timeout，避免并发写入时锁超时
    sqlx::query("PRAGMA busy_timeout=10000").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;

    tracing::info!("Database opened: {} (WAL mode)", database_url);
    Ok(pool)
}

/// Single-connection in-memory database with schema, for tests / 测试用内存数据库
#[cfg(test)]
pub async fn connect_in_memory() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    run_migrations(&pool).await.expect("migrations");
    pool
}

/// Run database migrations / 运行数据库迁移
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sites (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            status_time TEXT NOT NULL,
            last_error TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site_id INTEGER NOT NULL,
            path TEXT NOT NULL,
            code INTEGER NOT NULL,
            content TEXT NOT NULL,
            UNIQUE(site_id, path),
            FOREIGN KEY (site_id) REFERENCES sites(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lemmas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site_id INTEGER NOT NULL,
            lemma TEXT NOT NULL,
            frequency INTEGER NOT NULL,
            UNIQUE(site_id, lemma),
            FOREIGN KEY (site_id) REFERENCES sites(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            page_id INTEGER NOT NULL,
            lemma_id INTEGER NOT NULL,
            rank REAL NOT NULL,
            UNIQUE(page_id, lemma_id),
            FOREIGN KEY (page_id) REFERENCES pages(id) ON DELETE CASCADE,
            FOREIGN KEY (lemma_id) REFERENCES lemmas(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 查询索引
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_lemmas_lemma ON lemmas(lemma)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_index_entries_lemma ON index_entries(lemma_id)")
        .execute(pool)
        .await?;

    Ok(())
}
