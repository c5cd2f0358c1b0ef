//! Upserts and read queries backing the Monitor's stats endpoints.
//!
//! The original Python upserts with a plain `UPDATE ... WHERE name=%s AND
//! dateStats=UTC_DATE()` followed by `INSERT IGNORE` on zero rows affected,
//! a two-statement dance MySQL needed before native upserts. Postgres (the
//! teacher's own database, via `sqlx`) has `INSERT ... ON CONFLICT DO
//! UPDATE` for exactly this, so the upserts here use that instead — same
//! effect, one round trip.

use chrono::NaiveDate;
use sqlx::PgPool;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameHits {
    pub name: String,
    pub hits: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyHits {
    pub name: String,
    pub date_stats: NaiveDate,
    pub hits: i64,
}

pub async fn bump_schema_hit(pool: &PgPool, name: &str, date_stats: NaiveDate) -> Result<(), sqlx::Error> {
    sqlx::query!(
        r#"INSERT INTO schemas (name, hits, date_stats) VALUES ($1, 1, $2)
           ON CONFLICT (name, date_stats) DO UPDATE SET hits = schemas.hits + 1"#,
        name,
        date_stats
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn bump_software_hit(pool: &PgPool, name: &str, date_stats: NaiveDate) -> Result<(), sqlx::Error> {
    sqlx::query!(
        r#"INSERT INTO softwares (name, hits, date_stats) VALUES ($1, 1, $2)
           ON CONFLICT (name, date_stats) DO UPDATE SET hits = softwares.hits + 1"#,
        name,
        date_stats
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn total_schemas(pool: &PgPool) -> Result<Vec<NameHits>, sqlx::Error> {
    let rows = sqlx::query!(
        "SELECT name, SUM(hits)::BIGINT AS \"hits!\" FROM schemas GROUP BY name ORDER BY SUM(hits) DESC"
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| NameHits { name: r.name, hits: r.hits })
        .collect())
}

pub async fn schemas_in_range(
    pool: &PgPool,
    date_start: NaiveDate,
    date_end: NaiveDate,
) -> Result<Vec<DailyHits>, sqlx::Error> {
    let rows = sqlx::query!(
        r#"SELECT name, date_stats, hits FROM schemas
           WHERE date_stats BETWEEN $1 AND $2
           ORDER BY date_stats ASC, name ASC"#,
        date_start,
        date_end
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| DailyHits {
            name: r.name,
            date_stats: r.date_stats,
            hits: r.hits,
        })
        .collect())
}

/// Per-software hit totals restricted to software whose most recent hit
/// falls within the trailing `max_days` window. Callers pass `max_days - 1`
/// themselves (see `routes::get_total_softwares`) to preserve the original's
/// observable off-by-one.
pub async fn total_softwares(pool: &PgPool, max_days: i64) -> Result<Vec<NameHits>, sqlx::Error> {
    let rows = sqlx::query!(
        r#"SELECT name, SUM(hits)::BIGINT AS "hits!" FROM softwares
           WHERE date_stats >= (CURRENT_DATE - $1::INTEGER)
           GROUP BY name ORDER BY SUM(hits) DESC"#,
        max_days
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| NameHits { name: r.name, hits: r.hits })
        .collect())
}

pub async fn softwares_in_range(
    pool: &PgPool,
    date_start: NaiveDate,
    date_end: NaiveDate,
) -> Result<Vec<DailyHits>, sqlx::Error> {
    let rows = sqlx::query!(
        r#"SELECT name, date_stats, hits FROM softwares
           WHERE date_stats BETWEEN $1 AND $2
           ORDER BY date_stats ASC, name ASC"#,
        date_start,
        date_end
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| DailyHits {
            name: r.name,
            date_stats: r.date_stats,
            hits: r.hits,
        })
        .collect())
}
