use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use crate::models::*;

/// Rows per multi-value INSERT; 16 binds each keeps us under the 65535 bind limit.
const INSERT_CHUNK: usize = 1_000;

// ─── Run Queries ────────────────────────────────────────────────────────────

/// Record a finished run and return its id.
pub async fn insert_run<'e, E>(executor: E, run: &NewAnalysisRun) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO analysis_runs (started_at, finished_at, snapshot_weeks, purchase_count, exception_count, excluded_count, partial)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(run.started_at)
    .bind(run.finished_at)
    .bind(run.snapshot_weeks)
    .bind(run.purchase_count)
    .bind(run.exception_count)
    .bind(run.excluded_count)
    .bind(run.partial)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// Most recent run, if any.
pub async fn get_latest_run(pool: &PgPool) -> Result<Option<AnalysisRun>, sqlx::Error> {
    sqlx::query_as::<_, AnalysisRun>("SELECT * FROM analysis_runs ORDER BY id DESC LIMIT 1")
        .fetch_optional(pool)
        .await
}

// ─── Purchase Queries ───────────────────────────────────────────────────────

/// Insert a batch of purchases for `run_id` using multi-value INSERTs.
pub async fn insert_purchases_batch<'e, E>(
    executor: E,
    run_id: i64,
    purchases: &[NewPurchase],
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    if purchases.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO classified_purchases (run_id, timestamp, date, chain, wallet, asset, tx_hash, face_value, actual_paid, normal_price, vip_price, discount_entitlement, savings, snapshot_week, in_snapshot, is_after_activity, status) ",
    );

    qb.push_values(purchases, |mut b, p| {
        b.push_bind(run_id)
            .push_bind(p.timestamp)
            .push_bind(p.date)
            .push_bind(&p.chain)
            .push_bind(&p.wallet)
            .push_bind(&p.asset)
            .push_bind(&p.tx_hash)
            .push_bind(p.face_value)
            .push_bind(p.actual_paid)
            .push_bind(p.normal_price)
            .push_bind(p.vip_price)
            .push_bind(p.discount_entitlement)
            .push_bind(p.savings)
            .push_bind(p.snapshot_week)
            .push_bind(p.in_snapshot)
            .push_bind(p.is_after_activity)
            .push_bind(&p.status);
    });

    qb.build().execute(executor).await?;
    Ok(())
}

/// Replace the stored result set with `purchases` and record the run, atomically.
/// Re-running over the same inputs leaves the table in the same state.
pub async fn replace_results(
    pool: &PgPool,
    run: &NewAnalysisRun,
    purchases: &[NewPurchase],
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let run_id = insert_run(&mut *tx, run).await?;

    sqlx::query("DELETE FROM classified_purchases")
        .execute(&mut *tx)
        .await?;

    for chunk in purchases.chunks(INSERT_CHUNK) {
        insert_purchases_batch(&mut *tx, run_id, chunk).await?;
    }

    tx.commit().await?;

    tracing::info!(run_id, purchases = purchases.len(), "Persisted reconciliation results");
    Ok(run_id)
}

/// Purchases ordered by time, optionally filtered by status and chain.
pub async fn get_purchases(
    pool: &PgPool,
    status: Option<&str>,
    chain: Option<&str>,
    limit: i64,
) -> Result<Vec<PurchaseRow>, sqlx::Error> {
    sqlx::query_as::<_, PurchaseRow>(
        r#"
        SELECT * FROM classified_purchases
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::TEXT IS NULL OR chain = $2)
        ORDER BY timestamp, tx_hash
        LIMIT $3
        "#,
    )
    .bind(status)
    .bind(chain)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Eligible-but-undiscounted purchases on or after the activity start.
pub async fn get_exceptions(pool: &PgPool) -> Result<Vec<PurchaseRow>, sqlx::Error> {
    sqlx::query_as::<_, PurchaseRow>(
        r#"
        SELECT * FROM classified_purchases
        WHERE status = 'DISCOUNT_MISSED' AND is_after_activity
        ORDER BY timestamp, tx_hash
        "#,
    )
    .fetch_all(pool)
    .await
}

// ─── Summaries ──────────────────────────────────────────────────────────────

pub async fn get_daily_summary(pool: &PgPool) -> Result<Vec<DailySummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, DailySummaryRow>(
        r#"
        SELECT date,
               chain,
               COUNT(*) AS card_count,
               SUM(face_value)::NUMERIC AS face_value_sum,
               ROUND(SUM(actual_paid), 2) AS actual_paid_sum,
               ROUND(SUM(vip_price), 2) AS expected_paid_sum,
               ROUND(SUM(discount_entitlement), 2) AS discount_sum
        FROM classified_purchases
        GROUP BY date, chain
        ORDER BY date, chain
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_denomination_summary(
    pool: &PgPool,
) -> Result<Vec<DenominationSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, DenominationSummaryRow>(
        r#"
        SELECT face_value,
               COUNT(*) AS card_count,
               ROUND(AVG(vip_price), 2) AS mean_expected,
               ROUND(AVG(actual_paid), 2) AS mean_actual,
               ROUND(AVG(discount_entitlement), 2) AS mean_discount
        FROM classified_purchases
        GROUP BY face_value
        ORDER BY face_value
        "#,
    )
    .fetch_all(pool)
    .await
}
