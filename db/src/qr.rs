use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    dtos::qr::{QrCreateRequest, ScanCreateRequest},
    models::qr::{QrCode, ScanEvent},
};

pub async fn insert_qr<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: QrCreateRequest,
) -> Res<QrCode> {
    sqlx::query_as::<_, QrCode>(
        r#"
        INSERT INTO qr_codes (short_id, owner_id, target_url, title, text_content, show_title, show_text, options)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(data.short_id)
    .bind(data.owner_id)
    .bind(data.target_url)
    .bind(data.title)
    .bind(data.text_content)
    .bind(data.show_title)
    .bind(data.show_text)
    .bind(data.options)
    .fetch_one(executor)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("shortId already taken".to_string())
        }
        other => AppError::from(other),
    })
}

pub async fn get_qr_by_short_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    short_id: &str,
) -> Res<Option<QrCode>> {
    sqlx::query_as::<_, QrCode>("SELECT * FROM qr_codes WHERE short_id = $1")
        .bind(short_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

pub async fn list_qr_by_owner<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    owner_id: Uuid,
) -> Res<Vec<QrCode>> {
    sqlx::query_as::<_, QrCode>(
        "SELECT * FROM qr_codes WHERE owner_id = $1 ORDER BY created_at DESC",
    )
    .bind(owner_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn delete_qr<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    qr_id: Uuid,
) -> Res<bool> {
    let result = sqlx::query("DELETE FROM qr_codes WHERE id = $1")
        .bind(qr_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Counts one scan and appends its event.
///
/// The counter is bumped in SQL (`scan_count + 1`) so concurrent scans never
/// lose an increment; the update and the event insert share a transaction.
/// Returns `None` when no record has this short id.
pub async fn record_scan(
    pool: &PgPool,
    short_id: &str,
    scan: ScanCreateRequest,
    at: DateTime<Utc>,
) -> Res<Option<QrCode>> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query_as::<_, QrCode>(
        r#"
        UPDATE qr_codes
        SET scan_count = scan_count + 1, last_scanned = $2
        WHERE short_id = $1
        RETURNING *
        "#,
    )
    .bind(short_id)
    .bind(at)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(qr) = updated else {
        tx.rollback().await?;
        return Ok(None);
    };

    sqlx::query(
        r#"
        INSERT INTO scan_events (qr_id, short_id, scanned_at, device, browser, os, location, ip_address)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(qr.id)
    .bind(&qr.short_id)
    .bind(at)
    .bind(scan.device)
    .bind(scan.browser)
    .bind(scan.os)
    .bind(scan.location)
    .bind(scan.ip_address)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(qr))
}

pub async fn list_scans<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    qr_id: Uuid,
) -> Res<Vec<ScanEvent>> {
    sqlx::query_as::<_, ScanEvent>(
        "SELECT * FROM scan_events WHERE qr_id = $1 ORDER BY scanned_at DESC",
    )
    .bind(qr_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

/// Every scan of every record owned by `owner_id`, newest first.
pub async fn list_scans_by_owner<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    owner_id: Uuid,
) -> Res<Vec<ScanEvent>> {
    sqlx::query_as::<_, ScanEvent>(
        r#"
        SELECT s.*
        FROM scan_events s
        JOIN qr_codes q ON q.id = s.qr_id
        WHERE q.owner_id = $1
        ORDER BY s.scanned_at DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}
