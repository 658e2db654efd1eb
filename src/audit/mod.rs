//! Append-only audit trail of mutations, bucketed by UTC day.
//!
//! Writes are best-effort: callers log and ignore failures so an audit
//! hiccup never fails the user's action.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Db;
use crate::models::ids;
use crate::store::{self, StoreError, WriteBatch, ns};

const DAYS_KEY: &str = "days";

/// Accepted audit retention, in days.
pub const RETENTION_DAYS: std::ops::RangeInclusive<i64> = 1..=36_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub details: Value,
}

fn day_key(day: NaiveDate) -> String {
    format!("day/{}", day.format("%Y-%m-%d"))
}

pub async fn log(
    db: &Db,
    actor: &str,
    action: &str,
    target_type: &str,
    target_id: &str,
    details: Value,
) -> Result<(), StoreError> {
    let entry = AuditEntry {
        at: ids::now(),
        actor: actor.to_string(),
        action: action.to_string(),
        target_type: target_type.to_string(),
        target_id: target_id.to_string(),
        details,
    };
    append(db, entry).await
}

async fn append(db: &Db, entry: AuditEntry) -> Result<(), StoreError> {
    let day = entry.at.date_naive();
    let key = day_key(day);

    let _guard = db.lock_writes().await;
    let mut entries: Vec<AuditEntry> = store::get_list(db.store(), ns::AUDIT, &key).await?;
    let mut days: Vec<NaiveDate> = store::get_list(db.store(), ns::AUDIT, DAYS_KEY).await?;
    entries.push(entry);

    let mut batch = WriteBatch::new();
    batch.put(ns::AUDIT, &key, &entries)?;
    if !days.contains(&day) {
        days.push(day);
        days.sort();
        batch.put(ns::AUDIT, DAYS_KEY, &days)?;
    }
    db.store().commit(batch).await
}

/// Most recent entries first, at most `limit`.
pub async fn recent(db: &Db, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
    let days: Vec<NaiveDate> = store::get_list(db.store(), ns::AUDIT, DAYS_KEY).await?;
    let mut out = Vec::new();
    for day in days.iter().rev() {
        let mut entries: Vec<AuditEntry> = store::get_list(db.store(), ns::AUDIT, &day_key(*day)).await?;
        entries.reverse();
        for entry in entries {
            if out.len() == limit {
                return Ok(out);
            }
            out.push(entry);
        }
    }
    Ok(out)
}

/// Drop day buckets older than `retention_days`, clamped to
/// [`RETENTION_DAYS`]. Returns the number removed.
pub async fn cleanup_old_entries(db: &Db, retention_days: i64) -> Result<usize, StoreError> {
    let retention_days = retention_days.clamp(*RETENTION_DAYS.start(), *RETENTION_DAYS.end());
    let cutoff = (Utc::now() - Duration::days(retention_days)).date_naive();

    let _guard = db.lock_writes().await;
    let days: Vec<NaiveDate> = store::get_list(db.store(), ns::AUDIT, DAYS_KEY).await?;
    let (old, keep): (Vec<NaiveDate>, Vec<NaiveDate>) = days.into_iter().partition(|d| *d < cutoff);
    if old.is_empty() {
        return Ok(0);
    }

    let mut batch = WriteBatch::new();
    for day in &old {
        batch.delete(ns::AUDIT, &day_key(*day));
    }
    batch.put(ns::AUDIT, DAYS_KEY, &keep)?;
    db.store().commit(batch).await?;

    log::info!("Audit cleanup removed {} day(s) older than {}", old.len(), cutoff);
    Ok(old.len())
}

/// Periodically prune the audit trail.
pub fn spawn_cleanup(db: Db, retention_days: i64) {
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(24 * 3600));
        loop {
            interval.tick().await;
            if let Err(e) = cleanup_old_entries(&db, retention_days).await {
                log::error!("Audit cleanup failed: {}", e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn log_and_read_back() {
        let db = Db::memory();
        log(&db, "u1", "patient.created", "patient", "pat_1", json!({})).await.unwrap();
        log(&db, "u1", "patient.deleted", "patient", "pat_1", json!({})).await.unwrap();

        let entries = recent(&db, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "patient.deleted");
        assert_eq!(recent(&db, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cleanup_removes_old_days() {
        let db = Db::memory();
        let old = AuditEntry {
            at: Utc::now() - Duration::days(400),
            actor: "u1".into(),
            action: "old".into(),
            target_type: "patient".into(),
            target_id: "pat_1".into(),
            details: json!(null),
        };
        append(&db, old).await.unwrap();
        log(&db, "u1", "new", "patient", "pat_1", json!(null)).await.unwrap();

        assert_eq!(cleanup_old_entries(&db, 90).await.unwrap(), 1);
        let entries = recent(&db, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "new");
        assert_eq!(cleanup_old_entries(&db, 90).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cleanup_clamps_retention() {
        let db = Db::memory();
        log(&db, "u1", "today", "patient", "pat_1", json!(null)).await.unwrap();

        assert_eq!(cleanup_old_entries(&db, -30).await.unwrap(), 0);
        assert_eq!(cleanup_old_entries(&db, i64::MAX).await.unwrap(), 0);
        assert_eq!(recent(&db, 10).await.unwrap().len(), 1);
    }
}
