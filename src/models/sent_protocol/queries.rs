use crate::db::Db;
use crate::models::patient;
use crate::store::{self, StoreError, ns};

use super::types::*;

pub(super) const OUTBOX_KEY: &str = "outbox";
pub(super) const INBOX_KEY: &str = "inbox";

pub(super) fn record_key(id: &str) -> String {
    format!("sent/{id}")
}

pub async fn find(db: &Db, id: &str) -> Result<Option<SentProtocol>, StoreError> {
    store::get_doc(db.store(), ns::EXCHANGE, &record_key(id)).await
}

pub(super) async fn outbox_ids(db: &Db, owner_id: &str) -> Result<Vec<String>, StoreError> {
    store::get_list(db.store(), &ns::practitioner(owner_id), OUTBOX_KEY).await
}

pub(super) async fn inbox_ids(db: &Db, patient_id: &str) -> Result<Vec<String>, StoreError> {
    store::get_list(db.store(), &ns::patient(patient_id), INBOX_KEY).await
}

async fn resolve(db: &Db, ids: &[String]) -> Result<Vec<SentProtocol>, StoreError> {
    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        match find(db, id).await? {
            Some(sp) => records.push(sp),
            None => log::warn!("Index references missing sent protocol {id}"),
        }
    }
    // Newest first
    records.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
    Ok(records)
}

/// Everything `owner_id` has sent, newest first.
pub async fn outbox(db: &Db, owner_id: &str) -> Result<Vec<SentProtocol>, StoreError> {
    let ids = outbox_ids(db, owner_id).await?;
    resolve(db, &ids).await
}

pub async fn outbox_filtered(
    db: &Db,
    owner_id: &str,
    filter: &SentFilter,
) -> Result<Vec<SentProtocol>, StoreError> {
    let all = outbox(db, owner_id).await?;
    Ok(all.into_iter().filter(|sp| filter.matches(sp)).collect())
}

/// Everything sent to one patient record, newest first.
pub async fn inbox(db: &Db, patient_id: &str) -> Result<Vec<SentProtocol>, StoreError> {
    let ids = inbox_ids(db, patient_id).await?;
    resolve(db, &ids).await
}

/// Inboxes of every patient record carrying `email`, merged, newest first.
pub async fn inbox_for_email(db: &Db, email: &str) -> Result<Vec<SentProtocol>, StoreError> {
    let mut ids = Vec::new();
    for link in patient::find_links_by_email(db, email).await? {
        ids.extend(inbox_ids(db, &link.patient_id).await?);
    }
    ids.sort();
    ids.dedup();
    resolve(db, &ids).await
}

/// A record from `owner_id`'s outbox, or `None` if it belongs to someone else.
pub async fn find_for_practitioner(
    db: &Db,
    owner_id: &str,
    id: &str,
) -> Result<Option<SentProtocol>, StoreError> {
    Ok(find(db, id).await?.filter(|sp| sp.practitioner_id == owner_id))
}

/// A record addressed to a patient record linked to `email`.
pub async fn find_for_patient_email(
    db: &Db,
    email: &str,
    id: &str,
) -> Result<Option<SentProtocol>, StoreError> {
    let Some(sp) = find(db, id).await? else {
        return Ok(None);
    };
    let links = patient::find_links_by_email(db, email).await?;
    if links
        .iter()
        .any(|l| l.patient_id == sp.patient_id && l.practitioner_id == sp.practitioner_id)
    {
        Ok(Some(sp))
    } else {
        Ok(None)
    }
}

pub async fn stats_for_practitioner(db: &Db, owner_id: &str) -> Result<ExchangeStats, StoreError> {
    let records = outbox(db, owner_id).await?;
    Ok(ExchangeStats::from_records(&records))
}
