//! Protocol exchange: sending a protocol to a patient and recording the
//! patient's progress through `sent → viewed → accepted | declined`.
//!
//! Each sent protocol is a single document. The practitioner's outbox and the
//! patient's inbox are id lists pointing at it, so both sides always observe
//! the same `status`, `viewed_at`, `responded_at` and `notes`. Creation writes
//! the document and both index entries in one atomic batch; transitions
//! rewrite only the document.

use crate::auth::validate;
use crate::db::Db;
use crate::errors::AppError;
use crate::models::{ids, patient, protocol};
use crate::store::{WriteBatch, ns};

use super::queries::{self, INBOX_KEY, OUTBOX_KEY, record_key};
use super::types::*;

/// Send one of `owner_id`'s active protocols to one of their active patients.
pub async fn send(db: &Db, owner_id: &str, req: &SendRequest) -> Result<SentProtocol, AppError> {
    AppError::check(
        validate::validate_optional(&req.message, "Message", 4000)
            .into_iter()
            .collect(),
    )?;

    let _guard = db.lock_writes().await;

    let protocol = protocol::find(db, owner_id, &req.protocol_id)
        .await?
        .filter(|p| p.is_active())
        .ok_or(AppError::NotFound)?;
    let patient = patient::find(db, owner_id, &req.patient_id)
        .await?
        .filter(|p| p.is_active())
        .ok_or(AppError::NotFound)?;

    let record = SentProtocol {
        id: ids::new_id("sp"),
        protocol_id: protocol.id.clone(),
        protocol,
        patient_id: patient.id.clone(),
        patient,
        practitioner_id: owner_id.to_string(),
        message: req.message.trim().to_string(),
        status: SentStatus::Sent,
        sent_at: ids::now(),
        viewed_at: None,
        responded_at: None,
        notes: None,
    };

    let mut outbox = queries::outbox_ids(db, owner_id).await?;
    outbox.push(record.id.clone());
    let mut inbox = queries::inbox_ids(db, &record.patient_id).await?;
    inbox.push(record.id.clone());

    let mut batch = WriteBatch::new();
    batch.put(ns::EXCHANGE, &record_key(&record.id), &record)?;
    batch.put(&ns::practitioner(owner_id), OUTBOX_KEY, &outbox)?;
    batch.put(&ns::patient(&record.patient_id), INBOX_KEY, &inbox)?;
    db.store().commit(batch).await?;

    log::info!(
        "Protocol {} sent to patient {} as {}",
        record.protocol_id,
        record.patient_id,
        record.id
    );
    Ok(record)
}

/// Record that the patient opened the protocol. Only moves `sent → viewed`;
/// any later state is left untouched.
pub async fn mark_viewed(db: &Db, id: &str) -> Result<Transitioned, AppError> {
    let _guard = db.lock_writes().await;
    let mut record = queries::find(db, id).await?.ok_or(AppError::NotFound)?;

    if !record.status.can_become(SentStatus::Viewed) {
        return Ok(Transitioned { record, applied: false });
    }

    record.status = SentStatus::Viewed;
    record.viewed_at = Some(ids::now());
    let mut batch = WriteBatch::new();
    batch.put(ns::EXCHANGE, &record_key(id), &record)?;
    db.store().commit(batch).await?;

    Ok(Transitioned { record, applied: true })
}

/// Accept or decline. Allowed from `sent` or `viewed`; once a decision is
/// recorded the first one wins and later calls are no-ops, whatever their
/// notes.
pub async fn respond(
    db: &Db,
    id: &str,
    decision: Decision,
    notes: Option<&str>,
) -> Result<Transitioned, AppError> {
    let _guard = db.lock_writes().await;
    let mut record = queries::find(db, id).await?.ok_or(AppError::NotFound)?;

    let next = SentStatus::from(decision);
    if !record.status.can_become(next) {
        return Ok(Transitioned { record, applied: false });
    }
    if let Some(notes) = notes {
        AppError::check(
            validate::validate_optional(notes, "Notes", 2000)
                .into_iter()
                .collect(),
        )?;
    }

    record.status = next;
    record.responded_at = Some(ids::now());
    record.notes = notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from);
    let mut batch = WriteBatch::new();
    batch.put(ns::EXCHANGE, &record_key(id), &record)?;
    db.store().commit(batch).await?;

    log::info!("Sent protocol {} {}", id, next.as_str());
    Ok(Transitioned { record, applied: true })
}
