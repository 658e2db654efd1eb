use chrono::{DateTime, Utc};

use crate::auth::validate;
use crate::db::Db;
use crate::errors::AppError;
use crate::models::{ids, supplement};
use crate::store::{self, StoreError, WriteBatch, ns};

use super::types::*;

const PROTOCOLS_KEY: &str = "protocols";

fn validate_form(form: &ProtocolForm) -> Result<(), AppError> {
    let mut errors = Vec::new();
    errors.extend(validate::validate_required(&form.name, "Protocol name", 200));
    errors.extend(validate::validate_required(&form.category, "Category", 100));
    errors.extend(validate::validate_optional(&form.description, "Description", 4000));
    for line in &form.supplements {
        errors.extend(validate_line(line));
    }
    AppError::check(errors)
}

fn check_supplement(id: &str) -> Option<String> {
    match supplement::find(id) {
        None => Some(format!("Unknown supplement '{id}'")),
        Some(s) if !s.is_active => Some(format!("Supplement '{id}' is no longer available")),
        Some(_) => None,
    }
}

fn validate_line(line: &ProtocolLineForm) -> Option<String> {
    check_supplement(&line.supplement_id)
        .or_else(|| validate::validate_optional(&line.instructions, "Instructions", 2000))
}

/// Build a line from a validated form. The supplement must be active.
fn build_line(line: &ProtocolLineForm, sort_order: u32) -> Result<ProtocolSupplement, AppError> {
    let supplement = supplement::find_active(&line.supplement_id).ok_or_else(|| {
        AppError::Validation(check_supplement(&line.supplement_id).into_iter().collect())
    })?;
    Ok(ProtocolSupplement {
        id: ids::new_id("ps"),
        supplement_id: supplement.id.clone(),
        supplement: supplement.clone(),
        dosage: line.dosage.trim().to_string(),
        frequency: line.frequency.trim().to_string(),
        timing: line.timing.trim().to_string(),
        duration_days: line.duration_days,
        instructions: line.instructions.trim().to_string(),
        is_required: line.is_required,
        sort_order,
    })
}

pub async fn list(db: &Db, owner_id: &str) -> Result<Vec<Protocol>, StoreError> {
    store::get_list(db.store(), &ns::practitioner(owner_id), PROTOCOLS_KEY).await
}

pub async fn list_filtered(
    db: &Db,
    owner_id: &str,
    filter: &ProtocolFilter,
) -> Result<Vec<Protocol>, StoreError> {
    let all = list(db, owner_id).await?;
    Ok(all.into_iter().filter(|p| filter.matches(p)).collect())
}

/// Protocols flagged reusable.
pub async fn list_templates(db: &Db, owner_id: &str) -> Result<Vec<Protocol>, StoreError> {
    let all = list(db, owner_id).await?;
    Ok(all.into_iter().filter(|p| p.is_template).collect())
}

/// Distinct categories in use, sorted.
pub async fn categories(db: &Db, owner_id: &str) -> Result<Vec<String>, StoreError> {
    let mut cats: Vec<String> = list(db, owner_id)
        .await?
        .into_iter()
        .map(|p| p.category)
        .filter(|c| !c.is_empty())
        .collect();
    cats.sort();
    cats.dedup();
    Ok(cats)
}

pub async fn find(db: &Db, owner_id: &str, id: &str) -> Result<Option<Protocol>, StoreError> {
    Ok(list(db, owner_id).await?.into_iter().find(|p| p.id == id))
}

async fn save(db: &Db, owner_id: &str, protocols: &[Protocol]) -> Result<(), AppError> {
    let mut batch = WriteBatch::new();
    batch.put(&ns::practitioner(owner_id), PROTOCOLS_KEY, &protocols)?;
    db.store().commit(batch).await?;
    Ok(())
}

/// Create or update a protocol. On update the line list is replaced by the
/// form's lines.
pub async fn upsert(db: &Db, owner_id: &str, form: &ProtocolForm) -> Result<Protocol, AppError> {
    validate_form(form)?;

    let lines = build_lines(form)?;

    let _guard = db.lock_writes().await;
    let mut protocols = list(db, owner_id).await?;
    let now = ids::now();

    let protocol = match &form.id {
        Some(id) => {
            let existing = protocols
                .iter_mut()
                .find(|p| &p.id == id)
                .ok_or(AppError::NotFound)?;
            existing.name = form.name.trim().to_string();
            existing.description = form.description.trim().to_string();
            existing.category = form.category.trim().to_string();
            existing.duration_weeks = form.duration_weeks;
            if let Some(status) = form.status {
                existing.status = status;
            }
            existing.is_template = form.is_template;
            existing.supplements = lines;
            existing.updated_at = now;
            existing.clone()
        }
        None => {
            let protocol = new_protocol(owner_id, form, lines, now);
            protocols.push(protocol.clone());
            protocol
        }
    };

    save(db, owner_id, &protocols).await?;
    Ok(protocol)
}

fn new_protocol(
    owner_id: &str,
    form: &ProtocolForm,
    lines: Vec<ProtocolSupplement>,
    now: DateTime<Utc>,
) -> Protocol {
    Protocol {
        id: ids::new_id("prot"),
        practitioner_id: owner_id.to_string(),
        name: form.name.trim().to_string(),
        description: form.description.trim().to_string(),
        category: form.category.trim().to_string(),
        duration_weeks: form.duration_weeks,
        status: form.status.unwrap_or_default(),
        is_template: form.is_template,
        supplements: lines,
        created_at: now,
        updated_at: now,
    }
}

fn build_lines(form: &ProtocolForm) -> Result<Vec<ProtocolSupplement>, AppError> {
    form.supplements
        .iter()
        .enumerate()
        .map(|(i, line)| build_line(line, i as u32 + 1))
        .collect()
}

/// Stage new protocols for `owner_id` into `batch`. The caller holds the
/// write lock and commits.
pub(crate) async fn stage_new(
    db: &Db,
    batch: &mut WriteBatch,
    owner_id: &str,
    forms: &[ProtocolForm],
) -> Result<Vec<Protocol>, AppError> {
    let mut protocols = list(db, owner_id).await?;
    let now = ids::now();
    let mut created = Vec::with_capacity(forms.len());
    for form in forms {
        validate_form(form)?;
        let protocol = new_protocol(owner_id, form, build_lines(form)?, now);
        protocols.push(protocol.clone());
        created.push(protocol);
    }
    batch.put(&ns::practitioner(owner_id), PROTOCOLS_KEY, &protocols)?;
    Ok(created)
}

pub async fn delete(db: &Db, owner_id: &str, id: &str) -> Result<(), AppError> {
    let _guard = db.lock_writes().await;
    let mut protocols = list(db, owner_id).await?;
    let before = protocols.len();
    protocols.retain(|p| p.id != id);
    if protocols.len() == before {
        return Err(AppError::NotFound);
    }
    save(db, owner_id, &protocols).await
}

/// Copy a protocol as a new draft named "<name> (Copy)".
pub async fn duplicate(db: &Db, owner_id: &str, id: &str) -> Result<Protocol, AppError> {
    let _guard = db.lock_writes().await;
    let mut protocols = list(db, owner_id).await?;
    let source = protocols
        .iter()
        .find(|p| p.id == id)
        .ok_or(AppError::NotFound)?;

    let now = ids::now();
    let mut copy = source.clone();
    copy.id = ids::new_id("prot");
    copy.name = format!("{} (Copy)", source.name);
    copy.status = ProtocolStatus::Draft;
    copy.created_at = now;
    copy.updated_at = now;
    for line in &mut copy.supplements {
        line.id = ids::new_id("ps");
    }
    protocols.push(copy.clone());
    save(db, owner_id, &protocols).await?;
    Ok(copy)
}

/// Append a supplement line at the end of the protocol.
pub async fn add_line(
    db: &Db,
    owner_id: &str,
    protocol_id: &str,
    line: &ProtocolLineForm,
) -> Result<Protocol, AppError> {
    AppError::check(validate_line(line).into_iter().collect())?;

    let _guard = db.lock_writes().await;
    let mut protocols = list(db, owner_id).await?;
    let protocol = protocols
        .iter_mut()
        .find(|p| p.id == protocol_id)
        .ok_or(AppError::NotFound)?;
    let next = protocol.supplements.len() as u32 + 1;
    protocol.supplements.push(build_line(line, next)?);
    protocol.updated_at = ids::now();
    let updated = protocol.clone();
    save(db, owner_id, &protocols).await?;
    Ok(updated)
}

/// Remove a line and close the gap in `sort_order`.
pub async fn remove_line(
    db: &Db,
    owner_id: &str,
    protocol_id: &str,
    line_id: &str,
) -> Result<Protocol, AppError> {
    let _guard = db.lock_writes().await;
    let mut protocols = list(db, owner_id).await?;
    let protocol = protocols
        .iter_mut()
        .find(|p| p.id == protocol_id)
        .ok_or(AppError::NotFound)?;
    let before = protocol.supplements.len();
    protocol.supplements.retain(|l| l.id != line_id);
    if protocol.supplements.len() == before {
        return Err(AppError::NotFound);
    }
    protocol.renumber();
    protocol.updated_at = ids::now();
    let updated = protocol.clone();
    save(db, owner_id, &protocols).await?;
    Ok(updated)
}
