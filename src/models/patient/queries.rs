use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::auth::validate;
use crate::db::Db;
use crate::errors::AppError;
use crate::models::ids;
use crate::store::{self, StoreError, WriteBatch, ns};

use super::types::*;

const PATIENTS_KEY: &str = "patients";
const LINKS_KEY: &str = "patients";

fn validate_form(form: &PatientForm) -> Result<(), AppError> {
    let mut errors = Vec::new();
    errors.extend(validate::validate_required(&form.first_name, "First name", 100));
    errors.extend(validate::validate_required(&form.last_name, "Last name", 100));
    errors.extend(validate::validate_email(&form.email));
    errors.extend(validate::validate_date(form.date_of_birth.as_deref(), "Date of birth"));
    if let Some(notes) = &form.notes {
        errors.extend(validate::validate_optional(notes, "Notes", 4000));
    }
    AppError::check(errors)
}

/// All patients owned by `owner_id`, in creation order.
pub async fn list(db: &Db, owner_id: &str) -> Result<Vec<Patient>, StoreError> {
    store::get_list(db.store(), &ns::practitioner(owner_id), PATIENTS_KEY).await
}

pub async fn list_filtered(
    db: &Db,
    owner_id: &str,
    filter: &PatientFilter,
) -> Result<Vec<Patient>, StoreError> {
    let all = list(db, owner_id).await?;
    Ok(all.into_iter().filter(|p| filter.matches(p)).collect())
}

pub async fn find(db: &Db, owner_id: &str, id: &str) -> Result<Option<Patient>, StoreError> {
    Ok(list(db, owner_id).await?.into_iter().find(|p| p.id == id))
}

/// Records linked to an email, across all practitioners.
pub async fn find_links_by_email(db: &Db, email: &str) -> Result<Vec<PatientLink>, StoreError> {
    store::get_list(db.store(), &ns::patient_link(email), LINKS_KEY).await
}

async fn stage_link_change(
    db: &Db,
    batch: &mut WriteBatch,
    link: &PatientLink,
    old_email: Option<&str>,
    new_email: Option<&str>,
) -> Result<(), StoreError> {
    let old_ns = old_email.map(ns::patient_link);
    let new_ns = new_email.map(ns::patient_link);
    if old_ns == new_ns {
        return Ok(());
    }
    if let Some(old_ns) = old_ns {
        let mut links: Vec<PatientLink> = store::get_list(db.store(), &old_ns, LINKS_KEY).await?;
        links.retain(|l| l != link);
        if links.is_empty() {
            batch.delete(&old_ns, LINKS_KEY);
        } else {
            batch.put(&old_ns, LINKS_KEY, &links)?;
        }
    }
    if let Some(new_ns) = new_ns {
        let mut links: Vec<PatientLink> = store::get_list(db.store(), &new_ns, LINKS_KEY).await?;
        if !links.contains(link) {
            links.push(link.clone());
        }
        batch.put(&new_ns, LINKS_KEY, &links)?;
    }
    Ok(())
}

/// Create or update a patient. Validation runs before anything is read or
/// written. Updating an id unknown to `owner_id` fails with `NotFound`.
pub async fn upsert(db: &Db, owner_id: &str, form: &PatientForm) -> Result<Patient, AppError> {
    validate_form(form)?;

    let _guard = db.lock_writes().await;
    let mut patients = list(db, owner_id).await?;
    let now = ids::now();

    let (patient, old_email) = match &form.id {
        Some(id) => {
            let existing = patients
                .iter_mut()
                .find(|p| &p.id == id)
                .ok_or(AppError::NotFound)?;
            let old_email = existing.email.clone();
            apply_form(existing, form);
            existing.updated_at = now;
            (existing.clone(), Some(old_email))
        }
        None => {
            let patient = new_patient(owner_id, form, now);
            patients.push(patient.clone());
            (patient, None)
        }
    };

    let link = PatientLink {
        practitioner_id: owner_id.to_string(),
        patient_id: patient.id.clone(),
    };
    let mut batch = WriteBatch::new();
    batch.put(&ns::practitioner(owner_id), PATIENTS_KEY, &patients)?;
    stage_link_change(db, &mut batch, &link, old_email.as_deref(), Some(&patient.email)).await?;
    db.store().commit(batch).await?;

    Ok(patient)
}

/// Stage new patients for `owner_id` into `batch`, email links included.
/// The caller holds the write lock and commits.
pub(crate) async fn stage_new(
    db: &Db,
    batch: &mut WriteBatch,
    owner_id: &str,
    forms: &[PatientForm],
) -> Result<Vec<Patient>, AppError> {
    for form in forms {
        validate_form(form)?;
    }

    let mut patients = list(db, owner_id).await?;
    let mut links: BTreeMap<String, Vec<PatientLink>> = BTreeMap::new();
    let now = ids::now();
    let mut created = Vec::with_capacity(forms.len());

    for form in forms {
        let patient = new_patient(owner_id, form, now);
        let link_ns = ns::patient_link(&patient.email);
        if !links.contains_key(&link_ns) {
            let existing = store::get_list(db.store(), &link_ns, LINKS_KEY).await?;
            links.insert(link_ns.clone(), existing);
        }
        if let Some(entries) = links.get_mut(&link_ns) {
            entries.push(PatientLink {
                practitioner_id: owner_id.to_string(),
                patient_id: patient.id.clone(),
            });
        }
        patients.push(patient.clone());
        created.push(patient);
    }

    batch.put(&ns::practitioner(owner_id), PATIENTS_KEY, &patients)?;
    for (link_ns, entries) in &links {
        batch.put(link_ns, LINKS_KEY, entries)?;
    }
    Ok(created)
}

fn new_patient(owner_id: &str, form: &PatientForm, now: DateTime<Utc>) -> Patient {
    let mut patient = Patient {
        id: ids::new_id("pat"),
        practitioner_id: owner_id.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        email: String::new(),
        phone: None,
        date_of_birth: None,
        gender: None,
        address_line1: None,
        city: None,
        state: None,
        zip_code: None,
        country: None,
        emergency_contact_name: None,
        emergency_contact_phone: None,
        medical_conditions: None,
        allergies: None,
        current_medications: None,
        notes: None,
        status: PatientStatus::Active,
        created_at: now,
        updated_at: now,
    };
    apply_form(&mut patient, form);
    patient
}

fn apply_form(patient: &mut Patient, form: &PatientForm) {
    patient.first_name = form.first_name.trim().to_string();
    patient.last_name = form.last_name.trim().to_string();
    patient.email = form.email.trim().to_string();
    patient.phone = form.phone.clone();
    patient.date_of_birth = form.date_of_birth.clone();
    patient.gender = form.gender;
    patient.address_line1 = form.address_line1.clone();
    patient.city = form.city.clone();
    patient.state = form.state.clone();
    patient.zip_code = form.zip_code.clone();
    patient.country = form.country.clone();
    patient.emergency_contact_name = form.emergency_contact_name.clone();
    patient.emergency_contact_phone = form.emergency_contact_phone.clone();
    patient.medical_conditions = form.medical_conditions.clone();
    patient.allergies = form.allergies.clone();
    patient.current_medications = form.current_medications.clone();
    patient.notes = form.notes.clone();
    if let Some(status) = form.status {
        patient.status = status;
    }
}

/// Set a patient's status to archived. Archived patients cannot receive protocols.
pub async fn archive(db: &Db, owner_id: &str, id: &str) -> Result<Patient, AppError> {
    let _guard = db.lock_writes().await;
    let mut patients = list(db, owner_id).await?;
    let patient = patients
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or(AppError::NotFound)?;
    patient.status = PatientStatus::Archived;
    patient.updated_at = ids::now();
    let archived = patient.clone();
    let mut batch = WriteBatch::new();
    batch.put(&ns::practitioner(owner_id), PATIENTS_KEY, &patients)?;
    db.store().commit(batch).await?;
    Ok(archived)
}

/// Remove a patient record. Protocols already sent keep their snapshot.
pub async fn delete(db: &Db, owner_id: &str, id: &str) -> Result<(), AppError> {
    let _guard = db.lock_writes().await;
    let mut patients = list(db, owner_id).await?;
    let pos = patients
        .iter()
        .position(|p| p.id == id)
        .ok_or(AppError::NotFound)?;
    let removed = patients.remove(pos);

    let link = PatientLink {
        practitioner_id: owner_id.to_string(),
        patient_id: removed.id.clone(),
    };
    let mut batch = WriteBatch::new();
    batch.put(&ns::practitioner(owner_id), PATIENTS_KEY, &patients)?;
    stage_link_change(db, &mut batch, &link, Some(&removed.email), None).await?;
    db.store().commit(batch).await?;
    Ok(())
}
