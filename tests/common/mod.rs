//! Shared test infrastructure.
//!
//! Every test gets a fresh in-memory store through `setup_test_db()`, plus
//! helpers to create the patients and protocols most scenarios need.

#![allow(dead_code)]

use healthscript::db::Db;
use healthscript::models::patient::{self, Patient, PatientForm};
use healthscript::models::protocol::{self, Protocol, ProtocolForm, ProtocolLineForm, ProtocolStatus};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const PRACTITIONER_ID: &str = "prac_1";
pub const OTHER_PRACTITIONER_ID: &str = "prac_2";
pub const PATIENT_EMAIL: &str = "alice@example.com";

// ============================================================================
// STORE SETUP
// ============================================================================

/// Fresh in-memory store, same `Db` handle the server uses.
pub fn setup_test_db() -> Db {
    Db::memory()
}

// ============================================================================
// FIXTURES
// ============================================================================

pub fn patient_form(first: &str, last: &str, email: &str) -> PatientForm {
    PatientForm {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: email.to_string(),
        ..Default::default()
    }
}

pub fn line(supplement_id: &str, dosage: &str) -> ProtocolLineForm {
    ProtocolLineForm {
        supplement_id: supplement_id.to_string(),
        dosage: dosage.to_string(),
        frequency: "Once daily".to_string(),
        timing: "With breakfast".to_string(),
        duration_days: 56,
        instructions: String::new(),
        is_required: true,
    }
}

pub fn protocol_form(name: &str, status: ProtocolStatus) -> ProtocolForm {
    ProtocolForm {
        name: name.to_string(),
        description: "Test protocol".to_string(),
        category: "General".to_string(),
        duration_weeks: 8,
        status: Some(status),
        supplements: vec![line("supp_001", "1 capsule"), line("supp_003", "2 capsules")],
        ..Default::default()
    }
}

/// Active patient "Alice Smith" under `owner`.
pub async fn create_patient(db: &Db, owner: &str) -> Patient {
    patient::upsert(db, owner, &patient_form("Alice", "Smith", PATIENT_EMAIL))
        .await
        .expect("Failed to create patient")
}

/// Active two-line, eight-week protocol under `owner`.
pub async fn create_protocol(db: &Db, owner: &str) -> Protocol {
    protocol::upsert(db, owner, &protocol_form("Gut Reset", ProtocolStatus::Active))
        .await
        .expect("Failed to create protocol")
}
