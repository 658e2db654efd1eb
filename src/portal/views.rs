//! Role-scoped operations. Each view only reaches data its role may see;
//! the HTTP handlers and the in-process [`Portal`](super::Portal) both go
//! through these.

use crate::audit::{self, AuditEntry};
use crate::auth::identity::Identity;
use crate::auth::role::{self, RoleAssignment};
use crate::db::Db;
use crate::errors::AppError;
use crate::models::dashboard::{self, AdminStats, PatientStats, PractitionerStats};
use crate::models::patient::{self, Patient, PatientFilter, PatientForm};
use crate::models::protocol::{self, Protocol, ProtocolFilter, ProtocolForm, ProtocolLineForm};
use crate::models::sent_protocol::{self, Decision, SendRequest, SentFilter, SentProtocol, Transitioned};
use crate::models::supplement::{self, Supplement};
use crate::store::StoreError;

/// Everything a practitioner can do, confined to their own namespace.
#[derive(Clone)]
pub struct PractitionerView {
    db: Db,
    owner_id: String,
}

impl PractitionerView {
    pub fn new(db: Db, owner_id: impl Into<String>) -> Self {
        Self {
            db,
            owner_id: owner_id.into(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub async fn dashboard(&self) -> Result<PractitionerStats, StoreError> {
        dashboard::practitioner_stats(&self.db, &self.owner_id).await
    }

    pub async fn list_patients(&self, filter: &PatientFilter) -> Result<Vec<Patient>, StoreError> {
        patient::list_filtered(&self.db, &self.owner_id, filter).await
    }

    pub async fn find_patient(&self, id: &str) -> Result<Patient, AppError> {
        patient::find(&self.db, &self.owner_id, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn upsert_patient(&self, form: &PatientForm) -> Result<Patient, AppError> {
        let saved = patient::upsert(&self.db, &self.owner_id, form).await?;
        let action = if form.id.is_some() { "patient.updated" } else { "patient.created" };
        self.audit(action, "patient", &saved.id, serde_json::json!({ "email": saved.email }))
            .await;
        Ok(saved)
    }

    pub async fn archive_patient(&self, id: &str) -> Result<Patient, AppError> {
        let archived = patient::archive(&self.db, &self.owner_id, id).await?;
        self.audit("patient.archived", "patient", id, serde_json::Value::Null).await;
        Ok(archived)
    }

    pub async fn delete_patient(&self, id: &str) -> Result<(), AppError> {
        patient::delete(&self.db, &self.owner_id, id).await?;
        self.audit("patient.deleted", "patient", id, serde_json::Value::Null).await;
        Ok(())
    }

    pub async fn list_protocols(&self, filter: &ProtocolFilter) -> Result<Vec<Protocol>, StoreError> {
        protocol::list_filtered(&self.db, &self.owner_id, filter).await
    }

    pub async fn list_templates(&self) -> Result<Vec<Protocol>, StoreError> {
        protocol::list_templates(&self.db, &self.owner_id).await
    }

    pub async fn categories(&self) -> Result<Vec<String>, StoreError> {
        protocol::categories(&self.db, &self.owner_id).await
    }

    pub async fn find_protocol(&self, id: &str) -> Result<Protocol, AppError> {
        protocol::find(&self.db, &self.owner_id, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn upsert_protocol(&self, form: &ProtocolForm) -> Result<Protocol, AppError> {
        let saved = protocol::upsert(&self.db, &self.owner_id, form).await?;
        let action = if form.id.is_some() { "protocol.updated" } else { "protocol.created" };
        self.audit(
            action,
            "protocol",
            &saved.id,
            serde_json::json!({ "name": saved.name, "lines": saved.supplements.len() }),
        )
        .await;
        Ok(saved)
    }

    pub async fn delete_protocol(&self, id: &str) -> Result<(), AppError> {
        protocol::delete(&self.db, &self.owner_id, id).await?;
        self.audit("protocol.deleted", "protocol", id, serde_json::Value::Null).await;
        Ok(())
    }

    pub async fn duplicate_protocol(&self, id: &str) -> Result<Protocol, AppError> {
        let copy = protocol::duplicate(&self.db, &self.owner_id, id).await?;
        self.audit("protocol.duplicated", "protocol", &copy.id, serde_json::json!({ "source": id }))
            .await;
        Ok(copy)
    }

    pub async fn add_line(&self, protocol_id: &str, line: &ProtocolLineForm) -> Result<Protocol, AppError> {
        protocol::add_line(&self.db, &self.owner_id, protocol_id, line).await
    }

    pub async fn remove_line(&self, protocol_id: &str, line_id: &str) -> Result<Protocol, AppError> {
        protocol::remove_line(&self.db, &self.owner_id, protocol_id, line_id).await
    }

    pub async fn send(&self, req: &SendRequest) -> Result<SentProtocol, AppError> {
        let record = sent_protocol::send(&self.db, &self.owner_id, req).await?;
        self.audit(
            "protocol.sent",
            "sent_protocol",
            &record.id,
            serde_json::json!({ "protocol_id": record.protocol_id, "patient_id": record.patient_id }),
        )
        .await;
        Ok(record)
    }

    pub async fn outbox(&self, filter: &SentFilter) -> Result<Vec<SentProtocol>, StoreError> {
        sent_protocol::outbox_filtered(&self.db, &self.owner_id, filter).await
    }

    pub async fn find_sent(&self, id: &str) -> Result<SentProtocol, AppError> {
        sent_protocol::find_for_practitioner(&self.db, &self.owner_id, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn audit(&self, action: &str, target_type: &str, target_id: &str, details: serde_json::Value) {
        if let Err(e) = audit::log(&self.db, &self.owner_id, action, target_type, target_id, details).await {
            log::warn!("Audit write failed for {action} {target_id}: {e}");
        }
    }
}

/// A patient sees the protocols sent to any patient record carrying their
/// email, and can only move those.
#[derive(Clone)]
pub struct PatientView {
    db: Db,
    identity: Identity,
}

impl PatientView {
    pub fn new(db: Db, identity: Identity) -> Self {
        Self { db, identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub async fn dashboard(&self) -> Result<PatientStats, StoreError> {
        dashboard::patient_stats(&self.db, &self.identity.email).await
    }

    pub async fn inbox(&self) -> Result<Vec<SentProtocol>, StoreError> {
        sent_protocol::inbox_for_email(&self.db, &self.identity.email).await
    }

    async fn owned(&self, id: &str) -> Result<SentProtocol, AppError> {
        sent_protocol::find_for_patient_email(&self.db, &self.identity.email, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Open a protocol. The first open moves it to `viewed`.
    pub async fn open(&self, id: &str) -> Result<Transitioned, AppError> {
        self.owned(id).await?;
        let result = sent_protocol::mark_viewed(&self.db, id).await?;
        if result.applied {
            self.audit("protocol.viewed", id, serde_json::Value::Null).await;
        }
        Ok(result)
    }

    pub async fn respond(
        &self,
        id: &str,
        decision: Decision,
        notes: Option<&str>,
    ) -> Result<Transitioned, AppError> {
        self.owned(id).await?;
        let result = sent_protocol::respond(&self.db, id, decision, notes).await?;
        if result.applied {
            self.audit(
                "protocol.responded",
                id,
                serde_json::json!({ "status": result.record.status.as_str() }),
            )
            .await;
        }
        Ok(result)
    }

    async fn audit(&self, action: &str, target_id: &str, details: serde_json::Value) {
        if let Err(e) =
            audit::log(&self.db, &self.identity.id, action, "sent_protocol", target_id, details).await
        {
            log::warn!("Audit write failed for {action} {target_id}: {e}");
        }
    }
}

#[derive(Clone)]
pub struct AdminView {
    db: Db,
}

impl AdminView {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn dashboard(&self) -> Result<AdminStats, StoreError> {
        dashboard::admin_stats(&self.db).await
    }

    pub async fn role_assignments(&self) -> Result<Vec<RoleAssignment>, StoreError> {
        role::list_assignments(&self.db).await
    }

    pub async fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
        audit::recent(&self.db, limit).await
    }

    /// The whole catalog, inactive items included.
    pub fn supplements(&self, search: Option<&str>) -> Vec<&'static Supplement> {
        supplement::search_catalog(search.unwrap_or(""))
    }
}
