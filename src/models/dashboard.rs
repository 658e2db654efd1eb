use serde::Serialize;

use crate::auth::role::{self, RoleCounts};
use crate::db::Db;
use crate::models::{patient, protocol, sent_protocol, supplement};
use crate::models::sent_protocol::{ExchangeStats, SentStatus};
use crate::store::StoreError;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PractitionerStats {
    pub patients_total: usize,
    pub patients_active: usize,
    pub protocols_total: usize,
    pub protocols_active: usize,
    pub templates: usize,
    pub exchange: ExchangeStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatientStats {
    pub received: usize,
    pub new: usize,
    pub accepted: usize,
    pub declined: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminStats {
    pub roles: RoleCounts,
    pub supplements_total: usize,
    pub supplements_active: usize,
}

pub async fn practitioner_stats(db: &Db, owner_id: &str) -> Result<PractitionerStats, StoreError> {
    let patients = patient::list(db, owner_id).await?;
    let protocols = protocol::list(db, owner_id).await?;
    Ok(PractitionerStats {
        patients_total: patients.len(),
        patients_active: patients.iter().filter(|p| p.is_active()).count(),
        protocols_total: protocols.len(),
        protocols_active: protocols.iter().filter(|p| p.is_active()).count(),
        templates: protocols.iter().filter(|p| p.is_template).count(),
        exchange: sent_protocol::stats_for_practitioner(db, owner_id).await?,
    })
}

pub async fn patient_stats(db: &Db, email: &str) -> Result<PatientStats, StoreError> {
    let received = sent_protocol::inbox_for_email(db, email).await?;
    let count = |status: SentStatus| received.iter().filter(|sp| sp.status == status).count();
    Ok(PatientStats {
        received: received.len(),
        new: count(SentStatus::Sent),
        accepted: count(SentStatus::Accepted),
        declined: count(SentStatus::Declined),
    })
}

pub async fn admin_stats(db: &Db) -> Result<AdminStats, StoreError> {
    Ok(AdminStats {
        roles: role::role_counts(db).await?,
        supplements_total: supplement::catalog().len(),
        supplements_active: supplement::list_active().len(),
    })
}
