use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::patient::Patient;
use crate::models::protocol::Protocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentStatus {
    Sent,
    Viewed,
    Accepted,
    Declined,
}

impl SentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SentStatus::Accepted | SentStatus::Declined)
    }

    /// Position in the lifecycle; transitions only ever increase it.
    pub fn rank(self) -> u8 {
        match self {
            SentStatus::Sent => 0,
            SentStatus::Viewed => 1,
            SentStatus::Accepted | SentStatus::Declined => 2,
        }
    }

    pub fn can_become(self, next: SentStatus) -> bool {
        match (self, next) {
            (SentStatus::Sent, SentStatus::Viewed) => true,
            (SentStatus::Sent | SentStatus::Viewed, SentStatus::Accepted | SentStatus::Declined) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SentStatus::Sent => "sent",
            SentStatus::Viewed => "viewed",
            SentStatus::Accepted => "accepted",
            SentStatus::Declined => "declined",
        }
    }
}

/// A patient's answer to a sent protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accepted,
    Declined,
}

impl From<Decision> for SentStatus {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Accepted => SentStatus::Accepted,
            Decision::Declined => SentStatus::Declined,
        }
    }
}

/// One protocol assigned to one patient. Stored once; the practitioner's
/// outbox and the patient's inbox only hold its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentProtocol {
    pub id: String,
    pub protocol_id: String,
    pub protocol: Protocol,
    pub patient_id: String,
    pub patient: Patient,
    pub practitioner_id: String,
    pub message: String,
    pub status: SentStatus,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub viewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of a transition request. `applied` is false when the request was
/// a no-op because the record had already moved past it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transitioned {
    pub record: SentProtocol,
    pub applied: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SendRequest {
    pub protocol_id: String,
    pub patient_id: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RespondRequest {
    pub decision: Decision,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<SentStatus>,
}

impl SentFilter {
    pub fn matches(&self, sp: &SentProtocol) -> bool {
        if let Some(status) = self.status {
            if sp.status != status {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                sp.patient.first_name.to_lowercase().contains(&term)
                    || sp.patient.last_name.to_lowercase().contains(&term)
                    || sp.patient.email.to_lowercase().contains(&term)
                    || sp.protocol.name.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// Response counters over a set of sent protocols.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExchangeStats {
    pub total: usize,
    pub pending: usize,
    pub viewed_or_later: usize,
    pub accepted: usize,
    pub declined: usize,
    /// Responded / total, rounded to whole percent. Zero when nothing was sent.
    pub response_rate: u32,
}

impl ExchangeStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a SentProtocol>) -> Self {
        let mut stats = ExchangeStats::default();
        for sp in records {
            stats.total += 1;
            match sp.status {
                SentStatus::Sent => stats.pending += 1,
                SentStatus::Viewed => stats.viewed_or_later += 1,
                SentStatus::Accepted => {
                    stats.viewed_or_later += 1;
                    stats.accepted += 1;
                }
                SentStatus::Declined => {
                    stats.viewed_or_later += 1;
                    stats.declined += 1;
                }
            }
        }
        if stats.total > 0 {
            let responded = (stats.accepted + stats.declined) as f64;
            stats.response_rate = (responded / stats.total as f64 * 100.0).round() as u32;
        }
        stats
    }
}
