use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::supplement::Supplement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

/// One supplement recommendation inside a protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSupplement {
    pub id: String,
    pub supplement_id: String,
    /// Catalog entry as it was when the line was written.
    pub supplement: Supplement,
    pub dosage: String,
    pub frequency: String,
    pub timing: String,
    pub duration_days: u32,
    pub instructions: String,
    pub is_required: bool,
    pub sort_order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: String,
    pub practitioner_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub duration_weeks: u32,
    pub status: ProtocolStatus,
    pub is_template: bool,
    pub supplements: Vec<ProtocolSupplement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Protocol {
    pub fn is_active(&self) -> bool {
        self.status == ProtocolStatus::Active
    }

    /// Reassign `sort_order` 1..=n in current order.
    pub fn renumber(&mut self) {
        for (i, line) in self.supplements.iter_mut().enumerate() {
            line.sort_order = i as u32 + 1;
        }
    }

    /// Sum of catalog prices across lines.
    pub fn total_price(&self) -> f64 {
        self.supplements.iter().map(|l| l.supplement.price).sum()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProtocolLineForm {
    pub supplement_id: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub timing: String,
    #[serde(default)]
    pub duration_days: u32,
    #[serde(default)]
    pub instructions: String,
    #[serde(default = "default_required")]
    pub is_required: bool,
}

fn default_required() -> bool {
    true
}

/// Create/edit payload. `id: None` creates a new protocol (as draft unless
/// a status is given). Lines are taken in the order supplied.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProtocolForm {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub duration_weeks: u32,
    #[serde(default)]
    pub status: Option<ProtocolStatus>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub supplements: Vec<ProtocolLineForm>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<ProtocolStatus>,
    #[serde(default)]
    pub category: Option<String>,
}

impl ProtocolFilter {
    pub fn matches(&self, p: &Protocol) -> bool {
        if let Some(status) = self.status {
            if p.status != status {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref() {
            if p.category != category {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                p.name.to_lowercase().contains(&term)
                    || p.description.to_lowercase().contains(&term)
                    || p.category.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}
