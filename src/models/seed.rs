use serde::Deserialize;

use crate::db::Db;
use crate::errors::AppError;
use crate::models::patient::{self, PatientForm};
use crate::models::protocol::{self, ProtocolForm};
use crate::store::{StoreError, WriteBatch};

const DEMO_SEED: &str = include_str!("../../data/seed/demo.json");

#[derive(Debug, Deserialize)]
struct DemoSeed {
    patients: Vec<PatientForm>,
    protocols: Vec<ProtocolForm>,
}

/// Give a practitioner with an empty workspace the sample patients and
/// protocols, all in one batch. Returns (patients, protocols) created;
/// (0, 0) when skipped.
pub async fn seed_demo_practitioner(db: &Db, owner_id: &str) -> Result<(usize, usize), AppError> {
    let seed: DemoSeed = serde_json::from_str(DEMO_SEED).map_err(StoreError::from)?;

    let _guard = db.lock_writes().await;
    if !patient::list(db, owner_id).await?.is_empty() || !protocol::list(db, owner_id).await?.is_empty() {
        log::info!("Practitioner {owner_id} already has data, skipping demo seed");
        return Ok((0, 0));
    }

    let mut batch = WriteBatch::new();
    let patients = patient::stage_new(db, &mut batch, owner_id, &seed.patients).await?;
    let protocols = protocol::stage_new(db, &mut batch, owner_id, &seed.protocols).await?;
    db.store().commit(batch).await?;

    log::info!(
        "Demo seed for {owner_id}: patients={}, protocols={}",
        patients.len(),
        protocols.len()
    );
    Ok((patients.len(), protocols.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_once() {
        let db = Db::memory();
        assert_eq!(seed_demo_practitioner(&db, "prac_1").await.unwrap(), (2, 2));
        assert_eq!(seed_demo_practitioner(&db, "prac_1").await.unwrap(), (0, 0));

        let protocols = protocol::list(&db, "prac_1").await.unwrap();
        assert!(protocols.iter().all(|p| p.supplements.len() == 2));
        assert_eq!(protocols.iter().filter(|p| p.is_template).count(), 1);

        let patients = patient::list(&db, "prac_1").await.unwrap();
        for p in &patients {
            let links = patient::find_links_by_email(&db, &p.email).await.unwrap();
            assert!(links.iter().any(|l| l.patient_id == p.id));
        }
    }
}
