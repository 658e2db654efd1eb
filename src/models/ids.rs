use chrono::{DateTime, Utc};
use rand::Rng;

/// Generate a prefixed random id, e.g. `pat_3f9a0c1d2b4e5f60`.
pub fn new_id(prefix: &str) -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 8] = rng.random();
    format!("{prefix}_{}", hex::encode(bytes))
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_and_unique() {
        let a = new_id("sp");
        let b = new_id("sp");
        assert!(a.starts_with("sp_"));
        assert_eq!(a.len(), "sp_".len() + 16);
        assert_ne!(a, b);
    }
}
