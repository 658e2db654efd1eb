use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

const SUPPLEMENT_SEED: &str = include_str!("../../data/seed/supplements.json");

/// Read-only product catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplement {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub form: String,
    pub strength: String,
    pub unit: String,
    pub description: String,
    pub price: f64,
    pub is_active: bool,
}

static CATALOG: LazyLock<Vec<Supplement>> = LazyLock::new(|| {
    serde_json::from_str(SUPPLEMENT_SEED).unwrap_or_else(|e| panic!("Bad supplement seed JSON: {e}"))
});

/// The full bundled catalog, including inactive items.
pub fn catalog() -> &'static [Supplement] {
    &CATALOG
}

/// Active items only; what practitioners may add to a protocol.
pub fn list_active() -> Vec<&'static Supplement> {
    CATALOG.iter().filter(|s| s.is_active).collect()
}

pub fn find(id: &str) -> Option<&'static Supplement> {
    CATALOG.iter().find(|s| s.id == id)
}

/// Like [`find`] but only for items that can go on a protocol.
pub fn find_active(id: &str) -> Option<&'static Supplement> {
    find(id).filter(|s| s.is_active)
}

/// Active items matching `term` on name, brand or category, case-insensitive.
pub fn search(term: &str) -> Vec<&'static Supplement> {
    search_catalog(term).into_iter().filter(|s| s.is_active).collect()
}

/// Like [`search`] but over the whole catalog, inactive items included.
pub fn search_catalog(term: &str) -> Vec<&'static Supplement> {
    let term = term.trim().to_lowercase();
    CATALOG
        .iter()
        .filter(|s| {
            term.is_empty()
                || s.name.to_lowercase().contains(&term)
                || s.brand.to_lowercase().contains(&term)
                || s.category.to_lowercase().contains(&term)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_parses() {
        assert_eq!(catalog().len(), 9);
        assert_eq!(list_active().len(), 8);
        assert!(catalog().iter().all(|s| s.price > 0.0));
    }

    #[test]
    fn lookup_and_search() {
        assert_eq!(find("supp_003").map(|s| s.name.as_str()), Some("Magnesium Glycinate"));
        assert!(find("supp_999").is_none());
        assert!(find("supp_009").is_some());
        assert!(find_active("supp_009").is_none());
        assert!(find_active("supp_003").is_some());

        let minerals = search("minerals");
        assert_eq!(minerals.len(), 2);
        assert_eq!(search("THORNE").len(), 1);
        assert_eq!(search("").len(), list_active().len());
        assert_eq!(search_catalog("").len(), catalog().len());
    }
}
