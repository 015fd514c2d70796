//! The fixed boss catalog: two disjoint, ordered name lists.
//!
//! Membership in `MAJOR_BOSSES` determines a target's category; the engine
//! derives the category from the found name and never sets it independently.

/// Major (MVP) bosses, in panel order.
pub const MAJOR_BOSSES: [&str; 8] = [
    "Phreeoni", "Mistress", "Kraken", "Eddga",
    "Maya", "Orc Hero", "Pharaoh", "Orc Lord",
];

/// Minor bosses, in panel order.
pub const MINOR_BOSSES: [&str; 8] = [
    "Dragon Fly", "Eclipse", "Mastering", "Ghostring",
    "Toad", "King Dramoh", "Deviling", "Angeling",
];

/// Returns true if `name` is in the major-boss list.
pub fn is_major(name: &str) -> bool {
    MAJOR_BOSSES.contains(&name)
}

/// Returns true if `name` belongs to either catalog list.
pub fn is_known_boss(name: &str) -> bool {
    MAJOR_BOSSES.contains(&name) || MINOR_BOSSES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lists_disjoint() {
        for name in MAJOR_BOSSES {
            assert!(!MINOR_BOSSES.contains(&name), "{} in both lists", name);
        }
    }

    #[test]
    fn test_is_major() {
        assert!(is_major("Eddga"));
        assert!(is_major("Orc Lord"));
        assert!(!is_major("Toad"));
        assert!(!is_major("Nonexistent"));
    }

    #[test]
    fn test_is_known_boss() {
        assert!(is_known_boss("Eddga"));
        assert!(is_known_boss("Angeling"));
        assert!(!is_known_boss("Poring"));
    }
}
