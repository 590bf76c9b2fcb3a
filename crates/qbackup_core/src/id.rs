//! Opaque identifiers for records without a natural key.
//!
//! # Invariants
//! - Identifiers are random v4 UUIDs rendered as lowercase hyphenated text.
//! - No ordering or monotonicity is implied.

use uuid::Uuid;

/// Generates a fresh unique identifier.
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::generate;
    use std::collections::HashSet;
    use uuid::Uuid;

    #[test]
    fn generated_ids_parse_as_v4_uuids() {
        let id = generate();
        let parsed = Uuid::parse_str(&id).expect("generated id should be a uuid");
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(id, id.to_lowercase());
    }

    #[test]
    fn generated_ids_do_not_repeat() {
        let ids: HashSet<String> = (0..256).map(|_| generate()).collect();
        assert_eq!(ids.len(), 256);
    }
}
