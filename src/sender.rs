//! Maps transport-level sender identifiers to friendly display names.

// Known senders. Anyone else shows up under their raw identifier.
const DISPLAY_NAMES: &[(&str, &str)] = &[("972500000001", "Noa"), ("972500000002", "Tomer")];

/// Returns the display name for a sender identifier, or the identifier
/// itself when it is unknown. Pure and total.
pub fn resolve(id: &str) -> String {
    DISPLAY_NAMES
        .iter()
        .find(|(number, _)| *number == id)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sender() {
        assert_eq!(resolve("972500000001"), "Noa");
    }

    #[test]
    fn test_unknown_sender_passes_through() {
        assert_eq!(resolve("15550001111"), "15550001111");
        assert_eq!(resolve(""), "");
    }
}
