//! Climber-facing safety notes for the rock types the classifier knows.

/// Fallback for rock types without a curated note.
pub const DEFAULT_ADVISORY: &str = "No special info about this rock!";

/// Look up the safety note for a predicted rock type.
///
/// Matching is exact and case-sensitive; any other label, including the
/// empty string, gets [`DEFAULT_ADVISORY`].
pub fn advisory_for(label: &str) -> &'static str {
    match label {
        "Limestone" => {
            "Recommend not using cams unless absolutely necessary.  It is safer to stick to sport climbing when it comes to this rock."
        }
        "Granite" => "Watch out for polished faces that don't hold cams well!",
        "Sandstone" => {
            "Absolutely do NOT climb on this rock in any type of percipitation! It will crumble."
        }
        "Quartzite" => "Be carful of sharp edges that will easily cut you!",
        _ => DEFAULT_ADVISORY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_rock_types_have_curated_notes() {
        assert!(advisory_for("Limestone").contains("sport climbing"));
        assert!(advisory_for("Granite").contains("polished faces"));
        assert!(advisory_for("Sandstone").contains("percipitation"));
        assert!(advisory_for("Quartzite").contains("sharp edges"));
    }

    #[test]
    fn unknown_labels_get_the_default_note() {
        assert_eq!(advisory_for("Basalt"), DEFAULT_ADVISORY);
        assert_eq!(advisory_for(""), DEFAULT_ADVISORY);
        // Case-sensitive on purpose: labels come straight from the model.
        assert_eq!(advisory_for("granite"), DEFAULT_ADVISORY);
    }
}
