//! Reader configuration

/// Options controlling how tolerant overlay decoding is.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderConfiguration {
    /// When `true`, anomalies that are normally reported as notifications
    /// (annotation label mismatches, SMP vertex-count mismatches) abort the
    /// read instead.
    ///
    /// Default: `false`.
    pub strict: bool,

    /// Structure of the background mesh (`CortexLeft`, `CortexRight`, ...),
    /// used to pick the matching brain model of a CIfTI overlay.
    pub anatomical_structure_primary: Option<String>,

    /// Reject an annotation whose share of vertices with unmatched labels
    /// exceeds this fraction. `None` never rejects.
    pub max_label_mismatch_fraction: Option<f32>,
}

impl Default for ReaderConfiguration {
    fn default() -> Self {
        Self {
            strict: false,
            anatomical_structure_primary: None,
            max_label_mismatch_fraction: None,
        }
    }
}

impl ReaderConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn anatomical_structure_primary(mut self, structure: impl Into<String>) -> Self {
        self.anatomical_structure_primary = Some(structure.into());
        self
    }

    pub fn max_label_mismatch_fraction(mut self, fraction: f32) -> Self {
        self.max_label_mismatch_fraction = Some(fraction);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_lenient() {
        let cfg = ReaderConfiguration::default();
        assert!(!cfg.strict);
        assert!(cfg.anatomical_structure_primary.is_none());
        assert!(cfg.max_label_mismatch_fraction.is_none());
    }

    #[test]
    fn test_builder() {
        let cfg = ReaderConfiguration::new()
            .strict(true)
            .anatomical_structure_primary("CortexLeft")
            .max_label_mismatch_fraction(0.1);
        assert!(cfg.strict);
        assert_eq!(cfg.anatomical_structure_primary.as_deref(), Some("CortexLeft"));
        assert_eq!(cfg.max_label_mismatch_fraction, Some(0.1));
    }
}
