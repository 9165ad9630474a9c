//! Read-only reference arena shared across analyses.
//!
//! Reference data (the conductor library) is immutable after construction
//! and safe to share behind an `Arc` across threads and requests. Mutable
//! state never lives here: every scenario evaluation clones the source
//! `Network` into an exclusively-owned snapshot, mutates that, and throws
//! it away. One snapshot per request, rebuilt from the arena every time;
//! two scenario evaluations never touch the same topology object.

use gre_thermal::ConductorSpec;
use std::collections::HashMap;

/// Conductor reference data keyed by library name.
#[derive(Debug, Clone, Default)]
pub struct ConductorLibrary {
    specs: HashMap<String, ConductorSpec>,
}

impl ConductorLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs<I>(specs: I) -> Self
    where
        I: IntoIterator<Item = ConductorSpec>,
    {
        Self {
            specs: specs
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
        }
    }

    pub fn insert(&mut self, spec: ConductorSpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&ConductorSpec> {
        self.specs.get(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Sorted conductor names, for listings and error messages.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.specs.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_lookup() {
        let library = ConductorLibrary::from_specs([
            ConductorSpec::from_library_row("DRAKE", 0.1166, 0.1278, 0.554, Some(75.0)),
            ConductorSpec::from_library_row("LINNET", 0.294, 0.322, 0.3615, Some(75.0)),
        ]);
        assert_eq!(library.len(), 2);
        assert!(library.get("DRAKE").is_some());
        assert!(library.get("UNOBTANIUM").is_none());
        assert_eq!(library.names(), vec!["DRAKE".to_string(), "LINNET".to_string()]);
    }
}
