use std::collections::HashSet;

use ocpapi_types::{AdsorbateSlabConfigs, MillerIndices};

/// Chooses which slabs go on to relaxation.
///
/// Filters run after adsorbate placements are generated for every slab of a
/// bulk and before any relaxation is submitted.
pub trait AdslabFilter: Send + Sync {
    fn filter(&self, adslabs: Vec<AdsorbateSlabConfigs>) -> Vec<AdsorbateSlabConfigs>;
}

/// Keep every slab.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAllSlabs;

impl AdslabFilter for KeepAllSlabs {
    fn filter(&self, adslabs: Vec<AdsorbateSlabConfigs>) -> Vec<AdsorbateSlabConfigs> {
        adslabs
    }
}

/// Keep only slabs cut along one of the given Miller indices.
#[derive(Debug, Clone, Default)]
pub struct KeepSlabsWithMillerIndices {
    millers: HashSet<MillerIndices>,
}

impl KeepSlabsWithMillerIndices {
    #[must_use]
    pub fn new(millers: impl IntoIterator<Item = MillerIndices>) -> Self {
        Self {
            millers: millers.into_iter().collect(),
        }
    }
}

impl AdslabFilter for KeepSlabsWithMillerIndices {
    fn filter(&self, adslabs: Vec<AdsorbateSlabConfigs>) -> Vec<AdsorbateSlabConfigs> {
        adslabs
            .into_iter()
            .filter(|adslab| self.millers.contains(&adslab.slab.metadata.millers))
            .collect()
    }
}
