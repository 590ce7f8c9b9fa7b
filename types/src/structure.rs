//! Atomic structures: bulks, slabs and adsorbate placements.

use serde::{Deserialize, Serialize};

use crate::Extra;

/// Miller indices `(h, k, l)` of a slab surface.
pub type MillerIndices = (i32, i32, i32);

/// Subset of the fields on an ASE `Atoms` object needed to describe a
/// periodic structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atoms {
    /// Unit cell vectors, one row per lattice vector.
    pub cell: [[f64; 3]; 3],
    /// Whether the cell is periodic along each lattice vector.
    pub pbc: [bool; 3],
    /// Atomic number of each atom.
    pub numbers: Vec<u32>,
    /// Cartesian position of each atom.
    pub positions: Vec<[f64; 3]>,
    /// 0 for subsurface atoms, 1 for surface atoms, 2 for adsorbate atoms.
    pub tags: Vec<i32>,
    #[serde(flatten)]
    pub other: Extra,
}

impl Atoms {
    #[must_use]
    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bulk {
    /// Id of the bulk in its source database (for example `mp-30`).
    pub src_id: String,
    pub formula: String,
    pub elements: Vec<String>,
    #[serde(flatten)]
    pub other: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bulks {
    pub bulks_supported: Vec<Bulk>,
    #[serde(flatten)]
    pub other: Extra,
}

impl Bulks {
    #[must_use]
    pub fn find(&self, src_id: &str) -> Option<&Bulk> {
        self.bulks_supported.iter().find(|b| b.src_id == src_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adsorbates {
    /// SMILES strings of every adsorbate the API can place.
    pub adsorbates_supported: Vec<String>,
    #[serde(flatten)]
    pub other: Extra,
}

impl Adsorbates {
    #[must_use]
    pub fn contains(&self, smiles: &str) -> bool {
        self.adsorbates_supported.iter().any(|a| a == smiles)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabMetadata {
    pub bulk_src_id: String,
    pub millers: MillerIndices,
    /// Position along the surface normal at which the bulk was cut.
    pub shift: f64,
    /// Whether this is the top or bottom surface of the cut.
    pub top: bool,
    #[serde(flatten)]
    pub other: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slab {
    pub atoms: Atoms,
    pub metadata: SlabMetadata,
    #[serde(flatten)]
    pub other: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slabs {
    pub slabs: Vec<Slab>,
    #[serde(flatten)]
    pub other: Extra,
}

/// Candidate adsorbate placements on a slab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdsorbateSlabConfigs {
    /// Only the adsorbate atoms of each placement; the surface is `slab`.
    pub adsorbate_configs: Vec<Atoms>,
    pub slab: Slab,
    #[serde(flatten)]
    pub other: Extra,
}
