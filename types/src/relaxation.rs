//! Relaxation submissions and their results.

use serde::{Deserialize, Serialize};

use crate::Extra;
use crate::model::{Model, Status};
use crate::structure::{Atoms, Bulk, Slab};

/// Identifies a batch of submitted relaxations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdsorbateSlabRelaxationsSystem {
    pub system_id: String,
    /// One id per submitted adsorbate configuration, in submission order.
    pub config_ids: Vec<i64>,
    #[serde(flatten)]
    pub other: Extra,
}

/// The request that created a system, as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdsorbateSlabRelaxationsRequest {
    pub adsorbate: String,
    pub adsorbate_configs: Vec<Atoms>,
    pub bulk: Bulk,
    pub slab: Slab,
    pub model: Model,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral: Option<bool>,
    #[serde(flatten)]
    pub other: Extra,
}

/// Body of a relaxation submission.
///
/// Borrowed so that callers can submit straight from fetched
/// [`crate::AdsorbateSlabConfigs`] without cloning structures.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRelaxations<'a> {
    pub adsorbate: &'a str,
    pub adsorbate_configs: &'a [Atoms],
    pub bulk: &'a Bulk,
    pub slab: &'a Slab,
    pub model: Model,
    /// When false, later attempts to delete the relaxations are rejected.
    pub ephemeral: bool,
}

/// Result for one adsorbate configuration.
///
/// Everything except `config_id` and `status` is omitted when the caller
/// asked for a subset of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdsorbateSlabRelaxationResult {
    pub config_id: i64,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<[[f64; 3]; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbc: Option<[bool; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numbers: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<[f64; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<i32>>,
    /// Final energy in eV.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_trajectory: Option<Vec<f64>>,
    /// Final forces on each atom in eV/Å.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forces: Option<Vec<[f64; 3]>>,
    #[serde(flatten)]
    pub other: Extra,
}

impl AdsorbateSlabRelaxationResult {
    /// Rebuilds the relaxed structure when every structural field is present.
    #[must_use]
    pub fn to_atoms(&self) -> Option<Atoms> {
        Some(Atoms {
            cell: self.cell?,
            pbc: self.pbc?,
            numbers: self.numbers.clone()?,
            positions: self.positions.clone()?,
            tags: self.tags.clone()?,
            other: Extra::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdsorbateSlabRelaxationsResults {
    pub configs: Vec<AdsorbateSlabRelaxationResult>,
    /// Configs the server left out, usually because the response grew too
    /// large. Fetch them with a follow-up request.
    #[serde(default)]
    pub omitted_config_ids: Vec<i64>,
    #[serde(flatten)]
    pub other: Extra,
}
