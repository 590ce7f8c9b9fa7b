//! Request and response models for the Open Catalyst API.
//!
//! This crate contains pure data types with no IO and no async. Every object
//! model keeps fields it does not know about in an `other` map so that
//! responses from newer servers still decode, and re-serialize unchanged.

mod model;
mod relaxation;
mod structure;

pub use model::{EnumKind, EnumParseError, Model, Status};
pub use relaxation::{
    AdsorbateSlabRelaxationResult, AdsorbateSlabRelaxationsRequest,
    AdsorbateSlabRelaxationsResults, AdsorbateSlabRelaxationsSystem, SubmitRelaxations,
};
pub use structure::{
    AdsorbateSlabConfigs, Adsorbates, Atoms, Bulk, Bulks, MillerIndices, Slab, SlabMetadata, Slabs,
};

/// Catch-all for fields present in a response but not modelled here.
pub type Extra = serde_json::Map<String, serde_json::Value>;
