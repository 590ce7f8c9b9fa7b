//! Relaxation model and status enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind {
    Model,
    Status,
}

impl EnumKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EnumKind::Model => "model",
            EnumKind::Status => "status",
        }
    }
}

impl fmt::Display for EnumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value '{raw}'; expected one of: {expected:?}")]
pub struct EnumParseError {
    kind: EnumKind,
    raw: String,
    expected: &'static [&'static str],
}

impl EnumParseError {
    #[must_use]
    pub fn new(kind: EnumKind, raw: impl Into<String>, expected: &'static [&'static str]) -> Self {
        Self {
            kind,
            raw: raw.into(),
            expected,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EnumKind {
        self.kind
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn expected(&self) -> &'static [&'static str] {
        self.expected
    }
}

/// Machine learning model used to evaluate energies and forces during
/// relaxations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    #[serde(rename = "gemnet_oc_base_s2ef_all_md")]
    GemnetOcBaseS2efAllMd,
    #[serde(rename = "equiformer_v2_153M_s2ef_all_md")]
    EquiformerV2S2efAllMd,
    #[serde(rename = "escn_l6_m3_lay20_s2ef_all_md")]
    EscnL6M3Lay20S2efAllMd,
}

const MODEL_IDS: &[&str] = &[
    "gemnet_oc_base_s2ef_all_md",
    "equiformer_v2_153M_s2ef_all_md",
    "escn_l6_m3_lay20_s2ef_all_md",
];

impl Model {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Model::GemnetOcBaseS2efAllMd => "gemnet_oc_base_s2ef_all_md",
            Model::EquiformerV2S2efAllMd => "equiformer_v2_153M_s2ef_all_md",
            Model::EscnL6M3Lay20S2efAllMd => "escn_l6_m3_lay20_s2ef_all_md",
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Model] {
        &[
            Model::GemnetOcBaseS2efAllMd,
            Model::EquiformerV2S2efAllMd,
            Model::EscnL6M3Lay20S2efAllMd,
        ]
    }

    /// Exact match on the wire id. Model ids are case sensitive
    /// (`153M` is not `153m`).
    pub fn parse(raw: &str) -> Result<Self, EnumParseError> {
        let trimmed = raw.trim();
        Model::all()
            .iter()
            .copied()
            .find(|model| model.as_str() == trimmed)
            .ok_or_else(|| EnumParseError::new(EnumKind::Model, trimmed, MODEL_IDS))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Relaxation status of a single adsorbate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The relaxation completed and results are available.
    Success,
    /// The relaxation has not finished yet.
    NotAvailable,
    /// The relaxation ran but did not converge or crashed.
    FailedRelaxation,
    /// The relaxation finished but some requested data is missing.
    MissingResponseData,
    /// No relaxation exists for the requested config id.
    DoesNotExist,
}

const STATUS_VALUES: &[&str] = &[
    "success",
    "not_available",
    "failed_relaxation",
    "missing_response_data",
    "does_not_exist",
];

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::NotAvailable => "not_available",
            Status::FailedRelaxation => "failed_relaxation",
            Status::MissingResponseData => "missing_response_data",
            Status::DoesNotExist => "does_not_exist",
        }
    }

    /// Whether the server has stopped working on this configuration.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        !matches!(self, Status::NotAvailable)
    }

    /// Exact match on the wire value, with the same casing serde accepts.
    pub fn parse(raw: &str) -> Result<Self, EnumParseError> {
        let trimmed = raw.trim();
        match trimmed {
            "success" => Ok(Status::Success),
            "not_available" => Ok(Status::NotAvailable),
            "failed_relaxation" => Ok(Status::FailedRelaxation),
            "missing_response_data" => Ok(Status::MissingResponseData),
            "does_not_exist" => Ok(Status::DoesNotExist),
            _ => Err(EnumParseError::new(
                EnumKind::Status,
                trimmed,
                STATUS_VALUES,
            )),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::{EnumKind, Model, Status};

    #[test]
    fn model_parse_round_trips_wire_ids() {
        for model in Model::all() {
            assert_eq!(Model::parse(model.as_str()).unwrap(), *model);
        }
    }

    #[test]
    fn model_parse_is_case_sensitive() {
        let err = Model::parse("equiformer_v2_153m_s2ef_all_md").unwrap_err();
        assert_eq!(err.kind(), EnumKind::Model);
        assert_eq!(err.raw(), "equiformer_v2_153m_s2ef_all_md");
        assert!(err.expected().contains(&"equiformer_v2_153M_s2ef_all_md"));
    }

    #[test]
    fn model_serializes_as_wire_id() {
        let json = serde_json::to_string(&Model::EquiformerV2S2efAllMd).unwrap();
        assert_eq!(json, "\"equiformer_v2_153M_s2ef_all_md\"");
    }

    #[test]
    fn status_deserializes_snake_case() {
        let status: Status = serde_json::from_str("\"failed_relaxation\"").unwrap();
        assert_eq!(status, Status::FailedRelaxation);
    }

    #[test]
    fn only_not_available_is_unfinished() {
        assert!(!Status::NotAvailable.is_finished());
        assert!(Status::Success.is_finished());
        assert!(Status::FailedRelaxation.is_finished());
        assert!(Status::DoesNotExist.is_finished());
    }

    #[test]
    fn status_parse_matches_serde_casing() {
        assert_eq!(Status::parse("success").unwrap(), Status::Success);
        assert!(Status::parse("SUCCESS").is_err());
        assert!(serde_json::from_str::<Status>("\"SUCCESS\"").is_err());
    }

    #[test]
    fn status_parse_rejects_unknown() {
        let err = Status::parse("running").unwrap_err();
        assert_eq!(err.kind(), EnumKind::Status);
        assert!(err.to_string().contains("running"));
    }
}
