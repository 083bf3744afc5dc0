// Performance-analysis data loaders for the dashboard charts

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::error::RelayError;
use crate::relay::DeviceRelay;

/// The known analysis types the dashboard can chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    JointAngles,
    Smoothness,
    Symmetry,
    Balance,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 4] = [
        AnalysisKind::JointAngles,
        AnalysisKind::Smoothness,
        AnalysisKind::Symmetry,
        AnalysisKind::Balance,
    ];

    /// The identifier used in request paths.
    pub fn as_query(&self) -> &'static str {
        match self {
            AnalysisKind::JointAngles => "jointAngles",
            AnalysisKind::Smoothness => "smoothness",
            AnalysisKind::Symmetry => "symmetry",
            AnalysisKind::Balance => "balance",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for AnalysisKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jointAngles" => Ok(AnalysisKind::JointAngles),
            "smoothness" => Ok(AnalysisKind::Smoothness),
            "symmetry" => Ok(AnalysisKind::Symmetry),
            "balance" => Ok(AnalysisKind::Balance),
            _ => Err(AnalysisError::UnknownType),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Unknown analysis type")]
    UnknownType,

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// A loaded analysis series. The chart payload stays schemaless — its shape
/// belongs to the external plotting layer.
#[derive(Debug, Clone)]
pub struct AnalysisData {
    pub kind: AnalysisKind,
    pub data: serde_json::Value,
}

/// Load the master performer's reference series for an analysis type.
/// Unknown types are rejected locally and never reach the network.
pub async fn load_master_data(
    relay: &dyn DeviceRelay,
    analysis_type: &str,
) -> Result<AnalysisData, AnalysisError> {
    let kind = analysis_type.parse::<AnalysisKind>()?;
    let data = relay.master_analysis(kind).await?;
    Ok(AnalysisData { kind, data })
}

/// Load a saved session's computed series for an analysis type.
pub async fn load_session_data(
    relay: &dyn DeviceRelay,
    session_id: &str,
    analysis_type: &str,
) -> Result<AnalysisData, AnalysisError> {
    let kind = analysis_type.parse::<AnalysisKind>()?;
    let data = relay.session_analysis(session_id, kind).await?;
    Ok(AnalysisData { kind, data })
}
