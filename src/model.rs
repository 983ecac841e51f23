use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upstream system a harvest run reads from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum DataProvider {
    #[default]
    SpeciesPortal,
    ClamPortal,
    Kul,
    Sers,
    Nors,
    INaturalist,
}

impl DataProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataProvider::SpeciesPortal => "SpeciesPortal",
            DataProvider::ClamPortal => "ClamPortal",
            DataProvider::Kul => "KUL",
            DataProvider::Sers => "SERS",
            DataProvider::Nors => "NORS",
            DataProvider::INaturalist => "iNaturalist",
        }
    }

    pub fn parse_provider(s: &str) -> Option<Self> {
        match s {
            "SpeciesPortal" => Some(DataProvider::SpeciesPortal),
            "ClamPortal" => Some(DataProvider::ClamPortal),
            "KUL" => Some(DataProvider::Kul),
            "SERS" => Some(DataProvider::Sers),
            "NORS" => Some(DataProvider::Nors),
            "iNaturalist" => Some(DataProvider::INaturalist),
            _ => None,
        }
    }
}

/// Terminal outcome of a harvest run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed,
    Canceled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "Success",
            RunStatus::Failed => "Failed",
            RunStatus::Canceled => "Canceled",
        }
    }

    pub fn parse_status(s: &str) -> Option<Self> {
        match s {
            "Success" => Some(RunStatus::Success),
            "Failed" => Some(RunStatus::Failed),
            "Canceled" => Some(RunStatus::Canceled),
            _ => None,
        }
    }
}

/// The single observable result of a harvest run.
///
/// Created when the run starts and finished exactly once through
/// [`HarvestInfo::finish`]. `count` is only set on success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarvestInfo {
    pub id: String,
    pub data_provider: DataProvider,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub status: Option<RunStatus>,
    pub count: usize,
}

impl HarvestInfo {
    pub fn new(id: impl Into<String>, data_provider: DataProvider, start: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            data_provider,
            start,
            end: None,
            status: None,
            count: 0,
        }
    }

    pub fn finish(&mut self, status: RunStatus, count: Option<usize>) {
        self.status = Some(status);
        self.end = Some(Utc::now());
        if let Some(count) = count {
            self.count = count;
        }
    }
}
