use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::orientation::wrap_degrees;

/// Azimuth sectors that already hold at least one captured frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorCoverage {
    sector_width_deg: f64,
    sectors: BTreeSet<u16>,
}

/// Serializable summary of [`SectorCoverage`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSnapshot {
    pub sectors: Vec<u16>,
    pub sector_count: u16,
    pub percent: f64,
}

impl SectorCoverage {
    /// `sector_width_deg` must be positive; 10° gives 36 sectors.
    pub fn new(sector_width_deg: f64) -> Self {
        Self {
            sector_width_deg,
            sectors: BTreeSet::new(),
        }
    }

    pub fn sector_count(&self) -> u16 {
        (360.0 / self.sector_width_deg).ceil() as u16
    }

    pub fn sector_of(&self, azimuth_deg: f64) -> u16 {
        let sector = (wrap_degrees(azimuth_deg) / self.sector_width_deg).floor() as u16;
        sector.min(self.sector_count().saturating_sub(1))
    }

    /// Returns `true` when the sector was not covered before.
    pub fn record(&mut self, azimuth_deg: f64) -> bool {
        let sector = self.sector_of(azimuth_deg);
        self.sectors.insert(sector)
    }

    pub fn percent(&self) -> f64 {
        self.sectors.len() as f64 / f64::from(self.sector_count()) * 100.0
    }

    pub fn snapshot(&self) -> CoverageSnapshot {
        CoverageSnapshot {
            sectors: self.sectors.iter().copied().collect(),
            sector_count: self.sector_count(),
            percent: self.percent(),
        }
    }
}

impl Default for SectorCoverage {
    fn default() -> Self {
        Self::new(10.0)
    }
}
