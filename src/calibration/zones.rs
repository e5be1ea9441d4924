use serde::{Deserialize, Serialize};

/// One discrete focus band. Every zone needs one captured frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocalZone {
    pub index: usize,
    pub low: f64,
    pub high: f64,
    pub captured: bool,
}

/// Contiguous equal-width partition of `[min, max]` in diopter space.
///
/// Every zone is half-open `[low, high)` except the last, which also contains
/// `max`. A diopter on a boundary therefore belongs to the higher zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZoneMap {
    min: f64,
    max: f64,
    zones: Vec<FocalZone>,
}

impl ZoneMap {
    /// Partitions `[min, max]` into `count` zones.
    ///
    /// Callers guarantee `min <= max`, both finite, and `count >= 1`.
    pub fn partition(min: f64, max: f64, count: usize) -> Self {
        let count = count.max(1);
        let width = (max - min) / count as f64;
        let zones = (0..count)
            .map(|index| FocalZone {
                index,
                low: min + width * index as f64,
                high: if index + 1 == count {
                    max
                } else {
                    min + width * (index + 1) as f64
                },
                captured: false,
            })
            .collect();

        Self { min, max, zones }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn zones(&self) -> &[FocalZone] {
        &self.zones
    }

    /// Zone containing `diopter`, or `None` outside the calibrated range.
    pub fn zone_for(&self, diopter: f64) -> Option<FocalZone> {
        self.index_for(diopter).map(|index| self.zones[index])
    }

    pub fn index_for(&self, diopter: f64) -> Option<usize> {
        if !diopter.is_finite() || diopter < self.min || diopter > self.max {
            return None;
        }
        let last = self.zones.len() - 1;
        if diopter >= self.zones[last].low {
            return Some(last);
        }

        // Estimate arithmetically, then settle against the stored boundaries so
        // rounding in the division can never disagree with `low`/`high`.
        let width = (self.max - self.min) / self.zones.len() as f64;
        let mut index = if width > 0.0 {
            (((diopter - self.min) / width).floor() as usize).min(last)
        } else {
            0
        };
        while index > 0 && diopter < self.zones[index].low {
            index -= 1;
        }
        while index < last && diopter >= self.zones[index].high {
            index += 1;
        }
        Some(index)
    }

    pub fn mark_captured(&mut self, index: usize) -> bool {
        match self.zones.get_mut(index) {
            Some(zone) => {
                zone.captured = true;
                true
            }
            None => false,
        }
    }

    pub fn clear_captured(&mut self, index: usize) -> bool {
        match self.zones.get_mut(index) {
            Some(zone) => {
                zone.captured = false;
                true
            }
            None => false,
        }
    }

    pub fn is_captured(&self, index: usize) -> bool {
        self.zones.get(index).is_some_and(|zone| zone.captured)
    }

    pub fn all_captured(&self) -> bool {
        self.zones.iter().all(|zone| zone.captured)
    }

    pub fn captured_count(&self) -> usize {
        self.zones.iter().filter(|zone| zone.captured).count()
    }

    /// Captured flag per zone, in index order.
    pub fn occupancy(&self) -> Vec<bool> {
        self.zones.iter().map(|zone| zone.captured).collect()
    }
}
