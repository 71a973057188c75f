//! Aggregation and compliance verdicts
//!
//! Reduces a classification grid to per-class tallies and percentages,
//! then issues the audit verdict. Tallies merge commutatively so tiles
//! processed in any order produce the same summary.

use crate::classify::PixelClass;
use ecosentinel_core::raster::Raster;
use ecosentinel_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-class pixel tallies for one grid or tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub healthy: u64,
    pub stressed: u64,
    pub water: u64,
    pub bare: u64,
    pub nodata: u64,
}

impl ClassCounts {
    /// Record one pixel
    pub fn add(&mut self, class: PixelClass) {
        match class {
            PixelClass::Healthy => self.healthy += 1,
            PixelClass::Stressed => self.stressed += 1,
            PixelClass::Water => self.water += 1,
            PixelClass::Bare => self.bare += 1,
            PixelClass::NoData => self.nodata += 1,
        }
    }

    /// Combine tallies from two tiles. Commutative and associative, so
    /// tile results can arrive in any order.
    pub fn merge(self, other: ClassCounts) -> ClassCounts {
        ClassCounts {
            healthy: self.healthy + other.healthy,
            stressed: self.stressed + other.stressed,
            water: self.water + other.water,
            bare: self.bare + other.bare,
            nodata: self.nodata + other.nodata,
        }
    }

    /// Pixels with a usable observation
    pub fn valid(&self) -> u64 {
        self.healthy + self.stressed + self.water + self.bare
    }

    /// All pixels including no-data
    pub fn total(&self) -> u64 {
        self.valid() + self.nodata
    }

    /// Vegetated pixels (healthy or stressed)
    pub fn vegetation(&self) -> u64 {
        self.healthy + self.stressed
    }
}

/// Tally the classes of a classification grid.
///
/// Unknown codes are counted as no-data rather than silently dropped,
/// so totals always match the raw pixel count.
pub fn count_classes(classes: &Raster<u8>) -> ClassCounts {
    let mut counts = ClassCounts::default();
    for &code in classes.data().iter() {
        counts.add(PixelClass::from_code(code).unwrap_or(PixelClass::NoData));
    }
    counts
}

/// Compliance decision threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComplianceParams {
    /// Stressed percent of valid pixels above which the verdict is
    /// Critical Risk
    pub stress_cutoff_pct: f64,
}

impl Default for ComplianceParams {
    fn default() -> Self {
        Self {
            stress_cutoff_pct: 40.0,
        }
    }
}

impl ComplianceParams {
    /// Check the cutoff is usable
    pub fn validate(&self) -> Result<()> {
        if !self.stress_cutoff_pct.is_finite() || self.stress_cutoff_pct < 0.0 {
            return Err(Error::InvalidParameter {
                name: "stress_cutoff_pct",
                value: self.stress_cutoff_pct.to_string(),
                reason: "must be a non-negative finite percentage".to_string(),
            });
        }
        Ok(())
    }
}

/// Audit verdict for one analysis area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Stress within tolerance
    Compliant,
    /// Stressed share of valid pixels exceeds the cutoff
    CriticalRisk,
    /// No usable observations (e.g. fully cloud-obscured tile)
    Indeterminate,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Compliant => write!(f, "Compliant"),
            Verdict::CriticalRisk => write!(f, "Critical Risk"),
            Verdict::Indeterminate => write!(f, "Indeterminate"),
        }
    }
}

/// Terminal output of the pipeline, immutable once produced.
///
/// Percentages are over valid (non no-data) pixels and sum to 100 when
/// any valid pixel exists; `valid + nodata` always equals the raw pixel
/// count. Serializable for external report generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceSummary {
    pub counts: ClassCounts,
    /// Percent of valid pixels per class
    pub healthy_pct: f64,
    pub stressed_pct: f64,
    pub water_pct: f64,
    pub bare_pct: f64,
    /// Vegetated share of valid pixels
    pub vegetation_cover_pct: f64,
    /// Stressed share of vegetated pixels (0 when no vegetation)
    pub vegetation_stress_pct: f64,
    /// Cutoff the verdict was decided against
    pub stress_cutoff_pct: f64,
    pub verdict: Verdict,
}

/// Reduce tallies to percentages and a verdict.
///
/// A grid with no valid pixels yields `Verdict::Indeterminate` with all
/// percentages at zero rather than a false compliance call.
pub fn summarize(counts: ClassCounts, params: ComplianceParams) -> Result<ComplianceSummary> {
    params.validate()?;

    let valid = counts.valid();

    if valid == 0 {
        return Ok(ComplianceSummary {
            counts,
            healthy_pct: 0.0,
            stressed_pct: 0.0,
            water_pct: 0.0,
            bare_pct: 0.0,
            vegetation_cover_pct: 0.0,
            vegetation_stress_pct: 0.0,
            stress_cutoff_pct: params.stress_cutoff_pct,
            verdict: Verdict::Indeterminate,
        });
    }

    let pct = |n: u64| 100.0 * n as f64 / valid as f64;

    let stressed_pct = pct(counts.stressed);
    let vegetation = counts.vegetation();
    let vegetation_stress_pct = if vegetation > 0 {
        100.0 * counts.stressed as f64 / vegetation as f64
    } else {
        0.0
    };

    let verdict = if stressed_pct > params.stress_cutoff_pct {
        Verdict::CriticalRisk
    } else {
        Verdict::Compliant
    };

    Ok(ComplianceSummary {
        counts,
        healthy_pct: pct(counts.healthy),
        stressed_pct,
        water_pct: pct(counts.water),
        bare_pct: pct(counts.bare),
        vegetation_cover_pct: pct(vegetation),
        vegetation_stress_pct,
        stress_cutoff_pct: params.stress_cutoff_pct,
        verdict,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(healthy: u64, stressed: u64, water: u64, bare: u64, nodata: u64) -> ClassCounts {
        ClassCounts {
            healthy,
            stressed,
            water,
            bare,
            nodata,
        }
    }

    #[test]
    fn test_merge_is_commutative() {
        let a = counts(10, 5, 3, 2, 1);
        let b = counts(7, 9, 0, 4, 6);

        assert_eq!(a.merge(b), b.merge(a));
        assert_eq!(a.merge(b).total(), a.total() + b.total());
    }

    #[test]
    fn test_percentages_account_for_every_pixel() {
        let c = counts(40, 25, 10, 15, 10);
        let summary = summarize(c, ComplianceParams::default()).unwrap();

        let class_sum =
            summary.healthy_pct + summary.stressed_pct + summary.water_pct + summary.bare_pct;
        assert!((class_sum - 100.0).abs() < 1e-9);
        assert_eq!(c.valid() + c.nodata, c.total());
    }

    #[test]
    fn test_verdict_follows_cutoff() {
        // 30% of valid pixels stressed
        let c = counts(70, 30, 0, 0, 0);

        let critical = summarize(c, ComplianceParams { stress_cutoff_pct: 25.0 }).unwrap();
        assert_eq!(critical.verdict, Verdict::CriticalRisk);

        let compliant = summarize(c, ComplianceParams { stress_cutoff_pct: 35.0 }).unwrap();
        assert_eq!(compliant.verdict, Verdict::Compliant);
    }

    #[test]
    fn test_cutoff_is_exclusive() {
        let c = counts(60, 40, 0, 0, 0);
        let summary = summarize(c, ComplianceParams { stress_cutoff_pct: 40.0 }).unwrap();

        // Exactly at the cutoff stays compliant
        assert_eq!(summary.verdict, Verdict::Compliant);
    }

    #[test]
    fn test_all_nodata_is_indeterminate() {
        let c = counts(0, 0, 0, 0, 100);
        let summary = summarize(c, ComplianceParams::default()).unwrap();

        assert_eq!(summary.verdict, Verdict::Indeterminate);
        assert_eq!(summary.stressed_pct, 0.0);
    }

    #[test]
    fn test_vegetation_stress_share() {
        use approx::assert_relative_eq;

        let c = counts(30, 10, 40, 20, 0);
        let summary = summarize(c, ComplianceParams::default()).unwrap();

        assert_relative_eq!(summary.vegetation_cover_pct, 40.0, epsilon = 1e-9);
        assert_relative_eq!(summary.vegetation_stress_pct, 25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_cutoff_rejected() {
        let c = counts(1, 0, 0, 0, 0);
        assert!(summarize(c, ComplianceParams { stress_cutoff_pct: f64::NAN }).is_err());
        assert!(summarize(c, ComplianceParams { stress_cutoff_pct: -5.0 }).is_err());
    }

    #[test]
    fn test_summary_serializes() {
        let c = counts(50, 50, 0, 0, 0);
        let summary = summarize(c, ComplianceParams::default()).unwrap();

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("CriticalRisk"));
    }
}
