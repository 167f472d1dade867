//! Clearance and voiding configuration

use crate::fill::geometry::TrimMode;
use serde::{Deserialize, Serialize};

/// Object classes that carry their own clearance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectClass {
    Pad,
    Via,
    Pin,
    Line,
    Shape,
}

/// Per-class clearance from metal to foreign objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearanceTable {
    pub pad: f64,
    pub via: f64,
    pub pin: f64,
    pub line: f64,
    pub shape: f64,
}

impl Default for ClearanceTable {
    fn default() -> Self {
        Self { pad: 0.2, via: 0.2, pin: 0.2, line: 0.2, shape: 0.3 }
    }
}

impl ClearanceTable {
    /// Same clearance for every class
    pub fn uniform(value: f64) -> Self {
        Self { pad: value, via: value, pin: value, line: value, shape: value }
    }

    pub fn get(&self, class: ObjectClass) -> f64 {
        match class {
            ObjectClass::Pad => self.pad,
            ObjectClass::Via => self.via,
            ObjectClass::Pin => self.pin,
            ObjectClass::Line => self.line,
            ObjectClass::Shape => self.shape,
        }
    }

    pub fn max(&self) -> f64 {
        self.pad.max(self.via).max(self.pin).max(self.line).max(self.shape)
    }
}

/// Thermal relief geometry for same-net pins and vias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalParams {
    pub enabled: bool,
    /// Width of the relief annulus around the pad
    pub gap: f64,
    pub spoke_width: f64,
    pub spoke_count: u32,
    /// Angle of the first spoke in degrees
    pub spoke_angle: f64,
}

impl Default for ThermalParams {
    fn default() -> Self {
        Self { enabled: false, gap: 0.25, spoke_width: 0.3, spoke_count: 4, spoke_angle: 0.0 }
    }
}

/// How much post-processing a pass does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillMode {
    /// Minimum-area filter and smoothing
    #[default]
    Smooth,
    /// Minimum-area filter only
    Fast,
    /// Raw boolean result
    Rough,
}

impl FillMode {
    pub fn cleans(self) -> bool {
        self != FillMode::Rough
    }

    pub fn smooths(self) -> bool {
        self == FillMode::Smooth
    }

    /// Hatched fills are never smoothed
    pub fn for_boundary(self, hatched: bool) -> FillMode {
        if hatched && self == FillMode::Smooth {
            FillMode::Fast
        } else {
            self
        }
    }
}

/// Scheduling across independent boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Schedule {
    #[default]
    Serial,
    Parallel,
}

/// Resolved parameter bundle for one voiding pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoidParams {
    pub clearance: ClearanceTable,
    /// Added to every clearance
    pub expand_adjust: f64,
    /// Fragments with less metal area are dropped
    pub min_area: f64,
    /// Narrowest metal smoothing keeps; contraction is half of this
    pub min_aperture: f64,
    /// Corner treatment when smoothing expands back out
    pub trim_mode: TrimMode,
    /// Pins closer than this are voided as one combined opening; 0 disables
    pub inline_pin_spacing: f64,
    pub thermal: ThermalParams,
    /// Square voids out to the hatch grid on hatched shapes
    pub snap_to_hatch: bool,
    pub hatch_pitch: f64,
    pub fill_mode: FillMode,
    /// Database grid all generated coordinates are snapped to
    pub grid: f64,
    /// Chord tolerance when arcs are flattened
    pub arc_tolerance: f64,
    /// Voids processed between cancellation checks
    pub cancel_poll_interval: usize,
    /// Require higher-priority shapes to touch the parent boundary
    pub check_surrounding_boundary: bool,
    /// Report same-net hits to the DRC collaborator
    pub same_net_drc: bool,
    /// Allow local patch repair instead of full revoids
    pub local_patch: bool,
    pub schedule: Schedule,
}

impl Default for VoidParams {
    fn default() -> Self {
        Self {
            clearance: ClearanceTable::default(),
            expand_adjust: 0.0,
            min_area: 0.01,
            min_aperture: 0.1,
            trim_mode: TrimMode::Sharp,
            inline_pin_spacing: 0.0,
            thermal: ThermalParams::default(),
            snap_to_hatch: false,
            hatch_pitch: 0.0,
            fill_mode: FillMode::Smooth,
            grid: 1.0e-4,
            arc_tolerance: 0.001,
            cancel_poll_interval: 100,
            check_surrounding_boundary: false,
            same_net_drc: false,
            local_patch: true,
            schedule: Schedule::Serial,
        }
    }
}

impl VoidParams {
    /// Effective clearance for a class, including the global adjustment
    pub fn clearance_for(&self, class: ObjectClass) -> f64 {
        (self.clearance.get(class) + self.expand_adjust).max(0.0)
    }

    /// Largest distance a void can reach past its object
    pub fn max_reach(&self) -> f64 {
        self.reach_with(0.0)
    }

    /// `max_reach` when a constraint region may raise clearances up to
    /// `region_clearance`
    pub fn reach_with(&self, region_clearance: f64) -> f64 {
        let thermal = if self.thermal.enabled { self.thermal.gap } else { 0.0 };
        let clearance = self.clearance.max().max(region_clearance) + self.expand_adjust;
        clearance.max(thermal).max(0.0) + self.inline_pin_spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_merges_over_defaults() {
        let params: VoidParams =
            serde_json::from_str(r#"{"min_area": 2.5, "clearance": {"via": 0.5}}"#).unwrap();
        assert_eq!(params.min_area, 2.5);
        assert_eq!(params.clearance.via, 0.5);
        assert_eq!(params.clearance.pad, ClearanceTable::default().pad);
        assert_eq!(params.fill_mode, FillMode::Smooth);
    }

    #[test]
    fn test_clearance_adjust_never_negative() {
        let params = VoidParams { expand_adjust: -1.0, ..Default::default() };
        assert_eq!(params.clearance_for(ObjectClass::Pad), 0.0);
    }

    #[test]
    fn test_region_clearance_widens_reach() {
        let params = VoidParams::default();
        assert_eq!(params.reach_with(0.1), params.max_reach());
        assert_eq!(params.reach_with(1.5), 1.5);
        let adjusted = VoidParams { expand_adjust: 0.1, inline_pin_spacing: 0.5, ..Default::default() };
        assert!((adjusted.reach_with(1.5) - 2.1).abs() < 1e-12);
    }

    #[test]
    fn test_hatched_fill_drops_smoothing() {
        assert_eq!(FillMode::Smooth.for_boundary(true), FillMode::Fast);
        assert_eq!(FillMode::Rough.for_boundary(true), FillMode::Rough);
        assert!(FillMode::Fast.cleans());
        assert!(!FillMode::Fast.smooths());
    }
}
