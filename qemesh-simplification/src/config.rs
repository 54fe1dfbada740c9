//! Simplification parameters

use crate::cost::MergePolicy;
use crate::half_edge::WindingRepair;
use serde::{Deserialize, Serialize};

/// Tunables for [`crate::SimplificationEngine`] and [`crate::EdgeCollapseSimplifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifyConfig {
    /// Placement of the merged vertex
    pub merge_policy: MergePolicy,
    /// How conflicting triangle windings are handled when building
    pub winding: WindingRepair,
    /// Reject collapses that would reverse a surviving face normal
    pub prevent_face_flips: bool,
    /// Never collapse an edge with a boundary endpoint
    pub preserve_boundary: bool,
    /// Extra cost added to edges with a boundary endpoint
    pub boundary_weight: f64,
    /// Stop when the cheapest remaining collapse exceeds this cost
    pub max_error: Option<f64>,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::Optimal,
            winding: WindingRepair::Strict,
            prevent_face_flips: true,
            preserve_boundary: false,
            boundary_weight: 0.0,
            max_error: None,
        }
    }
}

impl SimplifyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn with_winding(mut self, winding: WindingRepair) -> Self {
        self.winding = winding;
        self
    }

    pub fn with_face_flip_prevention(mut self, enabled: bool) -> Self {
        self.prevent_face_flips = enabled;
        self
    }

    pub fn with_boundary(mut self, preserve: bool, weight: f64) -> Self {
        self.preserve_boundary = preserve;
        self.boundary_weight = weight;
        self
    }

    pub fn with_max_error(mut self, max_error: Option<f64>) -> Self {
        self.max_error = max_error;
        self
    }
}
