//! Render states that can change without creating a new shader.

use crate::error::{GraphicsError, reject};

/// Render states applied when a shader is bound, and updated while it stays bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicRenderStates {
    pub line_width: f32,
    pub depth_bias_constant_factor: f32,
    pub depth_bias_clamp: f32,
    pub depth_bias_slope_factor: f32,
    pub blend_constants: [f32; 4],
    /// Minimum and maximum depth of the depth bounds test.
    pub depth_bounds: [f32; 2],
    pub front_stencil_compare_mask: u32,
    pub back_stencil_compare_mask: u32,
    pub front_stencil_write_mask: u32,
    pub back_stencil_write_mask: u32,
    pub front_stencil_reference: u32,
    pub back_stencil_reference: u32,
}

impl Default for DynamicRenderStates {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            depth_bias_constant_factor: 0.0,
            depth_bias_clamp: 0.0,
            depth_bias_slope_factor: 0.0,
            blend_constants: [0.0; 4],
            depth_bounds: [0.0, 1.0],
            front_stencil_compare_mask: u32::MAX,
            back_stencil_compare_mask: u32::MAX,
            front_stencil_write_mask: u32::MAX,
            back_stencil_write_mask: u32::MAX,
            front_stencil_reference: 0,
            back_stencil_reference: 0,
        }
    }
}

impl DynamicRenderStates {
    /// Check that the values can be passed to a backend.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if !self.line_width.is_finite() || self.line_width <= 0.0 {
            return Err(reject!(
                InvalidArgument,
                "line width {} must be positive",
                self.line_width
            ));
        }
        let [min, max] = self.depth_bounds;
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min > max {
            return Err(reject!(
                InvalidArgument,
                "depth bounds [{}, {}] must be an increasing range within [0, 1]",
                min,
                max
            ));
        }
        Ok(())
    }
}
