//! Per-vertex scalar overlays

use std::sync::Arc;

use crate::notification::NotificationCollection;
use crate::types::LabelLut;

/// A scalar overlay draped over a background mesh.
///
/// `values` holds `n_frame_4d` consecutive frames of one value per mesh
/// vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub values: Vec<f32>,
    /// Smallest finite value over all frames.
    pub global_min: f32,
    /// Largest finite value over all frames.
    pub global_max: f32,
    /// Display range lower bound.
    pub cal_min: f32,
    /// Display range upper bound.
    pub cal_max: f32,
    pub n_frame_4d: usize,
    /// Frame shown by the renderer.
    pub frame_4d: usize,
    /// Label lookup for atlas overlays, shared by reference.
    pub colormap_label: Option<Arc<LabelLut>>,
    pub opacity: f32,
    pub colormap: String,
    pub colormap_negative: String,
    pub use_negative_cmap: bool,
    pub outline_border: f32,
    /// Non-fatal issues found while decoding.
    pub notifications: NotificationCollection,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            global_min: 0.0,
            global_max: 0.0,
            cal_min: 0.0,
            cal_max: 0.0,
            n_frame_4d: 1,
            frame_4d: 0,
            colormap_label: None,
            opacity: 0.5,
            colormap: "warm".to_string(),
            colormap_negative: "winter".to_string(),
            use_negative_cmap: false,
            outline_border: 0.0,
            notifications: NotificationCollection::new(),
        }
    }
}

impl Layer {
    /// Create a layer from `n_frames` concatenated frames, computing the
    /// global extrema and defaulting the display range to them.
    pub fn new(values: Vec<f32>, n_frames: usize) -> Self {
        let (mn, mx) = finite_range(&values);
        Self {
            values,
            global_min: mn,
            global_max: mx,
            cal_min: mn,
            cal_max: mx,
            n_frame_4d: n_frames.max(1),
            ..Default::default()
        }
    }

    /// Attach a label lookup.
    pub fn with_label_lut(mut self, lut: Option<Arc<LabelLut>>) -> Self {
        self.colormap_label = lut;
        self
    }

    /// Values per frame.
    pub fn vertex_count(&self) -> usize {
        self.values.len() / self.n_frame_4d.max(1)
    }

    /// Values of frame `i`.
    pub fn frame(&self, i: usize) -> Option<&[f32]> {
        let n = self.vertex_count();
        if i >= self.n_frame_4d {
            return None;
        }
        self.values.get(i * n..(i + 1) * n)
    }
}

/// Smallest and largest finite values, `(0, 0)` when there are none.
pub(crate) fn finite_range(values: &[f32]) -> (f32, f32) {
    let mut mn = f32::INFINITY;
    let mut mx = f32::NEG_INFINITY;
    for &v in values.iter().filter(|v| v.is_finite()) {
        mn = mn.min(v);
        mx = mx.max(v);
    }
    if mn > mx {
        (0.0, 0.0)
    } else {
        (mn, mx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_computes_range() {
        let layer = Layer::new(vec![3.0, -1.0, f32::NAN, 2.0], 1);
        assert_eq!(layer.global_min, -1.0);
        assert_eq!(layer.global_max, 3.0);
        assert_eq!(layer.cal_min, layer.global_min);
        assert_eq!(layer.cal_max, layer.global_max);
        assert_eq!(layer.opacity, 0.5);
    }

    #[test]
    fn test_frames() {
        let layer = Layer::new(vec![1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(layer.vertex_count(), 2);
        assert_eq!(layer.frame(1), Some(&[3.0f32, 4.0][..]));
        assert_eq!(layer.frame(2), None);
    }

    #[test]
    fn test_empty_range() {
        assert_eq!(finite_range(&[]), (0.0, 0.0));
        assert_eq!(finite_range(&[f32::NAN]), (0.0, 0.0));
    }
}
