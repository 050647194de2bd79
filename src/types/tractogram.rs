//! Streamline collections

use crate::error::{MeshIoError, Result};
use crate::notification::NotificationCollection;

/// A named scalar attachment (data-per-streamline, -vertex or -group).
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValues {
    /// Attribute name.
    pub id: String,
    /// One value per streamline, point or group.
    pub vals: Vec<f32>,
}

impl NamedValues {
    pub fn new(id: impl Into<String>, vals: Vec<f32>) -> Self {
        Self { id: id.into(), vals }
    }
}

/// Streamlines stored as one flat point buffer plus fence-post offsets.
///
/// `offset_pt0[i]` is the index of the first point of streamline `i` and
/// `offset_pt0[streamline_count]` equals the total point count.
#[derive(Debug, Clone, PartialEq)]
pub struct Tractogram {
    /// Concatenated XYZ points of every streamline.
    pub pts: Vec<f32>,
    /// Fence-post point offsets, `streamline_count + 1` entries.
    pub offset_pt0: Vec<u32>,
    /// Data per streamline.
    pub dps: Vec<NamedValues>,
    /// Data per vertex.
    pub dpv: Vec<NamedValues>,
    /// Data per group.
    pub dpg: Vec<NamedValues>,
    /// Non-fatal issues found while decoding.
    pub notifications: NotificationCollection,
}

impl Default for Tractogram {
    fn default() -> Self {
        Self {
            pts: Vec::new(),
            offset_pt0: vec![0],
            dps: Vec::new(),
            dpv: Vec::new(),
            dpg: Vec::new(),
            notifications: NotificationCollection::new(),
        }
    }
}

impl Tractogram {
    /// Number of streamlines.
    pub fn streamline_count(&self) -> usize {
        self.offset_pt0.len().saturating_sub(1)
    }

    /// Total number of points.
    pub fn point_count(&self) -> usize {
        self.pts.len() / 3
    }

    /// Flattened XYZ points of streamline `i`.
    pub fn streamline(&self, i: usize) -> Option<&[f32]> {
        let start = *self.offset_pt0.get(i)? as usize;
        let end = *self.offset_pt0.get(i + 1)? as usize;
        self.pts.get(start * 3..end * 3)
    }

    /// Check the fence-post invariants.
    pub fn validate(&self) -> Result<()> {
        if self.pts.len() % 3 != 0 {
            return Err(MeshIoError::malformed(format!(
                "point buffer length {} is not a multiple of 3",
                self.pts.len()
            )));
        }
        match (self.offset_pt0.first(), self.offset_pt0.last()) {
            (Some(0), Some(&last)) if last as usize == self.point_count() => {}
            _ => {
                return Err(MeshIoError::malformed(format!(
                    "offsets must start at 0 and end at the point count {}",
                    self.point_count()
                )))
            }
        }
        if self.offset_pt0.windows(2).any(|w| w[0] > w[1]) {
            return Err(MeshIoError::malformed("streamline offsets are decreasing"));
        }
        let (ns, np) = (self.streamline_count(), self.point_count());
        for dps in &self.dps {
            if dps.vals.len() != ns {
                return Err(MeshIoError::malformed(format!(
                    "dps '{}' has {} values for {} streamlines",
                    dps.id,
                    dps.vals.len(),
                    ns
                )));
            }
        }
        for dpv in &self.dpv {
            if dpv.vals.len() != np {
                return Err(MeshIoError::malformed(format!(
                    "dpv '{}' has {} values for {} points",
                    dpv.id,
                    dpv.vals.len(),
                    np
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn checked(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}

/// Accumulates points and closes streamlines, always producing the
/// trailing fence-post entry.
#[derive(Debug, Clone)]
pub struct StreamlineBuilder {
    pts: Vec<f32>,
    offsets: Vec<u32>,
}

impl Default for StreamlineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamlineBuilder {
    pub fn new() -> Self {
        Self {
            pts: Vec::new(),
            offsets: vec![0],
        }
    }

    pub fn with_capacity(points: usize, streamlines: usize) -> Self {
        let mut offsets = Vec::with_capacity(streamlines + 1);
        offsets.push(0);
        Self {
            pts: Vec::with_capacity(points * 3),
            offsets,
        }
    }

    pub fn push_point(&mut self, x: f32, y: f32, z: f32) {
        self.pts.extend_from_slice(&[x, y, z]);
    }

    /// Points added so far.
    pub fn point_count(&self) -> usize {
        self.pts.len() / 3
    }

    /// Points added since the last closed streamline.
    pub fn pending_points(&self) -> usize {
        let last = self.offsets.last().copied().unwrap_or(0) as usize;
        self.point_count() - last
    }

    /// Close the current streamline, even if it is empty.
    pub fn end_streamline(&mut self) -> Result<()> {
        let n = u32::try_from(self.point_count()).map_err(|_| {
            MeshIoError::IntegerOverflow(format!(
                "{} points exceed the 32-bit offset range",
                self.point_count()
            ))
        })?;
        self.offsets.push(n);
        Ok(())
    }

    /// Close the current streamline only when it holds points.
    pub fn end_nonempty_streamline(&mut self) -> Result<bool> {
        if self.pending_points() == 0 {
            return Ok(false);
        }
        self.end_streamline()?;
        Ok(true)
    }

    /// Number of closed streamlines.
    pub fn streamline_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Finish, closing any pending streamline.
    pub fn finish(mut self) -> Result<Tractogram> {
        self.end_nonempty_streamline()?;
        Ok(Tractogram {
            pts: self.pts,
            offset_pt0: self.offsets,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_fence_post() {
        let mut b = StreamlineBuilder::new();
        b.push_point(0.0, 0.0, 0.0);
        b.push_point(1.0, 0.0, 0.0);
        b.end_streamline().unwrap();
        b.push_point(2.0, 0.0, 0.0);
        let t = b.finish().unwrap();
        assert_eq!(t.offset_pt0, vec![0, 2, 3]);
        assert_eq!(t.streamline_count(), 2);
        assert_eq!(t.streamline(1), Some(&[2.0f32, 0.0, 0.0][..]));
        t.validate().unwrap();
    }

    #[test]
    fn test_empty_tractogram_is_valid() {
        let t = StreamlineBuilder::new().finish().unwrap();
        assert_eq!(t.offset_pt0, vec![0]);
        assert_eq!(t.streamline_count(), 0);
        t.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_missing_sentinel() {
        let t = Tractogram {
            pts: vec![0.0; 6],
            offset_pt0: vec![0, 1],
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_short_dps() {
        let t = Tractogram {
            pts: vec![0.0; 6],
            offset_pt0: vec![0, 1, 2],
            dps: vec![NamedValues::new("fa", vec![1.0])],
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }
}
