//! Circular cone-beam acquisition trajectories.
//!
//! Each projection is described by a `ProjectionEntry`. The rotation axis is
//! the y-axis. With
//!
//!   `M = Ry(gantry) · Rx(out_of_plane) · Rz(in_plane)`
//!
//! the source sits at `M · (source_offset_x, source_offset_y, SID)` and the
//! detector coordinate `(u, v)` sits at
//! `M · (u + projection_offset_x, v + projection_offset_y, SID - SDD)`.
//! A gantry angle of zero therefore places the source on the positive z-axis,
//! and the detector on the opposite side of the isocentre.

use geometry::{Matrix, Point, Rotation, Vector};
use units::plain::Lengthf32;
use units::{mm, mm_, radian, radian_, Angle, Length};

use crate::error::{Error, Result};

/// Acquisition parameters of a single projection
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionEntry {
    /// Source to isocentre distance
    pub sid: Length,
    /// Source to detector distance
    pub sdd: Length,
    pub gantry_angle: Angle,
    /// Shift of the detector within its own plane
    pub projection_offset: (Length, Length),
    /// Shift of the source parallel to the detector plane
    pub source_offset: (Length, Length),
    /// Tilt of the source-detector axis out of the plane of rotation
    pub out_of_plane_angle: Angle,
    /// Rotation of the detector about the source-detector axis
    pub in_plane_angle: Angle,
}

impl ProjectionEntry {

    pub fn new(sid: Length, sdd: Length, gantry_angle: Angle) -> Self {
        Self {
            sid, sdd, gantry_angle,
            projection_offset : (mm(0.0), mm(0.0)),
            source_offset     : (mm(0.0), mm(0.0)),
            out_of_plane_angle: radian(0.0),
            in_plane_angle    : radian(0.0),
        }
    }

    pub fn with_projection_offset(self, x: Length, y: Length) -> Self { Self { projection_offset: (x, y), ..self } }
    pub fn with_source_offset    (self, x: Length, y: Length) -> Self { Self { source_offset    : (x, y), ..self } }
    pub fn with_out_of_plane_angle(self, angle: Angle)       -> Self { Self { out_of_plane_angle: angle, ..self } }
    pub fn with_in_plane_angle    (self, angle: Angle)       -> Self { Self { in_plane_angle    : angle, ..self } }

    /// Reject entries which cannot describe a physical acquisition. `index`
    /// is only used for error reporting.
    fn validate(&self, index: usize) -> Result<()> {
        let sid = mm_(self.sid);
        let sdd = mm_(self.sdd);
        if !sid.is_finite() || sid <= 0.0 { return Err(Error::InvalidSourceDistance   { index, sid }) }
        if !sdd.is_finite() || sdd == 0.0 { return Err(Error::InvalidDetectorDistance { index, sdd }) }
        let others = [
            mm_(self.projection_offset.0), mm_(self.projection_offset.1),
            mm_(self.source_offset.0),     mm_(self.source_offset.1),
            radian_(self.gantry_angle), radian_(self.out_of_plane_angle), radian_(self.in_plane_angle),
        ];
        if others.iter().any(|x| !x.is_finite()) {
            return Err(Error::NonFiniteProjectionParameter { index })
        }
        Ok(())
    }
}

/// The physical placement of one projection's source and detector, derived
/// from its `ProjectionEntry`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorFrame {
    pub source: Point,
    /// Physical position of detector coordinate (0, 0)
    pub detector_origin: Point,
    /// Physical directions of the detector's u and v axes
    pub u_axis: Vector,
    pub v_axis: Vector,
    /// Rotation from the gantry frame to physical space
    rotation: Matrix,
    sid: Lengthf32,
    sdd: Lengthf32,
    projection_offset: [Lengthf32; 2],
}

impl DetectorFrame {

    fn new(entry: &ProjectionEntry) -> Self {
        let r = |axis: nalgebra::Unit<Vector>, angle: Angle| Rotation::from_axis_angle(&axis, radian_(angle));
        let rotation = (r(Vector::y_axis(), entry.gantry_angle)
                      * r(Vector::x_axis(), entry.out_of_plane_angle)
                      * r(Vector::z_axis(), entry.in_plane_angle)).into_inner();
        let sid = mm_(entry.sid);
        let sdd = mm_(entry.sdd);
        let (pox, poy) = (mm_(entry.projection_offset.0), mm_(entry.projection_offset.1));
        let (sox, soy) = (mm_(entry.source_offset.0), mm_(entry.source_offset.1));
        Self {
            source         : Point::from(rotation * Vector::new(sox, soy, sid)),
            detector_origin: Point::from(rotation * Vector::new(pox, poy, sid - sdd)),
            u_axis: rotation * Vector::x(),
            v_axis: rotation * Vector::y(),
            rotation, sid, sdd,
            projection_offset: [pox, poy],
        }
    }

    /// Physical position of detector coordinate `(u, v)`
    #[inline]
    pub fn detector_point(&self, u: Lengthf32, v: Lengthf32) -> Point {
        self.detector_origin + self.u_axis * u + self.v_axis * v
    }

    /// Detector coordinates of the shadow cast by physical point `p`, or
    /// `None` if `p` lies on or behind the plane through the source parallel
    /// to the detector
    pub fn project(&self, p: &Point) -> Option<(Lengthf32, Lengthf32)> {
        let local = self.rotation.transpose() * p.coords;
        let source = self.rotation.transpose() * self.source.coords;
        let depth = self.sid - local.z;
        if depth * self.sdd <= 0.0 { return None }
        let t = self.sdd / depth;
        let hit = source + (local - source) * t;
        Some((hit.x - self.projection_offset[0], hit.y - self.projection_offset[1]))
    }
}

/// An ordered sequence of projections: the position of an entry in the
/// sequence is its projection number.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProjectionGeometry {
    entries: Vec<ProjectionEntry>,
    frames: Vec<DetectorFrame>,
}

impl ProjectionGeometry {

    pub fn new() -> Self { Self::default() }

    /// `n` projections at equally spaced gantry angles, covering `arc`
    /// starting at `first_angle`
    pub fn circular(n: usize, first_angle: Angle, arc: Angle, sid: Length, sdd: Length) -> Result<Self> {
        let mut geometry = Self::new();
        for i in 0..n {
            let angle = first_angle + arc * (i as f32 / n as f32);
            geometry.add_projection(ProjectionEntry::new(sid, sdd, angle))?;
        }
        Ok(geometry)
    }

    /// Append a projection. Previously added projections are unaffected.
    pub fn add_projection(&mut self, entry: ProjectionEntry) -> Result<()> {
        entry.validate(self.entries.len())?;
        self.frames.push(DetectorFrame::new(&entry));
        self.entries.push(entry);
        Ok(())
    }

    /// Replace projection `index`, recomputing only its derived frame
    pub fn set_projection(&mut self, index: usize, entry: ProjectionEntry) -> Result<()> {
        self.check_index(index)?;
        entry.validate(index)?;
        self.frames [index] = DetectorFrame::new(&entry);
        self.entries[index] = entry;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.frames .clear();
    }

    pub fn len     (&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool  { self.entries.is_empty() }

    pub fn entries(&self) -> &[ProjectionEntry] { &self.entries }
    pub fn frames (&self) -> &[DetectorFrame]   { &self.frames }

    pub fn entry(&self, index: usize) -> Result<&ProjectionEntry> {
        self.check_index(index)?;
        Ok(&self.entries[index])
    }

    pub fn frame(&self, index: usize) -> Result<&DetectorFrame> {
        self.check_index(index)?;
        Ok(&self.frames[index])
    }

    pub fn source_position(&self, index: usize) -> Result<Point> {
        Ok(self.frame(index)?.source)
    }

    pub fn detector_position(&self, index: usize, u: Lengthf32, v: Lengthf32) -> Result<Point> {
        Ok(self.frame(index)?.detector_point(u, v))
    }

    /// Detector coordinates at which projection `index` images physical
    /// point `p`
    pub fn project_point(&self, index: usize, p: &Point) -> Result<Option<(Lengthf32, Lengthf32)>> {
        Ok(self.frame(index)?.project(p))
    }

    pub fn gantry_angles(&self) -> Vec<Angle> {
        self.entries.iter().map(|e| e.gantry_angle).collect()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.len();
        if index < len { Ok(()) }
        else           { Err(Error::ProjectionOutOfRange { index, len }) }
    }
}
