//! Configuration file parser for scan descriptions: the reconstruction
//! volume, the detector, the source trajectory, the phantom and the forward
//! projector.
//!
//! Lengths are strings with explicit units (`"1.5 mm"`, `"12 cm"`); angles are
//! plain numbers of degrees.

use std::fs;
use std::str::FromStr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, de};

use geometry::{Point, Vector};
use units::{degree, mm_, Length};

use crate::error::{Error, Result};
use crate::grid::VolumeGeometry;
use crate::index::Index3_i;
use crate::phantom::{shepp_logan, HalfSpace, Phantom, QuadricPrimitive, SHEPP_LOGAN_SCALE};
use crate::projection_geometry::{ProjectionEntry, ProjectionGeometry};
use crate::projector::{Sampling, DEFAULT_STEP_FRACTION};

fn deserialize_uom<'d, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    String::deserialize(deserializer)?
        .parse::<T>()
        .map_err(de::Error::custom)
}

fn deserialize_uom_opt<'d, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| s.parse::<T>())
        .transpose()
        .map_err(de::Error::custom)
}

fn deserialize_uom_2d<'d, D, T>(deserializer: D) -> std::result::Result<(T, T), D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let (x, y) = <(String, String)>::deserialize(deserializer)?;
    tr_pair_res((x.parse(), y.parse())).map_err(de::Error::custom)
}

fn deserialize_uom_2d_opt<'d, D, T>(deserializer: D) -> std::result::Result<Option<(T, T)>, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    Option::<(String, String)>::deserialize(deserializer)?
        .map(|(x, y)| tr_pair_res((x.parse(), y.parse())))
        .transpose()
        .map_err(de::Error::custom)
}

fn deserialize_uom_3d<'d, D, T>(deserializer: D) -> std::result::Result<(T, T, T), D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let (x, y, z) = <(String, String, String)>::deserialize(deserializer)?;
    tr_tup_res((x.parse(), y.parse(), z.parse())).map_err(de::Error::custom)
}

fn deserialize_uom_3d_opt<'d, D, T>(deserializer: D) -> std::result::Result<Option<(T, T, T)>, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    Option::<(String, String, String)>::deserialize(deserializer)?
        .map(|(x, y, z)| tr_tup_res((x.parse(), y.parse(), z.parse())))
        .transpose()
        .map_err(de::Error::custom)
}

/// Transpose 3-tuple of `Result`
///
/// `Ok` if all elements `Ok`; if any element is an `Err` return the first one.
fn tr_tup_res<O, E>((x, y, z): (std::result::Result<O, E>, std::result::Result<O, E>, std::result::Result<O, E>))
    -> std::result::Result<(O, O, O), E>
{
    Ok((x?, y?, z?))
}

fn tr_pair_res<O, E>((x, y): (std::result::Result<O, E>, std::result::Result<O, E>)) -> std::result::Result<(O, O), E> {
    Ok((x?, y?))
}

fn vector_mm((x, y, z): (Length, Length, Length)) -> Vector { Vector::new(mm_(x), mm_(y), mm_(z)) }

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub volume: Volume,
    pub detector: Detector,
    pub trajectory: Trajectory,
    pub phantom: PhantomConfig,
    #[serde(default)]
    pub projector: Projector,
}

/// The voxel grid onto which phantoms are rasterized
#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Volume {
    pub size: (usize, usize, usize),

    #[serde(deserialize_with = "deserialize_uom_3d")]
    pub spacing: (Length, Length, Length),

    /// Physical position of the first voxel's centre. By default the voxel
    /// centres are arranged symmetrically about the physical origin.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_uom_3d_opt")]
    pub origin: Option<(Length, Length, Length)>,

    #[serde(default)]
    pub index: Option<(i64, i64, i64)>,
}

impl Volume {
    pub fn geometry(&self) -> Result<VolumeGeometry> {
        let (nx, ny, nz) = self.size;
        let spacing = vector_mm(self.spacing);
        let centred = VolumeGeometry::centred([nx, ny, nz], spacing)?;
        let origin = self.origin.map_or(centred.origin(), |o| Point::from(vector_mm(o)));
        let index: Index3_i = self.index.map_or([0, 0, 0], |(x, y, z)| [x, y, z]);
        VolumeGeometry::new(centred.size(), spacing, origin, centred.direction(), index)
    }
}

/// Pixel layout of every projection
#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Detector {
    pub size: (usize, usize),

    #[serde(deserialize_with = "deserialize_uom_2d")]
    pub spacing: (Length, Length),

    /// Detector coordinates of the first pixel. Centred on (0, 0) by default.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_uom_2d_opt")]
    pub origin: Option<(Length, Length)>,
}

impl Detector {
    /// Metadata of a stack holding `n_projections` projections
    pub fn stack_geometry(&self, n_projections: usize) -> Result<VolumeGeometry> {
        let (nu, nv) = self.size;
        let (su, sv) = self.spacing;
        let spacing = Vector::new(mm_(su), mm_(sv), 1.0);
        let centred = VolumeGeometry::centred([nu, nv, n_projections], spacing)?;
        let origin = match self.origin {
            Some((u, v)) => Point::new(mm_(u), mm_(v), 0.0),
            None => Point::new(centred.origin().x, centred.origin().y, 0.0),
        };
        VolumeGeometry::new(centred.size(), spacing, origin, centred.direction(), [0, 0, 0])
    }
}

/// Equally spaced projections along a circular trajectory
#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Trajectory {
    pub projections: usize,

    /// Gantry angle of the first projection, in degrees
    #[serde(default)]
    pub first_angle: f32,

    /// Angular range covered by the projections, in degrees
    #[serde(default = "full_circle")]
    pub arc: f32,

    #[serde(deserialize_with = "deserialize_uom")]
    pub sid: Length,

    #[serde(deserialize_with = "deserialize_uom")]
    pub sdd: Length,

    #[serde(default)]
    #[serde(deserialize_with = "deserialize_uom_2d_opt")]
    pub projection_offset: Option<(Length, Length)>,

    #[serde(default)]
    #[serde(deserialize_with = "deserialize_uom_2d_opt")]
    pub source_offset: Option<(Length, Length)>,

    /// Degrees
    #[serde(default)]
    pub out_of_plane_angle: f32,

    /// Degrees
    #[serde(default)]
    pub in_plane_angle: f32,
}

fn full_circle() -> f32 { 360.0 }

impl Trajectory {
    pub fn geometry(&self) -> Result<ProjectionGeometry> {
        let mut geometry = ProjectionGeometry::new();
        let n = self.projections;
        for i in 0..n {
            let angle = self.first_angle + self.arc * (i as f32 / n as f32);
            let mut entry = ProjectionEntry::new(self.sid, self.sdd, degree(angle))
                .with_out_of_plane_angle(degree(self.out_of_plane_angle))
                .with_in_plane_angle    (degree(self.in_plane_angle));
            if let Some((x, y)) = self.projection_offset { entry = entry.with_projection_offset(x, y); }
            if let Some((x, y)) = self.source_offset     { entry = entry.with_source_offset    (x, y); }
            geometry.add_projection(entry)?;
        }
        Ok(geometry)
    }
}

/// The Shepp-Logan phantom and/or explicitly listed ellipsoids
#[derive(Deserialize, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PhantomConfig {
    pub shepp_logan: Option<SheppLogan>,
    #[serde(default)]
    pub ellipsoid: Vec<Ellipsoid>,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SheppLogan {
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_uom_opt")]
    pub scale: Option<Length>,

    #[serde(default)]
    #[serde(deserialize_with = "deserialize_uom_3d_opt")]
    pub offset: Option<(Length, Length, Length)>,
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Ellipsoid {
    #[serde(deserialize_with = "deserialize_uom_3d")]
    pub centre: (Length, Length, Length),

    #[serde(deserialize_with = "deserialize_uom_3d")]
    pub semi_axes: (Length, Length, Length),

    /// Rotation about the y-axis, in degrees
    #[serde(default)]
    pub angle: f32,

    pub density: f32,

    #[serde(default)]
    pub clip: Vec<Clip>,
}

/// Keeps the points `p` of an ellipsoid with `normal · p ≤ offset`
#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Clip {
    pub normal: (f32, f32, f32),
    #[serde(deserialize_with = "deserialize_uom")]
    pub offset: Length,
}

impl PhantomConfig {
    /// Shepp-Logan ellipsoids (if any) followed by the explicit ones, in
    /// order of appearance
    pub fn phantom(&self) -> Result<Phantom> {
        let mut primitives = vec![];
        if let Some(SheppLogan { scale, offset }) = &self.shepp_logan {
            let scale = scale.map_or(SHEPP_LOGAN_SCALE, mm_);
            let shift = offset.map_or(Vector::zeros(), vector_mm);
            primitives.extend_from_slice(shepp_logan(scale)?.translated(&shift).primitives());
        }
        for e in &self.ellipsoid {
            let centre = Point::from(vector_mm(e.centre));
            let mut q = QuadricPrimitive::ellipsoid(centre, vector_mm(e.semi_axes), degree(e.angle), e.density)?;
            for Clip { normal: (x, y, z), offset } in &e.clip {
                q = q.clipped_by(HalfSpace::new(Vector::new(*x, *y, *z), mm_(*offset))?);
            }
            primitives.push(q);
        }
        Phantom::new(primitives)
    }
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Siddon,
    Trilinear,
    Analytic,
}

#[derive(Deserialize, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Projector {
    #[serde(default)]
    pub method: Method,

    /// Trilinear sampling step, as a fraction of the smallest voxel spacing
    #[serde(default)]
    pub step_fraction: Option<f32>,
}

impl Projector {
    /// How to sample the rasterized volume, or `None` for exact analytic
    /// integration through the phantom
    pub fn sampling(&self) -> Option<Sampling> {
        let step_fraction = self.step_fraction.unwrap_or(DEFAULT_STEP_FRACTION);
        match self.method {
            Method::Siddon    => Some(Sampling::Siddon),
            Method::Trilinear => Some(Sampling::Trilinear { step_fraction }),
            Method::Analytic  => None,
        }
    }
}

pub fn read_config_file(path: PathBuf) -> Result<Config> {
    let config = fs::read_to_string(&path)
        .map_err(|source| Error::Io { path: path.clone(), source })?;
    parse_config(&config)
}

pub fn parse_config(text: &str) -> Result<Config> {
    Ok(toml::from_str(text)?)
}

/// The example configuration shipped at the root of the repository
pub fn example_config_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("conebeam.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};
    use float_eq::assert_float_eq;
    use units::{cm, mm};

    // ----- Test the example on-disk config file ---------------------------------------
    #[test]
    fn test_config_file() {
        let config = read_config_file(example_config_path()).unwrap();
        assert_eq!(config.volume.size, (128, 128, 128));
        assert_eq!(config.volume.spacing, (mm(2.0), mm(2.0), mm(2.0)));
        assert_eq!(config.detector.size, (256, 256));
        assert_eq!(config.trajectory.projections, 90);
        assert_eq!(config.trajectory.sid, mm(1000.0));
        assert_eq!(config.trajectory.sdd, mm(1536.0));
        assert_eq!(config.projector.method, Method::Siddon);
        assert_eq!(config.phantom.phantom().unwrap().primitives().len(), 10);
        assert_eq!(config.trajectory.geometry().unwrap().len(), 90);
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let err = read_config_file("no/such/file.toml".into()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    // ----- Some helpers to make the tests more concise ---------------------------------
    //  ---  Parse string as TOML  -------------------------
    fn parse<'d, D: Deserialize<'d>>(input: &'d str) -> D {
        toml::from_str(input).unwrap()
    }
    //  ---  Parse string as TOML, with explicit error reporting -------------------------
    fn parse_carefully<'d, D: Deserialize<'d>>(input: &'d str) -> std::result::Result<D, toml::de::Error> {
        toml::from_str(input)
    }
    //  ---  Macro for concise assertions about values of parsed fields ------------------
    macro_rules! check {
        ($type:ident($text:expr).$field:ident = $expected:expr) => {
            let config: $type = parse::<$type>($text);
            println!("DESERIALIZED: {config:?}");
            assert_eq!(config.$field, $expected);
        };
        ($type:ident($text:expr) fields: $($field:ident = $expected:expr);+$(;)?) => {
            let config: $type = parse::<$type>($text);
            println!("DESERIALIZED: {config:?}");
            $(assert_eq!(config.$field, $expected);)*
        }
    }
    // ----- Test deserializing of individual sections ---------------------------------
    #[test]
    fn config_volume() {
        check!{Volume(r#"
                     size = [10, 20, 30]
                     spacing = ["1 mm", "2 mm", "0.5 cm"]
               "#)
        fields:
               size    = (    10  ,    20  ,    30  );
               spacing = (mm(1.0), mm(2.0), cm(0.5));
               origin  = None;
               index   = None;
        }
        check!{Volume(r#"
                     size = [1, 1, 1]
                     spacing = ["1 mm", "1 mm", "1 mm"]
                     origin = ["-3 mm", "0 mm", "4 cm"]
                     index = [-2, 0, 5]
               "#)
        fields:
               origin = Some((mm(-3.0), mm(0.0), cm(4.0)));
               index  = Some((-2, 0, 5));
        }
    }

    #[test]
    fn volume_geometry_defaults_to_centred() {
        let volume: Volume = parse(r#"
            size = [4, 2, 1]
            spacing = ["2 mm", "1 mm", "1 mm"]
        "#);
        let geometry = volume.geometry().unwrap();
        assert_eq!(geometry.origin(), Point::new(-3.0, -0.5, 0.0));
        assert_eq!(geometry.index(), [0, 0, 0]);
    }

    #[test]
    fn config_detector() {
        check!{Detector(r#"
                     size = [64, 32]
                     spacing = ["2 mm", "3 mm"]
                     origin = ["-63 mm", "-46.5 mm"]
               "#)
        fields:
               size    = (64, 32);
               spacing = (mm(2.0), mm(3.0));
               origin  = Some((mm(-63.0), mm(-46.5)));
        }
        let detector: Detector = parse(r#"
            size = [3, 2]
            spacing = ["2 mm", "4 mm"]
        "#);
        let stack = detector.stack_geometry(5).unwrap();
        assert_eq!(stack.size(), [3, 2, 5]);
        assert_eq!(stack.origin(), Point::new(-2.0, -2.0, 0.0));
        assert_eq!(stack.spacing(), Vector::new(2.0, 4.0, 1.0));
    }

    #[test]
    fn config_trajectory() {
        check!{Trajectory(r#"
                     projections = 4
                     sid = "100 mm"
                     sdd = "20 cm"
               "#)
        fields:
               projections = 4;
               first_angle = 0.0;
               arc         = 360.0;
               sid         = mm(100.0);
               sdd         = cm(20.0);
               projection_offset = None;
        }
        let trajectory: Trajectory = parse(r#"
            projections = 4
            first_angle = 10.0
            arc = 180.0
            sid = "100 mm"
            sdd = "200 mm"
            source_offset = ["1 mm", "2 mm"]
        "#);
        let geometry = trajectory.geometry().unwrap();
        let angles = geometry.gantry_angles();
        for (angle, expected) in angles.into_iter().zip([10.0, 55.0, 100.0, 145.0]) {
            assert_float_eq!(units::degree_(angle), expected, abs <= 1e-4);
        }
        assert_eq!(geometry.entry(3).unwrap().source_offset, (mm(1.0), mm(2.0)));
    }

    #[test]
    fn invalid_trajectory_is_configuration_error() {
        let trajectory: Trajectory = parse(r#"
            projections = 2
            sid = "0 mm"
            sdd = "200 mm"
        "#);
        let err = trajectory.geometry().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn config_phantom() {
        let phantom: PhantomConfig = parse(r#"
            [shepp_logan]
            scale = "64 mm"
            offset = ["0 mm", "0 mm", "10 mm"]

            [[ellipsoid]]
            centre = ["50 mm", "0 mm", "0 mm"]
            semi_axes = ["5 mm", "5 mm", "5 mm"]
            density = 3.0
            clip = [{ normal = [1.0, 0.0, 0.0], offset = "50 mm" }]
        "#);
        let phantom = phantom.phantom().unwrap();
        assert_eq!(phantom.primitives().len(), 11);
        assert_float_eq!(phantom.density_at(&Point::new(0.0, 0.0, 10.0)), 1.02, abs <= 1e-6);
        assert_eq!(phantom.density_at(&Point::new(48.0, 0.0, 0.0)), 3.0);
        assert_eq!(phantom.density_at(&Point::new(52.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn empty_phantom_rejected() {
        let phantom: PhantomConfig = parse("");
        assert!(matches!(phantom.phantom(), Err(Error::EmptyPhantom)));
    }

    #[test]
    fn config_projector() {
        check!{Projector("").method = Method::Siddon}
        check!{Projector(r#"method = "analytic""#).method = Method::Analytic}
        let projector: Projector = parse(r#"
            method = "trilinear"
            step_fraction = 0.25
        "#);
        assert_eq!(projector.sampling(), Some(Sampling::Trilinear { step_fraction: 0.25 }));
        assert!(parse_carefully::<Projector>(r#"method = "joseph""#).is_err());
    }

    // ----- Make sure that unknown fields and bad units are not accepted ---------------
    #[test]
    fn config_reject_unknown_field() {
        assert!(parse_carefully::<Projector>("unknown_field = 666").is_err());
        assert!(parse_carefully::<Detector>(r#"
            size = [1, 1]
            spacing = ["1 mm", "1 mm"]
            pixels = 3
        "#).is_err());
    }

    #[test]
    fn config_reject_bad_units() {
        assert!(parse_carefully::<Trajectory>(r#"
            projections = 1
            sid = "100 furlongs"
            sdd = "200 mm"
        "#).is_err());
        assert!(matches!(parse_config("[volume]\nsize = 3"), Err(Error::Config(_))));
    }
}
