//! Affine transform and color data carried by display commands and tweens

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decomposed 2D display transform
///
/// Serialized as the positional list `[x, y, scaleX, scaleY, rotation, skewX, skewY]`.
/// `PartialEq` is exact; tween matching goes through [`Transform::approx_eq`],
/// which only absorbs floating point noise from unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTransform", into = "[f64; 7]")]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation in radians
    pub rotation: f64,
    /// Horizontal skew in radians
    pub skew_x: f64,
    /// Vertical skew in radians
    pub skew_y: f64,
}

impl Transform {
    /// Largest per-component difference two matching transforms may have
    pub const EPSILON: f64 = 1e-9;

    /// The identity transform
    pub const IDENTITY: Transform = Transform {
        x: 0.0,
        y: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        rotation: 0.0,
        skew_x: 0.0,
        skew_y: 0.0,
    };

    /// Creates a transform from `[x, y, scaleX, scaleY, rotation, skewX, skewY]`
    pub fn from_args(args: [f64; 7]) -> Self {
        let [x, y, scale_x, scale_y, rotation, skew_x, skew_y] = args;
        Self {
            x,
            y,
            scale_x,
            scale_y,
            rotation,
            skew_x,
            skew_y,
        }
    }

    /// Returns the transform as `[x, y, scaleX, scaleY, rotation, skewX, skewY]`
    pub fn to_args(&self) -> [f64; 7] {
        [
            self.x,
            self.y,
            self.scale_x,
            self.scale_y,
            self.rotation,
            self.skew_x,
            self.skew_y,
        ]
    }

    /// Decomposes a 2D matrix into position, scale, rotation and skew.
    ///
    /// When both skew angles agree the matrix is a pure rotation and the
    /// skew is folded into `rotation`.
    pub fn from_matrix(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        let scale_x = (a * a + b * b).sqrt();
        let scale_y = (c * c + d * d).sqrt();
        let skew_x = (-c).atan2(d);
        let skew_y = b.atan2(a);

        if (skew_x - skew_y).abs() < 1e-5 {
            Self {
                x: tx,
                y: ty,
                scale_x,
                scale_y,
                rotation: skew_y,
                skew_x: 0.0,
                skew_y: 0.0,
            }
        } else {
            Self {
                x: tx,
                y: ty,
                scale_x,
                scale_y,
                rotation: 0.0,
                skew_x,
                skew_y,
            }
        }
    }

    /// Component-wise equality within [`Transform::EPSILON`]
    pub fn approx_eq(&self, other: &Transform) -> bool {
        self.to_args()
            .iter()
            .zip(other.to_args())
            .all(|(a, b)| (a - b).abs() <= Self::EPSILON)
    }

    /// Linearly interpolates every component towards `other`
    pub fn lerp(&self, other: &Transform, t: f64) -> Transform {
        let a = self.to_args();
        let b = other.to_args();
        let mut out = [0.0; 7];
        for i in 0..7 {
            out[i] = a[i] + (b[i] - a[i]) * t;
        }
        Transform::from_args(out)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Transform> for [f64; 7] {
    fn from(transform: Transform) -> Self {
        transform.to_args()
    }
}

/// Wire forms accepted for a transform
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawTransform {
    Args([f64; 7]),
    Matrix {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        tx: f64,
        ty: f64,
    },
}

impl From<RawTransform> for Transform {
    fn from(raw: RawTransform) -> Self {
        match raw {
            RawTransform::Args(args) => Transform::from_args(args),
            RawTransform::Matrix { a, b, c, d, tx, ty } => Transform::from_matrix(a, b, c, d, tx, ty),
        }
    }
}

/// Per-channel color transform: `[redMultiplier, redOffset, greenMultiplier,
/// greenOffset, blueMultiplier, blueOffset]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorTransform(pub [f64; 6]);

impl ColorTransform {
    /// The identity color transform
    pub const IDENTITY: ColorTransform = ColorTransform([1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);

    /// Returns true if every element equals the identity transform
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Returns true if no channel carries an offset
    pub fn is_offset_free(&self) -> bool {
        self.0[1] == 0.0 && self.0[3] == 0.0 && self.0[5] == 0.0
    }

    /// Collapses an offset-free transform into a multiply tint
    pub fn to_tint(&self) -> Option<Tint> {
        if !self.is_offset_free() {
            return None;
        }
        let channel = |m: f64| (m.clamp(0.0, 1.0) * 255.0).round() as u32;
        Some(Tint(
            (channel(self.0[0]) << 16) | (channel(self.0[2]) << 8) | channel(self.0[4]),
        ))
    }
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Multiply tint stored as `0xRRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tint(pub u32);

impl Tint {
    /// No tint
    pub const WHITE: Tint = Tint(0xffffff);

    /// Parses `#rrggbb` or `#rgb`
    pub fn parse(value: &str) -> Option<Tint> {
        let hex = value.strip_prefix('#')?;
        match hex.len() {
            6 => u32::from_str_radix(hex, 16).ok().map(Tint),
            3 => {
                let short = u32::from_str_radix(hex, 16).ok()?;
                let (r, g, b) = ((short >> 8) & 0xf, (short >> 4) & 0xf, short & 0xf);
                Some(Tint((r * 0x11) << 16 | (g * 0x11) << 8 | b * 0x11))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Tint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0 & 0xffffff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_from_args_list() {
        let t: Transform = serde_json::from_str("[10, 20, 1, 1, 0, 0, 0]").unwrap();
        assert_eq!(t.x, 10.0);
        assert_eq!(t.y, 20.0);
        assert_eq!(t.scale_x, 1.0);
    }

    #[test]
    fn test_transform_from_matrix_object() {
        let t: Transform =
            serde_json::from_str(r#"{"a": 2, "b": 0, "c": 0, "d": 3, "tx": 5, "ty": 6}"#).unwrap();
        assert_eq!(t, Transform::from_args([5.0, 6.0, 2.0, 3.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_matrix_rotation_folds_skew() {
        let angle = std::f64::consts::FRAC_PI_2;
        let t = Transform::from_matrix(angle.cos(), angle.sin(), -angle.sin(), angle.cos(), 0.0, 0.0);
        assert!((t.rotation - angle).abs() < 1e-9);
        assert_eq!(t.skew_x, 0.0);
        assert_eq!(t.skew_y, 0.0);
    }

    #[test]
    fn test_color_transform_to_tint() {
        let ct = ColorTransform([1.0, 0.0, 0.0, 0.0, 0.5, 0.0]);
        assert_eq!(ct.to_tint(), Some(Tint(0xff0080)));
        assert_eq!(ColorTransform([1.0, 10.0, 1.0, 0.0, 1.0, 0.0]).to_tint(), None);
    }

    #[test]
    fn test_tint_parse_and_display() {
        assert_eq!(Tint::parse("#fff"), Some(Tint::WHITE));
        assert_eq!(Tint::parse("#00ff00"), Some(Tint(0x00ff00)));
        assert_eq!(Tint(0x00ff00).to_string(), "#00ff00");
        assert_eq!(Tint::parse("00ff00"), None);
    }
}
