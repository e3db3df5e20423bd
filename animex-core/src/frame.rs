//! Per-frame animation state of one instance
//!
//! Every field is optional: `None` means "unchanged from the previous frame
//! in playback order", never "reset to the default value".

use crate::transform::{ColorTransform, Tint, Transform};
use crate::{Error, Result};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

/// Default values for `[x, y, scaleX, scaleY, rotation, skewX, skewY]`
const TRANSFORM_DEFAULTS: [f64; 7] = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0];

/// Matches a leading zero before the decimal point of a tagged value
static LEADING_ZERO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z])(-)?0\.").expect("valid leading zero pattern"));

/// Animatable properties, in serialization order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    X,
    Y,
    ScaleX,
    ScaleY,
    SkewX,
    SkewY,
    Rotation,
    Alpha,
    Tint,
    ColorTransform,
    Visible,
}

impl Property {
    /// All properties in serialization order
    pub const ALL: [Property; 11] = [
        Property::X,
        Property::Y,
        Property::ScaleX,
        Property::ScaleY,
        Property::SkewX,
        Property::SkewY,
        Property::Rotation,
        Property::Alpha,
        Property::Tint,
        Property::ColorTransform,
        Property::Visible,
    ];

    /// Single-letter tag used by the compact encoding
    pub fn tag(self) -> char {
        match self {
            Property::X => 'X',
            Property::Y => 'Y',
            Property::ScaleX => 'A',
            Property::ScaleY => 'B',
            Property::SkewX => 'C',
            Property::SkewY => 'D',
            Property::Rotation => 'R',
            Property::Alpha => 'L',
            Property::Tint => 'T',
            Property::ColorTransform => 'F',
            Property::Visible => 'V',
        }
    }

    /// Key used by the JSON form
    pub fn key(self) -> &'static str {
        match self {
            Property::X => "x",
            Property::Y => "y",
            Property::ScaleX => "sx",
            Property::ScaleY => "sy",
            Property::SkewX => "kx",
            Property::SkewY => "ky",
            Property::Rotation => "r",
            Property::Alpha => "a",
            Property::Tint => "t",
            Property::ColorTransform => "c",
            Property::Visible => "v",
        }
    }

    /// Looks up a property by its compact tag
    pub fn from_tag(tag: char) -> Option<Property> {
        Property::ALL.into_iter().find(|p| p.tag() == tag)
    }
}

/// Tween description attached to the frame it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTween {
    /// Number of frames the tween runs for
    pub duration: u32,
    /// Values reached on the last frame of the tween
    pub end: Box<FrameState>,
    /// Classic ease strength (-100 to 100), if any
    pub ease: Option<f64>,
}

impl FrameTween {
    /// Compact encoding: `W<duration>[E<ease>]` followed by `[<end values>]`
    pub fn serialize(&self) -> String {
        let mut buffer = format!("W{}", self.duration);
        if let Some(ease) = self.ease {
            buffer.push('E');
            buffer.push_str(&format_number(ease));
        }
        buffer.push('[');
        buffer.push_str(&self.end.serialize_untrimmed());
        buffer.push(']');
        buffer
    }

    /// JSON form of the tween
    pub fn to_json(&self) -> Value {
        let mut result = Map::new();
        result.insert("d".into(), json!(self.duration));
        result.insert("p".into(), self.end.to_json());
        if let Some(ease) = self.ease {
            result.insert("e".into(), json!(ease));
        }
        Value::Object(result)
    }
}

/// Animatable property snapshot for one instance on one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameState {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    pub skew_x: Option<f64>,
    pub skew_y: Option<f64>,
    pub rotation: Option<f64>,
    pub alpha: Option<f64>,
    pub tint: Option<Tint>,
    pub color_transform: Option<ColorTransform>,
    pub visible: Option<bool>,
    /// Tween starting on this frame; not animatable itself
    pub tween: Option<FrameTween>,
}

impl FrameState {
    /// Sets every transform field
    pub fn set_transform(&mut self, transform: &Transform) {
        self.x = Some(transform.x);
        self.y = Some(transform.y);
        self.scale_x = Some(transform.scale_x);
        self.scale_y = Some(transform.scale_y);
        self.rotation = Some(transform.rotation);
        self.skew_x = Some(transform.skew_x);
        self.skew_y = Some(transform.skew_y);
    }

    /// Resolves the transform, using defaults for unset fields
    pub fn transform(&self) -> Transform {
        Transform {
            x: self.x.unwrap_or(0.0),
            y: self.y.unwrap_or(0.0),
            scale_x: self.scale_x.unwrap_or(1.0),
            scale_y: self.scale_y.unwrap_or(1.0),
            rotation: self.rotation.unwrap_or(0.0),
            skew_x: self.skew_x.unwrap_or(0.0),
            skew_y: self.skew_y.unwrap_or(0.0),
        }
    }

    /// True if any property is set or a tween is attached
    pub fn has_values(&self) -> bool {
        self.tween.is_some() || !self.valid_keys().is_empty()
    }

    /// Properties that are set on this frame
    pub fn valid_keys(&self) -> Vec<Property> {
        Property::ALL
            .into_iter()
            .filter(|p| self.is_set(*p))
            .collect()
    }

    /// True if the given property is set
    pub fn is_set(&self, property: Property) -> bool {
        match property {
            Property::X => self.x.is_some(),
            Property::Y => self.y.is_some(),
            Property::ScaleX => self.scale_x.is_some(),
            Property::ScaleY => self.scale_y.is_some(),
            Property::SkewX => self.skew_x.is_some(),
            Property::SkewY => self.skew_y.is_some(),
            Property::Rotation => self.rotation.is_some(),
            Property::Alpha => self.alpha.is_some(),
            Property::Tint => self.tint.is_some(),
            Property::ColorTransform => self.color_transform.is_some(),
            Property::Visible => self.visible.is_some(),
        }
    }

    /// Unsets a single property
    pub fn unset(&mut self, property: Property) {
        match property {
            Property::X => self.x = None,
            Property::Y => self.y = None,
            Property::ScaleX => self.scale_x = None,
            Property::ScaleY => self.scale_y = None,
            Property::SkewX => self.skew_x = None,
            Property::SkewY => self.skew_y = None,
            Property::Rotation => self.rotation = None,
            Property::Alpha => self.alpha = None,
            Property::Tint => self.tint = None,
            Property::ColorTransform => self.color_transform = None,
            Property::Visible => self.visible = None,
        }
    }

    /// Copies a single property from `other`.
    ///
    /// Tint and color transform share one slot: copying a set value of
    /// either one clears the other.
    pub fn copy_property(&mut self, other: &FrameState, property: Property) {
        match property {
            Property::X => self.x = other.x,
            Property::Y => self.y = other.y,
            Property::ScaleX => self.scale_x = other.scale_x,
            Property::ScaleY => self.scale_y = other.scale_y,
            Property::SkewX => self.skew_x = other.skew_x,
            Property::SkewY => self.skew_y = other.skew_y,
            Property::Rotation => self.rotation = other.rotation,
            Property::Alpha => self.alpha = other.alpha,
            Property::Tint => {
                self.tint = other.tint;
                if other.tint.is_some() {
                    self.color_transform = None;
                }
            }
            Property::ColorTransform => {
                self.color_transform = other.color_transform;
                if other.color_transform.is_some() {
                    self.tint = None;
                }
            }
            Property::Visible => self.visible = other.visible,
        }
    }

    /// True if both states hold the same value for `property`
    pub fn same_property(&self, other: &FrameState, property: Property) -> bool {
        match property {
            Property::X => self.x == other.x,
            Property::Y => self.y == other.y,
            Property::ScaleX => self.scale_x == other.scale_x,
            Property::ScaleY => self.scale_y == other.scale_y,
            Property::SkewX => self.skew_x == other.skew_x,
            Property::SkewY => self.skew_y == other.skew_y,
            Property::Rotation => self.rotation == other.rotation,
            Property::Alpha => self.alpha == other.alpha,
            Property::Tint | Property::ColorTransform => {
                self.tint == other.tint && self.color_transform == other.color_transform
            }
            Property::Visible => self.visible == other.visible,
        }
    }

    /// Overwrites `target` with every property set on this frame
    pub fn apply_onto(&self, target: &mut FrameState) {
        for property in self.valid_keys() {
            target.copy_property(self, property);
        }
    }

    /// Only the color related properties (alpha, tint, color transform)
    pub fn color_part(&self) -> FrameState {
        FrameState {
            alpha: self.alpha,
            tint: self.tint,
            color_transform: self.color_transform,
            ..FrameState::default()
        }
    }

    /// Removes every property not present in `used_properties`
    pub fn clean(&mut self, used_properties: &[Property]) {
        for property in Property::ALL {
            if !used_properties.contains(&property) {
                self.unset(property);
            }
        }
    }

    /// Transform arguments with default values trimmed from the tail.
    ///
    /// Unset interior fields are written as their default so the list stays
    /// positional.
    pub fn to_transform(&self) -> Vec<f64> {
        let args = [
            self.x,
            self.y,
            self.scale_x,
            self.scale_y,
            self.rotation,
            self.skew_x,
            self.skew_y,
        ];
        let mut len = args.len();
        while len > 0 && args[len - 1].map_or(true, |v| v == TRANSFORM_DEFAULTS[len - 1]) {
            len -= 1;
        }
        args[..len]
            .iter()
            .zip(TRANSFORM_DEFAULTS)
            .map(|(value, default)| value.unwrap_or(default))
            .collect()
    }

    /// Renders the frame as static setter calls
    pub fn render(&self, compress: bool) -> String {
        let mut buffer = String::new();
        let args = self.to_transform();
        if !args.is_empty() {
            let func = if compress { "t" } else { "setTransform" };
            let list: Vec<String> = args.iter().map(|v| format_number(*v)).collect();
            buffer.push_str(&format!(".{}({})", func, list.join(", ")));
        }

        if let Some(alpha) = self.alpha.filter(|a| *a < 1.0) {
            let func = if compress { "a" } else { "setAlpha" };
            buffer.push_str(&format!(".{}({})", func, format_number(alpha)));
        }

        // Tint wins over an explicit color transform
        if let Some(tint) = self.tint.filter(|t| *t != Tint::WHITE) {
            let func = if compress { "i" } else { "setTint" };
            buffer.push_str(&format!(".{}(\"{}\")", func, tint));
        } else if let Some(color) = self.color_transform.filter(|c| !c.is_identity()) {
            let func = if compress { "c" } else { "setColorTransform" };
            buffer.push_str(&format!(".{}({})", func, join_numbers(&color.0)));
        }
        buffer
    }

    /// Compact single-letter encoding of the set properties and tween
    pub fn serialize(&self) -> String {
        trim_serialized_numbers(&self.serialize_untrimmed())
    }

    fn serialize_untrimmed(&self) -> String {
        let mut buffer = String::new();
        for property in self.valid_keys() {
            buffer.push(property.tag());
            buffer.push_str(&self.property_value(property));
        }
        if let Some(tween) = &self.tween {
            buffer.push_str(&tween.serialize());
        }
        buffer
    }

    fn property_value(&self, property: Property) -> String {
        let number = |value: Option<f64>| value.map(format_number).unwrap_or_default();
        match property {
            Property::X => number(self.x),
            Property::Y => number(self.y),
            Property::ScaleX => number(self.scale_x),
            Property::ScaleY => number(self.scale_y),
            Property::SkewX => number(self.skew_x),
            Property::SkewY => number(self.skew_y),
            Property::Rotation => number(self.rotation),
            Property::Alpha => number(self.alpha),
            Property::Tint => self.tint.map(|t| t.to_string()).unwrap_or_default(),
            Property::ColorTransform => self
                .color_transform
                .map(|c| join_numbers(&c.0))
                .unwrap_or_default(),
            Property::Visible => match self.visible {
                Some(true) => "1".to_string(),
                Some(false) => "0".to_string(),
                None => String::new(),
            },
        }
    }

    /// Parses the compact encoding produced by [`FrameState::serialize`]
    pub fn parse(encoded: &str) -> Result<FrameState> {
        let mut parser = CompactParser {
            chars: encoded.chars().collect(),
            pos: 0,
        };
        let state = parser.parse_state()?;
        if parser.pos != parser.chars.len() {
            return Err(Error::InvalidFrameEncoding(format!(
                "unexpected '{}' at {}",
                parser.chars[parser.pos], parser.pos
            )));
        }
        Ok(state)
    }

    /// JSON form of the set properties and tween
    pub fn to_json(&self) -> Value {
        let mut result = Map::new();
        for property in self.valid_keys() {
            let value = match property {
                Property::Tint => json!(self.tint.map(|t| t.to_string())),
                Property::ColorTransform => json!(self.color_transform.map(|c| c.0)),
                Property::Visible => json!(self.visible),
                _ => json!(self.number(property)),
            };
            result.insert(property.key().into(), value);
        }
        if let Some(tween) = &self.tween {
            result.insert("tw".into(), tween.to_json());
        }
        Value::Object(result)
    }

    /// Numeric value of a numeric property
    pub fn number(&self, property: Property) -> Option<f64> {
        match property {
            Property::X => self.x,
            Property::Y => self.y,
            Property::ScaleX => self.scale_x,
            Property::ScaleY => self.scale_y,
            Property::SkewX => self.skew_x,
            Property::SkewY => self.skew_y,
            Property::Rotation => self.rotation,
            Property::Alpha => self.alpha,
            _ => None,
        }
    }

    fn set_number(&mut self, property: Property, value: f64) {
        match property {
            Property::X => self.x = Some(value),
            Property::Y => self.y = Some(value),
            Property::ScaleX => self.scale_x = Some(value),
            Property::ScaleY => self.scale_y = Some(value),
            Property::SkewX => self.skew_x = Some(value),
            Property::SkewY => self.skew_y = Some(value),
            Property::Rotation => self.rotation = Some(value),
            Property::Alpha => self.alpha = Some(value),
            _ => {}
        }
    }
}

/// Formats a number the shortest way that still reads back exactly
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    value.to_string()
}

fn join_numbers(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format_number(*v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Strips the leading zero of tagged values: `X0.5` becomes `X.5`, `X-0.5` becomes `X-.5`
pub fn trim_serialized_numbers(buffer: &str) -> String {
    LEADING_ZERO.replace_all(buffer, "$1$2.").into_owned()
}

struct CompactParser {
    chars: Vec<char>,
    pos: usize,
}

impl CompactParser {
    fn parse_state(&mut self) -> Result<FrameState> {
        let mut state = FrameState::default();
        while let Some(&tag) = self.chars.get(self.pos) {
            if tag == ']' {
                break;
            }
            self.pos += 1;
            if tag == 'W' {
                state.tween = Some(self.parse_tween()?);
                continue;
            }
            let property = Property::from_tag(tag).ok_or_else(|| {
                Error::InvalidFrameEncoding(format!("unknown tag '{}' at {}", tag, self.pos - 1))
            })?;
            let value = self.take_value();
            match property {
                Property::Tint => {
                    state.tint = Some(Tint::parse(&value).ok_or_else(|| {
                        Error::InvalidFrameEncoding(format!("invalid tint '{}'", value))
                    })?);
                }
                Property::ColorTransform => {
                    let numbers = value
                        .split(',')
                        .map(parse_number)
                        .collect::<Result<Vec<f64>>>()?;
                    let array: [f64; 6] = numbers.try_into().map_err(|_| {
                        Error::InvalidFrameEncoding(format!("invalid color transform '{}'", value))
                    })?;
                    state.color_transform = Some(ColorTransform(array));
                }
                Property::Visible => {
                    state.visible = Some(match value.as_str() {
                        "1" => true,
                        "0" => false,
                        other => {
                            return Err(Error::InvalidFrameEncoding(format!(
                                "invalid visibility '{}'",
                                other
                            )))
                        }
                    });
                }
                numeric => state.set_number(numeric, parse_number(&value)?),
            }
        }
        Ok(state)
    }

    fn parse_tween(&mut self) -> Result<FrameTween> {
        let duration = self.take_value();
        let duration = duration
            .parse::<u32>()
            .map_err(|_| Error::InvalidFrameEncoding(format!("invalid tween duration '{}'", duration)))?;
        let mut ease = None;
        if self.chars.get(self.pos) == Some(&'E') {
            self.pos += 1;
            ease = Some(parse_number(&self.take_value())?);
        }
        if self.chars.get(self.pos) != Some(&'[') {
            return Err(Error::InvalidFrameEncoding("tween without end values".into()));
        }
        self.pos += 1;
        let end = self.parse_state()?;
        if self.chars.get(self.pos) != Some(&']') {
            return Err(Error::InvalidFrameEncoding("unterminated tween".into()));
        }
        self.pos += 1;
        Ok(FrameTween {
            duration,
            end: Box::new(end),
            ease,
        })
    }

    /// Reads until the next tag or bracket
    fn take_value(&mut self) -> String {
        let start = self.pos;
        while let Some(&c) = self.chars.get(self.pos) {
            if c.is_ascii_uppercase() || c == '[' || c == ']' {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}

fn parse_number(value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| Error::InvalidFrameEncoding(format!("invalid number '{}'", value)))
}
