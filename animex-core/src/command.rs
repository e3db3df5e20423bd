//! Display commands recorded on export frames

use crate::frame::FrameState;
use crate::transform::{ColorTransform, Transform};
use serde::Deserialize;

/// A single display command on an export frame
///
/// Commands are replayed onto frame states and never stored as the animated
/// model itself.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Instance the command targets, unique within the parent timeline
    pub instance_id: u32,
    /// Library asset for the instance; required on the first command that
    /// mentions an instance
    #[serde(default)]
    pub asset_id: Option<u32>,
    /// Type-specific payload
    #[serde(flatten)]
    pub kind: CommandKind,
}

/// Closed set of command types, tagged by the `type` field
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum CommandKind {
    /// Adds an instance to the display list
    Place {
        #[serde(default)]
        transform: Option<Transform>,
        /// Instance this one renders immediately above (0 = topmost group)
        #[serde(default)]
        place_after: u32,
        /// Set when the placed timeline behaves as a graphic symbol
        #[serde(default)]
        is_graphic: bool,
    },
    /// Updates the display transform
    Move { transform: Transform },
    /// Updates alpha and color
    ColorTransform {
        #[serde(default)]
        color_transform: Option<ColorTransform>,
        #[serde(default)]
        alpha: Option<f64>,
    },
    /// Starts masking `mask_till` with this instance
    MaskBegin { mask_till: u32 },
    /// Stops masking with this instance
    MaskEnd,
    /// Shows or hides the instance
    Visibility { visible: bool },
    /// Removes the instance from the display list
    Remove,
}

impl Command {
    /// Creates a command
    pub fn new(instance_id: u32, asset_id: Option<u32>, kind: CommandKind) -> Self {
        Self {
            instance_id,
            asset_id,
            kind,
        }
    }

    /// The transform carried by a Move command
    pub fn move_transform(&self) -> Option<&Transform> {
        match &self.kind {
            CommandKind::Move { transform } => Some(transform),
            _ => None,
        }
    }

    /// Writes the values this command sets onto a frame state
    pub fn apply(&self, state: &mut FrameState) {
        match &self.kind {
            CommandKind::Place { transform, .. } => {
                if let Some(transform) = transform {
                    state.set_transform(transform);
                }
            }
            CommandKind::Move { transform } => state.set_transform(transform),
            CommandKind::ColorTransform {
                color_transform,
                alpha,
            } => {
                state.alpha = Some(alpha.unwrap_or(1.0));
                let color = color_transform.unwrap_or_default();
                match color.to_tint() {
                    Some(tint) => {
                        state.tint = Some(tint);
                        state.color_transform = None;
                    }
                    None => {
                        state.color_transform = Some(color);
                        state.tint = None;
                    }
                }
            }
            CommandKind::Visibility { visible } => state.visible = Some(*visible),
            CommandKind::Remove => state.visible = Some(false),
            CommandKind::MaskBegin { .. } | CommandKind::MaskEnd => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Tint;

    #[test]
    fn test_parse_place_command() {
        let json = r#"{"type": "Place", "instanceId": 3, "assetId": 7,
            "transform": [1, 2, 1, 1, 0, 0, 0], "placeAfter": 2}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(command.instance_id, 3);
        assert_eq!(command.asset_id, Some(7));
        match command.kind {
            CommandKind::Place {
                transform,
                place_after,
                is_graphic,
            } => {
                assert_eq!(transform.unwrap().x, 1.0);
                assert_eq!(place_after, 2);
                assert!(!is_graphic);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_command_type_is_rejected() {
        let json = r#"{"type": "Explode", "instanceId": 3}"#;
        assert!(serde_json::from_str::<Command>(json).is_err());
    }

    #[test]
    fn test_mask_commands() {
        let begin: Command =
            serde_json::from_str(r#"{"type": "MaskBegin", "instanceId": 1, "maskTill": 2}"#)
                .unwrap();
        assert_eq!(begin.kind, CommandKind::MaskBegin { mask_till: 2 });
        let end: Command =
            serde_json::from_str(r#"{"type": "MaskEnd", "instanceId": 1}"#).unwrap();
        assert_eq!(end.kind, CommandKind::MaskEnd);
    }

    #[test]
    fn test_color_transform_applies_tint() {
        let command = Command::new(
            1,
            None,
            CommandKind::ColorTransform {
                color_transform: Some(ColorTransform([1.0, 0.0, 0.0, 0.0, 0.0, 0.0])),
                alpha: Some(0.5),
            },
        );
        let mut state = FrameState::default();
        command.apply(&mut state);
        assert_eq!(state.alpha, Some(0.5));
        assert_eq!(state.tint, Some(Tint(0xff0000)));
        assert_eq!(state.color_transform, None);
    }

    #[test]
    fn test_color_transform_with_offsets_keeps_full_transform() {
        let ct = ColorTransform([1.0, 0.2, 1.0, 0.0, 1.0, 0.0]);
        let command = Command::new(
            1,
            None,
            CommandKind::ColorTransform {
                color_transform: Some(ct),
                alpha: None,
            },
        );
        let mut state = FrameState::default();
        command.apply(&mut state);
        assert_eq!(state.alpha, Some(1.0));
        assert_eq!(state.color_transform, Some(ct));
        assert_eq!(state.tint, None);
    }
}
