use animex_builder::{build_document, AnimatedDocument, BuildConfig, MaskSpan};
use animex_core::{ColorTransform, ExportDocument, FrameState, Tint, Transform};
use serde_json::{json, Value};

fn at(x: f64) -> Value {
    json!([x, 0, 1, 1, 0, 0, 0])
}

fn place(instance: u32, asset: u32, x: f64) -> Value {
    json!({"type": "Place", "instanceId": instance, "assetId": asset, "transform": at(x)})
}

fn move_to(instance: u32, x: f64) -> Value {
    json!({"type": "Move", "instanceId": instance, "transform": at(x)})
}

fn color(instance: u32, multipliers: Value) -> Value {
    json!({"type": "ColorTransform", "instanceId": instance, "colorTransform": multipliers})
}

fn tween(start: u32, end: u32, from: f64, to: f64) -> Value {
    json!({"start": start, "end": end, "startTransform": at(from), "endTransform": at(to)})
}

/// Stage named `root` (asset 1) showing bitmap 10 and shape 11
fn document(total_frames: u32, frames: Value, tweens: Value) -> ExportDocument {
    ExportDocument::from_value(json!({
        "Bitmaps": [{"assetId": 10, "name": "hero"}],
        "Shapes": [{"assetId": 11}],
        "Timelines": [{"assetId": 1, "name": "root", "type": "stage",
            "totalFrames": total_frames, "frames": frames}],
        "Tweens": [{"timelineName": "root", "tweens": tweens}]
    }))
    .unwrap()
}

fn build(doc: &ExportDocument) -> AnimatedDocument {
    build_document(doc, BuildConfig::default()).unwrap()
}

/// Applies every command for `instance` up to and including `frame`
fn replay(doc: &ExportDocument, instance: u32, frame: u32) -> FrameState {
    let mut state = FrameState::default();
    for f in doc.timelines[0].frames.iter().filter(|f| f.frame <= frame) {
        for command in f.commands.iter().filter(|c| c.instance_id == instance) {
            command.apply(&mut state);
        }
    }
    state
}

#[test]
fn test_tween_replaces_interior_commands() {
    let doc = document(
        11,
        json!([
            {"frame": 0, "commands": [place(1, 10, 0.0)]},
            {"frame": 10, "commands": [move_to(1, 100.0)]}
        ]),
        json!([tween(0, 10, 0.0, 100.0)]),
    );
    let animated = build(&doc);
    let stage = animated.stage().unwrap();
    let instance = stage.instance(1).unwrap();

    let tweens: Vec<_> = instance.tweens().collect();
    assert_eq!(tweens.len(), 1);
    assert_eq!(tweens[0].start_frame, 0);
    assert_eq!(tweens[0].end_frame, 10);

    let frames: Vec<u32> = instance.keyframes().map(|(frame, _)| frame).collect();
    assert_eq!(frames, vec![0]);
    let (_, first) = instance.keyframes().next().unwrap();
    assert_eq!(first.tween.as_ref().unwrap().duration, 10);
    assert_eq!(first.tween.as_ref().unwrap().end.x, Some(100.0));

    assert_eq!(instance.transform_at(5).x, 50.0);
    assert_eq!(instance.transform_at(10).x, 100.0);
}

#[test]
fn test_tween_drops_literal_interior_moves() {
    let mut frames = vec![json!({"frame": 0, "commands": [place(1, 10, 0.0)]})];
    for f in 1..=10 {
        frames.push(json!({"frame": f, "commands": [move_to(1, f as f64 * 10.0)]}));
    }
    let doc = document(11, Value::Array(frames), json!([tween(0, 10, 0.0, 100.0)]));
    let animated = build(&doc);
    let instance = animated.stage().unwrap().instance(1).unwrap();

    assert_eq!(instance.keyframes().count(), 1);
    assert_eq!(instance.tweens().count(), 1);
}

#[test]
fn test_mask_span() {
    let doc = document(
        10,
        json!([
            {"frame": 0, "commands": [place(1, 11, 0.0), place(2, 10, 0.0)]},
            {"frame": 2, "commands": [{"type": "MaskBegin", "instanceId": 1, "maskTill": 2}]},
            {"frame": 7, "commands": [{"type": "MaskEnd", "instanceId": 1}]}
        ]),
        json!([]),
    );
    let animated = build(&doc);
    let stage = animated.stage().unwrap();
    assert_eq!(
        stage.masks,
        vec![MaskSpan {
            mask: 1,
            instance: 2,
            start_frame: 2,
            duration: Some(5),
        }]
    );
    assert!(stage.instance(1).unwrap().is_mask);
    assert_eq!(stage.masks_of(2).count(), 1);
}

#[test]
fn test_mask_of_unknown_instance_is_malformed() {
    let doc = document(
        10,
        json!([
            {"frame": 0, "commands": [place(1, 11, 0.0)]},
            {"frame": 2, "commands": [{"type": "MaskBegin", "instanceId": 1, "maskTill": 9}]}
        ]),
        json!([]),
    );
    let err = build_document(&doc, BuildConfig::default()).unwrap_err();
    assert!(err.is_malformed_export());
}

#[test]
fn test_consumed_tween_is_not_bound_twice() {
    let doc = document(
        11,
        json!([
            {"frame": 0, "commands": [place(1, 10, 0.0), place(2, 10, 0.0)]},
            {"frame": 10, "commands": [move_to(1, 100.0), move_to(2, 100.0)]}
        ]),
        json!([tween(0, 10, 0.0, 100.0)]),
    );
    let animated = build(&doc);
    let stage = animated.stage().unwrap();
    let first = stage.instance(1).unwrap();
    let second = stage.instance(2).unwrap();

    assert_eq!(first.tweens().count(), 1);
    assert_eq!(second.tweens().count(), 0);
    let frames: Vec<u32> = second.keyframes().map(|(frame, _)| frame).collect();
    assert_eq!(frames, vec![0, 10]);
    assert_eq!(second.transform_at(10).x, 100.0);
    assert_eq!(second.transform_at(5).x, 0.0);
}

#[test]
fn test_gap_recovery_attaches_tween_on_skipped_frame() {
    let doc = document(
        11,
        json!([
            {"frame": 0, "commands": [place(1, 10, 0.0)]},
            {"frame": 10, "commands": [move_to(1, 80.0)]}
        ]),
        json!([tween(2, 10, 0.0, 80.0)]),
    );
    let animated = build(&doc);
    let instance = animated.stage().unwrap().instance(1).unwrap();

    let tween = instance.tween(2).unwrap();
    assert_eq!(tween.end_frame, 10);
    assert_eq!(instance.transform_at(2).x, 0.0);
    assert_eq!(instance.transform_at(4).x, 20.0);
    assert_eq!(instance.transform_at(10).x, 80.0);
    let frames: Vec<u32> = instance.keyframes().map(|(frame, _)| frame).collect();
    assert_eq!(frames, vec![0, 2]);
}

#[test]
fn test_unmatched_tween_end_falls_back_to_commands() {
    let doc = document(
        11,
        json!([
            {"frame": 0, "commands": [place(1, 10, 0.0)]},
            {"frame": 10, "commands": [move_to(1, 50.0)]}
        ]),
        json!([tween(0, 10, 0.0, 100.0)]),
    );
    let animated = build(&doc);
    let instance = animated.stage().unwrap().instance(1).unwrap();

    assert_eq!(instance.tweens().count(), 0);
    assert_eq!(instance.transform_at(9).x, 0.0);
    assert_eq!(instance.transform_at(10).x, 50.0);
}

#[test]
fn test_expansion_matches_literal_replay() {
    let frames = json!([
        {"frame": 0, "commands": [place(1, 10, 5.0), place(2, 11, 0.0)]},
        {"frame": 2, "commands": [move_to(1, 7.0), color(1, json!([1, 0, 0.5, 0, 1, 0]))]},
        {"frame": 3, "commands": [{"type": "Visibility", "instanceId": 1, "visible": false}]},
        {"frame": 4, "commands": [color(1, json!([1, 0.2, 1, 0, 1, 0]))]},
        {"frame": 5, "commands": [move_to(1, 7.0), {"type": "Visibility", "instanceId": 1, "visible": true}]},
        {"frame": 6, "commands": [move_to(1, -3.5),
            {"type": "ColorTransform", "instanceId": 1, "alpha": 0.5}]}
    ]);
    let doc = document(8, frames, json!([]));
    let animated = build(&doc);
    let instance = animated.stage().unwrap().instance(1).unwrap();

    let dense = instance.expand(8);
    assert_eq!(dense.len(), 8);
    for frame in 0..8u32 {
        let expected = replay(&doc, 1, frame);
        let actual = &dense[frame as usize];
        assert_eq!(actual.transform(), expected.transform(), "frame {}", frame);
        assert_eq!(actual.visible, expected.visible, "frame {}", frame);
        assert_eq!(actual.alpha, expected.alpha, "frame {}", frame);
        assert_eq!(actual.tint, expected.tint, "frame {}", frame);
        assert_eq!(actual.color_transform, expected.color_transform, "frame {}", frame);
    }
}

#[test]
fn test_color_slot_switches_between_tint_and_color_transform() {
    let offset = ColorTransform([1.0, 0.2, 1.0, 0.0, 1.0, 0.0]);
    let frames = json!([
        {"frame": 0, "commands": [place(1, 10, 0.0), color(1, json!([1, 0, 0, 0, 0, 0]))]},
        {"frame": 2, "commands": [color(1, json!([1, 0.2, 1, 0, 1, 0]))]},
        {"frame": 4, "commands": [color(1, json!([1, 0, 0, 0, 0, 0]))]}
    ]);
    let doc = document(6, frames, json!([]));
    let animated = build(&doc);
    let instance = animated.stage().unwrap().instance(1).unwrap();

    for (frame, state) in instance.expand(6).iter().enumerate() {
        let expected = replay(&doc, 1, frame as u32);
        assert_eq!(state.tint, expected.tint, "frame {}", frame);
        assert_eq!(state.color_transform, expected.color_transform, "frame {}", frame);
        assert_eq!(state.render(false), expected.render(false), "frame {}", frame);
    }
    assert_eq!(
        instance.state_at(3).render(false),
        ".setColorTransform(1,0.2,1,0,1,0)"
    );

    let keys: Vec<(u32, Option<Tint>, Option<ColorTransform>)> = instance
        .keyframes()
        .map(|(frame, key)| (frame, key.tint, key.color_transform))
        .collect();
    assert_eq!(
        keys,
        vec![
            (0, Some(Tint(0xff0000)), None),
            (2, None, Some(offset)),
            (4, Some(Tint(0xff0000)), None),
        ]
    );
}

#[test]
fn test_expansion_matches_replay_inside_tween() {
    let mut frames = vec![json!({"frame": 0, "commands": [place(1, 10, 0.0)]})];
    for f in 1..=8 {
        frames.push(json!({"frame": f, "commands": [move_to(1, f as f64 * 10.0)]}));
    }
    let doc = document(9, Value::Array(frames), json!([tween(0, 8, 0.0, 80.0)]));
    let animated = build(&doc);
    let instance = animated.stage().unwrap().instance(1).unwrap();
    assert_eq!(instance.tweens().count(), 1);

    for (frame, state) in instance.expand(9).iter().enumerate() {
        let expected = replay(&doc, 1, frame as u32);
        assert_eq!(state.transform(), expected.transform(), "frame {}", frame);
    }
}

#[test]
fn test_tween_opens_on_frame_without_motion_command() {
    let openers = [
        json!({"type": "ColorTransform", "instanceId": 1, "alpha": 0.5}),
        json!({"type": "Visibility", "instanceId": 1, "visible": true}),
    ];
    for opener in openers {
        let doc = document(
            11,
            json!([
                {"frame": 0, "commands": [place(1, 10, 0.0)]},
                {"frame": 5, "commands": [opener]},
                {"frame": 10, "commands": [move_to(1, 100.0)]}
            ]),
            json!([tween(5, 10, 0.0, 100.0)]),
        );
        let animated = build(&doc);
        let instance = animated.stage().unwrap().instance(1).unwrap();

        let starts: Vec<u32> = instance.tweens().map(|t| t.start_frame).collect();
        assert_eq!(starts, vec![5]);
        assert_eq!(instance.transform_at(4).x, 0.0);
        assert!((instance.transform_at(7).x - 40.0).abs() < 1e-9);
        assert_eq!(instance.transform_at(10).x, 100.0);
    }
}

#[test]
fn test_gap_and_current_frame_onsets_do_not_both_attach() {
    let doc = document(
        9,
        json!([
            {"frame": 0, "commands": [place(1, 10, 0.0)]},
            {"frame": 5, "commands": [move_to(1, 0.0)]},
            {"frame": 8, "commands": [move_to(1, 80.0)]}
        ]),
        json!([tween(2, 8, 0.0, 80.0), tween(5, 8, 0.0, 80.0)]),
    );
    let animated = build(&doc);
    let instance = animated.stage().unwrap().instance(1).unwrap();

    let starts: Vec<u32> = instance.tweens().map(|t| t.start_frame).collect();
    assert_eq!(starts, vec![2]);
}

#[test]
fn test_chained_tweens_attach_in_turn() {
    let doc = document(
        10,
        json!([
            {"frame": 0, "commands": [place(1, 10, 0.0)]},
            {"frame": 4, "commands": [move_to(1, 40.0)]},
            {"frame": 8, "commands": [move_to(1, 0.0)]}
        ]),
        json!([tween(0, 4, 0.0, 40.0), tween(4, 8, 40.0, 0.0)]),
    );
    let animated = build(&doc);
    let instance = animated.stage().unwrap().instance(1).unwrap();

    let starts: Vec<u32> = instance.tweens().map(|t| t.start_frame).collect();
    assert_eq!(starts, vec![0, 4]);
    assert_eq!(instance.transform_at(2).x, 20.0);
    assert_eq!(instance.transform_at(6).x, 20.0);
    assert_eq!(instance.transform_at(9).x, 0.0);
}

#[test]
fn test_color_on_tween_end_becomes_end_color() {
    let doc = document(
        11,
        json!([
            {"frame": 0, "commands": [place(1, 10, 0.0),
                {"type": "ColorTransform", "instanceId": 1, "alpha": 1}]},
            {"frame": 10, "commands": [move_to(1, 100.0),
                {"type": "ColorTransform", "instanceId": 1, "alpha": 0.5}]}
        ]),
        json!([tween(0, 10, 0.0, 100.0)]),
    );
    let animated = build(&doc);
    let instance = animated.stage().unwrap().instance(1).unwrap();

    assert_eq!(instance.state_at(0).alpha, Some(1.0));
    assert_eq!(instance.state_at(10).alpha, Some(0.5));
    let (_, first) = instance.keyframes().next().unwrap();
    assert_eq!(first.alpha, Some(1.0));
    let frame_tween = first.tween.as_ref().unwrap();
    assert_eq!(frame_tween.end.alpha, Some(0.5));
    assert_eq!(frame_tween.end.x, Some(100.0));
}

#[test]
fn test_tweens_disabled_replays_literally() {
    let doc = document(
        11,
        json!([
            {"frame": 0, "commands": [place(1, 10, 0.0)]},
            {"frame": 10, "commands": [move_to(1, 100.0)]}
        ]),
        json!([tween(0, 10, 0.0, 100.0)]),
    );
    let animated = build_document(&doc, BuildConfig { tweens: false }).unwrap();
    let instance = animated.stage().unwrap().instance(1).unwrap();
    assert_eq!(instance.tweens().count(), 0);
    assert_eq!(instance.transform_at(5).x, 0.0);
}

#[test]
fn test_children_in_first_appearance_order_without_sounds() {
    let doc = ExportDocument::from_value(json!({
        "Bitmaps": [{"assetId": 10, "name": "hero"}],
        "Sounds": [{"assetId": 12, "name": "pop"}],
        "Shapes": [{"assetId": 11}],
        "Timelines": [{"assetId": 1, "name": "root", "type": "stage", "totalFrames": 4,
            "frames": [
                {"frame": 0, "commands": [place(3, 11, 0.0), {"type": "Place", "instanceId": 9, "assetId": 12}]},
                {"frame": 1, "commands": [place(1, 10, 0.0)], "scripts": ["this.stop();"]}
            ]}]
    }))
    .unwrap();
    let animated = build(&doc);
    let stage = animated.stage().unwrap();
    assert_eq!(stage.children, vec![3, 1]);
    assert_eq!(stage.sounds().len(), 1);
    assert_eq!(stage.scripts[0].frame, 1);
    assert_eq!(stage.scripts[0].script, "this.stop();");
}

#[test]
fn test_instance_without_asset_is_malformed() {
    let doc = document(
        4,
        json!([{"frame": 0, "commands": [move_to(1, 0.0)]}]),
        json!([]),
    );
    let err = build_document(&doc, BuildConfig::default()).unwrap_err();
    assert!(err.is_malformed_export());
}

#[test]
fn test_tweens_for_unknown_timeline_are_malformed() {
    let doc = ExportDocument::from_value(json!({
        "Timelines": [{"assetId": 1, "name": "root", "type": "stage", "totalFrames": 2}],
        "Tweens": [{"timelineName": "ghost", "tweens": []}]
    }))
    .unwrap();
    let err = build_document(&doc, BuildConfig::default()).unwrap_err();
    assert!(err.is_malformed_export());
}

#[test]
fn test_place_after_is_recorded() {
    let doc = document(
        4,
        json!([{"frame": 0, "commands": [
            place(1, 10, 0.0),
            {"type": "Place", "instanceId": 2, "assetId": 11, "placeAfter": 1}
        ]}]),
        json!([]),
    );
    let animated = build(&doc);
    let stage = animated.stage().unwrap();
    assert_eq!(stage.instance(1).unwrap().place_after, None);
    assert_eq!(stage.instance(2).unwrap().place_after, Some(1));
    assert_eq!(
        stage.instance(1).unwrap().transform_at(0),
        Transform::IDENTITY
    );
}
