//! Skeleton, controller and playback tests
//!
//! Tests for:
//! - Tree building and pruning against a scene hierarchy
//! - Bone matrix composition and mesh-owner space
//! - Looping, idempotence and usage errors
//! - Singular owner transforms (identity fallback vs error)
//! - Node-level animation without skinning
//! - AnimationPlayer loop modes

use glam::{Mat4, Quat, Vec3};
use skeletal_keyframe::{
    AnimationChannel, AnimationClip, AnimationController, AnimationError, AnimationPlayer,
    AnimationSettings, Bone, InversionPolicy, LoopMode, Mesh, Node, NodeAnimationController,
    NodeHandle, PositionKey, RotationKey, Scene, SkinningController, Transform,
};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mat4_approx(a: &Mat4, b: &Mat4) -> bool {
    a.abs_diff_eq(*b, EPSILON)
}

fn translation(m: &Mat4) -> Vec3 {
    m.w_axis.truncate()
}

/// Moves along +X then +Y over 100 ticks at 25 ticks/s (4 seconds).
fn walk_clip(node_name: &str) -> AnimationClip {
    let mut clip = AnimationClip::new("walk", 100.0, 25.0);
    clip.add_channel(AnimationChannel::new(
        node_name,
        vec![
            PositionKey::new(0.0, Vec3::ZERO),
            PositionKey::new(50.0, Vec3::new(10.0, 0.0, 0.0)),
            PositionKey::new(100.0, Vec3::new(10.0, 10.0, 0.0)),
        ],
        vec![
            RotationKey::new(0.0, Quat::IDENTITY),
            RotationKey::new(100.0, Quat::from_rotation_z(1.0)),
        ],
        Vec::new(),
    ));
    clip
}

struct Rig {
    scene: Scene,
    root: NodeHandle,
    joint: NodeHandle,
    skin: NodeHandle,
}

/// armature -> joint (animated), armature -> skin (mesh with one bone on `joint`)
fn rig() -> Rig {
    let mut scene = Scene::new();
    let root = scene.create_node("armature");
    let joint = scene.add_to_parent(Node::with_name("joint"), root);
    let skin = scene.add_to_parent(Node::with_name("skin"), root);
    scene.set_mesh(
        skin,
        Mesh::with_bones("body", vec![Bone::new("joint", Mat4::IDENTITY)]),
    );
    scene.update_matrix_world();
    Rig {
        scene,
        root,
        joint,
        skin,
    }
}

fn bone_matrix(scene: &Scene, owner: NodeHandle, index: usize) -> Mat4 {
    *scene
        .node_mesh(owner)
        .expect("mesh")
        .bones[index]
        .final_transform()
}

// ============================================================================
// Tree building
// ============================================================================

#[test]
fn pruning_keeps_path_to_animated_leaf() -> anyhow::Result<()> {
    init_logger();
    let mut scene = Scene::new();
    let root = scene.create_node("root");
    let mid = scene.add_to_parent(Node::with_name("mid"), root);
    let leaf = scene.add_to_parent(Node::with_name("leaf"), mid);
    let decoration = scene.add_to_parent(Node::with_name("decoration"), root);
    let trim = scene.add_to_parent(Node::with_name("trim"), decoration);
    let lamp = scene.add_to_parent(Node::with_name("lamp"), mid);

    let mut controller = SkinningController::new(walk_clip("leaf"));
    controller.prepare(&scene, root)?;

    let tree = controller.tree().expect("prepared");
    assert_eq!(tree.len(), 3);
    for kept in [root, mid, leaf] {
        assert!(tree.contains(kept));
    }
    for dropped in [decoration, trim, lamp] {
        assert!(!tree.contains(dropped));
    }

    let leaf_node = tree.node(leaf).expect("leaf");
    assert_eq!(leaf_node.channel, Some(0));
    assert_eq!(tree.nodes()[leaf_node.parent.expect("parent")].target, mid);
    Ok(())
}

#[test]
fn prepare_with_unknown_root_fails() {
    let mut scene = Scene::new();
    let gone = scene.create_node("gone");
    scene.nodes.remove(gone);

    let mut controller = SkinningController::new(walk_clip("joint"));
    assert_eq!(
        controller.prepare(&scene, gone).unwrap_err(),
        AnimationError::NodeNotFound(gone)
    );
    assert!(!controller.is_prepared());
}

#[test]
fn bone_naming_missing_node_is_skipped() -> anyhow::Result<()> {
    init_logger();
    let mut rig = rig();
    let ghost_owner = rig.scene.add_to_parent(Node::with_name("ghost_skin"), rig.root);
    rig.scene.set_mesh(
        ghost_owner,
        Mesh::with_bones(
            "ghostly",
            vec![
                Bone::new("ghost", Mat4::IDENTITY),
                Bone::new("joint", Mat4::IDENTITY),
            ],
        ),
    );

    let mut controller = SkinningController::new(walk_clip("joint"));
    controller.prepare(&rig.scene, rig.root)?;
    assert_eq!(controller.tree().expect("prepared").num_bindings(), 2);

    controller.animate(&mut rig.scene, 1.0)?;
    assert_eq!(bone_matrix(&rig.scene, ghost_owner, 0), Mat4::IDENTITY);
    assert!(mat4_approx(
        &bone_matrix(&rig.scene, ghost_owner, 1),
        &bone_matrix(&rig.scene, rig.skin, 0)
    ));
    Ok(())
}

#[test]
fn bones_bind_to_last_node_with_shared_name() -> anyhow::Result<()> {
    let mut rig = rig();
    let twin = rig.scene.add_to_parent(Node::with_name("joint"), rig.root);

    let mut controller = SkinningController::new(walk_clip("nothing"));
    controller.prepare(&rig.scene, rig.root)?;

    let tree = controller.tree().expect("prepared");
    assert_eq!(tree.bindings_for(twin).len(), 1);
    assert!(tree.bindings_for(rig.joint).is_empty());
    Ok(())
}

// ============================================================================
// Bone matrices
// ============================================================================

#[test]
fn bone_matrix_equals_global_for_identity_offset_and_owner() -> anyhow::Result<()> {
    let mut rig = rig();
    let mut controller = SkinningController::new(walk_clip("joint"));
    controller.prepare(&rig.scene, rig.root)?;

    controller.animate(&mut rig.scene, 1.5)?;

    let global = controller
        .tree()
        .and_then(|t| t.global_transform(rig.joint))
        .expect("joint in tree");
    let expected = controller.clip().channels()[0].evaluate(1.5 * 25.0);
    assert!(mat4_approx(&global, &expected));
    assert!(mat4_approx(&bone_matrix(&rig.scene, rig.skin, 0), &global));
    Ok(())
}

#[test]
fn bone_matrix_composes_parent_offset_and_owner_space() -> anyhow::Result<()> {
    let mut rig = rig();
    rig.scene.get_node_mut(rig.root).expect("root").transform =
        Transform::from_trs(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY, Vec3::ONE);
    rig.scene.get_node_mut(rig.skin).expect("skin").transform.position = Vec3::new(0.0, 0.0, 5.0);
    let offset = Mat4::from_translation(Vec3::new(-1.0, 0.0, 0.0));
    rig.scene.set_mesh(
        rig.skin,
        Mesh::with_bones("body", vec![Bone::new("joint", offset)]),
    );
    rig.scene.update_matrix_world();

    let mut controller = SkinningController::new(walk_clip("joint"));
    controller.prepare(&rig.scene, rig.root)?;
    controller.animate(&mut rig.scene, 0.0)?;

    // joint at rest: root (0,1,0) * identity; owner world (0,1,5)
    let owner_world = Mat4::from_translation(Vec3::new(0.0, 1.0, 5.0));
    let global = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
    let expected = owner_world.inverse() * global * offset;

    let actual = bone_matrix(&rig.scene, rig.skin, 0);
    assert!(mat4_approx(&actual, &expected));
    assert!((translation(&actual) - Vec3::new(-1.0, 0.0, -5.0)).length() < EPSILON);
    Ok(())
}

#[test]
fn static_ancestors_follow_scene_edits() -> anyhow::Result<()> {
    let mut rig = rig();
    let mut controller = SkinningController::new(walk_clip("joint"));
    controller.prepare(&rig.scene, rig.root)?;

    rig.scene.get_node_mut(rig.root).expect("root").transform.position = Vec3::new(0.0, 0.0, 3.0);
    controller.animate(&mut rig.scene, 0.0)?;

    let global = controller
        .tree()
        .and_then(|t| t.global_transform(rig.joint))
        .expect("joint in tree");
    assert_eq!(translation(&global), Vec3::new(0.0, 0.0, 3.0));
    Ok(())
}

#[test]
fn joint_matrices_follow_bone_order() -> anyhow::Result<()> {
    let mut rig = rig();
    let mut controller = SkinningController::new(walk_clip("joint"));
    controller.prepare(&rig.scene, rig.root)?;
    controller.animate(&mut rig.scene, 2.0)?;

    let palette = rig.scene.node_mesh(rig.skin).expect("mesh").joint_matrices();
    assert_eq!(palette, vec![bone_matrix(&rig.scene, rig.skin, 0)]);
    Ok(())
}

// ============================================================================
// Timing & usage
// ============================================================================

#[test]
fn animation_loops_at_clip_duration() -> anyhow::Result<()> {
    let mut rig = rig();
    let mut controller = SkinningController::new(walk_clip("joint"));
    controller.prepare(&rig.scene, rig.root)?;

    controller.animate(&mut rig.scene, 0.0)?;
    let at_start = bone_matrix(&rig.scene, rig.skin, 0);

    controller.animate(&mut rig.scene, 2.0)?;
    assert_ne!(bone_matrix(&rig.scene, rig.skin, 0), at_start);

    controller.animate(&mut rig.scene, 4.0)?;
    assert_eq!(bone_matrix(&rig.scene, rig.skin, 0), at_start);
    Ok(())
}

#[test]
fn animate_is_idempotent() -> anyhow::Result<()> {
    let mut rig = rig();
    let mut controller = SkinningController::new(walk_clip("joint"));
    controller.prepare(&rig.scene, rig.root)?;

    controller.animate(&mut rig.scene, 1.3)?;
    let first = bone_matrix(&rig.scene, rig.skin, 0);
    let first_global = controller.tree().and_then(|t| t.global_transform(rig.joint));

    controller.animate(&mut rig.scene, 1.3)?;
    assert_eq!(bone_matrix(&rig.scene, rig.skin, 0), first);
    assert_eq!(controller.tree().and_then(|t| t.global_transform(rig.joint)), first_global);
    Ok(())
}

#[test]
fn animate_before_prepare_is_an_error() {
    init_logger();
    let mut rig = rig();
    let mut controller = SkinningController::new(walk_clip("joint"));

    let err = controller.animate(&mut rig.scene, 0.5).unwrap_err();
    assert_eq!(
        err,
        AnimationError::NotPrepared {
            clip: "walk".to_string()
        }
    );
    assert_eq!(bone_matrix(&rig.scene, rig.skin, 0), Mat4::IDENTITY);
}

#[test]
fn strict_prepare_rejects_unsorted_clip() {
    let rig = rig();
    let mut clip = AnimationClip::new("bad", 10.0, 25.0);
    clip.add_channel(AnimationChannel::new(
        "joint",
        vec![PositionKey::new(5.0, Vec3::X), PositionKey::new(1.0, Vec3::Y)],
        Vec::new(),
        Vec::new(),
    ));

    let mut controller = SkinningController::new(clip);
    let err = controller.prepare(&rig.scene, rig.root).unwrap_err();
    assert!(matches!(err, AnimationError::UnsortedKeys { index: 1, .. }));
    assert!(!controller.is_prepared());
}

// ============================================================================
// Singular owner transforms
// ============================================================================

fn collapse(scene: &mut Scene, node: NodeHandle) {
    scene.get_node_mut(node).expect("node").transform.scale = Vec3::ZERO;
    scene.update_matrix_world();
}

#[test]
fn singular_owner_falls_back_to_identity_and_counts() -> anyhow::Result<()> {
    init_logger();
    let mut rig = rig();
    collapse(&mut rig.scene, rig.skin);

    let mut controller = SkinningController::new(walk_clip("joint"));
    controller.prepare(&rig.scene, rig.root)?;

    controller.animate(&mut rig.scene, 1.0)?;
    assert_eq!(controller.degenerate_inversions(), 1);

    let global = controller
        .tree()
        .and_then(|t| t.global_transform(rig.joint))
        .expect("joint in tree");
    assert!(mat4_approx(&bone_matrix(&rig.scene, rig.skin, 0), &global));

    controller.animate(&mut rig.scene, 2.0)?;
    assert_eq!(controller.degenerate_inversions(), 2);
    Ok(())
}

#[test]
fn singular_owner_errors_without_partial_writes() -> anyhow::Result<()> {
    let mut rig = rig();
    let broken = rig.scene.add_to_parent(Node::with_name("broken_skin"), rig.root);
    rig.scene.set_mesh(
        broken,
        Mesh::with_bones("cape", vec![Bone::new("joint", Mat4::IDENTITY)]),
    );
    collapse(&mut rig.scene, broken);

    let settings = AnimationSettings {
        inversion: InversionPolicy::Error,
        ..AnimationSettings::default()
    };
    let mut controller = SkinningController::with_settings(walk_clip("joint"), settings);
    controller.prepare(&rig.scene, rig.root)?;

    let err = controller.animate(&mut rig.scene, 1.0).unwrap_err();
    assert_eq!(err, AnimationError::DegenerateTransform { node: broken });
    assert_eq!(controller.degenerate_inversions(), 0);

    // The healthy mesh was not written either
    assert_eq!(bone_matrix(&rig.scene, rig.skin, 0), Mat4::IDENTITY);
    assert_eq!(bone_matrix(&rig.scene, broken, 0), Mat4::IDENTITY);
    Ok(())
}

// ============================================================================
// Node animation
// ============================================================================

#[test]
fn node_controller_writes_world_matrices() -> anyhow::Result<()> {
    let mut scene = Scene::new();
    let root = scene.create_node("root");
    scene.get_node_mut(root).expect("root").transform.position = Vec3::new(0.0, 2.0, 0.0);
    let arm = scene.add_to_parent(Node::with_name("arm"), root);
    let prop = scene.add_to_parent(Node::with_name("prop"), root);
    scene.update_matrix_world();

    let mut controller = NodeAnimationController::new(walk_clip("arm"));
    controller.prepare(&scene, root)?;
    controller.animate(&mut scene, 2.0)?;

    let arm_world = scene.get_node(arm).expect("arm").transform.world_matrix_as_mat4();
    let local = controller.clip().channels()[0].evaluate(50.0);
    let expected = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)) * local;
    assert!(mat4_approx(&arm_world, &expected));

    // Unanimated nodes keep the world matrix from the hierarchy pass
    let prop_world = scene.get_node(prop).expect("prop").transform.world_matrix_as_mat4();
    assert_eq!(translation(&prop_world), Vec3::new(0.0, 2.0, 0.0));
    Ok(())
}

#[test]
fn node_controller_moves_unanimated_descendants() -> anyhow::Result<()> {
    let mut scene = Scene::new();
    let root = scene.create_node("root");
    let arm = scene.add_to_parent(Node::with_name("arm"), root);
    let hand = scene.add_to_parent(Node::with_name("hand"), arm);
    scene.get_node_mut(hand).expect("hand").transform.position = Vec3::X;
    scene.update_matrix_world();

    let mut controller = NodeAnimationController::new(walk_clip("arm"));
    controller.prepare(&scene, root)?;
    controller.animate(&mut scene, 2.0)?;

    let arm_world = scene.get_node(arm).expect("arm").transform.world_matrix_as_mat4();
    let hand_world = scene.get_node(hand).expect("hand").transform.world_matrix_as_mat4();
    assert!((translation(&arm_world) - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);
    assert!(hand_world.abs_diff_eq(arm_world * Mat4::from_translation(Vec3::X), 1e-4));

    // The pose lives in the TRS, so a later hierarchy pass keeps it
    scene.update_matrix_world();
    let again = scene.get_node(hand).expect("hand").transform.world_matrix_as_mat4();
    assert!(again.abs_diff_eq(hand_world, 1e-4));
    Ok(())
}

#[test]
fn node_controller_keeps_transforms_above_root() -> anyhow::Result<()> {
    let mut scene = Scene::new();
    let world = scene.create_node("world");
    scene.get_node_mut(world).expect("world").transform.position = Vec3::new(0.0, 0.0, 7.0);
    let root = scene.add_to_parent(Node::with_name("root"), world);
    let arm = scene.add_to_parent(Node::with_name("arm"), root);
    scene.update_matrix_world();

    let mut clip = AnimationClip::new("rest", 10.0, 25.0);
    clip.add_channel(AnimationChannel::new(
        "arm",
        vec![PositionKey::new(0.0, Vec3::ZERO)],
        vec![RotationKey::new(0.0, Quat::IDENTITY)],
        Vec::new(),
    ));
    let mut controller = NodeAnimationController::new(clip);
    controller.prepare(&scene, root)?;
    controller.animate(&mut scene, 0.0)?;

    let arm_world = scene.get_node(arm).expect("arm").transform.world_matrix_as_mat4();
    assert!(mat4_approx(
        &arm_world,
        &Mat4::from_translation(Vec3::new(0.0, 0.0, 7.0))
    ));
    Ok(())
}

// ============================================================================
// Playback
// ============================================================================

#[test]
fn player_plays_once_and_holds_last_pose() -> anyhow::Result<()> {
    let mut rig = rig();
    let mut controller = SkinningController::new(walk_clip("joint"));
    controller.prepare(&rig.scene, rig.root)?;

    let mut player = AnimationPlayer::new();
    player.loop_mode = LoopMode::Once;

    assert!(player.update(1.0, &mut controller, &mut rig.scene)?);
    assert!(!player.update(5.0, &mut controller, &mut rig.scene)?);
    assert!(player.is_finished());
    assert_eq!(player.time, 4.0);

    let end = bone_matrix(&rig.scene, rig.skin, 0);
    assert!((translation(&end) - Vec3::new(10.0, 10.0, 0.0)).length() < EPSILON);

    // Finished players leave the scene alone
    assert!(!player.update(1.0, &mut controller, &mut rig.scene)?);
    assert_eq!(bone_matrix(&rig.scene, rig.skin, 0), end);
    Ok(())
}

#[test]
fn player_ping_pong_counts_passes() -> anyhow::Result<()> {
    let mut rig = rig();
    let mut controller = SkinningController::new(walk_clip("joint"));
    controller.prepare(&rig.scene, rig.root)?;

    let mut player = AnimationPlayer::new();
    player.loop_mode = LoopMode::PingPong;
    player.repeat_limit = Some(2);

    // 5s: second pass, 1s back from the end -> tick 75
    assert!(player.update(5.0, &mut controller, &mut rig.scene)?);
    assert_eq!(player.iterations(), 1);
    let expected = controller.clip().channels()[0].evaluate(75.0);
    assert!(mat4_approx(&bone_matrix(&rig.scene, rig.skin, 0), &expected));

    assert!(!player.update(4.0, &mut controller, &mut rig.scene)?);
    assert_eq!(player.iterations(), 2);
    assert_eq!(translation(&bone_matrix(&rig.scene, rig.skin, 0)), Vec3::ZERO);

    player.reset();
    assert!(player.update(0.0, &mut controller, &mut rig.scene)?);
    Ok(())
}

#[test]
fn player_requires_prepared_controller() {
    let mut rig = rig();
    let mut controller = SkinningController::new(walk_clip("joint"));
    let mut player = AnimationPlayer::new();

    assert!(matches!(
        player.update(0.1, &mut controller, &mut rig.scene),
        Err(AnimationError::NotPrepared { .. })
    ));
}

#[test]
fn player_drives_trait_objects() -> anyhow::Result<()> {
    let mut rig = rig();
    let mut controller: Box<dyn AnimationController> =
        Box::new(SkinningController::new(walk_clip("joint")));
    controller.prepare(&rig.scene, rig.root)?;

    let mut player = AnimationPlayer::new();
    player.time_scale = 2.0;
    player.update(1.0, controller.as_mut(), &mut rig.scene)?;

    let expected = controller.clip().channels()[0].evaluate(50.0);
    assert!(mat4_approx(&bone_matrix(&rig.scene, rig.skin, 0), &expected));
    Ok(())
}
