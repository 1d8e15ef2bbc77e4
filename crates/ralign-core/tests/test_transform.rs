use approx::assert_abs_diff_eq;

use ralign_core::transform::{Transform, TransformKind};

fn assert_point(a: [f64; 3], b: [f64; 3]) {
    for i in 0..3 {
        assert_abs_diff_eq!(a[i], b[i], epsilon = 1e-9);
    }
}

#[test]
fn test_identity_is_identity() {
    let t = Transform::identity_2d();
    assert!(t.is_identity());
    assert_eq!(t.kind(), TransformKind::TwoD);
    assert_point(t.apply_point([3.0, -2.0, 0.0]), [3.0, -2.0, 0.0]);
}

#[test]
fn test_planar_rotates_then_translates() {
    let t = Transform::planar(90.0, 1.0, 2.0, false);
    // (1, 0) rotated by 90° lands on (0, 1), then shifts by (1, 2).
    assert_point(t.apply_point([1.0, 0.0, 0.0]), [1.0, 3.0, 0.0]);
}

#[test]
fn test_invert_point_undoes_apply() {
    for mirror in [false, true] {
        let t = Transform::planar(37.0, 4.5, -1.25, mirror);
        let p = [2.0, -7.0, 0.0];
        assert_point(t.invert_point(t.apply_point(p)), p);
    }
    let t = Transform::euler_3d(30.0, 45.0, -60.0, [1.0, 2.0, 3.0]);
    let p = [1.0, -1.0, 2.0];
    assert_point(t.invert_point(t.apply_point(p)), p);
}

#[test]
fn test_inverse_composes_to_identity() {
    let cases = [
        Transform::planar(25.0, 3.0, -4.0, false),
        Transform::planar(-110.0, 0.5, 2.0, true),
        Transform::euler_3d(10.0, 20.0, 30.0, [1.0, 0.0, -2.0]),
    ];
    for t in cases {
        let inv = t.inverse();
        let p = [1.5, -2.5, 0.0];
        assert_point(inv.apply_point(t.apply_point(p)), p);
    }
}

#[test]
fn test_mirrored_flips_output_x() {
    let t = Transform::planar(30.0, 2.0, 1.0, false);
    let m = t.mirrored();
    assert!(m.mirror());
    let p = [3.0, 4.0, 0.0];
    let q = t.apply_point(p);
    assert_point(m.apply_point(p), [-q[0], q[1], q[2]]);
    // Mirroring twice restores the original.
    let back = m.mirrored();
    assert!(!back.mirror());
    assert_point(back.apply_point(p), q);
}

#[test]
fn test_pre_translation_applies_before_rotation() {
    let mut t = Transform::rotation_2d(90.0);
    t.set_pre_translation([1.0, 0.0, 0.0]);
    // p' = R · (p + v): origin goes to R · (1, 0) = (0, 1).
    assert_point(t.apply_point([0.0, 0.0, 0.0]), [0.0, 1.0, 0.0]);
}

#[test]
fn test_two_d_translation_drops_z() {
    let mut t = Transform::identity_2d();
    t.set_translation([1.0, 2.0, 3.0]);
    assert_eq!(t.translation(), [1.0, 2.0, 0.0]);
}

#[test]
fn test_serde_roundtrip_keeps_mirror() {
    let t = Transform::planar(12.5, -3.0, 4.0, true);
    let json = serde_json::to_string(&t).unwrap();
    let back: Transform = serde_json::from_str(&json).unwrap();
    assert_eq!(back, t);
}
