/// Tests for bounding volumes

use super::*;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

fn approx_vec(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-4
}

fn unit_cube() -> BoundingBox {
    BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0))
}

// ============================================================================
// BoundingBox
// ============================================================================

#[test]
fn test_empty_box() {
    assert!(BoundingBox::EMPTY.is_empty());
    assert!(BoundingBox::default().is_empty());
    assert!(!unit_cube().is_empty());
}

#[test]
fn test_box_center_and_extents() {
    let b = BoundingBox::new(Vec3::new(0.0, 2.0, -4.0), Vec3::new(2.0, 4.0, 0.0));
    assert!(approx_vec(b.center(), Vec3::new(1.0, 3.0, -2.0)));
    assert!(approx_vec(b.extents(), Vec3::new(1.0, 1.0, 2.0)));
}

#[test]
fn test_box_union() {
    let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
    let b = BoundingBox::new(Vec3::splat(-2.0), Vec3::splat(-1.0));
    let u = a.union(&b);
    assert_eq!(u.min, Vec3::splat(-2.0));
    assert_eq!(u.max, Vec3::ONE);
}

#[test]
fn test_box_union_with_empty_is_identity() {
    let a = unit_cube();
    assert_eq!(a.union(&BoundingBox::EMPTY), a);
    assert_eq!(BoundingBox::EMPTY.union(&a), a);
}

#[test]
fn test_box_from_points() {
    let b = BoundingBox::from_points(&[
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(-1.0, 2.0, 0.5),
        Vec3::new(0.0, -3.0, 1.0),
    ]);
    assert_eq!(b.min, Vec3::new(-1.0, -3.0, 0.0));
    assert_eq!(b.max, Vec3::new(1.0, 2.0, 1.0));
}

// ============================================================================
// BoundingSphere
// ============================================================================

#[test]
fn test_sphere_from_box() {
    let s = BoundingSphere::from_box(&unit_cube()).unwrap();
    assert!(approx_vec(s.center, Vec3::ZERO));
    assert!(approx(s.radius, 3.0f32.sqrt()));
    assert!(BoundingSphere::from_box(&BoundingBox::EMPTY).is_none());
}

#[test]
fn test_sphere_pure_translation() {
    let local = BoundingSphere { center: Vec3::new(1.0, 2.0, 3.0), radius: 2.5 };
    let t = Vec3::new(10.0, -5.0, 0.5);
    let world = local.transformed(&Mat4::from_translation(t));
    assert!(approx_vec(world.center, local.center + t));
    assert!(approx(world.radius, local.radius));
}

#[test]
fn test_sphere_uniform_scale() {
    let local = BoundingSphere { center: Vec3::new(1.0, 0.0, 0.0), radius: 2.0 };
    let world = local.transformed(&Mat4::from_scale(Vec3::splat(3.0)));
    assert!(approx_vec(world.center, Vec3::new(3.0, 0.0, 0.0)));
    assert!(approx(world.radius, 6.0));
}

#[test]
fn test_sphere_non_uniform_scale_is_conservative() {
    let local = BoundingSphere { center: Vec3::ZERO, radius: 1.0 };
    let model = Mat4::from_scale(Vec3::new(1.0, 4.0, 2.0));
    let world = local.transformed(&model);
    assert!(approx(world.radius, 4.0));

    // Every transformed point of the local sphere surface stays inside
    for dir in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(1.0, 1.0, 1.0).normalize()] {
        let p = model.transform_point3(dir);
        assert!(world.contains_point(p));
    }
}

#[test]
fn test_sphere_rotation_keeps_radius() {
    let local = BoundingSphere { center: Vec3::new(0.0, 1.0, 0.0), radius: 1.5 };
    let model = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
    let world = local.transformed(&model);
    assert!(approx(world.radius, 1.5));
    assert!(approx_vec(world.center, Vec3::new(-1.0, 0.0, 0.0)));
}

#[test]
fn test_max_axis_scale() {
    assert!(approx(max_axis_scale(&Mat4::IDENTITY), 1.0));
    assert!(approx(max_axis_scale(&Mat4::from_scale(Vec3::new(0.5, 2.0, 1.0))), 2.0));
}
