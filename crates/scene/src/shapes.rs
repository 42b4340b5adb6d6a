use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::SceneError;

/// Hits closer than this are treated as self-intersections.
pub const RAY_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    /// Infinite plane `normal · p = offset`, visible from both sides.
    Plane { normal: Vec3, offset: f32 },
    Sphere { center: Vec3, radius: f32 },
    Box {
        center: Vec3,
        half_extents: Vec3,
        #[serde(default)]
        rotation: Quat,
    },
}

impl Shape {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Shape::Plane { .. } => "plane",
            Shape::Sphere { .. } => "sphere",
            Shape::Box { .. } => "box",
        }
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        let kind = self.kind();
        let fail = |reason| Err(SceneError::InvalidShape { kind, reason });
        match *self {
            Shape::Plane { normal, offset } => {
                if !normal.is_finite() || normal.length_squared() < 1e-12 {
                    return fail("normal must be a finite non-zero vector");
                }
                if !offset.is_finite() {
                    return fail("offset must be finite");
                }
            }
            Shape::Sphere { center, radius } => {
                if !center.is_finite() {
                    return fail("center must be finite");
                }
                if !(radius > 0.0 && radius.is_finite()) {
                    return fail("radius must be positive");
                }
            }
            Shape::Box {
                center,
                half_extents,
                rotation,
            } => {
                if !center.is_finite() {
                    return fail("center must be finite");
                }
                if !half_extents.is_finite() || half_extents.min_element() <= 0.0 {
                    return fail("half extents must be positive");
                }
                if !rotation.is_finite() || rotation.length_squared() < 1e-12 {
                    return fail("rotation must be a finite non-zero quaternion");
                }
            }
        }
        Ok(())
    }

    /// Closest intersection along a unit-length ray as `(distance, normal)`.
    /// The normal always faces the incoming ray.
    #[must_use]
    pub fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<(f32, Vec3)> {
        let (t, normal) = match *self {
            Shape::Plane { normal, offset } => intersect_plane(normal.normalize(), offset, origin, dir)?,
            Shape::Sphere { center, radius } => intersect_sphere(center, radius, origin, dir)?,
            Shape::Box {
                center,
                half_extents,
                rotation,
            } => intersect_box(center, half_extents, rotation.normalize(), origin, dir)?,
        };
        let facing = if normal.dot(dir) > 0.0 { -normal } else { normal };
        Some((t, facing))
    }
}

fn intersect_plane(normal: Vec3, offset: f32, origin: Vec3, dir: Vec3) -> Option<(f32, Vec3)> {
    let denom = normal.dot(dir);
    if denom.abs() < 1e-8 {
        return None;
    }
    let t = (offset - normal.dot(origin)) / denom;
    (t > RAY_EPSILON).then_some((t, normal))
}

fn intersect_sphere(center: Vec3, radius: f32, origin: Vec3, dir: Vec3) -> Option<(f32, Vec3)> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let t = [-b - root, -b + root].into_iter().find(|t| *t > RAY_EPSILON)?;
    Some((t, (origin + dir * t - center) / radius))
}

fn intersect_box(
    center: Vec3,
    half_extents: Vec3,
    rotation: Quat,
    origin: Vec3,
    dir: Vec3,
) -> Option<(f32, Vec3)> {
    let inv = rotation.inverse();
    let o = inv * (origin - center);
    let d = inv * dir;

    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    let mut near_axis = 0;
    let mut far_axis = 0;
    for axis in 0..3 {
        if d[axis].abs() < 1e-8 {
            if o[axis].abs() > half_extents[axis] {
                return None;
            }
            continue;
        }
        let t0 = (-half_extents[axis] - o[axis]) / d[axis];
        let t1 = (half_extents[axis] - o[axis]) / d[axis];
        let (lo, hi) = if t0 < t1 { (t0, t1) } else { (t1, t0) };
        if lo > t_near {
            t_near = lo;
            near_axis = axis;
        }
        if hi < t_far {
            t_far = hi;
            far_axis = axis;
        }
    }
    if t_near > t_far || t_far <= RAY_EPSILON {
        return None;
    }
    let (t, axis) = if t_near > RAY_EPSILON {
        (t_near, near_axis)
    } else {
        (t_far, far_axis)
    };
    let mut local_normal = Vec3::ZERO;
    local_normal[axis] = if (o + d * t)[axis] >= 0.0 { 1.0 } else { -1.0 };
    Some((t, rotation * local_normal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_is_hit_from_both_sides() {
        let plane = Shape::Plane {
            normal: Vec3::Y,
            offset: 0.0,
        };
        let (t, n) = plane.intersect(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y).unwrap();
        assert!((t - 5.0).abs() < 1e-6);
        assert!((n - Vec3::Y).length() < 1e-6);
        let (t, n) = plane.intersect(Vec3::new(0.0, -2.0, 0.0), Vec3::Y).unwrap();
        assert!((t - 2.0).abs() < 1e-6);
        assert!((n - Vec3::NEG_Y).length() < 1e-6);
        assert!(plane.intersect(Vec3::new(0.0, 5.0, 0.0), Vec3::Y).is_none());
    }

    #[test]
    fn sphere_hit_distance_and_normal() {
        let sphere = Shape::Sphere {
            center: Vec3::new(0.0, 0.0, -10.0),
            radius: 2.0,
        };
        let (t, n) = sphere.intersect(Vec3::ZERO, Vec3::NEG_Z).unwrap();
        assert!((t - 8.0).abs() < 1e-5);
        assert!((n - Vec3::Z).length() < 1e-5);
        assert!(sphere.intersect(Vec3::ZERO, Vec3::X).is_none());
    }

    #[test]
    fn rotated_box_uses_its_local_frame() {
        let cube = Shape::Box {
            center: Vec3::new(5.0, 0.0, 0.0),
            half_extents: Vec3::new(1.0, 1.0, 1.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
        };
        let (t, n) = cube.intersect(Vec3::ZERO, Vec3::X).unwrap();
        // the corner of the rotated cube points at the origin
        assert!((t - (5.0 - std::f32::consts::SQRT_2)).abs() < 1e-4);
        assert!(n.dot(Vec3::NEG_X) > 0.0);
    }

    #[test]
    fn validation_rejects_degenerate_shapes() {
        let bad = [
            Shape::Plane {
                normal: Vec3::ZERO,
                offset: 1.0,
            },
            Shape::Sphere {
                center: Vec3::ZERO,
                radius: 0.0,
            },
            Shape::Box {
                center: Vec3::ZERO,
                half_extents: Vec3::new(1.0, 0.0, 1.0),
                rotation: Quat::IDENTITY,
            },
        ];
        for shape in bad {
            assert!(shape.validate().is_err(), "{shape:?}");
        }
    }
}
