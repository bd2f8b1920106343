//! Boundary to the rigid-body engine
//!
//! The merge core never integrates motion itself. It hands bodies to a
//! [`PhysicsAdapter`], steps it, and reacts to the collision-start pairs the
//! step reports. [`super::world::CircleWorld`] is the built-in implementation;
//! tests use scripted doubles.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable identity of a body for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Collider shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyShape {
    Circle { radius: f32 },
    /// Convex polygon, vertices relative to the body position
    Polygon { vertices: Vec<Vec2> },
}

impl BodyShape {
    /// Axis-aligned box centered on the body position
    pub fn rectangle(width: f32, height: f32) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        BodyShape::Polygon {
            vertices: vec![
                Vec2::new(-hw, -hh),
                Vec2::new(hw, -hh),
                Vec2::new(hw, hh),
                Vec2::new(-hw, hh),
            ],
        }
    }

    /// Radius of the smallest origin-centered circle containing the shape
    pub fn bounding_radius(&self) -> f32 {
        match self {
            BodyShape::Circle { radius } => *radius,
            BodyShape::Polygon { vertices } => {
                vertices.iter().map(|v| v.length()).fold(0.0, f32::max)
            }
        }
    }
}

/// Everything an adapter needs to create a body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub shape: BodyShape,
    pub position: Vec2,
    pub velocity: Vec2,
    pub restitution: f32,
    pub mass: f32,
    pub is_static: bool,
}

impl BodySpec {
    /// Immovable body (walls, floor)
    pub fn fixed(shape: BodyShape, position: Vec2) -> Self {
        Self {
            shape,
            position,
            velocity: Vec2::ZERO,
            restitution: 0.0,
            mass: 0.0,
            is_static: true,
        }
    }
}

/// Position and velocity of a live body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Two bodies that started touching during one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionPair {
    pub a: BodyId,
    pub b: BodyId,
}

impl CollisionPair {
    pub fn new(a: BodyId, b: BodyId) -> Self {
        Self { a, b }
    }

    /// Order-independent key, `(min, max)`
    pub fn key(&self) -> (BodyId, BodyId) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }

    pub fn involves(&self, id: BodyId) -> bool {
        self.a == id || self.b == id
    }
}

/// What the merge core requires from a physics engine.
///
/// Called only from the simulation driver's thread.
pub trait PhysicsAdapter {
    /// Create a body and return its identity
    fn add_body(&mut self, spec: &BodySpec) -> BodyId;

    /// Remove a body. Removing an unknown or already-removed id is a no-op.
    fn remove_body(&mut self, id: BodyId);

    /// Advance by `dt` seconds and return the pairs that started colliding,
    /// in a stable, deterministic order.
    fn step(&mut self, dt: f32) -> Vec<CollisionPair>;

    /// Kinematic state of a live body
    fn kinematics(&self, id: BodyId) -> Option<Kinematics>;

    fn contains(&self, id: BodyId) -> bool {
        self.kinematics(id).is_some()
    }

    /// Number of bodies the engine currently simulates, walls included
    fn body_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_order_independent() {
        let p = CollisionPair::new(BodyId(9), BodyId(2));
        let q = CollisionPair::new(BodyId(2), BodyId(9));
        assert_eq!(p.key(), q.key());
        assert_eq!(p.key(), (BodyId(2), BodyId(9)));
        assert!(p.involves(BodyId(9)));
        assert!(!p.involves(BodyId(3)));
    }

    #[test]
    fn test_rectangle_bounding_radius() {
        let shape = BodyShape::rectangle(6.0, 8.0);
        assert!((shape.bounding_radius() - 5.0).abs() < 1e-6);
        assert_eq!(BodyShape::Circle { radius: 3.0 }.bounding_radius(), 3.0);
    }
}
