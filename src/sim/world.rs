//! Built-in rigid-body world
//!
//! A small impulse solver good enough to drop and stack circles inside static
//! walls. It is not physically exact: contacts are resolved pairwise with
//! positional correction and a restitution impulse, a few passes per step.
//!
//! Dynamic polygons collide as their bounding circle. Static bodies are
//! either circles or convex polygons.
//!
//! Collision-start pairs are reported in detection order, which is ascending
//! `(lower id, higher id)` within a pass. A pair is reported again only after
//! it has been apart for at least one full step.

use std::collections::{BTreeMap, HashSet};

use glam::Vec2;

use super::physics::{BodyId, BodyShape, BodySpec, CollisionPair, Kinematics, PhysicsAdapter};

/// Bodies closer than this are considered touching (absorbs resting jitter)
const CONTACT_SLOP: f32 = 0.05;

#[derive(Debug, Clone)]
enum Collider {
    Circle { radius: f32 },
    /// Convex polygon in world coordinates (static bodies only)
    Polygon { vertices: Vec<Vec2> },
}

#[derive(Debug, Clone)]
struct Body {
    collider: Collider,
    pos: Vec2,
    vel: Vec2,
    inv_mass: f32,
    restitution: f32,
}

impl Body {
    fn is_static(&self) -> bool {
        self.inv_mass == 0.0
    }
}

/// Contact between two bodies; `normal` points from the first to the second
#[derive(Debug, Clone, Copy)]
struct Contact {
    normal: Vec2,
    penetration: f32,
}

/// Gravity + circles + static walls
#[derive(Debug, Clone)]
pub struct CircleWorld {
    gravity: Vec2,
    iterations: u32,
    bodies: BTreeMap<BodyId, Body>,
    /// Pairs touching at the end of the previous step, keyed `(min, max)`
    touching: HashSet<(BodyId, BodyId)>,
    next_id: u32,
}

impl CircleWorld {
    /// `gravity` in px/s² (+y is down), `iterations` contact passes per step
    pub fn new(gravity: Vec2, iterations: u32) -> Self {
        Self {
            gravity,
            iterations: iterations.max(1),
            bodies: BTreeMap::new(),
            touching: HashSet::new(),
            next_id: 1,
        }
    }

    pub fn from_settings(settings: &crate::settings::Settings) -> Self {
        Self::new(Vec2::new(0.0, settings.gravity), settings.solver_iterations)
    }

    fn contact(a: &Body, b: &Body) -> Option<Contact> {
        match (&a.collider, &b.collider) {
            (Collider::Circle { radius: ra }, Collider::Circle { radius: rb }) => {
                circle_circle(a.pos, *ra, b.pos, *rb)
            }
            (Collider::Circle { radius }, Collider::Polygon { vertices }) => {
                // circle_polygon's normal points from polygon to circle
                circle_polygon(a.pos, *radius, vertices).map(|c| Contact {
                    normal: -c.normal,
                    penetration: c.penetration,
                })
            }
            (Collider::Polygon { vertices }, Collider::Circle { radius }) => {
                circle_polygon(b.pos, *radius, vertices)
            }
            (Collider::Polygon { .. }, Collider::Polygon { .. }) => None,
        }
    }

    /// One detection + response pass. Returns touching pairs in detection order.
    fn solve_pass(&mut self) -> Vec<(BodyId, BodyId)> {
        let ids: Vec<BodyId> = self.bodies.keys().copied().collect();
        let mut touched = Vec::new();

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (id_a, id_b) = (ids[i], ids[j]);
                let (Some(a), Some(b)) = (self.bodies.get(&id_a), self.bodies.get(&id_b)) else {
                    continue;
                };
                if a.is_static() && b.is_static() {
                    continue;
                }
                let Some(contact) = Self::contact(a, b) else {
                    continue;
                };
                touched.push((id_a, id_b));

                let (ia, ib) = (a.inv_mass, b.inv_mass);
                let inv_sum = ia + ib;
                let restitution = a.restitution.max(b.restitution);
                let n = contact.normal;

                // Positional correction, split by inverse mass
                let depth = (contact.penetration - CONTACT_SLOP).max(0.0);
                let correction = n * depth / inv_sum;

                // Restitution impulse along the normal if approaching
                let rel = b.vel - a.vel;
                let vn = rel.dot(n);
                let impulse = if vn < 0.0 {
                    n * (-(1.0 + restitution) * vn / inv_sum)
                } else {
                    Vec2::ZERO
                };

                if let Some(a) = self.bodies.get_mut(&id_a) {
                    a.pos -= correction * ia;
                    a.vel -= impulse * ia;
                }
                if let Some(b) = self.bodies.get_mut(&id_b) {
                    b.pos += correction * ib;
                    b.vel += impulse * ib;
                }
            }
        }

        touched
    }
}

impl PhysicsAdapter for CircleWorld {
    fn add_body(&mut self, spec: &BodySpec) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;

        let collider = match (&spec.shape, spec.is_static) {
            (BodyShape::Circle { radius }, _) => Collider::Circle { radius: *radius },
            (BodyShape::Polygon { vertices }, true) => Collider::Polygon {
                vertices: vertices.iter().map(|v| *v + spec.position).collect(),
            },
            (shape @ BodyShape::Polygon { .. }, false) => Collider::Circle {
                radius: shape.bounding_radius(),
            },
        };

        let inv_mass = if spec.is_static || spec.mass <= 0.0 {
            0.0
        } else {
            1.0 / spec.mass
        };

        self.bodies.insert(
            id,
            Body {
                collider,
                pos: spec.position,
                vel: if spec.is_static { Vec2::ZERO } else { spec.velocity },
                inv_mass,
                restitution: spec.restitution,
            },
        );
        id
    }

    fn remove_body(&mut self, id: BodyId) {
        if self.bodies.remove(&id).is_some() {
            self.touching.retain(|&(a, b)| a != id && b != id);
        }
    }

    fn step(&mut self, dt: f32) -> Vec<CollisionPair> {
        // Semi-implicit Euler
        for body in self.bodies.values_mut() {
            if body.is_static() {
                continue;
            }
            body.vel += self.gravity * dt;
            body.pos += body.vel * dt;
        }

        let mut started = Vec::new();
        let mut now_touching = HashSet::new();
        for _ in 0..self.iterations {
            for key in self.solve_pass() {
                if now_touching.insert(key) && !self.touching.contains(&key) {
                    started.push(CollisionPair::new(key.0, key.1));
                }
            }
        }
        self.touching = now_touching;

        started
    }

    fn kinematics(&self, id: BodyId) -> Option<Kinematics> {
        self.bodies.get(&id).map(|b| Kinematics {
            position: b.pos,
            velocity: b.vel,
        })
    }

    fn contains(&self, id: BodyId) -> bool {
        self.bodies.contains_key(&id)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

/// Circle–circle contact, normal from `a` to `b`
fn circle_circle(pa: Vec2, ra: f32, pb: Vec2, rb: f32) -> Option<Contact> {
    let delta = pb - pa;
    let dist = delta.length();
    let reach = ra + rb;
    if dist >= reach + CONTACT_SLOP {
        return None;
    }
    // Coincident centers: push apart horizontally
    let normal = if dist > 1e-6 { delta / dist } else { Vec2::X };
    Some(Contact {
        normal,
        penetration: reach - dist,
    })
}

/// Circle–convex polygon contact, normal from the polygon to the circle
fn circle_polygon(center: Vec2, radius: f32, vertices: &[Vec2]) -> Option<Contact> {
    if vertices.len() < 2 {
        return None;
    }

    let mut closest = vertices[0];
    let mut best = f32::MAX;
    let mut inside = vertices.len() >= 3;
    let mut winding = 0.0_f32;

    for i in 0..vertices.len() {
        let p0 = vertices[i];
        let p1 = vertices[(i + 1) % vertices.len()];
        let edge = p1 - p0;

        let point = closest_point_on_segment(center, p0, p1);
        let d = (center - point).length_squared();
        if d < best {
            best = d;
            closest = point;
        }

        // Inside test: the center is on the same side of every edge
        let side = edge.perp_dot(center - p0);
        if side != 0.0 {
            if winding == 0.0 {
                winding = side.signum();
            } else if side.signum() != winding {
                inside = false;
            }
        }
    }

    let dist = best.sqrt();
    if inside {
        let normal = if dist > 1e-6 {
            (closest - center) / dist
        } else {
            Vec2::NEG_Y
        };
        return Some(Contact {
            normal,
            penetration: radius + dist,
        });
    }

    if dist >= radius + CONTACT_SLOP {
        return None;
    }
    let normal = if dist > 1e-6 {
        (center - closest) / dist
    } else {
        Vec2::NEG_Y
    };
    Some(Contact {
        normal,
        penetration: radius - dist,
    })
}

fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-8 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}
