//! Spatial world owning every simulated body.
//!
//! Bodies are circles stored in an arena and addressed by [`BodyHandle`].
//! Each body records which entity owns it through [`BodyOwner`], so lookups
//! go body -> owner kind + id without the body holding the entity itself.

use shared::Species;

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    ///Value along the x-axis.
    /// Positive direction is to the right.
    pub x: f32,
    ///Value along the y-axis.
    /// Positive direction is down, matching client screen space.
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }

    ///Unit vector pointing along `angle` radians.
    pub fn from_angle(angle: f32) -> Vector2 {
        Vector2 {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the normalized vector.
    pub fn normalize(&self) -> Vector2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vector2 { x: 0.0, y: 0.0 }
        } else {
            Vector2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vector2 {
        Vector2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    ///Returns the difference `self - other`.
    pub fn sub(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    ///Straight-line distance between two points.
    pub fn distance(&self, other: &Vector2) -> f32 {
        self.sub(other).magnitude()
    }
}

/// The entity a body belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyOwner {
    Avatar(u16),
    Creature(Species, u16),
    /// Index into the world's collectable table.
    Collectable(usize),
}

/// Index of a body inside the [`World`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(usize);

///A circular body.
#[derive(Debug, Clone, Copy)]
pub struct Body {
    ///The positional center of the body.
    pub position: Vector2,
    pub velocity: Vector2,
    pub radius: f32,
    ///Static bodies never move and push dynamic bodies out of themselves.
    pub is_static: bool,
    pub owner: BodyOwner,
}

impl Body {
    pub fn overlaps_circle(&self, center: &Vector2, radius: f32) -> bool {
        self.position.distance(center) < self.radius + radius
    }
}

/// Owner of all bodies, bounded by the map rectangle `[0, width] x [0, height]`.
#[derive(Debug, Clone)]
pub struct World {
    bodies: Vec<Option<Body>>,
    free: Vec<usize>,
    width: f32,
    height: f32,
}

impl World {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            bodies: Vec::new(),
            free: Vec::new(),
            width,
            height,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Adds a circular body and returns its handle. Freed slots are reused.
    pub fn create_circle(
        &mut self,
        position: Vector2,
        radius: f32,
        is_static: bool,
        owner: BodyOwner,
    ) -> BodyHandle {
        let body = Body {
            position: self.clamp_to_bounds(position, radius),
            velocity: Vector2::ZERO,
            radius,
            is_static,
            owner,
        };

        match self.free.pop() {
            Some(index) => {
                self.bodies[index] = Some(body);
                BodyHandle(index)
            }
            None => {
                self.bodies.push(Some(body));
                BodyHandle(self.bodies.len() - 1)
            }
        }
    }

    pub fn remove(&mut self, handle: BodyHandle) -> Option<Body> {
        let removed = self.bodies.get_mut(handle.0)?.take();
        if removed.is_some() {
            self.free.push(handle.0);
        }
        removed
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle.0)?.as_ref()
    }

    /// Position of a body, or the origin if the handle is stale.
    pub fn position(&self, handle: BodyHandle) -> Vector2 {
        self.get(handle).map_or(Vector2::ZERO, |body| body.position)
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: Vector2) {
        if let Some(Some(body)) = self.bodies.get_mut(handle.0) {
            if !body.is_static {
                body.velocity = velocity;
            }
        }
    }

    pub fn set_position(&mut self, handle: BodyHandle, position: Vector2) {
        let Some(radius) = self.get(handle).map(|body| body.radius) else {
            return;
        };
        let clamped = self.clamp_to_bounds(position, radius);
        if let Some(Some(body)) = self.bodies.get_mut(handle.0) {
            body.position = clamped;
        }
    }

    /// Returns every body overlapping the given circle, in arena order.
    pub fn query_circle(&self, center: Vector2, radius: f32) -> Vec<(BodyHandle, BodyOwner)> {
        self.bodies
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|body| (index, body)))
            .filter(|(_, body)| body.overlaps_circle(&center, radius))
            .map(|(index, body)| (BodyHandle(index), body.owner))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bodies.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    ///Integrates every dynamic body over `dt` seconds, then pushes it out of
    ///static bodies and back inside the map bounds.
    pub fn step(&mut self, dt: f32) {
        let statics: Vec<Body> = self
            .bodies
            .iter()
            .flatten()
            .filter(|body| body.is_static)
            .copied()
            .collect();
        let (width, height) = (self.width, self.height);

        for body in self.bodies.iter_mut().flatten() {
            if body.is_static {
                continue;
            }

            body.position = body.position.add(&body.velocity.scale(dt));
            Self::resolve_static_overlaps(body, &statics);
            body.position = Self::clamp(body.position, body.radius, width, height);
        }
    }

    ///Moves a dynamic body to the surface of any static body it penetrates.
    fn resolve_static_overlaps(body: &mut Body, statics: &[Body]) {
        for other in statics {
            let offset = body.position.sub(&other.position);
            let distance = offset.magnitude();
            let min_distance = body.radius + other.radius;

            if distance >= min_distance {
                continue;
            }

            // Coincident centres have no separating axis; push straight up.
            let normal = if distance < 0.001 {
                Vector2::new(0.0, -1.0)
            } else {
                offset.scale(1.0 / distance)
            };
            body.position = other.position.add(&normal.scale(min_distance));
        }
    }

    fn clamp_to_bounds(&self, position: Vector2, radius: f32) -> Vector2 {
        Self::clamp(position, radius, self.width, self.height)
    }

    fn clamp(position: Vector2, radius: f32, width: f32, height: f32) -> Vector2 {
        Vector2 {
            x: position.x.max(radius).min((width - radius).max(radius)),
            y: position.y.max(radius).min((height - radius).max(radius)),
        }
    }
}
