use serde::{Deserialize, Serialize};

/// World position of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub fn distance_sq(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn distance(&self, other: &Position) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Unit vector pointing from `self` towards `other`, or `(0, 0)` when the
    /// two points coincide.
    pub fn direction_to(&self, other: &Position) -> (f64, f64) {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len > f64::EPSILON && len.is_finite() {
            (dx / len, dy / len)
        } else {
            (0.0, 0.0)
        }
    }
}

/// A consumable food item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub id: u64,
    pub position: Position,
    /// Energy granted in full when eaten; health gains a fraction of it.
    pub nutrition: f64,
}

impl Food {
    pub const fn new(id: u64, x: f64, y: f64, nutrition: f64) -> Self {
        Self {
            id,
            position: Position::new(x, y),
            nutrition,
        }
    }
}

/// An external threat agents flee from. Predators are driven by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Predator {
    pub id: u64,
    pub position: Position,
    pub size: f64,
}

impl Predator {
    pub const fn new(id: u64, x: f64, y: f64, size: f64) -> Self {
        Self {
            id,
            position: Position::new(x, y),
            size,
        }
    }
}

/// Static world geometry agents must steer around.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Obstacle {
    Circle {
        center: Position,
        radius: f64,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

impl Obstacle {
    /// Point-vs-shape test with the shape inflated by `margin`.
    ///
    /// Degenerate shapes (non-finite or negative extents) never collide.
    pub fn collides(&self, point: &Position, margin: f64) -> bool {
        if !point.is_finite() {
            return false;
        }
        let margin = if margin.is_finite() { margin.max(0.0) } else { 0.0 };
        match *self {
            Obstacle::Circle { center, radius } => {
                if !center.is_finite() || !radius.is_finite() || radius < 0.0 {
                    return false;
                }
                let reach = radius + margin;
                point.distance_sq(&center) <= reach * reach
            }
            Obstacle::Rect {
                x,
                y,
                width,
                height,
            } => {
                if !(x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite())
                    || width < 0.0
                    || height < 0.0
                {
                    return false;
                }
                point.x >= x - margin
                    && point.x <= x + width + margin
                    && point.y >= y - margin
                    && point.y <= y + height + margin
            }
        }
    }
}
