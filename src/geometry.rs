/*
 * Geometry primitives used throughout the crate. Two coordinate spaces exist
 * side by side: physical (screen) space is integer pixels, logical space is
 * DPI-independent and fractional. Conversions always go logical -> physical
 * through an explicit scale factor; physical coordinates are never divided
 * back implicitly.
 *
 * These types are portable on purpose so the placement solver and its tests
 * compile on every platform.
 */

/// A point in physical screen space, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A size in physical screen space, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle in physical screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub const fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            origin: Point::new(left, top),
            size: Size::new(right - left, bottom - top),
        }
    }

    pub const fn left(&self) -> i32 {
        self.origin.x
    }

    pub const fn top(&self) -> i32 {
        self.origin.y
    }

    pub const fn right(&self) -> i32 {
        self.origin.x + self.size.width
    }

    pub const fn bottom(&self) -> i32 {
        self.origin.y + self.size.height
    }

    pub const fn width(&self) -> i32 {
        self.size.width
    }

    pub const fn height(&self) -> i32 {
        self.size.height
    }

    /// True when `other` lies entirely inside `self` (edges may touch).
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// A point in DPI-independent logical space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LogicalPoint {
    pub x: f64,
    pub y: f64,
}

impl LogicalPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Scales into physical pixels. Truncates toward zero, matching the
    /// native coordinate casts used elsewhere.
    pub fn to_physical(&self, scale: f64) -> Point {
        Point::new((self.x * scale) as i32, (self.y * scale) as i32)
    }
}

/// A size in DPI-independent logical space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LogicalSize {
    pub width: f64,
    pub height: f64,
}

impl LogicalSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn to_physical(&self, scale: f64) -> Size {
        Size::new((self.width * scale) as i32, (self.height * scale) as i32)
    }
}

/// A rectangle in DPI-independent logical space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LogicalRect {
    pub origin: LogicalPoint,
    pub size: LogicalSize,
}

impl LogicalRect {
    pub const fn new(origin: LogicalPoint, size: LogicalSize) -> Self {
        Self { origin, size }
    }

    pub fn to_physical(&self, scale: f64) -> Rect {
        Rect::new(self.origin.to_physical(scale), self.size.to_physical(scale))
    }
}
