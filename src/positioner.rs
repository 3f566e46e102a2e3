/*
 * The positioner: the rule set that governs where a popup is placed relative
 * to its owner. An anchor rectangle (in the owner's logical space) plus a
 * pair of anchor points select the ideal position; the constraint-adjustment
 * flags describe which fallbacks may be applied when that position overflows
 * the output's work area.
 */
use bitflags::bitflags;

use crate::geometry::{LogicalPoint, LogicalRect, Point, Rect, Size};

/// A reference point on a rectangle: the center, the midpoint of an edge, or
/// a corner. Used both to pick the point on the anchor rectangle and the
/// point on the popup frame that is attached to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionerAnchor {
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl PositionerAnchor {
    /// Mirror across the vertical axis (left and right swap).
    pub(crate) fn flipped_horizontally(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::TopLeft => Self::TopRight,
            Self::TopRight => Self::TopLeft,
            Self::BottomLeft => Self::BottomRight,
            Self::BottomRight => Self::BottomLeft,
            other => other,
        }
    }

    /// Mirror across the horizontal axis (top and bottom swap).
    pub(crate) fn flipped_vertically(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            Self::TopLeft => Self::BottomLeft,
            Self::BottomLeft => Self::TopLeft,
            Self::TopRight => Self::BottomRight,
            Self::BottomRight => Self::TopRight,
            other => other,
        }
    }

    /// The selected point on `rect`, in the same space as `rect`.
    pub(crate) fn position_on(self, rect: &Rect) -> Point {
        let mid_x = rect.left() + rect.width() / 2;
        let mid_y = rect.top() + rect.height() / 2;
        match self {
            Self::Center => Point::new(mid_x, mid_y),
            Self::Top => Point::new(mid_x, rect.top()),
            Self::Bottom => Point::new(mid_x, rect.bottom()),
            Self::Left => Point::new(rect.left(), mid_y),
            Self::Right => Point::new(rect.right(), mid_y),
            Self::TopLeft => Point::new(rect.left(), rect.top()),
            Self::TopRight => Point::new(rect.right(), rect.top()),
            Self::BottomLeft => Point::new(rect.left(), rect.bottom()),
            Self::BottomRight => Point::new(rect.right(), rect.bottom()),
        }
    }

    /// Origin for a rectangle of `size` whose point selected by `self` lands
    /// on `at`.
    pub(crate) fn origin_for(self, at: Point, size: Size) -> Point {
        let half_w = size.width / 2;
        let half_h = size.height / 2;
        match self {
            Self::Center => Point::new(at.x - half_w, at.y - half_h),
            Self::Top => Point::new(at.x - half_w, at.y),
            Self::Bottom => Point::new(at.x - half_w, at.y - size.height),
            Self::Left => Point::new(at.x, at.y - half_h),
            Self::Right => Point::new(at.x - size.width, at.y - half_h),
            Self::TopLeft => at,
            Self::TopRight => Point::new(at.x - size.width, at.y),
            Self::BottomLeft => Point::new(at.x, at.y - size.height),
            Self::BottomRight => Point::new(at.x - size.width, at.y - size.height),
        }
    }
}

bitflags! {
    /// Fallbacks the solver may apply, per axis, when the ideal placement
    /// overflows the output's work area. Precedence is flip, then slide,
    /// then resize.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ConstraintAdjustment: u32 {
        const SLIDE_X = 1 << 0;
        const SLIDE_Y = 1 << 1;
        const FLIP_X = 1 << 2;
        const FLIP_Y = 1 << 3;
        const RESIZE_X = 1 << 4;
        const RESIZE_Y = 1 << 5;
    }
}

/// Placement rule for a popup, expressed in the owner's logical coordinate
/// space.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPositioner {
    /// Rectangle the popup is anchored to, in the owner's logical space.
    /// When absent, the owner's entire visible frame is the anchor.
    pub anchor_rect: Option<LogicalRect>,
    /// Point on the anchor rectangle the popup attaches to.
    pub parent_anchor: PositionerAnchor,
    /// Point on the popup frame that is attached to the parent anchor.
    pub child_anchor: PositionerAnchor,
    /// Extra displacement applied after anchoring, in logical coordinates.
    pub offset: LogicalPoint,
    pub constraint_adjustment: ConstraintAdjustment,
}

impl Default for WindowPositioner {
    fn default() -> Self {
        Self {
            anchor_rect: None,
            parent_anchor: PositionerAnchor::Center,
            child_anchor: PositionerAnchor::Center,
            offset: LogicalPoint::new(0.0, 0.0),
            constraint_adjustment: ConstraintAdjustment::all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_flip_swaps_left_and_right_only() {
        assert_eq!(
            PositionerAnchor::TopLeft.flipped_horizontally(),
            PositionerAnchor::TopRight
        );
        assert_eq!(
            PositionerAnchor::Right.flipped_horizontally(),
            PositionerAnchor::Left
        );
        assert_eq!(
            PositionerAnchor::Top.flipped_horizontally(),
            PositionerAnchor::Top
        );
        assert_eq!(
            PositionerAnchor::Center.flipped_horizontally(),
            PositionerAnchor::Center
        );
    }

    #[test]
    fn vertical_flip_swaps_top_and_bottom_only() {
        assert_eq!(
            PositionerAnchor::TopLeft.flipped_vertically(),
            PositionerAnchor::BottomLeft
        );
        assert_eq!(
            PositionerAnchor::Bottom.flipped_vertically(),
            PositionerAnchor::Top
        );
        assert_eq!(
            PositionerAnchor::Left.flipped_vertically(),
            PositionerAnchor::Left
        );
    }

    #[test]
    fn anchor_positions_cover_edges_and_corners() {
        let rect = Rect::from_ltrb(0, 0, 100, 50);
        assert_eq!(
            PositionerAnchor::Center.position_on(&rect),
            Point::new(50, 25)
        );
        assert_eq!(
            PositionerAnchor::TopRight.position_on(&rect),
            Point::new(100, 0)
        );
        assert_eq!(
            PositionerAnchor::Bottom.position_on(&rect),
            Point::new(50, 50)
        );
    }

    #[test]
    fn child_origin_attaches_the_selected_point() {
        let size = Size::new(40, 20);
        let at = Point::new(100, 100);
        // Attaching the popup's bottom-right corner leaves the popup entirely
        // above and to the left of the anchor point.
        assert_eq!(
            PositionerAnchor::BottomRight.origin_for(at, size),
            Point::new(60, 80)
        );
        assert_eq!(PositionerAnchor::TopLeft.origin_for(at, size), at);
        assert_eq!(
            PositionerAnchor::Center.origin_for(at, size),
            Point::new(80, 90)
        );
    }
}
