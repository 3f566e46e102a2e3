/*
 * The placement solver: a pure function that fits a popup frame against an
 * anchor rectangle and the work area of the targeted output. All inputs are
 * integer screen-space rectangles; resolving logical coordinates and DPI is
 * the caller's job.
 *
 * When the ideal placement overflows the output, each axis is adjusted
 * independently with the precedence flip, then slide, then resize. A flip is
 * only kept when it fully resolves the overflow on its axis; a slide
 * translates by the minimum amount and is only kept when the frame then
 * fits; a resize shrinks the frame from the overflowing edges and never
 * grows it. If nothing resolves the overflow the frame is left where the
 * ideal placement put it, clipped by the output.
 */
use crate::geometry::{Point, Rect, Size};
use crate::positioner::{ConstraintAdjustment, PositionerAnchor};

/// Screen-space inputs for one placement. `owner_rect` is the owner's
/// resolved frame; it doubles as the anchor when no anchor rectangle was
/// supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementRequest {
    /// Anchor rectangle in screen space, when the positioner supplied one.
    pub anchor_rect: Option<Rect>,
    /// The owner's frame in screen space; the default anchor.
    pub owner_rect: Rect,
    /// Work area of the output the popup should appear on.
    pub output_rect: Rect,
    /// Outer frame size of the popup being placed.
    pub frame_size: Size,
    pub parent_anchor: PositionerAnchor,
    pub child_anchor: PositionerAnchor,
    /// Offset from the anchor point, in physical pixels.
    pub offset: Point,
    pub constraint_adjustment: ConstraintAdjustment,
}

/// One-dimensional span used while solving a single axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    lo: i32,
    hi: i32,
}

impl Span {
    fn fits_in(&self, lo: i32, hi: i32) -> bool {
        self.lo >= lo && self.hi <= hi
    }

    fn length(&self) -> i32 {
        self.hi - self.lo
    }
}

/// The ideal (unconstrained) placement for the given anchor configuration.
fn attached_rect(
    anchor_rect: &Rect,
    parent_anchor: PositionerAnchor,
    child_anchor: PositionerAnchor,
    offset: Point,
    frame_size: Size,
) -> Rect {
    let anchor_point = parent_anchor.position_on(anchor_rect);
    let attach_at = Point::new(anchor_point.x + offset.x, anchor_point.y + offset.y);
    Rect::new(child_anchor.origin_for(attach_at, frame_size), frame_size)
}

/// Resolves one axis. `flipped` is the span the mirrored placement would
/// occupy, present only when flipping is enabled for this axis.
fn resolve_axis(span: Span, out_lo: i32, out_hi: i32, flipped: Option<Span>, slide: bool, resize: bool) -> Span {
    if span.fits_in(out_lo, out_hi) {
        return span;
    }

    // Flip wins only when the mirrored placement fully fits.
    if let Some(candidate) = flipped
        && candidate.fits_in(out_lo, out_hi)
    {
        return candidate;
    }

    if slide {
        let length = span.length();
        let mut lo = span.lo;
        if span.hi > out_hi {
            lo = out_hi - length;
        }
        if lo < out_lo {
            lo = out_lo;
        }
        let slid = Span { lo, hi: lo + length };
        if slid.fits_in(out_lo, out_hi) {
            return slid;
        }
    }

    if resize {
        let lo = span.lo.max(out_lo);
        let hi = span.hi.min(out_hi);
        if lo < hi {
            return Span { lo, hi };
        }
    }

    // Nothing resolved the overflow; stay clipped rather than fail.
    span
}

/// Computes the final window rectangle for a popup. Pure: identical inputs
/// always yield the identical rectangle.
pub fn place_window(request: &PlacementRequest) -> Rect {
    let anchor_rect = request.anchor_rect.unwrap_or(request.owner_rect);
    let adjustment = request.constraint_adjustment;

    let ideal = attached_rect(
        &anchor_rect,
        request.parent_anchor,
        request.child_anchor,
        request.offset,
        request.frame_size,
    );

    // The mirrored candidates swap the anchor pair and negate the offset on
    // the mirrored axis.
    let flipped_x = adjustment.contains(ConstraintAdjustment::FLIP_X).then(|| {
        attached_rect(
            &anchor_rect,
            request.parent_anchor.flipped_horizontally(),
            request.child_anchor.flipped_horizontally(),
            Point::new(-request.offset.x, request.offset.y),
            request.frame_size,
        )
    });
    let flipped_y = adjustment.contains(ConstraintAdjustment::FLIP_Y).then(|| {
        attached_rect(
            &anchor_rect,
            request.parent_anchor.flipped_vertically(),
            request.child_anchor.flipped_vertically(),
            Point::new(request.offset.x, -request.offset.y),
            request.frame_size,
        )
    });

    let output = request.output_rect;
    let horizontal = resolve_axis(
        Span {
            lo: ideal.left(),
            hi: ideal.right(),
        },
        output.left(),
        output.right(),
        flipped_x.map(|rect| Span {
            lo: rect.left(),
            hi: rect.right(),
        }),
        adjustment.contains(ConstraintAdjustment::SLIDE_X),
        adjustment.contains(ConstraintAdjustment::RESIZE_X),
    );
    let vertical = resolve_axis(
        Span {
            lo: ideal.top(),
            hi: ideal.bottom(),
        },
        output.top(),
        output.bottom(),
        flipped_y.map(|rect| Span {
            lo: rect.top(),
            hi: rect.bottom(),
        }),
        adjustment.contains(ConstraintAdjustment::SLIDE_Y),
        adjustment.contains(ConstraintAdjustment::RESIZE_Y),
    );

    Rect::from_ltrb(horizontal.lo, vertical.lo, horizontal.hi, vertical.hi)
}
