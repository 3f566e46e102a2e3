/*
 * Provides the public entry point for the winhost crate, a Win32 host-window
 * layer for applications that embed a rendering engine. It manages a tree of
 * top-level windows (regular and owned popups), their DPI-aware geometry and
 * placement, show/state transitions, and the routing of native window
 * messages into the embedding application's callback.
 *
 * The library exposes only the safe API surface (`HostWindowController`,
 * `WindowCreationSettings`, the positioner/placement types, etc.) while
 * keeping Win32 internals scoped to the crate. Conditional compilation keeps
 * portable pieces (identifiers, geometry, the placement solver, the message
 * dispatch protocol, and the entity bookkeeping) available on every platform
 * so non-Windows builds can still compile and test logic that depends on
 * these types.
 */
#![cfg_attr(not(target_os = "windows"), allow(dead_code))]

#[cfg(target_os = "windows")]
pub mod controller;
pub(crate) mod dispatch;
#[cfg(target_os = "windows")]
pub(crate) mod dpi;
pub mod error;
pub mod geometry;
#[cfg(target_os = "windows")]
pub(crate) mod host_window;
pub mod placement;
pub mod positioner;
pub mod types;
pub(crate) mod window;

#[cfg(target_os = "windows")]
pub use controller::{HostMessage, HostWindowController};
pub use error::{PlatformError, Result as PlatformResult};
pub use geometry::{LogicalPoint, LogicalRect, LogicalSize, Point, Rect, Size};
pub use placement::{PlacementRequest, place_window};
pub use positioner::{ConstraintAdjustment, PositionerAnchor, WindowPositioner};
pub use types::{
    ViewId, WindowArchetype, WindowCreationSettings, WindowMetadata, WindowModificationSettings,
    WindowState,
};
