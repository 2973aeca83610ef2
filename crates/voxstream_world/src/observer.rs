//! Observer position sources and pass triggering.

use voxstream_shared::Vec3;

/// Supplies the observer position. Polled once per step.
pub trait ObserverSource {
    /// Current world-space position.
    fn current_position(&self) -> Vec3;
}

impl ObserverSource for Vec3 {
    #[inline]
    fn current_position(&self) -> Vec3 {
        *self
    }
}

/// Observer backed by a closure.
///
/// ```rust,ignore
/// let camera = Cell::new(Vec3::ZERO);
/// let observer = FnObserver(|| camera.get());
/// streamer.step(&observer);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FnObserver<F>(pub F);

impl<F: Fn() -> Vec3> ObserverSource for FnObserver<F> {
    #[inline]
    fn current_position(&self) -> Vec3 {
        (self.0)()
    }
}

/// Why a streaming pass ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassTrigger {
    /// No pass has run yet.
    FirstStep,
    /// The observer entered another cell (or chunk).
    CellChanged,
    /// The observer moved past the re-stream distance.
    Moved,
    /// The previous pass ran out of budget.
    Backlog,
    /// Requested explicitly (regeneration, repair).
    Forced,
}

/// Remembers where the last pass ran.
#[derive(Clone, Copy, Debug)]
pub struct MotionTracker<C> {
    last_position: Option<Vec3>,
    last_cell: Option<C>,
    horizontal: bool,
}

impl<C: Copy + PartialEq> MotionTracker<C> {
    /// Tracks full 3D movement.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_position: None,
            last_cell: None,
            horizontal: false,
        }
    }

    /// Tracks movement in the XY plane only.
    #[must_use]
    pub const fn horizontal() -> Self {
        Self {
            last_position: None,
            last_cell: None,
            horizontal: true,
        }
    }

    /// Movement-based trigger for an observer at `position` in `cell`, if any.
    #[must_use]
    pub fn trigger(&self, position: Vec3, cell: C, threshold: f64) -> Option<PassTrigger> {
        let (Some(last_position), Some(last_cell)) = (self.last_position, self.last_cell) else {
            return Some(PassTrigger::FirstStep);
        };
        if last_cell != cell {
            return Some(PassTrigger::CellChanged);
        }
        let moved = if self.horizontal {
            position.distance_xy(last_position)
        } else {
            position.distance(last_position)
        };
        (moved > threshold).then_some(PassTrigger::Moved)
    }

    /// Records a pass at `position` in `cell`.
    pub fn record(&mut self, position: Vec3, cell: C) {
        self.last_position = Some(position);
        self.last_cell = Some(cell);
    }

    /// Cell of the last pass.
    #[must_use]
    pub const fn last_cell(&self) -> Option<C> {
        self.last_cell
    }

    /// Forgets the last pass.
    pub fn reset(&mut self) {
        self.last_position = None;
        self.last_cell = None;
    }
}

impl<C: Copy + PartialEq> Default for MotionTracker<C> {
    fn default() -> Self {
        Self::new()
    }
}
