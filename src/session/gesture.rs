//! Swipe detection from rendition touch notifications.

use crate::engine::TouchPoint;

use super::navigation::Direction;

/// Tracks one touch gesture from touchstart to touchend.
///
/// The end position is the last touchmove point; the touchend coordinates
/// are not used.
#[derive(Debug, Default)]
pub struct SwipeTracker {
    start: Option<TouchPoint>,
    last: Option<TouchPoint>,
}

impl SwipeTracker {
    pub fn start(&mut self, point: TouchPoint) {
        self.start = Some(point);
        self.last = Some(point);
    }

    pub fn moved(&mut self, point: TouchPoint) {
        if self.start.is_some() {
            self.last = Some(point);
        }
    }

    /// Finish the gesture. Dragging left beyond `threshold` pixels turns to
    /// the next page, dragging right to the previous one. Gestures that move
    /// further vertically than horizontally are scrolls, not page turns.
    pub fn end(&mut self, threshold: f64) -> Option<Direction> {
        let start = self.start.take();
        let last = self.last.take();
        let (start, last) = (start?, last?);

        let dx = start.x - last.x;
        let dy = start.y - last.y;
        if dy.abs() > dx.abs() {
            return None;
        }
        if dx > threshold {
            Some(Direction::Next)
        } else if dx < -threshold {
            Some(Direction::Prev)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.start = None;
        self.last = None;
    }
}
