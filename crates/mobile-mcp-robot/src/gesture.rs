//! Swipe geometry
//!
//! Android and WebDriverAgent use different geometry for the same gesture, so
//! each backend owns its own path builder; both produce a [`SwipePath`].

use mobile_mcp_protocol::ScreenSize;

/// Start and end point of a straight swipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipePath {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl SwipePath {
    /// Whether both endpoints lie inside `[0, width] x [0, height]`
    pub fn is_within(&self, size: ScreenSize) -> bool {
        let w = size.width as i64;
        let h = size.height as i64;
        [(self.x0, self.y0), (self.x1, self.y1)]
            .iter()
            .all(|&(x, y)| (0..=w).contains(&(x as i64)) && (0..=h).contains(&(y as i64)))
    }

    /// Length of the swipe along its axis
    pub fn length(&self) -> i32 {
        self.x1
            .saturating_sub(self.x0)
            .saturating_abs()
            .max(self.y1.saturating_sub(self.y0).saturating_abs())
    }
}

/// `floor(value * percent / 100)` without going through floats
pub(crate) fn percent_of(value: u32, percent: u32) -> i32 {
    (value as u64 * percent as u64 / 100) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of_floors() {
        assert_eq!(percent_of(2400, 80), 1920);
        assert_eq!(percent_of(1079, 50), 539);
        assert_eq!(percent_of(7, 30), 2);
    }

    #[test]
    fn test_is_within() {
        let size = ScreenSize {
            width: 100,
            height: 200,
            scale: 1.0,
        };
        let inside = SwipePath {
            x0: 0,
            y0: 200,
            x1: 100,
            y1: 0,
        };
        assert!(inside.is_within(size));
        assert!(!SwipePath { x1: 101, ..inside }.is_within(size));
        assert!(!SwipePath { y0: -1, ..inside }.is_within(size));
        assert_eq!(inside.length(), 200);
    }
}
