//! W3C pointer-action scripts and WebDriverAgent swipe geometry

use crate::constants::{
    DOUBLE_TAP_GAP_MS, DOUBLE_TAP_HOLD_MS, LONG_PRESS_DURATION_MS, SWIPE_DURATION_MS, TAP_HOLD_MS,
};
use crate::gesture::{SwipePath, percent_of};
use mobile_mcp_protocol::{ScreenSize, SwipeDirection};
use serde_json::{Value, json};

fn move_to(x: i32, y: i32, duration: u32) -> Value {
    json!({ "type": "pointerMove", "duration": duration, "x": x, "y": y })
}

fn down() -> Value {
    json!({ "type": "pointerDown", "button": 0 })
}

fn up() -> Value {
    json!({ "type": "pointerUp", "button": 0 })
}

fn pause(duration: u32) -> Value {
    json!({ "type": "pause", "duration": duration })
}

/// Wrap pointer steps in a single-finger touch script
pub(crate) fn touch_script(steps: Vec<Value>) -> Value {
    json!({
        "actions": [
            {
                "type": "pointer",
                "id": "finger1",
                "parameters": { "pointerType": "touch" },
                "actions": steps,
            }
        ]
    })
}

/// Press and hold at a point
pub(crate) fn press(x: i32, y: i32, hold_ms: u32) -> Value {
    touch_script(vec![move_to(x, y, 0), down(), pause(hold_ms), up()])
}

pub(crate) fn tap(x: i32, y: i32) -> Value {
    press(x, y, TAP_HOLD_MS)
}

pub(crate) fn long_press(x: i32, y: i32) -> Value {
    press(x, y, LONG_PRESS_DURATION_MS)
}

pub(crate) fn double_tap(x: i32, y: i32) -> Value {
    touch_script(vec![
        move_to(x, y, 0),
        down(),
        pause(DOUBLE_TAP_HOLD_MS),
        up(),
        pause(DOUBLE_TAP_GAP_MS),
        down(),
        pause(DOUBLE_TAP_HOLD_MS),
        up(),
    ])
}

pub(crate) fn drag(path: SwipePath) -> Value {
    touch_script(vec![
        move_to(path.x0, path.y0, 0),
        down(),
        move_to(path.x1, path.y1, SWIPE_DURATION_MS),
        up(),
    ])
}

/// Center swipe covering 60% of the travelling axis
pub(crate) fn swipe_path(size: ScreenSize, direction: SwipeDirection) -> SwipePath {
    let center_x = (size.width / 2) as i32;
    let center_y = (size.height / 2) as i32;
    let half_v = percent_of(size.height, 60) / 2;
    let half_h = percent_of(size.width, 60) / 2;
    match direction {
        SwipeDirection::Up => SwipePath {
            x0: center_x,
            y0: center_y + half_v,
            x1: center_x,
            y1: center_y - half_v,
        },
        SwipeDirection::Down => SwipePath {
            x0: center_x,
            y0: center_y - half_v,
            x1: center_x,
            y1: center_y + half_v,
        },
        SwipeDirection::Left => SwipePath {
            x0: center_x + half_h,
            y0: center_y,
            x1: center_x - half_h,
            y1: center_y,
        },
        SwipeDirection::Right => SwipePath {
            x0: center_x - half_h,
            y0: center_y,
            x1: center_x + half_h,
            y1: center_y,
        },
    }
}

/// Swipe from a point by `distance` points; not clamped to the screen but
/// saturating at the `i32` range
pub(crate) fn swipe_from_coordinate_path(
    x: i32,
    y: i32,
    direction: SwipeDirection,
    distance: i32,
) -> SwipePath {
    let (x1, y1) = match direction {
        SwipeDirection::Up => (x, y.saturating_sub(distance)),
        SwipeDirection::Down => (x, y.saturating_add(distance)),
        SwipeDirection::Left => (x.saturating_sub(distance), y),
        SwipeDirection::Right => (x.saturating_add(distance), y),
    };
    SwipePath { x0: x, y0: y, x1, y1 }
}
