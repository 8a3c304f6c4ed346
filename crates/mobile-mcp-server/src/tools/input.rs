//! Touch, key and navigation tools

use crate::errors::ToolError;
use crate::requests::to_device_units;
use mobile_mcp_protocol::{Button, SwipeDirection};
use mobile_mcp_robot::Robot;

pub async fn tap(robot: &dyn Robot, x: f64, y: f64) -> Result<String, ToolError> {
    robot.tap(to_device_units(x), to_device_units(y)).await?;
    Ok(format!("Clicked on screen at coordinates: {}, {}", x, y))
}

pub async fn double_tap(robot: &dyn Robot, x: f64, y: f64) -> Result<String, ToolError> {
    robot
        .double_tap(to_device_units(x), to_device_units(y))
        .await?;
    Ok(format!("Double-tapped on screen at coordinates: {}, {}", x, y))
}

pub async fn long_press(robot: &dyn Robot, x: f64, y: f64) -> Result<String, ToolError> {
    robot
        .long_press(to_device_units(x), to_device_units(y))
        .await?;
    Ok(format!("Long pressed on screen at coordinates: {}, {}", x, y))
}

pub async fn press_button(robot: &dyn Robot, button: &str) -> Result<String, ToolError> {
    let parsed: Button = button.parse()?;
    robot.press_button(parsed).await?;
    Ok(format!("Pressed the button: {}", button))
}

pub async fn open_url(robot: &dyn Robot, url: &str) -> Result<String, ToolError> {
    robot.open_url(url).await?;
    Ok(format!("Opened URL: {}", url))
}

/// Coordinate swipe when both x and y are given, center swipe otherwise
pub async fn swipe(
    robot: &dyn Robot,
    direction: &str,
    x: Option<f64>,
    y: Option<f64>,
    distance: Option<f64>,
) -> Result<String, ToolError> {
    let parsed: SwipeDirection = direction.parse()?;
    match (x, y) {
        (Some(x), Some(y)) => {
            robot
                .swipe_from_coordinate(
                    to_device_units(x),
                    to_device_units(y),
                    parsed,
                    distance.map(to_device_units),
                )
                .await?;
            let distance_text = match distance {
                Some(d) if d != 0.0 => format!(" {} pixels", d),
                _ => String::new(),
            };
            Ok(format!(
                "Swiped {}{} from coordinates: {}, {}",
                parsed, distance_text, x, y
            ))
        }
        _ => {
            robot.swipe(parsed).await?;
            Ok(format!("Swiped {} on screen", parsed))
        }
    }
}

pub async fn type_keys(robot: &dyn Robot, text: &str, submit: bool) -> Result<String, ToolError> {
    robot.send_keys(text).await?;
    if submit {
        robot.press_button(Button::Enter).await?;
    }
    Ok(format!("Typed text: {}", text))
}
