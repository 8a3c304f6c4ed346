//! Screen inspection and orientation tools

use crate::errors::ToolError;
use mobile_mcp_protocol::{Orientation, ScreenElement};
use mobile_mcp_robot::Robot;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Coordinates {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

/// Element as presented to the model: `rect` becomes `coordinates`
#[derive(Debug, Serialize)]
struct ElementView<'a> {
    #[serde(rename = "type")]
    element_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    identifier: Option<&'a str>,
    coordinates: Coordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    focused: Option<bool>,
}

impl<'a> From<&'a ScreenElement> for ElementView<'a> {
    fn from(element: &'a ScreenElement) -> Self {
        Self {
            element_type: &element.element_type,
            text: element.text.as_deref(),
            label: element.label.as_deref(),
            name: element.name.as_deref(),
            value: element.value.as_deref(),
            identifier: element.identifier.as_deref(),
            coordinates: Coordinates {
                x: element.rect.x,
                y: element.rect.y,
                width: element.rect.width,
                height: element.rect.height,
            },
            focused: element.focused.filter(|f| *f),
        }
    }
}

pub fn format_elements(elements: &[ScreenElement]) -> Result<String, ToolError> {
    let views: Vec<ElementView<'_>> = elements.iter().map(ElementView::from).collect();
    let json = serde_json::to_string(&views).map_err(mobile_mcp_robot::RobotError::from)?;
    Ok(format!("Found these elements on screen: {}", json))
}

pub async fn list_elements(robot: &dyn Robot) -> Result<String, ToolError> {
    let elements = robot.get_elements_on_screen().await?;
    format_elements(&elements)
}

pub async fn screen_size(robot: &dyn Robot) -> Result<String, ToolError> {
    let size = robot.get_screen_size().await?;
    Ok(format!("Screen size is {}x{} pixels", size.width, size.height))
}

pub async fn set_orientation(robot: &dyn Robot, orientation: &str) -> Result<String, ToolError> {
    let parsed: Orientation = orientation.parse()?;
    robot.set_orientation(parsed).await?;
    Ok(format!("Changed device orientation to {}", parsed))
}

pub async fn get_orientation(robot: &dyn Robot) -> Result<String, ToolError> {
    let orientation = robot.get_orientation().await?;
    Ok(format!("Current device orientation is {}", orientation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::FakeRobot;
    use mobile_mcp_protocol::ElementRect;

    #[tokio::test]
    async fn test_elements_render_coordinates() {
        let robot = FakeRobot::default();
        assert_eq!(
            list_elements(&robot).await.unwrap(),
            r#"Found these elements on screen: [{"type":"android.widget.Button","text":"Sign in","identifier":"com.example:id/login","coordinates":{"x":10,"y":20,"width":300,"height":80},"focused":true}]"#
        );
    }

    #[test]
    fn test_unfocused_elements_omit_flag() {
        let element = ScreenElement {
            label: Some("Back".into()),
            focused: Some(false),
            ..ScreenElement::new(
                "Button",
                ElementRect {
                    x: 0,
                    y: 0,
                    width: 44,
                    height: 44,
                },
            )
        };
        let out = format_elements(&[element]).unwrap();
        assert!(!out.contains("focused"), "output: {}", out);
        assert!(!out.contains("rect"), "rect is renamed: {}", out);
    }

    #[tokio::test]
    async fn test_screen_size_and_orientation() {
        let robot = FakeRobot::default();
        assert_eq!(
            screen_size(&robot).await.unwrap(),
            "Screen size is 1080x2400 pixels"
        );
        assert_eq!(
            get_orientation(&robot).await.unwrap(),
            "Current device orientation is portrait"
        );
        assert_eq!(
            set_orientation(&robot, "landscape").await.unwrap(),
            "Changed device orientation to landscape"
        );
        assert!(set_orientation(&robot, "sideways").await.unwrap_err().is_actionable());
        assert_eq!(
            robot.calls(),
            vec!["get_screen_size", "get_orientation", "set_orientation landscape"]
        );
    }
}
