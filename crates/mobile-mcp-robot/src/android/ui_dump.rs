//! UIAutomator hierarchy parsing
//!
//! `uiautomator dump /dev/tty` prints the XML followed by a status line
//! ("UI hierchary dumped to: /dev/tty"). We cut the document out, parse it with
//! roxmltree and flatten it into the elements a model can act on.

use crate::error::{Result, RobotError};
use mobile_mcp_protocol::{ElementRect, ScreenElement};
use regex::Regex;
use roxmltree::{Document, Node};
use std::sync::LazyLock;

/// Emitted by uiautomator while the accessibility bridge is not ready
pub(crate) const NULL_ROOT_MARKER: &str = "null root node returned by UiTestAutomationBridge";

const XML_START: &str = "<?xml";
const HIERARCHY_END: &str = "</hierarchy>";

static BOUNDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d+),(\d+)\]\[(\d+),(\d+)\]$").expect("bounds regex must compile")
});

/// Cut the XML document out of raw dump output
pub(crate) fn extract_xml(dump: &str) -> Result<&str> {
    let start = dump
        .find(XML_START)
        .ok_or_else(|| RobotError::parse("UIAutomator dump contains no XML document"))?;
    let xml = &dump[start..];
    match xml.find(HIERARCHY_END) {
        Some(end) => Ok(&xml[..end + HIERARCHY_END.len()]),
        None => Ok(xml),
    }
}

/// Parse `[left,top][right,bottom]`
pub(crate) fn parse_bounds(bounds: &str) -> Option<ElementRect> {
    let caps = BOUNDS.captures(bounds)?;
    let n = |i: usize| caps[i].parse::<i32>().ok();
    let (left, top, right, bottom) = (n(1)?, n(2)?, n(3)?, n(4)?);
    Some(ElementRect {
        x: left,
        y: top,
        width: right - left,
        height: bottom - top,
    })
}

fn non_empty<'a>(node: Node<'a, '_>, attr: &str) -> Option<&'a str> {
    node.attribute(attr).filter(|v| !v.is_empty())
}

fn collect(node: Node<'_, '_>, out: &mut Vec<ScreenElement>) {
    for child in node.children().filter(|c| c.has_tag_name("node")) {
        collect(child, out);
    }

    let text = non_empty(node, "text");
    let content_desc = non_empty(node, "content-desc");
    let hint = non_empty(node, "hint");
    if text.is_none() && content_desc.is_none() && hint.is_none() {
        return;
    }

    let Some(rect) = node.attribute("bounds").and_then(parse_bounds) else {
        return;
    };
    if !rect.has_area() {
        return;
    }

    let mut element = ScreenElement::new(non_empty(node, "class").unwrap_or("text"), rect);
    element.text = node.attribute("text").map(str::to_string);
    element.label = Some(content_desc.or(hint).unwrap_or("").to_string());
    element.identifier = non_empty(node, "resource-id").map(str::to_string);
    if node.attribute("focused") == Some("true") {
        element.focused = Some(true);
    }
    out.push(element);
}

/// Flatten a UIAutomator hierarchy into screen elements, children first
pub(crate) fn parse_elements(xml: &str) -> Result<Vec<ScreenElement>> {
    let doc = Document::parse(xml)?;
    let mut elements = Vec::new();
    for node in doc
        .root_element()
        .children()
        .filter(|c| c.has_tag_name("node"))
    {
        collect(node, &mut elements);
    }
    Ok(elements)
}

/// Captured dump of a small login screen
#[cfg(test)]
pub(crate) const SAMPLE_DUMP: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?><hierarchy rotation="0"><node index="0" text="" resource-id="" class="android.widget.FrameLayout" package="com.example" content-desc="" focused="false" bounds="[0,0][1080,2400]"><node index="0" text="Sign in" resource-id="com.example:id/title" class="android.widget.TextView" package="com.example" content-desc="" focused="false" bounds="[40,200][1040,280]" /><node index="1" text="" resource-id="com.example:id/email" class="android.widget.EditText" package="com.example" content-desc="" hint="Email" focused="true" bounds="[40,320][1040,420]" /><node index="2" text="" resource-id="" class="android.widget.ImageView" package="com.example" content-desc="Logo" focused="false" bounds="[500,40][500,120]" /><node index="3" text="" resource-id="" class="android.view.View" package="com.example" content-desc="" focused="false" bounds="[0,0][10,10]" /></node></hierarchy>UI hierchary dumped to: /dev/tty"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_xml_strips_surrounding_noise() {
        let dump = format!("WARNING: linker noise\n{}", SAMPLE_DUMP);
        let xml = extract_xml(&dump).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.ends_with("</hierarchy>"));
    }

    #[test]
    fn test_extract_xml_without_document() {
        assert!(extract_xml("ERROR: could not get idle state.").is_err());
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(
            parse_bounds("[40,200][1040,280]"),
            Some(ElementRect {
                x: 40,
                y: 200,
                width: 1000,
                height: 80
            })
        );
        assert_eq!(parse_bounds("40,200,1040,280"), None);
    }

    #[test]
    fn test_parse_elements_filters_and_maps() {
        let elements = parse_elements(extract_xml(SAMPLE_DUMP).unwrap()).unwrap();

        // zero-width logo and the unlabeled view are dropped
        assert_eq!(elements.len(), 2, "unexpected elements: {:?}", elements);
        for element in &elements {
            assert!(element.rect.has_area(), "element without area: {:?}", element);
        }

        let title = &elements[0];
        assert_eq!(title.element_type, "android.widget.TextView");
        assert_eq!(title.text.as_deref(), Some("Sign in"));
        assert_eq!(title.label.as_deref(), Some(""));
        assert_eq!(title.identifier.as_deref(), Some("com.example:id/title"));
        assert_eq!(title.focused, None);

        let email = &elements[1];
        assert_eq!(email.label.as_deref(), Some("Email"), "hint is the label fallback");
        assert_eq!(email.focused, Some(true));
    }

    #[test]
    fn test_children_come_before_parent() {
        let xml = r#"<?xml version="1.0"?><hierarchy><node class="Outer" text="outer" bounds="[0,0][100,100]"><node class="Inner" text="inner" bounds="[10,10][20,20]"/></node></hierarchy>"#;
        let types: Vec<_> = parse_elements(xml)
            .unwrap()
            .into_iter()
            .map(|e| e.element_type)
            .collect();
        assert_eq!(types, vec!["Inner", "Outer"]);
    }

    #[test]
    fn test_missing_class_defaults_to_text() {
        let xml = r#"<?xml version="1.0"?><hierarchy><node content-desc="Close" bounds="[0,0][5,5]"/></hierarchy>"#;
        let elements = parse_elements(xml).unwrap();
        assert_eq!(elements[0].element_type, "text");
        assert_eq!(elements[0].text, None);
        assert_eq!(elements[0].label.as_deref(), Some("Close"));
    }
}
