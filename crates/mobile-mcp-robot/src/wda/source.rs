//! WebDriverAgent page-source filtering

use mobile_mcp_protocol::{ElementRect, ScreenElement};
use serde::Deserialize;
use serde_json::Value;

/// Element types worth surfacing to a model
const ACCEPTED_TYPES: [&str; 7] = [
    "TextField",
    "Button",
    "Switch",
    "Icon",
    "SearchField",
    "StaticText",
    "Image",
];

#[derive(Debug, Deserialize)]
pub(crate) struct SourceTree {
    pub value: SourceElement,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SourceRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SourceElement {
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default, rename = "rawIdentifier")]
    pub raw_identifier: Option<String>,
    pub rect: SourceRect,
    #[serde(default, rename = "isVisible")]
    pub is_visible: Option<Value>,
    #[serde(default)]
    pub children: Option<Vec<SourceElement>>,
}

impl SourceElement {
    /// WDA reports visibility as "1"/"0"; some builds send numbers or booleans
    fn visible(&self) -> bool {
        match &self.is_visible {
            Some(Value::String(s)) => s == "1",
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            Some(Value::Bool(b)) => *b,
            _ => false,
        }
    }

    fn on_screen(&self) -> bool {
        self.rect.x >= 0.0 && self.rect.y >= 0.0
    }

    fn has_identity(&self) -> bool {
        self.label.is_some() || self.name.is_some() || self.raw_identifier.is_some()
    }

    fn value_text(&self) -> Option<String> {
        match &self.value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    fn to_screen_element(&self) -> ScreenElement {
        let rect = ElementRect {
            x: self.rect.x.round() as i32,
            y: self.rect.y.round() as i32,
            width: self.rect.width.round() as i32,
            height: self.rect.height.round() as i32,
        };
        let mut element = ScreenElement::new(self.element_type.clone(), rect);
        element.label = self.label.clone();
        element.name = self.name.clone();
        element.value = self.value_text();
        element.identifier = self.raw_identifier.clone();
        element
    }
}

/// Keep accepted, visible, identifiable elements; children are always visited
pub(crate) fn filter_elements(source: &SourceElement) -> Vec<ScreenElement> {
    let mut out = Vec::new();
    collect(source, &mut out);
    out
}

fn collect(node: &SourceElement, out: &mut Vec<ScreenElement>) {
    if ACCEPTED_TYPES.contains(&node.element_type.as_str())
        && node.visible()
        && node.on_screen()
        && node.has_identity()
    {
        out.push(node.to_screen_element());
    }

    for child in node.children.iter().flatten() {
        collect(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> SourceElement {
        serde_json::from_value::<SourceTree>(json!({ "value": value }))
            .unwrap()
            .value
    }

    fn rect(x: i32, y: i32) -> Value {
        json!({ "x": x, "y": y, "width": 100, "height": 44 })
    }

    #[test]
    fn test_accepted_types_found_at_depth() {
        let source = tree(json!({
            "type": "Application",
            "label": "Settings",
            "isVisible": "1",
            "rect": rect(0, 0),
            "children": [{
                "type": "Window",
                "isVisible": "1",
                "rect": rect(0, 0),
                "children": [{
                    "type": "Other",
                    "isVisible": "0",
                    "rect": rect(0, 0),
                    "children": [{
                        "type": "Button",
                        "label": "General",
                        "name": "General",
                        "rawIdentifier": "general-cell",
                        "isVisible": "1",
                        "rect": rect(16, 200),
                        "children": [{
                            "type": "StaticText",
                            "value": "General",
                            "label": "General",
                            "isVisible": "1",
                            "rect": rect(60, 210),
                            "children": null
                        }]
                    }]
                }]
            }]
        }));

        let elements = filter_elements(&source);
        let types: Vec<_> = elements.iter().map(|e| e.element_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["Button", "StaticText"],
            "invisible or unaccepted parents must not hide accepted children"
        );
        assert_eq!(elements[0].identifier.as_deref(), Some("general-cell"));
        assert_eq!(elements[0].rect.y, 200);
        assert_eq!(elements[1].value.as_deref(), Some("General"));
    }

    #[test]
    fn test_offscreen_invisible_and_anonymous_are_dropped() {
        let source = tree(json!({
            "type": "Other",
            "rect": rect(0, 0),
            "children": [
                { "type": "Button", "label": "Off", "isVisible": "1", "rect": rect(-10, 20) },
                { "type": "Button", "label": "Hidden", "isVisible": "0", "rect": rect(10, 20) },
                { "type": "Image", "label": null, "name": null, "isVisible": "1", "rect": rect(10, 20) },
                { "type": "Switch", "name": "Wi-Fi", "value": 1, "isVisible": 1, "rect": rect(10, 20) }
            ]
        }));

        let elements = filter_elements(&source);
        assert_eq!(elements.len(), 1, "unexpected elements: {:?}", elements);
        assert_eq!(elements[0].name.as_deref(), Some("Wi-Fi"));
        assert_eq!(elements[0].value.as_deref(), Some("1"));
    }
}
