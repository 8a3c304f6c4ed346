//! Multi-display detection from adb output

use regex::Regex;
use std::sync::LazyLock;

static GET_DISPLAYS_UNIQUE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"uniqueId "([^"]+)""#).expect("display regex must compile"));

static ACTIVE_INTERNAL_VIEWPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"DisplayViewport\{type=INTERNAL[^}]*isActive=true[^}]*uniqueId='([^']+)'")
        .expect("display regex must compile")
});

static DISPLAY_STATE_ON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Display Id=(\d+)[\s\S]*?Display State=ON").expect("display regex must compile"));

/// Number of displays listed by `dumpsys SurfaceFlinger --display-id`
pub(crate) fn count_displays(surface_flinger: &str) -> usize {
    surface_flinger
        .lines()
        .filter(|line| line.starts_with("Display "))
        .count()
}

fn strip_local(id: &str) -> String {
    id.strip_prefix("local:").unwrap_or(id).to_string()
}

/// First powered-on display from `cmd display get-displays` (Android 11+)
pub(crate) fn first_display_from_get_displays(output: &str) -> Option<String> {
    let line = output
        .lines()
        .filter(|line| line.starts_with("Display id "))
        .filter(|line| line.contains(", state ON,"))
        .find(|line| line.contains(", uniqueId "))?;
    GET_DISPLAYS_UNIQUE_ID
        .captures(line)
        .map(|caps| strip_local(&caps[1]))
}

/// First active display from `dumpsys display`, for older Android versions
pub(crate) fn first_display_from_dumpsys(output: &str) -> Option<String> {
    if let Some(caps) = ACTIVE_INTERNAL_VIEWPORT.captures(output) {
        return Some(strip_local(&caps[1]));
    }
    DISPLAY_STATE_ON
        .captures(output)
        .map(|caps| caps[1].to_string())
}
