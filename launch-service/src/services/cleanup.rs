//! Trim model output down to the generated markup.

use once_cell::sync::Lazy;
use regex::Regex;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```html\n?|\n?```").expect("code fence pattern is valid"));

const OPEN_TAG: &str = "<div";
const CLOSE_TAG: &str = "</div>";

/// Strip markdown code fences, then keep everything from the first `<div` to
/// the end of the last `</div>`.
///
/// Partial output is expected while streaming: with no `<div` yet the result
/// is empty, and with an opening tag but no closing tag the result runs to the
/// end of the buffer.
pub fn clean_content(raw: &str) -> String {
    let unfenced = CODE_FENCE.replace_all(raw, "");

    let Some(start) = unfenced.find(OPEN_TAG) else {
        return String::new();
    };
    let markup = &unfenced[start..];

    match markup.rfind(CLOSE_TAG) {
        Some(end) => markup[..end + CLOSE_TAG.len()].to_string(),
        None => markup.to_string(),
    }
}
