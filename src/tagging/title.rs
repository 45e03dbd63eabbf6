use std::sync::LazyLock;

use regex::Regex;

static TRACK_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:#|■|◆|【|\$|(?:【?tr(?:ack)?|トラック|音轨|とらっく)[-_‗\s.．・,：]*)?([0-9]+)([-_‗\s.．・,：】$]*)(.+)$",
    )
    .unwrap()
});

const OPENING_BRACKETS: [char; 3] = ['「', '『', '【'];

/// Strips a leading track marker and number from a file stem.
///
/// `01_はじめに` gives `はじめに`, `track02 - 耳かき` gives `耳かき`. A number
/// glued directly to the title only counts when the title opens with a
/// bracket (`03「おやすみ」`), so stems like `2024年ver` stay whole.
pub fn track_title(stem: &str) -> &str {
    let Some(caps) = TRACK_TITLE_RE.captures(stem) else {
        return stem;
    };
    let (Some(separator), Some(rest)) = (caps.get(2), caps.get(3)) else {
        return stem;
    };
    if separator.as_str().is_empty() && !rest.as_str().starts_with(OPENING_BRACKETS) {
        return stem;
    }
    rest.as_str()
}
