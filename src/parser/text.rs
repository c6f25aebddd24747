//! HTML-to-snippet normalization.
//!
//! Regex based and best-effort: malformed markup degrades to slightly noisier
//! text, never to an error. The passes run in a fixed order because later
//! ones assume the earlier cleanup (e.g. brace blocks are only safe to drop
//! once `<style>` elements are gone).

use std::sync::LazyLock;

use regex::Regex;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)<script\b[^>]*>.*?</script>"));
static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?is)<style\b[^>]*>.*?</style>"));
static DOCTYPE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)<!DOCTYPE[^>]*>"));
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?s)<!--.*?-->"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| re(r"<[^>]+>"));
static AT_RULE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)@[a-z-]+\s*\{[^}]*\}"));
static BRACE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\{[^}]*\}"));
static ZERO_WIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| re("[\u{200B}-\u{200D}\u{2060}\u{FEFF}]"));
static URL_RE: LazyLock<Regex> = LazyLock::new(|| re(r"https?://[^\s<]+"));
static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| re(r"\n\s*\n+"));
static HSPACE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"[ \t]+"));

/// Named entities decoded to visible text.
const VISIBLE_ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// Entities for invisible characters (zero-width, soft hyphen, direction marks).
const INVISIBLE_ENTITIES: [&str; 11] = [
    "&zwnj;", "&zwj;", "&shy;", "&lrm;", "&rlm;", "&#8203;", "&#8204;", "&#8205;", "&#8206;",
    "&#8207;", "&#173;",
];

/// Turn a raw (possibly HTML) email body into display text.
pub fn clean_snippet(text: &str) -> String {
    let mut cleaned = SCRIPT_RE.replace_all(text, "").into_owned();
    cleaned = STYLE_RE.replace_all(&cleaned, "").into_owned();
    cleaned = DOCTYPE_RE.replace_all(&cleaned, "").into_owned();
    cleaned = COMMENT_RE.replace_all(&cleaned, "").into_owned();
    cleaned = TAG_RE.replace_all(&cleaned, "").into_owned();
    cleaned = AT_RULE_RE.replace_all(&cleaned, "").into_owned();
    cleaned = BRACE_RE.replace_all(&cleaned, "").into_owned();

    for (entity, replacement) in VISIBLE_ENTITIES {
        cleaned = cleaned.replace(entity, replacement);
    }
    for entity in INVISIBLE_ENTITIES {
        cleaned = cleaned.replace(entity, "");
    }
    cleaned = ZERO_WIDTH_RE.replace_all(&cleaned, "").into_owned();

    cleaned = URL_RE.replace_all(&cleaned, "").into_owned();
    cleaned = BLANK_LINES_RE.replace_all(&cleaned, "\n").into_owned();
    cleaned = HSPACE_RE.replace_all(&cleaned, " ").into_owned();
    cleaned.trim().to_string()
}

/// Keep at most `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
