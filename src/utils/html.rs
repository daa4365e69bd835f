// src/utils/html.rs

/// Sanitizes instructor-authored quiz text before it is stored.
///
/// Whitelist based (ammonia): formatting tags such as `<b>` or `<p>` survive,
/// `<script>` and event-handler attributes are removed. Surrounding
/// whitespace is trimmed.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input.trim())
}

/// Same as [`clean_html`], dropping values that end up empty.
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input.map(clean_html).filter(|s| !s.is_empty())
}
