use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization: safe tags (like <b>, <p>) survive while
/// dangerous tags (like <script>) and malicious attributes (like onclick)
/// are stripped. Applied to instructor-supplied quiz descriptions, which
/// are rendered back to students.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
