use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Instructors can paste formatted exam instructions from a word
/// processor; this keeps safe tags (like <b>, <p>) while stripping
/// dangerous ones (like <script>, <iframe>) and event-handler
/// attributes before the text is stored and echoed back to dashboards.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
