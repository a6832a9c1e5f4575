//! Frontmatter parsing and rendering
//!
//! The grammar is intentionally small. A document may open with a line of
//! exactly `---`, followed by `key: value` lines and a closing `---` line.
//! There is no nesting, no lists, no multi-line values and no escaped colons.
//! Anything that does not fit degrades to "no metadata" instead of failing.

use tracing::debug;

/// Line that opens and closes the metadata block
pub const DELIMITER: &str = "---";

/// Ordered key/value pairs from a metadata block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    pairs: Vec<(String, String)>,
}

impl Frontmatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair. Later pairs shadow earlier ones with the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Value for `key`, last occurrence wins
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render the block followed by `body`
    ///
    /// Values are written double-quoted so that `parse` hands them back
    /// byte for byte. Values must not contain line breaks.
    pub fn render(&self, body: &str) -> String {
        debug!(pairs = self.pairs.len(), body_len = body.len(), "Frontmatter::render: called");
        let mut out = String::with_capacity(body.len() + 64);
        out.push_str(DELIMITER);
        out.push('\n');
        for (key, value) in &self.pairs {
            out.push_str(key);
            out.push_str(": \"");
            out.push_str(value);
            out.push_str("\"\n");
        }
        out.push_str(DELIMITER);
        out.push_str("\n\n");
        out.push_str(body.trim());
        out.push('\n');
        out
    }
}

/// Result of splitting a document into metadata and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub metadata: Frontmatter,
    /// Text after the closing delimiter (or the whole document), trimmed
    pub body: String,
}

/// Split `text` into frontmatter and body
pub fn parse(text: &str) -> Parsed {
    debug!(text_len = text.len(), "parse: called");
    match split_block(text) {
        Some((block, rest)) => {
            debug!("parse: metadata block found");
            Parsed {
                metadata: parse_block(block),
                body: rest.trim().to_string(),
            }
        }
        None => {
            debug!("parse: no metadata block");
            Parsed {
                metadata: Frontmatter::default(),
                body: text.trim().to_string(),
            }
        }
    }
}

// Trailing whitespace is tolerated so CRLF files still match.
fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

/// Locate the metadata block. Returns (block, remainder) or None.
fn split_block(text: &str) -> Option<(&str, &str)> {
    let (first, mut rest) = text.split_once('\n')?;
    if !is_delimiter(first) {
        return None;
    }

    let block_start = first.len() + 1;
    let mut offset = block_start;
    loop {
        let (line, next) = match rest.split_once('\n') {
            Some((line, next)) => (line, Some(next)),
            None => (rest, None),
        };

        if is_delimiter(line) {
            return Some((&text[block_start..offset], next.unwrap_or("")));
        }

        // Unterminated block: treat the document as having no metadata
        let next = next?;
        offset += line.len() + 1;
        rest = next;
    }
}

fn parse_block(block: &str) -> Frontmatter {
    let mut metadata = Frontmatter::new();
    for line in block.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            metadata.insert(key.trim(), strip_quotes(value.trim()));
        } else {
            debug!(%line, "parse_block: ignoring line without colon");
        }
    }
    metadata
}

/// Remove one layer of matching single or double quotes
fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_welcome_example() {
        let text = "---\ntitle: Welcome\ndescription: \"Intro prompt\"\n---\nHello, {{name}}!\n";
        let parsed = parse(text);

        assert_eq!(parsed.metadata.get("title"), Some("Welcome"));
        assert_eq!(parsed.metadata.get("description"), Some("Intro prompt"));
        assert_eq!(parsed.body, "Hello, {{name}}!");
    }

    #[test]
    fn test_parse_without_block() {
        let parsed = parse("\n  Just some text\n\n");
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.body, "Just some text");
    }

    #[test]
    fn test_leading_blank_line_means_no_block() {
        let text = "\n---\ntitle: Hidden\n---\nBody";
        let parsed = parse(text);

        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.body, text.trim());
    }

    #[test]
    fn test_unterminated_block_is_content() {
        let text = "---\ntitle: Nope\nstill going";
        let parsed = parse(text);

        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.body, text);
    }

    #[test]
    fn test_empty_block() {
        let parsed = parse("---\n---\nbody here");
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.body, "body here");
    }

    #[test]
    fn test_block_without_body() {
        let parsed = parse("---\ntitle: Only meta\n---");
        assert_eq!(parsed.metadata.get("title"), Some("Only meta"));
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn test_crlf_delimiters() {
        let parsed = parse("---\r\ntitle: Windows\r\n---\r\nBody\r\n");
        assert_eq!(parsed.metadata.get("title"), Some("Windows"));
        assert_eq!(parsed.body, "Body");
    }

    #[test]
    fn test_splits_at_first_colon_only() {
        let parsed = parse("---\ntitle: Time: 10:30\n---\n");
        assert_eq!(parsed.metadata.get("title"), Some("Time: 10:30"));
    }

    #[test]
    fn test_lines_without_colon_ignored() {
        let parsed = parse("---\njust words\n\nkey: value\n---\nbody");
        assert_eq!(parsed.metadata.len(), 1);
        assert_eq!(parsed.metadata.get("key"), Some("value"));
    }

    #[test]
    fn test_strips_single_layer_of_quotes() {
        let parsed = parse("---\na: 'single'\nb: \"\"double\"\"\nc: \"mismatched'\nd: \"\n---\n");
        assert_eq!(parsed.metadata.get("a"), Some("single"));
        assert_eq!(parsed.metadata.get("b"), Some("\"double\""));
        assert_eq!(parsed.metadata.get("c"), Some("\"mismatched'"));
        assert_eq!(parsed.metadata.get("d"), Some("\""));
    }

    #[test]
    fn test_repeated_key_last_wins() {
        let parsed = parse("---\ntitle: first\ntitle: second\n---\n");
        assert_eq!(parsed.metadata.get("title"), Some("second"));
        assert_eq!(parsed.metadata.len(), 2);
    }

    #[test]
    fn test_closing_delimiter_must_be_whole_line() {
        let parsed = parse("---\ntitle: x\n---more\nbody");
        assert!(parsed.metadata.is_empty());
    }

    #[test]
    fn test_body_may_contain_delimiter_lines() {
        let parsed = parse("---\ntitle: x\n---\nabove\n---\nbelow");
        assert_eq!(parsed.metadata.get("title"), Some("x"));
        assert_eq!(parsed.body, "above\n---\nbelow");
    }

    #[test]
    fn test_render_layout() {
        let mut fm = Frontmatter::new();
        fm.insert("title", "Welcome");
        fm.insert("description", "Intro prompt");

        let text = fm.render("  Hello!  ");
        assert_eq!(text, "---\ntitle: \"Welcome\"\ndescription: \"Intro prompt\"\n---\n\nHello!\n");
    }

    proptest! {
        #[test]
        fn prop_render_then_parse_restores_fields(
            title in "[^\r\n]{0,40}",
            description in "[^\r\n]{0,60}",
            content in "[a-zA-Z0-9 .,:#{}\n-]{0,200}",
        ) {
            let mut fm = Frontmatter::new();
            fm.insert("title", title.clone());
            fm.insert("description", description.clone());

            let parsed = parse(&fm.render(&content));
            prop_assert_eq!(parsed.metadata.get("title"), Some(title.as_str()));
            prop_assert_eq!(parsed.metadata.get("description"), Some(description.as_str()));
            prop_assert_eq!(parsed.body, content.trim());
        }
    }
}
