/// Frontmatter codec for card files.
///
/// Handles the format:
///   ---
///   title: Write report
///   status: Doing
///   ---
///   arbitrary markdown body
///
/// The body is located by scanning the original text line by line, so a
/// status rewrite reproduces it byte-for-byte (line endings, trailing blank
/// lines and all). Only the frontmatter block is regenerated.
use serde_yaml::{Mapping, Value};

pub const FIELD_TITLE: &str = "title";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_SUMMARY: &str = "summary";

const DELIMITER: &str = "---";

/// Line ending style of a file. CRLF if the text contains any `\r\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// A parsed card document: frontmatter fields plus the untouched body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document<'a> {
    pub fields: Mapping,
    pub body: &'a str,
    /// Whether the text carried a complete `---` block.
    pub has_frontmatter: bool,
    /// False when the block exists but is not a YAML mapping. `fields` is
    /// then empty and the block must not be regenerated from it.
    pub fields_valid: bool,
}

impl Document<'_> {
    /// String value of a field. Non-string scalars count as absent.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Trimmed, non-empty string value of a field.
    pub fn trimmed_field(&self, key: &str) -> Option<&str> {
        self.field(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Byte range of the frontmatter block: (yaml start, yaml end, body start).
fn locate_block(text: &str) -> Option<(usize, usize, usize)> {
    if !text.starts_with(DELIMITER) {
        return None;
    }

    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim() != DELIMITER {
        return None;
    }

    let yaml_start = first.len();
    let mut position = yaml_start;
    for line in lines {
        let line_start = position;
        position += line.len();
        if line.trim() == DELIMITER {
            return Some((yaml_start, line_start, position));
        }
    }
    None
}

/// Split raw text into frontmatter fields and body.
///
/// Text without a leading `---` line (or without a closing one) is all body.
/// A block that is not valid YAML, or not a mapping, yields empty fields.
pub fn parse(text: &str) -> Document<'_> {
    let Some((yaml_start, yaml_end, body_start)) = locate_block(text) else {
        return Document {
            fields: Mapping::new(),
            body: text,
            has_frontmatter: false,
            fields_valid: true,
        };
    };

    let yaml = &text[yaml_start..yaml_end];
    let (fields, fields_valid) = if yaml.trim().is_empty() {
        (Mapping::new(), true)
    } else {
        match serde_yaml::from_str::<Value>(yaml) {
            Ok(Value::Mapping(mapping)) => (mapping, true),
            Ok(_) => {
                log::debug!("[mdboard.frontmatter.parse] Frontmatter is not a mapping, ignoring");
                (Mapping::new(), false)
            }
            Err(e) => {
                log::debug!("[mdboard.frontmatter.parse] Malformed frontmatter: {}", e);
                (Mapping::new(), false)
            }
        }
    };

    Document {
        fields,
        body: &text[body_start..],
        has_frontmatter: true,
        fields_valid,
    }
}

/// Render fields as a `---` delimited block, without a trailing newline.
pub fn serialize(fields: &Mapping, line_ending: LineEnding) -> String {
    let newline = line_ending.as_str();
    let mut block = String::from(DELIMITER);
    block.push_str(newline);

    if !fields.is_empty() {
        let yaml = serde_yaml::to_string(fields).unwrap_or_default();
        for line in yaml.lines() {
            block.push_str(line);
            block.push_str(newline);
        }
    }

    block.push_str(DELIMITER);
    block
}

/// Rewrite only the `status` field, keeping every other key (in order) and
/// the body exactly as it was. `None` when the existing block cannot be read,
/// since regenerating it would drop its contents.
pub fn rewrite_status(text: &str, status: &str) -> Option<String> {
    let document = parse(text);
    if !document.fields_valid {
        return None;
    }
    let line_ending = LineEnding::detect(text);

    let mut fields = document.fields;
    fields.insert(
        Value::String(FIELD_STATUS.to_string()),
        Value::String(status.to_string()),
    );

    let mut output = serialize(&fields, line_ending);
    output.push_str(line_ending.as_str());
    output.push_str(document.body);
    Some(output)
}

/// Template for a freshly created card. Values are written as double-quoted
/// scalars so titles with `:` or `#` survive.
pub fn new_card_document(title: &str, status: &str) -> String {
    let quote = |value: &str| {
        serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
    };
    format!(
        "{delim}\n{FIELD_TITLE}: {}\n{FIELD_STATUS}: {}\n{delim}\n\n",
        quote(title),
        quote(status),
        delim = DELIMITER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
---
title: Write report
status: Doing
summary: Quarterly numbers
---
# Report

Some text.

";

    #[test]
    fn test_parse_fields_and_body() {
        let doc = parse(SAMPLE);
        assert!(doc.has_frontmatter);
        assert_eq!(doc.field("title"), Some("Write report"));
        assert_eq!(doc.field("status"), Some("Doing"));
        assert_eq!(doc.field("summary"), Some("Quarterly numbers"));
        assert_eq!(doc.body, "# Report\n\nSome text.\n\n");
    }

    #[test]
    fn test_parse_without_frontmatter() {
        let doc = parse("# Just a note\n");
        assert!(!doc.has_frontmatter);
        assert!(doc.fields.is_empty());
        assert_eq!(doc.body, "# Just a note\n");
    }

    #[test]
    fn test_parse_first_line_must_be_delimiter() {
        let text = "---- not frontmatter\nstatus: Doing\n---\nbody";
        let doc = parse(text);
        assert!(!doc.has_frontmatter);
        assert_eq!(doc.body, text);
    }

    #[test]
    fn test_parse_unclosed_block_is_all_body() {
        let text = "---\nstatus: Doing\nno closing line";
        let doc = parse(text);
        assert!(!doc.has_frontmatter);
        assert!(doc.fields.is_empty());
        assert_eq!(doc.body, text);
    }

    #[test]
    fn test_parse_malformed_yaml_yields_empty_fields() {
        let doc = parse("---\ntitle: [unclosed\n---\nbody\n");
        assert!(doc.has_frontmatter);
        assert!(!doc.fields_valid);
        assert!(doc.fields.is_empty());
        assert_eq!(doc.body, "body\n");
    }

    #[test]
    fn test_parse_scalar_block_yields_empty_fields() {
        let doc = parse("---\njust a string\n---\nbody");
        assert!(doc.fields.is_empty());
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn test_non_string_values_count_as_absent() {
        let doc = parse("---\ntitle: 2024\nstatus: true\n---\n");
        assert_eq!(doc.field("title"), None);
        assert_eq!(doc.field("status"), None);
        assert_eq!(doc.body, "");
    }

    #[test]
    fn test_trimmed_field() {
        let doc = parse("---\ntitle: \"  padded  \"\nsummary: \"   \"\n---\n");
        assert_eq!(doc.trimmed_field("title"), Some("padded"));
        assert_eq!(doc.trimmed_field("summary"), None);
    }

    #[test]
    fn test_roundtrip_preserves_body_and_fields() {
        let doc = parse(SAMPLE);
        let block = serialize(&doc.fields, LineEnding::Lf);
        let rebuilt = format!("{}\n{}", block, doc.body);

        let reparsed = parse(&rebuilt);
        assert_eq!(reparsed.body, doc.body);
        assert_eq!(reparsed.fields, doc.fields);
    }

    #[test]
    fn test_rewrite_status_preserves_lf_body() {
        let body = "Line one\n\n  indented  \n\n\n";
        let text = format!("---\ntitle: T\nstatus: Todo\n---\n{}", body);
        let rewritten = rewrite_status(&text, "Done").unwrap();

        let doc = parse(&rewritten);
        assert_eq!(doc.field("status"), Some("Done"));
        assert_eq!(doc.field("title"), Some("T"));
        assert_eq!(doc.body, body);
        assert!(rewritten.ends_with(body));
    }

    #[test]
    fn test_rewrite_status_preserves_crlf_body() {
        let body = "Hello\r\nWorld\r\n\r\n";
        let text = format!("---\r\ntitle: T\r\nstatus: Todo\r\n---\r\n{}", body);
        let rewritten = rewrite_status(&text, "Done").unwrap();

        assert!(rewritten.starts_with("---\r\n"));
        assert!(!rewritten.replace("\r\n", "").contains('\n'));
        let doc = parse(&rewritten);
        assert_eq!(doc.field("status"), Some("Done"));
        assert_eq!(doc.body, body);
    }

    #[test]
    fn test_rewrite_status_body_without_trailing_newline() {
        let text = "---\nstatus: Doing\n---\nHello\r\nWorld";
        let rewritten = rewrite_status(text, "Done").unwrap();
        assert_eq!(parse(&rewritten).body, "Hello\r\nWorld");
    }

    #[test]
    fn test_rewrite_status_keeps_unknown_keys_in_order() {
        let text = "---\ntitle: T\npriority: high\nstatus: Todo\ntags:\n  - a\n  - b\n---\nbody";
        let rewritten = rewrite_status(text, "Done").unwrap();

        let doc = parse(&rewritten);
        let keys: Vec<&str> = doc.fields.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["title", "priority", "status", "tags"]);
        assert_eq!(doc.field("priority"), Some("high"));
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn test_rewrite_status_adds_frontmatter_when_missing() {
        let rewritten = rewrite_status("plain body\n", "Doing").unwrap();
        assert_eq!(rewritten, "---\nstatus: Doing\n---\nplain body\n");
    }

    #[test]
    fn test_rewrite_status_quotes_special_values() {
        let rewritten = rewrite_status("---\ntitle: T\n---\n", "Review: final #1").unwrap();
        assert_eq!(parse(&rewritten).field("status"), Some("Review: final #1"));
    }

    #[test]
    fn test_rewrite_status_refuses_unreadable_block() {
        assert_eq!(rewrite_status("---\ntitle: Plan: [draft\nowner: alice\n---\nbody\n", "Done"), None);
        assert_eq!(rewrite_status("---\ntags: a\ntags: b\n---\nbody\n", "Done"), None);
        assert_eq!(rewrite_status("---\njust a string\n---\nbody", "Done"), None);
    }

    #[test]
    fn test_rewrite_status_empty_block_is_valid() {
        let rewritten = rewrite_status("---\n---\nbody", "Done").unwrap();
        assert_eq!(parse(&rewritten).field("status"), Some("Done"));
    }

    #[test]
    fn test_serialize_empty_fields() {
        assert_eq!(serialize(&Mapping::new(), LineEnding::Lf), "---\n---");
    }

    #[test]
    fn test_new_card_document() {
        let text = new_card_document("Fix: the \"bug\"", "Inbox 📥");
        assert!(text.ends_with("---\n\n"));
        let doc = parse(&text);
        assert_eq!(doc.field("title"), Some("Fix: the \"bug\""));
        assert_eq!(doc.field("status"), Some("Inbox 📥"));
        assert_eq!(doc.body, "\n");
    }

    #[test]
    fn test_line_ending_detect() {
        assert_eq!(LineEnding::detect("a\nb"), LineEnding::Lf);
        assert_eq!(LineEnding::detect("a\nb\r\nc"), LineEnding::CrLf);
    }
}
