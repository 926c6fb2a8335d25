//! Comment attribution: doc summary, leading line comments, trailing same-line comment

use dotres_core::SourceLanguage;

/// A comment with its byte span and the rows it starts and ends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSpan {
    pub start: usize,
    pub end: usize,
    pub start_row: usize,
    pub end_row: usize,
    pub text: String,
}

/// Boundaries of the code around a declaration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Neighbors {
    /// End offset and row of the last code token before the declaration.
    pub prev_end: Option<(usize, usize)>,
    /// Start offset of the first code token after the declaration.
    pub next_start: Option<usize>,
}

/// Span of the declaration a comment is being attributed to.
#[derive(Debug, Clone, Copy)]
pub struct DeclSpan {
    pub start: usize,
    pub end: usize,
    pub end_row: usize,
}

fn doc_marker(language: SourceLanguage) -> &'static str {
    match language {
        SourceLanguage::CSharp => "///",
        SourceLanguage::VisualBasic => "'''",
    }
}

fn is_doc(text: &str, language: SourceLanguage) -> bool {
    let marker = doc_marker(language);
    let trimmed = text.trim_start();
    trimmed.starts_with(marker) && !trimmed[marker.len()..].starts_with(&marker[..1])
}

fn is_line_comment(text: &str, language: SourceLanguage) -> bool {
    let trimmed = text.trim_start();
    match language {
        SourceLanguage::CSharp => trimmed.starts_with("//"),
        SourceLanguage::VisualBasic => {
            trimmed.starts_with('\'')
                || trimmed.starts_with('\u{2018}')
                || trimmed.starts_with('\u{2019}')
                || trimmed.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("rem"))
        }
    }
}

/// Text of a line comment without its marker.
fn strip_marker(text: &str, language: SourceLanguage) -> &str {
    let trimmed = text.trim();
    match language {
        SourceLanguage::CSharp => trimmed.strip_prefix("//").unwrap_or(trimmed),
        SourceLanguage::VisualBasic => {
            if trimmed.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("rem")) {
                &trimmed[3..]
            } else {
                let mut chars = trimmed.chars();
                chars.next();
                chars.as_str()
            }
        }
    }
}

/// Inner text of `<summary>` across doc comment lines, newlines removed.
fn summary(doc_lines: &[&CommentSpan], language: SourceLanguage) -> Option<String> {
    let marker = doc_marker(language);
    let joined: Vec<&str> = doc_lines
        .iter()
        .map(|c| {
            let trimmed = c.text.trim();
            trimmed.strip_prefix(marker).unwrap_or(trimmed)
        })
        .collect();
    let joined = joined.join("\n");
    let open = joined.find("<summary>")? + "<summary>".len();
    let close = joined[open..].find("</summary>").map_or(joined.len(), |i| open + i);
    let text = joined[open..close].replace(['\r', '\n'], "");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Pick the comment for a declaration: doc summary, else leading line comments, else the
/// trailing comment on the declaration's last row.
pub fn comment_for(
    comments: &[CommentSpan],
    language: SourceLanguage,
    decl: DeclSpan,
    neighbors: Neighbors,
) -> Option<String> {
    let leading: Vec<&CommentSpan> = comments
        .iter()
        .filter(|c| c.end <= decl.start)
        .filter(|c| match neighbors.prev_end {
            Some((offset, row)) => c.start >= offset && c.start_row > row,
            None => true,
        })
        .collect();

    let docs: Vec<&CommentSpan> = leading
        .iter()
        .copied()
        .filter(|c| is_doc(&c.text, language))
        .collect();
    if let Some(text) = summary(&docs, language) {
        return Some(text);
    }

    let single: String = leading
        .iter()
        .filter(|c| !is_doc(&c.text, language) && is_line_comment(&c.text, language))
        .map(|c| strip_marker(&c.text, language))
        .collect();
    let single = single.trim();
    if !single.is_empty() {
        return Some(single.to_string());
    }

    comments
        .iter()
        .filter(|c| c.start >= decl.end && c.start_row == decl.end_row)
        .filter(|c| neighbors.next_start.is_none_or(|next| c.end <= next))
        .find(|c| is_line_comment(&c.text, language))
        .map(|c| strip_marker(&c.text, language).trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(start: usize, row: usize, text: &str) -> CommentSpan {
        CommentSpan {
            start,
            end: start + text.len(),
            start_row: row,
            end_row: row,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_summary_beats_line_comments() {
        let comments = vec![
            comment(0, 0, "// plain"),
            comment(10, 1, "/// <summary>"),
            comment(30, 2, "/// Base type"),
            comment(50, 3, "/// for tests."),
            comment(70, 4, "/// </summary>"),
        ];
        let decl = DeclSpan { start: 100, end: 120, end_row: 5 };
        let text = comment_for(&comments, SourceLanguage::CSharp, decl, Neighbors::default());
        assert_eq!(text.as_deref(), Some("Base type for tests."));
    }

    #[test]
    fn test_leading_comments_concatenate() {
        let comments = vec![comment(0, 0, "' first"), comment(10, 1, "' second")];
        let decl = DeclSpan { start: 20, end: 40, end_row: 2 };
        let text = comment_for(&comments, SourceLanguage::VisualBasic, decl, Neighbors::default());
        assert_eq!(text.as_deref(), Some("first second"));
    }

    #[test]
    fn test_comment_on_previous_row_end_is_not_leading() {
        let comments = vec![comment(12, 0, "// belongs to x")];
        let decl = DeclSpan { start: 40, end: 50, end_row: 1 };
        let neighbors = Neighbors { prev_end: Some((10, 0)), next_start: None };
        assert_eq!(comment_for(&comments, SourceLanguage::CSharp, decl, neighbors), None);
    }

    #[test]
    fn test_trailing_comment() {
        let comments = vec![comment(20, 3, "// counter")];
        let decl = DeclSpan { start: 5, end: 15, end_row: 3 };
        let text = comment_for(&comments, SourceLanguage::CSharp, decl, Neighbors::default());
        assert_eq!(text.as_deref(), Some("counter"));

        // A later declaration on the same row owns it instead.
        let neighbors = Neighbors { prev_end: None, next_start: Some(17) };
        assert_eq!(comment_for(&comments, SourceLanguage::CSharp, decl, neighbors), None);
    }
}
