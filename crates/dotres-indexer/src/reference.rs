//! Reading type and namespace name references out of source text

use dotres_core::{NameReference, NameSegment, SourceLanguage};

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Parse the name written in `text[start..end]`.
///
/// Handles dotted chains, `global::` / `Global.`, `alias::Name` and generic argument lists
/// (`<...>` or `(Of ...)`), which only contribute to a segment's arity.
pub fn parse_reference(
    text: &str,
    start: usize,
    end: usize,
    language: SourceLanguage,
) -> Option<NameReference> {
    let source = text.get(start..end)?;
    let bytes = source.as_bytes();
    let mut pos = 0;
    let mut segments: Vec<NameSegment> = Vec::new();
    let mut global = false;
    let mut alias_qualifier = None;
    let mut last_end = 0;

    let skip_ws = |pos: &mut usize| {
        while *pos < bytes.len() && (bytes[*pos] as char).is_ascii_whitespace() {
            *pos += 1;
        }
    };

    loop {
        skip_ws(&mut pos);
        let Some((name, name_start, name_end)) = read_identifier(source, pos, language) else {
            break;
        };
        pos = name_end;
        last_end = name_end;

        let mut arity = 0;
        let mut after = pos;
        skip_ws(&mut after);
        match language {
            SourceLanguage::CSharp if source[after..].starts_with('<') => {
                if let Some((count, close)) = generic_arity(source, after, '<', '>') {
                    arity = count;
                    pos = close;
                    last_end = close;
                }
            }
            SourceLanguage::VisualBasic if source[after..].starts_with('(') => {
                let mut inner = after + 1;
                skip_ws(&mut inner);
                let is_of = source[inner..]
                    .get(..2)
                    .is_some_and(|w| w.eq_ignore_ascii_case("of"))
                    && !source[inner + 2..].starts_with(is_ident_char);
                if is_of {
                    if let Some((count, close)) = generic_arity(source, after, '(', ')') {
                        arity = count;
                        pos = close;
                        last_end = close;
                    }
                }
            }
            _ => {}
        }

        let mut sep = pos;
        skip_ws(&mut sep);
        let rest = &source[sep..];

        // `global::` / `Global.` prefix
        if segments.is_empty() && arity == 0 && !global && alias_qualifier.is_none() {
            let is_global_kw = match language {
                SourceLanguage::CSharp => name == "global" && rest.starts_with("::"),
                SourceLanguage::VisualBasic => name.eq_ignore_ascii_case("global") && rest.starts_with('.'),
            };
            if is_global_kw {
                global = true;
                pos = sep + if language == SourceLanguage::CSharp { 2 } else { 1 };
                continue;
            }
            if language == SourceLanguage::CSharp && rest.starts_with("::") {
                alias_qualifier = Some(NameSegment::new(name, 0, start + name_start));
                pos = sep + 2;
                continue;
            }
        }

        segments.push(NameSegment::new(name, arity, start + name_start));
        if rest.starts_with('.') {
            pos = sep + 1;
            continue;
        }
        break;
    }

    if segments.is_empty() {
        return None;
    }
    let text_end = start + last_end;
    let literal = text[start..text_end].split_whitespace().collect::<Vec<_>>().join(" ");
    Some(NameReference {
        text: literal,
        segments,
        global,
        alias_qualifier,
        start,
        end: text_end,
    })
}

/// Identifier at `pos`, returning (name without escapes, start, end).
fn read_identifier(source: &str, pos: usize, language: SourceLanguage) -> Option<(String, usize, usize)> {
    let rest = source.get(pos..)?;
    match language {
        SourceLanguage::CSharp => {
            let (offset, body) = match rest.strip_prefix('@') {
                Some(body) => (1, body),
                None => (0, rest),
            };
            let first = body.chars().next()?;
            if !(first.is_alphabetic() || first == '_') {
                return None;
            }
            let len = body.find(|c: char| !is_ident_char(c)).unwrap_or(body.len());
            Some((body[..len].to_string(), pos, pos + offset + len))
        }
        SourceLanguage::VisualBasic => {
            if let Some(body) = rest.strip_prefix('[') {
                let close = body.find(']')?;
                return Some((body[..close].to_string(), pos, pos + close + 2));
            }
            let first = rest.chars().next()?;
            if !(first.is_alphabetic() || first == '_') {
                return None;
            }
            let len = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
            Some((rest[..len].to_string(), pos, pos + len))
        }
    }
}

/// Count top-level arguments of the group opened at `open_pos`; returns (arity, close end).
fn generic_arity(source: &str, open_pos: usize, open: char, close: char) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut commas = 0usize;
    for (i, c) in source[open_pos..].char_indices() {
        if c == open || (open == '<' && c == '(') || (open == '(' && c == '<') {
            depth += 1;
        } else if c == close || (open == '<' && c == ')') || (open == '(' && c == '>') {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                if c != close {
                    return None;
                }
                return Some((commas + 1, open_pos + i + c.len_utf8()));
            }
        } else if c == ',' && depth == 1 {
            commas += 1;
        } else if open == '<' && (c == ';' || c == '{' || c == '=') {
            return None;
        }
    }
    None
}

/// The name reference whose segment spans `offset`, truncated after that segment.
///
/// `System.Collections.Generic.List<int>` queried on `Generic` yields
/// `System.Collections.Generic`.
pub fn reference_at(text: &str, offset: usize, language: SourceLanguage) -> Option<NameReference> {
    let (ident_start, ident_end) = identifier_span(text, offset)?;

    // Walk left across `.`, `::` and generic argument lists.
    let mut start = ident_start;
    loop {
        let before = text[..start].trim_end();
        let mut qualifier_end = if let Some(rest) = before.strip_suffix("::") {
            rest.trim_end().len()
        } else if let Some(rest) = before.strip_suffix('.') {
            rest.trim_end().len()
        } else {
            break;
        };
        let tail = &text[..qualifier_end];
        if language == SourceLanguage::CSharp && tail.ends_with('>') {
            qualifier_end = match matching_open(text, qualifier_end, '<', '>') {
                Some(open) => text[..open].trim_end().len(),
                None => break,
            };
        } else if language == SourceLanguage::VisualBasic && tail.ends_with(')') {
            let Some(open) = matching_open(text, qualifier_end, '(', ')') else { break };
            let inner = text[open + 1..].trim_start();
            if !inner.get(..2).is_some_and(|w| w.eq_ignore_ascii_case("of")) {
                break;
            }
            qualifier_end = text[..open].trim_end().len();
        }
        let Some((last_char, _)) = text[..qualifier_end].char_indices().next_back() else {
            break;
        };
        let Some((qualifier_start, _)) = identifier_span(text, last_char) else {
            break;
        };
        start = qualifier_start;
        if language == SourceLanguage::CSharp && text[..start].ends_with('@') {
            start -= 1;
        }
        if language == SourceLanguage::VisualBasic && text[..start].ends_with('[') {
            start -= 1;
        }
    }
    if language == SourceLanguage::CSharp && text[..ident_start].ends_with('@') && start == ident_start {
        start -= 1;
    }

    // Include generic arguments of the queried segment.
    let mut end = ident_end;
    if language == SourceLanguage::VisualBasic && text[end..].starts_with(']') {
        end += 1;
    }
    let after = &text[end..];
    let trimmed = after.trim_start();
    let gap = after.len() - trimmed.len();
    let generic_close = match language {
        SourceLanguage::CSharp if trimmed.starts_with('<') => {
            generic_arity(text, end + gap, '<', '>').map(|(_, close)| close)
        }
        SourceLanguage::VisualBasic if trimmed.starts_with('(') => {
            let inner = trimmed[1..].trim_start();
            if inner.get(..2).is_some_and(|w| w.eq_ignore_ascii_case("of")) {
                generic_arity(text, end + gap, '(', ')').map(|(_, close)| close)
            } else {
                None
            }
        }
        _ => None,
    };
    if let Some(close) = generic_close {
        end = close;
    }

    let mut reference = parse_reference(text, start, end, language)?;
    // Truncate to the segment under the cursor.
    if let Some(idx) = reference.segments.iter().rposition(|s| s.offset <= offset) {
        reference.segments.truncate(idx + 1);
    }
    Some(reference)
}

/// Byte span of the identifier containing (or starting at) `offset`.
fn identifier_span(text: &str, offset: usize) -> Option<(usize, usize)> {
    if offset > text.len() || !text.is_char_boundary(offset) {
        return None;
    }
    let mut start = offset;
    // A `[` escape or `@` verbatim prefix sits on the identifier start.
    if text[start..].starts_with('[') || text[start..].starts_with('@') {
        start += 1;
    }
    let right = &text[start..];
    if !right.starts_with(is_ident_char) {
        // Offset just past the identifier.
        let left = &text[..start];
        if !left.ends_with(is_ident_char) {
            return None;
        }
    }
    let begin = text[..start]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map_or(start, |(i, _)| i);
    let end = start + text[start..].find(|c: char| !is_ident_char(c)).unwrap_or(text.len() - start);
    if begin == end {
        return None;
    }
    let first = text[begin..].chars().next()?;
    if first.is_ascii_digit() {
        return None;
    }
    Some((begin, end))
}

/// Start offset of the `open` matching the `close` that ends at `close_end`.
fn matching_open(text: &str, close_end: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[..close_end].char_indices().rev() {
        if c == close {
            depth += 1;
        } else if c == open {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        } else if c == ';' || c == '{' || c == '}' {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(reference: &NameReference) -> Vec<(String, usize)> {
        reference
            .segments
            .iter()
            .map(|s| (s.name.clone(), s.arity))
            .collect()
    }

    #[test]
    fn test_parse_qualified_generic() {
        let text = "class A : System.Collections.Generic.Dictionary<string, List<int>> {}";
        let start = text.find("System").unwrap();
        let end = text.find(" {}").unwrap();
        let reference = parse_reference(text, start, end, SourceLanguage::CSharp).unwrap();
        assert_eq!(
            names(&reference),
            vec![
                ("System".to_string(), 0),
                ("Collections".to_string(), 0),
                ("Generic".to_string(), 0),
                ("Dictionary".to_string(), 2)
            ]
        );
        assert_eq!(reference.query_offset(), text.find("Dictionary").unwrap());
        assert_eq!(reference.text, "System.Collections.Generic.Dictionary<string, List<int>>");
    }

    #[test]
    fn test_parse_global_and_alias_qualifier() {
        let text = "global::Lib.Base";
        let reference = parse_reference(text, 0, text.len(), SourceLanguage::CSharp).unwrap();
        assert!(reference.global);
        assert_eq!(reference.segments.len(), 2);

        let text = "Alias::Base";
        let reference = parse_reference(text, 0, text.len(), SourceLanguage::CSharp).unwrap();
        assert_eq!(reference.alias_qualifier.as_ref().map(|a| a.name.as_str()), Some("Alias"));
        assert_eq!(names(&reference), vec![("Base".to_string(), 0)]);
    }

    #[test]
    fn test_parse_visual_basic_of() {
        let text = "Inherits Global.Lib.Repository(Of Customer, Order)";
        let start = text.find("Global").unwrap();
        let reference = parse_reference(text, start, text.len(), SourceLanguage::VisualBasic).unwrap();
        assert!(reference.global);
        assert_eq!(
            names(&reference),
            vec![("Lib".to_string(), 0), ("Repository".to_string(), 2)]
        );
    }

    #[test]
    fn test_reference_at_truncates_after_cursor() {
        let text = "var x = new Foo.Bar<int>.Baz();";
        let reference = reference_at(text, text.find("Bar").unwrap() + 1, SourceLanguage::CSharp).unwrap();
        assert_eq!(names(&reference), vec![("Foo".to_string(), 0), ("Bar".to_string(), 1)]);

        let reference = reference_at(text, text.find("Baz").unwrap(), SourceLanguage::CSharp).unwrap();
        assert_eq!(reference.segments.len(), 3);
    }

    #[test]
    fn test_reference_at_rejects_non_identifier() {
        assert!(reference_at("a + b", 2, SourceLanguage::CSharp).is_none());
        assert!(reference_at("x = 42", 5, SourceLanguage::CSharp).is_none());
    }
}
