//! Visual Basic statement and block parser
//!
//! Visual Basic is line oriented: every declaration is one logical statement and every block
//! is closed by an `End <keyword>` statement. The parser lexes the file, joins physical lines
//! into logical statements (explicit ` _` and the common implicit continuations), classifies
//! each statement and nests declarations into an arena. Method and property bodies are
//! skipped, not parsed.

use dotres_core::{NameReference, NameSegment};

use crate::comments::CommentSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Punct,
    Comment,
    Directive,
    Newline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

/// One logical statement: code tokens only, comments removed.
#[derive(Debug, Clone)]
pub struct Statement {
    pub tokens: Vec<Token>,
    pub start: usize,
    pub end: usize,
    pub start_row: usize,
    pub end_row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VbNodeKind {
    Imports,
    Namespace,
    Class,
    Structure,
    Interface,
    Module,
    Enum,
    EnumMember,
    Inherits,
    Implements,
    Method,
    Constructor,
    Operator,
    Property,
    Event,
    Delegate,
    Declare,
    Field,
}

impl VbNodeKind {
    fn end_keyword(self) -> Option<&'static str> {
        match self {
            VbNodeKind::Namespace => Some("namespace"),
            VbNodeKind::Class => Some("class"),
            VbNodeKind::Structure => Some("structure"),
            VbNodeKind::Interface => Some("interface"),
            VbNodeKind::Module => Some("module"),
            VbNodeKind::Enum => Some("enum"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbName {
    pub text: String,
    pub offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VbParam {
    pub name: String,
    pub type_text: Option<String>,
    pub by_ref: bool,
    pub optional: bool,
    pub param_array: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbDeclarator {
    pub name: VbName,
    pub end: usize,
    pub type_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbImportClause {
    pub alias: Option<NameSegment>,
    pub target: NameReference,
}

/// A declaration statement or block.
#[derive(Debug, Clone)]
pub struct VbNode {
    pub kind: VbNodeKind,
    pub start: usize,
    pub end: usize,
    /// Statement index of the opening statement.
    pub stmt: usize,
    /// Statement index of the closing `End` statement, or `stmt` for single statements.
    pub end_stmt: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub name: Option<VbName>,
    pub modifiers: Vec<String>,
    pub attributes: Option<String>,
    pub type_params: Vec<String>,
    /// `None` when the declaration has no parameter list at all.
    pub params: Option<Vec<VbParam>>,
    pub as_type: Option<String>,
    pub is_sub: bool,
    pub declarators: Vec<VbDeclarator>,
    /// Inherits / Implements entries, or the namespace name.
    pub names: Vec<NameReference>,
    pub imports: Vec<VbImportClause>,
}

impl VbNode {
    fn new(kind: VbNodeKind, statement: &Statement, stmt: usize) -> Self {
        VbNode {
            kind,
            start: statement.start,
            end: statement.end,
            stmt,
            end_stmt: stmt,
            parent: None,
            children: Vec::new(),
            name: None,
            modifiers: Vec::new(),
            attributes: None,
            type_params: Vec::new(),
            params: None,
            as_type: None,
            is_sub: false,
            declarators: Vec::new(),
            names: Vec::new(),
            imports: Vec::new(),
        }
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.as_deref().is_some_and(|a| a.contains(name))
    }
}

/// Parsed Visual Basic file.
#[derive(Debug, Clone, Default)]
pub struct VbSyntaxTree {
    /// Declarations in source order; parents always precede children.
    pub nodes: Vec<VbNode>,
    pub roots: Vec<usize>,
    pub statements: Vec<Statement>,
    pub comments: Vec<CommentSpan>,
    pub len: usize,
}

impl VbSyntaxTree {
    pub fn statement(&self, idx: usize) -> Option<&Statement> {
        self.statements.get(idx)
    }
}

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "friend", "shared", "shadows", "overloads", "overrides",
    "overridable", "notoverridable", "mustoverride", "mustinherit", "notinheritable", "partial",
    "readonly", "writeonly", "default", "withevents", "dim", "const", "static", "widening",
    "narrowing", "async", "iterator", "custom",
];

const ACCESSORS: &[&str] = &["get", "set", "addhandler", "removehandler", "raiseevent"];

/// Parse Visual Basic source text.
pub fn parse(text: &str) -> VbSyntaxTree {
    let line_starts = line_starts(text);
    let tokens = lex(text);
    let row_of = |offset: usize| match line_starts.binary_search(&offset) {
        Ok(row) => row,
        Err(row) => row.saturating_sub(1),
    };

    let comments = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Comment)
        .map(|t| CommentSpan {
            start: t.start,
            end: t.end,
            start_row: row_of(t.start),
            end_row: row_of(t.end.saturating_sub(1).max(t.start)),
            text: text[t.start..t.end].to_string(),
        })
        .collect();

    let statements = split_statements(text, &tokens)
        .into_iter()
        .filter_map(|toks| {
            let first = toks.first()?;
            let last = toks.last()?;
            Some(Statement {
                start: first.start,
                end: last.end,
                start_row: row_of(first.start),
                end_row: row_of(last.end.saturating_sub(1).max(last.start)),
                tokens: toks,
            })
        })
        .collect::<Vec<_>>();

    let mut builder = BlockBuilder {
        text,
        statements: &statements,
        nodes: Vec::new(),
        roots: Vec::new(),
        frames: Vec::new(),
    };
    builder.run();
    let BlockBuilder { nodes, roots, .. } = builder;

    VbSyntaxTree {
        nodes,
        roots,
        statements,
        comments,
        len: text.len(),
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize the whole file. Line continuations are consumed here.
pub fn lex(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let end_of = |i: usize| chars.get(i).map_or(text.len(), |(o, _)| *o);
    let mut i = 0;
    let mut line_start = true;

    while i < chars.len() {
        let (offset, c) = chars[i];
        if c == '\n' {
            tokens.push(Token { kind: TokenKind::Newline, start: offset, end: offset + 1 });
            line_start = true;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let kind = if c == '\'' || c == '\u{2018}' || c == '\u{2019}' {
            while i < chars.len() && chars[i].1 != '\n' && chars[i].1 != '\r' {
                i += 1;
            }
            TokenKind::Comment
        } else if c == '"' || c == '\u{201C}' || c == '\u{201D}' {
            i += 1;
            while i < chars.len() && chars[i].1 != '\n' {
                let ch = chars[i].1;
                i += 1;
                if ch == '"' || ch == '\u{201C}' || ch == '\u{201D}' {
                    if i < chars.len() && chars[i].1 == '"' {
                        i += 1;
                    } else {
                        break;
                    }
                }
            }
            if i < chars.len() && matches!(chars[i].1, 'c' | 'C') {
                i += 1;
            }
            TokenKind::String
        } else if c == '#' && line_start {
            while i < chars.len() && chars[i].1 != '\n' {
                i += 1;
            }
            TokenKind::Directive
        } else if c == '#' {
            i += 1;
            while i < chars.len() && chars[i].1 != '#' && chars[i].1 != '\n' {
                i += 1;
            }
            if i < chars.len() && chars[i].1 == '#' {
                i += 1;
            }
            TokenKind::Number
        } else if c == '[' {
            i += 1;
            while i < chars.len() && chars[i].1 != ']' && chars[i].1 != '\n' {
                i += 1;
            }
            if i < chars.len() && chars[i].1 == ']' {
                i += 1;
            }
            TokenKind::Identifier
        } else if c == '_' && rest_of_line_blank(&chars, i + 1) {
            // Explicit line continuation: drop everything through the newline.
            i += 1;
            while i < chars.len() && chars[i].1 != '\n' {
                i += 1;
            }
            i += 1;
            continue;
        } else if is_ident_start(c) {
            while i < chars.len() && is_ident_continue(chars[i].1) {
                i += 1;
            }
            let word = &text[offset..end_of(i)];
            if word.eq_ignore_ascii_case("rem")
                && (i >= chars.len() || chars[i].1.is_whitespace())
            {
                while i < chars.len() && chars[i].1 != '\n' && chars[i].1 != '\r' {
                    i += 1;
                }
                TokenKind::Comment
            } else {
                if i < chars.len() && matches!(chars[i].1, '%' | '&' | '@' | '!' | '$') {
                    i += 1;
                }
                TokenKind::Identifier
            }
        } else if c.is_ascii_digit()
            || (c == '&' && chars.get(i + 1).is_some_and(|(_, n)| matches!(n, 'H' | 'h' | 'O' | 'o' | 'B' | 'b')))
        {
            i += 1;
            while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '.') {
                i += 1;
            }
            TokenKind::Number
        } else {
            i += 1;
            TokenKind::Punct
        };

        tokens.push(Token { kind, start: offset, end: end_of(i) });
        line_start = false;
    }
    tokens
}

fn rest_of_line_blank(chars: &[(usize, char)], from: usize) -> bool {
    chars[from..]
        .iter()
        .take_while(|(_, c)| *c != '\n')
        .all(|(_, c)| c.is_whitespace())
}

fn punct_is(text: &str, token: &Token, ch: char) -> bool {
    token.kind == TokenKind::Punct && text[token.start..token.end].starts_with(ch)
}

/// Group code tokens into logical statements.
fn split_statements(text: &str, tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut lines: Vec<Vec<Token>> = vec![Vec::new()];
    for token in tokens {
        match token.kind {
            TokenKind::Newline => lines.push(Vec::new()),
            TokenKind::Comment | TokenKind::Directive => {}
            _ => {
                if let Some(line) = lines.last_mut() {
                    line.push(*token);
                }
            }
        }
    }
    lines.retain(|line| !line.is_empty());

    let mut statements: Vec<Vec<Token>> = Vec::new();
    for line in lines {
        let join = match statements.last() {
            Some(previous) => continues(text, previous, &line),
            None => false,
        };
        if join {
            if let Some(previous) = statements.last_mut() {
                previous.extend(line);
            }
        } else {
            statements.push(line);
        }
    }
    statements
}

/// Implicit line continuation rules covering declarations.
fn continues(text: &str, previous: &[Token], next: &[Token]) -> bool {
    let (Some(last), Some(first)) = (previous.last(), next.first()) else {
        return false;
    };
    if last.kind == TokenKind::Punct {
        let ch = &text[last.start..last.end];
        if matches!(ch, "," | "(" | "{" | "&" | "=" | "+" | ".") {
            return true;
        }
    }
    if punct_is(text, first, ')') || punct_is(text, first, '}') {
        return true;
    }
    // An attribute block alone on its line applies to the next statement.
    punct_is(text, &previous[0], '<') && punct_is(text, last, '>') && attribute_prefix_len(text, previous) == previous.len()
}

/// Number of leading tokens forming `<...>` attribute blocks.
fn attribute_prefix_len(text: &str, tokens: &[Token]) -> usize {
    let mut pos = 0;
    while pos < tokens.len() && punct_is(text, &tokens[pos], '<') {
        let mut depth = 0i32;
        let mut closed = None;
        for (i, token) in tokens.iter().enumerate().skip(pos) {
            if punct_is(text, token, '<') {
                depth += 1;
            } else if punct_is(text, token, '>') {
                depth -= 1;
                if depth == 0 {
                    closed = Some(i);
                    break;
                }
            }
        }
        match closed {
            Some(i) => pos = i + 1,
            None => return pos,
        }
    }
    pos
}

/// Token cursor over one statement.
struct Cursor<'a> {
    text: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, tokens: &'a [Token]) -> Self {
        Cursor { text, tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn slice(&self, token: &Token) -> &'a str {
        &self.text[token.start..token.end]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| {
            t.kind == TokenKind::Identifier && self.slice(t).eq_ignore_ascii_case(keyword)
        })
    }

    fn keyword_at(&self, ahead: usize) -> Option<String> {
        self.peek_at(ahead)
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| self.slice(t).to_ascii_lowercase())
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn is_punct(&self, ch: char) -> bool {
        self.peek().is_some_and(|t| punct_is(self.text, t, ch))
    }

    fn eat_punct(&mut self, ch: char) -> bool {
        if self.is_punct(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn identifier(&mut self) -> Option<VbName> {
        let token = self.peek()?;
        if token.kind != TokenKind::Identifier {
            return None;
        }
        self.pos += 1;
        Some(VbName {
            text: identifier_text(self.slice(token)).to_string(),
            offset: token.start,
        })
    }

    /// Consume leading attribute blocks, returning their source text.
    fn attributes(&mut self) -> Option<String> {
        let count = attribute_prefix_len(self.text, &self.tokens[self.pos..]);
        if count == 0 {
            return None;
        }
        let first = self.tokens[self.pos];
        let last = self.tokens[self.pos + count - 1];
        self.pos += count;
        Some(self.text[first.start..last.end].to_string())
    }

    fn modifiers(&mut self) -> Vec<String> {
        let mut modifiers = Vec::new();
        while let Some(word) = self.keyword_at(0) {
            if !MODIFIERS.contains(&word.as_str()) {
                break;
            }
            // `Default` and `Custom` are also ordinary identifiers; only treat them as
            // modifiers when another keyword follows.
            if (word == "custom" || word == "default") && self.keyword_at(1).is_none() {
                break;
            }
            modifiers.push(word);
            self.pos += 1;
        }
        modifiers
    }

    /// Index of the token closing the group opened at `self.pos`.
    fn matching_close(&self) -> Option<usize> {
        let mut depth = 0i32;
        for (i, token) in self.tokens.iter().enumerate().skip(self.pos) {
            if punct_is(self.text, token, '(') || punct_is(self.text, token, '{') {
                depth += 1;
            } else if punct_is(self.text, token, ')') || punct_is(self.text, token, '}') {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        None
    }

    /// `(Of T, U)` type parameter or argument group. Returns the comma-split item slices.
    fn of_group(&mut self) -> Option<Vec<&'a [Token]>> {
        if !(self.is_punct('(')
            && self
                .keyword_at(1)
                .is_some_and(|w| w == "of"))
        {
            return None;
        }
        let close = self.matching_close()?;
        let inner = &self.tokens[self.pos + 2..close];
        self.pos = close + 1;
        Some(split_top_level(self.text, inner))
    }

    /// Parenthesized list, comma split at depth zero.
    fn paren_group(&mut self) -> Option<Vec<&'a [Token]>> {
        if !self.is_punct('(') {
            return None;
        }
        let close = self.matching_close()?;
        let inner = &self.tokens[self.pos + 1..close];
        self.pos = close + 1;
        Some(split_top_level(self.text, inner))
    }

    /// Tokens up to (not including) a top-level `=` or the end of the statement.
    fn until_equals(&mut self) -> &'a [Token] {
        let start = self.pos;
        let mut depth = 0i32;
        while let Some(token) = self.peek() {
            if punct_is(self.text, token, '(') || punct_is(self.text, token, '{') {
                depth += 1;
            } else if punct_is(self.text, token, ')') || punct_is(self.text, token, '}') {
                depth -= 1;
            } else if depth == 0 && punct_is(self.text, token, '=') {
                break;
            } else if depth == 0 && token.kind == TokenKind::Identifier {
                let word = self.slice(token).to_ascii_lowercase();
                if matches!(word.as_str(), "implements" | "handles") {
                    break;
                }
            }
            self.pos += 1;
        }
        &self.tokens[start..self.pos]
    }

    /// `As [New] Type` clause text.
    fn as_clause(&mut self) -> Option<String> {
        if !self.eat_keyword("as") {
            return None;
        }
        self.attributes();
        let is_new = self.eat_keyword("new");
        let tokens = self.until_equals();
        type_text(self.text, tokens, is_new)
    }

    /// A possibly qualified name with `(Of ...)` arities.
    fn name_reference(&mut self) -> Option<NameReference> {
        let first = self.peek()?;
        let start = first.start;
        let mut global = false;
        if self.is_keyword("global") && self.peek_at(1).is_some_and(|t| punct_is(self.text, t, '.')) {
            global = true;
            self.pos += 2;
        }
        let mut segments = Vec::new();
        let mut end;
        loop {
            let name = self.identifier()?;
            end = self.tokens[self.pos - 1].end;
            let arity = match self.of_group() {
                Some(items) => {
                    end = self.tokens[self.pos - 1].end;
                    items.len()
                }
                None => 0,
            };
            segments.push(NameSegment::new(name.text, arity, name.offset));
            if self.is_punct('.') && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Identifier) {
                self.pos += 1;
                continue;
            }
            break;
        }
        Some(NameReference {
            text: collapse_whitespace(&self.text[start..end]),
            segments,
            global,
            alias_qualifier: None,
            start,
            end,
        })
    }
}

/// Identifier text without `[...]` escaping or a type character suffix.
pub fn identifier_text(raw: &str) -> &str {
    let raw = raw.trim_start_matches('[').trim_end_matches(']');
    raw.trim_end_matches(['%', '&', '@', '!', '$'])
}

fn split_top_level<'a>(text: &str, tokens: &'a [Token]) -> Vec<&'a [Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut items = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if punct_is(text, token, '(') || punct_is(text, token, '{') {
            depth += 1;
        } else if punct_is(text, token, ')') || punct_is(text, token, '}') {
            depth -= 1;
        } else if depth == 0 && punct_is(text, token, ',') {
            items.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    items.push(&tokens[start..]);
    items
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Source text of a type; `As New T(args)` drops the constructor arguments.
fn type_text(text: &str, tokens: &[Token], is_new: bool) -> Option<String> {
    let first = tokens.first()?;
    let mut last = tokens.last()?;
    if is_new && punct_is(text, last, ')') {
        // Find the group that the final `)` closes and drop it unless it is `(Of ...)`.
        let mut depth = 0i32;
        for (i, token) in tokens.iter().enumerate().rev() {
            if punct_is(text, token, ')') {
                depth += 1;
            } else if punct_is(text, token, '(') {
                depth -= 1;
                if depth == 0 {
                    let is_of = tokens
                        .get(i + 1)
                        .is_some_and(|t| text[t.start..t.end].eq_ignore_ascii_case("of"));
                    if !is_of && i > 0 {
                        last = &tokens[i - 1];
                    }
                    break;
                }
            }
        }
    }
    Some(collapse_whitespace(&text[first.start..last.end]))
}

fn parse_params(text: &str, items: Vec<&[Token]>) -> Vec<VbParam> {
    items
        .into_iter()
        .filter(|item| !item.is_empty())
        .map(|item| {
            let mut cursor = Cursor::new(text, item);
            cursor.attributes();
            let mut param = VbParam::default();
            while let Some(word) = cursor.keyword_at(0) {
                match word.as_str() {
                    "byval" => {}
                    "byref" => param.by_ref = true,
                    "optional" => param.optional = true,
                    "paramarray" => param.param_array = true,
                    _ => break,
                }
                cursor.pos += 1;
            }
            let name = cursor.identifier();
            param.name = name.map(|n| n.text).unwrap_or_default();
            let mut rank = String::new();
            if cursor.is_punct('(') {
                if let Some(close) = cursor.matching_close() {
                    let open = cursor.tokens[cursor.pos];
                    rank = text[open.start..cursor.tokens[close].end].to_string();
                    cursor.pos = close + 1;
                }
            }
            cursor.eat_punct('?');
            param.type_text = cursor.as_clause().map(|t| format!("{}{}", t, rank));
            param
        })
        .collect()
}

/// Parse comma-separated field declarators sharing trailing `As` clauses.
fn parse_declarators(text: &str, items: Vec<&[Token]>) -> Vec<VbDeclarator> {
    let mut declarators = Vec::new();
    let mut pending: Vec<(VbName, usize, String)> = Vec::new();
    for item in items.into_iter().filter(|i| !i.is_empty()) {
        let mut cursor = Cursor::new(text, item);
        let Some(name) = cursor.identifier() else { continue };
        let mut end = item[0].end;
        let mut rank = String::new();
        if cursor.is_punct('(') {
            if let Some(close) = cursor.matching_close() {
                let open = cursor.tokens[cursor.pos];
                rank = text[open.start..cursor.tokens[close].end].to_string();
                end = cursor.tokens[close].end;
                cursor.pos = close + 1;
            }
        }
        if cursor.eat_punct('?') {
            end = item[cursor.pos - 1].end;
        }
        pending.push((name, end, rank));
        let as_type = cursor.as_clause();
        let has_initializer = cursor.is_punct('=');
        if as_type.is_some() || has_initializer {
            for (name, end, rank) in pending.drain(..) {
                declarators.push(VbDeclarator {
                    name,
                    end,
                    type_text: as_type.as_ref().map(|t| format!("{}{}", t, rank)),
                });
            }
        }
    }
    for (name, end, _) in pending {
        declarators.push(VbDeclarator { name, end, type_text: None });
    }
    declarators
}

enum Frame {
    Container { node: usize, end_keyword: &'static str },
    Body { node: usize, end_keyword: &'static str, lambda_depth: usize },
}

struct BlockBuilder<'a> {
    text: &'a str,
    statements: &'a [Statement],
    nodes: Vec<VbNode>,
    roots: Vec<usize>,
    frames: Vec<Frame>,
}

impl<'a> BlockBuilder<'a> {
    fn run(&mut self) {
        for idx in 0..self.statements.len() {
            if self.in_body(idx) {
                continue;
            }
            self.statement(idx);
        }
        // Close anything left open at end of file.
        let end = self.statements.last().map_or(0, |s| s.end);
        let last = self.statements.len().saturating_sub(1);
        for frame in self.frames.drain(..) {
            let node = match frame {
                Frame::Container { node, .. } | Frame::Body { node, .. } => node,
            };
            self.nodes[node].end = end;
            self.nodes[node].end_stmt = last;
        }
    }

    fn container_parent(&self) -> Option<usize> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::Container { node, .. } => Some(*node),
            Frame::Body { .. } => None,
        })
    }

    fn in_interface(&self) -> bool {
        self.container_parent()
            .is_some_and(|p| self.nodes[p].kind == VbNodeKind::Interface)
    }

    fn in_enum(&self) -> bool {
        self.container_parent()
            .is_some_and(|p| self.nodes[p].kind == VbNodeKind::Enum)
    }

    /// Handle a statement inside a method-like body. Returns true if consumed.
    fn in_body(&mut self, idx: usize) -> bool {
        let Some(Frame::Body { node, end_keyword, lambda_depth }) = self.frames.last_mut() else {
            return false;
        };
        let (node, end_keyword) = (*node, *end_keyword);
        let statement = &self.statements[idx];
        let mut cursor = Cursor::new(self.text, &statement.tokens);

        if cursor.eat_keyword("end") {
            let word = cursor.keyword_at(0).unwrap_or_default();
            if *lambda_depth > 0 && (word == "sub" || word == "function") {
                *lambda_depth -= 1;
                return true;
            }
            if word == end_keyword {
                self.frames.pop();
                self.nodes[node].end = statement.end;
                self.nodes[node].end_stmt = idx;
                return true;
            }
            if matches!(
                word.as_str(),
                "class" | "structure" | "module" | "interface" | "namespace" | "enum"
            ) {
                // Missing `End Sub`: close the body before the enclosing block ends.
                self.frames.pop();
                let previous = idx.saturating_sub(1);
                self.nodes[node].end = self.statements[previous].end;
                self.nodes[node].end_stmt = previous;
                return false;
            }
            return true;
        }

        if opens_multiline_lambda(self.text, &statement.tokens) {
            *lambda_depth += 1;
        }
        true
    }

    fn push_node(&mut self, mut node: VbNode) -> usize {
        let parent = self.container_parent();
        node.parent = parent;
        let idx = self.nodes.len();
        self.nodes.push(node);
        match parent {
            Some(p) => self.nodes[p].children.push(idx),
            None => self.roots.push(idx),
        }
        idx
    }

    fn next_is_accessor(&self, idx: usize) -> bool {
        let Some(next) = self.statements.get(idx + 1) else {
            return false;
        };
        let mut cursor = Cursor::new(self.text, &next.tokens);
        cursor.attributes();
        cursor.modifiers();
        cursor
            .keyword_at(0)
            .is_some_and(|w| ACCESSORS.contains(&w.as_str()))
    }

    fn statement(&mut self, idx: usize) {
        let statement = &self.statements[idx];
        let text = self.text;
        let mut cursor = Cursor::new(text, &statement.tokens);
        let attributes = cursor.attributes();
        let modifiers = cursor.modifiers();
        let keyword = cursor.keyword_at(0).unwrap_or_default();

        let mut node = VbNode::new(VbNodeKind::Field, statement, idx);
        node.attributes = attributes;
        node.modifiers = modifiers;

        match keyword.as_str() {
            "end" => {
                cursor.bump();
                let word = cursor.keyword_at(0).unwrap_or_default();
                self.close_container(&word, idx);
            }
            "imports" => {
                cursor.bump();
                node.kind = VbNodeKind::Imports;
                for item in split_top_level(text, &statement.tokens[cursor.pos..]) {
                    let mut clause = Cursor::new(text, item);
                    if clause.is_punct('<') {
                        continue;
                    }
                    let alias = if clause.peek_at(1).is_some_and(|t| punct_is(text, t, '=')) {
                        let name = clause.identifier();
                        clause.bump();
                        name.map(|n| NameSegment::new(n.text, 0, n.offset))
                    } else {
                        None
                    };
                    if let Some(target) = clause.name_reference() {
                        node.imports.push(VbImportClause { alias, target });
                    }
                }
                self.push_node(node);
            }
            "namespace" => {
                cursor.bump();
                node.kind = VbNodeKind::Namespace;
                if let Some(name) = cursor.name_reference() {
                    node.names.push(name);
                }
                let idx = self.push_node(node);
                self.frames.push(Frame::Container { node: idx, end_keyword: "namespace" });
            }
            "class" | "structure" | "interface" | "module" | "enum" => {
                cursor.bump();
                node.kind = match keyword.as_str() {
                    "class" => VbNodeKind::Class,
                    "structure" => VbNodeKind::Structure,
                    "interface" => VbNodeKind::Interface,
                    "module" => VbNodeKind::Module,
                    _ => VbNodeKind::Enum,
                };
                node.name = cursor.identifier();
                node.type_params = cursor
                    .of_group()
                    .map(|items| type_parameter_names(text, items))
                    .unwrap_or_default();
                node.as_type = cursor.as_clause();
                let end_keyword = node.kind.end_keyword().unwrap_or("class");
                let idx = self.push_node(node);
                self.frames.push(Frame::Container { node: idx, end_keyword });
            }
            "inherits" | "implements" => {
                cursor.bump();
                node.kind = if keyword == "inherits" {
                    VbNodeKind::Inherits
                } else {
                    VbNodeKind::Implements
                };
                while let Some(name) = cursor.name_reference() {
                    node.names.push(name);
                    if !cursor.eat_punct(',') {
                        break;
                    }
                }
                self.push_node(node);
            }
            "sub" | "function" => {
                cursor.bump();
                node.is_sub = keyword == "sub";
                if node.is_sub && cursor.is_keyword("new") {
                    node.kind = VbNodeKind::Constructor;
                    let token = cursor.bump();
                    node.name = token.map(|t| VbName { text: "New".to_string(), offset: t.start });
                } else {
                    node.kind = VbNodeKind::Method;
                    node.name = cursor.identifier();
                    node.type_params = cursor
                        .of_group()
                        .map(|items| type_parameter_names(text, items))
                        .unwrap_or_default();
                }
                node.params = cursor.paren_group().map(|items| parse_params(text, items));
                node.as_type = cursor.as_clause();
                let has_body = !node.has_modifier("mustoverride") && !self.in_interface();
                let end_keyword = if node.is_sub { "sub" } else { "function" };
                let idx = self.push_node(node);
                if has_body {
                    self.frames.push(Frame::Body { node: idx, end_keyword, lambda_depth: 0 });
                }
            }
            "operator" => {
                cursor.bump();
                node.kind = VbNodeKind::Operator;
                let start = cursor.pos;
                while !cursor.at_end() && !cursor.is_punct('(') {
                    cursor.bump();
                }
                let op_tokens = &statement.tokens[start..cursor.pos];
                if let (Some(first), Some(last)) = (op_tokens.first(), op_tokens.last()) {
                    node.name = Some(VbName {
                        text: text[first.start..last.end].split_whitespace().collect(),
                        offset: first.start,
                    });
                }
                node.params = cursor.paren_group().map(|items| parse_params(text, items));
                node.as_type = cursor.as_clause();
                let has_body = !self.in_interface();
                let idx = self.push_node(node);
                if has_body {
                    self.frames.push(Frame::Body { node: idx, end_keyword: "operator", lambda_depth: 0 });
                }
            }
            "property" => {
                cursor.bump();
                node.kind = VbNodeKind::Property;
                node.name = cursor.identifier();
                node.params = cursor.paren_group().map(|items| parse_params(text, items));
                node.as_type = cursor.as_clause();
                let has_body = !node.has_modifier("mustoverride")
                    && !self.in_interface()
                    && self.next_is_accessor(idx);
                let idx = self.push_node(node);
                if has_body {
                    self.frames.push(Frame::Body { node: idx, end_keyword: "property", lambda_depth: 0 });
                }
            }
            "event" => {
                cursor.bump();
                node.kind = VbNodeKind::Event;
                node.name = cursor.identifier();
                node.params = cursor.paren_group().map(|items| parse_params(text, items));
                node.as_type = cursor.as_clause();
                let has_body = node.has_modifier("custom");
                let idx = self.push_node(node);
                if has_body {
                    self.frames.push(Frame::Body { node: idx, end_keyword: "event", lambda_depth: 0 });
                }
            }
            "delegate" => {
                cursor.bump();
                node.kind = VbNodeKind::Delegate;
                node.is_sub = cursor.is_keyword("sub");
                cursor.bump();
                node.name = cursor.identifier();
                node.type_params = cursor
                    .of_group()
                    .map(|items| type_parameter_names(text, items))
                    .unwrap_or_default();
                node.params = cursor.paren_group().map(|items| parse_params(text, items));
                node.as_type = cursor.as_clause();
                self.push_node(node);
            }
            "declare" => {
                cursor.bump();
                node.kind = VbNodeKind::Declare;
                while cursor
                    .keyword_at(0)
                    .is_some_and(|w| matches!(w.as_str(), "ansi" | "unicode" | "auto"))
                {
                    cursor.bump();
                }
                node.is_sub = cursor.is_keyword("sub");
                cursor.bump();
                node.name = cursor.identifier();
                // Lib "dll" [Alias "entry"]
                while !cursor.at_end() && !cursor.is_punct('(') {
                    cursor.bump();
                }
                node.params = cursor.paren_group().map(|items| parse_params(text, items));
                node.as_type = cursor.as_clause();
                self.push_node(node);
            }
            _ if self.in_enum() => {
                node.kind = VbNodeKind::EnumMember;
                node.name = cursor.identifier();
                if node.name.is_some() {
                    self.push_node(node);
                }
            }
            _ if !node.modifiers.is_empty() && self.container_parent().is_some() => {
                node.kind = VbNodeKind::Field;
                let items = split_top_level(text, &statement.tokens[cursor.pos..]);
                node.declarators = parse_declarators(text, items);
                if !node.declarators.is_empty() {
                    self.push_node(node);
                }
            }
            _ => {}
        }
    }

    fn close_container(&mut self, keyword: &str, idx: usize) {
        let Some(position) = self.frames.iter().rposition(|f| match f {
            Frame::Container { end_keyword, .. } => *end_keyword == keyword,
            Frame::Body { .. } => false,
        }) else {
            return;
        };
        let end = self.statements[idx].end;
        for frame in self.frames.drain(position..) {
            let node = match frame {
                Frame::Container { node, .. } | Frame::Body { node, .. } => node,
            };
            self.nodes[node].end = end;
            self.nodes[node].end_stmt = idx;
        }
    }
}

fn type_parameter_names(text: &str, items: Vec<&[Token]>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| {
            let mut cursor = Cursor::new(text, item);
            while cursor
                .keyword_at(0)
                .is_some_and(|w| w == "in" || w == "out")
                && cursor.peek_at(1).is_some_and(|t| t.kind == TokenKind::Identifier)
            {
                cursor.bump();
            }
            cursor.identifier().map(|n| n.text)
        })
        .collect()
}

/// `Sub(...)` / `Function(...)` with nothing but an optional `As` clause after it.
fn opens_multiline_lambda(text: &str, tokens: &[Token]) -> bool {
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Identifier {
            continue;
        }
        let word = text[token.start..token.end].to_ascii_lowercase();
        if word != "sub" && word != "function" {
            continue;
        }
        if i > 0 {
            let previous = text[tokens[i - 1].start..tokens[i - 1].end].to_ascii_lowercase();
            if matches!(previous.as_str(), "exit" | "end" | "declare" | "delegate") {
                continue;
            }
        }
        let mut cursor = Cursor::new(text, tokens);
        cursor.pos = i + 1;
        if !cursor.is_punct('(') {
            continue;
        }
        let Some(close) = cursor.matching_close() else { continue };
        cursor.pos = close + 1;
        if cursor.at_end() {
            return true;
        }
        if cursor.eat_keyword("as") {
            cursor.until_equals();
            if cursor.at_end() {
                return true;
            }
        }
    }
    false
}
