//! Lexical scanner for the CIF text format.
//!
//! The scanner never copies text: every [`Token`] is a pair of byte offsets into
//! the source. Scanning is expressed as a pure step function, [`advance`], that
//! takes a [`TokenizerState`] and returns the next state together with the token
//! it produced. [`Tokenizer`] is a thin cursor over that function.
//!
//! Known deviations from the CIF 1.1 grammar:
//!
//! - Only the keywords `data_`, `save_` and `loop_` are case-insensitive.
//! - The bare tokens `.` and `?` are indistinguishable from the quoted values `'.'` and `'?'`.
//! - Backslash-newline continuations inside multiline values are kept verbatim;
//!   `;abc\` followed by `efg` reads as `abc\` + newline + `efg`.

const TAB: u8 = b'\t';
const LF: u8 = b'\n';
const CR: u8 = b'\r';
const SPACE: u8 = b' ';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Data,
    Save,
    Loop,
    Value,
    ColumnName,
    Comment,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// Line on which the token starts (1-based).
    pub line: usize,
    /// Set for quoted and multiline values; such tokens are always values.
    pub is_escaped: bool,
    /// Set when a quoted or multiline value ran into a newline or EOF before its terminator.
    pub malformed: bool,
}

impl Token {
    fn end_of_input(position: usize, line: usize) -> Self {
        Self {
            kind: TokenKind::End,
            start: position,
            end: position,
            line,
            is_escaped: false,
            malformed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Scanner position; the whole state needed to resume scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerState {
    pub position: usize,
    pub line: usize,
}

impl Default for TokenizerState {
    fn default() -> Self {
        Self {
            position: 0,
            line: 1,
        }
    }
}

/// Scans the next token, comments included.
pub fn advance(data: &[u8], state: TokenizerState) -> (TokenizerState, Token) {
    let mut state = state;
    let prev = skip_whitespace(data, &mut state);

    if state.position >= data.len() {
        return (state, Token::end_of_input(state.position, state.line));
    }

    let start = state.position;
    let line = state.line;
    let token = match data[start] {
        b'#' => {
            skip_comment_line(data, &mut state);
            Token {
                kind: TokenKind::Comment,
                start,
                end: state.position,
                line,
                is_escaped: false,
                malformed: false,
            }
        }
        quote @ (b'\'' | b'"') => eat_escaped(data, &mut state, quote, line),
        b';' if prev == LF || prev == CR => eat_multiline(data, &mut state, line),
        b';' => {
            let end = eat_value(data, &mut state);
            Token {
                kind: TokenKind::Value,
                start,
                end,
                line,
                is_escaped: false,
                malformed: false,
            }
        }
        _ => {
            let end = eat_value(data, &mut state);
            Token {
                kind: classify_unquoted(&data[start..end]),
                start,
                end,
                line,
                is_escaped: false,
                malformed: false,
            }
        }
    };
    (state, token)
}

/// Scans the next token that is not a comment.
pub fn advance_skipping_comments(data: &[u8], state: TokenizerState) -> (TokenizerState, Token) {
    let (mut state, mut token) = advance(data, state);
    while token.kind == TokenKind::Comment {
        (state, token) = advance(data, state);
    }
    (state, token)
}

fn classify_unquoted(text: &[u8]) -> TokenKind {
    if text.first() == Some(&b'_') {
        return TokenKind::ColumnName;
    }
    if text.len() >= 5 && text[4] == b'_' {
        let head = &text[..4];
        if head.eq_ignore_ascii_case(b"data") {
            return TokenKind::Data;
        }
        if head.eq_ignore_ascii_case(b"save") {
            return TokenKind::Save;
        }
        if text.len() == 5 && head.eq_ignore_ascii_case(b"loop") {
            return TokenKind::Loop;
        }
    }
    TokenKind::Value
}

/// Returns the last whitespace byte skipped, or `\n` if none was.
fn skip_whitespace(data: &[u8], state: &mut TokenizerState) -> u8 {
    let mut prev = LF;
    while state.position < data.len() {
        let c = data[state.position];
        match c {
            TAB | SPACE => {}
            LF => {
                if prev != CR {
                    state.line += 1;
                }
            }
            CR => state.line += 1,
            _ => return prev,
        }
        prev = c;
        state.position += 1;
    }
    prev
}

/// Stops at the newline so that line counting stays in `skip_whitespace`.
fn skip_comment_line(data: &[u8], state: &mut TokenizerState) {
    while state.position < data.len() {
        if matches!(data[state.position], LF | CR) {
            return;
        }
        state.position += 1;
    }
}

fn eat_value(data: &[u8], state: &mut TokenizerState) -> usize {
    while state.position < data.len() {
        if matches!(data[state.position], TAB | LF | CR | SPACE) {
            break;
        }
        state.position += 1;
    }
    state.position
}

/// Quoted value. A quote only terminates when followed by whitespace or EOF,
/// so `'a'b'` reads as `a'b`. A value cut off by a newline or EOF keeps its
/// opening quote and is flagged as malformed.
fn eat_escaped(data: &[u8], state: &mut TokenizerState, quote: u8, line: usize) -> Token {
    let open = state.position;
    state.position += 1;
    while state.position < data.len() {
        let c = data[state.position];
        if c == quote {
            match data.get(state.position + 1) {
                None | Some(&TAB) | Some(&LF) | Some(&CR) | Some(&SPACE) => {
                    let end = state.position;
                    state.position += 1;
                    return Token {
                        kind: TokenKind::Value,
                        start: open + 1,
                        end,
                        line,
                        is_escaped: true,
                        malformed: false,
                    };
                }
                Some(_) => state.position += 1,
            }
        } else if c == LF || c == CR {
            break;
        } else {
            state.position += 1;
        }
    }
    Token {
        kind: TokenKind::Value,
        start: open,
        end: state.position,
        line,
        is_escaped: false,
        malformed: true,
    }
}

/// Multiline value of the form `NL;...NL;`. The leading `;` and the newlines
/// right before the closing `;` are not part of the value.
fn eat_multiline(data: &[u8], state: &mut TokenizerState, line: usize) -> Token {
    let open = state.position;
    let content_start = open + 1;
    let mut prev = b';';
    let mut pos = content_start;

    while pos < data.len() {
        let c = data[pos];
        if c == b';' && (prev == LF || prev == CR) {
            state.position = pos + 1;
            return Token {
                kind: TokenKind::Value,
                start: content_start,
                end: trim_trailing_newlines(data, content_start, pos),
                line,
                is_escaped: true,
                malformed: false,
            };
        }
        if c == CR || (c == LF && prev != CR) {
            state.line += 1;
        }
        prev = c;
        pos += 1;
    }

    state.position = data.len();
    Token {
        kind: TokenKind::Value,
        start: content_start,
        end: trim_trailing_newlines(data, content_start, data.len()),
        line,
        is_escaped: true,
        malformed: true,
    }
}

fn trim_trailing_newlines(data: &[u8], start: usize, mut end: usize) -> usize {
    while end > start && matches!(data[end - 1], LF | CR) {
        end -= 1;
    }
    end
}

/// Byte offset of the first `.` in `name`, or its length when there is none.
pub fn namespace_end(name: &str) -> usize {
    name.find('.').unwrap_or(name.len())
}

/// Whether the column name `name` belongs to the category `namespace`.
pub fn is_in_namespace(name: &str, namespace: &str) -> bool {
    match name.strip_prefix(namespace) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Cursor over a source text that hands out comment-free tokens.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    data: &'a str,
    state: TokenizerState,
    token: Token,
}

impl<'a> Tokenizer<'a> {
    pub fn new(data: &'a str) -> Self {
        let state = TokenizerState::default();
        Self {
            data,
            state,
            token: Token::end_of_input(0, state.line),
        }
    }

    /// Continues scanning `data` from a state saved with [`Tokenizer::state`].
    pub fn resume(data: &'a str, state: TokenizerState, token: Token) -> Self {
        Self { data, state, token }
    }

    pub fn state(&self) -> TokenizerState {
        self.state
    }

    /// Moves to the next non-comment token and returns it.
    pub fn move_next(&mut self) -> Token {
        let (state, token) = advance_skipping_comments(self.data.as_bytes(), self.state);
        self.state = state;
        self.token = token;
        token
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn text(&self, token: Token) -> &'a str {
        &self.data[token.start..token.end]
    }

    pub fn current_text(&self) -> &'a str {
        self.text(self.token)
    }

    /// Line the scanner has reached, which for multiline values is their last line.
    pub fn line(&self) -> usize {
        self.state.line
    }

    pub fn position(&self) -> usize {
        self.state.position
    }

    pub fn data(&self) -> &'a str {
        self.data
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        match self.move_next() {
            token if token.kind == TokenKind::End => None,
            token => Some(token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &str) -> Vec<(TokenKind, String)> {
        let mut tokenizer = Tokenizer::new(input);
        let mut out = Vec::new();
        while let Some(token) = tokenizer.next() {
            out.push((token.kind, tokenizer.text(token).to_string()));
        }
        out
    }

    mod values {
        use super::*;

        #[test]
        fn unquoted_values_split_on_whitespace() {
            let tokens = scan("abc\tdef  ghi\r\njkl");
            let texts: Vec<_> = tokens.iter().map(|(_, t)| t.as_str()).collect();
            assert_eq!(texts, ["abc", "def", "ghi", "jkl"]);
            assert!(tokens.iter().all(|(k, _)| *k == TokenKind::Value));
        }

        #[test]
        fn quoted_value_strips_quotes() {
            assert_eq!(
                scan("'hello world' \"x y\""),
                vec![
                    (TokenKind::Value, "hello world".to_string()),
                    (TokenKind::Value, "x y".to_string()),
                ]
            );
        }

        #[test]
        fn embedded_quote_does_not_terminate() {
            assert_eq!(scan("'a'b'"), vec![(TokenKind::Value, "a'b".to_string())]);
            assert_eq!(
                scan("'it's fine' next"),
                vec![
                    (TokenKind::Value, "it's fine".to_string()),
                    (TokenKind::Value, "next".to_string()),
                ]
            );
        }

        #[test]
        fn quoted_keyword_is_a_value() {
            let tokens = scan("'data_x' \"loop_\" '_name'");
            assert!(tokens.iter().all(|(k, _)| *k == TokenKind::Value));
            assert_eq!(tokens[2].1, "_name");
        }

        #[test]
        fn unterminated_quote_is_flagged_and_keeps_opening_quote() {
            let mut tokenizer = Tokenizer::new("'abc\nnext");
            let token = tokenizer.move_next();
            assert!(token.malformed);
            assert!(!token.is_escaped);
            assert_eq!(tokenizer.text(token), "'abc");
            assert_eq!(tokenizer.current_text(), "'abc");
            let next = tokenizer.move_next();
            assert_eq!(tokenizer.text(next), "next");
            assert_eq!(next.line, 2);

            let mut at_eof = Tokenizer::new("\"abc");
            let token = at_eof.move_next();
            assert!(token.malformed);
            assert_eq!(at_eof.text(token), "\"abc");
            assert_eq!(at_eof.move_next().kind, TokenKind::End);
        }

        #[test]
        fn semicolon_inside_a_line_is_a_plain_value() {
            assert_eq!(scan("x ;abc"), vec![
                (TokenKind::Value, "x".to_string()),
                (TokenKind::Value, ";abc".to_string()),
            ]);
        }
    }

    mod multiline {
        use super::*;

        #[test]
        fn strips_leading_semicolon_and_trailing_newlines() {
            let input = "_a.b\n;line one\nline two\n\n\n;\n_a.c 1";
            let mut tokenizer = Tokenizer::new(input);
            tokenizer.move_next();
            let value = tokenizer.move_next();
            assert_eq!(value.kind, TokenKind::Value);
            assert!(value.is_escaped);
            assert_eq!(value.line, 2);
            assert_eq!(tokenizer.text(value), "line one\nline two");
            assert_eq!(tokenizer.line(), 6);

            let next = tokenizer.move_next();
            assert_eq!(tokenizer.text(next), "_a.c");
            assert_eq!(next.line, 7);
        }

        #[test]
        fn terminator_on_the_following_line() {
            let mut tokenizer = Tokenizer::new(";\n;");
            let value = tokenizer.move_next();
            assert_eq!(tokenizer.text(value), "");
            assert_eq!(tokenizer.line(), 2);
            assert_eq!(tokenizer.move_next().kind, TokenKind::End);
        }

        #[test]
        fn keeps_backslash_continuations_verbatim() {
            let mut tokenizer = Tokenizer::new(";abc\\\nefg\n;");
            let value = tokenizer.move_next();
            assert_eq!(tokenizer.text(value), "abc\\\nefg");
        }

        #[test]
        fn crlf_counts_one_line() {
            let mut tokenizer = Tokenizer::new(";a\r\nb\r\n;\r\nz");
            tokenizer.move_next();
            assert_eq!(tokenizer.line(), 3);
            let z = tokenizer.move_next();
            assert_eq!(z.line, 4);
        }

        #[test]
        fn missing_terminator_reads_to_eof() {
            let mut tokenizer = Tokenizer::new(";abc\ndef\n");
            let value = tokenizer.move_next();
            assert!(value.malformed);
            assert_eq!(tokenizer.text(value), "abc\ndef");
            assert_eq!(tokenizer.move_next().kind, TokenKind::End);
        }

        #[test]
        fn indented_semicolon_is_not_multiline() {
            let tokens = scan("x\n ;abc");
            assert_eq!(tokens[1], (TokenKind::Value, ";abc".to_string()));
        }
    }

    mod keywords {
        use super::*;

        #[test]
        fn recognizes_keywords_case_insensitively() {
            let kinds: Vec<_> = scan("data_1ABC DATA_x loop_ LoOp_ save_frame save_")
                .into_iter()
                .map(|(k, _)| k)
                .collect();
            assert_eq!(
                kinds,
                [
                    TokenKind::Data,
                    TokenKind::Data,
                    TokenKind::Loop,
                    TokenKind::Loop,
                    TokenKind::Save,
                    TokenKind::Save,
                ]
            );
        }

        #[test]
        fn near_keywords_are_values() {
            let kinds: Vec<_> = scan("loop_x data loopy dat_a")
                .into_iter()
                .map(|(k, _)| k)
                .collect();
            assert!(kinds.iter().all(|k| *k == TokenKind::Value));
        }

        #[test]
        fn underscore_prefix_is_a_column_name() {
            assert_eq!(scan("_atom_site.id")[0].0, TokenKind::ColumnName);
        }
    }

    mod comments_and_lines {
        use super::*;

        #[test]
        fn comments_are_skipped_by_the_cursor() {
            let tokens = scan("# header\nabc # trailing\n#\ndef");
            let texts: Vec<_> = tokens.iter().map(|(_, t)| t.as_str()).collect();
            assert_eq!(texts, ["abc", "def"]);
        }

        #[test]
        fn raw_step_reports_comments() {
            let data = b"# note\nx";
            let (state, token) = advance(data, TokenizerState::default());
            assert_eq!(token.kind, TokenKind::Comment);
            assert_eq!(&data[token.start..token.end], b"# note");
            let (_, token) = advance(data, state);
            assert_eq!(token.kind, TokenKind::Value);
            assert_eq!(token.line, 2);
        }

        #[test]
        fn step_function_is_pure() {
            let data = b"a b";
            let start = TokenizerState::default();
            let first = advance(data, start);
            let again = advance(data, start);
            assert_eq!(first, again);
        }

        #[test]
        fn lone_carriage_returns_count_as_lines() {
            let mut tokenizer = Tokenizer::new("a\rb\r\rc");
            let lines: Vec<_> = std::iter::from_fn(|| {
                let t = tokenizer.move_next();
                (t.kind != TokenKind::End).then_some(t.line)
            })
            .collect();
            assert_eq!(lines, [1, 2, 4]);
        }
    }

    #[test]
    fn namespace_helpers() {
        assert_eq!(namespace_end("_atom_site.id"), 10);
        assert_eq!(namespace_end("_plain"), 6);
        assert!(is_in_namespace("_atom_site.id", "_atom_site"));
        assert!(is_in_namespace("_atom_site", "_atom_site"));
        assert!(!is_in_namespace("_atom_site_anisotrop.id", "_atom_site"));
        assert!(!is_in_namespace("_atom", "_atom_site"));
    }
}
