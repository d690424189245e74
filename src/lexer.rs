//! PHP tokenizer built on Logos
//!
//! Produces a typed token stream covering the whole file: text outside
//! `<?php ... ?>` becomes [`TokenKind::InlineHtml`], comments and every kind
//! of string literal (including heredoc and nowdoc bodies) become single
//! opaque tokens, so a keyword inside them can never be mistaken for code.
//!
//! The tokenizer never fails. Input it does not recognise is reported as
//! [`TokenKind::Other`] and scanning resumes on the next character.

use logos::{Lexer, Logos};

/// Token classification exposed to the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // === Outside PHP code ===
    InlineHtml,
    OpenTag,
    CloseTag,

    // === Trivia ===
    Whitespace,
    Comment,

    // === Literals and names ===
    String,
    Variable,
    Name,

    // === Declaration keywords ===
    Namespace,
    Class,
    Interface,
    Trait,
    Enum,
    Extends,
    Implements,

    // === Punctuation ===
    NsSeparator,
    Semicolon,
    LBrace,
    RBrace,
    DoubleColon,
    Arrow,
    AttributeOpen,

    Other,
}

impl TokenKind {
    /// Tokens that carry no syntax for the declaration scanner
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::Comment
                | TokenKind::InlineHtml
                | TokenKind::OpenTag
                | TokenKind::CloseTag
        )
    }
}

/// Token with kind, text and absolute byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: usize,
}

/// Logos-based token types for the inside of a PHP code block
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum RawToken {
    // === Trivia ===
    #[regex(r"[ \t\r\n\x0C]+")]
    Whitespace,

    #[token("//", line_comment)]
    #[token("#", line_comment)]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    #[token("?>")]
    CloseTag,

    // === Keywords (case-insensitive, like PHP) ===
    #[token("namespace", ignore(case))]
    NamespaceKw,
    #[token("class", ignore(case))]
    ClassKw,
    #[token("interface", ignore(case))]
    InterfaceKw,
    #[token("trait", ignore(case))]
    TraitKw,
    #[token("enum", ignore(case))]
    EnumKw,
    #[token("extends", ignore(case))]
    ExtendsKw,
    #[token("implements", ignore(case))]
    ImplementsKw,

    // === Punctuation ===
    #[token("\\")]
    NsSeparator,
    #[token(";")]
    Semicolon,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("::")]
    DoubleColon,
    #[token("->")]
    #[token("?->")]
    Arrow,
    #[token("#[")]
    AttributeOpen,

    // === Literals ===
    #[token("'", single_quoted)]
    #[token("\"", double_quoted)]
    #[token("`", backtick)]
    #[token("<<<", heredoc)]
    String,

    #[regex(r"[0-9][0-9a-zA-Z_.]*")]
    Number,

    #[regex(r"\$[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*", allow_greedy = true)]
    Variable,

    // === Identifiers (must come after keywords) ===
    #[regex(r"[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*", allow_greedy = true)]
    Name,
}

/// Convert Logos token to TokenKind
fn to_token_kind(token: RawToken) -> TokenKind {
    match token {
        RawToken::Whitespace => TokenKind::Whitespace,
        RawToken::LineComment | RawToken::BlockComment => TokenKind::Comment,
        RawToken::CloseTag => TokenKind::CloseTag,
        RawToken::NamespaceKw => TokenKind::Namespace,
        RawToken::ClassKw => TokenKind::Class,
        RawToken::InterfaceKw => TokenKind::Interface,
        RawToken::TraitKw => TokenKind::Trait,
        RawToken::EnumKw => TokenKind::Enum,
        RawToken::ExtendsKw => TokenKind::Extends,
        RawToken::ImplementsKw => TokenKind::Implements,
        RawToken::NsSeparator => TokenKind::NsSeparator,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::DoubleColon => TokenKind::DoubleColon,
        RawToken::Arrow => TokenKind::Arrow,
        RawToken::AttributeOpen => TokenKind::AttributeOpen,
        RawToken::String => TokenKind::String,
        RawToken::Variable => TokenKind::Variable,
        RawToken::Name => TokenKind::Name,
        RawToken::Number => TokenKind::Other,
    }
}

/// Line comments run to the end of the line or to a closing `?>`
fn line_comment(lex: &mut Lexer<RawToken>) -> bool {
    let rest = lex.remainder();
    let mut end = rest.find('\n').unwrap_or(rest.len());
    if let Some(close) = rest[..end].find("?>") {
        end = close;
    }
    lex.bump(end);
    true
}

fn block_comment(lex: &mut Lexer<RawToken>) -> bool {
    let rest = lex.remainder();
    let end = rest.find("*/").map(|i| i + 2).unwrap_or(rest.len());
    lex.bump(end);
    true
}

fn single_quoted(lex: &mut Lexer<RawToken>) -> bool {
    quoted(lex, b'\'')
}

fn double_quoted(lex: &mut Lexer<RawToken>) -> bool {
    quoted(lex, b'"')
}

fn backtick(lex: &mut Lexer<RawToken>) -> bool {
    quoted(lex, b'`')
}

/// Consume up to and including the closing quote, honouring backslash escapes.
/// An unterminated literal swallows the rest of the input.
fn quoted(lex: &mut Lexer<RawToken>, quote: u8) -> bool {
    let rest = lex.remainder();
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => {
                lex.bump(i + 1);
                return true;
            }
            _ => i += 1,
        }
    }
    lex.bump(rest.len());
    true
}

/// Heredoc (`<<<LABEL`, `<<<"LABEL"`) and nowdoc (`<<<'LABEL'`) bodies
fn heredoc(lex: &mut Lexer<RawToken>) -> bool {
    let rest = lex.remainder();
    let Some(header_len) = rest.find('\n') else {
        return false;
    };

    let label = rest[..header_len]
        .trim_end_matches('\r')
        .trim_start_matches([' ', '\t'])
        .trim_matches(|c: char| c == '"' || c == '\'');
    if label.is_empty() || !label.chars().all(is_name_char) {
        return false;
    }

    let mut offset = header_len + 1;
    for line in rest[offset..].split_inclusive('\n') {
        let trimmed = line.trim_start_matches([' ', '\t']);
        if let Some(after) = trimmed.strip_prefix(label) {
            if !after.starts_with(is_name_char) {
                lex.bump(offset + (line.len() - trimmed.len()) + label.len());
                return true;
            }
        }
        offset += line.len();
    }

    lex.bump(rest.len());
    true
}

fn is_name_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric() || !c.is_ascii()
}

/// Locate the next `<?php` or `<?=` tag, returning its start and length.
/// The single whitespace character after `<?php` belongs to the tag.
fn find_open_tag(text: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(i) = text[from..].find("<?") {
        let at = from + i;
        let after = &text[at + 2..];

        if after.starts_with('=') {
            return Some((at, 3));
        }

        if after.get(..3).is_some_and(|kw| kw.eq_ignore_ascii_case("php")) {
            match after[3..].chars().next() {
                None => return Some((at, 5)),
                Some(c) if c.is_whitespace() => return Some((at, 5 + c.len_utf8())),
                Some(_) => {}
            }
        }

        from = at + 2;
    }
    None
}

/// Iterator over the tokens of a whole PHP file
pub struct Tokens<'a> {
    source: &'a str,
    pos: usize,
    code: Option<(Lexer<'a, RawToken>, usize)>,
}

/// Tokenize a PHP source file
pub fn tokenize(source: &str) -> Tokens<'_> {
    Tokens {
        source,
        pos: 0,
        code: None,
    }
}

impl<'a> Tokens<'a> {
    fn token(&self, kind: TokenKind, start: usize, end: usize) -> Token<'a> {
        Token {
            kind,
            text: &self.source[start..end],
            offset: start,
        }
    }

    fn next_inline(&mut self) -> Option<Token<'a>> {
        if self.pos >= self.source.len() {
            return None;
        }

        let start = self.pos;
        match find_open_tag(&self.source[start..]) {
            Some((0, tag_len)) => {
                let code_start = start + tag_len;
                self.code = Some((RawToken::lexer(&self.source[code_start..]), code_start));
                self.pos = code_start;
                Some(self.token(TokenKind::OpenTag, start, code_start))
            }
            Some((html_len, _)) => {
                self.pos = start + html_len;
                Some(self.token(TokenKind::InlineHtml, start, self.pos))
            }
            None => {
                self.pos = self.source.len();
                Some(self.token(TokenKind::InlineHtml, start, self.pos))
            }
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let Some((lexer, base)) = self.code.as_mut() else {
            return self.next_inline();
        };
        let base = *base;

        match lexer.next() {
            Some(result) => {
                let span = lexer.span();
                let kind = result.map(to_token_kind).unwrap_or(TokenKind::Other);
                let (start, end) = (base + span.start, base + span.end);

                if kind == TokenKind::CloseTag {
                    self.code = None;
                    self.pos = end;
                }

                Some(self.token(kind, start, end))
            }
            None => {
                self.code = None;
                self.pos = self.source.len();
                None
            }
        }
    }
}
