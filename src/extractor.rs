//! Declaration extractor
//!
//! Walks the token stream of one file and yields every class, interface,
//! trait and enum it declares, qualified with the enclosing namespace.
//!
//! This is a forward-scanning state machine, not a parser. It recognises
//!
//! - `namespace Foo\Bar;` and `namespace Foo\Bar { ... }` (the braced form is
//!   scoped to its block; `namespace { ... }` is the global namespace)
//! - `class|interface|trait|enum <Name>`
//!
//! A statement-form namespace qualifies only the next declaration; after it
//! is emitted the namespace resets to global. A braced namespace qualifies
//! every declaration inside its block.
//!
//! and ignores everything else. Symbols created at runtime (`class_alias`,
//! `eval`, generated code) are invisible to it. Keywords following `::` or
//! `->` (`Foo::class`, `$node->class`) and anonymous classes are skipped.

use crate::lexer::{tokenize, Token, TokenKind, Tokens};
use crate::models::{Declaration, DeclarationKind, NAMESPACE_SEPARATOR};

/// Extract the declarations in `source`
///
/// The returned iterator is lazy and single-pass. Source that cannot be
/// tokenized meaningfully simply yields fewer (or no) declarations.
pub fn declarations(source: &str) -> Declarations<'_> {
    Declarations {
        source,
        tokens: tokenize(source),
        pending: None,
        previous: None,
        namespace: String::new(),
        depth: 0,
        namespace_depth: None,
        line_cursor: (0, 1),
    }
}

/// Lazy iterator over the declarations of one file
pub struct Declarations<'a> {
    source: &'a str,
    tokens: Tokens<'a>,
    pending: Option<Token<'a>>,
    /// Last significant token, used to reject `::class` and `->class`
    previous: Option<TokenKind>,
    namespace: String,
    depth: usize,
    /// Brace depth at which the current braced namespace was opened
    namespace_depth: Option<usize>,
    /// Last computed (offset, line) pair; offsets only move forward
    line_cursor: (usize, usize),
}

impl<'a> Declarations<'a> {
    fn next_significant(&mut self) -> Option<Token<'a>> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }
        self.tokens.by_ref().find(|t| !t.kind.is_trivia())
    }

    fn push_back(&mut self, token: Token<'a>) {
        self.pending = Some(token);
    }

    fn line_at(&mut self, offset: usize) -> usize {
        let (last_offset, last_line) = self.line_cursor;
        let line = last_line + self.source[last_offset..offset].matches('\n').count();
        self.line_cursor = (offset, line);
        line
    }

    fn open_brace(&mut self) {
        self.depth += 1;
    }

    fn close_brace(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.namespace_depth == Some(self.depth) {
            self.namespace.clear();
            self.namespace_depth = None;
        }
    }

    /// Consume a namespace statement after the `namespace` keyword
    fn read_namespace(&mut self) {
        let mut path = String::new();

        while let Some(token) = self.next_significant() {
            match token.kind {
                kind if is_name_like(kind) => path.push_str(token.text),
                // `namespace\foo()` is a relative name, not a declaration
                TokenKind::NsSeparator if path.is_empty() => {
                    self.previous = Some(TokenKind::NsSeparator);
                    return;
                }
                TokenKind::NsSeparator => path.push(NAMESPACE_SEPARATOR),
                TokenKind::LBrace => {
                    self.namespace = path;
                    self.namespace_depth = Some(self.depth);
                    self.open_brace();
                    self.previous = Some(TokenKind::LBrace);
                    return;
                }
                TokenKind::Semicolon => {
                    self.namespace = path;
                    self.namespace_depth = None;
                    self.previous = Some(TokenKind::Semicolon);
                    return;
                }
                _ => {
                    // Malformed statement: keep what was read and let the
                    // main loop see the unexpected token.
                    log::trace!("Unterminated namespace statement at offset {}", token.offset);
                    self.namespace = path;
                    self.namespace_depth = None;
                    self.push_back(token);
                    return;
                }
            }
        }

        self.namespace = path;
    }

    fn qualify(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", self.namespace, NAMESPACE_SEPARATOR, name)
        }
    }
}

/// Keywords are valid namespace segments (`App\Enum`, `Lib\Class`)
fn is_name_like(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Name
            | TokenKind::Namespace
            | TokenKind::Class
            | TokenKind::Interface
            | TokenKind::Trait
            | TokenKind::Enum
            | TokenKind::Extends
            | TokenKind::Implements
    )
}

fn declaration_kind(kind: TokenKind) -> Option<DeclarationKind> {
    match kind {
        TokenKind::Class => Some(DeclarationKind::Class),
        TokenKind::Interface => Some(DeclarationKind::Interface),
        TokenKind::Trait => Some(DeclarationKind::Trait),
        TokenKind::Enum => Some(DeclarationKind::Enum),
        _ => None,
    }
}

impl<'a> Iterator for Declarations<'a> {
    type Item = Declaration;

    fn next(&mut self) -> Option<Declaration> {
        while let Some(token) = self.next_significant() {
            let after_member_access = matches!(
                self.previous,
                Some(TokenKind::DoubleColon | TokenKind::Arrow | TokenKind::NsSeparator)
            );
            self.previous = Some(token.kind);

            match token.kind {
                TokenKind::LBrace => self.open_brace(),
                TokenKind::RBrace => self.close_brace(),
                TokenKind::Namespace if !after_member_access => self.read_namespace(),
                kind => {
                    let Some(decl_kind) = declaration_kind(kind) else {
                        continue;
                    };
                    if after_member_access {
                        continue;
                    }

                    let Some(name) = self.next_significant() else {
                        return None;
                    };
                    // `enum` is a soft keyword, so `class Enum` is legal
                    if !matches!(name.kind, TokenKind::Name | TokenKind::Enum) {
                        // Anonymous class, `class extends`, or plain use of the word
                        self.push_back(name);
                        continue;
                    }

                    self.previous = Some(TokenKind::Name);
                    let line = self.line_at(name.offset);
                    let qualified = self.qualify(name.text);
                    if self.namespace_depth.is_none() {
                        self.namespace.clear();
                    }
                    return Some(Declaration {
                        name: qualified,
                        kind: decl_kind,
                        offset: name.offset,
                        line,
                    });
                }
            }
        }
        None
    }
}
