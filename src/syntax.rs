//! # Inline Code Fragments
//!
//! Custom code and custom expression blocks carry user-written target
//! language text. Before any of it reaches the output it is tokenized and
//! checked here: literals and comments must terminate, delimiters must
//! balance, and every statement must end in `;` or a closing `}`.
//!
//! Value inputs are referenced as `$name`. Those references are kept as
//! [`FragmentPart::Placeholder`] so the generator can splice in resolved
//! expressions.

use crate::diagnostics::Severity;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{line}:{column}: {message}")]
pub struct SyntaxError {
    pub severity: Severity,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    fn error(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            line,
            column,
        }
    }

    fn at(token: &Token, message: impl Into<String>) -> Self {
        Self::error(message, token.line, token.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentPart {
    Text(String),
    Placeholder(String),
}

/// One checked statement or expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeFragment {
    parts: Vec<FragmentPart>,
}

impl CodeFragment {
    pub fn parts(&self) -> &[FragmentPart] {
        &self.parts
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            FragmentPart::Placeholder(name) => Some(name.as_str()),
            FragmentPart::Text(_) => None,
        })
    }

    /// Renders the fragment, asking `resolve` for the text of each `$name`.
    pub fn render(&self, mut resolve: impl FnMut(&str) -> String) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                FragmentPart::Text(text) => out.push_str(text),
                FragmentPart::Placeholder(name) => out.push_str(&resolve(name)),
            }
        }
        out
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(FragmentPart::Text(last)) = self.parts.last_mut() {
            last.push_str(text);
        } else {
            self.parts.push(FragmentPart::Text(text.to_string()));
        }
    }

    fn trim(mut self) -> Self {
        if let Some(FragmentPart::Text(first)) = self.parts.first_mut() {
            *first = first.trim_start().to_string();
        }
        if let Some(FragmentPart::Text(last)) = self.parts.last_mut() {
            *last = last.trim_end().to_string();
        }
        self.parts.retain(|part| !matches!(part, FragmentPart::Text(t) if t.is_empty()));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Word(String),
    Number,
    Str,
    Char,
    Placeholder(String),
    Open(char),
    Close(char),
    Semi,
    Punct,
    Comment,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
    line: usize,
    column: usize,
}

struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    idx: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            idx: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).map(|(_, c)| *c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.idx).map(|(i, _)| *i).unwrap_or(self.src.len())
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.idx += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    fn lex_all(mut self) -> Result<(Vec<Token>, (usize, usize)), SyntaxError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            let (start, line, column) = (self.offset(), self.line, self.col);
            let kind = self.next_kind(c, line, column)?;
            tokens.push(Token {
                kind,
                start,
                end: self.offset(),
                line,
                column,
            });
        }
        Ok((tokens, (self.line, self.col)))
    }

    fn next_kind(&mut self, c: char, line: usize, column: usize) -> Result<TokenKind, SyntaxError> {
        let kind = match c {
            '/' if self.peek_at(1) == Some('/') => {
                self.eat_while(|c| c != '\n');
                TokenKind::Comment
            }
            '/' if self.peek_at(1) == Some('*') => {
                self.bump();
                self.bump();
                loop {
                    match self.bump() {
                        Some('*') if self.peek() == Some('/') => {
                            self.bump();
                            break;
                        }
                        Some(_) => {}
                        None => {
                            return Err(SyntaxError::error("unterminated block comment", line, column));
                        }
                    }
                }
                TokenKind::Comment
            }
            '@' if self.peek_at(1) == Some('"') => {
                self.bump();
                self.verbatim_string(line, column)?;
                TokenKind::Str
            }
            '$' if self.peek_at(1) == Some('"') => {
                self.bump();
                self.quoted('"', line, column)?;
                TokenKind::Str
            }
            '$' if self.peek_at(1).is_some_and(is_ident_start) => {
                self.bump();
                let name_start = self.offset();
                self.eat_while(is_ident_continue);
                TokenKind::Placeholder(self.src[name_start..self.offset()].to_string())
            }
            '"' => {
                self.quoted('"', line, column)?;
                TokenKind::Str
            }
            '\'' => {
                self.quoted('\'', line, column)?;
                TokenKind::Char
            }
            c if is_ident_start(c) => {
                let start = self.offset();
                self.eat_while(is_ident_continue);
                TokenKind::Word(self.src[start..self.offset()].to_string())
            }
            c if c.is_ascii_digit() => {
                self.eat_while(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
                TokenKind::Number
            }
            '(' | '[' | '{' => {
                self.bump();
                TokenKind::Open(c)
            }
            ')' | ']' | '}' => {
                self.bump();
                TokenKind::Close(c)
            }
            ';' => {
                self.bump();
                TokenKind::Semi
            }
            _ => {
                self.bump();
                TokenKind::Punct
            }
        };
        Ok(kind)
    }

    fn quoted(&mut self, quote: char, line: usize, column: usize) -> Result<(), SyntaxError> {
        let what = if quote == '"' { "string" } else { "character" };
        self.bump();
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some(c) if c == quote => return Ok(()),
                Some('\n') | None => {
                    return Err(SyntaxError::error(format!("unterminated {} literal", what), line, column));
                }
                Some(_) => {}
            }
        }
    }

    fn verbatim_string(&mut self, line: usize, column: usize) -> Result<(), SyntaxError> {
        self.bump();
        loop {
            match self.bump() {
                Some('"') if self.peek() == Some('"') => {
                    self.bump();
                }
                Some('"') => return Ok(()),
                Some(_) => {}
                None => return Err(SyntaxError::error("unterminated string literal", line, column)),
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Tracks open delimiters while walking a token stream.
#[derive(Default)]
struct Nesting<'t> {
    open: Vec<&'t Token>,
}

impl<'t> Nesting<'t> {
    fn depth(&self) -> usize {
        self.open.len()
    }

    fn visit(&mut self, token: &'t Token) -> Result<(), SyntaxError> {
        match token.kind {
            TokenKind::Open(_) => self.open.push(token),
            TokenKind::Close(close) => {
                let open = self
                    .open
                    .pop()
                    .ok_or_else(|| SyntaxError::at(token, format!("unexpected '{}'", close)))?;
                if let TokenKind::Open(c) = open.kind {
                    if closer_for(c) != close {
                        return Err(SyntaxError::at(
                            token,
                            format!("expected '{}' but found '{}'", closer_for(c), close),
                        ));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(&self) -> Result<(), SyntaxError> {
        match self.open.last() {
            Some(token) => Err(SyntaxError::at(token, "unclosed delimiter")),
            None => Ok(()),
        }
    }
}

fn build_fragment(src: &str, tokens: &[Token]) -> CodeFragment {
    let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
        return CodeFragment::default();
    };
    let mut fragment = CodeFragment::default();
    let mut cursor = first.start;
    for token in tokens {
        match &token.kind {
            TokenKind::Comment => {
                fragment.push_text(&src[cursor..token.start]);
                fragment.push_text(" ");
                cursor = token.end;
            }
            TokenKind::Placeholder(name) => {
                fragment.push_text(&src[cursor..token.start]);
                fragment.parts.push(FragmentPart::Placeholder(name.clone()));
                cursor = token.end;
            }
            _ => {}
        }
    }
    fragment.push_text(&src[cursor..last.end]);
    fragment.trim()
}

fn next_significant(tokens: &[Token], from: usize) -> Option<&Token> {
    tokens[from..].iter().find(|t| t.kind != TokenKind::Comment)
}

/// Whether the statement that started at `start` carries on past the
/// terminator at `end` (`else`, `catch`, `finally`, `do ... while`, or the
/// `;` after an initializer or lambda body).
fn continues_after(tokens: &[Token], start: usize, end: usize) -> bool {
    let Some(next) = next_significant(tokens, end + 1) else {
        return false;
    };
    let ended_with_brace = tokens[end].kind == TokenKind::Close('}');
    match &next.kind {
        TokenKind::Word(word) => match word.as_str() {
            "else" | "catch" | "finally" => true,
            "while" => matches!(&tokens[start].kind, TokenKind::Word(w) if w == "do"),
            _ => false,
        },
        TokenKind::Semi | TokenKind::Close(')') | TokenKind::Punct => ended_with_brace,
        _ => false,
    }
}

/// Splits a custom code fragment into checked top-level statements.
pub fn parse_statements(code: &str) -> Result<Vec<CodeFragment>, SyntaxError> {
    let (tokens, (end_line, end_column)) = Lexer::new(code).lex_all()?;
    if tokens.iter().all(|t| t.kind == TokenKind::Comment) {
        return Err(SyntaxError {
            severity: Severity::Warning,
            message: "code fragment is empty".to_string(),
            line: 1,
            column: 1,
        });
    }

    let mut statements = Vec::new();
    let mut nesting = Nesting::default();
    let mut current: Option<usize> = None;

    for (index, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Comment {
            continue;
        }
        let start = *current.get_or_insert(index);
        nesting.visit(token)?;

        let terminates = nesting.depth() == 0
            && matches!(token.kind, TokenKind::Semi | TokenKind::Close('}'));
        if terminates && !continues_after(&tokens, start, index) {
            statements.push(build_fragment(code, &tokens[start..=index]));
            current = None;
        }
    }

    nesting.finish()?;
    if current.is_some() {
        return Err(SyntaxError::error("expected ';' at end of statement", end_line, end_column));
    }
    Ok(statements)
}

/// Checks a custom expression fragment: balanced, non-empty, no statements.
pub fn parse_expression(code: &str) -> Result<CodeFragment, SyntaxError> {
    let (tokens, _) = Lexer::new(code).lex_all()?;
    let significant: Vec<&Token> = tokens.iter().filter(|t| t.kind != TokenKind::Comment).collect();
    if significant.is_empty() {
        return Err(SyntaxError::error("expected an expression", 1, 1));
    }

    let mut nesting = Nesting::default();
    for token in significant.iter().copied() {
        nesting.visit(token)?;
        if token.kind == TokenKind::Semi && nesting.depth() == 0 {
            return Err(SyntaxError::at(token, "unexpected ';' in expression"));
        }
    }
    nesting.finish()?;

    Ok(build_fragment(code, &tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(code: &str) -> Vec<String> {
        parse_statements(code)
            .unwrap()
            .iter()
            .map(|f| f.render(|name| format!("<{}>", name)))
            .collect()
    }

    #[test]
    fn splits_top_level_statements() {
        assert_eq!(
            texts("a = 1;\n  Foo(a, \"x;y\");  // trailing\n"),
            vec!["a = 1;", "Foo(a, \"x;y\");"]
        );
    }

    #[test]
    fn block_statements_end_at_closing_brace() {
        assert_eq!(
            texts("if (a) { b(); } else { c(); } d();"),
            vec!["if (a) { b(); } else { c(); }", "d();"]
        );
        assert_eq!(texts("do { x++; } while (x < 3);"), vec!["do { x++; } while (x < 3);"]);
        assert_eq!(texts("var f = () => { go(); };"), vec!["var f = () => { go(); };"]);
    }

    #[test]
    fn placeholders_are_spliced() {
        let fragments = parse_statements("Print($message, $count);").unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].placeholders().collect::<Vec<_>>(), vec!["message", "count"]);
        assert_eq!(fragments[0].render(|name| name.to_uppercase()), "Print(MESSAGE, COUNT);");
    }

    #[test]
    fn comments_inside_statements_are_blanked() {
        assert_eq!(texts("a = /* one */ 1;"), vec!["a =   1;"]);
    }

    #[test]
    fn missing_semicolon_is_reported_at_end() {
        let err = parse_statements("a = 1;\nb = 2").unwrap_err();
        assert_eq!(err.severity, Severity::Error);
        assert_eq!((err.line, err.column), (2, 6));
    }

    #[test]
    fn mismatched_delimiters_are_reported() {
        let err = parse_statements("Foo(a];").unwrap_err();
        assert_eq!(err.message, "expected ')' but found ']'");
        assert_eq!((err.line, err.column), (1, 6));

        let err = parse_statements("Foo(a;").unwrap_err();
        assert_eq!(err.message, "unclosed delimiter");
        assert_eq!((err.line, err.column), (1, 4));

        let err = parse_statements("a);").unwrap_err();
        assert_eq!(err.message, "unexpected ')'");
    }

    #[test]
    fn unterminated_literals_are_reported() {
        let err = parse_statements("s = \"open;").unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
        let err = parse_statements("/* never closed").unwrap_err();
        assert_eq!(err.message, "unterminated block comment");
        assert!(parse_statements("s = @\"multi\nline \"\"quoted\"\"\";").is_ok());
    }

    #[test]
    fn empty_fragment_is_a_warning() {
        let err = parse_statements("  // nothing here\n").unwrap_err();
        assert_eq!(err.severity, Severity::Warning);
    }

    #[test]
    fn expressions_reject_statements() {
        let fragment = parse_expression(" $a * (b + 1) ").unwrap();
        assert_eq!(fragment.render(|_| "x".to_string()), "x * (b + 1)");
        assert!(parse_expression("a; b").is_err());
        assert!(parse_expression("   ").is_err());
        assert!(parse_expression("(a").is_err());
    }
}
