//! Delimited expression scanner shared by both resolution stages.

use crate::error::{MapperError, MapperResult};

const ESCAPE: u8 = b'\\';

/// A piece of scanned template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Plain text.
    Text(&'a str),
    /// An escaped opening delimiter.
    Escaped,
    /// Delimited expression content and the byte offset of its opening
    /// delimiter.
    Expr {
        /// Content between the delimiters, with escaped closers unescaped.
        content: String,
        /// Byte offset of the opening delimiter.
        offset: usize,
    },
}

/// Scans text for `open ... close` expressions.
///
/// A backslash directly before `open` escapes it; inside an expression, a
/// backslash before `close` makes it part of the content.
#[derive(Debug, Clone, Copy)]
pub struct TokenScanner<'d> {
    open: &'d str,
    close: &'d str,
}

impl<'d> TokenScanner<'d> {
    /// Create a scanner for the given delimiters.
    pub fn new(open: &'d str, close: &'d str) -> Self {
        Self { open, close }
    }

    /// The opening delimiter.
    pub fn open(&self) -> &'d str {
        self.open
    }

    /// The closing delimiter.
    pub fn close(&self) -> &'d str {
        self.close
    }

    /// Split `text` into tokens.
    ///
    /// Fails with an invalid configuration error when either delimiter is
    /// empty.
    pub fn tokens<'a>(&self, text: &'a str) -> MapperResult<Vec<Token<'a>>> {
        if self.open.is_empty() || self.close.is_empty() {
            return Err(MapperError::invalid_config("Expression delimiters must not be empty"));
        }

        let bytes = text.as_bytes();
        let mut tokens = Vec::new();
        let mut pos = 0;
        let mut text_start = 0;

        while let Some(found) = text[pos..].find(self.open) {
            let start = pos + found;

            if start > 0 && bytes[start - 1] == ESCAPE {
                if start - 1 > text_start {
                    tokens.push(Token::Text(&text[text_start..start - 1]));
                }
                tokens.push(Token::Escaped);
                pos = start + self.open.len();
                text_start = pos;
                continue;
            }

            if start > text_start {
                tokens.push(Token::Text(&text[text_start..start]));
            }

            let (content, after) = self.read_content(text, start)?;
            tokens.push(Token::Expr {
                content,
                offset: start,
            });
            pos = after;
            text_start = after;
        }

        if text_start < text.len() {
            tokens.push(Token::Text(&text[text_start..]));
        }

        Ok(tokens)
    }

    fn read_content(&self, text: &str, start: usize) -> MapperResult<(String, usize)> {
        let bytes = text.as_bytes();
        let content_start = start + self.open.len();
        let mut content = String::new();
        let mut cursor = content_start;

        while let Some(found) = text[cursor..].find(self.close) {
            let end = cursor + found;
            if end > content_start && bytes[end - 1] == ESCAPE {
                content.push_str(&text[cursor..end - 1]);
                content.push_str(self.close);
                cursor = end + self.close.len();
                continue;
            }
            content.push_str(&text[cursor..end]);
            return Ok((content, end + self.close.len()));
        }

        let snippet: String = text[start..].chars().take(40).collect();
        Err(MapperError::template_syntax(
            format!("unterminated '{}' expression, expected '{}'", self.open, self.close),
            start,
            snippet,
        ))
    }

    /// Replace every expression with the handler's output.
    ///
    /// Escaped openers are emitted as the literal delimiter.
    pub fn replace<F>(&self, text: &str, mut handler: F) -> MapperResult<String>
    where
        F: FnMut(&str, usize) -> MapperResult<String>,
    {
        let mut output = String::with_capacity(text.len());
        for token in self.tokens(text)? {
            match token {
                Token::Text(s) => output.push_str(s),
                Token::Escaped => output.push_str(self.open),
                Token::Expr { content, offset } => output.push_str(&handler(&content, offset)?),
            }
        }
        Ok(output)
    }

    /// Check whether `text` contains any unescaped opening delimiter.
    pub fn has_expressions(&self, text: &str) -> bool {
        if self.open.is_empty() {
            return false;
        }
        let bytes = text.as_bytes();
        let mut pos = 0;
        while let Some(found) = text[pos..].find(self.open) {
            let start = pos + found;
            if start == 0 || bytes[start - 1] != ESCAPE {
                return true;
            }
            pos = start + self.open.len();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokens() {
        let scanner = TokenScanner::new("{{", "}}");
        let tokens = scanner.tokens("a = {{a}} and b = {{ b.c }}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Text("a = "),
                Token::Expr { content: "a".into(), offset: 4 },
                Token::Text(" and b = "),
                Token::Expr { content: " b.c ".into(), offset: 18 },
            ]
        );
    }

    #[test]
    fn test_escaped_opener() {
        let scanner = TokenScanner::new("{{", "}}");
        let output = scanner
            .replace(r"SELECT '\{{literal}}', {{id}}", |content, _| Ok(format!("<{}>", content)))
            .unwrap();
        assert_eq!(output, "SELECT '{{literal}}', <id>");
    }

    #[test]
    fn test_escaped_closer_in_content() {
        let scanner = TokenScanner::new("${", "}");
        let tokens = scanner.tokens(r"${a\}b}").unwrap();
        assert_eq!(tokens, vec![Token::Expr { content: "a}b".into(), offset: 0 }]);
    }

    #[test]
    fn test_unterminated() {
        let scanner = TokenScanner::new("{{", "}}");
        let err = scanner.tokens("id = {{id").unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateSyntax);
        assert_eq!(err.context.offset, Some(5));
        assert_eq!(err.context.template.as_deref(), Some("{{id"));
    }

    #[test]
    fn test_empty_delimiters() {
        let err = TokenScanner::new("", "").tokens("SELECT 1").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);

        let err = TokenScanner::new("{{", "").replace("{{a}}", |c, _| Ok(c.to_string())).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
        assert!(!TokenScanner::new("", "}").has_expressions("x"));
    }

    #[test]
    fn test_has_expressions() {
        let scanner = TokenScanner::new("${", "}");
        assert!(scanner.has_expressions("ORDER BY ${column}"));
        assert!(!scanner.has_expressions(r"cost \${5}"));
        assert!(!scanner.has_expressions("plain text"));
    }

    #[test]
    fn test_multibyte_text() {
        let scanner = TokenScanner::new("{{", "}}");
        let output = scanner.replace("名前 = {{name}}", |_, _| Ok("?".into())).unwrap();
        assert_eq!(output, "名前 = ?");
    }
}
