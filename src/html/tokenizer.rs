//! A practical HTML tokenizer.
//!
//! Tag and attribute names are ASCII `[A-Za-z0-9:_-]` (plus `.` in attribute
//! names) and are lowercased. `script` and `style` bodies are raw text;
//! `title` and `textarea` bodies are raw text with character references
//! decoded. A `<` that does not open a tag, comment or declaration is text.
//!
//! Unlike a browser, markup that can never be closed is reported as a
//! [`ParseError`] instead of being swallowed: an unterminated tag, comment or
//! declaration, and a raw-text element with no closing tag.

use memchr::memchr;

use super::entities::decode_entities;

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

/// One attribute as written in the source. Duplicate names keep the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unterminated tag <{name}> at byte {offset}")]
    UnterminatedTag { name: String, offset: usize },
    #[error("unterminated comment at byte {offset}")]
    UnterminatedComment { offset: usize },
    #[error("<{name}> at byte {offset} is never closed")]
    UnclosedRawText { name: String, offset: usize },
}

pub fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose body is copied verbatim (no markup, no references).
pub fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style")
}

fn is_escapable_raw_text_element(name: &str) -> bool {
    matches!(name, "title" | "textarea")
}

const fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':')
}

const fn is_attribute_name_byte(b: u8) -> bool {
    is_name_byte(b) || b == b'.' || b == b'@'
}

fn starts_with_ignore_ascii_case(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack
        .get(start..start + needle.len())
        .is_some_and(|slice| slice.eq_ignore_ascii_case(needle))
}

// Finds `</name` followed by optional whitespace and `>`. Returns the byte
// range of the whole close tag relative to `haystack`.
fn find_close_tag(haystack: &str, name: &str) -> Option<(usize, usize)> {
    let bytes = haystack.as_bytes();
    let n = name.len() + 2;
    let mut i = 0;
    while i + n <= bytes.len() {
        let rel = memchr(b'<', &bytes[i..])?;
        i += rel;
        if i + n > bytes.len() {
            return None;
        }
        if bytes[i + 1] == b'/' && starts_with_ignore_ascii_case(bytes, i + 2, name.as_bytes()) {
            let mut k = i + n;
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < bytes.len() && bytes[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

struct Tokenizer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    pending_text: String,
}

/// Split `input` into tokens.
///
/// # Errors
///
/// Returns a [`ParseError`] for markup that runs into the end of input.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokenizer = Tokenizer {
        input,
        bytes: input.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
        pending_text: String::new(),
    };
    tokenizer.run()?;
    Ok(tokenizer.tokens)
}

impl Tokenizer<'_> {
    fn run(&mut self) -> Result<(), ParseError> {
        while self.pos < self.bytes.len() {
            let Some(rel) = memchr(b'<', &self.bytes[self.pos..]) else {
                let text = &self.input[self.pos..];
                self.pending_text.push_str(&decode_entities(text));
                self.pos = self.bytes.len();
                break;
            };
            if rel > 0 {
                let text = &self.input[self.pos..self.pos + rel];
                self.pending_text.push_str(&decode_entities(text));
                self.pos += rel;
            }
            self.markup()?;
        }
        self.flush_text();
        Ok(())
    }

    fn flush_text(&mut self) {
        if !self.pending_text.is_empty() {
            self.tokens
                .push(Token::Text(std::mem::take(&mut self.pending_text)));
        }
    }

    fn push(&mut self, token: Token) {
        self.flush_text();
        self.tokens.push(token);
    }

    // self.bytes[self.pos] == b'<'
    fn markup(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let next = self.bytes.get(start + 1).copied();
        if self.input[start..].starts_with(COMMENT_START) {
            let body_start = start + COMMENT_START.len();
            // `<!-->` and `<!--->` close immediately.
            let rest = &self.input[body_start..];
            if let Some(abrupt) = [">", "->"].into_iter().find(|close| rest.starts_with(*close)) {
                self.push(Token::Comment(String::new()));
                self.pos = body_start + abrupt.len();
                return Ok(());
            }
            let Some(end) = self.input[body_start..].find(COMMENT_END) else {
                return Err(ParseError::UnterminatedComment { offset: start });
            };
            let comment = self.input[body_start..body_start + end].to_string();
            self.push(Token::Comment(comment));
            self.pos = body_start + end + COMMENT_END.len();
            return Ok(());
        }
        match next {
            Some(b'!' | b'?') => self.declaration(start),
            Some(b'/') if self.bytes.get(start + 2).is_some_and(u8::is_ascii_alphabetic) => {
                self.end_tag(start)
            }
            Some(b) if b.is_ascii_alphabetic() => self.start_tag(start),
            _ => {
                self.pending_text.push('<');
                self.pos = start + 1;
                Ok(())
            }
        }
    }

    fn declaration(&mut self, start: usize) -> Result<(), ParseError> {
        let Some(rel) = memchr(b'>', &self.bytes[start..]) else {
            return Err(ParseError::UnterminatedTag {
                name: "!".to_string(),
                offset: start,
            });
        };
        let body = &self.input[start + 2..start + rel];
        if starts_with_ignore_ascii_case(self.bytes, start, b"<!doctype") {
            let doctype = self.input[start + 2..start + rel].trim().to_string();
            self.push(Token::Doctype(doctype));
        } else {
            self.push(Token::Comment(body.to_string()));
        }
        self.pos = start + rel + 1;
        Ok(())
    }

    fn read_name(&self, from: usize, is_name: fn(u8) -> bool) -> usize {
        let mut j = from;
        while j < self.bytes.len() && is_name(self.bytes[j]) {
            j += 1;
        }
        j
    }

    fn end_tag(&mut self, start: usize) -> Result<(), ParseError> {
        let name_end = self.read_name(start + 2, is_name_byte);
        let name = self.input[start + 2..name_end].to_ascii_lowercase();
        let Some(rel) = memchr(b'>', &self.bytes[name_end..]) else {
            return Err(ParseError::UnterminatedTag {
                name: format!("/{name}"),
                offset: start,
            });
        };
        self.push(Token::EndTag(name));
        self.pos = name_end + rel + 1;
        Ok(())
    }

    fn start_tag(&mut self, start: usize) -> Result<(), ParseError> {
        let name_end = self.read_name(start + 1, is_name_byte);
        let name = self.input[start + 1..name_end].to_ascii_lowercase();
        let unterminated = || ParseError::UnterminatedTag {
            name: name.clone(),
            offset: start,
        };

        let len = self.bytes.len();
        let mut k = name_end;
        let mut attributes: Vec<Attribute> = Vec::new();
        let mut self_closing = false;
        loop {
            while k < len && self.bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k >= len {
                return Err(unterminated());
            }
            match self.bytes[k] {
                b'>' => {
                    k += 1;
                    break;
                }
                b'/' => {
                    if self.bytes.get(k + 1) == Some(&b'>') {
                        self_closing = true;
                        k += 2;
                        break;
                    }
                    k += 1;
                    continue;
                }
                _ => {}
            }

            let attr_start = k;
            k = self.read_name(k, is_attribute_name_byte);
            if attr_start == k {
                // Junk like a stray quote; skip it as browsers do.
                k += self.input[k..].chars().next().map_or(1, char::len_utf8);
                continue;
            }
            let attr_name = self.input[attr_start..k].to_ascii_lowercase();
            while k < len && self.bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            let mut value = String::new();
            if k < len && self.bytes[k] == b'=' {
                k += 1;
                while k < len && self.bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if k >= len {
                    return Err(unterminated());
                }
                let quote = self.bytes[k];
                if quote == b'"' || quote == b'\'' {
                    let value_start = k + 1;
                    let Some(rel) = memchr(quote, &self.bytes[value_start..]) else {
                        return Err(unterminated());
                    };
                    value = decode_entities(&self.input[value_start..value_start + rel]);
                    k = value_start + rel + 1;
                } else {
                    let value_start = k;
                    while k < len && !self.bytes[k].is_ascii_whitespace() && self.bytes[k] != b'>'
                    {
                        k += 1;
                    }
                    value = decode_entities(&self.input[value_start..k]);
                }
            }
            if !attributes.iter().any(|a| a.name == attr_name) {
                attributes.push(Attribute {
                    name: attr_name,
                    value,
                });
            }
        }

        let self_closing = self_closing || is_void_element(&name);
        let raw = is_raw_text_element(&name);
        let escapable = is_escapable_raw_text_element(&name);
        self.push(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing,
        });
        self.pos = k;

        if (raw || escapable) && !self_closing {
            let Some((close_start, close_end)) = find_close_tag(&self.input[k..], &name) else {
                return Err(ParseError::UnclosedRawText {
                    name,
                    offset: start,
                });
            };
            let body = &self.input[k..k + close_start];
            if !body.is_empty() {
                let text = if raw {
                    body.to_string()
                } else {
                    decode_entities(body)
                };
                self.push(Token::Text(text));
            }
            self.push(Token::EndTag(name));
            self.pos = k + close_end;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn start(name: &str, attributes: &[(&str, &str)]) -> Token {
        Token::StartTag {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(n, v)| Attribute::new(*n, *v))
                .collect(),
            self_closing: false,
        }
    }

    #[test]
    fn test_tokenize_basic_markup() {
        let tokens = tokenize(r#"<P Class="x">Hi &amp; bye</p>"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                start("p", &[("class", "x")]),
                Token::Text("Hi & bye".to_string()),
                Token::EndTag("p".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_attribute_forms() {
        let tokens = tokenize("<input type=checkbox checked value='a b' data-x=\"1\" type=no>")
            .unwrap();
        let Token::StartTag {
            name,
            attributes,
            self_closing,
        } = &tokens[0]
        else {
            panic!("expected start tag, got {tokens:?}");
        };
        assert_eq!(name, "input");
        assert!(*self_closing, "void elements are self closing");
        assert_eq!(
            attributes,
            &vec![
                Attribute::new("type", "checkbox"),
                Attribute::new("checked", ""),
                Attribute::new("value", "a b"),
                Attribute::new("data-x", "1"),
            ]
        );
    }

    #[test]
    fn test_tokenize_doctype_and_comment() {
        let tokens = tokenize("<!DOCTYPE html><!-- note -->").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Doctype("DOCTYPE html".to_string()),
                Token::Comment(" note ".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_script_body_is_raw() {
        let tokens = tokenize("<script>if (a < b && c) {}</SCRIPT >").unwrap();
        assert_eq!(
            tokens,
            vec![
                start("script", &[]),
                Token::Text("if (a < b && c) {}".to_string()),
                Token::EndTag("script".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_title_decodes_references() {
        let tokens = tokenize("<title>A &amp; <b></title>").unwrap();
        assert_eq!(tokens[1], Token::Text("A & <b>".to_string()));
    }

    #[test]
    fn test_stray_less_than_is_text() {
        let tokens = tokenize("<p>1 < 2 <= 3</p>").unwrap();
        assert_eq!(tokens[1], Token::Text("1 < 2 <= 3".to_string()));
    }

    #[test]
    fn test_unterminated_tag_is_an_error() {
        let err = tokenize("<p>text <a href=\"x").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnterminatedTag {
                name: "a".to_string(),
                offset: 8
            }
        );
    }

    #[test]
    fn test_unterminated_comment_is_an_error() {
        assert!(matches!(
            tokenize("<p>a</p><!-- open"),
            Err(ParseError::UnterminatedComment { offset: 8 })
        ));
    }

    #[test]
    fn test_abrupt_empty_comments() {
        let tokens = tokenize("a<!-->b<!--->c").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Text("a".to_string()),
                Token::Comment(String::new()),
                Token::Text("b".to_string()),
                Token::Comment(String::new()),
                Token::Text("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_unclosed_script_is_an_error() {
        assert!(matches!(
            tokenize("<script>let x = 1;"),
            Err(ParseError::UnclosedRawText { ref name, .. }) if name == "script"
        ));
    }

    #[test]
    fn test_non_ascii_text_survives() {
        let tokens = tokenize("<p>Größe (1) – café 😊</p>").unwrap();
        assert_eq!(tokens[1], Token::Text("Größe (1) – café 😊".to_string()));
    }

    proptest! {
        #[test]
        fn prop_tokenize_never_panics(input in "\\PC{0,64}") {
            let _ = tokenize(&input);
        }

        #[test]
        fn prop_plain_text_is_one_token(text in "[a-zA-Z0-9 ,.()\\[\\]]{1,40}") {
            let tokens = tokenize(&text).unwrap();
            prop_assert_eq!(tokens, vec![Token::Text(text.clone())]);
        }
    }
}
