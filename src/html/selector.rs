//! A CSS selector subset for querying a [`Document`].
//!
//! Supported: type, `*`, `#id`, `.class`, attribute selectors (`[a]`, `=`,
//! `~=`, `|=`, `^=`, `$=`, `*=`), `:first-child`, `:last-child`,
//! `:only-child`, `:nth-child(n)`, the four combinators, and comma lists.

use std::fmt;
use std::str::FromStr;

use super::dom::{Document, ElementData, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("selector is empty")]
    Empty,
    #[error("unexpected '{ch}' at position {pos} in selector")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("selector ends unexpectedly")]
    UnexpectedEnd,
    #[error("unsupported pseudo-class :{0}")]
    UnsupportedPseudo(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: Option<(AttrOp, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pseudo {
    FirstChild,
    LastChild,
    OnlyChild,
    NthChild(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
    pseudos: Vec<Pseudo>,
}

// compounds[i] and compounds[i + 1] are joined by combinators[i].
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<Complex>,
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self) -> SelectorError {
        self.peek().map_or(SelectorError::UnexpectedEnd, |ch| {
            SelectorError::UnexpectedChar { ch, pos: self.pos }
        })
    }

    fn expect(&mut self, want: char) -> Result<(), SelectorError> {
        if self.peek() == Some(want) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.pos += 1;
                out.push(self.bump().ok_or(SelectorError::UnexpectedEnd)?);
            } else if ch.is_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii() {
                out.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.unexpected());
        }
        Ok(out)
    }

    fn list(&mut self) -> Result<Vec<Complex>, SelectorError> {
        let mut selectors = vec![self.complex()?];
        while self.peek() == Some(',') {
            self.pos += 1;
            selectors.push(self.complex()?);
        }
        if self.peek().is_some() {
            return Err(self.unexpected());
        }
        Ok(selectors)
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_whitespace();
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if had_space => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_whitespace();
            }
            combinators.push(combinator);
            compounds.push(self.compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut any = false;
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                any = true;
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' || ch == '\\' => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
                any = true;
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    compound.pseudos.push(self.pseudo()?);
                }
                _ => break,
            }
            any = true;
        }
        if any {
            Ok(compound)
        } else {
            Err(self.unexpected())
        }
    }

    fn attribute(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttrSelector { name, op: None });
            }
            Some('=') => {
                self.pos += 1;
                AttrOp::Equals
            }
            Some(ch @ ('~' | '|' | '^' | '$' | '*')) => {
                self.pos += 1;
                self.expect('=')?;
                match ch {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                }
            }
            _ => return Err(self.unexpected()),
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        None => return Err(SelectorError::UnexpectedEnd),
                        Some('\\') => {
                            value.push(self.bump().ok_or(SelectorError::UnexpectedEnd)?);
                        }
                        Some(ch) if ch == quote => break,
                        Some(ch) => value.push(ch),
                    }
                }
                value
            }
            _ => self.ident()?,
        };
        self.skip_whitespace();
        // Case-sensitivity flags are accepted and ignored.
        if matches!(self.peek(), Some('i' | 's' | 'I' | 'S')) {
            self.pos += 1;
            self.skip_whitespace();
        }
        self.expect(']')?;
        Ok(AttrSelector {
            name,
            op: Some((op, value)),
        })
    }

    fn pseudo(&mut self) -> Result<Pseudo, SelectorError> {
        let name = self.ident()?.to_ascii_lowercase();
        match name.as_str() {
            "first-child" => Ok(Pseudo::FirstChild),
            "last-child" => Ok(Pseudo::LastChild),
            "only-child" => Ok(Pseudo::OnlyChild),
            "nth-child" => {
                self.expect('(')?;
                self.skip_whitespace();
                let start = self.pos;
                while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                let n = digits.parse::<usize>().map_err(|_| self.unexpected())?;
                self.skip_whitespace();
                self.expect(')')?;
                Ok(Pseudo::NthChild(n))
            }
            _ => Err(SelectorError::UnsupportedPseudo(name)),
        }
    }
}

impl AttrSelector {
    fn matches(&self, el: &ElementData) -> bool {
        let Some(actual) = el.attr(&self.name) else {
            return false;
        };
        let Some((op, want)) = &self.op else {
            return true;
        };
        match op {
            AttrOp::Equals => actual == want,
            AttrOp::Includes => actual.split_whitespace().any(|word| word == want),
            AttrOp::DashMatch => {
                actual == want
                    || actual
                        .strip_prefix(want.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            AttrOp::Prefix => !want.is_empty() && actual.starts_with(want.as_str()),
            AttrOp::Suffix => !want.is_empty() && actual.ends_with(want.as_str()),
            AttrOp::Substring => !want.is_empty() && actual.contains(want.as_str()),
        }
    }
}

impl Compound {
    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(el) = doc.element(id) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|tag| tag != el.name) {
            return false;
        }
        if !self.ids.iter().all(|want| el.id() == Some(want.as_str())) {
            return false;
        }
        if !self.classes.iter().all(|class| el.has_class(class)) {
            return false;
        }
        if !self.attrs.iter().all(|attr| attr.matches(el)) {
            return false;
        }
        self.pseudos.iter().all(|pseudo| match pseudo {
            Pseudo::FirstChild => doc.element_index(id) == Some(1),
            Pseudo::LastChild => doc.element_index(id) == Some(doc.element_sibling_count(id)),
            Pseudo::OnlyChild => doc.element_sibling_count(id) == 1,
            Pseudo::NthChild(n) => doc.element_index(id) == Some(*n),
        })
    }
}

impl Complex {
    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.matches_from(doc, id, self.compounds.len() - 1)
    }

    fn matches_from(&self, doc: &Document, id: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(doc, id) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let next = index - 1;
        match self.combinators[next] {
            Combinator::Child => doc
                .parent(id)
                .is_some_and(|parent| self.matches_from(doc, parent, next)),
            Combinator::Descendant => doc
                .ancestors(id)
                .any(|ancestor| self.matches_from(doc, ancestor, next)),
            Combinator::NextSibling => doc
                .previous_element_sibling(id)
                .is_some_and(|sibling| self.matches_from(doc, sibling, next)),
            Combinator::SubsequentSibling => {
                let mut sibling = doc.previous_element_sibling(id);
                while let Some(current) = sibling {
                    if self.matches_from(doc, current, next) {
                        return true;
                    }
                    sibling = doc.previous_element_sibling(current);
                }
                false
            }
        }
    }
}

impl SelectorList {
    /// Parse a selector list.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectorError`] for empty or malformed input.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut parser = Parser {
            chars: trimmed.chars().collect(),
            pos: 0,
        };
        let selectors = parser.list()?;
        Ok(Self {
            source: trimmed.to_string(),
            selectors,
        })
    }

    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.selectors.iter().any(|complex| complex.matches(doc, id))
    }
}

impl Document {
    /// Every element matching `selectors`, in document order.
    pub fn select(&self, selectors: &SelectorList) -> Vec<NodeId> {
        self.elements()
            .filter(|id| selectors.matches(self, *id))
            .collect()
    }

    pub fn select_first(&self, selectors: &SelectorList) -> Option<NodeId> {
        self.elements().find(|id| selectors.matches(self, *id))
    }
}
