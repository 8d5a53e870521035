//! Document state and the annotation actions.
//!
//! A [`Session`] owns the current markup, a one-step undo buffer and the
//! user's settings. Every action parses the markup into a fresh
//! [`Document`], works on the tree, and only on success serializes it back
//! and records the previous markup for undo. On error nothing changes.
//!
//! Source and reference selections are stored with a fingerprint of the
//! markup they were computed from. Node ids are stable across re-parses of
//! identical markup, so a fresh selection can be applied to a new parse.

mod apply;
mod link;
mod references;
mod sources;
mod style;
mod toc;

#[cfg(test)]
mod tests;

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info};

use crate::html::{Document, ParseError, SelectorError};

pub use apply::{apply_changes, reference_anchor_id, ApplyReport, HIGHLIGHT_COLOR};
pub use link::{link_references, LinkReport};
pub use references::{collect_references, Reference};
pub use sources::{
    collect_sources, parse_sources_selector, selector_for_element, selector_for_elements,
    source_id, unique_selector_for_element, SourceElement,
};
pub use style::{next_predefined_style, ReferenceStyle, DEFAULT_STYLE, PREDEFINED_STYLES};
pub use toc::{insert_table_of_contents, TocEntry, TocOptions, DEFAULT_TOC_TITLE, TOC_ID};

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Error parsing HTML content. Please check the file structure. ({0})")]
    Parse(#[from] ParseError),
    #[error(
        "Invalid source style. Please include the number \"1\" in the style to indicate where the number should appear."
    )]
    InvalidStyle,
    #[error("Invalid selector \"{selector}\": {source}")]
    Selector {
        selector: String,
        source: SelectorError,
    },
    #[error("No sources selector set. Enter one or pick elements in the outline.")]
    NoSourcesSelector,
    #[error("No elements match the sources selector \"{0}\".")]
    NoSources(String),
    #[error("Select at least one heading tag.")]
    NoTagsSelected,
    #[error("No headings found for {tags}.")]
    NoHeadings { tags: String },
    #[error("No element matches the table of contents anchor \"{0}\".")]
    AnchorNotFound(String),
    #[error("No references found matching the source style.")]
    NoReferences,
    #[error("Select source elements and find references before linking.")]
    NothingToLink,
    #[error("No reference has a matching source element (unresolved: {0}).")]
    NoMatchingSources(String),
    #[error("Nothing to apply: no jump links and no ids in the document.")]
    NothingToApply,
    #[error("Nothing to undo.")]
    NothingToUndo,
}

#[derive(
    clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HeadingTag {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingTag {
    pub const ALL: [Self; 6] = [Self::H1, Self::H2, Self::H3, Self::H4, Self::H5, Self::H6];

    pub const fn name(self) -> &'static str {
        match self {
            Self::H1 => "h1",
            Self::H2 => "h2",
            Self::H3 => "h3",
            Self::H4 => "h4",
            Self::H5 => "h5",
            Self::H6 => "h6",
        }
    }

    pub const fn level(self) -> u8 {
        match self {
            Self::H1 => 1,
            Self::H2 => 2,
            Self::H3 => 3,
            Self::H4 => 4,
            Self::H5 => 5,
            Self::H6 => 6,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get(usize::from(level).checked_sub(1)?).copied()
    }
}

impl fmt::Display for HeadingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HeadingTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown heading tag '{s}'"))
    }
}

/// The actions a user (or a batch run) can trigger.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    #[value(name = "toc")]
    GenerateToc,
    #[value(name = "sources")]
    SelectSources,
    #[value(name = "references")]
    FindReferences,
    #[value(name = "link")]
    LinkSources,
    #[value(name = "apply")]
    ApplyChanges,
    Undo,
}

impl Action {
    pub const fn label(self) -> &'static str {
        match self {
            Self::GenerateToc => "Generate table of contents",
            Self::SelectSources => "Select source elements",
            Self::FindReferences => "Find references",
            Self::LinkSources => "Link references",
            Self::ApplyChanges => "Apply changes",
            Self::Undo => "Undo",
        }
    }

    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::SelectSources | Self::FindReferences)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Heading tags in selection order.
    pub tags: Vec<HeadingTag>,
    pub style: String,
    pub sources_selector: String,
    pub toc_anchor: Option<String>,
    pub toc_title: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tags: vec![HeadingTag::H1, HeadingTag::H2, HeadingTag::H3],
            style: DEFAULT_STYLE.to_string(),
            sources_selector: String::new(),
            toc_anchor: None,
            toc_title: DEFAULT_TOC_TITLE.to_string(),
        }
    }
}

impl Settings {
    /// Add `tag` at the end of the selection, or remove it.
    pub fn toggle_tag(&mut self, tag: HeadingTag) {
        if let Some(pos) = self.tags.iter().position(|t| *t == tag) {
            self.tags.remove(pos);
        } else {
            self.tags.push(tag);
        }
    }

    pub fn has_tag(&self, tag: HeadingTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// What a successful action did. `Display` gives the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Outcome {
    TocGenerated { entries: Vec<TocEntry> },
    SourcesSelected { sources: Vec<SourceElement> },
    ReferencesFound { references: Vec<Reference> },
    Linked(LinkReport),
    Applied(ApplyReport),
    Undone,
    ContentReplaced,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TocGenerated { entries } => {
                write!(f, "Table of contents generated with {} entries.", entries.len())
            }
            Self::SourcesSelected { sources } => {
                write!(f, "Source elements selected. ({} found)", sources.len())
            }
            Self::ReferencesFound { references } => {
                write!(f, "Found {} references.", references.len())
            }
            Self::Linked(report) => {
                write!(f, "References have been linked. ({} links", report.linked)?;
                if !report.unresolved.is_empty() {
                    write!(f, ", unresolved: {}", join_numbers(&report.unresolved))?;
                }
                f.write_str(")")
            }
            Self::Applied(report) => write!(
                f,
                "Changes applied: {} links renumbered, {} elements highlighted.",
                report.renumbered, report.highlighted
            ),
            Self::Undone => f.write_str("Restored the previous version."),
            Self::ContentReplaced => f.write_str("Document updated."),
        }
    }
}

fn join_numbers(numbers: &[usize]) -> String {
    numbers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn fingerprint(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone)]
struct Selection<T> {
    fingerprint: u64,
    items: Vec<T>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    content: String,
    previous: Option<String>,
    settings: Settings,
    sources: Option<Selection<SourceElement>>,
    references: Option<Selection<Reference>>,
}

impl Session {
    pub fn new(content: impl Into<String>, settings: Settings) -> Self {
        Self {
            content: content.into(),
            previous: None,
            settings,
            sources: None,
            references: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub const fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub const fn can_undo(&self) -> bool {
        self.previous.is_some()
    }

    pub fn fingerprint(&self) -> u64 {
        fingerprint(&self.content)
    }

    /// Sources selected on the current content, if any.
    pub fn sources(&self) -> Option<&[SourceElement]> {
        let current = self.fingerprint();
        self.sources
            .as_ref()
            .filter(|s| s.fingerprint == current)
            .map(|s| s.items.as_slice())
    }

    /// References found on the current content, if any.
    pub fn references(&self) -> Option<&[Reference]> {
        let current = self.fingerprint();
        self.references
            .as_ref()
            .filter(|r| r.fingerprint == current)
            .map(|r| r.items.as_slice())
    }

    /// Replace the content from outside (initial load, reload). Clears undo
    /// and selections.
    pub fn load(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.previous = None;
        self.sources = None;
        self.references = None;
        debug!(bytes = self.content.len(), "document loaded");
    }

    /// # Errors
    ///
    /// [`ActionError::Parse`] when the content is not usable markup.
    pub fn parse(&self) -> Result<Document, ActionError> {
        Ok(Document::parse(&self.content)?)
    }

    fn commit(&mut self, doc: &Document) {
        let html = doc.to_html();
        self.previous = Some(std::mem::replace(&mut self.content, html));
    }

    /// Replace the content with edited markup as an undoable change.
    ///
    /// # Errors
    ///
    /// Rejects markup that does not parse.
    pub fn replace_content(&mut self, content: String) -> Result<Outcome, ActionError> {
        Document::parse(&content)?;
        self.previous = Some(std::mem::replace(&mut self.content, content));
        info!("content replaced from editor");
        Ok(Outcome::ContentReplaced)
    }

    /// # Errors
    ///
    /// The action's [`ActionError`]; the session is unchanged in that case.
    pub fn run(&mut self, action: Action) -> Result<Outcome, ActionError> {
        let result = match action {
            Action::GenerateToc => self.generate_toc(),
            Action::SelectSources => self.select_sources(),
            Action::FindReferences => self.find_references(),
            Action::LinkSources => self.link_sources(),
            Action::ApplyChanges => self.apply_changes(),
            Action::Undo => self.undo(),
        };
        match &result {
            Ok(outcome) => info!(action = action.label(), "{outcome}"),
            Err(err) => info!(action = action.label(), error = %err, "action failed"),
        }
        result
    }

    /// # Errors
    ///
    /// See [`insert_table_of_contents`].
    pub fn generate_toc(&mut self) -> Result<Outcome, ActionError> {
        let mut doc = self.parse()?;
        let entries = insert_table_of_contents(
            &mut doc,
            TocOptions {
                tags: &self.settings.tags,
                title: &self.settings.toc_title,
                anchor: self.settings.toc_anchor.as_deref(),
            },
        )?;
        self.commit(&doc);
        Ok(Outcome::TocGenerated { entries })
    }

    fn compute_sources(&self, doc: &Document) -> Result<Vec<SourceElement>, ActionError> {
        let selector = parse_sources_selector(&self.settings.sources_selector)?;
        let sources = collect_sources(doc, &selector);
        if sources.is_empty() {
            return Err(ActionError::NoSources(selector.to_string()));
        }
        debug!(count = sources.len(), selector = %selector, "sources collected");
        Ok(sources)
    }

    fn compute_references(&self, doc: &Document) -> Result<Vec<Reference>, ActionError> {
        let style = ReferenceStyle::new(&self.settings.style)?;
        let references = collect_references(doc, &style);
        if references.is_empty() {
            return Err(ActionError::NoReferences);
        }
        debug!(count = references.len(), style = %style, "references collected");
        Ok(references)
    }

    /// # Errors
    ///
    /// Empty, invalid or unmatched sources selector.
    pub fn select_sources(&mut self) -> Result<Outcome, ActionError> {
        let doc = self.parse()?;
        let sources = self.compute_sources(&doc)?;
        self.sources = Some(Selection {
            fingerprint: self.fingerprint(),
            items: sources.clone(),
        });
        Ok(Outcome::SourcesSelected { sources })
    }

    /// # Errors
    ///
    /// Invalid style or no marker in the document.
    pub fn find_references(&mut self) -> Result<Outcome, ActionError> {
        let doc = self.parse()?;
        let references = self.compute_references(&doc)?;
        self.references = Some(Selection {
            fingerprint: self.fingerprint(),
            items: references.clone(),
        });
        Ok(Outcome::ReferencesFound { references })
    }

    /// Link found references to selected sources. Selections computed on
    /// older content are recomputed from the current settings first.
    ///
    /// # Errors
    ///
    /// [`ActionError::NothingToLink`] before both selections were made, the
    /// recomputation's error, or [`ActionError::NoMatchingSources`] when no
    /// marker resolves.
    pub fn link_sources(&mut self) -> Result<Outcome, ActionError> {
        if self.sources.is_none() || self.references.is_none() {
            return Err(ActionError::NothingToLink);
        }
        let mut doc = self.parse()?;

        let sources = match self.sources() {
            Some(items) => items.to_vec(),
            None => {
                debug!("sources are stale, recomputing");
                self.compute_sources(&doc)?
            }
        };
        let references = match self.references() {
            Some(items) => items.to_vec(),
            None => {
                debug!("references are stale, recomputing");
                self.compute_references(&doc)?
            }
        };

        let report = link_references(&mut doc, &sources, &references);
        if report.linked == 0 {
            return Err(ActionError::NoMatchingSources(join_numbers(
                &report.unresolved,
            )));
        }
        self.commit(&doc);
        Ok(Outcome::Linked(report))
    }

    /// # Errors
    ///
    /// Invalid style, or a document with nothing to renumber or highlight.
    pub fn apply_changes(&mut self) -> Result<Outcome, ActionError> {
        let style = ReferenceStyle::new(&self.settings.style)?;
        let mut doc = self.parse()?;
        let report = apply_changes(&mut doc, &style);
        if report.renumbered == 0 && report.highlighted == 0 {
            return Err(ActionError::NothingToApply);
        }
        self.commit(&doc);
        Ok(Outcome::Applied(report))
    }

    /// Restore the markup from before the last change.
    ///
    /// # Errors
    ///
    /// [`ActionError::NothingToUndo`] when there is no previous version.
    pub fn undo(&mut self) -> Result<Outcome, ActionError> {
        let previous = self.previous.take().ok_or(ActionError::NothingToUndo)?;
        self.content = previous;
        Ok(Outcome::Undone)
    }
}
