use unicode_width::UnicodeWidthStr;

use crate::html::{is_heading, Document, NodeData, NodeId};
use crate::session::selector_for_element;

use super::{
    wrap_spans, Gutter, InlineColor, InlineSpan, InlineStyle, LineType, Marks, OutlineEntry,
    Preview, RenderedLine,
};

const OUTLINE_TEXT_CHARS: usize = 40;

fn is_skipped(name: &str) -> bool {
    matches!(
        name,
        "head" | "script" | "style" | "template" | "title" | "meta" | "link" | "base" | "noscript"
    )
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "address"
            | "article"
            | "aside"
            | "caption"
            | "details"
            | "dialog"
            | "div"
            | "dl"
            | "dt"
            | "dd"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "header"
            | "hgroup"
            | "main"
            | "nav"
            | "p"
            | "section"
            | "summary"
    )
}

// Blocks followed by an empty line.
fn is_spaced(name: &str) -> bool {
    matches!(
        name,
        "p" | "figure" | "details" | "dl" | "address" | "blockquote" | "pre" | "table"
    )
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_ws = false;
    for ch in text.chars() {
        if ch.is_whitespace() && ch != '\u{a0}' {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out
}

fn short_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= OUTLINE_TEXT_CHARS {
        return collapsed;
    }
    let mut out: String = collapsed.chars().take(OUTLINE_TEXT_CHARS - 1).collect();
    out.push('…');
    out
}

#[derive(Debug, Clone, Copy)]
struct ListState {
    ordered: bool,
    next: usize,
}

struct PendingBullet {
    text: String,
    /// Byte offset in `prefix` where the bullet's padding starts.
    at: usize,
    padding: usize,
}

struct Renderer<'a> {
    doc: &'a Document,
    marks: &'a Marks,
    width: usize,
    lines: Vec<RenderedLine>,
    outline: Vec<OutlineEntry>,
    inline: Vec<InlineSpan>,
    prefix: String,
    bullet: Option<PendingBullet>,
    line_type: LineType,
    block_node: Option<NodeId>,
    lists: Vec<ListState>,
    outline_depth: usize,
    cell_index: Option<usize>,
}

/// Render the body of `doc` into lines of at most `width` columns.
pub fn render_document(doc: &Document, width: usize, marks: &Marks) -> Preview {
    let _scope = crate::perf::scope("preview.render");
    let mut renderer = Renderer {
        doc,
        marks,
        width: width.max(8),
        lines: Vec::new(),
        outline: Vec::new(),
        inline: Vec::new(),
        prefix: String::new(),
        bullet: None,
        line_type: LineType::Paragraph,
        block_node: None,
        lists: Vec::new(),
        outline_depth: 0,
        cell_index: None,
    };
    renderer.children(doc.body(), InlineStyle::default());
    renderer.flush();
    while renderer
        .lines
        .last()
        .is_some_and(|line| line.line_type() == LineType::Empty)
    {
        renderer.lines.pop();
    }
    Preview::from_parts(renderer.lines, renderer.outline)
}

impl Renderer<'_> {
    fn children(&mut self, id: NodeId, style: InlineStyle) {
        let doc = self.doc;
        for &child in doc.children(id) {
            match doc.data(child) {
                NodeData::Element(el) => self.element(child, &el.name, style),
                NodeData::Text(text) => self.text(child, text, style),
                NodeData::Document | NodeData::Doctype(_) | NodeData::Comment(_) => {}
            }
        }
    }

    fn element(&mut self, id: NodeId, name: &str, style: InlineStyle) {
        if is_skipped(name) {
            return;
        }
        let style = self.inline_style_for(id, name, style);
        match name {
            "br" => self.flush(),
            "hr" => {
                self.flush();
                let rule = "─".repeat(self.width.saturating_sub(self.prefix.width()).min(40));
                let line = RenderedLine::new(format!("{}{rule}", self.prefix), LineType::Rule)
                    .with_node(Some(id), self.gutter_for(Some(id)));
                self.lines.push(line);
            }
            "img" => {
                let alt = self
                    .doc
                    .element(id)
                    .and_then(|el| el.attr("alt"))
                    .filter(|alt| !alt.trim().is_empty());
                let text = alt.map_or_else(|| "[image]".to_string(), |alt| format!("[image: {alt}]"));
                self.inline.push(InlineSpan::new(text, style));
            }
            "ul" | "ol" | "menu" => self.list(id, name == "ol", style),
            "li" => self.list_item(id, style),
            "pre" => self.preformatted(id, style),
            "blockquote" => self.block(id, name, Some(LineType::Quote), "│ ", style),
            "table" => self.block(id, name, Some(LineType::Table), "", style),
            "tr" => {
                self.flush();
                let saved = (self.block_node, self.cell_index);
                self.block_node = Some(id);
                self.cell_index = Some(0);
                self.children(id, style);
                self.flush();
                (self.block_node, self.cell_index) = saved;
            }
            "td" | "th" => {
                if let Some(index) = self.cell_index {
                    if index > 0 {
                        self.inline
                            .push(InlineSpan::new(" │ ".to_string(), InlineStyle::default()));
                    }
                    self.cell_index = Some(index + 1);
                }
                let mut cell_style = style;
                cell_style.strong |= name == "th";
                self.children(id, cell_style);
            }
            _ if is_heading(name) => {
                let level = name[1..].parse::<u8>().unwrap_or(1);
                self.blank();
                let mut heading_style = style;
                heading_style.strong = true;
                self.block(id, name, Some(LineType::Heading(level)), "", heading_style);
                self.blank();
            }
            _ if is_block(name) => self.block(id, name, None, "", style),
            _ => self.children(id, style),
        }
    }

    fn inline_style_for(&self, id: NodeId, name: &str, mut style: InlineStyle) -> InlineStyle {
        match name {
            "em" | "i" | "cite" | "dfn" | "var" => style.emphasis = true,
            "strong" | "b" => style.strong = true,
            "code" | "kbd" | "samp" | "tt" => style.code = true,
            "s" | "del" | "strike" => style.strikethrough = true,
            "u" | "ins" => style.underline = true,
            "a" => {
                style.link |= self.doc.element(id).and_then(|el| el.attr("href")).is_some();
            }
            _ => {}
        }
        if let Some(bg) = self
            .doc
            .element(id)
            .and_then(|el| el.style_property("background-color"))
            .and_then(|value| InlineColor::from_hex(&value))
        {
            style.bg = Some(bg);
        }
        style
    }

    fn text(&mut self, id: NodeId, text: &str, style: InlineStyle) {
        let Some(ranges) = self.marks.references.get(&id) else {
            self.push_text(text, style);
            return;
        };
        let mut ranges = ranges.clone();
        ranges.sort_unstable();
        let mut marker_style = style;
        marker_style.marker = true;
        let mut cursor = 0;
        for (start, end) in ranges {
            let (Some(before), Some(marker)) = (text.get(cursor..start), text.get(start..end))
            else {
                continue;
            };
            self.push_text(before, style);
            self.push_text(marker, marker_style);
            cursor = end;
        }
        if let Some(rest) = text.get(cursor..) {
            self.push_text(rest, style);
        }
    }

    fn push_text(&mut self, text: &str, style: InlineStyle) {
        let mut collapsed = collapse_whitespace(text);
        let after_space = self
            .inline
            .last()
            .is_none_or(|span| span.text().ends_with(' '));
        if after_space && collapsed.starts_with(' ') {
            collapsed.remove(0);
        }
        if !collapsed.is_empty() {
            self.inline.push(InlineSpan::new(collapsed, style));
        }
    }

    fn gutter_for(&self, node: Option<NodeId>) -> Gutter {
        let Some(node) = node else {
            return Gutter::None;
        };
        for candidate in std::iter::once(node).chain(self.doc.ancestors(node)) {
            if let Some(&number) = self.marks.sources.get(&candidate) {
                return Gutter::Source(number);
            }
            if self.marks.picked.contains(&candidate) {
                return Gutter::Picked;
            }
            if self.marks.anchor == Some(candidate) {
                return Gutter::Anchor;
            }
        }
        Gutter::None
    }

    fn flush(&mut self) {
        if self.inline.iter().all(|span| span.text().trim().is_empty()) {
            self.inline.clear();
            return;
        }
        let spans = std::mem::take(&mut self.inline);
        let first = match self.bullet.take() {
            Some(bullet) => format!(
                "{}{}{}",
                &self.prefix[..bullet.at],
                bullet.text,
                &self.prefix[bullet.at + bullet.padding..]
            ),
            None => self.prefix.clone(),
        };
        let gutter = self.gutter_for(self.block_node);
        for line in wrap_spans(&spans, self.width, &first, &self.prefix) {
            self.lines.push(
                RenderedLine::with_spans(self.line_type, line).with_node(self.block_node, gutter),
            );
        }
    }

    fn blank(&mut self) {
        if self
            .lines
            .last()
            .is_some_and(|line| line.line_type() != LineType::Empty)
        {
            self.lines.push(RenderedLine::new(String::new(), LineType::Empty));
        }
    }

    fn begin_outline(&mut self, id: NodeId, name: &str) {
        let Some(selector) = selector_for_element(self.doc, id) else {
            return;
        };
        let heading_level = if is_heading(name) {
            name[1..].parse::<u8>().ok()
        } else {
            None
        };
        self.outline.push(OutlineEntry {
            node: id,
            depth: self.outline_depth,
            selector,
            text: short_text(&self.doc.text_content(id)),
            line: self.lines.len(),
            heading_level,
        });
    }

    fn block(
        &mut self,
        id: NodeId,
        name: &str,
        line_type: Option<LineType>,
        extra_prefix: &str,
        style: InlineStyle,
    ) {
        self.flush();
        self.begin_outline(id, name);
        let saved_type = self.line_type;
        let saved_node = self.block_node;
        let saved_prefix = self.prefix.len();
        if let Some(line_type) = line_type {
            self.line_type = line_type;
        }
        self.block_node = Some(id);
        self.prefix.push_str(extra_prefix);
        self.outline_depth += 1;

        self.children(id, style);
        self.flush();

        self.outline_depth -= 1;
        self.prefix.truncate(saved_prefix);
        self.block_node = saved_node;
        self.line_type = saved_type;
        if is_spaced(name) {
            self.blank();
        }
    }

    fn list(&mut self, id: NodeId, ordered: bool, style: InlineStyle) {
        self.flush();
        self.begin_outline(id, if ordered { "ol" } else { "ul" });
        let start = self
            .doc
            .element(id)
            .and_then(|el| el.attr("start"))
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1);
        self.lists.push(ListState {
            ordered,
            next: start,
        });
        self.outline_depth += 1;
        self.children(id, style);
        self.flush();
        self.outline_depth -= 1;
        self.lists.pop();
        if self.lists.is_empty() {
            self.blank();
        }
    }

    fn list_item(&mut self, id: NodeId, style: InlineStyle) {
        self.flush();
        self.begin_outline(id, "li");
        let marker = match self.lists.last_mut() {
            Some(list) if list.ordered => {
                let marker = format!("{}. ", list.next);
                list.next += 1;
                marker
            }
            _ => "• ".to_string(),
        };
        let saved_type = self.line_type;
        let saved_node = self.block_node;
        let saved_prefix = self.prefix.len();
        let padding = marker.width();
        self.bullet = Some(PendingBullet {
            text: marker,
            at: saved_prefix,
            padding,
        });
        self.prefix.push_str(&" ".repeat(padding));
        self.line_type = LineType::ListItem;
        self.block_node = Some(id);
        self.outline_depth += 1;

        self.children(id, style);
        self.flush();

        self.outline_depth -= 1;
        self.bullet = None;
        self.prefix.truncate(saved_prefix);
        self.block_node = saved_node;
        self.line_type = saved_type;
    }

    fn preformatted(&mut self, id: NodeId, style: InlineStyle) {
        self.flush();
        self.begin_outline(id, "pre");
        let mut code_style = style;
        code_style.code = true;
        let text = self.doc.text_content(id);
        let text = text.strip_prefix('\n').unwrap_or(&text);
        let text = text.trim_end_matches('\n').replace('\t', "    ");
        let gutter = self.gutter_for(Some(id));
        let language = self.code_language(id);
        let highlighted = match language.as_deref() {
            Some(language) => crate::highlight::highlight_code(Some(language), &text),
            None => text
                .split('\n')
                .map(|line| vec![InlineSpan::new(line.to_string(), code_style)])
                .collect(),
        };
        for code in highlighted {
            let mut spans = vec![InlineSpan::new(self.prefix.clone(), InlineStyle::default())];
            spans.extend(code);
            self.lines.push(
                RenderedLine::with_spans(LineType::Preformatted, spans)
                    .with_node(Some(id), gutter),
            );
        }
        self.blank();
    }

    /// `xyz` from a `<code class="language-xyz">` directly inside `pre`.
    fn code_language(&self, pre: NodeId) -> Option<String> {
        let code = self
            .doc
            .element_children(pre)
            .find(|&child| self.doc.tag_name(child) == Some("code"))?;
        self.doc.element(code)?.classes().find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
                .map(str::to_string)
        })
    }
}
