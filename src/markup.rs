use once_cell::sync::Lazy;
use regex::Regex;

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern compiles"));

const HEADER_MARKER: &str = "###";

/// Inline run of text inside a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Strong(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Analysis,
    Focus,
    RawData,
    Error,
}

impl SectionKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            SectionKind::Analysis => "analysis",
            SectionKind::Focus => "query-focus",
            SectionKind::RawData => "raw-data",
            SectionKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Span>),
    /// A `###` line, shown as an emphasized inline header.
    Header(String),
    Field { label: String, value: String },
    /// Fixed-width text, shown verbatim.
    Preformatted(String),
    Section {
        kind: SectionKind,
        title: String,
        blocks: Vec<Block>,
    },
}

/// Rich content built by this crate. Never constructed from untrusted markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn has_section(&self, kind: SectionKind) -> bool {
        self.blocks
            .iter()
            .any(|b| matches!(b, Block::Section { kind: k, .. } if *k == kind))
    }

    /// Text content without styling, one block per line.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            collect_text(block, &mut lines);
        }
        lines.join("\n")
    }
}

fn collect_text(block: &Block, lines: &mut Vec<String>) {
    match block {
        Block::Paragraph(spans) => lines.push(spans_text(spans)),
        Block::Header(text) => lines.push(text.clone()),
        Block::Field { label, value } => lines.push(format!("{}: {}", label, value)),
        Block::Preformatted(text) => lines.push(text.clone()),
        Block::Section { title, blocks, .. } => {
            lines.push(title.clone());
            for inner in blocks {
                collect_text(inner, lines);
            }
        }
    }
}

pub fn spans_text(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|s| match s {
            Span::Text(t) | Span::Strong(t) => t.as_str(),
        })
        .collect()
}

/// Splits `**bold**` runs out of a single line. Unpaired markers stay literal.
pub fn parse_inline(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;

    for caps in BOLD.captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            spans.push(Span::Text(line[last..whole.start()].to_string()));
        }
        spans.push(Span::Strong(inner.as_str().to_string()));
        last = whole.end();
    }

    if last < line.len() {
        spans.push(Span::Text(line[last..].to_string()));
    }

    spans
}

/// Turns analysis text into blocks: one paragraph per non-blank line, `###`
/// lines become headers.
pub fn parse_analysis(text: &str) -> Vec<Block> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.trim_start().strip_prefix(HEADER_MARKER) {
            Some(rest) => {
                let title = rest.trim_start_matches('#').trim();
                Block::Header(spans_text(&parse_inline(title)))
            }
            None => Block::Paragraph(parse_inline(line)),
        })
        .collect()
}
