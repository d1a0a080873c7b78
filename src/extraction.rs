//! Candidate extraction from assistant replies
//!
//! The ranking workflow answers in loosely formatted Markdown. When a reply
//! lists at least two candidates, each introduced by a bold `Name` or
//! `Candidate` label at the start of a line, it is split into one
//! [`CandidateBlock`] per candidate. Otherwise the reply is shown as a single
//! message. Parsing never fails: missing fields come back empty.
//!
//! Portuguese labels (`Nome`, `Candidato`, `Telefone`, `Resumo`) are accepted
//! alongside the English ones.
//!
//! # Examples
//!
//! ```
//! use recruitchat::extraction::extract_candidates;
//!
//! let reply = "Top matches:\n\n\
//!     **Name:** Ana Souza\n**Email:** ana@example.com\n\n\
//!     **Name:** Bruno Lima\n**Phone:** +55 11 99999-0000\n";
//! let blocks = extract_candidates(reply);
//! assert_eq!(blocks.len(), 2);
//! assert_eq!(blocks[0].name, "Ana Souza");
//! assert_eq!(blocks[1].phone, "+55 11 99999-0000");
//! ```

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Name used when a block carries no readable name
pub const DEFAULT_CANDIDATE_NAME: &str = "Candidate";

/// Minimum markers before a reply is treated as a candidate list
const MIN_MARKERS: usize = 2;

/// Optional list bullet, ordinal or heading prefix before a bold label
const LINE_PREFIX: &str = r"^[ \t]*(?:[-*+][ \t]+|\d+[.)][ \t]+|#{1,6}[ \t]+)?";

/// One candidate parsed out of an assistant message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateBlock {
    /// Position within the parent message, starting at 0
    pub index: usize,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub profile_link: String,
    pub summary: String,
    /// The segment of the reply this block was parsed from
    pub raw: String,
}

/// How a message should be displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageView {
    /// Render the whole text as one message
    Plain(String),
    /// Render the preamble followed by one card per candidate
    Candidates {
        preamble: String,
        blocks: Vec<CandidateBlock>,
    },
}

/// Split `content` into candidate blocks, or return an empty list when the
/// text does not hold at least two candidates.
pub fn extract_candidates(content: &str) -> Vec<CandidateBlock> {
    parser().extract(content).1
}

/// Classify `content` for display
pub fn render_message(content: &str) -> MessageView {
    let (preamble, blocks) = parser().extract(content);
    if blocks.is_empty() {
        MessageView::Plain(content.to_string())
    } else {
        MessageView::Candidates { preamble, blocks }
    }
}

fn parser() -> &'static CandidateParser {
    static PARSER: OnceLock<CandidateParser> = OnceLock::new();
    PARSER.get_or_init(CandidateParser::new)
}

struct CandidateParser {
    marker: Regex,
    name: Regex,
    candidate: Regex,
    email: Regex,
    phone: Regex,
    summary: Regex,
    link_label: Regex,
    any_label: Regex,
    markdown_link: Regex,
    profile_link: Regex,
    bare_url: Regex,
    leading_ordinal: Regex,
}

fn label_pattern(labels: &str) -> String {
    // group 1: text inside the bold span after the label
    // group 2: text after the closing `**`
    format!(
        r"(?mi){}\*\*[ \t]*(?:{})\b([^*\n]*)\*\*([^\n]*)$",
        LINE_PREFIX, labels
    )
}

impl CandidateParser {
    fn new() -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("Invalid candidate pattern");
        Self {
            marker: compile(&format!(
                r"(?mi){}\*\*[ \t]*(?:name|nome|candidate|candidato|candidata)\b",
                LINE_PREFIX
            )),
            name: compile(&label_pattern("name|nome")),
            candidate: compile(&label_pattern("candidate|candidato|candidata")),
            email: compile(&label_pattern("e-?mail")),
            phone: compile(&label_pattern("phone|telefone|tel|celular|whatsapp")),
            summary: compile(&label_pattern("summary|resumo")),
            link_label: compile(&label_pattern(
                "link|linkedin|profile|perfil|url|cv|curr[ií]culo",
            )),
            any_label: compile(&format!(r"(?i){}(?:\*\*|\[|#)", LINE_PREFIX)),
            markdown_link: compile(r"\[([^\]\n]*)\]\(([^)\s]*)\)"),
            profile_link: compile(r"\[[^\]\n]*\]\((https?://[^)\s]+)\)"),
            bare_url: compile(r"https?://[^\s)>\]]+"),
            leading_ordinal: compile(r"^[\s\d#.:\-–]*"),
        }
    }

    fn extract(&self, content: &str) -> (String, Vec<CandidateBlock>) {
        let starts: Vec<usize> = self.marker.find_iter(content).map(|m| m.start()).collect();
        if starts.len() < MIN_MARKERS {
            return (content.trim().to_string(), Vec::new());
        }

        let preamble = content[..starts[0]].trim().to_string();
        let mut bounds = starts.clone();
        bounds.push(content.len());

        let blocks = bounds
            .windows(2)
            .map(|w| content[w[0]..w[1]].trim())
            .filter(|segment| !segment.is_empty())
            .enumerate()
            .map(|(index, segment)| self.parse_segment(index, segment))
            .collect();

        (preamble, blocks)
    }

    fn parse_segment(&self, index: usize, segment: &str) -> CandidateBlock {
        let name = self
            .field(&self.name, segment)
            .or_else(|| self.candidate_heading_name(segment))
            .unwrap_or_else(|| DEFAULT_CANDIDATE_NAME.to_string());

        CandidateBlock {
            index,
            name,
            email: self.field(&self.email, segment).unwrap_or_default(),
            phone: self.field(&self.phone, segment).unwrap_or_default(),
            profile_link: self.profile_link(segment).unwrap_or_default(),
            summary: self.summary(segment).unwrap_or_default(),
            raw: segment.to_string(),
        }
    }

    /// Value of the first non-empty `**Label:** value` line
    fn field(&self, pattern: &Regex, segment: &str) -> Option<String> {
        pattern
            .captures_iter(segment)
            .map(|caps| self.label_value(&caps, false))
            .find(|v| !v.is_empty())
    }

    /// Name carried by a `**Candidate 1: Jane Doe**` heading
    fn candidate_heading_name(&self, segment: &str) -> Option<String> {
        self.candidate
            .captures_iter(segment)
            .map(|caps| self.label_value(&caps, true))
            .find(|v| !v.is_empty())
    }

    fn label_value(&self, caps: &Captures<'_>, strip_ordinal: bool) -> String {
        let separators = |c: char| c.is_whitespace() || ":-–".contains(c);
        let inside = caps.get(1).map_or("", |m| m.as_str());
        let inside = if strip_ordinal {
            self.leading_ordinal.replace(inside, "").into_owned()
        } else {
            inside.trim_start_matches(separators).to_string()
        };
        let after = caps
            .get(2)
            .map_or("", |m| m.as_str())
            .trim_start_matches(separators);
        let joined = format!("{} {}", inside.trim(), after.trim());
        self.clean(&joined)
    }

    fn summary(&self, segment: &str) -> Option<String> {
        let caps = self.summary.captures(segment)?;
        let mut parts = vec![self.label_value(&caps, false)];

        let line_end = caps.get(0).map_or(segment.len(), |m| m.end());
        for line in segment[line_end..].lines().skip(1) {
            if line.trim().is_empty() || self.any_label.is_match(line) {
                break;
            }
            parts.push(self.clean(line));
        }

        let summary = parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!summary.is_empty()).then_some(summary)
    }

    fn profile_link(&self, segment: &str) -> Option<String> {
        if let Some(caps) = self.profile_link.captures(segment) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
        self.link_label.captures_iter(segment).find_map(|caps| {
            let line = caps.get(0)?.as_str();
            self.bare_url.find(line).map(|m| m.as_str().to_string())
        })
    }

    /// Strip Markdown link syntax and stray emphasis from a field value
    fn clean(&self, value: &str) -> String {
        let unlinked = self.markdown_link.replace_all(value, "$1");
        unlinked
            .replace("**", "")
            .replace("__", "")
            .replace('`', "")
            .trim()
            .trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace())
            .to_string()
    }
}
