//! Hierarchical parser for the government services directory document.
//!
//! The source document is a flat text export with a fixed line grammar:
//! `Institution:` headers, bulleted `Service:` / `Sub-Service:` /
//! `Sub-Sub-Service:` headers (nesting depth is carried by the repeated
//! `Sub-` prefix, not by indentation), bulleted `Requirements:` /
//! `Processing Time:` / `Fee:` attributes, and free-form annotation lines
//! that attach to the nearest preceding service.
//!
//! Parsing is a single synchronous pass and never fails: unrecognized input
//! becomes an annotation or is dropped, and a record that never received any
//! of the three core attributes is not emitted.


use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// Separator used to join the hierarchy stack into a full service name,
/// e.g. `"Passport \ Renewal"`.
pub const HIERARCHY_SEPARATOR: &str = " \\ ";

static INSTITUTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Institution:").expect("institution pattern is valid")
});
static SERVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s*Service:").expect("service pattern is valid")
});
static SUB_SERVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s*(Sub-)+Service:").expect("sub-service pattern is valid")
});
static REQUIREMENTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s*Requirements:").expect("requirements pattern is valid")
});
static PROCESSING_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s*Processing Time:").expect("processing time pattern is valid")
});
static FEE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-\s*Fee:").expect("fee pattern is valid"));

/// One parsed service entry, flattened for embedding and storage.
///
/// `service_name` carries the full hierarchy path joined with
/// [`HIERARCHY_SEPARATOR`]. A record is only emitted when at least one of
/// `requirements`, `processing_time`, or `fee` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub service_name: String,
    pub institution_name: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub processing_time: String,
    #[serde(default)]
    pub fee: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<String>,
}

impl ServiceRecord {
    fn new(service_name: String, institution_name: String) -> Self {
        Self {
            service_name,
            institution_name,
            requirements: String::new(),
            processing_time: String::new(),
            fee: String::new(),
            other: Vec::new(),
        }
    }

    /// Whether the record carries at least one core attribute and may be
    /// emitted.
    #[inline]
    pub fn has_core_attribute(&self) -> bool {
        !self.requirements.is_empty() || !self.processing_time.is_empty() || !self.fee.is_empty()
    }

    /// Render the record as the flat text chunk stored in the vector index.
    ///
    /// The service name leads, followed by each attribute as `key: value`.
    /// Empty core attributes are kept so the downstream model sees an explicit
    /// blank; `other` is included only when non-empty.
    #[inline]
    pub fn to_chunk_text(&self) -> String {
        let mut parts = vec![
            format!("service_name: {}.", self.service_name),
            format!("institution_name: {}", self.institution_name),
            format!("requirements: {}", self.requirements),
            format!("processing_time: {}", self.processing_time),
            format!("fee: {}", self.fee),
        ];
        if !self.other.is_empty() {
            parts.push(format!("other: {}", self.other.join("; ")));
        }
        parts.join(". ").trim().to_string()
    }
}

/// Which of the three core attributes an attribute line sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeKind {
    Requirements,
    ProcessingTime,
    Fee,
}

/// Classification of a single trimmed input line, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineKind {
    Institution(String),
    Service(String),
    SubService { name: String, depth: usize },
    Attribute(AttributeKind, String),
    Annotation(String),
    Blank,
}

/// Accumulation state for the single in-progress record slot.
///
/// Header lines (institution/service/sub-service) always transition back to
/// `Idle`, discarding whatever was accumulating; finalization into the output
/// happens separately, by lookahead at the line before the header.
#[derive(Debug)]
enum ScanState {
    Idle,
    Accumulating(ServiceRecord),
}

impl ScanState {
    /// Drop the in-progress record without emitting it.
    fn discard(&mut self) {
        *self = ScanState::Idle;
    }

    /// Finalize the in-progress record: emit it if it carries a core
    /// attribute, silently drop it otherwise.
    fn finalize_into(&mut self, records: &mut Vec<ServiceRecord>) {
        if let ScanState::Accumulating(record) = std::mem::replace(self, ScanState::Idle) {
            if record.has_core_attribute() {
                records.push(record);
            }
        }
    }
}

/// Stateful line-by-line parser for the services document grammar.
#[derive(Debug, Clone, Default)]
pub struct HierarchicalServiceParser {}

impl HierarchicalServiceParser {
    #[inline]
    pub fn new() -> Self {
        Self {}
    }

    /// Parse a full document into an ordered sequence of service records.
    ///
    /// Scan state (current institution, hierarchy stack, in-progress record)
    /// lives only for the duration of this call.
    #[inline]
    pub fn parse(&self, content: &str) -> Vec<ServiceRecord> {
        let lines: Vec<&str> = content.lines().map(str::trim).collect();

        let mut records = Vec::new();
        let mut institution: Option<String> = None;
        let mut hierarchy: Vec<String> = Vec::new();
        let mut state = ScanState::Idle;

        for (i, line) in lines.iter().enumerate() {
            match classify_line(line) {
                LineKind::Institution(name) => {
                    institution = Some(name);
                    hierarchy.clear();
                    state.discard();
                }
                LineKind::Service(name) => {
                    hierarchy = vec![name];
                    state.discard();
                }
                LineKind::SubService { name, depth } => {
                    // Keep the first `depth` ancestors (pad-safe when the
                    // stack is shorter) and append the new name below them.
                    hierarchy.truncate(depth);
                    hierarchy.push(name);
                    state.discard();
                }
                LineKind::Attribute(kind, value) => {
                    // Attribute lines outside any institution or service
                    // scope are dropped without a warning.
                    if let (Some(inst), false) = (institution.as_ref(), hierarchy.is_empty()) {
                        if matches!(state, ScanState::Idle) {
                            let full_name = hierarchy.join(HIERARCHY_SEPARATOR);
                            state = ScanState::Accumulating(ServiceRecord::new(
                                full_name,
                                inst.clone(),
                            ));
                        }
                        if let ScanState::Accumulating(record) = &mut state {
                            match kind {
                                AttributeKind::Requirements => record.requirements = value,
                                AttributeKind::ProcessingTime => record.processing_time = value,
                                AttributeKind::Fee => record.fee = value,
                            }
                        }
                    }
                }
                LineKind::Annotation(text) => {
                    if let ScanState::Accumulating(record) = &mut state {
                        record.other.push(text);
                    }
                }
                LineKind::Blank => {}
            }

            // Finalize by lookahead: the slot is flushed when the next line
            // starts a new institution/service scope, or at end of input.
            // The discard above and this flush are independent per-line
            // checks and must stay in this order: a header line has already
            // emptied the slot by the time its own lookahead check runs.
            let at_end = i + 1 == lines.len();
            if at_end || is_header_line(lines[i + 1]) {
                state.finalize_into(&mut records);
            }
        }

        debug!("Parsed {} service records from {} lines", records.len(), lines.len());
        records
    }
}

/// Match `line` against `re` and return the trailing text after the matched
/// prefix, or `None` if the pattern does not match.
fn strip_pattern(re: &Regex, line: &str) -> Option<String> {
    re.find(line)
        .ok()
        .flatten()
        .map(|m| line[m.end()..].trim().to_string())
}

fn classify_line(line: &str) -> LineKind {
    if line.is_empty() {
        return LineKind::Blank;
    }
    if let Some(name) = strip_pattern(&INSTITUTION_RE, line) {
        return LineKind::Institution(name);
    }
    if let Some(name) = strip_pattern(&SERVICE_RE, line) {
        return LineKind::Service(name);
    }
    if let Ok(Some(m)) = SUB_SERVICE_RE.find(line) {
        let depth = line[..m.end()].matches("Sub-").count();
        let name = line[m.end()..].trim().to_string();
        return LineKind::SubService { name, depth };
    }
    if let Some(value) = strip_pattern(&REQUIREMENTS_RE, line) {
        return LineKind::Attribute(AttributeKind::Requirements, value);
    }
    if let Some(value) = strip_pattern(&PROCESSING_TIME_RE, line) {
        return LineKind::Attribute(AttributeKind::ProcessingTime, value);
    }
    if let Some(value) = strip_pattern(&FEE_RE, line) {
        return LineKind::Attribute(AttributeKind::Fee, value);
    }
    LineKind::Annotation(line.to_string())
}

/// Whether the line opens a new institution or service scope (the lines that
/// trigger lookahead finalization of the in-progress record).
fn is_header_line(line: &str) -> bool {
    let matched = |re: &Regex| re.is_match(line).unwrap_or(false);
    matched(&INSTITUTION_RE) || matched(&SERVICE_RE) || matched(&SUB_SERVICE_RE)
}
