use super::RenderError;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Ordered key/value pairs substituted into `{{Key}}` tokens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placeholders {
    entries: Vec<(String, String)>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value stored under exactly `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Exact-case key first, then the first key that matches ignoring case.
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            })
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Placeholders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut placeholders = Self::new();
        for (key, value) in iter {
            placeholders.insert(key, value);
        }
        placeholders
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateWarning {
    Unmatched { token: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub text: String,
    pub warnings: Vec<TemplateWarning>,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub warnings: Vec<TemplateWarning>,
}

/// Replaces every `{{Key}}` token in one pass. Substituted values are never
/// rescanned. Unknown tokens are left verbatim and reported.
pub fn render_text(text: &str, placeholders: &Placeholders) -> Rendered {
    let mut output = String::with_capacity(text.len());
    let mut warnings = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };

        output.push_str(&rest[..start]);
        let token = &rest[start..start + OPEN.len() + end + CLOSE.len()];
        let key = after_open[..end].trim();

        match placeholders.resolve(key) {
            Some(value) => output.push_str(value),
            None => {
                output.push_str(token);
                warnings.push(TemplateWarning::Unmatched {
                    token: token.to_string(),
                });
            }
        }

        rest = &after_open[end + CLOSE.len()..];
    }

    output.push_str(rest);
    Rendered {
        text: output,
        warnings,
    }
}

/// Renders a `.docx` held in memory. Body, header and footer parts are
/// rewritten; every other archive entry is copied unchanged.
pub fn render_docx(
    template: &[u8],
    placeholders: &Placeholders,
) -> Result<RenderedDocument, RenderError> {
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut warnings = Vec::new();
    let mut saw_document = false;

    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx)?;
        let name = entry.name().to_string();

        if is_story_part(&name) {
            saw_document |= name == "word/document.xml";
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            let (rendered, mut part_warnings) = render_part(&xml, placeholders)?;
            warnings.append(&mut part_warnings);
            writer.start_file(name, options)?;
            writer.write_all(&rendered)?;
        } else {
            writer.raw_copy_file(entry)?;
        }
    }

    if !saw_document {
        return Err(RenderError::MissingDocumentPart);
    }

    let bytes = writer.finish()?.into_inner();
    Ok(RenderedDocument { bytes, warnings })
}

pub fn render_template<P: AsRef<Path>>(
    path: P,
    placeholders: &Placeholders,
) -> Result<RenderedDocument, RenderError> {
    let template = std::fs::read(path)?;
    render_docx(&template, placeholders)
}

fn is_story_part(name: &str) -> bool {
    name == "word/document.xml"
        || (name.starts_with("word/header") && name.ends_with(".xml"))
        || (name.starts_with("word/footer") && name.ends_with(".xml"))
}

/// Text run inside a paragraph: the `<w:t>` start event and its text event.
struct RunText {
    start: usize,
    text: usize,
}

fn render_part(
    xml: &str,
    placeholders: &Placeholders,
) -> Result<(Vec<u8>, Vec<TemplateWarning>), RenderError> {
    let mut reader = Reader::from_str(xml);
    let mut events: Vec<Event<'static>> = Vec::new();
    let mut paragraphs: Vec<Vec<RunText>> = Vec::new();
    let mut open_text: Option<usize> = None;
    let mut warnings = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|err| RenderError::Xml(err.to_string()))?
            .into_owned();

        match &event {
            Event::Eof => break,
            Event::Start(start) if start.local_name().as_ref() == b"p" => {
                paragraphs.push(Vec::new());
            }
            Event::Start(start) if start.local_name().as_ref() == b"t" => {
                open_text = Some(events.len());
            }
            Event::End(end) if end.local_name().as_ref() == b"t" => {
                open_text = None;
            }
            Event::Text(_) => {
                if let (Some(start), Some(runs)) = (open_text, paragraphs.last_mut()) {
                    runs.push(RunText {
                        start,
                        text: events.len(),
                    });
                }
            }
            Event::End(end) if end.local_name().as_ref() == b"p" => {
                if let Some(runs) = paragraphs.pop() {
                    rewrite_paragraph(&mut events, &runs, placeholders, &mut warnings)?;
                }
            }
            _ => {}
        }

        events.push(event);
    }

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    for event in events {
        writer
            .write_event(event)
            .map_err(|err| RenderError::Xml(err.to_string()))?;
    }

    Ok((writer.into_inner().into_inner(), warnings))
}

fn rewrite_paragraph(
    events: &mut [Event<'static>],
    runs: &[RunText],
    placeholders: &Placeholders,
    warnings: &mut Vec<TemplateWarning>,
) -> Result<(), RenderError> {
    let mut flattened = String::new();
    for run in runs {
        if let Event::Text(text) = &events[run.text] {
            let unescaped = text
                .unescape()
                .map_err(|err| RenderError::Xml(err.to_string()))?;
            flattened.push_str(&unescaped);
        }
    }

    if !flattened.contains(OPEN) {
        return Ok(());
    }

    let rendered = render_text(&flattened, placeholders);
    warnings.extend(rendered.warnings);
    if rendered.text == flattened {
        return Ok(());
    }

    for (position, run) in runs.iter().enumerate() {
        let content = if position == 0 { rendered.text.as_str() } else { "" };
        events[run.text] = Event::Text(BytesText::new(content).into_owned());
    }

    if let Some(first) = runs.first() {
        if let Event::Start(start) = &events[first.start] {
            events[first.start] = Event::Start(preserve_space(start));
        }
    }

    Ok(())
}

fn preserve_space(start: &BytesStart<'static>) -> BytesStart<'static> {
    let mut start = start.clone();
    let has_space = start
        .attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"xml:space");
    if !has_space {
        start.push_attribute(("xml:space", "preserve"));
    }
    start
}
