//! DOCX container adapter.
//!
//! A DOCX is a zip archive; only `word/document.xml` is rewritten, every
//! other entry is carried through byte-for-byte. Each `<w:p>` paragraph —
//! body text and table cells alike — is one text block: its `<w:t>` runs are
//! concatenated into a virtual string, the engine plans its edits against
//! that string, and the result is redistributed across the original `<w:t>`
//! elements. A replacement lands in the run holding the first matched
//! character; the rest of the match is removed from the runs it covered, so
//! run formatting survives untouched.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::anonymizer::{AnonymizeSession, TextEdit};
use crate::deanonymizer::Deanonymizer;
use crate::error::{Result, ValidationError};
use crate::mapping::Mapping;

/// Anything smaller cannot be a real DOCX archive.
pub const MIN_DOCX_BYTES: usize = 256;

lazy_static! {
    static ref WT_RE: Regex =
        Regex::new(r"<w:t(?: [^>]*)?>([^<]*)</w:t>").expect("invalid regex");
    static ref P_START_RE: Regex = Regex::new(r"<w:p[ >]").expect("invalid regex");
    static ref P_END_RE: Regex = Regex::new(r"</w:p>").expect("invalid regex");
}

/// An opened DOCX: ordered zip entries, rewritten in place.
pub struct DocxFile {
    entries: Vec<(String, Vec<u8>)>,
}

const DOCUMENT_XML: &str = "word/document.xml";

impl DocxFile {
    /// Validate raw bytes and read the archive.
    pub fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(ValidationError::Empty.into());
        }
        if bytes.len() < MIN_DOCX_BYTES {
            return Err(ValidationError::TooSmall {
                size: bytes.len(),
                min: MIN_DOCX_BYTES,
            }
            .into());
        }
        if !bytes.starts_with(b"PK") {
            return Err(ValidationError::BadSignature { expected: "PK" }.into());
        }
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            entries.push((name, data));
        }
        if !entries.iter().any(|(name, _)| name == DOCUMENT_XML) {
            return Err(ValidationError::BadSignature {
                expected: "word/document.xml",
            }
            .into());
        }
        Ok(Self { entries })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::read(&bytes)
    }

    /// Write the archive back out: media stored, everything else deflated,
    /// matching the layout word processors expect.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        let stored = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, data) in &self.entries {
            let opts = if name.starts_with("word/media/") {
                stored
            } else {
                deflated
            };
            zip.start_file(name.as_str(), opts)?;
            zip.write_all(data)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    fn document_xml(&self) -> String {
        self.entries
            .iter()
            .find(|(name, _)| name == DOCUMENT_XML)
            .map(|(_, data)| String::from_utf8_lossy(data).into_owned())
            .unwrap_or_default()
    }

    fn set_document_xml(&mut self, xml: String) {
        if let Some((_, data)) = self
            .entries
            .iter_mut()
            .find(|(name, _)| name == DOCUMENT_XML)
        {
            *data = xml.into_bytes();
        }
    }

    /// Virtual text of every paragraph, in document order.
    pub fn paragraph_texts(&self) -> Vec<String> {
        let xml = self.document_xml();
        find_paragraphs(&xml)
            .into_iter()
            .map(|(start, end)| virtual_text(&xml[start..end]).0)
            .collect()
    }

    /// Run the edit planner over every paragraph and redistribute the edited
    /// text across the original `<w:t>` runs. Returns the number of edits.
    pub fn transform_paragraphs(
        &mut self,
        plan: &mut dyn FnMut(&str) -> Vec<TextEdit>,
    ) -> Result<usize> {
        let xml = self.document_xml();
        let paragraphs = find_paragraphs(&xml);
        if paragraphs.is_empty() {
            return Err(ValidationError::NoParagraphs.into());
        }

        let mut result = xml.clone();
        let mut total = 0usize;

        // Reverse order so earlier byte offsets stay valid while we splice.
        for (p_start, p_end) in paragraphs.into_iter().rev() {
            let para_xml = &xml[p_start..p_end];
            let wt_matches: Vec<(usize, usize, String)> = WT_RE
                .captures_iter(para_xml)
                .map(|caps| {
                    let text = caps.get(1).expect("no group 1");
                    (text.start(), text.end(), text.as_str().to_string())
                })
                .collect();
            if wt_matches.is_empty() {
                continue;
            }

            let (text, char_map) = virtual_text_from_matches(&wt_matches);
            if text.is_empty() {
                continue;
            }
            let edits = plan(&text);
            if edits.is_empty() {
                continue;
            }
            total += edits.len();

            // One slot per virtual character: kept verbatim, removed, or
            // replaced by the (escaped) replacement text.
            let mut slots: Vec<Option<String>> =
                text.chars().map(|c| Some(c.to_string())).collect();
            for edit in &edits {
                for slot in &mut slots[edit.start..edit.end] {
                    *slot = None;
                }
                if edit.start < slots.len() {
                    slots[edit.start] = Some(escape_xml(&edit.replacement));
                }
            }

            let mut new_texts = vec![String::new(); wt_matches.len()];
            for (i, slot) in slots.iter().enumerate() {
                if let Some(s) = slot {
                    new_texts[char_map[i]].push_str(s);
                }
            }

            let mut new_para = para_xml.to_string();
            for (i, (start, end, _)) in wt_matches.iter().enumerate().rev() {
                new_para.replace_range(*start..*end, &new_texts[i]);
            }
            result.replace_range(p_start..p_end, &new_para);
        }

        self.set_document_xml(result);
        Ok(total)
    }
}

/// All `<w:p>...</w:p>` byte ranges. Self-closing paragraphs carry no text
/// and are not matched.
fn find_paragraphs(xml: &str) -> Vec<(usize, usize)> {
    let starts: Vec<usize> = P_START_RE.find_iter(xml).map(|m| m.start()).collect();
    let ends: Vec<usize> = P_END_RE.find_iter(xml).map(|m| m.end()).collect();

    let mut paragraphs = Vec::new();
    for &ps in &starts {
        if let Some(&pe) = ends.iter().find(|&&pe| pe > ps) {
            paragraphs.push((ps, pe));
        }
    }
    paragraphs
}

/// Concatenated `<w:t>` text of one paragraph plus a char -> run-index map.
fn virtual_text(para_xml: &str) -> (String, Vec<usize>) {
    let wt_matches: Vec<(usize, usize, String)> = WT_RE
        .captures_iter(para_xml)
        .map(|caps| {
            let text = caps.get(1).expect("no group 1");
            (text.start(), text.end(), text.as_str().to_string())
        })
        .collect();
    virtual_text_from_matches(&wt_matches)
}

fn virtual_text_from_matches(wt_matches: &[(usize, usize, String)]) -> (String, Vec<usize>) {
    let mut text = String::new();
    let mut char_map = Vec::new();
    for (wt_idx, (_, _, t)) in wt_matches.iter().enumerate() {
        for ch in t.chars() {
            char_map.push(wt_idx);
            text.push(ch);
        }
    }
    (text, char_map)
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Anonymize every paragraph in place; returns the number of replacements.
pub fn anonymize_docx(docx: &mut DocxFile, session: &mut AnonymizeSession) -> Result<usize> {
    docx.transform_paragraphs(&mut |text| session.plan(text))
}

/// Restore every paragraph in place from a mapping.
pub fn deanonymize_docx(docx: &mut DocxFile, mapping: &Mapping) -> Result<usize> {
    let deanon = Deanonymizer::new(mapping);
    docx.transform_paragraphs(&mut |text| deanon.plan(text))
}
