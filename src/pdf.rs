//! PDF container adapter backed by lopdf.
//!
//! Implements the page access contract over real PDF pages: spans are read by
//! walking each page's decoded content stream (`BT`/`ET` text objects with
//! `Tf`, `Td`/`TD`/`Tm`/`T*`, color and show operators), and rewriting blanks
//! the original show operator in place, paints an opaque cover over its
//! bounding box, and appends the replacement text with an on-demand base-14
//! font resource.
//!
//! Text space is assumed untransformed (no `cm` tracking); rotated or skewed
//! text matrices are skipped and left untouched. String bytes are decoded as
//! Latin-1, which round-trips WinAnsi-encoded Western text.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lopdf::content::Operation;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use crate::anonymizer::AnonymizeSession;
use crate::deanonymizer::Deanonymizer;
use crate::error::{Result, ValidationError};
use crate::fonts;
use crate::mapping::Mapping;
use crate::metrics;
use crate::page::{Color, PageAccess, ReplacementRun, SpanPath, StyleFlags, TextSpan};
use crate::rewrite::{PageRewriter, RewriteReport};

/// Anything smaller cannot be a real PDF.
pub const MIN_PDF_BYTES: usize = 100;

/// Validate raw bytes and load the document.
pub fn open_pdf(bytes: &[u8]) -> Result<Document> {
    if bytes.is_empty() {
        return Err(ValidationError::Empty.into());
    }
    if bytes.len() < MIN_PDF_BYTES {
        return Err(ValidationError::TooSmall {
            size: bytes.len(),
            min: MIN_PDF_BYTES,
        }
        .into());
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(ValidationError::BadSignature { expected: "%PDF-" }.into());
    }
    let doc = Document::load_mem(bytes)?;
    validate_document(&doc)?;
    Ok(doc)
}

pub fn open_pdf_file(path: &Path) -> Result<Document> {
    let bytes = std::fs::read(path)?;
    open_pdf(&bytes)
}

/// Structural checks that run before any matching work.
pub fn validate_document(doc: &Document) -> Result<()> {
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(ValidationError::Encrypted.into());
    }
    if doc.get_pages().is_empty() {
        return Err(ValidationError::NoPages.into());
    }
    Ok(())
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

fn to_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(n) => Some(*n as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn resolve_obj<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

// ─── Page font table ─────────────────────────────────────────────────────────

/// Resource name -> (BaseFont name without subset prefix, style flags).
fn page_font_table(doc: &Document, page_id: ObjectId) -> HashMap<String, (String, StyleFlags)> {
    let mut table = HashMap::new();
    let Some(resources) = find_resources(doc, page_id) else {
        return table;
    };
    let Ok(fonts_obj) = resources.get(b"Font") else {
        return table;
    };
    let Object::Dictionary(fonts_dict) = resolve_obj(doc, fonts_obj) else {
        return table;
    };
    for (res_name, value) in fonts_dict.iter() {
        let Object::Dictionary(font_dict) = resolve_obj(doc, value) else {
            continue;
        };
        let base = match font_dict.get(b"BaseFont") {
            Ok(Object::Name(n)) => strip_subset_prefix(&decode_latin1(n)),
            _ => continue,
        };
        let mut flags = fonts::style_from_name(&base);
        // Descriptor italic flag (bit 7) catches obliques with neutral names.
        if let Ok(desc_obj) = font_dict.get(b"FontDescriptor") {
            if let Object::Dictionary(desc) = resolve_obj(doc, desc_obj) {
                if let Ok(Object::Integer(bits)) = desc.get(b"Flags") {
                    flags.italic = flags.italic || (bits & 0x40) != 0;
                }
            }
        }
        table.insert(decode_latin1(res_name), (base, flags));
    }
    table
}

/// "ABCDEF+Calibri-Bold" -> "Calibri-Bold".
fn strip_subset_prefix(name: &str) -> String {
    let bytes = name.as_bytes();
    if bytes.len() > 7
        && bytes[6] == b'+'
        && bytes[..6].iter().all(|b| b.is_ascii_uppercase())
    {
        name[7..].to_string()
    } else {
        name.to_string()
    }
}

/// Page's own or inherited Resources dictionary, read-only.
fn find_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = page_id;
    for _ in 0..32 {
        let Ok(Object::Dictionary(dict)) = doc.get_object(current) else {
            return None;
        };
        if let Ok(res) = dict.get(b"Resources") {
            if let Object::Dictionary(res) = resolve_obj(doc, res) {
                return Some(res);
            }
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

// ─── Span extraction ─────────────────────────────────────────────────────────

struct SpanRecord {
    span: TextSpan,
    op_idx: usize,
}

/// Walk one page's content operations and index every show operator.
fn extract_records(doc: &Document, page_id: ObjectId, page_index: usize) -> Result<Vec<SpanRecord>> {
    let content = doc.get_and_decode_page_content(page_id)?;
    let font_table = page_font_table(doc, page_id);

    let mut records = Vec::new();

    let mut font_res: Option<String> = None;
    let mut size = 0.0f32;
    let mut leading = 0.0f32;
    let mut line_x = 0.0f32;
    let mut line_y = 0.0f32;
    let mut cur_x = 0.0f32;
    let mut sx = 1.0f32;
    let mut sy = 1.0f32;
    let mut skew = false;
    let mut color = Color::BLACK;
    let mut color_stack: Vec<Color> = Vec::new();

    let mut block = 0usize;
    let mut line = 0usize;
    let mut run = 0usize;
    let mut in_text = false;

    for (op_idx, op) in content.operations.iter().enumerate() {
        let ops = &op.operands;
        match op.operator.as_ref() {
            "BT" => {
                in_text = true;
                line_x = 0.0;
                line_y = 0.0;
                cur_x = 0.0;
                sx = 1.0;
                sy = 1.0;
                skew = false;
                block += 1;
                line = 0;
                run = 0;
            }
            "ET" => in_text = false,
            "Tf" => {
                if let Some(Object::Name(name)) = ops.first() {
                    font_res = Some(decode_latin1(name));
                }
                size = ops.get(1).and_then(to_f32).unwrap_or(size);
            }
            "TL" => leading = ops.first().and_then(to_f32).unwrap_or(leading),
            "Td" | "TD" => {
                let tx = ops.first().and_then(to_f32).unwrap_or(0.0);
                let ty = ops.get(1).and_then(to_f32).unwrap_or(0.0);
                if op.operator == "TD" {
                    leading = -ty;
                }
                line_x += tx * sx;
                line_y += ty * sy;
                cur_x = line_x;
                line += 1;
                run = 0;
            }
            "Tm" => {
                let m: Vec<f32> = ops.iter().filter_map(to_f32).collect();
                if m.len() == 6 {
                    skew = m[1] != 0.0 || m[2] != 0.0;
                    sx = m[0];
                    sy = m[3];
                    line_x = m[4];
                    line_y = m[5];
                    cur_x = line_x;
                    line += 1;
                    run = 0;
                }
            }
            "T*" => {
                line_y -= leading * sy;
                cur_x = line_x;
                line += 1;
                run = 0;
            }
            "Tj" | "'" | "\"" if in_text => {
                if op.operator != "Tj" {
                    line_y -= leading * sy;
                    cur_x = line_x;
                    line += 1;
                    run = 0;
                }
                let string = ops.iter().rev().find_map(|o| match o {
                    Object::String(bytes, _) => Some(bytes),
                    _ => None,
                });
                if let Some(bytes) = string {
                    show_text(
                        &mut records,
                        &font_table,
                        ShowContext {
                            text: decode_latin1(bytes),
                            op_idx,
                            page_index,
                            font_res: font_res.as_deref(),
                            size,
                            sx,
                            sy,
                            skew,
                            color,
                            line_y,
                            cur_x: &mut cur_x,
                            path: SpanPath { block: block - 1, line, run },
                        },
                    );
                    run += 1;
                }
            }
            "TJ" if in_text => {
                if let Some(Object::Array(items)) = ops.first() {
                    let mut text = String::new();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => text.push_str(&decode_latin1(bytes)),
                            Object::Integer(n) if *n < -100 => text.push(' '),
                            Object::Real(r) if *r < -100.0 => text.push(' '),
                            _ => {}
                        }
                    }
                    show_text(
                        &mut records,
                        &font_table,
                        ShowContext {
                            text,
                            op_idx,
                            page_index,
                            font_res: font_res.as_deref(),
                            size,
                            sx,
                            sy,
                            skew,
                            color,
                            line_y,
                            cur_x: &mut cur_x,
                            path: SpanPath { block: block - 1, line, run },
                        },
                    );
                    run += 1;
                }
            }
            "rg" => {
                let c: Vec<f32> = ops.iter().filter_map(to_f32).collect();
                if c.len() == 3 {
                    color = Color::from_rgb(c[0], c[1], c[2]);
                }
            }
            "g" => {
                if let Some(v) = ops.first().and_then(to_f32) {
                    color = Color::from_rgb(v, v, v);
                }
            }
            "k" => {
                let c: Vec<f32> = ops.iter().filter_map(to_f32).collect();
                if c.len() == 4 {
                    let rgb = |x: f32| (1.0 - x) * (1.0 - c[3]);
                    color = Color::from_rgb(rgb(c[0]), rgb(c[1]), rgb(c[2]));
                }
            }
            "q" => color_stack.push(color),
            "Q" => color = color_stack.pop().unwrap_or(Color::BLACK),
            _ => {}
        }
    }

    Ok(records)
}

struct ShowContext<'a> {
    text: String,
    op_idx: usize,
    page_index: usize,
    font_res: Option<&'a str>,
    size: f32,
    sx: f32,
    sy: f32,
    skew: bool,
    color: Color,
    line_y: f32,
    cur_x: &'a mut f32,
    path: SpanPath,
}

fn show_text(
    records: &mut Vec<SpanRecord>,
    font_table: &HashMap<String, (String, StyleFlags)>,
    ctx: ShowContext,
) {
    let Some(res_name) = ctx.font_res else {
        log::debug!("span-locate: show operator before any Tf, skipping");
        return;
    };
    if ctx.skew {
        log::debug!(
            "span-locate: page {} op {}: rotated/skewed text matrix, skipping",
            ctx.page_index,
            ctx.op_idx
        );
        return;
    }

    let (base_name, flags) = font_table
        .get(res_name)
        .cloned()
        .unwrap_or_else(|| (res_name.to_string(), StyleFlags::default()));

    // Approximate the advance with the nearest base-14 metrics; exact for
    // text this adapter wrote itself.
    let measure_font = fonts::resolve(&base_name, flags);
    let width = metrics::text_width(&measure_font, &ctx.text, ctx.size) * ctx.sx;
    let eff_size = ctx.size * ctx.sy;

    let x0 = *ctx.cur_x;
    *ctx.cur_x += width;

    if ctx.text.trim().is_empty() || ctx.size <= 0.0 {
        return;
    }

    let span = TextSpan {
        text: ctx.text,
        font_name: base_name,
        flags,
        color: ctx.color,
        size: eff_size,
        bbox: crate::page::Rect {
            x0,
            y0: ctx.line_y + metrics::descent(&measure_font) * eff_size / 1000.0,
            x1: x0 + width,
            y1: ctx.line_y + metrics::ascent(&measure_font) * eff_size / 1000.0,
        },
        page_index: ctx.page_index,
        path: ctx.path,
    };
    records.push(SpanRecord {
        span,
        op_idx: ctx.op_idx,
    });
}

// ─── Page access implementation ──────────────────────────────────────────────

/// One PDF page, mutated in place. Blanking and painting are staged and
/// committed by [`PdfPage::flush`].
pub struct PdfPage<'a> {
    doc: &'a mut Document,
    page_id: ObjectId,
    page_index: usize,
    span_ops: HashMap<SpanPath, usize>,
    blank_ops: HashSet<usize>,
    pending: Vec<Operation>,
}

impl<'a> PdfPage<'a> {
    pub fn new(doc: &'a mut Document, page_id: ObjectId, page_index: usize) -> Self {
        Self {
            doc,
            page_id,
            page_index,
            span_ops: HashMap::new(),
            blank_ops: HashSet::new(),
            pending: Vec::new(),
        }
    }

    /// Commit staged blanking and painting to the page's content stream.
    pub fn flush(&mut self) -> Result<()> {
        if self.blank_ops.is_empty() && self.pending.is_empty() {
            return Ok(());
        }
        let mut content = self.doc.get_and_decode_page_content(self.page_id)?;
        for &op_idx in &self.blank_ops {
            if let Some(op) = content.operations.get_mut(op_idx) {
                blank_show_op(op);
            }
        }
        if !self.pending.is_empty() {
            content.operations.push(Operation::new("q", vec![]));
            content.operations.append(&mut self.pending);
            content.operations.push(Operation::new("Q", vec![]));
        }
        let encoded = content.encode()?;
        self.doc.change_page_content(self.page_id, encoded)?;
        self.blank_ops.clear();
        Ok(())
    }
}

/// Remove the text from a show operator while keeping it syntactically valid.
fn blank_show_op(op: &mut Operation) {
    match op.operator.as_ref() {
        "Tj" | "'" | "\"" => {
            for operand in op.operands.iter_mut() {
                if let Object::String(bytes, _) = operand {
                    bytes.clear();
                }
            }
        }
        "TJ" => {
            if let Some(Object::Array(items)) = op.operands.first_mut() {
                for item in items.iter_mut() {
                    if let Object::String(bytes, _) = item {
                        bytes.clear();
                    }
                }
            }
        }
        _ => {}
    }
}

impl PageAccess for PdfPage<'_> {
    fn spans(&mut self) -> Result<Vec<TextSpan>> {
        let records = extract_records(self.doc, self.page_id, self.page_index)?;
        self.span_ops = records
            .iter()
            .map(|r| (r.span.path, r.op_idx))
            .collect();
        Ok(records.into_iter().map(|r| r.span).collect())
    }

    fn erase(&mut self, span: &TextSpan) -> Result<()> {
        if let Some(&op_idx) = self.span_ops.get(&span.path) {
            self.blank_ops.insert(op_idx);
        }
        let b = span.bbox;
        self.pending.extend([
            Operation::new(
                "rg",
                vec![Object::Real(1.0), Object::Real(1.0), Object::Real(1.0)],
            ),
            Operation::new(
                "re",
                vec![
                    Object::Real(b.x0),
                    Object::Real(b.y0),
                    Object::Real(b.width()),
                    Object::Real(b.height()),
                ],
            ),
            Operation::new("f", vec![]),
        ]);
        Ok(())
    }

    fn draw(&mut self, run: &ReplacementRun) -> Result<()> {
        let res_name = ensure_base14_font(self.doc, self.page_id, run.font.ps_name())?;
        let (r, g, b) = run.color.to_rgb();
        self.pending.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(res_name.into_bytes()),
                    Object::Real(run.size),
                ],
            ),
            Operation::new(
                "rg",
                vec![Object::Real(r), Object::Real(g), Object::Real(b)],
            ),
            Operation::new(
                "Td",
                vec![Object::Real(run.origin.0), Object::Real(run.origin.1)],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(
                    encode_latin1(&run.text),
                    lopdf::StringFormat::Literal,
                )],
            ),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }
}

// ─── Font resource registration ──────────────────────────────────────────────

/// Find or register a base-14 font in the page's resources and return its
/// resource name.
fn ensure_base14_font(doc: &mut Document, page_id: ObjectId, ps_name: &str) -> Result<String> {
    // Reuse an existing resource for the same base font.
    let mut existing_names: Vec<String> = Vec::new();
    if let Some(resources) = find_resources(doc, page_id) {
        if let Ok(fonts_obj) = resources.get(b"Font") {
            if let Object::Dictionary(fonts_dict) = resolve_obj(doc, fonts_obj) {
                for (res_name, value) in fonts_dict.iter() {
                    let name = decode_latin1(res_name);
                    if let Object::Dictionary(font_dict) = resolve_obj(doc, value) {
                        if let Ok(Object::Name(base)) = font_dict.get(b"BaseFont") {
                            if decode_latin1(base) == ps_name {
                                return Ok(name);
                            }
                        }
                    }
                    existing_names.push(name);
                }
            }
        }
    }

    let mut n = 1;
    let res_name = loop {
        let candidate = format!("FA{n}");
        if !existing_names.contains(&candidate) {
            break candidate;
        }
        n += 1;
    };

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => ps_name,
        "Encoding" => "WinAnsiEncoding",
    });
    insert_font_resource(doc, page_id, &res_name, font_id)?;
    log::debug!("rewrite: registered {ps_name} as /{res_name}");
    Ok(res_name)
}

/// Insert a font reference into the page's Resources/Font dictionary,
/// materializing either dictionary on the page if absent. Inherited resources
/// are copied down first so existing references keep working.
fn insert_font_resource(
    doc: &mut Document,
    page_id: ObjectId,
    res_name: &str,
    font_id: ObjectId,
) -> Result<()> {
    // Materialize Resources on the page itself when it only inherits them.
    let has_own = matches!(
        doc.get_object(page_id)?.as_dict()?.get(b"Resources"),
        Ok(_)
    );
    if !has_own {
        let inherited = find_resources(doc, page_id).cloned().unwrap_or_default();
        doc.get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Resources", Object::Dictionary(inherited));
    }

    // Resolve where the Resources dictionary actually lives.
    let res_ref = match doc.get_object(page_id)?.as_dict()?.get(b"Resources") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };

    // Same question for the Font dictionary inside it.
    let font_ref = match res_ref {
        Some(id) => match doc.get_object(id)?.as_dict()?.get(b"Font") {
            Ok(Object::Reference(f)) => Some(*f),
            _ => None,
        },
        None => match doc.get_object(page_id)?.as_dict()?.get(b"Resources") {
            Ok(Object::Dictionary(d)) => match d.get(b"Font") {
                Ok(Object::Reference(f)) => Some(*f),
                _ => None,
            },
            _ => None,
        },
    };

    let entry = Object::Reference(font_id);
    if let Some(font_dict_id) = font_ref {
        doc.get_object_mut(font_dict_id)?
            .as_dict_mut()?
            .set(res_name, entry);
        return Ok(());
    }

    let resources_mut: &mut Dictionary = match res_ref {
        Some(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        None => doc
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .get_mut(b"Resources")?
            .as_dict_mut()?,
    };
    match resources_mut.get_mut(b"Font") {
        Ok(Object::Dictionary(fonts_dict)) => {
            fonts_dict.set(res_name, entry);
        }
        _ => {
            let mut fonts_dict = Dictionary::new();
            fonts_dict.set(res_name, entry);
            resources_mut.set("Font", Object::Dictionary(fonts_dict));
        }
    }
    Ok(())
}

// ─── Whole-document drives ───────────────────────────────────────────────────

/// Anonymize every page in place and report what was rewritten.
pub fn anonymize_pdf(
    doc: &mut Document,
    session: &mut AnonymizeSession,
    rewriter: &PageRewriter,
) -> Result<RewriteReport> {
    validate_document(doc)?;
    let pages: Vec<ObjectId> = doc.page_iter().collect();
    let mut report = RewriteReport::default();
    for (i, page_id) in pages.iter().enumerate() {
        let mut page = PdfPage::new(doc, *page_id, i);
        rewriter.rewrite_page(
            &mut page,
            &mut |text| {
                let out = session.apply(text);
                (out != text).then_some(out)
            },
            &mut report,
        )?;
        page.flush()?;
    }
    Ok(report)
}

/// Restore every page in place from a mapping.
pub fn deanonymize_pdf(
    doc: &mut Document,
    mapping: &Mapping,
    rewriter: &PageRewriter,
) -> Result<RewriteReport> {
    validate_document(doc)?;
    let deanon = Deanonymizer::new(mapping);
    let pages: Vec<ObjectId> = doc.page_iter().collect();
    let mut report = RewriteReport::default();
    for (i, page_id) in pages.iter().enumerate() {
        let mut page = PdfPage::new(doc, *page_id, i);
        let transform = deanon.span_transform();
        rewriter.rewrite_page(&mut page, &mut |text| transform(text), &mut report)?;
        page.flush()?;
    }
    Ok(report)
}

/// All span texts of a page, in reading order. Diagnostics and tests.
pub fn page_text(doc: &Document, page_id: ObjectId, page_index: usize) -> Result<Vec<String>> {
    let records = extract_records(doc, page_id, page_index)?;
    Ok(records.into_iter().map(|r| r.span.text).collect())
}
