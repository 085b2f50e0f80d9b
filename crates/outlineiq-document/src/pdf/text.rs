// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text survey: interprets a page's content stream far enough to know what
// text is drawn, where, and at which effective font size.
//
// Only the operators that affect text placement are tracked: the graphics
// state stack (q/Q/cm), the text object and positioning operators, font
// selection, and the four text-showing operators. Form XObjects are entered
// recursively so text drawn inside them is surveyed too.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use outlineiq_core::error::{OutlineError, Result};
use tracing::{debug, trace};

use super::reader::{PdfReader, decode_pdf_string, number, resolve, resolve_key};

/// 2-D affine transform `[a b c d e f]` in PDF row-vector convention.
pub(crate) type Matrix = [f32; 6];

pub(crate) const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Nested Form XObjects deeper than this are ignored.
const MAX_FORM_DEPTH: usize = 8;

/// Average glyph advance in text space units, used in lieu of font metrics to
/// move the pen after each string.
const ESTIMATED_GLYPH_ADVANCE: f32 = 0.5;

/// TJ adjustments at or below this (thousandths of an em) read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// One contiguous run of text drawn with a single font size.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    /// Effective size in user space (Tf size scaled by the text and CTM matrices).
    pub font_size: f32,
    /// 1-based page number.
    pub page: u32,
    /// Baseline origin in user space.
    pub x: f32,
    pub y: f32,
    /// Position in content-stream order, used to break ties.
    pub seq: usize,
}

/// `a × b`.
pub(crate) fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn translation(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

fn matrix_from(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = IDENTITY;
    for (slot, operand) in m.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(m)
}

/// Survey every text span on one page. Whitespace-only strings are dropped.
pub fn survey_page(reader: &PdfReader, page: u32, page_id: ObjectId) -> Result<Vec<TextSpan>> {
    let content = reader.page_content(page_id)?;
    let spans = survey_content(
        reader.document(),
        page,
        &content,
        reader.page_resources(page_id),
    )?;
    debug!(page, spans = spans.len(), "Text survey complete");
    Ok(spans)
}

/// Survey a raw (decompressed) content stream against the given resources.
pub(crate) fn survey_content(
    doc: &Document,
    page: u32,
    content: &[u8],
    resources: Option<&Dictionary>,
) -> Result<Vec<TextSpan>> {
    let mut survey = TextSurvey {
        doc,
        page,
        spans: Vec::new(),
        form_stack: Vec::new(),
    };
    survey.run(content, resources, IDENTITY, 0)?;
    Ok(survey.spans)
}

struct TextSurvey<'a> {
    doc: &'a Document,
    page: u32,
    spans: Vec<TextSpan>,
    /// Forms currently being interpreted, to break reference cycles.
    form_stack: Vec<ObjectId>,
}

/// The part of the graphics state that `q` saves and `Q` restores.
#[derive(Clone, Copy)]
struct SavedState<'r> {
    ctm: Matrix,
    font: Option<&'r Dictionary>,
    font_size: f32,
    leading: f32,
}

/// Graphics and text state for one content stream.
struct TextState<'r> {
    ctm: Matrix,
    saved: Vec<SavedState<'r>>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font: Option<&'r Dictionary>,
    font_size: f32,
    leading: f32,
}

impl<'r> TextState<'r> {
    fn save(&mut self) {
        self.saved.push(SavedState {
            ctm: self.ctm,
            font: self.font,
            font_size: self.font_size,
            leading: self.leading,
        });
    }

    fn restore(&mut self) {
        if let Some(saved) = self.saved.pop() {
            self.ctm = saved.ctm;
            self.font = saved.font;
            self.font_size = saved.font_size;
            self.leading = saved.leading;
        }
    }

    fn next_line(&mut self) {
        self.line_matrix = multiply(&translation(0.0, -self.leading), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn advance(&mut self, glyphs: usize, adjustment: f32) {
        let tx = (glyphs as f32 * ESTIMATED_GLYPH_ADVANCE - adjustment / 1000.0) * self.font_size;
        self.text_matrix = multiply(&translation(tx, 0.0), &self.text_matrix);
    }
}

impl<'a> TextSurvey<'a> {
    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        base_ctm: Matrix,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(content)
            .map_err(|err| OutlineError::TextLayer(format!("content stream: {err}")))?;

        let mut state = TextState {
            ctm: base_ctm,
            saved: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font: None,
            font_size: 0.0,
            leading: 0.0,
        };

        for op in &content.operations {
            self.apply(op, &mut state, resources, depth);
        }
        Ok(())
    }

    fn apply(
        &mut self,
        op: &Operation,
        state: &mut TextState<'a>,
        resources: Option<&'a Dictionary>,
        depth: usize,
    ) {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => state.save(),
            "Q" => state.restore(),
            "cm" => {
                if let Some(m) = matrix_from(operands) {
                    state.ctm = multiply(&m, &state.ctm);
                }
            }
            "BT" => {
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let [name, size, ..] = operands.as_slice() {
                    state.font = name
                        .as_name()
                        .ok()
                        .and_then(|name| self.font(resources, name));
                    state.font_size = number(size).unwrap_or(0.0);
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    state.leading = leading;
                }
            }
            "Td" | "TD" => {
                if let [tx, ty, ..] = operands.as_slice() {
                    let (tx, ty) = (number(tx).unwrap_or(0.0), number(ty).unwrap_or(0.0));
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.line_matrix = multiply(&translation(tx, ty), &state.line_matrix);
                    state.text_matrix = state.line_matrix;
                }
            }
            "Tm" => {
                if let Some(m) = matrix_from(operands) {
                    state.line_matrix = m;
                    state.text_matrix = m;
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(text @ Object::String(..)) = operands.first() {
                    self.show(state, std::slice::from_ref(text));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    self.show(state, items);
                }
            }
            "'" => {
                state.next_line();
                if let Some(text @ Object::String(..)) = operands.first() {
                    self.show(state, std::slice::from_ref(text));
                }
            }
            "\"" => {
                state.next_line();
                if let Some(text @ Object::String(..)) = operands.get(2) {
                    self.show(state, std::slice::from_ref(text));
                }
            }
            "Do" => {
                if let Some(Ok(name)) = operands.first().map(Object::as_name) {
                    self.enter_form(state.ctm, resources, name, depth);
                }
            }
            _ => {}
        }
    }

    /// Decode a sequence of strings and kerning numbers into one span.
    fn show(&mut self, state: &mut TextState<'a>, items: &[Object]) {
        let origin = multiply(&state.text_matrix, &state.ctm);
        let scale = (origin[2] * origin[2] + origin[3] * origin[3]).sqrt();
        let size = state.font_size.abs() * scale;

        let mut text = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let piece = self.decode(state.font, bytes);
                    state.advance(piece.chars().count(), 0.0);
                    text.push_str(&piece);
                }
                other => {
                    if let Some(adjustment) = number(other) {
                        if adjustment <= TJ_SPACE_THRESHOLD && !text.ends_with(' ') {
                            text.push(' ');
                        }
                        state.advance(0, adjustment);
                    }
                }
            }
        }

        if text.trim().is_empty() || size <= 0.0 {
            return;
        }
        trace!(page = self.page, size, text = %text, "span");
        let seq = self.spans.len();
        self.spans.push(TextSpan {
            text,
            font_size: size,
            page: self.page,
            x: origin[4],
            y: origin[5],
            seq,
        });
    }

    fn font(&self, resources: Option<&'a Dictionary>, name: &[u8]) -> Option<&'a Dictionary> {
        let fonts = resolve_key(self.doc, resources?, b"Font")?.as_dict().ok()?;
        resolve_key(self.doc, fonts, name)?.as_dict().ok()
    }

    fn decode(&self, font: Option<&Dictionary>, bytes: &[u8]) -> String {
        if let Some(font) = font {
            if let Ok(encoding) = font.get_font_encoding(self.doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return text;
                }
            }
        }
        decode_pdf_string(bytes)
    }

    fn enter_form(
        &mut self,
        ctm: Matrix,
        resources: Option<&'a Dictionary>,
        name: &[u8],
        depth: usize,
    ) {
        if depth >= MAX_FORM_DEPTH {
            debug!(page = self.page, "Form XObject nesting limit reached");
            return;
        }
        let Some(xobjects) = resources
            .and_then(|res| resolve_key(self.doc, res, b"XObject"))
            .and_then(|obj| obj.as_dict().ok())
        else {
            return;
        };
        let Ok(Object::Reference(form_id)) = xobjects.get(name) else {
            return;
        };
        if self.form_stack.contains(form_id) {
            return;
        }
        let Ok(Object::Stream(stream)) = self.doc.get_object(*form_id) else {
            return;
        };
        if !matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(subtype)) if subtype == b"Form")
        {
            return;
        }

        let content = if stream.dict.get(b"Filter").is_ok() {
            match stream.decompressed_content() {
                Ok(content) => content,
                Err(err) => {
                    debug!(page = self.page, %err, "Form XObject content unreadable");
                    return;
                }
            }
        } else {
            stream.content.clone()
        };

        let form_matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|m| resolve(self.doc, m))
            .and_then(|m| m.as_array().ok())
            .and_then(|m| matrix_from(m))
            .unwrap_or(IDENTITY);
        let form_resources = resolve_key(self.doc, &stream.dict, b"Resources")
            .and_then(|res| res.as_dict().ok())
            .or(resources);

        self.form_stack.push(*form_id);
        if let Err(err) = self.run(&content, form_resources, multiply(&form_matrix, &ctm), depth + 1)
        {
            debug!(page = self.page, %err, "Form XObject skipped");
        }
        self.form_stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey(content: &str) -> Vec<TextSpan> {
        survey_content(&Document::with_version("1.5"), 1, content.as_bytes(), None).unwrap()
    }

    #[test]
    fn tf_size_becomes_span_size() {
        let spans = survey("BT /F1 18 Tf 72 700 Td (Heading) Tj ET");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Heading");
        assert_eq!(spans[0].font_size, 18.0);
        assert_eq!((spans[0].x, spans[0].y), (72.0, 700.0));
    }

    #[test]
    fn text_matrix_scales_font_size() {
        let spans = survey("BT /F1 1 Tf 24 0 0 24 50 600 Tm (Scaled) Tj ET");
        assert_eq!(spans[0].font_size, 24.0);
        assert_eq!(spans[0].y, 600.0);
    }

    #[test]
    fn ctm_scales_font_size_and_restores_on_pop() {
        let spans = survey(
            "q 2 0 0 2 0 0 cm BT /F1 10 Tf 10 10 Td (Big) Tj ET Q BT /F1 10 Tf 10 10 Td (Small) Tj ET",
        );
        assert_eq!(spans[0].font_size, 20.0);
        assert_eq!((spans[0].x, spans[0].y), (20.0, 20.0));
        assert_eq!(spans[1].font_size, 10.0);
    }

    #[test]
    fn tj_array_joins_pieces_and_inserts_word_gaps() {
        let spans = survey("BT /F1 12 Tf [(Hel) -20 (lo) -300 (World)] TJ ET");
        assert_eq!(spans[0].text, "Hello World");
    }

    #[test]
    fn quote_operators_move_to_next_line() {
        let spans = survey("BT /F1 12 Tf 14 TL 72 700 Td (One) Tj (Two) ' 1 0 (Three) \" ET");
        let ys: Vec<f32> = spans.iter().map(|s| s.y).collect();
        assert_eq!(ys, vec![700.0, 686.0, 672.0]);
        assert_eq!(spans[2].text, "Three");
    }

    #[test]
    fn td_uppercase_sets_leading() {
        let spans = survey("BT /F1 12 Tf 72 700 Td 0 -20 TD (A) Tj T* (B) Tj ET");
        assert_eq!(spans[0].y, 680.0);
        assert_eq!(spans[1].y, 660.0);
    }

    #[test]
    fn whitespace_only_strings_are_dropped() {
        let spans = survey("BT /F1 12 Tf (   ) Tj ( x ) Tj ET");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].seq, 0);
    }

    #[test]
    fn restore_brings_back_font_size_and_leading() {
        let spans = survey(
            "BT /F1 10 Tf 14 TL 72 700 Td (Body) Tj ET \
             q BT /F1 30 Tf 40 TL 72 650 Td (Big) Tj ET Q \
             BT 72 600 Td (After) Tj T* (Next) Tj ET",
        );
        let sizes: Vec<(&str, f32)> = spans.iter().map(|s| (s.text.as_str(), s.font_size)).collect();
        assert_eq!(
            sizes,
            vec![("Body", 10.0), ("Big", 30.0), ("After", 10.0), ("Next", 10.0)]
        );
        assert_eq!(spans[3].y, 586.0);
    }

    #[test]
    fn successive_strings_advance_the_pen() {
        let spans = survey("BT /F1 10 Tf 0 0 Td (ab) Tj (cd) Tj ET");
        assert!(spans[1].x > spans[0].x);
        assert_eq!(spans[1].y, spans[0].y);
    }

    #[test]
    fn text_inside_form_xobject_is_surveyed() {
        use crate::fixtures::{FixturePage, PdfFixture};

        let bytes = PdfFixture::new()
            .page(FixturePage::new().form_text("Inside form", 22.0, 72.0, 500.0))
            .build();
        let reader = PdfReader::from_bytes(&bytes).unwrap();
        let (page, page_id) = reader.pages()[0];
        let spans = survey_page(&reader, page, page_id).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Inside form");
        assert_eq!(spans[0].font_size, 22.0);
    }

    #[test]
    fn matrix_product_composes_translation_after_scale() {
        let scale = [2.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        let shift = translation(5.0, 7.0);
        assert_eq!(multiply(&scale, &shift), [2.0, 0.0, 0.0, 2.0, 5.0, 7.0]);
        assert_eq!(multiply(&shift, &scale), [2.0, 0.0, 0.0, 2.0, 10.0, 14.0]);
    }
}
