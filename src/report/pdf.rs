// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! PDF report: title block, summary statistics, a records table and one
//! detail block per record.

use chrono::Local;
use printpdf::{
    Actions, BuiltinFont, Color, IndirectFontRef, LinkAnnotation, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rect, Rgb,
};
use tracing::debug;

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::normalize::{truncate_chars, ArticleRecord};
use crate::stats::StatisticsSummary;

// US letter, in millimetres.
const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 18.0;
const PT_TO_MM: f32 = 0.3528;
// Helvetica averages about half an em per glyph.
const AVG_GLYPH_EM: f32 = 0.5;

const AUTHORS_CHARS: usize = 150;
const BODY_SIZE: f32 = 9.5;

const TABLE_COLUMNS: [(&str, f32); 4] = [
    ("Title", 92.0),
    ("Authors", 52.0),
    ("Year", 14.0),
    ("Source", 21.9),
];

#[derive(Clone, Copy)]
enum Style {
    Title,
    Heading,
    Subheading,
    Body,
    Bold,
    Link,
}

impl Style {
    fn size(self) -> f32 {
        match self {
            Self::Title => 18.0,
            Self::Heading => 13.0,
            Self::Subheading => 11.0,
            Self::Body | Self::Bold | Self::Link => BODY_SIZE,
        }
    }

    fn is_bold(self) -> bool {
        matches!(self, Self::Title | Self::Heading | Self::Subheading | Self::Bold)
    }

    fn line_height(self) -> f32 {
        self.size() * PT_TO_MM * 1.4
    }
}

struct Line {
    text: String,
    style: Style,
    link: Option<String>,
}

impl Line {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
            link: None,
        }
    }
}

/// Cursor based writer that starts a new page when the current one is full.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    fn at_top(&self) -> bool {
        self.y >= PAGE_HEIGHT - MARGIN
    }

    fn remaining(&self) -> f32 {
        self.y - MARGIN
    }

    fn ensure_space(&mut self, height: f32) {
        if height > self.remaining() && !self.at_top() {
            self.new_page();
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn font(&self, style: Style) -> &IndirectFontRef {
        if style.is_bold() {
            &self.bold
        } else {
            &self.regular
        }
    }

    fn text_at(&self, text: &str, style: Style, x: f32) {
        self.layer
            .use_text(pdf_safe(text), style.size(), Mm(x), Mm(self.y), self.font(style));
    }

    fn line(&mut self, line: &Line) {
        let height = line.style.line_height();
        self.ensure_space(height);
        self.y -= height;

        match &line.link {
            Some(url) => {
                self.layer.set_fill_color(link_color());
                self.text_at(&line.text, line.style, MARGIN);
                self.layer.set_fill_color(black());
                let width = estimated_width(&line.text, line.style.size())
                    .min(PAGE_WIDTH - 2.0 * MARGIN);
                let rect = Rect::new(
                    Mm(MARGIN),
                    Mm(self.y - 1.0),
                    Mm(MARGIN + width),
                    Mm(self.y + height - 1.0),
                );
                let action = Actions::uri(url.clone());
                self.layer
                    .add_link_annotation(LinkAnnotation::new(rect, None, None, action, None));
            }
            None => self.text_at(&line.text, line.style, MARGIN),
        }
    }

    /// Wrap `text` to the page width and write it.
    fn paragraph(&mut self, text: &str, style: Style) {
        for chunk in wrap_text(text, chars_per_width(PAGE_WIDTH - 2.0 * MARGIN, style.size())) {
            self.line(&Line::new(chunk, style));
        }
    }

    fn table_row(&mut self, cells: [&str; 4], style: Style) {
        let height = style.line_height();
        self.ensure_space(height);
        self.y -= height;
        let mut x = MARGIN;
        for (cell, (_, width)) in cells.iter().zip(TABLE_COLUMNS) {
            let fit = chars_per_width(width - 2.0, style.size()).saturating_sub(3);
            let fitted = truncate_chars(cell, fit);
            self.text_at(&fitted, style, x);
            x += width;
        }
    }

    fn finish(self) -> Result<Vec<u8>, ReportError> {
        debug!(pages = self.pages, "pdf report laid out");
        Ok(self.doc.save_to_bytes()?)
    }
}

/// Render the report for `records` found for `topic`.
///
/// Record order is preserved. A new page starts after every
/// `records_per_page` detail blocks, or earlier when a block does not fit.
pub fn build_report(
    records: &[ArticleRecord],
    topic: &str,
    summary: &StatisticsSummary,
    options: &ReportConfig,
) -> Result<Vec<u8>, ReportError> {
    let mut w = PageWriter::new(&format!("Scientific search: {topic}"))?;

    w.paragraph("Scientific Search Assistant", Style::Title);
    w.paragraph(&format!("Topic: {topic}"), Style::Heading);
    w.paragraph(
        &format!("Generated {}", Local::now().format("%Y-%m-%d %H:%M")),
        Style::Body,
    );
    w.gap(4.0);

    w.paragraph("Summary statistics", Style::Subheading);
    for (label, value) in summary.headline() {
        w.paragraph(&format!("{label}: {value}"), Style::Body);
    }
    if !summary.top_keywords.is_empty() {
        let keywords: Vec<String> = summary
            .top_keywords
            .iter()
            .map(|t| format!("{} ({})", t.term, t.count))
            .collect();
        w.paragraph(&format!("Top keywords: {}", keywords.join(", ")), Style::Body);
    }
    if !summary.top_authors.is_empty() {
        let authors: Vec<String> = summary
            .top_authors
            .iter()
            .map(|t| format!("{} ({})", t.term, t.count))
            .collect();
        w.paragraph(&format!("Top authors: {}", authors.join(", ")), Style::Body);
    }
    w.gap(4.0);

    w.paragraph("Articles", Style::Subheading);
    let header = TABLE_COLUMNS.map(|(name, _)| name);
    w.table_row(header, Style::Bold);
    for r in records {
        if Style::Body.line_height() > w.remaining() {
            w.new_page();
            w.table_row(header, Style::Bold);
        }
        w.table_row(
            [r.title.as_str(), r.authors.as_str(), r.year.as_str(), or_dash(&r.source)],
            Style::Body,
        );
    }

    let per_page = options.records_per_page.max(1);
    let max_chars = chars_per_width(PAGE_WIDTH - 2.0 * MARGIN, BODY_SIZE);
    for (i, record) in records.iter().enumerate() {
        if i % per_page == 0 {
            w.new_page();
        }
        let lines = record_block(record, options.summary_chars, max_chars);
        let height: f32 = lines.iter().map(|l| l.style.line_height()).sum();
        w.ensure_space(height);
        for line in &lines {
            w.line(line);
        }
        w.gap(5.0);
    }

    w.finish()
}

fn record_block(record: &ArticleRecord, summary_chars: usize, max_chars: usize) -> Vec<Line> {
    let mut lines = Vec::new();
    let authors = truncate_chars(&record.authors, AUTHORS_CHARS);
    let summary = record.summary_preview(summary_chars);

    push_wrapped(&mut lines, max_chars, "", &record.title, Style::Subheading);
    push_wrapped(&mut lines, max_chars, "Authors", &authors, Style::Body);
    push_wrapped(&mut lines, max_chars, "Year", &record.year, Style::Body);
    push_wrapped(&mut lines, max_chars, "Venue", &record.venue, Style::Body);
    push_wrapped(&mut lines, max_chars, "Source", or_dash(&record.source), Style::Body);
    push_wrapped(&mut lines, max_chars, "DOI", or_dash(&record.doi), Style::Body);
    push_wrapped(&mut lines, max_chars, "Summary", &summary, Style::Body);
    push_wrapped(&mut lines, max_chars, "Objective", &record.objective, Style::Body);
    push_wrapped(&mut lines, max_chars, "Methodology", &record.methodology, Style::Body);
    push_wrapped(&mut lines, max_chars, "Keywords", or_dash(&record.keywords), Style::Body);

    if let Some(url) = record.link() {
        let mut link = Line::new(truncate_chars(&url, max_chars.saturating_sub(3)), Style::Link);
        link.link = Some(url);
        lines.push(link);
    }
    lines
}

fn push_wrapped(lines: &mut Vec<Line>, max_chars: usize, label: &str, value: &str, style: Style) {
    let text = if label.is_empty() {
        value.to_string()
    } else {
        format!("{label}: {value}")
    };
    lines.extend(wrap_text(&text, max_chars).into_iter().map(|t| Line::new(t, style)));
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn link_color() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.25, 0.75, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn estimated_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * AVG_GLYPH_EM
}

fn chars_per_width(width_mm: f32, size: f32) -> usize {
    ((width_mm / (size * PT_TO_MM * AVG_GLYPH_EM)) as usize).max(8)
}

/// Greedy word wrap on character counts; words longer than a line are split.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }
    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// The built-in PDF fonts only cover Latin-1.
fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            c if u32::from(c) <= 0xFF => c,
            _ => '?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::summarize;
    use pretty_assertions::assert_eq;

    #[test]
    fn wraps_on_words() {
        assert_eq!(wrap_text("aa bb cc dd", 5), vec!["aa bb", "cc dd"]);
        assert_eq!(wrap_text("", 5), vec![""]);
    }

    #[test]
    fn splits_long_words() {
        assert_eq!(wrap_text("x abcdefghij", 4), vec!["x", "abcd", "efgh", "ij"]);
    }

    #[test]
    fn pdf_safe_replaces_unsupported_glyphs() {
        assert_eq!(pdf_safe("año \u{201C}ok\u{201D} \u{1F52C}"), "año \"ok\" ?");
    }

    #[test]
    fn title_only_records_render() {
        let records = vec![ArticleRecord::with_title("Only a title"); 7];
        let summary = summarize(&records, 10);
        let bytes = build_report(&records, "minimal", &summary, &ReportConfig::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn block_lists_every_field() {
        let mut record = ArticleRecord::with_title("Deep soils");
        record.url = "https://example.org/a".into();
        let lines = record_block(&record, 500, 100);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts[0], "Deep soils");
        assert!(texts.contains(&"Authors: unspecified"));
        assert!(texts.contains(&"Objective: not available"));
        assert!(texts.contains(&"Source: -"));
        assert!(texts.contains(&"DOI: -"));
        assert!(texts.contains(&"Keywords: -"));
        assert_eq!(lines.last().unwrap().link.as_deref(), Some("https://example.org/a"));
    }

    #[test]
    fn summary_is_truncated() {
        let mut record = ArticleRecord::with_title("T");
        record.summary = "word ".repeat(400);
        let lines = record_block(&record, 50, 1000);
        let summary = lines.iter().find(|l| l.text.starts_with("Summary:")).unwrap();
        assert!(summary.text.ends_with("..."));
        assert!(summary.text.chars().count() <= "Summary: ".len() + 53);
    }
}
