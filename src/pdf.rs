use crate::models::CampaignStrategy;
use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Rgb};
use std::io::BufWriter;
use thiserror::Error;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 15.0;
const TOP: f32 = PAGE_H - 20.0;
const BOTTOM: f32 = 18.0;

const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 8.0;
// Storyboard columns: time, script, visual directives, notes.
const COLUMNS: [f32; 4] = [24.0, 56.0, 62.0, 38.0];
const TABLE_HEAD: [&str; 4] = ["Time", "Script (Audio)", "Visual Directives", "Notes"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF rendering failed: {0}")]
    Render(String),
}

fn line_height(size: f32) -> f32 {
    size * 0.45
}

/// Rough Helvetica capacity of a column, in characters.
fn chars_for(width_mm: f32, size: f32) -> usize {
    ((width_mm / (size * 0.19)) as usize).max(1)
}

/// Builtin fonts only cover Latin-1; swap the common typographic characters
/// and drop the rest.
fn pdf_safe(s: &str) -> String {
    s.chars()
        .filter_map(|c| match c {
            '‘' | '’' => Some('\''),
            '“' | '”' => Some('"'),
            '–' | '—' => Some('-'),
            '…' => Some('.'),
            c if (c as u32) < 0x100 => Some(c),
            _ => None,
        })
        .collect()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for para in text.lines() {
        let mut line = String::new();
        for word in para.split_whitespace() {
            let mut word = word.to_string();
            while word.chars().count() > width {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                lines.push(word.chars().take(width).collect());
                word = word.chars().skip(width).collect();
            }
            if word.is_empty() {
                continue;
            }
            let len = line.chars().count();
            if len > 0 && len + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn blue() -> Color {
    Color::Rgb(Rgb::new(26.0 / 255.0, 115.0 / 255.0, 232.0 / 255.0, None))
}

fn ink() -> Color {
    Color::Rgb(Rgb::new(32.0 / 255.0, 33.0 / 255.0, 36.0 / 255.0, None))
}

struct Deck {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl Deck {
    fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Page 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Render(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ExportError::Render(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self { doc, layer, regular, bold, y: TOP, pages: 1 })
    }

    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), format!("Page {}", self.pages));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < BOTTOM {
            self.new_page();
        }
    }

    fn text(&self, s: &str, size: f32, x: f32, y: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(pdf_safe(s), size, Mm(x), Mm(y), font);
    }

    fn heading(&mut self, s: &str) {
        self.ensure(14.0);
        self.y -= 6.0;
        self.layer.set_fill_color(blue());
        self.text(s, 14.0, MARGIN, self.y, true);
        self.layer.set_fill_color(ink());
        self.y -= 7.0;
    }

    fn paragraph(&mut self, s: &str, indent: f32) {
        let width = chars_for(PAGE_W - 2.0 * MARGIN - indent, BODY_SIZE);
        for line in wrap(&pdf_safe(s), width) {
            self.ensure(line_height(BODY_SIZE));
            self.text(&line, BODY_SIZE, MARGIN + indent, self.y, false);
            self.y -= line_height(BODY_SIZE);
        }
        self.y -= 1.0;
    }

    fn row(&mut self, cells: [String; 4], bold: bool) {
        let wrapped: Vec<Vec<String>> = cells
            .iter()
            .zip(COLUMNS)
            .map(|(cell, width)| wrap(&pdf_safe(cell), chars_for(width - 2.0, TABLE_SIZE)))
            .collect();
        let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1);
        let height = lines as f32 * line_height(TABLE_SIZE) + 3.0;

        // Rows taller than a page are split across pages line by line.
        self.ensure(height.min(TOP - BOTTOM));
        for i in 0..lines {
            self.ensure(line_height(TABLE_SIZE));
            let mut x = MARGIN;
            for (column, width) in wrapped.iter().zip(COLUMNS) {
                if let Some(line) = column.get(i) {
                    self.text(line, TABLE_SIZE, x + 1.0, self.y, bold);
                }
                x += width;
            }
            self.y -= line_height(TABLE_SIZE);
        }
        self.y -= 3.0;
    }

    fn save(self) -> Result<Vec<u8>, ExportError> {
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut writer = BufWriter::new(&mut buf);
            self.doc.save(&mut writer).map_err(|e| ExportError::Render(e.to_string()))?;
        }
        Ok(buf)
    }
}

fn render(strategy: &CampaignStrategy) -> Result<Deck, ExportError> {
    let mut deck = Deck::new("AdCreative Pro Production Deck")?;

    deck.layer.set_fill_color(blue());
    deck.text("AdCreative Pro Production Deck", 22.0, MARGIN, deck.y, true);
    deck.y -= 8.0;
    deck.text(&format!("Campaign: {}", truncate(&strategy.purpose.core, 40)), BODY_SIZE, MARGIN, deck.y, false);
    deck.layer.set_fill_color(ink());
    deck.y -= 6.0;

    deck.heading("1. Strategic Context");
    let persona = strategy.purpose.creator_persona.as_deref().unwrap_or("Expert Creator");
    deck.paragraph(&format!("Persona: {persona}"), 0.0);
    deck.paragraph(&format!("Tone: {}", strategy.purpose.tone), 0.0);
    deck.paragraph(&format!("Goal: {}", strategy.purpose.goal), 0.0);
    if let Some(style) = &strategy.ugc_style {
        deck.paragraph(&format!("UGC Style: {style}"), 0.0);
    }
    deck.paragraph("Authenticity checklist:", 0.0);
    for item in &strategy.authenticity_checklist {
        deck.paragraph(&format!("- {item}"), 4.0);
    }

    deck.heading("2. Storyboard");
    deck.row(TABLE_HEAD.map(String::from), true);
    for scene in &strategy.storyboard {
        deck.row(
            [
                scene.timing.clone(),
                scene.audio.clone(),
                format!(
                    "Visual: {}\nAngle: {}\nMood: {}\nText: \"{}\"",
                    scene.visual, scene.camera_angle, scene.mood_lighting, scene.text
                ),
                scene.creator_instruction.clone().unwrap_or_default(),
            ],
            false,
        );
    }

    deck.heading("3. Call to Action");
    deck.paragraph(&format!("Copy: \"{}\"", strategy.cta.copy), 0.0);
    deck.paragraph(&format!("Placement: {}", strategy.cta.link_placement), 0.0);
    deck.paragraph(&format!("Link: {}", strategy.cta.example_link), 0.0);

    deck.heading("4. Scaling Tips");
    for (i, tip) in strategy.tips.iter().enumerate() {
        deck.paragraph(&format!("{:02}. {tip}", i + 1), 0.0);
    }

    Ok(deck)
}

/// Renders the production deck for a finished strategy.
pub fn generate_pdf(strategy: &CampaignStrategy) -> Result<Vec<u8>, ExportError> {
    render(strategy)?.save()
}
