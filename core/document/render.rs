//! Page rendering into a display list.
//!
//! Coordinates are points with the origin at the top-left corner; text `y`
//! is the baseline. Layout happens at the document's page size and is then
//! scaled to the requested surface.

use super::{Document, DocumentPage, ImagePage, TitlePage};
use crate::error::{AppError, Result};
use crate::paginate::{HEADER_HEIGHT, LayoutOptions, Page, Size, TextMeasure};
use crate::paginate::measure::{MonospaceMetrics, TAB_WIDTH};
use crate::styled::{FontWeight, Rgb, slice_runs};
use crate::theme::Palette;
use std::sync::Arc;

const HEADER_FONT_SIZE: f32 = 9.0;
const HEADER_PADDING: f32 = 6.0;
/// Average Helvetica advance, in em. Only used to right-align short labels.
const SANS_ADVANCE_EM: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Mono,
    MonoBold,
    Sans,
    SansBold,
}

impl Font {
    pub const ALL: [Font; 4] = [Font::Mono, Font::MonoBold, Font::Sans, Font::SansBold];

    /// Standard Type1 base font name.
    pub fn base_name(self) -> &'static str {
        match self {
            Font::Mono => "Courier",
            Font::MonoBold => "Courier-Bold",
            Font::Sans => "Helvetica",
            Font::SansBold => "Helvetica-Bold",
        }
    }

    /// Name the font is registered under in page resources.
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Mono => "F1",
            Font::MonoBold => "F2",
            Font::Sans => "F3",
            Font::SansBold => "F4",
        }
    }

    fn mono(weight: FontWeight) -> Font {
        match weight {
            FontWeight::Regular => Font::Mono,
            FontWeight::Bold => Font::MonoBold,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        font: Font,
        size: f32,
        color: Rgb,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        bytes: Arc<Vec<u8>>,
    },
    EmbeddedPage {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        source: Arc<Vec<u8>>,
        page_index: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub size: Size,
    pub ops: Vec<DrawOp>,
}

impl Surface {
    /// Text ops joined by newlines, in drawing order.
    pub fn text(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct Canvas {
    sx: f32,
    sy: f32,
    ops: Vec<DrawOp>,
}

impl Canvas {
    fn fill(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.ops.push(DrawOp::FillRect {
            x: x * self.sx,
            y: y * self.sy,
            width: width * self.sx,
            height: height * self.sy,
            color,
        });
    }

    fn text(&mut self, x: f32, y: f32, text: impl Into<String>, font: Font, size: f32, color: Rgb) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.ops.push(DrawOp::Text {
            x: x * self.sx,
            y: y * self.sy,
            text,
            font,
            size: size * self.sy,
            color,
        });
    }
}

pub fn render_page(document: &Document, n: usize, size: Size) -> Result<Surface> {
    let page = n
        .checked_sub(1)
        .and_then(|i| document.pages().get(i))
        .ok_or_else(|| {
            AppError::InvalidArgument(format!(
                "page {} out of range (document has {})",
                n,
                document.page_count()
            ))
        })?;
    if !(size.width > 0.0 && size.height > 0.0) {
        return Err(AppError::InvalidArgument(format!(
            "surface size must be positive, got {}x{}",
            size.width, size.height
        )));
    }
    let natural = document.page_size();
    let mut canvas = Canvas {
        sx: size.width / natural.width,
        sy: size.height / natural.height,
        ops: Vec::new(),
    };
    let layout = document.layout();
    match page {
        DocumentPage::Title(title) => draw_title(&mut canvas, layout, natural, title),
        DocumentPage::Toc(p) | DocumentPage::Tree(p) | DocumentPage::Text(p) => {
            draw_text_page(&mut canvas, layout, natural, p)
        }
        DocumentPage::Image(image) => draw_image(&mut canvas, natural, image),
        DocumentPage::Imported(imported) => canvas.ops.push(DrawOp::EmbeddedPage {
            x: 0.0,
            y: 0.0,
            width: size.width,
            height: size.height,
            source: Arc::clone(&imported.source),
            page_index: imported.page_index,
        }),
    }
    Ok(Surface {
        size,
        ops: canvas.ops,
    })
}

fn draw_header(canvas: &mut Canvas, layout: &LayoutOptions, natural: Size, palette: &Palette, title: &str, label: &str) {
    let margin = layout.margin;
    let band = HEADER_HEIGHT - HEADER_PADDING;
    canvas.fill(margin, margin, natural.width - 2.0 * margin, band, palette.header_background);
    let baseline = margin + (band + HEADER_FONT_SIZE) / 2.0 - 1.0;
    canvas.text(
        margin + HEADER_PADDING,
        baseline,
        title,
        Font::SansBold,
        HEADER_FONT_SIZE,
        palette.header_foreground,
    );
    let label_width = label.chars().count() as f32 * HEADER_FONT_SIZE * SANS_ADVANCE_EM;
    canvas.text(
        natural.width - margin - HEADER_PADDING - label_width,
        baseline,
        label,
        Font::Sans,
        HEADER_FONT_SIZE,
        palette.header_foreground,
    );
}

fn draw_text_page(canvas: &mut Canvas, layout: &LayoutOptions, natural: Size, page: &Page) {
    let palette = page.chrome.theme.palette();
    canvas.fill(0.0, 0.0, natural.width, natural.height, palette.background);
    draw_header(canvas, layout, natural, &palette, &page.chrome.title, &page.chrome.page_label);

    let metrics = MonospaceMetrics::new(layout.font_size);
    let advance = metrics.advance();
    let line_height = metrics.line_height();
    let rect = page.text_rect;
    let offset = page.slice.start;

    if let Some(numbers) = &page.chrome.line_numbers {
        let digits = ((page.chrome.gutter_width / advance).round() as usize).saturating_sub(1).max(1);
        for (row, number) in numbers.iter().enumerate() {
            if let Some(number) = number {
                canvas.text(
                    rect.x - page.chrome.gutter_width,
                    rect.y + row as f32 * line_height + layout.font_size,
                    format!("{:>digits$}", number),
                    Font::Mono,
                    layout.font_size,
                    palette.gutter,
                );
            }
        }
    }

    for (row, line) in page.lines.iter().enumerate() {
        let baseline = rect.y + row as f32 * line_height + layout.font_size;
        let mut column = 0usize;
        for run in slice_runs(&page.runs, line.start - offset..line.end - offset) {
            let mut visible = String::with_capacity(run.text.len());
            for c in run.text.chars() {
                match c {
                    '\t' => visible.push_str(&" ".repeat(TAB_WIDTH)),
                    '\n' | '\r' => {}
                    other => visible.push(other),
                }
            }
            let width = visible.chars().count();
            let color = if run.is_line_number {
                palette.gutter
            } else {
                run.color.unwrap_or(palette.foreground)
            };
            canvas.text(
                rect.x + column as f32 * advance,
                baseline,
                visible,
                Font::mono(run.weight),
                layout.font_size,
                color,
            );
            column += width;
        }
    }
}

fn draw_title(canvas: &mut Canvas, layout: &LayoutOptions, natural: Size, title: &TitlePage) {
    let palette = title.theme.palette();
    let margin = layout.margin;
    canvas.fill(0.0, 0.0, natural.width, natural.height, palette.background);
    canvas.fill(0.0, 0.0, natural.width, 8.0, palette.accent);

    let mut y = natural.height * 0.38;
    canvas.text(margin, y, title.file_name.as_str(), Font::SansBold, 22.0, palette.foreground);
    canvas.fill(margin, y + 10.0, natural.width - 2.0 * margin, 1.5, palette.accent);
    y += 32.0;
    canvas.text(margin, y, title.display_path.as_str(), Font::Mono, 10.0, palette.muted);
    y += 20.0;
    canvas.text(margin, y, format!("Size: {}", title.size_label), Font::Sans, 11.0, palette.foreground);
    if let Some(detail) = &title.detail {
        y += 16.0;
        canvas.text(margin, y, detail.as_str(), Font::Sans, 11.0, palette.foreground);
    }
    y += 24.0;
    canvas.text(
        margin,
        y,
        format!("Generated {}", title.generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
        Font::Sans,
        9.0,
        palette.muted,
    );
}

fn draw_image(canvas: &mut Canvas, natural: Size, image: &ImagePage) {
    let palette = image.theme.palette();
    canvas.fill(0.0, 0.0, natural.width, natural.height, palette.background);
    let (iw, ih) = (image.info.width.max(1) as f32, image.info.height.max(1) as f32);
    let scale = (natural.width / iw).min(natural.height / ih);
    let (width, height) = (iw * scale, ih * scale);
    let x = (natural.width - width) / 2.0;
    let y = (natural.height - height) / 2.0;
    canvas.ops.push(DrawOp::Image {
        x: x * canvas.sx,
        y: y * canvas.sy,
        width: width * canvas.sx,
        height: height * canvas.sy,
        bytes: Arc::clone(&image.bytes),
    });
}
