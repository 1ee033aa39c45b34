//! PDF serialization through `lopdf`.
//!
//! Generated pages are rendered at the document's page size and translated
//! to content streams. Imported pages are copied from their source file with
//! object ids renumbered and inherited attributes made explicit.

use super::render::{DrawOp, Font, Surface};
use super::{Document, DocumentPage};
use crate::error::{AppError, Result};
use crate::styled::Rgb;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat, dictionary};
use std::collections::HashMap;
use std::sync::Arc;

const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"Resources", b"CropBox", b"Rotate"];
const MAX_TREE_DEPTH: usize = 64;

pub fn write_pdf(document: &Document) -> Result<Vec<u8>> {
    let mut pdf = lopdf::Document::with_version("1.5");
    let pages_id = pdf.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let id = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_name(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), id);
    }

    let size = document.page_size();
    let media_box: Vec<Object> = vec![
        Object::Integer(0),
        Object::Integer(0),
        size.width.into(),
        size.height.into(),
    ];

    let mut kids: Vec<Object> = Vec::with_capacity(document.page_count());
    let mut imported: HashMap<usize, Vec<ObjectId>> = HashMap::new();
    let mut images = ImageCache::default();

    for (index, page) in document.pages().iter().enumerate() {
        if let DocumentPage::Imported(page) = page {
            let key = Arc::as_ptr(&page.source) as usize;
            if !imported.contains_key(&key) {
                let ids = splice_pages(&mut pdf, &page.source, pages_id)?;
                log::debug!("Spliced {} page(s) from {}", ids.len(), page.file_name);
                imported.insert(key, ids);
            }
            let id = imported
                .get(&key)
                .and_then(|ids| ids.get(page.page_index))
                .copied()
                .ok_or_else(|| {
                    AppError::Pdf(format!(
                        "{} has no page {}",
                        page.file_name,
                        page.page_index + 1
                    ))
                })?;
            kids.push(id.into());
            continue;
        }

        let surface = document.render_page(index + 1, size)?;
        let mut xobjects = Dictionary::new();
        let operations = content_operations(&surface, &mut pdf, &mut images, &mut xobjects)?;
        let content = Content { operations }.encode()?;
        let content_id = pdf.add_object(Stream::new(dictionary! {}, content));
        let mut resources = dictionary! { "Font" => fonts.clone() };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }
        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.clone(),
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);
    let info_id = pdf.add_object(dictionary! {
        "Producer" => Object::string_literal(concat!("uno ", env!("CARGO_PKG_VERSION"))),
    });
    pdf.trailer.set("Info", info_id);
    pdf.compress();

    let mut out = Vec::new();
    pdf.save_to(&mut out)?;
    log::debug!("Serialized {} page(s) into {} bytes of PDF.", count, out.len());
    Ok(out)
}

#[derive(Default)]
struct ImageCache {
    by_source: HashMap<usize, ObjectId>,
}

impl ImageCache {
    fn object_for(&mut self, pdf: &mut lopdf::Document, bytes: &Arc<Vec<u8>>) -> Result<ObjectId> {
        let key = Arc::as_ptr(bytes) as usize;
        if let Some(id) = self.by_source.get(&key) {
            return Ok(*id);
        }
        let rgb = image::load_from_memory(bytes)
            .map_err(|e| AppError::Pdf(format!("image could not be decoded: {}", e)))?
            .to_rgb8();
        let (width, height) = rgb.dimensions();
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
            },
            rgb.into_raw(),
        );
        let id = pdf.add_object(stream);
        self.by_source.insert(key, id);
        Ok(id)
    }
}

fn content_operations(
    surface: &Surface,
    pdf: &mut lopdf::Document,
    images: &mut ImageCache,
    xobjects: &mut Dictionary,
) -> Result<Vec<Operation>> {
    let height = surface.size.height;
    let mut ops = Vec::new();
    for op in &surface.ops {
        match op {
            DrawOp::FillRect {
                x,
                y,
                width,
                height: h,
                color,
            } => {
                ops.push(fill_color(*color));
                ops.push(Operation::new(
                    "re",
                    vec![(*x).into(), (height - y - h).into(), (*width).into(), (*h).into()],
                ));
                ops.push(Operation::new("f", vec![]));
            }
            DrawOp::Text {
                x,
                y,
                text,
                font,
                size,
                color,
            } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![font.resource_name().into(), (*size).into()],
                ));
                ops.push(fill_color(*color));
                ops.push(Operation::new("Td", vec![(*x).into(), (height - y).into()]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(win_ansi(text), StringFormat::Literal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            DrawOp::Image {
                x,
                y,
                width,
                height: h,
                bytes,
            } => {
                let id = images.object_for(pdf, bytes)?;
                let name = format!("Im{}", id.0);
                xobjects.set(name.as_str(), id);
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "cm",
                    vec![
                        (*width).into(),
                        Object::Integer(0),
                        Object::Integer(0),
                        (*h).into(),
                        (*x).into(),
                        (height - y - h).into(),
                    ],
                ));
                ops.push(Operation::new("Do", vec![name.as_str().into()]));
                ops.push(Operation::new("Q", vec![]));
            }
            DrawOp::EmbeddedPage { .. } => {
                return Err(AppError::Pdf(
                    "embedded pages are spliced, not drawn".to_string(),
                ));
            }
        }
    }
    Ok(ops)
}

fn fill_color(color: Rgb) -> Operation {
    let (r, g, b) = color.unit();
    Operation::new("rg", vec![r.into(), g.into(), b.into()])
}

/// Latin-1 subset of WinAnsiEncoding; anything else becomes `?`.
/// WinAnsiEncoding positions 0x80..=0x9F; unassigned slots are `None`.
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20ac}'), None, Some('\u{201a}'), Some('\u{0192}'),
    Some('\u{201e}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02c6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017d}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201c}'),
    Some('\u{201d}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02dc}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203a}'),
    Some('\u{0153}'), None, Some('\u{017e}'), Some('\u{0178}'),
];

fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ 0x20..=0x7e | code @ 0xa0..=0xff => code as u8,
            _ => WIN_ANSI_HIGH
                .iter()
                .position(|slot| *slot == Some(c))
                .map_or(b'?', |offset| 0x80 + offset as u8),
        })
        .collect()
}

/// Copies every object of the PDF in `bytes` into `pdf` except its page tree
/// nodes and catalog. Returns the copied page ids in page order, reparented
/// under `parent`.
fn splice_pages(pdf: &mut lopdf::Document, bytes: &[u8], parent: ObjectId) -> Result<Vec<ObjectId>> {
    let mut source = lopdf::Document::load_mem(bytes)?;
    source.renumber_objects_with(pdf.max_id + 1);
    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();

    for &page_id in &page_ids {
        let inherited: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter_map(|key| inherited_attribute(&source, page_id, key).map(|v| (*key, v)))
            .collect();
        let dict = source.get_dictionary_mut(page_id)?;
        for (key, value) in inherited {
            if !dict.has(key) {
                dict.set(key, value);
            }
        }
        dict.set("Parent", parent);
    }

    pdf.max_id = pdf.max_id.max(source.max_id);
    for (id, object) in source.objects {
        if matches!(type_name(&object), Some(b"Catalog") | Some(b"Pages")) {
            continue;
        }
        pdf.objects.insert(id, object);
    }
    Ok(page_ids)
}

fn type_name(object: &Object) -> Option<&[u8]> {
    object.as_dict().ok()?.get(b"Type").ok()?.as_name().ok()
}

fn inherited_attribute(doc: &lopdf::Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}
