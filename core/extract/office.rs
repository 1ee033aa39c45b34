//! Office documents. OOXML archives (docx, pptx, xlsx) are read directly;
//! anything else fails and the extractor degrades to a placeholder.

use crate::error::{AppError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};
use std::path::Path;

/// Largest decompressed XML part read from an archive.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
const MAX_SHEETS: usize = 100;

/// What a conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfficeOutput {
    Text(String),
    /// Bytes of a paged document (PDF).
    PagedDocument(Vec<u8>),
}

pub trait OfficeConverter: Send + Sync {
    fn convert(&self, path: &Path, extension: &str, bytes: &[u8]) -> Result<OfficeOutput>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OoxmlConverter;

impl OfficeConverter for OoxmlConverter {
    fn convert(&self, path: &Path, extension: &str, bytes: &[u8]) -> Result<OfficeOutput> {
        let text = match extension {
            "docx" => docx_text(bytes),
            "pptx" => pptx_text(bytes),
            "xlsx" => xlsx_text(bytes),
            other => {
                return Err(AppError::extraction(
                    path,
                    format!("no converter available for .{} documents", other),
                ));
            }
        };
        text.map(OfficeOutput::Text)
            .map_err(|reason| AppError::extraction(path, reason))
    }
}

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

fn open_archive(bytes: &[u8]) -> Result<Archive<'_>, String> {
    zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not an OOXML archive: {}", e))
}

fn read_entry(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>, String> {
    let entry = archive.by_name(name).map_err(|e| format!("{}: {}", name, e))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| format!("{}: {}", name, e))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(format!("{} exceeds {} bytes", name, MAX_XML_ENTRY_BYTES));
    }
    Ok(out)
}

/// Archive members starting with `prefix` and ending in `.xml`, in numeric order.
fn numbered_parts(archive: &Archive<'_>, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Collects the text of every `text_tag` element, ending a line after each
/// `paragraph_tag`.
fn paragraphs(xml: &[u8], text_tag: &[u8], paragraph_tag: &[u8]) -> Result<String, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == text_tag => in_text = true,
            Ok(Event::Text(t)) if in_text => {
                out.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == text_tag {
                    in_text = false;
                } else if name.as_ref() == paragraph_tag {
                    out.push('\n');
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

fn docx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = open_archive(bytes)?;
    let xml = read_entry(&mut archive, "word/document.xml")?;
    paragraphs(&xml, b"t", b"p")
}

fn pptx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = open_archive(bytes)?;
    let slides = numbered_parts(&archive, "ppt/slides/slide");
    if slides.is_empty() {
        return Err("presentation has no slides".to_string());
    }
    let mut out = String::new();
    for (index, name) in slides.iter().enumerate() {
        let xml = read_entry(&mut archive, name)?;
        if index > 0 {
            out.push('\n');
        }
        out.push_str(&format!("--- Slide {} ---\n", index + 1));
        out.push_str(&paragraphs(&xml, b"t", b"p")?);
    }
    Ok(out)
}

fn xlsx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = open_archive(bytes)?;
    let shared = match read_entry(&mut archive, "xl/sharedStrings.xml") {
        Ok(xml) => shared_strings(&xml)?,
        Err(_) => Vec::new(),
    };
    let sheets = numbered_parts(&archive, "xl/worksheets/sheet");
    let mut out = String::new();
    for (index, name) in sheets.iter().take(MAX_SHEETS).enumerate() {
        let xml = read_entry(&mut archive, name)?;
        if index > 0 {
            out.push('\n');
        }
        out.push_str(&format!("--- Sheet {} ---\n", index + 1));
        out.push_str(&sheet_rows(&xml, &shared)?);
    }
    Ok(out)
}

fn shared_strings(xml: &[u8]) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape().map_err(|e| e.to_string())?);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// One line per row, cells separated by tabs.
fn sheet_rows(xml: &[u8], shared: &[String]) -> Result<String, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut cell_type: Option<Vec<u8>> = None;
    let mut in_value = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    cell_type = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"t")
                        .map(|a| a.value.into_owned());
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_value => {
                let raw = t.unescape().map_err(|e| e.to_string())?;
                let value = raw.trim();
                let cell = if cell_type.as_deref() == Some(&b"s"[..]) {
                    value
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| shared.get(i).cloned())
                        .unwrap_or_default()
                } else {
                    value.to_string()
                };
                if let Some(row) = rows.last_mut() {
                    row.push(cell);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => cell_type = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(rows
        .iter()
        .map(|row| row.join("\t"))
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in parts {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let bytes = archive(&[(
            "word/document.xml",
            r#"<w:document xmlns:w="w"><w:body><w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p><w:p><w:r><w:t>A &amp; B</w:t></w:r></w:p></w:body></w:document>"#,
        )]);
        let out = OoxmlConverter
            .convert(Path::new("a.docx"), "docx", &bytes)
            .unwrap();
        assert_eq!(out, OfficeOutput::Text("Hello world\nA & B\n".to_string()));
    }

    #[test]
    fn pptx_slides_are_ordered_numerically() {
        let slide = |text: &str| format!(r#"<p:sld xmlns:a="a" xmlns:p="p"><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:sld>"#, text);
        let bytes = archive(&[
            ("ppt/slides/slide10.xml", slide("ten").as_str()),
            ("ppt/slides/slide2.xml", slide("two").as_str()),
        ]);
        let Ok(OfficeOutput::Text(text)) = OoxmlConverter.convert(Path::new("s.pptx"), "pptx", &bytes) else {
            panic!("expected text");
        };
        assert_eq!(text, "--- Slide 1 ---\ntwo\n\n--- Slide 2 ---\nten\n");
    }

    #[test]
    fn xlsx_rows_resolve_shared_strings() {
        let bytes = archive(&[
            ("xl/sharedStrings.xml", r#"<sst><si><t>name</t></si><si><t>uno</t></si></sst>"#),
            (
                "xl/worksheets/sheet1.xml",
                r#"<worksheet><sheetData><row><c t="s"><v>0</v></c><c><v>42</v></c></row><row><c t="s"><v>1</v></c></row></sheetData></worksheet>"#,
            ),
        ]);
        let Ok(OfficeOutput::Text(text)) = OoxmlConverter.convert(Path::new("t.xlsx"), "xlsx", &bytes) else {
            panic!("expected text");
        };
        assert_eq!(text, "--- Sheet 1 ---\nname\t42\nuno");
    }

    #[test]
    fn legacy_formats_fail() {
        let err = OoxmlConverter
            .convert(Path::new("old.doc"), "doc", b"\xd0\xcf\x11\xe0")
            .unwrap_err();
        assert!(matches!(err, AppError::ExtractionFailed { .. }));
    }

    #[test]
    fn corrupt_archive_fails() {
        assert!(OoxmlConverter.convert(Path::new("x.docx"), "docx", b"nope").is_err());
    }
}
