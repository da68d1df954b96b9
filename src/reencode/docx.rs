use anyhow::{Context, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Minimal WordprocessingML package with one paragraph per line.
pub fn encode_docx(text: &str) -> Result<Vec<u8>> {
    let document = document_xml(text)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
        ("word/document.xml", document.as_slice()),
    ] {
        writer
            .start_file(name, options)
            .with_context(|| format!("failed to start docx entry {}", name))?;
        writer
            .write_all(content)
            .with_context(|| format!("failed to write docx entry {}", name))?;
    }
    let bytes = writer
        .finish()
        .with_context(|| "failed to finalize docx archive")?
        .into_inner();
    Ok(bytes)
}

fn document_xml(text: &str) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Start(
        BytesStart::new("w:document").with_attributes([("xmlns:w", WORDML_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("w:body")))?;
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        writer.write_event(Event::Start(BytesStart::new("w:p")))?;
        if !line.is_empty() {
            writer.write_event(Event::Start(BytesStart::new("w:r")))?;
            writer.write_event(Event::Start(
                BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
            ))?;
            writer.write_event(Event::Text(BytesText::new(line)))?;
            writer.write_event(Event::End(BytesEnd::new("w:t")))?;
            writer.write_event(Event::End(BytesEnd::new("w:r")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("w:body")))?;
    writer.write_event(Event::End(BytesEnd::new("w:document")))?;
    Ok(writer.into_inner().into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_docx_text;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn package_contains_required_parts() {
        let bytes = encode_docx("Hello").unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(|name| name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["[Content_Types].xml", "_rels/.rels", "word/document.xml"]);

        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert!(xml.contains(r#"<w:t xml:space="preserve">Hello</w:t>"#));
    }

    #[test]
    fn one_paragraph_per_line_with_escaping() {
        let text = "第一行\r\n\n<tag> & \"quotes\"\n  indented";
        let bytes = encode_docx(text).unwrap();
        let extracted = extract_docx_text(&bytes).unwrap();
        assert_eq!(extracted, "第一行\n\n<tag> & \"quotes\"\n  indented");
    }
}
