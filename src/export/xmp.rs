// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Lightroom-compatible XMP sidecar documents

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use crate::analysis::AnalysisResult;
use crate::Result;

const NS_X: &str = "adobe:ns:meta/";
const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const NS_XMP: &str = "http://ns.adobe.com/xap/1.0/";
const NS_CRS: &str = "http://ns.adobe.com/camera-raw-settings/1.0/";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_PHOTOCULL: &str = "http://ns.photocull.dev/1.0/";

/// Process version the 2012 slider names belong to
const PROCESS_VERSION: &str = "11.0";

/// Everything that goes into one sidecar
#[derive(Debug, Clone, Copy)]
pub struct SidecarContent<'a> {
    /// Displayed rating: the manual override when set
    pub rating: u8,
    pub analysis: &'a AnalysisResult,
}

/// Render a sidecar as an XML string
pub fn render(content: &SidecarContent<'_>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 1);
    let result = content.analysis;
    let adj = &result.adjustments;

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("x:xmpmeta").with_attributes([("xmlns:x", NS_X)]),
    ))?;
    writer.write_event(Event::Start(
        BytesStart::new("rdf:RDF").with_attributes([("xmlns:rdf", NS_RDF)]),
    ))?;

    let settings: Vec<(&str, String)> = vec![
        ("rdf:about", String::new()),
        ("xmlns:xmp", NS_XMP.to_string()),
        ("xmlns:crs", NS_CRS.to_string()),
        ("xmlns:dc", NS_DC.to_string()),
        ("xmlns:photocull", NS_PHOTOCULL.to_string()),
        ("xmp:Rating", content.rating.to_string()),
        ("crs:ProcessVersion", PROCESS_VERSION.to_string()),
        ("crs:Exposure2012", format!("{:+.2}", adj.exposure)),
        ("crs:Contrast2012", slider(adj.contrast)),
        ("crs:Highlights2012", slider(adj.highlights)),
        ("crs:Shadows2012", slider(adj.shadows)),
        ("crs:Whites2012", slider(adj.whites)),
        ("crs:Blacks2012", slider(adj.blacks)),
        ("crs:IncrementalTemperature", slider(result.temperature)),
        ("crs:HasSettings", "True".to_string()),
    ];
    writer.write_event(Event::Start(
        BytesStart::new("rdf:Description").with_attributes(settings.iter().map(|(k, v)| (*k, v.as_str()))),
    ))?;

    if !result.caption.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("dc:description")))?;
        writer.write_event(Event::Start(BytesStart::new("rdf:Alt")))?;
        writer.write_event(Event::Start(
            BytesStart::new("rdf:li").with_attributes([("xml:lang", "x-default")]),
        ))?;
        writer.write_event(Event::Text(BytesText::new(&result.caption)))?;
        writer.write_event(Event::End(BytesEnd::new("rdf:li")))?;
        writer.write_event(Event::End(BytesEnd::new("rdf:Alt")))?;
        writer.write_event(Event::End(BytesEnd::new("dc:description")))?;
    }

    if !result.keywords.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("dc:subject")))?;
        writer.write_event(Event::Start(BytesStart::new("rdf:Bag")))?;
        for keyword in &result.keywords {
            writer.write_event(Event::Start(BytesStart::new("rdf:li")))?;
            writer.write_event(Event::Text(BytesText::new(keyword)))?;
            writer.write_event(Event::End(BytesEnd::new("rdf:li")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("rdf:Bag")))?;
        writer.write_event(Event::End(BytesEnd::new("dc:subject")))?;
    }

    if !result.reason.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("photocull:Reason")))?;
        writer.write_event(Event::Text(BytesText::new(&result.reason)))?;
        writer.write_event(Event::End(BytesEnd::new("photocull:Reason")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("rdf:Description")))?;
    writer.write_event(Event::End(BytesEnd::new("rdf:RDF")))?;
    writer.write_event(Event::End(BytesEnd::new("x:xmpmeta")))?;

    let mut xml = String::from_utf8_lossy(&writer.into_inner().into_inner()).into_owned();
    xml.push('\n');
    Ok(xml)
}

/// Whole-number slider value with an explicit sign, as Lightroom writes them
fn slider(value: f64) -> String {
    format!("{:+}", value.round() as i64)
}
