//! The interchange document.
//!
//! Write path: a full report, one section element per object kind plus a
//! prefilled `Removals` element the user edits down. Read path: only the
//! `Removals` element matters, and parsing is fail-closed. Any
//! unrecognized child tag, missing `id`, or non-numeric `id` aborts before
//! a single delete happens.

use crate::error::{Result, SpruceError};
use crate::model::ObjectType;
use crate::removal::{RemovalItem, RemovalRequest};
use crate::report::Report;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

const ROOT_TAG: &str = "SpruceReport";
const REMOVALS_TAG: &str = "Removals";

pub fn write_report(report: &Report) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new(ROOT_TAG)))?;

    text_element(&mut writer, "ReportDate", &report.meta.generated_at.to_rfc3339())?;
    text_element(&mut writer, "Server", &report.meta.server)?;
    text_element(&mut writer, "APIUser", &report.meta.api_user)?;
    text_element(&mut writer, "LocalUser", &report.meta.local_user)?;
    text_element(&mut writer, "SpruceVersion", &report.meta.tool_version)?;
    text_element(&mut writer, "ClientLibraryVersion", &report.meta.client_version)?;

    for section in &report.sections {
        writer.write_event(Event::Start(BytesStart::new(section.kind.section_tag())))?;
        for record in &section.records {
            let mut element = BytesStart::new(record.object.kind.xml_tag());
            element.push_attribute(("id", record.object.id.to_string().as_str()));
            element.push_attribute(("rank", record.rank.to_string().as_str()));
            element.push_attribute(("reasons", record.reason_list().as_str()));
            writer.write_event(Event::Start(element))?;
            writer.write_event(Event::Text(BytesText::new(&record.object.name)))?;
            writer.write_event(Event::End(BytesEnd::new(record.object.kind.xml_tag())))?;
        }
        writer.write_event(Event::End(BytesEnd::new(section.kind.section_tag())))?;
    }

    // Every record is removal-eligible; the user deletes the lines they
    // want to keep.
    writer.write_event(Event::Start(BytesStart::new(REMOVALS_TAG)))?;
    for record in report.records() {
        let mut element = BytesStart::new(record.object.kind.xml_tag());
        element.push_attribute(("id", record.object.id.to_string().as_str()));
        writer.write_event(Event::Start(element))?;
        writer.write_event(Event::Text(BytesText::new(&record.object.name)))?;
        writer.write_event(Event::End(BytesEnd::new(record.object.kind.xml_tag())))?;
    }
    writer.write_event(Event::End(BytesEnd::new(REMOVALS_TAG)))?;

    writer.write_event(Event::End(BytesEnd::new(ROOT_TAG)))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| SpruceError::Runtime(format!("report is not valid UTF-8: {}", e)))
}

fn text_element(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Parse the `Removals` element of an interchange document into a
/// [`RemovalRequest`].
///
/// Exactly one `Removals` element must sit directly under the root. Report
/// sections and metadata elements are skipped unexamined. Element text is
/// carried along as the advisory display name only.
pub fn parse_removals(doc: &str) -> Result<RemovalRequest> {
    let mut reader = Reader::from_str(doc);
    reader.config_mut().trim_text(true);

    let mut items: Vec<RemovalItem> = Vec::new();
    let mut removals_seen = 0usize;
    let mut saw_root = false;
    let mut in_removals = false;
    let mut depth = 0usize;
    let mut current: Option<RemovalItem> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                let tag = tag_name(&element)?;
                match depth {
                    0 => {
                        if tag != ROOT_TAG {
                            return Err(malformed(format!(
                                "root element must be <{}>, found <{}>",
                                ROOT_TAG, tag
                            )));
                        }
                        saw_root = true;
                    }
                    1 => {
                        if tag == REMOVALS_TAG {
                            removals_seen += 1;
                            if removals_seen > 1 {
                                return Err(malformed(
                                    "more than one Removals element".to_string(),
                                ));
                            }
                            in_removals = true;
                        } else {
                            // A report section; skip it without validation.
                            let end = element.to_end().into_owned();
                            reader.read_to_end(end.name())?;
                            continue;
                        }
                    }
                    2 if in_removals => {
                        current = Some(parse_removal_child(&element, &tag)?);
                    }
                    _ => {
                        return Err(malformed(format!(
                            "unexpected nested element <{}> inside Removals",
                            tag
                        )));
                    }
                }
                depth += 1;
            }
            Event::Empty(element) => {
                let tag = tag_name(&element)?;
                match depth {
                    0 => {
                        if tag != ROOT_TAG {
                            return Err(malformed(format!(
                                "root element must be <{}>, found <{}/>",
                                ROOT_TAG, tag
                            )));
                        }
                        saw_root = true;
                    }
                    1 => {
                        if tag == REMOVALS_TAG {
                            removals_seen += 1;
                            if removals_seen > 1 {
                                return Err(malformed(
                                    "more than one Removals element".to_string(),
                                ));
                            }
                        }
                        // Other empty elements at this depth are metadata.
                    }
                    2 if in_removals => {
                        items.push(parse_removal_child(&element, &tag)?);
                    }
                    _ => {
                        return Err(malformed(format!(
                            "unexpected nested element <{}/> inside Removals",
                            tag
                        )));
                    }
                }
            }
            Event::Text(text) => {
                if let Some(item) = current.as_mut() {
                    item.name = text
                        .unescape()
                        .map_err(|e| malformed(format!("invalid text content: {}", e)))?
                        .into_owned();
                }
            }
            Event::End(element) => {
                depth = depth.saturating_sub(1);
                if let Some(item) = current.take() {
                    items.push(item);
                }
                if tag_str(element.name().as_ref())? == REMOVALS_TAG && depth == 1 {
                    in_removals = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(malformed(format!("document has no <{}> root", ROOT_TAG)));
    }
    if removals_seen == 0 {
        return Err(malformed("document has no Removals element".to_string()));
    }

    Ok(RemovalRequest { items })
}

fn parse_removal_child(element: &BytesStart<'_>, tag: &str) -> Result<RemovalItem> {
    let kind = ObjectType::from_xml_tag(tag).ok_or_else(|| {
        malformed(format!("unrecognized removal element <{}>", tag))
    })?;

    let attribute = element
        .try_get_attribute("id")
        .map_err(|e| malformed(format!("bad attribute on <{}>: {}", tag, e)))?
        .ok_or_else(|| malformed(format!("<{}> is missing its id attribute", tag)))?;
    let raw = attribute
        .unescape_value()
        .map_err(|e| malformed(format!("bad id attribute on <{}>: {}", tag, e)))?;
    let id: u32 = raw.trim().parse().map_err(|_| {
        malformed(format!("<{}> id {:?} is not a numeric object id", tag, raw))
    })?;

    Ok(RemovalItem {
        kind,
        id,
        name: String::new(),
    })
}

fn tag_name(element: &BytesStart<'_>) -> Result<String> {
    tag_str(element.name().as_ref())
}

fn tag_str(name: &[u8]) -> Result<String> {
    std::str::from_utf8(name)
        .map(str::to_string)
        .map_err(|e| malformed(format!("element tag is not UTF-8: {}", e)))
}

fn malformed(message: String) -> SpruceError {
    SpruceError::MalformedRemovals(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassifyOptions;
    use crate::graph::build_usage_index;
    use crate::model::{ManagedObject, Snapshot};
    use crate::report::{build_report, ReportMeta};
    use chrono::TimeZone;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn sample_report() -> Report {
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            ObjectType::Package,
            vec![
                ManagedObject {
                    kind: ObjectType::Package,
                    id: 891,
                    name: "Atom-1.0.5.pkg".into(),
                    detail: None,
                },
                ManagedObject {
                    kind: ObjectType::Package,
                    id: 12,
                    name: "Old & Busted.pkg".into(),
                    detail: None,
                },
            ],
        );
        snapshot.insert(
            ObjectType::Script,
            vec![ManagedObject {
                kind: ObjectType::Script,
                id: 123,
                name: "oldScript.sh".into(),
                detail: None,
            }],
        );

        let index = build_usage_index(&snapshot);
        build_report(
            ReportMeta {
                generated_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                server: "https://jss.example.com".into(),
                api_user: "api".into(),
                local_user: "sam".into(),
                tool_version: "2.0.1".into(),
                client_version: "classic-api-0.9.0".into(),
            },
            &[ObjectType::Package, ObjectType::Script],
            &snapshot,
            &index,
            &ClassifyOptions {
                now: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                ..ClassifyOptions::default()
            },
        )
    }

    #[test]
    fn test_round_trip_preserves_identity_set() {
        let report = sample_report();
        let doc = write_report(&report).unwrap();
        let request = parse_removals(&doc).unwrap();

        let written: BTreeSet<(ObjectType, u32)> = report
            .records()
            .map(|r| (r.object.kind, r.object.id))
            .collect();
        let parsed: BTreeSet<(ObjectType, u32)> =
            request.items.iter().map(|i| (i.kind, i.id)).collect();
        assert_eq!(written, parsed);
        assert!(!written.is_empty());
    }

    #[test]
    fn test_written_document_escapes_names() {
        let doc = write_report(&sample_report()).unwrap();
        assert!(doc.contains("Old &amp; Busted.pkg"));
        let request = parse_removals(&doc).unwrap();
        let name = &request
            .items
            .iter()
            .find(|i| i.id == 12)
            .unwrap()
            .name;
        assert_eq!(name, "Old & Busted.pkg");
    }

    #[test]
    fn test_parse_ignores_report_sections() {
        let doc = r#"<SpruceReport>
            <ReportDate>2026-01-01</ReportDate>
            <Packages>
              <Package id="not-even-numeric" bogus="true">whatever</Package>
            </Packages>
            <Removals>
              <Package id="891">Atom-1.0.5.pkg</Package>
              <Script id="123">oldScript.sh</Script>
            </Removals>
        </SpruceReport>"#;

        let request = parse_removals(doc).unwrap();
        assert_eq!(request.items.len(), 2);
        assert_eq!(request.items[0].kind, ObjectType::Package);
        assert_eq!(request.items[0].id, 891);
        assert_eq!(request.items[0].name, "Atom-1.0.5.pkg");
        assert_eq!(request.items[1].kind, ObjectType::Script);
        assert_eq!(request.items[1].id, 123);
    }

    #[test]
    fn test_missing_id_aborts() {
        let doc = r#"<SpruceReport><Removals>
            <Package id="1">ok.pkg</Package>
            <Script>no-id.sh</Script>
        </Removals></SpruceReport>"#;
        assert!(matches!(
            parse_removals(doc),
            Err(SpruceError::MalformedRemovals(_))
        ));
    }

    #[test]
    fn test_non_numeric_id_aborts() {
        let doc = r#"<SpruceReport><Removals>
            <Package id="eight">bad.pkg</Package>
        </Removals></SpruceReport>"#;
        assert!(matches!(
            parse_removals(doc),
            Err(SpruceError::MalformedRemovals(_))
        ));
    }

    #[test]
    fn test_unrecognized_tag_aborts() {
        let doc = r#"<SpruceReport><Removals>
            <Gadget id="1">x</Gadget>
        </Removals></SpruceReport>"#;
        assert!(matches!(
            parse_removals(doc),
            Err(SpruceError::MalformedRemovals(_))
        ));
    }

    #[test]
    fn test_tag_match_is_case_sensitive() {
        let doc = r#"<SpruceReport><Removals>
            <package id="1">x</package>
        </Removals></SpruceReport>"#;
        assert!(matches!(
            parse_removals(doc),
            Err(SpruceError::MalformedRemovals(_))
        ));
    }

    #[test]
    fn test_duplicate_removals_aborts() {
        let doc = r#"<SpruceReport>
            <Removals><Package id="1">a</Package></Removals>
            <Removals><Package id="2">b</Package></Removals>
        </SpruceReport>"#;
        assert!(matches!(
            parse_removals(doc),
            Err(SpruceError::MalformedRemovals(_))
        ));
    }

    #[test]
    fn test_missing_removals_aborts() {
        let doc = r#"<SpruceReport><Packages/></SpruceReport>"#;
        assert!(matches!(
            parse_removals(doc),
            Err(SpruceError::MalformedRemovals(_))
        ));
    }

    #[test]
    fn test_empty_removals_is_an_empty_request() {
        let doc = r#"<SpruceReport><Removals/></SpruceReport>"#;
        let request = parse_removals(doc).unwrap();
        assert!(request.items.is_empty());
    }

    #[test]
    fn test_wrong_root_aborts() {
        let doc = r#"<Report><Removals/></Report>"#;
        assert!(matches!(
            parse_removals(doc),
            Err(SpruceError::MalformedRemovals(_))
        ));
    }

    #[test]
    fn test_self_closing_child_with_id_is_accepted() {
        let doc = r#"<SpruceReport><Removals><Package id="44"/></Removals></SpruceReport>"#;
        let request = parse_removals(doc).unwrap();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].id, 44);
        assert_eq!(request.items[0].name, "");
    }
}
