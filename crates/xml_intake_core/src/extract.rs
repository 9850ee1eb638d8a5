use roxmltree::{Document, Node};

use crate::contract::ForwardPayload;
use crate::error::IntakeError;

pub const DEFAULT_DOCUMENT_NAMESPACE: &str = "http://www.example.com/namespace";
pub const DOCUMENT_IDENTIFICATION: &str = "DocumentIdentification";
pub const IDENTIFICATION_ID: &str = "IdentificationID";

/// Extracts every `IdentificationID` nested under a `DocumentIdentification`
/// element in `namespace`. Each payload carries the trimmed identifier and the
/// enclosing `DocumentIdentification` element as a standalone fragment.
pub fn extract_document_identifications(
    xml: &str,
    namespace: &str,
) -> Result<Vec<ForwardPayload>, IntakeError> {
    let document = Document::parse(xml)
        .map_err(|error| IntakeError::Extraction(format!("invalid XML document: {error}")))?;
    let root = document.root_element();

    let identifications: Vec<Node<'_, '_>> = root
        .descendants()
        .skip(1)
        .filter(|node| node.has_tag_name((namespace, DOCUMENT_IDENTIFICATION)))
        .collect();

    if identifications.is_empty() {
        return Err(IntakeError::Extraction(format!(
            "no {DOCUMENT_IDENTIFICATION} element found in namespace {namespace}"
        )));
    }

    let mut payloads = Vec::new();
    for identification in identifications {
        let xml_data = standalone_fragment(xml, identification);
        for id_node in identification
            .descendants()
            .skip(1)
            .filter(|node| node.has_tag_name((namespace, IDENTIFICATION_ID)))
        {
            let document_id = id_node.text().map(str::trim).unwrap_or_default();
            if document_id.is_empty() {
                return Err(IntakeError::Extraction(format!(
                    "{IDENTIFICATION_ID} element has no text"
                )));
            }
            payloads.push(ForwardPayload {
                document_id: document_id.to_string(),
                xml_data: xml_data.clone(),
            });
        }
    }

    if payloads.is_empty() {
        return Err(IntakeError::Extraction(format!(
            "no {IDENTIFICATION_ID} found under {DOCUMENT_IDENTIFICATION}"
        )));
    }

    Ok(payloads)
}

/// Source text of `node` with every namespace in scope declared on its start
/// tag, so prefixes bound on ancestors still resolve once the fragment is
/// posted on its own.
fn standalone_fragment(xml: &str, node: Node<'_, '_>) -> String {
    let source = &xml[node.range()];
    let name_end = source
        .char_indices()
        .skip(1)
        .find(|(_, ch)| ch.is_whitespace() || *ch == '>' || *ch == '/')
        .map(|(index, _)| index)
        .unwrap_or(source.len());
    let start_tag = &source[..source.find('>').unwrap_or(source.len())];

    let mut declarations = String::new();
    for namespace in node.namespaces() {
        let attribute = match namespace.name() {
            Some("xml") => continue,
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        if declares(start_tag, &attribute) {
            continue;
        }
        declarations.push_str(&format!(
            " {attribute}=\"{}\"",
            escape_attribute(namespace.uri())
        ));
    }

    format!("{}{declarations}{}", &source[..name_end], &source[name_end..])
}

fn declares(start_tag: &str, attribute: &str) -> bool {
    start_tag.match_indices(attribute).any(|(index, _)| {
        let preceded = start_tag[..index].ends_with(char::is_whitespace);
        let rest = start_tag[index + attribute.len()..].trim_start();
        preceded && rest.starts_with('=')
    })
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

/// Object bodies must be UTF-8 before they can be parsed.
pub fn extract_from_bytes(
    content: &[u8],
    namespace: &str,
) -> Result<Vec<ForwardPayload>, IntakeError> {
    let xml = std::str::from_utf8(content)
        .map_err(|error| IntakeError::Extraction(format!("object is not valid UTF-8: {error}")))?;
    extract_document_identifications(xml, namespace)
}
