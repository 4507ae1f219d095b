use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use quick_xml::encoding::Decoder;
use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use crate::path::{is_xml_name, NodePath};

// Internal general entities only: parameter entities (`%`) and external
// (`SYSTEM`/`PUBLIC`) declarations do not match.
static ENTITY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<!ENTITY\s+([^\s%"'>]+)\s+(?:"([^"]*)"|'([^']*)')\s*>"#)
        .expect("valid entity regex")
});

/// Where and why the document stopped being well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub position: u64,
    pub reason: String,
}

/// A matched node whose text is still being collected.
struct OpenCapture {
    /// Stack depth of the matched element; the capture closes with it.
    depth: usize,
    set: usize,
    index: usize,
}

/// General entities declared in the document's internal DTD subset.
#[derive(Debug, Default)]
struct Entities(HashMap<String, String>);

impl Entities {
    fn declare_from_doctype(&mut self, doctype: &str) {
        for caps in ENTITY_DECL.captures_iter(doctype) {
            let name = &caps[1];
            let raw = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            // First declaration wins; predefined entities cannot be redefined.
            if self.0.contains_key(name) || resolve_predefined_entity(name).is_some() {
                continue;
            }
            let value = self
                .unescape(raw)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| raw.to_string());
            self.0.insert(name.to_string(), value);
        }
    }

    fn resolve(&self, name: &str) -> Option<&str> {
        resolve_predefined_entity(name).or_else(|| self.0.get(name).map(String::as_str))
    }

    fn unescape<'a>(&self, raw: &'a str) -> Result<Cow<'a, str>, String> {
        unescape_with(raw, |name| self.resolve(name)).map_err(|err| err.to_string())
    }
}

/// Check that `xml` is a well-formed document and, in the same pass, collect
/// the text content of every element each path matches.
///
/// Returns one node-set per path, in document order. A node's text content
/// is all text and CDATA beneath it, decoded from the declared encoding,
/// line endings normalized to `\n`, entities expanded and other whitespace
/// kept. An element matched by a path nested inside another match
/// contributes to both.
pub(crate) fn evaluate(xml: &[u8], paths: &[&NodePath]) -> Result<Vec<Vec<String>>, SyntaxError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = true;

    let mut sets: Vec<Vec<String>> = vec![Vec::new(); paths.len()];
    let mut stack: Vec<String> = Vec::new();
    let mut open: Vec<OpenCapture> = Vec::new();
    let mut entities = Entities::default();
    let mut seen_root = false;
    let mut first_event = true;
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position() as u64;
        let fail = |reason: String| SyntaxError { position, reason };

        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if stack.is_empty() {
                    if seen_root {
                        return Err(fail("extra content after the root element".into()));
                    }
                    seen_root = true;
                }
                let decoder = reader.decoder();
                let name = element_name(decoder, e.name().as_ref()).map_err(fail)?;
                check_attributes(&e, decoder, &entities).map_err(fail)?;
                stack.push(name);
                for (set, path) in paths.iter().enumerate() {
                    if path.matches(&stack) {
                        sets[set].push(String::new());
                        open.push(OpenCapture {
                            depth: stack.len(),
                            set,
                            index: sets[set].len() - 1,
                        });
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if stack.is_empty() {
                    if seen_root {
                        return Err(fail("extra content after the root element".into()));
                    }
                    seen_root = true;
                }
                let decoder = reader.decoder();
                let name = element_name(decoder, e.name().as_ref()).map_err(fail)?;
                check_attributes(&e, decoder, &entities).map_err(fail)?;
                stack.push(name);
                for (set, path) in paths.iter().enumerate() {
                    if path.matches(&stack) {
                        sets[set].push(String::new());
                    }
                }
                stack.pop();
            }
            Ok(Event::End(e)) => {
                let qname = e.name();
                let name = reader
                    .decoder()
                    .decode(qname.as_ref())
                    .map_err(|err| fail(format!("cannot decode element name: {err}")))?;
                match stack.pop() {
                    Some(open_name) if open_name == name => {}
                    Some(open_name) => {
                        return Err(fail(format!("expected </{open_name}>, found </{name}>")));
                    }
                    None => return Err(fail(format!("unexpected </{name}>"))),
                }
                open.retain(|capture| capture.depth <= stack.len());
            }
            Ok(Event::Text(e)) => {
                let raw = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| fail(format!("cannot decode text: {err}")))?;
                let raw = normalize_line_endings(raw);
                let text = entities
                    .unescape(&raw)
                    .map_err(|err| fail(format!("bad text content: {err}")))?;
                if stack.is_empty() {
                    if !text.trim().is_empty() {
                        return Err(fail("text outside the root element".into()));
                    }
                } else {
                    for capture in &open {
                        sets[capture.set][capture.index].push_str(&text);
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if stack.is_empty() {
                    return Err(fail("CDATA outside the root element".into()));
                }
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| fail(format!("cannot decode CDATA: {err}")))?;
                let text = normalize_line_endings(text);
                for capture in &open {
                    sets[capture.set][capture.index].push_str(&text);
                }
            }
            Ok(Event::Decl(_)) => {
                if !first_event {
                    let reason = "XML declaration is not at the start of the document";
                    return Err(fail(reason.into()));
                }
            }
            Ok(Event::DocType(e)) => {
                if seen_root {
                    return Err(fail("DOCTYPE after the root element".into()));
                }
                let doctype = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| fail(format!("cannot decode DOCTYPE: {err}")))?;
                entities.declare_from_doctype(&doctype);
            }
            Ok(Event::Eof) => break,
            // Comments and processing instructions.
            Ok(_) => {}
            Err(err) => return Err(fail(err.to_string())),
        }
        first_event = false;
        buf.clear();
    }

    if let Some(name) = stack.last() {
        return Err(SyntaxError {
            position: reader.buffer_position() as u64,
            reason: format!("unclosed element <{name}>"),
        });
    }
    if !seen_root {
        return Err(SyntaxError {
            position: 0,
            reason: "document is empty (no root element)".into(),
        });
    }

    Ok(sets)
}

fn element_name(decoder: Decoder, raw: &[u8]) -> Result<String, String> {
    let name = decoder
        .decode(raw)
        .map_err(|err| format!("cannot decode element name: {err}"))?;
    if !is_xml_name(&name) {
        return Err(format!("'{name}' is not a valid element name"));
    }
    Ok(name.into_owned())
}

fn check_attributes(
    e: &BytesStart<'_>,
    decoder: Decoder,
    entities: &Entities,
) -> Result<(), String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("malformed attribute: {err}"))?;
        let key = decoder
            .decode(attr.key.as_ref())
            .map_err(|err| format!("cannot decode attribute name: {err}"))?;
        if !is_xml_name(&key) {
            return Err(format!("'{key}' is not a valid attribute name"));
        }
        let value = decoder
            .decode(&attr.value)
            .map_err(|err| format!("cannot decode value of attribute '{key}': {err}"))?;
        if value.contains('<') {
            return Err(format!("'<' in value of attribute '{key}'"));
        }
        entities
            .unescape(&value)
            .map_err(|err| format!("bad value for attribute '{key}': {err}"))?;
    }
    Ok(())
}

/// `\r\n` and lone `\r` become `\n`. Character references such as `&#13;`
/// are expanded afterwards and so survive.
fn normalize_line_endings(text: Cow<'_, str>) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        text
    }
}
