//! Minimal element tree over quick-xml events.
//!
//! XML-RPC documents are small and strictly nested, so the decoder works on
//! an owned tree rather than the event stream. Element names are stored as
//! lower-cased local names: tag dispatch is case-insensitive.

use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Lower-cased local name.
    pub name: String,
    /// Concatenated direct text and CDATA content, entities resolved.
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// First direct child with the given (lower-case) name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given (lower-case) name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First element child, whatever its name.
    pub fn first_child(&self) -> Option<&Element> {
        self.children.first()
    }

    /// Depth-first search of descendants (not including `self`).
    pub fn find(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }
}

/// Parse a complete document into its root element.
///
/// Any reader error, an unclosed element, stray text outside the root, or a
/// second root element is reported as a parse error string.
pub fn parse_document(text: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if stack.is_empty() && root.is_some() {
                    return Err("multiple root elements".into());
                }
                stack.push(Element::named(lower_name(e.local_name().as_ref())));
            }
            Ok(Event::Empty(e)) => {
                let element = Element::named(lower_name(e.local_name().as_ref()));
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or("unexpected closing tag")?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(t)) => {
                let content = t.unescape().map_err(|e| e.to_string())?;
                push_text(&mut stack, &content)?;
            }
            Ok(Event::CData(c)) => {
                let raw = c.into_inner();
                push_text(&mut stack, &String::from_utf8_lossy(&raw))?;
            }
            Ok(Event::Eof) => break,
            // Declaration, comments, processing instructions, doctype.
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "at byte {}: {}",
                    reader.error_position(),
                    e
                ))
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }
    root.ok_or_else(|| "no root element".to_string())
}

fn lower_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_some() => Err("multiple root elements".into()),
        None => {
            *root = Some(element);
            Ok(())
        }
    }
}

fn push_text(stack: &mut [Element], content: &str) -> Result<(), String> {
    match stack.last_mut() {
        Some(top) => {
            top.text.push_str(content);
            Ok(())
        }
        None if content.trim().is_empty() => Ok(()),
        None => Err("text outside of root element".into()),
    }
}
