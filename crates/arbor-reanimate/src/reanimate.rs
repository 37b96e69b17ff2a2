//! DOM reanimation
//!
//! Parses the durable text form back into arena elements, resolving every
//! block's identity URN through the registry. Handles come back as fresh
//! cells carrying their serialized name and target key path; a null target
//! is an intentional association with no live element.

use crate::error::{ReanimationError, Result};
use crate::registry::MummyRegistry;
use crate::serialize::{
    decode_scalar, HANDLE_WRAPPER, PROPS_TAG, PROP_TAG, ROOT_TAG,
};
use arbor_dom::{ComponentRef, DomArena, Element, ElementId, KeyPath, PropValue};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;

/// A tree restored from its durable form, in a fresh arena.
#[derive(Debug)]
pub struct ReanimatedDom {
    pub arena: DomArena,
    pub root: Option<ElementId>,
}

struct Frame {
    component: ComponentRef,
    key: Option<String>,
    props: Vec<(String, PropValue)>,
    children: Vec<ElementId>,
}

/// Parse the serialized tree and reconstruct its elements by identity.
pub fn reanimate_dom(registry: &MummyRegistry, text: &str) -> Result<ReanimatedDom> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut arena = DomArena::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<ElementId> = None;
    let mut in_props = false;
    let mut current_prop: Option<(String, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let tag = tag_name(&start)?;
                match tag.as_str() {
                    ROOT_TAG => {}
                    PROPS_TAG => in_props = true,
                    PROP_TAG => current_prop = Some((prop_name(&start)?, String::new())),
                    _ => stack.push(open_element(registry, &start, &tag)?),
                }
            }
            Event::Empty(start) => {
                let tag = tag_name(&start)?;
                match tag.as_str() {
                    ROOT_TAG | PROPS_TAG | PROP_TAG => {
                        return Err(ReanimationError::document(format!(
                            "unexpected empty {tag} block"
                        )));
                    }
                    _ => {
                        let frame = open_element(registry, &start, &tag)?;
                        close_element(&mut arena, frame, &mut stack, &mut root)?;
                    }
                }
            }
            Event::Text(text) => {
                if let Some((_, buffer)) = current_prop.as_mut() {
                    buffer.push_str(&text.unescape()?);
                }
            }
            Event::End(end) => {
                let tag = String::from_utf8_lossy(end.name().as_ref()).to_string();
                match tag.as_str() {
                    ROOT_TAG => {}
                    PROPS_TAG => in_props = false,
                    PROP_TAG => {
                        let (name, text) = current_prop.take().ok_or_else(|| {
                            ReanimationError::document("prop end without start")
                        })?;
                        if !in_props {
                            return Err(ReanimationError::document(
                                "prop block outside __props__",
                            ));
                        }
                        let value = parse_prop_value(&mut arena, &text)?;
                        let frame = stack.last_mut().ok_or_else(|| {
                            ReanimationError::document("prop block outside an element")
                        })?;
                        frame.props.push((name, value));
                    }
                    _ => {
                        let frame = stack.pop().ok_or_else(|| {
                            ReanimationError::document(format!("unbalanced closing tag {tag}"))
                        })?;
                        close_element(&mut arena, frame, &mut stack, &mut root)?;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ReanimationError::document("unterminated element block"));
    }
    Ok(ReanimatedDom { arena, root })
}

fn tag_name(start: &BytesStart<'_>) -> Result<String> {
    Ok(String::from_utf8_lossy(start.name().as_ref()).to_string())
}

fn prop_name(start: &BytesStart<'_>) -> Result<String> {
    for attr in start.attributes() {
        let attr =
            attr.map_err(|err| ReanimationError::document(format!("bad attribute: {err}")))?;
        if attr.key.as_ref() == b"name" {
            return Ok(attr
                .unescape_value()
                .map_err(ReanimationError::Xml)?
                .to_string());
        }
    }
    Err(ReanimationError::document("prop block without a name"))
}

fn open_element(
    registry: &MummyRegistry,
    start: &BytesStart<'_>,
    tag: &str,
) -> Result<Frame> {
    let mut urn = None;
    let mut key = None;
    let mut props = Vec::new();

    for attr in start.attributes() {
        let attr =
            attr.map_err(|err| ReanimationError::document(format!("bad attribute: {err}")))?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().map_err(ReanimationError::Xml)?;
        match name.as_str() {
            "urn" => urn = Some(value.to_string()),
            "key" => key = Some(value.to_string()),
            _ => props.push((name, PropValue::Data(decode_scalar(&value)))),
        }
    }

    let urn = urn.ok_or_else(|| {
        ReanimationError::document(format!("element {tag} carries no identity urn"))
    })?;
    let component = registry.reanimate(&urn)?;
    Ok(Frame {
        component,
        key,
        props,
        children: Vec::new(),
    })
}

fn close_element(
    arena: &mut DomArena,
    frame: Frame,
    stack: &mut Vec<Frame>,
    root: &mut Option<ElementId>,
) -> Result<()> {
    let mut builder = Element::builder(frame.component);
    if let Some(key) = frame.key {
        builder = builder.key(key);
    }
    for (name, value) in frame.props {
        builder = builder.prop(name, value);
    }
    builder = builder.children(frame.children);
    let id = builder.build(arena)?;

    match stack.last_mut() {
        Some(parent) => parent.children.push(id),
        None => {
            if root.is_some() {
                return Err(ReanimationError::document(
                    "serialized tree has more than one root",
                ));
            }
            *root = Some(id);
        }
    }
    Ok(())
}

/// Parse one nested-prop body: either the handle wrapper or plain JSON data.
fn parse_prop_value(arena: &mut DomArena, text: &str) -> Result<PropValue> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| ReanimationError::document(format!("bad prop value: {err}")))?;

    if let Value::Object(map) = &value {
        if map.len() == 1 {
            if let Some(inner) = map.get(HANDLE_WRAPPER) {
                return parse_handle(arena, inner);
            }
        }
    }
    Ok(PropValue::Data(value))
}

fn parse_handle(arena: &mut DomArena, body: &Value) -> Result<PropValue> {
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let target: Option<KeyPath> = match body.get("target") {
        None | Some(Value::Null) => None,
        Some(Value::Array(parts)) => Some(
            parts
                .iter()
                .map(|part| {
                    part.as_str().map(str::to_string).ok_or_else(|| {
                        ReanimationError::document("handle target path must be strings")
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        Some(_) => {
            return Err(ReanimationError::document(
                "handle target must be a key path or null",
            ));
        }
    };
    Ok(PropValue::Handle(arena.reanimated_handle(name, target)))
}
