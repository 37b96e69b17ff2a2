//! DOM serialization
//!
//! Produces the durable nested tagged-block text form of a tree: one block
//! per element, the tag carrying the component's type name and identity URN,
//! scalar props as attributes, complex values and handles in a nested
//! `__props__` block. Handles serialize to their *current* resolved target
//! key path, not the original association.

use crate::error::{ReanimationError, Result};
use crate::registry::MummyRegistry;
use arbor_dom::{DomArena, ElementId, HandleId, KeyPath, PropValue};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Cursor;

pub(crate) const ROOT_TAG: &str = "Arbor";
pub(crate) const PROPS_TAG: &str = "__props__";
pub(crate) const PROP_TAG: &str = "prop";
pub(crate) const HANDLE_WRAPPER: &str = "__arborHandle";

/// Serialization options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeOptions {
    /// Carry identity URNs so the output can be reanimated in another
    /// process. Without it the output is a debugging rendition only.
    pub reanimateable: bool,
}

/// Serialize a tree rooted at `root` to its durable text form.
pub fn serialize_dom(
    registry: &MummyRegistry,
    arena: &DomArena,
    root: ElementId,
    options: SerializeOptions,
) -> Result<String> {
    let mut paths = HashMap::new();
    collect_key_paths(arena, root, &KeyPath::new(), &mut paths)?;

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    write(&mut writer, Event::Start(BytesStart::new(ROOT_TAG)))?;
    emit(&mut writer, registry, arena, root, &paths, options)?;
    write(&mut writer, Event::End(BytesEnd::new(ROOT_TAG)))?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes)
        .map_err(|err| ReanimationError::document(format!("serialized tree is not utf-8: {err}")))
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|err| ReanimationError::document(format!("xml write error: {err}")))
}

/// Key path of every node in the serialized tree, for handle targets.
fn collect_key_paths(
    arena: &DomArena,
    element: ElementId,
    parent: &KeyPath,
    paths: &mut HashMap<ElementId, KeyPath>,
) -> Result<()> {
    let el = arena.element(element)?;
    let mut path = parent.clone();
    path.push(node_key(arena, element)?);
    paths.insert(element, path.clone());
    for &child in el.children() {
        collect_key_paths(arena, child, &path, paths)?;
    }
    Ok(())
}

fn node_key(arena: &DomArena, element: ElementId) -> Result<String> {
    let el = arena.element(element)?;
    Ok(el
        .key()
        .map(str::to_string)
        .unwrap_or_else(|| el.type_name().to_string()))
}

fn emit(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    registry: &MummyRegistry,
    arena: &DomArena,
    element: ElementId,
    paths: &HashMap<ElementId, KeyPath>,
    options: SerializeOptions,
) -> Result<()> {
    let el = arena.element(element)?;
    let tag = el.type_name().to_string();

    // Attributes and nested props are collected as owned strings first so
    // the event borrows something that lives long enough.
    let mut attrs: Vec<(String, String)> = Vec::new();
    if options.reanimateable {
        attrs.push(("urn".to_string(), registry.find_urn(el.component())?));
    }
    if let Some(key) = el.key() {
        attrs.push(("key".to_string(), key.to_string()));
    }

    let mut nested: Vec<(String, String)> = Vec::new();
    for (name, value) in el.props().iter() {
        match value {
            // "urn" and "key" are reserved attribute names.
            PropValue::Data(data) if is_scalar(data) && name != "urn" && name != "key" => {
                attrs.push((name.to_string(), encode_scalar(data)));
            }
            PropValue::Data(data) => {
                let text = serde_json::to_string(data).map_err(|err| {
                    ReanimationError::document(format!("cannot serialize prop {name}: {err}"))
                })?;
                nested.push((name.to_string(), text));
            }
            PropValue::Handle(handle) => {
                nested.push((name.to_string(), handle_json(arena, *handle, paths)?));
            }
        }
    }

    let mut start = BytesStart::new(tag.as_str());
    for (name, value) in &attrs {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    if nested.is_empty() && el.children().is_empty() {
        write(writer, Event::Empty(start))?;
        return Ok(());
    }

    write(writer, Event::Start(start))?;
    if !nested.is_empty() {
        write(writer, Event::Start(BytesStart::new(PROPS_TAG)))?;
        for (name, text) in &nested {
            let mut prop = BytesStart::new(PROP_TAG);
            prop.push_attribute(("name", name.as_str()));
            write(writer, Event::Start(prop))?;
            write(writer, Event::Text(BytesText::new(text)))?;
            write(writer, Event::End(BytesEnd::new(PROP_TAG)))?;
        }
        write(writer, Event::End(BytesEnd::new(PROPS_TAG)))?;
    }
    for &child in arena.element(element)?.children() {
        emit(writer, registry, arena, child, paths, options)?;
    }
    write(writer, Event::End(BytesEnd::new(tag.as_str())))?;
    Ok(())
}

pub(crate) fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
    )
}

/// Attribute encoding for scalars. A string that itself parses as JSON is
/// written JSON-quoted so decoding stays unambiguous; everything else is the
/// plain JSON rendition.
pub(crate) fn encode_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => {
            if serde_json::from_str::<Value>(s).is_ok() {
                serde_json::to_string(s).unwrap_or_else(|_| s.clone())
            } else {
                s.clone()
            }
        }
        other => other.to_string(),
    }
}

/// Inverse of [`encode_scalar`].
pub(crate) fn decode_scalar(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// The durable JSON form of a handle: `{"name", "target"}` under the handle
/// wrapper key, `target` being the current resolved key path or null.
fn handle_json(
    arena: &DomArena,
    handle: HandleId,
    paths: &HashMap<ElementId, KeyPath>,
) -> Result<String> {
    let target: Option<KeyPath> = if arena.is_associated(handle)? {
        match arena.target(handle)? {
            // A target outside the serialized tree has no addressable path.
            Some(el) => paths.get(&el).cloned(),
            None => None,
        }
    } else {
        arena.unresolved_target(handle)?.cloned()
    };

    let mut body = serde_json::Map::new();
    if let Some(name) = arena.handle_name(handle)? {
        body.insert("name".to_string(), Value::String(name.to_string()));
    }
    body.insert(
        "target".to_string(),
        match target {
            Some(path) => Value::Array(path.into_iter().map(Value::String).collect()),
            None => Value::Null,
        },
    );

    let mut wrapper = serde_json::Map::new();
    wrapper.insert(HANDLE_WRAPPER.to_string(), Value::Object(body));
    serde_json::to_string(&Value::Object(wrapper))
        .map_err(|err| ReanimationError::document(format!("cannot serialize handle: {err}")))
}
