//! Model → element tree serializer.
//!
//! The mirror image of [`crate::de`]. Output order is fixed by the mapping
//! table: attributes and child elements appear in field declaration order,
//! whatever the data. Null values (`None`, or a converter that yields no
//! text) are always omitted.
//!
//! | Mapping kind | Output |
//! |--------------|--------|
//! | attribute    | `name="text"` on the element |
//! | value        | the element's text |
//! | value child  | `<name>text</name>` |
//! | child        | the nested element, tagged with the field's name (not the type's own name) |
//! | list         | each item as a direct child, tagged with the item type's name |
//! | wrapped list | `<name>` holding each item, tagged with the item type's name |

use crate::element::{Element, WriteOptions};
use crate::error::{Error, Result};
use crate::mapping::{FieldKind, Mappable, describe};
use std::any::type_name;
use tracing::{debug, trace};

// ── Public entry points ────────────────────────────────────────────────────

/// Serialize `value` into an element tree.
///
/// `root_name` replaces the type's own element name; it is required for
/// types whose name is inherited.
pub fn to_element<T: Mappable>(value: &T, root_name: Option<&str>) -> Result<Element> {
    write_element(value, root_name)
}

/// Serialize `value` as compact XML text.
pub fn to_string<T: Mappable>(value: &T) -> Result<String> {
    Serializer::default().serialize(value)
}

// ── Serializer ─────────────────────────────────────────────────────────────

/// Serializes models to XML text with fixed rendering options.
///
/// ```rust
/// use xml_mapper::{Serializer, WriteOptions};
/// use xml_mapper::weather::Location;
///
/// let location = Location { city: "Boston".into(), country: "US".into() };
/// let xml = Serializer::new(WriteOptions::default()).serialize(&location).unwrap();
/// assert_eq!(xml, r#"<location name="Boston" country="US"/>"#);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    options: WriteOptions,
}

impl Serializer {
    pub fn new(options: WriteOptions) -> Self {
        Serializer { options }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    pub fn serialize<T: Mappable>(&self, value: &T) -> Result<String> {
        write_element(value, None)?.to_xml_string(&self.options)
    }

    /// Serialize with `root_name` as the root tag.
    pub fn serialize_as<T: Mappable>(&self, value: &T, root_name: &str) -> Result<String> {
        write_element(value, Some(root_name))?.to_xml_string(&self.options)
    }
}

// ── Tree walk ──────────────────────────────────────────────────────────────

pub(crate) fn write_element<T: Mappable>(value: &T, name_override: Option<&str>) -> Result<Element> {
    let table = describe::<T>()?;
    let name = table
        .descriptor
        .resolve(name_override)
        .ok_or(Error::UnmappedType(type_name::<T>()))?;

    debug!(element = name, model = type_name::<T>(), "serializing element");
    let mut element = Element::new(name);

    for field in &table.fields {
        trace!(member = field.member(), "writing field");
        match *field.kind() {
            FieldKind::Attribute { name, ref scalar } => {
                if let Some(text) = scalar.read(value) {
                    element.set_attribute(name, text);
                }
            }
            FieldKind::Value { ref scalar } => {
                if let Some(text) = scalar.read(value) {
                    element.text = Some(text);
                }
            }
            FieldKind::ValueChild { name, ref scalar } => {
                if let Some(text) = scalar.read(value) {
                    element.children.push(Element::new(name).with_text(text));
                }
            }
            FieldKind::Child { name, ref nested } => {
                if let Some(child) = nested.read(value, name)? {
                    element.children.push(child);
                }
            }
            FieldKind::List { ref nested } => {
                nested.item_name()?;
                nested.ensure_allocated(value, field.member())?;
                element.children.extend(nested.read(value)?);
            }
            FieldKind::WrappedList { name, ref nested } => {
                nested.item_name()?;
                nested.ensure_allocated(value, field.member())?;
                let mut wrapper = Element::new(name);
                wrapper.children = nested.read(value)?;
                element.children.push(wrapper);
            }
        }
    }

    Ok(element)
}
