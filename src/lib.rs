//! # xml-mapper
//!
//! Declarative object ↔ XML mapping. A model type describes, in a static
//! table, how each of its fields maps onto an element; the engines walk
//! that table to populate the type from an element tree or to produce one
//! from it.
//!
//! ## Overview
//!
//! Documents are held in memory as an [`Element`] tree (tag, ordered
//! attributes, ordered children, optional text). [`de`] turns a tree into a
//! model, [`ser`] turns a model back into a tree, and [`Element`] reads and
//! writes XML text through `quick-xml`. There is no streaming and no
//! namespace handling.
//!
//! ## Mapping kinds
//!
//! | Kind | XML | Absence |
//! |------|-----|---------|
//! | attribute    | `<el name="v">` | optional or required |
//! | value        | `<el>v</el>` (at most one per type) | n/a |
//! | value child  | first `<name>v</name>` below the element | optional or required |
//! | child        | first `<name>` below the element, itself a mapped type; written back as `<name>` even when the type has its own name | optional or required |
//! | list         | every element below named after the item type, in document order | n/a (empty list) |
//! | wrapped list | item-type children of the first `<name>` below the element | optional or required |
//!
//! Scalars go through a [`convert::Converter`]; without one, the field
//! type's built-in [`convert::Primitive`] form is used.
//!
//! ## Example
//!
//! ```rust
//! use xml_mapper::{FieldMapping, Mappable, TypeDescriptor, from_str, to_string};
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Reading {
//!     at: u32,
//!     kelvin: f64,
//! }
//!
//! impl Mappable for Reading {
//!     fn type_descriptor() -> TypeDescriptor {
//!         TypeDescriptor::Named("reading")
//!     }
//!
//!     fn field_mappings() -> Vec<FieldMapping<Self>> {
//!         vec![
//!             FieldMapping::attribute("at", "at", |r: &Self| &r.at, |r: &mut Self| &mut r.at).required(),
//!             FieldMapping::value("kelvin", |r: &Self| &r.kelvin, |r: &mut Self| &mut r.kelvin),
//!         ]
//!     }
//! }
//!
//! let reading: Reading = from_str(r#"<reading at="6">280.5</reading>"#).unwrap();
//! assert_eq!(reading, Reading { at: 6, kelvin: 280.5 });
//!
//! let xml = to_string(&reading).unwrap();
//! assert_eq!(xml, r#"<reading at="6">280.5</reading>"#);
//! ```

pub mod convert;
pub mod de;
pub mod element;
pub mod error;
pub mod mapping;
pub mod ser;
pub mod weather;

pub use de::{ConversionPolicy, DeserializeOptions, Deserializer, NamePolicy, from_element, from_slice, from_str};
pub use element::{Element, WriteOptions};
pub use error::{Error, Result};
pub use mapping::{FieldKind, FieldMapping, ListContainer, Mappable, MappingTable, TypeDescriptor, describe};
pub use ser::{Serializer, to_element, to_string};
