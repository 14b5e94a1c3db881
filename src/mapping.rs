//! Declarative mapping tables.
//!
//! A model type opts in by implementing [`Mappable`]: it names the element it
//! represents ([`TypeDescriptor`]) and lists, in order, how each of its fields
//! maps onto XML ([`FieldMapping`]). The tables are ordinary values built by
//! the type itself, so nothing is discovered at runtime and nothing is
//! cached: both engines ask for a fresh table at the start of every call.
//!
//! ```rust
//! use xml_mapper::{FieldMapping, Mappable, TypeDescriptor};
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Location {
//!     city: String,
//!     country: String,
//! }
//!
//! impl Mappable for Location {
//!     fn type_descriptor() -> TypeDescriptor {
//!         TypeDescriptor::Named("location")
//!     }
//!
//!     fn field_mappings() -> Vec<FieldMapping<Self>> {
//!         vec![
//!             FieldMapping::attribute("city", "name", |l: &Self| &l.city, |l: &mut Self| &mut l.city)
//!                 .required(),
//!             FieldMapping::attribute("country", "country", |l: &Self| &l.country, |l: &mut Self| {
//!                 &mut l.country
//!             }),
//!         ]
//!     }
//! }
//! ```

use crate::convert::{Converter, Primitive, PrimitiveConverter};
use crate::de::{Deserializer, NamePolicy};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::ser;
use std::sync::Arc;

/// The element name a model type maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// The type always appears as `<name>`.
    Named(&'static str),
    /// The type's tag comes from the field that holds it, so the same shape
    /// can appear under different names.
    Inherited,
}

impl TypeDescriptor {
    pub fn name(&self) -> Option<&'static str> {
        match *self {
            TypeDescriptor::Named(name) => Some(name),
            TypeDescriptor::Inherited => None,
        }
    }

    /// The element name to use for one engine call: an explicit override
    /// wins, otherwise the type's own name. `None` means no name is known.
    pub fn resolve<'a>(&self, name_override: Option<&'a str>) -> Option<&'a str> {
        name_override.or(self.name())
    }
}

/// A model type with a mapping table.
pub trait Mappable: Default + 'static {
    fn type_descriptor() -> TypeDescriptor;

    /// Field mappings in declaration order. Serialization emits children in
    /// exactly this order.
    fn field_mappings() -> Vec<FieldMapping<Self>>;
}

/// A type's descriptor together with its field mappings.
pub struct MappingTable<T> {
    pub descriptor: TypeDescriptor,
    pub fields: Vec<FieldMapping<T>>,
}

impl<T> MappingTable<T> {
    /// Reject tables the engines cannot execute.
    pub fn validate(&self) -> Result<()> {
        let values = self
            .fields
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::Value { .. }))
            .count();
        if values > 1 {
            return Err(Error::InvalidMapping(format!(
                "{} declares {} value mappings (at most one allowed)",
                std::any::type_name::<T>(),
                values
            )));
        }
        Ok(())
    }
}

/// Look up and validate the mapping table of `T`.
pub fn describe<T: Mappable>() -> Result<MappingTable<T>> {
    let table = MappingTable {
        descriptor: T::type_descriptor(),
        fields: T::field_mappings(),
    };
    table.validate()?;
    Ok(table)
}

// ── Field mappings ─────────────────────────────────────────────────────────

/// How one field of `T` maps onto XML.
pub struct FieldMapping<T> {
    member: &'static str,
    optional: bool,
    kind: FieldKind<T>,
}

/// The mapping kinds. Exactly one per field.
pub enum FieldKind<T> {
    /// `<el name="...">`
    Attribute {
        name: &'static str,
        scalar: ScalarBinding<T>,
    },
    /// `<el>...</el>`
    Value { scalar: ScalarBinding<T> },
    /// `<el><name>...</name></el>`
    ValueChild {
        name: &'static str,
        scalar: ScalarBinding<T>,
    },
    /// One nested mapped element found by `name`.
    Child {
        name: &'static str,
        nested: ChildBinding<T>,
    },
    /// Every element anywhere below named after the item type.
    List { nested: ListBinding<T> },
    /// Items directly inside a single `<name>` wrapper.
    WrappedList {
        name: &'static str,
        nested: ListBinding<T>,
    },
}

impl<T: 'static> FieldMapping<T> {
    fn new(member: &'static str, kind: FieldKind<T>) -> Self {
        FieldMapping {
            member,
            optional: true,
            kind,
        }
    }

    /// Map `member` to the attribute `name`.
    pub fn attribute<V: Primitive + 'static>(
        member: &'static str,
        name: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        Self::attribute_with(member, name, get, get_mut, PrimitiveConverter)
    }

    pub fn attribute_with<V: 'static, K: Converter<V> + 'static>(
        member: &'static str,
        name: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
        converter: K,
    ) -> Self {
        let scalar = ScalarBinding::new(get, get_mut, converter);
        Self::new(member, FieldKind::Attribute { name, scalar })
    }

    /// Map `member` to the element's own text.
    pub fn value<V: Primitive + 'static>(
        member: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        Self::value_with(member, get, get_mut, PrimitiveConverter)
    }

    pub fn value_with<V: 'static, K: Converter<V> + 'static>(
        member: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
        converter: K,
    ) -> Self {
        let scalar = ScalarBinding::new(get, get_mut, converter);
        Self::new(member, FieldKind::Value { scalar })
    }

    /// Map `member` to the text of the first descendant called `name`.
    pub fn value_child<V: Primitive + 'static>(
        member: &'static str,
        name: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        Self::value_child_with(member, name, get, get_mut, PrimitiveConverter)
    }

    pub fn value_child_with<V: 'static, K: Converter<V> + 'static>(
        member: &'static str,
        name: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
        converter: K,
    ) -> Self {
        let scalar = ScalarBinding::new(get, get_mut, converter);
        Self::new(member, FieldKind::ValueChild { name, scalar })
    }

    /// Map a nested model held directly in `member` to the first descendant called `name`.
    pub fn child<C: Mappable>(
        member: &'static str,
        name: &'static str,
        get: fn(&T) -> &C,
        get_mut: fn(&mut T) -> &mut C,
    ) -> Self {
        let nested = ChildBinding {
            nested: C::type_descriptor,
            read: Box::new(move |target: &T, tag: &str| {
                ser::write_element(get(target), Some(tag)).map(Some)
            }),
            write: Box::new(
                move |target: &mut T,
                      element: &Element,
                      de: &Deserializer,
                      policy: NamePolicy,
                      name_override: Option<&str>| {
                    *get_mut(target) = de.read_nested::<C>(element, policy, name_override)?;
                    Ok(())
                },
            ),
        };
        Self::new(member, FieldKind::Child { name, nested })
    }

    /// Like [`child`](Self::child), for an `Option<C>` field. `None` is not serialized.
    pub fn optional_child<C: Mappable>(
        member: &'static str,
        name: &'static str,
        get: fn(&T) -> &Option<C>,
        get_mut: fn(&mut T) -> &mut Option<C>,
    ) -> Self {
        let nested = ChildBinding {
            nested: C::type_descriptor,
            read: Box::new(move |target: &T, tag: &str| match get(target) {
                Some(child) => ser::write_element(child, Some(tag)).map(Some),
                None => Ok(None),
            }),
            write: Box::new(
                move |target: &mut T,
                      element: &Element,
                      de: &Deserializer,
                      policy: NamePolicy,
                      name_override: Option<&str>| {
                    *get_mut(target) = Some(de.read_nested::<C>(element, policy, name_override)?);
                    Ok(())
                },
            ),
        };
        Self::new(member, FieldKind::Child { name, nested })
    }

    /// Collect every descendant named after the item type into `member`.
    pub fn list<L>(member: &'static str, get: fn(&T) -> &L, get_mut: fn(&mut T) -> &mut L) -> Self
    where
        L: ListContainer + 'static,
        L::Item: Mappable,
    {
        Self::new(
            member,
            FieldKind::List {
                nested: ListBinding::new(member, get, get_mut),
            },
        )
    }

    /// Collect the item-type children of the `<name>` wrapper into `member`.
    pub fn wrapped_list<L>(
        member: &'static str,
        name: &'static str,
        get: fn(&T) -> &L,
        get_mut: fn(&mut T) -> &mut L,
    ) -> Self
    where
        L: ListContainer + 'static,
        L::Item: Mappable,
    {
        Self::new(
            member,
            FieldKind::WrappedList {
                name,
                nested: ListBinding::new(member, get, get_mut),
            },
        )
    }
}

impl<T> FieldMapping<T> {
    /// Make absence of this field an error. Value and list mappings have no
    /// notion of absence and ignore this.
    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    /// The Rust-side field name, used in error reports.
    pub fn member(&self) -> &'static str {
        self.member
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn kind(&self) -> &FieldKind<T> {
        &self.kind
    }

    /// The attribute or element name this field is found under, if it has one.
    pub fn xml_name(&self) -> Option<&'static str> {
        match &self.kind {
            FieldKind::Attribute { name, .. }
            | FieldKind::ValueChild { name, .. }
            | FieldKind::Child { name, .. }
            | FieldKind::WrappedList { name, .. } => Some(*name),
            FieldKind::Value { .. } | FieldKind::List { .. } => None,
        }
    }
}

// ── Type-erased accessors ──────────────────────────────────────────────────

type ReadText<T> = Box<dyn Fn(&T) -> Option<String> + Send + Sync>;
type WriteText<T> = Box<dyn Fn(&mut T, &str) -> bool + Send + Sync>;

/// Reads and writes one scalar field through its converter.
pub struct ScalarBinding<T> {
    target_type: &'static str,
    read: ReadText<T>,
    write: WriteText<T>,
}

impl<T: 'static> ScalarBinding<T> {
    fn new<V: 'static, K: Converter<V> + 'static>(
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
        converter: K,
    ) -> Self {
        let converter = Arc::new(converter);
        let reader = Arc::clone(&converter);
        ScalarBinding {
            target_type: std::any::type_name::<V>(),
            read: Box::new(move |target: &T| reader.to_text(get(target))),
            write: Box::new(move |target: &mut T, raw: &str| match converter.from_text(raw) {
                Some(value) => {
                    *get_mut(target) = value;
                    true
                }
                None => false,
            }),
        }
    }
}

impl<T> ScalarBinding<T> {
    /// Name of the field's Rust type.
    pub fn target_type(&self) -> &'static str {
        self.target_type
    }

    /// The field's text, or `None` if it is null.
    pub(crate) fn read(&self, target: &T) -> Option<String> {
        (self.read)(target)
    }

    /// Convert `raw` and assign it. Returns `false`, leaving the field
    /// untouched, if the converter rejects the text.
    pub(crate) fn write(&self, target: &mut T, raw: &str) -> bool {
        (self.write)(target, raw)
    }
}

type ReadChild<T> = Box<dyn Fn(&T, &str) -> Result<Option<Element>> + Send + Sync>;
type WriteChild<T> =
    Box<dyn Fn(&mut T, &Element, &Deserializer, NamePolicy, Option<&str>) -> Result<()> + Send + Sync>;

/// Recurses into a single nested model.
pub struct ChildBinding<T> {
    nested: fn() -> TypeDescriptor,
    read: ReadChild<T>,
    write: WriteChild<T>,
}

impl<T> ChildBinding<T> {
    /// The nested type's own descriptor.
    pub fn descriptor(&self) -> TypeDescriptor {
        (self.nested)()
    }

    pub(crate) fn read(&self, target: &T, tag: &str) -> Result<Option<Element>> {
        (self.read)(target, tag)
    }

    pub(crate) fn write(
        &self,
        target: &mut T,
        element: &Element,
        de: &Deserializer,
        policy: NamePolicy,
        name_override: Option<&str>,
    ) -> Result<()> {
        (self.write)(target, element, de, policy, name_override)
    }
}

/// A field that holds a list of nested models.
///
/// `Vec<C>` is always available; `Option<Vec<C>>` models a container that
/// may not have been allocated, which both engines reject.
pub trait ListContainer {
    type Item;

    fn items(&self) -> Option<&[Self::Item]>;
    fn items_mut(&mut self) -> Option<&mut Vec<Self::Item>>;
}

impl<C> ListContainer for Vec<C> {
    type Item = C;

    fn items(&self) -> Option<&[C]> {
        Some(self)
    }

    fn items_mut(&mut self) -> Option<&mut Vec<C>> {
        Some(self)
    }
}

impl<C> ListContainer for Option<Vec<C>> {
    type Item = C;

    fn items(&self) -> Option<&[C]> {
        self.as_deref()
    }

    fn items_mut(&mut self) -> Option<&mut Vec<C>> {
        self.as_mut()
    }
}

type Allocated<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;
type ReadItems<T> = Box<dyn Fn(&T) -> Result<Vec<Element>> + Send + Sync>;
type AppendItem<T> = Box<dyn Fn(&mut T, &Element, &Deserializer, NamePolicy) -> Result<()> + Send + Sync>;

/// Recurses into each item of a list field.
pub struct ListBinding<T> {
    nested: fn() -> TypeDescriptor,
    item_type: &'static str,
    allocated: Allocated<T>,
    read: ReadItems<T>,
    append: AppendItem<T>,
}

impl<T: 'static> ListBinding<T> {
    fn new<L>(member: &'static str, get: fn(&T) -> &L, get_mut: fn(&mut T) -> &mut L) -> Self
    where
        L: ListContainer + 'static,
        L::Item: Mappable,
    {
        ListBinding {
            nested: <L::Item as Mappable>::type_descriptor,
            item_type: std::any::type_name::<L::Item>(),
            allocated: Box::new(move |target: &T| get(target).items().is_some()),
            read: Box::new(move |target: &T| {
                get(target)
                    .items()
                    .unwrap_or_default()
                    .iter()
                    .map(|item| ser::write_element(item, None))
                    .collect()
            }),
            append: Box::new(
                move |target: &mut T, element: &Element, de: &Deserializer, policy: NamePolicy| {
                    let item = de.read_nested::<L::Item>(element, policy, None)?;
                    get_mut(target)
                        .items_mut()
                        .ok_or(Error::UninitializedCollection(member))?
                        .push(item);
                    Ok(())
                },
            ),
        }
    }
}

impl<T> ListBinding<T> {
    /// The item type's own descriptor.
    pub fn descriptor(&self) -> TypeDescriptor {
        (self.nested)()
    }

    /// Items are found by their own element name, so the item type must have one.
    pub(crate) fn item_name(&self) -> Result<&'static str> {
        self.descriptor()
            .name()
            .ok_or(Error::UnmappedType(self.item_type))
    }

    pub(crate) fn ensure_allocated(&self, target: &T, member: &'static str) -> Result<()> {
        if (self.allocated)(target) {
            Ok(())
        } else {
            Err(Error::UninitializedCollection(member))
        }
    }

    pub(crate) fn read(&self, target: &T) -> Result<Vec<Element>> {
        (self.read)(target)
    }

    pub(crate) fn append(
        &self,
        target: &mut T,
        element: &Element,
        de: &Deserializer,
        policy: NamePolicy,
    ) -> Result<()> {
        (self.append)(target, element, de, policy)
    }
}
