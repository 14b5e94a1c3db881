//! Element tree → model deserializer.
//!
//! Walks a type's mapping table in declaration order and resolves each field
//! against the element: attributes by name, value children and single
//! children as the first matching descendant, plain lists as every matching
//! descendant, wrapped lists as the matching children of one wrapper.
//!
//! Resolution of a field has two outcomes, found or absent. Only absence
//! consults the field's optionality; every other failure aborts the call and
//! no partially filled instance is handed back.

use crate::element::Element;
use crate::error::{Error, Result};
use crate::mapping::{FieldKind, FieldMapping, Mappable, ScalarBinding, TypeDescriptor, describe};
use std::any::type_name;
use tracing::{debug, trace, warn};

/// Whether the element tag is checked against the type's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
    /// The tag must equal the resolved type name.
    #[default]
    Strict,
    /// The tag is not checked; the caller already picked the element.
    Lenient,
}

/// What to do when text cannot be converted into a field's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionPolicy {
    /// Fail the call with [`Error::Conversion`].
    #[default]
    Fatal,
    /// Leave the field as it was (its default on a fresh instance) and carry on.
    SubstituteDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeserializeOptions {
    pub name_policy: NamePolicy,
    pub conversion_policy: ConversionPolicy,
}

impl DeserializeOptions {
    pub fn name_policy(mut self, policy: NamePolicy) -> Self {
        self.name_policy = policy;
        self
    }

    pub fn conversion_policy(mut self, policy: ConversionPolicy) -> Self {
        self.conversion_policy = policy;
        self
    }
}

/// Deserialize a `T` from XML text, checking the root tag strictly.
pub fn from_str<T: Mappable>(xml: &str) -> Result<T> {
    let root = Element::parse_str(xml)?;
    from_element(&root, NamePolicy::Strict)
}

/// Deserialize a `T` from UTF-8 XML bytes, checking the root tag strictly.
pub fn from_slice<T: Mappable>(xml: &[u8]) -> Result<T> {
    let root = Element::parse_bytes(xml)?;
    from_element(&root, NamePolicy::Strict)
}

/// Deserialize a `T` from an already parsed element.
pub fn from_element<T: Mappable>(element: &Element, policy: NamePolicy) -> Result<T> {
    Deserializer::new(DeserializeOptions::default().name_policy(policy)).deserialize(element)
}

/// The deserializer. Holds only options, so one value can be shared freely
/// between threads.
#[derive(Debug, Clone, Default)]
pub struct Deserializer {
    options: DeserializeOptions,
}

impl Deserializer {
    pub fn new(options: DeserializeOptions) -> Self {
        Deserializer { options }
    }

    pub fn options(&self) -> &DeserializeOptions {
        &self.options
    }

    /// Build a new `T` from `element`.
    pub fn deserialize<T: Mappable>(&self, element: &Element) -> Result<T> {
        let mut target = T::default();
        self.populate(element, &mut target, self.options.name_policy, None)?;
        Ok(target)
    }

    /// Populate an existing instance. Lists are appended to, so their
    /// containers must already exist. `target` is only updated if the whole
    /// element maps successfully.
    pub fn deserialize_into<T: Mappable + Clone>(&self, element: &Element, target: &mut T) -> Result<()> {
        let mut staged = target.clone();
        self.populate(element, &mut staged, self.options.name_policy, None)?;
        *target = staged;
        Ok(())
    }

    pub(crate) fn read_nested<C: Mappable>(
        &self,
        element: &Element,
        policy: NamePolicy,
        name_override: Option<&str>,
    ) -> Result<C> {
        let mut child = C::default();
        self.populate(element, &mut child, policy, name_override)?;
        Ok(child)
    }

    fn populate<T: Mappable>(
        &self,
        element: &Element,
        target: &mut T,
        policy: NamePolicy,
        name_override: Option<&str>,
    ) -> Result<()> {
        let table = describe::<T>()?;

        if policy == NamePolicy::Strict {
            let expected = table
                .descriptor
                .resolve(name_override)
                .ok_or(Error::UnmappedType(type_name::<T>()))?;
            if element.name != expected {
                return Err(Error::NameMismatch {
                    expected: expected.to_string(),
                    found: element.name.clone(),
                });
            }
        }

        debug!(element = %element.name, model = type_name::<T>(), "deserializing element");
        for field in &table.fields {
            self.populate_field(element, target, field, policy)?;
        }
        Ok(())
    }

    fn populate_field<T>(
        &self,
        element: &Element,
        target: &mut T,
        field: &FieldMapping<T>,
        policy: NamePolicy,
    ) -> Result<()> {
        trace!(member = field.member(), "resolving field");
        match *field.kind() {
            FieldKind::Attribute { name, ref scalar } => match element.attribute(name) {
                Some(raw) => self.assign(target, field, scalar, raw),
                None => absent(field, name),
            },
            FieldKind::Value { ref scalar } => self.assign(target, field, scalar, element.text()),
            FieldKind::ValueChild { name, ref scalar } => match element.first_descendant(name) {
                Some(child) => self.assign(target, field, scalar, child.text()),
                None => absent(field, name),
            },
            FieldKind::Child { name, ref nested } => match element.first_descendant(name) {
                Some(child) => {
                    let (child_policy, name_override) = child_resolution(nested.descriptor(), name, policy);
                    nested.write(target, child, self, child_policy, name_override)
                }
                None => absent(field, name),
            },
            FieldKind::List { ref nested } => {
                let item = nested.item_name()?;
                nested.ensure_allocated(target, field.member())?;
                for child in element.descendants_named(item) {
                    nested.append(target, child, self, policy)?;
                }
                Ok(())
            }
            FieldKind::WrappedList { name, ref nested } => {
                let item = nested.item_name()?;
                nested.ensure_allocated(target, field.member())?;
                match element.first_descendant(name) {
                    Some(wrapper) => {
                        for child in wrapper.children_named(item) {
                            nested.append(target, child, self, policy)?;
                        }
                        Ok(())
                    }
                    None => absent(field, name),
                }
            }
        }
    }

    fn assign<T>(
        &self,
        target: &mut T,
        field: &FieldMapping<T>,
        scalar: &ScalarBinding<T>,
        raw: &str,
    ) -> Result<()> {
        if scalar.write(target, raw) {
            return Ok(());
        }
        match self.options.conversion_policy {
            ConversionPolicy::Fatal => Err(Error::Conversion {
                field: field.member(),
                raw_value: raw.to_string(),
                target_type: scalar.target_type(),
            }),
            ConversionPolicy::SubstituteDefault => {
                warn!(
                    member = field.member(),
                    raw,
                    target_type = scalar.target_type(),
                    "conversion failed, keeping default"
                );
                Ok(())
            }
        }
    }
}

/// Policy and name for recursing into a single child found under `field_name`.
///
/// A type with an inherited name takes the field's name. A type whose own
/// name differs from the field's was located by the field's name, so its
/// tag is not checked again.
fn child_resolution(
    nested: TypeDescriptor,
    field_name: &'static str,
    policy: NamePolicy,
) -> (NamePolicy, Option<&'static str>) {
    match nested {
        TypeDescriptor::Inherited => (policy, Some(field_name)),
        TypeDescriptor::Named(own) if own == field_name => (policy, None),
        TypeDescriptor::Named(_) => (NamePolicy::Lenient, None),
    }
}

fn absent<T>(field: &FieldMapping<T>, xml_name: &'static str) -> Result<()> {
    if field.is_optional() {
        trace!(member = field.member(), xml_name, "optional field absent");
        return Ok(());
    }
    Err(Error::RequiredFieldMissing {
        field: field.member(),
        xml_name,
    })
}
