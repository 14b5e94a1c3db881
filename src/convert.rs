//! String ↔ value conversion strategies for scalar-bearing mappings.
//!
//! Every attribute, value and value-child mapping carries a [`Converter`].
//! When none is given explicitly the mapping uses [`PrimitiveConverter`],
//! which defers to the [`Primitive`] implementation of the field's type.
//!
//! | Field type | Default text form |
//! |------------|-------------------|
//! | `String`   | identity |
//! | integers, `f32`, `f64` | `Display` / `FromStr` (input is trimmed) |
//! | `bool`     | `true` / `false` (input also accepts `1` / `0`, any case) |
//! | `char`     | the single character |
//! | `Option<P>` | `None` ↔ absent / empty text, otherwise as `P` |
//!
//! Empty text and null are the same thing for optional fields: a `Some`
//! whose text would be empty (`Some(String::new())`, `Some(vec![])` under
//! [`Base64Converter`]) is omitted on output and reads back as `None`.
//!
//! The remaining converters cover types with no canonical text form:
//! timestamps and dates ([`DateTimeConverter`], [`DateConverter`]),
//! enumerations ([`EnumConverter`]) and binary data ([`Base64Converter`]).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::marker::PhantomData;

/// A bidirectional conversion between a field value and its XML text.
pub trait Converter<V>: Send + Sync {
    /// Render `value` as text. `None` means the value is null and is omitted.
    fn to_text(&self, value: &V) -> Option<String>;

    /// Produce a value from text, or `None` if the text is not a valid `V`.
    fn from_text(&self, raw: &str) -> Option<V>;
}

/// Types with a built-in text form.
pub trait Primitive: Sized {
    fn format_text(&self) -> Option<String>;
    fn parse_text(raw: &str) -> Option<Self>;
}

macro_rules! primitive_from_str {
    ($($t:ty),* $(,)?) => {$(
        impl Primitive for $t {
            fn format_text(&self) -> Option<String> {
                Some(self.to_string())
            }

            fn parse_text(raw: &str) -> Option<Self> {
                raw.trim().parse().ok()
            }
        }
    )*};
}

primitive_from_str!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl Primitive for String {
    fn format_text(&self) -> Option<String> {
        Some(self.clone())
    }

    fn parse_text(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl Primitive for bool {
    fn format_text(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn parse_text(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" => Some(true),
            "0" => Some(false),
            s if s.eq_ignore_ascii_case("true") => Some(true),
            s if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }
}

impl Primitive for char {
    fn format_text(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn parse_text(raw: &str) -> Option<Self> {
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }
}

impl<P: Primitive> Primitive for Option<P> {
    fn format_text(&self) -> Option<String> {
        non_empty(self.as_ref().and_then(P::format_text))
    }

    fn parse_text(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return Some(None);
        }
        P::parse_text(raw).map(Some)
    }
}

/// Optional fields read empty text as `None`, so an empty rendering of
/// `Some(..)` is written as null too and both read back as `None`.
fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.is_empty())
}

/// The default strategy: the field type's own [`Primitive`] text form.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveConverter;

impl<V: Primitive> Converter<V> for PrimitiveConverter {
    fn to_text(&self, value: &V) -> Option<String> {
        value.format_text()
    }

    fn from_text(&self, raw: &str) -> Option<V> {
        V::parse_text(raw)
    }
}

// ── Date and time ──────────────────────────────────────────────────────────

/// Timestamps rendered with a `chrono` format string.
///
/// Input is tried against the format first, then as RFC 3339. For
/// `Option<NaiveDateTime>` fields, empty text is `None`.
#[derive(Debug, Clone)]
pub struct DateTimeConverter {
    format: String,
}

impl DateTimeConverter {
    pub fn new(format: impl Into<String>) -> Self {
        DateTimeConverter {
            format: format.into(),
        }
    }

    fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, &self.format)
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
    }
}

impl Default for DateTimeConverter {
    fn default() -> Self {
        DateTimeConverter::new("%Y-%m-%dT%H:%M:%S")
    }
}

impl Converter<NaiveDateTime> for DateTimeConverter {
    fn to_text(&self, value: &NaiveDateTime) -> Option<String> {
        Some(value.format(&self.format).to_string())
    }

    fn from_text(&self, raw: &str) -> Option<NaiveDateTime> {
        self.parse(raw)
    }
}

impl Converter<Option<NaiveDateTime>> for DateTimeConverter {
    fn to_text(&self, value: &Option<NaiveDateTime>) -> Option<String> {
        non_empty(value.as_ref().map(|dt| dt.format(&self.format).to_string()))
    }

    fn from_text(&self, raw: &str) -> Option<Option<NaiveDateTime>> {
        if raw.trim().is_empty() {
            return Some(None);
        }
        self.parse(raw).map(Some)
    }
}

/// Calendar dates rendered with a `chrono` format string (`%Y-%m-%d` by default).
#[derive(Debug, Clone)]
pub struct DateConverter {
    format: String,
}

impl DateConverter {
    pub fn new(format: impl Into<String>) -> Self {
        DateConverter {
            format: format.into(),
        }
    }
}

impl Default for DateConverter {
    fn default() -> Self {
        DateConverter::new("%Y-%m-%d")
    }
}

impl Converter<NaiveDate> for DateConverter {
    fn to_text(&self, value: &NaiveDate) -> Option<String> {
        Some(value.format(&self.format).to_string())
    }

    fn from_text(&self, raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), &self.format).ok()
    }
}

impl Converter<Option<NaiveDate>> for DateConverter {
    fn to_text(&self, value: &Option<NaiveDate>) -> Option<String> {
        non_empty(value.as_ref().map(|d| d.format(&self.format).to_string()))
    }

    fn from_text(&self, raw: &str) -> Option<Option<NaiveDate>> {
        if raw.trim().is_empty() {
            return Some(None);
        }
        NaiveDate::parse_from_str(raw.trim(), &self.format).ok().map(Some)
    }
}

// ── Enumerations ───────────────────────────────────────────────────────────

/// An enum with a fixed table of XML names.
///
/// ```rust
/// use xml_mapper::convert::MappedEnum;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Units { Metric, Imperial }
///
/// impl MappedEnum for Units {
///     const VARIANTS: &'static [(&'static str, Self)] =
///         &[("metric", Units::Metric), ("imperial", Units::Imperial)];
/// }
/// ```
pub trait MappedEnum: Copy + PartialEq + 'static {
    const VARIANTS: &'static [(&'static str, Self)];
}

/// Converts a [`MappedEnum`] by name. Names match case-insensitively on input.
pub struct EnumConverter<E> {
    _marker: PhantomData<fn() -> E>,
}

impl<E> EnumConverter<E> {
    pub fn new() -> Self {
        EnumConverter {
            _marker: PhantomData,
        }
    }
}

impl<E> Default for EnumConverter<E> {
    fn default() -> Self {
        EnumConverter::new()
    }
}

fn enum_name<E: MappedEnum>(value: &E) -> Option<String> {
    E::VARIANTS
        .iter()
        .find(|(_, variant)| variant == value)
        .map(|(name, _)| name.to_string())
}

fn enum_value<E: MappedEnum>(raw: &str) -> Option<E> {
    let raw = raw.trim();
    E::VARIANTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(raw))
        .map(|(_, variant)| *variant)
}

impl<E: MappedEnum> Converter<E> for EnumConverter<E> {
    fn to_text(&self, value: &E) -> Option<String> {
        enum_name(value)
    }

    fn from_text(&self, raw: &str) -> Option<E> {
        enum_value(raw)
    }
}

impl<E: MappedEnum> Converter<Option<E>> for EnumConverter<E> {
    fn to_text(&self, value: &Option<E>) -> Option<String> {
        non_empty(value.as_ref().and_then(enum_name))
    }

    fn from_text(&self, raw: &str) -> Option<Option<E>> {
        if raw.trim().is_empty() {
            return Some(None);
        }
        enum_value(raw).map(Some)
    }
}

// ── Binary ─────────────────────────────────────────────────────────────────

/// Binary data as standard-alphabet base64 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Converter;

impl Converter<Vec<u8>> for Base64Converter {
    fn to_text(&self, value: &Vec<u8>) -> Option<String> {
        Some(STANDARD.encode(value))
    }

    fn from_text(&self, raw: &str) -> Option<Vec<u8>> {
        STANDARD.decode(raw.trim()).ok()
    }
}

impl Converter<Option<Vec<u8>>> for Base64Converter {
    fn to_text(&self, value: &Option<Vec<u8>>) -> Option<String> {
        non_empty(value.as_ref().map(|bytes| STANDARD.encode(bytes)))
    }

    fn from_text(&self, raw: &str) -> Option<Option<Vec<u8>>> {
        if raw.trim().is_empty() {
            return Some(None);
        }
        STANDARD.decode(raw.trim()).ok().map(Some)
    }
}
