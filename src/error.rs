use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while mapping between model types and XML.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A type was used as a mapping target without a usable element name
    UnmappedType(&'static str),

    /// The document lacks an attribute or child element the model requires
    RequiredFieldMissing {
        field: &'static str,
        xml_name: &'static str,
    },

    /// Text could not be turned into the field's value type
    Conversion {
        field: &'static str,
        raw_value: String,
        target_type: &'static str,
    },

    /// A list-bearing field had no container to append into
    UninitializedCollection(&'static str),

    /// The element tag did not match the type's expected name (strict policy)
    NameMismatch { expected: String, found: String },

    /// A mapping table is malformed (e.g. two value mappings on one type)
    InvalidMapping(String),

    /// The XML text could not be read or written
    Xml(String),
}

impl Error {
    /// Whether a caller may sensibly retry the same document another way.
    ///
    /// Only a root-name mismatch qualifies: the document may simply be of a
    /// different type, or the caller may retry under the lenient policy.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NameMismatch { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnmappedType(t) => write!(f, "type {} has no XML element name", t),
            Error::RequiredFieldMissing { field, xml_name } => {
                write!(f, "required field `{}` missing (expected `{}`)", field, xml_name)
            }
            Error::Conversion {
                field,
                raw_value,
                target_type,
            } => write!(
                f,
                "cannot convert {:?} into {} for field `{}`",
                raw_value, target_type, field
            ),
            Error::UninitializedCollection(field) => {
                write!(f, "list field `{}` has no container", field)
            }
            Error::NameMismatch { expected, found } => {
                write!(f, "expected element <{}>, found <{}>", expected, found)
            }
            Error::InvalidMapping(msg) => write!(f, "invalid mapping: {}", msg),
            Error::Xml(msg) => write!(f, "XML error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Xml(err.to_string())
    }
}
