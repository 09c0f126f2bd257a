//! External references of serialized files

use ubundle_formats::bundle::file_name_of;

/// Error returned by a [`SerializedFileParser`]
pub type ParserError = Box<dyn std::error::Error + Send + Sync>;

/// A file a serialized file depends on
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExternalReference {
    /// Path as stored, e.g. `"sharedassets0.assets"` or
    /// `"archive:/CAB-9a1f/CAB-9a1f"`. Empty for built-in references.
    pub path_name: String,
    /// Asset GUID
    pub guid: [u8; 16],
    /// Reference type
    pub reference_type: i32,
}

impl ExternalReference {
    /// Reference to `path_name` with an empty GUID
    pub fn new(path_name: impl Into<String>) -> Self {
        Self {
            path_name: path_name.into(),
            ..Self::default()
        }
    }

    /// Base name of the path; both `/` and `\` separate components
    pub fn file_name(&self) -> &str {
        file_name_of(&self.path_name)
    }

    /// Built-in references carry no path and are never resolved
    pub fn is_empty(&self) -> bool {
        self.path_name.is_empty()
    }
}

/// Reads the external-reference table of a serialized file.
///
/// Object and type-tree decoding live outside this crate; a parser only has
/// to produce the ordered external list.
pub trait SerializedFileParser: Send + Sync {
    /// Ordered external references of the serialized file in `data`
    fn read_externals(&self, data: &[u8]) -> Result<Vec<ExternalReference>, ParserError>;
}

impl<F> SerializedFileParser for F
where
    F: Fn(&[u8]) -> Result<Vec<ExternalReference>, ParserError> + Send + Sync,
{
    fn read_externals(&self, data: &[u8]) -> Result<Vec<ExternalReference>, ParserError> {
        self(data)
    }
}
