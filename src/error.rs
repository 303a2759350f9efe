use std::{
    borrow::Cow,
    error::Error,
    fmt::{self, Display},
    str::Utf8Error,
};

use facet_core::Shape;
use facet_reflect::ReflectError;

/// A boxed error returned by custom unmarshalers.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Error type for HTML unmarshalling.
#[derive(Debug)]
pub struct HtmlError {
    kind: HtmlErrorKind,
}

impl HtmlError {
    /// Returns a reference to the error kind for detailed error inspection.
    pub fn kind(&self) -> &HtmlErrorKind {
        &self.kind
    }

    /// Consumes the error, returning its kind.
    pub fn into_kind(self) -> HtmlErrorKind {
        self.kind
    }

    /// Returns the decode error if this is not a document read failure.
    pub fn as_unmarshal(&self) -> Option<&CannotUnmarshalError> {
        match &self.kind {
            HtmlErrorKind::Unmarshal(err) => Some(err),
            HtmlErrorKind::Read(_) | HtmlErrorKind::Reflect(_) => None,
        }
    }
}

impl Display for HtmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = &self.kind;
        write!(f, "{kind}")
    }
}

impl Error for HtmlError {}

impl<K: Into<HtmlErrorKind>> From<K> for HtmlError {
    fn from(value: K) -> Self {
        let kind = value.into();
        HtmlError { kind }
    }
}

/// Detailed classification of HTML unmarshalling errors.
#[derive(Debug)]
#[non_exhaustive]
pub enum HtmlErrorKind {
    /// The raw input could not be read as a document.
    Read(Utf8Error),
    /// The document was read but could not be unmarshalled into the destination.
    Unmarshal(CannotUnmarshalError),
    /// Error from the reflection system while allocating or building the destination.
    Reflect(ReflectError),
}

impl Display for HtmlErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HtmlErrorKind::Read(err) => write!(f, "document is not valid UTF-8: {err}"),
            HtmlErrorKind::Unmarshal(err) => write!(f, "{err}"),
            HtmlErrorKind::Reflect(err) => write!(f, "{err}"),
        }
    }
}

impl From<Utf8Error> for HtmlErrorKind {
    fn from(value: Utf8Error) -> Self {
        Self::Read(value)
    }
}

impl From<CannotUnmarshalError> for HtmlErrorKind {
    fn from(value: CannotUnmarshalError) -> Self {
        Self::Unmarshal(value)
    }
}

impl From<ReflectError> for HtmlErrorKind {
    fn from(value: ReflectError) -> Self {
        Self::Reflect(value)
    }
}

/// Why a decode step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// The destination reference is empty.
    NilValue,
    /// The destination cannot be written through.
    NonPointer,
    /// A leaf could not be parsed, the kind is unsupported, or a nested field failed.
    TypeConversionError,
    /// A fixed-size array did not match the number of selected nodes.
    ArrayLengthMismatch,
    /// A custom unmarshaler returned an error.
    CustomUnmarshalError,
}

impl Reason {
    /// The human-readable phrase used when rendering this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::NilValue => "destination argument is nil",
            Reason::NonPointer => "non-pointer value",
            Reason::TypeConversionError => "a type conversion error occurred",
            Reason::ArrayLengthMismatch => "array length does not match document elements found",
            Reason::CustomUnmarshalError => "a custom unmarshaler implementation returned an error",
        }
    }
}

impl Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where inside its owner a failing value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A named struct field (tuple fields use their index as name).
    Field(&'static str),
    /// An element of a slice or array.
    Index(usize),
}

/// A reason-tagged decode failure, optionally wrapping the failure that caused it.
///
/// Each nesting level that fails contributes one `CannotUnmarshalError`; the
/// chain can be walked with [`inner`](Self::inner) or [`chain`](Self::chain).
#[derive(Debug)]
pub struct CannotUnmarshalError {
    reason: Reason,
    type_name: Cow<'static, str>,
    selector: Option<String>,
    location: Option<Location>,
    detail: Option<Cow<'static, str>>,
    source: Option<BoxError>,
}

impl CannotUnmarshalError {
    /// Creates an error for a value of the named type.
    pub fn new(reason: Reason, type_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            reason,
            type_name: type_name.into(),
            selector: None,
            location: None,
            detail: None,
            source: None,
        }
    }

    /// Creates an error for a value of type `T`.
    pub fn for_type<T: ?Sized>(reason: Reason) -> Self {
        Self::new(reason, core::any::type_name::<T>())
    }

    /// Creates an error for a value of the reflected `shape`, named with its generics.
    pub fn for_shape(reason: Reason, shape: &Shape) -> Self {
        Self::new(reason, shape.to_string())
    }

    /// The destination reference of type `T` was empty.
    pub fn nil_value<T: ?Sized>() -> Self {
        Self::for_type::<T>(Reason::NilValue)
    }

    /// The destination of type `T` cannot be written through.
    pub fn non_pointer<T: ?Sized>() -> Self {
        Self::for_type::<T>(Reason::NonPointer)
    }

    /// An array of `shape` expected `expected` nodes but the selection held `found`.
    pub fn array_length_mismatch(shape: &Shape, expected: usize, found: usize) -> Self {
        Self::for_shape(Reason::ArrayLengthMismatch, shape)
            .with_detail(format!("expected {expected}, found {found}"))
    }

    /// The custom unmarshaler of `T` failed with `source`.
    pub fn custom<T: ?Sized>(source: impl Into<BoxError>) -> Self {
        Self::for_type::<T>(Reason::CustomUnmarshalError).with_source(source)
    }

    /// A value of `shape` cannot be unmarshalled from a document at all.
    pub fn unsupported(shape: &Shape, kind: &str) -> Self {
        Self::for_shape(Reason::TypeConversionError, shape)
            .with_detail(format!("unsupported kind: {kind}"))
    }

    /// The reflection system refused an operation on a value of `shape`.
    pub(crate) fn reflect(shape: &Shape, err: ReflectError) -> Self {
        Self::for_shape(Reason::TypeConversionError, shape).with_detail(err.to_string())
    }

    /// Records the selector that scoped the failing value. Empty selectors are ignored.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        if !selector.is_empty() {
            self.selector = Some(selector);
        }
        self
    }

    /// Records the field of the owner type that failed.
    pub fn with_field(mut self, field: &'static str) -> Self {
        self.location = Some(Location::Field(field));
        self
    }

    /// Records the element index of the owner collection that failed.
    pub fn with_index(mut self, index: usize) -> Self {
        self.location = Some(Location::Index(index));
        self
    }

    /// Adds a free-form explanation, rendered after the reason.
    pub fn with_detail(mut self, detail: impl Into<Cow<'static, str>>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Why this level failed.
    pub fn reason(&self) -> Reason {
        self.reason
    }

    /// Name of the type being unmarshalled at this level.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Selector in effect when this level failed, if any.
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    /// Field or element that failed within [`type_name`](Self::type_name).
    pub fn location(&self) -> Option<Location> {
        self.location
    }

    /// Name of the failing field, if this level is a struct.
    pub fn field(&self) -> Option<&'static str> {
        match self.location {
            Some(Location::Field(field)) => Some(field),
            _ => None,
        }
    }

    /// Index of the failing element, if this level is a collection.
    pub fn index(&self) -> Option<usize> {
        match self.location {
            Some(Location::Index(index)) => Some(index),
            _ => None,
        }
    }

    /// Extra explanation attached to this level.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// The next decode error in the chain, if the cause is one.
    pub fn inner(&self) -> Option<&CannotUnmarshalError> {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<CannotUnmarshalError>())
    }

    /// Consumes the error, returning its cause.
    pub fn into_source(self) -> Option<BoxError> {
        self.source
    }

    /// Iterates over this error and every nested decode error, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &CannotUnmarshalError> {
        std::iter::successors(Some(self), |err| err.inner())
    }

    /// The innermost decode error of the chain.
    pub fn root_cause(&self) -> &CannotUnmarshalError {
        let mut current = self;
        while let Some(inner) = current.inner() {
            current = inner;
        }
        current
    }
}

impl Display for CannotUnmarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an error occurred unmarshalling {}", self.type_name)?;
        match self.location {
            Some(Location::Field(field)) => write!(f, " field `{field}`")?,
            Some(Location::Index(index)) => write!(f, " index {index}")?,
            None => {}
        }
        if let Some(selector) = &self.selector {
            write!(f, " using selector '{selector}'")?;
        }
        write!(f, ": {}", self.reason)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

impl Error for CannotUnmarshalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Wild;

    impl Display for Wild {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a wild error appeared")
        }
    }

    impl Error for Wild {}

    fn page_error() -> CannotUnmarshalError {
        let leaf = CannotUnmarshalError::new(Reason::ArrayLengthMismatch, "[Resource; 1]")
            .with_detail("expected 1, found 5");
        CannotUnmarshalError::new(Reason::TypeConversionError, "Page")
            .with_field("resources")
            .with_selector(".resource")
            .with_source(leaf)
    }

    #[test]
    fn renders_one_level_per_message() {
        let outer = page_error();
        assert_eq!(
            outer.to_string(),
            "an error occurred unmarshalling Page field `resources` using selector \
             '.resource': a type conversion error occurred"
        );

        let inner = outer.inner().unwrap();
        assert_eq!(
            inner.to_string(),
            "an error occurred unmarshalling [Resource; 1]: array length does not match \
             document elements found (expected 1, found 5)"
        );
    }

    #[test]
    fn source_chain_yields_each_level_once() {
        let outer = page_error();
        let mut messages = Vec::new();
        let mut current: Option<&(dyn Error + 'static)> = Some(&outer);
        while let Some(err) = current {
            messages.push(err.to_string());
            current = err.source();
        }

        assert_eq!(messages.len(), 2);
        assert!(!messages[0].contains("array length"));
        assert!(messages[1].contains("array length"));
    }

    #[test]
    fn chain_walks_to_root_cause() {
        let custom = CannotUnmarshalError::custom::<u8>(Wild);
        let outer = CannotUnmarshalError::new(Reason::TypeConversionError, "Vec<u8>")
            .with_index(0)
            .with_source(custom);

        let reasons: Vec<Reason> = outer.chain().map(|err| err.reason()).collect();
        assert_eq!(
            reasons,
            [Reason::TypeConversionError, Reason::CustomUnmarshalError]
        );
        assert_eq!(outer.index(), Some(0));

        let root = outer.root_cause();
        assert_eq!(root.reason(), Reason::CustomUnmarshalError);
        assert!(root.inner().is_none());
        assert!(Error::source(root).unwrap().downcast_ref::<Wild>().is_some());
        assert!(!root.to_string().contains("wild"));
    }

    #[test]
    fn empty_selector_is_not_recorded() {
        let err = CannotUnmarshalError::nil_value::<str>().with_selector("");
        assert_eq!(err.selector(), None);
        assert_eq!(err.reason(), Reason::NilValue);
        assert_eq!(
            err.to_string(),
            "an error occurred unmarshalling str: destination argument is nil"
        );
    }

    #[test]
    fn html_error_exposes_unmarshal_kind() {
        let err: HtmlError = CannotUnmarshalError::non_pointer::<u8>().into();
        assert_eq!(
            err.as_unmarshal().map(|e| e.reason()),
            Some(Reason::NonPointer)
        );
        assert!(matches!(err.kind(), HtmlErrorKind::Unmarshal(_)));
    }
}
