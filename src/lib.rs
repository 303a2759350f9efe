#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
// Unit tests use the `html::` attributes, which resolve through `::html_unmarshal`.
#![cfg_attr(test, allow(macro_expanded_macro_exports_accessed_by_absolute_paths))]

extern crate self as html_unmarshal;

mod coerce;
mod custom;
mod error;
mod selection;
mod tag;
mod walk;

use facet::Facet;
use facet_reflect::Partial;
use scraper::Html;

pub use custom::UnmarshalHtml;
pub use error::{BoxError, CannotUnmarshalError, HtmlError, HtmlErrorKind, Location, Reason};
pub use selection::Selection;
pub use tag::{Extract, Tag};

// Re-exported so that documentation and users can name the node type.
pub use scraper::ElementRef;

use custom::CustomDecoders;
use walk::Walker;

// Field and container attributes, written with the crate imported as `html`:
//   #[facet(html::selector = "...")]
//   #[facet(html::custom)]
facet::define_attr_grammar! {
    ns "html";
    crate_path ::html_unmarshal;

    /// HTML attribute types for field and container configuration.
    pub enum Attr {
        /// Selector and optional extractor for a field.
        ///
        /// Usage: `#[facet(html::selector = "a.more @[href]")]`
        ///
        /// See [`Tag`] for the grammar. A field without one inherits the
        /// scope of its parent.
        Selector(&'static str),
        /// Marks a type as decoded by its [`UnmarshalHtml`] implementation.
        ///
        /// Usage: `#[facet(html::custom)]`
        Custom,
    }
}

type Result<T> = std::result::Result<T, HtmlError>;

/// A reference to the value being unmarshalled into.
///
/// `&mut T` is always a valid destination. An `Option<&mut T>` that is `None`
/// fails with [`Reason::NilValue`]. A shared `&T` fails with
/// [`Reason::NonPointer`], since nothing written to it would be observable.
pub trait Destination {
    /// The type being unmarshalled.
    type Target: Facet<'static>;

    /// Resolves the destination to the value to populate.
    fn target(&mut self) -> std::result::Result<&mut Self::Target, CannotUnmarshalError>;
}

impl<T: Facet<'static>> Destination for &mut T {
    type Target = T;

    fn target(&mut self) -> std::result::Result<&mut T, CannotUnmarshalError> {
        Ok(&mut **self)
    }
}

impl<T: Facet<'static>> Destination for Option<&mut T> {
    type Target = T;

    fn target(&mut self) -> std::result::Result<&mut T, CannotUnmarshalError> {
        match self {
            Some(value) => Ok(&mut **value),
            None => Err(CannotUnmarshalError::nil_value::<T>()),
        }
    }
}

impl<T: Facet<'static>> Destination for &T {
    type Target = T;

    fn target(&mut self) -> std::result::Result<&mut T, CannotUnmarshalError> {
        Err(CannotUnmarshalError::non_pointer::<T>().with_detail("got a shared reference"))
    }
}

/// Decodes documents, with a set of registered custom unmarshalers.
///
/// The free functions of this crate use an `Unmarshaler` with nothing
/// registered. A type marked `#[facet(html::custom)]` must be registered with
/// [`with_custom`](Self::with_custom) before it can be decoded.
///
/// # Example
/// ```
/// use facet::Facet;
/// use html_unmarshal::{BoxError, ElementRef, Unmarshaler, UnmarshalHtml};
/// use html_unmarshal as html;
///
/// #[derive(Facet, Default, Debug)]
/// #[facet(html::custom)]
/// struct Count(usize);
///
/// impl UnmarshalHtml for Count {
///     fn unmarshal_html(&mut self, nodes: &[ElementRef<'_>]) -> Result<(), BoxError> {
///         self.0 = nodes.len();
///         Ok(())
///     }
/// }
///
/// #[derive(Facet, Default, Debug)]
/// struct Menu {
///     #[facet(html::selector = "li")]
///     items: Count,
/// }
///
/// # fn main() -> Result<(), html_unmarshal::HtmlError> {
/// let menu: Menu = Unmarshaler::new()
///     .with_custom::<Count>()
///     .from_str("<ul><li>a</li><li>b</li></ul>")?;
/// assert_eq!(menu.items.0, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Default, Clone)]
pub struct Unmarshaler {
    custom: CustomDecoders,
}

impl Unmarshaler {
    /// An unmarshaler with no custom unmarshalers registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the [`UnmarshalHtml`] implementation of `T`.
    pub fn with_custom<T>(mut self) -> Self
    where
        T: UnmarshalHtml + Default + Facet<'static>,
    {
        self.custom.register::<T>();
        self
    }

    /// Unmarshal a raw HTML document into `dst`.
    pub fn unmarshal<D: Destination>(&self, raw: &[u8], mut dst: D) -> Result<()> {
        log::trace!("Entering `unmarshal` method");

        let target = dst.target()?;
        let source = std::str::from_utf8(raw)?;
        let document = Html::parse_document(source);
        log::trace!("Document parsed");

        *target = self.decode(&Selection::document(&document))?;
        Ok(())
    }

    /// Unmarshal an HTML string into `dst`.
    pub fn unmarshal_str<D: Destination>(&self, source: &str, mut dst: D) -> Result<()> {
        let target = dst.target()?;
        let document = Html::parse_document(source);
        *target = self.decode(&Selection::document(&document))?;
        Ok(())
    }

    /// Unmarshal an already parsed document into `dst`.
    pub fn unmarshal_document<D: Destination>(&self, document: &Html, mut dst: D) -> Result<()> {
        let target = dst.target()?;
        *target = self.decode(&Selection::document(document))?;
        Ok(())
    }

    /// Unmarshal from an arbitrary selection, as if it were the whole document.
    pub fn unmarshal_selection<D: Destination>(
        &self,
        selection: &Selection<'_>,
        mut dst: D,
    ) -> Result<()> {
        let target = dst.target()?;
        *target = self.decode(selection)?;
        Ok(())
    }

    /// Build a `T` from an HTML string.
    pub fn from_str<T: Facet<'static>>(&self, source: &str) -> Result<T> {
        log::trace!("Entering `from_str` method");

        let document = Html::parse_document(source);
        self.decode(&Selection::document(&document))
    }

    fn decode<T: Facet<'static>>(&self, selection: &Selection<'_>) -> Result<T> {
        let wip = Partial::alloc_owned::<T>()?;
        log::trace!("Allocated WIP for type {}", wip.shape());

        let wip = Walker::new(&self.custom).walk(wip, selection, &Tag::EMPTY)?;
        let value = wip.build()?.materialize::<T>()?;
        log::trace!("WIP fully built");
        Ok(value)
    }
}

/// Unmarshal a raw HTML document into `dst`.
///
/// The destination is checked before the document is read. Input that is
/// not UTF-8 fails with [`HtmlErrorKind::Read`]; every other failure is a
/// chained [`CannotUnmarshalError`]. On failure `dst` keeps its previous value.
///
/// # Example
/// ```
/// use facet::Facet;
/// use html_unmarshal as html;
///
/// #[derive(Facet, Default, Debug)]
/// struct Listing {
///     #[facet(html::selector = "h1")]
///     title: String,
///     #[facet(html::selector = "li a @[href]")]
///     links: Vec<String>,
/// }
///
/// # fn main() -> Result<(), html_unmarshal::HtmlError> {
/// let raw = br#"<h1> Docs </h1><ul><li><a href="/a">A</a></li><li><a href="/b">B</a></li></ul>"#;
/// let mut listing = Listing::default();
/// html_unmarshal::unmarshal(raw, &mut listing)?;
/// assert_eq!(listing.title, "Docs");
/// assert_eq!(listing.links, ["/a", "/b"]);
/// # Ok(())
/// # }
/// ```
pub fn unmarshal<D: Destination>(raw: &[u8], dst: D) -> Result<()> {
    Unmarshaler::new().unmarshal(raw, dst)
}

/// Unmarshal an HTML string into `dst`.
pub fn unmarshal_str<D: Destination>(source: &str, dst: D) -> Result<()> {
    Unmarshaler::new().unmarshal_str(source, dst)
}

/// Unmarshal an already parsed document into `dst`.
pub fn unmarshal_document<D: Destination>(document: &Html, dst: D) -> Result<()> {
    Unmarshaler::new().unmarshal_document(document, dst)
}

/// Unmarshal from an arbitrary selection, as if it were the whole document.
pub fn unmarshal_selection<D: Destination>(selection: &Selection<'_>, dst: D) -> Result<()> {
    Unmarshaler::new().unmarshal_selection(selection, dst)
}

/// Build a `T` from an HTML string.
///
/// # Example
/// ```
/// use facet::Facet;
/// use html_unmarshal as html;
///
/// #[derive(Facet)]
/// struct Price {
///     #[facet(html::selector = ".amount")]
///     amount: f64,
///     #[facet(html::selector = ".currency @[title]")]
///     currency: String,
/// }
///
/// # fn main() -> Result<(), html_unmarshal::HtmlError> {
/// let price: Price = html_unmarshal::from_str(
///     r#"<span class="amount">12.50</span><abbr class="currency" title="EUR">€</abbr>"#,
/// )?;
/// assert_eq!(price.amount, 12.5);
/// assert_eq!(price.currency, "EUR");
/// # Ok(())
/// # }
/// ```
pub fn from_str<T: Facet<'static>>(source: &str) -> Result<T> {
    Unmarshaler::new().from_str(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_destination_is_rejected_before_reading() {
        let err = unmarshal(&[0xff], None::<&mut String>).unwrap_err();
        assert_eq!(
            err.as_unmarshal().map(|e| e.reason()),
            Some(Reason::NilValue)
        );
    }

    #[test]
    fn shared_reference_is_not_a_destination() {
        let value = String::new();
        let err = unmarshal_str("<p>x</p>", &value).unwrap_err();
        assert_eq!(
            err.as_unmarshal().map(|e| e.reason()),
            Some(Reason::NonPointer)
        );
    }

    #[test]
    fn invalid_utf8_is_a_read_error() {
        let mut value = String::new();
        let err = unmarshal(&[b'<', 0xff, b'>'], &mut value).unwrap_err();
        assert!(matches!(err.kind(), HtmlErrorKind::Read(_)));
    }

    #[test]
    fn root_scope_is_the_whole_document() {
        let mut title = String::new();
        unmarshal_str("<title>x</title><p> hello </p>", &mut title).unwrap();
        assert_eq!(title, "x hello");

        let mut some: Option<&mut String> = Some(&mut title);
        unmarshal_str("<p>again</p>", some.take()).unwrap();
        assert_eq!(title, "again");
    }

    #[test]
    fn failed_decode_leaves_destination_unchanged() {
        let mut value = 7u8;
        let err = unmarshal_str("<p>x</p>", &mut value).unwrap_err();
        assert!(err.as_unmarshal().is_some());
        assert_eq!(value, 7);
    }
}
