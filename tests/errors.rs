use std::{error::Error, fmt};

use facet::Facet;
use html_unmarshal::{
    BoxError, CannotUnmarshalError, ElementRef, HtmlError, HtmlErrorKind, Reason, UnmarshalHtml,
    Unmarshaler,
};
use html_unmarshal as html;
use indoc::indoc;

const PAGE: &str = indoc! {r#"
    <ul id="resources">
      <li class="resource"><div class="name">Foo</div></li>
      <li class="resource"><div class="name">Bar</div></li>
      <li class="resource"><div class="name">Baz</div></li>
      <li class="resource"><div class="name">Bang</div></li>
      <li class="resource"><div class="name">Zip</div></li>
    </ul>
    <div class="foobar">
      <foo>true</foo>
      <int>-123</int>
    </div>
"#};

#[derive(Facet, Default, Debug)]
struct Page {
    #[facet(html::selector = "#resources .resource")]
    resources: Vec<Resource>,
}

#[derive(Facet, Default, Debug)]
struct Resource {
    #[facet(html::selector = ".name")]
    name: String,
}

#[derive(Debug)]
struct WildError;

impl fmt::Display for WildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("A wild error appeared")
    }
}

impl Error for WildError {}

#[derive(Facet, Default, Debug)]
#[facet(html::custom)]
struct ErrorFooBar;

impl UnmarshalHtml for ErrorFooBar {
    fn unmarshal_html(&mut self, _nodes: &[ElementRef<'_>]) -> Result<(), BoxError> {
        Err(Box::new(WildError))
    }
}

fn unmarshal_error(err: &HtmlError) -> &CannotUnmarshalError {
    match err.kind() {
        HtmlErrorKind::Unmarshal(err) => err,
        other => panic!("expected an unmarshal error, got {other}"),
    }
}

// ============================================================================
// Destination checks
// ============================================================================

#[test]
fn nil_destination() {
    let err = html_unmarshal::unmarshal(b"", None::<&mut Page>).unwrap_err();
    let e = unmarshal_error(&err);
    assert_eq!(e.reason(), Reason::NilValue);
    assert!(e.type_name().ends_with("Page"));
}

#[test]
fn non_pointer_destination() {
    let page = Page::default();
    let err = html_unmarshal::unmarshal(b"", &page).unwrap_err();
    let e = unmarshal_error(&err);
    assert_eq!(e.reason(), Reason::NonPointer);
    assert!(err.to_string().contains("non-pointer value"));
}

// ============================================================================
// Error chains
// ============================================================================

#[test]
fn custom_unmarshal_error() {
    let mut a: Vec<ErrorFooBar> = Vec::new();
    let err = Unmarshaler::new()
        .with_custom::<ErrorFooBar>()
        .unmarshal(PAGE.as_bytes(), &mut a)
        .unwrap_err();

    assert!(err.to_string().contains("an error occurred"));

    let e = unmarshal_error(&err);
    assert_eq!(e.reason(), Reason::TypeConversionError);
    assert_eq!(e.index(), Some(0));

    let e2 = e.inner().expect("element error");
    assert_eq!(e2.reason(), Reason::CustomUnmarshalError);
    assert!(e2.type_name().ends_with("ErrorFooBar"));
    assert!(e2.inner().is_none());

    let cause = Error::source(e2).expect("hook error");
    assert!(cause.downcast_ref::<WildError>().is_some());
    assert_eq!(cause.to_string(), "A wild error appeared");
    assert!(!e2.to_string().contains("wild"));
}

#[test]
fn wrong_array_length() {
    #[derive(Facet, Debug)]
    struct A {
        #[facet(html::selector = ".resource")]
        resources: [Resource; 1],
    }

    let mut a = A {
        resources: [Resource::default()],
    };
    let err = html_unmarshal::unmarshal(PAGE.as_bytes(), &mut a).unwrap_err();

    let e = unmarshal_error(&err);
    assert_eq!(e.reason(), Reason::TypeConversionError);
    assert_eq!(e.field(), Some("resources"));
    assert_eq!(e.selector(), Some(".resource"));

    let e2 = e.inner().expect("array error");
    assert_eq!(e2.reason(), Reason::ArrayLengthMismatch);
    assert_eq!(e2.detail(), Some("expected 1, found 5"));

    assert!(!e.to_string().contains("array length"));
    let message = e2.to_string();
    assert!(message.contains("Resource"));
    assert!(message.contains("array length"));
}

#[test]
fn invalid_literal() {
    #[derive(Facet, Default, Debug)]
    struct A {
        #[facet(html::selector = "foo")]
        foo: i32,
    }

    let mut a = A::default();
    let err = html_unmarshal::unmarshal(PAGE.as_bytes(), &mut a).unwrap_err();

    let e = unmarshal_error(&err);
    assert_eq!(e.reason(), Reason::TypeConversionError);
    let e2 = e.inner().expect("leaf error");
    assert_eq!(e2.reason(), Reason::TypeConversionError);
    assert_eq!(e2.type_name(), "i32");
    assert!(
        Error::source(e2)
            .unwrap()
            .downcast_ref::<std::num::ParseIntError>()
            .is_some()
    );
    assert!(e2.to_string().contains("invalid literal 'true'"));
    assert!(!err.to_string().contains("invalid literal"));
}

#[test]
fn every_nesting_level_is_reported() {
    #[derive(Facet, Default, Debug)]
    struct Outer {
        #[facet(html::selector = ".foobar")]
        inner: Inner,
    }

    #[derive(Facet, Default, Debug)]
    struct Inner {
        #[facet(html::selector = "foo")]
        values: Vec<u8>,
    }

    let err = html_unmarshal::from_str::<Outer>(PAGE).unwrap_err();
    let e = unmarshal_error(&err);

    let levels: Vec<(Reason, Option<&str>, Option<usize>)> = e
        .chain()
        .map(|level| (level.reason(), level.field(), level.index()))
        .collect();
    assert_eq!(
        levels,
        [
            (Reason::TypeConversionError, Some("inner"), None),
            (Reason::TypeConversionError, Some("values"), None),
            (Reason::TypeConversionError, None, Some(0)),
            (Reason::TypeConversionError, None, None),
        ]
    );
    assert_eq!(e.root_cause().type_name(), "u8");
}

#[test]
fn first_failing_field_wins_and_destination_is_kept() {
    #[derive(Facet, Default, Debug)]
    struct A {
        #[facet(html::selector = ".name")]
        first: String,
        #[facet(html::selector = "foo")]
        broken: u8,
        #[facet(html::selector = "int")]
        also_broken: u8,
        #[facet(html::selector = "int")]
        never_reached: i32,
    }

    let mut a = A {
        first: "kept".into(),
        ..A::default()
    };
    let err = html_unmarshal::unmarshal_str(PAGE, &mut a).unwrap_err();

    let e = unmarshal_error(&err);
    assert_eq!(e.field(), Some("broken"));
    assert_eq!(a.first, "kept");
    assert_eq!(a.never_reached, 0);
}

#[test]
fn unsupported_enum_kind() {
    #[derive(Facet, Debug)]
    #[repr(u8)]
    #[allow(dead_code)]
    enum Figure {
        Circle(f64),
        Square { side: f64 },
    }

    let err = html_unmarshal::from_str::<Figure>(PAGE).unwrap_err();
    let e = unmarshal_error(&err);
    assert_eq!(e.reason(), Reason::TypeConversionError);
    assert!(e.to_string().contains("unsupported kind"));
}
