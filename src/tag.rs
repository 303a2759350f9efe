//! Parsing of the `#[facet(html::selector = "...")]` field annotation.
//!
//! A tag is a selector, optionally followed by an extractor that says which
//! string a leaf value is read from:
//!
//! | tag                  | scope                  | leaf value                    |
//! |----------------------|------------------------|-------------------------------|
//! | `""`                 | inherited              | trimmed text                  |
//! | `".name"`            | `.name` matches        | trimmed text                  |
//! | `"a.more @[href]"`   | `a.more` matches       | `href` of the first match     |
//! | `".body @html"`      | `.body` matches        | inner HTML of the first match |
//! | `"@text"`            | inherited              | trimmed text                  |
//! | `"!ignore"`          | field is skipped       |                               |

/// Which string a leaf value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extract<'t> {
    /// Concatenated text of every selected node.
    #[default]
    Text,
    /// Inner HTML of the first selected node.
    Html,
    /// Value of the named attribute on the first selected node.
    Attr(&'t str),
}

/// A parsed field annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tag<'t> {
    selector: &'t str,
    extract: Extract<'t>,
    ignored: bool,
}

const IGNORE: &str = "!ignore";

impl<'t> Tag<'t> {
    /// The tag of a field without annotation: inherit the scope, read text.
    pub const EMPTY: Tag<'static> = Tag {
        selector: "",
        extract: Extract::Text,
        ignored: false,
    };

    /// Parses an annotation. Parsing never fails: anything that is not a
    /// recognised extractor suffix is part of the selector.
    pub fn parse(raw: &'t str) -> Self {
        let raw = raw.trim();
        if raw == IGNORE {
            return Tag {
                ignored: true,
                ..Tag::EMPTY
            };
        }

        if let Some(at) = extractor_at(raw) {
            if let Some(extract) = parse_extract(&raw[at + 1..]) {
                return Tag {
                    selector: raw[..at].trim_end(),
                    extract,
                    ignored: false,
                };
            }
        }

        Tag {
            selector: raw,
            ..Tag::EMPTY
        }
    }

    /// The selector narrowing the scope; empty means the scope is inherited.
    pub fn selector(&self) -> &'t str {
        self.selector
    }

    /// Which string leaf values are read from.
    pub fn extract(&self) -> Extract<'t> {
        self.extract
    }

    /// Whether the field is excluded from unmarshalling.
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// The tag applied to each element of a collection: the collection already
    /// narrowed the scope, so only the extractor carries over.
    pub fn element(&self) -> Tag<'t> {
        Tag {
            selector: "",
            ..*self
        }
    }
}

/// Byte offset of the last `@` that is outside brackets, parentheses and
/// quoted strings. Any other `@` belongs to the selector.
fn extractor_at(raw: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut escaped = false;
    let mut last = None;

    for (at, c) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, '@') if depth == 0 => last = Some(at),
            (None, _) => {}
        }
    }
    last
}

fn parse_extract(suffix: &str) -> Option<Extract<'_>> {
    let suffix = suffix.trim();
    match suffix {
        "text" => Some(Extract::Text),
        "html" => Some(Extract::Html),
        _ => {
            let name = suffix.strip_prefix('[')?.strip_suffix(']')?.trim();
            (!name.is_empty()).then_some(Extract::Attr(name))
        }
    }
}
