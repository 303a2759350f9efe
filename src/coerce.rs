//! Conversion of extracted text into scalar values.

use std::{error::Error, str::FromStr};

use facet_core::{Type, UserType, Variant};

use crate::{
    error::{CannotUnmarshalError, Reason},
    walk::Wip,
};

/// A value parsed from the trimmed string selected by a tag.
///
/// The destination type alone decides how text is parsed; nothing is
/// inferred from the content.
pub(crate) trait FromText: Sized {
    /// Parses already-trimmed text.
    fn from_text(text: &str) -> Result<Self, CannotUnmarshalError>;
}

fn parse_std<T>(text: &str) -> Result<T, CannotUnmarshalError>
where
    T: FromStr,
    T::Err: Error + Send + Sync + 'static,
{
    text.parse::<T>().map_err(|err| {
        CannotUnmarshalError::for_type::<T>(Reason::TypeConversionError)
            .with_detail(format!("invalid literal '{text}'"))
            .with_source(err)
    })
}

impl FromText for String {
    fn from_text(text: &str) -> Result<Self, CannotUnmarshalError> {
        Ok(text.to_owned())
    }
}

impl FromText for bool {
    fn from_text(text: &str) -> Result<Self, CannotUnmarshalError> {
        match text {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(
                CannotUnmarshalError::for_type::<bool>(Reason::TypeConversionError)
                    .with_detail(format!("invalid boolean literal '{other}'")),
            ),
        }
    }
}

impl FromText for char {
    fn from_text(text: &str) -> Result<Self, CannotUnmarshalError> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(
                CannotUnmarshalError::for_type::<char>(Reason::TypeConversionError)
                    .with_detail(format!("expected a single character, got '{text}'")),
            ),
        }
    }
}

macro_rules! from_text_via_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromText for $ty {
                fn from_text(text: &str) -> Result<Self, CannotUnmarshalError> {
                    parse_std(text)
                }
            }
        )*
    };
}

from_text_via_from_str!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

fn set_parsed<T>(wip: Wip, text: &str) -> Result<Wip, CannotUnmarshalError>
where
    T: FromText + facet::Facet<'static>,
{
    let value = T::from_text(text)?;
    wip.set(value)
        .map_err(|err| CannotUnmarshalError::reflect(T::SHAPE, err))
}

/// Parses `text` into the scalar under construction in `wip`.
///
/// Primitives are matched by type identifier. Any other scalar is parsed
/// through its `FromStr` implementation when it has one.
pub(crate) fn set_text(wip: Wip, text: &str) -> Result<Wip, CannotUnmarshalError> {
    let shape = wip.shape();
    log::trace!("Coercing '{text}' into `{shape}`");

    match shape.type_identifier {
        "String" => set_parsed::<String>(wip, text),
        "bool" => set_parsed::<bool>(wip, text),
        "char" => set_parsed::<char>(wip, text),
        "i8" => set_parsed::<i8>(wip, text),
        "i16" => set_parsed::<i16>(wip, text),
        "i32" => set_parsed::<i32>(wip, text),
        "i64" => set_parsed::<i64>(wip, text),
        "i128" => set_parsed::<i128>(wip, text),
        "isize" => set_parsed::<isize>(wip, text),
        "u8" => set_parsed::<u8>(wip, text),
        "u16" => set_parsed::<u16>(wip, text),
        "u32" => set_parsed::<u32>(wip, text),
        "u64" => set_parsed::<u64>(wip, text),
        "u128" => set_parsed::<u128>(wip, text),
        "usize" => set_parsed::<usize>(wip, text),
        "f32" => set_parsed::<f32>(wip, text),
        "f64" => set_parsed::<f64>(wip, text),
        _ if shape.vtable.has_parse() => wip.parse_from_str(text).map_err(|err| {
            CannotUnmarshalError::for_shape(Reason::TypeConversionError, shape)
                .with_detail(format!("invalid literal '{text}'"))
                .with_source(err.to_string())
        }),
        _ => Err(CannotUnmarshalError::unsupported(shape, "scalar without FromStr")),
    }
}

/// Display name of a unit variant: its `rename`, or the variant name.
fn variant_name(variant: &Variant) -> &'static str {
    variant
        .get_builtin_attr("rename")
        .and_then(|attr| attr.get_as::<&str>().copied())
        .unwrap_or(variant.name)
}

/// Selects the unit variant of the enum in `wip` whose name equals `text`.
pub(crate) fn set_variant(wip: Wip, text: &str) -> Result<Wip, CannotUnmarshalError> {
    let shape = wip.shape();
    let Type::User(UserType::Enum(enum_type)) = &shape.ty else {
        return Err(CannotUnmarshalError::unsupported(shape, "non-enum"));
    };

    let Some(variant) = enum_type
        .variants
        .iter()
        .find(|variant| variant_name(variant) == text)
    else {
        let expected: Vec<&str> = enum_type.variants.iter().map(variant_name).collect();
        return Err(
            CannotUnmarshalError::for_shape(Reason::TypeConversionError, shape).with_detail(
                format!(
                    "unknown variant '{text}', expected one of: {}",
                    expected.join(", ")
                ),
            ),
        );
    };

    log::trace!("Selecting variant `{}` of `{shape}`", variant.name);
    wip.select_variant_named(variant.name)
        .map_err(|err| CannotUnmarshalError::reflect(shape, err))
}
