//! The recursive walker that resolves a destination's shape against a selection.

use facet_core::{Characteristic, Def, Shape, StructKind, StructType, Type, UserType};
use facet_reflect::{Partial, ReflectError};

use crate::{
    coerce,
    custom::{self, CustomDecoders},
    error::{CannotUnmarshalError, Reason},
    selection::Selection,
    tag::Tag,
};

/// The value under construction. Documents are never borrowed from.
pub(crate) type Wip = Partial<'static, false>;

fn reflect(shape: &'static Shape) -> impl Fn(ReflectError) -> CannotUnmarshalError {
    move |err| CannotUnmarshalError::reflect(shape, err)
}

/// Reads the selector attached to a field with `#[facet(html::selector = "...")]`.
fn field_selector(field: &facet_core::Field) -> &'static str {
    field
        .get_attr(Some("html"), "selector")
        .and_then(|attr| attr.get_as::<&str>().copied())
        .unwrap_or("")
}

/// Walks a shape depth first, filling the value in `wip` from a selection.
///
/// `tag` is the annotation of the field holding the value being built; the
/// walker narrows the selection by it before reading. Struct fields are
/// visited in declaration order and the first failing field stops the walk.
pub(crate) struct Walker<'c> {
    custom: &'c CustomDecoders,
}

impl<'c> Walker<'c> {
    pub(crate) fn new(custom: &'c CustomDecoders) -> Self {
        Self { custom }
    }

    pub(crate) fn walk(
        &self,
        mut wip: Wip,
        selection: &Selection<'_>,
        tag: &Tag<'_>,
    ) -> Result<Wip, CannotUnmarshalError> {
        let shape = wip.shape();
        log::trace!("Entering `walk` for `{shape}`");

        if custom::is_custom(shape) {
            return self.custom.dispatch(wip, selection, tag);
        }

        // `None` is never produced: an optional value is always `Some` once walked.
        if matches!(shape.def, Def::Option(_)) {
            wip = wip.begin_some().map_err(reflect(shape))?;
            wip = self.walk(wip, selection, tag)?;
            return wip.end().map_err(reflect(shape));
        }

        if matches!(shape.def, Def::Pointer(_)) {
            return self.walk_pointer(wip, selection, tag);
        }

        let is_opaque_scalar =
            matches!(shape.def, Def::Scalar) && matches!(shape.ty, Type::User(UserType::Opaque));
        if shape.inner.is_some()
            && !is_opaque_scalar
            && !matches!(
                &shape.def,
                Def::List(_) | Def::Map(_) | Def::Set(_) | Def::Array(_)
            )
        {
            wip = wip.begin_inner().map_err(reflect(shape))?;
            wip = self.walk(wip, selection, tag)?;
            return wip.end().map_err(reflect(shape));
        }

        match &shape.ty {
            Type::User(UserType::Struct(struct_type)) => {
                return self.walk_struct(wip, struct_type, selection, tag);
            }
            Type::User(UserType::Enum(enum_type)) => {
                if !enum_type
                    .variants
                    .iter()
                    .all(|variant| matches!(variant.data.kind, StructKind::Unit))
                {
                    return Err(CannotUnmarshalError::unsupported(shape, "enum with data"));
                }
                let scope = selection.narrow(tag);
                return coerce::set_variant(wip, &scope.value(tag.extract()));
            }
            _ => {}
        }

        match &shape.def {
            Def::Scalar => {
                let scope = selection.narrow(tag);
                coerce::set_text(wip, &scope.value(tag.extract()))
            }
            Def::List(_) => {
                let scope = selection.narrow(tag);
                log::trace!("Entering list `{shape}` with {} matches", scope.len());
                wip = wip.begin_list().map_err(reflect(shape))?;
                self.walk_items(wip, shape, &scope, tag)
            }
            Def::Array(array_def) => {
                let scope = selection.narrow(tag);
                log::trace!("Entering array `{shape}` with {} matches", scope.len());
                if scope.len() != array_def.n {
                    return Err(CannotUnmarshalError::array_length_mismatch(
                        shape,
                        array_def.n,
                        scope.len(),
                    ));
                }

                for (index, node) in scope.iter().enumerate() {
                    wip = wip.begin_nth_field(index).map_err(reflect(shape))?;
                    wip = self
                        .walk(wip, &node, &tag.element())
                        .map_err(|err| element_error(shape, index, err))?;
                    wip = wip.end().map_err(reflect(shape))?;
                }
                Ok(wip)
            }
            Def::Map(_) => Err(CannotUnmarshalError::unsupported(shape, "map")),
            Def::Set(_) => Err(CannotUnmarshalError::unsupported(shape, "set")),
            _ => Err(CannotUnmarshalError::unsupported(shape, "unknown")),
        }
    }

    fn walk_pointer(
        &self,
        mut wip: Wip,
        selection: &Selection<'_>,
        tag: &Tag<'_>,
    ) -> Result<Wip, CannotUnmarshalError> {
        let shape = wip.shape();
        wip = wip.begin_smart_ptr().map_err(reflect(shape))?;

        if wip.is_building_smart_ptr_slice() {
            let scope = selection.narrow(tag);
            log::trace!("Entering slice `{shape}` with {} matches", scope.len());
            wip = self.walk_items(wip, shape, &scope, tag)?;
        } else {
            wip = self.walk(wip, selection, tag)?;
        }
        wip.end().map_err(reflect(shape))
    }

    /// Pushes one list item per node of `scope`, in order.
    fn walk_items(
        &self,
        mut wip: Wip,
        shape: &'static Shape,
        scope: &Selection<'_>,
        tag: &Tag<'_>,
    ) -> Result<Wip, CannotUnmarshalError> {
        for (index, node) in scope.iter().enumerate() {
            wip = wip.begin_list_item().map_err(reflect(shape))?;
            wip = self
                .walk(wip, &node, &tag.element())
                .map_err(|err| element_error(shape, index, err))?;
            wip = wip.end().map_err(reflect(shape))?;
        }
        Ok(wip)
    }

    fn walk_struct(
        &self,
        mut wip: Wip,
        struct_type: &StructType,
        selection: &Selection<'_>,
        tag: &Tag<'_>,
    ) -> Result<Wip, CannotUnmarshalError> {
        let shape = wip.shape();
        if struct_type.fields.is_empty() {
            if shape.is(Characteristic::Default) {
                wip = wip.set_default().map_err(reflect(shape))?;
            }
            return Ok(wip);
        }

        let scope = selection.narrow(tag);
        for (index, field) in struct_type.fields.iter().enumerate() {
            let field_tag = Tag::parse(field_selector(field));
            if field.should_skip_deserializing() || field_tag.is_ignored() {
                log::trace!("Skipping field `{}` of `{shape}`", field.name);
                wip = wip.set_nth_field_to_default(index).map_err(reflect(shape))?;
                continue;
            }

            log::trace!(
                "Entering field `{}` of `{shape}` with selector '{}'",
                field.name,
                field_tag.selector()
            );
            wip = wip.begin_nth_field(index).map_err(reflect(shape))?;
            wip = self.walk(wip, &scope, &field_tag).map_err(|err| {
                CannotUnmarshalError::for_shape(Reason::TypeConversionError, shape)
                    .with_field(field.name)
                    .with_selector(field_tag.selector())
                    .with_source(err)
            })?;
            wip = wip.end().map_err(reflect(shape))?;
        }
        Ok(wip)
    }
}

fn element_error(shape: &Shape, index: usize, err: CannotUnmarshalError) -> CannotUnmarshalError {
    CannotUnmarshalError::for_shape(Reason::TypeConversionError, shape)
        .with_index(index)
        .with_source(err)
}
