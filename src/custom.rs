use std::collections::HashMap;

use facet::Facet;
use facet_core::Shape;
use scraper::ElementRef;

use crate::{
    error::{BoxError, CannotUnmarshalError, Reason},
    selection::Selection,
    tag::Tag,
    walk::Wip,
};

/// A type that decodes itself from the raw nodes of its scope.
///
/// Implementing this trait does nothing by itself. The type opts in with
/// `#[facet(html::custom)]` and is registered on an
/// [`Unmarshaler`](crate::Unmarshaler) with
/// [`with_custom`](crate::Unmarshaler::with_custom). Generic field traversal
/// is then skipped for the type entirely.
///
/// Use [`Selection::from_nodes`] to get back into the selector machinery.
pub trait UnmarshalHtml {
    /// Populates `self` from the nodes matched for this value, in document order.
    fn unmarshal_html(&mut self, nodes: &[ElementRef<'_>]) -> Result<(), BoxError>;
}

type DecodeFn = fn(Wip, &[ElementRef<'_>]) -> Result<Wip, CannotUnmarshalError>;

/// Registered custom unmarshalers, keyed by the shape they produce.
#[derive(Default, Clone)]
pub(crate) struct CustomDecoders {
    decoders: HashMap<&'static Shape, DecodeFn>,
}

impl CustomDecoders {
    pub(crate) fn register<T>(&mut self)
    where
        T: UnmarshalHtml + Default + Facet<'static>,
    {
        if !is_custom(T::SHAPE) {
            log::warn!(
                "`{}` implements UnmarshalHtml but is not marked #[facet(html::custom)]",
                T::SHAPE
            );
        }
        self.decoders.insert(T::SHAPE, decode_with::<T>);
    }

    /// Hands the nodes of `selection` narrowed by `tag` to the unmarshaler of `wip`'s shape.
    pub(crate) fn dispatch(
        &self,
        wip: Wip,
        selection: &Selection<'_>,
        tag: &Tag<'_>,
    ) -> Result<Wip, CannotUnmarshalError> {
        let shape = wip.shape();
        let Some(decode) = self.decoders.get(shape) else {
            return Err(
                CannotUnmarshalError::for_shape(Reason::CustomUnmarshalError, shape)
                    .with_detail("no custom unmarshaler registered"),
            );
        };

        let scope = selection.narrow(tag);
        log::trace!("Dispatching {} nodes to custom unmarshaler of `{shape}`", scope.len());
        decode(wip, scope.nodes())
    }
}

/// True if the type carries `#[facet(html::custom)]`.
pub(crate) fn is_custom(shape: &Shape) -> bool {
    shape
        .attributes
        .iter()
        .any(|attr| attr.ns == Some("html") && attr.key == "custom")
}

fn decode_with<T>(wip: Wip, nodes: &[ElementRef<'_>]) -> Result<Wip, CannotUnmarshalError>
where
    T: UnmarshalHtml + Default + Facet<'static>,
{
    let mut value = T::default();
    value
        .unmarshal_html(nodes)
        .map_err(|err| CannotUnmarshalError::custom::<T>(err))?;
    wip.set(value)
        .map_err(|err| CannotUnmarshalError::reflect(T::SHAPE, err))
}
