/// Turns the items a source produced into what the caller wants to return.
pub trait ListResultConverter<I>: Send + Sync {
    type Output: Send;

    fn convert(&self, items: Vec<I>) -> Vec<Self::Output>;
}

/// Returns items unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConvertResultConverter;

impl<I: Send> ListResultConverter<I> for NoConvertResultConverter {
    type Output = I;

    fn convert(&self, items: Vec<I>) -> Vec<I> {
        items
    }
}

/// Any `Fn(I) -> O` converts item by item.
impl<I, O, F> ListResultConverter<I> for F
where
    F: Fn(I) -> O + Send + Sync,
    O: Send,
{
    type Output = O;

    fn convert(&self, items: Vec<I>) -> Vec<O> {
        items.into_iter().map(self).collect()
    }
}
