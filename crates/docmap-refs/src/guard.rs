use docmap_model::ReferenceKey;

/// A pending reference load, as shown to guards.
#[derive(Clone, Copy, Debug)]
pub struct DereferenceRequest<'a> {
    pub key: &'a ReferenceKey,
    /// Label of the object holding the reference.
    pub owner: Option<&'a str>,
}

/// Hook consulted before every reference load.
///
/// Returning `false` vetoes the load. A vetoed reference resolves to
/// nothing; it is not an error.
pub trait DereferenceGuard: Send + Sync {
    fn allow(&self, request: &DereferenceRequest<'_>) -> bool;

    /// Name used when logging a veto.
    fn name(&self) -> &str {
        "guard"
    }
}

impl<F> DereferenceGuard for F
where
    F: Fn(&DereferenceRequest<'_>) -> bool + Send + Sync,
{
    fn allow(&self, request: &DereferenceRequest<'_>) -> bool {
        self(request)
    }
}
