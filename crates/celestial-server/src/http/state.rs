use celestial_core::Store;

/// Shared state handed to every handler.
#[derive(Debug)]
pub struct AppState {
    pub store: Store,
}

impl AppState {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}
