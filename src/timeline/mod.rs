pub(crate) mod debounce;
pub(crate) mod editor;
pub(crate) mod mutate;
pub(crate) mod preload;
pub(crate) mod session;
pub(crate) mod store;
