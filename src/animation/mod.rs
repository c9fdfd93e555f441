pub(crate) mod ease;
pub(crate) mod filters;
pub(crate) mod interpolate;
