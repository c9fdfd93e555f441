pub(crate) mod seek;
