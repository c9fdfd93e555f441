pub(crate) mod animation;
pub(crate) mod audio;
pub(crate) mod item;
pub(crate) mod layer;
pub(crate) mod timeline;
