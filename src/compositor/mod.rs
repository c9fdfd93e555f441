pub(crate) mod assets;
pub(crate) mod blur;
pub(crate) mod clip;
pub(crate) mod erase;
pub(crate) mod flatten;
pub(crate) mod mask;
pub(crate) mod raster;
pub(crate) mod scene;
