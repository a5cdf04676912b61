#[cfg(feature = "pigment-base")]
pub use pigment_base as base;

#[cfg(feature = "pigment-loader")]
pub use pigment_loader as loader;
