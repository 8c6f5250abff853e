//! Slit post-processing toolbox, re-exported in one place for package
//! consumers.

pub use crate::Slit::slit_processing::{
    convolve_with_slit, crop_slit, get_FWHM, get_effective_FWHM, plot_slit, recenter_slit,
};
pub use crate::Slit::slit_shapes::{
    GaussianSlit, SlitEnum, SlitGenerator, SlitType, TrapezoidalSlit, TriangularSlit, create_slit,
};
