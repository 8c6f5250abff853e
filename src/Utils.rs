/// Small shared numerics: argsort, evenly-spaced-grid checks, linear
/// interpolation/resampling and trapezoidal integration. Used by the slit
/// convolution and by the fit residual, which both need spectra brought onto
/// a common wavespace grid.
pub mod interpolation;
