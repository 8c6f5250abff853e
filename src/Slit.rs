/// Instrumental slit kernels: triangular, gaussian and trapezoidal
/// generators behind one dispatch enum.
pub mod slit_shapes;
/// Slit post-processing: convolution of a spectrum with a slit kernel,
/// FWHM / effective-FWHM extraction, recentering and cropping of measured
/// kernels, terminal summaries, and `Spectrum::apply_slit`.
pub mod slit_processing;
mod slit_tests;
