/// The spectrum container: one wavespace array (nm or cm-1) shared by several
/// named spectral quantities, plus the physical conditions it was produced
/// under. Provides the chainable preprocessing used on experimental spectra
/// before fitting: crop, normalize, sort, offset, take.
pub mod spectrum;
/// `.spec` JSON persistence: `load_spec` / `Spectrum::store`.
pub mod spectrum_loader;
