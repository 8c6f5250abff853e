/// A stand-in synthesis backend for the demos and tests: a fixed band of
/// Boltzmann-populated gaussian emission lines behind the `SynthesisEngine`
/// seam. Real line-by-line engines plug in through the same trait.
pub mod band_engine;
/// Numbered fitting demos: the one-temperature fit of a synthetic measured
/// CO2 band, from code and from a task file.
pub mod fit_examples;
/// Numbered slit demos: kernel shapes, delta-line broadening, cleanup of a
/// measured kernel.
pub mod slit_examples;
