/// The spectrum factory: physical synthesis configuration (wavespace window,
/// pressure, path length, isotopologue selection, cutoffs), the warnings
/// routing map, and the `SynthesisEngine` seam behind which the line-by-line
/// engines live.
pub mod factory;
/// Forward models for fitting: the `FitModel` trait, the one-temperature
/// `RotTemperatureModel`, and the slit-plus-normalize wrapper used when
/// comparing against normalized measurements.
pub mod fit_models;
/// The fitting workflow itself: `SpectrumFactory::fit_spectrum` minimizes the
/// RMS distance between model and measurement with a bounded simplex search.
pub mod fit;
/// Text fit-task files: fit range, initial guesses, bounds, solver options
/// and a fixed slit, parsed into a runnable `FitTask`.
pub mod fit_task_parser;
mod fit_tests;
