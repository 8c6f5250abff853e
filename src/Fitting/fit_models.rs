use crate::Fitting::factory::{FitError, SpectrumFactory};
use crate::Slit::slit_processing::{ConvMode, SlitNorm};
use crate::Slit::slit_shapes::{SlitType, create_slit};
use crate::Spectra::spectrum::{Spectrum, WaveUnit};
use std::collections::HashMap;

/// A forward model for fitting: maps a parameter set onto a synthetic
/// spectrum through the factory. Every entry of `model_input` is a fittable
/// parameter.
pub trait FitModel {
    fn eval(
        &self,
        factory: &SpectrumFactory,
        model_input: &HashMap<String, f64>,
    ) -> Result<Spectrum, FitError>;
}

impl<F> FitModel for F
where
    F: Fn(&SpectrumFactory, &HashMap<String, f64>) -> Result<Spectrum, FitError>,
{
    fn eval(
        &self,
        factory: &SpectrumFactory,
        model_input: &HashMap<String, f64>,
    ) -> Result<Spectrum, FitError> {
        self(factory, model_input)
    }
}

/// One-temperature model: the gas column is described by a single rotational
/// temperature `Trot` handed to the synthesis engine.
pub struct RotTemperatureModel;

impl FitModel for RotTemperatureModel {
    fn eval(
        &self,
        factory: &SpectrumFactory,
        model_input: &HashMap<String, f64>,
    ) -> Result<Spectrum, FitError> {
        if !model_input.contains_key("Trot") {
            return Err(FitError::Model(
                "RotTemperatureModel requires a 'Trot' parameter".to_string(),
            ));
        }
        factory.eval_spectrum(model_input)
    }
}

/// Wraps another model with the instrumental post-processing chain used when
/// comparing against a normalized measurement: apply a fixed
/// (non-fittable) slit, keep one quantity, normalize.
pub struct SlitNormalizedModel {
    pub inner: Box<dyn FitModel>,
    pub slit_fwhm: f64,
    pub slit_unit: WaveUnit,
    pub slit_shape: SlitType,
    pub quantity: String,
}

impl SlitNormalizedModel {
    pub fn new(inner: Box<dyn FitModel>, slit_fwhm: f64, slit_unit: WaveUnit) -> Self {
        Self {
            inner,
            slit_fwhm,
            slit_unit,
            slit_shape: SlitType::Triangular,
            quantity: "radiance".to_string(),
        }
    }

    pub fn with_shape(mut self, shape: SlitType) -> Self {
        self.slit_shape = shape;
        self
    }

    pub fn with_quantity(mut self, quantity: &str) -> Self {
        self.quantity = quantity.to_string();
        self
    }
}

impl FitModel for SlitNormalizedModel {
    fn eval(
        &self,
        factory: &SpectrumFactory,
        model_input: &HashMap<String, f64>,
    ) -> Result<Spectrum, FitError> {
        let s = self.inner.eval(factory, model_input)?;
        let slit = create_slit(self.slit_shape, self.slit_fwhm);
        let s = s.apply_slit_with(
            &slit,
            self.slit_unit.label(),
            SlitNorm::Area,
            ConvMode::Valid,
        )?;
        Ok(s.take(&self.quantity)?.normalize()?)
    }
}
