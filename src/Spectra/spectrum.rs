use crate::Utils::interpolation::{argsort, is_sorted_ascending, resample, trapz};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum SpectrumError {
    UnknownQuantity { name: String, available: String },
    UnsupportedWaveUnit(String),
    WaveUnitMismatch { expected: String, got: String },
    EmptyRange { wmin: f64, wmax: f64 },
    LengthMismatch { quantity: String, expected: usize, got: usize },
    NotSorted,
    DegenerateQuantity(String),
    NoQuantities,
}

impl fmt::Display for SpectrumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SpectrumError::UnknownQuantity { name, available } => {
                write!(
                    f,
                    "Quantity '{}' not found in spectrum. Available: {}",
                    name, available
                )
            }
            SpectrumError::UnsupportedWaveUnit(unit) => {
                write!(
                    f,
                    "Unsupported wavespace unit: {}. Only 'nm' and 'cm-1' are supported",
                    unit
                )
            }
            SpectrumError::WaveUnitMismatch { expected, got } => {
                write!(
                    f,
                    "Wavespace unit mismatch: spectrum is sampled in {} but {} was given",
                    expected, got
                )
            }
            SpectrumError::EmptyRange { wmin, wmax } => {
                write!(f, "No spectral points left in range [{} - {}]", wmin, wmax)
            }
            SpectrumError::LengthMismatch {
                quantity,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Quantity '{}' has {} points but the wavespace has {}",
                    quantity, got, expected
                )
            }
            SpectrumError::NotSorted => {
                write!(f, "Wavespace must be sorted ascending for this operation")
            }
            SpectrumError::DegenerateQuantity(name) => {
                write!(
                    f,
                    "Quantity '{}' has zero or non-finite maximum, cannot normalize",
                    name
                )
            }
            SpectrumError::NoQuantities => write!(f, "Spectrum holds no spectral quantities"),
        }
    }
}

impl Error for SpectrumError {}

/// Wavespace unit of a sampled spectrum: wavelength in nm or wavenumber in cm-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveUnit {
    #[serde(rename = "nm")]
    Nm,
    #[serde(rename = "cm-1")]
    Cm1,
}

impl WaveUnit {
    pub fn parse(unit: &str) -> Result<Self, SpectrumError> {
        match unit.trim() {
            "nm" => Ok(WaveUnit::Nm),
            "cm-1" | "cm_1" | "1/cm" => Ok(WaveUnit::Cm1),
            _ => Err(SpectrumError::UnsupportedWaveUnit(unit.to_string())),
        }
    }
    pub fn label(&self) -> &'static str {
        match self {
            WaveUnit::Nm => "nm",
            WaveUnit::Cm1 => "cm-1",
        }
    }
}

/// nm <-> cm-1: w[cm-1] = 1e7 / w[nm]. Identity when units coincide.
pub fn convert_wavespace(w: f64, from: WaveUnit, to: WaveUnit) -> f64 {
    if from == to { w } else { 1.0e7 / w }
}

/// Slit kernel stored on a spectrum after instrumental broadening was applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlitRecord {
    pub w: Vec<f64>,
    pub intensity: Vec<f64>,
    pub unit: WaveUnit,
}

/// A sampled spectrum: one wavespace array shared by several named spectral
/// quantities (radiance, transmittance, ...), each with a unit label, plus the
/// physical conditions it was measured or computed under.
///
/// Quantities ending in `_noslit` are synthetic ones that have not been
/// convolved with an instrumental slit yet; `apply_slit` (see the Slit module)
/// turns `radiance_noslit` into `radiance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spectrum {
    pub name: String,
    pub wunit: WaveUnit,
    pub w: Vec<f64>,
    /// quantity name -> intensity array, same length as `w`
    pub quantities: HashMap<String, Vec<f64>>,
    /// quantity name -> unit label
    pub units: HashMap<String, String>,
    /// physical conditions (temperatures, pressure, path length, ...)
    pub conditions: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slit: Option<SlitRecord>,
}

impl Spectrum {
    pub fn new(name: &str, wunit: WaveUnit) -> Self {
        Self {
            name: name.to_string(),
            wunit,
            w: Vec::new(),
            quantities: HashMap::new(),
            units: HashMap::new(),
            conditions: HashMap::new(),
            slit: None,
        }
    }

    /// Build a single-quantity spectrum from raw arrays.
    pub fn from_arrays(
        name: &str,
        wunit: WaveUnit,
        w: Vec<f64>,
        quantity: &str,
        intensity: Vec<f64>,
        unit_label: &str,
    ) -> Result<Self, SpectrumError> {
        let mut s = Spectrum::new(name, wunit);
        s.w = w;
        s.add_quantity(quantity, intensity, unit_label)?;
        Ok(s)
    }

    pub fn add_quantity(
        &mut self,
        quantity: &str,
        intensity: Vec<f64>,
        unit_label: &str,
    ) -> Result<(), SpectrumError> {
        if intensity.len() != self.w.len() {
            return Err(SpectrumError::LengthMismatch {
                quantity: quantity.to_string(),
                expected: self.w.len(),
                got: intensity.len(),
            });
        }
        self.quantities.insert(quantity.to_string(), intensity);
        self.units
            .insert(quantity.to_string(), unit_label.to_string());
        Ok(())
    }

    pub fn quantity(&self, name: &str) -> Result<&Vec<f64>, SpectrumError> {
        self.quantities
            .get(name)
            .ok_or_else(|| SpectrumError::UnknownQuantity {
                name: name.to_string(),
                available: self.quantity_names().join(", "),
            })
    }

    /// Names of the stored quantities, sorted for deterministic output.
    pub fn quantity_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.quantities.keys().cloned().collect();
        names.sort();
        names
    }

    ////////////////////////////// TRANSFORMATIONS ///////////////////////////////
    // All of them consume and return the spectrum so workflows chain with `?`:
    // load_spec(..)?.crop(..)?.normalize()?.sort().offset(..)?

    /// Restrict the spectrum to the [wmin, wmax] window given in `unit`.
    /// The window is converted into the spectrum's own wavespace if needed.
    pub fn crop(mut self, wmin: f64, wmax: f64, unit: &str) -> Result<Self, SpectrumError> {
        let u = WaveUnit::parse(unit)?;
        let a = convert_wavespace(wmin, u, self.wunit);
        let b = convert_wavespace(wmax, u, self.wunit);
        // nm <-> cm-1 conversion reverses the ordering of the edges
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let keep: Vec<usize> = self
            .w
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w >= lo && w <= hi)
            .map(|(i, _)| i)
            .collect();
        if keep.is_empty() {
            return Err(SpectrumError::EmptyRange { wmin, wmax });
        }
        self.w = keep.iter().map(|&i| self.w[i]).collect();
        for intensity in self.quantities.values_mut() {
            *intensity = keep.iter().map(|&i| intensity[i]).collect();
        }
        Ok(self)
    }

    /// Scale every quantity to a maximum absolute value of 1.
    pub fn normalize(mut self) -> Result<Self, SpectrumError> {
        if self.quantities.is_empty() {
            return Err(SpectrumError::NoQuantities);
        }
        for (name, intensity) in self.quantities.iter_mut() {
            let max = intensity.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
            if !(max.is_finite() && max > 0.0) {
                return Err(SpectrumError::DegenerateQuantity(name.clone()));
            }
            for v in intensity.iter_mut() {
                *v /= max;
            }
        }
        Ok(self)
    }

    /// Sort by wavespace ascending, reordering every quantity accordingly.
    pub fn sort(mut self) -> Self {
        if is_sorted_ascending(&self.w) {
            return self;
        }
        let order = argsort(&self.w);
        self.w = order.iter().map(|&i| self.w[i]).collect();
        for intensity in self.quantities.values_mut() {
            *intensity = order.iter().map(|&i| intensity[i]).collect();
        }
        self
    }

    /// Shift the wavespace axis by a constant. The shift must be given in the
    /// spectrum's own unit: an nm offset has no constant cm-1 counterpart.
    pub fn offset(mut self, shift: f64, unit: &str) -> Result<Self, SpectrumError> {
        let u = WaveUnit::parse(unit)?;
        if u != self.wunit {
            return Err(SpectrumError::WaveUnitMismatch {
                expected: self.wunit.label().to_string(),
                got: u.label().to_string(),
            });
        }
        for w in self.w.iter_mut() {
            *w += shift;
        }
        Ok(self)
    }

    /// Extract a single quantity into its own spectrum, keeping wavespace,
    /// conditions and the applied-slit record.
    pub fn take(&self, quantity: &str) -> Result<Self, SpectrumError> {
        let intensity = self.quantity(quantity)?.clone();
        let mut s = Spectrum::new(&self.name, self.wunit);
        s.w = self.w.clone();
        s.conditions = self.conditions.clone();
        s.slit = self.slit.clone();
        let unit_label = self
            .units
            .get(quantity)
            .cloned()
            .unwrap_or_default();
        s.add_quantity(quantity, intensity, &unit_label)?;
        Ok(s)
    }

    ////////////////////////////// SCALAR DERIVATIONS ///////////////////////////////

    pub fn max(&self, quantity: &str) -> Result<f64, SpectrumError> {
        let intensity = self.quantity(quantity)?;
        Ok(intensity.iter().fold(f64::NEG_INFINITY, |m, &v| m.max(v)))
    }

    /// Trapezoidal integral of the quantity over the wavespace.
    pub fn area(&self, quantity: &str) -> Result<f64, SpectrumError> {
        let intensity = self.quantity(quantity)?;
        Ok(trapz(&self.w, intensity))
    }

    /// Linearly resample one quantity onto an external wavespace grid, given
    /// in the spectrum's own unit. The spectrum must be sorted first.
    pub fn resample_quantity(
        &self,
        quantity: &str,
        w_new: &[f64],
    ) -> Result<Vec<f64>, SpectrumError> {
        if !is_sorted_ascending(&self.w) {
            return Err(SpectrumError::NotSorted);
        }
        let intensity = self.quantity(quantity)?;
        Ok(resample(&self.w, intensity, w_new))
    }
}
