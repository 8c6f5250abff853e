use crate::Slit::slit_shapes::SlitError;
use crate::Spectra::spectrum::{Spectrum, SpectrumError, WaveUnit};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Categorized diagnostics the factory can emit during synthesis and
/// fitting. Consumers route each category through the warnings map.
pub const MISSING_SELF_BROADENING_WARNING: &str = "MissingSelfBroadeningWarning";
pub const HIGH_TEMPERATURE_WARNING: &str = "HighTemperatureWarning";
pub const OUT_OF_BOUNDS_WARNING: &str = "OutOfBoundsWarning";
pub const LINESTRENGTH_CUTOFF_WARNING: &str = "LinestrengthCutoffWarning";

#[derive(Debug, Error)]
pub enum FitError {
    #[error("invalid factory configuration: {0}")]
    InvalidConfig(String),
    #[error("no synthesis engine attached to the factory")]
    NoEngine,
    #[error("no line databank loaded (call load_databank first)")]
    NoDatabank,
    #[error("no fit parameters given")]
    NoFitParameters,
    #[error("bounds given for '{0}' which is not a fit parameter")]
    UnknownBound(String),
    #[error("invalid bounds for '{name}': [{lo}, {hi}]")]
    InvalidBounds { name: String, lo: f64, hi: f64 },
    #[error("warning '{category}' escalated to error: {message}")]
    WarningEscalated { category: String, message: String },
    #[error("experimental spectrum must carry exactly one quantity, found {0}")]
    ExpectSingleQuantity(usize),
    #[error("synthetic and experimental spectra do not overlap on the fitted range")]
    NoOverlap,
    #[error("solver failed: {0}")]
    Solver(String),
    #[error("model evaluation failed: {0}")]
    Model(String),
    #[error("failed to parse fit task: {0}")]
    TaskParse(String),
    #[error(transparent)]
    Spectrum(#[from] SpectrumError),
    #[error(transparent)]
    Slit(#[from] SlitError),
}

/// What to do when a categorized warning fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningAction {
    Ignore,
    Warn,
    Error,
}

impl FromStr for WarningAction {
    type Err = FitError;
    fn from_str(s: &str) -> Result<Self, FitError> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(WarningAction::Ignore),
            "warn" => Ok(WarningAction::Warn),
            "error" => Ok(WarningAction::Error),
            other => Err(FitError::InvalidConfig(format!(
                "unknown warning action '{}', expected ignore/warn/error",
                other
            ))),
        }
    }
}

/// Physical configuration of the synthesis: wavespace window and grid,
/// thermodynamic state of the gas column, and line-selection cutoffs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryConfig {
    pub wavelength_min: f64,
    pub wavelength_max: f64,
    pub wunit: WaveUnit,
    /// wavespace grid step, same unit as the window
    pub wstep: f64,
    /// total pressure [bar]
    pub pressure: f64,
    /// absorption path length [cm]
    pub path_length: f64,
    pub mole_fraction: f64,
    /// isotopologue numbers to include
    pub isotope: Vec<u32>,
    /// discard lines weaker than this fraction of the strongest one
    pub cutoff: f64,
    /// half width over which a line contributes to the grid [same unit]
    pub broadening_max_width: f64,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            wavelength_min: 4167.0,
            wavelength_max: 4180.0,
            wunit: WaveUnit::Nm,
            wstep: 0.01,
            pressure: 1.01325,
            path_length: 1.0,
            mole_fraction: 1.0,
            isotope: vec![1],
            cutoff: 0.0,
            broadening_max_width: 10.0,
        }
    }
}

impl FactoryConfig {
    /// parse an isotopologue selection of the form "1,2"
    pub fn parse_isotope(selection: &str) -> Result<Vec<u32>, FitError> {
        let mut isotopes = Vec::new();
        for token in selection.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let iso: u32 = token.parse().map_err(|_| {
                FitError::InvalidConfig(format!("bad isotopologue number '{}'", token))
            })?;
            isotopes.push(iso);
        }
        if isotopes.is_empty() {
            return Err(FitError::InvalidConfig(format!(
                "empty isotopologue selection '{}'",
                selection
            )));
        }
        Ok(isotopes)
    }

    pub fn validate(&self) -> Result<(), FitError> {
        if !(self.wavelength_min.is_finite()
            && self.wavelength_max.is_finite()
            && self.wavelength_min < self.wavelength_max)
        {
            return Err(FitError::InvalidConfig(format!(
                "wavespace window [{} - {}] is empty or not finite",
                self.wavelength_min, self.wavelength_max
            )));
        }
        if !(self.wstep > 0.0) {
            return Err(FitError::InvalidConfig(format!(
                "wstep must be > 0, got {}",
                self.wstep
            )));
        }
        if !(self.pressure > 0.0) {
            return Err(FitError::InvalidConfig(format!(
                "pressure must be > 0 bar, got {}",
                self.pressure
            )));
        }
        if !(self.path_length > 0.0) {
            return Err(FitError::InvalidConfig(format!(
                "path_length must be > 0 cm, got {}",
                self.path_length
            )));
        }
        if !(0.0..=1.0).contains(&self.mole_fraction) {
            return Err(FitError::InvalidConfig(format!(
                "mole_fraction must be within [0, 1], got {}",
                self.mole_fraction
            )));
        }
        if self.isotope.is_empty() {
            return Err(FitError::InvalidConfig(
                "isotopologue selection is empty".to_string(),
            ));
        }
        if !(self.cutoff >= 0.0) {
            return Err(FitError::InvalidConfig(format!(
                "cutoff must be >= 0, got {}",
                self.cutoff
            )));
        }
        if !(self.broadening_max_width > 0.0) {
            return Err(FitError::InvalidConfig(format!(
                "broadening_max_width must be > 0, got {}",
                self.broadening_max_width
            )));
        }
        Ok(())
    }
}

/// The seam to the line-by-line synthesis engine. Real engines (line
/// databases, Voigt profiles, partition functions) live outside this crate;
/// anything implementing this trait can drive the fitting workflow.
pub trait SynthesisEngine {
    /// Select the line database the engine synthesizes from.
    fn load_databank(&mut self, name: &str) -> Result<(), FitError>;
    /// Compute a synthetic spectrum for the given physical parameters
    /// (e.g. `Trot`). Synthetic quantities are stored under `*_noslit` names.
    fn eval_spectrum(
        &self,
        config: &FactoryConfig,
        params: &HashMap<String, f64>,
    ) -> Result<Spectrum, FitError>;
}

/// Owns the synthesis configuration, the warnings routing map and the
/// engine, and exposes the fitting entry point (see `fit.rs`).
pub struct SpectrumFactory {
    pub config: FactoryConfig,
    pub warnings: HashMap<String, WarningAction>,
    engine: Option<Box<dyn SynthesisEngine>>,
}

impl fmt::Debug for SpectrumFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumFactory")
            .field("config", &self.config)
            .field("warnings", &self.warnings)
            .field("engine", &self.engine.is_some())
            .finish()
    }
}

impl SpectrumFactory {
    pub fn new(config: FactoryConfig) -> Result<Self, FitError> {
        config.validate()?;
        let mut warnings = HashMap::new();
        for category in [
            MISSING_SELF_BROADENING_WARNING,
            HIGH_TEMPERATURE_WARNING,
            OUT_OF_BOUNDS_WARNING,
            LINESTRENGTH_CUTOFF_WARNING,
        ] {
            warnings.insert(category.to_string(), WarningAction::Warn);
        }
        Ok(Self {
            config,
            warnings,
            engine: None,
        })
    }

    pub fn set_engine(&mut self, engine: Box<dyn SynthesisEngine>) {
        self.engine = Some(engine);
    }

    /// Select the line database by name, forwarding to the attached engine.
    pub fn load_databank(&mut self, name: &str) -> Result<(), FitError> {
        self.engine
            .as_mut()
            .ok_or(FitError::NoEngine)?
            .load_databank(name)
    }

    pub fn set_warning(&mut self, category: &str, action: WarningAction) {
        self.warnings.insert(category.to_string(), action);
    }

    /// Action configured for a category; unknown categories default to Warn.
    pub fn warning_action(&self, category: &str) -> WarningAction {
        self.warnings
            .get(category)
            .copied()
            .unwrap_or(WarningAction::Warn)
    }

    /// Route a categorized diagnostic through the warnings map.
    pub fn emit_warning(&self, category: &str, message: &str) -> Result<(), FitError> {
        match self.warning_action(category) {
            WarningAction::Ignore => Ok(()),
            WarningAction::Warn => {
                warn!("{}: {}", category, message);
                Ok(())
            }
            WarningAction::Error => Err(FitError::WarningEscalated {
                category: category.to_string(),
                message: message.to_string(),
            }),
        }
    }

    /// Compute a synthetic spectrum for the given parameters.
    pub fn eval_spectrum(&self, params: &HashMap<String, f64>) -> Result<Spectrum, FitError> {
        let engine = self.engine.as_ref().ok_or(FitError::NoEngine)?;
        if let Some(&trot) = params.get("Trot") {
            if trot > 5000.0 {
                self.emit_warning(
                    HIGH_TEMPERATURE_WARNING,
                    &format!(
                        "Trot = {} K is outside the validity range of most line databases",
                        trot
                    ),
                )?;
            }
        }
        engine.eval_spectrum(&self.config, params)
    }
}
