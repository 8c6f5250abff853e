//! Line-oriented fit-task files: the whole fitting problem (range, initial
//! guesses, bounds, solver options, fixed slit) written down as text, so a
//! fit can be reconfigured without recompiling.
//!
//! ```text
//! FIT_TASK
//! name: CO2 one temperature
//! range: 4167 4180 nm
//! quantity: radiance
//! initial: Trot 1200
//! bounds: Trot 300 2000
//! maxiter: 50
//! ftol: 1e-15
//! slit: 1.4 nm triangular
//! ```
//!
//! `initial` and `bounds` lines may repeat, one per parameter. Lines starting
//! with `#` are comments. Preprocessing of the experimental spectrum beyond
//! crop/take (normalization, offsets) stays with the caller.

use crate::Fitting::factory::{FitError, SpectrumFactory};
use crate::Fitting::fit::{FitResult, SolverOptions};
use crate::Fitting::fit_models::{FitModel, SlitNormalizedModel};
use crate::Spectra::spectrum::{Spectrum, WaveUnit};
use crate::Slit::slit_shapes::{SlitType, slit_type_by_name};
use regex::Regex;
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Clone)]
pub struct FitTask {
    pub name: String,
    pub wmin: f64,
    pub wmax: f64,
    pub wunit: WaveUnit,
    pub quantity: String,
    pub initial: HashMap<String, f64>,
    pub bounds: HashMap<String, (f64, f64)>,
    pub solver: SolverOptions,
    pub slit: Option<(f64, WaveUnit, SlitType)>,
}

fn parse_number(token: &str, context: &str) -> Result<f64, FitError> {
    token
        .parse::<f64>()
        .map_err(|_| FitError::TaskParse(format!("bad number '{}' in {}", token, context)))
}

impl FitTask {
    pub fn parse_file(filename: &str) -> Result<FitTask, FitError> {
        let text = fs::read_to_string(filename).map_err(|e| {
            FitError::TaskParse(format!("cannot read task file '{}': {}", filename, e))
        })?;
        Self::parse_document(&text)
    }

    pub fn parse_document(text: &str) -> Result<FitTask, FitError> {
        let keyword = Regex::new(r"^\s*([A-Za-z_]+)\s*:\s*(.+?)\s*$")
            .map_err(|e| FitError::TaskParse(e.to_string()))?;

        let mut name = "fit task".to_string();
        let mut range: Option<(f64, f64, WaveUnit)> = None;
        let mut quantity = "radiance".to_string();
        let mut initial = HashMap::new();
        let mut bounds = HashMap::new();
        let mut solver = SolverOptions::default();
        let mut slit = None;

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed.to_uppercase() == "FIT_TASK" {
                continue;
            }
            let captures = keyword.captures(trimmed).ok_or_else(|| {
                FitError::TaskParse(format!("unparseable line '{}'", trimmed))
            })?;
            let key = captures.get(1).map(|m| m.as_str()).unwrap_or("");
            let value = captures.get(2).map(|m| m.as_str()).unwrap_or("");
            let tokens: Vec<&str> = value.split_whitespace().collect();

            match key {
                "name" => name = value.to_string(),
                "range" => {
                    if tokens.len() != 3 {
                        return Err(FitError::TaskParse(format!(
                            "range expects 'wmin wmax unit', got '{}'",
                            value
                        )));
                    }
                    let wmin = parse_number(tokens[0], "range")?;
                    let wmax = parse_number(tokens[1], "range")?;
                    let unit = WaveUnit::parse(tokens[2]).map_err(|e| {
                        FitError::TaskParse(format!("range: {}", e))
                    })?;
                    if !(wmin < wmax) {
                        return Err(FitError::TaskParse(format!(
                            "range [{} - {}] is empty",
                            wmin, wmax
                        )));
                    }
                    range = Some((wmin, wmax, unit));
                }
                "quantity" => {
                    if tokens.len() != 1 {
                        return Err(FitError::TaskParse(format!(
                            "quantity expects one name, got '{}'",
                            value
                        )));
                    }
                    quantity = tokens[0].to_string();
                }
                "initial" => {
                    if tokens.len() != 2 {
                        return Err(FitError::TaskParse(format!(
                            "initial expects 'name value', got '{}'",
                            value
                        )));
                    }
                    initial.insert(tokens[0].to_string(), parse_number(tokens[1], "initial")?);
                }
                "bounds" => {
                    if tokens.len() != 3 {
                        return Err(FitError::TaskParse(format!(
                            "bounds expects 'name lo hi', got '{}'",
                            value
                        )));
                    }
                    let lo = parse_number(tokens[1], "bounds")?;
                    let hi = parse_number(tokens[2], "bounds")?;
                    bounds.insert(tokens[0].to_string(), (lo, hi));
                }
                "maxiter" => {
                    solver.maxiter = tokens
                        .first()
                        .and_then(|t| t.parse::<u64>().ok())
                        .ok_or_else(|| {
                            FitError::TaskParse(format!("bad maxiter '{}'", value))
                        })?;
                }
                "ftol" => solver.ftol = parse_number(value, "ftol")?,
                "initial_step" => solver.initial_step = parse_number(value, "initial_step")?,
                "slit" => {
                    if tokens.len() < 2 || tokens.len() > 3 {
                        return Err(FitError::TaskParse(format!(
                            "slit expects 'fwhm unit [shape]', got '{}'",
                            value
                        )));
                    }
                    let fwhm = parse_number(tokens[0], "slit")?;
                    let unit = WaveUnit::parse(tokens[1])
                        .map_err(|e| FitError::TaskParse(format!("slit: {}", e)))?;
                    let shape = match tokens.get(2) {
                        Some(token) => slit_type_by_name(token)
                            .map_err(|e| FitError::TaskParse(format!("slit: {}", e)))?,
                        None => SlitType::Triangular,
                    };
                    slit = Some((fwhm, unit, shape));
                }
                other => {
                    return Err(FitError::TaskParse(format!(
                        "unknown keyword '{}'",
                        other
                    )));
                }
            }
        }

        let (wmin, wmax, wunit) = range.ok_or_else(|| {
            FitError::TaskParse("missing 'range: wmin wmax unit' line".to_string())
        })?;
        if initial.is_empty() {
            return Err(FitError::TaskParse(
                "no 'initial' parameter lines found".to_string(),
            ));
        }
        Ok(FitTask {
            name,
            wmin,
            wmax,
            wunit,
            quantity,
            initial,
            bounds,
            solver,
            slit,
        })
    }

    /// Execute the task: crop the experimental spectrum onto the task range,
    /// keep the configured quantity, wrap the model with the fixed slit when
    /// one is configured, and run the fit.
    pub fn run(
        &self,
        factory: &SpectrumFactory,
        model: Box<dyn FitModel>,
        s_exp: &Spectrum,
    ) -> Result<(Spectrum, FitResult), FitError> {
        let s = s_exp
            .clone()
            .crop(self.wmin, self.wmax, self.wunit.label())?
            .sort()
            .take(&self.quantity)?;
        let model: Box<dyn FitModel> = match &self.slit {
            Some((fwhm, unit, shape)) => Box::new(
                SlitNormalizedModel::new(model, *fwhm, *unit)
                    .with_shape(*shape)
                    .with_quantity(&self.quantity),
            ),
            None => model,
        };
        factory.fit_spectrum(
            &s,
            model.as_ref(),
            self.initial.clone(),
            self.bounds.clone(),
            self.solver,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK: &str = "
FIT_TASK
# one-temperature fit of the measured CO2 band
name: CO2 one temperature
range: 4167 4180 nm
quantity: radiance
initial: Trot 1200
bounds: Trot 300 2000
maxiter: 50
ftol: 1e-15
slit: 1.4 nm triangular
";

    #[test]
    fn test_parse_document() {
        let task = FitTask::parse_document(TASK).unwrap();
        assert_eq!(task.name, "CO2 one temperature");
        assert_eq!(task.wmin, 4167.0);
        assert_eq!(task.wmax, 4180.0);
        assert_eq!(task.wunit, WaveUnit::Nm);
        assert_eq!(task.quantity, "radiance");
        assert_eq!(task.initial.get("Trot"), Some(&1200.0));
        assert_eq!(task.bounds.get("Trot"), Some(&(300.0, 2000.0)));
        assert_eq!(task.solver.maxiter, 50);
        assert_eq!(task.solver.ftol, 1e-15);
        let (fwhm, unit, shape) = task.slit.unwrap();
        assert_eq!(fwhm, 1.4);
        assert_eq!(unit, WaveUnit::Nm);
        assert_eq!(shape, SlitType::Triangular);
    }

    #[test]
    fn test_missing_range() {
        let result = FitTask::parse_document("initial: Trot 300\n");
        assert!(matches!(
            result,
            Err(FitError::TaskParse(msg)) if msg.contains("range")
        ));
    }

    #[test]
    fn test_missing_initial() {
        let result = FitTask::parse_document("range: 1 2 nm\n");
        assert!(matches!(
            result,
            Err(FitError::TaskParse(msg)) if msg.contains("initial")
        ));
    }

    #[test]
    fn test_unknown_keyword() {
        let result = FitTask::parse_document("range: 1 2 nm\ninitial: Trot 300\nplot: yes\n");
        assert!(matches!(
            result,
            Err(FitError::TaskParse(msg)) if msg.contains("unknown keyword 'plot'")
        ));
    }

    #[test]
    fn test_inverted_range() {
        let result = FitTask::parse_document("range: 5 2 nm\ninitial: Trot 300\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_multiple_parameters() {
        let text = "
range: 4167 4180 nm
initial: Trot 1200
initial: offset 0
bounds: Trot 300 2000
bounds: offset -1 1
";
        let task = FitTask::parse_document(text).unwrap();
        assert_eq!(task.initial.len(), 2);
        assert_eq!(task.bounds.len(), 2);
        assert_eq!(task.bounds.get("offset"), Some(&(-1.0, 1.0)));
        // defaults survive when not configured
        assert_eq!(task.quantity, "radiance");
        assert!(task.slit.is_none());
    }
}
