use crate::Fitting::factory::{FactoryConfig, FitError, SynthesisEngine};
use crate::Slit::slit_shapes::FWHM_TO_SIGMA;
use crate::Spectra::spectrum::Spectrum;
use log::debug;
use std::collections::HashMap;

/// second radiation constant hc/k [cm*K]
const C2: f64 = 1.438_777;

/// One emission line of the demonstration band.
#[derive(Debug, Clone, Copy)]
pub struct BandLine {
    /// line position, same unit as the factory wavespace
    pub center: f64,
    /// lower-state energy [cm-1]
    pub lower_state_energy: f64,
    /// base line strength [a.u.]
    pub strength: f64,
    pub isotopologue: u32,
}

/// A stand-in synthesis backend for demonstrations and tests: a fixed list
/// of emission lines whose amplitudes follow a Boltzmann population at the
/// requested rotational temperature. It is NOT a line-by-line engine (no
/// Voigt profiles, no partition functions) - real engines plug in through
/// the same `SynthesisEngine` trait.
pub struct GaussianBandEngine {
    pub lines: Vec<BandLine>,
    /// full width at half maximum of every line, grid units
    pub line_fwhm: f64,
    databank: Option<String>,
}

impl GaussianBandEngine {
    pub fn new(lines: Vec<BandLine>, line_fwhm: f64) -> Self {
        Self {
            lines,
            line_fwhm,
            databank: None,
        }
    }

    /// The demonstration band used by the examples: a handful of lines
    /// between 4167 and 4180 nm with lower-state energies spread from the
    /// ground state up to ~4000 cm-1, so the amplitude ratios are a strong
    /// function of Trot.
    pub fn co2_test_band() -> Self {
        let lines = vec![
            BandLine { center: 4168.5, lower_state_energy: 50.0, strength: 1.0, isotopologue: 1 },
            BandLine { center: 4170.2, lower_state_energy: 350.0, strength: 0.9, isotopologue: 1 },
            BandLine { center: 4172.0, lower_state_energy: 800.0, strength: 1.1, isotopologue: 1 },
            BandLine { center: 4173.8, lower_state_energy: 1400.0, strength: 0.8, isotopologue: 1 },
            BandLine { center: 4175.5, lower_state_energy: 2200.0, strength: 1.0, isotopologue: 1 },
            BandLine { center: 4177.3, lower_state_energy: 3100.0, strength: 0.9, isotopologue: 2 },
            BandLine { center: 4179.0, lower_state_energy: 4100.0, strength: 0.7, isotopologue: 2 },
        ];
        Self::new(lines, 0.6)
    }
}

impl SynthesisEngine for GaussianBandEngine {
    fn load_databank(&mut self, name: &str) -> Result<(), FitError> {
        if name.trim().is_empty() {
            return Err(FitError::InvalidConfig(
                "empty databank name".to_string(),
            ));
        }
        self.databank = Some(name.to_string());
        Ok(())
    }

    fn eval_spectrum(
        &self,
        config: &FactoryConfig,
        params: &HashMap<String, f64>,
    ) -> Result<Spectrum, FitError> {
        if self.databank.is_none() {
            return Err(FitError::NoDatabank);
        }
        let trot = *params
            .get("Trot")
            .ok_or_else(|| FitError::Model("engine requires a 'Trot' parameter".to_string()))?;
        if !(trot.is_finite() && trot > 0.0) {
            return Err(FitError::Model(format!(
                "rotational temperature must be > 0 K, got {}",
                trot
            )));
        }

        let n = ((config.wavelength_max - config.wavelength_min) / config.wstep).round() as usize;
        let w: Vec<f64> = (0..=n)
            .map(|i| config.wavelength_min + i as f64 * config.wstep)
            .collect();
        let mut intensity = vec![0.0; w.len()];

        let sigma = self.line_fwhm / FWHM_TO_SIGMA;
        let column = config.path_length * config.mole_fraction * (config.pressure / 1.01325);
        let half_width = 0.5 * config.broadening_max_width;

        let amplitudes: Vec<f64> = self
            .lines
            .iter()
            .map(|line| line.strength * (-C2 * line.lower_state_energy / trot).exp())
            .collect();
        let strongest = amplitudes.iter().fold(0.0_f64, |a, &b| a.max(b));

        let mut skipped = 0usize;
        for (line, &amplitude) in self.lines.iter().zip(amplitudes.iter()) {
            if !config.isotope.contains(&line.isotopologue) {
                continue;
            }
            if strongest > 0.0 && amplitude < config.cutoff * strongest {
                skipped += 1;
                continue;
            }
            for (i, &x) in w.iter().enumerate() {
                let d = x - line.center;
                if d.abs() > half_width {
                    continue;
                }
                let u = d / sigma;
                intensity[i] += column * amplitude * (-0.5 * u * u).exp();
            }
        }
        if skipped > 0 {
            debug!(
                "{} of {} lines below the strength cutoff at Trot = {} K",
                skipped,
                self.lines.len(),
                trot
            );
        }

        let mut s = Spectrum::from_arrays(
            "synthetic",
            config.wunit,
            w,
            "radiance_noslit",
            intensity,
            "mW/cm2/sr/nm",
        )?;
        s.conditions
            .insert("Trot_K".to_string(), serde_json::json!(trot));
        s.conditions
            .insert("pressure_bar".to_string(), serde_json::json!(config.pressure));
        s.conditions.insert(
            "path_length_cm".to_string(),
            serde_json::json!(config.path_length),
        );
        if let Some(databank) = &self.databank {
            s.conditions
                .insert("databank".to_string(), serde_json::json!(databank));
        }
        Ok(s)
    }
}
