use crate::Slit::slit_shapes::{SlitEnum, SlitError, SlitGenerator, TriangularSlit};
use crate::Spectra::spectrum::{SlitRecord, Spectrum, SpectrumError, WaveUnit};
use crate::Utils::interpolation::{evenly_spaced, resample, trapz};
use log::{info, warn};
use nalgebra::DVector;
use prettytable::{Table, row};

/// How the slit kernel is normalized before convolution.
/// - `Area`: unit integral, the convolved quantity keeps its integrated area
///   (use for radiance-like quantities).
/// - `Max`: unit peak, the convolved quantity scales with the slit area and
///   its unit picks up the wavespace dimension (use for transmittance-like
///   quantities measured through a real instrument).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlitNorm {
    #[default]
    Area,
    Max,
}

/// `Valid` crops the edges where the kernel does not fully overlap the
/// spectrum (default); `Same` keeps the full grid with zero-padded edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvMode {
    #[default]
    Valid,
    Same,
}

/// Convolve a sampled spectrum with an instrumental slit kernel.
///
/// The spectrum grid must be evenly spaced. The kernel is resampled onto the
/// spectrum step when the two disagree, then normalized according to `norm`
/// and reversed (true convolution; irrelevant for the symmetric generated
/// shapes, it matters for imported asymmetric ones).
pub fn convolve_with_slit(
    w: &[f64],
    intensity: &[f64],
    w_slit: &[f64],
    i_slit: &[f64],
    norm: SlitNorm,
    mode: ConvMode,
) -> Result<(Vec<f64>, Vec<f64>), SlitError> {
    if w.len() != intensity.len() {
        return Err(SlitError::Spectrum(SpectrumError::LengthMismatch {
            quantity: "convolution input".to_string(),
            expected: w.len(),
            got: intensity.len(),
        }));
    }
    if w_slit.len() != i_slit.len() || w_slit.len() < 2 {
        return Err(SlitError::EmptySlit);
    }
    let wstep = evenly_spaced(w, 1e-4).ok_or(SlitError::UnevenGrid)?;

    // bring the kernel onto the spectrum step
    let (w_k, i_k) = match evenly_spaced(w_slit, 1e-4) {
        Some(slit_step) if ((slit_step - wstep) / wstep).abs() <= 1e-3 => {
            (w_slit.to_vec(), i_slit.to_vec())
        }
        _ => {
            let center = 0.5 * (w_slit[0] + w_slit[w_slit.len() - 1]);
            let half_span = 0.5 * (w_slit[w_slit.len() - 1] - w_slit[0]);
            let n = (half_span / wstep).floor() as i64;
            if n < 1 {
                return Err(SlitError::EmptySlit);
            }
            let grid: Vec<f64> = (-n..=n).map(|i| center + i as f64 * wstep).collect();
            warn!(
                "slit kernel resampled onto the spectrum step ({} points -> {} points, step {})",
                w_slit.len(),
                grid.len(),
                wstep
            );
            let values = resample(w_slit, i_slit, &grid);
            (grid, values)
        }
    };

    let m = w_k.len();
    let n = w.len();
    if m > n {
        return Err(SlitError::KernelWiderThanSpectrum {
            kernel: m,
            spectrum: n,
        });
    }

    let scale = match norm {
        SlitNorm::Area => {
            let area: f64 = i_k.iter().sum::<f64>() * wstep;
            if !(area.is_finite() && area > 0.0) {
                return Err(SlitError::EmptySlit);
            }
            1.0 / area
        }
        SlitNorm::Max => {
            let max = i_k.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            if !(max.is_finite() && max > 0.0) {
                return Err(SlitError::EmptySlit);
            }
            1.0 / max
        }
    };
    let kernel: Vec<f64> = i_k.iter().rev().map(|&v| v * scale * wstep).collect();
    let kernel = DVector::from_vec(kernel);
    let offset = (m - 1) / 2;

    match mode {
        ConvMode::Valid => {
            let out_len = n - m + 1;
            let mut out = Vec::with_capacity(out_len);
            for i in 0..out_len {
                let window = DVector::from_column_slice(&intensity[i..i + m]);
                out.push(window.dot(&kernel));
            }
            let w_out = w[offset..offset + out_len].to_vec();
            Ok((w_out, out))
        }
        ConvMode::Same => {
            let mut out = vec![0.0; n];
            for (i, slot) in out.iter_mut().enumerate() {
                let mut acc = 0.0;
                for j in 0..m {
                    let k = i as i64 + j as i64 - offset as i64;
                    if k >= 0 && (k as usize) < n {
                        acc += kernel[j] * intensity[k as usize];
                    }
                }
                *slot = acc;
            }
            Ok((w.to_vec(), out))
        }
    }
}

/// Full width at half maximum, by linear interpolation of the half-maximum
/// crossings on both sides of the peak.
#[allow(non_snake_case)]
pub fn get_FWHM(w: &[f64], intensity: &[f64]) -> Result<f64, SlitError> {
    if w.len() != intensity.len() || w.len() < 3 {
        return Err(SlitError::FwhmNotFound(
            "need at least 3 points".to_string(),
        ));
    }
    let (peak, &max) = intensity
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or_else(|| SlitError::FwhmNotFound("empty kernel".to_string()))?;
    if !(max.is_finite() && max > 0.0) {
        return Err(SlitError::FwhmNotFound("non-positive maximum".to_string()));
    }
    if peak == 0 || peak == w.len() - 1 {
        return Err(SlitError::FwhmNotFound("peak lies on the edge".to_string()));
    }
    let half = 0.5 * max;

    // walk left from the peak to the half-maximum crossing
    let mut left = None;
    for i in (0..peak).rev() {
        if intensity[i] <= half {
            let t = (half - intensity[i]) / (intensity[i + 1] - intensity[i]);
            left = Some(w[i] + t * (w[i + 1] - w[i]));
            break;
        }
    }
    let mut right = None;
    for i in peak + 1..w.len() {
        if intensity[i] <= half {
            let t = (half - intensity[i - 1]) / (intensity[i] - intensity[i - 1]);
            right = Some(w[i - 1] + t * (w[i] - w[i - 1]));
            break;
        }
    }
    match (left, right) {
        (Some(l), Some(r)) => Ok(r - l),
        _ => Err(SlitError::FwhmNotFound(
            "half maximum never crossed on one side".to_string(),
        )),
    }
}

/// Effective FWHM: integral divided by maximum. Agrees with the geometric
/// FWHM for a triangular kernel and is robust for noisy imported slits.
#[allow(non_snake_case)]
pub fn get_effective_FWHM(w: &[f64], intensity: &[f64]) -> Result<f64, SlitError> {
    if w.len() != intensity.len() || w.is_empty() {
        return Err(SlitError::EmptySlit);
    }
    let max = intensity.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if !(max.is_finite() && max > 0.0) {
        return Err(SlitError::FwhmNotFound("non-positive maximum".to_string()));
    }
    Ok(trapz(w, intensity) / max)
}

/// Shift the kernel wavespace so its intensity centroid sits at `center`.
/// Measured slit functions often come centered on the calibration line
/// rather than on zero.
pub fn recenter_slit(
    w_slit: &[f64],
    i_slit: &[f64],
    center: f64,
) -> Result<Vec<f64>, SlitError> {
    if w_slit.len() != i_slit.len() || w_slit.len() < 2 {
        return Err(SlitError::EmptySlit);
    }
    let norm = trapz(w_slit, i_slit);
    if !(norm.is_finite() && norm.abs() > 0.0) {
        return Err(SlitError::EmptySlit);
    }
    let weighted: Vec<f64> = w_slit
        .iter()
        .zip(i_slit.iter())
        .map(|(&x, &y)| x * y)
        .collect();
    let centroid = trapz(w_slit, &weighted) / norm;
    Ok(w_slit.iter().map(|&x| x - centroid + center).collect())
}

/// Drop the kernel wings below `threshold * max`. Keeps the contiguous block
/// between the first and last sample above the threshold.
pub fn crop_slit(
    w_slit: &[f64],
    i_slit: &[f64],
    threshold: f64,
) -> Result<(Vec<f64>, Vec<f64>), SlitError> {
    if w_slit.len() != i_slit.len() || w_slit.is_empty() {
        return Err(SlitError::EmptySlit);
    }
    if !(0.0..1.0).contains(&threshold) {
        return Err(SlitError::InvalidWidth {
            what: "crop threshold (must be in [0, 1))".to_string(),
            value: threshold,
        });
    }
    let max = i_slit.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if !(max.is_finite() && max > 0.0) {
        return Err(SlitError::FwhmNotFound("non-positive maximum".to_string()));
    }
    let cut = threshold * max;
    let first = i_slit.iter().position(|&v| v >= cut);
    let last = i_slit.iter().rposition(|&v| v >= cut);
    match (first, last) {
        (Some(a), Some(b)) if a <= b => {
            Ok((w_slit[a..=b].to_vec(), i_slit[a..=b].to_vec()))
        }
        _ => Err(SlitError::EmptySlit),
    }
}

/// Print a terminal summary of a slit kernel: peak position, centroid, FWHM,
/// effective FWHM, area.
pub fn plot_slit(w_slit: &[f64], i_slit: &[f64], name: &str) -> Result<(), SlitError> {
    if w_slit.len() != i_slit.len() || w_slit.is_empty() {
        return Err(SlitError::EmptySlit);
    }
    let (peak, _) = i_slit
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or(SlitError::EmptySlit)?;
    let area = trapz(w_slit, i_slit);
    let fwhm = get_FWHM(w_slit, i_slit)
        .map(|v| format!("{:.4}", v))
        .unwrap_or_else(|_| "-".to_string());
    let eff = get_effective_FWHM(w_slit, i_slit)
        .map(|v| format!("{:.4}", v))
        .unwrap_or_else(|_| "-".to_string());
    let mut table = Table::new();
    table.add_row(row![
        "slit",
        "points",
        "peak position",
        "FWHM",
        "effective FWHM",
        "area"
    ]);
    table.add_row(row![
        name,
        w_slit.len(),
        format!("{:.4}", w_slit[peak]),
        fwhm,
        eff,
        format!("{:.4e}", area)
    ]);
    table.printstd();
    Ok(())
}

impl Spectrum {
    /// Convolve every `*_noslit` quantity with a triangular slit of the given
    /// FWHM and store the result under the bare name
    /// (`radiance_noslit` -> `radiance`). Triangular is the usual shape for a
    /// monochromator with matched entrance and exit slits.
    pub fn apply_slit(self, fwhm: f64, unit: &str) -> Result<Self, SlitError> {
        self.apply_slit_with(
            &SlitEnum::Triangular(TriangularSlit { fwhm }),
            unit,
            SlitNorm::Area,
            ConvMode::Valid,
        )
    }

    /// Same as `apply_slit` with an explicit slit shape, normalization and
    /// convolution mode.
    pub fn apply_slit_with(
        mut self,
        slit: &SlitEnum,
        unit: &str,
        norm: SlitNorm,
        mode: ConvMode,
    ) -> Result<Self, SlitError> {
        let u = WaveUnit::parse(unit)?;
        if u != self.wunit {
            return Err(SlitError::WaveUnitMismatch {
                expected: self.wunit.label().to_string(),
                got: u.label().to_string(),
            });
        }
        let wstep = evenly_spaced(&self.w, 1e-4).ok_or(SlitError::UnevenGrid)?;
        let (w_slit, i_slit) = slit.generate(wstep, 0.0)?;

        let noslit: Vec<String> = self
            .quantity_names()
            .into_iter()
            .filter(|name| name.ends_with("_noslit"))
            .collect();
        if noslit.is_empty() {
            return Err(SlitError::NothingToConvolve);
        }

        let mut convolved: Vec<(String, Vec<f64>, String)> = Vec::new();
        let mut w_out: Vec<f64> = Vec::new();
        for name in &noslit {
            let intensity = self.quantity(name).map_err(SlitError::from)?;
            let (w_conv, i_conv) =
                convolve_with_slit(&self.w, intensity, &w_slit, &i_slit, norm, mode)?;
            let new_name = name.trim_end_matches("_noslit").to_string();
            let unit_label = self.units.get(name).cloned().unwrap_or_default();
            convolved.push((new_name, i_conv, unit_label));
            w_out = w_conv;
        }

        if let ConvMode::Valid = mode {
            // the valid window is the same for every quantity: crop the whole
            // spectrum onto it so all arrays keep sharing one wavespace
            let offset = self
                .w
                .iter()
                .position(|&x| (x - w_out[0]).abs() < 0.5 * wstep)
                .unwrap_or(0);
            let out_len = w_out.len();
            for intensity in self.quantities.values_mut() {
                *intensity = intensity[offset..offset + out_len].to_vec();
            }
            self.w = w_out;
        }
        for (name, values, unit_label) in convolved {
            self.quantities.insert(name.clone(), values);
            self.units.insert(name, unit_label);
        }
        self.slit = Some(SlitRecord {
            w: w_slit,
            intensity: i_slit,
            unit: u,
        });
        info!(
            "applied {:.4} {} slit to '{}' ({} quantities convolved)",
            slit.fwhm(),
            u.label(),
            self.name,
            noslit.len()
        );
        Ok(self)
    }
}
