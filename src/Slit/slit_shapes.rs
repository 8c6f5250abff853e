use crate::Spectra::spectrum::SpectrumError;
use enum_dispatch::enum_dispatch;
use std::error::Error;
use std::fmt;

/// 2*sqrt(2*ln(2)), converts a gaussian FWHM into its standard deviation.
pub const FWHM_TO_SIGMA: f64 = 2.354_820_045;

#[derive(Debug)]
pub enum SlitError {
    InvalidWidth { what: String, value: f64 },
    InvalidStep(f64),
    UnevenGrid,
    EmptySlit,
    KernelWiderThanSpectrum { kernel: usize, spectrum: usize },
    NothingToConvolve,
    FwhmNotFound(String),
    UnknownShape(String),
    WaveUnitMismatch { expected: String, got: String },
    Spectrum(SpectrumError),
}

impl fmt::Display for SlitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SlitError::InvalidWidth { what, value } => {
                write!(f, "Invalid slit {}: {} (must be finite and > 0)", what, value)
            }
            SlitError::InvalidStep(step) => {
                write!(f, "Invalid wavespace step: {} (must be finite and > 0)", step)
            }
            SlitError::UnevenGrid => {
                write!(
                    f,
                    "Slit convolution requires an evenly spaced wavespace grid"
                )
            }
            SlitError::EmptySlit => write!(f, "Slit kernel holds no points"),
            SlitError::KernelWiderThanSpectrum { kernel, spectrum } => {
                write!(
                    f,
                    "Slit kernel ({} points) is wider than the spectrum ({} points)",
                    kernel, spectrum
                )
            }
            SlitError::NothingToConvolve => {
                write!(
                    f,
                    "No '_noslit' quantity found on the spectrum, nothing to convolve"
                )
            }
            SlitError::FwhmNotFound(why) => {
                write!(f, "Could not extract FWHM: {}", why)
            }
            SlitError::UnknownShape(name) => {
                write!(
                    f,
                    "Unknown slit shape '{}'. Supported: triangular, gaussian, trapezoidal",
                    name
                )
            }
            SlitError::WaveUnitMismatch { expected, got } => {
                write!(
                    f,
                    "Slit width given in {} but the spectrum is sampled in {}",
                    got, expected
                )
            }
            SlitError::Spectrum(e) => write!(f, "{}", e),
        }
    }
}

impl Error for SlitError {}

impl From<SpectrumError> for SlitError {
    fn from(err: SpectrumError) -> Self {
        SlitError::Spectrum(err)
    }
}

/// Generators of instrumental slit kernels. `generate` samples the kernel on
/// the given step, centered on `center`, peak height 1 (normalization is done
/// at convolution time).
#[enum_dispatch]
pub trait SlitGenerator {
    /// Nominal full width at half maximum of the kernel.
    fn fwhm(&self) -> f64;
    fn generate(&self, wstep: f64, center: f64) -> Result<(Vec<f64>, Vec<f64>), SlitError>;
}

fn check_width(what: &str, value: f64) -> Result<(), SlitError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SlitError::InvalidWidth {
            what: what.to_string(),
            value,
        })
    }
}

fn check_step(wstep: f64) -> Result<(), SlitError> {
    if wstep.is_finite() && wstep > 0.0 {
        Ok(())
    } else {
        Err(SlitError::InvalidStep(wstep))
    }
}

/// symmetric grid of 2*n+1 points around `center` covering +-half_extent
fn symmetric_grid(half_extent: f64, wstep: f64, center: f64) -> Vec<f64> {
    let n = (half_extent / wstep).ceil() as i64;
    (-n..=n).map(|i| center + i as f64 * wstep).collect()
}

/// Triangular slit of given FWHM (base = 2*FWHM). The common default for
/// monochromator entrance/exit slits of equal width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangularSlit {
    pub fwhm: f64,
}

impl SlitGenerator for TriangularSlit {
    fn fwhm(&self) -> f64 {
        self.fwhm
    }
    fn generate(&self, wstep: f64, center: f64) -> Result<(Vec<f64>, Vec<f64>), SlitError> {
        check_width("FWHM", self.fwhm)?;
        check_step(wstep)?;
        let w = symmetric_grid(self.fwhm, wstep, center);
        let intensity = w
            .iter()
            .map(|&x| (1.0 - (x - center).abs() / self.fwhm).max(0.0))
            .collect();
        Ok((w, intensity))
    }
}

/// Gaussian slit of given FWHM, truncated at +-3.5 sigma.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianSlit {
    pub fwhm: f64,
}

impl SlitGenerator for GaussianSlit {
    fn fwhm(&self) -> f64 {
        self.fwhm
    }
    fn generate(&self, wstep: f64, center: f64) -> Result<(Vec<f64>, Vec<f64>), SlitError> {
        check_width("FWHM", self.fwhm)?;
        check_step(wstep)?;
        let sigma = self.fwhm / FWHM_TO_SIGMA;
        let w = symmetric_grid(3.5 * sigma, wstep, center);
        let intensity = w
            .iter()
            .map(|&x| {
                let u = (x - center) / sigma;
                (-0.5 * u * u).exp()
            })
            .collect();
        Ok((w, intensity))
    }
}

/// Trapezoidal slit: flat top of full width `top`, sloping down to zero at
/// full width `base`. FWHM = (top + base)/2. Models entrance/exit slits of
/// different widths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapezoidalSlit {
    pub top: f64,
    pub base: f64,
}

impl SlitGenerator for TrapezoidalSlit {
    fn fwhm(&self) -> f64 {
        0.5 * (self.top + self.base)
    }
    fn generate(&self, wstep: f64, center: f64) -> Result<(Vec<f64>, Vec<f64>), SlitError> {
        check_width("top width", self.top)?;
        check_width("base width", self.base)?;
        check_step(wstep)?;
        if self.base < self.top {
            return Err(SlitError::InvalidWidth {
                what: "base width (must be >= top width)".to_string(),
                value: self.base,
            });
        }
        let half_top = 0.5 * self.top;
        let half_base = 0.5 * self.base;
        let slope_len = half_base - half_top;
        let w = symmetric_grid(half_base, wstep, center);
        let intensity = w
            .iter()
            .map(|&x| {
                let d = (x - center).abs();
                if d <= half_top {
                    1.0
                } else if slope_len > 0.0 {
                    ((half_base - d) / slope_len).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            })
            .collect();
        Ok((w, intensity))
    }
}

#[derive(Clone, Debug)]
#[enum_dispatch(SlitGenerator)]
pub enum SlitEnum {
    Triangular(TriangularSlit),
    Gaussian(GaussianSlit),
    Trapezoidal(TrapezoidalSlit),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlitType {
    Triangular,
    Gaussian,
    Trapezoidal,
}

/// Build a slit generator of the requested shape for a scalar FWHM. The
/// trapezoidal shape is given a 1:3 top/base ratio so its FWHM still matches.
pub fn create_slit(kind: SlitType, fwhm: f64) -> SlitEnum {
    match kind {
        SlitType::Triangular => SlitEnum::Triangular(TriangularSlit { fwhm }),
        SlitType::Gaussian => SlitEnum::Gaussian(GaussianSlit { fwhm }),
        SlitType::Trapezoidal => SlitEnum::Trapezoidal(TrapezoidalSlit {
            top: 0.5 * fwhm,
            base: 1.5 * fwhm,
        }),
    }
}

pub fn slit_type_by_name(name: &str) -> Result<SlitType, SlitError> {
    match name.trim().to_lowercase().as_str() {
        "triangular" | "triangle" => Ok(SlitType::Triangular),
        "gaussian" | "gauss" => Ok(SlitType::Gaussian),
        "trapezoidal" | "trapezoid" => Ok(SlitType::Trapezoidal),
        _ => Err(SlitError::UnknownShape(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_triangular_kernel() {
        let slit = TriangularSlit { fwhm: 1.4 };
        let (w, intensity) = slit.generate(0.01, 0.0).unwrap();
        assert_eq!(w.len(), intensity.len());
        assert_eq!(w.len() % 2, 1);
        // peak height 1 at the center
        let mid = w.len() / 2;
        assert_relative_eq!(intensity[mid], 1.0, epsilon = 1e-12);
        // half maximum at +-fwhm/2
        let idx = w.iter().position(|&x| (x - 0.7).abs() < 5e-3).unwrap();
        assert_relative_eq!(intensity[idx], 0.5, epsilon = 1e-2);
    }

    #[test]
    fn test_gaussian_half_maximum() {
        let slit = GaussianSlit { fwhm: 2.0 };
        let (w, intensity) = slit.generate(0.001, 0.0).unwrap();
        let idx = w.iter().position(|&x| (x - 1.0).abs() < 5e-4).unwrap();
        assert_relative_eq!(intensity[idx], 0.5, epsilon = 1e-2);
    }

    #[test]
    fn test_trapezoidal_fwhm() {
        let slit = TrapezoidalSlit {
            top: 1.0,
            base: 3.0,
        };
        assert_relative_eq!(slit.fwhm(), 2.0, epsilon = 1e-12);
        let (w, intensity) = slit.generate(0.01, 0.0).unwrap();
        // flat top
        let mid = w.len() / 2;
        assert_relative_eq!(intensity[mid], 1.0, epsilon = 1e-12);
        // half maximum sits halfway down the slope, at +-fwhm/2 = +-1.0
        let idx = w.iter().position(|&x| (x - 1.0).abs() < 5e-3).unwrap();
        assert_relative_eq!(intensity[idx], 0.5, epsilon = 1e-2);
    }

    #[test]
    fn test_invalid_widths() {
        assert!(TriangularSlit { fwhm: -1.0 }.generate(0.01, 0.0).is_err());
        assert!(GaussianSlit { fwhm: f64::NAN }.generate(0.01, 0.0).is_err());
        assert!(
            TrapezoidalSlit {
                top: 2.0,
                base: 1.0
            }
            .generate(0.01, 0.0)
            .is_err()
        );
        assert!(TriangularSlit { fwhm: 1.0 }.generate(0.0, 0.0).is_err());
    }

    #[test]
    fn test_slit_type_by_name() {
        assert_eq!(slit_type_by_name("triangular").unwrap(), SlitType::Triangular);
        assert_eq!(slit_type_by_name("Gauss").unwrap(), SlitType::Gaussian);
        assert!(matches!(
            slit_type_by_name("boxcar"),
            Err(SlitError::UnknownShape(n)) if n == "boxcar"
        ));
    }
}
