/////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// TESTS
//////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use crate::Slit::slit_processing::{
        ConvMode, SlitNorm, convolve_with_slit, crop_slit, get_FWHM, get_effective_FWHM,
        plot_slit, recenter_slit,
    };
    use crate::Slit::slit_shapes::{
        GaussianSlit, SlitEnum, SlitError, SlitGenerator, TriangularSlit,
    };
    use crate::Spectra::spectrum::{Spectrum, WaveUnit};
    use crate::Utils::interpolation::trapz;
    use approx::assert_relative_eq;

    const WSTEP: f64 = 0.01;

    fn spike_spectrum() -> (Vec<f64>, Vec<f64>) {
        // a single delta-like line in the middle of the grid
        let w: Vec<f64> = (0..=1000).map(|i| 4170.0 + WSTEP * i as f64).collect();
        let mut intensity = vec![0.0; w.len()];
        intensity[500] = 1.0;
        (w, intensity)
    }

    #[test]
    fn test_delta_line_reproduces_kernel_shape() {
        let (w, intensity) = spike_spectrum();
        let slit = TriangularSlit { fwhm: 1.0 };
        let (w_slit, i_slit) = slit.generate(WSTEP, 0.0).unwrap();
        let (w_conv, i_conv) = convolve_with_slit(
            &w,
            &intensity,
            &w_slit,
            &i_slit,
            SlitNorm::Area,
            ConvMode::Valid,
        )
        .unwrap();
        // the broadened line has the kernel FWHM
        let fwhm = get_FWHM(&w_conv, &i_conv).unwrap();
        assert_relative_eq!(fwhm, 1.0, epsilon = 3.0 * WSTEP);
        // area-normalized kernel conserves the line's integrated intensity
        // (the delta carries area 1.0 * wstep)
        let area = trapz(&w_conv, &i_conv);
        assert_relative_eq!(area, WSTEP, epsilon = 1e-6);
    }

    #[test]
    fn test_flat_signal_is_preserved() {
        let w: Vec<f64> = (0..500).map(|i| WSTEP * i as f64).collect();
        let intensity = vec![0.7; w.len()];
        let slit = GaussianSlit { fwhm: 0.5 };
        let (w_slit, i_slit) = slit.generate(WSTEP, 0.0).unwrap();
        let (_, i_conv) = convolve_with_slit(
            &w,
            &intensity,
            &w_slit,
            &i_slit,
            SlitNorm::Area,
            ConvMode::Valid,
        )
        .unwrap();
        for v in &i_conv {
            assert_relative_eq!(*v, 0.7, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_uneven_grid_is_rejected() {
        let w = vec![0.0, 0.01, 0.03, 0.06];
        let intensity = vec![0.0, 1.0, 0.0, 0.0];
        let slit = TriangularSlit { fwhm: 0.02 };
        let (w_slit, i_slit) = slit.generate(0.01, 0.0).unwrap();
        let result = convolve_with_slit(
            &w,
            &intensity,
            &w_slit,
            &i_slit,
            SlitNorm::Area,
            ConvMode::Valid,
        );
        assert!(matches!(result, Err(SlitError::UnevenGrid)));
    }

    #[test]
    fn test_kernel_wider_than_spectrum() {
        let w = vec![0.0, 0.01, 0.02];
        let intensity = vec![0.0, 1.0, 0.0];
        let slit = TriangularSlit { fwhm: 1.0 };
        let (w_slit, i_slit) = slit.generate(0.01, 0.0).unwrap();
        let result = convolve_with_slit(
            &w,
            &intensity,
            &w_slit,
            &i_slit,
            SlitNorm::Area,
            ConvMode::Valid,
        );
        assert!(matches!(
            result,
            Err(SlitError::KernelWiderThanSpectrum { .. })
        ));
    }

    #[test]
    fn test_kernel_resampled_when_steps_differ() {
        let (w, intensity) = spike_spectrum();
        // kernel tabulated on a 3x coarser step
        let slit = TriangularSlit { fwhm: 1.0 };
        let (w_slit, i_slit) = slit.generate(3.0 * WSTEP, 0.0).unwrap();
        let (w_conv, i_conv) = convolve_with_slit(
            &w,
            &intensity,
            &w_slit,
            &i_slit,
            SlitNorm::Area,
            ConvMode::Valid,
        )
        .unwrap();
        let fwhm = get_FWHM(&w_conv, &i_conv).unwrap();
        assert_relative_eq!(fwhm, 1.0, epsilon = 0.05);
    }

    #[test]
    fn test_same_mode_keeps_grid() {
        let (w, intensity) = spike_spectrum();
        let slit = TriangularSlit { fwhm: 0.5 };
        let (w_slit, i_slit) = slit.generate(WSTEP, 0.0).unwrap();
        let (w_conv, i_conv) = convolve_with_slit(
            &w,
            &intensity,
            &w_slit,
            &i_slit,
            SlitNorm::Area,
            ConvMode::Same,
        )
        .unwrap();
        assert_eq!(w_conv.len(), w.len());
        assert_eq!(i_conv.len(), w.len());
    }

    #[test]
    fn test_effective_fwhm_of_triangle() {
        // for a unit-peak triangle the integral equals the FWHM exactly
        let slit = TriangularSlit { fwhm: 1.4 };
        let (w_slit, i_slit) = slit.generate(0.001, 0.0).unwrap();
        let eff = get_effective_FWHM(&w_slit, &i_slit).unwrap();
        assert_relative_eq!(eff, 1.4, epsilon = 1e-2);
        let geo = get_FWHM(&w_slit, &i_slit).unwrap();
        assert_relative_eq!(geo, 1.4, epsilon = 1e-2);
    }

    #[test]
    fn test_fwhm_peak_on_edge() {
        let w = vec![0.0, 1.0, 2.0];
        let intensity = vec![1.0, 0.5, 0.1];
        assert!(matches!(
            get_FWHM(&w, &intensity),
            Err(SlitError::FwhmNotFound(_))
        ));
    }

    #[test]
    fn test_recenter_slit() {
        // a kernel centered on 5.0 instead of zero
        let slit = GaussianSlit { fwhm: 1.0 };
        let (w_slit, i_slit) = slit.generate(0.01, 5.0).unwrap();
        let recentered = recenter_slit(&w_slit, &i_slit, 0.0).unwrap();
        let weighted: Vec<f64> = recentered
            .iter()
            .zip(i_slit.iter())
            .map(|(&x, &y)| x * y)
            .collect();
        let centroid = trapz(&recentered, &weighted) / trapz(&recentered, &i_slit);
        assert_relative_eq!(centroid, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_crop_slit_drops_wings() {
        let slit = GaussianSlit { fwhm: 1.0 };
        let (w_slit, i_slit) = slit.generate(0.01, 0.0).unwrap();
        let (w_cut, i_cut) = crop_slit(&w_slit, &i_slit, 0.01).unwrap();
        assert!(w_cut.len() < w_slit.len());
        let min = i_cut.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        assert!(min >= 0.01 - 1e-12);
        // the core of the kernel survives
        let fwhm = get_FWHM(&w_cut, &i_cut).unwrap();
        assert_relative_eq!(fwhm, 1.0, epsilon = 0.02);
    }

    #[test]
    fn test_crop_slit_bad_threshold() {
        let w = vec![0.0, 1.0, 2.0];
        let intensity = vec![0.0, 1.0, 0.0];
        assert!(crop_slit(&w, &intensity, 1.5).is_err());
    }

    #[test]
    fn test_plot_slit_runs() {
        let slit = TriangularSlit { fwhm: 1.4 };
        let (w_slit, i_slit) = slit.generate(0.01, 0.0).unwrap();
        plot_slit(&w_slit, &i_slit, "triangular 1.4 nm").unwrap();
    }

    #[test]
    fn test_apply_slit_on_spectrum() {
        let w: Vec<f64> = (0..=1000).map(|i| 4170.0 + WSTEP * i as f64).collect();
        let mut intensity = vec![0.0; w.len()];
        intensity[500] = 1.0;
        let s = Spectrum::from_arrays(
            "synthetic",
            WaveUnit::Nm,
            w,
            "radiance_noslit",
            intensity,
            "mW/cm2/sr/nm",
        )
        .unwrap();

        let s = s.apply_slit(1.4, "nm").unwrap();
        // the convolved quantity appears, the raw one survives, grids agree
        let radiance = s.quantity("radiance").unwrap();
        let noslit = s.quantity("radiance_noslit").unwrap();
        assert_eq!(radiance.len(), s.w.len());
        assert_eq!(noslit.len(), s.w.len());
        assert!(s.slit.is_some());

        let fwhm = get_FWHM(&s.w, radiance).unwrap();
        assert_relative_eq!(fwhm, 1.4, epsilon = 3.0 * WSTEP);
    }

    #[test]
    fn test_apply_slit_wrong_unit() {
        let w: Vec<f64> = (0..100).map(|i| 4170.0 + WSTEP * i as f64).collect();
        let intensity = vec![1.0; w.len()];
        let s = Spectrum::from_arrays("s", WaveUnit::Nm, w, "radiance_noslit", intensity, "")
            .unwrap();
        assert!(matches!(
            s.apply_slit(10.0, "cm-1"),
            Err(SlitError::WaveUnitMismatch { .. })
        ));
    }

    #[test]
    fn test_apply_slit_nothing_to_convolve() {
        let w: Vec<f64> = (0..100).map(|i| 4170.0 + WSTEP * i as f64).collect();
        let intensity = vec![1.0; w.len()];
        let s =
            Spectrum::from_arrays("s", WaveUnit::Nm, w, "radiance", intensity, "").unwrap();
        assert!(matches!(
            s.apply_slit(0.2, "nm"),
            Err(SlitError::NothingToConvolve)
        ));
    }

    #[test]
    fn test_apply_slit_with_gaussian_shape() {
        let w: Vec<f64> = (0..=1000).map(|i| 4170.0 + WSTEP * i as f64).collect();
        let mut intensity = vec![0.0; w.len()];
        intensity[500] = 1.0;
        let s = Spectrum::from_arrays(
            "synthetic",
            WaveUnit::Nm,
            w,
            "radiance_noslit",
            intensity,
            "",
        )
        .unwrap();
        let s = s
            .apply_slit_with(
                &SlitEnum::Gaussian(GaussianSlit { fwhm: 1.0 }),
                "nm",
                SlitNorm::Area,
                ConvMode::Valid,
            )
            .unwrap();
        let fwhm = get_FWHM(&s.w, s.quantity("radiance").unwrap()).unwrap();
        assert_relative_eq!(fwhm, 1.0, epsilon = 3.0 * WSTEP);
    }
}
