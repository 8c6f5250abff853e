/////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// TESTS
//////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use crate::Examples::band_engine::GaussianBandEngine;
    use crate::Fitting::factory::{
        FactoryConfig, FitError, OUT_OF_BOUNDS_WARNING, SpectrumFactory, SynthesisEngine,
        WarningAction,
    };
    use crate::Fitting::fit::SolverOptions;
    use crate::Fitting::fit_models::{FitModel, RotTemperatureModel, SlitNormalizedModel};
    use crate::Fitting::fit_task_parser::FitTask;
    use crate::Spectra::spectrum::{Spectrum, WaveUnit};
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn test_factory() -> SpectrumFactory {
        let config = FactoryConfig {
            wavelength_min: 4167.0,
            wavelength_max: 4180.0,
            wunit: WaveUnit::Nm,
            wstep: 0.01,
            pressure: 1.0e-3,
            path_length: 10.0,
            mole_fraction: 1.0,
            isotope: vec![1, 2],
            cutoff: 1e-25,
            broadening_max_width: 5.0,
        };
        let mut sf = SpectrumFactory::new(config).unwrap();
        let mut engine = GaussianBandEngine::co2_test_band();
        engine.load_databank("HITRAN-CO2-TEST").unwrap();
        sf.set_engine(Box::new(engine));
        sf
    }

    fn slit_model() -> SlitNormalizedModel {
        SlitNormalizedModel::new(Box::new(RotTemperatureModel), 1.4, WaveUnit::Nm)
    }

    /// a normalized "measured" spectrum produced at a known temperature
    fn synthetic_measurement(sf: &SpectrumFactory, trot: f64) -> Spectrum {
        slit_model()
            .eval(sf, &HashMap::from([("Trot".to_string(), trot)]))
            .unwrap()
    }

    #[test]
    fn test_fit_recovers_rotational_temperature() {
        let sf = test_factory();
        let s_exp = synthetic_measurement(&sf, 1450.0);

        let options = SolverOptions {
            maxiter: 200,
            ftol: 1e-12,
            ..Default::default()
        };
        let (s_best, best) = sf
            .fit_spectrum(
                &s_exp,
                &slit_model(),
                HashMap::from([("Trot".to_string(), 700.0)]),
                HashMap::from([("Trot".to_string(), (300.0, 2000.0))]),
                options,
            )
            .unwrap();

        let trot = best.best_parameters["Trot"];
        assert!(
            (trot - 1450.0).abs() < 20.0,
            "fitted Trot = {} K, expected ~1450 K",
            trot
        );
        assert!(best.residual < 1e-3);
        assert!(best.iterations > 0);
        assert!(s_best.quantities.contains_key("radiance"));
    }

    #[test]
    fn test_fit_two_parameters() {
        let sf = test_factory();
        // un-normalized model with a free amplitude scale on top of Trot
        let model = |factory: &SpectrumFactory,
                     input: &HashMap<String, f64>|
         -> Result<Spectrum, FitError> {
            let scale = *input
                .get("scale")
                .ok_or_else(|| FitError::Model("missing 'scale'".to_string()))?;
            let mut s = factory.eval_spectrum(input)?.apply_slit(1.4, "nm")?;
            for intensity in s.quantities.values_mut() {
                for v in intensity.iter_mut() {
                    *v *= scale;
                }
            }
            s.take("radiance").map_err(FitError::from)
        };
        let truth = HashMap::from([("Trot".to_string(), 1200.0), ("scale".to_string(), 2.5)]);
        let s_exp = FitModel::eval(&model, &sf, &truth).unwrap();

        let options = SolverOptions {
            maxiter: 500,
            ftol: 1e-14,
            ..Default::default()
        };
        let (_, best) = sf
            .fit_spectrum(
                &s_exp,
                &model,
                HashMap::from([("Trot".to_string(), 800.0), ("scale".to_string(), 1.0)]),
                HashMap::from([
                    ("Trot".to_string(), (300.0, 2000.0)),
                    ("scale".to_string(), (0.1, 10.0)),
                ]),
                options,
            )
            .unwrap();
        assert!((best.best_parameters["Trot"] - 1200.0).abs() < 50.0);
        assert!((best.best_parameters["scale"] - 2.5).abs() < 0.2);
    }

    #[test]
    fn test_initial_guess_outside_bounds_is_clamped() {
        let sf = test_factory();
        let s_exp = synthetic_measurement(&sf, 900.0);
        // guess below the lower bound: clamped with a warning, fit still runs
        let (_, best) = sf
            .fit_spectrum(
                &s_exp,
                &slit_model(),
                HashMap::from([("Trot".to_string(), 100.0)]),
                HashMap::from([("Trot".to_string(), (300.0, 2000.0))]),
                SolverOptions::default(),
            )
            .unwrap();
        assert!((best.best_parameters["Trot"] - 900.0).abs() < 30.0);
    }

    #[test]
    fn test_out_of_bounds_warning_escalated() {
        let mut sf = test_factory();
        sf.set_warning(OUT_OF_BOUNDS_WARNING, WarningAction::Error);
        let s_exp = synthetic_measurement(&sf, 900.0);
        let result = sf.fit_spectrum(
            &s_exp,
            &slit_model(),
            HashMap::from([("Trot".to_string(), 100.0)]),
            HashMap::from([("Trot".to_string(), (300.0, 2000.0))]),
            SolverOptions::default(),
        );
        assert!(matches!(
            result,
            Err(FitError::WarningEscalated { category, .. }) if category == OUT_OF_BOUNDS_WARNING
        ));
    }

    #[test]
    fn test_unknown_bound_rejected() {
        let sf = test_factory();
        let s_exp = synthetic_measurement(&sf, 900.0);
        let result = sf.fit_spectrum(
            &s_exp,
            &slit_model(),
            HashMap::from([("Trot".to_string(), 900.0)]),
            HashMap::from([("Tvib".to_string(), (300.0, 2000.0))]),
            SolverOptions::default(),
        );
        assert!(matches!(result, Err(FitError::UnknownBound(name)) if name == "Tvib"));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let sf = test_factory();
        let s_exp = synthetic_measurement(&sf, 900.0);
        let result = sf.fit_spectrum(
            &s_exp,
            &slit_model(),
            HashMap::from([("Trot".to_string(), 900.0)]),
            HashMap::from([("Trot".to_string(), (2000.0, 300.0))]),
            SolverOptions::default(),
        );
        assert!(matches!(result, Err(FitError::InvalidBounds { .. })));
    }

    #[test]
    fn test_no_fit_parameters() {
        let sf = test_factory();
        let s_exp = synthetic_measurement(&sf, 900.0);
        let result = sf.fit_spectrum(
            &s_exp,
            &slit_model(),
            HashMap::new(),
            HashMap::new(),
            SolverOptions::default(),
        );
        assert!(matches!(result, Err(FitError::NoFitParameters)));
    }

    #[test]
    fn test_multi_quantity_experiment_rejected() {
        let sf = test_factory();
        let mut s_exp = synthetic_measurement(&sf, 900.0);
        let extra = vec![0.0; s_exp.w.len()];
        s_exp.add_quantity("transmittance", extra, "").unwrap();
        let result = sf.fit_spectrum(
            &s_exp,
            &slit_model(),
            HashMap::from([("Trot".to_string(), 900.0)]),
            HashMap::new(),
            SolverOptions::default(),
        );
        assert!(matches!(result, Err(FitError::ExpectSingleQuantity(2))));
    }

    #[test]
    fn test_disjoint_ranges_rejected() {
        let sf = test_factory();
        // an "experimental" spectrum far outside the synthesis window
        let w: Vec<f64> = (0..100).map(|i| 5000.0 + 0.01 * i as f64).collect();
        let intensity = vec![1.0; w.len()];
        let s_exp =
            Spectrum::from_arrays("far", WaveUnit::Nm, w, "radiance", intensity, "").unwrap();
        let result = sf.fit_spectrum(
            &s_exp,
            &slit_model(),
            HashMap::from([("Trot".to_string(), 900.0)]),
            HashMap::new(),
            SolverOptions::default(),
        );
        assert!(matches!(result, Err(FitError::NoOverlap)));
    }

    #[test]
    fn test_fit_task_end_to_end() {
        let sf = test_factory();
        let s_exp = synthetic_measurement(&sf, 1450.0);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            b"FIT_TASK
name: CO2 one temperature
range: 4168 4179 nm
quantity: radiance
initial: Trot 700
bounds: Trot 300 2000
maxiter: 200
ftol: 1e-12
slit: 1.4 nm triangular
",
        )
        .unwrap();

        let task = FitTask::parse_file(file.path().to_str().unwrap()).unwrap();
        let (_, best) = task
            .run(&sf, Box::new(RotTemperatureModel), &s_exp)
            .unwrap();
        let trot = best.best_parameters["Trot"];
        assert!(
            (trot - 1450.0).abs() < 25.0,
            "fitted Trot = {} K, expected ~1450 K",
            trot
        );
        best.pretty_print();
    }
}
