use crate::Examples::band_engine::GaussianBandEngine;
use crate::Fitting::factory::{
    FactoryConfig, HIGH_TEMPERATURE_WARNING, MISSING_SELF_BROADENING_WARNING, SpectrumFactory,
    SynthesisEngine, WarningAction,
};
use crate::Fitting::fit::SolverOptions;
use crate::Fitting::fit_models::{FitModel, RotTemperatureModel, SlitNormalizedModel};
use crate::Fitting::fit_task_parser::FitTask;
use crate::Spectra::spectrum_loader::load_spec;
use crate::Spectra::spectrum::WaveUnit;
use std::collections::HashMap;

fn demo_factory(wlmin: f64, wlmax: f64) -> SpectrumFactory {
    let config = FactoryConfig {
        wavelength_min: wlmin,
        wavelength_max: wlmax,
        wunit: WaveUnit::Nm,
        wstep: 0.01,
        pressure: 1.0e-3, // bar
        path_length: 10.0, // cm
        mole_fraction: 1.0,
        isotope: FactoryConfig::parse_isotope("1,2").unwrap(),
        cutoff: 1e-25,
        broadening_max_width: 5.0,
    };
    let mut sf = SpectrumFactory::new(config).unwrap();
    sf.set_warning(MISSING_SELF_BROADENING_WARNING, WarningAction::Ignore);
    sf.set_warning(HIGH_TEMPERATURE_WARNING, WarningAction::Ignore);
    let mut engine = GaussianBandEngine::co2_test_band();
    engine.load_databank("HITRAN-CO2-TEST").unwrap();
    sf.set_engine(Box::new(engine));
    sf
}

pub fn fit_examples(task: usize) {
    match task {
        0 => {
            // One-temperature fit: synthesize a "measured" CO2 band at
            // 1450 K, push it through a .spec file round trip and the usual
            // preprocessing, then fit the rotational temperature back
            // starting from a cold guess.
            let wlmin = 4167.0;
            let wlmax = 4180.0;
            let sf = demo_factory(wlmin, wlmax);

            let model = SlitNormalizedModel::new(Box::new(RotTemperatureModel), 1.4, WaveUnit::Nm);
            let truth = HashMap::from([("Trot".to_string(), 1450.0)]);
            let s_measured = model.eval(&sf, &truth).unwrap();

            let spec_path = std::env::temp_dir().join("CO2_measured_spectrum_4-5um.spec");
            let spec_path = spec_path.to_str().unwrap();
            s_measured.store(spec_path).unwrap();

            let s_exp = load_spec(spec_path)
                .unwrap()
                .crop(wlmin, wlmax, "nm")
                .unwrap()
                .normalize()
                .unwrap()
                .sort();

            let (s_best, best) = sf
                .fit_spectrum(
                    &s_exp,
                    &model,
                    HashMap::from([("Trot".to_string(), 700.0)]),
                    HashMap::from([("Trot".to_string(), (300.0, 2000.0))]),
                    SolverOptions {
                        maxiter: 50, // increase to let the fit converge further
                        ftol: 1e-15,
                        ..Default::default()
                    },
                )
                .unwrap();
            best.pretty_print();
            println!(
                "true Trot: 1450 K, fitted Trot: {:.1} K over {} spectral points",
                best.best_parameters["Trot"],
                s_best.w.len()
            );
        }
        1 => {
            // The same fit, configured from a task file instead of code.
            let task_text = "
FIT_TASK
name: CO2 one temperature
range: 4167 4180 nm
quantity: radiance
initial: Trot 700
bounds: Trot 300 2000
maxiter: 50
ftol: 1e-15
slit: 1.4 nm triangular
";
            let sf = demo_factory(4167.0, 4180.0);
            let model = SlitNormalizedModel::new(Box::new(RotTemperatureModel), 1.4, WaveUnit::Nm);
            let s_exp = model
                .eval(&sf, &HashMap::from([("Trot".to_string(), 1450.0)]))
                .unwrap();

            let task = FitTask::parse_document(task_text).unwrap();
            println!("parsed task '{}'", task.name);
            let (_, best) = task
                .run(&sf, Box::new(RotTemperatureModel), &s_exp)
                .unwrap();
            best.pretty_print();
        }
        _ => println!("no such fit example: {}", task),
    }
}
