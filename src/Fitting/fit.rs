use crate::Fitting::factory::{FitError, OUT_OF_BOUNDS_WARNING, SpectrumFactory};
use crate::Fitting::fit_models::FitModel;
use crate::Spectra::spectrum::{Spectrum, WaveUnit, convert_wavespace};
use argmin::core::{CostFunction, Error as ArgminError, Executor, State};
use argmin::solver::neldermead::NelderMead;
use log::info;
use nalgebra::DVector;
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Options forwarded to the simplex solver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolverOptions {
    /// iteration budget
    pub maxiter: u64,
    /// stop when the standard deviation of the simplex costs falls below this
    pub ftol: f64,
    /// relative displacement used to build the initial simplex
    pub initial_step: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            maxiter: 300,
            ftol: 1e-10,
            initial_step: 0.05,
        }
    }
}

/// Outcome of a spectral fit.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub best_parameters: HashMap<String, f64>,
    /// root-mean-square distance between model and experiment at the optimum
    pub residual: f64,
    pub iterations: u64,
    pub cost_evaluations: u64,
    pub termination: String,
}

impl FitResult {
    /// Print the fitted parameters and convergence data as a terminal table.
    pub fn pretty_print(&self) {
        let mut table = Table::new();
        table.add_row(row!["parameter", "best value"]);
        let mut names: Vec<&String> = self.best_parameters.keys().collect();
        names.sort();
        for name in names {
            table.add_row(row![name, format!("{:.6}", self.best_parameters[name])]);
        }
        table.add_row(row!["residual (rms)", format!("{:.3e}", self.residual)]);
        table.add_row(row!["iterations", self.iterations]);
        table.add_row(row!["cost evaluations", self.cost_evaluations]);
        table.add_row(row!["termination", &self.termination]);
        table.printstd();
    }
}

/// Scalar objective handed to the simplex solver: RMS distance between the
/// model spectrum and the experimental one on the experimental grid, plus a
/// smooth penalty that grows quadratically outside the bounds.
struct SpectralDistance<'a> {
    factory: &'a SpectrumFactory,
    model: &'a dyn FitModel,
    names: Vec<String>,
    bounds: Vec<(f64, f64)>,
    w_exp: Vec<f64>,
    i_exp: Vec<f64>,
    exp_wunit: WaveUnit,
    syn_quantity: String,
}

impl SpectralDistance<'_> {
    fn clamped_input(&self, p: &[f64]) -> (HashMap<String, f64>, f64) {
        let mut penalty = 0.0;
        let mut input = HashMap::new();
        for (i, name) in self.names.iter().enumerate() {
            let (lo, hi) = self.bounds[i];
            let span = if (hi - lo).is_finite() { hi - lo } else { 1.0 };
            let mut x = p[i];
            if x < lo {
                penalty += ((lo - x) / span).powi(2);
                x = lo;
            } else if x > hi {
                penalty += ((x - hi) / span).powi(2);
                x = hi;
            }
            input.insert(name.clone(), x);
        }
        (input, penalty)
    }

    fn distance(&self, input: &HashMap<String, f64>) -> Result<f64, FitError> {
        let s = self.model.eval(self.factory, input)?;
        let i_syn = self.synthetic_on_grid(s)?;
        let diff: Vec<f64> = i_syn
            .iter()
            .zip(self.i_exp.iter())
            .map(|(a, b)| a - b)
            .collect();
        let n = diff.len() as f64;
        Ok(DVector::from_vec(diff).norm() / n.sqrt())
    }

    /// Bring the synthetic spectrum onto the experimental grid, converting
    /// its wavespace unit first when the two disagree.
    fn synthetic_on_grid(&self, s: Spectrum) -> Result<Vec<f64>, FitError> {
        let s = if s.wunit == self.exp_wunit {
            s.sort()
        } else {
            let mut converted = s;
            converted.w = converted
                .w
                .iter()
                .map(|&w| convert_wavespace(w, converted.wunit, self.exp_wunit))
                .collect();
            converted.wunit = self.exp_wunit;
            converted.sort()
        };
        Ok(s.resample_quantity(&self.syn_quantity, &self.w_exp)?)
    }
}

impl CostFunction for SpectralDistance<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, ArgminError> {
        let (input, penalty) = self.clamped_input(p);
        let rms = self.distance(&input)?;
        Ok(rms * (1.0 + penalty) + penalty)
    }
}

impl SpectrumFactory {
    /// Fit a parametrized forward model against an experimental spectrum.
    ///
    /// `s_exp` must carry exactly one quantity (use `take` first). Every
    /// entry of `fit_parameters` is optimized, starting from the given
    /// value; `bounds` entries constrain parameters of the same name.
    /// Returns the best synthetic spectrum and the fit summary.
    pub fn fit_spectrum(
        &self,
        s_exp: &Spectrum,
        model: &dyn FitModel,
        fit_parameters: HashMap<String, f64>,
        bounds: HashMap<String, (f64, f64)>,
        solver_options: SolverOptions,
    ) -> Result<(Spectrum, FitResult), FitError> {
        if fit_parameters.is_empty() {
            return Err(FitError::NoFitParameters);
        }
        for name in bounds.keys() {
            if !fit_parameters.contains_key(name) {
                return Err(FitError::UnknownBound(name.clone()));
            }
        }
        let mut names: Vec<String> = fit_parameters.keys().cloned().collect();
        names.sort();

        let mut bounds_vec = Vec::with_capacity(names.len());
        let mut x0 = Vec::with_capacity(names.len());
        for name in &names {
            let (lo, hi) = bounds
                .get(name)
                .copied()
                .unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
            if lo.is_nan() || hi.is_nan() || !(lo < hi) {
                return Err(FitError::InvalidBounds {
                    name: name.clone(),
                    lo,
                    hi,
                });
            }
            let guess = fit_parameters[name];
            if !guess.is_finite() {
                return Err(FitError::InvalidConfig(format!(
                    "initial guess for '{}' is not finite: {}",
                    name, guess
                )));
            }
            let clamped = guess.clamp(lo, hi);
            if clamped != guess {
                self.emit_warning(
                    OUT_OF_BOUNDS_WARNING,
                    &format!(
                        "initial guess {} = {} clamped into bounds [{}, {}]",
                        name, guess, lo, hi
                    ),
                )?;
            }
            bounds_vec.push((lo, hi));
            x0.push(clamped);
        }

        // experimental side: one quantity, sorted grid
        if s_exp.quantities.len() != 1 {
            return Err(FitError::ExpectSingleQuantity(s_exp.quantities.len()));
        }
        let exp_quantity = s_exp.quantity_names()[0].clone();
        let s_exp_sorted = s_exp.clone().sort();
        let i_exp_full = s_exp_sorted.quantity(&exp_quantity)?.clone();

        // one model evaluation up front: validates the model and tells us the
        // synthetic wavespace range and quantity to compare against
        let input0: HashMap<String, f64> = names
            .iter()
            .cloned()
            .zip(x0.iter().copied())
            .collect();
        let s0 = model.eval(self, &input0)?.sort();
        let syn_quantity = if s0.quantities.contains_key(&exp_quantity) {
            exp_quantity.clone()
        } else if s0.quantities.len() == 1 {
            s0.quantity_names()[0].clone()
        } else {
            return Err(FitError::Model(format!(
                "synthetic spectrum carries none of '{}' and is not single-quantity (has: {})",
                exp_quantity,
                s0.quantity_names().join(", ")
            )));
        };
        if s0.w.is_empty() {
            return Err(FitError::NoOverlap);
        }
        let syn_lo = convert_wavespace(s0.w[0], s0.wunit, s_exp_sorted.wunit);
        let syn_hi = convert_wavespace(s0.w[s0.w.len() - 1], s0.wunit, s_exp_sorted.wunit);
        let (syn_lo, syn_hi) = if syn_lo <= syn_hi {
            (syn_lo, syn_hi)
        } else {
            (syn_hi, syn_lo)
        };

        let mut w_exp = Vec::new();
        let mut i_exp = Vec::new();
        for (&w, &v) in s_exp_sorted.w.iter().zip(i_exp_full.iter()) {
            if w >= syn_lo && w <= syn_hi {
                w_exp.push(w);
                i_exp.push(v);
            }
        }
        if w_exp.len() < 3 {
            return Err(FitError::NoOverlap);
        }

        info!(
            "fitting '{}' over [{:.4} - {:.4}] {} ({} points), parameters: {:?}",
            s_exp.name,
            w_exp[0],
            w_exp[w_exp.len() - 1],
            s_exp_sorted.wunit.label(),
            w_exp.len(),
            names
        );

        let problem = SpectralDistance {
            factory: self,
            model,
            names: names.clone(),
            bounds: bounds_vec.clone(),
            w_exp,
            i_exp,
            exp_wunit: s_exp_sorted.wunit,
            syn_quantity,
        };

        // initial simplex: the guess plus one vertex displaced along each axis
        let mut simplex = vec![x0.clone()];
        for i in 0..x0.len() {
            let (lo, hi) = bounds_vec[i];
            let span = if (hi - lo).is_finite() {
                hi - lo
            } else {
                x0[i].abs().max(1.0)
            };
            let step = (solver_options.initial_step * span).max(1e-8);
            let mut vertex = x0.clone();
            vertex[i] = if x0[i] + step <= hi {
                x0[i] + step
            } else {
                x0[i] - step
            };
            simplex.push(vertex);
        }

        let solver = NelderMead::new(simplex)
            .with_sd_tolerance(solver_options.ftol)
            .map_err(|e| FitError::Solver(e.to_string()))?;
        let result = Executor::new(problem, solver)
            .configure(|state| state.max_iters(solver_options.maxiter))
            .run()
            .map_err(|e| FitError::Solver(e.to_string()))?;

        let state = result.state();
        let best = state
            .get_best_param()
            .ok_or_else(|| FitError::Solver("solver returned no best parameter".to_string()))?;
        let mut best_parameters = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            let (lo, hi) = bounds_vec[i];
            best_parameters.insert(name.clone(), best[i].clamp(lo, hi));
        }
        let cost_evaluations = state
            .get_func_counts()
            .get("cost_count")
            .copied()
            .unwrap_or(0);
        let fit_result = FitResult {
            best_parameters: best_parameters.clone(),
            residual: state.get_best_cost(),
            iterations: state.get_iter(),
            cost_evaluations,
            termination: format!("{:?}", state.get_termination_status()),
        };

        let s_best = model.eval(self, &best_parameters)?.sort();
        info!(
            "fit finished after {} iterations, residual {:.3e}, best parameters {:?}",
            fit_result.iterations, fit_result.residual, fit_result.best_parameters
        );
        Ok((s_best, fit_result))
    }
}
