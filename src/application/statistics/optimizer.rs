//! Derivative-free minimisation (Nelder-Mead simplex).

/// Settings for [`NelderMead`].
#[derive(Debug, Clone, Copy)]
pub struct NelderMeadConfig {
    pub max_iterations: usize,
    /// Stop when the spread of objective values across the simplex is below this.
    pub f_tolerance: f64,
    /// Stop when every vertex is within this distance of the best one.
    pub x_tolerance: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            f_tolerance: 1e-10,
            x_tolerance: 1e-8,
        }
    }
}

/// Result of a minimisation.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Nelder-Mead with the standard coefficients (reflect 1, expand 2,
/// contract 1/2, shrink 1/2).
pub struct NelderMead {
    config: NelderMeadConfig,
}

impl NelderMead {
    pub fn new(config: NelderMeadConfig) -> Self {
        Self { config }
    }

    /// Minimises `objective` starting from `start`, with an initial simplex
    /// built by stepping each coordinate by `steps[i]`.
    ///
    /// Non-finite objective values are treated as +inf.
    pub fn minimize<F>(&self, objective: F, start: &[f64], steps: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let dim = start.len();
        let eval = |x: &[f64]| {
            let v = objective(x);
            if v.is_finite() { v } else { f64::INFINITY }
        };

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dim + 1);
        simplex.push((start.to_vec(), eval(start)));
        for i in 0..dim {
            let mut vertex = start.to_vec();
            vertex[i] += steps[i];
            let value = eval(&vertex);
            simplex.push((vertex, value));
        }

        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.config.max_iterations {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            if self.has_converged(&simplex) {
                converged = true;
                break;
            }
            iterations += 1;

            let worst = dim;
            let centroid: Vec<f64> = (0..dim)
                .map(|j| simplex[..worst].iter().map(|(x, _)| x[j]).sum::<f64>() / dim as f64)
                .collect();
            let along = |t: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&simplex[worst].0)
                    .map(|(c, w)| c + t * (c - w))
                    .collect()
            };

            let reflected = along(1.0);
            let f_reflected = eval(&reflected);

            if f_reflected < simplex[0].1 {
                let expanded = along(2.0);
                let f_expanded = eval(&expanded);
                simplex[worst] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
                continue;
            }
            if f_reflected < simplex[worst - 1].1 {
                simplex[worst] = (reflected, f_reflected);
                continue;
            }

            let (contracted, f_contracted) = if f_reflected < simplex[worst].1 {
                let outside = along(0.5);
                let f = eval(&outside);
                (outside, f)
            } else {
                let inside = along(-0.5);
                let f = eval(&inside);
                (inside, f)
            };
            if f_contracted < simplex[worst].1.min(f_reflected) {
                simplex[worst] = (contracted, f_contracted);
                continue;
            }

            // Shrink towards the best vertex
            let best = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let shrunk: Vec<f64> = best
                    .iter()
                    .zip(&vertex.0)
                    .map(|(b, x)| b + 0.5 * (x - b))
                    .collect();
                let value = eval(&shrunk);
                *vertex = (shrunk, value);
            }
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (x, value) = simplex.swap_remove(0);
        Minimum {
            x,
            value,
            iterations,
            converged,
        }
    }

    fn has_converged(&self, sorted: &[(Vec<f64>, f64)]) -> bool {
        let best = &sorted[0];
        let worst = &sorted[sorted.len() - 1];
        if !best.1.is_finite() {
            return false;
        }
        let f_spread = (worst.1 - best.1).abs();
        let x_spread = sorted
            .iter()
            .skip(1)
            .flat_map(|(x, _)| x.iter().zip(&best.0).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        f_spread <= self.config.f_tolerance && x_spread <= self.config.x_tolerance
    }
}
