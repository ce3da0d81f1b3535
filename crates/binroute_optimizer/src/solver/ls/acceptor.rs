use rand::Rng;

use crate::solver::solution::working_solution::WorkingSolution;

#[derive(Debug, Clone, PartialEq)]
pub struct AnnealingParams {
    /// Initial temperature as a share of the mean route cost per assigned bin.
    pub temperature_ratio: f64,

    /// Final share of the iteration budget in which only improving moves
    /// are accepted.
    pub deterministic_fraction: f64,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        AnnealingParams {
            temperature_ratio: 0.05,
            deterministic_fraction: 0.3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedAnnealingAcceptor {
    initial_temperature: f64,
    deterministic_fraction: f64,
}

impl SimulatedAnnealingAcceptor {
    pub fn new(params: &AnnealingParams, solution: &WorkingSolution) -> Self {
        let assigned = solution
            .routes()
            .iter()
            .map(|route| route.len())
            .sum::<usize>();
        let route_cost = solution
            .routes()
            .iter()
            .map(|route| route.cost())
            .sum::<f64>();

        SimulatedAnnealingAcceptor {
            initial_temperature: params.temperature_ratio * route_cost / assigned.max(1) as f64,
            deterministic_fraction: params.deterministic_fraction.clamp(0.0, 1.0),
        }
    }

    pub fn initial_temperature(&self) -> f64 {
        self.initial_temperature
    }

    /// Linear decay reaching zero where the deterministic phase starts.
    pub fn temperature(&self, progress: f64) -> f64 {
        let annealing_end = 1.0 - self.deterministic_fraction;
        if progress >= annealing_end {
            return 0.0;
        }

        self.initial_temperature * (1.0 - progress / annealing_end)
    }

    /// Metropolis rule.
    pub fn accept<R: Rng>(&self, delta: f64, temperature: f64, rng: &mut R) -> bool {
        if delta <= 0.0 {
            return true;
        }

        if temperature <= 0.0 {
            return false;
        }

        rng.random::<f64>() < (-delta / temperature).exp()
    }
}
