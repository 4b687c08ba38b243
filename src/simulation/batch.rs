//! Run independent simulations side by side
//!
//! Each instance owns all of its state, so distinct instances can run on
//! separate threads. Results come back in input order.

use rayon::prelude::*;

use crate::core::error::Result;
use crate::core::types::Tick;
use crate::simulation::field::Field;
use crate::simulation::model::SecretionModel;

/// Run every model over `[0, t_end)` in parallel
pub fn run_many<M>(models: &mut [M], t_end: Tick, dt: f64) -> Vec<Result<Field>>
where
    M: SecretionModel + Send,
{
    tracing::info!(count = models.len(), t_end, dt, "starting batch run");
    models
        .par_iter_mut()
        .map(|model| model.run(t_end, dt))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EvType;
    use crate::entity::cell::CellAgent;
    use crate::simulation::engine::Simulation;
    use crate::simulation::supervisor::Supervisor;

    fn sim_with_escrt(escrt: f64) -> Simulation {
        let cell = CellAgent::new("C1", "generic")
            .with_internal(vec![0.6, 0.5])
            .unwrap()
            .with_escrt(escrt)
            .unwrap();
        Simulation::new(vec![cell], Supervisor::new()).unwrap()
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let mut batch: Vec<Simulation> = [0.2, 0.5, 0.8].iter().map(|&s| sim_with_escrt(s)).collect();
        let results = run_many(&mut batch, 4, 1.0);

        for (escrt, result) in [0.2, 0.5, 0.8].iter().zip(results) {
            let expected = sim_with_escrt(*escrt).run(4, 1.0).unwrap();
            assert_eq!(result.unwrap(), expected);
        }
    }

    #[test]
    fn test_batch_keeps_errors_per_model() {
        let mut batch = vec![sim_with_escrt(0.5), sim_with_escrt(0.7)];
        let results = run_many(&mut batch, 0, 1.0);
        assert!(results.iter().all(|r| r.as_ref().unwrap_err().is_config()));

        let results = run_many(&mut batch, 2, 1.0);
        let first = results[0].as_ref().unwrap().rate(EvType::Exosome, 0).unwrap();
        let second = results[1].as_ref().unwrap().rate(EvType::Exosome, 0).unwrap();
        assert!(second > first);
    }
}
