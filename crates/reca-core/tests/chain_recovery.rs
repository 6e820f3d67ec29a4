//! Fitting the generating structure of sampled data should not be
//! rejected, and a too-sparse structure should be.

#[cfg(test)]
mod chain_recovery {
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};
    use reca_core::key::Key;
    use reca_core::manager::VbManager;
    use reca_core::table::ContingencyTable;
    use reca_core::variable::VariableList;
    use std::sync::Arc;

    const STRENGTH: f64 = 0.9;
    const SAMPLES: usize = 5000;

    fn chain_vars() -> Arc<VariableList> {
        let mut vars = VariableList::new();
        vars.register("a", "a", 2, false).unwrap();
        vars.register("b", "b", 2, false).unwrap();
        vars.register("c", "c", 2, false).unwrap();
        Arc::new(vars)
    }

    /// Draw rows from the chain a -> b -> c with the given transition
    /// strength.
    fn sampled_counts(vars: &VariableList, seed: u64) -> ContingencyTable {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut table = ContingencyTable::new(vars.key_size());
        for _ in 0..SAMPLES {
            let a = usize::from(rng.random_bool(0.5));
            let b = if rng.random_bool(STRENGTH) { a } else { 1 - a };
            let c = if rng.random_bool(STRENGTH) { b } else { 1 - b };
            table.add(Key::from_values(vars, &[a, b, c]), 1.0);
        }
        table.sort();
        table.sum_into();
        table
    }

    /// The chain's exact cell probabilities scaled to the sample size.
    fn expected_counts(vars: &VariableList) -> ContingencyTable {
        let mut table = ContingencyTable::new(vars.key_size());
        for a in 0..2usize {
            for b in 0..2usize {
                for c in 0..2usize {
                    let p = 0.5
                        * if b == a { STRENGTH } else { 1.0 - STRENGTH }
                        * if c == b { STRENGTH } else { 1.0 - STRENGTH };
                    table.add(Key::from_values(vars, &[a, b, c]), p * SAMPLES as f64);
                }
            }
        }
        table.sort();
        table
    }

    #[test]
    fn true_model_is_not_rejected_on_sampled_data() {
        let vars = chain_vars();
        let mut mgr = VbManager::new(Arc::clone(&vars), &sampled_counts(&vars, 7));
        let model = mgr.make_model("AB:BC").unwrap();
        let fit = mgr.fit_model(&model);

        assert!(!fit.has_loops);
        assert_eq!(fit.ddf, 2);
        assert!(fit.alpha > 0.01, "alpha = {}", fit.alpha);
    }

    #[test]
    fn true_model_fits_exact_chain_proportions_perfectly() {
        let vars = chain_vars();
        let mut mgr = VbManager::new(Arc::clone(&vars), &expected_counts(&vars));
        let model = mgr.make_model("AB:BC").unwrap();
        let fit = mgr.fit_model(&model);

        assert!(fit.lr.abs() < 1e-8);
        assert!(fit.alpha > 0.99);
    }

    #[test]
    fn independence_is_firmly_rejected() {
        let vars = chain_vars();
        let mut mgr = VbManager::new(Arc::clone(&vars), &sampled_counts(&vars, 7));
        let bottom = mgr.bottom_ref_model();
        let fit = mgr.fit_model(&bottom);

        assert!(fit.lr > 1000.0);
        assert!(fit.alpha < 1e-9);
    }

    #[test]
    fn reversed_chain_fits_equally_well_on_exact_data() {
        // a chain read backward encodes the same conditional independence
        let vars = chain_vars();
        let mut mgr = VbManager::new(Arc::clone(&vars), &expected_counts(&vars));
        let forward = mgr.make_model("AB:BC").unwrap();
        let backward = mgr.make_model("CB:BA").unwrap();
        assert_eq!(forward, backward);
        let h_forward = mgr.compute_h(&forward);
        let h_backward = mgr.compute_h(&backward);
        assert_eq!(h_forward, h_backward);
    }
}
