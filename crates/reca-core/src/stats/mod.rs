mod gamma;
mod noncentral;

pub use gamma::{chi_squared_cdf, chi_squared_critical, chi_squared_p_value, gamma_p, ln_gamma};
pub use noncentral::{compute_power, noncentral_chi_squared_cdf};

use crate::table::ContingencyTable;

/// Shannon entropy in bits, skipping non-positive cells.
pub fn entropy(table: &ContingencyTable) -> f64 {
    let mut h = 0.0;
    for (_, p) in table.iter() {
        if *p > 0.0 {
            h -= p * p.log2();
        }
    }
    h
}

/// Likelihood-ratio chi-squared comparing a fitted model against the data:
/// `2 * n * ln(2) * (h_model - h_data)`, with entropies in bits.
pub fn likelihood_ratio(n: f64, h_model: f64, h_data: f64) -> f64 {
    2.0 * n * std::f64::consts::LN_2 * (h_model - h_data)
}

/// Akaike information criterion relative to the saturated model. Lower is
/// better.
pub fn aic(lr: f64, ddf: i64) -> f64 {
    lr - 2.0 * ddf as f64
}

/// Bayesian information criterion relative to the saturated model. Lower is
/// better.
pub fn bic(lr: f64, ddf: i64, n: f64) -> f64 {
    lr - ddf as f64 * n.ln()
}

/// Fraction of the reference uncertainty removed by the model.
pub fn uncertainty_coefficient(h_max: f64, h_model: f64) -> f64 {
    if h_max == 0.0 {
        return 0.0;
    }
    (h_max - h_model) / h_max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::variable::VariableList;

    fn coin(p: f64) -> ContingencyTable {
        let mut vars = VariableList::new();
        vars.register("x", "x", 2, false).unwrap();
        let mut t = ContingencyTable::new(vars.key_size());
        t.add(Key::from_values(&vars, &[0]), p);
        t.add(Key::from_values(&vars, &[1]), 1.0 - p);
        t.sort();
        t
    }

    #[test]
    fn entropy_of_fair_coin_is_one_bit() {
        assert!((entropy(&coin(0.5)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn entropy_skips_zero_cells() {
        assert_eq!(entropy(&coin(1.0)), 0.0);
    }

    #[test]
    fn likelihood_ratio_is_zero_for_perfect_fit() {
        assert_eq!(likelihood_ratio(1000.0, 1.5, 1.5), 0.0);
        assert!(likelihood_ratio(1000.0, 1.6, 1.5) > 0.0);
    }

    #[test]
    fn criteria_penalize_degrees_of_freedom() {
        let lr = 10.0;
        assert_eq!(aic(lr, 3), 4.0);
        assert!((bic(lr, 3, 1008.0) - (10.0 - 3.0 * 1008.0f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn uncertainty_coefficient_bounds() {
        assert_eq!(uncertainty_coefficient(2.0, 2.0), 0.0);
        assert_eq!(uncertainty_coefficient(2.0, 1.0), 0.5);
        assert_eq!(uncertainty_coefficient(0.0, 0.0), 0.0);
    }
}
