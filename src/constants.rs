pub const PROB_EPS: f64 = 1e-15;
pub const DEGENERACY_EPS: f64 = 1e-12;
pub const SMALL_FOLD_WARNING: usize = 10;
