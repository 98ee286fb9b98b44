//! Adaptive composite-Simpson quadrature, used by [`crate::likelihood`] to
//! marginalize a segment's χ² contribution.

/// A stateless adaptive composite-Simpson integrator: doubles the
/// subinterval count starting from `n_min` until two successive estimates
/// agree to within `tolerance` (relative), or `n_max` is reached.
pub struct Simpson {
    pub n_min: usize,
    pub n_max: usize,
    pub tolerance: f64,
}

impl Simpson {
    /// A Simpson integrator with the given minimum subinterval count,
    /// maximum, and relative convergence tolerance.
    pub fn new(n_min: usize, n_max: usize, tolerance: f64) -> Self {
        let n_min = n_min.max(2);
        let n_min = if n_min % 2 == 0 { n_min } else { n_min + 1 };
        Simpson {
            n_min,
            n_max: n_max.max(n_min),
            tolerance,
        }
    }

    /// Integrate `f` over `[a, b]`, doubling the subinterval count from
    /// `n_min` until the relative change between successive estimates drops
    /// below `tolerance` or `n_max` is reached.
    ///
    /// # Arguments
    /// * `f` - the integrand, called at each quadrature node.
    /// * `a` - lower bound of integration.
    /// * `b` - upper bound of integration.
    ///
    /// # Returns
    /// The composite-Simpson estimate at the subinterval count where
    /// convergence was declared (or at `n_max`, if it never converged).
    ///
    /// # Example
    /// ```
    /// use tracklike::quadrature::Simpson;
    ///
    /// let simpson = Simpson::new(16, 1 << 16, 1e-8);
    /// let area = simpson.integrate(|x| x * x, 0.0, 3.0);
    /// assert!((area - 9.0).abs() < 1e-6);
    /// ```
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F, a: f64, b: f64) -> f64 {
        let mut n = self.n_min;
        let mut estimate = composite_simpson(&f, a, b, n);
        while n < self.n_max {
            let next_n = (n * 2).min(self.n_max);
            let next_estimate = composite_simpson(&f, a, b, next_n);
            let relative_change = if next_estimate.abs() > 0.0 {
                ((next_estimate - estimate) / next_estimate).abs()
            } else {
                (next_estimate - estimate).abs()
            };
            #[cfg(feature = "std")]
            log::debug!(
                "simpson: n={next_n} estimate={next_estimate} relative_change={relative_change}"
            );
            estimate = next_estimate;
            if relative_change < self.tolerance || next_n == n {
                break;
            }
            n = next_n;
        }
        estimate
    }
}

/// Composite Simpson's rule over `[a, b]` split into `n` subintervals (`n`
/// rounded up to the nearest even number).
fn composite_simpson<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64, n: usize) -> f64 {
    let n = if n % 2 == 0 { n } else { n + 1 }.max(2);
    let h = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for i in 1..n {
        let x = a + i as f64 * h;
        let weight = if i % 2 == 0 { 2.0 } else { 4.0 };
        sum += weight * f(x);
    }
    sum * h / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrates_constant_exactly() {
        let s = Simpson::new(4, 64, 1e-10);
        let value = s.integrate(|_| 3.0, 0.0, 2.0);
        assert!((value - 6.0).abs() < 1e-9);
    }

    #[test]
    fn integrates_polynomial_exactly() {
        let s = Simpson::new(4, 64, 1e-10);
        let value = s.integrate(|x| x * x, 0.0, 3.0);
        assert!((value - 9.0).abs() < 1e-8);
    }

    #[test]
    fn converges_for_a_smooth_nonpolynomial_integrand() {
        let s = Simpson::new(4, 1 << 14, 1e-10);
        let value = s.integrate(|x| (-x * x / 2.0).exp(), -6.0, 6.0);
        let expected = (2.0 * std::f64::consts::PI).sqrt();
        assert!((value - expected).abs() < 1e-6);
    }
}
