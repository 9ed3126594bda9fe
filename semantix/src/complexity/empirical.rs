//! Fitting observed step counts against candidate growth classes

use super::growth::Growth;
use serde::Serialize;

/// Fewest distinct input sizes a fit is attempted with
const MIN_SIZES: usize = 3;

/// Largest relative spread of `steps / f(n)` accepted as a fit
const MAX_SPREAD: f64 = 0.35;

const CANDIDATES: [Growth; 7] = [
    Growth::CONSTANT,
    Growth::LOG,
    Growth::LINEAR,
    Growth::LINEARITHMIC,
    Growth::QUADRATIC,
    Growth::CUBIC,
    Growth::Exponential,
];

/// Cost of one run at a known input size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizedTrace {
    pub size: u64,
    pub steps: usize,
    pub max_depth: usize,
}

/// Best-fitting class for steps (time) and call depth (stack)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub time: Growth,
    pub stack: Growth,
}

pub fn fit(samples: &[SizedTrace]) -> Option<Fit> {
    let mut samples: Vec<SizedTrace> = samples.to_vec();
    samples.sort_by_key(|s| s.size);
    samples.dedup_by_key(|s| s.size);
    if samples.len() < MIN_SIZES {
        return None;
    }
    let steps: Vec<(f64, f64)> = samples
        .iter()
        .map(|s| (s.size as f64, s.steps as f64))
        .collect();
    let depths: Vec<(f64, f64)> = samples
        .iter()
        .map(|s| (s.size as f64, s.max_depth as f64))
        .collect();
    Some(Fit {
        time: best_class(&steps)?,
        stack: best_class(&depths).unwrap_or(Growth::Unknown),
    })
}

/// Candidate whose ratio `y / f(n)` varies least across the samples
fn best_class(points: &[(f64, f64)]) -> Option<Growth> {
    let mut best: Option<(f64, Growth)> = None;
    for class in CANDIDATES {
        let Some(spread) = spread(points, class) else {
            continue;
        };
        log::trace!("{class}: spread {spread:.3}");
        if spread <= MAX_SPREAD && best.map_or(true, |(s, _)| spread < s - 1e-9) {
            best = Some((spread, class));
        }
    }
    best.map(|(_, class)| class)
}

/// `(max - min) / mean` of `y / f(n)`
fn spread(points: &[(f64, f64)], class: Growth) -> Option<f64> {
    let ratios: Vec<f64> = points
        .iter()
        .map(|&(n, y)| class.eval(n).map(|f| y / f))
        .collect::<Option<_>>()?;
    let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
    if mean <= 0.0 {
        return None;
    }
    let lo = ratios.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = ratios.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Some((hi - lo) / mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(f: impl Fn(u64) -> usize) -> Vec<SizedTrace> {
        [4u64, 8, 16, 32, 64]
            .iter()
            .map(|&n| SizedTrace {
                size: n,
                steps: f(n),
                max_depth: 1,
            })
            .collect()
    }

    #[test]
    fn test_fits_linear_with_overhead() {
        let fit = fit(&samples(|n| 3 * n as usize + 4)).unwrap();
        assert_eq!(fit.time, Growth::LINEAR);
        assert_eq!(fit.stack, Growth::CONSTANT);
    }

    #[test]
    fn test_fits_quadratic() {
        let fit = fit(&samples(|n| (n * n) as usize + 2)).unwrap();
        assert_eq!(fit.time, Growth::QUADRATIC);
    }

    #[test]
    fn test_fits_constant() {
        let fit = fit(&samples(|_| 12)).unwrap();
        assert_eq!(fit.time, Growth::CONSTANT);
    }

    #[test]
    fn test_needs_three_sizes() {
        let two = vec![
            SizedTrace { size: 2, steps: 5, max_depth: 1 },
            SizedTrace { size: 4, steps: 9, max_depth: 1 },
            SizedTrace { size: 4, steps: 9, max_depth: 1 },
        ];
        assert!(fit(&two).is_none());
    }
}
