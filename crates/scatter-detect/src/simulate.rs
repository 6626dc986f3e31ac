//! Simulated diffraction peaks from a unit cell, grounded in
//! `simulate_diffraction_peaks.py::get_diffraction_peaks`. That
//! function derives structure factors from a CIF's atomic basis via
//! `xrayutilities`; no corpus crate provides atomic scattering factors,
//! so reflection intensity here is a unit structure factor weighted by
//! the same Lorentz-polarization correction the upstream applies. This
//! keeps the q-position, merge, and intensity-weighting logic faithful
//! while the absolute intensity is an approximation — see `DESIGN.md`.

use crate::cif::UnitCell;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MillerIndex {
    pub h: i32,
    pub k: i32,
    pub l: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPeak {
    pub hkl: MillerIndex,
    pub q: f64,
    pub intensity: f64,
}

struct ReciprocalBasis {
    a_star: [f64; 3],
    b_star: [f64; 3],
    c_star: [f64; 3],
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

fn reciprocal_basis(cell: &UnitCell) -> ReciprocalBasis {
    let (alpha, beta, gamma) = (
        cell.alpha.to_radians(),
        cell.beta.to_radians(),
        cell.gamma.to_radians(),
    );

    let a_vec = [cell.a, 0.0, 0.0];
    let b_vec = [cell.b * gamma.cos(), cell.b * gamma.sin(), 0.0];
    let cx = cell.c * beta.cos();
    let cy = cell.c * (alpha.cos() - beta.cos() * gamma.cos()) / gamma.sin();
    let cz_sq = 1.0 - alpha.cos().powi(2) - beta.cos().powi(2) - gamma.cos().powi(2)
        + 2.0 * alpha.cos() * beta.cos() * gamma.cos();
    let cz = cell.c * cz_sq.max(0.0).sqrt() / gamma.sin();
    let c_vec = [cx, cy, cz];

    let volume = dot(a_vec, cross(b_vec, c_vec));
    let two_pi = 2.0 * std::f64::consts::PI;

    ReciprocalBasis {
        a_star: scale(cross(b_vec, c_vec), two_pi / volume),
        b_star: scale(cross(c_vec, a_vec), two_pi / volume),
        c_star: scale(cross(a_vec, b_vec), two_pi / volume),
    }
}

fn scale(v: [f64; 3], s: f64) -> [f64; 3] {
    [v[0] * s, v[1] * s, v[2] * s]
}

fn q_vector(basis: &ReciprocalBasis, h: i32, k: i32, l: i32) -> [f64; 3] {
    let (h, k, l) = (h as f64, k as f64, l as f64);
    [
        h * basis.a_star[0] + k * basis.b_star[0] + l * basis.c_star[0],
        h * basis.a_star[1] + k * basis.b_star[1] + l * basis.c_star[1],
        h * basis.a_star[2] + k * basis.b_star[2] + l * basis.c_star[2],
    ]
}

/// Polarization * Lorentz correction factor at diffraction angle `theta`
/// (degrees), mirroring `_get_correction_factor`.
fn lorentz_polarization_factor(theta_deg: f64) -> f64 {
    let theta = theta_deg.to_radians();
    let polarization = (1.0 + (2.0 * theta).cos().powi(2)) / 2.0;
    let lorentz = 1.0 / (theta.sin().powi(2) * theta.cos());
    polarization * lorentz
}

/// `q` to diffraction angle theta (degrees), mirroring `_q2ang`.
fn q_to_theta_deg(q: f64, k0: f64) -> f64 {
    (q / (2.0 * k0)).asin().to_degrees()
}

/// Generates simulated diffraction peaks for `cell` up to `q_max`,
/// merging reflections at (numerically) the same q-position and
/// weighting each by the Lorentz-polarization correction, normalized so
/// the strongest peak has intensity 1.
pub fn simulate_peaks(cell: &UnitCell, q_max: f64, wavelength: f64) -> Vec<SimulatedPeak> {
    let basis = reciprocal_basis(cell);
    let k0 = 2.0 * std::f64::consts::PI / wavelength;

    let shortest = [basis.a_star, basis.b_star, basis.c_star]
        .iter()
        .map(|v| norm(*v))
        .fold(f64::INFINITY, f64::min);
    if !shortest.is_finite() || shortest <= 0.0 {
        return Vec::new();
    }
    let bound = (q_max / shortest).ceil() as i32 + 1;

    let mut raw: Vec<(f64, MillerIndex)> = Vec::new();
    for h in -bound..=bound {
        for k in -bound..=bound {
            for l in -bound..=bound {
                if h == 0 && k == 0 && l == 0 {
                    continue;
                }
                let q = norm(q_vector(&basis, h, k, l));
                if q <= q_max {
                    raw.push((q, MillerIndex { h, k, l }));
                }
            }
        }
    }
    raw.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let mut merged: Vec<(f64, u32, MillerIndex)> = Vec::new();
    const TOL: f64 = 1e-6;
    for (q, hkl) in raw {
        match merged.last_mut() {
            Some(last) if (last.0 - q).abs() < TOL => {
                last.1 += 1;
                last.2 = hkl;
            }
            _ => merged.push((q, 1, hkl)),
        }
    }

    let mut peaks: Vec<SimulatedPeak> = merged
        .into_iter()
        .filter_map(|(q, multiplicity, hkl)| {
            if q <= 0.0 {
                return None;
            }
            let theta = q_to_theta_deg(q, k0);
            if !theta.is_finite() {
                return None;
            }
            let intensity = multiplicity as f64 * lorentz_polarization_factor(theta);
            Some(SimulatedPeak { hkl, q, intensity })
        })
        .collect();

    if let Some(max) = peaks.iter().map(|p| p.intensity).fold(None, |acc, v| {
        Some(acc.map_or(v, |m: f64| m.max(v)))
    }) {
        if max > 0.0 {
            for p in peaks.iter_mut() {
                p.intensity /= max;
            }
        }
    }

    peaks.retain(|p| p.intensity > 1e-8);
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic(a: f64) -> UnitCell {
        UnitCell {
            a,
            b: a,
            c: a,
            alpha: 90.0,
            beta: 90.0,
            gamma: 90.0,
        }
    }

    #[test]
    fn cubic_cell_produces_peaks_within_q_max() {
        let cell = cubic(5.4310);
        let peaks = simulate_peaks(&cell, 2.7, 0.6888);
        assert!(!peaks.is_empty());
        for p in &peaks {
            assert!(p.q <= 2.7 + 1e-9);
        }
    }

    #[test]
    fn intensities_are_normalized_to_unit_max() {
        let cell = cubic(5.4310);
        let peaks = simulate_peaks(&cell, 2.7, 0.6888);
        let max = peaks.iter().map(|p| p.intensity).fold(0.0, f64::max);
        assert!((max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn equivalent_reflections_are_merged() {
        let cell = cubic(5.4310);
        let peaks = simulate_peaks(&cell, 2.7, 0.6888);
        let mut qs: Vec<f64> = peaks.iter().map(|p| p.q).collect();
        qs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for pair in qs.windows(2) {
            assert!(pair[1] - pair[0] > 1e-6, "adjacent peaks should not duplicate a q position");
        }
    }
}
