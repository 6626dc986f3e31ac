use scatter_config::QSpaceConfig;

/// A precomputed remap: for every destination pixel, the fractional
/// source column/row to sample from the raw detector frame. `NaN`
/// marks a destination pixel with no physical source (outside the
/// Ewald sphere slice this geometry can reach).
#[derive(Debug, Clone)]
pub struct RemapGrid {
    width: usize,
    height: usize,
    src_col: Vec<f32>,
    src_row: Vec<f32>,
}

impl RemapGrid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn source_at(&self, row: usize, col: usize) -> (f32, f32) {
        let idx = row * self.width + col;
        (self.src_row[idx], self.src_col[idx])
    }
}

/// A rectangular grid of `(q_xy, q_z)` reciprocal-space coordinates, the
/// intermediate step between the config's sampling density and the
/// source pixel each one maps to.
struct ReciprocalGrid {
    width: usize,
    height: usize,
    q_xy: Vec<f64>,
    q_z: Vec<f64>,
}

fn linspace(start: f64, stop: f64, num: u32) -> Vec<f64> {
    if num == 0 {
        return Vec::new();
    }
    if num == 1 {
        return vec![start];
    }
    let step = (stop - start) / (num as f64 - 1.0);
    (0..num).map(|i| start + step * i as f64).collect()
}

/// Mirrors `_get_q_grid`: a dense cartesian grid over `[0, q_xy_max] x
/// [0, q_z_max]`.
fn q_grid(cfg: &QSpaceConfig) -> ReciprocalGrid {
    let xs = linspace(0.0, cfg.q_xy_max, cfg.q_xy_num);
    let zs = linspace(0.0, cfg.q_z_max, cfg.q_z_num);
    let width = xs.len();
    let height = zs.len();
    let mut q_xy = Vec::with_capacity(width * height);
    let mut q_z = Vec::with_capacity(width * height);
    for &z in &zs {
        for &x in &xs {
            q_xy.push(x);
            q_z.push(z);
        }
    }
    ReciprocalGrid {
        width,
        height,
        q_xy,
        q_z,
    }
}

/// Mirrors `_get_q_polar_grid`: a polar grid over radius `[0, q_max]`
/// and angle `[0, pi/2]`, expressed back in `(q_xy, q_z)` coordinates.
fn q_polar_grid(cfg: &QSpaceConfig, angular_size: u32, q_size: u32) -> ReciprocalGrid {
    let q_max = (cfg.q_xy_max.powi(2) + cfg.q_z_max.powi(2)).sqrt();
    let radii = linspace(0.0, q_max, q_size);
    let angles = linspace(0.0, std::f64::consts::FRAC_PI_2, angular_size);
    let width = radii.len();
    let height = angles.len();
    let mut q_xy = Vec::with_capacity(width * height);
    let mut q_z = Vec::with_capacity(width * height);
    for &phi in &angles {
        let (sin_phi, cos_phi) = phi.sin_cos();
        for &r in &radii {
            q_xy.push(r * cos_phi);
            q_z.push(r * sin_phi);
        }
    }
    ReciprocalGrid {
        width,
        height,
        q_xy,
        q_z,
    }
}

/// Mirrors `_get_detector_grid`: projects a `(q_xy, q_z)` grid back onto
/// the raw detector's pixel coordinates, given the beamline geometry.
fn detector_grid(cfg: &QSpaceConfig, reciprocal: ReciprocalGrid) -> RemapGrid {
    let k = 2.0 * std::f64::consts::PI / cfg.wavelength;
    let d = cfg.distance / cfg.pixel_size;
    let alpha = cfg.incidence_angle.to_radians();
    let (sin_a, cos_a) = alpha.sin_cos();

    let width = reciprocal.width;
    let height = reciprocal.height;
    let mut src_col = Vec::with_capacity(width * height);
    let mut src_row = Vec::with_capacity(width * height);

    for (&q_xy_raw, &q_z_raw) in reciprocal.q_xy.iter().zip(reciprocal.q_z.iter()) {
        let q_xy = q_xy_raw / k;
        let q_z = q_z_raw / k;
        let q2 = q_xy * q_xy + q_z * q_z;
        let norm = d / (1.0 - q2 / 2.0);

        let mut zz = (norm * (q_z - sin_a) + d * sin_a) / cos_a;
        let yy2 = norm * norm - zz * zz - d * d;
        let mut yy = if yy2 < 0.0 { f64::NAN } else { yy2.sqrt() };

        zz += cfg.z0;
        yy += cfg.y0;

        src_col.push(yy as f32);
        src_row.push(zz as f32);
    }

    RemapGrid {
        width,
        height,
        src_col,
        src_row,
    }
}

/// The remap grid for the cartesian q-space conversion.
pub fn q_space_grid(cfg: &QSpaceConfig) -> RemapGrid {
    detector_grid(cfg, q_grid(cfg))
}

/// The remap grid for the polar conversion, sized `angular_size x q_size`.
pub fn polar_grid(cfg: &QSpaceConfig, angular_size: u32, q_size: u32) -> RemapGrid {
    detector_grid(cfg, q_polar_grid(cfg, angular_size, q_size))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::RemapGrid;

    pub fn single_cell(row: f32, col: f32) -> RemapGrid {
        RemapGrid {
            width: 1,
            height: 1,
            src_col: vec![col],
            src_row: vec![row],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> QSpaceConfig {
        QSpaceConfig {
            z0: 0.0,
            y0: 0.0,
            size_x: 64,
            size_y: 64,
            wavelength: 0.6888,
            pixel_size: 0.2,
            distance: 1000.0,
            incidence_angle: 0.5,
            q_xy_max: 0.5,
            q_z_max: 0.5,
            q_xy_num: 8,
            q_z_num: 6,
            flip_y: true,
            flip_x: false,
        }
    }

    #[test]
    fn q_space_grid_has_configured_shape() {
        let cfg = tiny_config();
        let grid = q_space_grid(&cfg);
        assert_eq!(grid.width(), cfg.q_xy_num as usize);
        assert_eq!(grid.height(), cfg.q_z_num as usize);
    }

    #[test]
    fn polar_grid_has_angular_by_radial_shape() {
        let cfg = tiny_config();
        let grid = polar_grid(&cfg, 10, 12);
        assert_eq!(grid.width(), 12);
        assert_eq!(grid.height(), 10);
    }

    #[test]
    fn origin_of_q_grid_maps_near_the_direct_beam() {
        // q_xy = q_z = 0 should map back to roughly (y0, z0 + d*tan(alpha)-ish);
        // rather than pin an exact value, just check it is finite and
        // within a sane multiple of the detector distance in pixels.
        let cfg = tiny_config();
        let grid = q_space_grid(&cfg);
        let (row, col) = grid.source_at(0, 0);
        assert!(row.is_finite());
        assert!(col.is_finite());
        let d_px = (cfg.distance / cfg.pixel_size) as f32;
        assert!(row.abs() < d_px * 10.0);
        assert!(col.abs() < d_px * 10.0);
    }

    #[test]
    fn linspace_single_point_is_start() {
        assert_eq!(linspace(1.0, 5.0, 1), vec![1.0]);
    }

    #[test]
    fn linspace_zero_points_is_empty() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}
