//! Circulant correlation maps and wrap-aware peak search.

use ndarray::Array3;

/// Real-valued correlation grid shaped `(nz, ny, nx)`.
///
/// Index 0 on each axis is the zero shift; indices past half the extent
/// address negative shifts.
#[derive(Clone, Debug)]
pub struct CorrelationMap {
    pub data: Array3<f64>,
}

impl CorrelationMap {
    pub fn new(data: Array3<f64>) -> Self {
        Self { data }
    }

    /// `[nx, ny, nz]`.
    pub fn dims(&self) -> [usize; 3] {
        let (nz, ny, nx) = self.data.dim();
        [nx, ny, nz]
    }

    /// Value at the signed shift `[dx, dy, dz]`.
    pub fn at_shift(&self, shift: [i64; 3]) -> f64 {
        let [nx, ny, nz] = self.dims();
        let ix = wrap_index(shift[0], nx);
        let iy = wrap_index(shift[1], ny);
        let iz = wrap_index(shift[2], nz);
        self.data[[iz, iy, ix]]
    }

    /// Zero the origin and its full neighborhood (8 in 2-D, 26 in 3-D),
    /// wrapping around the edges. Axes of extent 1 are not widened.
    pub fn zero_origin_neighborhood(&mut self) {
        let [nx, ny, nz] = self.dims();
        let reach = |n: usize| -> i64 { if n > 1 { 1 } else { 0 } };
        let (rx, ry, rz) = (reach(nx), reach(ny), reach(nz));
        for dz in -rz..=rz {
            for dy in -ry..=ry {
                for dx in -rx..=rx {
                    let idx = [wrap_index(dz, nz), wrap_index(dy, ny), wrap_index(dx, nx)];
                    self.data[idx] = 0.0;
                }
            }
        }
    }

    /// Signed offset `[dx, dy, dz]` of the maximum within `|d_i| ≤ maxshift[i]`.
    ///
    /// Scans z, then y, then x from the most negative offset; on ties the
    /// first maximum wins.
    pub fn peak_wrapped(&self, maxshift: [usize; 3]) -> [i64; 3] {
        let [nx, ny, nz] = self.dims();
        let [mx, my, mz] = [
            window(maxshift[0], nx),
            window(maxshift[1], ny),
            window(maxshift[2], nz),
        ];

        let mut best = [0i64; 3];
        let mut best_val = f64::NEG_INFINITY;
        for dz in -mz..=mz {
            for dy in -my..=my {
                for dx in -mx..=mx {
                    let v = self.at_shift([dx, dy, dz]);
                    if v > best_val {
                        best_val = v;
                        best = [dx, dy, dz];
                    }
                }
            }
        }
        best
    }
}

/// Largest usable half-window on an axis of extent `n`.
fn window(requested: usize, n: usize) -> i64 {
    if n <= 1 {
        return 0;
    }
    requested.min((n / 2).saturating_sub(1)) as i64
}

fn wrap_index(shift: i64, n: usize) -> usize {
    shift.rem_euclid(n as i64) as usize
}

/// Resolve a translational search bound for one axis: a positive `requested`
/// or `extent / divisor`, clamped to `extent / 2 − 1`; zero on a singleton axis.
pub fn resolve_maxshift(requested: Option<usize>, extent: usize, divisor: usize) -> usize {
    if extent <= 1 {
        return 0;
    }
    let value = requested.filter(|&m| m > 0).unwrap_or(extent / divisor.max(1));
    value.min((extent / 2).saturating_sub(1))
}

/// Smallest size `≥ n` whose only prime factors are 2, 3 and 5.
pub fn smooth_fft_size(n: usize) -> usize {
    let mut m = n.max(1);
    loop {
        let mut r = m;
        for p in [2, 3, 5] {
            while r % p == 0 {
                r /= p;
            }
        }
        if r == 1 {
            return m;
        }
        m += 1;
    }
}

/// Index of the first maximum of `values`.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best = i;
        }
    }
    best
}
