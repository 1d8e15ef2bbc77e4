//! Derivative-free Nelder–Mead minimization.

use crate::error::{AlignError, Result};

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

#[derive(Clone, Debug)]
pub struct SimplexOptions {
    /// Initial edge length along each coordinate.
    pub step: Vec<f64>,
    /// Stop once the simplex size falls below this.
    pub precision: f64,
    pub maxiter: usize,
}

#[derive(Clone, Debug)]
pub struct SimplexResult {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    /// Final simplex size: mean vertex distance to the centroid.
    pub size: f64,
    pub converged: bool,
}

/// Minimize `f` starting from `start`.
///
/// Hitting `maxiter` is not an error; the best vertex is returned with
/// `converged == false`.
pub fn minimize<F>(mut f: F, start: &[f64], options: &SimplexOptions) -> Result<SimplexResult>
where
    F: FnMut(&[f64]) -> Result<f64>,
{
    let dim = start.len();
    if dim == 0 || options.step.len() != dim {
        return Err(AlignError::InvalidConfig(format!(
            "simplex needs one step per coordinate, got {} for {dim}",
            options.step.len()
        )));
    }

    let mut vertices: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    vertices.push(start.to_vec());
    for i in 0..dim {
        let mut v = start.to_vec();
        v[i] += options.step[i];
        vertices.push(v);
    }
    let mut values = vertices.iter().map(|v| f(v)).collect::<Result<Vec<f64>>>()?;

    let mut iterations = 0;
    let mut size = simplex_size(&vertices);
    while size >= options.precision && iterations < options.maxiter {
        step(&mut f, &mut vertices, &mut values)?;
        iterations += 1;
        size = simplex_size(&vertices);
    }

    let best = lowest(&values);
    Ok(SimplexResult {
        point: vertices[best].clone(),
        value: values[best],
        iterations,
        size,
        converged: size < options.precision,
    })
}

fn step<F>(f: &mut F, vertices: &mut [Vec<f64>], values: &mut [f64]) -> Result<()>
where
    F: FnMut(&[f64]) -> Result<f64>,
{
    let n = vertices.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let (lo, second, hi) = (order[0], order[n - 2], order[n - 1]);

    // Centroid of every vertex but the worst.
    let dim = vertices[0].len();
    let mut centroid = vec![0.0; dim];
    for (i, v) in vertices.iter().enumerate() {
        if i != hi {
            for (c, x) in centroid.iter_mut().zip(v) {
                *c += x;
            }
        }
    }
    for c in centroid.iter_mut() {
        *c /= (n - 1) as f64;
    }

    let toward = |coef: f64, from: &[f64]| -> Vec<f64> {
        centroid
            .iter()
            .zip(from)
            .map(|(c, x)| c + coef * (c - x))
            .collect()
    };

    let reflected = toward(REFLECT, &vertices[hi]);
    let f_reflected = f(&reflected)?;

    if f_reflected < values[lo] {
        let expanded = toward(EXPAND, &vertices[hi]);
        let f_expanded = f(&expanded)?;
        if f_expanded < f_reflected {
            vertices[hi] = expanded;
            values[hi] = f_expanded;
        } else {
            vertices[hi] = reflected;
            values[hi] = f_reflected;
        }
        return Ok(());
    }

    if f_reflected < values[second] {
        vertices[hi] = reflected;
        values[hi] = f_reflected;
        return Ok(());
    }

    // Contract toward the better of the worst vertex and its reflection.
    let (base, f_base) = if f_reflected < values[hi] {
        (reflected, f_reflected)
    } else {
        (vertices[hi].clone(), values[hi])
    };
    let contracted = toward(-CONTRACT, &base);
    let f_contracted = f(&contracted)?;
    if f_contracted < f_base {
        vertices[hi] = contracted;
        values[hi] = f_contracted;
        return Ok(());
    }

    let best = vertices[lo].clone();
    for i in 0..n {
        if i == lo {
            continue;
        }
        for (x, b) in vertices[i].iter_mut().zip(&best) {
            *x = b + SHRINK * (*x - b);
        }
        values[i] = f(&vertices[i])?;
    }
    Ok(())
}

fn lowest(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v < values[best] {
            best = i;
        }
    }
    best
}

/// Mean Euclidean distance of the vertices to their centroid.
pub fn simplex_size(vertices: &[Vec<f64>]) -> f64 {
    let n = vertices.len();
    if n == 0 {
        return 0.0;
    }
    let dim = vertices[0].len();
    let mut centroid = vec![0.0; dim];
    for v in vertices {
        for (c, x) in centroid.iter_mut().zip(v) {
            *c += x / n as f64;
        }
    }
    vertices
        .iter()
        .map(|v| {
            v.iter()
                .zip(&centroid)
                .map(|(x, c)| (x - c) * (x - c))
                .sum::<f64>()
                .sqrt()
        })
        .sum::<f64>()
        / n as f64
}
