use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::consts::{XFORM_ALIGN_2D, XFORM_ALIGN_3D};
use crate::error::{AlignError, Result};
use crate::transform::Transform;

/// A real-valued sample grid of size `nx × ny × nz`.
///
/// Samples are stored row-major with shape `(nz, ny, nx)`; a 2-D image has
/// `nz == 1`.
#[derive(Clone, Debug)]
pub struct Image {
    pub data: Array3<f32>,
    pub metadata: Metadata,
}

impl Image {
    pub fn new(data: Array3<f32>) -> Self {
        Self {
            data,
            metadata: Metadata::default(),
        }
    }

    pub fn from_2d(data: Array2<f32>) -> Self {
        Self::new(data.insert_axis(Axis(0)))
    }

    pub fn zeros(nx: usize, ny: usize, nz: usize) -> Self {
        Self::new(Array3::zeros((nz, ny, nx)))
    }

    pub fn nx(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn ny(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn nz(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// `[nx, ny, nz]`.
    pub fn dims(&self) -> [usize; 3] {
        [self.nx(), self.ny(), self.nz()]
    }

    pub fn is_volume(&self) -> bool {
        self.nz() > 1
    }

    pub fn same_size(&self, other: &Image) -> bool {
        self.dims() == other.dims()
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[[z, y, x]]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, v: f32) {
        self.data[[z, y, x]] = v;
    }

    /// The first (for 2-D images, the only) xy plane.
    pub fn plane(&self) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), 0)
    }

    /// A copy with the same samples and an empty metadata map.
    pub fn copy_head(&self) -> Self {
        Self::new(self.data.clone())
    }

    /// Replace the samples, keeping a copy of this image's metadata.
    pub fn with_data(&self, data: Array3<f32>) -> Self {
        Self {
            data,
            metadata: self.metadata.clone(),
        }
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64
    }

    /// Attach `transform` under `key`; the image and the caller share it.
    pub fn set_transform(&mut self, key: &str, transform: Arc<Transform>) {
        self.metadata.insert(key, AttrValue::Transform(transform));
    }

    pub fn transform(&self, key: &str) -> Option<&Arc<Transform>> {
        match self.metadata.get(key) {
            Some(AttrValue::Transform(t)) => Some(t),
            _ => None,
        }
    }

    /// The alignment transform, looked up under the 2-D key then the 3-D key.
    pub fn align_transform(&self) -> Option<&Arc<Transform>> {
        self.transform(XFORM_ALIGN_2D)
            .or_else(|| self.transform(XFORM_ALIGN_3D))
    }
}

/// Fail unless `image` is a single plane.
pub fn require_2d(image: &Image, what: &str) -> Result<()> {
    if image.is_volume() {
        return Err(AlignError::InvalidInput(format!(
            "{what} requires 2-D images, got {}x{}x{}",
            image.nx(),
            image.ny(),
            image.nz()
        )));
    }
    Ok(())
}

/// Fail unless both images have identical dimensions.
pub fn require_same_size(moving: &Image, reference: &Image) -> Result<()> {
    if !moving.same_size(reference) {
        return Err(AlignError::DimensionMismatch {
            moving: moving.dims(),
            reference: reference.dims(),
        });
    }
    Ok(())
}

/// A metadata value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    Transform(Arc<Transform>),
}

/// Named attributes owned by an image.
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    attrs: BTreeMap<String, AttrValue>,
}

impl Metadata {
    pub fn insert(&mut self, key: &str, value: AttrValue) {
        self.attrs.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.attrs.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}
