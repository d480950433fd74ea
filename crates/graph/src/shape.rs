//! Memory-layout descriptors for `View` nodes.
//!
//! A tracker is an ordered list of view layouts; each layout maps a logical
//! row-major index space onto the element space produced by the previous
//! layer (the first layout reads the underlying buffer). The rewriter treats
//! trackers as opaque; only `from_shape` and the executor look inside.

/// One layout layer: shape, strides, a base offset, and an optional
/// per-dimension valid range outside of which elements read as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLayout {
    pub shape: Vec<u64>,
    pub strides: Vec<u64>,
    pub offset: u64,
    pub mask: Option<Vec<(u64, u64)>>,
}

impl ViewLayout {
    /// Contiguous row-major layout over `shape`.
    pub fn contiguous(shape: &[u64]) -> Self {
        let mut strides = vec![0u64; shape.len()];
        let mut acc = 1u64;
        for (i, &dim) in shape.iter().enumerate().rev() {
            strides[i] = acc;
            acc = acc.saturating_mul(dim);
        }
        Self {
            shape: shape.to_vec(),
            strides,
            offset: 0,
            mask: None,
        }
    }

    pub fn size(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Map a logical multi-index to a source element index, or `None` when
    /// the index falls outside the mask.
    pub fn locate(&self, index: &[u64]) -> Option<u64> {
        if let Some(mask) = &self.mask {
            for (i, &(lo, hi)) in mask.iter().enumerate() {
                if index[i] < lo || index[i] >= hi {
                    return None;
                }
            }
        }
        let mut pos = self.offset;
        for (i, &ix) in index.iter().enumerate() {
            pos += ix * self.strides[i];
        }
        Some(pos)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeTracker {
    pub views: Vec<ViewLayout>,
}

impl ShapeTracker {
    pub fn from_shape(shape: &[u64]) -> Self {
        Self {
            views: vec![ViewLayout::contiguous(shape)],
        }
    }

    /// The logical shape this tracker presents.
    pub fn shape(&self) -> &[u64] {
        self.views.last().map(|v| v.shape.as_slice()).unwrap_or(&[])
    }

    pub fn size(&self) -> u64 {
        self.views.last().map(|v| v.size()).unwrap_or(0)
    }

    pub fn is_contiguous(&self) -> bool {
        self.views.len() == 1
            && self.views[0] == ViewLayout::contiguous(&self.views[0].shape)
    }
}

/// Walk a shape in row-major order, yielding multi-indices.
pub fn row_major_indices(shape: &[u64]) -> impl Iterator<Item = Vec<u64>> + '_ {
    let total: u64 = shape.iter().product();
    (0..total).map(move |mut flat| {
        let mut index = vec![0u64; shape.len()];
        for i in (0..shape.len()).rev() {
            let dim = shape[i].max(1);
            index[i] = flat % dim;
            flat /= dim;
        }
        index
    })
}
