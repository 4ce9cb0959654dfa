//! Dimensions - shape of an array sample.

use smallvec::SmallVec;

/// Shape of one array sample.
///
/// Array samples are variable-length and possibly multi-dimensional; the
/// shape may change from sample to sample. Rank 0 marks a scalar payload
/// (exactly one element).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dimensions {
    dims: SmallVec<[usize; 3]>,
}

impl Dimensions {
    /// Scalar shape (rank 0, one element).
    pub fn scalar() -> Self {
        Self { dims: SmallVec::new() }
    }

    /// Flat 1D shape.
    pub fn d1(len: usize) -> Self {
        Self { dims: smallvec::smallvec![len] }
    }

    /// 2D shape.
    pub fn d2(rows: usize, cols: usize) -> Self {
        Self { dims: smallvec::smallvec![rows, cols] }
    }

    /// Arbitrary-rank shape from a slice of sizes.
    pub fn from_slice(sizes: &[usize]) -> Self {
        Self { dims: SmallVec::from_slice(sizes) }
    }

    /// Number of dimensions (0 = scalar, 1 = flat array, ...).
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Size along one dimension, None past the rank.
    pub fn size(&self, dim: usize) -> Option<usize> {
        self.dims.get(dim).copied()
    }

    /// All dimension sizes.
    pub fn sizes(&self) -> &[usize] {
        &self.dims
    }

    /// Total element count (product of sizes; 1 for rank 0).
    pub fn num_points(&self) -> usize {
        self.dims.iter().product()
    }

    /// True for the rank-0 scalar shape.
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }
}

impl From<usize> for Dimensions {
    fn from(len: usize) -> Self {
        Self::d1(len)
    }
}

impl From<Vec<usize>> for Dimensions {
    fn from(v: Vec<usize>) -> Self {
        Self { dims: SmallVec::from_vec(v) }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, s) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, " x ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_shape() {
        let d = Dimensions::scalar();
        assert_eq!(d.rank(), 0);
        assert!(d.is_scalar());
        assert_eq!(d.num_points(), 1);
        assert_eq!(d.to_string(), "[]");
    }

    #[test]
    fn test_flat_and_2d() {
        let d = Dimensions::d1(12);
        assert_eq!(d.rank(), 1);
        assert_eq!(d.num_points(), 12);

        let d = Dimensions::d2(4, 6);
        assert_eq!(d.rank(), 2);
        assert_eq!(d.size(1), Some(6));
        assert_eq!(d.size(2), None);
        assert_eq!(d.num_points(), 24);
        assert_eq!(d.to_string(), "[4 x 6]");
    }

    #[test]
    fn test_conversions() {
        let d: Dimensions = 9usize.into();
        assert_eq!(d.sizes(), &[9]);
        let d: Dimensions = vec![2, 3, 4].into();
        assert_eq!(d.num_points(), 24);
    }
}
