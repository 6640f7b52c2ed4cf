//! Per-block scratch memory.
//!
//! On the GPU backends a shared array is block-scoped and owned by the
//! native runtime. On the CPU a block holds a single thread, so the same
//! request becomes an ordinary local buffer, allocated fresh (and zeroed)
//! on every outer iteration. Nothing written in one iteration is visible
//! in another.

use std::ops::{Index, IndexMut};

use crate::backend::Backend;
use crate::emit::Expr;
use crate::error::Result;
use crate::primitive::Primitive;

/// A resolved `@shared_mem(T, shape[, offset])` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedMemRequest {
    pub elem: String,
    pub shape: Vec<Expr>,
    /// Byte offset from the dynamic shared-memory base pointer.
    pub offset: Option<Expr>,
}

impl SharedMemRequest {
    /// Build from call-site arguments: element type, shape and an
    /// optional offset. An `Expr::Array` shape is taken element-wise,
    /// anything else is a one-dimensional extent.
    pub fn from_args(args: Vec<Expr>) -> Result<Self> {
        Primitive::SharedMem.check_arity(args.len())?;
        let mut args = args.into_iter();
        let elem = args.next().map(|e| e.to_string()).unwrap_or_default();
        let shape = match args.next() {
            Some(Expr::Array(dims)) => dims,
            Some(dim) => vec![dim],
            None => Vec::new(),
        };
        let offset = args.next();
        Ok(Self {
            elem,
            shape,
            offset,
        })
    }

    /// The backend-native allocation.
    ///
    /// Only the CUDA allocator honours the offset; the ROCm local array
    /// and the CPU buffer have no shared base pointer to offset from.
    pub fn realize(&self, backend: Backend) -> Expr {
        let shape = Expr::Array(self.shape.clone());
        match backend {
            Backend::Cuda => Expr::call(
                format!("cuda::dynamic_shared_array::<{}>", self.elem),
                vec![shape, self.offset.clone().unwrap_or(Expr::Int(0))],
            ),
            Backend::Rocm => Expr::call(
                format!("rocm::static_local_array::<{}>", self.elem),
                vec![shape],
            ),
            Backend::Threads | Backend::Simd => Expr::call(
                format!("SharedBuffer::<{}>::zeroed", self.elem),
                vec![shape],
            ),
        }
    }
}

/// Fixed-shape, row-major local buffer standing in for shared memory on
/// the CPU backends.
#[derive(Clone, Debug, PartialEq)]
pub struct SharedBuffer<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T: Default + Clone> SharedBuffer<T> {
    pub fn zeroed<const N: usize>(shape: [usize; N]) -> Self {
        Self::with_shape(&shape)
    }

    pub fn with_shape(shape: &[usize]) -> Self {
        let len = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![T::default(); len],
        }
    }
}

impl<T> SharedBuffer<T> {
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Linear position of a multi-index, or `None` when out of bounds.
    pub fn offset_of(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut linear = 0;
        for (&i, &extent) in index.iter().zip(&self.shape) {
            if i >= extent {
                return None;
            }
            linear = linear * extent + i;
        }
        Some(linear)
    }

    pub fn get(&self, index: &[usize]) -> Option<&T> {
        self.offset_of(index).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        self.offset_of(index).map(move |i| &mut self.data[i])
    }

    /// Store `value`, returning `false` when the index is out of bounds.
    pub fn set(&mut self, index: &[usize], value: T) -> bool {
        match self.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl<T, const N: usize> Index<[usize; N]> for SharedBuffer<T> {
    type Output = T;

    fn index(&self, index: [usize; N]) -> &T {
        match self.offset_of(&index) {
            Some(i) => &self.data[i],
            None => panic!(
                "shared buffer index {:?} out of bounds for shape {:?}",
                index, self.shape
            ),
        }
    }
}

impl<T, const N: usize> IndexMut<[usize; N]> for SharedBuffer<T> {
    fn index_mut(&mut self, index: [usize; N]) -> &mut T {
        match self.offset_of(&index) {
            Some(i) => &mut self.data[i],
            None => panic!(
                "shared buffer index {:?} out of bounds for shape {:?}",
                index, self.shape
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;

    fn request(offset: Option<Expr>) -> SharedMemRequest {
        let mut args = vec![
            Expr::raw("f32"),
            Expr::Array(vec![Expr::Int(32), Expr::Int(4)]),
        ];
        args.extend(offset);
        SharedMemRequest::from_args(args).unwrap()
    }

    #[test]
    fn test_from_args_arity() {
        assert!(matches!(
            SharedMemRequest::from_args(vec![Expr::raw("f32")]),
            Err(ResolveError::ArgumentCount { found: 1, .. })
        ));
        let too_many = vec![Expr::raw("f32"), Expr::Int(4), Expr::Int(0), Expr::Int(1)];
        assert!(matches!(
            SharedMemRequest::from_args(too_many),
            Err(ResolveError::ArgumentCount { found: 4, .. })
        ));
    }

    #[test]
    fn test_scalar_shape_is_one_dimensional() {
        let req = SharedMemRequest::from_args(vec![Expr::raw("i32"), Expr::raw("n")]).unwrap();
        assert_eq!(req.shape, vec![Expr::raw("n")]);
        assert_eq!(req.offset, None);
    }

    #[test]
    fn test_cuda_keeps_offset() {
        assert_eq!(
            request(Some(Expr::Int(256))).realize(Backend::Cuda).to_string(),
            "cuda::dynamic_shared_array::<f32>([32, 4], 256)"
        );
        assert_eq!(
            request(None).realize(Backend::Cuda).to_string(),
            "cuda::dynamic_shared_array::<f32>([32, 4], 0)"
        );
    }

    #[test]
    fn test_offset_ignored_without_base_pointer() {
        for backend in [Backend::Rocm, Backend::Threads, Backend::Simd] {
            assert_eq!(
                request(Some(Expr::Int(256))).realize(backend),
                request(None).realize(backend)
            );
        }
        assert_eq!(
            request(None).realize(Backend::Threads).to_string(),
            "SharedBuffer::<f32>::zeroed([32, 4])"
        );
    }

    #[test]
    fn test_buffer_is_zeroed_and_row_major() {
        let mut buf = SharedBuffer::<i32>::zeroed([2, 3]);
        assert_eq!(buf.len(), 6);
        assert!(buf.as_slice().iter().all(|&v| v == 0));
        buf[[1, 2]] = 7;
        assert_eq!(buf.as_slice()[5], 7);
        assert!(buf.set(&[0, 1], 3));
        assert_eq!(buf.get(&[0, 1]), Some(&3));
        assert!(!buf.set(&[2, 0], 1));
        assert_eq!(buf.get(&[0]), None);
    }
}
