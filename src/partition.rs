//! Work partitioning: how a problem is split into workgroups for a dispatch
//!
//! The global extent of each dimension is the problem size, the local extent is the tile
//! (workgroup) size, and the device runs `global / local` workgroups per dimension.
//! The division has to be exact, a remainder would leave part of the problem uncomputed,
//! so it is checked here, before anything reaches the device.

use crate::errors::{OffloadError, OffloadResult};

/// Global and local extents of a 1, 2 or 3 dimensional dispatch
///
/// Unused dimensions are stored as 1. A [`DispatchGeometry`] can only be built through
/// [`compute_geometry`] or [`DispatchGeometry::new`], so the local extent always divides
/// the global one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGeometry {
    dimensions: usize,
    global: [u32; 3],
    local: [u32; 3],
}

/// Computes the geometry of a dispatch with the same `tile` size in every dimension
///
/// # Example
/// ```
/// use wgpu_offload::partition::compute_geometry;
///
/// let geometry = compute_geometry(&[1024, 1024], 8).unwrap();
/// assert_eq!(geometry.global(), &[1024, 1024]);
/// assert_eq!(geometry.local(), &[8, 8]);
/// assert_eq!(geometry.group_counts(), [128, 128, 1]);
///
/// assert!(compute_geometry(&[3, 3], 32).is_err());
/// ```
pub fn compute_geometry(extents: &[u32], tile: u32) -> OffloadResult<DispatchGeometry> {
    let local = vec![tile; extents.len()];
    DispatchGeometry::new(extents, &local)
}

impl DispatchGeometry {
    /// Builds a geometry from explicit per-dimension extents
    ///
    /// # Errors
    /// - [`OffloadError::InvalidGeometry`] if the dimension count is not 1, 2 or 3, if the two
    ///   slices differ in length or if any extent is 0
    /// - [`OffloadError::IndivisibleWorkSize`] if a local extent doesn't divide its global extent
    pub fn new(global: &[u32], local: &[u32]) -> OffloadResult<Self> {
        if global.is_empty() || global.len() > 3 {
            return Err(OffloadError::InvalidGeometry(format!(
                "{} dimensions requested, 1 to 3 are supported",
                global.len()
            )));
        }
        if global.len() != local.len() {
            return Err(OffloadError::InvalidGeometry(format!(
                "{} global extents but {} local extents",
                global.len(),
                local.len()
            )));
        }

        let mut geometry = DispatchGeometry {
            dimensions: global.len(),
            global: [1; 3],
            local: [1; 3],
        };
        for (dimension, (&extent, &size)) in global.iter().zip(local).enumerate() {
            if extent == 0 || size == 0 {
                return Err(OffloadError::InvalidGeometry(format!(
                    "dimension {dimension} has global extent {extent} and local extent {size}"
                )));
            }
            if extent % size != 0 {
                return Err(OffloadError::IndivisibleWorkSize {
                    dimension,
                    extent,
                    local: size,
                });
            }
            geometry.global[dimension] = extent;
            geometry.local[dimension] = size;
        }
        Ok(geometry)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn global(&self) -> &[u32] {
        &self.global[..self.dimensions]
    }

    pub fn local(&self) -> &[u32] {
        &self.local[..self.dimensions]
    }

    /// Local extents padded to three dimensions, as `@workgroup_size` is declared
    pub fn local_padded(&self) -> [u32; 3] {
        self.local
    }

    /// Number of workgroups per dimension, the arguments of `dispatch_workgroups`
    pub fn group_counts(&self) -> [u32; 3] {
        [
            self.global[0] / self.local[0],
            self.global[1] / self.local[1],
            self.global[2] / self.local[2],
        ]
    }

    pub fn invocations_per_group(&self) -> u32 {
        self.local.iter().product()
    }
}

#[cfg(test)]
mod partition_test {
    use super::*;

    #[test]
    fn divisible_extents() {
        for (n, tile) in [(1024u32, 8u32), (1024, 32), (3, 3), (3, 1), (64, 64)] {
            let geometry = compute_geometry(&[n, n], tile).unwrap();
            assert_eq!(geometry.dimensions(), 2);
            assert_eq!(geometry.global(), &[n, n]);
            assert_eq!(geometry.local(), &[tile, tile]);
            assert_eq!(geometry.group_counts(), [n / tile, n / tile, 1]);
            assert_eq!(geometry.invocations_per_group(), tile * tile);
        }
    }

    #[test]
    fn one_dimensional_vector_add() {
        let geometry = compute_geometry(&[1024], 64).unwrap();
        assert_eq!(geometry.group_counts(), [16, 1, 1]);
        assert_eq!(geometry.local_padded(), [64, 1, 1]);
    }

    #[test]
    fn indivisible_extent_is_rejected() {
        match compute_geometry(&[3, 3], 32) {
            Err(OffloadError::IndivisibleWorkSize {
                dimension,
                extent,
                local,
            }) => assert_eq!((dimension, extent, local), (0, 3, 32)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            DispatchGeometry::new(&[16, 10], &[4, 4]),
            Err(OffloadError::IndivisibleWorkSize { dimension: 1, .. })
        ));
    }

    #[test]
    fn malformed_geometry() {
        assert!(matches!(
            compute_geometry(&[], 8),
            Err(OffloadError::InvalidGeometry(_))
        ));
        assert!(matches!(
            compute_geometry(&[8, 8, 8, 8], 8),
            Err(OffloadError::InvalidGeometry(_))
        ));
        assert!(matches!(
            compute_geometry(&[8], 0),
            Err(OffloadError::InvalidGeometry(_))
        ));
        assert!(matches!(
            DispatchGeometry::new(&[8, 8], &[8]),
            Err(OffloadError::InvalidGeometry(_))
        ));
    }
}
