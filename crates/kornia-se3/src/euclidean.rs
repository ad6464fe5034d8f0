use glam::DVec3;
use rand::Rng;

/// The translation capability consumed by [`SpecialEuclidean3`](crate::SpecialEuclidean3).
pub trait TranslationSpace: Sync {
    /// Dimension of the space.
    fn dimension(&self) -> usize;

    /// Sample a translation uniformly in the unit cube `[-1, 1)³`.
    fn random_uniform<G: Rng>(&self, rng: &mut G) -> DVec3;
}

/// The 3D Euclidean space of translations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EuclideanSpace3;

impl TranslationSpace for EuclideanSpace3 {
    fn dimension(&self) -> usize {
        3
    }

    fn random_uniform<G: Rng>(&self, rng: &mut G) -> DVec3 {
        DVec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        )
    }
}
