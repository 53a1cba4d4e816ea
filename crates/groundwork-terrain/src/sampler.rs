//! Grayscale sampling capability

use std::sync::Arc;

use groundwork_core::Result;

/// Read-only grayscale lookup at normalized coordinates.
///
/// `u` runs along image columns and `v` along rows, both in [0, 1].
/// Implementations should return intensities in [0, 1]; the synthesizer
/// clamps whatever comes back and reads non-finite values as 0.
/// An error marks the sample as faulted rather than aborting synthesis.
pub trait GraySampler: Send + Sync {
    fn try_sample(&self, u: f32, v: f32) -> Result<f32>;
}

/// Sample and clamp to [0, 1]. NaN and infinities read as no signal.
pub fn sample_clamped<S: GraySampler + ?Sized>(sampler: &S, u: f32, v: f32) -> Result<f32> {
    let value = sampler.try_sample(u, v)?;
    if value.is_finite() {
        Ok(value.clamp(0.0, 1.0))
    } else {
        Ok(0.0)
    }
}

/// A missing mask: always samples 0
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Absent;

impl GraySampler for Absent {
    fn try_sample(&self, _u: f32, _v: f32) -> Result<f32> {
        Ok(0.0)
    }
}

/// The same intensity everywhere
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Constant(pub f32);

impl GraySampler for Constant {
    fn try_sample(&self, _u: f32, _v: f32) -> Result<f32> {
        Ok(self.0)
    }
}

/// Adapts a closure `Fn(u, v) -> Result<f32>` into a sampler
pub struct FnSampler<F>(pub F);

impl<F> GraySampler for FnSampler<F>
where
    F: Fn(f32, f32) -> Result<f32> + Send + Sync,
{
    fn try_sample(&self, u: f32, v: f32) -> Result<f32> {
        (self.0)(u, v)
    }
}

impl<S: GraySampler> GraySampler for Option<S> {
    fn try_sample(&self, u: f32, v: f32) -> Result<f32> {
        match self {
            Some(sampler) => sampler.try_sample(u, v),
            None => Ok(0.0),
        }
    }
}

impl<S: GraySampler + ?Sized> GraySampler for &S {
    fn try_sample(&self, u: f32, v: f32) -> Result<f32> {
        (**self).try_sample(u, v)
    }
}

impl<S: GraySampler + ?Sized> GraySampler for Box<S> {
    fn try_sample(&self, u: f32, v: f32) -> Result<f32> {
        (**self).try_sample(u, v)
    }
}

impl<S: GraySampler + ?Sized> GraySampler for Arc<S> {
    fn try_sample(&self, u: f32, v: f32) -> Result<f32> {
        (**self).try_sample(u, v)
    }
}
