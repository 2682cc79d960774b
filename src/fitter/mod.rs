//! Fitter seam - the external program that performs the actual fits

pub mod client;
pub mod request;
pub mod subprocess;

use async_trait::async_trait;
pub use client::FitterConfig;
pub use request::{FitError, FitRequest, FitResponse};
pub use subprocess::SubprocessFitter;

use crate::core::FitResult;

/// Trait for fitting a resolved model - allows for different implementations
#[async_trait]
pub trait Fitter: Send + Sync {
    /// Fit the request's model and return the phase result
    async fn fit(&self, request: &FitRequest) -> Result<FitResult, FitError>;
}

#[async_trait]
impl<F: Fitter + ?Sized> Fitter for std::sync::Arc<F> {
    async fn fit(&self, request: &FitRequest) -> Result<FitResult, FitError> {
        (**self).fit(request).await
    }
}
