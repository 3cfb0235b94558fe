//! Response decoding.
//!
//! # Design
//! The caller states up front what it wants from the body by passing one of
//! three destinations: [`Discard`], [`Text`] or [`Json`]. The set is sealed,
//! so the compiler checks that the output type matches the chosen strategy.
//! XML bodies are fetched as [`Text`] and parsed by the caller.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::ApiError;

mod sealed {
    pub trait Sealed {}
}

/// How a buffered response body is turned into the caller's value.
pub trait Destination: sealed::Sealed {
    type Output;

    fn decode(self, body: &[u8]) -> Result<Self::Output, ApiError>;
}

/// Ignore the body. Nothing is decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

/// Return the body verbatim as a `String`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

/// Deserialize the body as JSON into `T`.
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T> Json<T> {
    pub fn new() -> Self {
        Json(PhantomData)
    }
}

impl<T> Default for Json<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Json<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Json<T> {}

impl<T> std::fmt::Debug for Json<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Json<{}>", std::any::type_name::<T>())
    }
}

impl sealed::Sealed for Discard {}
impl sealed::Sealed for Text {}
impl<T> sealed::Sealed for Json<T> {}

impl Destination for Discard {
    type Output = ();

    fn decode(self, _body: &[u8]) -> Result<(), ApiError> {
        Ok(())
    }
}

impl Destination for Text {
    type Output = String;

    fn decode(self, body: &[u8]) -> Result<String, ApiError> {
        String::from_utf8(body.to_vec()).map_err(ApiError::NotText)
    }
}

impl<T: DeserializeOwned> Destination for Json<T> {
    type Output = T;

    fn decode(self, body: &[u8]) -> Result<T, ApiError> {
        serde_json::from_slice(body).map_err(|source| {
            let body = String::from_utf8_lossy(body).into_owned();
            tracing::warn!(%body, error = %source, "response body is not the expected JSON");
            ApiError::Decode { source, body }
        })
    }
}
