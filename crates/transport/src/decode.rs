//! Stock body decoders.

use std::marker::PhantomData;

use fluxcall::{Decode, DecodeError};
use serde::de::DeserializeOwned;

/// Decodes the body as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl Decode<String> for TextDecoder {
    fn decode(&self, body: &[u8]) -> Result<String, DecodeError> {
        String::from_utf8(body.to_vec())
            .map_err(|e| DecodeError::new("String", e.to_string()).with_source(e))
    }
}

/// Passes the body through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesDecoder;

impl Decode<Vec<u8>> for BytesDecoder {
    fn decode(&self, body: &[u8]) -> Result<Vec<u8>, DecodeError> {
        Ok(body.to_vec())
    }
}

/// Deserializes a JSON body into `T`.
pub struct JsonDecoder<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JsonDecoder<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned> Decode<T> for JsonDecoder<T> {
    fn decode(&self, body: &[u8]) -> Result<T, DecodeError> {
        serde_json::from_slice(body).map_err(|e| {
            DecodeError::new(std::any::type_name::<T>(), e.to_string()).with_source(e)
        })
    }
}
