//! Public identifier encoding for `secure` primary keys.
use crate::errors::{EntityError, EntityResult};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

pub trait IdCodec: Send + Sync {
    fn encode(&self, id: &str) -> String;
    fn decode(&self, encoded: &str) -> EntityResult<String>;
}

/// Identity codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainIdCodec;

impl IdCodec for PlainIdCodec {
    fn encode(&self, id: &str) -> String {
        id.to_string()
    }

    fn decode(&self, encoded: &str) -> EntityResult<String> {
        Ok(encoded.to_string())
    }
}

/// URL-safe, unpadded base64 of the stored id.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64IdCodec;

impl IdCodec for Base64IdCodec {
    fn encode(&self, id: &str) -> String {
        URL_SAFE_NO_PAD.encode(id.as_bytes())
    }

    fn decode(&self, encoded: &str) -> EntityResult<String> {
        let invalid = || EntityError::validation("id", format!("malformed id `{encoded}`"));
        let bytes = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| invalid())?;
        String::from_utf8(bytes).map_err(|_| invalid())
    }
}
