//! Text-safe encoding of binary wire fields.
//!
//! Ciphertext, hashes, keys and signatures travel as standard base64 in
//! JSON. Use with `#[serde(with = "vault_shared::encoding::base64_bytes")]`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(text.trim())
}

pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::decode(&text).map_err(serde::de::Error::custom)
    }
}

/// Like [`base64_bytes`] but `null` / absent maps to `None`.
pub mod base64_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_some(&super::encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        text.map(|t| super::decode(&t).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Payload {
        #[serde(with = "super::base64_bytes")]
        data: Vec<u8>,
        #[serde(default, with = "super::base64_opt")]
        prev: Option<Vec<u8>>,
    }

    #[test]
    fn test_null_prev_decodes_to_none() {
        let p: Payload = serde_json::from_str(r#"{"data":"AQID","prev":null}"#).unwrap();
        assert_eq!(p.data, vec![1, 2, 3]);
        assert_eq!(p.prev, None);
    }

    #[test]
    fn test_absent_prev_decodes_to_none() {
        let p: Payload = serde_json::from_str(r#"{"data":"AQID"}"#).unwrap();
        assert_eq!(p.prev, None);
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let res: Result<Payload, _> = serde_json::from_str(r#"{"data":"%%%"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_serializes_as_base64() {
        let p = Payload {
            data: b"ct".to_vec(),
            prev: Some(b"ch".to_vec()),
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["data"], "Y3Q=");
        assert_eq!(json["prev"], "Y2g=");
    }
}
