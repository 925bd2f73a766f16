//! Key authorization helpers for transport implementations.
//!
//! The orchestrator asks its transport for key authorizations; these helpers
//! give implementers the RFC 8555 §8.1 / RFC 7638 building blocks.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};

/// JWK for an uncompressed P-256 public key (0x04 || x || y)
pub fn ec_p256_jwk(public_key: &[u8]) -> Result<Value> {
    if public_key.len() != 65 || public_key[0] != 0x04 {
        anyhow::bail!("Invalid public key format");
    }

    Ok(serde_json::json!({
        "kty": "EC",
        "crv": "P-256",
        "x": URL_SAFE_NO_PAD.encode(&public_key[1..33]),
        "y": URL_SAFE_NO_PAD.encode(&public_key[33..65]),
    }))
}

/// RFC 7638 thumbprint: SHA-256 over the required members only, keys sorted
pub fn jwk_thumbprint(jwk: &Value) -> Result<String> {
    let kty = jwk
        .get("kty")
        .and_then(Value::as_str)
        .context("JWK has no kty")?;

    let required: &[&str] = match kty {
        "EC" => &["crv", "kty", "x", "y"],
        "RSA" => &["e", "kty", "n"],
        "OKP" => &["crv", "kty", "x"],
        other => anyhow::bail!("Unsupported JWK key type: {}", other),
    };

    // serde_json's Map is ordered by key
    let mut canonical = Map::new();
    for member in required {
        let value = jwk
            .get(*member)
            .with_context(|| format!("JWK is missing required member '{}'", member))?;
        canonical.insert(member.to_string(), value.clone());
    }

    let json = serde_json::to_string(&Value::Object(canonical))?;
    Ok(sha256_b64(json.as_bytes()))
}

/// `<token>.<thumbprint>`, published as-is for http-01
pub fn key_authorization(token: &str, thumbprint: &str) -> String {
    format!("{}.{}", token, thumbprint)
}

/// TXT record value for dns-01: base64url(SHA-256(key authorization))
pub fn dns01_txt_value(key_authorization: &str) -> String {
    sha256_b64(key_authorization.as_bytes())
}

fn sha256_b64(data: &[u8]) -> String {
    let digest = ring::digest::digest(&ring::digest::SHA256, data);
    URL_SAFE_NO_PAD.encode(digest.as_ref())
}
