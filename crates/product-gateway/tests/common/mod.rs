//! Shared test helpers: RSA keypairs for signing RS256 test tokens and the
//! JWK documents that publish their public halves.

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)] // Not every test binary uses every helper

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Claims for test tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestClaims {
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scp: Option<String>,
}

impl TestClaims {
    /// Claims that verify successfully against the test configuration.
    pub fn valid(now: i64) -> Self {
        Self {
            sub: "test-user".to_string(),
            aud: "expected-aud".to_string(),
            iss: "https://provider/tenant/v2.0".to_string(),
            exp: now + 3600,
            iat: now,
            scp: Some("products.read".to_string()),
        }
    }
}

/// RSA keypair for signing RS256 test tokens.
pub struct TestKeypair {
    pub kid: String,
    encoding_key: EncodingKey,
    n_b64: String,
    e_b64: String,
}

impl TestKeypair {
    /// Generate a fresh 2048-bit RSA keypair.
    pub fn generate(kid: &str) -> Self {
        let mut rng = rand::thread_rng();
        let private_key =
            RsaPrivateKey::new(&mut rng, 2048).expect("failed to generate test keypair");

        let der = private_key
            .to_pkcs1_der()
            .expect("failed to encode test key as PKCS#1 DER");
        let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());

        let n_b64 = URL_SAFE_NO_PAD.encode(private_key.n().to_bytes_be());
        let e_b64 = URL_SAFE_NO_PAD.encode(private_key.e().to_bytes_be());

        Self {
            kid: kid.to_string(),
            encoding_key,
            n_b64,
            e_b64,
        }
    }

    /// Sign a token whose header names this keypair's kid.
    pub fn sign_token(&self, claims: &TestClaims) -> String {
        self.sign_token_as(&self.kid, claims)
    }

    /// Sign a token declaring an arbitrary kid (for wrong-key scenarios).
    pub fn sign_token_as(&self, kid: &str, claims: &TestClaims) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(kid.to_string());

        encode(&header, claims, &self.encoding_key).expect("failed to sign test token")
    }

    /// Public half as a JWK entry.
    pub fn jwk_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kty": "RSA",
            "kid": self.kid,
            "n": self.n_b64,
            "e": self.e_b64,
            "alg": "RS256",
            "use": "sig"
        })
    }

    /// JWKS document publishing only this key.
    pub fn key_set_json(&self) -> serde_json::Value {
        serde_json::json!({ "keys": [self.jwk_json()] })
    }
}

/// Primary test keypair, generated once per test binary (RSA key generation
/// is slow enough to matter).
pub fn shared_keypair() -> &'static TestKeypair {
    static KEYPAIR: OnceLock<TestKeypair> = OnceLock::new();
    KEYPAIR.get_or_init(|| TestKeypair::generate("test-key-01"))
}

/// Secondary keypair for rotation and wrong-key scenarios.
pub fn other_keypair() -> &'static TestKeypair {
    static KEYPAIR: OnceLock<TestKeypair> = OnceLock::new();
    KEYPAIR.get_or_init(|| TestKeypair::generate("other-key-01"))
}
