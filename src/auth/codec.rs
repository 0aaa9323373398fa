//! Signed session token codec
//!
//! Tokens are HS256 JWTs carrying [`Claims`]. The codec is the only place
//! tokens are produced or verified. Decoding is strict about the algorithm:
//! a header naming anything but `HS256` (including `none`) is treated as a
//! forged signature rather than a formatting problem.
//!
//! Expiry and activation are checked here rather than by `jsonwebtoken` so
//! that an expired token is reported as such only after its signature has
//! been verified, and so that tests can decode against a fixed clock.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::error::{CodecError, DecodeError};
use crate::models::{Claims, Identity, TokenKind};

const SIGNING_ALGORITHM: &str = "HS256";

/// Issues and verifies session tokens with a shared secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    leeway: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Create a codec for `secret`, issuing and accepting tokens from `issuer`
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            leeway: Duration::zero(),
        }
    }

    /// Tolerate this much clock skew on `exp` and `nbf`
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign `claims`
    pub fn issue(&self, claims: &Claims) -> Result<String, CodecError> {
        if !claims.is_well_formed() {
            return Err(CodecError::InvalidClaims(format!(
                "expected nbf <= iat < exp, got nbf={} iat={} exp={}",
                claims.not_before.timestamp(),
                claims.issued_at.timestamp(),
                claims.expires_at.timestamp()
            )));
        }

        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| CodecError::Encoding(e.to_string()))
    }

    /// Build claims for `identity` under this codec's issuer and sign them
    pub fn issue_for(
        &self,
        identity: &Identity,
        kind: TokenKind,
        lifetime: Duration,
    ) -> Result<(String, Claims), CodecError> {
        let claims = Claims::new(identity, kind, self.issuer.clone(), lifetime)?;
        let token = self.issue(&claims)?;
        Ok((token, claims))
    }

    /// Verify `token` and return its claims
    pub fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
        self.decode_at(token, Utc::now())
    }

    /// Verify `token` as of `now`
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, DecodeError> {
        let claims = self.verify_signature(token)?;

        if claims.expires_at + self.leeway <= now {
            return Err(DecodeError::Expired);
        }
        if claims.not_before > now + self.leeway {
            return Err(DecodeError::NotYetValid);
        }

        Ok(claims)
    }

    /// Read `expires_at` from a token whose signature verifies, ignoring the clock
    ///
    /// Used to size revocation entries for tokens that may already be expired.
    pub fn peek_expiry(&self, token: &str) -> Option<DateTime<Utc>> {
        self.verify_signature(token)
            .ok()
            .map(|claims| claims.expires_at)
    }

    fn verify_signature(&self, token: &str) -> Result<Claims, DecodeError> {
        check_algorithm(token)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();
        validation.set_issuer(&[self.issuer.as_str()]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::MissingAlgorithm
                | ErrorKind::Base64(_) => DecodeError::SignatureInvalid,
                ErrorKind::ExpiredSignature => DecodeError::Expired,
                ErrorKind::ImmatureSignature => DecodeError::NotYetValid,
                ErrorKind::InvalidIssuer => DecodeError::Malformed("unexpected issuer".to_string()),
                _ => DecodeError::Malformed(e.to_string()),
            })
    }
}

/// Reject any header that does not name HS256 before handing the token to
/// `jsonwebtoken`, which would otherwise report `alg: none` as a parse error
fn check_algorithm(token: &str) -> Result<(), DecodeError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeError::Malformed(
            "token must have three segments".to_string(),
        ));
    };

    let raw = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| DecodeError::Malformed("header is not base64url".to_string()))?;
    let header: serde_json::Value = serde_json::from_slice(&raw)
        .map_err(|_| DecodeError::Malformed("header is not JSON".to_string()))?;

    match header.get("alg").and_then(|alg| alg.as_str()) {
        Some(SIGNING_ALGORITHM) => Ok(()),
        Some(_) => Err(DecodeError::SignatureInvalid),
        None => Err(DecodeError::Malformed("header has no alg".to_string())),
    }
}
