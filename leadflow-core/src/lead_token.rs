//! Signed lead tokens
//!
//! A lead token is handed to a visitor after a successful guide request.
//! Guide pages and PDF downloads accept it only if the server's signature
//! checks out.
//!
//! Format: `base64url(header).base64url(claims).base64url(signature)`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, KeyPair, PublicKey, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
    kid: String,
}

/// Claims carried by a lead token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadClaims {
    /// Issuing domain
    pub iss: String,
    /// Lowercased lead email
    pub sub: String,
    pub first_name: String,
    pub city: String,
    /// Slug of the guide this token unlocks
    pub guide: String,
    pub iat: i64,
    pub exp: i64,
}

/// A parsed (and possibly verified) lead token
#[derive(Debug, Clone)]
pub struct LeadToken {
    encoded: String,
    claims: LeadClaims,
}

/// Lead details bound into a token at issue time
#[derive(Debug, Clone, Copy)]
pub struct LeadSubject<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub city: &'a str,
    pub guide: &'a str,
}

impl LeadToken {
    /// Sign a new token for `subject`, valid for `validity`
    pub fn issue(
        issuer: &str,
        subject: LeadSubject<'_>,
        validity: Duration,
        key: &KeyPair,
    ) -> Result<Self> {
        let now = Utc::now();
        let claims = LeadClaims {
            iss: issuer.to_string(),
            sub: subject.email.trim().to_lowercase(),
            first_name: subject.first_name.trim().to_string(),
            city: subject.city.trim().to_string(),
            guide: subject.guide.to_string(),
            iat: now.timestamp(),
            exp: (now + validity).timestamp(),
        };

        let header = TokenHeader {
            alg: "EdDSA".to_string(),
            typ: "lead+jwt".to_string(),
            kid: key.public_key().key_id(),
        };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );
        let signature = URL_SAFE_NO_PAD.encode(key.sign(signing_input.as_bytes()));

        Ok(Self {
            encoded: format!("{}.{}", signing_input, signature),
            claims,
        })
    }

    /// Decode a token without checking its signature
    pub fn parse(encoded: &str) -> Result<Self> {
        let parts = split_parts(encoded)?;
        let header: TokenHeader = decode_part(parts[0], "header")?;
        if header.alg != "EdDSA" {
            return Err(Error::InvalidToken(format!(
                "unsupported algorithm {}",
                header.alg
            )));
        }
        let claims: LeadClaims = decode_part(parts[1], "claims")?;

        Ok(Self {
            encoded: encoded.to_string(),
            claims,
        })
    }

    /// Parse and fully validate a token: signature, issuer, expiry and,
    /// when given, the guide it was minted for.
    pub fn verify(
        encoded: &str,
        issuer: &str,
        guide: Option<&str>,
        key: &PublicKey,
    ) -> Result<Self> {
        let token = Self::parse(encoded)?;
        token.check_signature(key)?;

        if token.claims.iss != issuer {
            return Err(Error::IssuerMismatch {
                expected: issuer.to_string(),
                actual: token.claims.iss.clone(),
            });
        }
        if token.is_expired_at(Utc::now()) {
            return Err(Error::TokenExpired);
        }
        if let Some(expected) = guide {
            if token.claims.guide != expected {
                return Err(Error::GuideMismatch {
                    expected: expected.to_string(),
                    actual: token.claims.guide.clone(),
                });
            }
        }

        Ok(token)
    }

    pub fn check_signature(&self, key: &PublicKey) -> Result<()> {
        let parts = split_parts(&self.encoded)?;
        let message = format!("{}.{}", parts[0], parts[1]);
        let signature = URL_SAFE_NO_PAD.decode(parts[2])?;
        key.verify(message.as_bytes(), &signature)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.claims.exp
    }

    pub fn claims(&self) -> &LeadClaims {
        &self.claims
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

/// Decode one base64url JSON segment; anything malformed is an invalid token
fn decode_part<T: serde::de::DeserializeOwned>(part: &str, name: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD.decode(part)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidToken(format!("malformed {}: {}", name, e)))
}

fn split_parts(encoded: &str) -> Result<[&str; 3]> {
    let mut parts = encoded.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) if !h.is_empty() && !c.is_empty() && !s.is_empty() => {
            Ok([h, c, s])
        }
        _ => Err(Error::InvalidToken("expected 3 dot-separated parts".into())),
    }
}
