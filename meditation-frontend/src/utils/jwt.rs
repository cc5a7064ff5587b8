use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Decode ID token claims without validation
///
/// The token comes straight from the identity provider over TLS and is only
/// read here for the user id, email and expiry. The backend verifies the
/// signature on every call.
pub fn decode_id_token_claims(token: &str) -> Result<IdTokenClaims> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        return Err(anyhow::anyhow!("Invalid JWT format"));
    }

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| anyhow::anyhow!("Failed to decode JWT payload: {}", e))?;

    let claims: IdTokenClaims = serde_json::from_slice(&payload)
        .map_err(|e| anyhow::anyhow!("Failed to parse JWT claims: {}", e))?;

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &str) -> String {
        format!(
            "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.{}.signature",
            general_purpose::URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_decode_id_token_claims() {
        let token = token_with_payload(
            r#"{"sub":"user_123","email":"test@example.com","exp":9999999999,"iat":1736500000}"#,
        );

        let claims = decode_id_token_claims(&token).unwrap();
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.email.as_deref(), Some("test@example.com"));
        assert_eq!(claims.exp, 9999999999);
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        assert!(decode_id_token_claims("not-a-jwt").is_err());
        assert!(decode_id_token_claims("a.!!!.c").is_err());
        assert!(decode_id_token_claims(&token_with_payload(r#"{"email":"x"}"#)).is_err());
    }
}
