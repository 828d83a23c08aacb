//! Session Token
//!
//! Cookie value `<session uuid>.<base64url(hmac-sha256(uuid))>`. The HMAC
//! stops clients from guessing session ids; the row in `auth_sessions` is
//! still the source of truth.

use platform::crypto::{from_base64_url, hmac_sha256, hmac_sha256_verify, to_base64_url};
use platform::secret::Secret32;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

pub fn sign(session_id: Uuid, secret: &Secret32) -> String {
    let id = session_id.to_string();
    let signature = hmac_sha256(secret.as_bytes(), id.as_bytes());
    format!("{}.{}", id, to_base64_url(&signature))
}

/// Session id of a token whose signature checks out
pub fn parse(token: &str, secret: &Secret32) -> AuthResult<Uuid> {
    let (id, signature_b64) = token.split_once('.').ok_or(AuthError::SessionInvalid)?;

    let signature = from_base64_url(signature_b64).map_err(|_| AuthError::SessionInvalid)?;
    if !hmac_sha256_verify(secret.as_bytes(), id.as_bytes(), &signature) {
        return Err(AuthError::SessionInvalid);
    }

    id.parse().map_err(|_| AuthError::SessionInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_parse() {
        let secret = Secret32::generate();
        let id = Uuid::new_v4();
        let token = sign(id, &secret);
        assert_eq!(parse(&token, &secret).unwrap(), id);
    }

    #[test]
    fn test_rejects_forged_tokens() {
        let secret = Secret32::generate();
        let token = sign(Uuid::new_v4(), &secret);

        assert!(parse(&token, &Secret32::generate()).is_err());
        assert!(parse("no-dot", &secret).is_err());

        let (_, signature) = token.split_once('.').unwrap();
        let swapped = format!("{}.{}", Uuid::new_v4(), signature);
        assert!(matches!(parse(&swapped, &secret), Err(AuthError::SessionInvalid)));
    }
}
