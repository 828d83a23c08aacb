//! Known-value tests for code hashing and token signing

#[cfg(test)]
mod code_hash_tests {
    use crate::domain::services::*;
    use platform::crypto::*;

    #[test]
    fn test_code_hmac_known_value() {
        // RFC 4231 test case 2
        let expected =
            hex::decode("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
                .unwrap();
        assert_eq!(
            code_hmac(b"Jefe", "what do ya want for nothing?"),
            to_base64(&expected)
        );
        assert_eq!(
            code_hmac(b"Jefe", "what do ya want for nothing?"),
            "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM="
        );
    }

    #[test]
    fn test_code_hmac_normalizes_input() {
        assert_eq!(
            code_hmac(b"Jefe", "  WHAT do ya want for nothing?\n"),
            code_hmac(b"Jefe", "what do ya want for nothing?")
        );
        assert_ne!(code_hmac(b"Jefe", "abc"), code_hmac(b"jefe", "abc"));
    }

    #[test]
    fn test_generated_code_alphabets() {
        let codes = generate_codes(8, 16);
        assert_eq!(codes.code.len(), 8);
        assert!(codes.code.bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(codes.long_code.len(), 16);
        assert!(codes.long_code.bytes().all(|b| LONG_CODE_ALPHABET.contains(&b)));
    }
}

#[cfg(test)]
mod jws_tests {
    use crate::domain::services::*;
    use jsonwebtoken::errors::ErrorKind;

    // {"alg":"HS256","typ":"JWT","kid":"v1"} signed with "secret"
    const TOKEN: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCIsImtpZCI6InYxIn0.\
        eyJpc3MiOiJkaWFnbm9zaXMtdmVyaWZpY2F0aW9uLXRva2VuIiwic3ViIjoicmVhbG0iLCJqdGkiOiJ0b2tlbiIsImlhdCI6MTYwMDAwMDAwMCwiZXhwIjoxNjAwMDg2NDAwfQ.\
        jf4bh9qd4Acm3HtQO_tNCRCSEshbPkAEXLNoAzJw5zw";

    fn claims() -> TokenClaims {
        TokenClaims {
            iss: TOKEN_ISSUER.to_string(),
            sub: "realm".to_string(),
            jti: "token".to_string(),
            iat: 1_600_000_000,
            exp: 1_600_086_400,
        }
    }

    #[test]
    fn test_verify_known_value() {
        let mut validation = token_validation("realm");
        validation.validate_exp = false;

        let verified: TokenClaims = verify_jws(TOKEN, b"secret", &validation).unwrap();
        assert_eq!(verified, claims());
        assert_eq!(jws_kid(TOKEN).as_deref(), Some("v1"));
        assert!(verify_jws::<TokenClaims>(TOKEN, b"other", &validation).is_err());
    }

    #[test]
    fn test_known_value_is_expired() {
        let err = verify_jws::<TokenClaims>(TOKEN, b"secret", &token_validation("realm"))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn test_signed_tokens_verify() {
        let mut fresh = claims();
        fresh.exp = chrono::Utc::now().timestamp() + 3600;
        let token = sign_jws("v2", b"secret", &fresh).unwrap();

        assert_eq!(jws_kid(&token).as_deref(), Some("v2"));
        let verified: TokenClaims =
            verify_jws(&token, b"secret", &token_validation("realm")).unwrap();
        assert_eq!(verified, fresh);
    }

    #[test]
    fn test_verify_rejects_malformed() {
        let validation = token_validation("realm");
        assert!(verify_jws::<TokenClaims>("", b"secret", &validation).is_err());
        assert!(verify_jws::<TokenClaims>("a.b", b"secret", &validation).is_err());
        assert!(verify_jws::<TokenClaims>(&format!("{TOKEN}.extra"), b"secret", &validation).is_err());
        assert!(jws_kid("not-a-token").is_none());
    }
}
