use crate::models::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode};

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenType;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, exp: usize) -> String {
        let claims = Claims {
            user_id: 7,
            sub: "kim".into(),
            role: 3,
            exp,
            token_type: TokenType::Access,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn in_an_hour() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn accepts_token_signed_with_same_secret() {
        let claims = verify_token(&token("s3cret", in_an_hour()), "s3cret").unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn rejects_foreign_and_expired_tokens() {
        assert!(verify_token(&token("other", in_an_hour()), "s3cret").is_err());
        assert!(verify_token(&token("s3cret", 1_000), "s3cret").is_err());
    }
}
