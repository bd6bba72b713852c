use jsonwebtoken::{DecodingKey, Validation, decode, errors::Error};

use crate::models::{Claims, TokenType};

/// Decode and check an access token. Refresh tokens are refused here.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)?;

    if claims.token_type != TokenType::Access {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }
    Ok(claims)
}


#[cfg(test)]
mod tests {
    use super::testing::sign;
    use super::*;

    #[test]
    fn accepts_access_tokens() {
        let token = sign(4, "employee", TokenType::Access, "s3cret");
        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.user_id, 4);
        assert_eq!(claims.sub, "PD-4");
    }

    #[test]
    fn rejects_refresh_tokens_and_wrong_secret() {
        let refresh = sign(4, "employee", TokenType::Refresh, "s3cret");
        assert!(verify_token(&refresh, "s3cret").is_err());

        let access = sign(4, "employee", TokenType::Access, "s3cret");
        assert!(verify_token(&access, "other").is_err());
    }
}
