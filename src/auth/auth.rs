use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// Decodes a bearer token into a caller. Refresh tokens are not accepted
    /// for API calls.
    pub fn from_token(token: &str, secret: &str) -> Result<Self, &'static str> {
        let claims = verify_token(token, secret).map_err(|_| "Invalid or expired token")?;
        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }
        let role = Role::from_id(claims.role).ok_or("Invalid role")?;
        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
        })
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(ErrorInternalServerError("Config missing"))),
        };

        ready(AuthUser::from_token(token, &config.jwt_secret).map_err(ErrorUnauthorized))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ErrorForbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.role.manages_leave() {
            Ok(())
        } else {
            Err(ErrorForbidden("HR/Admin only"))
        }
    }

    /// Employees may only act on their own records.
    pub fn require_self_or_hr(&self, user_id: u64) -> actix_web::Result<()> {
        if self.user_id == user_id || self.role.manages_leave() {
            Ok(())
        } else {
            Err(ErrorForbidden("Not allowed to act for another user"))
        }
    }

    /// Resolves an optional `user_id` query parameter to the user whose data
    /// is read.
    pub fn target_user(&self, requested: Option<u64>) -> actix_web::Result<u64> {
        let user_id = requested.unwrap_or(self.user_id);
        self.require_self_or_hr(user_id)?;
        Ok(user_id)
    }
}
