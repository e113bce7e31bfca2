use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::request::{self, FromRequest, Request};
use serde::{Deserialize, Serialize};

use super::util::date_time_as_unix_seconds;
use crate::data::user::User;
use crate::resp::problem::{stash_guard_problem, Problem};
use crate::role::Role;
use crate::security::Security;
use rocket::outcome::Outcome;
use uuid::Uuid;

/// Fixed header carrying the session token. Clients send the raw token,
/// not an `Authorization` scheme.
pub static AUTH_HEADER_NAME: &str = "x-auth-token";

/// Signed session claims: the full credential, no server-side session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRoleToken {
    #[serde(with = "date_time_as_unix_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "date_time_as_unix_seconds")]
    exp: DateTime<Utc>,
    pub user: Uuid,
    pub role: Role,
}

impl UserRoleToken {
    pub fn new(user: &User) -> UserRoleToken {
        let now = Utc::now();
        UserRoleToken {
            iat: now,
            exp: now + Duration::hours(5),
            user: user.id,
            role: user.role,
        }
    }

    pub fn encode_jwt(
        &self,
        secret: impl AsRef<[u8]>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(secret.as_ref());

        encode(&header, &self, &key)
    }
}

pub fn auth_problem(detail: impl ToString) -> Problem {
    Problem::new_untyped(Status::Unauthorized, "Unable to authorize user.")
        .detail(detail)
        .clone()
}

#[inline]
pub fn missing_token() -> Problem {
    auth_problem("No session token header.")
}

/// Tampered, malformed and expired tokens all map here; callers can't
/// tell which check failed.
#[inline]
pub fn invalid_token() -> Problem {
    auth_problem("Session token is not valid.")
}

#[inline]
pub fn teachers_only() -> Problem {
    Problem::new_untyped(Status::Forbidden, "Access denied. Teachers only.")
}

pub fn decode_token(token: &str, secret: impl AsRef<[u8]>) -> Result<UserRoleToken, Problem> {
    decode::<UserRoleToken>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("session token rejected: {:?}", e.kind());
        invalid_token()
    })
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserRoleToken {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let security: &Security = req.rocket().state().unwrap();

        let token = match req.headers().get_one(AUTH_HEADER_NAME) {
            Some(value) => value,
            None => {
                let problem = missing_token();
                stash_guard_problem(req, &problem);
                return Outcome::Error((Status::Unauthorized, problem));
            }
        };

        match decode_token(token, &security.token_secret) {
            Ok(claims) => {
                tracing::debug!("decoded user role token for user: {}", claims.user);
                Outcome::Success(claims)
            }
            Err(problem) => {
                stash_guard_problem(req, &problem);
                Outcome::Error((Status::Unauthorized, problem))
            }
        }
    }
}

/// Proof that the request carries a valid session token with the teacher
/// role. Always vetted through the [`UserRoleToken`] guard first.
#[derive(Debug, Clone)]
pub struct TeacherToken(pub UserRoleToken);

impl std::ops::Deref for TeacherToken {
    type Target = UserRoleToken;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TeacherToken {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = match req.guard::<UserRoleToken>().await {
            Outcome::Success(token) => token,
            Outcome::Error(failure) => return Outcome::Error(failure),
            Outcome::Forward(status) => return Outcome::Forward(status),
        };

        if !token.role.can_teach() {
            let problem = teachers_only();
            stash_guard_problem(req, &problem);
            return Outcome::Error((Status::Forbidden, problem));
        }

        Outcome::Success(TeacherToken(token))
    }
}

pub mod doc {
    use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

    #[derive(Clone, Copy)]
    pub struct TokenHeader;

    impl From<TokenHeader> for SecurityScheme {
        fn from(_: TokenHeader) -> Self {
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(super::AUTH_HEADER_NAME)))
        }
    }

    impl utoipa::Modify for TokenHeader {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            let c = openapi.components.as_mut().unwrap();
            c.add_security_scheme("token", *self)
        }
    }
}
