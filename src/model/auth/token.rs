use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{
    errors::Error as JwtError, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use rocket::{
    http::{Cookie, SameSite},
    outcome::{try_outcome, IntoOutcome},
    request::{self, FromRequest},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;

use super::user::{Rights, User};

pub const SESSION_TOKEN_COOKIE: &str = "session_token";

/// A signed session token tying a user ID to the rights of user type `U`.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<U> {
    id: i64,
    #[serde(rename = "rgt")]
    rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// The ID of the user this session belongs to.
    pub fn id(&self) -> i64 {
        self.id
    }
}

impl<U> AuthToken<U>
where
    U: User,
{
    /// Issue a token for the given user, carrying that user type's rights.
    pub fn new(user: &U) -> Self {
        Self {
            id: user.id(),
            rights: U::RIGHTS,
            phantom: PhantomData,
        }
    }

    /// Sign this token and wrap it in a session cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let ttl = config.session_ttl();
        let claims = SessionClaims {
            auth: self,
            expiry: Utc::now() + ttl,
        };

        let signed = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .unwrap(); // Signing with an HMAC secret cannot fail.

        Cookie::build(SESSION_TOKEN_COOKIE, signed)
            .max_age(time::Duration::seconds(ttl.num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Verify a session cookie and recover the token inside it.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, JwtError> {
        let data: TokenData<SessionClaims<U>> = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )?;
        Ok(data.claims.auth)
    }
}

/// What actually goes on the wire: the token plus a standard `exp` claim.
#[derive(Serialize, Deserialize)]
struct SessionClaims<U> {
    #[serde(flatten, bound = "")]
    auth: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expiry: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: User + Send,
{
    type Error = ();

    /// Recover the session token from the request cookies. A missing, invalid,
    /// expired or wrong-rights token forwards rather than failing, so each
    /// guarded route can fall through to its logged-out counterpart.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config = req.guard::<&State<Config>>().await.unwrap(); // Managed by the config fairing, so always present.

        let cookie = try_outcome!(req.cookies().get(SESSION_TOKEN_COOKIE).or_forward(()));
        let token = try_outcome!(Self::from_cookie(cookie, config).ok().or_forward(()));

        if token.rights == U::RIGHTS {
            request::Outcome::Success(token)
        } else {
            request::Outcome::Forward(())
        }
    }
}
