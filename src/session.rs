use axum::http::{HeaderMap, header::COOKIE};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SESSION_COOKIE: &str = "token";
pub const SESSION_TTL_SECS: i64 = 60 * 60;

/// Whatever the client posted to `/jwt`, plus the timestamps we add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iat: i64,
    pub exp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionClaims {
    pub fn email(&self) -> Option<&str> {
        self.extra.get("email").and_then(Value::as_str)
    }
}

pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    secure_cookie: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, secure_cookie: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            secure_cookie,
        }
    }

    pub fn issue(&self, claims: Map<String, Value>) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(claims, Utc::now())
    }

    pub fn issue_at(
        &self,
        mut claims: Map<String, Value>,
        issued_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        // client-supplied timestamps would collide with ours under `flatten`
        claims.remove("iat");
        claims.remove("exp");

        let claims = SessionClaims {
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(SESSION_TTL_SECS)).timestamp(),
            extra: claims,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
    }

    pub fn session_cookie(&self, token: &str) -> String {
        self.cookie(token, SESSION_TTL_SECS)
    }

    pub fn cleared_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!("{SESSION_COOKIE}={value}; HttpOnly; Path=/; Max-Age={max_age}");
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Reads one cookie out of the `Cookie` header. Empty values count as absent.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
