use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::GoogleConfig;
use crate::error::{configuration_error, upstream_unavailable_error, Error};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// OAuth access tokens for a Google service account, minted from a signed
/// JWT assertion and reused until shortly before they expire.
pub struct ServiceAccount {
    http: reqwest::Client,
    client_email: String,
    private_key: String,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccount {
    pub fn new(http: reqwest::Client, config: &GoogleConfig, scopes: &[&str]) -> Self {
        Self {
            http,
            client_email: config.client_email.clone(),
            private_key: config.private_key.clone(),
            scope: scopes.join(" "),
            cached: Mutex::new(None),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn access_token(&self) -> Result<String, Error> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() + Duration::seconds(60) {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.assertion(Utc::now())?;

        let res = self
            .http
            .post(TOKEN_URL)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(upstream_unavailable_error(format!(
                "google token endpoint answered {}",
                res.status()
            )));
        }

        let token: TokenResponse = res.json().await?;

        tracing::debug!("minted google access token valid for {}s", token.expires_in);

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        });

        Ok(token.access_token)
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, Error> {
        let claims = Claims {
            iss: &self.client_email,
            scope: &self.scope,
            aud: TOKEN_URL,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|_| configuration_error("GOOGLE_PRIVATE_KEY"))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|err| upstream_unavailable_error(err))
    }
}
