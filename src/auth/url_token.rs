use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// What an emailed link is allowed to do. Each purpose derives its own
/// signing key, so a verification link can never reset a password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    EmailVerification,
    PasswordReset,
}

/// Tolerated drift between the minting and verifying hosts.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

impl Purpose {
    fn salt(self) -> &'static str {
        match self {
            Self::EmailVerification => "email-verification",
            Self::PasswordReset => "password-reset",
        }
    }

    pub fn max_age(self) -> Duration {
        match self {
            Self::EmailVerification => Duration::hours(24),
            Self::PasswordReset => Duration::hours(1),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlTokenError {
    #[error("malformed token")]
    Malformed,

    #[error("bad signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("token issued in the future")]
    NotYetValid,
}

#[derive(Serialize, Deserialize)]
struct Payload {
    email: String,
}

/// Timestamped `payload.timestamp.signature` tokens, each segment unpadded
/// base64url, carried in verification and password-reset links.
#[derive(Clone)]
pub struct UrlTokenSigner {
    secret: String,
}

impl UrlTokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_owned(),
        }
    }

    fn mac(&self, purpose: Purpose) -> Result<HmacSha256, hmac::digest::InvalidLength> {
        let mut hasher = Sha256::new();
        hasher.update(purpose.salt().as_bytes());
        hasher.update(b"signer");
        hasher.update(self.secret.as_bytes());
        HmacSha256::new_from_slice(&hasher.finalize())
    }

    pub fn generate(&self, email: &str, purpose: Purpose) -> anyhow::Result<String> {
        self.generate_at(email, purpose, Utc::now())
    }

    fn generate_at(
        &self,
        email: &str,
        purpose: Purpose,
        now: DateTime<Utc>,
    ) -> anyhow::Result<String> {
        let payload = serde_json::to_vec(&Payload {
            email: email.to_owned(),
        })?;
        let body = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode(now.timestamp().to_be_bytes())
        );

        let mut mac = self
            .mac(purpose)
            .map_err(|e| anyhow::anyhow!("url token key: {e}"))?;
        mac.update(body.as_bytes());
        let sig = mac.finalize().into_bytes();

        Ok(format!("{body}.{}", URL_SAFE_NO_PAD.encode(sig)))
    }

    /// Returns the embedded email when the token is authentic, was minted for
    /// `purpose`, and is younger than the purpose's maximum age.
    pub fn verify(&self, token: &str, purpose: Purpose) -> Result<String, UrlTokenError> {
        self.verify_at(token, purpose, Utc::now())
    }

    fn verify_at(
        &self,
        token: &str,
        purpose: Purpose,
        now: DateTime<Utc>,
    ) -> Result<String, UrlTokenError> {
        let (body, sig) = token.rsplit_once('.').ok_or(UrlTokenError::Malformed)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(|_| UrlTokenError::Malformed)?;

        let mut mac = self.mac(purpose).map_err(|_| UrlTokenError::BadSignature)?;
        mac.update(body.as_bytes());
        mac.verify_slice(&sig)
            .map_err(|_| UrlTokenError::BadSignature)?;

        let (payload, ts) = body.split_once('.').ok_or(UrlTokenError::Malformed)?;
        let ts_bytes: [u8; 8] = URL_SAFE_NO_PAD
            .decode(ts)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or(UrlTokenError::Malformed)?;
        let issued_at = DateTime::from_timestamp(i64::from_be_bytes(ts_bytes), 0)
            .ok_or(UrlTokenError::Malformed)?;

        if issued_at - now > Duration::seconds(MAX_CLOCK_SKEW_SECS) {
            return Err(UrlTokenError::NotYetValid);
        }
        if now - issued_at > purpose.max_age() {
            return Err(UrlTokenError::Expired);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| UrlTokenError::Malformed)?;
        let payload: Payload =
            serde_json::from_slice(&payload).map_err(|_| UrlTokenError::Malformed)?;

        Ok(payload.email)
    }
}
