//! Pluggable request authentication for the listing API.

use reqwest::blocking::RequestBuilder;
use reqwest::header::AUTHORIZATION;

use crate::config::AuthConfig;
use crate::error::{CheckError, Result};

/// Attaches credentials to an outgoing listing request.
pub trait Authenticator: Send + Sync {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder;

    fn describe(&self) -> &'static str;
}

pub struct NoAuth;

impl Authenticator for NoAuth {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }

    fn describe(&self) -> &'static str {
        "none"
    }
}

/// SPNEGO. The token comes from whatever Kerberos tooling runs before us.
pub struct NegotiateToken {
    token: String,
}

impl Authenticator for NegotiateToken {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(AUTHORIZATION, format!("Negotiate {}", self.token))
    }

    fn describe(&self) -> &'static str {
        "negotiate"
    }
}

pub struct PseudoUser {
    user: String,
}

impl Authenticator for PseudoUser {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.query(&[("user.name", self.user.as_str())])
    }

    fn describe(&self) -> &'static str {
        "pseudo"
    }
}

pub struct DelegationToken {
    token: String,
}

impl Authenticator for DelegationToken {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.query(&[("delegation", self.token.as_str())])
    }

    fn describe(&self) -> &'static str {
        "delegation"
    }
}

pub fn from_config(auth: &AuthConfig) -> Result<Box<dyn Authenticator>> {
    Ok(match auth {
        AuthConfig::None => Box::new(NoAuth),
        AuthConfig::Negotiate { token_env } => {
            let token = std::env::var(token_env).map_err(|_| {
                CheckError::config(format!(
                    "negotiate auth needs a token in ${}, which is not set",
                    token_env
                ))
            })?;
            Box::new(NegotiateToken { token })
        }
        AuthConfig::Pseudo { user } => Box::new(PseudoUser { user: user.clone() }),
        AuthConfig::Delegation { token } => Box::new(DelegationToken { token: token.clone() }),
    })
}
