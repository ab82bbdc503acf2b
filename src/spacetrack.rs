//! Space-Track element data provider.
use reqwest::blocking::Client;
use reqwest::StatusCode;
use thiserror::Error;

use crate::catalog::CatalogEntry;
use crate::credentials::Credentials;
use crate::http::HttpPolicy;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("provider rejected the credentials")]
    Auth,
    #[error("unexpected provider payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProviderError {
    fn from_http(err: reqwest::Error) -> Self {
        match err.status() {
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN) => ProviderError::Auth,
            Some(status) => ProviderError::Status(status.as_u16()),
            None => ProviderError::Http(err),
        }
    }
}

/// Supplier of catalog listings and element sets.
pub trait ElementSource {
    /// Whole catalog, most recent launches first.
    fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, ProviderError>;

    /// Raw 3LE text of the newest element set for `norad_id`.
    fn fetch_latest_elements(&self, norad_id: u32) -> Result<String, ProviderError>;
}

pub struct SpaceTrackClient {
    client: Client,
    policy: HttpPolicy,
    base_url: String,
    credentials: Credentials,
}

impl SpaceTrackClient {
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        policy: HttpPolicy,
        user_agent: &str,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: policy.build_client(user_agent)?,
            policy,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Run `query_url` as part of the login form post.
    fn query(&self, what: &str, query_url: &str) -> Result<String, ProviderError> {
        let login_url = format!("{}/ajaxauth/login", self.base_url);
        let form = [
            ("identity", self.credentials.identity.as_str()),
            ("password", self.credentials.password.as_str()),
            ("query", query_url),
        ];

        log::debug!("{}: {}", what, query_url);
        let response = self
            .policy
            .send(what, || self.client.post(&login_url).form(&form))
            .map_err(ProviderError::from_http)?;
        let body = response.text()?;

        check_login(&body)?;
        Ok(body)
    }
}

impl ElementSource for SpaceTrackClient {
    fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, ProviderError> {
        let body = self.query("catalog", &catalog_query_url(&self.base_url))?;
        parse_catalog(&body)
    }

    fn fetch_latest_elements(&self, norad_id: u32) -> Result<String, ProviderError> {
        self.query(
            &format!("elements {}", norad_id),
            &elements_query_url(&self.base_url, norad_id),
        )
    }
}

fn catalog_query_url(base_url: &str) -> String {
    format!(
        "{}/basicspacedata/query/class/satcat/orderby/LAUNCH%20desc/format/json",
        base_url
    )
}

fn elements_query_url(base_url: &str, norad_id: u32) -> String {
    format!(
        "{}/basicspacedata/query/class/gp/NORAD_CAT_ID/{}/orderby/EPOCH%20desc/limit/1/format/3le",
        base_url, norad_id
    )
}

/// A failed login still answers 200, with `{"Login":"Failed"}` as body.
fn check_login(body: &str) -> Result<(), ProviderError> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') {
        return Ok(());
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) if value.get("Login").and_then(|v| v.as_str()) == Some("Failed") => {
            Err(ProviderError::Auth)
        }
        _ => Ok(()),
    }
}

fn parse_catalog(body: &str) -> Result<Vec<CatalogEntry>, ProviderError> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(body)?;
    log::info!("Provider listed {} catalog entries", entries.len());
    Ok(entries)
}
