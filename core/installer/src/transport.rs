//! HTTP transport with explicit redirect handling.
//!
//! The underlying client never follows redirects on its own. Each fetch walks
//! the chain itself so that the hop limit, the final URL and every failure are
//! visible to the caller:
//!
//! - 3xx with a `Location` header is followed (relative locations are
//!   resolved against the current URL)
//! - 3xx without `Location` and any other non-2xx status is a
//!   [`TransportError::Status`]
//! - more than `max_redirects` hops is a [`TransportError::TooManyRedirects`]
//! - connection and timeout failures keep their own variants

use std::time::Duration;

use log::{debug, info};
use reqwest::header::LOCATION;
use reqwest::{Client, Response, Url};

use crate::config::InstallerConfig;
use crate::errors::TransportError;

/// HTTP GET client used for the artifact and its checksum.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    max_redirects: usize,
}

impl HttpTransport {
    /// Builds a transport with the given timeouts and hop limit.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] if the client cannot be created
    /// (for example when no TLS backend is available).
    pub fn new(
        user_agent: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
        max_redirects: usize,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(user_agent)
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::from_reqwest("<client construction>", e))?;

        Ok(Self {
            client,
            max_redirects,
        })
    }

    /// Builds a transport from an installer configuration.
    ///
    /// # Errors
    ///
    /// See [`HttpTransport::new`].
    pub fn from_config(config: &InstallerConfig) -> Result<Self, TransportError> {
        let user_agent = format!(
            "{}-installer/{}",
            config.package.name,
            env!("CARGO_PKG_VERSION")
        );
        Self::new(
            &user_agent,
            config.request_timeout,
            config.connect_timeout,
            config.max_redirects,
        )
    }

    /// Issues a GET for `url`, following redirects, and returns the final
    /// successful response with its body still unread.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] for network failures, timeouts,
    /// non-success statuses and redirect chains longer than the limit.
    pub async fn fetch(&self, url: &str) -> Result<Response, TransportError> {
        let mut current = parse_url(url)?;

        for hop in 0..=self.max_redirects {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| TransportError::from_reqwest(current.as_str(), e))?;

            let status = response.status();

            if status.is_redirection() {
                let Some(location) = response.headers().get(LOCATION) else {
                    return Err(TransportError::Status {
                        url: current.to_string(),
                        status: status.as_u16(),
                    });
                };
                let location = location.to_str().map_err(|e| TransportError::InvalidUrl {
                    url: format!("{location:?}"),
                    message: e.to_string(),
                })?;
                let next = current
                    .join(location)
                    .map_err(|e| TransportError::InvalidUrl {
                        url: location.to_string(),
                        message: e.to_string(),
                    })?;

                debug!("redirect {} ({status}) {current} -> {next}", hop + 1);
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(TransportError::Status {
                    url: current.to_string(),
                    status: status.as_u16(),
                });
            }

            info!("fetching {current}");
            return Ok(response);
        }

        Err(TransportError::TooManyRedirects {
            url: url.to_string(),
            limit: self.max_redirects,
        })
    }

    /// Fetches `url` and buffers the whole body as text.
    ///
    /// Only meant for small documents such as checksum files.
    ///
    /// # Errors
    ///
    /// Same as [`HttpTransport::fetch`], plus body read failures.
    pub async fn fetch_text(&self, url: &str) -> Result<String, TransportError> {
        let response = self.fetch(url).await?;
        response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))
    }
}

fn parse_url(url: &str) -> Result<Url, TransportError> {
    Url::parse(url).map_err(|e| TransportError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}
