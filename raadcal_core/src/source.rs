//! This client fetches one month of the calendar from the source.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{config::Config, parser::SourceFormat, window::MonthKey, Error, Result};

#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Get the raw body of one month.
    ///
    /// This is expected to give up after a timeout, a request which never finishes stalls
    /// the whole refresh.
    async fn fetch_one(&self, window: MonthKey) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct HttpSourceClient {
    client: Client,
    url: String,
    format: SourceFormat,
    callback: String,
}

impl HttpSourceClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| Error::Config(format!("could not build the HTTP client: {err}")))?;
        Ok(Self {
            client,
            url: config.source_url.clone(),
            format: config.format,
            callback: config.callback.clone(),
        })
    }

    fn query(&self, window: MonthKey) -> Vec<(&'static str, String)> {
        match self.format {
            SourceFormat::Notubiz => vec![
                ("year", window.year.to_string()),
                ("month", window.month.to_string()),
                ("callback", self.callback.clone()),
            ],
            SourceFormat::Notudoc => vec![
                ("jaar", window.year.to_string()),
                ("maand", window.month.to_string()),
            ],
        }
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    async fn fetch_one(&self, window: MonthKey) -> Result<Vec<u8>> {
        let request = self
            .client
            .get(&self.url)
            .query(&self.query(window))
            .build()
            .map_err(|err| Error::Transport {
                url: self.url.clone(),
                source: err.into(),
            })?;
        let url = request.url().to_string();
        debug!(%window, %url, "Fetching calendar month");
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| Error::Transport {
                url: url.clone(),
                source: err.into(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(|err| Error::Transport {
            url,
            source: err.into(),
        })?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn client(server: &MockServer, format: SourceFormat) -> HttpSourceClient {
        HttpSourceClient::new(&Config {
            format,
            source_url: format!("{}/api/calendar/callback_function", server.uri()),
            request_timeout: Duration::from_secs(2),
            ..Config::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_one() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/calendar/callback_function"))
            .and(query_param("year", "2016"))
            .and(query_param("month", "8"))
            .and(query_param("callback", "raad071cal"))
            .respond_with(ResponseTemplate::new(200).set_body_string("callback_function({})"))
            .expect(1)
            .mount(&server)
            .await;
        let body = client(&server, SourceFormat::Notubiz)
            .fetch_one(MonthKey::new(2016, 8).unwrap())
            .await
            .unwrap();
        assert_eq!(body, b"callback_function({})");
    }

    #[tokio::test]
    async fn test_fetch_one_legacy_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("jaar", "2015"))
            .and(query_param("maand", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<table></table>"))
            .expect(1)
            .mount(&server)
            .await;
        let body = client(&server, SourceFormat::Notudoc)
            .fetch_one(MonthKey::new(2015, 12).unwrap())
            .await
            .unwrap();
        assert_eq!(body, b"<table></table>");
    }

    #[tokio::test]
    async fn test_fetch_one_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let result = client(&server, SourceFormat::Notubiz)
            .fetch_one(MonthKey::new(2016, 8).unwrap())
            .await;
        match result {
            Err(Error::Status { url, status }) => {
                assert_eq!(status, 503);
                assert!(url.contains("year=2016&month=8"));
            }
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_one_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let result = client(&server, SourceFormat::Notubiz)
            .fetch_one(MonthKey::new(2016, 8).unwrap())
            .await;
        assert!(matches!(result, Err(Error::Transport { .. })));
    }
}
