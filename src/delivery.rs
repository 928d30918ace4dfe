//! Hands the finished JSON document to stdout or an HTTP endpoint.

use std::io::Write;
use std::time::Duration;

use getappt_core::{DeliveryConfig, DeliveryError};
use reqwest::header::CONTENT_TYPE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Stdout,
    Put { uri: String, timeout: Duration },
}

impl Delivery {
    /// A blank `put_uri` selects stdout.
    pub fn from_config(config: &DeliveryConfig) -> Self {
        match config.put_uri() {
            Some(uri) => Self::Put {
                uri: uri.to_string(),
                timeout: Duration::from_secs(config.timeout_secs),
            },
            None => Self::Stdout,
        }
    }

    pub fn is_put(&self) -> bool {
        matches!(self, Self::Put { .. })
    }

    /// # Errors
    ///
    /// Write failures on `out` and PUT transport failures. A PUT answered
    /// with a non-success status is logged, not returned.
    pub async fn deliver<W: Write>(
        &self,
        json: &str,
        verbose: bool,
        out: &mut W,
    ) -> Result<(), DeliveryError> {
        match self {
            Self::Stdout => {
                writeln!(out, "{}", json)?;
                Ok(())
            }
            Self::Put { uri, timeout } => http_put(uri, *timeout, json, verbose, out).await,
        }
    }
}

async fn http_put<W: Write>(
    uri: &str,
    timeout: Duration,
    json: &str,
    verbose: bool,
    out: &mut W,
) -> Result<(), DeliveryError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(map_reqwest)?;

    if verbose {
        writeln!(out, "Performing http put to '{}'", uri)?;
    }

    let response = client
        .put(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(json.to_string())
        .send()
        .await
        .map_err(map_reqwest)?;

    let status = response.status();
    if status.is_success() {
        tracing::info!(%status, uri, bytes = json.len(), "Delivered calendar data");
    } else {
        tracing::warn!(%status, uri, "Delivery endpoint did not accept the document");
    }

    if verbose {
        let body = response.text().await.map_err(map_reqwest)?;
        writeln!(out, "Response code: {}, data:\n{}", status, body)?;
    }

    Ok(())
}

fn map_reqwest(err: reqwest::Error) -> DeliveryError {
    if err.is_timeout() {
        DeliveryError::Timeout
    } else if err.is_builder() {
        DeliveryError::InvalidUri(err.to_string())
    } else {
        DeliveryError::RequestFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_from_config_branches_on_put_uri() {
        let mut config = DeliveryConfig::default();
        assert_eq!(Delivery::from_config(&config), Delivery::Stdout);

        config.put_uri = "https://hooks.example.com/calendar".to_string();
        config.timeout_secs = 7;
        assert_eq!(
            Delivery::from_config(&config),
            Delivery::Put {
                uri: "https://hooks.example.com/calendar".to_string(),
                timeout: Duration::from_secs(7),
            }
        );
    }

    #[tokio::test]
    async fn test_stdout_writes_document() {
        let mut out = Vec::new();
        Delivery::Stdout
            .deliver("{\"a\": 1}", false, &mut out)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\": 1}\n");
    }

    #[tokio::test]
    async fn test_put_sends_json_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/calendar"))
            .and(header("Content-Type", "application/json"))
            .and(body_string("[]"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let delivery = Delivery::Put {
            uri: format!("{}/calendar", mock_server.uri()),
            timeout: Duration::from_secs(10),
        };
        let mut out = Vec::new();
        delivery.deliver("[]", false, &mut out).await.unwrap();

        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_put_verbose_echoes_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
            .mount(&mock_server)
            .await;

        let uri = format!("{}/calendar", mock_server.uri());
        let delivery = Delivery::Put {
            uri: uri.clone(),
            timeout: Duration::from_secs(10),
        };
        let mut out = Vec::new();
        delivery.deliver("[]", true, &mut out).await.unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains(&format!("Performing http put to '{}'", uri)));
        assert!(printed.contains("Response code: 200 OK, data:\nstored"));
    }

    #[tokio::test]
    async fn test_put_rejection_is_not_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let delivery = Delivery::Put {
            uri: mock_server.uri(),
            timeout: Duration::from_secs(10),
        };
        let mut out = Vec::new();
        assert!(delivery.deliver("[]", false, &mut out).await.is_ok());
    }

    #[tokio::test]
    async fn test_put_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let delivery = Delivery::Put {
            uri: mock_server.uri(),
            timeout: Duration::from_millis(50),
        };
        let mut out = Vec::new();
        let result = delivery.deliver("[]", false, &mut out).await;
        assert!(matches!(result, Err(DeliveryError::Timeout)));
    }
}
