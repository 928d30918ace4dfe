//! Exchange Web Services client.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::instrument;
use url::Url;

use crate::error::EwsError;
use crate::soap;
use crate::types::*;
use crate::xml::XmlNode;
use crate::TRACE_TARGET;

/// Matches the EWS server-side request limit.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(100);

#[derive(Clone)]
pub enum Credentials {
    Basic { username: String, password: String },
    Bearer(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"***").finish(),
        }
    }
}

#[derive(Debug)]
pub struct EwsClient {
    client: reqwest::Client,
    endpoint: Url,
    credentials: Option<Credentials>,
    version: ExchangeVersion,
    trace: bool,
}

impl EwsClient {
    /// # Errors
    ///
    /// Fails when `endpoint` is not an absolute URL or the HTTP client
    /// cannot be built.
    pub fn new(
        endpoint: &str,
        credentials: Option<Credentials>,
        version: ExchangeVersion,
    ) -> Result<Self, EwsError> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| EwsError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            credentials,
            version,
            trace: false,
        })
    }

    /// Log every SOAP request and response body on the trace target.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Bind to the calendar folder of `mailbox`.
    ///
    /// # Errors
    ///
    /// Propagates transport, authentication and EWS response errors.
    #[instrument(skip(self), level = "info")]
    pub async fn bind_calendar(&self, mailbox: &str) -> Result<CalendarFolder, EwsError> {
        let doc = self
            .call("GetFolder", &soap::get_folder_request(mailbox))
            .await?;
        soap::parse_get_folder(&doc, mailbox)
    }

    /// Appointments in `folder` that overlap the view window.
    ///
    /// # Errors
    ///
    /// Propagates transport, authentication and EWS response errors.
    #[instrument(skip(self, folder), fields(mailbox = %folder.mailbox), level = "info")]
    pub async fn find_appointments(
        &self,
        folder: &CalendarFolder,
        view: &CalendarView,
    ) -> Result<Vec<Appointment>, EwsError> {
        let doc = self
            .call("FindItem", &soap::find_item_request(folder, view))
            .await?;
        let appointments = soap::parse_find_item(&doc)?;
        tracing::debug!(count = appointments.len(), "Fetched appointments");
        Ok(appointments)
    }

    /// Batched free/busy lookup, one result per mailbox in input order.
    ///
    /// # Errors
    ///
    /// Fails for request-level problems; a single unknown mailbox is
    /// reported on its own result instead.
    #[instrument(skip(self, mailboxes), fields(mailboxes = mailboxes.len()), level = "info")]
    pub async fn get_user_availability(
        &self,
        mailboxes: &[String],
        options: &AvailabilityOptions,
    ) -> Result<Vec<AttendeeAvailability>, EwsError> {
        let doc = self
            .call(
                "GetUserAvailability",
                &soap::get_user_availability_request(mailboxes, options),
            )
            .await?;
        soap::parse_get_user_availability(&doc, mailboxes)
    }

    /// POST one SOAP envelope and return the parsed response document.
    async fn call(&self, operation: &str, body: &str) -> Result<XmlNode, EwsError> {
        let request_xml = soap::envelope(self.version, body);

        if self.trace {
            tracing::trace!(target: TRACE_TARGET, operation, "EWS request:\n{}", request_xml);
        }

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", soap::soap_action(operation))
            .body(request_xml);

        request = match &self.credentials {
            Some(Credentials::Basic { username, password }) => {
                request.basic_auth(username, Some(password))
            }
            Some(Credentials::Bearer(token)) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        self.handle_response(operation, response).await
    }

    /// Helper to map HTTP status, SOAP faults and XML errors.
    async fn handle_response(
        &self,
        operation: &str,
        response: reqwest::Response,
    ) -> Result<XmlNode, EwsError> {
        let status = response.status();
        let text = response.text().await?;

        if self.trace {
            tracing::trace!(
                target: TRACE_TARGET,
                operation,
                status = status.as_u16(),
                "EWS response:\n{}",
                text
            );
        }

        match status.as_u16() {
            401 => return Err(EwsError::Unauthorized),
            403 => return Err(EwsError::Forbidden),
            _ => {}
        }

        let doc = match XmlNode::parse(&text) {
            Ok(doc) => doc,
            Err(_) if !status.is_success() => {
                return Err(EwsError::Http {
                    status: status.as_u16(),
                    body: text.chars().take(512).collect(),
                });
            }
            Err(e) => return Err(e),
        };

        // EWS reports faults with HTTP 500, so look before checking status
        soap::check_fault(&doc)?;

        if !status.is_success() {
            return Err(EwsError::Http {
                status: status.as_u16(),
                body: text.chars().take(512).collect(),
            });
        }

        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_relative_endpoint() {
        let result = EwsClient::new("EWS/Exchange.asmx", None, ExchangeVersion::default());
        assert!(matches!(result, Err(EwsError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let basic = Credentials::Basic {
            username: "svc".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{:?}", basic);
        assert!(rendered.contains("svc"));
        assert!(!rendered.contains("hunter2"));

        let bearer = Credentials::Bearer("eyJ0eXAi".into());
        assert!(!format!("{:?}", bearer).contains("eyJ0eXAi"));
    }

    #[test]
    fn test_with_trace() {
        let client = EwsClient::new(
            "https://mail.example.com/EWS/Exchange.asmx",
            None,
            ExchangeVersion::Exchange2013,
        )
        .unwrap()
        .with_trace(true);
        assert!(client.trace);
        assert_eq!(client.endpoint().host_str(), Some("mail.example.com"));
    }
}
