use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::ApiError,
    request::{ApiRequest, FormPart, RequestBody},
    transport::{TokenSource, Transport},
    Result,
};

const USER_AGENT: &str = "StayDesk/0.1.0";

/// Authenticated REST client bound to a single backend origin
///
/// No retries: a failed call surfaces straight away.
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        Self::with_connect_timeout(base_url, tokens, None)
    }

    /// Same as [`HttpClient::new`] with a bound on connection setup only.
    /// Requests themselves never time out.
    pub fn with_connect_timeout(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(USER_AGENT),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn build_form(parts: Vec<FormPart>) -> Result<Form> {
        let mut form = Form::new();
        for part in parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let file = Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str(&mime)
                        .map_err(|_| {
                            ApiError::InvalidRequest(format!(
                                "Invalid content type '{}' for field {}",
                                mime, name
                            ))
                        })?;
                    form.part(name, file)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        let url = self.url_for(&request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self.client.request(request.method.into(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(token) = self.tokens.bearer_token() {
            builder = builder.bearer_auth(token);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(parts) => builder.multipart(Self::build_form(parts)?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), &body);
            warn!("{} {} failed: {}", request.method, url, err);
            return Err(err);
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::StaticToken;

    fn client(base: &str) -> HttpClient {
        HttpClient::new(base, Arc::new(StaticToken::default())).unwrap()
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let c = client("http://localhost:8000/api/");
        assert_eq!(c.base_url(), "http://localhost:8000/api");
        assert_eq!(c.url_for("/booking"), "http://localhost:8000/api/booking");
        assert_eq!(c.url_for("booking"), "http://localhost:8000/api/booking");
    }

    #[test]
    fn test_form_with_file_builds() {
        let parts = vec![
            FormPart::text("title", "Sea View"),
            FormPart::File {
                name: "images".into(),
                file_name: "front.jpg".into(),
                mime: "image/jpeg".into(),
                bytes: vec![0xff, 0xd8],
            },
        ];
        assert!(HttpClient::build_form(parts).is_ok());
    }

    #[test]
    fn test_bad_mime_is_rejected() {
        let parts = vec![FormPart::File {
            name: "images".into(),
            file_name: "x".into(),
            mime: "not a mime".into(),
            bytes: vec![],
        }];
        assert!(matches!(
            HttpClient::build_form(parts),
            Err(ApiError::InvalidRequest(msg)) if msg.contains("not a mime")
        ));
    }
}
