use super::{DnsLookup, Verifier, VerifyError};
use crate::acme::HTTP_01;
use tracing::debug;
use url::Url;

/// URL the CA fetches for an http-01 challenge
pub fn http01_url(domain: &str, port: u16, token: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "http://{}:{}/.well-known/acme-challenge/{}",
        domain, port, token
    ))
}

impl<L: DnsLookup> Verifier<L> {
    /// Fetch the challenge URL and require the body, trailing whitespace
    /// removed, to equal `key_authorization`
    pub async fn verify_http01(
        &self,
        domain: &str,
        token: &str,
        key_authorization: &str,
    ) -> Result<(), VerifyError> {
        let url = http01_url(domain, self.http_port, token).map_err(|e| {
            VerifyError::new(domain, HTTP_01, format!("invalid challenge URL: {}", e))
        })?;

        debug!(domain = %domain, url = %url, "Checking http-01 challenge response");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                VerifyError::new(domain, HTTP_01, format!("request to {} failed: {}", url, e))
            })?;

        let body = response
            .text()
            .await
            .map_err(|e| {
                VerifyError::new(domain, HTTP_01, format!("failed to read response: {}", e))
            })?;

        if body.trim_end() == key_authorization {
            debug!(domain = %domain, "http-01 response verified");
            Ok(())
        } else {
            Err(VerifyError::new(
                domain,
                HTTP_01,
                format!("response from {} does not match key authorization", url),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::{StaticLookup, VerifierConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(token: &str, status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/.well-known/acme-challenge/{}", token)))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    fn verifier(server: &MockServer) -> Verifier<StaticLookup> {
        let config = VerifierConfig {
            http_port: server.address().port(),
            ..Default::default()
        };
        Verifier::with_lookup(&config, StaticLookup::default()).unwrap()
    }

    #[test]
    fn test_http01_url() {
        let url = http01_url("example.com", 80, "abc").unwrap();
        assert_eq!(url.as_str(), "http://example.com/.well-known/acme-challenge/abc");

        let url = http01_url("example.com", 8080, "abc").unwrap();
        assert_eq!(url.as_str(), "http://example.com:8080/.well-known/acme-challenge/abc");
    }

    #[tokio::test]
    async fn test_accepts_trailing_whitespace() {
        let server = serve("tok", 200, "tok.thumb \r\n").await;

        verifier(&server)
            .verify_http01("127.0.0.1", "tok", "tok.thumb")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejects_single_character_difference() {
        let server = serve("tok", 200, "tok.thumC").await;

        let err = verifier(&server)
            .verify_http01("127.0.0.1", "tok", "tok.thumb")
            .await
            .unwrap_err();
        assert_eq!(err.domain(), "127.0.0.1");
        assert_eq!(err.challenge_type, HTTP_01);
    }

    #[tokio::test]
    async fn test_rejects_leading_whitespace() {
        let server = serve("tok", 200, " tok.thumb").await;

        assert!(verifier(&server)
            .verify_http01("127.0.0.1", "tok", "tok.thumb")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let server = serve("tok", 404, "tok.thumb").await;

        let err = verifier(&server)
            .verify_http01("127.0.0.1", "tok", "tok.thumb")
            .await
            .unwrap_err();
        assert!(err.reason.contains("request to"));
    }
}
