//! Client for registering accounts on a homeserver through its
//! application-service registration endpoint.

mod client;
mod error;
mod types;

pub use client::{HomeserverClient, DEFAULT_MAX_IDLE_PER_HOST, DEFAULT_TIMEOUT};
pub use error::HomeserverError;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADDRESS: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    fn create_test_client(mock_server: &MockServer, timeout: Duration) -> HomeserverClient {
        HomeserverClient::new(
            &format!("{}/_matrix/client/r0/register", mock_server.uri()),
            SecretString::new("test-as-token".into()),
            timeout,
            DEFAULT_MAX_IDLE_PER_HOST,
        )
        .unwrap()
    }

    fn test_request() -> RegisterRequest {
        RegisterRequest {
            localpart: ADDRESS.to_lowercase(),
            displayname: "alice-deadbeef".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let mock_server = MockServer::start().await;

        let response_body = serde_json::json!({
            "access_token": "MDAxYWxvY2F0aW9u",
            "home_server": "transport01.example.org",
            "user_id": "@0x52908400098527886e0f7030069857d2e4169ee7:transport01.example.org"
        });

        Mock::given(method("POST"))
            .and(path("/_matrix/client/r0/register"))
            .and(query_param("access_token", "test-as-token"))
            .and(body_json(serde_json::json!({
                "localpart": ADDRESS.to_lowercase(),
                "displayname": "alice-deadbeef",
                "password_hash": "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server, Duration::from_secs(5));
        let result = client.register(&test_request()).await.unwrap();

        assert_eq!(result.home_server, "transport01.example.org");
        assert_eq!(
            result.user_id,
            "@0x52908400098527886e0f7030069857d2e4169ee7:transport01.example.org"
        );
    }

    #[tokio::test]
    async fn test_register_api_error_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "errcode": "M_USER_IN_USE",
                "error": "User ID already taken."
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server, Duration::from_secs(5));
        let result = client.register(&test_request()).await;

        match result {
            Err(HomeserverError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "M_USER_IN_USE: User ID already taken.");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_plain_text_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server, Duration::from_secs(5));
        let result = client.register(&test_request()).await;

        assert!(matches!(
            result,
            Err(HomeserverError::Api { status: 503, ref message }) if message == "upstream unavailable"
        ));
    }

    #[tokio::test]
    async fn test_register_unparseable_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server, Duration::from_secs(5));
        let result = client.register(&test_request()).await;

        assert!(matches!(result, Err(HomeserverError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_register_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "access_token": "t",
                        "home_server": "h",
                        "user_id": "u"
                    }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server, Duration::from_millis(200));
        let result = client.register(&test_request()).await;

        assert!(matches!(result, Err(HomeserverError::Timeout(_))));
        assert!(result.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_connection_refused_hides_token() {
        let client = HomeserverClient::new(
            "http://127.0.0.1:1/_matrix/client/r0/register",
            SecretString::new("super-secret-token".into()),
            DEFAULT_TIMEOUT,
            DEFAULT_MAX_IDLE_PER_HOST,
        )
        .unwrap();

        let err = client.register(&test_request()).await.unwrap_err();

        assert!(err.is_transport());
        assert!(!err.to_string().contains("super-secret-token"));
    }

    #[test]
    fn test_invalid_configuration() {
        let bad_url = HomeserverClient::new(
            "not a url",
            SecretString::new("t".into()),
            DEFAULT_TIMEOUT,
            DEFAULT_MAX_IDLE_PER_HOST,
        );
        assert!(matches!(bad_url, Err(HomeserverError::Config(_))));

        let empty_token = HomeserverClient::new(
            "http://localhost:8008",
            SecretString::new(String::new()),
            DEFAULT_TIMEOUT,
            DEFAULT_MAX_IDLE_PER_HOST,
        );
        assert!(matches!(empty_token, Err(HomeserverError::Config(_))));
    }

    #[test]
    fn test_request_has_no_plaintext_password_field() {
        let json = serde_json::to_value(test_request()).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 3);
        assert!(object.get("password").is_none());
        assert!(object.contains_key("password_hash"));
    }
}
