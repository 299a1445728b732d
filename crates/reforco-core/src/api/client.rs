//! Client for the hosted backing store.
//!
//! Tables are read through the PostgREST endpoint (`/rest/v1/{table}`) and
//! edge functions are invoked at `/functions/v1/{name}`. Every request carries
//! the project's anonymous key both as `apikey` and as a bearer token.

use std::time::Duration;

use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::calendar::CalendarMonth;
use crate::models::{AssistantContext, AssistantReply, AssistantRequest, Lesson, Student};

use super::retry::{retry, RetryPolicy};
use super::FetchError;

// ============================================================================
// Constants
// ============================================================================

const REST_PATH: &str = "rest/v1";

const FUNCTIONS_PATH: &str = "functions/v1";

const LESSONS_TABLE: &str = "aulas";

const STUDENTS_TABLE: &str = "alunos";

const ASSISTANT_FUNCTION: &str = "teacher-assistant";

/// Number of recent rows of each table forwarded to the assistant.
pub const ASSISTANT_CONTEXT_ROWS: usize = 5;

/// Connection establishment limit; the per-request limit comes from the policy.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Backing-store client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    anon_key: String,
    policy: RetryPolicy,
}

impl BackendClient {
    /// Create a client for the project at `base_url`.
    pub fn new(
        base_url: &str,
        anon_key: &str,
        policy: RetryPolicy,
    ) -> Result<Self, FetchError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(FetchError::config("backing store URL is not set"));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(FetchError::config(format!(
                "backing store URL must start with http:// or https://, got {}",
                base_url
            )));
        }
        let anon_key = anon_key.trim();
        if anon_key.is_empty() {
            return Err(FetchError::config("backing store API key is not set"));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| FetchError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            anon_key: anon_key.to_string(),
            policy,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn headers(&self) -> Result<header::HeaderMap, FetchError> {
        let mut headers = header::HeaderMap::new();
        let key = header::HeaderValue::from_str(&self.anon_key)
            .map_err(|_| FetchError::config("API key contains invalid header characters"))?;
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", self.anon_key))
            .map_err(|_| FetchError::config("API key contains invalid header characters"))?;
        headers.insert("apikey", key);
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(FetchError::from_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        retry(&self.policy, || async move {
            let response = self
                .client
                .get(url)
                .headers(self.headers()?)
                .query(query)
                .send()
                .await?;
            let response = Self::check_response(response).await?;
            response.json::<T>().await.map_err(|e| {
                FetchError::invalid_response(format!("Failed to parse response from {}: {}", url, e))
            })
        })
        .await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, FetchError> {
        retry(&self.policy, || async move {
            let response = self
                .client
                .post(url)
                .headers(self.headers()?)
                .json(body)
                .send()
                .await?;
            let response = Self::check_response(response).await?;
            response.json::<T>().await.map_err(|e| {
                FetchError::invalid_response(format!("Failed to parse response from {}: {}", url, e))
            })
        })
        .await
    }

    // ===== Tables =====

    /// Select rows from `table`. `query` holds PostgREST parameters such as
    /// `("select", "*")`, `("order", "data.desc")` or `("data", "gte.2024-03-01")`.
    pub async fn select_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, FetchError> {
        let url = format!("{}/{}/{}", self.base_url, REST_PATH, table);
        debug!(table, params = query.len(), "Selecting rows");
        self.get(&url, query).await
    }

    /// Lessons dated within `month`, ordered by date and time.
    pub async fn fetch_lessons_for_month(&self, month: CalendarMonth) -> Result<Vec<Lesson>, FetchError> {
        let (first, next) = month.date_range();
        let query = [
            ("select", "*".to_string()),
            ("data", format!("gte.{}", first.format("%Y-%m-%d"))),
            ("data", format!("lt.{}", next.format("%Y-%m-%d"))),
            ("order", "data.asc,horario.asc".to_string()),
        ];
        self.select_rows(LESSONS_TABLE, &query).await
    }

    /// Most recent lessons with their student rows embedded.
    pub async fn fetch_recent_lessons(&self, limit: usize) -> Result<Vec<Lesson>, FetchError> {
        let query = [
            ("select", "*,alunos(*)".to_string()),
            ("order", "data.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        self.select_rows(LESSONS_TABLE, &query).await
    }

    pub async fn fetch_students(&self, limit: usize) -> Result<Vec<Student>, FetchError> {
        let query = [("select", "*".to_string()), ("limit", limit.to_string())];
        self.select_rows(STUDENTS_TABLE, &query).await
    }

    // ===== Edge functions =====

    pub async fn invoke_function<T: DeserializeOwned, B: Serialize>(
        &self,
        name: &str,
        body: &B,
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}/{}", self.base_url, FUNCTIONS_PATH, name);
        debug!(function = name, "Invoking edge function");
        self.post(&url, body).await
    }

    /// Recent students and lessons to send along with an assistant question.
    pub async fn fetch_assistant_context(&self) -> Result<AssistantContext, FetchError> {
        let (alunos, aulas) = futures::try_join!(
            self.fetch_students(ASSISTANT_CONTEXT_ROWS),
            self.fetch_recent_lessons(ASSISTANT_CONTEXT_ROWS),
        )?;
        Ok(AssistantContext { alunos, aulas })
    }

    pub async fn ask_assistant(
        &self,
        question: &str,
        context: &AssistantContext,
    ) -> Result<AssistantReply, FetchError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(FetchError::config("question is empty"));
        }
        let request = AssistantRequest {
            message: question,
            context,
        };
        self.invoke_function(ASSISTANT_FUNCTION, &request).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FetchErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "anon-test-key";

    fn client_for(server: &MockServer, policy: RetryPolicy) -> BackendClient {
        BackendClient::new(&server.uri(), KEY, policy).expect("Client should build")
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_new_rejects_missing_configuration() {
        let err = BackendClient::new("", KEY, RetryPolicy::none()).err().unwrap();
        assert_eq!(err.kind, FetchErrorKind::Config);

        let err = BackendClient::new("https://x.example", "  ", RetryPolicy::none()).err().unwrap();
        assert_eq!(err.kind, FetchErrorKind::Config);

        let err = BackendClient::new("x.example", KEY, RetryPolicy::none()).err().unwrap();
        assert_eq!(err.kind, FetchErrorKind::Config);
    }

    #[tokio::test]
    async fn test_fetch_lessons_for_month_sends_range_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/aulas"))
            .and(header("apikey", KEY))
            .and(header("authorization", "Bearer anon-test-key"))
            .and(query_param("order", "data.asc,horario.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "data": "2024-03-04", "horario": "14:00", "materia": "Física"},
                {"id": 2, "data": "2024-03-18", "horario": "09:00"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, RetryPolicy::none());
        let lessons = client
            .fetch_lessons_for_month(CalendarMonth::new(2024, 3).unwrap())
            .await
            .expect("Fetch should succeed");

        assert_eq!(lessons.len(), 2);
        assert_eq!(lessons[0].materia.as_deref(), Some("Física"));

        let requests = server.received_requests().await.unwrap();
        let query = requests[0].url.query().unwrap_or_default().to_string();
        assert!(query.contains("data=gte.2024-03-01"), "query was {}", query);
        assert!(query.contains("data=lt.2024-04-01"), "query was {}", query);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_by_policy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/alunos"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server, quick_policy(3));
        let err = client.fetch_students(5).await.unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::Server);
        assert!(err.message.contains("upstream down"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/alunos"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid API key"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, quick_policy(3));
        let err = client.fetch_students(5).await.unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_unparseable_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/aulas"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, RetryPolicy::none());
        let err = client.fetch_recent_lessons(5).await.unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_ask_assistant_posts_question_and_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/teacher-assistant"))
            .and(body_partial_json(json!({
                "message": "Como está a Ana?",
                "context": {"alunos": [{"id": 3, "nome": "Ana"}], "aulas": []}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Ana tem evoluído bem.",
                "suggestions": ["Agendar revisão"],
                "actions": [{"type": "review", "description": "Revisar frações", "priority": "high"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, RetryPolicy::none());
        let context = AssistantContext {
            alunos: vec![Student {
                id: 3,
                nome: Some("Ana".to_string()),
                serie: None,
                materia: None,
                proxima_aula: None,
            }],
            aulas: vec![],
        };

        let reply = client
            .ask_assistant("  Como está a Ana?  ", &context)
            .await
            .expect("Assistant call should succeed");

        assert_eq!(reply.message, "Ana tem evoluído bem.");
        assert_eq!(reply.suggestions, vec!["Agendar revisão".to_string()]);
        assert_eq!(reply.actions[0].action_type, "review");
    }

    #[tokio::test]
    async fn test_ask_assistant_rejects_empty_question() {
        let server = MockServer::start().await;
        let client = client_for(&server, RetryPolicy::none());

        let err = client
            .ask_assistant("   ", &AssistantContext::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::Config);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Bind then release a port so nothing is listening on it
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = BackendClient::new(&format!("http://{}", addr), KEY, RetryPolicy::none()).unwrap();
        let err = client.fetch_students(5).await.unwrap_err();

        assert_eq!(err.kind, FetchErrorKind::Network, "unexpected error {}", err);
        assert!(err.is_retryable());
    }
}
