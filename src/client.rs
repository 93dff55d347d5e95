//! A typed HTTP client for the voting API.
//!
//! Every endpoint has one method, taking and returning the same DTOs the
//! server uses, so the two cannot drift apart.

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::model::{
    api::{
        auth::{SigninRequest, SigninResponse, SignupRequest},
        candidate::{CandidateAdded, CandidateBatch, CandidateList, CandidateSpec},
        election::{ElectionCreated, ElectionDetails, ElectionList, ElectionSpec, StatusChange},
        id::ApiId,
        message::Message,
        results::ElectionResults,
        user::{ProfileResponse, UserList},
        vote::{VoteCast, VoteCheck, VotingHistory},
    },
    common::election::ElectionStatus,
};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response, or the response was malformed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The server answered with an error status.
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Client for one server, optionally signed in.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// A signed-out client for the server at `base_url`, e.g. `http://localhost:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: None,
        }
    }

    /// Use an existing bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let body = response.text().await?;
        let message = rocket::serde::json::serde_json::from_str::<Message>(&body)
            .map(|m| m.message)
            .unwrap_or(body);
        Err(ClientError::Api { status, message })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        Self::send(self.request(Method::GET, path)).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        Self::send(self.request(Method::POST, path).json(body)).await
    }

    pub async fn signup(&self, request: &SignupRequest) -> ClientResult<Message> {
        self.post("/auth/signup", request).await
    }

    /// Sign in, keeping the token for later requests.
    pub async fn signin(&mut self, email: &str, password: &str) -> ClientResult<SigninResponse> {
        let credentials = SigninRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: SigninResponse = self.post("/auth/signin", &credentials).await?;
        self.token = Some(response.token.clone());
        Ok(response)
    }

    /// Forget the token. The server-side cookie, if any, is cleared too.
    pub async fn logout(&mut self) -> ClientResult<Message> {
        let message = Self::send(self.request(Method::DELETE, "/auth")).await?;
        self.token = None;
        Ok(message)
    }

    pub async fn create_admin(&self, request: &SignupRequest) -> ClientResult<ProfileResponse> {
        self.post("/admins", request).await
    }

    pub async fn list_elections(&self, status: Option<ElectionStatus>) -> ClientResult<ElectionList> {
        match status {
            Some(status) => self.get(&format!("/election?status={status}")).await,
            None => self.get("/election").await,
        }
    }

    pub async fn create_election(&self, spec: &ElectionSpec) -> ClientResult<ElectionCreated> {
        self.post("/election/create", spec).await
    }

    pub async fn election(&self, election_id: ApiId) -> ClientResult<ElectionDetails> {
        self.get(&format!("/election/details/{election_id}")).await
    }

    pub async fn set_status(
        &self,
        election_id: ApiId,
        status: ElectionStatus,
    ) -> ClientResult<StatusChange> {
        let path = format!("/election/status/{}/{election_id}", status_action(status));
        Self::send(self.request(Method::PUT, &path)).await
    }

    pub async fn delete_election(&self, election_id: ApiId) -> ClientResult<Message> {
        let path = format!("/election/delete/{election_id}");
        Self::send(self.request(Method::DELETE, &path)).await
    }

    pub async fn vote(&self, election_id: ApiId, candidate_id: ApiId) -> ClientResult<VoteCast> {
        let path = format!("/election/vote/{election_id}/{candidate_id}");
        Self::send(self.request(Method::POST, &path)).await
    }

    pub async fn check_vote(&self, election_id: ApiId) -> ClientResult<VoteCheck> {
        self.get(&format!("/vote/check/{election_id}")).await
    }

    pub async fn results(&self, election_id: ApiId) -> ClientResult<ElectionResults> {
        self.get(&format!("/election/{election_id}/results")).await
    }

    pub async fn add_candidate(
        &self,
        election_id: ApiId,
        spec: &CandidateSpec,
    ) -> ClientResult<CandidateAdded> {
        self.post(&format!("/candidate/add/{election_id}"), spec).await
    }

    pub async fn add_candidates(
        &self,
        election_id: ApiId,
        batch: &CandidateBatch,
    ) -> ClientResult<CandidateList> {
        self.post(&format!("/candidate/addcandidates/{election_id}"), batch)
            .await
    }

    pub async fn candidates(&self, election_id: ApiId) -> ClientResult<CandidateList> {
        self.get(&format!("/candidate/{election_id}")).await
    }

    pub async fn delete_candidate(
        &self,
        election_id: ApiId,
        candidate_id: ApiId,
    ) -> ClientResult<CandidateAdded> {
        let path = format!("/candidate/delete/{election_id}/{candidate_id}");
        Self::send(self.request(Method::DELETE, &path)).await
    }

    pub async fn my_history(&self) -> ClientResult<VotingHistory> {
        self.get("/vote/myhistory").await
    }

    pub async fn user_history(&self, user_id: ApiId) -> ClientResult<VotingHistory> {
        self.get(&format!("/vote/history/{user_id}")).await
    }

    pub async fn me(&self) -> ClientResult<ProfileResponse> {
        self.get("/info/user").await
    }

    pub async fn admin_profile(&self) -> ClientResult<ProfileResponse> {
        self.get("/info/admin").await
    }

    pub async fn users(&self) -> ClientResult<UserList> {
        self.get("/info/users").await
    }
}

/// The path segment that moves an election into `status`.
pub fn status_action(status: ElectionStatus) -> &'static str {
    match status {
        ElectionStatus::Active => "start",
        ElectionStatus::Upcoming => "upcoming",
        ElectionStatus::Completed => "complete",
    }
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::Status,
        serde::json::Json,
        tokio::{net::TcpStream, time::sleep},
        Shutdown,
    };
    use std::{net::TcpListener, time::Duration};

    use super::*;
    use crate::error::{Error, Result};

    #[post("/auth/signup")]
    fn accepted() -> Json<Message> {
        Json(Message::new("Signup successful"))
    }

    #[get("/election")]
    fn rejected() -> Result<Json<ElectionList>> {
        Err(Error::conflict("Election is not active"))
    }

    #[get("/vote/myhistory")]
    fn plain_text() -> (Status, &'static str) {
        (Status::BadGateway, "upstream down")
    }

    /// Serve the routes above on a free local port.
    async fn serve() -> (String, Shutdown) {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let figment = rocket::Config::figment()
            .merge(("address", "127.0.0.1"))
            .merge(("port", port))
            .merge(("log_level", "off"));
        let rocket = rocket::custom(figment)
            .mount("/", routes![accepted, rejected, plain_text])
            .ignite()
            .await
            .unwrap();
        let shutdown = rocket.shutdown();
        rocket::tokio::spawn(rocket.launch());

        for _ in 0..200 {
            if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        (format!("http://127.0.0.1:{port}"), shutdown)
    }

    #[rocket::async_test]
    async fn responses_map_to_results() {
        let (url, shutdown) = serve().await;
        let client = ApiClient::new(url);

        let message = client.signup(&SignupRequest::example()).await.unwrap();
        assert_eq!(message.message, "Signup successful");

        // JSON error bodies give their message.
        match client.list_elections(None).await.unwrap_err() {
            ClientError::Api { status, message } => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert_eq!(message, "Election is not active");
            }
            err => panic!("unexpected error: {err}"),
        }

        // Anything else is passed through as text.
        match client.my_history().await.unwrap_err() {
            ClientError::Api { status, message } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(message, "upstream down");
            }
            err => panic!("unexpected error: {err}"),
        }

        // No route, so Rocket's own 404 page.
        match client.me().await.unwrap_err() {
            ClientError::Api { status, .. } => assert_eq!(status, StatusCode::NOT_FOUND),
            err => panic!("unexpected error: {err}"),
        }

        shutdown.notify();
    }

    #[test]
    fn urls() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(client.url("/election"), "http://localhost:8000/election");
        assert!(client.token().is_none());

        let client = client.with_token("abc");
        assert_eq!(client.token(), Some("abc"));
    }

    #[test]
    fn status_paths() {
        assert_eq!(status_action(ElectionStatus::Active), "start");
        assert_eq!(status_action(ElectionStatus::Upcoming), "upcoming");
        assert_eq!(status_action(ElectionStatus::Completed), "complete");
    }
}
