//! Client for the internal API.
//!
//! Handlers only see the [`Upstream`] trait. [`HttpUpstream`] addresses the
//! public API origin and runs every URL through [`ApiProxy`], so calls land on
//! the internal origin carrying the real client address.

use axum::body::Bytes;
use reqwest::{
    Client, Method, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{future::Future, net::IpAddr, pin::Pin, time::Duration};
use tracing::debug;
use url::Url;

use super::{cookies::REFRESH_TOKEN, proxy::ApiProxy};
use crate::{APP_USER_AGENT, profile::UserProfile};

pub type UpstreamFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, UpstreamError>> + Send + 'a>>;

#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream responded with {status}")]
    Status { status: StatusCode, body: String },
    #[error("unexpected upstream payload: {0}")]
    Decode(String),
    #[error("path {0:?} does not resolve under the API origin")]
    Path(String),
}

/// Token pair returned by `POST auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginName {
    pub name: String,
    pub mail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub mail: Option<String>,
    pub created_by: String,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub resource: String,
    pub rwx: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub name: String,
}

/// Row of `GET user?limit=N`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub login: LoginName,
    pub registration: Registration,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub acl: Vec<Acl>,
    pub data: UserData,
    pub modified_date: String,
}

/// Browser request forwarded verbatim (minus hop-by-hop headers).
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client: Option<IpAddr>,
}

#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub trait Upstream: Send + Sync {
    /// `GET user/{sub}/app` with the raw access token as bearer credential.
    fn fetch_profile<'a>(
        &'a self,
        sub: &'a str,
        access_token: &'a str,
        client: Option<IpAddr>,
    ) -> UpstreamFuture<'a, UserProfile>;

    /// `POST auth/login`.
    fn login<'a>(
        &'a self,
        login: &'a str,
        pwd: &'a str,
        client: Option<IpAddr>,
    ) -> UpstreamFuture<'a, TokenPair>;

    /// `POST auth/logout`; the refresh token travels as a cookie.
    fn logout<'a>(
        &'a self,
        access_token: &'a str,
        refresh_token: Option<&'a str>,
        client: Option<IpAddr>,
    ) -> UpstreamFuture<'a, ()>;

    /// `GET internal/service/names`.
    fn service_names<'a>(
        &'a self,
        access_token: &'a str,
        client: Option<IpAddr>,
    ) -> UpstreamFuture<'a, Vec<String>>;

    /// `GET user?limit={limit}`.
    fn list_users<'a>(
        &'a self,
        access_token: &'a str,
        limit: u32,
        client: Option<IpAddr>,
    ) -> UpstreamFuture<'a, Vec<User>>;

    /// `GET misc/total_users`.
    fn total_users<'a>(
        &'a self,
        access_token: &'a str,
        client: Option<IpAddr>,
    ) -> UpstreamFuture<'a, u64>;

    /// Pass a browser request through to the API.
    fn forward(&self, request: ForwardRequest) -> UpstreamFuture<'_, ForwardResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    public: Url,
    proxy: ApiProxy,
}

impl HttpUpstream {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(proxy: ApiProxy, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            public: proxy.public().clone(),
            proxy,
        })
    }

    /// Resolve `path` against the public API URL. Absolute, scheme-relative
    /// and escaping paths are refused so nothing leaves the API origin.
    fn endpoint(&self, path: &str) -> Result<String, UpstreamError> {
        let url = self.public.join(path).map_err(|err| {
            debug!("unparsable upstream path {path:?}: {err}");
            UpstreamError::Path(path.to_string())
        })?;
        if url.origin() != self.public.origin() || !url.path().starts_with(self.public.path()) {
            return Err(UpstreamError::Path(path.to_string()));
        }
        Ok(self.proxy.rewrite(url.as_str()))
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        access_token: Option<&str>,
        client: Option<IpAddr>,
    ) -> Result<reqwest::RequestBuilder, UpstreamError> {
        let url = self.endpoint(path)?;
        let mut headers = HeaderMap::new();
        self.proxy.stamp_client(&mut headers, client);
        if let Some(token) = access_token {
            let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| UpstreamError::Decode(err.to_string()))?;
            headers.insert(AUTHORIZATION, bearer);
        }
        Ok(self.client.request(method, url).headers(headers))
    }

    async fn send(builder: reqwest::RequestBuilder) -> Result<reqwest::Response, UpstreamError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(%status, "upstream rejected request");
        Err(UpstreamError::Status { status, body })
    }

    async fn json<T: DeserializeOwned>(
        builder: reqwest::RequestBuilder,
    ) -> Result<T, UpstreamError> {
        let bytes = Self::send(builder).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| UpstreamError::Decode(err.to_string()))
    }
}

impl Upstream for HttpUpstream {
    fn fetch_profile<'a>(
        &'a self,
        sub: &'a str,
        access_token: &'a str,
        client: Option<IpAddr>,
    ) -> UpstreamFuture<'a, UserProfile> {
        Box::pin(async move {
            let path = format!("user/{sub}/app");
            Self::json(self.request(Method::GET, &path, Some(access_token), client)?).await
        })
    }

    fn login<'a>(
        &'a self,
        login: &'a str,
        pwd: &'a str,
        client: Option<IpAddr>,
    ) -> UpstreamFuture<'a, TokenPair> {
        Box::pin(async move {
            let body = serde_json::json!({ "login": login, "pwd": pwd });
            let builder = self
                .request(Method::POST, "auth/login", None, client)?
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
            Self::json(builder).await
        })
    }

    fn logout<'a>(
        &'a self,
        access_token: &'a str,
        refresh_token: Option<&'a str>,
        client: Option<IpAddr>,
    ) -> UpstreamFuture<'a, ()> {
        Box::pin(async move {
            let mut builder = self.request(Method::POST, "auth/logout", Some(access_token), client)?;
            if let Some(refresh) = refresh_token {
                builder = builder.header(COOKIE, format!("{REFRESH_TOKEN}={refresh}"));
            }
            Self::send(builder).await?;
            Ok(())
        })
    }

    fn service_names<'a>(
        &'a self,
        access_token: &'a str,
        client: Option<IpAddr>,
    ) -> UpstreamFuture<'a, Vec<String>> {
        Box::pin(async move {
            let builder =
                self.request(Method::GET, "internal/service/names", Some(access_token), client)?;
            Self::json(builder).await
        })
    }

    fn list_users<'a>(
        &'a self,
        access_token: &'a str,
        limit: u32,
        client: Option<IpAddr>,
    ) -> UpstreamFuture<'a, Vec<User>> {
        Box::pin(async move {
            let path = format!("user?limit={limit}");
            Self::json(self.request(Method::GET, &path, Some(access_token), client)?).await
        })
    }

    fn total_users<'a>(
        &'a self,
        access_token: &'a str,
        client: Option<IpAddr>,
    ) -> UpstreamFuture<'a, u64> {
        Box::pin(async move {
            let builder = self.request(Method::GET, "misc/total_users", Some(access_token), client)?;
            let text = Self::send(builder).await?.text().await?;
            text.trim()
                .parse::<u64>()
                .map_err(|err| UpstreamError::Decode(format!("total_users {text:?}: {err}")))
        })
    }

    fn forward(&self, request: ForwardRequest) -> UpstreamFuture<'_, ForwardResponse> {
        Box::pin(async move {
            let ForwardRequest {
                method,
                path_and_query,
                mut headers,
                body,
                client,
            } = request;
            let url = self.endpoint(path_and_query.trim_start_matches('/'))?;
            self.proxy.stamp_client(&mut headers, client);

            let response = self
                .client
                .request(method, url)
                .headers(headers)
                .body(body)
                .send()
                .await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok(ForwardResponse {
                status,
                headers,
                body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_rows_deserialize() {
        let raw = r#"[{
            "user_id": "01J0",
            "login": {"name": "bjorn", "mail": null},
            "registration": {"name": "bjorn", "mail": "b@home.lan", "created_by": "root", "created": "2024-01-02"},
            "roles": ["root"],
            "acl": [{"resource": "sensors", "rwx": 6}],
            "data": {"name": "Bjorn"},
            "modified_date": "2024-05-01"
        }]"#;
        let users: Vec<User> = serde_json::from_str(raw).expect("users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].roles, vec!["root".to_string()]);
        assert_eq!(users[0].acl[0].rwx, 6);
        assert_eq!(users[0].login.mail, None);
    }

    #[test]
    fn token_pair_ignores_extra_fields() {
        let raw = r#"{"access_token":"a.b.c","token_type":"Bearer","expires_in":"PT900S","refresh_token":"d.e.f","refresh_token_expires_in":"P7D"}"#;
        let pair: TokenPair = serde_json::from_str(raw).expect("pair");
        assert_eq!(pair.access_token, "a.b.c");
        assert_eq!(pair.refresh_token, "d.e.f");
    }

    #[test]
    fn endpoint_targets_internal_origin() -> Result<(), Box<dyn std::error::Error>> {
        let proxy = ApiProxy::new(
            Url::parse("http://bjorn.lan:8888/")?,
            Url::parse("http://127.0.0.1:8888/")?,
        );
        let upstream = HttpUpstream::new(proxy, Duration::from_secs(1))?;
        assert_eq!(
            upstream.endpoint("user/u1/app")?,
            "http://127.0.0.1:8888/user/u1/app"
        );
        assert_eq!(
            upstream.endpoint("user?limit=10")?,
            "http://127.0.0.1:8888/user?limit=10"
        );
        Ok(())
    }

    #[test]
    fn endpoint_refuses_foreign_origins() -> Result<(), Box<dyn std::error::Error>> {
        let proxy = ApiProxy::new(
            Url::parse("http://bjorn.lan:8888/")?,
            Url::parse("http://127.0.0.1:8888/")?,
        );
        let upstream = HttpUpstream::new(proxy, Duration::from_secs(1))?;
        for path in [
            "http://127.0.0.1:9/steal",
            "https://bjorn.lan:8888/user",
            "//evil.lan/user",
            "\\\\evil.lan/user",
            "http://bjorn.lan:8889/user",
        ] {
            assert!(
                matches!(upstream.endpoint(path), Err(UpstreamError::Path(_))),
                "{path} should be refused"
            );
        }
        Ok(())
    }

    #[test]
    fn endpoint_stays_below_api_base_path() -> Result<(), Box<dyn std::error::Error>> {
        let proxy = ApiProxy::new(
            Url::parse("http://bjorn.lan/api/")?,
            Url::parse("http://127.0.0.1:8888/")?,
        );
        let upstream = HttpUpstream::new(proxy, Duration::from_secs(1))?;
        assert_eq!(upstream.endpoint("user")?, "http://127.0.0.1:8888/user");
        assert!(matches!(upstream.endpoint("../admin"), Err(UpstreamError::Path(_))));
        assert!(matches!(upstream.endpoint("/admin"), Err(UpstreamError::Path(_))));
        assert!(matches!(upstream.endpoint("%2e%2e/admin"), Err(UpstreamError::Path(_))));
        Ok(())
    }
}
