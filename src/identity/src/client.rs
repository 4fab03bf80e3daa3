//! Signed, paginated client for the identity REST API

use async_trait::async_trait;
use ocipa_core::{
    Compartment, DirectoryError, Group, IdentityDirectory, Policy, Result as DirectoryResult, User,
};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, DATE};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{endpoint_for_region, ProviderProfile};
use crate::error::{IdentityError, Result};
use crate::models::{
    CompartmentModel, GroupModel, PolicyModel, ServiceErrorModel, UserGroupMembershipModel,
    UserModel,
};
use crate::signer::{http_date, RequestSigner};
use crate::transport::RetryPolicy;
use crate::API_VERSION;

/// Response header carrying the next page token
const NEXT_PAGE_HEADER: &str = "opc-next-page";

/// Page size requested from list endpoints
const PAGE_LIMIT: &str = "1000";

/// Client construction options
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Overrides the endpoint derived from the region
    pub endpoint: Option<String>,
    /// Overrides the profile's region
    pub region: Option<String>,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: None,
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Identity directory backed by the provider's REST API
pub struct OciIdentityClient {
    http: Client,
    base_url: Url,
    host: String,
    signer: Arc<RequestSigner>,
    tenancy_id: String,
    retry: RetryPolicy,
}

impl OciIdentityClient {
    /// Create a client for an explicit endpoint
    pub fn new(
        endpoint: &str,
        tenancy_id: impl Into<String>,
        signer: RequestSigner,
        options: &ClientOptions,
    ) -> Result<Self> {
        let base_url = Url::parse(endpoint)
            .map_err(|e| IdentityError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        let host = match (base_url.host_str(), base_url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(IdentityError::InvalidEndpoint(format!(
                    "{}: missing host",
                    endpoint
                )))
            }
        };

        let http = Client::builder()
            .timeout(options.request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http,
            base_url,
            host,
            signer: Arc::new(signer),
            tenancy_id: tenancy_id.into(),
            retry: options.retry,
        })
    }

    /// Create a client from a loaded profile
    pub fn from_profile(profile: &ProviderProfile, options: ClientOptions) -> Result<Self> {
        let signer = RequestSigner::from_profile(profile)?;
        let endpoint = match (&options.endpoint, &options.region) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(region)) => endpoint_for_region(region),
            (None, None) => profile.identity_endpoint(),
        };
        info!("Using identity endpoint {}", endpoint);
        Self::new(&endpoint, profile.tenancy.clone(), signer, &options)
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("/{}/{}", API_VERSION, path.trim_start_matches('/')));
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(query);
        }
        url
    }

    /// Map a non-success response to the directory error taxonomy
    fn status_to_error(status: StatusCode, body: &str) -> DirectoryError {
        let detail = match serde_json::from_str::<ServiceErrorModel>(body) {
            Ok(err) if !err.code.is_empty() => format!("{} ({})", err.message, err.code),
            _ if body.is_empty() => format!("HTTP {}", status.as_u16()),
            _ => format!("HTTP {}: {}", status.as_u16(), body),
        };

        match status.as_u16() {
            401 => DirectoryError::auth(detail),
            403 => DirectoryError::access_denied(detail),
            404 => DirectoryError::not_found(detail),
            429 | 500..=599 => DirectoryError::transient(detail),
            _ => DirectoryError::invalid_response(detail),
        }
    }

    fn transport_error(err: reqwest::Error) -> DirectoryError {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            DirectoryError::transient(err.to_string())
        } else {
            DirectoryError::invalid_response(err.to_string())
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        url: &Url,
    ) -> DirectoryResult<(T, Option<String>)> {
        let target = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        let date = http_date();
        let authorization = self
            .signer
            .authorization("GET", &target, &self.host, &date)
            .map_err(DirectoryError::from)?;

        let header = |value: &str| {
            HeaderValue::from_str(value)
                .map_err(|e| DirectoryError::config(format!("invalid header value: {}", e)))
        };

        debug!("GET {}", target);
        let response = self
            .http
            .get(url.clone())
            .header(DATE, header(&date)?)
            .header(AUTHORIZATION, header(&authorization)?)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_to_error(status, &body));
        }

        let next_page = response
            .headers()
            .get(NEXT_PAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let body = response.bytes().await.map_err(Self::transport_error)?;
        let value = serde_json::from_slice(&body)
            .map_err(|e| DirectoryError::invalid_response(format!("{}: {}", target, e)))?;
        Ok((value, next_page))
    }

    /// GET with bounded retry of transient failures
    async fn get<T: DeserializeOwned>(&self, url: Url) -> DirectoryResult<(T, Option<String>)> {
        let mut attempt = 0;
        loop {
            match self.send_once(&url).await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_transient() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt + 1,
                        self.retry.max_attempts,
                        url.path(),
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_one<T: DeserializeOwned>(&self, path: &str) -> DirectoryResult<T> {
        let (value, _) = self.get(self.url(path, &[])).await?;
        Ok(value)
    }

    /// Follow `opc-next-page` until exhausted, concatenating pages in order
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> DirectoryResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page: Option<String> = None;
        let mut pages = 0usize;
        let mut seen: HashSet<String> = HashSet::new();

        loop {
            let url = {
                let mut params: Vec<(&str, &str)> = query.to_vec();
                if let Some(token) = page.as_deref() {
                    params.push(("page", token));
                }
                self.url(path, &params)
            };
            let (batch, next): (Vec<T>, Option<String>) = self.get(url).await?;
            items.extend(batch);
            pages += 1;

            match next {
                Some(token) => {
                    if !seen.insert(token.clone()) {
                        return Err(DirectoryError::invalid_response(format!(
                            "{} returned page token '{}' more than once",
                            path, token
                        )));
                    }
                    page = Some(token);
                }
                None => break,
            }
        }

        debug!("Listed {} {} across {} page(s)", items.len(), path, pages);
        Ok(items)
    }
}

#[async_trait]
impl IdentityDirectory for OciIdentityClient {
    fn tenancy_id(&self) -> &str {
        &self.tenancy_id
    }

    async fn get_user(&self, user_id: &str) -> DirectoryResult<User> {
        let model: UserModel = self.get_one(&format!("users/{}", user_id)).await?;
        Ok(model.into())
    }

    async fn list_user_groups(&self, user_id: &str) -> DirectoryResult<Vec<Group>> {
        let memberships: Vec<UserGroupMembershipModel> = self
            .list_all(
                "userGroupMemberships",
                &[
                    ("compartmentId", self.tenancy_id.as_str()),
                    ("userId", user_id),
                    ("limit", PAGE_LIMIT),
                ],
            )
            .await?;

        let mut seen = HashSet::new();
        let mut groups = Vec::new();
        for membership in memberships {
            if membership.user_id != user_id || !seen.insert(membership.group_id.clone()) {
                continue;
            }
            let group: GroupModel = self
                .get_one(&format!("groups/{}", membership.group_id))
                .await?;
            groups.push(group.into());
        }
        Ok(groups)
    }

    async fn list_compartments(&self) -> DirectoryResult<Vec<Compartment>> {
        let models: Vec<CompartmentModel> = self
            .list_all(
                "compartments",
                &[
                    ("compartmentId", self.tenancy_id.as_str()),
                    ("compartmentIdInSubtree", "true"),
                    ("accessLevel", "ANY"),
                    ("limit", PAGE_LIMIT),
                ],
            )
            .await?;

        let mut compartments = Vec::with_capacity(models.len() + 1);
        compartments.push(Compartment::root(self.tenancy_id.clone()));
        compartments.extend(models.into_iter().map(Compartment::from));
        Ok(compartments)
    }

    async fn get_compartment(&self, compartment_id: &str) -> DirectoryResult<Compartment> {
        if compartment_id == self.tenancy_id {
            return Ok(Compartment::root(self.tenancy_id.clone()));
        }
        let model: CompartmentModel = self
            .get_one(&format!("compartments/{}", compartment_id))
            .await?;
        Ok(model.into())
    }

    async fn list_policies(&self, compartment_id: &str) -> DirectoryResult<Vec<Policy>> {
        let models: Vec<PolicyModel> = self
            .list_all(
                "policies",
                &[("compartmentId", compartment_id), ("limit", PAGE_LIMIT)],
            )
            .await?;
        Ok(models.into_iter().map(Policy::from).collect())
    }
}
