//! Purpose: Blocking HTTP client for the repair-management v2 REST API.
//! Exports: `RemoteClient`, `RepairScheduler`, `RepairInfoQuery`, `DEFAULT_BASE_URL`.
//! Role: The only component that performs network I/O against the service.
//! Invariants: Base URLs are http/https with no path; endpoints live under `/repair-management/v2`.
//! Invariants: Absent optional parameters are omitted from the query string.
//! Invariants: Every public call yields a `RemoteResult`; no retries are attempted.
#![allow(clippy::result_large_err)]

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::result::RemoteResult;
use super::types::{OnDemandRepair, RepairInfo, Schedule};
use crate::core::error::{Error, ErrorKind};

type ApiResult<T> = Result<T, Error>;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

const API_PREFIX: [&str; 2] = ["repair-management", "v2"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepairInfoQuery<'a> {
    pub keyspace: Option<&'a str>,
    pub table: Option<&'a str>,
    pub since: Option<&'a str>,
    pub duration: Option<&'a str>,
    pub local: bool,
}

/// Operations the dispatcher needs from the repair scheduler.
pub trait RepairScheduler {
    fn list_schedules(
        &self,
        keyspace: Option<&str>,
        table: Option<&str>,
    ) -> RemoteResult<Vec<Schedule>>;

    fn get_schedule(&self, id: &str, full: bool) -> RemoteResult<Schedule>;

    fn list_repairs(
        &self,
        keyspace: Option<&str>,
        table: Option<&str>,
        host_id: Option<&str>,
    ) -> RemoteResult<Vec<OnDemandRepair>>;

    fn get_repair(&self, id: &str, host_id: Option<&str>) -> RemoteResult<Vec<OnDemandRepair>>;

    fn trigger_repair(
        &self,
        keyspace: Option<&str>,
        table: Option<&str>,
        local: bool,
    ) -> RemoteResult<Vec<OnDemandRepair>>;

    fn repair_info(&self, query: &RepairInfoQuery<'_>) -> RemoteResult<RepairInfo>;
}

#[derive(Clone, Debug)]
pub struct RemoteClient {
    base_url: Url,
    agent: ureq::Agent,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self { base_url, agent })
    }

    /// Client for `base_url`, or for `DEFAULT_BASE_URL` when none was given.
    pub fn from_option(base_url: Option<&str>) -> ApiResult<Self> {
        Self::new(base_url.unwrap_or(DEFAULT_BASE_URL))
    }

    fn fetch<R>(
        &self,
        method: &str,
        segments: &[&str],
        query: &[(&str, Option<&str>)],
    ) -> RemoteResult<R>
    where
        R: DeserializeOwned,
    {
        self.request_json(method, segments, query).into()
    }

    fn request_json<R>(
        &self,
        method: &str,
        segments: &[&str],
        query: &[(&str, Option<&str>)],
    ) -> ApiResult<R>
    where
        R: DeserializeOwned,
    {
        let url = build_url(&self.base_url, segments, query)?;
        debug!(method, url = %url, "remote request");
        let response = self
            .agent
            .request(method, url.as_str())
            .set("Accept", "application/json")
            .call();

        match response {
            Ok(resp) => read_json_response(&url, resp),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::RemoteFailure)
                .with_message(format!("Unable to connect to {}", self.base_url))
                .with_source(err)),
        }
    }
}

impl RepairScheduler for RemoteClient {
    fn list_schedules(
        &self,
        keyspace: Option<&str>,
        table: Option<&str>,
    ) -> RemoteResult<Vec<Schedule>> {
        self.fetch(
            "GET",
            &["schedules"],
            &[("keyspace", keyspace), ("table", table)],
        )
    }

    fn get_schedule(&self, id: &str, full: bool) -> RemoteResult<Schedule> {
        let full = full.then_some("true");
        self.fetch("GET", &["schedules", id], &[("full", full)])
    }

    fn list_repairs(
        &self,
        keyspace: Option<&str>,
        table: Option<&str>,
        host_id: Option<&str>,
    ) -> RemoteResult<Vec<OnDemandRepair>> {
        self.fetch(
            "GET",
            &["repairs"],
            &[("keyspace", keyspace), ("table", table), ("hostId", host_id)],
        )
    }

    fn get_repair(&self, id: &str, host_id: Option<&str>) -> RemoteResult<Vec<OnDemandRepair>> {
        self.fetch("GET", &["repairs", id], &[("hostId", host_id)])
    }

    fn trigger_repair(
        &self,
        keyspace: Option<&str>,
        table: Option<&str>,
        local: bool,
    ) -> RemoteResult<Vec<OnDemandRepair>> {
        let local = if local { "true" } else { "false" };
        self.fetch(
            "POST",
            &["repairs"],
            &[
                ("keyspace", keyspace),
                ("table", table),
                ("isLocal", Some(local)),
            ],
        )
    }

    fn repair_info(&self, query: &RepairInfoQuery<'_>) -> RemoteResult<RepairInfo> {
        let local = if query.local { "true" } else { "false" };
        self.fetch(
            "GET",
            &["repairInfo"],
            &[
                ("keyspace", query.keyspace),
                ("table", query.table),
                ("since", query.since),
                ("duration", query.duration),
                ("isLocal", Some(local)),
            ],
        )
    }
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::InvalidArgument)
            .with_message(format!("invalid url '{raw}'"))
            .with_hint("Use the format http://<host>:<port>.")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("url must use http or https scheme")
            .with_hint("Use the format http://<host>:<port>."));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(Error::new(ErrorKind::InvalidArgument).with_message("url must not include a path"));
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn build_url(base_url: &Url, segments: &[&str], query: &[(&str, Option<&str>)]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::InvalidArgument).with_message("url cannot be a base")
        })?;
        path.clear();
        path.extend(API_PREFIX);
        path.extend(segments);
    }
    if query.iter().any(|(_, value)| value.is_some()) {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            if let Some(value) = value {
                pairs.append_pair(key, value);
            }
        }
    }
    Ok(url)
}

fn read_json_response<R>(url: &Url, response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::RemoteFailure)
            .with_message(format!("Unable to read response from {url}"))
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::RemoteFailure)
            .with_message(format!("Unable to decode response from {url}"))
            .with_source(err)
    })
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let reason = response.status_text().to_string();
    let body = response.into_string().unwrap_or_default();
    let detail = failure_detail(&body).unwrap_or(reason);
    let message = if detail.is_empty() {
        format!("Request failed with status {status}")
    } else {
        format!("Request failed with status {status}: {detail}")
    };
    Error::new(ErrorKind::RemoteFailure).with_message(message)
}

/// Prefers a JSON body's `message`, then `error`, then the raw body text.
fn failure_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return ["message", "error"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find(|value| !value.is_empty())
            .map(str::to_string);
    }
    Some(trimmed.to_string())
}
