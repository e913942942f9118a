//! Case domain model
//!
//! A case is an HTTP request fixture (host, uri, method, body) with the
//! expected result and, once exercised, the observed response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::Result;
use super::{check_length, check_length_opt, check_required, check_required_opt};

pub(crate) const TITLE_MAX: usize = 255;
pub(crate) const HOST_MAX: usize = 100;
pub(crate) const URI_MAX: usize = 200;
pub(crate) const METHOD_MAX: usize = 100;
pub(crate) const CATEGORY_MAX: usize = 100;

/// A test case as stored in `cases`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub host: String,
    pub uri: String,
    pub method: Option<String>,
    pub request_body: Option<String>,
    pub expected_result: Option<String>,
    pub category: Option<String>,
    pub response_code: Option<String>,
    pub response_body: Option<String>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// `host` and `uri` joined into the request target
    pub fn url(&self) -> String {
        format!("{}{}", self.host, self.uri)
    }
}

/// Fields for a new `cases` row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCase {
    pub user_id: Uuid,
    pub title: String,
    pub host: String,
    pub uri: String,
    pub method: Option<String>,
    pub request_body: Option<String>,
    pub expected_result: Option<String>,
    pub category: Option<String>,
    pub response_code: Option<String>,
    pub response_body: Option<String>,
    pub used: Option<bool>,
}

impl NewCase {
    pub fn new(
        user_id: Uuid,
        title: impl Into<String>,
        host: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            host: host.into(),
            uri: uri.into(),
            method: None,
            request_body: None,
            expected_result: None,
            category: None,
            response_code: None,
            response_body: None,
            used: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_request_body(mut self, body: impl Into<String>) -> Self {
        self.request_body = Some(body.into());
        self
    }

    pub fn with_expected_result(mut self, expected: impl Into<String>) -> Self {
        self.expected_result = Some(expected.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_used(mut self, used: bool) -> Self {
        self.used = Some(used);
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_required("title", &self.title)?;
        check_required("host", &self.host)?;
        check_required("uri", &self.uri)?;
        check_length("title", &self.title, TITLE_MAX)?;
        check_length("host", &self.host, HOST_MAX)?;
        check_length("uri", &self.uri, URI_MAX)?;
        check_length_opt("method", self.method.as_deref(), METHOD_MAX)?;
        check_length_opt("category", self.category.as_deref(), CATEGORY_MAX)?;
        Ok(())
    }
}

/// Changes to an existing case; `None` leaves the column as it is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseUpdate {
    pub user_id: Option<Uuid>,
    pub title: Option<String>,
    pub host: Option<String>,
    pub uri: Option<String>,
    pub method: Option<String>,
    pub request_body: Option<String>,
    pub expected_result: Option<String>,
    pub category: Option<String>,
    pub response_code: Option<String>,
    pub response_body: Option<String>,
    pub used: Option<bool>,
}

impl CaseUpdate {
    /// Update recording the response observed when the case was exercised
    pub fn response(code: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            response_code: Some(code.into()),
            response_body: Some(body.into()),
            ..Default::default()
        }
    }

    pub fn user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn used(mut self, used: bool) -> Self {
        self.used = Some(used);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.title.is_none()
            && self.host.is_none()
            && self.uri.is_none()
            && self.method.is_none()
            && self.request_body.is_none()
            && self.expected_result.is_none()
            && self.category.is_none()
            && self.response_code.is_none()
            && self.response_body.is_none()
            && self.used.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        check_required_opt("title", self.title.as_deref())?;
        check_required_opt("host", self.host.as_deref())?;
        check_required_opt("uri", self.uri.as_deref())?;
        check_length_opt("title", self.title.as_deref(), TITLE_MAX)?;
        check_length_opt("host", self.host.as_deref(), HOST_MAX)?;
        check_length_opt("uri", self.uri.as_deref(), URI_MAX)?;
        check_length_opt("method", self.method.as_deref(), METHOD_MAX)?;
        check_length_opt("category", self.category.as_deref(), CATEGORY_MAX)?;
        Ok(())
    }
}
