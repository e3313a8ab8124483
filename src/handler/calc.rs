//! Numeric lookup (`/calc`)
//!
//! Picks one element out of a comma-separated list. Every failure is a client
//! error: the index must be an integer inside the list and the selected
//! element must itself be an integer. Nothing is coerced to zero.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::fmt;

use crate::http::{self, query};

pub const DEFAULT_NUMS: &str = "1,2,3";
pub const DEFAULT_INDEX: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    InvalidIndex,
    IndexOutOfRange { index: i64, len: usize },
    InvalidValue,
}

impl CalcError {
    /// Short message returned to the client
    pub const fn message(&self) -> &'static str {
        match self {
            Self::InvalidIndex => "invalid index",
            Self::IndexOutOfRange { .. } => "index out of range",
            Self::InvalidValue => "invalid value at index",
        }
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for {len} element(s)")
            }
            other => f.write_str(other.message()),
        }
    }
}

impl std::error::Error for CalcError {}

#[derive(Serialize)]
struct CalcValue {
    value: i64,
}

/// Select `nums[index]`
pub fn select(nums: &str, index: &str) -> Result<i64, CalcError> {
    let index: i64 = index.trim().parse().map_err(|_| CalcError::InvalidIndex)?;
    let parts: Vec<&str> = nums.split(',').collect();

    let selected = usize::try_from(index)
        .ok()
        .and_then(|i| parts.get(i))
        .ok_or(CalcError::IndexOutOfRange {
            index,
            len: parts.len(),
        })?;

    selected.trim().parse().map_err(|_| CalcError::InvalidValue)
}

pub fn handle_calc(raw_query: Option<&str>) -> Response<Full<Bytes>> {
    let nums = query::param_or(raw_query, "nums", DEFAULT_NUMS);
    let index = query::param_or(raw_query, "index", DEFAULT_INDEX);

    match select(&nums, &index) {
        Ok(value) => http::build_json_response(StatusCode::OK, &CalcValue { value }),
        Err(e) => {
            crate::logger::log_warning(&format!("/calc rejected: {e}"));
            http::build_error_response(StatusCode::BAD_REQUEST, e.message())
        }
    }
}
