//! Reading the outcome of an OAuth round trip from the landing URL

use reqwest::Url;
use serde::{Deserialize, Serialize};

const PROVIDER_PARAM: &str = "provider";
const STATUS_PARAM: &str = "status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectStatus {
    Success,
    Error,
}

/// Result of one connect attempt as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackOutcome {
    pub provider: String,
    pub status: ConnectStatus,
}

/// The outcome carried by `url`, if it carries one
pub fn read_outcome(url: &Url) -> Option<CallbackOutcome> {
    let mut provider = None;
    let mut status = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            PROVIDER_PARAM if !value.is_empty() => provider = Some(value.into_owned()),
            STATUS_PARAM => status = Some(value.into_owned()),
            _ => {}
        }
    }

    let status = match status?.as_str() {
        "success" => ConnectStatus::Success,
        _ => ConnectStatus::Error,
    };

    Some(CallbackOutcome {
        provider: provider?,
        status,
    })
}

/// `url` without the outcome parameters, other parameters untouched
pub fn strip_outcome(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != PROVIDER_PARAM && key != STATUS_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }
    stripped
}
