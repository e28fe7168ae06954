//! Keyword tool response decoding and normalization
//!
//! The API reports monthly counts either as JSON numbers or as strings:
//! `"< 10"` for low-volume terms and, on some accounts, digit strings with
//! thousands separators. Everything is normalized to `u64` here.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::models::KeywordVolume;
use crate::utils::error::FetchError;
use crate::utils::{keyword_eq, keyword_key};

/// Sentinel the API uses for "fewer than 10 searches"
pub const LOW_VOLUME_SENTINEL: &str = "< 10";

/// Maximum number of related terms taken from one response
pub const MAX_RELATED_TERMS: usize = 10;

/// Raw `GET /keywordstool` response body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordToolResponse {
    #[serde(default)]
    pub keyword_list: Option<Vec<KeywordItem>>,
}

/// One entry of `keywordList`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordItem {
    #[serde(default, rename = "relKeyword")]
    pub rel_keyword: Option<String>,

    #[serde(default, rename = "monthlyPcQcCnt")]
    pub monthly_pc: Option<Value>,

    #[serde(default, rename = "monthlyMobileQcCnt")]
    pub monthly_mobile: Option<Value>,
}

/// Normalize one count field
///
/// - missing or `null` → 0
/// - `"< 10"` → 0
/// - digit string, optionally with `,` separators → its value
/// - non-negative JSON number → its integer part
///
/// Anything else is a malformed response.
pub fn parse_count(value: Option<&Value>) -> Result<u64, FetchError> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                Ok(v)
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f >= 0.0 => Ok(f.trunc() as u64),
                    _ => Err(FetchError::Malformed(format!("invalid count: {n}"))),
                }
            }
        }
        Some(Value::String(s)) => parse_count_str(s),
        Some(other) => Err(FetchError::Malformed(format!("invalid count: {other}"))),
    }
}

fn parse_count_str(raw: &str) -> Result<u64, FetchError> {
    static COUNT_RE: OnceLock<Regex> = OnceLock::new();

    let trimmed = raw.trim();
    if trimmed.starts_with('<') {
        // "< 10", "<10"
        return Ok(0);
    }

    // Plain digits, or digits grouped in threes by commas
    let re = COUNT_RE.get_or_init(|| {
        Regex::new(r"^(?:[0-9]+|[0-9]{1,3}(?:,[0-9]{3})+)$").expect("Invalid regex pattern")
    });
    if !re.is_match(trimmed) {
        return Err(FetchError::Malformed(format!("invalid count: {raw:?}")));
    }

    trimmed
        .replace(',', "")
        .parse()
        .map_err(|_| FetchError::Malformed(format!("count out of range: {raw:?}")))
}

/// Decoded volume for the queried keyword plus its related terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub volume: KeywordVolume,
    pub related_terms: Vec<String>,
}

/// Turn a response into the queried keyword's volume and related terms
///
/// The volume comes from the entry whose `relKeyword` matches the query
/// (case and spaces ignored), or the first entry if none does. Related
/// terms are the distinct labels other than the query, in response order,
/// capped at [`MAX_RELATED_TERMS`].
pub fn normalize(keyword: &str, response: KeywordToolResponse) -> Result<Normalized, FetchError> {
    let items = match response.keyword_list {
        Some(items) if !items.is_empty() => items,
        _ => return Err(FetchError::EmptyResult),
    };

    let primary = items
        .iter()
        .find(|item| {
            item.rel_keyword
                .as_deref()
                .is_some_and(|rel| keyword_eq(rel, keyword))
        })
        .unwrap_or(&items[0]);

    let pc = parse_count(primary.monthly_pc.as_ref())?;
    let mobile = parse_count(primary.monthly_mobile.as_ref())?;

    let mut seen = HashSet::new();
    seen.insert(keyword_key(keyword));

    let related_terms = items
        .iter()
        .filter_map(|item| item.rel_keyword.as_deref())
        .map(str::trim)
        .filter(|rel| !rel.is_empty() && seen.insert(keyword_key(rel)))
        .take(MAX_RELATED_TERMS)
        .map(str::to_string)
        .collect();

    Ok(Normalized {
        volume: KeywordVolume::new(keyword, pc, mobile),
        related_terms,
    })
}
