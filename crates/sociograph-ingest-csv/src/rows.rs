//! Typed row schemas, one per source file.
//!
//! Each CSV is deserialized into its row struct by `csv` + serde, so a row
//! with a missing column or an unparsable numeric field fails once, at read
//! time, and is skipped without touching the graph. Field-level validation
//! that serde cannot express (datetimes, the `"lat,lon"` geo string) lives
//! here as helpers returning tagged [`RowError`]s.

use crate::error::RowError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct UserRow {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub join_date: String,
    pub is_admin: String,
    pub influence_score: f64,
    #[serde(default)]
    pub location: Option<String>,
}

impl UserRow {
    /// The source encodes booleans as free-case `true`/`false` strings.
    pub fn is_admin(&self) -> bool {
        self.is_admin.trim().eq_ignore_ascii_case("true")
    }

    /// Parse the optional `"lat,lon"` column into a geo point attribute.
    ///
    /// A malformed value is an error for the *field*, not the row: callers
    /// log it and create the user without a location.
    pub fn location_point(&self) -> Result<Option<Value>, RowError> {
        let raw = match self.location.as_deref().map(str::trim) {
            None | Some("") => return Ok(None),
            Some(raw) => raw,
        };
        let mut parts = raw.split(',').map(|p| p.trim().parse::<f64>());
        match (parts.next(), parts.next(), parts.next()) {
            (Some(Ok(lat)), Some(Ok(lon)), None) => Ok(Some(json!({
                "type": "Point",
                "coordinates": [lon, lat],
            }))),
            _ => Err(RowError::invalid(
                "location",
                format!("expected \"lat,lon\", got {raw:?}"),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PostRow {
    pub post_id: String,
    pub content: String,
    pub timestamp: String,
    pub view_count: i64,
    pub engagement_score: f64,
    pub author_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRow {
    pub comment_id: String,
    pub content: String,
    pub timestamp: String,
    pub sentiment_score: f64,
    pub reply_count: i64,
    pub author_id: String,
    pub post_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CommunityRow {
    pub community_id: String,
    pub name: String,
    pub category: String,
    pub member_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct HashtagRow {
    pub hashtag_id: String,
    pub name: String,
    pub use_count: i64,
    pub trend_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct FollowRow {
    pub follower_id: String,
    pub followed_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MemberRow {
    pub community_id: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PostHashtagRow {
    pub post_id: String,
    pub hashtag_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PostLikeRow {
    pub post_id: String,
    pub user_id: String,
}

/// Validate a required datetime column, normalizing to RFC 3339.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DD HH:MM:SS`, and bare dates; the
/// graph service stores datetimes and would reject anything else at commit
/// time, so we fail the row here instead.
pub(crate) fn validate_datetime(column: &'static str, raw: &str) -> Result<String, RowError> {
    let raw = raw.trim();
    if DateTime::parse_from_rfc3339(raw).is_ok() {
        return Ok(raw.to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(format!("{}Z", dt.format("%Y-%m-%dT%H:%M:%S")));
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(format!("{d}T00:00:00Z"));
    }
    Err(RowError::invalid(
        column,
        format!("not a datetime: {raw:?}"),
    ))
}
