//! Entity loading: one CSV per node type, one transaction per row.
//!
//! Every loader returns the natural-key -> uid mapping for its entity plus
//! per-file counts. Uids come back from the graph service at creation time;
//! the loaders never invent one. Entities that reference other entities at
//! creation time (Post's `author`, Comment's `author`/`post`) resolve those
//! references against already-populated mappings and skip the row when the
//! key is absent, so a dangling edge is never created.

use crate::error::{IngestError, RowError};
use crate::rows::{validate_datetime, CommentRow, CommunityRow, HashtagRow, PostRow, UserRow};
use crate::{FileStats, UidMap};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use sociograph_client::{mutate_once, ClientError, GraphService};
use std::path::Path;

/// Blank-node name used for every single-node mutation.
const BLANK: &str = "_:node";

/// Shared per-file driver: read typed rows, build one set-object per valid
/// row, create it in its own transaction, and record the assigned uid.
///
/// Row-level failures (CSV/type errors from serde, tagged [`RowError`]s from
/// `to_node`) skip the row and continue. A [`ClientError`] aborts the file:
/// the service being down is not a data problem.
async fn load_nodes<S, R, F>(
    service: &S,
    path: &Path,
    entity: &'static str,
    mut to_node: F,
) -> Result<(UidMap, FileStats), IngestError>
where
    S: GraphService,
    R: DeserializeOwned,
    F: FnMut(&R) -> Result<(String, Value), RowError>,
{
    let mut reader = csv::Reader::from_path(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut map = UidMap::default();
    let mut stats = FileStats::default();

    for (index, record) in reader.deserialize::<R>().enumerate() {
        let line = index + 2; // header is line 1
        let row = match record {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(entity, line, "skipping malformed row: {err}");
                stats.skipped += 1;
                continue;
            }
        };
        let (key, node) = match to_node(&row) {
            Ok(built) => built,
            Err(err) if err.is_unresolved() => {
                tracing::warn!(entity, line, "skipping row: {err}");
                stats.unresolved += 1;
                continue;
            }
            Err(err) => {
                tracing::warn!(entity, line, "skipping row: {err}");
                stats.skipped += 1;
                continue;
            }
        };

        let assigned =
            mutate_once(service, node)
                .await
                .map_err(|source| IngestError::Service {
                    path: path.to_path_buf(),
                    source,
                })?;
        let uid = assigned
            .single()
            .ok_or_else(|| IngestError::Service {
                path: path.to_path_buf(),
                source: ClientError::InvalidResponse(format!(
                    "mutation for {entity} {key:?} assigned no uid"
                )),
            })?
            .to_string();
        map.insert(entity, key, uid);
        stats.created += 1;
    }

    tracing::info!(
        entity,
        created = stats.created,
        skipped = stats.skipped,
        unresolved = stats.unresolved,
        "loaded {}",
        path.display()
    );
    Ok((map, stats))
}

pub async fn load_users<S: GraphService>(
    service: &S,
    path: &Path,
) -> Result<(UidMap, FileStats), IngestError> {
    load_nodes(service, path, "User", |row: &UserRow| {
        let join_date = validate_datetime("join_date", &row.join_date)?;
        let mut node = json!({
            "uid": BLANK,
            "dgraph.type": "User",
            "username": row.username,
            "email": row.email,
            "bio": row.bio,
            "joinDate": join_date,
            "isAdmin": row.is_admin(),
            "influenceScore": row.influence_score,
        });
        // A malformed location drops the attribute, not the user.
        match row.location_point() {
            Ok(Some(point)) => node["location"] = point,
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(user_id = %row.user_id, "omitting location: {err}");
            }
        }
        Ok((row.user_id.clone(), node))
    })
    .await
}

pub async fn load_communities<S: GraphService>(
    service: &S,
    path: &Path,
) -> Result<(UidMap, FileStats), IngestError> {
    load_nodes(service, path, "Community", |row: &CommunityRow| {
        Ok((
            row.community_id.clone(),
            json!({
                "uid": BLANK,
                "dgraph.type": "Community",
                "name": row.name,
                "category": row.category,
                "memberCount": row.member_count,
            }),
        ))
    })
    .await
}

pub async fn load_hashtags<S: GraphService>(
    service: &S,
    path: &Path,
) -> Result<(UidMap, FileStats), IngestError> {
    load_nodes(service, path, "Hashtag", |row: &HashtagRow| {
        Ok((
            row.hashtag_id.clone(),
            json!({
                "uid": BLANK,
                "dgraph.type": "Hashtag",
                "name": row.name,
                "useCount": row.use_count,
                "trendScore": row.trend_score,
            }),
        ))
    })
    .await
}

/// Posts reference their author at creation time, so the User mapping must
/// already be populated. An unknown `author_id` skips the post.
pub async fn load_posts<S: GraphService>(
    service: &S,
    path: &Path,
    users: &UidMap,
) -> Result<(UidMap, FileStats), IngestError> {
    load_nodes(service, path, "Post", |row: &PostRow| {
        let author = users.resolve("User", &row.author_id)?;
        let timestamp = validate_datetime("timestamp", &row.timestamp)?;
        Ok((
            row.post_id.clone(),
            json!({
                "uid": BLANK,
                "dgraph.type": "Post",
                "content": row.content,
                "timestamp": timestamp,
                "viewCount": row.view_count,
                "engagementScore": row.engagement_score,
                "author": { "uid": author },
            }),
        ))
    })
    .await
}

/// Comments reference both their author and their post.
pub async fn load_comments<S: GraphService>(
    service: &S,
    path: &Path,
    users: &UidMap,
    posts: &UidMap,
) -> Result<(UidMap, FileStats), IngestError> {
    load_nodes(service, path, "Comment", |row: &CommentRow| {
        let author = users.resolve("User", &row.author_id)?;
        let post = posts.resolve("Post", &row.post_id)?;
        let timestamp = validate_datetime("timestamp", &row.timestamp)?;
        Ok((
            row.comment_id.clone(),
            json!({
                "uid": BLANK,
                "dgraph.type": "Comment",
                "content": row.content,
                "timestamp": timestamp,
                "sentimentScore": row.sentiment_score,
                "replyCount": row.reply_count,
                "author": { "uid": author },
                "post": { "uid": post },
            }),
        ))
    })
    .await
}
