//! Relationship loading: edges between already-created nodes.
//!
//! An edge is a mutation on the owner node (`{"uid": owner, "<pred>":
//! [{"uid": target}]}`), so no new identifier is produced. Both endpoint
//! keys must resolve in their mappings; a miss skips the row and is logged
//! as expected fallout from upstream skips, never as a file failure.
//!
//! Known limitation: nothing detects duplicate edges. Re-running a
//! relationship load against an already-populated graph adds the same edges
//! again.

use crate::error::{IngestError, RowError};
use crate::rows::{FollowRow, MemberRow, PostHashtagRow, PostLikeRow};
use crate::{FileStats, UidMap};
use serde::de::DeserializeOwned;
use serde_json::json;
use sociograph_client::{mutate_once, GraphService};
use std::path::Path;

/// Shared per-file driver for edge sources. `resolve` maps a typed row to
/// the (owner uid, target uid) pair or a tagged row error.
async fn load_edges<S, R, F>(
    service: &S,
    path: &Path,
    predicate: &'static str,
    mut resolve: F,
) -> Result<FileStats, IngestError>
where
    S: GraphService,
    R: DeserializeOwned,
    F: FnMut(&R) -> Result<(String, String), RowError>,
{
    let mut reader = csv::Reader::from_path(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut stats = FileStats::default();

    for (index, record) in reader.deserialize::<R>().enumerate() {
        let line = index + 2;
        let row = match record {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(predicate, line, "skipping malformed row: {err}");
                stats.skipped += 1;
                continue;
            }
        };
        let (owner, target) = match resolve(&row) {
            Ok(pair) => pair,
            Err(err) if err.is_unresolved() => {
                tracing::warn!(predicate, line, "skipping edge: {err}");
                stats.unresolved += 1;
                continue;
            }
            Err(err) => {
                tracing::warn!(predicate, line, "skipping edge: {err}");
                stats.skipped += 1;
                continue;
            }
        };

        let edge = json!({
            "uid": owner,
            predicate: [{ "uid": target }],
        });
        mutate_once(service, edge)
            .await
            .map_err(|source| IngestError::Service {
                path: path.to_path_buf(),
                source,
            })?;
        stats.created += 1;
    }

    tracing::info!(
        predicate,
        created = stats.created,
        skipped = stats.skipped,
        unresolved = stats.unresolved,
        "loaded {}",
        path.display()
    );
    Ok(stats)
}

/// `follows` edges: follower User -> followed User.
pub async fn load_follows<S: GraphService>(
    service: &S,
    path: &Path,
    users: &UidMap,
) -> Result<FileStats, IngestError> {
    load_edges(service, path, "follows", |row: &FollowRow| {
        let follower = users.resolve("User", &row.follower_id)?;
        let followed = users.resolve("User", &row.followed_id)?;
        Ok((follower.to_string(), followed.to_string()))
    })
    .await
}

/// `members` edges: Community -> member User.
pub async fn load_members<S: GraphService>(
    service: &S,
    path: &Path,
    communities: &UidMap,
    users: &UidMap,
) -> Result<FileStats, IngestError> {
    load_edges(service, path, "members", |row: &MemberRow| {
        let community = communities.resolve("Community", &row.community_id)?;
        let user = users.resolve("User", &row.user_id)?;
        Ok((community.to_string(), user.to_string()))
    })
    .await
}

/// `hashtags` edges: Post -> Hashtag.
pub async fn load_post_hashtags<S: GraphService>(
    service: &S,
    path: &Path,
    posts: &UidMap,
    hashtags: &UidMap,
) -> Result<FileStats, IngestError> {
    load_edges(service, path, "hashtags", |row: &PostHashtagRow| {
        let post = posts.resolve("Post", &row.post_id)?;
        let hashtag = hashtags.resolve("Hashtag", &row.hashtag_id)?;
        Ok((post.to_string(), hashtag.to_string()))
    })
    .await
}

/// `likedBy` edges: Post -> liking User.
pub async fn load_post_likes<S: GraphService>(
    service: &S,
    path: &Path,
    posts: &UidMap,
    users: &UidMap,
) -> Result<FileStats, IngestError> {
    load_edges(service, path, "likedBy", |row: &PostLikeRow| {
        let post = posts.resolve("Post", &row.post_id)?;
        let user = users.resolve("User", &row.user_id)?;
        Ok((post.to_string(), user.to_string()))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sociograph_client::mock::MockGraph;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn users() -> UidMap {
        let mut map = UidMap::default();
        map.insert("User", "u1".into(), "0x10".into());
        map.insert("User", "u2".into(), "0x11".into());
        map
    }

    #[tokio::test]
    async fn resolved_follow_emits_one_edge_with_the_resolved_uids() {
        let graph = MockGraph::new();
        let file = csv_file("follower_id,followed_id\nu1,u2\n");
        let stats = load_follows(&graph, file.path(), &users()).await.unwrap();

        assert_eq!(stats.created, 1);
        let edges = graph.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0]["uid"], "0x10");
        assert_eq!(edges[0]["follows"][0]["uid"], "0x11");
    }

    #[tokio::test]
    async fn missing_endpoint_skips_the_row_without_aborting_the_file() {
        let graph = MockGraph::new();
        let file = csv_file("follower_id,followed_id\nu1,u404\nu2,u1\n");
        let stats = load_follows(&graph, file.path(), &users()).await.unwrap();

        assert_eq!(stats.created, 1);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.skipped, 0);
        assert_eq!(graph.edges().len(), 1);
    }

    #[tokio::test]
    async fn member_edges_are_owned_by_the_community() {
        let graph = MockGraph::new();
        let mut communities = UidMap::default();
        communities.insert("Community", "c1".into(), "0x20".into());
        let file = csv_file("community_id,user_id\nc1,u1\n");
        let stats = load_members(&graph, file.path(), &communities, &users())
            .await
            .unwrap();

        assert_eq!(stats.created, 1);
        let edges = graph.edges();
        assert_eq!(edges[0]["uid"], "0x20");
        assert_eq!(edges[0]["members"][0]["uid"], "0x10");
    }

    #[tokio::test]
    async fn like_edges_use_the_liked_by_predicate() {
        let graph = MockGraph::new();
        let mut posts = UidMap::default();
        posts.insert("Post", "p1".into(), "0x30".into());
        let file = csv_file("post_id,user_id\np1,u2\n");
        load_post_likes(&graph, file.path(), &posts, &users())
            .await
            .unwrap();

        let edges = graph.edges();
        assert_eq!(edges[0]["uid"], "0x30");
        assert_eq!(edges[0]["likedBy"][0]["uid"], "0x11");
    }

    #[tokio::test]
    async fn rerunning_a_relationship_load_duplicates_edges() {
        // Documented limitation: no dedup, by design.
        let graph = MockGraph::new();
        let file = csv_file("follower_id,followed_id\nu1,u2\n");
        load_follows(&graph, file.path(), &users()).await.unwrap();
        load_follows(&graph, file.path(), &users()).await.unwrap();
        assert_eq!(graph.edges().len(), 2);
    }
}
