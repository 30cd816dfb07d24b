//! CSV-to-graph ingestion with relationship resolution.
//!
//! Loads a synthetic social-network dataset (users, posts, comments,
//! communities, hashtags, and their relationships) from one CSV per source
//! into the graph service:
//! - entity loads run first, in dependency order, each returning a
//!   natural-key -> uid mapping;
//! - relationship loads then resolve both endpoints against those mappings
//!   and mutate the owner node;
//! - every row is its own transaction, so partial ingestion is a normal
//!   outcome, not a corrupted state.
//!
//! Mappings are process-local and dropped when [`load_dir`] returns; nothing
//! survives a run, and nothing dedups a re-run.

use sociograph_client::GraphService;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::Instrument;

mod entities;
mod error;
mod relations;
pub mod rows;
pub mod schema;

pub use entities::{load_comments, load_communities, load_hashtags, load_posts, load_users};
pub use error::{IngestError, RowError};
pub use relations::{load_follows, load_members, load_post_hashtags, load_post_likes};

/// Natural key -> database-assigned uid, for one entity type and one run.
///
/// Populated monotonically while that entity's file loads, then read-only
/// for dependent loaders. Keys are unique within a source; a duplicate is
/// logged and the first assignment wins, so one key never maps to two nodes
/// within a run.
#[derive(Debug, Default, Clone)]
pub struct UidMap {
    inner: HashMap<String, String>,
}

impl UidMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, entity: &'static str, key: String, uid: String) {
        if let Some(existing) = self.inner.get(&key) {
            tracing::warn!(entity, key = %key, existing = %existing, "duplicate natural key; keeping first uid");
            return;
        }
        self.inner.insert(key, uid);
    }

    /// Resolve a cross-entity reference, tagging a miss as a referential
    /// integrity error rather than a data error.
    pub fn resolve(&self, entity: &'static str, key: &str) -> Result<&str, RowError> {
        self.get(key).ok_or_else(|| RowError::UnresolvedRef {
            entity,
            key: key.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Per-file row counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    /// Rows that produced a node or edge.
    pub created: usize,
    /// Rows skipped for data errors (missing/unparsable fields).
    pub skipped: usize,
    /// Rows skipped because a referenced key was absent from its mapping.
    pub unresolved: usize,
}

/// Aggregate counts for one ingestion run.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub entities: Vec<(&'static str, FileStats)>,
    /// Relationship outcomes, in load order. A failed file keeps its error
    /// here; later files were still attempted.
    pub relations: Vec<(&'static str, Result<FileStats, IngestError>)>,
}

impl LoadReport {
    pub fn entity(&self, name: &str) -> Option<&FileStats> {
        self.entities
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, s)| s)
    }

    pub fn relation(&self, name: &str) -> Option<&Result<FileStats, IngestError>> {
        self.relations
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, r)| r)
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Entities:")?;
        for (name, stats) in &self.entities {
            writeln!(
                f,
                "  {name}: {} created, {} skipped, {} unresolved",
                stats.created, stats.skipped, stats.unresolved
            )?;
        }
        writeln!(f, "Relationships:")?;
        for (name, outcome) in &self.relations {
            match outcome {
                Ok(stats) => writeln!(
                    f,
                    "  {name}: {} created, {} skipped, {} unresolved",
                    stats.created, stats.skipped, stats.unresolved
                )?,
                Err(err) => writeln!(f, "  {name}: FAILED ({err})")?,
            }
        }
        Ok(())
    }
}

/// Load every CSV in `dir` in dependency order.
///
/// Users, communities, and hashtags have no dependencies; posts need the
/// User mapping; comments need User and Post. Relationship files follow,
/// with file-granular failure isolation: one failing relationship file is
/// reported in the [`LoadReport`] and the next is still attempted. A failing
/// entity file aborts the run, since everything downstream would be skipped
/// wholesale anyway.
pub async fn load_dir<S: GraphService>(
    service: &S,
    dir: &Path,
) -> Result<LoadReport, IngestError> {
    let span = tracing::info_span!("ingest", dir = %dir.display());
    async move {
        let (users, user_stats) = load_users(service, &dir.join("users.csv")).await?;
        let (communities, community_stats) =
            load_communities(service, &dir.join("communities.csv")).await?;
        let (hashtags, hashtag_stats) = load_hashtags(service, &dir.join("hashtags.csv")).await?;
        let (posts, post_stats) = load_posts(service, &dir.join("posts.csv"), &users).await?;
        let (_comments, comment_stats) =
            load_comments(service, &dir.join("comments.csv"), &users, &posts).await?;

        let mut report = LoadReport {
            entities: vec![
                ("users", user_stats),
                ("communities", community_stats),
                ("hashtags", hashtag_stats),
                ("posts", post_stats),
                ("comments", comment_stats),
            ],
            relations: Vec::new(),
        };

        let follows = load_follows(service, &dir.join("user_follows.csv"), &users).await;
        let members = load_members(
            service,
            &dir.join("community_members.csv"),
            &communities,
            &users,
        )
        .await;
        let post_hashtags = load_post_hashtags(
            service,
            &dir.join("post_hashtags.csv"),
            &posts,
            &hashtags,
        )
        .await;
        let post_likes =
            load_post_likes(service, &dir.join("post_likes.csv"), &posts, &users).await;

        for (name, outcome) in [
            ("follows", follows),
            ("members", members),
            ("hashtags", post_hashtags),
            ("likedBy", post_likes),
        ] {
            if let Err(err) = &outcome {
                tracing::error!(relation = name, "relationship load failed: {err}");
            }
            report.relations.push((name, outcome));
        }

        tracing::info!("ingestion finished\n{report}");
        Ok(report)
    }
    .instrument(span)
    .await
}
