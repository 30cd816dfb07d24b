//! Static graph schema for the social-network dataset.
//!
//! Submitted once via `alter` before ingestion; resubmission is idempotent on
//! the server side. Index annotations drive the query templates: exact for
//! name lookups, fulltext for content search, int/float for range filters,
//! geo for locations, `@reverse` where templates traverse against the edge
//! direction (`~follows`, `~members`, `~hashtags`).

use sociograph_client::{ClientError, GraphService};

pub const SCHEMA: &str = r#"
    # Type definitions
    type User {
        username: string @index(exact) .
        email: string @index(exact) .
        bio: string @index(fulltext) .
        joinDate: datetime .
        isAdmin: bool .
        influenceScore: float @index(float) .
        location: geo @index(geo) .
        follows: [uid] @reverse .
        posts: [uid] .
        comments: [uid] .
        communities: [uid] .
    }

    type Post {
        content: string @index(fulltext) .
        timestamp: datetime .
        viewCount: int @index(int) .
        engagementScore: float @index(float) .
        author: uid .
        likedBy: [uid] .
        hashtags: [uid] @reverse .
        comments: [uid] .
    }

    type Comment {
        content: string @index(fulltext) .
        timestamp: datetime .
        sentimentScore: float @index(float) .
        replyCount: int .
        author: uid .
        post: uid .
    }

    type Community {
        name: string @index(exact) .
        category: string @index(exact) .
        memberCount: int @index(int) .
        members: [uid] @reverse .
    }

    type Hashtag {
        name: string @index(exact) .
        useCount: int @index(int) .
        trendScore: float @index(float) .
        posts: [uid] .
    }

    # Predicate definitions
    username: string @index(exact) .
    email: string @index(exact) .
    bio: string @index(fulltext) .
    joinDate: datetime .
    isAdmin: bool .
    influenceScore: float @index(float) .
    location: geo @index(geo) .
    follows: [uid] @reverse .
    posts: [uid] .
    comments: [uid] .
    communities: [uid] .
    content: string @index(fulltext) .
    timestamp: datetime .
    viewCount: int @index(int) .
    engagementScore: float @index(float) .
    author: uid .
    likedBy: [uid] .
    hashtags: [uid] @reverse .
    sentimentScore: float @index(float) .
    replyCount: int .
    post: uid .
    name: string @index(exact) .
    category: string @index(exact) .
    memberCount: int @index(int) .
    members: [uid] @reverse .
    useCount: int @index(int) .
    trendScore: float @index(float) .
"#;

/// Submit the schema to the graph service.
pub async fn apply<S: GraphService>(service: &S) -> Result<(), ClientError> {
    tracing::info!("applying social-network schema");
    service.alter(SCHEMA).await
}
