//! Canned analytical query templates.
//!
//! Each template is a fixed parameterized read-only traversal: typed
//! parameters are bound as string variables, the query runs in one read-only
//! transaction, and the result tree deserializes into typed structs
//! mirroring the traversal shape. Pagination uses `first`/`offset`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sociograph_client::{query_once, ClientError, GraphService};
use std::collections::HashMap;

fn vars<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Pull one named block out of the result tree as a typed vector. Absent
/// blocks deserialize as empty, which is how the service reports "no match".
fn block<T: serde::de::DeserializeOwned>(data: &Value, name: &str) -> Result<Vec<T>, ClientError> {
    match data.get(name) {
        None => Ok(Vec::new()),
        Some(items) => serde_json::from_value(items.clone())
            .map_err(|err| ClientError::InvalidResponse(format!("bad {name} block: {err}"))),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,
    pub content: String,
    #[serde(rename = "viewCount", default)]
    pub view_count: i64,
    #[serde(rename = "engagementScore", default)]
    pub engagement_score: f64,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InfluentialUser {
    pub uid: String,
    pub username: String,
    #[serde(rename = "influenceScore")]
    pub influence_score: f64,
    /// GeoJSON point, when the user was ingested with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(rename = "popularPosts", default)]
    pub popular_posts: Vec<PostSummary>,
    #[serde(rename = "postCount", default)]
    pub post_count: u64,
}

/// Users above an influence-score threshold, with their popular posts
/// (more than 100 views) and total post count.
pub async fn influential_users<S: GraphService>(
    service: &S,
    min_influence: f64,
) -> Result<Vec<InfluentialUser>, ClientError> {
    const QUERY: &str = r#"
    query influence($min_influence: float) {
        influentialUsers(func: gt(influenceScore, $min_influence)) {
            uid
            username
            influenceScore
            location
            popularPosts: posts @filter(gt(viewCount, 100)) {
                uid
                content
                viewCount
                engagementScore
                timestamp
            }
            postCount: count(posts)
        }
    }
    "#;
    let data = query_once(
        service,
        QUERY,
        &vars([("$min_influence", min_influence.to_string())]),
    )
    .await?;
    block(&data, "influentialUsers")
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RelatedPost {
    pub uid: String,
    pub content: String,
    #[serde(rename = "engagementScore", default)]
    pub engagement_score: f64,
    #[serde(default)]
    pub author: Option<UserSummary>,
    #[serde(rename = "likeCount", default)]
    pub like_count: u64,
    #[serde(rename = "commentCount", default)]
    pub comment_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    #[serde(rename = "influenceScore", default)]
    pub influence_score: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrendingHashtag {
    pub uid: String,
    pub name: String,
    #[serde(rename = "trendScore")]
    pub trend_score: f64,
    #[serde(rename = "useCount", default)]
    pub use_count: i64,
    #[serde(rename = "relatedPosts", default)]
    pub related_posts: Vec<RelatedPost>,
}

/// Hashtags above a trend-score threshold with related high-engagement
/// posts, via the reverse `~hashtags` traversal.
pub async fn trending_hashtags<S: GraphService>(
    service: &S,
    min_trend_score: f64,
    hashtag_limit: usize,
    post_limit: usize,
) -> Result<Vec<TrendingHashtag>, ClientError> {
    const QUERY: &str = r#"
    query trending($min_trend_score: float, $hashtag_limit: int, $post_limit: int) {
        trendingHashtags(func: gt(trendScore, $min_trend_score), first: $hashtag_limit) {
            uid
            name
            trendScore
            useCount
            relatedPosts: ~hashtags @filter(gt(engagementScore, 0.8)) (first: $post_limit) {
                uid
                content
                engagementScore
                author {
                    username
                    influenceScore
                }
                likeCount: count(likedBy)
                commentCount: count(comments)
            }
        }
    }
    "#;
    let data = query_once(
        service,
        QUERY,
        &vars([
            ("$min_trend_score", min_trend_score.to_string()),
            ("$hashtag_limit", hashtag_limit.to_string()),
            ("$post_limit", post_limit.to_string()),
        ]),
    )
    .await?;
    block(&data, "trendingHashtags")
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommunityPage {
    pub name: String,
    #[serde(rename = "memberCount", default)]
    pub member_count: i64,
    #[serde(default)]
    pub members: Vec<UserSummary>,
}

/// Members of a community by exact name, paginated.
pub async fn community_members<S: GraphService>(
    service: &S,
    community_name: &str,
    first: usize,
    offset: usize,
) -> Result<Vec<CommunityPage>, ClientError> {
    const QUERY: &str = r#"
    query members($name: string, $first: string, $offset: string) {
        community(func: eq(name, $name)) {
            name
            memberCount
            members(first: $first, offset: $offset) {
                username
                influenceScore
            }
        }
    }
    "#;
    let data = query_once(
        service,
        QUERY,
        &vars([
            ("$name", community_name.to_string()),
            ("$first", first.to_string()),
            ("$offset", offset.to_string()),
        ]),
    )
    .await?;
    block(&data, "community")
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Follower {
    pub uid: String,
    pub username: String,
    #[serde(rename = "influenceScore", default)]
    pub influence_score: f64,
    #[serde(rename = "postCount", default)]
    pub post_count: u64,
    #[serde(rename = "commentCount", default)]
    pub comment_count: u64,
    #[serde(rename = "followersCount", default)]
    pub followers_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NetworkUser {
    pub uid: String,
    pub username: String,
    #[serde(rename = "influenceScore")]
    pub influence_score: f64,
    #[serde(default)]
    pub followers: Vec<Follower>,
    #[serde(rename = "followerCount", default)]
    pub follower_count: u64,
    #[serde(rename = "followingCount", default)]
    pub following_count: u64,
}

/// Follower/following network of high-influence users, with aggregate
/// counts over the reverse `~follows` edge.
pub async fn user_network<S: GraphService>(
    service: &S,
    min_influence: f64,
) -> Result<Vec<NetworkUser>, ClientError> {
    const QUERY: &str = r#"
    query network($min_influence: float) {
        activeUsers(func: gt(influenceScore, $min_influence)) {
            uid
            username
            influenceScore
            followers: ~follows {
                uid
                username
                influenceScore
                postCount: count(posts)
                commentCount: count(comments)
                followersCount: count(~follows)
            }
            followerCount: count(~follows)
            followingCount: count(follows)
        }
    }
    "#;
    let data = query_once(
        service,
        QUERY,
        &vars([("$min_influence", min_influence.to_string())]),
    )
    .await?;
    block(&data, "activeUsers")
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentHit {
    pub uid: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub author: Option<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub posts: Vec<ContentHit>,
    pub comments: Vec<ContentHit>,
}

/// Full-text search over post and comment content.
pub async fn search_content<S: GraphService>(
    service: &S,
    text: &str,
) -> Result<SearchResults, ClientError> {
    const QUERY: &str = r#"
    query search($text: string) {
        posts(func: type(Post)) @filter(anyoftext(content, $text)) {
            uid
            content
            timestamp
            author {
                username
                influenceScore
            }
        }
        comments(func: type(Comment)) @filter(anyoftext(content, $text)) {
            uid
            content
            timestamp
            author {
                username
                influenceScore
            }
        }
    }
    "#;
    let data = query_once(service, QUERY, &vars([("$text", text.to_string())])).await?;
    Ok(SearchResults {
        posts: block(&data, "posts")?,
        comments: block(&data, "comments")?,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserPosts {
    pub username: String,
    #[serde(default)]
    pub posts: Vec<PostSummary>,
}

/// Every post by a user, looked up by exact username.
pub async fn posts_by_user<S: GraphService>(
    service: &S,
    username: &str,
) -> Result<Vec<UserPosts>, ClientError> {
    const QUERY: &str = r#"
    query userPosts($username: string) {
        users(func: eq(username, $username)) {
            username
            posts {
                uid
                content
                viewCount
                engagementScore
                timestamp
            }
        }
    }
    "#;
    let data = query_once(service, QUERY, &vars([("$username", username.to_string())])).await?;
    block(&data, "users")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sociograph_client::mock::MockGraph;
    use sociograph_client::mutate_once;

    async fn seed_user(graph: &MockGraph, username: &str, influence: f64) {
        mutate_once(
            graph,
            json!({
                "uid": "_:node",
                "dgraph.type": "User",
                "username": username,
                "influenceScore": influence,
            }),
        )
        .await
        .unwrap();
    }

    /// Responder that evaluates the influential-users template against the
    /// mock's committed nodes: filter by the bound threshold variable.
    fn influence_responder(graph: MockGraph) -> impl Fn(&str, &HashMap<String, String>) -> Value {
        move |_query, vars| {
            let min: f64 = vars["$min_influence"].parse().unwrap();
            let matching: Vec<Value> = graph
                .nodes()
                .into_iter()
                .filter(|n| n["dgraph.type"] == "User")
                .filter(|n| n["influenceScore"].as_f64().unwrap_or(0.0) > min)
                .collect();
            json!({ "influentialUsers": matching })
        }
    }

    #[tokio::test]
    async fn influential_users_includes_a_user_above_the_threshold() {
        let graph = MockGraph::new();
        seed_user(&graph, "ada", 9.0).await;
        graph.set_responder(influence_responder(graph.clone()));

        let found = influential_users(&graph, 8.0).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "ada");
        assert_eq!(found[0].influence_score, 9.0);
    }

    #[tokio::test]
    async fn influential_users_surface_their_location() {
        let graph = MockGraph::new();
        mutate_once(
            &graph,
            json!({
                "uid": "_:node",
                "dgraph.type": "User",
                "username": "ada",
                "influenceScore": 9.0,
                "location": { "type": "Point", "coordinates": [-74.0060, 40.7128] },
            }),
        )
        .await
        .unwrap();
        seed_user(&graph, "bob", 8.5).await;
        graph.set_responder(influence_responder(graph.clone()));

        let found = influential_users(&graph, 8.0).await.unwrap();
        let ada = found.iter().find(|u| u.username == "ada").unwrap();
        assert_eq!(
            ada.location.as_ref().unwrap()["coordinates"],
            json!([-74.0060, 40.7128])
        );
        let bob = found.iter().find(|u| u.username == "bob").unwrap();
        assert!(bob.location.is_none());
    }

    #[tokio::test]
    async fn influential_users_excludes_a_user_below_the_threshold() {
        let graph = MockGraph::new();
        seed_user(&graph, "ada", 9.0).await;
        graph.set_responder(influence_responder(graph.clone()));

        let found = influential_users(&graph, 9.5).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn community_members_binds_pagination_as_string_variables() {
        let graph = MockGraph::new();
        community_members(&graph, "Tech Innovators", 10, 20)
            .await
            .unwrap();

        let (query, vars) = graph.queries().pop().unwrap();
        assert!(query.contains("first: $first, offset: $offset"));
        assert_eq!(vars["$name"], "Tech Innovators");
        assert_eq!(vars["$first"], "10");
        assert_eq!(vars["$offset"], "20");
    }

    #[tokio::test]
    async fn trending_hashtags_parses_the_nested_result_tree() {
        let graph = MockGraph::new();
        graph.set_responder(|_, _| {
            json!({
                "trendingHashtags": [{
                    "uid": "0x1",
                    "name": "#rust",
                    "trendScore": 8.8,
                    "useCount": 42,
                    "relatedPosts": [{
                        "uid": "0x2",
                        "content": "hello graphs",
                        "engagementScore": 0.9,
                        "author": { "username": "ada", "influenceScore": 9.0 },
                        "likeCount": 3,
                        "commentCount": 1
                    }]
                }]
            })
        });

        let trending = trending_hashtags(&graph, 7.5, 5, 3).await.unwrap();
        assert_eq!(trending.len(), 1);
        assert_eq!(trending[0].related_posts.len(), 1);
        assert_eq!(
            trending[0].related_posts[0].author.as_ref().unwrap().username,
            "ada"
        );
    }

    #[tokio::test]
    async fn an_absent_block_is_an_empty_result_not_an_error() {
        let graph = MockGraph::new();
        let found = influential_users(&graph, 8.0).await.unwrap();
        assert!(found.is_empty());
        let results = search_content(&graph, "graphs").await.unwrap();
        assert!(results.posts.is_empty() && results.comments.is_empty());
    }
}
