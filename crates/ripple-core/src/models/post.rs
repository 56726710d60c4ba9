use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::feed::PageItem;

/// A post as the list/detail endpoints return it, including the per-viewer
/// annotations (`is_owner`, `like_id`) the API folds in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub owner: String,
    #[serde(default)]
    pub is_owner: Option<bool>,
    pub profile_id: i64,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub likes_count: i64,
    /// The viewer's like of this post, if any. Present iff the viewer has
    /// liked it; its value is the id to delete to unlike.
    #[serde(default)]
    pub like_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Post {
    pub fn liked_by_viewer(&self) -> bool {
        self.like_id.is_some()
    }

    /// Fold a successful like into local state.
    pub fn record_like(&mut self, like_id: i64) {
        self.likes_count += 1;
        self.like_id = Some(like_id);
    }

    /// Fold a successful unlike into local state.
    pub fn record_unlike(&mut self) {
        self.likes_count -= 1;
        self.like_id = None;
    }

    pub fn record_comment_added(&mut self) {
        self.comments_count += 1;
    }

    pub fn record_comment_removed(&mut self) {
        self.comments_count -= 1;
    }
}

impl PageItem for Post {
    fn item_id(&self) -> i64 {
        self.id
    }
}

/// Body for creating or replacing a post.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A like, owned by the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: i64,
    #[serde(default)]
    pub owner: Option<String>,
    pub post: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Server-side filters for the post list endpoint.
///
/// The filter names mirror the API's relational query params: the feed view
/// is "posts whose owner is followed by profile N", the liked view is
/// "posts liked by profile N" ordered by like recency.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub search: Option<String>,
    pub owner_profile: Option<i64>,
    pub followed_by: Option<i64>,
    pub liked_by: Option<i64>,
}

impl PostQuery {
    pub fn all() -> Self {
        Self::default()
    }

    /// Posts authored by one profile.
    pub fn by_owner(profile_id: i64) -> Self {
        Self {
            owner_profile: Some(profile_id),
            ..Self::default()
        }
    }

    /// Posts from profiles the given profile follows.
    pub fn feed_of(profile_id: i64) -> Self {
        Self {
            followed_by: Some(profile_id),
            ..Self::default()
        }
    }

    /// Posts the given profile has liked.
    pub fn liked_by(profile_id: i64) -> Self {
        Self {
            liked_by: Some(profile_id),
            ..Self::default()
        }
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub(crate) fn apply(&self, url: &mut Url) {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(ref term) = self.search {
            pairs.push(("search", term.clone()));
        }
        if let Some(profile_id) = self.owner_profile {
            pairs.push(("owner__profile", profile_id.to_string()));
        }
        if let Some(profile_id) = self.followed_by {
            pairs.push(("owner__followed__owner__profile", profile_id.to_string()));
        }
        if let Some(profile_id) = self.liked_by {
            pairs.push(("likes__owner__profile", profile_id.to_string()));
            pairs.push(("ordering", "-likes__created_at".to_string()));
        }
        // An unfiltered query leaves the URL untouched rather than gaining
        // an empty "?".
        if pairs.is_empty() {
            return;
        }
        let mut query = url.query_pairs_mut();
        for (name, value) in pairs {
            query.append_pair(name, &value);
        }
    }
}
