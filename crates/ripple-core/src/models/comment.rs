use serde::{Deserialize, Serialize};

use crate::feed::PageItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub owner: String,
    #[serde(default)]
    pub is_owner: Option<bool>,
    pub profile_id: i64,
    #[serde(default)]
    pub profile_image: Option<String>,
    /// Id of the post this comment belongs to.
    pub post: i64,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl PageItem for Comment {
    fn item_id(&self) -> i64 {
        self.id
    }
}

/// Body for creating a comment on a post.
#[derive(Debug, Clone, Serialize)]
pub struct CommentDraft {
    pub post: i64,
    pub content: String,
}
