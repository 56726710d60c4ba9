use serde::{Deserialize, Serialize};

use crate::feed::PageItem;

/// A profile with its aggregate counts and the per-viewer `following_id`
/// annotation (present iff the viewer follows this profile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub owner: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_owner: Option<bool>,
    #[serde(default)]
    pub following_id: Option<i64>,
    #[serde(default)]
    pub posts_count: i64,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Profile {
    pub fn followed_by_viewer(&self) -> bool {
        self.following_id.is_some()
    }

    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.owner,
        }
    }
}

impl PageItem for Profile {
    fn item_id(&self) -> i64 {
        self.id
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A follow edge from the viewer to another profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follower {
    pub id: i64,
    #[serde(default)]
    pub owner: Option<String>,
    /// Id of the followed profile's user.
    pub followed: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Fold a successful follow into a displayed profile list: the followed
/// profile gains a follower and its `following_id`, the viewer's own profile
/// gains a following. Other profiles are untouched.
pub fn record_follow(profiles: &mut [Profile], followed_id: i64, following_id: i64) {
    for profile in profiles {
        if profile.id == followed_id {
            profile.followers_count += 1;
            profile.following_id = Some(following_id);
        } else if profile.is_owner.unwrap_or(false) {
            profile.following_count += 1;
        }
    }
}

/// Inverse of [`record_follow`].
pub fn record_unfollow(profiles: &mut [Profile], unfollowed_id: i64) {
    for profile in profiles {
        if profile.id == unfollowed_id {
            profile.followers_count -= 1;
            profile.following_id = None;
        } else if profile.is_owner.unwrap_or(false) {
            profile.following_count -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: i64, is_owner: bool) -> Profile {
        Profile {
            id,
            owner: format!("user{}", id),
            name: None,
            content: None,
            image: None,
            is_owner: Some(is_owner),
            following_id: None,
            posts_count: 0,
            followers_count: 10,
            following_count: 4,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_record_follow_updates_both_sides() {
        let mut profiles = vec![profile(1, true), profile(2, false), profile(3, false)];
        record_follow(&mut profiles, 2, 55);

        assert_eq!(profiles[0].following_count, 5);
        assert_eq!(profiles[0].followers_count, 10);

        assert_eq!(profiles[1].followers_count, 11);
        assert_eq!(profiles[1].following_id, Some(55));

        assert_eq!(profiles[2].followers_count, 10);
        assert_eq!(profiles[2].following_id, None);
    }

    #[test]
    fn test_record_unfollow_reverses_follow() {
        let mut profiles = vec![profile(1, true), profile(2, false)];
        record_follow(&mut profiles, 2, 55);
        record_unfollow(&mut profiles, 2);

        assert_eq!(profiles[0].following_count, 4);
        assert_eq!(profiles[1].followers_count, 10);
        assert!(!profiles[1].followed_by_viewer());
    }

    #[test]
    fn test_display_name_falls_back_to_owner() {
        let mut p = profile(1, false);
        assert_eq!(p.display_name(), "user1");
        p.name = Some("".to_string());
        assert_eq!(p.display_name(), "user1");
        p.name = Some("Bec T".to_string());
        assert_eq!(p.display_name(), "Bec T");
    }
}
