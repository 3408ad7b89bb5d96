use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EntityId, ImageRef, Membership, Role, UserId};

/// An artwork or image eligible for curation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEntity {
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub membership: Membership,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CandidateEntity {
    pub fn new(id: impl Into<EntityId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            thumbnail: None,
            subtitle: None,
            membership: Membership::none(),
            updated_at: None,
        }
    }

    pub fn with_membership(mut self, membership: Membership) -> Self {
        self.membership = membership;
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(ImageRef::new(thumbnail));
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: limit.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u32,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

/// One entry of a commit payload: the membership an entity must have after the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub id: EntityId,
    pub membership: bool,
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSelectionRequest {
    pub changes: Vec<ChangeEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GallerySort {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    Title,
}

impl GallerySort {
    pub fn as_str(self) -> &'static str {
        match self {
            GallerySort::Newest => "newest",
            GallerySort::Oldest => "oldest",
            GallerySort::PriceAsc => "price_asc",
            GallerySort::PriceDesc => "price_desc",
            GallerySort::Title => "title",
        }
    }
}

/// Multi-facet gallery filter. Two queries are the same query iff they compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GalleryQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sort: GallerySort,
}

impl GalleryQuery {
    pub fn query_pairs(&self, page: PageRequest) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("offset", page.offset.to_string()),
            ("limit", page.limit.to_string()),
            ("sort", self.sort.as_str().to_string()),
        ];
        let search = self.search.trim();
        if !search.is_empty() {
            pairs.push(("search", search.to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        for tag in &self.tags {
            pairs.push(("tag", tag.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_id: UserId,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_without_membership_defaults_to_unselected() {
        let entity: CandidateEntity =
            serde_json::from_str(r#"{"id":"art-1","title":"Dusk"}"#).expect("decode");
        assert_eq!(entity.id, EntityId::new("art-1"));
        assert_eq!(entity.membership, Membership::none());
    }

    #[test]
    fn gallery_query_skips_blank_search() {
        let query = GalleryQuery {
            search: "   ".into(),
            category: Some("painting".into()),
            tags: vec!["oil".into(), "blue".into()],
            sort: GallerySort::PriceAsc,
        };
        let pairs = query.query_pairs(PageRequest::new(24, 12));
        assert!(pairs.iter().all(|(key, _)| *key != "search"));
        assert!(pairs.contains(&("category", "painting".to_string())));
        assert_eq!(pairs.iter().filter(|(key, _)| *key == "tag").count(), 2);
        assert!(pairs.contains(&("sort", "price_asc".to_string())));
    }

    #[test]
    fn page_request_never_has_zero_limit() {
        assert_eq!(PageRequest::new(0, 0).limit, 1);
    }
}
