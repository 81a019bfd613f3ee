//! Review record

use crate::core::field::FieldValue;
use crate::core::item::Item;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user review of a restaurant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub author: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Star rating, 0 to 5
    pub rating: f64,
    #[serde(default)]
    pub helpful: bool,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        restaurant_id: Uuid,
        author: impl Into<String>,
        title: impl Into<String>,
        rating: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            restaurant_id,
            author: author.into(),
            title: title.into(),
            body: String::new(),
            rating,
            helpful: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_helpful(mut self, helpful: bool) -> Self {
        self.helpful = helpful;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Partial update for a review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub rating: Option<f64>,
    pub helpful: Option<bool>,
}

impl ReviewPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn helpful(mut self, helpful: bool) -> Self {
        self.helpful = Some(helpful);
        self
    }
}

impl Item for Review {
    type Patch = ReviewPatch;

    fn resource_name() -> &'static str {
        "review"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn rating(&self) -> f64 {
        self.rating
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "title" => Some(self.title.clone().into()),
            "body" => Some(self.body.clone().into()),
            "author" => Some(self.author.clone().into()),
            "rating" => Some(self.rating.into()),
            "helpful" => Some(self.helpful.into()),
            "restaurant_id" => Some(self.restaurant_id.to_string().into()),
            "created_at" => Some(FieldValue::DateTime(self.created_at)),
            _ => None,
        }
    }

    fn apply_patch(&mut self, patch: &ReviewPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(body) = &patch.body {
            self.body = body.clone();
        }
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        if let Some(helpful) = patch.helpful {
            self.helpful = helpful;
        }
    }
}
