//! Restaurant record

use crate::core::field::FieldValue;
use crate::core::item::Item;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A restaurant listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    /// Cuisine tags (e.g., "Seafood", "Thai")
    pub cuisine: Vec<String>,
    /// Price bracket, "$" to "$$$$"
    pub price: String,
    /// Dietary tags (e.g., "Vegan", "Gluten-free")
    #[serde(default)]
    pub dietary: Vec<String>,
    #[serde(default)]
    pub address: String,
    pub rating: f64,
    /// Distance from the user, when known
    #[serde(default)]
    pub distance_km: Option<f64>,
    /// Opening state, when known
    #[serde(default)]
    pub open_now: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl Restaurant {
    pub fn new<I, S>(name: impl Into<String>, cuisine: I, price: impl Into<String>, rating: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            cuisine: cuisine.into_iter().map(Into::into).collect(),
            price: price.into(),
            dietary: Vec::new(),
            address: String::new(),
            rating,
            distance_km: None,
            open_now: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_dietary<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dietary = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_distance_km(mut self, distance: f64) -> Self {
        self.distance_km = Some(distance);
        self
    }

    pub fn with_open_now(mut self, open: bool) -> Self {
        self.open_now = Some(open);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Partial update for a restaurant; `None` leaves a field as is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantPatch {
    pub name: Option<String>,
    pub cuisine: Option<Vec<String>>,
    pub price: Option<String>,
    pub dietary: Option<Vec<String>>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub distance_km: Option<Option<f64>>,
    pub open_now: Option<Option<bool>>,
}

impl RestaurantPatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn cuisine<I, S>(mut self, cuisine: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cuisine = Some(cuisine.into_iter().map(Into::into).collect());
        self
    }

    pub fn open_now(mut self, open: Option<bool>) -> Self {
        self.open_now = Some(open);
        self
    }
}

impl Item for Restaurant {
    type Patch = RestaurantPatch;

    fn resource_name() -> &'static str {
        "restaurant"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn rating(&self) -> f64 {
        self.rating
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "name" => Some(self.name.clone().into()),
            "cuisine" => Some(self.cuisine.clone().into()),
            "price" => Some(self.price.clone().into()),
            "dietary" => Some(self.dietary.clone().into()),
            "address" => Some(self.address.clone().into()),
            "rating" => Some(self.rating.into()),
            "distance_km" => self.distance_km.map(FieldValue::Float),
            "open_now" => self.open_now.map(FieldValue::Boolean),
            "created_at" => Some(FieldValue::DateTime(self.created_at)),
            _ => None,
        }
    }

    fn apply_patch(&mut self, patch: &RestaurantPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(cuisine) = &patch.cuisine {
            self.cuisine = cuisine.clone();
        }
        if let Some(price) = &patch.price {
            self.price = price.clone();
        }
        if let Some(dietary) = &patch.dietary {
            self.dietary = dietary.clone();
        }
        if let Some(address) = &patch.address {
            self.address = address.clone();
        }
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        if let Some(distance) = patch.distance_km {
            self.distance_km = distance;
        }
        if let Some(open) = patch.open_now {
            self.open_now = open;
        }
    }
}
