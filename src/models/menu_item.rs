use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One planned meal for one client on one date.
///
/// Menu items reference clients by name (resolved at snapshot/migration
/// time) rather than embedding client data, so client edits do not touch
/// planned menus. Only items with `approved == true` ever enter a week
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub client_name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub protein: String,
    #[serde(default)]
    pub veg: String,
    #[serde(default)]
    pub starch: String,
    #[serde(default)]
    pub extras: Vec<String>,
    #[serde(default)]
    pub portions: u32,
    #[serde(default)]
    pub approved: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl MenuItem {
    pub fn new(client_name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_name: client_name.into(),
            date,
            protein: String::new(),
            veg: String::new(),
            starch: String::new(),
            extras: Vec::new(),
            portions: 0,
            approved: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_dishes(
        mut self,
        protein: impl Into<String>,
        veg: impl Into<String>,
        starch: impl Into<String>,
    ) -> Self {
        self.protein = protein.into();
        self.veg = veg.into();
        self.starch = starch.into();
        self
    }

    pub fn with_portions(mut self, portions: u32) -> Self {
        self.portions = portions;
        self
    }

    pub fn approved(mut self) -> Self {
        self.approved = true;
        self
    }
}
