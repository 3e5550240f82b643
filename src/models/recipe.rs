use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One ingredient line on a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
}

/// A kitchen recipe. Keyed naturally by name plus category, which is the
/// unique key the migration engine upserts by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            ingredients: Vec::new(),
        }
    }

    pub fn with_ingredient(
        mut self,
        name: impl Into<String>,
        quantity: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        self.ingredients.push(Ingredient {
            name: name.into(),
            quantity: quantity.into(),
            unit: unit.into(),
        });
        self
    }
}
