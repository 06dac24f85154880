//! # Recommendation Normalization
//!
//! `/data/get_recommendations/:color/:texture` has returned several payload
//! shapes over the life of the backend. This module is the only place that
//! knows about them; everything else works with [`Recommendation`].
//!
//! ## Accepted Field Names
//! - ingredients: `ingredients`, `recommended_ingredients`, `Ingredients`
//! - products: `products`, `recommended_products`, `Products`
//! - links: `links`, `product_links`, `urls`
//! - description: `description`, `summary`, `Description`, `Recommendations`
//!
//! Any of these may also sit one level down under `recommendations` or `data`.

use crate::models::{value_to_text, Item};
use serde_json::{Map, Value};

const INGREDIENT_KEYS: &[&str] = &["ingredients", "recommended_ingredients", "Ingredients"];
const PRODUCT_KEYS: &[&str] = &["products", "recommended_products", "Products"];
const LINK_KEYS: &[&str] = &["links", "product_links", "urls"];
const DESCRIPTION_KEYS: &[&str] = &["description", "summary", "Description", "Recommendations"];
const NESTED_KEYS: &[&str] = &["recommendations", "data"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recommendation {
    pub ingredients: Vec<Item>,
    pub products: Vec<Item>,
    pub links: Vec<String>,
    pub description: Option<String>,
}

impl Recommendation {
    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
            && self.products.is_empty()
            && self.links.is_empty()
            && self.description.is_none()
    }
}

/// Fold any recommendation payload into the canonical shape. Never fails.
pub fn normalize(payload: &Value) -> Recommendation {
    let Some(root) = payload.as_object() else {
        log::warn!("Recommendation payload is not an object, ignoring it");
        return Recommendation::default();
    };

    let nested: Vec<&Map<String, Value>> = NESTED_KEYS
        .iter()
        .filter_map(|key| root.get(*key).and_then(Value::as_object))
        .collect();
    let scopes: Vec<&Map<String, Value>> = std::iter::once(root).chain(nested).collect();

    Recommendation {
        ingredients: lookup(&scopes, INGREDIENT_KEYS).map(items_from).unwrap_or_default(),
        products: lookup(&scopes, PRODUCT_KEYS).map(items_from).unwrap_or_default(),
        links: lookup(&scopes, LINK_KEYS).map(links_from).unwrap_or_default(),
        description: lookup(&scopes, DESCRIPTION_KEYS).and_then(value_to_text),
    }
}

/// First non-null value under any of `keys`, searching scopes in order
fn lookup<'a>(scopes: &[&'a Map<String, Value>], keys: &[&str]) -> Option<&'a Value> {
    scopes
        .iter()
        .find_map(|scope| keys.iter().find_map(|key| scope.get(*key)))
        .filter(|v| !v.is_null())
}

fn items_from(value: &Value) -> Vec<Item> {
    match value {
        Value::Array(entries) => entries.iter().filter_map(item_from).collect(),
        // a single comma separated string
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Item::new(s, None))
            .collect(),
        other => item_from(other).into_iter().collect(),
    }
}

fn item_from(value: &Value) -> Option<Item> {
    match value {
        Value::String(name) if !name.trim().is_empty() => Some(Item::new(name.trim(), None)),
        Value::Object(map) => {
            let name = ["name", "title", "product", "ingredient"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))?;
            let description = ["description", "benefits", "details"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_string);
            Some(Item::new(name, description))
        }
        _ => None,
    }
}

fn links_from(value: &Value) -> Vec<String> {
    let link = |v: &Value| -> Option<String> {
        match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(map) => ["url", "link", "href"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_string),
            _ => None,
        }
    };
    match value {
        Value::Array(entries) => entries.iter().filter_map(link).collect(),
        other => link(other).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_shape() {
        let payload = json!({
            "ingredients": [{"name": "Niacinamide", "description": "Evens tone"}],
            "products": ["Gel Cleanser"],
            "links": ["https://shop.example/gel"],
            "description": "Oily, medium skin"
        });

        let rec = normalize(&payload);
        assert_eq!(
            rec.ingredients,
            vec![Item::new("Niacinamide", Some("Evens tone".to_string()))]
        );
        assert_eq!(rec.products, vec![Item::new("Gel Cleanser", None)]);
        assert_eq!(rec.links, vec!["https://shop.example/gel".to_string()]);
        assert_eq!(rec.description.as_deref(), Some("Oily, medium skin"));
    }

    #[test]
    fn test_alternate_field_names() {
        let payload = json!({
            "recommended_ingredients": "Ceramides, Squalane",
            "recommended_products": [{"title": "Barrier Cream", "benefits": "Hydration"}],
            "product_links": [{"url": "https://shop.example/cream"}],
            "summary": "Dry skin"
        });

        let rec = normalize(&payload);
        assert_eq!(rec.ingredients.len(), 2);
        assert_eq!(rec.ingredients[1].name, "Squalane");
        assert_eq!(rec.products[0].name, "Barrier Cream");
        assert_eq!(rec.products[0].description.as_deref(), Some("Hydration"));
        assert_eq!(rec.links, vec!["https://shop.example/cream".to_string()]);
        assert_eq!(rec.description.as_deref(), Some("Dry skin"));
    }

    #[test]
    fn test_nested_payload() {
        let payload = json!({
            "status": "ok",
            "recommendations": {
                "Ingredients": ["Retinol"],
                "Products": ["Night Serum"],
                "Description": "Normal texture"
            }
        });

        let rec = normalize(&payload);
        assert_eq!(rec.ingredients, vec![Item::new("Retinol", None)]);
        assert_eq!(rec.products, vec![Item::new("Night Serum", None)]);
        assert_eq!(rec.description.as_deref(), Some("Normal texture"));
        assert!(rec.links.is_empty());
    }

    #[test]
    fn test_top_level_wins_over_nested() {
        let payload = json!({
            "ingredients": ["Top"],
            "data": {"ingredients": ["Nested"]}
        });
        assert_eq!(normalize(&payload).ingredients[0].name, "Top");
    }

    #[test]
    fn test_garbage_payload_is_empty() {
        assert!(normalize(&json!("nope")).is_empty());
        assert!(normalize(&json!({"ingredients": null, "products": 42})).is_empty());
    }
}
