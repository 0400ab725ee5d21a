//! Normalization of raw supplier product payloads.

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    DomainError, Result,
    catalog::{
        CatalogProduct, Ladder, LadderStep, PriceLadder, ProcessingLadder, Supplier, Variant,
        WarehouseStock,
    },
    money::Money,
};

/// Reads an id the supplier may send as a number or a string.
pub fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `-1`, a missing value or anything unparsable means unbounded.
fn json_max_quantity(value: &Value) -> Option<u32> {
    json_u32(value)
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn ladder<T>(steps: &[Value], value_key: &str, parse: impl Fn(&Value) -> Option<T>) -> Ladder<T> {
    let steps = steps
        .iter()
        .filter_map(|step| {
            let value = parse(step.get(value_key)?)?;
            Some(LadderStep {
                min_quantity: step.get("min_quantity").and_then(json_u32).unwrap_or(1),
                max_quantity: step.get("max_quantity").and_then(json_max_quantity),
                value,
            })
        })
        .collect();
    Ladder::new(steps)
}

fn price_ladder(steps: &[Value]) -> PriceLadder {
    ladder(steps, "price", Money::from_json)
}

fn push_unique(images: &mut Vec<String>, image: &str) {
    if !image.is_empty() && !images.iter().any(|i| i == image) {
        images.push(image.to_string());
    }
}

struct AttributeValue {
    name: String,
    image: Option<String>,
}

impl CatalogProduct {
    /// Builds the canonical product from a raw supplier product payload.
    ///
    /// Attribute combinations are folded into variants titled by their value
    /// names (`"Red / Large"`), keyed by `attrId:valueId[;...]`.
    pub fn from_raw(raw: &Value) -> Result<CatalogProduct> {
        let id = raw
            .get("product_id")
            .and_then(json_id)
            .ok_or_else(|| DomainError::InvalidProduct {
                product_id: "unknown".to_string(),
                reason: "missing product_id".to_string(),
            })?;

        let invalid = |reason: &str| DomainError::InvalidProduct {
            product_id: id.clone(),
            reason: reason.to_string(),
        };

        let supplier = raw.get("supplier").ok_or_else(|| invalid("missing supplier"))?;
        let supplier = Supplier::new(
            supplier
                .get("company_id")
                .and_then(json_id)
                .ok_or_else(|| invalid("missing supplier company_id"))?,
            supplier
                .get("company_name")
                .and_then(Value::as_str)
                .unwrap_or_default(),
        );

        let mut images = Vec::new();
        if let Some(main) = raw.get("main_image") {
            for image in array(main, "images").iter().filter_map(Value::as_str) {
                push_unique(&mut images, image);
            }
        }

        let mut attributes: HashMap<(String, String), AttributeValue> = HashMap::new();
        for attribute in array(raw, "sku_attributes") {
            let Some(attribute_id) = attribute.get("attribute_id").and_then(json_id) else {
                continue;
            };
            for value in array(attribute, "values") {
                let Some(value_id) = value.get("id").and_then(json_id) else {
                    continue;
                };
                let image = value
                    .get("image")
                    .and_then(Value::as_str)
                    .filter(|i| !i.is_empty())
                    .map(str::to_string);
                if let Some(ref image) = image {
                    push_unique(&mut images, image);
                }
                let name = value
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| value_id.clone());
                attributes.insert((attribute_id.clone(), value_id), AttributeValue { name, image });
            }
        }

        let min_order_quantity = raw
            .get("min_order_quantity")
            .and_then(json_u32)
            .unwrap_or(1)
            .max(1);
        let mut base_ladder = price_ladder(array(raw, "ladder_price"));
        let mut base_sku_id = None;
        let mut variants: Vec<Variant> = Vec::new();

        for sku in array(raw, "skus") {
            let Some(sku_id) = sku.get("sku_id").and_then(json_id) else {
                continue;
            };

            let mut ladder = price_ladder(array(sku, "ladder_price"));
            if ladder.is_empty()
                && let Some(price) = sku.get("price").and_then(Money::from_json)
            {
                ladder = PriceLadder::new(vec![LadderStep {
                    min_quantity: min_order_quantity,
                    max_quantity: None,
                    value: price,
                }]);
            }

            let keys: Vec<&str> = array(sku, "attributes")
                .iter()
                .filter_map(Value::as_str)
                .filter(|k| !k.is_empty())
                .collect();

            if keys.is_empty() {
                // Attribute-less SKU: the product's own base SKU
                if base_sku_id.is_none() {
                    base_sku_id = Some(sku_id);
                    if base_ladder.is_empty() {
                        base_ladder = ladder;
                    }
                }
                continue;
            }

            let mut names = Vec::with_capacity(keys.len());
            let mut image = None;
            for key in keys.iter().copied() {
                let (attribute_id, value_id) = key.split_once(':').unwrap_or((key, ""));
                match attributes.get(&(attribute_id.to_string(), value_id.to_string())) {
                    Some(value) => {
                        names.push(value.name.clone());
                        if image.is_none() {
                            image = value.image.clone();
                        }
                    }
                    None => names.push(value_id.to_string()),
                }
            }

            let title = names.join(" / ");
            if variants.iter().any(|v| v.title == title) {
                continue;
            }

            let inventory_by_warehouse = array(sku, "inventory_list")
                .iter()
                .filter_map(|entry| {
                    Some(WarehouseStock {
                        warehouse: entry.get("warehouse").and_then(json_id)?,
                        quantity: entry.get("inventory").and_then(json_u32).unwrap_or(0),
                    })
                })
                .collect();

            variants.push(Variant {
                sku_id,
                title,
                sku: keys.join(";"),
                attribute_values: names,
                price: ladder,
                image: image.or_else(|| images.first().cloned()),
                inventory_by_warehouse,
            });
        }

        // Variants without their own tiers inherit the base ladder
        for variant in &mut variants {
            if variant.price.is_empty() {
                variant.price = base_ladder.clone();
            }
        }

        let processing_times: ProcessingLadder =
            ladder(array(raw, "processing_time"), "days", json_u32);

        Ok(CatalogProduct {
            title: raw
                .get("subject")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            supplier,
            is_orderable: raw
                .get("is_can_place_order")
                .and_then(json_bool)
                .unwrap_or(true),
            min_order_quantity,
            currency: raw
                .get("currency")
                .and_then(Value::as_str)
                .unwrap_or("USD")
                .to_string(),
            images,
            price_ladder: base_ladder,
            processing_times,
            base_sku_id,
            variants,
            id,
        })
    }
}
