use log::debug;
use serde_json::Value;

use crate::card::{SourceRecord, StoredRecord};

/// Stock strings the catalog shows instead of a real value.
pub const PLACEHOLDERS: &[&str] = &["View on RochesterCCG"];

/// Default type given to cards whose type could not be scraped.
const PLACEHOLDER_TYPE: &str = "Card";

/// Whether a stored value counts as missing for merge purposes.
pub fn is_placeholder(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => {
            let s = s.trim();
            s.is_empty() || PLACEHOLDERS.contains(&s)
        }
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// A scraped value worth writing: present, non-empty and not a placeholder.
pub fn usable(value: Option<&str>) -> Option<&str> {
    let value = value?.trim();
    (!value.is_empty() && !PLACEHOLDERS.contains(&value)).then_some(value)
}

/// Fill the absent or placeholder fields of `stored` from `source`. Present
/// values are never overwritten. Returns whether anything changed.
pub fn merge(stored: &mut StoredRecord, source: &SourceRecord) -> bool {
    let mut changed = false;

    if let Some(name) = usable(source.set_name.as_deref()) {
        changed |= fill_nested(stored, "set", "name", name);
    }
    if let Some(code) = usable(source.set_code.as_deref()) {
        changed |= fill_nested(stored, "set", "code", code);
    }
    if let Some(url) = usable(source.image_url.as_deref()) {
        changed |= fill_nested(stored, "image", "url", url);
    }
    if let Some(card_type) = usable(source.card_type.as_deref()) {
        let current = stored.get("type");
        let is_default = current.and_then(Value::as_str) == Some(PLACEHOLDER_TYPE);
        if is_placeholder(current) || is_default {
            stored.put("type", Value::from(card_type));
            changed = true;
        }
    }
    if let Some(rarity) = usable(source.rarity.as_deref()) {
        changed |= fill(stored, "rarity", rarity);
    }
    if let Some(text) = usable(source.text.as_deref()) {
        changed |= fill(stored, "text", text);
    }
    if !source.keywords.is_empty() && is_placeholder(stored.get("keywords")) {
        stored.put("keywords", Value::from(source.keywords.clone()));
        changed = true;
    }
    for (key, stat) in [
        ("cost", source.cost),
        ("attack", source.attack),
        ("health", source.health),
    ] {
        if let Some(stat) = stat {
            changed |= fill(stored, key, stat);
        }
    }

    if changed {
        debug!(
            "enriched {} ({})",
            source.name,
            stored.id().unwrap_or("no id")
        );
    }
    changed
}

/// Only the set name, from a code -> name mapping built elsewhere.
pub fn fill_set_name(stored: &mut StoredRecord, set_name: &str) -> bool {
    match usable(Some(set_name)) {
        Some(name) => fill_nested(stored, "set", "name", name),
        None => false,
    }
}

fn fill(stored: &mut StoredRecord, key: &str, value: impl Into<Value>) -> bool {
    if !is_placeholder(stored.get(key)) {
        return false;
    }
    stored.put(key, value.into());
    true
}

/// A parent holding anything but an object or `null` is a present value in
/// its own right and is left alone.
fn fill_nested(stored: &mut StoredRecord, object: &str, key: &str, value: &str) -> bool {
    match stored.get(object) {
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => return false,
    }
    if !is_placeholder(stored.nested(object, key)) {
        return false;
    }
    stored.put_nested(object, key, Value::from(value));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stored(value: Value) -> StoredRecord {
        StoredRecord::from_value(value).unwrap()
    }

    fn tile(set_name: Option<&str>, set_code: Option<&str>) -> SourceRecord {
        SourceRecord {
            number: Some("12".to_string()),
            set_name: set_name.map(str::to_string),
            set_code: set_code.map(str::to_string),
            ..SourceRecord::new("Firebolt")
        }
    }

    #[test]
    fn fills_missing_set_fields() {
        let mut record = stored(json!({
            "id": "x1", "name": "Firebolt",
            "set": {"code": null, "name": null, "number": "12"}
        }));
        assert!(merge(&mut record, &tile(Some("Origins"), Some("orig"))));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "id": "x1", "name": "Firebolt",
                "set": {"code": "orig", "name": "Origins", "number": "12"}
            })
        );
    }

    #[test]
    fn placeholder_source_value_is_rejected() {
        let mut record = stored(json!({
            "name": "Firebolt", "set": {"code": null, "name": null, "number": "12"}
        }));
        assert!(!merge(&mut record, &tile(Some("View on RochesterCCG"), None)));
        assert_eq!(record.set_field("name"), Some(&Value::Null));
    }

    #[test]
    fn placeholder_stored_value_is_replaced() {
        let mut record = stored(json!({
            "name": "Firebolt", "set": {"name": "View on RochesterCCG", "number": "12"}
        }));
        assert!(merge(&mut record, &tile(Some("Origins"), None)));
        assert_eq!(record.set_field("name"), Some(&json!("Origins")));
    }

    #[test]
    fn present_values_are_never_overwritten() {
        let original = json!({
            "id": "keep", "name": "Firebolt", "type": "Attack", "rarity": "Rare",
            "text": "Old text", "keywords": ["Old"],
            "set": {"code": "abc", "name": "Alpha", "number": "12"},
            "image": {"url": "assets/x.jpg"}
        });
        let mut record = stored(original.clone());
        let source = SourceRecord {
            number: Some("12".into()),
            set_name: Some("Origins".into()),
            set_code: Some("orig".into()),
            image_url: Some("https://remote/x.jpg".into()),
            card_type: Some("Action".into()),
            rarity: Some("Common".into()),
            text: Some("New text".into()),
            keywords: vec!["New".into()],
            ..SourceRecord::new("Firebolt")
        };
        assert!(!merge(&mut record, &source));
        assert_eq!(serde_json::to_value(&record).unwrap(), original);
    }

    #[test]
    fn detail_fields_fill_gaps() {
        let mut record = stored(json!({
            "id": "x", "name": "Firebolt", "type": "Card", "rarity": "", "keywords": [],
            "set": {"number": "12"}, "image": null
        }));
        let source = SourceRecord {
            image_url: Some("https://remote/x.jpg".into()),
            card_type: Some("Attack".into()),
            rarity: Some("Rare".into()),
            text: Some("Stun.".into()),
            keywords: vec!["Stun".into()],
            ..SourceRecord::new("Firebolt")
        };
        assert!(merge(&mut record, &source));
        assert_eq!(record.get("type"), Some(&json!("Attack")));
        assert_eq!(record.get("rarity"), Some(&json!("Rare")));
        assert_eq!(record.get("text"), Some(&json!("Stun.")));
        assert_eq!(record.get("keywords"), Some(&json!(["Stun"])));
        assert_eq!(record.image_field("url"), Some(&json!("https://remote/x.jpg")));
        assert_eq!(record.id(), Some("x"));
    }

    #[test]
    fn non_object_parents_are_kept() {
        let original = json!({
            "id": "x", "name": "Firebolt",
            "set": "Origins",
            "image": "assets/images/cards/orig_012.jpg"
        });
        let mut record = stored(original.clone());
        let source = SourceRecord {
            set_name: Some("Origins".into()),
            set_code: Some("orig".into()),
            image_url: Some("https://remote/x.jpg".into()),
            ..SourceRecord::new("Firebolt")
        };
        assert!(!merge(&mut record, &source));
        assert!(!fill_set_name(&mut record, "Origins"));
        assert_eq!(serde_json::to_value(&record).unwrap(), original);
    }

    #[test]
    fn null_or_missing_parent_gets_an_object() {
        let mut record = stored(json!({"name": "Firebolt", "image": null}));
        let source = SourceRecord {
            set_code: Some("orig".into()),
            image_url: Some("https://remote/x.jpg".into()),
            ..SourceRecord::new("Firebolt")
        };
        assert!(merge(&mut record, &source));
        assert_eq!(record.get("image"), Some(&json!({"url": "https://remote/x.jpg"})));
        assert_eq!(record.get("set"), Some(&json!({"code": "orig"})));
    }

    #[test]
    fn stats_fill_only_when_absent() {
        let mut record = stored(json!({"name": "Firebolt", "cost": null, "attack": 4}));
        let source = SourceRecord {
            cost: Some(3),
            attack: Some(5),
            health: Some(-1),
            ..SourceRecord::new("Firebolt")
        };
        assert!(merge(&mut record, &source));
        assert_eq!(record.get("cost"), Some(&json!(3)));
        assert_eq!(record.get("attack"), Some(&json!(4)));
        assert_eq!(record.get("health"), Some(&json!(-1)));
    }

    #[test]
    fn missing_stats_leave_record_alone() {
        let mut record = stored(json!({"name": "Firebolt", "cost": null}));
        assert!(!merge(&mut record, &SourceRecord::new("Firebolt")));
        assert_eq!(record.get("cost"), Some(&Value::Null));
        assert_eq!(record.get("health"), None);
    }

    #[test]
    fn set_name_mapping_respects_fill_only() {
        let mut empty = stored(json!({"name": "A", "set": {"code": "orig", "name": ""}}));
        assert!(fill_set_name(&mut empty, "Origins"));
        let mut named = stored(json!({"name": "A", "set": {"code": "orig", "name": "Alpha"}}));
        assert!(!fill_set_name(&mut named, "Origins"));
        assert!(!fill_set_name(&mut empty, "View on RochesterCCG"));
    }
}
