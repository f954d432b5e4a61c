//! Request body decoding.
//!
//! Turns `application/x-www-form-urlencoded` bodies into nested [`Value`]s
//! using the bracket conventions HTML forms produce: `user[email]=a` nests,
//! `tags[]=a&tags[]=b` appends, and maps whose keys are exactly `0..n`
//! become lists.

use std::collections::BTreeMap;

use formkit_core::Value;

/// Parses a URL-encoded body.
///
/// For repeated plain keys the last value wins.
///
/// # Examples
///
/// ```
/// use formkit_forms::request::parse_urlencoded;
/// use serde_json::json;
///
/// let data = parse_urlencoded("user%5Bname%5D=Ada&user[tags][]=x&user[tags][]=y");
/// assert_eq!(data.to_json(), json!({"user": {"name": "Ada", "tags": ["x", "y"]}}));
/// ```
pub fn parse_urlencoded(body: &str) -> Value {
    let mut root = Value::Map(BTreeMap::new());
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        let segments = split_key(&key);
        if segments.is_empty() {
            continue;
        }
        insert(&mut root, &segments, Value::String(value.into_owned()));
    }
    lists_from_indexed_maps(root)
}

/// Splits `a[b][]` into `["a", "b", ""]`. An empty segment means append.
fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[').filter(|&i| i > 0) else {
        return if key.is_empty() {
            Vec::new()
        } else {
            vec![key.to_string()]
        };
    };

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            break;
        };
        segments.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }
    segments
}

fn insert(node: &mut Value, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if !matches!(node, Value::Map(_)) {
        *node = Value::Map(BTreeMap::new());
    }
    let Value::Map(map) = node else {
        return;
    };
    let key = if first.is_empty() {
        map.len().to_string()
    } else {
        first.clone()
    };
    insert(map.entry(key).or_default(), rest, value);
}

fn lists_from_indexed_maps(value: Value) -> Value {
    let Value::Map(map) = value else {
        return value;
    };
    let map: BTreeMap<String, Value> = map
        .into_iter()
        .map(|(key, child)| (key, lists_from_indexed_maps(child)))
        .collect();

    let len = map.len();
    let is_list = len > 0
        && map.keys().all(|key| {
            key.parse::<usize>()
                .is_ok_and(|index| index < len && index.to_string() == *key)
        });
    if !is_list {
        return Value::Map(map);
    }

    let mut items: Vec<(usize, Value)> = map
        .into_iter()
        .filter_map(|(key, child)| key.parse().ok().map(|index| (index, child)))
        .collect();
    items.sort_by_key(|(index, _)| *index);
    Value::List(items.into_iter().map(|(_, child)| child).collect())
}
