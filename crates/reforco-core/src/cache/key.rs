use std::collections::BTreeMap;
use std::fmt::Display;

/// Separator between the prefix and each `name:value` pair.
const PAIR_SEPARATOR: char = '_';

/// Separator between a parameter name and its value.
const VALUE_SEPARATOR: char = ':';

const ESCAPE: char = '\\';

/// Append `part` with separators and the escape character backslash-escaped,
/// so a value can never be read as the start of another pair.
fn push_escaped(key: &mut String, part: &str) {
    for c in part.chars() {
        if matches!(c, PAIR_SEPARATOR | VALUE_SEPARATOR | ESCAPE) {
            key.push(ESCAPE);
        }
        key.push(c);
    }
}

/// Build a stable cache key from a resource prefix and query parameters.
///
/// Parameter names are sorted, so the same parameters given in any order
/// produce the same key. With no parameters the key is just the prefix.
/// `_`, `:` and `\` inside names and values are escaped with a backslash,
/// which leaves numeric keys such as the calendar's unchanged.
///
/// ```
/// use reforco_core::generate_cache_key;
///
/// let key = generate_cache_key("calendario_aulas", [("mes", 3), ("ano", 2024)]);
/// assert_eq!(key, "calendario_aulas_ano:2024_mes:3");
/// ```
pub fn generate_cache_key<K, V, I>(prefix: &str, params: I) -> String
where
    K: AsRef<str>,
    V: Display,
    I: IntoIterator<Item = (K, V)>,
{
    let sorted: BTreeMap<String, String> = params
        .into_iter()
        .map(|(name, value)| (name.as_ref().to_string(), value.to_string()))
        .collect();

    let mut key = prefix.to_string();
    for (name, value) in &sorted {
        key.push(PAIR_SEPARATOR);
        push_escaped(&mut key, name);
        key.push(VALUE_SEPARATOR);
        push_escaped(&mut key, value);
    }
    key
}
