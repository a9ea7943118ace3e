//! # Name Normalization
//!
//! Operation names, field names and the keys found in generic input all use different
//! conventions (`ListBuckets`, `bucket_name`, `bucketName`, `bucket-name`). Everything is
//! cross-referenced through a single canonical form: lowercase words joined by hyphens.

/// Rewrites a camel, Pascal or snake case identifier into lowercase hyphenated form.
///
/// Runs of capitals are treated as acronyms, so `DescribeDBInstances` becomes
/// `describe-db-instances` and `getS3AccountOwner` becomes `get-s3-account-owner`.
pub fn normalize(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '_' | '-' | ' ' | '.') {
            push_separator(&mut out);
            continue;
        }

        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                push_separator(&mut out);
            }
        }

        out.extend(c.to_lowercase());
    }

    while out.ends_with('-') {
        out.pop();
    }
    out
}

fn push_separator(out: &mut String) {
    if !out.is_empty() && !out.ends_with('-') {
        out.push('-');
    }
}

/// Normalizes a field accessor name, dropping a leading `get`/`set` accessor prefix.
pub fn normalize_field(name: &str) -> String {
    normalize(strip_accessor_prefix(name))
}

fn strip_accessor_prefix(name: &str) -> &str {
    for prefix in ["get", "set"] {
        if let Some(rest) = name.strip_prefix(prefix)
            && let Some(first) = rest.chars().next()
            && (first.is_uppercase() || first == '_')
        {
            return rest.trim_start_matches('_');
        }
    }
    name
}

/// The key under which a readable field is reported.
///
/// Boolean `is` accessors lose their prefix and gain a `?` suffix: `is_public` → `public?`.
pub fn readable_key(field_name: &str, is_boolean: bool) -> String {
    let normalized = normalize_field(field_name);
    match normalized.strip_prefix("is-") {
        Some(rest) if is_boolean && !rest.is_empty() => format!("{rest}?"),
        _ => normalized,
    }
}

/// Whether a generic input key addresses the given field.
pub fn key_matches_field(key: &str, field_name: &str, is_boolean: bool) -> bool {
    let key = normalize(key);
    key == normalize_field(field_name) || (is_boolean && key == readable_key(field_name, true))
}
