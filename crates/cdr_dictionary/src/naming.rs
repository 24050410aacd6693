//! Naming helpers shared by the resolver and the structural linter.

/// Split an identifier into lowercase word segments.
///
/// Boundaries are case changes (`homePhone` -> `home`, `phone`), the end of
/// an acronym (`XMLHttp` -> `xml`, `http`) and any non-alphanumeric
/// character. Digits stay attached to the preceding segment.
pub fn split_segments(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            flush(&mut current, &mut segments);
            continue;
        }

        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |c| c.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                flush(&mut current, &mut segments);
            }
        }

        current.extend(ch.to_lowercase());
    }

    flush(&mut current, &mut segments);
    segments
}

fn flush(current: &mut String, segments: &mut Vec<String>) {
    if !current.is_empty() {
        segments.push(std::mem::take(current));
    }
}

/// `camelCase`: ASCII alphanumerics, lowercase first letter, no run of
/// two capitals (`customerId`, not `customerID`).
pub fn is_camel_case(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    name.chars().all(|c| c.is_ascii_alphanumeric()) && !has_capital_run(name)
}

/// `PascalCase`: same alphabet as camelCase with an uppercase first letter.
pub fn is_pascal_case(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {}
        _ => return false,
    }
    name.chars().all(|c| c.is_ascii_alphanumeric()) && !has_capital_run(name)
}

fn has_capital_run(name: &str) -> bool {
    name.as_bytes()
        .windows(2)
        .any(|pair| pair[0].is_ascii_uppercase() && pair[1].is_ascii_uppercase())
}

/// `kebab-case` path segment: lowercase alphanumerics separated by single hyphens.
pub fn is_kebab_case(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('-')
        && !segment.ends_with('-')
        && !segment.contains("--")
        && segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Render a label as a camelCase property name (`Customer Account` -> `customerAccount`).
pub fn lower_camel(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for (i, segment) in split_segments(label).iter().enumerate() {
        if i == 0 {
            out.push_str(segment);
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
