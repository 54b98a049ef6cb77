//! `${VAR}` and `${VAR:-fallback}` expansion applied to raw config text
//! before parsing, e.g. `user_agent = "${SKALD_USER_AGENT:-skald}"`.

/// Expand placeholders from the process environment.
///
/// Unset variables without a fallback, invalid names and unterminated
/// placeholders are left in the text unchanged.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let Some(end) = body.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let placeholder = &rest[start..start + end + 3];
        let (name, fallback) = match body[..end].split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (&body[..end], None),
        };

        let value = is_var_name(name)
            .then(|| lookup(name).or_else(|| fallback.map(str::to_string)))
            .flatten();
        out.push_str(value.as_deref().unwrap_or(placeholder));
        rest = &body[end + 1..];
    }

    out.push_str(rest);
    out
}

fn is_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
