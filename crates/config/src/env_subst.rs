/// Replace `${ENV_VAR}` and `${ENV_VAR:-default}` placeholders in config
/// string values.
///
/// Unresolvable variables without a default are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace placeholders using a custom lookup function.
///
/// This is the implementation used by [`substitute_env`]; the separate
/// signature makes it testable without mutating the process environment.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut body = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                body.push(c);
            }
            if !closed || body.is_empty() {
                // Malformed, emit literal.
                result.push_str("${");
                result.push_str(&body);
                continue;
            }
            let (name, default) = match body.split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (body.as_str(), None),
            };
            match (lookup(name).filter(|v| !v.is_empty()), default) {
                (Some(val), _) => result.push_str(&val),
                (None, Some(default)) => result.push_str(default),
                (None, None) => {
                    result.push_str("${");
                    result.push_str(&body);
                    result.push('}');
                },
            }
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "AULA_TEST_TOKEN" => Some("hello".to_string()),
            "AULA_EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("token=${AULA_TEST_TOKEN}", lookup),
            "token=hello"
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${AULA_NONEXISTENT_XYZ}", lookup),
            "${AULA_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn falls_back_to_default() {
        assert_eq!(
            substitute_env_with("tz=${AULA_TZ:-America/La_Paz}", lookup),
            "tz=America/La_Paz"
        );
        assert_eq!(substitute_env_with("${AULA_EMPTY:-x}", lookup), "x");
        assert_eq!(
            substitute_env_with("${AULA_TEST_TOKEN:-ignored}", lookup),
            "hello"
        );
    }

    #[test]
    fn malformed_placeholder_is_literal() {
        assert_eq!(substitute_env_with("a ${OPEN", lookup), "a ${OPEN");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
