//! Dotenv-style codec for the secret artifact (`<env>.userdata`).
//!
//! One `key=value` per line, keys sorted. Values that are not plain tokens
//! are double-quoted with `\\`, `\"`, `\n` and `\r` escapes. Blank lines and
//! lines starting with `#` are ignored on parse.

use crate::core::secrets::SecretMap;

/// Render `secrets` as `key=value` lines.
pub fn serialize_userdata(secrets: &SecretMap) -> String {
    let mut buf = String::new();
    for (key, value) in secrets {
        buf.push_str(key);
        buf.push('=');
        if is_plain(value) {
            buf.push_str(value);
        } else {
            push_quoted(&mut buf, value);
        }
        buf.push('\n');
    }
    buf
}

/// Parse `key=value` lines. Errors name the offending line number only.
pub fn parse_userdata(contents: &str) -> Result<SecretMap, String> {
    let mut secrets = SecretMap::new();
    for (idx, raw) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| format!("line {line_no}: expected key=value"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("line {line_no}: empty key"));
        }
        let value = parse_value(value.trim()).map_err(|err| format!("line {line_no}: {err}"))?;
        secrets.insert(key.to_string(), value);
    }
    Ok(secrets)
}

fn is_plain(value: &str) -> bool {
    value.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '+' | '=' | ':' | '@')
    })
}

fn push_quoted(buf: &mut String, value: &str) {
    buf.push('"');
    for c in value.chars() {
        match c {
            '\\' => buf.push_str("\\\\"),
            '"' => buf.push_str("\\\""),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            other => buf.push(other),
        }
    }
    buf.push('"');
}

fn parse_value(value: &str) -> Result<String, &'static str> {
    if let Some(rest) = value.strip_prefix('"') {
        let mut out = String::new();
        let mut chars = rest.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => {
                    return if chars.as_str().trim().is_empty() {
                        Ok(out)
                    } else {
                        Err("trailing characters after closing quote")
                    };
                }
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some(other) => out.push(other),
                    None => return Err("dangling escape"),
                },
                other => out.push(other),
            }
        }
        return Err("unterminated quoted value");
    }
    if let Some(rest) = value.strip_prefix('\'') {
        return rest
            .strip_suffix('\'')
            .map(str::to_string)
            .ok_or("unterminated quoted value");
    }
    Ok(value.to_string())
}
