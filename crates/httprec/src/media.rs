//! Media type helpers.

use crate::error::{CaptureError, CaptureResult};
use mime::Mime;
use std::collections::HashSet;

/// Parses a `Content-Type` value and returns its base media type.
///
/// Parameters such as `charset` are discarded, so
/// `"application/json; charset=utf-8"` yields `"application/json"`. Optional
/// whitespace around `;` is allowed. The `type/subtype` essence is returned
/// in the lowercase form the `mime` crate normalizes it to.
///
/// # Errors
///
/// Returns [`CaptureError::InvalidMediaType`] if the value is not a valid
/// media type, a parameter is malformed, or a parameter name repeats.
pub fn base_media_type(value: &str) -> CaptureResult<String> {
    let (essence, params) = value.split_once(';').map_or((value, None), |(e, p)| (e, Some(p)));

    let parsed: Mime = essence
        .trim()
        .parse()
        .map_err(|e: mime::FromStrError| CaptureError::invalid_media_type(value, e.to_string()))?;

    if let Some(params) = params {
        check_parameters(params).map_err(|reason| CaptureError::invalid_media_type(value, reason))?;
    }

    Ok(parsed.essence_str().to_string())
}

/// Validates `name=value` pairs following the first `;`.
///
/// Names are case-insensitive and must be unique. A trailing `;` is allowed.
fn check_parameters(params: &str) -> Result<(), String> {
    let mut seen = HashSet::new();
    let mut rest = params;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(());
        }

        let (name, after_name) = split_token(rest);
        if name.is_empty() {
            return Err(format!("invalid media parameter at {rest:?}"));
        }
        let after_eq = after_name
            .trim_start()
            .strip_prefix('=')
            .ok_or_else(|| format!("missing '=' after parameter {name:?}"))?
            .trim_start();

        let after_value = if let Some(quoted) = after_eq.strip_prefix('"') {
            skip_quoted(quoted).ok_or_else(|| format!("unterminated quoted value for {name:?}"))?
        } else {
            let (token, after_token) = split_token(after_eq);
            if token.is_empty() {
                return Err(format!("missing value for parameter {name:?}"));
            }
            after_token
        };

        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(format!("duplicate parameter name {name:?}"));
        }

        rest = after_value.trim_start();
        if rest.is_empty() {
            return Ok(());
        }
        rest = rest
            .strip_prefix(';')
            .ok_or_else(|| format!("expected ';' before {rest:?}"))?;
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(c)
}

fn split_token(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !is_token_char(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// Skips a quoted-string body (opening quote already consumed), returning
/// what follows the closing quote.
fn skip_quoted(s: &str) -> Option<&str> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(&s[i + 1..]),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_media_type() {
        assert_eq!(base_media_type("text/html").unwrap(), "text/html");
    }

    #[test]
    fn test_parameters_are_dropped() {
        assert_eq!(
            base_media_type("application/json; charset=utf-8").unwrap(),
            "application/json"
        );
        assert_eq!(
            base_media_type("multipart/form-data; boundary=abc123").unwrap(),
            "multipart/form-data"
        );
    }

    #[test]
    fn test_structured_suffix_kept() {
        assert_eq!(
            base_media_type("application/problem+json").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_missing_subtype_is_error() {
        let err = base_media_type("json").unwrap_err();
        assert!(err.is_media_type());
        assert!(err.to_string().contains("\"json\""));
    }

    #[test]
    fn test_whitespace_around_semicolon() {
        assert_eq!(
            base_media_type("application/json ; charset=utf-8").unwrap(),
            "application/json"
        );
        assert_eq!(
            base_media_type("text/plain;charset=utf-8 ;  format=flowed").unwrap(),
            "text/plain"
        );
    }

    #[test]
    fn test_trailing_semicolon_allowed() {
        assert_eq!(base_media_type("text/html;").unwrap(), "text/html");
        assert_eq!(base_media_type("text/html; charset=utf-8; ").unwrap(), "text/html");
    }

    #[test]
    fn test_quoted_parameter_value() {
        assert_eq!(
            base_media_type(r#"multipart/mixed; boundary="a;b \"c\""; x=1"#).unwrap(),
            "multipart/mixed"
        );
        assert!(base_media_type(r#"text/plain; name="open"#).is_err());
    }

    #[test]
    fn test_duplicate_parameter_is_error() {
        let err = base_media_type("text/html; a=1; a=2").unwrap_err();
        assert!(err.is_media_type());
        assert!(err.to_string().contains("duplicate parameter name"));
        assert!(base_media_type("text/html; Charset=utf-8; charset=latin1").is_err());
    }

    #[test]
    fn test_malformed_parameter_is_error() {
        assert!(base_media_type("text/html; charset").is_err());
        assert!(base_media_type("text/html; =utf-8").is_err());
        assert!(base_media_type("text/html; charset=").is_err());
        assert!(base_media_type("text/html; a=1 b=2").is_err());
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(base_media_type("/").is_err());
        assert!(base_media_type("text html").is_err());
    }
}
