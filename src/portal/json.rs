//! JSON parsing helper for portal responses.

use anyhow::Result;

/// Parse a portal JSON body, reporting the serde path on failure.
///
/// Portal payloads are deeply nested; a bare serde error ("missing field at
/// line 1 column 48213") is useless without the path that led there.
pub fn parse_portal_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    let jd = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(jd).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        if path.is_empty() || path == "." {
            anyhow::anyhow!(inner)
        } else {
            anyhow::anyhow!("at path '{path}': {inner}")
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Outer {
        #[serde(rename = "Courses")]
        #[allow(dead_code)]
        courses: Vec<Inner>,
    }

    #[derive(Debug, Deserialize)]
    struct Inner {
        #[serde(rename = "Id")]
        #[allow(dead_code)]
        id: String,
    }

    #[test]
    fn error_includes_path() {
        let body = r#"{"Courses": [{"Id": null}]}"#;
        let err = parse_portal_json::<Outer>(body).unwrap_err();
        assert!(err.to_string().contains("Courses[0].Id"));
    }

    #[test]
    fn valid_body_parses() {
        let body = r#"{"Courses": [{"Id": "C1"}]}"#;
        let parsed: Outer = parse_portal_json(body).unwrap();
        assert_eq!(parsed.courses.len(), 1);
    }
}
