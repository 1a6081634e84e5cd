//! Catalog request extraction.
//!
//! Paths look like `[/{config}]/catalog/{type}/{id}[/{extra}].json`, where
//! `config` and `extra` are form-encoded `k=v&k=v` lists. Axum hands path
//! params over already percent-decoded, so the two form segments are read from
//! the raw path and deserialized with `serde_urlencoded`, which splits on the
//! literal `&` and `=` before decoding.

use serde::Deserialize;

use crate::error::RequestError;

/// Path params as matched by the catalog routes.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPath {
    pub config: Option<String>,
    #[serde(rename = "type")]
    pub content_type: String,
    pub id: String,
    pub extra: Option<String>,
}

/// Per-user settings carried in the leading path segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserConfig {
    #[serde(rename = "rpdb")]
    pub rpdb_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogExtra {
    pub language: Option<String>,
    pub recommendation: Option<String>,
    pub skip: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRequest {
    pub config: UserConfig,
    pub content_type: String,
    pub catalog_id: String,
    pub extra: CatalogExtra,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A config segment must carry a non-empty `rpdb` key; other keys are ignored.
pub fn parse_config(raw: &str) -> Result<UserConfig, RequestError> {
    let config: UserConfig =
        serde_urlencoded::from_str(raw).map_err(|e| RequestError::Config(format!("{raw}: {e}")))?;
    match non_empty(config.rpdb_key) {
        Some(key) => Ok(UserConfig { rpdb_key: Some(key) }),
        None => Err(RequestError::Config(format!("{raw}: missing rpdb key"))),
    }
}

pub fn parse_extra(raw: &str) -> Result<CatalogExtra, RequestError> {
    let extra: CatalogExtra =
        serde_urlencoded::from_str(raw).map_err(|e| RequestError::Extra(format!("{raw}: {e}")))?;
    Ok(CatalogExtra {
        language: non_empty(extra.language),
        recommendation: non_empty(extra.recommendation),
        skip: extra.skip,
    })
}

fn raw_segments(path: &str) -> Vec<&str> {
    path.trim_start_matches('/').split('/').collect()
}

impl CatalogRequest {
    /// Combine matched params with the still-encoded request path.
    pub fn from_path(params: CatalogPath, raw_path: &str) -> Result<Self, RequestError> {
        let not_found = || RequestError::Route(raw_path.to_string());
        let segments = raw_segments(raw_path);

        let config = match params.config {
            Some(_) => parse_config(segments.first().copied().ok_or_else(not_found)?)?,
            None => UserConfig::default(),
        };

        // `.json` terminates whichever segment comes last.
        let (catalog_id, extra) = match params.extra {
            Some(_) => {
                let raw = segments.last().copied().ok_or_else(not_found)?;
                let raw = raw.strip_suffix(".json").ok_or_else(not_found)?;
                (params.id, parse_extra(raw)?)
            }
            None => {
                let id = params.id.strip_suffix(".json").ok_or_else(not_found)?;
                (id.to_string(), CatalogExtra::default())
            }
        };

        Ok(Self {
            config,
            content_type: params.content_type,
            catalog_id,
            extra,
        })
    }
}

/// Validate the config segment of `/{config}/manifest.json`.
pub fn parse_manifest_path(raw_path: &str) -> Result<UserConfig, RequestError> {
    match raw_segments(raw_path).as_slice() {
        [config, "manifest.json"] => parse_config(config),
        _ => Err(RequestError::Route(raw_path.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(config: Option<&str>, content_type: &str, id: &str, extra: Option<&str>) -> CatalogPath {
        CatalogPath {
            config: config.map(str::to_string),
            content_type: content_type.into(),
            id: id.into(),
            extra: extra.map(str::to_string),
        }
    }

    #[test]
    fn plain_catalog_path() {
        let req = CatalogRequest::from_path(
            params(None, "movie", "binged-latest.json", None),
            "/catalog/movie/binged-latest.json",
        )
        .unwrap();
        assert_eq!(req.content_type, "movie");
        assert_eq!(req.catalog_id, "binged-latest");
        assert_eq!(req.extra, CatalogExtra::default());
        assert_eq!(req.config, UserConfig::default());
    }

    #[test]
    fn extra_and_config_are_decoded() {
        let raw = "/rpdb=t0-free%2Dkey/catalog/series/binged-latest/language=Norwegian%20Bokm%C3%A5l&recommendation=Must+Watch&skip=100.json";
        let req = CatalogRequest::from_path(
            params(Some("rpdb=t0-free-key"), "series", "binged-latest", Some("ignored")),
            raw,
        )
        .unwrap();
        assert_eq!(req.config.rpdb_key.as_deref(), Some("t0-free-key"));
        assert_eq!(req.content_type, "series");
        assert_eq!(req.extra.language.as_deref(), Some("Norwegian Bokmål"));
        assert_eq!(req.extra.recommendation.as_deref(), Some("Must Watch"));
        assert_eq!(req.extra.skip, Some(100));
    }

    #[test]
    fn encoded_ampersand_stays_in_value() {
        let extra = parse_extra("language=Tom%26Jerry%3D&skip=3").unwrap();
        assert_eq!(extra.language.as_deref(), Some("Tom&Jerry="));
        assert_eq!(extra.skip, Some(3));
    }

    #[test]
    fn blank_extras_are_absent() {
        let extra = parse_extra("language=%20&recommendation&theme=dark").unwrap();
        assert_eq!(extra, CatalogExtra::default());
    }

    #[test]
    fn malformed_segments() {
        assert!(matches!(
            CatalogRequest::from_path(
                params(Some("rpdb"), "movie", "binged-latest.json", None),
                "/rpdb/catalog/movie/binged-latest.json",
            ),
            Err(RequestError::Config(_))
        ));
        assert!(matches!(parse_extra("skip=abc"), Err(RequestError::Extra(_))));
        assert!(matches!(
            CatalogRequest::from_path(
                params(None, "movie", "binged-latest", None),
                "/catalog/movie/binged-latest",
            ),
            Err(RequestError::Route(_))
        ));
        assert!(matches!(parse_config("theme=dark"), Err(RequestError::Config(_))));
    }

    #[test]
    fn config_ignores_unknown_keys() {
        let config = parse_config("theme=dark&rpdb=%20k%20").unwrap();
        assert_eq!(config.rpdb_key.as_deref(), Some("k"));
        assert_eq!(
            parse_manifest_path("/rpdb=k/manifest.json").unwrap().rpdb_key.as_deref(),
            Some("k")
        );
        assert!(matches!(
            parse_manifest_path("/a/b/manifest.json"),
            Err(RequestError::Route(_))
        ));
    }
}
