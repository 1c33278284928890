use axum::http::{HeaderValue, Method};
use core_config::ConfigError;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

/// CORS layer restricted to `origins`.
pub fn create_cors_layer(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600))
}

/// Any origin, any method, any header.
pub fn create_permissive_cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}

/// Permissive unless `CORS_ALLOWED_ORIGIN` lists comma-separated origins.
pub fn cors_layer_from_env() -> Result<CorsLayer, ConfigError> {
    let raw = match std::env::var("CORS_ALLOWED_ORIGIN") {
        Ok(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(create_permissive_cors_layer()),
    };

    let origins = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<HeaderValue>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "CORS_ALLOWED_ORIGIN".to_string(),
                    details: format!("{s}: {e}"),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(origins = %raw, "CORS restricted to configured origins");
    Ok(create_cors_layer(origins))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_origin_is_permissive() {
        temp_env::with_var_unset("CORS_ALLOWED_ORIGIN", || {
            assert!(cors_layer_from_env().is_ok());
        });
    }

    #[test]
    fn test_origin_list_parses() {
        temp_env::with_var(
            "CORS_ALLOWED_ORIGIN",
            Some("http://localhost:3000, https://lab.example.com"),
            || {
                assert!(cors_layer_from_env().is_ok());
            },
        );
    }

    #[test]
    fn test_invalid_origin_is_rejected() {
        temp_env::with_var("CORS_ALLOWED_ORIGIN", Some("http://ok.example,bad\norigin"), || {
            let err = cors_layer_from_env().unwrap_err();
            assert!(err.to_string().contains("CORS_ALLOWED_ORIGIN"));
        });
    }
}
