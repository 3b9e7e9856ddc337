//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use geotrack_core::error::BuildError;

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingStore => {
                "What happened: No profile store was provided to the scheduler.\nLikely causes: The profile source failed to initialize or was not wired into the builder.\nHow to fix: Pass a profile source via with_store(...).".to_string()
            }
            BuildError::MissingSink => {
                "What happened: No config sink was provided to the scheduler.\nLikely causes: The GPS-collection bridge was not wired into the builder.\nHow to fix: Pass the collector bridge via with_sink(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. Compare against etc/geotrack.toml."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("parse config toml") {
        return "What happened: The config file is not valid TOML for this schema.\nLikely causes: A typo, a missing [[profile]] header, or a value of the wrong type.\nHow to fix: Compare against etc/geotrack.toml and rerun self-check.".to_string();
    }

    if lower.contains("duplicate profile id") {
        return format!(
            "What happened: Two profiles share an id.\nHow to fix: Give every [[profile]] a unique id. Original: {msg}"
        );
    }

    // Profile CSV header special-case
    if lower.contains("profile csv must have headers") {
        return format!(
            "Invalid headers in profile CSV. Expected '{}'.",
            geotrack_config::PROFILE_CSV_HEADERS.join(",")
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// One-line JSON error object for `--json` consumers.
pub fn json_error(err: &eyre::Report) -> String {
    serde_json::json!({
        "error": {
            "message": err.to_string(),
            "detail": humanize(err),
        }
    })
    .to_string()
}
