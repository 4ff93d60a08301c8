//! Per-language package whitelists, enforced by a [`Runtime`](crate::runtime::Runtime)
//! before any container is created.

use crate::error::RuntimeError;
use std::collections::HashSet;
use std::sync::OnceLock;

fn python_whitelist() -> &'static HashSet<&'static str> {
    static WHITELIST: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WHITELIST.get_or_init(|| {
        [
            "numpy",
            "pandas",
            "requests",
            "scipy",
            "matplotlib",
            "pillow",
            "pytest",
            "flask",
            "django",
            "beautifulsoup4",
        ]
        .into_iter()
        .collect()
    })
}

fn javascript_whitelist() -> &'static HashSet<&'static str> {
    static WHITELIST: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WHITELIST.get_or_init(|| {
        [
            "lodash", "axios", "moment", "express", "react", "vue", "jest", "mocha", "chalk",
            "commander",
        ]
        .into_iter()
        .collect()
    })
}

/// Validates `packages` against the whitelist for `language`. Languages with
/// no defined whitelist (C#, Go) reject any non-empty package list — there is
/// no "install anything" fallback, regardless of what an upstream adapter did.
pub fn validate_packages(language: &str, packages: &[String]) -> Result<(), RuntimeError> {
    if packages.is_empty() {
        return Ok(());
    }

    let whitelist = match language.to_lowercase().as_str() {
        "python" | "py" => python_whitelist(),
        "javascript" | "js" | "nodejs" | "node" => javascript_whitelist(),
        other => return Err(RuntimeError::NoWhitelistDefined(other.to_string())),
    };

    for pkg in packages {
        if !whitelist.contains(pkg.to_lowercase().as_str()) {
            return Err(RuntimeError::UnauthorizedPackage {
                language: language.to_string(),
                package: pkg.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_packages_always_pass() {
        assert!(validate_packages("ruby", &[]).is_ok());
    }

    #[test]
    fn python_whitelisted_package_passes() {
        assert!(validate_packages("python", &["numpy".to_string()]).is_ok());
    }

    #[test]
    fn python_case_insensitive() {
        assert!(validate_packages("Python", &["NumPy".to_string()]).is_ok());
    }

    #[test]
    fn python_unlisted_package_rejected() {
        let err = validate_packages("python", &["malicious-xyz".to_string()]).unwrap_err();
        assert!(matches!(err, RuntimeError::UnauthorizedPackage { .. }));
    }

    #[test]
    fn go_has_no_whitelist() {
        let err = validate_packages("go", &["github.com/anything".to_string()]).unwrap_err();
        assert!(matches!(err, RuntimeError::NoWhitelistDefined(_)));
    }

    #[test]
    fn csharp_has_no_whitelist() {
        let err = validate_packages("csharp", &["Newtonsoft.Json".to_string()]).unwrap_err();
        assert!(matches!(err, RuntimeError::NoWhitelistDefined(_)));
    }
}
