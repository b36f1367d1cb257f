use std::collections::HashSet;

use crate::app::models::InstalledPackage;

/// Identifiers from `pm list packages`, with or without `-f` (`package:<apk>=<id>`).
pub fn parse_pm_list_packages_output(output: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for raw in output.lines() {
        let line = raw.trim();
        let Some(payload) = line.strip_prefix("package:") else {
            continue;
        };
        let id = match payload.rsplit_once('=') {
            Some((_apk_path, id)) => id.trim(),
            None => payload.trim(),
        };
        if !id.is_empty() {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Marks each installed id as disabled when it also appears in the disabled list.
pub fn merge_disabled(installed: Vec<String>, disabled: &[String]) -> Vec<InstalledPackage> {
    let disabled: HashSet<&str> = disabled.iter().map(String::as_str).collect();
    installed
        .into_iter()
        .map(|id| InstalledPackage {
            disabled: disabled.contains(id.as_str()),
            id,
        })
        .collect()
}

/// `pm` prints `Failure [REASON]` and may still exit 0 on older releases.
pub fn pm_failure_reason(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("Failure") || line.starts_with("Error:"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pm_list_packages_output() {
        let output = "package:com.example\r\npackage:/system/app/Sys.apk=com.android.sys\r\n\r\nWARNING: linker noise\r\n";
        assert_eq!(
            parse_pm_list_packages_output(output),
            vec!["com.example".to_string(), "com.android.sys".to_string()]
        );
    }

    #[test]
    fn marks_disabled_by_intersection() {
        let installed = vec!["a.one".to_string(), "b.two".to_string()];
        let merged = merge_disabled(installed, &["b.two".to_string(), "c.other".to_string()]);
        assert_eq!(
            merged,
            vec![
                InstalledPackage { id: "a.one".to_string(), disabled: false },
                InstalledPackage { id: "b.two".to_string(), disabled: true },
            ]
        );
    }

    #[test]
    fn detects_pm_failures() {
        assert_eq!(
            pm_failure_reason("Failure [DELETE_FAILED_INTERNAL_ERROR]").as_deref(),
            Some("Failure [DELETE_FAILED_INTERNAL_ERROR]")
        );
        assert_eq!(pm_failure_reason("Success"), None);
        assert_eq!(
            pm_failure_reason("Package com.x new state: disabled-user"),
            None
        );
    }
}
