//! Directory paths carry a trailing `/`; file paths do not.

pub fn validate_device_path(path: &str) -> Result<(), String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err("device_path is required".to_string());
    }
    if !trimmed.starts_with('/') {
        return Err("device_path must be an absolute device path starting with '/'".to_string());
    }
    if trimmed.contains('\0') {
        return Err("device_path contains invalid characters".to_string());
    }
    if normalize_device_path(trimmed) == "/" {
        return Err("device_path must not be root".to_string());
    }
    for segment in trimmed.split('/') {
        if segment == ".." {
            return Err("device_path must not contain '..' segments".to_string());
        }
    }
    Ok(())
}

/// Collapses runs of `/` into one.
pub fn normalize_device_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut previous_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if !previous_slash {
                normalized.push(ch);
            }
            previous_slash = true;
        } else {
            normalized.push(ch);
            previous_slash = false;
        }
    }
    normalized
}

pub fn as_directory(path: &str) -> String {
    let normalized = normalize_device_path(path.trim());
    if normalized.is_empty() {
        return "/".to_string();
    }
    if normalized.ends_with('/') {
        normalized
    } else {
        format!("{normalized}/")
    }
}

pub fn join_device_path(dir: &str, name: &str, is_dir: bool) -> String {
    let joined = normalize_device_path(&format!("{dir}/{name}"));
    if is_dir {
        as_directory(&joined)
    } else {
        joined
    }
}

/// Drops the last non-empty segment. The root is its own parent.
pub fn device_parent_dir(device_path: &str) -> String {
    let segments: Vec<&str> = device_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.len() <= 1 {
        return "/".to_string();
    }
    format!("/{}/", segments[..segments.len() - 1].join("/"))
}

/// Breadcrumb `(label, path)` pairs from the root down to `device_path`.
pub fn device_breadcrumbs(device_path: &str) -> Vec<(String, String)> {
    let mut crumbs = Vec::new();
    let mut current = String::from("/");
    for segment in device_path.split('/').filter(|segment| !segment.is_empty()) {
        current.push_str(segment);
        current.push('/');
        crumbs.push((segment.to_string(), current.clone()));
    }
    crumbs
}

/// Single-quotes an argument for the device's `sh`.
pub fn quote_device_arg(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quotes an argument for the host shell the bridge spawns through.
#[cfg(not(windows))]
pub fn quote_host_arg(value: &str) -> String {
    quote_device_arg(value)
}

#[cfg(windows)]
pub fn quote_host_arg(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_device_path_requires_absolute() {
        assert!(validate_device_path("").is_err());
        assert!(validate_device_path("sdcard/file.txt").is_err());
        assert!(validate_device_path("/").is_err());
        assert!(validate_device_path("//").is_err());
        assert!(validate_device_path("/sdcard/file.txt").is_ok());
    }

    #[test]
    fn validate_device_path_blocks_dotdot() {
        assert!(validate_device_path("/sdcard/../etc/passwd").is_err());
        assert!(validate_device_path("/sdcard/..").is_err());
    }

    #[test]
    fn normalizes_duplicate_separators() {
        assert_eq!(normalize_device_path("/sdcard//Download///a.txt"), "/sdcard/Download/a.txt");
        assert_eq!(join_device_path("/sdcard/", "DCIM", true), "/sdcard/DCIM/");
        assert_eq!(join_device_path("/sdcard/", "a.txt", false), "/sdcard/a.txt");
        assert_eq!(as_directory("/sdcard"), "/sdcard/");
    }

    #[test]
    fn device_parent_dir_handles_common_cases() {
        assert_eq!(device_parent_dir("/sdcard/Download/"), "/sdcard/");
        assert_eq!(device_parent_dir("/sdcard/Download/file.txt"), "/sdcard/Download/");
        assert_eq!(device_parent_dir("/sdcard/"), "/");
        assert_eq!(device_parent_dir("/"), "/");
        assert_eq!(device_parent_dir(""), "/");
    }

    #[test]
    fn builds_breadcrumbs() {
        assert_eq!(
            device_breadcrumbs("/storage/emulated/0/"),
            vec![
                ("storage".to_string(), "/storage/".to_string()),
                ("emulated".to_string(), "/storage/emulated/".to_string()),
                ("0".to_string(), "/storage/emulated/0/".to_string()),
            ]
        );
        assert!(device_breadcrumbs("/").is_empty());
    }

    #[test]
    fn quotes_embedded_single_quotes() {
        assert_eq!(quote_device_arg("/sdcard/it's here"), r"'/sdcard/it'\''s here'");
    }
}
