/// What `build.rs` stamped into this binary.
#[derive(Debug, Clone, Copy)]
pub struct BuildMetadata {
    pub version: &'static str,
    pub commit: &'static str,
    pub built: &'static str,
    /// Target triple and cargo profile, e.g. `x86_64-unknown-linux-gnu [release]`.
    pub target: &'static str,
}

pub fn current() -> BuildMetadata {
    BuildMetadata {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("PANEL_CORE_BUILD_COMMIT").unwrap_or("unknown"),
        built: option_env!("PANEL_CORE_BUILD_DATE").unwrap_or("unknown"),
        target: option_env!("PANEL_CORE_BUILD_TARGET").unwrap_or("unknown"),
    }
}

impl BuildMetadata {
    /// The package version first, then one `label: value` line per stamp.
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("panel_core {}", self.version),
            format!("commit: {}", self.commit),
            format!("built:  {}", self.built),
            format!("target: {}", self.target),
        ]
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn first_line_names_the_package_version() {
        let info = super::current();
        let lines = info.lines();
        assert_eq!(lines[0], format!("panel_core {}", env!("CARGO_PKG_VERSION")));
        assert!(lines[1].starts_with("commit: "));
        assert_eq!(lines.len(), 4);
    }
}
