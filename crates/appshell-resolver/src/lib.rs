//! Appshell Resolver
//!
//! Pure mapping from module identifiers to asset locations.
//!
//! A module id like `shell.util.functions` becomes an asset path by folding
//! case, substituting `.` with `/`, rewriting the framework namespace prefix
//! to the configured library root, and appending the asset extension. The
//! resolver also makes the skip decision for pre-bundled namespaces: when the
//! shell ships with its utility modules already bundled, requesting them must
//! not issue a fetch at all.
//!
//! Resolution has no side effects and no failure modes; malformed ids
//! normalize to a syntactically valid, possibly non-existent path, and a
//! missing asset is only detected later, at fetch time.

use appshell_types::ModuleId;

/// Result of resolving one module id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// Relative asset path, extension included.
    pub path: String,
    /// When true the caller must not issue a fetch; the code is assumed
    /// already present.
    pub skip: bool,
}

/// Maps module ids to asset paths.
///
/// # Examples
///
/// ```
/// use appshell_resolver::PathResolver;
/// use appshell_types::ModuleId;
///
/// let resolver = PathResolver::new();
/// let asset = resolver.resolve(&ModuleId::new("Shell.App.Demo.Main"));
/// assert_eq!(asset.path, "modules/app/demo/main.json");
/// assert!(!asset.skip);
/// ```
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Library root substituted for the framework prefix, trailing `/`.
    lib_root: String,
    /// Extension appended to every asset path, without the dot.
    asset_extension: String,
    /// Framework namespace prefix rewritten to `lib_root`.
    framework_prefix: String,
    /// When set, ids under `bundled_prefix` are skipped entirely.
    bundled: bool,
    /// Namespace whose modules ship pre-bundled with the shell.
    bundled_prefix: String,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self {
            lib_root: "modules/".to_string(),
            asset_extension: "json".to_string(),
            framework_prefix: "shell".to_string(),
            bundled: false,
            bundled_prefix: "shell.util".to_string(),
        }
    }
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the library root. A trailing `/` is added when missing.
    pub fn with_lib_root(mut self, lib_root: impl Into<String>) -> Self {
        let mut root = lib_root.into();
        if !root.is_empty() && !root.ends_with('/') {
            root.push('/');
        }
        self.lib_root = root;
        self
    }

    pub fn with_asset_extension(mut self, extension: impl Into<String>) -> Self {
        self.asset_extension = extension.into();
        self
    }

    /// Mark the always-bundled namespace as already present, turning its
    /// resolutions into skips.
    pub fn with_bundled(mut self, bundled: bool) -> Self {
        self.bundled = bundled;
        self
    }

    pub fn with_bundled_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.bundled_prefix = prefix.into();
        self
    }

    /// Resolve a module id to its asset location and skip decision.
    pub fn resolve(&self, id: &ModuleId) -> ResolvedAsset {
        let skip = self.bundled && id.is_under(&self.bundled_prefix);

        let rel = id.to_rel_path();
        let framework = format!("{}/", self.framework_prefix);
        let base = match rel.strip_prefix(&framework) {
            Some(rest) => format!("{}{}", self.lib_root, rest),
            None => rel,
        };

        ResolvedAsset {
            path: format!("{}.{}", base, self.asset_extension),
            skip,
        }
    }
}
