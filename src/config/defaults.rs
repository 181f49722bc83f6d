//! Default configuration values

/// Default number of dependencies processed at once (sequential)
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Project configuration file name, in the consuming project's root
pub const PROJECT_CONFIG_FILE: &str = "localsync.toml";

/// Package manifest file name, in each library's root
pub const MANIFEST_FILE: &str = "package.json";

/// Directory in the consuming project holding localsync state
pub const STATE_DIR: &str = ".localsync";

/// Cache records subdirectory of [`STATE_DIR`]
pub const CACHE_SUBDIR: &str = "cache";

/// Packed tarballs subdirectory of [`STATE_DIR`]
pub const TARBALLS_SUBDIR: &str = "tarballs";

/// Default dependency install directory of the consuming project
pub const DEFAULT_INSTALL_DIR: &str = "node_modules";

/// Paths never included in a content fingerprint
///
/// A pattern excludes a path when it matches either the whole relative path
/// or any single component of it.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // version control
    ".git",
    ".hg",
    ".svn",
    // installed dependencies
    "node_modules",
    // lockfiles
    "package-lock.json",
    "npm-shrinkwrap.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "bun.lock",
    // packed tarballs
    "*.tgz",
    // our own state
    STATE_DIR,
];

/// Build artifact directories excluded from a content fingerprint
///
/// Only matched against the first component of a relative path, so a
/// `src/build/` source folder is still fingerprinted.
pub const ROOT_EXCLUDES: &[&str] = &[
    "dist",
    "build",
    "out",
    "coverage",
    "lib-cov",
    ".next",
    ".turbo",
    ".cache",
];

/// Files and top-level directories whose modification time feeds the
/// metadata snapshot
pub const IMPORTANT_PATHS: &[&str] = &[
    "package.json",
    "tsconfig.json",
    "tsconfig.build.json",
    "babel.config.js",
    ".babelrc",
    "rollup.config.js",
    "rollup.config.mjs",
    "webpack.config.js",
    "vite.config.ts",
    "vite.config.js",
    "esbuild.config.js",
    "src",
    "lib",
    "dist",
    "build",
];

/// Hash placeholder for a file that could not be read
pub const UNREADABLE_SENTINEL: &str = "UNREADABLE";
