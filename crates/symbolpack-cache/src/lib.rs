mod fs_ops;
mod layout;
mod lockfile;

pub use fs_ops::{current_unix_timestamp, write_atomic};
pub use layout::{default_cache_root, CachedDependencies, PackageCache, CACHE_DIR_ENV};
pub use lockfile::{LockFile, LockStore};
