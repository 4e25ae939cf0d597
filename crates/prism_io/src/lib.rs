//! Input/output: asynchronous IO requests served by lanes of worker threads,
//! plus helpers for reading and writing files.

pub mod fs;
pub mod queue;
pub mod request;

pub use fs::{Assigns, FileSystem, LocalFileSystem, MemoryFileSystem};
pub use queue::{IoConfig, IoQueue};
pub use request::{IoRequest, IoStatus};

use std::{fs as std_fs, io, path::Path};

/// Reads the whole text file at the given path.
pub fn read_text_file(file_path: impl AsRef<Path>) -> io::Result<String> {
    std_fs::read_to_string(file_path)
}

/// Parses the RON file at the given path, such as a graphics configuration
/// file, into a `T`. The error names the file that could not be read or
/// parsed.
#[cfg(feature = "ron")]
pub fn parse_ron_file<T>(file_path: impl AsRef<Path>) -> anyhow::Result<T>
where
    T: for<'de> serde::de::Deserialize<'de>,
{
    use anyhow::Context;

    let file_path = file_path.as_ref();
    let text = read_text_file(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    ron::from_str(&text).with_context(|| format!("Failed to parse {}", file_path.display()))
}

/// Writes `value` as pretty-printed RON to the given path, replacing any
/// existing file. Missing parent directories are created.
#[cfg(feature = "ron")]
pub fn write_ron_file<T>(value: &T, file_path: impl AsRef<Path>) -> anyhow::Result<()>
where
    T: serde::ser::Serialize,
{
    use anyhow::Context;

    let file_path = file_path.as_ref();
    if let Some(parent) = file_path.parent() {
        std_fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let text = ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())?;
    std_fs::write(file_path, text)
        .with_context(|| format!("Failed to write {}", file_path.display()))
}
