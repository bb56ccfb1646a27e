//! Mountinfo line parser for Linux systems.
//!
//! Parses lines in `/proc/[pid]/mountinfo` format. See
//! [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html)
//! for details on the structure.
//!
//! Only the fields needed to locate cgroup hierarchies are kept: the mount root, the mount point,
//! the filesystem type and the super options (which name the controllers of a cgroup v1 mount).

use std::borrow::Cow;

/// Represents the parts of a mountinfo line that matter for cgroup discovery.
#[derive(Debug, PartialEq, Eq)]
pub struct MountInfo<'a> {
    /// Root of the mount within the filesystem, with octal escapes decoded.
    pub root: Cow<'a, str>,
    /// Mount point relative to the process's root, with octal escapes decoded.
    pub mount_point: Cow<'a, str>,
    /// Filesystem type (e.g., `cgroup`, `cgroup2`).
    pub fs_type: &'a str,
    /// Source of the mount (e.g., device).
    pub source: &'a str,
    /// Superblock options, comma separated.
    pub super_options: &'a str,
}

impl MountInfo<'_> {
    /// Iterates over the comma-separated superblock options.
    ///
    /// For `cgroup` (v1) mounts these include the controller names, e.g. `rw,cpu,cpuacct`.
    pub fn super_options(&self) -> impl Iterator<Item = &str> {
        self.super_options.split(',').filter(|opt| !opt.is_empty())
    }
}

/// Named fields in a mountinfo line.
#[derive(Debug, Clone, Copy)]
pub enum MountInfoField {
    MountId,
    ParentId,
    MajorMinor,
    Root,
    MountPoint,
    FsType,
    Source,
    SuperOptions,
}

impl std::fmt::Display for MountInfoField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MountInfoField::MountId => "mount_id",
            MountInfoField::ParentId => "parent_id",
            MountInfoField::MajorMinor => "major:minor",
            MountInfoField::Root => "root",
            MountInfoField::MountPoint => "mount_point",
            MountInfoField::FsType => "fs_type",
            MountInfoField::Source => "source",
            MountInfoField::SuperOptions => "super_options",
        };
        write!(f, "{name}")
    }
}

/// Errors that may occur when parsing a mountinfo line.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum ParseError {
    #[error("missing separator ` - ` in line: `{0}`")]
    MissingSeparator(String),

    #[error("missing `{field}` in pre-separator section of line: `{line}`")]
    MissingPreSeparatorField { field: MountInfoField, line: String },

    #[error("missing `{field}` in post-separator section of line: `{line}`")]
    MissingPostSeparatorField { field: MountInfoField, line: String },
}

const PRE_SEPARATOR_FIELDS: [MountInfoField; 5] = [
    MountInfoField::MountId,
    MountInfoField::ParentId,
    MountInfoField::MajorMinor,
    MountInfoField::Root,
    MountInfoField::MountPoint,
];

const POST_SEPARATOR_FIELDS: [MountInfoField; 3] = [
    MountInfoField::FsType,
    MountInfoField::Source,
    MountInfoField::SuperOptions,
];

/// Parses a single line of mountinfo data.
///
/// # Errors
///
/// Returns [`ParseError`] variants for a missing ` - ` separator or missing required fields.
pub fn parse_mount_info_line(line: &str) -> Result<MountInfo<'_>, ParseError> {
    let (pre, post) = line
        .split_once(" - ")
        .ok_or_else(|| ParseError::MissingSeparator(line.trim_end().to_owned()))?;

    let mut pre_values = [""; 5];
    let mut pre_fields = pre.split_whitespace();
    for (slot, field) in pre_values.iter_mut().zip(PRE_SEPARATOR_FIELDS) {
        *slot = pre_fields
            .next()
            .ok_or_else(|| ParseError::MissingPreSeparatorField {
                field,
                line: line.trim_end().to_owned(),
            })?;
    }
    // Optional fields (e.g. `shared:20`) follow the mount point and are not needed.

    let mut post_values = [""; 3];
    let mut post_fields = post.split_whitespace();
    for (slot, field) in post_values.iter_mut().zip(POST_SEPARATOR_FIELDS) {
        *slot = post_fields
            .next()
            .ok_or_else(|| ParseError::MissingPostSeparatorField {
                field,
                line: line.trim_end().to_owned(),
            })?;
    }

    let [_, _, _, root, mount_point] = pre_values;
    let [fs_type, source, super_options] = post_values;

    Ok(MountInfo {
        root: unescape_octal(root),
        mount_point: unescape_octal(mount_point),
        fs_type,
        source,
        super_options,
    })
}

/// Decodes the `\ooo` octal escapes the kernel uses for space, tab, newline and backslash in
/// mountinfo paths.
fn unescape_octal(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }

    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let value =
                (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3
        && (b'0'..=b'3').contains(&digits[0])
        && digits[1..].iter().all(|d| (b'0'..=b'7').contains(d))
}
