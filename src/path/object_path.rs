use std::fmt;

/// Normalized absolute path of an object inside a bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    /// Path segments (e.g., ["prefix", "file.txt"])
    segments: Vec<String>,
    /// Whether the path was written with a trailing slash (a pseudo-directory)
    is_dir: bool,
}

impl ObjectPath {
    /// The bucket root, `/`
    pub fn root() -> Self {
        ObjectPath {
            segments: Vec::new(),
            is_dir: true,
        }
    }

    /// Parse a path string. Leading slashes are implied, `.` is dropped and `..`
    /// never climbs above the bucket root.
    pub fn parse(path: &str) -> Self {
        Self::root().join(path)
    }

    /// Get the path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Check if this is the bucket root
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check if the path names a pseudo-directory
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Get the parent path
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut parent_segments = self.segments.clone();
            parent_segments.pop();
            Some(ObjectPath {
                segments: parent_segments,
                is_dir: true,
            })
        }
    }

    /// Get the last segment (filename)
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    /// Join this path with another. An absolute `other` starts over from the root.
    pub fn join(&self, other: &str) -> Self {
        let mut new_segments = if other.starts_with('/') {
            Vec::new()
        } else {
            self.segments.clone()
        };

        for segment in other.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            } else if segment == ".." {
                new_segments.pop();
            } else {
                new_segments.push(segment.to_string());
            }
        }

        let is_dir = if other.is_empty() {
            self.is_dir
        } else {
            new_segments.is_empty() || other.ends_with('/') || other.ends_with("/.")
        };

        ObjectPath {
            segments: new_segments,
            is_dir,
        }
    }

    /// The same path without a trailing-slash directory marker. The root stays a
    /// directory.
    pub fn without_dir_marker(self) -> Self {
        let is_dir = self.segments.is_empty();
        ObjectPath { is_dir, ..self }
    }

    /// Object name as stored in the bucket: no leading slash, trailing slash kept
    /// for pseudo-directories
    pub fn object_name(&self) -> String {
        let mut name = self.segments.join("/");
        if self.is_dir && !name.is_empty() {
            name.push('/');
        }
        name
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.object_name())
    }
}
