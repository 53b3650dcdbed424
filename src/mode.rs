//! Open mode parsing
//!
//! A session's permissions come from a mode string. Recognized tokens:
//!
//! | Token          | Grants        |
//! |----------------|---------------|
//! | `r`, `read`    | read          |
//! | `w`, `write`   | write         |
//! | `a`, `append`  | write         |
//! | `a+`, `both`   | read + write  |
//!
//! Tokens may be combined with whitespace, `,` or `|`. Each token must match
//! exactly (case-insensitive), so strings such as `rw`, `r+` or `rb` are
//! unknown tokens. Unknown tokens grant nothing; a session opened with no
//! usable token can neither read nor write.

use std::fmt;

/// Permissions held by an open session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode {
    can_read: bool,
    can_write: bool,
}

impl OpenMode {
    pub const READ: OpenMode = OpenMode { can_read: true, can_write: false };
    pub const WRITE: OpenMode = OpenMode { can_read: false, can_write: true };
    pub const BOTH: OpenMode = OpenMode { can_read: true, can_write: true };

    /// Parse a mode string, ignoring tokens it does not recognize
    pub fn parse(mode: &str) -> Self {
        let mut parsed = OpenMode::default();

        for token in mode
            .split(|c: char| c.is_whitespace() || c == ',' || c == '|')
            .filter(|t| !t.is_empty())
        {
            match token.to_ascii_lowercase().as_str() {
                "r" | "read" => parsed.can_read = true,
                "w" | "write" | "a" | "append" => parsed.can_write = true,
                "a+" | "both" => {
                    parsed.can_read = true;
                    parsed.can_write = true;
                }
                other => tracing::warn!(token = other, "ignoring unknown open mode token"),
            }
        }

        parsed
    }

    pub fn can_read(&self) -> bool {
        self.can_read
    }

    pub fn can_write(&self) -> bool {
        self.can_write
    }

    /// False when the mode grants neither read nor write
    pub fn is_usable(&self) -> bool {
        self.can_read || self.can_write
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match (self.can_read, self.can_write) {
            (true, true) => "both",
            (true, false) => "read",
            (false, true) => "write",
            (false, false) => "none",
        };
        f.write_str(label)
    }
}
