use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Host keys that can be bound to console commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKey {
    Pause,
    F(u8),
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostKey::Pause => f.write_str("PAUSE"),
            HostKey::F(n) => write!(f, "F{n}"),
        }
    }
}

impl FromStr for HostKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper == "PAUSE" {
            return Ok(HostKey::Pause);
        }
        upper
            .strip_prefix('F')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=15).contains(n))
            .map(HostKey::F)
            .ok_or_else(|| format!("unknown host key: {s}"))
    }
}

/// Binding table from host keys to console command lines.
#[derive(Debug, Clone)]
pub struct HotKeys {
    bindings: HashMap<HostKey, String>,
}

impl HotKeys {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    pub fn bind(&mut self, key: HostKey, command: impl Into<String>) {
        self.bindings.insert(key, command.into());
    }

    pub fn unbind(&mut self, key: HostKey) -> bool {
        self.bindings.remove(&key).is_some()
    }

    pub fn command_for(&self, key: HostKey) -> Option<&str> {
        self.bindings.get(&key).map(String::as_str)
    }
}

impl Default for HotKeys {
    /// `PAUSE` toggles pause, `F9` toggles throttling.
    fn default() -> Self {
        let mut keys = Self::empty();
        keys.bind(HostKey::Pause, "pause");
        keys.bind(HostKey::F(9), "throttle");
        keys
    }
}
