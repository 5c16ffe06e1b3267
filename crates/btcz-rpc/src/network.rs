//! Mainnet and testnet selection.

use std::fmt;

/// Chain the daemon is configured for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NetworkMode {
    /// The production chain.
    #[default]
    Mainnet,
    /// The test chain, selected by `testnet=1` in the daemon configuration.
    Testnet,
}

impl NetworkMode {
    /// Leading characters of transparent private keys on this chain.
    #[must_use]
    pub const fn transparent_key_prefixes(self) -> &'static [char] {
        match self {
            Self::Mainnet => &['5', 'K', 'L'],
            Self::Testnet => &['9', 'c'],
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        })
    }
}
