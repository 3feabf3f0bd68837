use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Write operations a fee can be estimated for. Identifiers are the contract entrypoints
/// the operation ends up calling.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    #[serde(rename = "createToken")]
    CreateToken,

    #[serde(rename = "safeTransferFrom")]
    Transfer,

    #[serde(rename = "mint")]
    Mint,

    #[serde(rename = "burn")]
    Burn,

    #[serde(rename = "safeAdjustedBatchTransferFrom")]
    BatchTransfer,

    #[serde(rename = "mintBatch")]
    BatchMint,

    #[serde(rename = "burnBatch")]
    BatchBurn,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::CreateToken,
        Operation::Transfer,
        Operation::Mint,
        Operation::Burn,
        Operation::BatchTransfer,
        Operation::BatchMint,
        Operation::BatchBurn,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            Self::CreateToken => "createToken",
            Self::Transfer => "safeTransferFrom",
            Self::Mint => "mint",
            Self::Burn => "burn",
            Self::BatchTransfer => "safeAdjustedBatchTransferFrom",
            Self::BatchMint => "mintBatch",
            Self::BatchBurn => "burnBatch",
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Self::BatchTransfer | Self::BatchMint | Self::BatchBurn)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|x| x.identifier() == s)
            .ok_or_else(|| Error::UnknownOperation(s.to_string()))
    }
}
