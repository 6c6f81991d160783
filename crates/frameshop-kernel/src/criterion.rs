use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Criterion {
    ReceiptsRunning,
    CoinbaseCountry,
    CoinbaseAccount,
    CoinbaseOne,
    PoapsOwned,
    All,
    Unknown(String),
}

impl Criterion {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "RECEIPTS_XYZ_ALL_TIME_RUNNING" => Criterion::ReceiptsRunning,
            "COINBASE_ONCHAIN_VERIFICATIONS_COUNTRY" => Criterion::CoinbaseCountry,
            "COINBASE_ONCHAIN_VERIFICATIONS_ACCOUNT" => Criterion::CoinbaseAccount,
            "COINBASE_ONCHAIN_VERIFICATIONS_ONE" => Criterion::CoinbaseOne,
            "POAPS_OWNED" => Criterion::PoapsOwned,
            "ALL" => Criterion::All,
            other => Criterion::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Criterion::ReceiptsRunning => "RECEIPTS_XYZ_ALL_TIME_RUNNING",
            Criterion::CoinbaseCountry => "COINBASE_ONCHAIN_VERIFICATIONS_COUNTRY",
            Criterion::CoinbaseAccount => "COINBASE_ONCHAIN_VERIFICATIONS_ACCOUNT",
            Criterion::CoinbaseOne => "COINBASE_ONCHAIN_VERIFICATIONS_ONE",
            Criterion::PoapsOwned => "POAPS_OWNED",
            Criterion::All => "ALL",
            Criterion::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Criterion::Unknown(_))
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
