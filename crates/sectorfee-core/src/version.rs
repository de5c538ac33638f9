//! Protocol version thresholds
//!
//! Every historical generation of the penalty/fee formulas coexists in one
//! binary; which one applies is purely a function of the evaluation epoch,
//! looked up in an epoch-ordered threshold table. Later entries override
//! earlier ones for epochs at or past their activation.

use serde::{Deserialize, Serialize};

use crate::epoch::{ChainEpoch, ExpirationRule};

/// Activation epoch of deadline-quantized expiration scheduling
pub const DEADLINE_QUANT_ACTIVATION: ChainEpoch = 2_383_680;

/// Activation epoch of the pledge-percentage termination fee and the
/// protocol daily fee
pub const PROOF_FEE_ACTIVATION: ChainEpoch = 4_878_840;

/// Which termination-penalty formula family is in force
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationFormula {
    /// Expected-reward spread: day rewards over the capped sector lifetime
    ExpectedReward,
    /// Pledge-percentage: 8.5% of pledge pro-rated by age, fault-fee floor
    PledgePercentage,
}

/// A formula generation of the protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// Launch rules: additive deadline offsets, expected-reward penalty
    Genesis,
    /// Deadline-quantized expirations, expected-reward penalty
    DeadlineQuant,
    /// Deadline-quantized expirations, pledge-percentage penalty, daily fee
    ProofFee,
}

impl ProtocolVersion {
    /// Expiration-to-date rule used by this generation
    pub fn expiration_rule(self) -> ExpirationRule {
        match self {
            Self::Genesis => ExpirationRule::AdditiveOffset,
            Self::DeadlineQuant | Self::ProofFee => ExpirationRule::DeadlineQuantized,
        }
    }

    /// Termination-penalty formula used by this generation
    pub fn termination_formula(self) -> TerminationFormula {
        match self {
            Self::Genesis | Self::DeadlineQuant => TerminationFormula::ExpectedReward,
            Self::ProofFee => TerminationFormula::PledgePercentage,
        }
    }
}

/// Epoch-ordered table of protocol version activations
#[derive(Clone, Debug)]
pub struct VersionSchedule {
    /// (activation epoch, version), ascending by epoch
    thresholds: Vec<(ChainEpoch, ProtocolVersion)>,
}

impl VersionSchedule {
    /// Builds a schedule; entries are sorted by activation epoch
    pub fn new(mut thresholds: Vec<(ChainEpoch, ProtocolVersion)>) -> Self {
        thresholds.sort_by_key(|&(epoch, _)| epoch);
        Self { thresholds }
    }

    /// The mainnet activation history
    pub fn mainnet() -> Self {
        Self::new(vec![
            (0, ProtocolVersion::Genesis),
            (DEADLINE_QUANT_ACTIVATION, ProtocolVersion::DeadlineQuant),
            (PROOF_FEE_ACTIVATION, ProtocolVersion::ProofFee),
        ])
    }

    /// Version in force at `epoch`: the last entry with threshold <= epoch.
    /// Epochs before the first threshold use the first entry.
    pub fn version_at(&self, epoch: ChainEpoch) -> ProtocolVersion {
        // negative offsets can precede genesis; stay on the oldest rules
        let mut current = self
            .thresholds
            .first()
            .map(|&(_, version)| version)
            .unwrap_or(ProtocolVersion::Genesis);
        for &(threshold, version) in &self.thresholds {
            if threshold <= epoch {
                current = version;
            } else {
                break;
            }
        }
        current
    }
}

impl Default for VersionSchedule {
    fn default() -> Self {
        Self::mainnet()
    }
}
