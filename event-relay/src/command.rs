//! Canonical commands sent to the SDS node, one shape per downstream endpoint.

use serde::Serialize;

/// A resource node was created on chain and should be activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivatedPp {
    /// Node address under the destination prefix.
    pub p2p_address: String,
    /// Hex encoded Ed25519 public key of the node.
    pub p2p_pubkey: String,
    /// Ozone limit delta caused by the stake.
    pub ozone_limit_changes: String,
    /// Hash of the emitting transaction.
    pub tx_hash: String,
}

/// A resource node's stake changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedStakePp {
    /// Node address under the destination prefix.
    pub p2p_address: String,
    /// Ozone limit delta caused by the stake change.
    pub ozone_limit_changes: String,
    /// Whether the stake was increased, as the text the chain reported.
    pub incr_stake: String,
    /// Hash of the emitting transaction.
    pub tx_hash: String,
}

/// A resource node started unbonding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnbondingPp {
    /// Node address under the destination prefix.
    pub p2p_address: String,
    /// Ozone limit delta caused by the unbonding.
    pub ozone_limit_changes: String,
    /// When the unbonding matures.
    pub unbonding_mature_time: String,
    /// Hash of the emitting transaction.
    pub tx_hash: String,
}

/// A resource node was removed or finished unbonding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeactivatedPp {
    /// Node address under the destination prefix.
    pub p2p_address: String,
}

/// An indexing node's stake changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedStakeSp {
    /// Node address under the destination prefix.
    pub p2p_address: String,
    /// Ozone limit delta caused by the stake change.
    pub ozone_limit_changes: String,
    /// Whether the stake was increased, as the text the chain reported.
    pub incr_stake: String,
    /// Hash of the emitting transaction.
    pub tx_hash: String,
}

/// An indexing node collected enough votes to become bonded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivatedSp {
    /// Node address under the destination prefix.
    pub p2p_address: String,
    /// Hash of the emitting transaction.
    pub tx_hash: String,
}

/// A wallet prepaid for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prepaid {
    /// Address of the paying wallet.
    pub wallet_address: String,
    /// Amount of ozone purchased.
    pub purchased_uoz: String,
    /// Hash of the emitting transaction.
    pub tx_hash: String,
}

/// A file upload was reported on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Uploaded {
    /// Address of the reporting node.
    pub reporter_address: String,
    /// Address of the uploading wallet.
    pub uploader_address: String,
    /// Hash of the uploaded file.
    pub file_hash: String,
    /// Hash of the emitting transaction.
    pub tx_hash: String,
}

/// Traffic volume for an epoch was reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeReported {
    /// The reported epoch.
    pub epoch: String,
}

/// Any command the relay can forward.
///
/// Serializes as the bare body of the wrapped command, without a variant tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Command {
    /// Sent to `/pp/activated`.
    ActivatedPp(ActivatedPp),
    /// Sent to `/pp/updatedStake`.
    UpdatedStakePp(UpdatedStakePp),
    /// Sent to `/pp/unbonding`.
    UnbondingPp(UnbondingPp),
    /// Sent to `/pp/deactivated`.
    DeactivatedPp(DeactivatedPp),
    /// Sent to `/chain/updatedStake`.
    UpdatedStakeSp(UpdatedStakeSp),
    /// Sent to `/chain/activated`.
    ActivatedSp(ActivatedSp),
    /// Sent to `/pp/prepaid`.
    Prepaid(Prepaid),
    /// Sent to `/pp/uploaded`.
    Uploaded(Uploaded),
    /// Sent to `/volume/reported`.
    VolumeReported(VolumeReported),
}

impl Command {
    /// Path of the SDS endpoint that accepts this command.
    pub fn path(&self) -> &'static str {
        match self {
            Command::ActivatedPp(_) => "/pp/activated",
            Command::UpdatedStakePp(_) => "/pp/updatedStake",
            Command::UnbondingPp(_) => "/pp/unbonding",
            Command::DeactivatedPp(_) => "/pp/deactivated",
            Command::UpdatedStakeSp(_) => "/chain/updatedStake",
            Command::ActivatedSp(_) => "/chain/activated",
            Command::Prepaid(_) => "/pp/prepaid",
            Command::Uploaded(_) => "/pp/uploaded",
            Command::VolumeReported(_) => "/volume/reported",
        }
    }
}
