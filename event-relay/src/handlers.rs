//! # Event Handlers
//!
//! Every subscribed event category is represented by an [`EventKind`]. Each kind resolves to a
//! [`Handler`]: either a pure function turning the event's attributes into a [`Command`], or
//! [`Handler::Unimplemented`] for categories that are observed but have no downstream contract yet.
//!
//! Handlers never forward anything themselves and never log. A missing or malformed attribute is
//! returned as a [`HandlerError`] so that no command is built from partial data.

use snafu::{ResultExt, Snafu};

use crate::address::{
    decode_public_key,
    encode_public_key,
    translate_address,
    AddressPrefix,
    CodecError,
};
use crate::command::{
    ActivatedPp,
    ActivatedSp,
    Command,
    DeactivatedPp,
    Prepaid,
    UnbondingPp,
    UpdatedStakePp,
    UpdatedStakeSp,
    Uploaded,
    VolumeReported,
};
use crate::event::{AttributeError, ResultEvent};

/// Candidate status reported by `indexing_node_reg_vote` once the candidate is bonded.
pub const BONDED_STATUS: &str = "Bonded";

/// Errors raised while turning an event into a command.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum HandlerError {
    /// A required attribute was absent or malformed.
    #[snafu(display("{category} event dropped: {source}"))]
    Attribute {
        /// The event category being handled.
        category: &'static str,
        /// The underlying attribute error.
        source: AttributeError,
    },

    /// An address or key attribute could not be decoded.
    #[snafu(display("{category} event dropped: {source}"))]
    Codec {
        /// The event category being handled.
        category: &'static str,
        /// The underlying codec error.
        source: CodecError,
    },
}

/// Read-only configuration shared by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerContext {
    /// Prefix that node addresses are re-encoded under before forwarding.
    pub p2p_address_prefix: AddressPrefix,
}

/// What a handler decided to do with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Forward the command downstream.
    Forward(Command),
    /// Drop the event without error.
    Skip {
        /// Why the event was skipped.
        reason: &'static str,
    },
}

/// Signature of a handler that can produce a command.
pub type HandlerFn = fn(&ResultEvent, &HandlerContext) -> Result<Outcome, HandlerError>;

/// How a category is handled.
#[derive(Debug, Clone, Copy)]
pub enum Handler {
    /// Builds a command from the event.
    Forward(HandlerFn),
    /// The category is only observed; nothing is forwarded for it.
    Unimplemented,
}

/// Every event category the relay subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `create_resource_node`
    CreateResourceNode,
    /// `update_resource_node_stake`
    UpdateResourceNodeStake,
    /// `unbonding_resource_node`
    UnbondingResourceNode,
    /// `remove_resource_node`
    RemoveResourceNode,
    /// `complete_unbonding_resource_node`
    CompleteUnbondingResourceNode,
    /// `create_indexing_node`
    CreateIndexingNode,
    /// `update_indexing_node_stake`
    UpdateIndexingNodeStake,
    /// `unbonding_indexing_node`
    UnbondingIndexingNode,
    /// `remove_indexing_node`
    RemoveIndexingNode,
    /// `complete_unbonding_indexing_node`
    CompleteUnbondingIndexingNode,
    /// `indexing_node_reg_vote`
    IndexingNodeRegVote,
    /// `SdsPrepayTx`
    Prepay,
    /// `FileUploadTx`
    FileUpload,
    /// `volume_report`
    VolumeReport,
}

impl EventKind {
    /// All categories, in the order they are subscribed.
    pub const ALL: [EventKind; 14] = [
        EventKind::CreateResourceNode,
        EventKind::UpdateResourceNodeStake,
        EventKind::UnbondingResourceNode,
        EventKind::RemoveResourceNode,
        EventKind::CompleteUnbondingResourceNode,
        EventKind::CreateIndexingNode,
        EventKind::UpdateIndexingNodeStake,
        EventKind::UnbondingIndexingNode,
        EventKind::RemoveIndexingNode,
        EventKind::CompleteUnbondingIndexingNode,
        EventKind::IndexingNodeRegVote,
        EventKind::Prepay,
        EventKind::FileUpload,
        EventKind::VolumeReport,
    ];

    /// The `message.action` value identifying this category.
    pub fn action(self) -> &'static str {
        match self {
            EventKind::CreateResourceNode => "create_resource_node",
            EventKind::UpdateResourceNodeStake => "update_resource_node_stake",
            EventKind::UnbondingResourceNode => "unbonding_resource_node",
            EventKind::RemoveResourceNode => "remove_resource_node",
            EventKind::CompleteUnbondingResourceNode => "complete_unbonding_resource_node",
            EventKind::CreateIndexingNode => "create_indexing_node",
            EventKind::UpdateIndexingNodeStake => "update_indexing_node_stake",
            EventKind::UnbondingIndexingNode => "unbonding_indexing_node",
            EventKind::RemoveIndexingNode => "remove_indexing_node",
            EventKind::CompleteUnbondingIndexingNode => "complete_unbonding_indexing_node",
            EventKind::IndexingNodeRegVote => "indexing_node_reg_vote",
            EventKind::Prepay => "SdsPrepayTx",
            EventKind::FileUpload => "FileUploadTx",
            EventKind::VolumeReport => "volume_report",
        }
    }

    /// The subscription filter expression for this category.
    pub fn filter(self) -> String {
        format!("message.action='{}'", self.action())
    }

    /// The handler bound to this category.
    ///
    /// Completed unbonding is handled exactly like removal, for both node types.
    pub fn handler(self) -> Handler {
        match self {
            EventKind::CreateResourceNode => Handler::Forward(create_resource_node),
            EventKind::UpdateResourceNodeStake => Handler::Forward(update_resource_node_stake),
            EventKind::UnbondingResourceNode => Handler::Forward(unbonding_resource_node),
            EventKind::RemoveResourceNode | EventKind::CompleteUnbondingResourceNode => {
                Handler::Forward(remove_resource_node)
            }
            EventKind::UpdateIndexingNodeStake => Handler::Forward(update_indexing_node_stake),
            EventKind::IndexingNodeRegVote => Handler::Forward(indexing_node_reg_vote),
            EventKind::Prepay => Handler::Forward(prepay),
            EventKind::FileUpload => Handler::Forward(file_upload),
            EventKind::VolumeReport => Handler::Forward(volume_report),
            // TODO: forward indexing node lifecycle events once the SDS node exposes endpoints for them
            EventKind::CreateIndexingNode
            | EventKind::UnbondingIndexingNode
            | EventKind::RemoveIndexingNode
            | EventKind::CompleteUnbondingIndexingNode => Handler::Unimplemented,
        }
    }
}

fn attribute(
    event: &ResultEvent,
    category: &'static str,
    key: &str,
) -> Result<String, HandlerError> {
    event
        .attribute(category, key)
        .map(str::to_string)
        .context(AttributeSnafu { category })
}

fn tx_hash(event: &ResultEvent, category: &'static str) -> Result<String, HandlerError> {
    event
        .tx_hash()
        .map(str::to_string)
        .context(AttributeSnafu { category })
}

/// Reads a bech32 node address and re-encodes it under the destination prefix.
fn node_address(
    event: &ResultEvent,
    category: &'static str,
    key: &str,
    context: &HandlerContext,
) -> Result<String, HandlerError> {
    let text = attribute(event, category, key)?;
    translate_address(&text, context.p2p_address_prefix).context(CodecSnafu { category })
}

fn create_resource_node(
    event: &ResultEvent,
    context: &HandlerContext,
) -> Result<Outcome, HandlerError> {
    const CATEGORY: &str = "create_resource_node";

    let p2p_address = node_address(event, CATEGORY, "network_address", context)?;
    let pub_key = attribute(event, CATEGORY, "pub_key")?;
    let p2p_pubkey = decode_public_key(&pub_key).context(CodecSnafu { category: CATEGORY })?;

    Ok(Outcome::Forward(Command::ActivatedPp(ActivatedPp {
        p2p_address,
        p2p_pubkey: encode_public_key(&p2p_pubkey),
        ozone_limit_changes: attribute(event, CATEGORY, "ozone_limit_changes")?,
        tx_hash: tx_hash(event, CATEGORY)?,
    })))
}

fn update_resource_node_stake(
    event: &ResultEvent,
    context: &HandlerContext,
) -> Result<Outcome, HandlerError> {
    const CATEGORY: &str = "update_resource_node_stake";

    Ok(Outcome::Forward(Command::UpdatedStakePp(UpdatedStakePp {
        p2p_address: node_address(event, CATEGORY, "network_address", context)?,
        ozone_limit_changes: attribute(event, CATEGORY, "ozone_limit_changes")?,
        incr_stake: attribute(event, CATEGORY, "incr_stake")?,
        tx_hash: tx_hash(event, CATEGORY)?,
    })))
}

fn unbonding_resource_node(
    event: &ResultEvent,
    context: &HandlerContext,
) -> Result<Outcome, HandlerError> {
    const CATEGORY: &str = "unbonding_resource_node";

    Ok(Outcome::Forward(Command::UnbondingPp(UnbondingPp {
        p2p_address: node_address(event, CATEGORY, "resource_node", context)?,
        ozone_limit_changes: attribute(event, CATEGORY, "ozone_limit_changes")?,
        unbonding_mature_time: attribute(event, CATEGORY, "unbonding_mature_time")?,
        tx_hash: tx_hash(event, CATEGORY)?,
    })))
}

/// Shared by `remove_resource_node` and `complete_unbonding_resource_node`, so the attributes are
/// read from whichever category the event carries.
fn remove_resource_node(
    event: &ResultEvent,
    context: &HandlerContext,
) -> Result<Outcome, HandlerError> {
    let category = if event
        .attribute(EventKind::CompleteUnbondingResourceNode.action(), "resource_node")
        .is_ok()
    {
        EventKind::CompleteUnbondingResourceNode.action()
    } else {
        EventKind::RemoveResourceNode.action()
    };

    let p2p_address = node_address(event, category, "resource_node", context)?;
    tx_hash(event, category)?;

    Ok(Outcome::Forward(Command::DeactivatedPp(DeactivatedPp {
        p2p_address,
    })))
}

fn update_indexing_node_stake(
    event: &ResultEvent,
    context: &HandlerContext,
) -> Result<Outcome, HandlerError> {
    const CATEGORY: &str = "update_indexing_node_stake";

    Ok(Outcome::Forward(Command::UpdatedStakeSp(UpdatedStakeSp {
        p2p_address: node_address(event, CATEGORY, "network_address", context)?,
        ozone_limit_changes: attribute(event, CATEGORY, "ozone_limit_changes")?,
        incr_stake: attribute(event, CATEGORY, "incr_stake")?,
        tx_hash: tx_hash(event, CATEGORY)?,
    })))
}

fn indexing_node_reg_vote(
    event: &ResultEvent,
    context: &HandlerContext,
) -> Result<Outcome, HandlerError> {
    const CATEGORY: &str = "indexing_node_reg_vote";

    let p2p_address = node_address(event, CATEGORY, "candidate_network_address", context)?;
    if attribute(event, CATEGORY, "candidate_status")? != BONDED_STATUS {
        return Ok(Outcome::Skip {
            reason: "the candidate needs more votes before being considered active",
        });
    }

    Ok(Outcome::Forward(Command::ActivatedSp(ActivatedSp {
        p2p_address,
        tx_hash: tx_hash(event, CATEGORY)?,
    })))
}

fn prepay(event: &ResultEvent, _context: &HandlerContext) -> Result<Outcome, HandlerError> {
    const CATEGORY: &str = "Prepay";

    Ok(Outcome::Forward(Command::Prepaid(Prepaid {
        wallet_address: attribute(event, CATEGORY, "sender")?,
        purchased_uoz: attribute(event, CATEGORY, "purchased")?,
        tx_hash: tx_hash(event, CATEGORY)?,
    })))
}

fn file_upload(event: &ResultEvent, _context: &HandlerContext) -> Result<Outcome, HandlerError> {
    const CATEGORY: &str = "FileUpload";

    Ok(Outcome::Forward(Command::Uploaded(Uploaded {
        reporter_address: attribute(event, CATEGORY, "reporter")?,
        uploader_address: attribute(event, CATEGORY, "uploader")?,
        file_hash: attribute(event, CATEGORY, "file_hash")?,
        tx_hash: tx_hash(event, CATEGORY)?,
    })))
}

fn volume_report(event: &ResultEvent, _context: &HandlerContext) -> Result<Outcome, HandlerError> {
    Ok(Outcome::Forward(Command::VolumeReported(VolumeReported {
        epoch: attribute(event, "volume_report", "epoch")?,
    })))
}

#[cfg(test)]
pub(crate) mod tests {
    use ed25519_dalek::SigningKey;

    use super::*;
    use crate::address::{Address, ADDRESS_LENGTH};

    pub(crate) fn context() -> HandlerContext {
        HandlerContext {
            p2p_address_prefix: "stsds".parse().unwrap(),
        }
    }

    pub(crate) fn node() -> Address {
        Address::new([0x42; ADDRESS_LENGTH])
    }

    /// The node address as the chain reports it.
    pub(crate) fn chain_address() -> String {
        node().to_bech32("st".parse().unwrap()).unwrap()
    }

    /// The node address as the SDS node expects it.
    pub(crate) fn sds_address() -> String {
        node().to_bech32(context().p2p_address_prefix).unwrap()
    }

    pub(crate) fn pubkey_hex() -> String {
        hex::encode(SigningKey::from_bytes(&[9; 32]).verifying_key().as_bytes())
    }

    /// A well formed event for every forwarding category, with all of its required attributes.
    pub(crate) fn sample_event(kind: EventKind) -> ResultEvent {
        let address = chain_address();
        let attributes: Vec<(&str, String)> = match kind {
            EventKind::CreateResourceNode => vec![
                ("create_resource_node.network_address", address),
                ("create_resource_node.pub_key", pubkey_hex()),
                ("create_resource_node.ozone_limit_changes", "100".into()),
                ("tx.hash", "ABC123".into()),
            ],
            EventKind::UpdateResourceNodeStake => vec![
                ("update_resource_node_stake.network_address", address),
                ("update_resource_node_stake.ozone_limit_changes", "50".into()),
                ("update_resource_node_stake.incr_stake", "true".into()),
                ("tx.hash", "ABC123".into()),
            ],
            EventKind::UnbondingResourceNode => vec![
                ("unbonding_resource_node.resource_node", address),
                ("unbonding_resource_node.ozone_limit_changes", "-50".into()),
                (
                    "unbonding_resource_node.unbonding_mature_time",
                    "2026-10-17T00:00:00Z".into(),
                ),
                ("tx.hash", "ABC123".into()),
            ],
            EventKind::RemoveResourceNode => vec![
                ("remove_resource_node.resource_node", address),
                ("tx.hash", "ABC123".into()),
            ],
            EventKind::CompleteUnbondingResourceNode => vec![
                ("complete_unbonding_resource_node.resource_node", address),
                ("tx.hash", "ABC123".into()),
            ],
            EventKind::UpdateIndexingNodeStake => vec![
                ("update_indexing_node_stake.network_address", address),
                ("update_indexing_node_stake.ozone_limit_changes", "7".into()),
                ("update_indexing_node_stake.incr_stake", "false".into()),
                ("tx.hash", "ABC123".into()),
            ],
            EventKind::IndexingNodeRegVote => vec![
                ("indexing_node_reg_vote.candidate_network_address", address),
                ("indexing_node_reg_vote.candidate_status", BONDED_STATUS.into()),
                ("tx.hash", "ABC123".into()),
            ],
            EventKind::Prepay => vec![
                ("Prepay.sender", "st1wallet".into()),
                ("Prepay.purchased", "1000".into()),
                ("tx.hash", "ABC123".into()),
            ],
            EventKind::FileUpload => vec![
                ("FileUpload.reporter", "st1reporter".into()),
                ("FileUpload.uploader", "st1uploader".into()),
                ("FileUpload.file_hash", "v05ahm51".into()),
                ("tx.hash", "ABC123".into()),
            ],
            EventKind::VolumeReport => vec![("volume_report.epoch", "42".into())],
            EventKind::CreateIndexingNode
            | EventKind::UnbondingIndexingNode
            | EventKind::RemoveIndexingNode
            | EventKind::CompleteUnbondingIndexingNode => vec![("tx.hash", "ABC123".into())],
        };

        ResultEvent::new(
            kind.filter(),
            attributes
                .into_iter()
                .map(|(key, value)| (key, vec![value])),
        )
    }

    fn handle(kind: EventKind, event: &ResultEvent) -> Result<Outcome, HandlerError> {
        match kind.handler() {
            Handler::Forward(handler) => handler(event, &context()),
            Handler::Unimplemented => panic!("{kind:?} has no handler"),
        }
    }

    fn forwarding_kinds() -> impl Iterator<Item = EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(|kind| matches!(kind.handler(), Handler::Forward(_)))
    }

    #[test]
    fn filters_match_the_subscribed_actions() {
        let filters: Vec<String> = EventKind::ALL.iter().map(|kind| kind.filter()).collect();

        assert_eq!(filters[0], "message.action='create_resource_node'");
        assert_eq!(filters[11], "message.action='SdsPrepayTx'");
        assert_eq!(filters[13], "message.action='volume_report'");
        assert_eq!(filters.len(), 14);
    }

    #[test]
    fn indexing_node_lifecycle_events_are_unimplemented() {
        let unimplemented: Vec<EventKind> = EventKind::ALL
            .into_iter()
            .filter(|kind| matches!(kind.handler(), Handler::Unimplemented))
            .collect();

        assert_eq!(
            unimplemented,
            vec![
                EventKind::CreateIndexingNode,
                EventKind::UnbondingIndexingNode,
                EventKind::RemoveIndexingNode,
                EventKind::CompleteUnbondingIndexingNode,
            ]
        );
    }

    #[test]
    fn completed_unbonding_is_handled_like_removal() {
        let removed = handle(
            EventKind::RemoveResourceNode,
            &sample_event(EventKind::RemoveResourceNode),
        )
        .unwrap();
        let completed = handle(
            EventKind::CompleteUnbondingResourceNode,
            &sample_event(EventKind::CompleteUnbondingResourceNode),
        )
        .unwrap();

        assert_eq!(removed, completed);
        assert_eq!(
            removed,
            Outcome::Forward(Command::DeactivatedPp(DeactivatedPp {
                p2p_address: sds_address()
            }))
        );
    }

    #[test]
    fn we_can_build_an_activation_from_a_created_resource_node() {
        let outcome = handle(
            EventKind::CreateResourceNode,
            &sample_event(EventKind::CreateResourceNode),
        )
        .unwrap();

        assert_eq!(
            outcome,
            Outcome::Forward(Command::ActivatedPp(ActivatedPp {
                p2p_address: sds_address(),
                p2p_pubkey: pubkey_hex(),
                ozone_limit_changes: "100".to_string(),
                tx_hash: "ABC123".to_string(),
            }))
        );
    }

    #[test]
    fn we_can_build_every_forwarding_command() {
        let expected = [
            (EventKind::UpdateResourceNodeStake, "/pp/updatedStake"),
            (EventKind::UnbondingResourceNode, "/pp/unbonding"),
            (EventKind::UpdateIndexingNodeStake, "/chain/updatedStake"),
            (EventKind::IndexingNodeRegVote, "/chain/activated"),
            (EventKind::Prepay, "/pp/prepaid"),
            (EventKind::FileUpload, "/pp/uploaded"),
            (EventKind::VolumeReport, "/volume/reported"),
        ];

        for (kind, path) in expected {
            match handle(kind, &sample_event(kind)).unwrap() {
                Outcome::Forward(command) => assert_eq!(command.path(), path, "{kind:?}"),
                outcome => panic!("{kind:?} produced {outcome:?}"),
            }
        }
    }

    #[test]
    fn we_can_map_unbonding_attributes() {
        let outcome = handle(
            EventKind::UnbondingResourceNode,
            &sample_event(EventKind::UnbondingResourceNode),
        )
        .unwrap();

        assert_eq!(
            outcome,
            Outcome::Forward(Command::UnbondingPp(UnbondingPp {
                p2p_address: sds_address(),
                ozone_limit_changes: "-50".to_string(),
                unbonding_mature_time: "2026-10-17T00:00:00Z".to_string(),
                tx_hash: "ABC123".to_string(),
            }))
        );
    }

    #[test]
    fn we_cannot_build_a_command_with_any_required_attribute_missing() {
        for kind in forwarding_kinds() {
            let complete = sample_event(kind);
            for key in complete.events.keys() {
                let mut event = complete.clone();
                event.events.remove(key);

                assert!(
                    matches!(handle(kind, &event), Err(HandlerError::Attribute { .. })),
                    "{kind:?} without {key}"
                );
            }
        }
    }

    #[test]
    fn we_cannot_build_a_command_from_an_empty_value_list() {
        let mut event = sample_event(EventKind::CreateResourceNode);
        event
            .events
            .insert("create_resource_node.pub_key".to_string(), vec![]);

        assert!(matches!(
            handle(EventKind::CreateResourceNode, &event),
            Err(HandlerError::Attribute {
                category: "create_resource_node",
                source: AttributeError::MissingAttribute { .. }
            })
        ));
    }

    #[test]
    fn we_cannot_build_a_command_from_malformed_chain_data() {
        let mut bad_address = sample_event(EventKind::UpdateResourceNodeStake);
        bad_address.events.insert(
            "update_resource_node_stake.network_address".to_string(),
            vec!["addr1".to_string()],
        );
        assert!(matches!(
            handle(EventKind::UpdateResourceNodeStake, &bad_address),
            Err(HandlerError::Codec {
                source: CodecError::InvalidAddressEncoding { .. },
                ..
            })
        ));

        let mut bad_hex = sample_event(EventKind::CreateResourceNode);
        bad_hex.events.insert(
            "create_resource_node.pub_key".to_string(),
            vec!["not hex".to_string()],
        );
        assert!(matches!(
            handle(EventKind::CreateResourceNode, &bad_hex),
            Err(HandlerError::Codec {
                source: CodecError::InvalidHex { .. },
                ..
            })
        ));

        let mut short_key = sample_event(EventKind::CreateResourceNode);
        short_key.events.insert(
            "create_resource_node.pub_key".to_string(),
            vec!["abcd".to_string()],
        );
        assert!(matches!(
            handle(EventKind::CreateResourceNode, &short_key),
            Err(HandlerError::Codec {
                source: CodecError::InvalidKeyEncoding { .. },
                ..
            })
        ));
    }

    #[test]
    fn stake_increase_flags_are_forwarded_verbatim() {
        let mut event = sample_event(EventKind::UpdateResourceNodeStake);
        event.events.insert(
            "update_resource_node_stake.incr_stake".to_string(),
            vec!["True".to_string()],
        );

        assert_eq!(
            handle(EventKind::UpdateResourceNodeStake, &event).unwrap(),
            Outcome::Forward(Command::UpdatedStakePp(UpdatedStakePp {
                p2p_address: sds_address(),
                ozone_limit_changes: "50".to_string(),
                incr_stake: "True".to_string(),
                tx_hash: "ABC123".to_string(),
            }))
        );

        let outcome = handle(
            EventKind::UpdateIndexingNodeStake,
            &sample_event(EventKind::UpdateIndexingNodeStake),
        )
        .unwrap();
        assert_eq!(
            outcome,
            Outcome::Forward(Command::UpdatedStakeSp(UpdatedStakeSp {
                p2p_address: sds_address(),
                ozone_limit_changes: "7".to_string(),
                incr_stake: "false".to_string(),
                tx_hash: "ABC123".to_string(),
            }))
        );
    }

    #[test]
    fn votes_for_unbonded_candidates_are_skipped() {
        let mut event = sample_event(EventKind::IndexingNodeRegVote);
        event.events.insert(
            "indexing_node_reg_vote.candidate_status".to_string(),
            vec!["Unbonded".to_string()],
        );

        assert!(matches!(
            handle(EventKind::IndexingNodeRegVote, &event),
            Ok(Outcome::Skip { .. })
        ));
    }

    #[test]
    fn handlers_are_pure() {
        for kind in forwarding_kinds() {
            let event = sample_event(kind);

            assert_eq!(
                handle(kind, &event).unwrap(),
                handle(kind, &event).unwrap(),
                "{kind:?}"
            );
        }
    }
}
