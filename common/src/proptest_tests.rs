use crate::error::LedgerError;
use crate::ledger::InMemoryLedger;
use crate::locator::{Locator, StateRef};
use crate::node::{FulfillmentNode, TimeDirection};
use crate::resolver::{Choices, UpdateBuilder};
use crate::state::State;
use crate::update::{LedgerUpdate, SignedUpdate};
use crate::EngineConfig;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ed25519_dalek::SigningKey;
use proptest::prelude::*;
use proptest::sample::Index;

const MAX_NODES: usize = 12;

/// One node of a generated graph, before its links are pointed at later nodes.
#[derive(Debug, Clone)]
struct NodeSpec {
    tag: u8,
    links: Vec<bool>,
    pick: Index,
    offset_secs: i64,
    owner: usize,
}

prop_compose! {
    fn arb_node_spec()(
        tag in 0u8..6,
        links in prop::collection::vec(any::<bool>(), MAX_NODES),
        pick in any::<Index>(),
        offset_secs in 1i64..86_400,
        owner in 0usize..2
    ) -> NodeSpec {
        NodeSpec { tag, links, pick, offset_secs, owner }
    }
}

prop_compose! {
    fn arb_graph()(specs in prop::collection::vec(arb_node_spec(), 1..MAX_NODES)) -> Vec<NodeSpec> {
        specs
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn owners() -> [SigningKey; 2] {
    [SigningKey::from_bytes(&[1; 32]), SigningKey::from_bytes(&[2; 32])]
}

/// Nodes only point at later nodes, so the graph is acyclic. Returns the nodes and, for
/// every multipath, the option to take.
fn build_graph(specs: &[NodeSpec]) -> (Vec<FulfillmentNode>, Vec<(u32, u32)>) {
    let owners = owners();
    let mut nodes = Vec::new();
    let mut paths = Vec::new();
    for (i, spec) in specs.iter().enumerate() {
        let later: Vec<Locator> = (i + 1..specs.len())
            .filter(|&j| spec.links[j])
            .map(|j| Locator::local(j as u32))
            .collect();
        let first_later = (i + 1 < specs.len()).then(|| Locator::local(i as u32 + 1));
        let node = match (spec.tag, first_later) {
            (0, _) => FulfillmentNode::Composite { required: later },
            (1, Some(first)) => {
                let options = if later.is_empty() { vec![first] } else { later };
                paths.push((i as u32, spec.pick.index(options.len()) as u32));
                FulfillmentNode::Multipath { options }
            }
            (3, _) if spec.owner == 0 => FulfillmentNode::TimeConstrained {
                bound: now() - Duration::seconds(spec.offset_secs),
                direction: TimeDirection::After,
            },
            (3, _) => FulfillmentNode::TimeConstrained {
                bound: now() + Duration::seconds(spec.offset_secs),
                direction: TimeDirection::Before,
            },
            (4, _) => FulfillmentNode::Plain {
                data: vec![i as u8],
            },
            (5, Some(first)) => FulfillmentNode::DoubleSpendPrevention {
                targets: vec![later.into_iter().next().unwrap_or(first)],
            },
            _ => FulfillmentNode::KeyControl {
                owner_key: owners[spec.owner].verifying_key(),
            },
        };
        nodes.push(node);
    }
    (nodes, paths)
}

fn sign(update: LedgerUpdate) -> SignedUpdate {
    let owners = owners();
    let keys: Vec<&SigningKey> = owners
        .iter()
        .filter(|key| update.signers.contains(&key.verifying_key()))
        .collect();
    SignedUpdate::sign(update, &keys)
}

/// Issues the graph and builds the update fulfilling its first node.
fn issue_and_fulfill(specs: &[NodeSpec]) -> (InMemoryLedger, LedgerUpdate) {
    let (nodes, paths) = build_graph(specs);
    let issuer = SigningKey::from_bytes(&[9; 32]);
    let mut ledger = InMemoryLedger::new();
    let outputs = nodes.into_iter().map(|node| State::new(node, vec![])).collect();
    let issuance = UpdateBuilder::new(&ledger, EngineConfig::default())
        .issue(outputs, issuer.verifying_key())
        .unwrap();
    let id = ledger
        .commit(SignedUpdate::sign(issuance, &[&issuer]))
        .unwrap();

    let choices = paths
        .into_iter()
        .fold(Choices::new(), |choices, (node, option)| {
            choices.path(StateRef::new(id, node), option)
        });
    let update = UpdateBuilder::new(&ledger, EngineConfig::default())
        .with_choices(choices)
        .at(now())
        .fulfill_root(&StateRef::new(id, 0))
        .unwrap();
    (ledger, update)
}

proptest! {
    #[test]
    fn test_built_update_is_accepted(specs in arb_graph()) {
        let (mut ledger, update) = issue_and_fulfill(&specs);
        prop_assert!(ledger.commit(sign(update)).is_ok());
    }

    #[test]
    fn test_dropping_any_claim_is_rejected(specs in arb_graph()) {
        let (mut ledger, update) = issue_and_fulfill(&specs);
        let claimed: Vec<u32> = update
            .claims
            .iter()
            .flat_map(|claim| claim.indices.iter().copied())
            .collect();

        for index in claimed {
            let mut broken = update.clone();
            for claim in &mut broken.claims {
                claim.indices.retain(|&i| i != index);
            }
            let result = ledger.commit(sign(broken));
            prop_assert!(
                matches!(result, Err(LedgerError::Rejected(_))),
                "dropping claim {} was not rejected: {:?}",
                index,
                result
            );
        }
        prop_assert!(ledger.commit(sign(update)).is_ok());
    }
}
