use crate::config::EngineConfig;
use crate::error::ResolveError;
use crate::locator::{Locator, StateRef};
use crate::node::{FulfillmentNode, NodeKind, TimeDirection};
use crate::record;
use crate::state::{State, StateAndRef};
use crate::store::StateStore;
use crate::update::{ClaimDirective, LedgerUpdate, TimeWindow};
use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// The record a detached node should be fulfilled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetachedProof {
    pub record: StateRef,
    /// Also claim the record itself as fulfilled, rather than only referencing it.
    pub claim_record: bool,
}

impl DetachedProof {
    pub fn referenced(record: StateRef) -> Self {
        Self {
            record,
            claim_record: false,
        }
    }

    pub fn claimed(record: StateRef) -> Self {
        Self {
            record,
            claim_record: true,
        }
    }
}

/// Decisions the resolver cannot make on its own, keyed by the node that needs them.
#[derive(Debug, Clone, Default)]
pub struct Choices {
    paths: HashMap<StateRef, u32>,
    proofs: HashMap<StateRef, DetachedProof>,
    new_outputs: HashMap<StateRef, State>,
}

impl Choices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take option `option` of the multipath node `node`.
    pub fn path(mut self, node: StateRef, option: u32) -> Self {
        self.paths.insert(node, option);
        self
    }

    pub fn proof(mut self, node: StateRef, proof: DetachedProof) -> Self {
        self.proofs.insert(node, proof);
        self
    }

    /// Output to create for the fulfilled-by-new-output node `node`.
    pub fn new_output(mut self, node: StateRef, output: State) -> Self {
        self.new_outputs.insert(node, output);
        self
    }
}

#[derive(Debug, Clone)]
struct Reference {
    state_ref: StateRef,
    kind: NodeKind,
    claimed: bool,
}

/// Everything gathered while resolving one graph. Each resolution run gets its own; a run
/// that fails is discarded along with its accumulator.
///
/// Reference indices handed out during the run are provisional. A state referenced first and
/// consumed later stops being a reference, so [`Accumulator::finish`] renumbers them.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    inputs: Vec<StateRef>,
    references: Vec<Reference>,
    outputs: Vec<State>,
    signers: Vec<VerifyingKey>,
    time_window: Option<TimeWindow>,
    chosen_paths: BTreeMap<StateRef, u32>,
    resolved: HashSet<StateRef>,
    path: Vec<StateRef>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `state` as a reference, claiming it as fulfilled if `claim` is set. Returns its
    /// provisional index, or `None` if the state is already consumed by this update.
    pub fn reference(&mut self, state: &StateAndRef, claim: bool) -> Option<u32> {
        if self.is_consumed(&state.state_ref) {
            return None;
        }
        if let Some(index) = self
            .references
            .iter()
            .position(|r| r.state_ref == state.state_ref)
        {
            self.references[index].claimed |= claim;
            return Some(index as u32);
        }
        self.references.push(Reference {
            state_ref: state.state_ref,
            kind: state.kind(),
            claimed: claim,
        });
        Some(self.references.len() as u32 - 1)
    }

    pub fn consume(&mut self, state: &StateAndRef) {
        if !self.is_consumed(&state.state_ref) {
            self.inputs.push(state.state_ref);
        }
    }

    /// Makes `state` count as fulfilled in the cheapest way it allows: claimed by reference
    /// when it carries the marker, consumed otherwise.
    pub fn require(&mut self, state: &StateAndRef) -> Option<u32> {
        if state.state.fulfillable_by_reference {
            self.reference(state, true)
        } else {
            debug!("{} cannot be claimed by reference, consuming it", state.state_ref);
            self.consume(state);
            None
        }
    }

    /// Appends an output and returns its index within the update.
    pub fn add_output(&mut self, output: State) -> u32 {
        self.outputs.push(output);
        self.outputs.len() as u32 - 1
    }

    pub fn require_signer(&mut self, key: VerifyingKey) {
        if !self.signers.contains(&key) {
            self.signers.push(key);
        }
    }

    /// Marks the reference at provisional index `index` as claimed.
    pub fn claim(&mut self, index: u32) -> Result<(), ResolveError> {
        let reference = self
            .references
            .get_mut(index as usize)
            .ok_or(ResolveError::UnknownReference(index))?;
        reference.claimed = true;
        Ok(())
    }

    /// Narrows the update's time window so it lies entirely on `direction`'s side of
    /// `bound`. A window that does not exist yet starts as `now ± tolerance`.
    pub fn constrain_time(
        &mut self,
        bound: DateTime<Utc>,
        direction: TimeDirection,
        now: DateTime<Utc>,
        tolerance: Option<chrono::Duration>,
    ) -> Result<(), ResolveError> {
        let mut window = match self.time_window {
            Some(window) => window,
            None => tolerance
                .and_then(|tolerance| TimeWindow::around(now, tolerance))
                .ok_or(ResolveError::TimeOutOfRange)?,
        };
        match direction {
            TimeDirection::After => {
                window.from = Some(window.from.map_or(bound, |from| from.max(bound)));
            }
            TimeDirection::Before => {
                window.until = Some(window.until.map_or(bound, |until| until.min(bound)));
            }
        }
        if window.is_empty() {
            return Err(ResolveError::EmptyTimeWindow);
        }
        self.time_window = Some(window);
        Ok(())
    }

    pub fn choose_path(&mut self, node: StateRef, option: u32) {
        self.chosen_paths.insert(node, option);
    }

    pub fn is_consumed(&self, state_ref: &StateRef) -> bool {
        self.inputs.contains(state_ref)
    }

    /// Consumed, or referenced and claimed.
    pub fn is_fulfilled(&self, state_ref: &StateRef) -> bool {
        self.is_consumed(state_ref)
            || self
                .references
                .iter()
                .any(|r| r.claimed && &r.state_ref == state_ref)
    }

    pub fn outputs(&self) -> &[State] {
        &self.outputs
    }

    pub fn signers(&self) -> &[VerifyingKey] {
        &self.signers
    }

    pub fn time_window(&self) -> Option<TimeWindow> {
        self.time_window
    }

    /// Settles the reference list: references that ended up consumed are dropped and the
    /// remaining ones renumbered.
    pub fn finish(self) -> Resolution {
        let inputs = self.inputs;
        let kept: Vec<Reference> = self
            .references
            .into_iter()
            .filter(|r| !inputs.contains(&r.state_ref))
            .collect();
        let claimed = kept
            .iter()
            .enumerate()
            .filter(|(_, r)| r.claimed)
            .map(|(index, r)| (index as u32, r.kind.clone()))
            .collect();
        Resolution {
            inputs,
            references: kept.into_iter().map(|r| r.state_ref).collect(),
            claimed,
            outputs: self.outputs,
            signers: self.signers,
            time_window: self.time_window,
            chosen_paths: self.chosen_paths,
        }
    }
}

/// Result of a finished resolution, with final reference indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub inputs: Vec<StateRef>,
    pub references: Vec<StateRef>,
    /// Claimed reference indices with the kind of the state at each.
    claimed: Vec<(u32, NodeKind)>,
    pub outputs: Vec<State>,
    pub signers: Vec<VerifyingKey>,
    pub time_window: Option<TimeWindow>,
    pub chosen_paths: BTreeMap<StateRef, u32>,
}

impl Resolution {
    pub fn claimed_indices(&self) -> Vec<u32> {
        self.claimed.iter().map(|(index, _)| *index).collect()
    }

    /// Claim directives covering every claimed reference.
    ///
    /// With `per_type_claims` each kind gets its own directive, so every claimed node's own
    /// rules run. Otherwise everything goes under one composite directive, and a claimed
    /// node's own rules run only if its kind takes part in the update some other way.
    pub fn claim_directives(&self, per_type_claims: bool) -> Vec<ClaimDirective> {
        if !per_type_claims {
            if self.claimed.is_empty() {
                return Vec::new();
            }
            return vec![ClaimDirective::new(NodeKind::Composite, self.claimed_indices())];
        }

        let mut by_kind: BTreeMap<NodeKind, Vec<u32>> = BTreeMap::new();
        for (index, kind) in &self.claimed {
            by_kind.entry(kind.clone()).or_default().push(*index);
        }
        if !self.chosen_paths.is_empty() {
            by_kind.entry(NodeKind::Multipath).or_default();
        }
        by_kind
            .into_iter()
            .map(|(kind, indices)| {
                if kind == NodeKind::Multipath {
                    ClaimDirective::new(kind, indices).with_paths(self.chosen_paths.clone())
                } else {
                    ClaimDirective::new(kind, indices)
                }
            })
            .collect()
    }

    pub fn into_update(self, per_type_claims: bool) -> LedgerUpdate {
        let claims = self.claim_directives(per_type_claims);
        LedgerUpdate {
            inputs: self.inputs,
            references: self.references,
            outputs: self.outputs,
            claims,
            time_window: self.time_window,
            signers: self.signers,
        }
    }
}

/// How the resolver handles what the standard node kinds do not cover.
pub trait FulfillmentExtension {
    /// Fulfills a custom node. Custom nodes need nothing unless an extension says so.
    fn fulfill_custom(
        &self,
        _resolver: &Resolver<'_>,
        _node: &StateAndRef,
        _acc: &mut Accumulator,
    ) -> Result<Vec<u32>, ResolveError> {
        Ok(Vec::new())
    }

    /// Adds whatever creating `output` requires. A fulfillment record can only be created
    /// alongside the fulfillment of every state it attests, and a payment claim only with
    /// its payor's signature.
    fn facilitate_creation(
        &self,
        resolver: &Resolver<'_>,
        output: &State,
        acc: &mut Accumulator,
    ) -> Result<Vec<u32>, ResolveError> {
        if let FulfillmentNode::PaymentClaim { payor, .. } = &output.node {
            acc.require_signer(*payor);
        }
        let mut indices = Vec::new();
        for target in record::attested(output).unwrap_or_default() {
            if acc.is_fulfilled(target) {
                continue;
            }
            let state = resolver.store().resolve(target)?;
            indices.extend(acc.require(&state));
            indices.extend(resolver.fulfill(&state, acc)?);
        }
        Ok(indices)
    }
}

/// The extension used when the caller supplies none.
pub struct StandardFulfillment;

impl FulfillmentExtension for StandardFulfillment {}

/// Walks a fulfillment graph, adding to an accumulator whatever the update needs so that
/// each visited node verifies.
pub struct Resolver<'a> {
    store: &'a dyn StateStore,
    choices: &'a Choices,
    extension: &'a dyn FulfillmentExtension,
    config: &'a EngineConfig,
    now: DateTime<Utc>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        store: &'a dyn StateStore,
        choices: &'a Choices,
        extension: &'a dyn FulfillmentExtension,
        config: &'a EngineConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            store,
            choices,
            extension,
            config,
            now,
        }
    }

    pub fn store(&self) -> &'a dyn StateStore {
        self.store
    }

    pub fn choices(&self) -> &'a Choices {
        self.choices
    }

    /// Looks up the state `locator` points at, reading it relative to `holder`.
    pub fn lookup(&self, holder: &StateRef, locator: &Locator) -> Result<StateAndRef, ResolveError> {
        let target = locator.resolve(holder)?;
        Ok(self.store.resolve(&target)?)
    }

    /// Fulfills `node`, which the caller has already added to the accumulator. Returns the
    /// provisional reference indices claimed along the way.
    ///
    /// Every index returned while fulfilling `node`, including those handed back by the
    /// extension hooks, is marked claimed before this returns.
    pub fn fulfill(&self, node: &StateAndRef, acc: &mut Accumulator) -> Result<Vec<u32>, ResolveError> {
        if acc.resolved.contains(&node.state_ref) {
            return Ok(Vec::new());
        }
        if acc.path.contains(&node.state_ref) {
            return Err(ResolveError::CycleDetected(node.state_ref));
        }
        let max_depth = self.config.effective_max_depth();
        if acc.path.len() >= max_depth {
            return Err(ResolveError::DepthExceeded(max_depth));
        }

        debug!("Resolving {} node {}", node.kind(), node.state_ref);
        acc.path.push(node.state_ref);
        let indices = self.fulfill_node(node, acc)?;
        for &index in &indices {
            acc.claim(index)?;
        }
        acc.path.pop();
        acc.resolved.insert(node.state_ref);
        Ok(indices)
    }

    fn fulfill_node(&self, node: &StateAndRef, acc: &mut Accumulator) -> Result<Vec<u32>, ResolveError> {
        let holder = node.state_ref;
        match &node.state.node {
            FulfillmentNode::Composite { required } => self.fulfill_all(&holder, required, acc),
            FulfillmentNode::Differentiated { contract, .. } => {
                self.fulfill_all(&holder, std::slice::from_ref(contract), acc)
            }
            FulfillmentNode::Multipath { options } => {
                let option = *self
                    .choices
                    .paths
                    .get(&holder)
                    .ok_or(ResolveError::UnresolvedChoice {
                        kind: NodeKind::Multipath,
                        node: holder,
                    })?;
                let locator = options
                    .get(option as usize)
                    .ok_or_else(|| ResolveError::InvalidChoice {
                        kind: NodeKind::Multipath,
                        node: holder,
                        reason: format!("option {} of {}", option, options.len()),
                    })?;
                acc.choose_path(holder, option);
                let chosen = self.lookup(&holder, locator)?;
                if acc.path.contains(&chosen.state_ref) {
                    // the chosen option is an enclosing node this update already fulfills
                    debug!("Option {} of {} is already being fulfilled", chosen.state_ref, holder);
                    return Ok(acc.require(&chosen).into_iter().collect());
                }
                let mut indices: Vec<u32> = acc.require(&chosen).into_iter().collect();
                indices.extend(self.fulfill(&chosen, acc)?);
                Ok(indices)
            }
            FulfillmentNode::Detached { proof_target } => {
                let proof = self
                    .choices
                    .proofs
                    .get(&holder)
                    .ok_or(ResolveError::UnresolvedChoice {
                        kind: NodeKind::Detached,
                        node: holder,
                    })?;
                let target = proof_target.resolve(&holder)?;
                let record = self.store.resolve(&proof.record)?;
                if !record::attests(&record.state, &target) {
                    return Err(ResolveError::InvalidChoice {
                        kind: NodeKind::Detached,
                        node: holder,
                        reason: format!("{} does not attest {}", proof.record, target),
                    });
                }
                let mut indices = Vec::new();
                if proof.claim_record {
                    indices.extend(acc.require(&record));
                    indices.extend(self.fulfill(&record, acc)?);
                } else {
                    acc.reference(&record, false);
                }
                Ok(indices)
            }
            FulfillmentNode::DoubleSpendPrevention { targets } => {
                let mut indices = Vec::new();
                for locator in targets {
                    let target = self.lookup(&holder, locator)?;
                    acc.consume(&target);
                    indices.extend(self.fulfill(&target, acc)?);
                }
                Ok(indices)
            }
            FulfillmentNode::TimeConstrained { bound, direction } => {
                acc.constrain_time(*bound, *direction, self.now, self.config.time_tolerance())?;
                Ok(Vec::new())
            }
            FulfillmentNode::KeyControl { owner_key } => {
                acc.require_signer(*owner_key);
                Ok(Vec::new())
            }
            FulfillmentNode::FulfilledByNewOutput { required_shape } => {
                let output = self
                    .choices
                    .new_outputs
                    .get(&holder)
                    .ok_or(ResolveError::UnresolvedChoice {
                        kind: NodeKind::FulfilledByNewOutput,
                        node: holder,
                    })?;
                if !required_shape.matches(output) {
                    return Err(ResolveError::InvalidChoice {
                        kind: NodeKind::FulfilledByNewOutput,
                        node: holder,
                        reason: format!("{} output does not match the required shape", output.kind()),
                    });
                }
                acc.add_output(output.clone());
                self.extension.facilitate_creation(self, output, acc)
            }
            FulfillmentNode::FulfillmentRecord { .. }
            | FulfillmentNode::PaymentClaim { .. }
            | FulfillmentNode::Plain { .. } => Ok(Vec::new()),
            FulfillmentNode::Custom { .. } => self.extension.fulfill_custom(self, node, acc),
        }
    }

    fn fulfill_all(
        &self,
        holder: &StateRef,
        locators: &[Locator],
        acc: &mut Accumulator,
    ) -> Result<Vec<u32>, ResolveError> {
        let mut indices = Vec::new();
        for locator in locators {
            let child = self.lookup(holder, locator)?;
            indices.extend(acc.require(&child));
            indices.extend(self.fulfill(&child, acc)?);
        }
        Ok(indices)
    }
}

/// Assembles complete updates: issuing new graphs and fulfilling existing ones.
pub struct UpdateBuilder<'a> {
    store: &'a dyn StateStore,
    config: EngineConfig,
    choices: Choices,
    extension: Box<dyn FulfillmentExtension + 'a>,
    now: DateTime<Utc>,
    default_signer: Option<VerifyingKey>,
}

impl<'a> UpdateBuilder<'a> {
    pub fn new(store: &'a dyn StateStore, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            choices: Choices::default(),
            extension: Box::new(StandardFulfillment),
            now: Utc::now(),
            default_signer: None,
        }
    }

    pub fn with_choices(mut self, choices: Choices) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_extension(mut self, extension: impl FulfillmentExtension + 'a) -> Self {
        self.extension = Box::new(extension);
        self
    }

    /// Builds as if the current time were `now`.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Signer required when the graph itself requires none.
    pub fn with_default_signer(mut self, key: VerifyingKey) -> Self {
        self.default_signer = Some(key);
        self
    }

    /// An update creating `outputs` without fulfilling anything. Local locators in the
    /// outputs must point within the update.
    pub fn issue(&self, outputs: Vec<State>, issuer: VerifyingKey) -> Result<LedgerUpdate, ResolveError> {
        for output in &outputs {
            for locator in output.node.locators() {
                locator.resolve_pending(outputs.len())?;
            }
        }
        Ok(LedgerUpdate {
            outputs,
            signers: vec![issuer],
            ..Default::default()
        })
    }

    /// Resolves everything fulfilling `root` requires, without assembling an update.
    pub fn resolve(&self, root: &StateRef) -> Result<Resolution, ResolveError> {
        let root = self.store.resolve(root)?;
        let resolver = Resolver::new(
            self.store,
            &self.choices,
            self.extension.as_ref(),
            &self.config,
            self.now,
        );

        let mut acc = Accumulator::new();
        acc.require(&root);
        if self.config.emit_fulfillment_record {
            acc.add_output(State::record(
                vec![root.state_ref],
                root.state.participants.clone(),
            ));
        }
        resolver.fulfill(&root, &mut acc)?;
        if acc.signers.is_empty() {
            if let Some(key) = self.default_signer {
                acc.require_signer(key);
            }
        }
        Ok(acc.finish())
    }

    /// An update fulfilling the node at `root`.
    pub fn fulfill_root(&self, root: &StateRef) -> Result<LedgerUpdate, ResolveError> {
        let resolution = self.resolve(root)?;
        debug!(
            "Resolved {}: {} inputs, {} references, {} claimed",
            root,
            resolution.inputs.len(),
            resolution.references.len(),
            resolution.claimed.len()
        );
        Ok(resolution.into_update(self.config.per_type_claims))
    }
}
