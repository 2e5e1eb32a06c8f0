//! The fill engine.
//!
//! ## Fill pipeline
//!
//! ```text
//!  decode ─▶ expiry ─▶ epoch ─▶ remaining ─▶ signature ─▶ predicate
//!     ─▶ permits ─▶ amounts ─▶ pre ─▶ maker leg ─▶ taker hook ─▶ taker leg
//!     ─▶ post ─▶ invalidator commit
//! ```
//!
//! Every step runs inside one host checkpoint. Any error
//! rolls the host back, and the invalidator commit is the last mutation,
//! so a rejected fill leaves no trace: no balance moved, no permit
//! consumed, no invalidator entry written, no event appended.

use openfill_gates::{
    verify_order, Domain, Ed25519Verifier, PermitGate, PredicateEvaluator, SignatureVerifier,
    StaticCaller,
};
use openfill_invalidator::{InvalidatorStore, RemainingInvalidator};
use openfill_types::{
    Address, CompactSignature, Extension, Interaction, MakerPermit, MakerTraits, OpenfillError,
    Order, OrderHash, Predicate, ProtocolConfig, ProtocolEvent, Result, TakerTraits,
};
use serde::Serialize;

use crate::amounts::{self, ResolvedAmounts};
use crate::host::{Host, InteractionCall, InteractionPhase, TransferError};

/// One taker request against a signed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillRequest {
    pub order: Order,
    pub signature: CompactSignature,
    /// Making or taking amount, per `taker_traits.threshold_is_making_amount`.
    pub amount: u128,
    pub taker_traits: TakerTraits,
    /// Encoded extension the order's salt commits to; empty for none.
    pub extension: Vec<u8>,
    /// Recipient of the maker asset; the caller when unset.
    pub target: Option<Address>,
    /// Hook run between the two legs.
    pub interaction: Option<Interaction>,
    /// Permit executed unconditionally before the swap.
    pub permit: Option<MakerPermit>,
}

impl FillRequest {
    #[must_use]
    pub fn new(
        order: Order,
        signature: CompactSignature,
        amount: u128,
        taker_traits: TakerTraits,
    ) -> Self {
        Self {
            order,
            signature,
            amount,
            taker_traits,
            extension: Vec::new(),
            target: None,
            interaction: None,
            permit: None,
        }
    }

    #[must_use]
    pub fn with_extension(mut self, extension: Vec<u8>) -> Self {
        self.extension = extension;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: Address) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn with_interaction(mut self, interaction: Interaction) -> Self {
        self.interaction = Some(interaction);
        self
    }

    #[must_use]
    pub fn with_permit(mut self, permit: MakerPermit) -> Self {
        self.permit = Some(permit);
        self
    }

    /// Build a request from the taker's packed args region.
    ///
    /// ```text
    /// args := [target(32) if has_target] ‖ extension(extension_length)
    ///         ‖ interaction(interaction_length)
    /// ```
    ///
    /// # Errors
    /// [`OpenfillError::MalformedExtension`] when the region is shorter or
    /// longer than the lengths in `taker_traits` announce.
    pub fn from_args(
        order: Order,
        signature: CompactSignature,
        amount: u128,
        taker_traits: TakerTraits,
        args: &[u8],
    ) -> Result<Self> {
        let mut rest = args;
        let target = if taker_traits.has_target {
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(split_region(&mut rest, 32, "target")?);
            Some(Address(bytes))
        } else {
            None
        };
        let extension =
            split_region(&mut rest, taker_traits.extension_length as usize, "extension")?.to_vec();
        let interaction =
            split_region(&mut rest, taker_traits.interaction_length as usize, "interaction")?;
        let interaction = if interaction.is_empty() {
            None
        } else {
            Some(Interaction::decode(interaction)?)
        };
        if !rest.is_empty() {
            return Err(OpenfillError::MalformedExtension {
                reason: format!("{} trailing args bytes", rest.len()),
            });
        }

        Ok(Self {
            order,
            signature,
            amount,
            taker_traits,
            extension,
            target,
            interaction,
            permit: None,
        })
    }
}

/// Result of a committed fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FillOutcome {
    pub order_hash: OrderHash,
    pub making_amount: u128,
    pub taking_amount: u128,
}

/// The limit order protocol: invalidator state plus the gates that guard it.
///
/// `&mut self` on every mutating call serializes fills. Share across
/// threads behind a `Mutex`.
pub struct LimitOrderProtocol<V: SignatureVerifier = Ed25519Verifier> {
    config: ProtocolConfig,
    domain: Domain,
    verifier: V,
    permits: PermitGate,
    store: InvalidatorStore,
    events: Vec<ProtocolEvent>,
}

impl LimitOrderProtocol<Ed25519Verifier> {
    /// Protocol with ed25519 signature verification.
    pub fn new(config: ProtocolConfig) -> Result<Self> {
        Self::with_verifier(config, Ed25519Verifier)
    }
}

impl<V: SignatureVerifier> LimitOrderProtocol<V> {
    pub fn with_verifier(config: ProtocolConfig, verifier: V) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            domain: Domain::from_config(&config),
            permits: PermitGate::new(config.protocol_address),
            config,
            verifier,
            store: InvalidatorStore::new(),
            events: Vec::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    #[must_use]
    pub fn store(&self) -> &InvalidatorStore {
        &self.store
    }

    #[must_use]
    pub fn hash_order(&self, order: &Order) -> OrderHash {
        self.domain.order_hash(order)
    }

    // =====================================================================
    // Fill
    // =====================================================================

    /// Fill `request.order` on behalf of `caller`.
    ///
    /// # Errors
    /// Any gate failure. On error nothing observable has changed.
    pub fn fill<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        caller: &Address,
        request: &FillRequest,
    ) -> Result<FillOutcome> {
        let order_hash = self.hash_order(&request.order);
        let checkpoint = host.begin();
        match self.execute(host, caller, request, &order_hash) {
            Ok((amounts, remaining)) => {
                host.commit(checkpoint);
                self.events.push(ProtocolEvent::OrderFilled {
                    order_hash,
                    remaining,
                });
                tracing::info!(
                    order = %order_hash,
                    taker = %caller,
                    making = amounts.making,
                    taking = amounts.taking,
                    remaining,
                    "order filled"
                );
                Ok(FillOutcome {
                    order_hash,
                    making_amount: amounts.making,
                    taking_amount: amounts.taking,
                })
            }
            Err(err) => {
                host.rollback(checkpoint);
                tracing::warn!(order = %order_hash, taker = %caller, error = %err, "fill rejected");
                Err(err)
            }
        }
    }

    fn execute<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        caller: &Address,
        request: &FillRequest,
        order_hash: &OrderHash,
    ) -> Result<(ResolvedAmounts, u128)> {
        let order = &request.order;
        let traits = &order.maker_traits;
        let taker = &request.taker_traits;

        // 1. Decode
        order.validate()?;
        let extension = decode_extension(order, &request.extension)?;
        if !traits.is_allowed_sender(caller.sender_key()) {
            return Err(OpenfillError::PrivateOrder);
        }

        // 2-4. Expiry, epoch, remaining
        if traits.is_expired(host.timestamp()) {
            return Err(OpenfillError::OrderExpired);
        }
        self.store.check_epoch(&order.maker, traits)?;
        let remaining = self
            .store
            .remaining(&order.maker, order_hash, order.making_amount, traits)?;

        // 5. Signature
        if *caller == order.maker {
            tracing::debug!(order = %order_hash, "signature skipped for self-fill");
        } else {
            verify_order(&self.verifier, order, order_hash, &request.signature)?;
        }

        // 6. Predicate
        if let Some(predicate) = &extension.predicate {
            PredicateEvaluator::new(&*host).check(predicate)?;
        }

        // 7. Permits. A skipped maker permit is never parsed.
        if taker.skip_maker_permit {
            tracing::debug!(order = %order_hash, "maker permit skipped by taker");
        } else if let Some(permit) = Extension::decode_maker_permit(&request.extension)? {
            self.permits.apply(host, &permit)?;
        }
        if let Some(permit) = &request.permit {
            self.permits.apply(host, permit)?;
        }

        // 8. Amounts
        let amounts = amounts::resolve(order, remaining, request.amount, taker)?;
        tracing::debug!(
            order = %order_hash,
            making = amounts.making,
            taking = amounts.taking,
            "amounts resolved"
        );

        // 9. Interactions and transfers
        let target = request.target.unwrap_or(*caller);
        let hooks = HookContext {
            order_hash,
            order,
            taker: caller,
            amounts,
            remaining,
        };

        if traits.pre_interaction {
            if let Some(pre) = &extension.pre_interaction {
                interact(host, &pre.target, &hooks.call(InteractionPhase::Pre, &pre.data))?;
            }
        }
        self.maker_leg(host, order, taker, &target, amounts.making)?;
        if let Some(hook) = &request.interaction {
            interact(host, &hook.target, &hooks.call(InteractionPhase::Taker, &hook.data))?;
        }
        self.taker_leg(host, order, taker, caller, amounts.taking)?;
        if traits.post_interaction {
            if let Some(post) = &extension.post_interaction {
                interact(host, &post.target, &hooks.call(InteractionPhase::Post, &post.data))?;
            }
        }

        // 10. Commit
        let left = self.store.commit_fill(
            &order.maker,
            order_hash,
            order.making_amount,
            amounts.making,
            traits,
        )?;
        Ok((amounts, left))
    }

    /// Maker asset: maker → target, optionally unwrapped to native.
    fn maker_leg<H: Host + ?Sized>(
        &self,
        host: &mut H,
        order: &Order,
        taker: &TakerTraits,
        target: &Address,
        amount: u128,
    ) -> Result<()> {
        let protocol = self.config.protocol_address;
        let unwrap = taker.unwrap_weth && self.is_wrapped_native(&order.maker_asset);
        let to = if unwrap { protocol } else { *target };
        let pulled = if order.maker_traits.use_permit2 {
            host.permit2_transfer_from(&protocol, &order.maker_asset, &order.maker, &to, amount)
        } else {
            host.transfer_from(&protocol, &order.maker_asset, &order.maker, &to, amount)
        };
        pulled.map_err(|e| transfer_failure("maker", &e))?;
        if unwrap {
            host.unwrap_native(&order.maker_asset, &protocol, target, amount)
                .map_err(|e| transfer_failure("maker unwrap", &e))?;
        }
        Ok(())
    }

    /// Taker asset: caller → receiver, optionally unwrapped to native.
    fn taker_leg<H: Host + ?Sized>(
        &self,
        host: &mut H,
        order: &Order,
        taker: &TakerTraits,
        caller: &Address,
        amount: u128,
    ) -> Result<()> {
        let protocol = self.config.protocol_address;
        let receiver = order.receiver_or_maker();
        let unwrap = order.maker_traits.unwrap_weth && self.is_wrapped_native(&order.taker_asset);
        let to = if unwrap { protocol } else { receiver };
        let paid = if taker.use_permit2 {
            host.permit2_transfer_from(&protocol, &order.taker_asset, caller, &to, amount)
        } else {
            host.transfer_from(&protocol, &order.taker_asset, caller, &to, amount)
        };
        paid.map_err(|e| transfer_failure("taker", &e))?;
        if unwrap {
            host.unwrap_native(&order.taker_asset, &protocol, &receiver, amount)
                .map_err(|e| transfer_failure("taker unwrap", &e))?;
        }
        Ok(())
    }

    fn is_wrapped_native(&self, asset: &Address) -> bool {
        self.config.wrapped_native.as_ref() == Some(asset)
    }

    // =====================================================================
    // Maker operations
    // =====================================================================

    /// Cancel one of the caller's own orders. Cancelling twice is a no-op.
    pub fn cancel(
        &mut self,
        caller: &Address,
        traits: &MakerTraits,
        order_hash: &OrderHash,
    ) -> Result<()> {
        let changed = self.store.scope(caller, caller)?.cancel(order_hash, traits);
        if changed {
            self.events.push(ProtocolEvent::OrderCancelled {
                order_hash: *order_hash,
            });
            tracing::info!(maker = %caller, order = %order_hash, "order cancelled");
        }
        Ok(())
    }

    /// Cancel several of the caller's orders.
    pub fn cancel_orders(
        &mut self,
        caller: &Address,
        orders: &[(MakerTraits, OrderHash)],
    ) -> Result<()> {
        for (traits, order_hash) in orders {
            self.cancel(caller, traits, order_hash)?;
        }
        Ok(())
    }

    /// Cancel `order`, which must be the caller's.
    ///
    /// # Errors
    /// [`OpenfillError::Unauthorized`] if the caller is not the maker.
    pub fn cancel_order(&mut self, caller: &Address, order: &Order) -> Result<OrderHash> {
        let order_hash = self.hash_order(order);
        let changed = self
            .store
            .scope(caller, &order.maker)?
            .cancel(&order_hash, &order.maker_traits);
        if changed {
            self.events.push(ProtocolEvent::OrderCancelled { order_hash });
            tracing::info!(maker = %caller, order = %order_hash, "order cancelled");
        }
        Ok(order_hash)
    }

    /// Advance the caller's epoch for `series` by one.
    pub fn increase_epoch(&mut self, caller: &Address, series: u64) -> Result<u64> {
        self.advance_epoch(caller, series, 1)
    }

    /// Advance the caller's epoch for `series` by `delta` (1..=255).
    pub fn advance_epoch(&mut self, caller: &Address, series: u64, delta: u64) -> Result<u64> {
        let new_epoch = self.store.scope(caller, caller)?.advance_epoch(series, delta)?;
        self.events.push(ProtocolEvent::EpochIncreased {
            maker: *caller,
            series,
            new_epoch,
        });
        tracing::info!(maker = %caller, series, new_epoch, "epoch increased");
        Ok(new_epoch)
    }

    // =====================================================================
    // Views
    // =====================================================================

    #[must_use]
    pub fn remaining_invalidator_for_order(
        &self,
        maker: &Address,
        order_hash: &OrderHash,
    ) -> RemainingInvalidator {
        self.store.remaining_invalidator_for_order(maker, order_hash)
    }

    #[must_use]
    pub fn bit_invalidator_for_order(&self, maker: &Address, order_hash: &OrderHash) -> bool {
        self.store.bit_invalidator_for_order(maker, order_hash)
    }

    #[must_use]
    pub fn epoch(&self, maker: &Address, series: u64) -> u64 {
        self.store.epoch_of(maker, series)
    }

    /// Evaluate a predicate against `caller` without filling anything.
    pub fn check_predicate<C: StaticCaller + ?Sized>(&self, caller: &C, predicate: &Predicate) -> bool {
        PredicateEvaluator::new(caller).evaluate(predicate)
    }

    #[must_use]
    pub fn events(&self) -> &[ProtocolEvent] {
        &self.events
    }

    /// Hand the accumulated events to the caller.
    pub fn drain_events(&mut self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Split `len` bytes off the front of `rest`.
fn split_region<'a>(rest: &mut &'a [u8], len: usize, what: &str) -> Result<&'a [u8]> {
    if rest.len() < len {
        return Err(OpenfillError::MalformedExtension {
            reason: format!("args end inside {what}: need {len}, have {}", rest.len()),
        });
    }
    let (head, tail) = rest.split_at(len);
    *rest = tail;
    Ok(head)
}

/// Fill facts shared by every hook call of one fill.
struct HookContext<'a> {
    order_hash: &'a OrderHash,
    order: &'a Order,
    taker: &'a Address,
    amounts: ResolvedAmounts,
    remaining: u128,
}

impl HookContext<'_> {
    fn call<'b>(&'b self, phase: InteractionPhase, data: &'b [u8]) -> InteractionCall<'b> {
        InteractionCall {
            phase,
            order_hash: self.order_hash,
            order: self.order,
            taker: self.taker,
            making_amount: self.amounts.making,
            taking_amount: self.amounts.taking,
            remaining: self.remaining,
            data,
        }
    }
}

fn decode_extension(order: &Order, encoded: &[u8]) -> Result<Extension> {
    if order.maker_traits.has_extension {
        if encoded.is_empty() {
            return Err(OpenfillError::MissingOrderExtension);
        }
        if !order.commits_to(encoded) {
            return Err(OpenfillError::InvalidExtensionHash);
        }
        Extension::decode_without_permit(encoded)
    } else if encoded.is_empty() {
        Ok(Extension::default())
    } else {
        Err(OpenfillError::UnexpectedOrderExtension)
    }
}

fn interact<H: Host + ?Sized>(
    host: &mut H,
    target: &Address,
    call: &InteractionCall<'_>,
) -> Result<()> {
    host.interact(target, call)
        .map_err(|e| OpenfillError::InteractionFailure {
            reason: format!("{} hook: {e}", call.phase),
        })
}

fn transfer_failure(leg: &str, err: &TransferError) -> OpenfillError {
    OpenfillError::TransferFailure {
        reason: format!("{leg} leg: {err}"),
    }
}
