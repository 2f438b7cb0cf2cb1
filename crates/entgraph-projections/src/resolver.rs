//! Polymorphic address resolution.
//!
//! Several events reference contracts only by address: an ISale that may or
//! may not have come from the tracked factory, a tier contract of unknown
//! concrete type, a notice subject that could be almost anything. Resolution
//! probes the store in a fixed priority order and falls back to an
//! "unknown" placeholder entity rather than dropping the reference.

use entgraph_core::entities::notice::NoticeSubjectKind;
use entgraph_core::entities::sale::{Sale, SaleRef, SaleRefKind, UnknownSale};
use entgraph_core::entities::tier::{CombineTier, TierKind, TierRef, UnknownTier, VerifyTier};
use entgraph_core::entities::verify::Verify;
use entgraph_core::entities::escrow::ClaimEscrow;
use entgraph_core::error::ProjectionError;
use entgraph_core::store::EntityStoreExt;

use crate::engine::Env;

/// Resolve an ISale address.
///
/// Sales deployed outside the tracked factory get an `UnknownSale`
/// placeholder whose status is refreshed from the live contract on every
/// resolution.
pub async fn resolve_sale(env: &Env, address: &str) -> Result<SaleRef, ProjectionError> {
    let sale: Option<Sale> = env.store.load(address).await?;
    if sale.is_some() {
        return Ok(SaleRef {
            kind: SaleRefKind::Sale,
            id: address.to_string(),
        });
    }

    let mut unknown: UnknownSale = env
        .store
        .load(address)
        .await?
        .unwrap_or_else(|| UnknownSale::new(address));
    if let Some(status) = env.chain.sale_status(address).await {
        unknown.sale_status = status;
    }
    env.store.save(&unknown).await?;
    Ok(SaleRef {
        kind: SaleRefKind::Unknown,
        id: address.to_string(),
    })
}

/// Resolve a tier address: CombineTier first, then VerifyTier, otherwise a
/// lazily created `UnknownTier` placeholder.
pub async fn resolve_tier(env: &Env, address: &str) -> Result<TierRef, ProjectionError> {
    let combine: Option<CombineTier> = env.store.load(address).await?;
    if combine.is_some() {
        return Ok(TierRef {
            kind: TierKind::CombineTier,
            id: address.to_string(),
        });
    }
    let verify: Option<VerifyTier> = env.store.load(address).await?;
    if verify.is_some() {
        return Ok(TierRef {
            kind: TierKind::VerifyTier,
            id: address.to_string(),
        });
    }
    let unknown: Option<UnknownTier> = env.store.load(address).await?;
    if unknown.is_none() {
        env.store.save(&UnknownTier::new(address)).await?;
    }
    Ok(TierRef {
        kind: TierKind::Unknown,
        id: address.to_string(),
    })
}

/// Classify a notice subject address in priority order.
pub async fn resolve_notice_subject(
    env: &Env,
    address: &str,
) -> Result<NoticeSubjectKind, ProjectionError> {
    if env.store.load::<Sale>(address).await?.is_some() {
        return Ok(NoticeSubjectKind::Sale);
    }
    if env.store.load::<Verify>(address).await?.is_some() {
        return Ok(NoticeSubjectKind::Verify);
    }
    if env.store.load::<VerifyTier>(address).await?.is_some() {
        return Ok(NoticeSubjectKind::VerifyTier);
    }
    if env.store.load::<CombineTier>(address).await?.is_some() {
        return Ok(NoticeSubjectKind::CombineTier);
    }
    if env.store.load::<ClaimEscrow>(address).await?.is_some() {
        return Ok(NoticeSubjectKind::ClaimEscrow);
    }
    if env.store.load::<UnknownTier>(address).await?.is_some() {
        return Ok(NoticeSubjectKind::UnknownTier);
    }
    Ok(NoticeSubjectKind::Unknown)
}

/// Whether an address belongs to a contract the engine itself tracks.
/// Holder bookkeeping skips these counterparties.
pub async fn is_tracked_contract(env: &Env, address: &str) -> Result<bool, ProjectionError> {
    use entgraph_core::entities::emissions::EmissionsErc20;
    use entgraph_core::entities::redeemable::RedeemableErc20;
    use entgraph_core::entities::stake::StakeErc20;

    if env.store.load::<Sale>(address).await?.is_some() {
        return Ok(true);
    }
    if env.store.load::<ClaimEscrow>(address).await?.is_some() {
        return Ok(true);
    }
    if env.store.load::<RedeemableErc20>(address).await?.is_some() {
        return Ok(true);
    }
    if env.store.load::<StakeErc20>(address).await?.is_some() {
        return Ok(true);
    }
    if env.store.load::<EmissionsErc20>(address).await?.is_some() {
        return Ok(true);
    }
    Ok(false)
}
