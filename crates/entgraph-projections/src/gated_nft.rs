//! Tier-gated NFT handlers.

use alloy_primitives::U256;

use entgraph_core::entities::gated_nft::{
    GatedNft, GatedToken, GatedTokenOwner, NftTransfer, OwnershipTransfer,
    RoyaltyRecipientUpdate,
};
use entgraph_core::error::ProjectionError;
use entgraph_core::event::EventCtx;
use entgraph_core::events::GatedNftEvent;
use entgraph_core::key::composite;
use entgraph_core::store::EntityStoreExt;
use entgraph_core::ZERO_ADDRESS;

use crate::engine::Env;

pub async fn handle(
    env: &Env,
    ctx: &EventCtx,
    event: &GatedNftEvent,
) -> Result<(), ProjectionError> {
    match event {
        GatedNftEvent::Created {
            address,
            creator,
            config,
            tier,
            minimum_status,
            max_per_address,
            transferrable,
            max_mintable,
            royalty_recipient,
            royalty_bps,
        } => {
            let Some(mut nft) = env.store.load::<GatedNft>(address).await? else {
                return Ok(());
            };
            nft.name = Some(config.name.clone());
            nft.symbol = Some(config.symbol.clone());
            nft.description = Some(config.description.clone());
            nft.animation_url = Some(config.animation_url.clone());
            nft.animation_hash = Some(config.animation_hash.clone());
            nft.image_url = Some(config.image_url.clone());
            nft.image_hash = Some(config.image_hash.clone());
            // Owner came from the live read at discovery; the creator only
            // stands in when that read reverted.
            nft.owner.get_or_insert_with(|| creator.clone());
            nft.tier = Some(crate::resolver::resolve_tier(env, tier).await?);
            nft.minimum_status = *minimum_status;
            nft.max_per_address = *max_per_address;
            nft.transferrable = *transferrable;
            nft.max_mintable = *max_mintable;
            nft.royalty_recipient = Some(royalty_recipient.clone());
            nft.royalty_bps = *royalty_bps;
            nft.royalty_percent = *royalty_bps / U256::from(100);
            env.store.save(&nft).await?;
            Ok(())
        }
        GatedNftEvent::Transfer { from, to, token_id } => {
            handle_transfer(env, ctx, from, to, *token_id).await
        }
        GatedNftEvent::OwnershipTransferred {
            old_owner,
            new_owner,
        } => {
            let Some(mut nft) = env.store.load::<GatedNft>(&ctx.emitter).await? else {
                return Ok(());
            };
            let record = OwnershipTransfer {
                id: ctx.tx_hash.clone(),
                block: ctx.block_number,
                timestamp: ctx.block_timestamp,
                gated_nft: nft.id.clone(),
                old_owner: old_owner.clone(),
                new_owner: new_owner.clone(),
            };
            env.store.save(&record).await?;
            nft.owner = Some(new_owner.clone());
            nft.ownership_history.push(record.id);
            env.store.save(&nft).await?;
            Ok(())
        }
        GatedNftEvent::UpdatedRoyaltyRecipient { royalty_recipient } => {
            let Some(mut nft) = env.store.load::<GatedNft>(&ctx.emitter).await? else {
                return Ok(());
            };
            let record = RoyaltyRecipientUpdate {
                id: ctx.tx_hash.clone(),
                block: ctx.block_number,
                timestamp: ctx.block_timestamp,
                gated_nft: nft.id.clone(),
                old_royalty_recipient: nft.royalty_recipient.clone().unwrap_or_default(),
                new_royalty_recipient: royalty_recipient.clone(),
            };
            env.store.save(&record).await?;
            nft.royalty_recipient = Some(royalty_recipient.clone());
            nft.royalty_history.push(record.id);
            env.store.save(&nft).await?;
            Ok(())
        }
    }
}

async fn handle_transfer(
    env: &Env,
    ctx: &EventCtx,
    from: &str,
    to: &str,
    token_id: U256,
) -> Result<(), ProjectionError> {
    let Some(mut nft) = env.store.load::<GatedNft>(&ctx.emitter).await? else {
        return Ok(());
    };

    let transfer = NftTransfer {
        id: composite(&[&ctx.tx_hash, &ctx.emitter, &token_id.to_string()]),
        block: ctx.block_number,
        timestamp: ctx.block_timestamp,
        transaction_hash: ctx.tx_hash.clone(),
        gated_nft: nft.id.clone(),
        token_id,
        from: from.to_string(),
        to: to.to_string(),
    };
    env.store.save(&transfer).await?;
    nft.transfer_history.push(transfer.id.clone());

    let token_key = composite(&[&ctx.emitter, &token_id.to_string()]);

    if from == ZERO_ADDRESS {
        // Mint. Burns never decrement this counter.
        nft.tokens_minted += U256::from(1);
        let token = GatedToken {
            id: token_key.clone(),
            token_id,
            gated_nft: nft.id.clone(),
            owner: to.to_string(),
            mint_block: ctx.block_number,
            mint_timestamp: ctx.block_timestamp,
            transfer_history: vec![transfer.id.clone()],
        };
        env.store.save(&token).await?;
        if !nft.gated_tokens.iter().any(|t| t == &token_key) {
            nft.gated_tokens.push(token_key.clone());
        }
    } else if let Some(mut token) = env.store.load::<GatedToken>(&token_key).await? {
        token.owner = to.to_string();
        token.transfer_history.push(transfer.id.clone());
        env.store.save(&token).await?;

        let from_key = composite(&[&ctx.emitter, from]);
        if let Some(mut previous) = env.store.load::<GatedTokenOwner>(&from_key).await? {
            previous.token_count = previous.token_count.saturating_sub(U256::from(1));
            previous.tokens.retain(|t| t != &token_key);
            env.store.save(&previous).await?;
        }
    }

    if to != ZERO_ADDRESS {
        let to_key = composite(&[&ctx.emitter, to]);
        let mut owner = env
            .store
            .load::<GatedTokenOwner>(&to_key)
            .await?
            .unwrap_or_else(|| GatedTokenOwner::new(&to_key, to, &nft.id));
        owner.token_count += U256::from(1);
        if !owner.tokens.iter().any(|t| t == &token_key) {
            owner.tokens.push(token_key.clone());
        }
        env.store.save(&owner).await?;
        if !nft.gated_token_owners.iter().any(|o| o == &to_key) {
            nft.gated_token_owners.push(to_key);
        }
    }

    env.store.save(&nft).await?;
    Ok(())
}
