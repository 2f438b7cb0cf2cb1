//! Verify (identity attestation) handlers.

use tracing::warn;

use entgraph_core::entities::verify::{
    status_at, RequestStatus, Role, Verify, VerifyAddress, VerifyEventKind, VerifyEventRecord,
};
use entgraph_core::error::ProjectionError;
use entgraph_core::event::EventCtx;
use entgraph_core::events::VerifyEvent;
use entgraph_core::key::composite;
use entgraph_core::store::EntityStoreExt;

use crate::engine::Env;

/// keccak256 role identifiers emitted by the access-control events.
pub const APPROVER_ADMIN: &str =
    "0x2d4d1d70bd81797c3479f5c3f873a5c9203d249659c3b317cdad46367472783c";
pub const APPROVER: &str = "0x5ff1fb0ce9089603e6e193667ed17164e0360a6148f4a39fc194055588948a31";
pub const REMOVER_ADMIN: &str =
    "0x9d65f741849e7609dd1e2c70f0d7da5f5433b36bfcf3ba4d27d2bb08ad2155b1";
pub const REMOVER: &str = "0x794e4221ebb6dd4e460d558b4ec709511d44017d6610ba89daa896c0684ddfac";
pub const BANNER_ADMIN: &str =
    "0xbb496ca6fee71a17f78592fbc6fc7f04a436edb9c709c4289d6bbfbc5fd45f4d";
pub const BANNER: &str = "0x5a686c9d070917be517818979fb56f451f007e3ae83e96fb5a22a304929b070d";

fn role_of(hash: &str) -> Option<Role> {
    match hash {
        APPROVER_ADMIN => Some(Role::ApproverAdmin),
        APPROVER => Some(Role::Approver),
        REMOVER_ADMIN => Some(Role::RemoverAdmin),
        REMOVER => Some(Role::Remover),
        BANNER_ADMIN => Some(Role::BannerAdmin),
        BANNER => Some(Role::Banner),
        _ => None,
    }
}

pub async fn handle(env: &Env, ctx: &EventCtx, event: &VerifyEvent) -> Result<(), ProjectionError> {
    match event {
        VerifyEvent::Attest {
            kind,
            sender,
            account,
            data,
        } => handle_attest(env, ctx, *kind, sender, account, data).await,
        VerifyEvent::RoleGranted {
            role,
            account,
            ..
        } => handle_role_granted(env, ctx, role, account).await,
        VerifyEvent::RoleRevoked {
            role,
            account,
            ..
        } => handle_role_revoked(env, ctx, role, account).await,
    }
}

/// Load or create the per-account state, keeping the parent's address list
/// in sync.
async fn get_verify_address(
    env: &Env,
    verify_contract: &str,
    account: &str,
) -> Result<VerifyAddress, ProjectionError> {
    let id = composite(&[verify_contract, account]);
    if let Some(existing) = env.store.load::<VerifyAddress>(&id).await? {
        return Ok(existing);
    }
    let created = VerifyAddress::new(&id, verify_contract, account);
    env.store.save(&created).await?;
    if let Some(mut verify) = env.store.load::<Verify>(verify_contract).await? {
        verify.verify_addresses.push(id);
        env.store.save(&verify).await?;
    }
    Ok(created)
}

async fn handle_attest(
    env: &Env,
    ctx: &EventCtx,
    kind: VerifyEventKind,
    sender: &str,
    account: &str,
    data: &str,
) -> Result<(), ProjectionError> {
    let Some(mut verify) = env.store.load::<Verify>(&ctx.emitter).await? else {
        return Ok(());
    };
    verify.verify_event_count += 1;

    let record = VerifyEventRecord {
        id: composite(&[
            &ctx.emitter,
            &ctx.tx_hash,
            &verify.verify_event_count.to_string(),
        ]),
        kind,
        block: ctx.block_number,
        timestamp: ctx.block_timestamp,
        transaction_hash: ctx.tx_hash.clone(),
        verify_contract: verify.id.clone(),
        sender: sender.to_string(),
        account: account.to_string(),
        data: data.to_string(),
    };
    env.store.save(&record).await?;

    match kind {
        VerifyEventKind::Approve => verify.approvals.push(record.id.clone()),
        VerifyEventKind::Ban => verify.bans.push(record.id.clone()),
        VerifyEventKind::Remove => verify.removals.push(record.id.clone()),
        VerifyEventKind::RequestApprove => verify.request_approvals.push(record.id.clone()),
        VerifyEventKind::RequestBan => verify.request_bans.push(record.id.clone()),
        VerifyEventKind::RequestRemove => verify.request_removals.push(record.id.clone()),
    }
    env.store.save(&verify).await?;

    let mut subject = get_verify_address(env, &ctx.emitter, account).await?;
    subject.request_status = match kind {
        VerifyEventKind::RequestApprove => RequestStatus::Approve,
        VerifyEventKind::RequestBan => RequestStatus::Ban,
        VerifyEventKind::RequestRemove => RequestStatus::Remove,
        _ => RequestStatus::None,
    };
    match env.chain.verify_state(&ctx.emitter, account).await {
        Some(state) => subject.status = status_at(&state, ctx.block_timestamp),
        None => warn!(verify = %ctx.emitter, account = %account, "state read reverted"),
    }
    subject.events.push(record.id.clone());
    env.store.save(&subject).await?;

    // The acting sender's history also carries the record.
    if sender != account {
        let mut actor = get_verify_address(env, &ctx.emitter, sender).await?;
        actor.events.push(record.id.clone());
        env.store.save(&actor).await?;
    }
    Ok(())
}

async fn handle_role_granted(
    env: &Env,
    ctx: &EventCtx,
    role_hash: &str,
    account: &str,
) -> Result<(), ProjectionError> {
    let Some(role) = role_of(role_hash) else {
        return Ok(());
    };
    let mut subject = get_verify_address(env, &ctx.emitter, account).await?;
    if subject.roles.contains(&role) {
        return Ok(());
    }
    subject.grant(role);
    env.store.save(&subject).await?;

    if let Some(mut verify) = env.store.load::<Verify>(&ctx.emitter).await? {
        let list = role_list_mut(&mut verify, role);
        list.push(subject.id.clone());
        env.store.save(&verify).await?;
    }
    Ok(())
}

async fn handle_role_revoked(
    env: &Env,
    ctx: &EventCtx,
    role_hash: &str,
    account: &str,
) -> Result<(), ProjectionError> {
    let Some(role) = role_of(role_hash) else {
        return Ok(());
    };
    let mut subject = get_verify_address(env, &ctx.emitter, account).await?;
    subject.revoke(role);
    env.store.save(&subject).await?;

    if let Some(mut verify) = env.store.load::<Verify>(&ctx.emitter).await? {
        let id = subject.id.clone();
        let list = role_list_mut(&mut verify, role);
        list.retain(|a| *a != id);
        env.store.save(&verify).await?;
    }
    Ok(())
}

fn role_list_mut(verify: &mut Verify, role: Role) -> &mut Vec<String> {
    match role {
        Role::Approver => &mut verify.approvers,
        Role::Remover => &mut verify.removers,
        Role::Banner => &mut verify.banners,
        Role::ApproverAdmin => &mut verify.approver_admins,
        Role::RemoverAdmin => &mut verify.remover_admins,
        Role::BannerAdmin => &mut verify.banner_admins,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::harness;
    use entgraph_core::chain::VerifyTimes;
    use entgraph_core::entities::verify::VerifyStatus;

    const VERIFY: &str = "0x00000000000000000000000000000000000000aa";
    const ACCOUNT: &str = "0x0000000000000000000000000000000000000001";
    const APPROVER_ACCT: &str = "0x0000000000000000000000000000000000000002";

    fn ctx(tx: &str, ts: u64) -> EventCtx {
        EventCtx {
            emitter: VERIFY.into(),
            tx_hash: tx.into(),
            tx_from: APPROVER_ACCT.into(),
            block_number: 7,
            block_timestamp: ts,
            log_index: 0,
        }
    }

    async fn seeded_verify(h: &crate::testutil::Harness) {
        let verify = Verify::new(VERIFY, 1, 10, "0xdep", "0xfac");
        h.env.store.save(&verify).await.unwrap();
    }

    #[tokio::test]
    async fn request_approve_then_approve() {
        let h = harness();
        seeded_verify(&h).await;
        h.chain.set_verify_state(
            VERIFY,
            ACCOUNT,
            VerifyTimes {
                added_since: 100,
                approved_since: 0,
                banned_since: 0,
            },
        );

        let request = VerifyEvent::Attest {
            kind: VerifyEventKind::RequestApprove,
            sender: ACCOUNT.into(),
            account: ACCOUNT.into(),
            data: "0x01".into(),
        };
        handle(&h.env, &ctx("0xt1", 100), &request).await.unwrap();

        let id = composite(&[VERIFY, ACCOUNT]);
        let subject: VerifyAddress = h.env.store.load(&id).await.unwrap().unwrap();
        assert_eq!(subject.request_status, RequestStatus::Approve);
        assert_eq!(subject.status, VerifyStatus::Added);
        assert_eq!(subject.events.len(), 1);

        h.chain.set_verify_state(
            VERIFY,
            ACCOUNT,
            VerifyTimes {
                added_since: 100,
                approved_since: 150,
                banned_since: 0,
            },
        );
        let approve = VerifyEvent::Attest {
            kind: VerifyEventKind::Approve,
            sender: APPROVER_ACCT.into(),
            account: ACCOUNT.into(),
            data: "0x02".into(),
        };
        handle(&h.env, &ctx("0xt2", 150), &approve).await.unwrap();

        let subject: VerifyAddress = h.env.store.load(&id).await.unwrap().unwrap();
        assert_eq!(subject.request_status, RequestStatus::None);
        assert_eq!(subject.status, VerifyStatus::Approved);
        assert_eq!(subject.events.len(), 2);

        // Approver's history carries the approval too.
        let actor_id = composite(&[VERIFY, APPROVER_ACCT]);
        let actor: VerifyAddress = h.env.store.load(&actor_id).await.unwrap().unwrap();
        assert_eq!(actor.events.len(), 1);

        let verify: Verify = h.env.store.load(VERIFY).await.unwrap().unwrap();
        assert_eq!(verify.verify_event_count, 2);
        assert_eq!(verify.request_approvals.len(), 1);
        assert_eq!(verify.approvals.len(), 1);
        assert_eq!(verify.verify_addresses.len(), 2);
    }

    #[tokio::test]
    async fn reverted_state_read_keeps_previous_status() {
        let h = harness();
        seeded_verify(&h).await;
        // No scripted state: the read reverts, status stays Nil.
        let request = VerifyEvent::Attest {
            kind: VerifyEventKind::RequestBan,
            sender: ACCOUNT.into(),
            account: ACCOUNT.into(),
            data: "0x".into(),
        };
        handle(&h.env, &ctx("0xt1", 100), &request).await.unwrap();

        let id = composite(&[VERIFY, ACCOUNT]);
        let subject: VerifyAddress = h.env.store.load(&id).await.unwrap().unwrap();
        assert_eq!(subject.status, VerifyStatus::Nil);
        assert_eq!(subject.request_status, RequestStatus::Ban);
    }

    #[tokio::test]
    async fn role_grant_and_revoke_maintain_lists() {
        let h = harness();
        seeded_verify(&h).await;

        let grant = VerifyEvent::RoleGranted {
            role: APPROVER.into(),
            account: APPROVER_ACCT.into(),
            sender: "0xadmin".into(),
        };
        handle(&h.env, &ctx("0xg1", 50), &grant).await.unwrap();
        // A second grant of the same role is a no-op.
        handle(&h.env, &ctx("0xg2", 51), &grant).await.unwrap();

        let id = composite(&[VERIFY, APPROVER_ACCT]);
        let subject: VerifyAddress = h.env.store.load(&id).await.unwrap().unwrap();
        assert_eq!(subject.roles, vec![Role::Approver]);

        let verify: Verify = h.env.store.load(VERIFY).await.unwrap().unwrap();
        assert_eq!(verify.approvers, vec![id.clone()]);

        let revoke = VerifyEvent::RoleRevoked {
            role: APPROVER.into(),
            account: APPROVER_ACCT.into(),
            sender: "0xadmin".into(),
        };
        handle(&h.env, &ctx("0xr1", 60), &revoke).await.unwrap();

        let subject: VerifyAddress = h.env.store.load(&id).await.unwrap().unwrap();
        assert!(subject.roles.is_empty());
        let verify: Verify = h.env.store.load(VERIFY).await.unwrap().unwrap();
        assert!(verify.approvers.is_empty());
    }

    #[tokio::test]
    async fn unknown_role_hash_is_ignored() {
        let h = harness();
        seeded_verify(&h).await;
        let grant = VerifyEvent::RoleGranted {
            role: "0xdead".into(),
            account: ACCOUNT.into(),
            sender: "0xadmin".into(),
        };
        handle(&h.env, &ctx("0xg1", 50), &grant).await.unwrap();
        let id = composite(&[VERIFY, ACCOUNT]);
        assert!(h
            .env
            .store
            .load::<VerifyAddress>(&id)
            .await
            .unwrap()
            .is_none());
    }
}
