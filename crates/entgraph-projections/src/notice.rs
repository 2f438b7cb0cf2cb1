//! NoticeBoard handlers.

use entgraph_core::entities::escrow::ClaimEscrow;
use entgraph_core::entities::notice::{Notice, NoticeSubjectKind, UnknownNotice};
use entgraph_core::entities::sale::Sale;
use entgraph_core::entities::tier::{CombineTier, UnknownTier, VerifyTier};
use entgraph_core::entities::verify::Verify;
use entgraph_core::error::ProjectionError;
use entgraph_core::event::EventCtx;
use entgraph_core::events::NoticeBoardEvent;
use entgraph_core::key::composite;
use entgraph_core::store::EntityStoreExt;

use crate::engine::Env;

/// The id carries the subject bucket and its current notice count, so
/// several notices in one transaction stay distinct.
fn new_notice(
    ctx: &EventCtx,
    sender: &str,
    subject: &str,
    subject_kind: NoticeSubjectKind,
    data: &str,
    bucket: &str,
    sequence: usize,
) -> Notice {
    Notice {
        id: composite(&[bucket, &ctx.tx_hash, &sequence.to_string()]),
        sender: sender.to_string(),
        subject: subject.to_string(),
        subject_kind,
        data: data.to_string(),
        deploy_block: ctx.block_number,
        deploy_timestamp: ctx.block_timestamp,
    }
}

pub async fn handle(
    env: &Env,
    ctx: &EventCtx,
    event: &NoticeBoardEvent,
) -> Result<(), ProjectionError> {
    let NoticeBoardEvent::NewNotice {
        sender,
        subject,
        data,
    } = event;

    let subject_kind = crate::resolver::resolve_notice_subject(env, subject).await?;

    match subject_kind {
        NoticeSubjectKind::Sale => {
            if let Some(mut sale) = env.store.load::<Sale>(subject).await? {
                let notice = new_notice(
                    ctx,
                    sender,
                    subject,
                    subject_kind,
                    data,
                    &sale.id,
                    sale.notices.len(),
                );
                env.store.save(&notice).await?;
                sale.notices.push(notice.id);
                env.store.save(&sale).await?;
            }
        }
        NoticeSubjectKind::Verify => {
            if let Some(mut verify) = env.store.load::<Verify>(subject).await? {
                let notice = new_notice(
                    ctx,
                    sender,
                    subject,
                    subject_kind,
                    data,
                    &verify.id,
                    verify.notices.len(),
                );
                env.store.save(&notice).await?;
                verify.notices.push(notice.id);
                env.store.save(&verify).await?;
            }
        }
        NoticeSubjectKind::VerifyTier => {
            if let Some(mut tier) = env.store.load::<VerifyTier>(subject).await? {
                let notice = new_notice(
                    ctx,
                    sender,
                    subject,
                    subject_kind,
                    data,
                    &tier.id,
                    tier.notices.len(),
                );
                env.store.save(&notice).await?;
                tier.notices.push(notice.id);
                env.store.save(&tier).await?;
            }
        }
        NoticeSubjectKind::CombineTier => {
            if let Some(mut tier) = env.store.load::<CombineTier>(subject).await? {
                let notice = new_notice(
                    ctx,
                    sender,
                    subject,
                    subject_kind,
                    data,
                    &tier.id,
                    tier.notices.len(),
                );
                env.store.save(&notice).await?;
                tier.notices.push(notice.id);
                env.store.save(&tier).await?;
            }
        }
        NoticeSubjectKind::ClaimEscrow => {
            if let Some(mut escrow) = env.store.load::<ClaimEscrow>(subject).await? {
                let notice = new_notice(
                    ctx,
                    sender,
                    subject,
                    subject_kind,
                    data,
                    &escrow.id,
                    escrow.notices.len(),
                );
                env.store.save(&notice).await?;
                escrow.notices.push(notice.id);
                env.store.save(&escrow).await?;
            }
        }
        NoticeSubjectKind::UnknownTier => {
            if let Some(mut tier) = env.store.load::<UnknownTier>(subject).await? {
                let notice = new_notice(
                    ctx,
                    sender,
                    subject,
                    subject_kind,
                    data,
                    &tier.id,
                    tier.notices.len(),
                );
                env.store.save(&notice).await?;
                tier.notices.push(notice.id);
                env.store.save(&tier).await?;
            }
        }
        NoticeSubjectKind::Unknown => {
            let mut bucket: UnknownNotice = env
                .store
                .load(UnknownNotice::ID)
                .await?
                .unwrap_or_default();
            let notice = new_notice(
                ctx,
                sender,
                subject,
                subject_kind,
                data,
                UnknownNotice::ID,
                bucket.notices.len(),
            );
            env.store.save(&notice).await?;
            bucket.notices.push(notice.id);
            env.store.save(&bucket).await?;
        }
    }
    Ok(())
}
