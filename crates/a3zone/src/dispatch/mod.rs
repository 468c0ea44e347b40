//! Command dispatch for authenticated sessions (and `AUTH_TOKEN`).
//!
//! Every handler queues its replies on the session's outbound channel
//! and reports back an [`Effect`] telling the connection loop what to do
//! next. Handlers are plain functions apart from authentication, which
//! sleeps on failure and loads from the store. None of them holds a
//! lock across an `.await`.

mod auth;
mod character;
mod combat;
mod social;
mod world;

pub(crate) use social::announce_departure;

use std::sync::Arc;

use a3zone_protocol::ClientCommand;
use a3zone_session::Session;

use crate::ZoneError;
use crate::context::ZoneContext;

/// What the connection loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    /// Nothing else to do.
    Done,
    /// The character changed and must be persisted.
    Changed,
    /// Close the connection.
    Close,
}

impl Effect {
    fn changed_if(changed: bool) -> Self {
        if changed { Self::Changed } else { Self::Done }
    }
}

/// Runs one decoded command for `session`.
///
/// # Errors
/// Only when the session's own outbound queue is gone, which means the
/// connection is already shutting down.
pub(crate) async fn dispatch(
    ctx: &Arc<ZoneContext>,
    session: &Arc<Session>,
    cmd: ClientCommand,
) -> Result<Effect, ZoneError> {
    tracing::debug!(session = %session.id(), command = cmd.name(), "dispatching command");

    match cmd {
        ClientCommand::AuthToken(args) => auth::authenticate(ctx, session, args).await,

        ClientCommand::Move(to) => world::move_to(ctx, session, to),
        ClientCommand::EnterWorld(args) => world::enter_world(ctx, session, args.world_id),
        ClientCommand::GetHistory => world::history(ctx, session),
        ClientCommand::ListEntities => world::list_entities(ctx, session),

        ClientCommand::GetState => character::state(ctx, session),
        ClientCommand::SkillTree => character::skill_tree(session),
        ClientCommand::LearnSkill(args) => character::learn_skill(session, &args.skill_id),
        ClientCommand::TalkNpc(args) => {
            character::talk_npc(session, args.npc.as_deref(), args.choice.as_deref())
        }
        ClientCommand::AcceptQuest(args) => character::accept_quest(session, &args.quest_id),
        ClientCommand::CompleteQuest(args) => {
            character::complete_quest(ctx, session, &args.quest_id)
        }
        ClientCommand::SetElement(args) => {
            character::set_element(session, &args.target, &args.element)
        }
        ClientCommand::SummonPet(args) => character::summon_pet(session, args.pet.as_deref()),
        ClientCommand::RecruitMerc(args) => {
            character::recruit_mercenary(session, args.class.as_deref())
        }
        ClientCommand::EquipItem(args) => character::equip(session, &args.item_id),
        ClientCommand::GetRecipes => character::recipes(session),
        ClientCommand::CraftItem(args) => character::craft(session, &args.recipe_id, args.qty),

        ClientCommand::Attack(args) => combat::train(session, args),
        ClientCommand::AttackMob(args) => combat::attack_mob(ctx, session, args),
        ClientCommand::AttackPvp(args) => combat::attack_player(ctx, session, args),
        ClientCommand::RecoverCorpse => combat::recover_corpse(session),

        ClientCommand::Say(args) => social::say(ctx, session, &args.message),
        ClientCommand::WorldChat(args) => social::world_chat(ctx, session, &args.message),
        ClientCommand::Whisper(args) => social::whisper(ctx, session, &args.target, &args.message),
        ClientCommand::Who => social::who(ctx, session),
        ClientCommand::PartyInvite(args) => social::party_invite(ctx, session, &args.target),
        ClientCommand::PartyAccept(args) => {
            social::party_accept(ctx, session, args.from.as_deref())
        }
        ClientCommand::PartyLeave => social::party_leave(ctx, session),
        ClientCommand::PartyInfo => social::party_info(ctx, session),
        ClientCommand::GuildCreate(args) => social::guild_create(ctx, session, &args.guild),
        ClientCommand::GuildJoin(args) => social::guild_join(ctx, session, &args.guild),
        ClientCommand::GuildLeave => social::guild_leave(ctx, session),
        ClientCommand::GuildList => social::guild_list(ctx, session),
    }
}
