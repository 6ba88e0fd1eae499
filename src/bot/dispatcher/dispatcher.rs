use std::{sync::{atomic::{AtomicU64, Ordering}, Arc}, time::Duration};

use tracing::{debug, error, info, warn};

use crate::bot::{
    arguments::arguments::{parse_interaction, parse_text, Arguments},
    chat_event::chat_event::{
        ChatEvent, CommandInvocation, ComponentActivation, EventOrigin, InteractionEvent, InteractionOption, MessageEvent, OptionValue,
    },
    commands::{commands::{CmdContext, Command, ComponentContext}, CommandRegistry},
    guild::guild::{GuildContext, GuildDirectory},
    handler::handler::ChatClient,
    permissions::permissions::{has_permission, AllowAll, Authorizer, InvocationPolicy},
    recovery::recovery::Recovery,
    trigger::trigger::extract_command,
};

/// Invocations between two reclamation hints.
pub const RECLAIM_EVERY: u64 = 25;
pub const NOT_FOUND_REACTION: &str = "❌";
pub const NOT_FOUND_REPLY: &str = "❌ Error! Command not found!";
pub const UNKNOWN_COMMAND: &str = "Unknown command";

pub type ReclaimHook = Arc<dyn Fn() + Send + Sync>;

/// Routes inbound events to registered handlers.
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    guilds: Arc<dyn GuildDirectory>,
    client: Arc<dyn ChatClient>,
    auth: Arc<dyn Authorizer>,
    policy: Arc<dyn InvocationPolicy>,
    recovery: Recovery,
    invocations: AtomicU64,
    reclaim: ReclaimHook,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        guilds: Arc<dyn GuildDirectory>,
        client: Arc<dyn ChatClient>,
        auth: Arc<dyn Authorizer>,
        notice_delay: Duration,
    ) -> Self {
        Self {
            recovery: Recovery::new(client.clone(), auth.clone(), notice_delay),
            registry,
            guilds,
            client,
            auth,
            policy: Arc::new(AllowAll),
            invocations: AtomicU64::new(0),
            reclaim: Arc::new(|| debug!("Reclamation hint after {} invocations", RECLAIM_EVERY)),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn InvocationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_reclaim_hook(mut self, hook: ReclaimHook) -> Self {
        self.reclaim = hook;
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn client(&self) -> &Arc<dyn ChatClient> {
        &self.client
    }

    pub async fn dispatch(&self, event: ChatEvent) {
        match event {
            ChatEvent::Message(msg) => self.on_message(msg).await,
            ChatEvent::Interaction(interaction) => self.on_interaction(interaction).await,
        }
    }

    /// Text path: prefix → alias → command → (child) → arguments → handler.
    pub async fn on_message(&self, msg: MessageEvent) {
        let bot_id = self.client.bot_user_id();
        if msg.author.bot || Some(msg.author.user_id) == bot_id {
            return;
        }

        let guild = self.guilds.resolve_context(msg.guild_id).await;
        let cfg = guild.config().await;

        let Some(invocation) = extract_command(&cfg, bot_id, &msg.content) else {
            return;
        };

        let is_admin = self.auth.is_elevated_admin(msg.author.user_id);
        if !is_admin && !self.policy.allows(&guild, &msg.author, msg.channel_id, &invocation.trigger).await {
            debug!("Policy rejected '{}' from {} in {}", invocation.trigger, msg.author.user_id, msg.channel_id);
            return;
        }

        let Some(command) = self.registry.resolve(&invocation.trigger).cloned() else {
            warn!("Command was not found: {}", invocation.trigger);
            if is_admin {
                if let Err(e) = self.client.react(msg.channel_id, msg.id, NOT_FOUND_REACTION).await {
                    error!("Failed to react to {}: {e}", msg.id);
                }
                if let Err(e) = self.client.reply(msg.channel_id, msg.id, NOT_FOUND_REPLY).await {
                    error!("Failed to reply to {}: {e}", msg.id);
                }
            }
            return;
        };

        let (target, args) = if command.info.is_parent {
            self.resolve_child(&command, &invocation.remainder)
        } else {
            let args = parse_text(&invocation.remainder, &command.info.arguments);
            (command, args)
        };

        // The resolved child's flag counts, not the parent's
        if target.info.typing && cfg.response_channel_id.is_none() {
            if let Err(e) = self.client.broadcast_typing(msg.channel_id).await {
                debug!("Typing indicator failed in {}: {e}", msg.channel_id);
            }
        }

        self.invoke(&target, args, guild, EventOrigin::Message(msg)).await;
        self.count_invocation();
    }

    pub async fn on_interaction(&self, event: InteractionEvent) {
        match event {
            InteractionEvent::Command(invocation) => self.on_command_interaction(invocation).await,
            InteractionEvent::Component(activation) => self.on_component(activation).await,
        }
    }

    async fn on_command_interaction(&self, invocation: CommandInvocation) {
        let interaction = invocation.interaction;
        let guild = self.guilds.resolve_context(interaction.guild_id).await;

        let Some(command) = self.registry.command(&invocation.name).cloned() else {
            warn!("Interaction for unknown command '{}'", invocation.name);
            if let Err(e) = self.client.create_interaction_response(&interaction, UNKNOWN_COMMAND, true).await {
                error!("err responding to interaction {e}");
            }
            return;
        };

        let invoker = &interaction.invoker;
        if !self.auth.is_elevated_admin(invoker.user_id)
            && !self.policy.allows(&guild, invoker, interaction.channel_id, &command.info.trigger).await
        {
            return;
        }

        if !has_permission(invoker, command.info.permission(), &guild, self.auth.as_ref()).await {
            debug!("{} may not use '{}'", invoker.user_id, command.info.trigger);
            return;
        }

        let target = if command.info.is_parent {
            self.interaction_child(&command, &invocation.options)
        } else {
            command
        };

        let args = parse_interaction(&invocation.options);
        self.invoke(&target, args, guild, EventOrigin::Interaction(interaction)).await;
        self.count_invocation();
    }

    async fn on_component(&self, activation: ComponentActivation) {
        let Some(component) = self.registry.component(&activation.custom_id).cloned() else {
            warn!("No component handler registered for '{}'", activation.custom_id);
            return;
        };

        let guild = self.guilds.resolve_context(activation.interaction.guild_id).await;
        let origin = EventOrigin::Interaction(activation.interaction.clone());
        let ctx = ComponentContext { guild, activation, client: self.client.clone() };

        let handler = component.handler.clone();
        self.recovery.supervise(&origin, &component.id, async move { handler(ctx).await }).await;
    }

    /// Picks the child named by the first word of `remainder`, or falls back
    /// to the parent itself with no arguments.
    fn resolve_child(&self, parent: &Command, remainder: &str) -> (Command, Arguments) {
        let (first, rest) = match remainder.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim_start()),
            None => (remainder, ""),
        };

        match self.registry.child(&parent.info.trigger, first) {
            Some(child) => (child.clone(), parse_text(rest, &child.info.arguments)),
            None => (parent.clone(), Arguments::default()),
        }
    }

    /// Sub-commands arrive as a nested option named after the child.
    fn interaction_child(&self, parent: &Command, options: &[InteractionOption]) -> Command {
        options
            .iter()
            .find(|o| matches!(o.value, OptionValue::Nested(_)))
            .and_then(|o| self.registry.child(&parent.info.trigger, &o.name))
            .cloned()
            .unwrap_or_else(|| parent.clone())
    }

    async fn invoke(&self, command: &Command, args: Arguments, guild: Arc<GuildContext>, origin: EventOrigin) {
        info!("Running '{}' for {} in {}", command.info.trigger, origin.invoker().user_id, origin.channel_id());

        let ctx = CmdContext {
            guild,
            cmd: command.info.clone(),
            args,
            origin: origin.clone(),
            client: self.client.clone(),
            registry: self.registry.clone(),
            auth: self.auth.clone(),
        };

        // Calling the handler happens inside the supervised future so a panic
        // before the first await is contained too.
        let handler = command.handler.clone();
        self.recovery.supervise(&origin, &command.info.trigger, async move { handler(ctx).await }).await;
    }

    fn count_invocation(&self) {
        let n = self.invocations.fetch_add(1, Ordering::Relaxed) + 1;
        if n % RECLAIM_EVERY == 0 {
            (self.reclaim)();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::{future::BoxFuture, FutureExt};
    use serenity::all::{ChannelId, GuildId, InteractionId, MessageId, RoleId, UserId};

    use super::*;
    use crate::bot::{
        arguments::arguments::{ArgInfo, ArgType},
        chat_event::chat_event::{InteractionRef, Invoker},
        commands::{commands::{BotResult, CommandInfo, Component}, RegistryBuilder},
        guild::guild::{GuildConfig, GuildStore},
        handler::mock::{Call, MockClient},
        permissions::permissions::AdminList,
        recovery::recovery::ERROR_NOTICE,
    };

    const ADMIN: u64 = 1;
    const MODERATOR: u64 = 2;
    const USER: u64 = 3;
    const MOD_ROLE: u64 = 50;

    type Seen = Arc<Mutex<Vec<(String, Arguments)>>>;

    fn recorder(seen: &Seen, label: &'static str) -> impl Fn(CmdContext) -> BoxFuture<'static, BotResult<()>> + Send + Sync + 'static {
        let seen = seen.clone();
        move |ctx| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push((label.to_string(), ctx.args.clone()));
                Ok(())
            }
            .boxed()
        }
    }

    struct Harness {
        dispatcher: Dispatcher,
        client: Arc<MockClient>,
        seen: Seen,
    }

    async fn explode() -> BotResult<()> {
        panic!("index out of bounds")
    }

    fn harness<F>(setup: F) -> Harness where F: FnOnce(&mut RegistryBuilder, &Seen) {
        harness_with(MockClient::new(), setup)
    }

    fn harness_with<F>(mut mock: MockClient, setup: F) -> Harness where F: FnOnce(&mut RegistryBuilder, &Seen) {
        let seen: Seen = Arc::default();
        let mut builder = RegistryBuilder::new();
        setup(&mut builder, &seen);

        let mut cfg = GuildConfig::default();
        cfg.moderators.insert(UserId::new(MODERATOR));
        cfg.moderator_roles.insert(RoleId::new(MOD_ROLE));
        let mut guilds = std::collections::HashMap::new();
        guilds.insert(GuildId::new(10), cfg);

        mock.bot_id = Some(UserId::new(999));
        let client = Arc::new(mock);

        let dispatcher = Dispatcher::new(
            builder.seal(),
            Arc::new(GuildStore::with_guilds(GuildConfig::default(), guilds)),
            client.clone(),
            Arc::new(AdminList::new([UserId::new(ADMIN)])),
            Duration::from_secs(5),
        );

        Harness { dispatcher, client, seen }
    }

    fn invoker(user: u64) -> Invoker {
        Invoker { user_id: UserId::new(user), roles: Vec::new(), bot: false }
    }

    fn message(user: u64, content: &str) -> MessageEvent {
        MessageEvent {
            id: MessageId::new(77),
            guild_id: Some(GuildId::new(10)),
            channel_id: ChannelId::new(20),
            author: invoker(user),
            content: content.to_string(),
        }
    }

    fn slash(user: Invoker, name: &str, options: Vec<InteractionOption>) -> InteractionEvent {
        InteractionEvent::Command(CommandInvocation {
            interaction: InteractionRef {
                id: InteractionId::new(30),
                token: "token".into(),
                guild_id: Some(GuildId::new(10)),
                channel_id: ChannelId::new(20),
                invoker: user,
            },
            name: name.to_string(),
            options,
        })
    }

    fn config_tree(builder: &mut RegistryBuilder, seen: &Seen) {
        builder.register(Command::new(CommandInfo::new("config", "Configure").parent().public(), recorder(seen, "config")));
        builder.register_child(Command::new(
            CommandInfo::new("set", "Set").child_of("config").arg(ArgInfo::new("value", ArgType::String, "v")),
            recorder(seen, "set"),
        ));
        builder.register_child(Command::new(CommandInfo::new("get", "Get").child_of("config"), recorder(seen, "get")));
    }

    fn seen(h: &Harness) -> Vec<(String, Arguments)> {
        h.seen.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn child_commands_and_parent_fallback() {
        let h = harness(config_tree);

        h.dispatcher.on_message(message(USER, "!config set foo")).await;
        h.dispatcher.on_message(message(USER, "!config")).await;
        h.dispatcher.on_message(message(USER, "!config bogus value")).await;
        h.dispatcher.on_message(message(USER, "!CONFIG get")).await;

        let seen = seen(&h);
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].0, "set");
        assert_eq!(seen[0].1.string("value"), Some("foo"));
        assert_eq!(seen[1].0, "config");
        assert!(seen[1].1.is_empty());
        assert_eq!(seen[2].0, "config");
        assert!(seen[2].1.is_empty());
        assert_eq!(seen[3].0, "get");
        assert!(seen[3].1.is_empty());
    }

    #[tokio::test]
    async fn aliases_route_to_their_command() {
        let h = harness(|b, seen| {
            b.register(Command::new(
                CommandInfo::new("ban", "Ban").aliases(["hammer"]).arg(ArgInfo::new("who", ArgType::User, "w")),
                recorder(seen, "ban"),
            ));
        });

        h.dispatcher.on_message(message(USER, "!HAMMER <@5>")).await;
        h.dispatcher.on_message(message(USER, "<@999> ban 6")).await;

        let seen = seen(&h);
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1.user("who"), Some(UserId::new(5)));
        assert_eq!(seen[1].1.user("who"), Some(UserId::new(6)));
    }

    #[tokio::test]
    async fn newest_registration_wins() {
        let h = harness(|b, seen| {
            b.register(Command::new(CommandInfo::new("ping", "old"), recorder(seen, "old")));
            b.register(Command::new(CommandInfo::new("Ping", "new"), recorder(seen, "new")));
        });

        h.dispatcher.on_message(message(USER, "!ping")).await;
        assert_eq!(seen(&h)[0].0, "new");
    }

    #[tokio::test]
    async fn unknown_command_only_answers_admins() {
        let h = harness(|_, _| {});

        h.dispatcher.on_message(message(USER, "!nothing")).await;
        assert!(h.client.calls().is_empty());

        h.dispatcher.on_message(message(ADMIN, "!nothing")).await;
        assert_eq!(
            h.client.calls(),
            vec![
                Call::React { message: MessageId::new(77), emoji: NOT_FOUND_REACTION.into() },
                Call::Reply { channel: ChannelId::new(20), to: MessageId::new(77), content: NOT_FOUND_REPLY.into() },
            ]
        );
    }

    #[tokio::test]
    async fn ignores_bots_and_plain_chat() {
        let h = harness(config_tree);

        let mut from_bot = message(USER, "!config");
        from_bot.author.bot = true;
        h.dispatcher.on_message(from_bot).await;
        h.dispatcher.on_message(message(999, "!config")).await;
        h.dispatcher.on_message(message(USER, "config set foo")).await;

        assert!(seen(&h).is_empty());
    }

    #[tokio::test]
    async fn typing_is_best_effort() {
        let mut mock = MockClient::new();
        mock.fail_typing = true;
        let h = harness_with(mock, |b, seen| {
            b.register(Command::new(CommandInfo::new("slow", "Slow").typing(), recorder(seen, "slow")));
        });

        h.dispatcher.on_message(message(USER, "!slow")).await;
        assert_eq!(h.client.calls(), vec![Call::Typing(ChannelId::new(20))]);
        assert_eq!(seen(&h).len(), 1);
    }

    #[tokio::test]
    async fn typing_follows_the_resolved_child() {
        let h = harness(|b, seen| {
            b.register(Command::new(CommandInfo::new("report", "Report").parent(), recorder(seen, "report")));
            b.register_child(Command::new(CommandInfo::new("build", "Build").child_of("report").typing(), recorder(seen, "build")));
        });

        h.dispatcher.on_message(message(USER, "!report")).await;
        assert!(h.client.calls().is_empty());

        h.dispatcher.on_message(message(USER, "!report build")).await;
        assert_eq!(h.client.calls(), vec![Call::Typing(ChannelId::new(20))]);

        let labels: Vec<String> = seen(&h).into_iter().map(|(label, _)| label).collect();
        assert_eq!(labels, ["report", "build"]);
    }

    #[tokio::test(start_paused = true)]
    async fn panics_are_contained_per_invocation() {
        let h = harness(|b, seen| {
            b.register(Command::new(CommandInfo::new("boom", "Boom"), |_ctx| explode().boxed()));
            b.register(Command::new(CommandInfo::new("ping", "Ping"), recorder(seen, "ping")));
        });

        h.dispatcher.on_message(message(USER, "!boom")).await;
        h.dispatcher.on_message(message(USER, "!ping")).await;

        assert_eq!(seen(&h).len(), 1);
        assert_eq!(h.client.count(|c| matches!(c, Call::Direct { .. })), 1);
        assert_eq!(h.client.count(|c| matches!(c, Call::Send { content, .. } if content == ERROR_NOTICE)), 1);
        assert_eq!(h.client.count(|c| matches!(c, Call::Delete { .. })), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn panic_while_building_the_future_is_contained() {
        let h = harness(|b, _| {
            b.register(Command::new(CommandInfo::new("eager", "Eager"), |_ctx| -> BoxFuture<'static, BotResult<()>> {
                panic!("before the future exists")
            }));
        });

        h.dispatcher.on_message(message(USER, "!eager")).await;
        assert_eq!(h.client.count(|c| matches!(c, Call::Direct { .. })), 1);
    }

    #[tokio::test]
    async fn interaction_options_are_flattened() {
        let h = harness(config_tree);
        let options = vec![InteractionOption::new(
            "set",
            OptionValue::Nested(vec![
                InteractionOption::new("value", OptionValue::String("bar".into())),
                InteractionOption::new("force", OptionValue::Bool(true)),
            ]),
        )];

        h.dispatcher.on_interaction(slash(invoker(USER), "config", options)).await;

        let seen = seen(&h);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "set");
        assert_eq!(seen[0].1.string("value"), Some("bar"));
        assert_eq!(seen[0].1.bool("force"), Some(true));
    }

    #[tokio::test]
    async fn interaction_authorization() {
        let h = harness(|b, seen| {
            b.register(Command::new(CommandInfo::new("purge", "Purge"), recorder(seen, "purge")));
        });

        h.dispatcher.on_interaction(slash(invoker(USER), "purge", Vec::new())).await;
        assert!(seen(&h).is_empty());
        assert!(h.client.calls().is_empty());

        h.dispatcher.on_interaction(slash(invoker(MODERATOR), "purge", Vec::new())).await;
        let by_role = Invoker { user_id: UserId::new(USER), roles: vec![RoleId::new(MOD_ROLE)], bot: false };
        h.dispatcher.on_interaction(slash(by_role, "purge", Vec::new())).await;
        h.dispatcher.on_interaction(slash(invoker(ADMIN), "purge", Vec::new())).await;
        assert_eq!(seen(&h).len(), 3);
    }

    #[tokio::test]
    async fn interactions_skip_alias_lookup() {
        let h = harness(|b, seen| {
            b.register(Command::new(CommandInfo::new("ban", "Ban").aliases(["hammer"]).public(), recorder(seen, "ban")));
        });

        h.dispatcher.on_interaction(slash(invoker(USER), "hammer", Vec::new())).await;
        assert!(seen(&h).is_empty());
        assert_eq!(h.client.calls(), vec![Call::CreateResponse { content: UNKNOWN_COMMAND.into(), ephemeral: true }]);
    }

    #[tokio::test]
    async fn components_route_by_custom_id() {
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        let h = harness(move |b, _| {
            b.register_component(Component::new("Help:Refresh", move |_ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }.boxed()
            }));
        });

        let activation = |id: &str| {
            InteractionEvent::Component(ComponentActivation {
                interaction: InteractionRef {
                    id: InteractionId::new(31),
                    token: "t".into(),
                    guild_id: None,
                    channel_id: ChannelId::new(20),
                    invoker: invoker(USER),
                },
                custom_id: id.to_string(),
            })
        };

        h.dispatcher.on_interaction(activation("help:refresh")).await;
        h.dispatcher.on_interaction(activation("missing")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reclaim_hint_every_n_invocations() {
        let hints = Arc::new(AtomicU64::new(0));
        let counter = hints.clone();
        let h = harness(|b, seen| {
            b.register(Command::new(CommandInfo::new("ping", "Ping"), recorder(seen, "ping")));
        });
        let dispatcher = h.dispatcher.with_reclaim_hook(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        for _ in 0..(RECLAIM_EVERY * 2 + 3) {
            dispatcher.on_message(message(USER, "!ping")).await;
        }
        assert_eq!(hints.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn policy_filters_non_admins() {
        struct DenyAll;

        #[async_trait::async_trait]
        impl InvocationPolicy for DenyAll {
            async fn allows(&self, _: &GuildContext, _: &Invoker, _: ChannelId, _: &str) -> bool {
                false
            }
        }

        let h = harness(|b, seen| {
            b.register(Command::new(CommandInfo::new("ping", "Ping").public(), recorder(seen, "ping")));
        });
        let dispatcher = h.dispatcher.with_policy(Arc::new(DenyAll));

        dispatcher.on_message(message(USER, "!ping")).await;
        assert!(h.seen.lock().unwrap().is_empty());
        dispatcher.on_message(message(ADMIN, "!ping")).await;
        assert_eq!(h.seen.lock().unwrap().len(), 1);
    }
}
