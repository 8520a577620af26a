//! The built-in demo bot.
//!
//! A small TV-guide style bot: a toy `git` tree showing default fallbacks
//! and a `sub` tree that stores typed subscriptions in the chat data.

use chain_command_core::{
    ArgField, ArgSchema, CommandNode, HostContext, ParsedArgs, Router, RouterConfig, Value,
    ValueType, csv_of, datetime,
};
use chrono::Local;
use serde_json::json;
use tracing::debug;

pub type DemoRouter = Router<HostContext>;
type Node = CommandNode<HostContext>;

const SUBSCRIPTIONS_KEY: &str = "subscriptions";

/// Schema for `sub now`.
pub fn subscription_schema(prefix: char) -> ArgSchema {
    ArgSchema::new(format!("{prefix}sub now"))
        .with_field(ArgField::required("channel", ValueType::String))
        .with_field(ArgField::required("program", ValueType::String))
        .with_field(ArgField::required("ids", ValueType::Any).with_cast(csv_of(ValueType::Integer)))
        .with_field(ArgField::optional("exclude_program", ValueType::String, Value::None))
        .with_field(ArgField::optional("detail", ValueType::String, "*"))
        .with_field(ArgField::lazy("check_time", ValueType::DateTime, Local::now).with_cast(datetime))
        .with_field(
            ArgField::optional("days", ValueType::Any, (0..=6).collect::<Vec<i64>>())
                .with_cast(csv_of(ValueType::Integer)),
        )
        .with_field(ArgField::optional("start_time", ValueType::DateTime, Value::None).with_cast(datetime))
}

/// Schema for `sub remove`.
pub fn remove_schema(prefix: char) -> ArgSchema {
    ArgSchema::new(format!("{prefix}sub remove")).with_field(ArgField::required("channel", ValueType::String))
}

/// Every schema the demo bot uses.
pub fn schemas(prefix: char) -> Vec<ArgSchema> {
    vec![subscription_schema(prefix), remove_schema(prefix)]
}

/// Builds the demo bot for `config`.
///
/// Root names follow the configured prefix. `help` is registered last and
/// lists every other root.
pub fn router(config: RouterConfig) -> DemoRouter {
    let prefix = config.prefix;
    let mut router = Router::new(config)
        .with_root(start(prefix))
        .with_root(git(prefix))
        .with_root(sub(prefix));

    let help = router.help();
    router.add_root(
        Node::leaf(format!("{prefix}help"), move |ctx: &mut HostContext, _: &[String]| {
            ctx.reply(help.clone())
        })
        .with_description("List commands"),
    );
    router
}

fn start(prefix: char) -> Node {
    Node::leaf(format!("{prefix}start"), |ctx: &mut HostContext, _: &[String]| {
        let who = ctx.message.sender.clone().unwrap_or_else(|| "there".to_string());
        ctx.reply(format!("Hello, {who}!"));
    })
    .with_description("Greet the sender")
}

fn git(prefix: char) -> Node {
    let usage = format!("Usage: {prefix}git add <file>... | {prefix}git remote add <name> <url>");
    let remote_usage = format!("Usage: {prefix}git remote add <name> <url>");

    Node::new(format!("{prefix}git"))
        .with_description("Toy version control")
        .with_child(Node::leaf("add", |ctx: &mut HostContext, args: &[String]| {
            if args.is_empty() {
                ctx.reply("Nothing specified, nothing added.");
            } else {
                ctx.reply(format!("Added {}", args.join(", ")));
            }
        }))
        .with_child(
            Node::new("remote")
                .with_child(Node::leaf("add", |ctx: &mut HostContext, args: &[String]| match args {
                    [name, url] => ctx.reply(format!("Remote {name} -> {url}")),
                    _ => ctx.reply("Usage: remote add <name> <url>"),
                }))
                .with_default(move |ctx: &mut HostContext, args: &[String]| {
                    if let Some(unknown) = args.first() {
                        ctx.reply(format!("Unknown remote command: {unknown}"));
                    }
                    ctx.reply(remote_usage.clone());
                }),
        )
        .with_default(move |ctx: &mut HostContext, args: &[String]| {
            if let Some(unknown) = args.first() {
                ctx.reply(format!("Unknown git command: {unknown}"));
            }
            ctx.reply(usage.clone());
        })
}

fn sub(prefix: char) -> Node {
    let usage = subscription_schema(prefix).usage();

    Node::new(format!("{prefix}sub"))
        .with_description("Program subscriptions")
        .with_child(Node::leaf("now", subscribe(subscription_schema(prefix))))
        .with_child(Node::leaf("list", list_subscriptions).with_alias("ls"))
        .with_child(Node::leaf("remove", unsubscribe(remove_schema(prefix))).with_alias("rm"))
        .with_default(move |ctx: &mut HostContext, _: &[String]| ctx.reply(usage.clone()))
}

fn stored_subscriptions(ctx: &HostContext) -> Vec<serde_json::Value> {
    ctx.chat_data
        .get(SUBSCRIPTIONS_KEY)
        .and_then(serde_json::Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn subscribe(schema: ArgSchema) -> impl Fn(&mut HostContext, &[String]) + Send + Sync + 'static {
    move |ctx: &mut HostContext, args: &[String]| {
        if !schema.check_arg_len(args) {
            ctx.reply(schema.usage());
            return;
        }
        let parsed = match schema.parse(args) {
            Ok(parsed) => parsed.multiple().unwrap_or_default(),
            Err(err) => {
                ctx.reply(format!("Error: {err}"));
                return;
            }
        };
        let record = match serde_json::to_value(&parsed) {
            Ok(record) => record,
            Err(err) => {
                ctx.reply(format!("Error: {err}"));
                return;
            }
        };

        let mut subs = stored_subscriptions(ctx);
        subs.push(record);
        debug!(chat_id = ctx.message.chat_id, count = subs.len(), "Stored subscription");
        ctx.chat_data.insert(SUBSCRIPTIONS_KEY, json!(subs));
        ctx.reply(describe(&parsed));
    }
}

fn describe(args: &ParsedArgs) -> String {
    let field = |name: &str| args.get(name).map(ToString::to_string).unwrap_or_default();
    format!(
        "Subscribed to {} on {} (ids {}, days {})",
        field("program"),
        field("channel"),
        field("ids"),
        field("days")
    )
}

fn list_subscriptions(ctx: &mut HostContext, _: &[String]) {
    let subs = stored_subscriptions(ctx);
    if subs.is_empty() {
        ctx.reply("No subscriptions.");
        return;
    }
    for sub in subs {
        let channel = sub["channel"].as_str().unwrap_or("?");
        let program = sub["program"].as_str().unwrap_or("?");
        ctx.reply(format!("{channel}: {program}"));
    }
}

fn unsubscribe(schema: ArgSchema) -> impl Fn(&mut HostContext, &[String]) + Send + Sync + 'static {
    move |ctx: &mut HostContext, args: &[String]| {
        if !schema.check_arg_len(args) {
            ctx.reply(schema.usage());
            return;
        }
        // A single string field, so the bare value is the channel.
        let channel = match schema.parse(args) {
            Ok(parsed) => parsed.single().map(|value| value.to_string()).unwrap_or_default(),
            Err(err) => {
                ctx.reply(format!("Error: {err}"));
                return;
            }
        };

        let mut subs = stored_subscriptions(ctx);
        let before = subs.len();
        subs.retain(|sub| sub["channel"].as_str() != Some(channel.as_str()));
        let removed = before - subs.len();
        ctx.chat_data.insert(SUBSCRIPTIONS_KEY, json!(subs));
        ctx.reply(format!("Removed {removed} subscription(s) on {channel}"));
    }
}

#[cfg(test)]
mod tests {
    use chain_command_core::{ChatData, InboundMessage, Outcome, validate_schema};

    use super::*;

    fn run(router: &DemoRouter, data: ChatData, text: &str) -> (Vec<String>, ChatData) {
        let message = InboundMessage::text(1, text);
        let mut ctx = HostContext::new(message.clone(), data);
        router.handle_message(&mut ctx, &message).unwrap();
        ctx.finish()
    }

    #[test]
    fn test_demo_bot_is_valid() {
        let router = router(RouterConfig::default());
        router.validate().unwrap();
        for schema in schemas('/') {
            assert!(validate_schema(&schema).is_empty());
        }
    }

    #[test]
    fn test_git_fallbacks() {
        let router = router(RouterConfig::default());
        let (replies, _) = run(&router, ChatData::default(), "/git status");
        assert_eq!(replies[0], "Unknown git command: status");
        let (replies, _) = run(&router, ChatData::default(), "/git remote add origin https://x");
        assert_eq!(replies, vec!["Remote origin -> https://x"]);
        let (replies, _) = run(&router, ChatData::default(), "/git remote bogus");
        assert_eq!(replies[0], "Unknown remote command: bogus");
    }

    #[test]
    fn test_subscriptions_persist_in_chat_data() {
        let router = router(RouterConfig::default());
        let (replies, data) = run(&router, ChatData::default(), r#"/sub now cctv "evening news" 1,2 days=5,6"#);
        assert_eq!(
            replies,
            vec!["Subscribed to evening news on cctv (ids (1, 2), days (5, 6))"]
        );

        let (replies, data) = run(&router, data, "/sub ls");
        assert_eq!(replies, vec!["cctv: evening news"]);

        let (replies, data) = run(&router, data, "/sub rm cctv");
        assert_eq!(replies, vec!["Removed 1 subscription(s) on cctv"]);
        let (replies, _) = run(&router, data, "/sub list");
        assert_eq!(replies, vec!["No subscriptions."]);
    }

    #[test]
    fn test_remove_replies_for_quoted_and_unknown_channels() {
        let router = router(RouterConfig::default());
        let (_, data) = run(&router, ChatData::default(), r#"/sub now "bbc one" news 1"#);
        let (replies, data) = run(&router, data, r#"/sub rm "bbc one""#);
        assert_eq!(replies, vec!["Removed 1 subscription(s) on bbc one"]);
        let (replies, _) = run(&router, data, "/sub rm itv");
        assert_eq!(replies, vec!["Removed 0 subscription(s) on itv"]);

        let (replies, _) = run(&router, ChatData::default(), "/sub rm");
        assert_eq!(replies, vec!["Usage: /sub remove <channel>"]);
    }

    #[test]
    fn test_sub_reports_usage_and_errors() {
        let router = router(RouterConfig::default());
        let (replies, _) = run(&router, ChatData::default(), "/sub now cctv");
        assert_eq!(
            replies,
            vec!["Usage: /sub now <channel> <program> <ids> [exclude_program] [detail] [check_time] [days] [start_time]"]
        );
        let (replies, _) = run(&router, ChatData::default(), "/sub now cctv news x");
        assert!(replies[0].starts_with("Error: invalid value `x` for `ids`"));
    }

    #[test]
    fn test_help_lists_roots() {
        let router = router(RouterConfig::default());
        let (replies, _) = run(&router, ChatData::default(), "/help");
        assert!(replies[0].contains("/git remote add"));
        assert!(replies[0].contains("/sub - Program subscriptions"));
    }

    #[test]
    fn test_prefix_follows_config() {
        let router = router(RouterConfig {
            prefix: '!',
            ..Default::default()
        });
        router.validate().unwrap();
        let message = InboundMessage::text(1, "/start");
        let mut ctx = HostContext::new(message.clone(), ChatData::default());
        assert_eq!(router.handle_message(&mut ctx, &message), Ok(Outcome::NotMatched));
        let (replies, _) = run(&router, ChatData::default(), "!start");
        assert_eq!(replies, vec!["Hello, there!"]);
    }
}
