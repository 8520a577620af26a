use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chain_command_core::*;
use chrono::Local;
use rayon::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Subscription schema from the TV-guide bot: required channel, program and
/// ids, followed by a mix of static and lazy optional fields.
fn subscription_schema() -> ArgSchema {
    ArgSchema::new("/sub now")
        .with_usage("/sub now <channel> <program> <ids> [exclude_program] [detail] [check_time] [days] [start_time]")
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

type Log = Vec<(String, Vec<String>)>;

fn record(label: &'static str) -> impl Fn(&mut Log, &[String]) + Send + Sync + 'static {
    move |log: &mut Log, args: &[String]| log.push((label.to_string(), args.to_vec()))
}

fn git_tree() -> CommandNode<Log> {
    CommandNode::new("/git")
        .with_child(CommandNode::leaf("add", record("git_add")))
        .with_child(
            CommandNode::new("remote")
                .with_child(CommandNode::leaf("add", record("git_remote_add")))
                .with_default(record("git_remote_help")),
        )
        .with_default(record("git_help"))
}

fn dispatch(tree: &CommandNode<Log>, text: &str) -> Log {
    let mut log = Log::new();
    tree.dispatch_text(&mut log, text).unwrap();
    log
}

fn entry(label: &str, args: &[&str]) -> (String, Vec<String>) {
    (label.to_string(), args.iter().map(|s| s.to_string()).collect())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[test]
fn test_git_tree_fallbacks() {
    let tree = git_tree();
    assert!(validate_tree(&tree, &RouterConfig::default()).is_empty());

    assert_eq!(dispatch(&tree, "/git status"), vec![entry("git_help", &["status"])]);
    assert_eq!(
        dispatch(&tree, "/git remote add origin"),
        vec![entry("git_remote_add", &["origin"])]
    );
    assert_eq!(
        dispatch(&tree, "/git remote bogus"),
        vec![entry("git_remote_help", &["bogus"])]
    );
}

#[test]
fn test_at_most_one_handler_per_dispatch() {
    let tree = git_tree();
    for text in [
        "/git",
        "/git add",
        "/git add remote add",
        "/git remote",
        "/git remote add",
        "/git remote add a b c",
        "/git x y z",
        "/nope",
    ] {
        assert!(dispatch(&tree, text).len() <= 1, "{text}");
    }
}

#[test]
fn test_shared_tree_across_threads() {
    let tree = Arc::new(git_tree());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                let mut log = Log::new();
                let tokens = ["/git".to_string(), "remote".to_string(), "add".to_string(), format!("r{i}")];
                tree.dispatch(&mut log, &tokens);
                log
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let log = handle.join().unwrap();
        assert_eq!(log, vec![entry("git_remote_add", &[&format!("r{i}")])]);
    }
}

#[test]
fn test_parallel_router_dispatch_is_deterministic() {
    let router: Router<Log> = Router::new(RouterConfig::default()).with_root(git_tree());
    let lines: Vec<String> = (0..64).map(|i| format!("/git remote add origin{i}")).collect();

    let logs: Vec<Log> = lines
        .par_iter()
        .map(|line| {
            let mut log = Log::new();
            router.dispatch_text(&mut log, line).unwrap();
            log
        })
        .collect();

    for (i, log) in logs.iter().enumerate() {
        assert_eq!(log, &vec![entry("git_remote_add", &[&format!("origin{i}")])]);
    }
}

// ---------------------------------------------------------------------------
// Argument conversion
// ---------------------------------------------------------------------------

#[test]
fn test_subscription_round_trip() {
    let schema = subscription_schema();
    assert!(validate_schema(&schema).is_empty());

    let tokens = tokenize(
        r#"channel_name "program name with space" 1,2,3 "optional arg without key" detail="optional arg with key" days=3,4,5"#,
    )
    .unwrap();
    assert_eq!(tokens.len(), 6);
    assert!(schema.check_arg_len(&tokens));

    let before = Local::now();
    let args = schema.parse(&tokens).unwrap().multiple().unwrap();
    let after = Local::now();

    assert_eq!(args.get("channel"), Some(&Value::from("channel_name")));
    assert_eq!(args.get("program"), Some(&Value::from("program name with space")));
    assert_eq!(args.get("ids").and_then(Value::to_int_vec), Some(vec![1, 2, 3]));
    assert_eq!(
        args.get("exclude_program"),
        Some(&Value::from("optional arg without key"))
    );
    assert_eq!(args.get("detail"), Some(&Value::from("optional arg with key")));
    let check_time = args.get("check_time").and_then(Value::as_datetime).unwrap();
    assert!(before <= *check_time && *check_time <= after);
    assert_eq!(args.get("days").and_then(Value::to_int_vec), Some(vec![3, 4, 5]));
    assert_eq!(args.get("start_time"), Some(&Value::None));
}

#[test]
fn test_subscription_defaults() {
    let args = subscription_schema()
        .parse(&["cctv", "news", "7"])
        .unwrap()
        .multiple()
        .unwrap();
    assert_eq!(args.get("exclude_program"), Some(&Value::None));
    assert_eq!(args.get("detail"), Some(&Value::from("*")));
    assert_eq!(
        args.get("days").and_then(Value::to_int_vec),
        Some(vec![0, 1, 2, 3, 4, 5, 6])
    );
}

#[test]
fn test_keyed_datetime_is_cast() {
    let args = subscription_schema()
        .parse(&["cctv", "news", "7", "start_time=2024-05-01 20:00"])
        .unwrap()
        .multiple()
        .unwrap();
    let start = args.get("start_time").and_then(Value::as_datetime).unwrap();
    assert_eq!(start.format("%Y-%m-%d %H:%M").to_string(), "2024-05-01 20:00");
}

#[test]
fn test_check_arg_len_boundaries() {
    let schema = subscription_schema();
    let tokens: Vec<String> = (0..9).map(|i| i.to_string()).collect();
    assert!(!schema.check_arg_len(&tokens[..2]));
    assert!(schema.check_arg_len(&tokens[..3]));
    assert!(schema.check_arg_len(&tokens[..8]));
    assert!(!schema.check_arg_len(&tokens[..9]));
}

#[test]
fn test_lazy_default_is_fresh_per_parse() {
    let schema = subscription_schema();
    let first = schema.parse(&["c", "p", "1"]).unwrap().multiple().unwrap();
    thread::sleep(Duration::from_millis(20));
    let second = schema.parse(&["c", "p", "1"]).unwrap().multiple().unwrap();

    let t1 = first.get("check_time").and_then(Value::as_datetime).unwrap();
    let t2 = second.get("check_time").and_then(Value::as_datetime).unwrap();
    assert!(t2 > t1);
}

#[test]
fn test_collision_is_reported_not_overwritten() {
    let err = subscription_schema()
        .parse(&["c", "p", "1", "x", "d", "t", "days=1", "s", "9", "channel=other"])
        .unwrap_err();
    assert_eq!(
        err,
        ArgError::DuplicateAssignment {
            field: "channel".to_string()
        }
    );
}

#[test]
fn test_cast_failure_identifies_field() {
    let err = subscription_schema().parse(&["c", "p", "1,two"]).unwrap_err();
    assert!(matches!(err, ArgError::CastFailure { ref field, .. } if field == "ids"));
}

#[test]
fn test_usage_template_is_verbatim() {
    assert_eq!(
        subscription_schema().usage(),
        "Usage: /sub now <channel> <program> <ids> [exclude_program] [detail] [check_time] [days] [start_time]"
    );
}

// ---------------------------------------------------------------------------
// Router + schema + host context
// ---------------------------------------------------------------------------

#[test]
fn test_full_pipeline_with_host_context() {
    let schema = subscription_schema();
    let sub = CommandNode::new("/sub")
        .with_child(CommandNode::leaf("now", move |ctx: &mut HostContext, args: &[String]| {
            if !schema.check_arg_len(args) {
                ctx.reply(schema.usage());
                return;
            }
            match schema.parse(args) {
                Ok(parsed) => {
                    let args = parsed.multiple().unwrap_or_default();
                    let channel = args.get("channel").map(ToString::to_string).unwrap_or_default();
                    ctx.chat_data.insert("last_channel", serde_json::json!(channel));
                    ctx.reply(format!("subscribed to {channel}"));
                }
                Err(err) => ctx.reply(err.to_string()),
            }
        }))
        .with_default(|ctx: &mut HostContext, _: &[String]| ctx.reply("Usage: /sub now ..."));

    let router = Router::new(RouterConfig::default()).with_root(sub);
    router.validate().unwrap();

    let message = InboundMessage::text(10, r#"/sub now cctv "evening news" 1,2"#);
    let mut ctx = HostContext::new(message.clone(), ChatData::default());
    assert!(router.handle_message(&mut ctx, &message).unwrap().is_handled());
    let (replies, data) = ctx.finish();
    assert_eq!(replies, vec!["subscribed to cctv"]);
    assert_eq!(data.get("last_channel"), Some(&serde_json::json!("cctv")));

    let message = InboundMessage::text(10, "/sub now cctv");
    let mut ctx = HostContext::new(message.clone(), data);
    router.handle_message(&mut ctx, &message).unwrap();
    assert!(ctx.replies()[0].starts_with("Usage: /sub now <channel>"));

    let message = InboundMessage::text(10, "/sub later");
    let mut ctx = HostContext::new(message.clone(), ChatData::default());
    router.handle_message(&mut ctx, &message).unwrap();
    assert_eq!(ctx.replies(), ["Usage: /sub now ..."]);
}
