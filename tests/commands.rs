mod common;

use std::time::Duration;

use redlite::commands::{
    CommandError, CommandOutcome, ID_INVALID, ID_MUST_EXCEED_ZERO, ID_TOO_SMALL,
};

use common::{TestEnv, bulk};

const PEER: &str = "127.0.0.1:40001";

#[tokio::test]
async fn test_ping_and_echo() {
    let env = TestEnv::master();

    env.exec_ok(PEER, &["PING"], "+PONG\r\n").await;
    env.exec_ok(PEER, &["ECHO", "Hello, World!"], &bulk("Hello, World!"))
        .await;

    env.exec_err(
        PEER,
        &["ECHO"],
        CommandError::WrongNumberOfArguments("echo".to_string()),
    )
    .await;
    env.exec_err(
        PEER,
        &["PING", "extra"],
        CommandError::WrongNumberOfArguments("ping".to_string()),
    )
    .await;
}

#[tokio::test]
async fn test_set_get_round_trip() {
    let env = TestEnv::master();

    env.exec_ok(PEER, &["SET", "foo", "bar"], "+OK\r\n").await;
    env.exec_ok(PEER, &["GET", "foo"], &bulk("bar")).await;

    // Setting the same value again is observably idempotent.
    env.exec_ok(PEER, &["SET", "foo", "bar"], "+OK\r\n").await;
    env.exec_ok(PEER, &["GET", "foo"], &bulk("bar")).await;

    env.exec_ok(PEER, &["GET", "missing"], "$-1\r\n").await;
}

#[tokio::test]
async fn test_set_argument_errors() {
    let env = TestEnv::master();

    env.exec_err(
        PEER,
        &["SET", "foo"],
        CommandError::WrongNumberOfArguments("set".to_string()),
    )
    .await;
    env.exec_err(PEER, &["SET", "k", "v", "EX", "100"], CommandError::SyntaxError)
        .await;
    env.exec_err(
        PEER,
        &["SET", "k", "v", "PX", "not-a-number"],
        CommandError::SyntaxError,
    )
    .await;
}

#[tokio::test]
async fn test_set_with_expiry_lapses() {
    let env = TestEnv::master();

    env.exec_ok(PEER, &["SET", "k", "v", "PX", "100"], "+OK\r\n")
        .await;
    env.exec_ok(PEER, &["GET", "k"], &bulk("v")).await;

    tokio::time::sleep(Duration::from_millis(150)).await;

    env.exec_ok(PEER, &["GET", "k"], "$-1\r\n").await;
    env.exec_ok(PEER, &["TYPE", "k"], "+none\r\n").await;
}

#[tokio::test]
async fn test_incr() {
    let env = TestEnv::master();

    env.exec_ok(PEER, &["INCR", "counter"], ":1\r\n").await;
    env.exec_ok(PEER, &["INCR", "counter"], ":2\r\n").await;

    env.exec_ok(PEER, &["SET", "answer", "41"], "+OK\r\n").await;
    env.exec_ok(PEER, &["INCR", "answer"], ":42\r\n").await;
    env.exec_ok(PEER, &["GET", "answer"], &bulk("42")).await;

    env.exec_ok(PEER, &["SET", "word", "mango"], "+OK\r\n").await;
    env.exec_err(PEER, &["INCR", "word"], CommandError::NotAnInteger)
        .await;

    // An expired counter restarts from scratch.
    env.exec_ok(PEER, &["SET", "fading", "9", "PX", "50"], "+OK\r\n")
        .await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    env.exec_ok(PEER, &["INCR", "fading"], ":1\r\n").await;
}

#[tokio::test]
async fn test_type_reports_value_kinds() {
    let env = TestEnv::master();

    env.exec_ok(PEER, &["SET", "s", "v"], "+OK\r\n").await;
    env.exec_ok(PEER, &["XADD", "st", "1-1", "f", "v"], &bulk("1-1"))
        .await;

    env.exec_ok(PEER, &["TYPE", "s"], "+string\r\n").await;
    env.exec_ok(PEER, &["TYPE", "st"], "+stream\r\n").await;
    env.exec_ok(PEER, &["TYPE", "nothing"], "+none\r\n").await;
}

#[tokio::test]
async fn test_wrong_type_cross_access() {
    let env = TestEnv::master();

    env.exec_ok(PEER, &["XADD", "st", "1-1", "f", "v"], &bulk("1-1"))
        .await;
    env.exec_err(PEER, &["GET", "st"], CommandError::WrongType).await;
    env.exec_err(PEER, &["INCR", "st"], CommandError::WrongType).await;

    env.exec_ok(PEER, &["SET", "s", "v"], "+OK\r\n").await;
    env.exec_err(
        PEER,
        &["XADD", "s", "1-1", "f", "v"],
        CommandError::WrongType,
    )
    .await;
    env.exec_err(PEER, &["XRANGE", "s", "-", "+"], CommandError::WrongType)
        .await;

    assert_eq!(
        CommandError::WrongType.as_string(),
        "-WRONGTYPE Operation against a key holding the wrong kind of value\r\n"
    );
}

#[tokio::test]
async fn test_keys_in_insertion_order() {
    let env = TestEnv::master();

    env.exec_ok(PEER, &["SET", "banana", "1"], "+OK\r\n").await;
    env.exec_ok(PEER, &["SET", "apple", "2"], "+OK\r\n").await;
    env.exec_ok(PEER, &["XADD", "stream", "1-1", "f", "v"], &bulk("1-1"))
        .await;
    env.exec_ok(PEER, &["SET", "gone", "3", "PX", "30"], "+OK\r\n")
        .await;

    tokio::time::sleep(Duration::from_millis(60)).await;

    let expected = format!(
        "*3\r\n{}{}{}",
        bulk("banana"),
        bulk("apple"),
        bulk("stream")
    );
    env.exec_ok(PEER, &["KEYS", "*"], &expected).await;

    // Only the match-everything pattern is supported.
    env.exec_ok(PEER, &["KEYS", "ban*"], "$-1\r\n").await;
}

#[tokio::test]
async fn test_config_get() {
    let env = TestEnv::from_args(&["--dir", "/var/lib/redlite", "--dbfilename", "dump.rdb"]);

    env.exec_ok(
        PEER,
        &["CONFIG", "GET", "dir"],
        &format!("*2\r\n{}{}", bulk("dir"), bulk("/var/lib/redlite")),
    )
    .await;
    env.exec_ok(
        PEER,
        &["CONFIG", "GET", "dbfilename"],
        &format!("*2\r\n{}{}", bulk("dbfilename"), bulk("dump.rdb")),
    )
    .await;
    env.exec_ok(PEER, &["CONFIG", "GET", "maxmemory"], "*0\r\n").await;

    env.exec_err(
        PEER,
        &["CONFIG", "SET", "dir", "/tmp"],
        CommandError::UnknownConfigSubcommand("SET".to_string()),
    )
    .await;
}

#[tokio::test]
async fn test_info_replication_section() {
    let master = TestEnv::master();

    let Ok(CommandOutcome::Reply(reply)) = master.exec(PEER, &["INFO"]).await else {
        panic!("INFO should reply");
    };

    assert!(reply.contains("# Replication\n"));
    assert!(reply.contains("role:master\n"));
    assert!(reply.contains("master_repl_offset:0"));

    let replica = TestEnv::replica();
    let Ok(CommandOutcome::Reply(reply)) = replica.exec(PEER, &["INFO", "replication"]).await
    else {
        panic!("INFO should reply");
    };

    assert!(reply.contains("role:slave\n"));
}

#[tokio::test]
async fn test_unknown_command() {
    let env = TestEnv::master();

    env.exec_err(
        PEER,
        &["FLUSHALL"],
        CommandError::UnknownCommand("FLUSHALL".to_string()),
    )
    .await;

    assert_eq!(
        CommandError::UnknownCommand("FLUSHALL".to_string()).as_string(),
        "-Unknown command: FLUSHALL\r\n"
    );
}

#[tokio::test]
async fn test_xadd_id_assignment() {
    let env = TestEnv::master();

    env.exec_ok(PEER, &["XADD", "s", "1-1", "f", "v"], &bulk("1-1"))
        .await;
    env.exec_ok(PEER, &["XADD", "s", "1-*", "f", "v"], &bulk("1-2"))
        .await;
    env.exec_ok(PEER, &["XADD", "s", "3-*", "f", "v"], &bulk("3-0"))
        .await;

    // A fresh stream at timestamp zero starts at sequence one.
    env.exec_ok(PEER, &["XADD", "zero", "0-*", "f", "v"], &bulk("0-1"))
        .await;
}

#[tokio::test]
async fn test_xadd_id_validation() {
    let env = TestEnv::master();

    env.exec_ok(PEER, &["XADD", "s", "1-1", "f", "v"], &bulk("1-1"))
        .await;

    env.exec_err(
        PEER,
        &["XADD", "s", "1-1", "f", "v"],
        CommandError::InvalidStreamId(ID_TOO_SMALL.to_string()),
    )
    .await;
    env.exec_err(
        PEER,
        &["XADD", "s", "0-5", "f", "v"],
        CommandError::InvalidStreamId(ID_TOO_SMALL.to_string()),
    )
    .await;
    env.exec_err(
        PEER,
        &["XADD", "s", "0-0", "f", "v"],
        CommandError::InvalidStreamId(ID_MUST_EXCEED_ZERO.to_string()),
    )
    .await;
    env.exec_err(
        PEER,
        &["XADD", "s", "banana-1", "f", "v"],
        CommandError::InvalidStreamId(ID_INVALID.to_string()),
    )
    .await;
    env.exec_err(
        PEER,
        &["XADD", "s", "1-1", "f"],
        CommandError::WrongNumberOfArguments("xadd".to_string()),
    )
    .await;

    // The rejected entries must not have landed.
    env.exec_ok(
        PEER,
        &["XRANGE", "s", "-", "+"],
        &format!("*1\r\n*2\r\n{}*2\r\n{}{}", bulk("1-1"), bulk("f"), bulk("v")),
    )
    .await;

    assert_eq!(
        CommandError::InvalidStreamId(ID_TOO_SMALL.to_string()).as_string(),
        "-ERR The ID specified in XADD is equal or smaller than the target stream top item\r\n"
    );
}

#[tokio::test]
async fn test_xrange_bounds() {
    let env = TestEnv::master();

    for (id, value) in [("1-1", "a"), ("2-0", "b"), ("2-7", "c"), ("5-0", "d")] {
        env.exec_ok(PEER, &["XADD", "s", id, "f", value], &bulk(id))
            .await;
    }

    let entry = |id: &str, value: &str| {
        format!("*2\r\n{}*2\r\n{}{}", bulk(id), bulk("f"), bulk(value))
    };

    env.exec_ok(
        PEER,
        &["XRANGE", "s", "2", "2"],
        &format!("*2\r\n{}{}", entry("2-0", "b"), entry("2-7", "c")),
    )
    .await;
    env.exec_ok(
        PEER,
        &["XRANGE", "s", "2-7", "5-0"],
        &format!("*2\r\n{}{}", entry("2-7", "c"), entry("5-0", "d")),
    )
    .await;
    env.exec_ok(
        PEER,
        &["XRANGE", "s", "-", "1-1"],
        &format!("*1\r\n{}", entry("1-1", "a")),
    )
    .await;
    env.exec_ok(
        PEER,
        &["XRANGE", "s", "3", "+"],
        &format!("*1\r\n{}", entry("5-0", "d")),
    )
    .await;

    env.exec_ok(PEER, &["XRANGE", "s", "6", "9"], "*0\r\n").await;
    env.exec_ok(PEER, &["XRANGE", "missing", "-", "+"], "*0\r\n")
        .await;

    env.exec_err(
        PEER,
        &["XRANGE", "s", "bad", "+"],
        CommandError::InvalidStreamId(ID_INVALID.to_string()),
    )
    .await;
}

#[tokio::test]
async fn test_xread_synchronous() {
    let env = TestEnv::master();

    env.exec_ok(PEER, &["XADD", "a", "1-1", "f", "1"], &bulk("1-1"))
        .await;
    env.exec_ok(PEER, &["XADD", "a", "2-0", "f", "2"], &bulk("2-0"))
        .await;
    env.exec_ok(PEER, &["XADD", "b", "7-0", "g", "3"], &bulk("7-0"))
        .await;

    let entry = |id: &str, field: &str, value: &str| {
        format!("*2\r\n{}*2\r\n{}{}", bulk(id), bulk(field), bulk(value))
    };

    // Entries strictly newer than the given id, per requested key.
    env.exec_ok(
        PEER,
        &["XREAD", "STREAMS", "a", "1-1"],
        &format!("*1\r\n*2\r\n{}*1\r\n{}", bulk("a"), entry("2-0", "f", "2")),
    )
    .await;

    env.exec_ok(
        PEER,
        &["XREAD", "STREAMS", "a", "b", "0-0", "0-0"],
        &format!(
            "*2\r\n*2\r\n{}*2\r\n{}{}*2\r\n{}*1\r\n{}",
            bulk("a"),
            entry("1-1", "f", "1"),
            entry("2-0", "f", "2"),
            bulk("b"),
            entry("7-0", "g", "3"),
        ),
    )
    .await;

    // Nothing newer, and `$` resolves to the stream's current tip.
    env.exec_ok(PEER, &["XREAD", "STREAMS", "a", "2-0"], "*0\r\n")
        .await;
    env.exec_ok(PEER, &["XREAD", "STREAMS", "a", "$"], "*0\r\n")
        .await;

    env.exec_err(
        PEER,
        &["XREAD", "STREAMS", "a"],
        CommandError::WrongNumberOfArguments("xread".to_string()),
    )
    .await;
    env.exec_err(
        PEER,
        &["XREAD", "WRONG", "a", "0-0"],
        CommandError::SyntaxError,
    )
    .await;
}
