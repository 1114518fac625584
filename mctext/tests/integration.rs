//! Integration tests for mctext against a real Memcached server.
//!
//! These tests are `#[ignore]` by default because they require a running
//! Memcached instance on `127.0.0.1:11211`. Run them with:
//!
//!   cargo test -p mctext --test integration -- --ignored --nocapture

use std::net::TcpStream;
use std::sync::Mutex;
use std::time::Duration;

use mctext::{Client, Error, TcpConfig, TcpTransport};
use mctext_protocol::StorageCommand;

static TEST_SERIALIZE: Mutex<()> = Mutex::new(());

const MEMCACHE_ADDR: &str = "127.0.0.1:11211";

fn connect() -> Client<TcpTransport> {
    if TcpStream::connect_timeout(&MEMCACHE_ADDR.parse().unwrap(), Duration::from_secs(2)).is_err()
    {
        panic!("Memcached not reachable at {MEMCACHE_ADDR}");
    }
    let transport = TcpTransport::connect(MEMCACHE_ADDR, &TcpConfig::default())
        .expect("connect failed");
    Client::new(transport)
}

fn is_not_stored(err: &Error) -> bool {
    matches!(err, Error::Protocol(mctext_protocol::Error::NotStored))
}

#[test]
#[ignore]
fn memcache_set_get_roundtrip() {
    let _guard = TEST_SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());
    let mut client = connect();

    client.set("mctext:rt", "hello world").unwrap();
    let value = client.get("mctext:rt").unwrap().expect("hit expected");
    assert_eq!(value.data.as_ref(), b"hello world");

    client.delete("mctext:rt").unwrap();
    assert!(client.get("mctext:rt").unwrap().is_none());
}

#[test]
#[ignore]
fn memcache_binary_safe_value() {
    let _guard = TEST_SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());
    let mut client = connect();

    let value: &[u8] = b"line1\r\nline2\r\nEND\r\n\0tail";
    client.set("mctext:bin", value).unwrap();
    let fetched = client.get("mctext:bin").unwrap().expect("hit expected");
    assert_eq!(fetched.data.as_ref(), value);

    client.delete("mctext:bin").unwrap();
}

#[test]
#[ignore]
fn memcache_empty_value_is_a_hit() {
    let _guard = TEST_SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());
    let mut client = connect();

    client.set("mctext:empty", "").unwrap();
    let fetched = client.get("mctext:empty").unwrap().expect("hit expected");
    assert!(fetched.data.is_empty());

    client.delete("mctext:empty").unwrap();
}

#[test]
#[ignore]
fn memcache_add_and_replace_semantics() {
    let _guard = TEST_SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());
    let mut client = connect();

    client.delete("mctext:add").ok();
    client.add("mctext:add", "first").unwrap();
    let err = client.add("mctext:add", "second").unwrap_err();
    assert!(is_not_stored(&err));

    client.replace("mctext:add", "third").unwrap();
    let value = client.get("mctext:add").unwrap().expect("hit expected");
    assert_eq!(value.data.as_ref(), b"third");

    client.delete("mctext:add").unwrap();
    let err = client.replace("mctext:add", "nope").unwrap_err();
    assert!(is_not_stored(&err));
}

#[test]
#[ignore]
fn memcache_append_prepend() {
    let _guard = TEST_SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());
    let mut client = connect();

    client.set("mctext:ap", "mid").unwrap();
    client.append("mctext:ap", ">>").unwrap();
    client.prepend("mctext:ap", "<<").unwrap();
    let value = client.get("mctext:ap").unwrap().expect("hit expected");
    assert_eq!(value.data.as_ref(), b"<<mid>>");

    client.delete("mctext:ap").unwrap();
}

#[test]
#[ignore]
fn memcache_gets_and_cas_flow() {
    let _guard = TEST_SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());
    let mut client = connect();

    client.set("mctext:cas", "v1").unwrap();
    let keys: &[&[u8]] = &[b"mctext:cas"];
    let values = client.gets(keys).unwrap();
    assert_eq!(values.len(), 1);
    let token = values[0].cas.expect("server returns cas for gets");

    client.cas("mctext:cas", "v2", token).unwrap();

    // the token is now stale
    let err = client.cas("mctext:cas", "v3", token).unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(mctext_protocol::Error::Exists)
    ));

    let value = client.get("mctext:cas").unwrap().expect("hit expected");
    assert_eq!(value.data.as_ref(), b"v2");

    client.delete("mctext:cas").unwrap();
}

#[test]
#[ignore]
fn memcache_gets_multi_subset() {
    let _guard = TEST_SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());
    let mut client = connect();

    client.set("mctext:m1", "one").unwrap();
    client.set("mctext:m2", "two").unwrap();
    client.delete("mctext:m3").ok();

    let keys: &[&[u8]] = &[b"mctext:m1", b"mctext:m3", b"mctext:m2"];
    let values = client.gets(keys).unwrap();
    assert_eq!(values.len(), 2);
    assert!(values.iter().all(|v| v.key.as_ref() != b"mctext:m3"));

    client.delete("mctext:m1").unwrap();
    client.delete("mctext:m2").unwrap();
}

#[test]
#[ignore]
fn memcache_incr_decr_touch() {
    let _guard = TEST_SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());
    let mut client = connect();

    client.set("mctext:ctr", "5").unwrap();
    assert_eq!(client.incr("mctext:ctr", 3).unwrap(), Some(8));
    assert_eq!(client.decr("mctext:ctr", 2).unwrap(), Some(6));
    assert_eq!(client.incr("mctext:ctr-missing", 1).unwrap(), None);

    assert!(client.touch("mctext:ctr", 300).unwrap());
    assert!(!client.touch("mctext:ctr-missing", 300).unwrap());

    client.delete("mctext:ctr").unwrap();
}

#[test]
#[ignore]
fn memcache_explicit_storage_command() {
    let _guard = TEST_SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());
    let mut client = connect();

    client
        .store(&StorageCommand::set(b"mctext:opts", b"v").flags(77).exptime(300))
        .unwrap();
    let value = client.get("mctext:opts").unwrap().expect("hit expected");
    assert_eq!(value.flags, 77);

    client.delete("mctext:opts").unwrap();
}

#[test]
#[ignore]
fn memcache_version() {
    let _guard = TEST_SERIALIZE.lock().unwrap_or_else(|e| e.into_inner());
    let mut client = connect();

    let version = client.version().unwrap();
    assert!(!version.is_empty());
    println!("memcached version: {version}");
}
