//! End-to-end handshake scenarios, exercised through `CurveCodec` the way a
//! real client and server would drive it across a transport this crate
//! never sees.

use bytes::Bytes;

use curve_codec::crypto::{self, KeyPair, PublicKeyBytes, LABEL_HELLO, LABEL_INITIATE, LABEL_VOUCH, LABEL_WELCOME};
use curve_codec::prelude::*;
use curve_codec::wire;
use curve_core::limits::{KEY_SIZE, SHORT_NONCE_FOR_16BYTE_LABEL, SHORT_NONCE_FOR_8BYTE_LABEL};

fn drive_to_connected(client: &mut CurveCodec, server: &mut CurveCodec) {
    let hello = client.execute(None).expect("client emits HELLO");
    let welcome = server.execute(Some(&hello)).expect("server emits WELCOME");
    let initiate = client
        .execute(Some(&welcome))
        .expect("client emits INITIATE");
    let ready = server.execute(Some(&initiate)).expect("server emits READY");
    assert!(client.execute(Some(&ready)).is_none());
    assert!(client.connected());
    assert!(server.connected());
}

#[test]
fn clean_handshake_and_message_round_trip() {
    let server_cert = CurveCert::generate();
    let server_pk = *server_cert.public_key().as_bytes();
    let mut client = CurveCodec::new_client(CurveCert::generate(), server_pk);
    let mut server = CurveCodec::new_server(server_cert, None);

    drive_to_connected(&mut client, &mut server);

    let request = client.encode(b"GET /", false).unwrap();
    let (plaintext, more) = server.decode(&request).unwrap();
    assert_eq!(plaintext, Bytes::from_static(b"GET /"));
    assert!(!more);

    let response = server.encode(b"200 OK", false).unwrap();
    let (plaintext, more) = client.decode(&response).unwrap();
    assert_eq!(plaintext, Bytes::from_static(b"200 OK"));
    assert!(!more);
}

#[test]
fn client_pinned_to_wrong_server_key_never_connects() {
    let real_server_cert = CurveCert::generate();
    let wrong_pk = *CurveCert::generate().public_key().as_bytes();
    let mut client = CurveCodec::new_client(CurveCert::generate(), wrong_pk);
    let mut server = CurveCodec::new_server(real_server_cert, None);

    let hello = client.execute(None).unwrap();
    let reply = server.execute(Some(&hello));
    assert!(server.exception());

    if let Some(reply) = reply {
        client.execute(Some(&reply));
    }
    assert!(client.exception());
    assert!(!client.connected());
    assert!(!server.connected());
}

#[test]
fn tampered_initiate_cookie_is_rejected() {
    let server_cert = CurveCert::generate();
    let server_pk = *server_cert.public_key().as_bytes();
    let mut client = CurveCodec::new_client(CurveCert::generate(), server_pk);
    let mut server = CurveCodec::new_server(server_cert, None);

    let hello = client.execute(None).unwrap();
    let welcome = server.execute(Some(&hello)).unwrap();
    let mut initiate = client.execute(Some(&welcome)).unwrap().to_vec();

    // Flip a byte inside the cookie (just past the command name byte and
    // the 8-byte "INITIATE" name).
    let cookie_start = 1 + 8;
    initiate[cookie_start] ^= 0xFF;

    let reply = server.execute(Some(&initiate));
    assert!(server.exception());
    assert!(!server.connected());
    assert!(reply.is_some(), "server ERRORs on a cookie it cannot open");
}

#[test]
fn zap_denial_kills_the_handshake_on_both_sides() {
    let server_cert = CurveCert::generate();
    let server_pk = *server_cert.public_key().as_bytes();
    let mut client = CurveCodec::new_client(CurveCert::generate(), server_pk);
    let authenticator: Box<dyn ZapAuthenticator> = Box::new(DenyAllAuthenticator {
        reason: "unknown client key".to_string(),
    });
    let mut server = CurveCodec::new_server(server_cert, Some((authenticator, "global".to_string())));

    let hello = client.execute(None).unwrap();
    let welcome = server.execute(Some(&hello)).unwrap();
    let initiate = client.execute(Some(&welcome)).unwrap();
    let error_reply = server.execute(Some(&initiate)).expect("server ERRORs");
    assert!(server.exception());
    assert!(!server.connected());

    client.execute(Some(&error_reply));
    assert!(client.exception());
    assert!(!client.connected());
}

#[test]
fn replayed_message_frame_is_rejected() {
    let server_cert = CurveCert::generate();
    let server_pk = *server_cert.public_key().as_bytes();
    let mut client = CurveCodec::new_client(CurveCert::generate(), server_pk);
    let mut server = CurveCodec::new_server(server_cert, None);
    drive_to_connected(&mut client, &mut server);

    let frame = client.encode(b"once", false).unwrap();
    assert!(server.decode(&frame).is_some());
    assert!(server.decode(&frame).is_none());
    assert!(server.exception());
}

#[test]
fn metadata_round_trips_through_the_handshake() {
    let server_cert = CurveCert::generate();
    let server_pk = *server_cert.public_key().as_bytes();
    let mut client = CurveCodec::new_client(CurveCert::generate(), server_pk);
    let mut server = CurveCodec::new_server(server_cert, None);

    client
        .set_metadata("Identity", Bytes::from_static(b"alice"))
        .unwrap();
    server
        .set_metadata("Socket-Type", Bytes::from_static(b"ROUTER"))
        .unwrap();

    drive_to_connected(&mut client, &mut server);

    assert_eq!(
        server.metadata().unwrap().get("identity"),
        Some(&Bytes::from_static(b"alice"))
    );
    assert_eq!(
        client.metadata().unwrap().get("socket-type"),
        Some(&Bytes::from_static(b"ROUTER"))
    );
}

/// The vouch must include the server's permanent public key. A dishonest
/// party completes a cryptographically valid handshake up to INITIATE (it
/// knows the real client's and real server's permanent keys, so the vouch
/// box itself opens cleanly) but substitutes a third party's public key,
/// not the real server's, as the identity being vouched for. The honest
/// server must reject this even though every box opens.
#[test]
fn malicious_server_substituted_permanent_key_is_rejected_by_vouch_check() {
    let server_identity = KeyPair::generate();
    let server_cert = CurveCert::from_secret_bytes(server_identity.secret.to_bytes());
    let mut server = CurveCodec::new_server(server_cert, None);

    let client_identity = KeyPair::generate();
    let client_transient = KeyPair::generate();
    let impostor_identity = KeyPair::generate();

    // HELLO, built by hand so the test controls every key involved.
    let k_hello = client_transient
        .secret
        .diffie_hellman(&server_identity.public);
    let hello_short_nonce = crypto::random_bytes(SHORT_NONCE_FOR_16BYTE_LABEL);
    let hello_proof = crypto::seal(&k_hello, LABEL_HELLO, &hello_short_nonce, &[0u8; 64]);
    let mut hello_body = Vec::new();
    hello_body.extend_from_slice(&[1, 0]);
    hello_body.extend_from_slice(&[0u8; 72]);
    hello_body.extend_from_slice(client_transient.public.as_bytes());
    hello_body.extend_from_slice(&hello_short_nonce);
    hello_body.extend_from_slice(&hello_proof);
    let hello = wire::encode_command(wire::CMD_HELLO, &hello_body);

    let welcome = server.execute(Some(&hello)).expect("server emits WELCOME");

    // Decrypt WELCOME ourselves to recover the server's transient key and
    // the cookie, the way the real client would.
    let (name, welcome_body) = wire::parse_command(&welcome).expect("well-formed WELCOME");
    assert_eq!(name, wire::CMD_WELCOME);
    let (welcome_nonce, welcome_ct) = welcome_body.split_at(SHORT_NONCE_FOR_8BYTE_LABEL);
    let welcome_plaintext = crypto::open(&k_hello, LABEL_WELCOME, welcome_nonce, welcome_ct)
        .expect("WELCOME decrypts under precompute(server_pk, client_transient_sk)");
    let server_transient_pk = PublicKeyBytes::from_bytes(
        welcome_plaintext[..KEY_SIZE].try_into().unwrap(),
    );
    let cookie = welcome_plaintext[KEY_SIZE..].to_vec();

    // Build INITIATE with a legitimate vouch box (sealed under the real
    // client/server permanent keys, so it opens fine) whose *plaintext*
    // names the impostor's public key instead of the real server's, the
    // substitution attack the vouch binding exists to catch.
    let k_tt = client_transient
        .secret
        .diffie_hellman(&server_transient_pk);
    let k_vouch = client_identity
        .secret
        .diffie_hellman(&server_identity.public);
    let vouch_nonce = crypto::random_bytes(SHORT_NONCE_FOR_8BYTE_LABEL);
    let mut vouch_plaintext = Vec::new();
    vouch_plaintext.extend_from_slice(client_transient.public.as_bytes());
    vouch_plaintext.extend_from_slice(impostor_identity.public.as_bytes());
    let vouch_box = crypto::seal(&k_vouch, LABEL_VOUCH, &vouch_nonce, &vouch_plaintext);

    let metadata = Metadata::new().encode().unwrap();
    let mut inner = Vec::new();
    inner.extend_from_slice(client_identity.public.as_bytes());
    inner.extend_from_slice(&vouch_nonce);
    inner.extend_from_slice(&vouch_box);
    inner.extend_from_slice(&metadata);

    let init_nonce = crypto::random_bytes(SHORT_NONCE_FOR_16BYTE_LABEL);
    let box_i = crypto::seal(&k_tt, LABEL_INITIATE, &init_nonce, &inner);
    let mut initiate_body = Vec::new();
    initiate_body.extend_from_slice(&cookie);
    initiate_body.extend_from_slice(&init_nonce);
    initiate_body.extend_from_slice(&box_i);
    let initiate = wire::encode_command(wire::CMD_INITIATE, &initiate_body);

    let reply = server.execute(Some(&initiate));
    assert!(server.exception(), "vouch names the wrong server identity");
    assert!(!server.connected());
    assert!(reply.is_some(), "server ERRORs rather than silently dropping");
}

#[test]
fn metadata_cannot_be_set_once_handshake_has_started() {
    let server_cert = CurveCert::generate();
    let server_pk = *server_cert.public_key().as_bytes();
    let mut client = CurveCodec::new_client(CurveCert::generate(), server_pk);
    client.execute(None);
    assert!(client
        .set_metadata("late", Bytes::from_static(b"too late"))
        .is_err());
}
