//! Wire-level opcode frames for the NPS connection-protocol handshake.
//!
//! Every frame sent during phases 1-2 of the handshake shares the layout
//! `len(i32 BE) ∥ opcode(i16 BE) ∥ body`, where `len` counts itself plus the
//! opcode plus the body. This crate only builds and measures bytes; it has
//! no notion of a socket, a timeout, or a connection state.
//!
//! | name | id | body |
//! |---|---|---|
//! | CLIENT_BEGIN | 1 | int16 version |
//! | DB | 2 | utf8 ∥ 0x00 |
//! | USER | 3 | utf8 ∥ 0x00 |
//! | OPTIONS | 4 | utf8 ∥ 0x00 |
//! | REMOTE_PID | 6 | int32 pid |
//! | CLIENT_TYPE | 8 | int16 |
//! | PROTOCOL | 9 | int16 p1 ∥ int16 p2 |
//! | SSL_NEGOTIATE | 11 | int32 level |
//! | SSL_CONNECT | 12 | int32 level |
//! | APPNAME | 13 | utf8 ∥ 0x00 |
//! | CLIENT_OS | 14 | utf8 ∥ 0x00 |
//! | CLIENT_HOST_NAME | 15 | utf8 ∥ 0x00 |
//! | CLIENT_OS_USER | 16 | utf8 ∥ 0x00 |
//! | VARLENA64_ENABLED | 17 | int16 |
//! | CLIENT_DONE | 1000 | empty |

pub mod opcode;

pub use opcode::Opcode;

/// The client-type value this implementation announces under `CLIENT_TYPE`.
pub const CLIENT_TYPE: i16 = 15;

/// Default TCP port for the NPS wire protocol.
pub const DEFAULT_PORT: u16 = 5480;

/// Build a frame with a 4-byte big-endian length prefix, a 2-byte opcode,
/// and a body. `len` counts itself, the opcode, and the body.
pub fn frame(opcode: Opcode, body: &[u8]) -> Vec<u8> {
    let len = 4 + 2 + body.len();
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(&(len as i32).to_be_bytes());
    out.extend_from_slice(&opcode.as_i16().to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// Build the bare `len ∥ body` frame used for the post-authentication
/// credential response, which carries no opcode of its own.
pub fn credential_frame(body: &[u8]) -> Vec<u8> {
    let len = 4 + body.len();
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(&(len as i32).to_be_bytes());
    out.extend_from_slice(body);
    out
}

fn cstr(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 1);
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    out
}

pub fn client_begin(version: i16) -> Vec<u8> {
    frame(Opcode::ClientBegin, &version.to_be_bytes())
}

pub fn db(name: &str) -> Vec<u8> {
    frame(Opcode::Db, &cstr(name))
}

pub fn user(name: &str) -> Vec<u8> {
    frame(Opcode::User, &cstr(name))
}

pub fn options(opts: &str) -> Vec<u8> {
    frame(Opcode::Options, &cstr(opts))
}

pub fn remote_pid(pid: i32) -> Vec<u8> {
    frame(Opcode::RemotePid, &pid.to_be_bytes())
}

pub fn client_type() -> Vec<u8> {
    frame(Opcode::ClientType, &CLIENT_TYPE.to_be_bytes())
}

pub fn protocol(p1: i16, p2: i16) -> Vec<u8> {
    let mut body = Vec::with_capacity(4);
    body.extend_from_slice(&p1.to_be_bytes());
    body.extend_from_slice(&p2.to_be_bytes());
    frame(Opcode::Protocol, &body)
}

pub fn ssl_negotiate(level: i32) -> Vec<u8> {
    frame(Opcode::SslNegotiate, &level.to_be_bytes())
}

pub fn ssl_connect(level: i32) -> Vec<u8> {
    frame(Opcode::SslConnect, &level.to_be_bytes())
}

pub fn appname(name: &str) -> Vec<u8> {
    frame(Opcode::AppName, &cstr(name))
}

pub fn client_os(os: &str) -> Vec<u8> {
    frame(Opcode::ClientOs, &cstr(os))
}

pub fn client_host_name(host: &str) -> Vec<u8> {
    frame(Opcode::ClientHostName, &cstr(host))
}

pub fn client_os_user(user: &str) -> Vec<u8> {
    frame(Opcode::ClientOsUser, &cstr(user))
}

pub fn varlena64_enabled() -> Vec<u8> {
    frame(Opcode::Varlena64Enabled, &1i16.to_be_bytes())
}

pub fn client_done() -> Vec<u8> {
    frame(Opcode::ClientDone, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_len(bytes: &[u8]) -> i32 {
        i32::from_be_bytes(bytes[0..4].try_into().unwrap())
    }

    #[test]
    fn frame_length_prefix_matches_total_size() {
        for f in [
            client_begin(6),
            db("mydb"),
            user("alice"),
            options("opt=1"),
            remote_pid(42),
            client_type(),
            protocol(3, 5),
            ssl_negotiate(2),
            ssl_connect(3),
            appname("demo"),
            client_os("linux"),
            client_host_name("host"),
            client_os_user("root"),
            varlena64_enabled(),
            client_done(),
        ] {
            assert_eq!(frame_len(&f) as usize, f.len());
        }
    }

    #[test]
    fn client_begin_encodes_opcode_and_version() {
        let f = client_begin(6);
        assert_eq!(f, vec![0, 0, 0, 6, 0, 1, 0, 6]);
    }

    #[test]
    fn db_is_null_terminated() {
        let f = db("mydb");
        assert_eq!(&f[6..], b"mydb\0");
    }

    #[test]
    fn client_done_has_empty_body_and_opcode_1000() {
        let f = client_done();
        assert_eq!(f, vec![0, 0, 0, 6, 0x03, 0xE8]);
    }

    #[test]
    fn credential_frame_has_no_opcode() {
        let f = credential_frame(b"hunter2\0");
        assert_eq!(frame_len(&f) as usize, f.len());
        assert_eq!(&f[4..], b"hunter2\0");
    }

    #[test]
    fn client_type_announces_constant_15() {
        assert_eq!(&client_type()[6..], &15i16.to_be_bytes());
    }
}
