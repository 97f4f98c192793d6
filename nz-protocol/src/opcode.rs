/// Opcode identifiers used in phases 1-2 of the handshake.
///
/// Values come directly from the wire protocol: see the frame table in the
/// crate-level documentation for the body each opcode carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    ClientBegin,
    Db,
    User,
    Options,
    RemotePid,
    ClientType,
    Protocol,
    SslNegotiate,
    SslConnect,
    AppName,
    ClientOs,
    ClientHostName,
    ClientOsUser,
    Varlena64Enabled,
    ClientDone,
}

impl Opcode {
    pub const fn as_i16(self) -> i16 {
        match self {
            Opcode::ClientBegin => 1,
            Opcode::Db => 2,
            Opcode::User => 3,
            Opcode::Options => 4,
            Opcode::RemotePid => 6,
            Opcode::ClientType => 8,
            Opcode::Protocol => 9,
            Opcode::SslNegotiate => 11,
            Opcode::SslConnect => 12,
            Opcode::AppName => 13,
            Opcode::ClientOs => 14,
            Opcode::ClientHostName => 15,
            Opcode::ClientOsUser => 16,
            Opcode::Varlena64Enabled => 17,
            Opcode::ClientDone => 1000,
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}({})", self.as_i16())
    }
}
